use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl SourceLocation {
    pub fn new(line: usize, col: usize, end_line: usize, end_col: usize) -> Self {
        Self { line, col, end_line, end_col }
    }

    pub fn from_range(start: (usize, usize), end: (usize, usize)) -> Self {
        Self::new(start.0, start.1, end.0, end.1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum ErrorKind {
    TypeMismatch { expected: String, found: String },
    InvalidArgType { index: usize, callee: String, expected: String, found: String },
    TooManyArguments { callee: String },
    TooFewArguments { callee: String },
    UnexpectedKeyword { callee: String, name: String },
    NonCallable { ty: String },
    NoMatchingOverload { callee: String },
    UnsupportedSignature { callee: String, reason: String },
    RevealedType { ty: String },
    Custom { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "Incompatible types: expected \"{}\", found \"{}\"", expected, found)
            }
            Self::InvalidArgType { index, callee, expected, found } => {
                write!(
                    f,
                    "Argument {} to \"{}\" has incompatible type \"{}\"; expected \"{}\"",
                    index, callee, found, expected
                )
            }
            Self::TooManyArguments { callee } => {
                write!(f, "Too many arguments for \"{}\"", callee)
            }
            Self::TooFewArguments { callee } => {
                write!(f, "Too few arguments for \"{}\"", callee)
            }
            Self::UnexpectedKeyword { callee, name } => {
                write!(f, "Unexpected keyword argument \"{}\" for \"{}\"", name, callee)
            }
            Self::NonCallable { ty } => {
                write!(f, "\"{}\" not callable", ty)
            }
            Self::NoMatchingOverload { callee } => {
                write!(f, "No overload variant of \"{}\" matches argument types", callee)
            }
            Self::UnsupportedSignature { callee, reason } => {
                write!(f, "\"{}\" cannot be applied here: {}", callee, reason)
            }
            Self::RevealedType { ty } => {
                write!(f, "Revealed type is \"{}\"", ty)
            }
            Self::Custom { message } => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic produced by the checker or by a plugin strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub location: SourceLocation,
    pub file: String,
    pub suggestions: Vec<String>,
}

impl TypeError {
    pub fn new(kind: ErrorKind, location: SourceLocation) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            location,
            file: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn note(kind: ErrorKind, location: SourceLocation) -> Self {
        Self { severity: Severity::Note, ..Self::new(kind, location) }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn revealed(ty: &crate::core::Type, location: SourceLocation) -> Self {
        Self::note(ErrorKind::RevealedType { ty: ty.to_string() }, location)
    }

    pub fn invalid_arg_type(
        index: usize,
        callee: &str,
        expected: &crate::core::Type,
        found: &crate::core::Type,
        location: SourceLocation,
    ) -> Self {
        Self::new(
            ErrorKind::InvalidArgType {
                index,
                callee: callee.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            },
            location,
        )
    }

    pub fn unexpected_keyword(
        callee: &str,
        name: &str,
        location: SourceLocation,
        candidates: &[String],
    ) -> Self {
        let error = Self::new(
            ErrorKind::UnexpectedKeyword { callee: callee.to_string(), name: name.to_string() },
            location,
        );
        let suggestions: Vec<String> = find_similar_names(name, candidates, 2)
            .into_iter()
            .take(3)
            .map(|s| format!("Did you mean \"{}\"?", s))
            .collect();
        error.with_suggestions(suggestions)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file.is_empty() {
            write!(f, "{}:", self.file)?;
        }
        write!(
            f,
            "{}:{}: {}: {}",
            self.location.line,
            self.location.col,
            self.severity,
            self.kind
        )?;

        for suggestion in &self.suggestions {
            write!(f, "\n  hint: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for TypeError {}

/// Error collector for gathering multiple errors during type checking
pub struct ErrorCollector {
    errors: Vec<TypeError>,
    max_errors: usize,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::with_max(100)
    }

    pub fn with_max(max_errors: usize) -> Self {
        Self {
            errors: Vec::new(),
            max_errors,
        }
    }

    /// Notes are always kept; errors stop being recorded at the cap.
    pub fn add(&mut self, error: TypeError) {
        if !error.is_error() || self.error_count() < self.max_errors {
            self.errors.push(error);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_error()).count()
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<TypeError> {
        self.errors
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute Levenshtein distance for "did you mean" suggestions
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() { return b_chars.len(); }
    if b_chars.is_empty() { return a_chars.len(); }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Find similar names for "did you mean" suggestions
pub fn find_similar_names(target: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut results: Vec<(String, usize)> = candidates
        .iter()
        .map(|c| (c.clone(), levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance && *dist > 0)
        .collect();

    results.sort_by_key(|(_, dist)| *dist);
    results.into_iter().map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_file_and_hint() {
        let error = TypeError::new(
            ErrorKind::TooManyArguments { callee: "partial".to_string() },
            SourceLocation::new(3, 4, 3, 20),
        )
        .with_file("app.py")
        .with_suggestion("Remove the extra argument".to_string());

        assert_eq!(
            error.to_string(),
            "app.py:3:4: error: Too many arguments for \"partial\"\n  hint: Remove the extra argument"
        );
    }

    #[test]
    fn test_collector_caps_errors_but_keeps_notes() {
        let mut collector = ErrorCollector::with_max(1);
        let loc = SourceLocation::default();
        collector.add(TypeError::new(ErrorKind::Custom { message: "a".into() }, loc.clone()));
        collector.add(TypeError::new(ErrorKind::Custom { message: "b".into() }, loc.clone()));
        collector.add(TypeError::note(ErrorKind::RevealedType { ty: "int".into() }, loc));

        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.errors().len(), 2);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_similar_names() {
        let candidates = vec!["returns".to_string(), "pydantic".to_string()];
        assert_eq!(find_similar_names("retruns", &candidates, 2), vec!["returns".to_string()]);
    }

    #[test]
    fn test_unexpected_keyword_suggests() {
        let error = TypeError::unexpected_keyword(
            "partial",
            "valeu",
            SourceLocation::default(),
            &["value".to_string(), "other".to_string()],
        );
        assert_eq!(error.suggestions, vec!["Did you mean \"value\"?".to_string()]);
    }
}
