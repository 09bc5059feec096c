//! Static context handed to a strategy for one intercepted call.

use crate::core::{ArgKind, CallableType, Type};
use crate::errors::{ErrorKind, SourceLocation, TypeError};

/// Everything the host knows about a call at the time the hook fires.
///
/// The argument vectors are indexed by the callee's formal parameters: entry
/// `i` holds the actual arguments mapped onto formal `i`. A `*args` formal
/// may collect several actuals, an unfilled optional formal collects none.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionContext {
    pub fullname: String,
    pub arg_types: Vec<Vec<Type>>,
    pub arg_kinds: Vec<Vec<ArgKind>>,
    pub arg_names: Vec<Vec<Option<String>>>,
    pub callee_arg_names: Vec<Option<String>>,
    /// Declared signature of the callee, before instantiation.
    pub callee_type: Type,
    /// What the host infers for the call on its own.
    pub default_return_type: Type,
    pub file: String,
    pub location: SourceLocation,
}

impl FunctionContext {
    /// Context for a callee whose formals each receive exactly the listed
    /// positional actuals. Used by the host for decorator application.
    pub fn positional(
        fullname: impl Into<String>,
        arg_types: Vec<Vec<Type>>,
        default_return_type: Type,
    ) -> Self {
        let arg_kinds = arg_types
            .iter()
            .map(|group| vec![ArgKind::Positional; group.len()])
            .collect();
        let arg_names = arg_types.iter().map(|group| vec![None; group.len()]).collect();
        let callee_arg_names = vec![None; arg_types.len()];

        Self {
            fullname: fullname.into(),
            arg_types,
            arg_kinds,
            arg_names,
            callee_arg_names,
            callee_type: Type::Any,
            default_return_type,
            file: String::new(),
            location: SourceLocation::default(),
        }
    }

    pub fn with_callee(mut self, callee_type: Type) -> Self {
        if let Type::Callable(callable) = &callee_type {
            self.callee_arg_names = callable.params.iter().map(|p| p.name.clone()).collect();
        }
        self.callee_type = callee_type;
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, location: SourceLocation) -> Self {
        self.file = file.into();
        self.location = location;
        self
    }

    /// Name used in diagnostics: `returns.curry.partial` -> `partial`,
    /// `returns._generated.pipeline.flow._flow` -> `flow`.
    pub fn short_name(&self) -> &str {
        let last = self.fullname.rsplit('.').next().unwrap_or(&self.fullname);
        last.trim_start_matches('_')
    }

    /// All actuals passed for formal `formal`.
    pub fn args(&self, formal: usize) -> &[Type] {
        self.arg_types.get(formal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First actual passed for formal `formal`.
    pub fn arg_type(&self, formal: usize) -> Option<&Type> {
        self.args(formal).first()
    }

    pub fn arg_name(&self, formal: usize, index: usize) -> Option<&str> {
        self.arg_names
            .get(formal)
            .and_then(|names| names.get(index))
            .and_then(|name| name.as_deref())
    }

    pub fn callee_callable(&self) -> Option<&CallableType> {
        self.callee_type.as_callable()
    }

    /// Diagnostic at the call site.
    pub fn fail(&self, kind: ErrorKind) -> TypeError {
        TypeError::new(kind, self.location.clone()).with_file(self.file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Param;

    #[test]
    fn test_positional_context_shape() {
        let ctx = FunctionContext::positional(
            "returns.result.safe",
            vec![vec![Type::Int]],
            Type::Any,
        );
        assert_eq!(ctx.short_name(), "safe");
        let flow = FunctionContext::positional("returns._generated.pipeline.flow._flow", vec![], Type::Any);
        assert_eq!(flow.short_name(), "flow");
        assert_eq!(ctx.arg_type(0), Some(&Type::Int));
        assert_eq!(ctx.arg_type(1), None);
        assert_eq!(ctx.arg_kinds, vec![vec![ArgKind::Positional]]);
        assert!(ctx.args(5).is_empty());
    }

    #[test]
    fn test_with_callee_records_formal_names() {
        let callee = Type::callable(vec![Param::positional("function", Type::Any)], Type::Any);
        let ctx = FunctionContext::positional("pkg.f", vec![vec![Type::Int]], Type::Any)
            .with_callee(callee);
        assert_eq!(ctx.callee_arg_names, vec![Some("function".to_string())]);
    }

    #[test]
    fn test_fail_carries_location() {
        let ctx = FunctionContext::positional("pkg.f", vec![], Type::Any)
            .with_location("mod.py", SourceLocation::new(2, 1, 2, 9));
        let error = ctx.fail(ErrorKind::TooFewArguments { callee: "f".into() });
        assert_eq!(error.file, "mod.py");
        assert_eq!(error.location.line, 2);
    }
}
