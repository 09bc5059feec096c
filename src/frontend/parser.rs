use rustpython_parser::ast::{Expr, Mod, ModExpression};
use rustpython_parser::{parse, Mode};
use tracing::{debug, error, instrument};

pub type ParseError = String;

#[instrument(skip(source), fields(source_len = source.len()))]
pub fn parse_module(source: &str) -> Result<Mod, ParseError> {
    parse_module_at(source, "<string>")
}

/// Parse a module, naming `path` in syntax errors.
#[instrument(skip(source), fields(source_len = source.len()))]
pub fn parse_module_at(source: &str, path: &str) -> Result<Mod, ParseError> {
    debug!("Parsing module");
    parse(source, Mode::Module, path).map_err(|e| {
        error!(error = %e, "Failed to parse module");
        format!("Parse error: {}", e)
    })
}

/// Parse a single expression, as found in a string annotation.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    match parse(source, Mode::Expression, "<annotation>") {
        Ok(Mod::Expression(ModExpression { body, .. })) => Ok(*body),
        Ok(_) => Err("Expected expression".to_string()),
        Err(e) => {
            debug!(error = %e, "Failed to parse expression");
            Err(format!("Parse error: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decorated_function() {
        let source = r#"
from returns.result import safe

@safe
def parse(value: str) -> int:
    return int(value)
"#;
        assert!(parse_module(source).is_ok());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let error = parse_module_at("def broken(:\n", "broken.py").unwrap_err();
        assert!(error.starts_with("Parse error"));
    }

    #[test]
    fn test_parse_expression() {
        assert!(matches!(parse_expression("Optional[int]"), Ok(Expr::Subscript(_))));
        assert!(parse_expression("x = 1").is_err());
    }
}
