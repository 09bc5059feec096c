use typthon_returns::{check_source, CheckReport, Config, ErrorKind};

fn check(source: &str) -> CheckReport {
    check_source("test.py", source, &Config::default()).unwrap()
}

fn check_without_plugins(source: &str) -> CheckReport {
    let mut config = Config::default();
    config.plugins.clear();
    check_source("test.py", source, &config).unwrap()
}

fn revealed(report: &CheckReport) -> Vec<String> {
    report
        .diagnostics
        .iter()
        .filter_map(|d| match &d.kind {
            ErrorKind::RevealedType { ty } => Some(ty.clone()),
            _ => None,
        })
        .collect()
}

fn errors(report: &CheckReport) -> Vec<String> {
    report.errors().map(|d| d.message()).collect()
}

#[test]
fn test_safe_keeps_signature() {
    let source = r#"
from returns.result import safe

@safe
def parse(value: str) -> int:
    return int(value)

reveal_type(parse)
reveal_type(parse("1"))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec!["def (value: str) -> Result[int, Exception]", "Result[int, Exception]"]
    );
}

#[test]
fn test_without_plugin_declared_type_wins() {
    let source = r#"
from returns.result import safe

@safe
def parse(value: str) -> int: ...

reveal_type(parse)
"#;
    let report = check_without_plugins(source);
    assert_eq!(revealed(&report), vec!["def (*Any, **Any) -> Result[int, Exception]"]);
}

#[test]
fn test_other_decorators() {
    let source = r#"
from typing import Optional
from returns.io import impure_safe
from returns.maybe import maybe
from returns.future import future
from returns.functions import not_

@impure_safe
def read(path: str) -> bytes: ...

@maybe
def find(key: str) -> Optional[int]: ...

@future
async def fetch(url: str, retries: int = 3) -> bytes: ...

def is_even(n: int) -> bool: ...

reveal_type(read)
reveal_type(find)
reveal_type(fetch)
reveal_type(not_(is_even))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec![
            "def (path: str) -> IOResult[bytes, Exception]",
            "def (key: str) -> Maybe[int]",
            "def (url: str, retries: int =) -> Future[bytes]",
            "def (n: int) -> bool",
        ]
    );
}

#[test]
fn test_partial_removes_applied_parameters() {
    let source = r#"
from returns.curry import partial

def f(a: int, b: str, c: float) -> bool: ...

reveal_type(partial(f, 1))
reveal_type(partial(f, 1, c=2.0))
reveal_type(partial(f, b="x"))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec![
            "def (b: str, c: float) -> bool",
            "def (b: str) -> bool",
            "def (a: int, *, c: float) -> bool",
        ]
    );
}

#[test]
fn test_partial_argument_error_gives_any() {
    let source = r#"
from returns.curry import partial

def f(a: int, b: str) -> bool: ...

reveal_type(partial(f, "x"))
"#;
    let report = check(source);
    assert_eq!(
        errors(&report),
        vec!["Argument 2 to \"partial\" has incompatible type \"str\"; expected \"int\""]
    );
    assert_eq!(revealed(&report), vec!["Any"]);
}

#[test]
fn test_curry_overloads() {
    let source = r#"
from returns.curry import curry

@curry
def add(a: int, b: int) -> int: ...

reveal_type(add)
reveal_type(add(1))
reveal_type(add(1)(2))
reveal_type(add(1, 2))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec![
            "Overload(def (a: int, b: int) -> int, def (a: int) -> def (b: int) -> int)",
            "def (b: int) -> int",
            "int",
            "int",
        ]
    );
}

#[test]
fn test_flow_threads_types() {
    let source = r#"
from returns.pipeline import flow

def to_int(x: str) -> int: ...
def to_float(x: int) -> float: ...

reveal_type(flow("1", to_int, to_float))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(revealed(&report), vec!["float"]);
}

#[test]
fn test_flow_reports_incompatible_step() {
    let source = r#"
from returns.pipeline import flow

def to_int(x: str) -> int: ...

reveal_type(flow(1, to_int))
"#;
    let report = check(source);
    assert_eq!(
        errors(&report),
        vec!["Argument 2 to \"flow\" has incompatible type \"def (x: str) -> int\"; expected \"def (int) -> Any\""]
    );
    assert_eq!(revealed(&report), vec!["Any"]);
    assert_eq!(report.diagnostics[0].file, "test.py");
    assert_eq!(report.diagnostics[0].location.line, 6);
}

#[test]
fn test_pointfree_map_stays_generic() {
    let source = r#"
from returns.pointfree import map_
from returns.result import Success

def to_str(x: int) -> str: ...

reveal_type(map_(to_str))
reveal_type(map_(to_str)(Success(1)))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec![
            "def (KindN[_Kind, int, _SecondType, _ThirdType]) -> KindN[_Kind, str, _SecondType, _ThirdType]",
            "Result[str, Any]",
        ]
    );
}

#[test]
fn test_unregistered_calls_keep_inference() {
    let source = r#"
from returns.functions import identity
from returns.maybe import Some

reveal_type(identity(1))
reveal_type(Some("a"))
"#;
    let report = check(source);
    assert_eq!(revealed(&report), vec!["int", "Maybe[str]"]);
}

#[test]
fn test_module_import_resolves_hooks() {
    let source = r#"
import returns.curry

def f(a: int, b: str) -> bool: ...

reveal_type(returns.curry.partial(f, 1))
"#;
    let report = check(source);
    assert_eq!(revealed(&report), vec!["def (b: str) -> bool"]);
}

#[test]
fn test_decorators_keep_generic_signatures() {
    let source = r#"
from typing import TypeVar
from returns.io import impure
from returns.result import safe

T = TypeVar("T")

@safe
def ident(x: T) -> T: ...

@impure
def load(x: T) -> T: ...

reveal_type(ident)
reveal_type(ident(1))
reveal_type(load)
reveal_type(load("a"))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(
        revealed(&report),
        vec![
            "def (x: T) -> Result[T, Exception]",
            "Result[int, Exception]",
            "def (x: T) -> IO[T]",
            "IO[str]",
        ]
    );
}

#[test]
fn test_partial_of_generic_function() {
    let source = r#"
from typing import TypeVar
from returns.curry import partial

T = TypeVar("T")

def pick(a: T, b: str) -> T: ...

reveal_type(partial(pick, 1))
reveal_type(partial(pick, b="x"))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(revealed(&report), vec!["def (b: str) -> int", "def (a: T) -> T"]);
}

#[test]
fn test_flow_through_generic_steps() {
    let source = r#"
from typing import TypeVar
from returns.functions import identity
from returns.pipeline import flow

T = TypeVar("T")

def to_int(x: str) -> int: ...

reveal_type(flow("1", to_int, identity))

def g(y: T) -> None:
    reveal_type(identity(y))
    reveal_type(flow(y, identity))
"#;
    let report = check(source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(revealed(&report), vec!["int", "T", "T"]);
}

#[test]
fn test_curry_of_wide_function_keeps_declared_type() {
    let params: Vec<String> = (0..65).map(|i| format!("a{}: int", i)).collect();
    let source = format!(
        "from returns.curry import curry\n\n@curry\ndef f({}) -> int: ...\n\nreveal_type(f)\n",
        params.join(", ")
    );
    let report = check(&source);
    assert!(errors(&report).is_empty(), "{:?}", errors(&report));
    assert_eq!(revealed(&report), vec!["def (*Any, **Any) -> int"]);
}
