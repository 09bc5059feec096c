//! Statement and expression checking with call-site plugin hooks
//!
//! The checker walks one module, infers a type for every expression and
//! resolves call targets to fully-qualified names. When a plugin has a hook
//! for the target, the hook's result replaces the inferred type of the call.

use crate::analysis::annotations::AnnotationReader;
use crate::analysis::arguments::{map_actuals, Actual};
use crate::analysis::stubs::{ModuleExports, ModuleIndex};
use crate::ast::{LineIndex, SourceLocationExt};
use crate::core::{erase_unsolved, ArgKind, CallableType, Param, Substitution, Type, TypeContext};
use crate::errors::{ErrorCollector, ErrorKind, SourceLocation, TypeError};
use crate::frontend::{parse_module_at, Config};
use crate::plugin::{load_plugins, FunctionContext, PluginChain};
use rustpython_parser::ast::{
    Arguments, Constant, ExceptHandler, Expr, Mod, ModModule, Operator, Stmt, UnaryOp,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, trace};

const TYPE_VAR_NAMES: &[&str] = &["typing.TypeVar", "typing_extensions.TypeVar"];
const REVEAL_TYPE: &str = "reveal_type";
pub const MAIN_MODULE: &str = "__main__";

/// Diagnostics for one checked file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub file: String,
    pub diagnostics: Vec<TypeError>,
}

impl CheckReport {
    pub fn empty(file: impl Into<String>) -> Self {
        Self { file: file.into(), diagnostics: Vec::new() }
    }

    pub fn errors(&self) -> impl Iterator<Item = &TypeError> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn note_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// A resolved call target.
struct CallTarget {
    /// `None` for locally bound callables, which never get hooks.
    fullname: Option<String>,
    /// Name used in diagnostics.
    name: String,
    ty: Type,
}

/// Function definition fields shared by `def` and `async def`.
struct FunctionParts<'s> {
    name: &'s str,
    args: &'s Arguments,
    body: &'s [Stmt],
    decorators: &'s [Expr],
    returns: Option<&'s Expr>,
    is_async: bool,
}

pub struct TypeChecker<'a> {
    module: String,
    file: String,
    plugins: &'a PluginChain,
    index: &'a ModuleIndex,
    ctx: TypeContext,
    /// Local name to the fully-qualified name it was imported as.
    imports: HashMap<String, String>,
    type_vars: HashSet<String>,
    /// Top-level names defined by this module, in definition order.
    definitions: Vec<String>,
    /// Top-level `from m import a as b` re-exports.
    aliases: Vec<(String, String)>,
    depth: usize,
    errors: ErrorCollector,
    lines: LineIndex,
    show_revealed: bool,
}

impl<'a> TypeChecker<'a> {
    pub fn new(module: impl Into<String>, plugins: &'a PluginChain, index: &'a ModuleIndex) -> Self {
        Self {
            module: module.into(),
            file: String::new(),
            plugins,
            index,
            ctx: TypeContext::new(),
            imports: HashMap::new(),
            type_vars: HashSet::new(),
            definitions: Vec::new(),
            aliases: Vec::new(),
            depth: 0,
            errors: ErrorCollector::new(),
            lines: LineIndex::new(""),
            show_revealed: true,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.errors = ErrorCollector::with_max(max_errors);
        self
    }

    pub fn with_revealed_types(mut self, show: bool) -> Self {
        self.show_revealed = show;
        self
    }

    #[instrument(skip(self, module, source), fields(name = %self.module))]
    pub fn check(&mut self, module: &Mod, source: &str) -> Vec<TypeError> {
        self.errors.clear();
        self.lines = LineIndex::new(source);

        match module {
            Mod::Module(ModModule { body, .. }) => {
                for stmt in body {
                    self.check_stmt(stmt);
                }
            }
            _ => debug!("Not a module, nothing to check"),
        }

        debug!(diagnostics = self.errors.errors().len(), "Module checked");
        self.errors.errors().to_vec()
    }

    /// Type bound to `name` in the module scope.
    pub fn get_type(&self, name: &str) -> Option<Type> {
        self.ctx.get_type(name)
    }

    pub fn exports(&self) -> ModuleExports {
        let definitions = self
            .definitions
            .iter()
            .filter_map(|name| self.ctx.get_type(name).map(|ty| (name.clone(), ty)))
            .collect();
        let aliases = self
            .aliases
            .iter()
            .filter(|(name, _)| !self.ctx.contains(name))
            .cloned()
            .collect();
        ModuleExports { definitions, aliases }
    }

    pub fn into_report(self) -> CheckReport {
        CheckReport { file: self.file, diagnostics: self.errors.into_errors() }
    }

    fn report(&mut self, mut error: TypeError) {
        if error.file.is_empty() {
            error.file = self.file.clone();
        }
        self.errors.add(error);
    }

    fn define(&mut self, name: &str, ty: Type) {
        self.ctx.set_type(name.to_string(), ty);
        if self.depth == 0 && !self.definitions.iter().any(|n| n == name) {
            self.definitions.push(name.to_string());
        }
    }

    fn import(&mut self, local: &str, fullname: String) {
        self.ctx.remove(local);
        if self.depth == 0 {
            self.definitions.retain(|n| n != local);
            self.aliases.retain(|(n, _)| n != local);
            self.aliases.push((local.to_string(), fullname.clone()));
        }
        self.imports.insert(local.to_string(), fullname);
    }

    /// Run `body` in a nested scope. Bindings made inside are discarded.
    fn in_scope(&mut self, body: impl FnOnce(&mut Self)) {
        let saved: Vec<(String, Type)> = self
            .ctx
            .names()
            .into_iter()
            .filter_map(|name| self.ctx.get_type(&name).map(|ty| (name, ty)))
            .collect();
        let saved_imports = self.imports.clone();

        self.depth += 1;
        body(self);
        self.depth -= 1;

        for name in self.ctx.names() {
            self.ctx.remove(&name);
        }
        for (name, ty) in saved {
            self.ctx.set_type(name, ty);
        }
        self.imports = saved_imports;
    }

    fn check_body(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import(import) => {
                for alias in &import.names {
                    let module = alias.name.to_string();
                    match &alias.asname {
                        Some(asname) => self.import(asname.as_str(), module),
                        None => {
                            let head = module.split('.').next().unwrap_or(&module).to_string();
                            self.import(&head, head.clone());
                        }
                    }
                }
            }

            Stmt::ImportFrom(import) => {
                let relative = import.level.as_ref().map_or(false, |level| level.to_u32() > 0);
                let Some(module) = import.module.as_ref().filter(|_| !relative) else {
                    trace!("Skipping relative import");
                    return;
                };
                for alias in &import.names {
                    if alias.name.as_str() == "*" {
                        continue;
                    }
                    let local = alias.asname.as_ref().unwrap_or(&alias.name).to_string();
                    self.import(&local, format!("{}.{}", module, alias.name));
                }
            }

            Stmt::FunctionDef(def) => self.check_function(FunctionParts {
                name: def.name.as_str(),
                args: &def.args,
                body: &def.body,
                decorators: &def.decorator_list,
                returns: def.returns.as_deref(),
                is_async: false,
            }),

            Stmt::AsyncFunctionDef(def) => self.check_function(FunctionParts {
                name: def.name.as_str(),
                args: &def.args,
                body: &def.body,
                decorators: &def.decorator_list,
                returns: def.returns.as_deref(),
                is_async: true,
            }),

            Stmt::ClassDef(class) => {
                for decorator in &class.decorator_list {
                    self.infer_expr(decorator);
                }
                let name = class.name.to_string();
                self.define(&name, Type::Callable(CallableType::ellipsis(Type::Class(name.clone()))));
                self.in_scope(|checker| checker.check_body(&class.body));
            }

            Stmt::Assign(assign) => {
                if self.is_type_var_declaration(&assign.value) {
                    for target in &assign.targets {
                        if let Expr::Name(name) = target {
                            debug!(name = %name.id, "Declared type variable");
                            self.type_vars.insert(name.id.to_string());
                        }
                    }
                    return;
                }
                let value = self.infer_expr(&assign.value);
                for target in &assign.targets {
                    self.bind_target(target, value.clone());
                }
            }

            Stmt::AnnAssign(assign) => {
                let declared = AnnotationReader::new(&self.type_vars).read(&assign.annotation);
                if let Some(value) = &assign.value {
                    let found = self.infer_expr(value);
                    if !found.is_subtype(&declared) {
                        let location = value.source_location(&self.lines);
                        self.report(TypeError::new(
                            ErrorKind::TypeMismatch {
                                expected: declared.to_string(),
                                found: found.to_string(),
                            },
                            location,
                        ));
                    }
                }
                match &*assign.target {
                    Expr::Name(name) => self.define(name.id.as_str(), declared),
                    other => {
                        self.infer_expr(other);
                    }
                }
            }

            Stmt::AugAssign(assign) => {
                self.infer_expr(&assign.target);
                self.infer_expr(&assign.value);
            }

            Stmt::Expr(expr) => {
                self.infer_expr(&expr.value);
            }

            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.infer_expr(value);
                }
            }

            Stmt::If(stmt) => {
                self.infer_expr(&stmt.test);
                self.check_body(&stmt.body);
                self.check_body(&stmt.orelse);
            }

            Stmt::While(stmt) => {
                self.infer_expr(&stmt.test);
                self.check_body(&stmt.body);
                self.check_body(&stmt.orelse);
            }

            Stmt::For(stmt) => {
                let iterable = self.infer_expr(&stmt.iter);
                self.bind_target(&stmt.target, element_type(&iterable));
                self.check_body(&stmt.body);
                self.check_body(&stmt.orelse);
            }

            Stmt::AsyncFor(stmt) => {
                let iterable = self.infer_expr(&stmt.iter);
                self.bind_target(&stmt.target, element_type(&iterable));
                self.check_body(&stmt.body);
                self.check_body(&stmt.orelse);
            }

            Stmt::With(stmt) => {
                for item in &stmt.items {
                    self.infer_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.bind_target(vars, Type::Any);
                    }
                }
                self.check_body(&stmt.body);
            }

            Stmt::AsyncWith(stmt) => {
                for item in &stmt.items {
                    self.infer_expr(&item.context_expr);
                    if let Some(vars) = &item.optional_vars {
                        self.bind_target(vars, Type::Any);
                    }
                }
                self.check_body(&stmt.body);
            }

            Stmt::Try(stmt) => {
                self.check_body(&stmt.body);
                self.check_handlers(&stmt.handlers);
                self.check_body(&stmt.orelse);
                self.check_body(&stmt.finalbody);
            }

            Stmt::TryStar(stmt) => {
                self.check_body(&stmt.body);
                self.check_handlers(&stmt.handlers);
                self.check_body(&stmt.orelse);
                self.check_body(&stmt.finalbody);
            }

            Stmt::Raise(raise) => {
                if let Some(exc) = &raise.exc {
                    self.infer_expr(exc);
                }
            }

            Stmt::Assert(assert) => {
                self.infer_expr(&assert.test);
            }

            _ => {}
        }
    }

    fn check_handlers(&mut self, handlers: &[ExceptHandler]) {
        for handler in handlers {
            let ExceptHandler::ExceptHandler(handler) = handler else { continue };
            let caught = handler
                .type_
                .as_ref()
                .map_or(Type::Class("BaseException".to_string()), |ty| {
                    AnnotationReader::new(&self.type_vars).read(ty)
                });
            if let Some(name) = &handler.name {
                self.define(name.as_str(), caught);
            }
            self.check_body(&handler.body);
        }
    }

    fn check_function(&mut self, def: FunctionParts<'_>) {
        let signature = self.signature(def.args, def.returns, def.is_async);

        self.in_scope(|checker| {
            for param in &signature.params {
                let Some(name) = &param.name else { continue };
                let bound = match param.kind {
                    ArgKind::Star => Type::generic("tuple", vec![param.ty.clone()]),
                    ArgKind::StarStar => Type::Dict(Box::new(Type::Str), Box::new(param.ty.clone())),
                    _ => param.ty.clone(),
                };
                checker.ctx.set_type(name.clone(), bound);
            }
            checker.check_body(def.body);
        });

        // Innermost decorator first, each applied as `decorator(function)`.
        let mut ty = Type::Callable(signature);
        for decorator in def.decorators.iter().rev() {
            let location = decorator.source_location(&self.lines);
            let target = self.call_target(decorator);
            ty = self.call(&target, &[Actual::positional(ty)], location);
        }

        self.define(def.name, ty);
    }

    fn signature(&self, args: &Arguments, returns: Option<&Expr>, is_async: bool) -> CallableType {
        let reader = AnnotationReader::new(&self.type_vars);
        let annotated = |annotation: &Option<Box<Expr>>| {
            annotation.as_ref().map_or(Type::Any, |ann| reader.read(ann))
        };

        let mut params = Vec::new();
        for arg in args.posonlyargs.iter().chain(&args.args) {
            let kind = if arg.default.is_some() { ArgKind::Optional } else { ArgKind::Positional };
            params.push(Param::new(Some(arg.def.arg.to_string()), kind, annotated(&arg.def.annotation)));
        }
        if let Some(vararg) = &args.vararg {
            params.push(Param::new(Some(vararg.arg.to_string()), ArgKind::Star, annotated(&vararg.annotation)));
        }
        for arg in &args.kwonlyargs {
            let kind = if arg.default.is_some() { ArgKind::NamedOptional } else { ArgKind::Named };
            params.push(Param::new(Some(arg.def.arg.to_string()), kind, annotated(&arg.def.annotation)));
        }
        if let Some(kwarg) = &args.kwarg {
            params.push(Param::new(Some(kwarg.arg.to_string()), ArgKind::StarStar, annotated(&kwarg.annotation)));
        }

        let ret = returns.map_or(Type::Any, |ann| reader.read(ann));
        let ret = if is_async {
            Type::generic("Coroutine", vec![Type::Any, Type::Any, ret])
        } else {
            ret
        };
        CallableType::new(params, ret)
    }

    fn bind_target(&mut self, target: &Expr, ty: Type) {
        match target {
            Expr::Name(name) => self.define(name.id.as_str(), ty),
            Expr::Tuple(tuple) => self.bind_elements(&tuple.elts, &ty),
            Expr::List(list) => self.bind_elements(&list.elts, &ty),
            Expr::Starred(starred) => self.bind_target(&starred.value, Type::List(Box::new(Type::Any))),
            other => {
                self.infer_expr(other);
            }
        }
    }

    fn bind_elements(&mut self, targets: &[Expr], ty: &Type) {
        for (i, target) in targets.iter().enumerate() {
            let element = match ty {
                Type::Tuple(items) if items.len() == targets.len() => items[i].clone(),
                other => element_type(other),
            };
            self.bind_target(target, element);
        }
    }

    fn is_type_var_declaration(&self, value: &Expr) -> bool {
        let Expr::Call(call) = value else {
            return false;
        };
        let fullname = match &*call.func {
            Expr::Name(name) if !self.ctx.contains(name.id.as_str()) => {
                self.imports.get(name.id.as_str()).cloned()
            }
            attribute @ Expr::Attribute(_) => self.dotted_fullname(attribute),
            _ => None,
        };
        fullname.map_or(false, |name| TYPE_VAR_NAMES.contains(&name.as_str()))
    }

    fn infer_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Constant(constant) => match &constant.value {
                Constant::None => Type::None,
                Constant::Bool(_) => Type::Bool,
                Constant::Int(_) => Type::Int,
                Constant::Float(_) => Type::Float,
                Constant::Str(_) => Type::Str,
                Constant::Bytes(_) => Type::Bytes,
                _ => Type::Any,
            },

            Expr::Name(name) => self.lookup_name(name.id.as_str()),

            Expr::Attribute(attribute) => match self.dotted_fullname(expr) {
                Some(fullname) => self.index.lookup(&fullname).cloned().unwrap_or(Type::Any),
                None => {
                    self.infer_expr(&attribute.value);
                    Type::Any
                }
            },

            Expr::Call(call) => {
                if let Expr::Name(name) = &*call.func {
                    if name.id.as_str() == REVEAL_TYPE && !self.ctx.contains(REVEAL_TYPE) {
                        return self.reveal(expr, &call.args);
                    }
                }

                let target = self.call_target(&call.func);
                let mut actuals = Vec::with_capacity(call.args.len() + call.keywords.len());
                for arg in &call.args {
                    match arg {
                        Expr::Starred(starred) => actuals.push(Actual::star(self.infer_expr(&starred.value))),
                        other => actuals.push(Actual::positional(self.infer_expr(other))),
                    }
                }
                for keyword in &call.keywords {
                    let ty = self.infer_expr(&keyword.value);
                    actuals.push(match &keyword.arg {
                        Some(name) => Actual::named(name.as_str(), ty),
                        None => Actual::star_star(ty),
                    });
                }
                let location = expr.source_location(&self.lines);
                self.call(&target, &actuals, location)
            }

            Expr::Await(await_expr) => match self.infer_expr(&await_expr.value) {
                Type::Generic(name, mut args) if name == "Coroutine" && args.len() == 3 => {
                    args.pop().unwrap_or(Type::Any)
                }
                _ => Type::Any,
            },

            Expr::List(list) => {
                let items: Vec<Type> = list.elts.iter().map(|e| self.infer_expr(e)).collect();
                Type::List(Box::new(self.join(items)))
            }

            Expr::Tuple(tuple) => Type::Tuple(tuple.elts.iter().map(|e| self.infer_expr(e)).collect()),

            Expr::Set(set) => {
                let items: Vec<Type> = set.elts.iter().map(|e| self.infer_expr(e)).collect();
                Type::generic("set", vec![self.join(items)])
            }

            Expr::Dict(dict) => {
                let mut keys = Vec::with_capacity(dict.keys.len());
                let mut values = Vec::with_capacity(dict.values.len());
                for (key, value) in dict.keys.iter().zip(&dict.values) {
                    let value_ty = self.infer_expr(value);
                    match key {
                        Some(key) => {
                            keys.push(self.infer_expr(key));
                            values.push(value_ty);
                        }
                        // `**other`
                        None => match value_ty {
                            Type::Dict(k, v) => {
                                keys.push(*k);
                                values.push(*v);
                            }
                            _ => {
                                keys.push(Type::Any);
                                values.push(Type::Any);
                            }
                        },
                    }
                }
                Type::Dict(Box::new(self.join(keys)), Box::new(self.join(values)))
            }

            Expr::BinOp(binop) => {
                let left = self.infer_expr(&binop.left);
                let right = self.infer_expr(&binop.right);
                binary_result(binop.op, &left, &right)
            }

            Expr::UnaryOp(unary) => {
                let operand = self.infer_expr(&unary.operand);
                match unary.op {
                    UnaryOp::Not => Type::Bool,
                    _ => match operand {
                        Type::Bool => Type::Int,
                        other => other,
                    },
                }
            }

            Expr::BoolOp(boolop) => {
                let values: Vec<Type> = boolop.values.iter().map(|v| self.infer_expr(v)).collect();
                Type::union(values)
            }

            Expr::Compare(compare) => {
                self.infer_expr(&compare.left);
                for comparator in &compare.comparators {
                    self.infer_expr(comparator);
                }
                Type::Bool
            }

            Expr::IfExp(ifexp) => {
                self.infer_expr(&ifexp.test);
                let body = self.infer_expr(&ifexp.body);
                let orelse = self.infer_expr(&ifexp.orelse);
                Type::union(vec![body, orelse])
            }

            Expr::Lambda(lambda) => {
                let signature = self.signature(&lambda.args, None, false);
                let mut ret = Type::Any;
                self.in_scope(|checker| {
                    for param in &signature.params {
                        if let Some(name) = &param.name {
                            checker.ctx.set_type(name.clone(), param.ty.clone());
                        }
                    }
                    ret = checker.infer_expr(&lambda.body);
                });
                Type::Callable(signature.with_ret(ret))
            }

            Expr::Subscript(subscript) => {
                let value = self.infer_expr(&subscript.value);
                self.infer_expr(&subscript.slice);
                match (value, &*subscript.slice) {
                    (Type::List(elem), Expr::Slice(_)) => Type::List(elem),
                    (Type::List(elem), _) => *elem,
                    (Type::Dict(_, value), _) => *value,
                    (Type::Str, _) => Type::Str,
                    (Type::Tuple(items), Expr::Constant(c)) => match &c.value {
                        Constant::Int(i) => i
                            .to_string()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| items.get(i).cloned())
                            .unwrap_or(Type::Any),
                        _ => Type::Any,
                    },
                    (Type::Tuple(items), _) => Type::union(items),
                    _ => Type::Any,
                }
            }

            Expr::JoinedStr(joined) => {
                for value in &joined.values {
                    self.infer_expr(value);
                }
                Type::Str
            }

            Expr::FormattedValue(formatted) => {
                self.infer_expr(&formatted.value);
                Type::Str
            }

            Expr::Starred(starred) => self.infer_expr(&starred.value),

            Expr::NamedExpr(named) => {
                let value = self.infer_expr(&named.value);
                self.bind_target(&named.target, value.clone());
                value
            }

            Expr::ListComp(_) => Type::List(Box::new(Type::Any)),
            Expr::SetComp(_) => Type::generic("set", vec![Type::Any]),
            Expr::DictComp(_) => Type::Dict(Box::new(Type::Any), Box::new(Type::Any)),

            _ => Type::Any,
        }
    }

    /// Element type of a literal container; unknown when it is empty.
    fn join(&self, items: Vec<Type>) -> Type {
        if items.is_empty() {
            self.ctx.fresh_var()
        } else {
            Type::union(items)
        }
    }

    fn reveal(&mut self, call: &Expr, args: &[Expr]) -> Type {
        let ty = args.first().map_or(Type::Any, |arg| self.infer_expr(arg));
        if self.show_revealed {
            let location = call.source_location(&self.lines);
            self.report(TypeError::revealed(&ty, location));
        }
        ty
    }

    fn lookup_name(&self, name: &str) -> Type {
        if let Some(ty) = self.ctx.get_type(name) {
            return ty;
        }
        if let Some(fullname) = self.imports.get(name) {
            return self.index.lookup(fullname).cloned().unwrap_or(Type::Any);
        }
        self.index
            .lookup(&format!("builtins.{}", name))
            .cloned()
            .unwrap_or(Type::Any)
    }

    /// Fully-qualified name of a call target named `name`.
    fn callee_fullname(&self, name: &str) -> Option<String> {
        if self.ctx.contains(name) {
            return None;
        }
        if let Some(fullname) = self.imports.get(name) {
            return Some(self.index.canonical(fullname));
        }
        let builtin = format!("builtins.{}", name);
        self.index.contains(&builtin).then_some(builtin)
    }

    /// `a.b.c` where `a` is an imported module or name.
    fn dotted_fullname(&self, expr: &Expr) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = expr;
        loop {
            match current {
                Expr::Attribute(attribute) => {
                    segments.push(attribute.attr.as_str());
                    current = &attribute.value;
                }
                Expr::Name(name) => {
                    if self.ctx.contains(name.id.as_str()) {
                        return None;
                    }
                    let head = self.imports.get(name.id.as_str())?;
                    segments.reverse();
                    return Some(format!("{}.{}", head, segments.join(".")));
                }
                _ => return None,
            }
        }
    }

    fn call_target(&mut self, func: &Expr) -> CallTarget {
        match func {
            Expr::Name(name) => CallTarget {
                fullname: self.callee_fullname(name.id.as_str()),
                name: name.id.to_string(),
                ty: self.lookup_name(name.id.as_str()),
            },
            Expr::Attribute(attribute) => match self.dotted_fullname(func) {
                Some(fullname) => CallTarget {
                    ty: self.index.lookup(&fullname).cloned().unwrap_or(Type::Any),
                    fullname: Some(self.index.canonical(&fullname)),
                    name: attribute.attr.to_string(),
                },
                None => {
                    self.infer_expr(&attribute.value);
                    CallTarget { fullname: None, name: attribute.attr.to_string(), ty: Type::Any }
                }
            },
            other => {
                let ty = self.infer_expr(other);
                CallTarget { fullname: None, name: ty.to_string(), ty }
            }
        }
    }

    /// Type of calling `target` with `actuals`. A hook for the target gets
    /// the last word; a failed call or a failed hook gives `Any`.
    fn call(&mut self, target: &CallTarget, actuals: &[Actual], location: SourceLocation) -> Type {
        let bound = match &target.ty {
            Type::Any | Type::Var(_) => return Type::Any,
            Type::Callable(callable) => bind_call(&target.name, callable, actuals, &location)
                .map(|(groups, ret)| (callable.clone(), groups, ret)),
            Type::Overloaded(items) => items
                .iter()
                .find_map(|item| {
                    bind_call(&target.name, item, actuals, &location)
                        .ok()
                        .map(|(groups, ret)| (item.clone(), groups, ret))
                })
                .ok_or_else(|| {
                    TypeError::new(
                        ErrorKind::NoMatchingOverload { callee: target.name.clone() },
                        location.clone(),
                    )
                }),
            other => Err(TypeError::new(
                ErrorKind::NonCallable { ty: other.to_string() },
                location.clone(),
            )),
        };

        let (callee, groups, default) = match bound {
            Ok(bound) => bound,
            Err(error) => {
                self.report(error);
                return Type::Any;
            }
        };

        let Some(fullname) = &target.fullname else {
            return default;
        };
        let Some(strategy) = self.plugins.get_function_hook(fullname) else {
            return default;
        };

        debug!(fullname = %fullname, strategy = strategy.name(), "Running call hook");
        let ctx = FunctionContext {
            fullname: fullname.clone(),
            arg_types: collect(&groups, |a| a.ty.clone(), actuals),
            arg_kinds: collect(&groups, |a| a.kind, actuals),
            arg_names: collect(&groups, |a| a.name.clone(), actuals),
            callee_arg_names: callee.params.iter().map(|p| p.name.clone()).collect(),
            callee_type: Type::Callable(callee),
            default_return_type: default,
            file: self.file.clone(),
            location,
        };

        match strategy.invoke(&ctx) {
            Ok(ty) => ty,
            Err(error) => {
                self.report(error);
                Type::Any
            }
        }
    }
}

/// Map `actuals` onto `callable` and instantiate its return type.
fn bind_call(
    callee: &str,
    callable: &CallableType,
    actuals: &[Actual],
    location: &SourceLocation,
) -> Result<(Vec<Vec<usize>>, Type), TypeError> {
    let groups = map_actuals(actuals, &callable.params)
        .map_err(|e| e.into_type_error(callee, &callable.params, location.clone()))?;
    if callable.is_ellipsis() {
        return Ok((groups, erase_unsolved(&callable.ret)));
    }

    let mut subst = Substitution::new();
    for (formal, group) in callable.params.iter().zip(&groups) {
        for &i in group {
            let actual = actuals[i].value_type();
            if !subst.bind(&formal.ty, &actual) {
                return Err(TypeError::invalid_arg_type(
                    i + 1,
                    callee,
                    &subst.apply(&formal.ty),
                    &actual,
                    location.clone(),
                ));
            }
        }
    }

    let ret = subst.instantiate(callable, &callable.ret);
    Ok((groups, ret))
}

fn collect<T>(groups: &[Vec<usize>], field: impl Fn(&Actual) -> T, actuals: &[Actual]) -> Vec<Vec<T>> {
    groups
        .iter()
        .map(|group| group.iter().map(|&i| field(&actuals[i])).collect())
        .collect()
}

fn element_type(iterable: &Type) -> Type {
    match iterable {
        Type::List(elem) => (**elem).clone(),
        Type::Dict(key, _) => (**key).clone(),
        Type::Tuple(items) => Type::union(items.clone()),
        Type::Generic(_, args) if args.len() == 1 => args[0].clone(),
        Type::Str => Type::Str,
        _ => Type::Any,
    }
}

fn numeric(ty: &Type) -> bool {
    matches!(ty, Type::Bool | Type::Int | Type::Float)
}

fn binary_result(op: Operator, left: &Type, right: &Type) -> Type {
    match (left, right) {
        _ if numeric(left) && numeric(right) => match op {
            Operator::Div => Type::Float,
            _ if *left == Type::Float || *right == Type::Float => Type::Float,
            Operator::BitAnd | Operator::BitOr | Operator::BitXor
                if *left == Type::Bool && *right == Type::Bool =>
            {
                Type::Bool
            }
            _ => Type::Int,
        },
        (Type::Str, Type::Str) if op == Operator::Add => Type::Str,
        (Type::Str, _) if op == Operator::Mod => Type::Str,
        (Type::Bytes, Type::Bytes) if op == Operator::Add => Type::Bytes,
        (Type::List(a), Type::List(b)) if op == Operator::Add => {
            Type::List(Box::new(Type::union(vec![(**a).clone(), (**b).clone()])))
        }
        _ => Type::Any,
    }
}

/// Check one source file with the plugins named in `config`.
pub fn check_source(file: &str, source: &str, config: &Config) -> Result<CheckReport, String> {
    let plugins = load_plugins(&config.plugins, crate::VERSION)?;
    check_source_with(file, source, config, &plugins)
}

/// Check one source file with an already loaded plugin chain.
#[instrument(skip(source, config, plugins), fields(plugins = plugins.len()))]
pub fn check_source_with(
    file: &str,
    source: &str,
    config: &Config,
    plugins: &PluginChain,
) -> Result<CheckReport, String> {
    if !config.check.enabled {
        debug!("Checking disabled");
        return Ok(CheckReport::empty(file));
    }

    let ast = parse_module_at(source, file)?;
    let mut checker = TypeChecker::new(MAIN_MODULE, plugins, crate::analysis::stubs::bundled())
        .with_file(file)
        .with_max_errors(config.errors.max_errors)
        .with_revealed_types(config.check.show_revealed_types);
    checker.check(&ast, source);

    let mut report = checker.into_report();
    if !config.errors.show_suggestions {
        for diagnostic in &mut report.diagnostics {
            diagnostic.suggestions.clear();
        }
    }
    Ok(report)
}
