//! Core type system components
//!
//! The static type model shared by the checker and by plugin strategies,
//! plus the type-variable solver used to instantiate generic signatures.

pub mod types;
pub mod unify;

pub use types::{ArgKind, CallableType, Param, Type, TypeContext};
pub use unify::{erase_unsolved, free_type_vars, Substitution};
