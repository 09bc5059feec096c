//! Refinement strategies, one module per kind of `returns` call target.
//! Each module exposes `analyze`, the function wrapped in a [`Strategy`].
//!
//! [`Strategy`]: crate::plugin::Strategy

pub mod curry;
pub mod decorators;
pub mod flow;
pub mod partial;
pub mod pointfree;
