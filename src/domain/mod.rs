//! Domain layer - pure interception concepts with no external dependencies.
//!
//! This layer contains the vocabulary of the advice system:
//! - Join points (the invocation context advice sees)
//! - Pointcuts (predicates selecting join points)
//! - Advice kinds and callbacks
//! - Values and errors crossing the interceptor
//!
//! All types in this layer are pure and easily testable.

pub mod advice;
pub mod error;
pub mod join_point;
pub mod pointcut;
pub mod value;
