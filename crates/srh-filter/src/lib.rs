//! Row predicates for the SRH publication engine.
//!
//! Filter expressions are parsed once into a typed [`Predicate`] and then
//! evaluated column-wise against a [`srh_model::Dataset`]. The
//! [`FilterRegistry`] holds the named filters from the engine
//! configuration.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod token;

pub use ast::{CmpOp, Literal, Predicate, StrMethod};
pub use error::{FilterError, Result};
pub use eval::{filter_rows, mask};
pub use parser::parse;
pub use registry::{FilterRegistry, NamedFilter, dedupe};
