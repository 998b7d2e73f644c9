//! Markup literals compiled into code that builds HTML-like trees.
//!
//! Source text is parsed by [semantics::parse_program] into a [syntax::Program],
//! its markup literals are rewritten by [compiler::compile_program], and the result
//! is printed by [translators::JavaScript] or run by [eval::Evaluator] against the
//! [runtime] support module.

pub mod compiler;
pub mod dom;
pub mod error;
pub mod eval;
pub mod introspect;
pub mod normalize;
pub mod parser;
pub mod runtime;
pub mod semantics;
pub mod syntax;
pub mod translation;
pub mod translators;

pub use compiler::{compile_program, Config, EmitMode};
pub use dom::{AnyNode, Builder, Representation};
pub use error::{CompileError, RuntimeError};
