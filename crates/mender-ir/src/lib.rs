//! Target-language IR for the mender repair engine.
//!
//! The repair target is a small, pure, lazily evaluated functional language
//! with Haskell-style surface syntax. This crate owns its AST, type
//! representation, site paths (the location currency of fixes), the parser,
//! and the `Problem` record every other layer consumes.

pub mod expr;
pub mod parse;
pub mod types;

pub use expr::{Expr, Literal, SitePath};
pub use parse::{
    parse_declarations, parse_expr_text, parse_problem, parse_type_text, Declarations, ParseError,
};
pub use types::{Binding, Problem, Property, Scheme, Type};
