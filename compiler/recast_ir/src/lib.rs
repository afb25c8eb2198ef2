//! Recast IR - node model and boundary types
//!
//! This crate contains the data structures shared by every Recast pass:
//! - Opaque host IDs (symbols, types, expressions, deconstruct methods)
//! - Folded constants
//! - Access-chain steps ([`Evaluation`]) and the boolean [`Node`] tree
//! - The bound source tree the host hands in ([`SourceExpr`])
//! - The synthesized output ([`Pattern`], [`Expr`])
//!
//! # Design Philosophy
//!
//! - **Immutable Trees**: nodes are `Arc`-shared values; passes rebuild,
//!   never mutate
//! - **Structural Equality**: two trees describing the same test are equal,
//!   however they were built
//! - **Simplify at Construction**: sequences and negations are normalized by
//!   their constructors, so no pass sees a degenerate shape
//!
//! Floats are stored as u64 bits for Hash compatibility.

mod constant;
mod display;
pub mod evaluation;
mod ids;
pub mod node;
pub mod output;
pub mod source;

pub use constant::{ConstValue, IntegralKind};
pub use evaluation::{Container, DeconstructMethod, Evaluation, Input};
pub use ids::{ExprId, MethodId, Symbol, TypeId};
pub use node::{ConstantTest, Node, Pair, RelOp, RelationalTest, SequenceKind};
pub use output::{AccessPath, AccessStep, Expr, Pattern, PropertySubpattern, RecursivePattern};
pub use source::{
    BinaryOp, Conversion, PositionalSource, SemanticOracle, SourceBuilder, SourceExpr,
    SourceExprKind, SourcePattern, SourcePositional, SourceProperty, SourceRecursive,
};
