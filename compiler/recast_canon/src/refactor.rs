//! The refactoring driver.
//!
//! Runs the whole pipeline on one host expression and decides whether the
//! result is worth offering:
//!
//! ```text
//! analyze → expand → canonicalize ─┬─ equal to expanded input → NoChange
//!                                  ├─ nothing structural left → OpaqueOnly
//!                                  └─ synthesize → check_bindings → Refactoring
//! ```

use recast_ir::{Node, SemanticOracle, SourceExpr};

use crate::{
    analyze, canonicalize, check_bindings, expand, synthesize, RecastConfig, Rejection, Synthesis,
};

/// An accepted refactoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Refactoring {
    /// The canonical tree the output was synthesized from.
    pub canonical: Node,
    pub synthesis: Synthesis,
}

/// Refactor `expr` into pattern form, or explain why not.
pub fn refactor(
    expr: &SourceExpr,
    oracle: &dyn SemanticOracle,
    config: &RecastConfig,
) -> Result<Refactoring, Rejection> {
    let result = run(expr, oracle, config);
    match &result {
        Ok(refactoring) => tracing::debug!(
            expr = ?expr.id,
            output = %refactoring.synthesis.expr,
            "refactoring offered"
        ),
        Err(rejection) => tracing::debug!(expr = ?expr.id, %rejection, "refactoring rejected"),
    }
    result
}

fn run(
    expr: &SourceExpr,
    oracle: &dyn SemanticOracle,
    config: &RecastConfig,
) -> Result<Refactoring, Rejection> {
    let analyzed = analyze(expr, oracle).ok_or(Rejection::Unanalyzable)?;
    let expanded = expand(&analyzed);
    let canonical = canonicalize(&expanded, config);

    if canonical == expanded {
        return Err(Rejection::NoChange);
    }
    if !has_structural_test(&canonical) {
        return Err(Rejection::OpaqueOnly);
    }

    let synthesis = synthesize(&canonical, config)?;
    let output = synthesis.clone().into_expr();
    check_bindings(&output, &config.binding_policy)
        .map_err(|symbol| Rejection::IllegalBinding { symbol })?;

    Ok(Refactoring {
        canonical,
        synthesis,
    })
}

/// Returns `true` if anything other than opaque operations and boolean
/// constants survived canonicalization.
fn has_structural_test(node: &Node) -> bool {
    node.any(&mut |n| match n {
        Node::Pair(_) | Node::Constant(_) | Node::Relational(_) => true,
        Node::Eval(evaluation) => !evaluation.is_operation(),
        _ => false,
    })
}
