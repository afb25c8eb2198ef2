//! Source expression → node lowering.
//!
//! Translates the host's bound [`SourceExpr`] into a [`Node`] tree. Every
//! recognized construct gets a structural node; anything else becomes an
//! opaque operation, unless evaluating it may have side effects, in which
//! case the whole analysis fails (the engine would otherwise be free to
//! reorder or drop it).
//!
//! Already-structural source (`x is { P: 1 }`) lowers to the canonical
//! factored shape directly, so a round trip through the passes is a no-op.

mod pattern;

use std::sync::Arc;

use recast_ir::{
    BinaryOp, ConstValue, Evaluation, Node, RelOp, SemanticOracle, SourceExpr, SourceExprKind,
};
use smallvec::SmallVec;

/// Analyze a boolean source expression.
///
/// Returns `None` if any part of it has no safe translation.
pub fn analyze(expr: &SourceExpr, oracle: &dyn SemanticOracle) -> Option<Node> {
    let node = Factory { oracle }.visit(expr);
    match &node {
        Some(node) => tracing::debug!(%node, "analyzed"),
        None => tracing::debug!(expr = ?expr.id, "unanalyzable"),
    }
    node
}

/// An access chain plus the null guards its `?.` steps contribute.
struct Access {
    chain: Arc<Evaluation>,
    guards: SmallVec<[Node; 2]>,
}

impl Access {
    /// `guards && test`
    fn guarded(self, test: Node) -> Node {
        if self.guards.is_empty() {
            return test;
        }
        Node::and(self.guards.into_iter().chain(std::iter::once(test)))
    }
}

/// The constant side of a comparison.
enum Operand<'a> {
    Value(&'a ConstValue),
    Null,
}

fn constant_operand(expr: &SourceExpr) -> Option<Operand<'_>> {
    match &expr.kind {
        SourceExprKind::Literal(value) => Some(Operand::Value(value)),
        SourceExprKind::Null => Some(Operand::Null),
        _ => None,
    }
}

struct Factory<'o> {
    oracle: &'o dyn SemanticOracle,
}

impl Factory<'_> {
    fn visit(&self, expr: &SourceExpr) -> Option<Node> {
        recast_stack::ensure_sufficient_stack(|| self.visit_inner(expr))
    }

    fn visit_inner(&self, expr: &SourceExpr) -> Option<Node> {
        match &expr.kind {
            SourceExprKind::Literal(ConstValue::Bool(true)) => Some(Node::True),
            SourceExprKind::Literal(ConstValue::Bool(false)) => Some(Node::False),
            SourceExprKind::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => Some(Node::and([self.visit(left)?, self.visit(right)?])),
            SourceExprKind::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => Some(Node::or([self.visit(left)?, self.visit(right)?])),
            SourceExprKind::Binary { op, left, right } => self.comparison(expr, *op, left, right),
            SourceExprKind::Not(operand) => Some(Node::not(self.visit(operand)?)),
            SourceExprKind::Is { operand, pattern } => match self.access(operand) {
                Some(access) => {
                    let pattern = self.pattern(pattern);
                    let pair = Node::pair(Arc::clone(&access.chain), pattern.clone());
                    if access.guards.is_empty() || !pattern::matches_null(&pattern) {
                        Some(access.guarded(pair))
                    } else {
                        // `a?.b is null` also holds when `a` is null.
                        let guards = Node::and(access.guards.iter().cloned());
                        Some(Node::or([Node::not(guards), access.guarded(pair)]))
                    }
                }
                None => self.opaque(expr),
            },
            SourceExprKind::Name(_)
            | SourceExprKind::Member { .. }
            | SourceExprKind::ConditionalMember { .. }
            | SourceExprKind::Element { .. } => match self.access(expr) {
                Some(access) => {
                    let test = Node::eval(Arc::clone(&access.chain));
                    Some(access.guarded(test))
                }
                None => self.opaque(expr),
            },
            _ => self.opaque(expr),
        }
    }

    /// `left op right` where one side is a constant or `null`.
    fn comparison(
        &self,
        expr: &SourceExpr,
        op: BinaryOp,
        left: &SourceExpr,
        right: &SourceExpr,
    ) -> Option<Node> {
        let (subject, constant, op) = match (constant_operand(left), constant_operand(right)) {
            (None, Some(constant)) => (left, constant, op),
            (Some(constant), None) => (right, constant, flip(op)),
            _ => return self.opaque(expr),
        };
        let Some(access) = self.access(subject) else {
            return self.opaque(expr);
        };
        let chain = Some(Arc::clone(&access.chain));

        // Positive test, and whether the comparison is its negation.
        let (test, negated) = match (op, constant) {
            (BinaryOp::Eq, Operand::Value(value)) => (Node::constant(chain, value.clone()), false),
            (BinaryOp::Ne, Operand::Value(value)) => (Node::constant(chain, value.clone()), true),
            (BinaryOp::Eq, Operand::Null) => (Node::not_null(chain), true),
            (BinaryOp::Ne, Operand::Null) => (Node::not_null(chain), false),
            (op, Operand::Value(value)) => match op.relational() {
                Some(rel) => (Node::relational(chain, rel, value.clone()), false),
                None => return self.opaque(expr),
            },
            // Lifted comparison against null; leave it alone.
            (_, Operand::Null) => return self.opaque(expr),
        };

        let test = access.guarded(test);
        Some(if negated { Node::not(test) } else { test })
    }

    /// Build the access chain for `expr`, or `None` if it is not one.
    fn access(&self, expr: &SourceExpr) -> Option<Access> {
        recast_stack::ensure_sufficient_stack(|| match &expr.kind {
            SourceExprKind::Name(symbol) => Some(Access {
                chain: Evaluation::name(*symbol),
                guards: SmallVec::new(),
            }),
            SourceExprKind::Member { receiver, member } => {
                let access = self.access(receiver)?;
                Some(Access {
                    chain: Evaluation::member(Some(access.chain), *member),
                    guards: access.guards,
                })
            }
            SourceExprKind::ConditionalMember { receiver, member } => {
                let mut access = self.access(receiver)?;
                access
                    .guards
                    .push(Node::not_null(Some(Arc::clone(&access.chain))));
                Some(Access {
                    chain: Evaluation::member(Some(access.chain), *member),
                    guards: access.guards,
                })
            }
            SourceExprKind::Element {
                receiver,
                index,
                container,
            } => {
                let SourceExprKind::Literal(ConstValue::Integral { value, .. }) = index.kind else {
                    return None;
                };
                let index = u32::try_from(value).ok()?;
                let access = self.access(receiver)?;
                Some(Access {
                    chain: Evaluation::index(Some(access.chain), *container, index),
                    guards: access.guards,
                })
            }
            SourceExprKind::Cast { operand, ty } => {
                let access = self.access(operand)?;
                Some(Access {
                    chain: Evaluation::type_test(Some(access.chain), *ty),
                    guards: access.guards,
                })
            }
            _ => None,
        })
    }

    /// An expression kept verbatim. Fails if it may have side effects.
    fn opaque(&self, expr: &SourceExpr) -> Option<Node> {
        if self.oracle.has_side_effects(expr) {
            tracing::debug!(expr = ?expr.id, "side-effecting operand");
            return None;
        }
        Some(Node::operation(expr.id))
    }
}

/// The operator after swapping operands. Equality is symmetric.
fn flip(op: BinaryOp) -> BinaryOp {
    match op.relational().map(RelOp::flip) {
        Some(RelOp::Lt) => BinaryOp::Lt,
        Some(RelOp::Le) => BinaryOp::Le,
        Some(RelOp::Gt) => BinaryOp::Gt,
        Some(RelOp::Ge) => BinaryOp::Ge,
        None => op,
    }
}
