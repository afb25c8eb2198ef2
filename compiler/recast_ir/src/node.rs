//! The node model.
//!
//! A [`Node`] is an immutable boolean test over the current value. Trees are
//! built bottom-up by the factory and rebuilt (never edited) by every pass.
//!
//! # Equality
//!
//! Equality and hashing are structural: derived impls recurse through `Arc`
//! (whose `PartialEq`/`Hash` delegate to the pointee), so two independently
//! built trees describing the same test compare equal. Sequences compare as
//! ordered lists; canonical ordering is the reducer's job, not equality's.
//! This is what lets the driver detect "nothing changed" by comparing the
//! canonical tree with its input.
//!
//! # Construction
//!
//! Sequences and negations are only built through [`Node::sequence`] and
//! [`Node::not`], which simplify eagerly, so no caller ever sees an
//! unflattened sequence, a sequence containing its identity element, or a
//! double negation.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::evaluation::{Evaluation, Input};
use crate::{ConstValue, ExprId, Symbol, TypeId};

/// Kind of an n-ary boolean sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    And,
    Or,
}

impl SequenceKind {
    /// The dual kind (De Morgan).
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            SequenceKind::And => SequenceKind::Or,
            SequenceKind::Or => SequenceKind::And,
        }
    }

    /// Element dropped from the sequence (`True` for `And`).
    pub const fn identity(self) -> Node {
        match self {
            SequenceKind::And => Node::True,
            SequenceKind::Or => Node::False,
        }
    }

    /// Element that decides the whole sequence (`False` for `And`).
    pub const fn absorbing(self) -> Node {
        match self {
            SequenceKind::And => Node::False,
            SequenceKind::Or => Node::True,
        }
    }
}

/// Relational operator of a [`RelationalTest`], with the value on the right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// The operator after swapping operands: `k < v` is `v > k`.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            RelOp::Lt => RelOp::Gt,
            RelOp::Le => RelOp::Ge,
            RelOp::Gt => RelOp::Lt,
            RelOp::Ge => RelOp::Le,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }
}

/// "`input` is (`pattern`)": the pattern tested against the value of one
/// access step. The unit of factoring.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pair {
    pub input: Arc<Evaluation>,
    pub pattern: Arc<Node>,
}

/// Equality against a constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstantTest {
    pub input: Input,
    pub value: ConstValue,
}

/// Ordering comparison against a constant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationalTest {
    pub input: Input,
    pub op: RelOp,
    pub value: ConstValue,
}

/// A boolean test over the current value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    True,
    False,
    Not(Arc<Node>),
    And(Arc<[Node]>),
    Or(Arc<[Node]>),
    Pair(Pair),
    Constant(ConstantTest),
    Relational(RelationalTest),
    /// An access step used as a test. Boolean-valued steps (`Member`,
    /// `Index`, `OutVariable`) test for `true`; `NotNull`, `Type` and
    /// `Variable` test what they name; `Operation` is the opaque expression.
    Eval(Arc<Evaluation>),
}

impl Node {
    /// Conjunction of `children`, simplified.
    pub fn and(children: impl IntoIterator<Item = Node>) -> Node {
        Self::sequence(SequenceKind::And, children)
    }

    /// Disjunction of `children`, simplified.
    pub fn or(children: impl IntoIterator<Item = Node>) -> Node {
        Self::sequence(SequenceKind::Or, children)
    }

    /// Build a sequence of `kind`, simplifying as it goes.
    ///
    /// - nested sequences of the same kind are flattened into this one
    /// - the identity element is dropped
    /// - the absorbing element decides the whole sequence
    /// - structurally equal children are kept once (first occurrence)
    /// - zero children give the identity, one child gives that child
    pub fn sequence(kind: SequenceKind, children: impl IntoIterator<Item = Node>) -> Node {
        let mut buffer: Vec<Node> = Vec::new();
        for child in children {
            let absorbed = match child.as_sequence() {
                Some((child_kind, nested)) if child_kind == kind => nested
                    .iter()
                    .any(|grandchild| push_child(kind, grandchild.clone(), &mut buffer)),
                _ => push_child(kind, child, &mut buffer),
            };
            if absorbed {
                return kind.absorbing();
            }
        }
        match buffer.len() {
            0 => kind.identity(),
            1 => buffer.pop().unwrap_or_else(|| kind.identity()),
            _ => match kind {
                SequenceKind::And => Node::And(Arc::from(buffer)),
                SequenceKind::Or => Node::Or(Arc::from(buffer)),
            },
        }
    }

    /// Negation, simplified.
    ///
    /// `!true` is `false` and `!!x` is `x`. A negated relational test keeps
    /// its `Not`: `!(v < k)` also holds for a null `v` (or one of another
    /// type), which `v >= k` does not.
    pub fn not(operand: Node) -> Node {
        match operand {
            Node::True => Node::False,
            Node::False => Node::True,
            Node::Not(inner) => Arc::unwrap_or_clone(inner),
            other => Node::Not(Arc::new(other)),
        }
    }

    pub fn pair(input: Arc<Evaluation>, pattern: Node) -> Node {
        debug_assert!(
            !input.is_operation(),
            "an operation cannot be the input of a pair"
        );
        Node::Pair(Pair {
            input,
            pattern: Arc::new(pattern),
        })
    }

    pub fn constant(input: Input, value: ConstValue) -> Node {
        Node::Constant(ConstantTest { input, value })
    }

    pub fn relational(input: Input, op: RelOp, value: ConstValue) -> Node {
        Node::Relational(RelationalTest { input, op, value })
    }

    pub fn eval(evaluation: Arc<Evaluation>) -> Node {
        Node::Eval(evaluation)
    }

    pub fn not_null(input: Input) -> Node {
        Node::Eval(Evaluation::not_null(input))
    }

    pub fn type_test(input: Input, ty: TypeId) -> Node {
        Node::Eval(Evaluation::type_test(input, ty))
    }

    pub fn variable(input: Input, symbol: Symbol) -> Node {
        Node::Eval(Evaluation::variable(input, symbol))
    }

    pub fn operation(expr: ExprId) -> Node {
        Node::Eval(Evaluation::operation(expr))
    }

    /// The kind and children of an `And`/`Or`.
    pub fn as_sequence(&self) -> Option<(SequenceKind, &[Node])> {
        match self {
            Node::And(children) => Some((SequenceKind::And, children)),
            Node::Or(children) => Some((SequenceKind::Or, children)),
            _ => None,
        }
    }

    /// The access chain a leaf test reads from.
    ///
    /// For `Eval` this is the evaluation's own input: `x.P` as a boolean
    /// test reads `P` from `x`.
    pub fn test_input(&self) -> Option<&Arc<Evaluation>> {
        match self {
            Node::Constant(test) => test.input.as_ref(),
            Node::Relational(test) => test.input.as_ref(),
            Node::Eval(evaluation) => evaluation.input(),
            _ => None,
        }
    }

    /// A copy of a leaf test reading from `input`. Other nodes are returned
    /// unchanged.
    pub fn with_test_input(&self, input: Input) -> Node {
        match self {
            Node::Constant(test) => Node::constant(input, test.value.clone()),
            Node::Relational(test) => Node::relational(input, test.op, test.value.clone()),
            Node::Eval(evaluation) if !evaluation.is_operation() => {
                Node::Eval(Arc::new(evaluation.with_input(input)))
            }
            other => other.clone(),
        }
    }

    /// `Not(Constant)`: a negative equality test.
    pub fn as_negated_constant(&self) -> Option<&ConstantTest> {
        match self {
            Node::Not(inner) => match &**inner {
                Node::Constant(test) => Some(test),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` if the node is a bare opaque operation.
    pub fn is_operation(&self) -> bool {
        matches!(self, Node::Eval(evaluation) if evaluation.is_operation())
    }

    /// Returns `true` if `predicate` holds for this node or any node below
    /// it (pair patterns included, access chains excluded).
    pub fn any(&self, predicate: &mut impl FnMut(&Node) -> bool) -> bool {
        if predicate(self) {
            return true;
        }
        recast_stack::ensure_sufficient_stack(|| match self {
            Node::Not(inner) => inner.any(predicate),
            Node::And(children) | Node::Or(children) => {
                children.iter().any(|child| child.any(predicate))
            }
            Node::Pair(pair) => pair.pattern.any(predicate),
            _ => false,
        })
    }

    /// Structural fingerprint, stable for structurally equal trees.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Push one non-sequence child; returns `true` if it absorbs the sequence.
fn push_child(kind: SequenceKind, child: Node, buffer: &mut Vec<Node>) -> bool {
    if child == kind.absorbing() {
        return true;
    }
    if child != kind.identity() && !buffer.contains(&child) {
        buffer.push(child);
    }
    false
}
