//! Factoring: negation push-down and grouping by shared input.
//!
//! # Algorithm
//!
//! The reducer walks the tree carrying a *sense* (whether the subtree is
//! read positively or negated):
//!
//! 1. `Not(x)` visits `x` with the sense flipped; sequences flip kind under
//!    negation (De Morgan).
//! 2. A leaf test is taken apart along its input chain and rebuilt as nested
//!    pairs, innermost step last: `a.b.c == 1` becomes
//!    `a is (b is (c is (== 1)))`. A negated leaf is negated at the bottom.
//! 3. Sequence children are reduced, then [`combine`]d: pairs with
//!    structurally equal inputs are merged into one pair whose pattern is
//!    the combination of theirs, and negated constants are gathered into a
//!    single negated sequence.
//!
//! Negation is never pushed *into* a pair. `!(x is p)` holds when `x` is
//! null but `x is !p` does not, so a negated pair stays a `Not(Pair)`.
//!
//! The transform is total and terminates on every input; "nothing to do"
//! shows up as an output equal to the input.

use std::sync::Arc;

use recast_ir::{Evaluation, Node, SequenceKind};
use rustc_hash::FxHashMap;

/// Reduce `node` to canonical factored form.
pub fn reduce(node: &Node) -> Node {
    let reduced = reduce_with_sense(node, true);
    tracing::debug!(%reduced, "reduced");
    reduced
}

fn reduce_with_sense(node: &Node, sense: bool) -> Node {
    recast_stack::ensure_sufficient_stack(|| match node {
        Node::True | Node::False => {
            if sense {
                node.clone()
            } else {
                Node::not(node.clone())
            }
        }
        Node::Not(inner) => reduce_with_sense(inner, !sense),
        Node::And(children) | Node::Or(children) => {
            let kind = match node {
                Node::And(_) => SequenceKind::And,
                _ => SequenceKind::Or,
            };
            let kind = if sense { kind } else { kind.negate() };
            let reduced: Vec<Node> = children
                .iter()
                .map(|child| reduce_with_sense(child, sense))
                .collect();
            combine(kind, reduced)
        }
        Node::Pair(pair) => {
            let pattern = reduce_with_sense(&pair.pattern, true);
            let factored = wrap(&pair.input, pattern);
            if sense {
                factored
            } else {
                Node::not(factored)
            }
        }
        Node::Eval(evaluation) if evaluation.is_operation() => {
            if sense {
                node.clone()
            } else {
                Node::not(node.clone())
            }
        }
        Node::Constant(_) | Node::Relational(_) | Node::Eval(_) => {
            let leaf = node.with_test_input(None);
            let leaf = if sense { leaf } else { Node::not(leaf) };
            match node.test_input() {
                Some(input) => wrap(input, leaf),
                None => leaf,
            }
        }
    })
}

/// Wrap `pattern` in one pair per step of `chain`, root outermost.
fn wrap(chain: &Arc<Evaluation>, pattern: Node) -> Node {
    chain
        .steps()
        .iter()
        .fold(pattern, |inner, step| Node::pair(step.strip(), inner))
}

/// Slot of a combined child, in first-seen order.
enum Slot {
    Keep(Node),
    Group(usize),
    NegatedConstants,
}

/// Combine already-reduced children into a sequence of `kind`.
///
/// - pairs are grouped by input; each group becomes one pair whose pattern
///   is the combination (recursively) of the group's patterns
/// - negated constants on the current value are gathered into
///   `Not(kind.negate()(constants...))`
/// - everything else is kept
///
/// Every group, and the gathered constants, take the slot of their first
/// member, so relative order is preserved.
pub(crate) fn combine(kind: SequenceKind, children: Vec<Node>) -> Node {
    let mut slots: Vec<Slot> = Vec::with_capacity(children.len());
    let mut groups: Vec<(Arc<Evaluation>, Vec<Node>)> = Vec::new();
    let mut group_index: FxHashMap<Arc<Evaluation>, usize> = FxHashMap::default();
    let mut negated_constants: Vec<Node> = Vec::new();

    let mut place = |child: Node| match child {
        Node::Pair(pair) => {
            let index = *group_index.entry(Arc::clone(&pair.input)).or_insert_with(|| {
                groups.push((Arc::clone(&pair.input), Vec::new()));
                slots.push(Slot::Group(groups.len() - 1));
                groups.len() - 1
            });
            groups[index].1.push(Arc::unwrap_or_clone(pair.pattern));
        }
        Node::Not(ref inner) if is_current_constant(&child) => {
            if negated_constants.is_empty() {
                slots.push(Slot::NegatedConstants);
            }
            negated_constants.push((**inner).clone());
        }
        other => slots.push(Slot::Keep(other)),
    };

    for child in children {
        match child.as_sequence() {
            Some((child_kind, nested)) if child_kind == kind => {
                for grandchild in nested.iter().cloned() {
                    place(grandchild);
                }
            }
            _ => place(child),
        }
    }

    let mut groups: Vec<Option<(Arc<Evaluation>, Vec<Node>)>> =
        groups.into_iter().map(Some).collect();
    let mut negated_constants = Some(negated_constants);
    let combined = slots.into_iter().filter_map(|slot| match slot {
        Slot::Keep(node) => Some(node),
        Slot::Group(index) => groups[index].take().map(|(input, patterns)| {
            tracing::trace!(input = %input, members = patterns.len(), "group");
            Node::pair(input, combine(kind, patterns))
        }),
        Slot::NegatedConstants => negated_constants
            .take()
            .map(|constants| Node::not(Node::sequence(kind.negate(), constants))),
    });
    Node::sequence(kind, combined.collect::<Vec<_>>())
}

/// `!(== k)` on the current value.
fn is_current_constant(node: &Node) -> bool {
    node.as_negated_constant()
        .is_some_and(|test| test.input.is_none())
}
