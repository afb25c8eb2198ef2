//! Normalization: lifting identity steps out of chains.
//!
//! `Type`, `NotNull` and `Variable` steps read a value without changing
//! it. When one sits inside a chain, or is itself the input of a pair,
//! it is lifted into the enclosing conjunction as an ordinary sibling test
//! and replaced by its own input:
//!
//! ```text
//! x is ((T) is ({ P: 1 }))   →   x is (T && { P: 1 })
//! ((T)x).P == 1              →   x is T && x.P == 1
//! ```
//!
//! Lifted tests and rebuilt sequences are regrouped the way [`reduce`]
//! groups them, so pairs that meet on a shared input after lifting are
//! merged in the same pass. Together with [`reduce`], repeated application
//! reaches a fixed point; [`canonicalize`] drives that loop.
//!
//! Variable bindings met on the way are recorded, and later top-level
//! references are resolved against them, the same way the expander does.

use std::sync::Arc;

use recast_ir::{Evaluation, Input, Node, SequenceKind};
use smallvec::SmallVec;

use crate::expand::{Aliases, Expander};
use crate::reduce::{combine, reduce};
use crate::RecastConfig;

/// Normalize `node`.
pub fn normalize(node: &Node) -> Node {
    let mut aliases = Aliases::default();
    let normalized = Normalizer {
        expander: Expander {
            aliases: &mut aliases,
        },
    }
    .node(node, &None);
    tracing::debug!(%normalized, "normalized");
    normalized
}

/// Reduce and normalize until nothing changes, or `config.max_rounds`
/// rounds have run.
pub fn canonicalize(node: &Node, config: &RecastConfig) -> Node {
    let mut current = normalize(&reduce(node));
    for round in 1..config.max_rounds {
        let next = normalize(&reduce(&current));
        if next == current {
            tracing::debug!(rounds = round, "canonical");
            return current;
        }
        current = next;
    }
    tracing::debug!(rounds = config.max_rounds, "round limit reached");
    current
}

/// Lifted identity tests, in chain order (root first).
type Hoisted = SmallVec<[Node; 2]>;

struct Normalizer<'a> {
    expander: Expander<'a>,
}

impl Normalizer<'_> {
    fn node(&mut self, node: &Node, context: &Input) -> Node {
        recast_stack::ensure_sufficient_stack(|| match node {
            Node::True | Node::False => node.clone(),
            Node::Not(inner) => Node::not(self.node(inner, context)),
            Node::And(children) => self.sequence(SequenceKind::And, children, context),
            Node::Or(children) => self.sequence(SequenceKind::Or, children, context),
            Node::Pair(pair) => {
                let input = self.expander.chain(&pair.input, context);
                let mut hoisted = Hoisted::new();
                let stripped = self.hoist(&input, context, &mut hoisted);
                let inner_context = match &stripped {
                    Some(stripped) => Some(stripped.rebase(context)),
                    None => context.clone(),
                };
                let pattern = self.node(&pair.pattern, &inner_context);
                let body = match stripped {
                    Some(stripped) => Node::pair(stripped, pattern),
                    None => pattern,
                };
                conjoin(hoisted, body)
            }
            Node::Eval(evaluation) if evaluation.is_operation() => node.clone(),
            Node::Eval(evaluation) if evaluation.is_identity_step() => {
                // The step itself is the test; only its input is lifted.
                let mut hoisted = Hoisted::new();
                let input = evaluation
                    .input()
                    .map(|input| self.expander.chain(input, context))
                    .and_then(|input| self.hoist(&input, context, &mut hoisted));
                if let Evaluation::Variable { symbol, .. } = **evaluation {
                    self.expander.bind(symbol, &input, context);
                }
                let test = node.with_test_input(input);
                conjoin(hoisted, test)
            }
            Node::Constant(_) | Node::Relational(_) | Node::Eval(_) => {
                let mut hoisted = Hoisted::new();
                let input = node
                    .test_input()
                    .map(|input| self.expander.chain(input, context))
                    .and_then(|input| self.hoist(&input, context, &mut hoisted));
                let test = node.with_test_input(input);
                conjoin(hoisted, test)
            }
        })
    }

    fn sequence(&mut self, kind: SequenceKind, children: &[Node], context: &Input) -> Node {
        let mut normalized = Vec::with_capacity(children.len());
        for child in children {
            normalized.push(self.node(child, context));
        }
        combine(kind, normalized)
    }

    /// Remove identity steps from `chain`, pushing a sibling test for each
    /// onto `hoisted`. Returns what is left of the chain (`None` if nothing).
    fn hoist(&mut self, chain: &Arc<Evaluation>, context: &Input, hoisted: &mut Hoisted) -> Input {
        recast_stack::ensure_sufficient_stack(|| {
            let input = match chain.input() {
                Some(input) => self.hoist(input, context, hoisted),
                None => None,
            };
            if chain.is_identity_step() {
                tracing::trace!(step = %chain, "hoist");
                if let Evaluation::Variable { symbol, .. } = **chain {
                    self.expander.bind(symbol, &input, context);
                }
                hoisted.push(Node::eval(Arc::new(chain.with_input(input.clone()))));
                return input;
            }
            if chain.input().map(Arc::as_ptr) == input.as_ref().map(Arc::as_ptr) {
                Some(Arc::clone(chain))
            } else {
                Some(Arc::new(chain.with_input(input)))
            }
        })
    }
}

/// `hoisted && test`, regrouped.
fn conjoin(hoisted: Hoisted, test: Node) -> Node {
    if hoisted.is_empty() {
        return test;
    }
    combine(SequenceKind::And, hoisted.into_iter().chain([test]).collect())
}
