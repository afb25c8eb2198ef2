//! Alias expansion.
//!
//! Replaces references to pattern variables with the access chain the
//! variable was bound to, so `x.Y is var v && v.Z == 1` reads as
//! `x.Y is var v && x.Y.Z == 1` and the reducer can see that both tests
//! share `x.Y`. The bindings themselves stay in the tree: opaque residual
//! expressions may still refer to them.
//!
//! Traversal is left to right and input first, matching the source
//! language's evaluation order, so a variable is always bound before any
//! node that could refer to it is visited.

use std::sync::Arc;

use recast_ir::{Evaluation, Input, Node, SequenceKind, Symbol};
use rustc_hash::FxHashMap;

/// Variable → the chain (relative to the top-level scope) it is bound to.
pub(crate) type Aliases = FxHashMap<Symbol, Arc<Evaluation>>;

/// Expand every variable reference in `node`.
pub fn expand(node: &Node) -> Node {
    let mut aliases = Aliases::default();
    let expanded = Expander {
        aliases: &mut aliases,
    }
    .node(node, &None);
    tracing::debug!(%expanded, bindings = aliases.len(), "expanded");
    expanded
}

pub(crate) struct Expander<'a> {
    pub(crate) aliases: &'a mut Aliases,
}

impl Expander<'_> {
    /// Expand `node`, whose chains are relative to `context`.
    pub(crate) fn node(&mut self, node: &Node, context: &Input) -> Node {
        recast_stack::ensure_sufficient_stack(|| match node {
            Node::True | Node::False => node.clone(),
            Node::Not(inner) => Node::not(self.node(inner, context)),
            Node::And(children) => self.sequence(SequenceKind::And, children, context),
            Node::Or(children) => self.sequence(SequenceKind::Or, children, context),
            Node::Pair(pair) => {
                let input = self.chain(&pair.input, context);
                let inner = Some(input.rebase(context));
                let pattern = self.node(&pair.pattern, &inner);
                Node::pair(input, pattern)
            }
            Node::Constant(_) | Node::Relational(_) => {
                let input = node.test_input().map(|input| self.chain(input, context));
                node.with_test_input(input)
            }
            Node::Eval(evaluation) => match &**evaluation {
                Evaluation::Operation { .. } => node.clone(),
                Evaluation::Variable { input, symbol } => {
                    let input = input.as_ref().map(|input| self.chain(input, context));
                    self.bind(*symbol, &input, context);
                    Node::variable(input, *symbol)
                }
                _ => Node::eval(self.chain(evaluation, context)),
            },
        })
    }

    fn sequence(&mut self, kind: SequenceKind, children: &[Node], context: &Input) -> Node {
        let mut expanded = Vec::with_capacity(children.len());
        for child in children {
            expanded.push(self.node(child, context));
        }
        Node::sequence(kind, expanded)
    }

    /// Record that `symbol` holds the value `input` reads (relative to
    /// `context`).
    pub(crate) fn bind(&mut self, symbol: Symbol, input: &Input, context: &Input) {
        let bound = match input {
            Some(input) => Some(input.rebase(context)),
            None => context.clone(),
        };
        if let Some(bound) = bound {
            tracing::trace!(%symbol, chain = %bound, "bind");
            self.aliases.insert(symbol, bound);
        }
    }

    /// `chain` with a bound variable at its root replaced by the variable's
    /// chain. Inside a pattern a root member is a member of the matched
    /// value, never a variable, so only top-level chains are rewritten.
    pub(crate) fn chain(&self, chain: &Arc<Evaluation>, context: &Input) -> Arc<Evaluation> {
        if context.is_some() || self.aliases.is_empty() {
            return Arc::clone(chain);
        }
        self.substitute(chain)
    }

    fn substitute(&self, chain: &Arc<Evaluation>) -> Arc<Evaluation> {
        recast_stack::ensure_sufficient_stack(|| match chain.input() {
            None => match **chain {
                Evaluation::Member {
                    input: None,
                    member,
                } => self
                    .aliases
                    .get(&member)
                    .map_or_else(|| Arc::clone(chain), Arc::clone),
                _ => Arc::clone(chain),
            },
            Some(input) => {
                let substituted = self.substitute(input);
                if Arc::ptr_eq(&substituted, input) {
                    Arc::clone(chain)
                } else {
                    Arc::new(chain.with_input(Some(substituted)))
                }
            }
        })
    }
}
