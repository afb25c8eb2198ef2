//! Source pattern → node lowering.
//!
//! Pattern nodes are relative to the value being matched: their chains
//! start at `None`, the enclosing `Pair`'s value.

use recast_ir::{
    ConstValue, Container, Evaluation, Node, PositionalSource, SourcePattern, SourcePositional,
    SourceRecursive, TypeId,
};

use super::Factory;

impl Factory<'_> {
    pub(super) fn pattern(&self, pattern: &SourcePattern) -> Node {
        recast_stack::ensure_sufficient_stack(|| match pattern {
            SourcePattern::Discard => Node::True,
            SourcePattern::Constant(value) => Node::constant(None, value.clone()),
            SourcePattern::Null => Node::not(Node::not_null(None)),
            SourcePattern::Relational(op, value) => Node::relational(None, *op, value.clone()),
            SourcePattern::Type { ty, input_type } => self.type_test(*ty, *input_type),
            SourcePattern::Declaration {
                ty: Some(ty),
                name,
                input_type,
            } => Node::and([self.type_test(*ty, *input_type), Node::variable(None, *name)]),
            SourcePattern::Declaration { ty: None, name, .. } => Node::variable(None, *name),
            SourcePattern::Not(inner) => Node::not(self.pattern(inner)),
            SourcePattern::And(left, right) => Node::and([self.pattern(left), self.pattern(right)]),
            SourcePattern::Or(left, right) => Node::or([self.pattern(left), self.pattern(right)]),
            SourcePattern::Recursive(recursive) => self.recursive(recursive),
        })
    }

    /// A type test, or just a null test when the static type implies it.
    fn type_test(&self, ty: TypeId, input_type: TypeId) -> Node {
        if self
            .oracle
            .classify_conversion(input_type, ty)
            .implies_type_test()
        {
            Node::not_null(None)
        } else {
            Node::type_test(None, ty)
        }
    }

    fn recursive(&self, recursive: &SourceRecursive) -> Node {
        let mut parts = Vec::with_capacity(2 + recursive.properties.len());
        parts.push(match recursive.ty {
            Some(ty) => self.type_test(ty, recursive.input_type),
            None => Node::not_null(None),
        });
        if let Some(positional) = &recursive.positional {
            self.positional(positional, &mut parts);
        }
        for property in &recursive.properties {
            let sub = self.pattern(&property.pattern);
            if sub == Node::True {
                continue;
            }
            let mut members = property.path.iter();
            let Some(&first) = members.next() else {
                parts.push(sub);
                continue;
            };
            let chain = members.fold(Evaluation::member(None, first), |input, &member| {
                Evaluation::member(Some(input), member)
            });
            parts.push(Node::pair(chain, sub));
        }
        if let Some(designation) = recursive.designation {
            parts.push(Node::variable(None, designation));
        }
        Node::and(parts)
    }

    fn positional(&self, positional: &SourcePositional, parts: &mut Vec<Node>) {
        let subpatterns = positional
            .subpatterns
            .iter()
            .map(|sub| self.pattern(sub))
            .enumerate()
            .filter(|(_, sub)| *sub != Node::True);
        match positional.source {
            PositionalSource::Deconstruct(method) => {
                let outs: Vec<Node> = subpatterns
                    .map(|(i, sub)| Node::pair(Evaluation::out_variable(None, position(i)), sub))
                    .collect();
                parts.push(Node::pair(
                    Evaluation::deconstruct(None, method),
                    Node::and(outs),
                ));
            }
            PositionalSource::Indexer(container) => {
                if let Container::Indexable { length } = container {
                    let arity = i32::try_from(positional.subpatterns.len()).unwrap_or(i32::MAX);
                    parts.push(Node::pair(
                        Evaluation::member(None, length),
                        Node::constant(None, ConstValue::int(arity)),
                    ));
                }
                parts.extend(subpatterns.map(|(i, sub)| {
                    Node::pair(Evaluation::index(None, container, position(i)), sub)
                }));
            }
        }
    }
}

fn position(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Returns `true` if `pattern` (relative to its value) holds for `null`.
pub(super) fn matches_null(pattern: &Node) -> bool {
    match pattern {
        Node::True => true,
        Node::Not(inner) => !matches_null(inner),
        Node::And(children) => children.iter().all(matches_null),
        Node::Or(children) => children.iter().any(matches_null),
        Node::Eval(evaluation) => matches!(**evaluation, Evaluation::Variable { input: None, .. }),
        Node::False | Node::Pair(_) | Node::Constant(_) | Node::Relational(_) => false,
    }
}
