//! Compact pseudo-syntax for nodes and chains, used in logs and test
//! failure messages.
//!
//! `$` stands for the current value. A root member prints as a bare name,
//! since at the top level it is an in-scope value.

use std::fmt;

use crate::evaluation::{Evaluation, Input};
use crate::node::Node;

struct InputDisplay<'a>(&'a Input);

impl fmt::Display for InputDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(input) => write!(f, "{input}"),
            None => f.write_str("$"),
        }
    }
}

fn input_of(evaluation: &Evaluation) -> &Input {
    match evaluation {
        Evaluation::NotNull { input }
        | Evaluation::Variable { input, .. }
        | Evaluation::Type { input, .. }
        | Evaluation::Index { input, .. }
        | Evaluation::Member { input, .. }
        | Evaluation::Deconstruct { input, .. }
        | Evaluation::OutVariable { input, .. } => input,
        Evaluation::Operation { .. } => &None,
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let input = InputDisplay(input_of(self));
        match self {
            Evaluation::Member {
                input: None,
                member,
            } => write!(f, "{member}"),
            Evaluation::Member { member, .. } => write!(f, "{input}.{member}"),
            Evaluation::NotNull { .. } => write!(f, "{input}!"),
            Evaluation::Variable { symbol, .. } => write!(f, "{input}@{symbol}"),
            Evaluation::Type { ty, .. } => write!(f, "({input} as {ty})"),
            Evaluation::Index { index, .. } => write!(f, "{input}[{index}]"),
            Evaluation::Deconstruct { method, .. } => write!(f, "{input}#{}", method.id),
            Evaluation::OutVariable { position, .. } => write!(f, "{input}.out{position}"),
            Evaluation::Operation { expr } => write!(f, "op({expr})"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::True => f.write_str("true"),
            Node::False => f.write_str("false"),
            Node::Not(inner) => write!(f, "!({inner})"),
            Node::And(children) => write_sequence(f, children, " && "),
            Node::Or(children) => write_sequence(f, children, " || "),
            Node::Pair(pair) => write!(f, "{} is ({})", pair.input, pair.pattern),
            Node::Constant(test) => write!(f, "{} == {}", InputDisplay(&test.input), test.value),
            Node::Relational(test) => write!(
                f,
                "{} {} {}",
                InputDisplay(&test.input),
                test.op.as_str(),
                test.value
            ),
            Node::Eval(evaluation) => {
                let input = InputDisplay(input_of(evaluation));
                match &**evaluation {
                    Evaluation::NotNull { .. } => write!(f, "{input} != null"),
                    Evaluation::Type { ty, .. } => write!(f, "{input} is {ty}"),
                    Evaluation::Variable { symbol, .. } => write!(f, "{input} is var {symbol}"),
                    other => write!(f, "{other}"),
                }
            }
        }
    }
}

fn write_sequence(f: &mut fmt::Formatter<'_>, children: &[Node], separator: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if child.as_sequence().is_some() {
            write!(f, "({child})")?;
        } else {
            write!(f, "{child}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ConstValue, Symbol, TypeId};

    #[test]
    fn renders_tests_and_pairs() {
        let x = Evaluation::name(Symbol::new(0));
        let p = Evaluation::member(Some(x.clone()), Symbol::new(1));
        let node = Node::and([
            Node::constant(Some(p), ConstValue::int(1)),
            Node::pair(
                x,
                Node::or([Node::type_test(None, TypeId::new(2)), Node::not_null(None)]),
            ),
        ]);
        assert_eq!(node.to_string(), "s0.s1 == 1 && s0 is ($ is T2 || $ != null)");
    }
}
