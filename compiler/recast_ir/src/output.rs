//! Synthesized output: structural patterns and the expressions around them.
//!
//! These trees are abstract. Turning them into source text (trivia,
//! wrapping, parenthesization rules of the target language) is the host's
//! job; the `Display` impls here are for logs and tests.

use std::fmt;

use crate::evaluation::Container;
use crate::node::RelOp;
use crate::{ConstValue, ExprId, Symbol, TypeId};

/// One step of an [`AccessPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessStep {
    Member(Symbol),
    Index { index: u32, container: Container },
    Cast(TypeId),
}

/// A value access relative to the current value. At the top level the
/// first step is a member naming an in-scope value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessPath(pub Vec<AccessStep>);

impl AccessPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `prefix` followed by this path.
    #[must_use]
    pub fn prefixed(&self, prefix: &AccessPath) -> AccessPath {
        let mut steps = Vec::with_capacity(prefix.0.len() + self.0.len());
        steps.extend_from_slice(&prefix.0);
        steps.extend_from_slice(&self.0);
        AccessPath(steps)
    }
}

/// `{ member: pattern }`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertySubpattern {
    pub member: Symbol,
    pub pattern: Pattern,
}

/// `T (..) { .. } v`
///
/// `properties: Some(vec![])` is the empty property clause `{ }`, a
/// non-null test.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecursivePattern {
    pub ty: Option<TypeId>,
    pub positional: Option<Vec<Pattern>>,
    pub properties: Option<Vec<PropertySubpattern>>,
    pub designation: Option<Symbol>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pattern {
    Discard,
    Constant(ConstValue),
    Relational(RelOp, ConstValue),
    Type(TypeId),
    /// `T v`, or `var v` without a type.
    Declaration { ty: Option<TypeId>, name: Symbol },
    Recursive(Box<RecursivePattern>),
    Not(Box<Pattern>),
    And(Vec<Pattern>),
    Or(Vec<Pattern>),
}

impl Pattern {
    /// The empty property pattern `{ }`.
    pub fn non_null() -> Pattern {
        Pattern::Recursive(Box::new(RecursivePattern {
            properties: Some(Vec::new()),
            ..RecursivePattern::default()
        }))
    }

    /// Conjunction of `patterns`, flattened, with `_` dropped.
    pub fn and(patterns: impl IntoIterator<Item = Pattern>) -> Pattern {
        let mut flat = Vec::new();
        for pattern in patterns {
            match pattern {
                Pattern::Discard => {}
                Pattern::And(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Pattern::Discard,
            1 => flat.pop().unwrap_or(Pattern::Discard),
            _ => Pattern::And(flat),
        }
    }
}

/// A boolean expression around synthesized patterns.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    Bool(bool),
    /// A boolean-valued access used as a condition.
    Access(AccessPath),
    /// `subject is pattern`
    Is { subject: AccessPath, pattern: Pattern },
    /// An opaque source expression, emitted as written.
    Operation(ExprId),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// Conjunction of `exprs`, flattened, with `true` dropped.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        for expr in exprs {
            match expr {
                Expr::Bool(true) => {}
                Expr::And(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Bool(true),
            1 => flat.pop().unwrap_or(Expr::Bool(true)),
            _ => Expr::And(flat),
        }
    }

    /// The same expression with every access path prefixed by `prefix`.
    /// Operations are absolute and stay as they are.
    #[must_use]
    pub fn rebase(self, prefix: &AccessPath) -> Expr {
        if prefix.is_empty() {
            return self;
        }
        match self {
            Expr::Access(path) => Expr::Access(path.prefixed(prefix)),
            Expr::Is { subject, pattern } => Expr::Is {
                subject: subject.prefixed(prefix),
                pattern,
            },
            Expr::Not(inner) => Expr::Not(Box::new(inner.rebase(prefix))),
            Expr::And(children) => {
                Expr::And(children.into_iter().map(|c| c.rebase(prefix)).collect())
            }
            Expr::Or(children) => Expr::Or(children.into_iter().map(|c| c.rebase(prefix)).collect()),
            other @ (Expr::Bool(_) | Expr::Operation(_)) => other,
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        for (i, step) in self.0.iter().enumerate() {
            match step {
                AccessStep::Member(member) if i == 0 => rendered = member.to_string(),
                AccessStep::Member(member) => {
                    rendered = format!("{}.{member}", or_current(&rendered));
                }
                AccessStep::Index { index, .. } => {
                    rendered = format!("{}[{index}]", or_current(&rendered));
                }
                AccessStep::Cast(ty) => rendered = format!("(({ty}){})", or_current(&rendered)),
            }
        }
        f.write_str(or_current(&rendered))
    }
}

fn or_current(rendered: &str) -> &str {
    if rendered.is_empty() {
        "$"
    } else {
        rendered
    }
}

impl fmt::Display for RecursivePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(ty) = self.ty {
            parts.push(ty.to_string());
        }
        if let Some(positional) = &self.positional {
            let items: Vec<String> = positional.iter().map(ToString::to_string).collect();
            parts.push(format!("({})", items.join(", ")));
        }
        if let Some(properties) = &self.properties {
            if properties.is_empty() {
                parts.push("{ }".to_owned());
            } else {
                let items: Vec<String> = properties
                    .iter()
                    .map(|p| format!("{}: {}", p.member, p.pattern))
                    .collect();
                parts.push(format!("{{ {} }}", items.join(", ")));
            }
        }
        if let Some(designation) = self.designation {
            parts.push(designation.to_string());
        }
        f.write_str(&parts.join(" "))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Discard => f.write_str("_"),
            Pattern::Constant(value) => write!(f, "{value}"),
            Pattern::Relational(op, value) => write!(f, "{} {value}", op.as_str()),
            Pattern::Type(ty) => write!(f, "{ty}"),
            Pattern::Declaration { ty: Some(ty), name } => write!(f, "{ty} {name}"),
            Pattern::Declaration { ty: None, name } => write!(f, "var {name}"),
            Pattern::Recursive(recursive) => write!(f, "{recursive}"),
            Pattern::Not(inner) => match &**inner {
                Pattern::And(_) | Pattern::Or(_) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
            Pattern::And(children) => {
                let items: Vec<String> = children
                    .iter()
                    .map(|c| match c {
                        Pattern::Or(_) => format!("({c})"),
                        _ => c.to_string(),
                    })
                    .collect();
                f.write_str(&items.join(" and "))
            }
            Pattern::Or(children) => {
                let items: Vec<String> = children.iter().map(ToString::to_string).collect();
                f.write_str(&items.join(" or "))
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Access(path) => write!(f, "{path}"),
            Expr::Is { subject, pattern } => write!(f, "{subject} is {pattern}"),
            Expr::Operation(expr) => write!(f, "op({expr})"),
            Expr::Not(inner) => write!(f, "!({inner})"),
            Expr::And(children) => {
                let items: Vec<String> = children
                    .iter()
                    .map(|c| match c {
                        Expr::Or(_) => format!("({c})"),
                        _ => c.to_string(),
                    })
                    .collect();
                f.write_str(&items.join(" && "))
            }
            Expr::Or(children) => {
                let items: Vec<String> = children.iter().map(ToString::to_string).collect();
                f.write_str(&items.join(" || "))
            }
        }
    }
}
