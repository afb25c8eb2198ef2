//! Host-facing input types.
//!
//! The host's front end parses and binds the source language; what reaches
//! the engine is this already-resolved tree. Names, members, types and
//! deconstruct methods are opaque IDs, constants are folded, and every
//! semantic question the engine needs answered goes through
//! [`SemanticOracle`].

use std::cell::Cell;

use crate::evaluation::{Container, DeconstructMethod};
use crate::node::RelOp;
use crate::{ConstValue, ExprId, Symbol, TypeId};

/// A bound source expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceExpr {
    pub id: ExprId,
    pub kind: SourceExprKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceExprKind {
    /// A folded constant.
    Literal(ConstValue),
    /// The `null` literal.
    Null,
    /// An in-scope local, parameter or field.
    Name(Symbol),
    /// `receiver.member`
    Member {
        receiver: Box<SourceExpr>,
        member: Symbol,
    },
    /// `receiver?.member`
    ConditionalMember {
        receiver: Box<SourceExpr>,
        member: Symbol,
    },
    /// `receiver[index]`, where the host knows what is being indexed.
    Element {
        receiver: Box<SourceExpr>,
        index: Box<SourceExpr>,
        container: Container,
    },
    /// `(ty)operand`
    Cast {
        operand: Box<SourceExpr>,
        ty: TypeId,
    },
    Binary {
        op: BinaryOp,
        left: Box<SourceExpr>,
        right: Box<SourceExpr>,
    },
    /// `!operand`
    Not(Box<SourceExpr>),
    /// `operand is pattern`
    Is {
        operand: Box<SourceExpr>,
        pattern: SourcePattern,
    },
    /// Anything else (calls, arithmetic, ...). Kept verbatim if it ends up
    /// in a residual.
    Opaque,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// The relational operator, for `<`, `<=`, `>` and `>=`.
    pub const fn relational(self) -> Option<RelOp> {
        match self {
            BinaryOp::Lt => Some(RelOp::Lt),
            BinaryOp::Le => Some(RelOp::Le),
            BinaryOp::Gt => Some(RelOp::Gt),
            BinaryOp::Ge => Some(RelOp::Ge),
            _ => None,
        }
    }
}

/// A bound source pattern (the right-hand side of `is`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourcePattern {
    /// `_`
    Discard,
    Constant(ConstValue),
    /// `null`
    Null,
    /// `< 5`, `>= 'a'`, ...
    Relational(RelOp, ConstValue),
    /// `T`, tested against a value of static type `input_type`.
    Type { ty: TypeId, input_type: TypeId },
    /// `T name` or, with no type, `var name`.
    Declaration {
        ty: Option<TypeId>,
        name: Symbol,
        input_type: TypeId,
    },
    Not(Box<SourcePattern>),
    And(Box<SourcePattern>, Box<SourcePattern>),
    Or(Box<SourcePattern>, Box<SourcePattern>),
    /// `T (..) { .. } name`
    Recursive(Box<SourceRecursive>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRecursive {
    pub ty: Option<TypeId>,
    pub input_type: TypeId,
    pub positional: Option<SourcePositional>,
    pub properties: Vec<SourceProperty>,
    pub designation: Option<Symbol>,
}

/// The `( .. )` clause of a recursive pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePositional {
    pub source: PositionalSource,
    pub subpatterns: Vec<SourcePattern>,
}

/// How a positional clause reads its elements.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PositionalSource {
    Deconstruct(DeconstructMethod),
    Indexer(Container),
}

/// One `path: pattern` entry. Extended property patterns have a path
/// longer than one member (`{ A.B: 1 }`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceProperty {
    pub path: Vec<Symbol>,
    pub pattern: SourcePattern,
}

/// How a value of one type converts to another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Conversion {
    Identity,
    ImplicitReference,
    Boxing,
    Unboxing,
    ExplicitReference,
    None,
}

impl Conversion {
    /// Returns `true` if every non-null value of the source type already
    /// has the target type, so a type test reduces to a null test.
    pub const fn implies_type_test(self) -> bool {
        matches!(self, Conversion::Identity | Conversion::ImplicitReference)
    }
}

/// Semantic facts the engine asks of the host.
pub trait SemanticOracle {
    fn classify_conversion(&self, from: TypeId, to: TypeId) -> Conversion;

    /// Returns `true` if evaluating `expr` may have observable effects.
    /// Such expressions cannot be moved or duplicated.
    fn has_side_effects(&self, expr: &SourceExpr) -> bool;
}

/// Builds [`SourceExpr`] trees with fresh expression IDs.
///
/// Hosts with their own expression IDs construct `SourceExpr` directly;
/// this is for hosts (and tests) that do not.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    next: Cell<u32>,
}

impl SourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn make(&self, kind: SourceExprKind) -> SourceExpr {
        let id = ExprId::new(self.next.get());
        self.next.set(self.next.get() + 1);
        SourceExpr { id, kind }
    }

    pub fn literal(&self, value: ConstValue) -> SourceExpr {
        self.make(SourceExprKind::Literal(value))
    }

    pub fn int(&self, value: i32) -> SourceExpr {
        self.literal(ConstValue::int(value))
    }

    pub fn bool(&self, value: bool) -> SourceExpr {
        self.literal(ConstValue::Bool(value))
    }

    pub fn null(&self) -> SourceExpr {
        self.make(SourceExprKind::Null)
    }

    pub fn name(&self, symbol: Symbol) -> SourceExpr {
        self.make(SourceExprKind::Name(symbol))
    }

    pub fn member(&self, receiver: SourceExpr, member: Symbol) -> SourceExpr {
        self.make(SourceExprKind::Member {
            receiver: Box::new(receiver),
            member,
        })
    }

    /// `root.m1.m2...`
    pub fn path(&self, root: Symbol, members: &[Symbol]) -> SourceExpr {
        members
            .iter()
            .fold(self.name(root), |receiver, &member| self.member(receiver, member))
    }

    pub fn conditional_member(&self, receiver: SourceExpr, member: Symbol) -> SourceExpr {
        self.make(SourceExprKind::ConditionalMember {
            receiver: Box::new(receiver),
            member,
        })
    }

    pub fn element(&self, receiver: SourceExpr, index: SourceExpr, container: Container) -> SourceExpr {
        self.make(SourceExprKind::Element {
            receiver: Box::new(receiver),
            index: Box::new(index),
            container,
        })
    }

    pub fn cast(&self, operand: SourceExpr, ty: TypeId) -> SourceExpr {
        self.make(SourceExprKind::Cast {
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn binary(&self, op: BinaryOp, left: SourceExpr, right: SourceExpr) -> SourceExpr {
        self.make(SourceExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn eq(&self, left: SourceExpr, right: SourceExpr) -> SourceExpr {
        self.binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(&self, left: SourceExpr, right: SourceExpr) -> SourceExpr {
        self.binary(BinaryOp::Ne, left, right)
    }

    pub fn and(&self, left: SourceExpr, right: SourceExpr) -> SourceExpr {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&self, left: SourceExpr, right: SourceExpr) -> SourceExpr {
        self.binary(BinaryOp::Or, left, right)
    }

    /// Left-nested `&&` of all operands. `None` if there are none.
    pub fn all(&self, operands: impl IntoIterator<Item = SourceExpr>) -> Option<SourceExpr> {
        operands.into_iter().reduce(|acc, next| self.and(acc, next))
    }

    /// Left-nested `||` of all operands. `None` if there are none.
    pub fn any(&self, operands: impl IntoIterator<Item = SourceExpr>) -> Option<SourceExpr> {
        operands.into_iter().reduce(|acc, next| self.or(acc, next))
    }

    pub fn not(&self, operand: SourceExpr) -> SourceExpr {
        self.make(SourceExprKind::Not(Box::new(operand)))
    }

    pub fn is(&self, operand: SourceExpr, pattern: SourcePattern) -> SourceExpr {
        self.make(SourceExprKind::Is {
            operand: Box::new(operand),
            pattern,
        })
    }

    pub fn opaque(&self) -> SourceExpr {
        self.make(SourceExprKind::Opaque)
    }
}
