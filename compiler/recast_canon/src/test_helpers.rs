//! Shared fixtures for unit tests.

use std::sync::Arc;

use recast_ir::{
    Conversion, DeconstructMethod, Evaluation, ExprId, MethodId, Node, SemanticOracle, SourceExpr,
    Symbol, TypeId,
};
use rustc_hash::FxHashSet;

pub(crate) const X: Symbol = Symbol::new(0);
pub(crate) const P: Symbol = Symbol::new(1);
pub(crate) const Q: Symbol = Symbol::new(2);
pub(crate) const Y: Symbol = Symbol::new(3);
pub(crate) const Z: Symbol = Symbol::new(4);
pub(crate) const V: Symbol = Symbol::new(5);
pub(crate) const B: Symbol = Symbol::new(6);
pub(crate) const LENGTH: Symbol = Symbol::new(7);

/// Static type of `x`. Every other type derives from it.
pub(crate) const T_BASE: TypeId = TypeId::new(0);
pub(crate) const T_A: TypeId = TypeId::new(1);
pub(crate) const T_B: TypeId = TypeId::new(2);

pub(crate) const DECONSTRUCT: DeconstructMethod = DeconstructMethod {
    id: MethodId::new(0),
    arity: 2,
};

/// Identity for equal types, implicit reference conversion to `T_BASE`,
/// explicit otherwise.
#[derive(Default)]
pub(crate) struct TestOracle {
    pub side_effecting: FxHashSet<ExprId>,
}

impl TestOracle {
    pub fn with_side_effects(ids: impl IntoIterator<Item = ExprId>) -> Self {
        Self {
            side_effecting: ids.into_iter().collect(),
        }
    }
}

impl SemanticOracle for TestOracle {
    fn classify_conversion(&self, from: TypeId, to: TypeId) -> Conversion {
        if from == to {
            Conversion::Identity
        } else if to == T_BASE {
            Conversion::ImplicitReference
        } else {
            Conversion::ExplicitReference
        }
    }

    fn has_side_effects(&self, expr: &SourceExpr) -> bool {
        self.side_effecting.contains(&expr.id)
    }
}

/// `x` as a root chain.
pub(crate) fn x() -> Arc<Evaluation> {
    Evaluation::name(X)
}

/// `x.m1.m2...`
pub(crate) fn x_dot(members: &[Symbol]) -> Arc<Evaluation> {
    Evaluation::access(X, members)
}

/// A member step relative to the current value.
pub(crate) fn rel(member: Symbol) -> Arc<Evaluation> {
    Evaluation::member(None, member)
}

/// Analyze with the default oracle, panicking on failure.
pub(crate) fn analyzed(expr: &SourceExpr) -> Node {
    crate::analyze(expr, &TestOracle::default())
        .unwrap_or_else(|| panic!("expected {:?} to be analyzable", expr.id))
}
