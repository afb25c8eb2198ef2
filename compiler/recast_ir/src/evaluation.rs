//! Access-chain steps.
//!
//! An [`Evaluation`] is one step of a singly linked access chain: `a.b.c` is
//! `Member(c, input = Member(b, input = Member(a, input = None)))`. Every
//! evaluation except [`Evaluation::Operation`] carries the step it reads
//! from as its `input`; `None` means "the current value", which is the
//! top-level scope for a root step and the enclosing `Pair`'s value inside
//! a pattern.
//!
//! Chains are immutable and shared: passes build new chains by re-linking
//! `Arc`s, never by editing a step in place.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{ExprId, MethodId, Symbol, TypeId};

/// The step an evaluation reads from. `None` is the current value.
pub type Input = Option<Arc<Evaluation>>;

/// What an [`Evaluation::Index`] indexes into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Container {
    /// A value tuple of statically known arity (`t.Item2`, `t[1]`).
    Tuple { arity: u32 },
    /// An `ITuple`-style indexer whose arity is only known through a
    /// `length == N` test on the `length` member.
    Indexable { length: Symbol },
}

/// A deconstruct method and its number of out parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeconstructMethod {
    pub id: MethodId,
    pub arity: u32,
}

/// One access-chain step, usable both as a test and as another node's input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Evaluation {
    /// Non-null check. As a step, the value itself, known non-null.
    NotNull { input: Input },
    /// Binds `symbol` to the value. Always succeeds.
    Variable { input: Input, symbol: Symbol },
    /// Runtime type test. As a step, the value viewed as `ty`.
    Type { input: Input, ty: TypeId },
    /// Positional element access.
    Index {
        input: Input,
        container: Container,
        index: u32,
    },
    /// Field or property access. A root member (`input: None` at the top
    /// level) names an in-scope value.
    Member { input: Input, member: Symbol },
    /// Positional decomposition through a deconstruct method.
    Deconstruct {
        input: Input,
        method: DeconstructMethod,
    },
    /// One out slot of a deconstruction. The input is the `Deconstruct`
    /// step, or `None` directly under a `Pair` keyed by that step.
    OutVariable { input: Input, position: u32 },
    /// An expression the engine cannot decompose. Never used as an input.
    Operation { expr: ExprId },
}

impl Evaluation {
    pub fn not_null(input: Input) -> Arc<Self> {
        Arc::new(Evaluation::NotNull { input })
    }

    pub fn variable(input: Input, symbol: Symbol) -> Arc<Self> {
        Arc::new(Evaluation::Variable { input, symbol })
    }

    pub fn type_test(input: Input, ty: TypeId) -> Arc<Self> {
        Arc::new(Evaluation::Type { input, ty })
    }

    pub fn index(input: Input, container: Container, index: u32) -> Arc<Self> {
        Arc::new(Evaluation::Index {
            input,
            container,
            index,
        })
    }

    pub fn member(input: Input, member: Symbol) -> Arc<Self> {
        Arc::new(Evaluation::Member { input, member })
    }

    pub fn deconstruct(input: Input, method: DeconstructMethod) -> Arc<Self> {
        Arc::new(Evaluation::Deconstruct { input, method })
    }

    pub fn out_variable(input: Input, position: u32) -> Arc<Self> {
        debug_assert!(
            input
                .as_deref()
                .map_or(true, |step| matches!(step, Evaluation::Deconstruct { .. })),
            "out variable must read from a deconstruction"
        );
        Arc::new(Evaluation::OutVariable { input, position })
    }

    pub fn operation(expr: ExprId) -> Arc<Self> {
        Arc::new(Evaluation::Operation { expr })
    }

    /// The in-scope value named `symbol`.
    pub fn name(symbol: Symbol) -> Arc<Self> {
        Self::member(None, symbol)
    }

    /// `root.m1.m2...` as a member chain.
    pub fn access(root: Symbol, members: &[Symbol]) -> Arc<Self> {
        members
            .iter()
            .fold(Self::name(root), |input, &member| {
                Self::member(Some(input), member)
            })
    }

    /// The step this evaluation reads from.
    pub fn input(&self) -> Option<&Arc<Evaluation>> {
        match self {
            Evaluation::NotNull { input }
            | Evaluation::Variable { input, .. }
            | Evaluation::Type { input, .. }
            | Evaluation::Index { input, .. }
            | Evaluation::Member { input, .. }
            | Evaluation::Deconstruct { input, .. }
            | Evaluation::OutVariable { input, .. } => input.as_ref(),
            Evaluation::Operation { .. } => None,
        }
    }

    /// A copy of this step reading from `input` instead.
    pub fn with_input(&self, input: Input) -> Evaluation {
        match self {
            Evaluation::NotNull { .. } => Evaluation::NotNull { input },
            Evaluation::Variable { symbol, .. } => Evaluation::Variable {
                input,
                symbol: *symbol,
            },
            Evaluation::Type { ty, .. } => Evaluation::Type { input, ty: *ty },
            Evaluation::Index {
                container, index, ..
            } => Evaluation::Index {
                input,
                container: *container,
                index: *index,
            },
            Evaluation::Member { member, .. } => Evaluation::Member {
                input,
                member: *member,
            },
            Evaluation::Deconstruct { method, .. } => Evaluation::Deconstruct {
                input,
                method: *method,
            },
            Evaluation::OutVariable { position, .. } => Evaluation::OutVariable {
                input,
                position: *position,
            },
            Evaluation::Operation { expr } => Evaluation::Operation { expr: *expr },
        }
    }

    /// This step alone, reading from the current value.
    pub fn strip(&self) -> Arc<Evaluation> {
        if self.input().is_none() {
            return Arc::new(self.clone());
        }
        Arc::new(self.with_input(None))
    }

    /// Attach `root` beneath the innermost step of the chain.
    ///
    /// Turns a chain relative to some value into a chain relative to the
    /// value `root` is relative to. `rebase(P, Some(x))` is `x.P`.
    pub fn rebase(self: &Arc<Self>, root: &Input) -> Arc<Evaluation> {
        let Some(root) = root else {
            return Arc::clone(self);
        };
        if matches!(**self, Evaluation::Operation { .. }) {
            return Arc::clone(self);
        }
        recast_stack::ensure_sufficient_stack(|| {
            let input = match self.input() {
                None => Arc::clone(root),
                Some(inner) => inner.rebase(&Some(Arc::clone(root))),
            };
            Arc::new(self.with_input(Some(input)))
        })
    }

    /// Steps of the chain, this step first and the root last.
    pub fn steps(&self) -> SmallVec<[&Evaluation; 4]> {
        let mut steps = SmallVec::new();
        let mut current = Some(self);
        while let Some(step) = current {
            steps.push(step);
            current = step.input().map(|input| &**input);
        }
        steps
    }

    /// Number of steps in the chain.
    pub fn depth(&self) -> usize {
        self.steps().len()
    }

    /// `NotNull`, `Type` and `Variable` do not change the value they read,
    /// so they can be lifted out of a chain into sibling tests.
    pub const fn is_identity_step(&self) -> bool {
        matches!(
            self,
            Evaluation::NotNull { .. } | Evaluation::Type { .. } | Evaluation::Variable { .. }
        )
    }

    pub const fn is_operation(&self) -> bool {
        matches!(self, Evaluation::Operation { .. })
    }
}
