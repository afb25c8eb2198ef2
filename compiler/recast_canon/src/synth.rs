//! Canonical node → pattern and expression synthesis.
//!
//! # Rendering
//!
//! At the expression level a `Pair(x, p)` becomes `x is <p>`, sequences
//! become `&&`/`||`, and opaque operations are kept verbatim. Under a
//! top-level `&&`, operations are split off into the residual so the host
//! can emit `x is <p> && residual`.
//!
//! On the pattern side the children of a conjunction are classified into
//! the slots of one recursive pattern:
//!
//! | child                                  | slot                             |
//! |----------------------------------------|----------------------------------|
//! | `Pair(Member m, p)`, `m`, `!m`         | property `m: p` / `true` / `false` |
//! | `Pair(Index i, p)`                     | positional `i` (tuple, indexer)  |
//! | `Pair(Deconstruct, (out i is p)...)`   | positional `i` (deconstruct)     |
//! | `Type`                                 | type annotation                  |
//! | `Variable`                             | designation                      |
//! | `NotNull`                              | `{ }`                            |
//!
//! Tests for the same member or position are merged into one slot joined
//! with `and`, so every member appears once. A second type or binding, and
//! pattern-shaped leaves (constants, relational tests, `not`, `or`), join
//! the recursive pattern with `and`.
//!
//! Anything without pattern syntax is moved to the residual when every
//! enclosing construct up to the top is a conjunction, and is an
//! [`SynthError::Unrepresentable`] error otherwise.

mod ranges;

use std::collections::BTreeMap;
use std::slice;

use recast_ir::{
    AccessPath, AccessStep, ConstValue, Container, DeconstructMethod, Evaluation, Expr, Node,
    Pattern, PropertySubpattern, RecursivePattern, Symbol, TypeId,
};
use rustc_hash::FxHashMap;

use crate::{RecastConfig, SynthError};

/// Synthesizer output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Synthesis {
    /// The structural part.
    pub expr: Expr,
    /// Tests with no pattern form, to be `&&`-ed after `expr`.
    pub residual: Option<Expr>,
}

impl Synthesis {
    /// `expr && residual`
    pub fn into_expr(self) -> Expr {
        match self.residual {
            Some(residual) => Expr::and([self.expr, residual]),
            None => self.expr,
        }
    }
}

/// Render a canonical tree.
pub fn synthesize(node: &Node, config: &RecastConfig) -> Result<Synthesis, SynthError> {
    let synthesis = Synthesizer { config }.top(node)?;
    tracing::debug!(
        expr = %synthesis.expr,
        residual = synthesis.residual.as_ref().map(tracing::field::display),
        "synthesized"
    );
    Ok(synthesis)
}

/// Render a canonical tree as a pattern on the current value, with a
/// residual whose paths are relative to that value.
pub fn synthesize_pattern(
    node: &Node,
    config: &RecastConfig,
) -> Result<(Pattern, Option<Expr>), SynthError> {
    let (pattern, residual) = Synthesizer { config }.pattern(node, true)?;
    let residual = (!residual.is_empty()).then(|| Expr::and(residual));
    Ok((pattern, residual))
}

/// A pattern plus the residual tests split off while rendering it.
type Rendered<T> = Result<(T, Vec<Expr>), SynthError>;

struct Synthesizer<'c> {
    config: &'c RecastConfig,
}

impl Synthesizer<'_> {
    fn top(&self, node: &Node) -> Result<Synthesis, SynthError> {
        let children = match node {
            Node::And(children) => &children[..],
            other => slice::from_ref(other),
        };
        let mut exprs = Vec::with_capacity(children.len());
        let mut residual = Vec::new();
        for child in children {
            if let Node::Eval(evaluation) = child {
                if let Evaluation::Operation { expr } = **evaluation {
                    residual.push(Expr::Operation(expr));
                    continue;
                }
            }
            let (expr, nested) = self.expr(child, true)?;
            exprs.push(expr);
            residual.extend(nested);
        }
        Ok(Synthesis {
            expr: Expr::and(exprs),
            residual: (!residual.is_empty()).then(|| Expr::and(residual)),
        })
    }

    /// Render `node` as an expression. Residual tests are split off only
    /// when `conjunctive`.
    fn expr(&self, node: &Node, conjunctive: bool) -> Rendered<Expr> {
        recast_stack::ensure_sufficient_stack(|| match node {
            Node::True => Ok((Expr::Bool(true), Vec::new())),
            Node::False => Ok((Expr::Bool(false), Vec::new())),
            Node::Not(inner) => {
                let (inner, _) = self.expr(inner, false)?;
                Ok((Expr::Not(Box::new(inner)), Vec::new()))
            }
            Node::And(children) => {
                let mut parts = Vec::with_capacity(children.len());
                let mut residual = Vec::new();
                for child in children.iter() {
                    let (part, nested) = self.expr(child, conjunctive)?;
                    parts.push(part);
                    residual.extend(nested);
                }
                Ok((Expr::and(parts), residual))
            }
            Node::Or(children) => {
                let parts = children
                    .iter()
                    .map(|child| self.expr(child, false).map(|(part, _)| part))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((Expr::Or(parts), Vec::new()))
            }
            Node::Pair(pair) => {
                let subject = access_path(&pair.input)?;
                let (pattern, nested) = self.pattern(&pair.pattern, conjunctive)?;
                let nested = nested.into_iter().map(|e| e.rebase(&subject)).collect();
                Ok((Expr::Is { subject, pattern }, nested))
            }
            Node::Eval(evaluation) => match **evaluation {
                Evaluation::Operation { expr } => Ok((Expr::Operation(expr), Vec::new())),
                Evaluation::Member { .. }
                | Evaluation::Index { .. }
                | Evaluation::OutVariable { .. } => {
                    Ok((Expr::Access(access_path(evaluation)?), Vec::new()))
                }
                _ => Err(SynthError::invariant(format!(
                    "test `{node}` has no subject to render against"
                ))),
            },
            Node::Constant(_) | Node::Relational(_) => Err(SynthError::invariant(format!(
                "test `{node}` has no subject to render against"
            ))),
        })
    }

    /// Render `node` as a pattern on the current value.
    fn pattern(&self, node: &Node, conjunctive: bool) -> Rendered<Pattern> {
        recast_stack::ensure_sufficient_stack(|| match node {
            Node::True => Ok((Pattern::Discard, Vec::new())),
            Node::False => Ok((Pattern::Not(Box::new(Pattern::Discard)), Vec::new())),
            Node::Constant(test) if test.input.is_none() => {
                Ok((Pattern::Constant(test.value.clone()), Vec::new()))
            }
            Node::Relational(test) if test.input.is_none() => {
                Ok((Pattern::Relational(test.op, test.value.clone()), Vec::new()))
            }
            Node::Constant(_) | Node::Relational(_) => Err(SynthError::invariant(format!(
                "pattern test `{node}` reads through an unfactored chain"
            ))),
            Node::Not(_) if boolean_slot(node).is_some() => {
                self.classify(slice::from_ref(node), conjunctive)
            }
            Node::Not(inner) => {
                let (inner, _) = self.pattern(inner, false)?;
                Ok((Pattern::Not(Box::new(inner)), Vec::new()))
            }
            Node::Or(children) => {
                let merged = ranges::merge(children, self.config.min_range_run);
                let children = merged.as_deref().unwrap_or(&children[..]);
                if let [single] = children {
                    return self.pattern(single, false);
                }
                let patterns = children
                    .iter()
                    .map(|child| self.pattern(child, false).map(|(pattern, _)| pattern))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((Pattern::Or(patterns), Vec::new()))
            }
            Node::And(children) => self.classify(children, conjunctive),
            Node::Pair(_) | Node::Eval(_) => self.classify(slice::from_ref(node), conjunctive),
        })
    }

    /// Classify the children of a conjunction into one pattern.
    fn classify(&self, children: &[Node], conjunctive: bool) -> Rendered<Pattern> {
        let mut shape = Shape::default();
        for child in children {
            self.place(&mut shape, child, conjunctive)?;
        }
        self.finish(shape, conjunctive)
    }

    fn place(&self, shape: &mut Shape, child: &Node, conjunctive: bool) -> Result<(), SynthError> {
        if let Some((step, value)) = boolean_slot(child) {
            let pattern = Pattern::Constant(ConstValue::Bool(value));
            match *step {
                Evaluation::Member { member, .. } => shape.property(member, pattern),
                Evaluation::Index {
                    container, index, ..
                } => shape.index(container, index, pattern, Vec::new(), child),
                _ => shape.leftovers.push(child.clone()),
            }
            return Ok(());
        }
        match child {
            Node::True => {}
            Node::And(nested) => {
                for grandchild in nested.iter() {
                    self.place(shape, grandchild, conjunctive)?;
                }
            }
            Node::Pair(pair) => match *pair.input {
                Evaluation::Member {
                    input: None,
                    member,
                } => {
                    let (pattern, nested) = self.pattern(&pair.pattern, conjunctive)?;
                    let prefix = AccessPath(vec![AccessStep::Member(member)]);
                    shape.residual.extend(nested.into_iter().map(|e| e.rebase(&prefix)));
                    shape.property(member, pattern);
                }
                Evaluation::Index {
                    input: None,
                    container,
                    index,
                } => {
                    let (pattern, nested) = self.pattern(&pair.pattern, conjunctive)?;
                    let prefix = AccessPath(vec![AccessStep::Index { index, container }]);
                    let nested = nested.into_iter().map(|e| e.rebase(&prefix)).collect();
                    shape.index(container, index, pattern, nested, child);
                }
                Evaluation::Deconstruct {
                    input: None,
                    method,
                } => self.deconstruct(shape, method, &pair.pattern, child)?,
                _ => {
                    return Err(SynthError::invariant(format!(
                        "pair input `{}` is not a single access step",
                        pair.input
                    )))
                }
            },
            Node::Eval(evaluation) => match **evaluation {
                Evaluation::Type { input: None, ty } => shape.type_test(ty),
                Evaluation::Variable {
                    input: None,
                    symbol,
                } => shape.bind(symbol),
                Evaluation::NotNull { input: None } => shape.non_null = true,
                Evaluation::Operation { .. } => shape.leftovers.push(child.clone()),
                _ => {
                    return Err(SynthError::invariant(format!(
                        "evaluation `{child}` in pattern position"
                    )))
                }
            },
            Node::False | Node::Constant(_) | Node::Relational(_) | Node::Not(_) | Node::Or(_) => {
                let (pattern, _) = self.pattern(child, false)?;
                shape.extras.push(pattern);
            }
        }
        Ok(())
    }

    /// `Pair(Deconstruct, out-variable tests...)`
    fn deconstruct(
        &self,
        shape: &mut Shape,
        method: DeconstructMethod,
        outs: &Node,
        origin: &Node,
    ) -> Result<(), SynthError> {
        let family = Family::Deconstruct(method);
        if shape.holds_other_family(family) {
            shape.leftovers.push(origin.clone());
            return Ok(());
        }
        let children = match outs {
            Node::And(children) => &children[..],
            other => slice::from_ref(other),
        };
        let mut filled = Vec::with_capacity(children.len());
        for child in children {
            let (position, pattern) = match child {
                Node::True => continue,
                Node::Pair(pair) => match *pair.input {
                    Evaluation::OutVariable {
                        input: None,
                        position,
                    } => (position, self.pattern(&pair.pattern, false)?.0),
                    _ => return Err(not_positional(child)),
                },
                _ => match boolean_slot(child) {
                    Some((
                        Evaluation::OutVariable {
                            input: None,
                            position,
                        },
                        value,
                    )) => (*position, Pattern::Constant(ConstValue::Bool(value))),
                    _ => return Err(not_positional(child)),
                },
            };
            if !family.admits(position) {
                return Err(SynthError::unrepresentable(format!(
                    "`{child}` reads past the {} outputs of its deconstruction",
                    method.arity
                )));
            }
            filled.push((position, pattern));
        }
        let slots = shape.positional_slots(family, origin);
        for (position, pattern) in filled {
            slots.push(position, pattern);
        }
        Ok(())
    }

    fn finish(&self, mut shape: Shape, conjunctive: bool) -> Rendered<Pattern> {
        let positional = match shape.positional.take() {
            Some(slots) => match shape.arity(&slots, self.config.max_positional_arity) {
                Some(arity) => {
                    shape.residual.extend(slots.residual);
                    let mut patterns = vec![Pattern::Discard; arity];
                    for (position, filled) in slots.slots {
                        if let Some(slot) = patterns.get_mut(position as usize) {
                            *slot = Pattern::and(filled);
                        }
                    }
                    Some(patterns)
                }
                None => {
                    shape.leftovers.extend(slots.origin);
                    None
                }
            },
            None => None,
        };

        for leftover in std::mem::take(&mut shape.leftovers) {
            if !conjunctive {
                return Err(SynthError::unrepresentable(format!(
                    "`{leftover}` has no pattern form outside a conjunction"
                )));
            }
            let (expr, nested) = self.expr(&leftover, true)?;
            shape.residual.push(expr);
            shape.residual.extend(nested);
        }

        // Residual paths read through the current value.
        if shape
            .residual
            .iter()
            .any(|expr| !matches!(expr, Expr::Operation(_)))
        {
            shape.non_null = true;
        }

        let properties: Vec<PropertySubpattern> = shape
            .properties
            .into_iter()
            .map(|(member, patterns)| PropertySubpattern {
                member,
                pattern: Pattern::and(patterns),
            })
            .collect();

        let base = if positional.is_none() && properties.is_empty() {
            match (shape.ty, shape.designation, shape.non_null) {
                (Some(ty), None, _) => Some(Pattern::Type(ty)),
                (ty @ Some(_), Some(name), _) | (ty @ None, Some(name), false) => {
                    Some(Pattern::Declaration { ty, name })
                }
                (None, Some(name), true) => Some(Pattern::Recursive(Box::new(RecursivePattern {
                    properties: Some(Vec::new()),
                    designation: Some(name),
                    ..RecursivePattern::default()
                }))),
                (None, None, true) => Some(Pattern::non_null()),
                (None, None, false) => None,
            }
        } else {
            Some(Pattern::Recursive(Box::new(RecursivePattern {
                ty: shape.ty,
                positional,
                properties: (!properties.is_empty()).then_some(properties),
                designation: shape.designation,
            })))
        };

        let pattern = Pattern::and(base.into_iter().chain(shape.extras));
        Ok((pattern, shape.residual))
    }
}

/// `m`, `!m`, `[i]`, `![i]`, `out i`, `!out i`: a boolean step tested for
/// `true` or `false`.
fn boolean_slot(node: &Node) -> Option<(&Evaluation, bool)> {
    let (evaluation, value) = match node {
        Node::Eval(evaluation) => (evaluation, true),
        Node::Not(inner) => match &**inner {
            Node::Eval(evaluation) => (evaluation, false),
            _ => return None,
        },
        _ => return None,
    };
    match **evaluation {
        Evaluation::Member { input: None, .. }
        | Evaluation::Index { input: None, .. }
        | Evaluation::OutVariable { input: None, .. } => Some((&**evaluation, value)),
        _ => None,
    }
}

fn not_positional(node: &Node) -> SynthError {
    SynthError::unrepresentable(format!("`{node}` is not a positional test"))
}

/// `chain` as an access path.
fn access_path(chain: &Evaluation) -> Result<AccessPath, SynthError> {
    let mut steps: Vec<AccessStep> = Vec::with_capacity(chain.depth());
    for step in chain.steps().iter().rev() {
        steps.push(match **step {
            Evaluation::Member { member, .. } => AccessStep::Member(member),
            Evaluation::Index {
                container, index, ..
            } => AccessStep::Index { index, container },
            Evaluation::Type { ty, .. } => AccessStep::Cast(ty),
            Evaluation::Deconstruct { .. } | Evaluation::OutVariable { .. } => {
                return Err(SynthError::unrepresentable(format!(
                    "`{chain}` cannot be written as an access"
                )))
            }
            Evaluation::NotNull { .. } | Evaluation::Variable { .. } | Evaluation::Operation { .. } => {
                return Err(SynthError::invariant(format!(
                    "`{chain}` still contains a non-access step"
                )))
            }
        });
    }
    Ok(AccessPath(steps))
}

/// Where positional slots come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Family {
    Deconstruct(DeconstructMethod),
    Tuple { arity: u32 },
    Indexable { length: Symbol },
}

impl Family {
    fn of(container: Container) -> Self {
        match container {
            Container::Tuple { arity } => Family::Tuple { arity },
            Container::Indexable { length } => Family::Indexable { length },
        }
    }

    /// Whether `position` can exist in this family. An indexer's length is
    /// only known once its `length == N` test is found.
    fn admits(self, position: u32) -> bool {
        match self {
            Family::Deconstruct(method) => position < method.arity,
            Family::Tuple { arity } => position < arity,
            Family::Indexable { .. } => true,
        }
    }
}

struct Slots {
    family: Family,
    /// Sparse until the arity is known.
    slots: BTreeMap<u32, Vec<Pattern>>,
    /// Residual split off from the slot patterns, kept only if the family
    /// is rendered positionally.
    residual: Vec<Expr>,
    /// The children the slots were built from, in case the family cannot
    /// be rendered positionally after all.
    origin: Vec<Node>,
}

impl Slots {
    fn push(&mut self, position: u32, pattern: Pattern) {
        self.slots.entry(position).or_default().push(pattern);
    }

    /// One past the highest filled position.
    fn extent(&self) -> usize {
        self.slots
            .last_key_value()
            .map_or(0, |(&position, _)| position as usize + 1)
    }
}

/// Slots of one recursive pattern, filled while classifying.
#[derive(Default)]
struct Shape {
    ty: Option<TypeId>,
    designation: Option<Symbol>,
    non_null: bool,
    properties: Vec<(Symbol, Vec<Pattern>)>,
    property_index: FxHashMap<Symbol, usize>,
    positional: Option<Slots>,
    extras: Vec<Pattern>,
    leftovers: Vec<Node>,
    residual: Vec<Expr>,
}

impl Shape {
    fn type_test(&mut self, ty: TypeId) {
        if self.ty.is_none() {
            self.ty = Some(ty);
        } else {
            self.extras.push(Pattern::Type(ty));
        }
    }

    fn bind(&mut self, name: Symbol) {
        if self.designation.is_none() {
            self.designation = Some(name);
        } else {
            self.extras.push(Pattern::Declaration { ty: None, name });
        }
    }

    fn property(&mut self, member: Symbol, pattern: Pattern) {
        let index = *self.property_index.entry(member).or_insert_with(|| {
            self.properties.push((member, Vec::new()));
            self.properties.len() - 1
        });
        self.properties[index].1.push(pattern);
    }

    fn index(
        &mut self,
        container: Container,
        index: u32,
        pattern: Pattern,
        residual: Vec<Expr>,
        origin: &Node,
    ) {
        let family = Family::of(container);
        if self.holds_other_family(family) || !family.admits(index) {
            self.leftovers.push(origin.clone());
        } else {
            let slots = self.positional_slots(family, origin);
            slots.push(index, pattern);
            slots.residual.extend(residual);
        }
    }

    fn holds_other_family(&self, family: Family) -> bool {
        self.positional
            .as_ref()
            .is_some_and(|slots| slots.family != family)
    }

    /// The positional slots of `family`, created on first use.
    fn positional_slots(&mut self, family: Family, origin: &Node) -> &mut Slots {
        let slots = self.positional.get_or_insert_with(|| Slots {
            family,
            slots: BTreeMap::new(),
            residual: Vec::new(),
            origin: Vec::new(),
        });
        slots.origin.push(origin.clone());
        slots
    }

    /// The arity to pad `slots` to, if known and at most `max`. For an
    /// indexer this consumes the `length == N` property test.
    fn arity(&mut self, slots: &Slots, max: usize) -> Option<usize> {
        let arity = match slots.family {
            Family::Deconstruct(method) => method.arity as usize,
            Family::Tuple { arity } => arity as usize,
            Family::Indexable { length } => {
                let &index = self.property_index.get(&length)?;
                let [Pattern::Constant(value)] = &self.properties[index].1[..] else {
                    return None;
                };
                let (_, n) = value.ordinal()?;
                let n = usize::try_from(n).ok()?;
                if n < slots.extent() || n > max {
                    return None;
                }
                self.properties.remove(index);
                self.property_index.remove(&length);
                for slot in self.property_index.values_mut() {
                    if *slot > index {
                        *slot -= 1;
                    }
                }
                return Some(n);
            }
        };
        (slots.extent() <= arity && arity <= max).then_some(arity)
    }
}
