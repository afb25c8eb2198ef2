//! Reference semantics for equivalence tests.
//!
//! Three evaluators over one object model:
//!
//! - [`eval_source`]: the host expression, with the host's faults (member
//!   access on `null`, failed casts) reported as `None`
//! - [`eval_node`]: a node tree, where pairs are null-safe
//! - [`eval_expr`]: the synthesized output
//!
//! A refactoring is correct when the output agrees with the source on every
//! subject for which the source does not fault.

#![allow(dead_code, clippy::unwrap_used)]

use std::cmp::Ordering;
use std::sync::Arc;

use recast_ir::{
    AccessStep, BinaryOp, ConstValue, Container, Conversion, DeconstructMethod, Evaluation,
    Expr, ExprId, Input, MethodId, Node, Pattern, PositionalSource, RelOp, SemanticOracle,
    SourceExpr, SourceExprKind, SourcePattern, Symbol, TypeId,
};
use rustc_hash::{FxHashMap, FxHashSet};

pub const X: Symbol = Symbol::new(0);
pub const P: Symbol = Symbol::new(1);
pub const Q: Symbol = Symbol::new(2);
pub const Y: Symbol = Symbol::new(3);
pub const Z: Symbol = Symbol::new(4);
pub const V: Symbol = Symbol::new(5);
pub const B: Symbol = Symbol::new(6);
pub const LENGTH: Symbol = Symbol::new(7);
/// A number that is null whenever `B` is false.
pub const N: Symbol = Symbol::new(8);

/// Every value has this type.
pub const T_BASE: TypeId = TypeId::new(0);
/// Deconstructs into `(P, Q)`.
pub const T_A: TypeId = TypeId::new(1);
/// Indexable, with `LENGTH` members.
pub const T_B: TypeId = TypeId::new(2);

pub const DECONSTRUCT: DeconstructMethod = DeconstructMethod {
    id: MethodId::new(0),
    arity: 2,
};

pub const INDEXABLE: Container = Container::Indexable { length: LENGTH };

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Const(ConstValue),
    Object(Arc<Object>),
    /// Out parameters of a deconstruction.
    Outs(Arc<[Value]>),
}

#[derive(Debug, PartialEq)]
pub struct Object {
    pub ty: TypeId,
    pub members: FxHashMap<Symbol, Value>,
    pub items: Option<Vec<Value>>,
    pub deconstructed: Option<Vec<Value>>,
}

pub type Locals = FxHashMap<Symbol, Value>;

/// An opaque expression's meaning.
pub type Op = fn(&Locals) -> bool;

#[derive(Clone, Debug, Default)]
pub struct Env {
    pub locals: Locals,
    pub ops: FxHashMap<ExprId, Op>,
}

impl Env {
    pub fn with_op(mut self, id: ExprId, op: Op) -> Self {
        self.ops.insert(id, op);
        self
    }

    fn op(&self, id: ExprId) -> bool {
        self.ops.get(&id).is_some_and(|op| op(&self.locals))
    }
}

pub fn int(value: i32) -> Value {
    Value::Const(ConstValue::int(value))
}

pub fn boolean(value: bool) -> Value {
    Value::Const(ConstValue::Bool(value))
}

pub fn object(ty: TypeId, members: impl IntoIterator<Item = (Symbol, Value)>) -> Value {
    Value::Object(Arc::new(Object {
        ty,
        members: members.into_iter().collect(),
        items: None,
        deconstructed: None,
    }))
}

fn nullable(b: bool, q: i32) -> Value {
    if b {
        int(q)
    } else {
        Value::Null
    }
}

/// `T_A`: members `P`, `Q`, `B`, `Y`, `N`; deconstructs into `(P, Q)`.
pub fn a_value(p: i32, q: i32, b: bool, y: Value) -> Value {
    Value::Object(Arc::new(Object {
        ty: T_A,
        members: [
            (P, int(p)),
            (Q, int(q)),
            (B, boolean(b)),
            (Y, y),
            (N, nullable(b, q)),
        ]
        .into_iter()
        .collect(),
        items: None,
        deconstructed: Some(vec![int(p), int(q)]),
    }))
}

/// `T_B`: members `P`, `Q`, `B`, `Y`, `N`, `LENGTH`; indexable over `items`.
pub fn b_value(p: i32, q: i32, b: bool, y: Value, items: &[i32]) -> Value {
    let length = i32::try_from(items.len()).unwrap();
    Value::Object(Arc::new(Object {
        ty: T_B,
        members: [
            (P, int(p)),
            (Q, int(q)),
            (B, boolean(b)),
            (Y, y),
            (N, nullable(b, q)),
            (LENGTH, int(length)),
        ]
        .into_iter()
        .collect(),
        items: Some(items.iter().copied().map(int).collect()),
        deconstructed: None,
    }))
}

/// Subjects for `x`: `null`, and objects of both runtime types over small
/// member values, nested `Y` values and item lists.
pub fn subjects() -> Vec<Env> {
    let ys = [
        Value::Null,
        object(T_A, [(Z, int(1)), (P, int(0))]),
        object(T_A, [(Z, int(2)), (P, int(1))]),
    ];
    let mut envs = vec![env_with_x(Value::Null)];
    for p in 0..=4 {
        for q in 1..=2 {
            for b in [false, true] {
                for y in &ys {
                    envs.push(env_with_x(a_value(p, q, b, y.clone())));
                    envs.push(env_with_x(b_value(p, q, b, y.clone(), &[p, q])));
                    envs.push(env_with_x(b_value(p, q, b, y.clone(), &[q])));
                }
            }
        }
    }
    envs
}

fn env_with_x(x: Value) -> Env {
    let mut env = Env::default();
    env.locals.insert(X, x);
    env
}

/// Conversions matching [`instance`]: everything converts implicitly to
/// `T_BASE`.
#[derive(Default)]
pub struct Oracle {
    pub side_effecting: FxHashSet<ExprId>,
}

impl SemanticOracle for Oracle {
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

pub fn instance(value: &Value, ty: TypeId) -> bool {
    match value {
        Value::Null => false,
        Value::Object(object) => ty == T_BASE || object.ty == ty,
        Value::Const(_) | Value::Outs(_) => ty == T_BASE,
    }
}

fn member(value: &Value, member: Symbol) -> Option<Value> {
    match value {
        Value::Object(object) => object.members.get(&member).cloned(),
        _ => None,
    }
}

fn element(value: &Value, index: usize) -> Option<Value> {
    match value {
        Value::Object(object) => object.items.as_ref()?.get(index).cloned(),
        _ => None,
    }
}

fn deconstructed(value: &Value) -> Option<Value> {
    match value {
        Value::Object(object) => object
            .deconstructed
            .as_ref()
            .map(|outs| Value::Outs(Arc::from(outs.clone()))),
        _ => None,
    }
}

/// The sequence a positional clause reads from.
fn positional_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Object(object) => object
            .deconstructed
            .clone()
            .or_else(|| object.items.clone()),
        _ => None,
    }
}

fn compare(left: &ConstValue, right: &ConstValue) -> Option<Ordering> {
    match (left, right) {
        (
            ConstValue::Integral { kind: lk, value: l },
            ConstValue::Integral { kind: rk, value: r },
        ) if lk == rk => Some(l.cmp(r)),
        (ConstValue::Float(l), ConstValue::Float(r)) => {
            f64::from_bits(*l).partial_cmp(&f64::from_bits(*r))
        }
        (ConstValue::Str(l), ConstValue::Str(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn relational_holds(value: &Value, op: RelOp, constant: &ConstValue) -> bool {
    let Value::Const(value) = value else {
        return false;
    };
    compare(value, constant).is_some_and(|ordering| match op {
        RelOp::Lt => ordering.is_lt(),
        RelOp::Le => ordering.is_le(),
        RelOp::Gt => ordering.is_gt(),
        RelOp::Ge => ordering.is_ge(),
    })
}

fn equals_constant(value: &Value, constant: &ConstValue) -> bool {
    matches!(value, Value::Const(value) if value == constant)
}

// Source

/// Evaluate a host expression. `None` if evaluation faults.
pub fn eval_source(expr: &SourceExpr, env: &mut Env) -> Option<bool> {
    match &expr.kind {
        SourceExprKind::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => Some(eval_source(left, env)? && eval_source(right, env)?),
        SourceExprKind::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => Some(eval_source(left, env)? || eval_source(right, env)?),
        SourceExprKind::Binary { op, left, right } => {
            let left = source_value(left, env)?;
            let right = source_value(right, env)?;
            Some(match op {
                BinaryOp::Eq => left == right,
                BinaryOp::Ne => left != right,
                op => match (op.relational(), right) {
                    (Some(rel), Value::Const(right)) => relational_holds(&left, rel, &right),
                    _ => false,
                },
            })
        }
        SourceExprKind::Not(operand) => Some(!eval_source(operand, env)?),
        SourceExprKind::Is { operand, pattern } => {
            let value = source_value(operand, env)?;
            Some(source_match(&value, pattern, env))
        }
        SourceExprKind::Opaque => Some(env.op(expr.id)),
        _ => match source_value(expr, env)? {
            Value::Const(ConstValue::Bool(b)) => Some(b),
            _ => None,
        },
    }
}

fn source_value(expr: &SourceExpr, env: &mut Env) -> Option<Value> {
    match &expr.kind {
        SourceExprKind::Literal(value) => Some(Value::Const(value.clone())),
        SourceExprKind::Null => Some(Value::Null),
        SourceExprKind::Name(symbol) => env.locals.get(symbol).cloned(),
        SourceExprKind::Member { receiver, member: m } => {
            let receiver = source_value(receiver, env)?;
            member(&receiver, *m)
        }
        SourceExprKind::ConditionalMember { receiver, member: m } => {
            match source_value(receiver, env)? {
                Value::Null => Some(Value::Null),
                receiver => member(&receiver, *m),
            }
        }
        SourceExprKind::Element {
            receiver, index, ..
        } => {
            let receiver = source_value(receiver, env)?;
            let Value::Const(ConstValue::Integral { value, .. }) = source_value(index, env)? else {
                return None;
            };
            element(&receiver, usize::try_from(value).ok()?)
        }
        SourceExprKind::Cast { operand, ty } => match source_value(operand, env)? {
            Value::Null => Some(Value::Null),
            value if instance(&value, *ty) => Some(value),
            _ => None,
        },
        _ => eval_source(expr, env).map(boolean),
    }
}

fn source_match(value: &Value, pattern: &SourcePattern, env: &mut Env) -> bool {
    match pattern {
        SourcePattern::Discard => true,
        SourcePattern::Constant(constant) => equals_constant(value, constant),
        SourcePattern::Null => *value == Value::Null,
        SourcePattern::Relational(op, constant) => relational_holds(value, *op, constant),
        SourcePattern::Type { ty, .. } => instance(value, *ty),
        SourcePattern::Declaration { ty, name, .. } => {
            let matched = ty.map_or(true, |ty| instance(value, ty));
            if matched {
                env.locals.insert(*name, value.clone());
            }
            matched
        }
        SourcePattern::Not(inner) => !source_match(value, inner, env),
        SourcePattern::And(left, right) => {
            source_match(value, left, env) && source_match(value, right, env)
        }
        SourcePattern::Or(left, right) => {
            source_match(value, left, env) || source_match(value, right, env)
        }
        SourcePattern::Recursive(recursive) => {
            if *value == Value::Null || recursive.ty.is_some_and(|ty| !instance(value, ty)) {
                return false;
            }
            if let Some(positional) = &recursive.positional {
                let items = match (positional.source, value) {
                    (PositionalSource::Deconstruct(_), Value::Object(object)) => {
                        object.deconstructed.clone()
                    }
                    (PositionalSource::Indexer(_), Value::Object(object)) => object.items.clone(),
                    _ => None,
                };
                let Some(items) = items else {
                    return false;
                };
                if items.len() != positional.subpatterns.len()
                    || !items
                        .iter()
                        .zip(&positional.subpatterns)
                        .all(|(item, sub)| source_match(item, sub, env))
                {
                    return false;
                }
            }
            for property in &recursive.properties {
                let mut current = value.clone();
                for &m in &property.path {
                    match member(&current, m) {
                        Some(next) => current = next,
                        None => return false,
                    }
                }
                if !source_match(&current, &property.pattern, env) {
                    return false;
                }
            }
            if let Some(name) = recursive.designation {
                env.locals.insert(name, value.clone());
            }
            true
        }
    }
}

// Nodes

enum Context {
    Scope,
    Value(Value),
}

/// Evaluate a node tree at the top level.
pub fn eval_node(node: &Node, env: &Env) -> bool {
    node_at(node, &Context::Scope, env)
}

fn node_at(node: &Node, context: &Context, env: &Env) -> bool {
    match node {
        Node::True => true,
        Node::False => false,
        Node::Not(inner) => !node_at(inner, context, env),
        Node::And(children) => children.iter().all(|c| node_at(c, context, env)),
        Node::Or(children) => children.iter().any(|c| node_at(c, context, env)),
        Node::Pair(pair) => chain_value(&pair.input, context, env)
            .is_some_and(|value| node_at(&pair.pattern, &Context::Value(value), env)),
        Node::Constant(test) => {
            read(&test.input, context, env).is_some_and(|v| equals_constant(&v, &test.value))
        }
        Node::Relational(test) => read(&test.input, context, env)
            .is_some_and(|v| relational_holds(&v, test.op, &test.value)),
        Node::Eval(evaluation) => match &**evaluation {
            Evaluation::Operation { expr } => env.op(*expr),
            Evaluation::NotNull { input } => {
                read(input, context, env).is_some_and(|v| v != Value::Null)
            }
            Evaluation::Type { input, ty } => {
                read(input, context, env).is_some_and(|v| instance(&v, *ty))
            }
            Evaluation::Variable { input, .. } => {
                input.is_none() || read(input, context, env).is_some()
            }
            Evaluation::Deconstruct { .. } => chain_value(evaluation, context, env).is_some(),
            Evaluation::Member { .. } | Evaluation::Index { .. } | Evaluation::OutVariable { .. } => {
                chain_value(evaluation, context, env) == Some(boolean(true))
            }
        },
    }
}

fn read(input: &Input, context: &Context, env: &Env) -> Option<Value> {
    match (input, context) {
        (Some(chain), _) => chain_value(chain, context, env),
        (None, Context::Value(value)) => Some(value.clone()),
        (None, Context::Scope) => None,
    }
}

fn chain_value(step: &Evaluation, context: &Context, env: &Env) -> Option<Value> {
    if let (Evaluation::Member { input: None, member }, Context::Scope) = (step, context) {
        return env.locals.get(member).cloned();
    }
    let base = read(&step.input().cloned(), context, env)?;
    match step {
        Evaluation::Member { member: m, .. } => member(&base, *m),
        Evaluation::Index { index, .. } => element(&base, *index as usize),
        Evaluation::Type { ty, .. } => instance(&base, *ty).then_some(base),
        Evaluation::NotNull { .. } => (base != Value::Null).then_some(base),
        Evaluation::Variable { .. } => Some(base),
        Evaluation::Deconstruct { .. } => deconstructed(&base),
        Evaluation::OutVariable { position, .. } => match base {
            Value::Outs(outs) => outs.get(*position as usize).cloned(),
            _ => None,
        },
        Evaluation::Operation { .. } => None,
    }
}

// Output

/// Evaluate a synthesized expression. `None` if it faults.
pub fn eval_expr(expr: &Expr, env: &mut Env) -> Option<bool> {
    match expr {
        Expr::Bool(b) => Some(*b),
        Expr::Access(path) => match path_value(&path.0, env)? {
            Value::Const(ConstValue::Bool(b)) => Some(b),
            _ => None,
        },
        Expr::Is { subject, pattern } => {
            let value = path_value(&subject.0, env)?;
            Some(pattern_match(&value, pattern, env))
        }
        Expr::Operation(id) => Some(env.op(*id)),
        Expr::Not(inner) => Some(!eval_expr(inner, env)?),
        Expr::And(children) => {
            for child in children {
                if !eval_expr(child, env)? {
                    return Some(false);
                }
            }
            Some(true)
        }
        Expr::Or(children) => {
            for child in children {
                if eval_expr(child, env)? {
                    return Some(true);
                }
            }
            Some(false)
        }
    }
}

fn path_value(steps: &[AccessStep], env: &Env) -> Option<Value> {
    let (first, rest) = steps.split_first()?;
    let AccessStep::Member(root) = first else {
        return None;
    };
    let mut value = env.locals.get(root).cloned()?;
    for step in rest {
        value = match step {
            AccessStep::Member(m) => member(&value, *m)?,
            AccessStep::Index { index, .. } => element(&value, *index as usize)?,
            AccessStep::Cast(ty) => match value {
                Value::Null => Value::Null,
                value if instance(&value, *ty) => value,
                _ => return None,
            },
        };
    }
    Some(value)
}

/// Match a synthesized pattern.
pub fn pattern_match(value: &Value, pattern: &Pattern, env: &mut Env) -> bool {
    match pattern {
        Pattern::Discard => true,
        Pattern::Constant(constant) => equals_constant(value, constant),
        Pattern::Relational(op, constant) => relational_holds(value, *op, constant),
        Pattern::Type(ty) => instance(value, *ty),
        Pattern::Declaration { ty, name } => {
            let matched = ty.map_or(true, |ty| instance(value, ty));
            if matched {
                env.locals.insert(*name, value.clone());
            }
            matched
        }
        Pattern::Recursive(recursive) => {
            if *value == Value::Null || recursive.ty.is_some_and(|ty| !instance(value, ty)) {
                return false;
            }
            if let Some(positional) = &recursive.positional {
                let Some(items) = positional_items(value) else {
                    return false;
                };
                if items.len() != positional.len()
                    || !items
                        .iter()
                        .zip(positional)
                        .all(|(item, sub)| pattern_match(item, sub, env))
                {
                    return false;
                }
            }
            for property in recursive.properties.iter().flatten() {
                let matched = member(value, property.member)
                    .is_some_and(|v| pattern_match(&v, &property.pattern, env));
                if !matched {
                    return false;
                }
            }
            if let Some(name) = recursive.designation {
                env.locals.insert(name, value.clone());
            }
            true
        }
        Pattern::Not(inner) => !pattern_match(value, inner, env),
        Pattern::And(children) => children.iter().all(|c| pattern_match(value, c, env)),
        Pattern::Or(children) => children.iter().any(|c| pattern_match(value, c, env)),
    }
}

/// Assert that `output` agrees with `source` on every subject the source
/// evaluates without faulting. Returns how many subjects were compared.
pub fn assert_equivalent(
    source: &SourceExpr,
    output: &Expr,
    canonical: &Node,
    subjects: &[Env],
) -> usize {
    let mut compared = 0;
    for subject in subjects {
        let Some(expected) = eval_source(source, &mut subject.clone()) else {
            continue;
        };
        compared += 1;
        assert_eq!(
            eval_node(canonical, subject),
            expected,
            "canonical tree `{canonical}` disagrees with the source on {:?}",
            subject.locals.get(&X)
        );
        assert_eq!(
            eval_expr(output, &mut subject.clone()),
            Some(expected),
            "output `{output}` disagrees with the source on {:?}",
            subject.locals.get(&X)
        );
    }
    compared
}
