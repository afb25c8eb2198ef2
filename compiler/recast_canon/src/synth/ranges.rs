//! Merging runs of consecutive integral constants in a disjunction.
//!
//! `1 or 2 or 3 or 7` renders as `(>= 1 and <= 3) or 7`. Only constants of
//! the same integral kind are merged, and only runs of at least the
//! configured length: a two-element run is no shorter as a range.

use recast_ir::{ConstValue, IntegralKind, Node, RelOp};
use rustc_hash::FxHashMap;

/// Shortest run worth rewriting, whatever the configuration says.
const MIN_MERGEABLE: usize = 2;

/// `children` with every qualifying run replaced by one range test, placed
/// where the run's first member was. `None` if nothing was merged.
pub(super) fn merge(children: &[Node], min_run: usize) -> Option<Vec<Node>> {
    let min_run = min_run.max(MIN_MERGEABLE);

    let mut by_kind: FxHashMap<IntegralKind, Vec<(i128, usize)>> = FxHashMap::default();
    for (position, child) in children.iter().enumerate() {
        if let Node::Constant(test) = child {
            if test.input.is_some() {
                continue;
            }
            if let Some((kind, value)) = test.value.ordinal() {
                by_kind.entry(kind).or_default().push((value, position));
            }
        }
    }

    // Per position: `Some(range)` for the first member of a run, `None`
    // for the others.
    let mut replaced: FxHashMap<usize, Option<Node>> = FxHashMap::default();
    for (kind, mut values) in by_kind {
        if values.len() < min_run {
            continue;
        }
        values.sort_unstable();
        values.dedup_by_key(|(value, _)| *value);
        let mut start = 0;
        while start < values.len() {
            let mut end = start + 1;
            while end < values.len() && values[end].0 == values[end - 1].0 + 1 {
                end += 1;
            }
            let run = &values[start..end];
            if run.len() >= min_run {
                let first = run.iter().map(|&(_, position)| position).min().unwrap_or(0);
                for &(_, position) in run {
                    replaced.insert(position, None);
                }
                replaced.insert(first, Some(range(kind, run[0].0, run[run.len() - 1].0)));
            }
            start = end;
        }
    }

    if replaced.is_empty() {
        return None;
    }
    tracing::trace!(runs = replaced.values().filter(|r| r.is_some()).count(), "merged ranges");

    let mut merged = Vec::with_capacity(children.len());
    for (position, child) in children.iter().enumerate() {
        match replaced.remove(&position) {
            Some(Some(range)) => merged.push(range),
            Some(None) => {}
            None => merged.push(child.clone()),
        }
    }
    Some(merged)
}

fn range(kind: IntegralKind, lo: i128, hi: i128) -> Node {
    Node::and([
        Node::relational(None, RelOp::Ge, ConstValue::Integral { kind, value: lo }),
        Node::relational(None, RelOp::Le, ConstValue::Integral { kind, value: hi }),
    ])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recast_ir::{ConstValue, Node, RelOp};

    use super::merge;

    fn c(value: i32) -> Node {
        Node::constant(None, ConstValue::int(value))
    }

    fn between(lo: i32, hi: i32) -> Node {
        Node::and([
            Node::relational(None, RelOp::Ge, ConstValue::int(lo)),
            Node::relational(None, RelOp::Le, ConstValue::int(hi)),
        ])
    }

    #[test]
    fn run_of_three_merges_in_place() {
        let children = [c(7), c(2), c(1), c(3)];
        assert_eq!(merge(&children, 3), Some(vec![c(7), between(1, 3)]));
    }

    #[test]
    fn short_runs_stay() {
        assert_eq!(merge(&[c(1), c(2), c(4)], 3), None);
        assert_eq!(merge(&[c(1), c(3), c(5)], 3), None);
    }

    #[test]
    fn two_runs() {
        let children = [c(1), c(2), c(3), c(10), c(11), c(12), c(20)];
        assert_eq!(
            merge(&children, 3),
            Some(vec![between(1, 3), between(10, 12), c(20)])
        );
    }

    #[test]
    fn kinds_are_not_mixed() {
        let children = [
            c(97),
            Node::constant(None, ConstValue::char('b')),
            c(99),
        ];
        assert_eq!(merge(&children, 3), None);
    }

    #[test]
    fn chars_merge() {
        let children = [
            Node::constant(None, ConstValue::char('a')),
            Node::constant(None, ConstValue::char('b')),
            Node::constant(None, ConstValue::char('c')),
        ];
        let merged = Node::and([
            Node::relational(None, RelOp::Ge, ConstValue::char('a')),
            Node::relational(None, RelOp::Le, ConstValue::char('c')),
        ]);
        assert_eq!(merge(&children, 3), Some(vec![merged]));
    }

    #[test]
    fn configured_minimum_is_floored() {
        assert_eq!(merge(&[c(1), c(2)], 0), Some(vec![between(1, 2)]));
        assert_eq!(merge(&[c(1), c(2), c(3)], 4), None);
    }
}
