use flow_cfg::Cfg;
use rustc_hash::{FxHashMap, FxHashSet};

/// Maps each block to the set of blocks that dominate it (always including
/// itself; see [`dominance reflexivity`](crate)).
pub type DomSets = FxHashMap<String, FxHashSet<String>>;

/// Computes dominator sets as the greatest fixed point of
/// `dom[entry] = {entry}`, `dom[B] = {B} ∪ ⋂ dom[P] for P in preds(B)`.
///
/// Blocks unreachable from `cfg.entry()` are left at their initial value
/// (the full block set) — a deliberate sentinel, not a bug: they neither
/// dominate nor are dominated by any reachable block. Callers that need
/// sound dominance over the whole graph should call
/// `Cfg::remove_unreachable_blocks` first.
#[must_use]
pub fn dominators(cfg: &Cfg) -> DomSets {
    let all: FxHashSet<String> = cfg.block_names().iter().cloned().collect();
    let entry = cfg.entry().to_string();

    let mut dom: DomSets = cfg
        .block_names()
        .iter()
        .map(|b| {
            let init = if *b == entry {
                FxHashSet::from_iter([entry.clone()])
            } else {
                all.clone()
            };
            (b.clone(), init)
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for vertex in cfg.block_names() {
            if *vertex == entry {
                continue;
            }
            let preds = cfg.predecessors_of(vertex);
            let mut new_dom = match preds.split_first() {
                None => {
                    // Unreachable: no predecessors, leave at sentinel.
                    continue;
                }
                Some((first, rest)) => {
                    let mut acc = dom[first].clone();
                    for p in rest {
                        acc = acc.intersection(&dom[p]).cloned().collect();
                    }
                    acc
                }
            };
            new_dom.insert(vertex.clone());
            if &new_dom != &dom[vertex] {
                dom.insert(vertex.clone(), new_dom);
                changed = true;
            }
        }
    }
    dom
}

/// Maps each non-entry block to its immediate dominator.
pub type IdomMap = FxHashMap<String, String>;

/// For each block but the entry, finds the unique immediate dominator: the
/// member of `dom[B] \ {B}` that every other member also dominates.
#[must_use]
pub fn immediate_dominators(cfg: &Cfg, dom: &DomSets) -> IdomMap {
    let entry = cfg.entry();
    let mut idom = IdomMap::default();

    for block in cfg.block_names() {
        if block == entry {
            continue;
        }
        let strict: Vec<&String> = dom[block].iter().filter(|d| *d != block).collect();
        if strict.is_empty() {
            // Unreachable sentinel block: no dominators at all, no idom.
            continue;
        }
        for candidate in &strict {
            let dominated_by_all_others = strict
                .iter()
                .all(|other| *other == *candidate || dom[*candidate].contains(*other));
            if dominated_by_all_others {
                idom.insert(block.clone(), (*candidate).clone());
                break;
            }
        }
    }
    idom
}

/// Maps each block to its dominator-tree children, sorted by name.
#[must_use]
pub fn dominator_tree(cfg: &Cfg, idom: &IdomMap) -> FxHashMap<String, Vec<String>> {
    let mut children: FxHashMap<String, Vec<String>> =
        cfg.block_names().iter().map(|b| (b.clone(), Vec::new())).collect();
    for (block, parent) in idom {
        children.entry(parent.clone()).or_default().push(block.clone());
    }
    for kids in children.values_mut() {
        kids.sort();
    }
    children
}

/// Computes dominance frontiers: `DF[A] = { C : ∃ B ∈ preds(C). A ∈ dom[B] ∧
/// (A ∉ dom[C] ∨ A = C) }`. The `A = C` disjunct gives a block a
/// self-frontier entry when it is its own loop header.
#[must_use]
pub fn dominance_frontier(cfg: &Cfg, dom: &DomSets) -> FxHashMap<String, FxHashSet<String>> {
    let mut df: FxHashMap<String, FxHashSet<String>> =
        cfg.block_names().iter().map(|b| (b.clone(), FxHashSet::default())).collect();

    for c in cfg.block_names() {
        for b in cfg.predecessors_of(c) {
            for a in &dom[b] {
                if a == c || !dom[c].contains(a) {
                    df.entry(a.clone()).or_default().insert(c.clone());
                }
            }
        }
    }
    df
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#[expect(clippy::expect_used, reason = "Tests use expect for clarity")]
mod tests {
    use super::*;
    use flow_ir::Instr;

    /// `entry -> a`, `entry -> b`, `a -> c`, `b -> c`.
    fn diamond() -> Cfg {
        let instrs = vec![
            Instr::label("entry"),
            Instr::br("cond", "a", "b"),
            Instr::label("a"),
            Instr::jmp("c"),
            Instr::label("b"),
            Instr::jmp("c"),
            Instr::label("c"),
            Instr::ret(None),
        ];
        Cfg::new("f", &instrs).unwrap()
    }

    #[test]
    fn dominance_over_a_diamond() {
        let cfg = diamond();
        let dom = dominators(&cfg);
        let c: FxHashSet<String> = dom["c"].clone();
        assert_eq!(c, FxHashSet::from_iter(["entry".to_string(), "c".to_string()]));

        let df = dominance_frontier(&cfg, &dom);
        assert_eq!(df["a"], FxHashSet::from_iter(["c".to_string()]));

        let idom = immediate_dominators(&cfg, &dom);
        let tree = dominator_tree(&cfg, &idom);
        let mut children = tree["entry"].clone();
        children.sort();
        assert_eq!(children, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn reflexivity_and_transitivity() {
        let cfg = diamond();
        let dom = dominators(&cfg);
        for (b, doms) in &dom {
            assert!(doms.contains(b), "{b} should dominate itself");
        }
        for b in cfg.block_names() {
            for a in &dom[b] {
                for c in cfg.block_names() {
                    if dom[c].contains(b) {
                        assert!(
                            dom[c].contains(a),
                            "{a} dominates {b} which dominates {c}, so {a} should dominate {c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn immediate_dominator_is_unique_for_every_non_entry_block() {
        let cfg = diamond();
        let dom = dominators(&cfg);
        let idom = immediate_dominators(&cfg, &dom);
        for b in cfg.block_names() {
            if b != cfg.entry() {
                assert!(idom.contains_key(b), "{b} should have an immediate dominator");
            }
        }
        assert_eq!(idom["c"], "entry");
    }

    #[test]
    fn self_loop_header_is_its_own_frontier() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::jmp("loop"),
            Instr::label("loop"),
            Instr::br("cond", "loop", "end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let cfg = Cfg::new("f", &instrs).unwrap();
        let dom = dominators(&cfg);
        let df = dominance_frontier(&cfg, &dom);
        assert!(df["loop"].contains("loop"));
    }
}
