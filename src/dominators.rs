//! Dominator computation over a [`ControlFlowGraph`].
//!
//! Iterative dataflow in reverse-postorder: each non-entry block's immediate
//! dominator is recomputed as the intersection (nearest common ancestor over
//! RPO indices) of its already-processed predecessors until a full pass makes
//! no change. The intersection is monotonic over the finite RPO order, so the
//! loop terminates. Blocks with no path from entry are left out of the
//! numbering and report `dominates` as false in both directions (reflexivity
//! excepted).

use crate::cfg::{BlockId, ControlFlowGraph};
use std::collections::BTreeMap;

const UNDEFINED: usize = usize::MAX;

/// Immediate-dominator table for the reachable portion of one graph.
///
/// By convention the entry block is its own immediate dominator and acts as
/// the terminal case when walking idom chains.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Reverse-postorder block names; `order[0]` is the entry block.
    order: Vec<BlockId>,
    /// RPO index per reachable block.
    index: BTreeMap<BlockId, usize>,
    /// Immediate dominator per RPO index; `idom[0] == 0`.
    idom: Vec<usize>,
}

impl DominatorTree {
    pub fn build(cfg: &ControlFlowGraph) -> Self {
        let order = reverse_postorder(cfg);
        let index: BTreeMap<BlockId, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let n = order.len();
        let mut idom = vec![UNDEFINED; n];
        if n > 0 {
            idom[0] = 0;
        }

        let mut changed = true;
        while changed {
            changed = false;
            for b in 1..n {
                let block = &cfg.blocks[&order[b]];

                // Seed with the first processed predecessor, then fold the
                // rest in through the RPO-index intersection.
                let mut new_idom = UNDEFINED;
                for pred in &block.predecessors {
                    let Some(&p) = index.get(pred.as_str()) else {
                        continue;
                    };
                    if idom[p] == UNDEFINED {
                        continue;
                    }
                    new_idom = if new_idom == UNDEFINED {
                        p
                    } else {
                        intersect(&idom, p, new_idom)
                    };
                }
                if new_idom != UNDEFINED && idom[b] != new_idom {
                    idom[b] = new_idom;
                    changed = true;
                }
            }
        }

        Self { order, index, idom }
    }

    /// True when every path from entry to `b` passes through `a`, including
    /// `a == b`. False whenever either block (other than an `a == b` pair)
    /// has no path from entry.
    pub fn dominates(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let (Some(&ai), Some(&bi)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        let mut cur = bi;
        while cur != ai {
            if cur == 0 {
                return false;
            }
            cur = self.idom[cur];
        }
        true
    }

    pub fn is_reachable(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Immediate dominator of a reachable block; the entry block maps to
    /// itself.
    pub fn immediate_dominator(&self, id: &str) -> Option<&BlockId> {
        let &i = self.index.get(id)?;
        Some(&self.order[self.idom[i]])
    }

    /// Reachable blocks in reverse-postorder.
    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.order
    }
}

/// Walk both fingers up the idom chains until they meet. Lower RPO index
/// means closer to entry, so the deeper finger climbs first.
fn intersect(idom: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while a > b {
            a = idom[a];
        }
        while b > a {
            b = idom[b];
        }
    }
    a
}

/// Iterative DFS from entry; explicit stack so deep graphs cannot overflow.
fn reverse_postorder(cfg: &ControlFlowGraph) -> Vec<BlockId> {
    enum Visit<'a> {
        Enter(&'a BlockId),
        Exit(&'a BlockId),
    }

    let mut postorder = Vec::new();
    let mut visited = std::collections::BTreeSet::new();
    let mut stack = vec![Visit::Enter(&cfg.entry)];

    while let Some(step) = stack.pop() {
        match step {
            Visit::Enter(id) => {
                if !visited.insert(id) {
                    continue;
                }
                stack.push(Visit::Exit(id));
                if let Some(block) = cfg.block(id) {
                    for succ in &block.successors {
                        if !visited.contains(succ) {
                            stack.push(Visit::Enter(succ));
                        }
                    }
                }
            }
            Visit::Exit(id) => postorder.push(id.clone()),
        }
    }

    postorder.reverse();
    postorder
}
