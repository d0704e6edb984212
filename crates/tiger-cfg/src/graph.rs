//! Block-level flow graph derived from a body's transfers
//!
//! Adjacency is never stored on the blocks themselves; each analysis derives
//! a `FlowGraph` from the body it runs on.

use rustc_hash::FxHashMap;

use crate::error::{CfgError, CfgResult};
use crate::ir::{Body, Label};

/// Successor and predecessor lists by block index.
///
/// Block indices follow the body's block order; index 0 is the entry. An
/// `If` whose arms name the same label contributes two parallel edges.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    succs: Vec<Vec<usize>>,
    preds: Vec<Vec<usize>>,
    index: FxHashMap<Label, usize>,
}

impl FlowGraph {
    pub fn new(body: &Body) -> CfgResult<Self> {
        let index: FxHashMap<Label, usize> = body
            .blocks()
            .iter()
            .enumerate()
            .map(|(i, block)| (block.label, i))
            .collect();

        let mut succs = vec![Vec::new(); body.block_count()];
        let mut preds = vec![Vec::new(); body.block_count()];
        for (from, block) in body.blocks().iter().enumerate() {
            for target in block.transfer.successors() {
                let to = *index
                    .get(&target)
                    .ok_or(CfgError::UnresolvedLabel { from: block.label, target })?;
                succs[from].push(to);
                preds[to].push(from);
            }
        }

        Ok(FlowGraph { succs, preds, index })
    }

    pub fn len(&self) -> usize {
        self.succs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    pub fn entry(&self) -> usize {
        0
    }

    pub fn successors(&self, block: usize) -> &[usize] {
        &self.succs[block]
    }

    pub fn predecessors(&self, block: usize) -> &[usize] {
        &self.preds[block]
    }

    pub fn block_index(&self, label: Label) -> Option<usize> {
        self.index.get(&label).copied()
    }

    pub fn edge_count(&self) -> usize {
        self.succs.iter().map(Vec::len).sum()
    }

    /// Depth-first postorder from the entry, followed by any blocks the
    /// entry cannot reach (in body order), so every block appears once.
    pub fn postorder(&self) -> Vec<usize> {
        let n = self.len();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);

        for root in std::iter::once(self.entry()).chain(0..n) {
            if root >= n || visited[root] {
                continue;
            }
            visited[root] = true;
            // (block, next successor to visit)
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (block, cursor) = *top;
                match self.succs[block].get(cursor) {
                    Some(&succ) => {
                        top.1 += 1;
                        if !visited[succ] {
                            visited[succ] = true;
                            stack.push((succ, 0));
                        }
                    }
                    None => {
                        order.push(block);
                        stack.pop();
                    }
                }
            }
        }
        order
    }

    pub fn reverse_postorder(&self) -> Vec<usize> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Blocks reachable from the entry
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.len()];
        if self.is_empty() {
            return seen;
        }
        let mut work = vec![self.entry()];
        seen[self.entry()] = true;
        while let Some(block) = work.pop() {
            for &succ in &self.succs[block] {
                if !seen[succ] {
                    seen[succ] = true;
                    work.push(succ);
                }
            }
        }
        seen
    }
}
