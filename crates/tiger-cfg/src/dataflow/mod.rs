//! Generic gen/kill dataflow engine
//!
//! An [`Analysis`] supplies per-statement and per-transfer gen/kill sets and a
//! direction. The engine then:
//!
//! 1. computes local effects for every statement and transfer,
//! 2. folds each block into a single summary, in flow order,
//! 3. sweeps the graph until no block boundary value changes,
//! 4. back-substitutes the block boundaries to every statement and transfer.
//!
//! The meet is set union, so every analysis here is a may-analysis.

pub mod liveness;
pub mod reaching;

pub use liveness::{Liveness, LivenessAnalysis};
pub use reaching::{ReachingDefs, ReachingDefsAnalysis};

use std::fmt::Debug;
use std::hash::Hash;
use std::iter;

use log::{debug, log_enabled, trace, Level};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::FlowGraph;
use crate::ir::{Body, Stm, StmId, Transfer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Facts an element makes true (`gen_set`) and facts it invalidates (`kill_set`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenKill<F: Eq + Hash> {
    pub gen_set: FxHashSet<F>,
    pub kill_set: FxHashSet<F>,
}

impl<F: Clone + Eq + Hash> GenKill<F> {
    /// The identity effect
    pub fn new() -> Self {
        GenKill {
            gen_set: FxHashSet::default(),
            kill_set: FxHashSet::default(),
        }
    }

    pub fn from_sets(gen_set: FxHashSet<F>, kill_set: FxHashSet<F>) -> Self {
        GenKill { gen_set, kill_set }
    }

    /// `gen ∪ (input − kill)`
    pub fn apply(&self, input: &FxHashSet<F>) -> FxHashSet<F> {
        let mut out: FxHashSet<F> = input
            .iter()
            .filter(|fact| !self.kill_set.contains(*fact))
            .cloned()
            .collect();
        out.extend(self.gen_set.iter().cloned());
        out
    }

    /// This effect followed, in flow order, by `next`:
    /// `gen = gen_next ∪ (gen_self − kill_next)`, `kill = kill_self ∪ kill_next`
    pub fn then(&self, next: &GenKill<F>) -> GenKill<F> {
        let gen_set = next.apply(&self.gen_set);
        let mut kill_set = self.kill_set.clone();
        kill_set.extend(next.kill_set.iter().cloned());
        GenKill { gen_set, kill_set }
    }
}

impl<F: Clone + Eq + Hash> Default for GenKill<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// A gen/kill dataflow problem over one method body
pub trait Analysis {
    type Fact: Clone + Eq + Hash + Ord + Debug;

    const DIRECTION: Direction;

    /// Name used as the log target for this analysis
    fn name(&self) -> &'static str;

    fn stm_effect(&self, id: StmId, stm: &Stm) -> GenKill<Self::Fact>;

    fn transfer_effect(&self, transfer: &Transfer) -> GenKill<Self::Fact>;
}

/// Solved facts for one body.
///
/// `block_entry`/`block_exit` are indexed by block. Entry means the point
/// before the first statement and exit the point after the transfer,
/// regardless of the analysis direction.
#[derive(Debug, Clone)]
pub struct DataflowResults<F: Eq + Hash> {
    pub block_entry: Vec<FxHashSet<F>>,
    pub block_exit: Vec<FxHashSet<F>>,
    pub stm_before: FxHashMap<StmId, FxHashSet<F>>,
    pub stm_after: FxHashMap<StmId, FxHashSet<F>>,
    pub transfer_before: Vec<FxHashSet<F>>,
    pub transfer_after: Vec<FxHashSet<F>>,
    /// Full sweeps until nothing changed, the confirming sweep included
    pub sweeps: usize,
}

/// Fixed-point solver for one analysis on one body
pub struct Engine<'a, A: Analysis> {
    analysis: &'a A,
    body: &'a Body,
    graph: &'a FlowGraph,
    stm_effects: Vec<GenKill<A::Fact>>,
    transfer_effects: Vec<GenKill<A::Fact>>,
    summaries: Vec<GenKill<A::Fact>>,
}

impl<'a, A: Analysis> Engine<'a, A> {
    pub fn new(analysis: &'a A, body: &'a Body, graph: &'a FlowGraph) -> Self {
        // Step 1: local effects
        let stm_effects: Vec<_> = body
            .statements()
            .map(|(id, stm)| analysis.stm_effect(id, stm))
            .collect();
        let transfer_effects: Vec<_> = body
            .blocks()
            .iter()
            .map(|block| analysis.transfer_effect(&block.transfer))
            .collect();

        // Step 2: block summaries, folded in flow order
        let summaries = body
            .blocks()
            .iter()
            .enumerate()
            .map(|(b, block)| {
                let stms = block.stms.iter().map(|id| &stm_effects[id.index()]);
                let transfer = iter::once(&transfer_effects[b]);
                let compose = |acc: GenKill<A::Fact>, fx: &GenKill<A::Fact>| acc.then(fx);
                match A::DIRECTION {
                    Direction::Forward => stms.chain(transfer).fold(GenKill::new(), compose),
                    Direction::Backward => transfer.chain(stms.rev()).fold(GenKill::new(), compose),
                }
            })
            .collect();

        Engine { analysis, body, graph, stm_effects, transfer_effects, summaries }
    }

    pub fn block_summary(&self, block: usize) -> &GenKill<A::Fact> {
        &self.summaries[block]
    }

    pub fn solve(&self) -> DataflowResults<A::Fact> {
        let name = self.analysis.name();
        let n = self.graph.len();

        if log_enabled!(target: name, Level::Trace) {
            for (b, block) in self.body.blocks().iter().enumerate() {
                trace!(
                    target: name,
                    "{}: gen={:?} kill={:?}",
                    block.label,
                    sorted(&self.summaries[b].gen_set),
                    sorted(&self.summaries[b].kill_set)
                );
            }
        }

        // Step 3: global fixed point. `flow_in` is the side facts enter a
        // block from (entry when forward, exit when backward).
        let order = match A::DIRECTION {
            Direction::Forward => self.graph.reverse_postorder(),
            Direction::Backward => self.graph.postorder(),
        };
        let mut flow_in = vec![FxHashSet::default(); n];
        let mut flow_out = vec![FxHashSet::default(); n];
        let mut sweeps = 0;
        loop {
            sweeps += 1;
            let mut changed = false;
            for &b in &order {
                let neighbors = match A::DIRECTION {
                    Direction::Forward => self.graph.predecessors(b),
                    Direction::Backward => self.graph.successors(b),
                };
                let mut input = FxHashSet::default();
                for &nb in neighbors {
                    input.extend(flow_out[nb].iter().cloned());
                }
                let output = self.summaries[b].apply(&input);
                if input != flow_in[b] || output != flow_out[b] {
                    changed = true;
                    flow_in[b] = input;
                    flow_out[b] = output;
                }
            }
            if !changed {
                break;
            }
        }
        debug!(target: name, "converged after {} sweeps over {} blocks", sweeps, n);

        // Step 4: back-substitution
        let mut stm_before = FxHashMap::default();
        let mut stm_after = FxHashMap::default();
        let mut transfer_before = Vec::with_capacity(n);
        let mut transfer_after = Vec::with_capacity(n);
        for (b, block) in self.body.blocks().iter().enumerate() {
            let mut current = flow_in[b].clone();
            match A::DIRECTION {
                Direction::Forward => {
                    for id in &block.stms {
                        let next = self.stm_effects[id.index()].apply(&current);
                        stm_before.insert(*id, current);
                        stm_after.insert(*id, next.clone());
                        current = next;
                    }
                    let next = self.transfer_effects[b].apply(&current);
                    transfer_before.push(current);
                    transfer_after.push(next);
                }
                Direction::Backward => {
                    let before = self.transfer_effects[b].apply(&current);
                    transfer_after.push(current);
                    transfer_before.push(before.clone());
                    current = before;
                    for id in block.stms.iter().rev() {
                        let before = self.stm_effects[id.index()].apply(&current);
                        stm_after.insert(*id, current);
                        stm_before.insert(*id, before.clone());
                        current = before;
                    }
                }
            }
        }

        if log_enabled!(target: name, Level::Trace) {
            for (b, block) in self.body.blocks().iter().enumerate() {
                trace!(
                    target: name,
                    "{}: in={:?} out={:?}",
                    block.label,
                    sorted(&flow_in[b]),
                    sorted(&flow_out[b])
                );
            }
        }

        let (block_entry, block_exit) = match A::DIRECTION {
            Direction::Forward => (flow_in, flow_out),
            Direction::Backward => (flow_out, flow_in),
        };
        DataflowResults {
            block_entry,
            block_exit,
            stm_before,
            stm_after,
            transfer_before,
            transfer_after,
            sweeps,
        }
    }

    /// True when one more application of the block equations leaves
    /// `results` unchanged.
    pub fn is_fixed_point(&self, results: &DataflowResults<A::Fact>) -> bool {
        (0..self.graph.len()).all(|b| {
            let (neighbors, read, start, end) = match A::DIRECTION {
                Direction::Forward => (
                    self.graph.predecessors(b),
                    &results.block_exit,
                    &results.block_entry[b],
                    &results.block_exit[b],
                ),
                Direction::Backward => (
                    self.graph.successors(b),
                    &results.block_entry,
                    &results.block_exit[b],
                    &results.block_entry[b],
                ),
            };
            let mut input = FxHashSet::default();
            for &nb in neighbors {
                input.extend(read[nb].iter().cloned());
            }
            &input == start && &self.summaries[b].apply(&input) == end
        })
    }
}

/// Solve `analysis` on `body`
pub fn solve<A: Analysis>(
    analysis: &A,
    body: &Body,
    graph: &FlowGraph,
) -> DataflowResults<A::Fact> {
    Engine::new(analysis, body, graph).solve()
}

fn sorted<F: Ord + Clone>(set: &FxHashSet<F>) -> Vec<F> {
    let mut facts: Vec<F> = set.iter().cloned().collect();
    facts.sort();
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&'static str]) -> FxHashSet<&'static str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_apply() {
        let fx = GenKill::from_sets(set(&["a"]), set(&["b"]));
        assert_eq!(fx.apply(&set(&["b", "c"])), set(&["a", "c"]));
    }

    #[test]
    fn test_then_later_kill_wins() {
        // first: gen a, kill b; second: gen b, kill a
        let first = GenKill::from_sets(set(&["a"]), set(&["b"]));
        let second = GenKill::from_sets(set(&["b"]), set(&["a"]));
        let both = first.then(&second);
        assert_eq!(both.gen_set, set(&["b"]));
        assert_eq!(both.kill_set, set(&["a", "b"]));
    }

    #[test]
    fn test_then_matches_sequential_apply() {
        let first = GenKill::from_sets(set(&["a", "x"]), set(&["c"]));
        let second = GenKill::from_sets(set(&["d"]), set(&["x"]));
        let input = set(&["c", "e", "x"]);
        assert_eq!(first.then(&second).apply(&input), second.apply(&first.apply(&input)));
    }

    #[test]
    fn test_identity() {
        let fx = GenKill::from_sets(set(&["a"]), set(&["b"]));
        assert_eq!(GenKill::new().then(&fx), fx);
        assert_eq!(fx.then(&GenKill::new()), fx);
    }
}
