//! Reaching definitions (forward, over statement ids)

use rustc_hash::{FxHashMap, FxHashSet};

use super::{solve, Analysis, DataflowResults, Direction, GenKill};
use crate::error::{CfgError, CfgResult};
use crate::graph::FlowGraph;
use crate::ir::{Body, Stm, StmId, Transfer};

/// gen = the statement itself, kill = every other definition of its `dst`.
///
/// The per-name definition sets are computed once for the whole body
/// before any statement's kill set is asked for.
pub struct ReachingDefsAnalysis {
    defs: FxHashMap<String, FxHashSet<StmId>>,
}

impl ReachingDefsAnalysis {
    pub fn new(body: &Body) -> Self {
        let mut defs: FxHashMap<String, FxHashSet<StmId>> = FxHashMap::default();
        for (id, stm) in body.statements() {
            if let Some(dst) = stm.dst() {
                defs.entry(dst.to_string()).or_default().insert(id);
            }
        }
        ReachingDefsAnalysis { defs }
    }

    /// Every statement in the body that defines `name`
    pub fn definitions_of(&self, name: &str) -> Option<&FxHashSet<StmId>> {
        self.defs.get(name)
    }
}

impl Analysis for ReachingDefsAnalysis {
    type Fact = StmId;

    const DIRECTION: Direction = Direction::Forward;

    fn name(&self) -> &'static str {
        "reaching"
    }

    fn stm_effect(&self, id: StmId, stm: &Stm) -> GenKill<StmId> {
        let mut fx = GenKill::new();
        if let Some(dst) = stm.dst() {
            fx.gen_set.insert(id);
            if let Some(others) = self.defs.get(dst) {
                fx.kill_set.extend(others.iter().copied().filter(|other| *other != id));
            }
        }
        fx
    }

    fn transfer_effect(&self, _transfer: &Transfer) -> GenKill<StmId> {
        GenKill::new()
    }
}

/// Definitions reaching every statement and transfer of one body
#[derive(Debug, Clone)]
pub struct ReachingDefs {
    results: DataflowResults<StmId>,
}

impl ReachingDefs {
    pub fn compute(body: &Body) -> CfgResult<Self> {
        let graph = FlowGraph::new(body)?;
        Ok(Self::with_graph(body, &graph))
    }

    pub fn with_graph(body: &Body, graph: &FlowGraph) -> Self {
        let analysis = ReachingDefsAnalysis::new(body);
        ReachingDefs { results: solve(&analysis, body, graph) }
    }

    /// Definitions reaching the point just before `id`
    pub fn reaching_in(&self, id: StmId) -> CfgResult<&FxHashSet<StmId>> {
        self.results
            .stm_before
            .get(&id)
            .ok_or(CfgError::MissingFacts { analysis: "reaching definitions", stm: id })
    }

    pub fn reaching_out(&self, id: StmId) -> CfgResult<&FxHashSet<StmId>> {
        self.results
            .stm_after
            .get(&id)
            .ok_or(CfgError::MissingFacts { analysis: "reaching definitions", stm: id })
    }

    /// Definitions reaching the block's transfer
    pub fn transfer_in(&self, block: usize) -> &FxHashSet<StmId> {
        &self.results.transfer_before[block]
    }

    pub fn block_in(&self, block: usize) -> &FxHashSet<StmId> {
        &self.results.block_entry[block]
    }

    pub fn block_out(&self, block: usize) -> &FxHashSet<StmId> {
        &self.results.block_exit[block]
    }

    pub fn sweeps(&self) -> usize {
        self.results.sweeps
    }

    pub fn results(&self) -> &DataflowResults<StmId> {
        &self.results
    }
}
