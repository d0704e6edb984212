//! Live-variable analysis (backward, over variable names)

use rustc_hash::FxHashSet;

use super::{solve, Analysis, DataflowResults, Direction, GenKill};
use crate::error::{CfgError, CfgResult};
use crate::graph::FlowGraph;
use crate::ir::{Body, Stm, StmId, Transfer};

/// gen = names read, kill = name defined
///
/// `fields` are names that outlive the body (fields of `this`). They are
/// live at every `Return`, and every virtual call may read them.
#[derive(Debug, Clone, Default)]
pub struct LivenessAnalysis {
    pub fields: FxHashSet<String>,
}

impl LivenessAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(fields: FxHashSet<String>) -> Self {
        LivenessAnalysis { fields }
    }
}

impl Analysis for LivenessAnalysis {
    type Fact = String;

    const DIRECTION: Direction = Direction::Backward;

    fn name(&self) -> &'static str {
        "liveness"
    }

    fn stm_effect(&self, _id: StmId, stm: &Stm) -> GenKill<String> {
        let mut fx = GenKill::new();
        stm.visit_uses(|name| {
            fx.gen_set.insert(name.to_string());
        });
        if matches!(stm, Stm::InvokeVirtual { .. }) {
            fx.gen_set.extend(self.fields.iter().cloned());
        }
        if let Some(dst) = stm.dst() {
            fx.kill_set.insert(dst.to_string());
        }
        fx
    }

    fn transfer_effect(&self, transfer: &Transfer) -> GenKill<String> {
        let mut fx = GenKill::new();
        if let Some(name) = transfer.use_var() {
            fx.gen_set.insert(name.to_string());
        }
        if let Transfer::Return(_) = transfer {
            fx.gen_set.extend(self.fields.iter().cloned());
        }
        fx
    }
}

/// Live variables at every statement and transfer of one body
#[derive(Debug, Clone)]
pub struct Liveness {
    results: DataflowResults<String>,
}

impl Liveness {
    pub fn compute(body: &Body) -> CfgResult<Self> {
        let graph = FlowGraph::new(body)?;
        Ok(Self::with_graph(body, &graph))
    }

    /// Liveness of a method body whose class fields `fields` stay
    /// observable after it returns
    pub fn compute_with_fields(body: &Body, fields: FxHashSet<String>) -> CfgResult<Self> {
        let graph = FlowGraph::new(body)?;
        let analysis = LivenessAnalysis::with_fields(fields);
        Ok(Liveness { results: solve(&analysis, body, &graph) })
    }

    pub fn with_graph(body: &Body, graph: &FlowGraph) -> Self {
        Liveness { results: solve(&LivenessAnalysis::new(), body, graph) }
    }

    /// Variables live immediately after `id`
    pub fn live_out(&self, id: StmId) -> CfgResult<&FxHashSet<String>> {
        self.results
            .stm_after
            .get(&id)
            .ok_or(CfgError::MissingFacts { analysis: "liveness", stm: id })
    }

    /// Variables live immediately before `id`
    pub fn live_in(&self, id: StmId) -> CfgResult<&FxHashSet<String>> {
        self.results
            .stm_before
            .get(&id)
            .ok_or(CfgError::MissingFacts { analysis: "liveness", stm: id })
    }

    pub fn block_live_in(&self, block: usize) -> &FxHashSet<String> {
        &self.results.block_entry[block]
    }

    pub fn block_live_out(&self, block: usize) -> &FxHashSet<String> {
        &self.results.block_exit[block]
    }

    /// Variables live just before the block's transfer executes
    pub fn transfer_live_in(&self, block: usize) -> &FxHashSet<String> {
        &self.results.transfer_before[block]
    }

    pub fn sweeps(&self) -> usize {
        self.results.sweeps
    }

    pub fn results(&self) -> &DataflowResults<String> {
        &self.results
    }
}
