//! Basic blocks and method bodies

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::stm::{Stm, StmId};
use super::transfer::{Label, Transfer};
use crate::error::{CfgError, CfgResult};

/// A basic block: entry label, statement handles, terminator.
///
/// Statements live in the owning [`Body`]'s arena; a block only holds their ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: Label,
    pub stms: Vec<StmId>,
    pub transfer: Transfer,
}

/// Owned block description used to construct and deconstruct bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub label: Label,
    #[serde(default)]
    pub stms: Vec<Stm>,
    pub transfer: Transfer,
}

impl RawBlock {
    pub fn new(label: Label, stms: Vec<Stm>, transfer: Transfer) -> Self {
        RawBlock { label, stms, transfer }
    }
}

/// The ordered blocks of one method plus their statement arena.
///
/// A `Body` is always well formed: it has at least one block, labels are
/// unique, and every transfer target names a block in the same body. The
/// first block is the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RawBlock>", into = "Vec<RawBlock>")]
pub struct Body {
    arena: Vec<Stm>,
    blocks: Vec<Block>,
}

impl Body {
    /// Validate and intern a block list. Statement ids are assigned in
    /// block order.
    pub fn from_blocks(raw: Vec<RawBlock>) -> CfgResult<Body> {
        if raw.is_empty() {
            return Err(CfgError::EmptyBody);
        }

        let mut labels = FxHashSet::default();
        for block in &raw {
            if !labels.insert(block.label) {
                return Err(CfgError::DuplicateLabel(block.label));
            }
        }
        for block in &raw {
            for target in block.transfer.successors() {
                if !labels.contains(&target) {
                    return Err(CfgError::UnresolvedLabel { from: block.label, target });
                }
            }
        }

        let mut arena = Vec::new();
        let mut blocks = Vec::with_capacity(raw.len());
        for RawBlock { label, stms, transfer } in raw {
            let ids = stms
                .into_iter()
                .map(|stm| {
                    let id = StmId(arena.len() as u32);
                    arena.push(stm);
                    id
                })
                .collect();
            blocks.push(Block { label, stms: ids, transfer });
        }
        Ok(Body { arena, blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    pub fn entry(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn stm_count(&self) -> usize {
        self.arena.len()
    }

    pub fn stm(&self, id: StmId) -> &Stm {
        &self.arena[id.index()]
    }

    pub fn get_stm(&self, id: StmId) -> Option<&Stm> {
        self.arena.get(id.index())
    }

    /// Every statement in the arena with its id
    pub fn statements(&self) -> impl Iterator<Item = (StmId, &Stm)> {
        self.arena.iter().enumerate().map(|(i, stm)| (StmId(i as u32), stm))
    }

    /// The statements of one block, in program order
    pub fn block_stms<'a>(
        &'a self,
        block: &'a Block,
    ) -> impl Iterator<Item = (StmId, &'a Stm)> + 'a {
        block.stms.iter().map(move |id| (*id, &self.arena[id.index()]))
    }

    /// Copy the body back out as owned blocks, ready for rewriting
    pub fn to_raw_blocks(&self) -> Vec<RawBlock> {
        self.blocks
            .iter()
            .map(|block| RawBlock {
                label: block.label,
                stms: self.block_stms(block).map(|(_, stm)| stm.clone()).collect(),
                transfer: block.transfer.clone(),
            })
            .collect()
    }

    /// Highest label number in use; fresh labels for this body start above it
    pub fn max_label(&self) -> u32 {
        self.blocks.iter().map(|b| b.label.0).max().unwrap_or(0)
    }
}

impl TryFrom<Vec<RawBlock>> for Body {
    type Error = CfgError;

    fn try_from(raw: Vec<RawBlock>) -> CfgResult<Body> {
        Body::from_blocks(raw)
    }
}

impl From<Body> for Vec<RawBlock> {
    fn from(body: Body) -> Self {
        body.to_raw_blocks()
    }
}
