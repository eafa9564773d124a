//! Control-flow graph model consumed by the audit engine.
//!
//! The graph arrives fully resolved from a front end: every `Call` carries a
//! canonical callee name (indirect calls are handed over as `Other`) and every
//! `Compare` exposes its operand reference chains. `CfgBuilder` derives the
//! predecessor/successor sets from terminating `Branch` operations, so graphs
//! built through it are consistent by construction; graphs wired up directly
//! are re-checked by [`ControlFlowGraph::validate`].

use crate::error::AuditResult;
use crate::{graph_bail, graph_ensure};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stable block name, unique within a function.
pub type BlockId = String;

/// Comparison predicate. Recorded for the audit trail; the policy rules treat
/// every predicate the same and only care about operand provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparePredicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Reference chain describing how a comparison operand was produced.
///
/// This is the closed shape the provenance tracer walks: either a direct read
/// of a named global/state cell, or a field/index access off another operand.
/// Locals, constants, and anything the front end could not resolve arrive as
/// `Opaque` and never match the versioned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Global(String),
    Field { base: Box<Operand>, name: String },
    Index { base: Box<Operand> },
    Opaque,
}

impl Operand {
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    pub fn field(base: Operand, name: impl Into<String>) -> Self {
        Self::Field {
            base: Box::new(base),
            name: name.into(),
        }
    }

    pub fn index(base: Operand) -> Self {
        Self::Index {
            base: Box::new(base),
        }
    }
}

/// One operation inside a basic block, in program order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Call {
        callee: String,
        args: Vec<Operand>,
    },
    Compare {
        predicate: ComparePredicate,
        lhs: Operand,
        rhs: Operand,
    },
    Branch {
        conditional: bool,
        targets: Vec<BlockId>,
    },
    Other,
}

impl Operation {
    pub fn call(callee: impl Into<String>, args: Vec<Operand>) -> Self {
        Self::Call {
            callee: callee.into(),
            args,
        }
    }

    pub fn compare(predicate: ComparePredicate, lhs: Operand, rhs: Operand) -> Self {
        Self::Compare {
            predicate,
            lhs,
            rhs,
        }
    }

    /// Unconditional jump to a single target.
    pub fn branch(target: impl Into<BlockId>) -> Self {
        Self::Branch {
            conditional: false,
            targets: vec![target.into()],
        }
    }

    /// Conditional branch over the given targets.
    pub fn cond_branch<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BlockId>,
    {
        Self::Branch {
            conditional: true,
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }
}

/// A basic block: identifier, operations in program order, and the derived
/// predecessor/successor sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub ops: Vec<Operation>,
    pub predecessors: BTreeSet<BlockId>,
    pub successors: BTreeSet<BlockId>,
}

impl BasicBlock {
    /// The trailing `Branch` operation, if the block ends in one. Blocks
    /// without one (return blocks) have no successors.
    pub fn terminator(&self) -> Option<&Operation> {
        self.ops.last().filter(|op| op.is_branch())
    }

    pub fn ends_in_conditional_branch(&self) -> bool {
        matches!(
            self.terminator(),
            Some(Operation::Branch {
                conditional: true,
                ..
            })
        )
    }
}

/// Immutable control-flow graph for one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub function: String,
    pub entry: BlockId,
    pub blocks: BTreeMap<BlockId, BasicBlock>,
}

impl ControlFlowGraph {
    pub fn block(&self, id: &str) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    /// Check graph shape: the entry block exists, branch operations appear
    /// only as terminators and name existing blocks, and the successor and
    /// predecessor sets are mutually consistent with the terminators.
    ///
    /// Failure is fatal for this function only; a batch caller can keep
    /// auditing its other functions.
    pub fn validate(&self) -> AuditResult<()> {
        graph_ensure!(
            self.blocks.contains_key(&self.entry),
            "entry block `{}` is not present in function `{}`",
            self.entry,
            self.function
        );

        for (id, block) in &self.blocks {
            graph_ensure!(
                *id == block.id,
                "block keyed `{id}` carries mismatched id `{}`",
                block.id
            );

            let mut targets = BTreeSet::new();
            for (i, op) in block.ops.iter().enumerate() {
                if let Operation::Branch { targets: t, .. } = op {
                    graph_ensure!(
                        i + 1 == block.ops.len(),
                        "block `{id}` has a branch before its last operation"
                    );
                    for target in t {
                        graph_ensure!(
                            self.blocks.contains_key(target),
                            "block `{id}` branches to unknown block `{target}`"
                        );
                        targets.insert(target.clone());
                    }
                }
            }
            graph_ensure!(
                targets == block.successors,
                "successor set of block `{id}` disagrees with its terminator"
            );

            for succ in &block.successors {
                let ok = self
                    .blocks
                    .get(succ)
                    .is_some_and(|s| s.predecessors.contains(id));
                graph_ensure!(
                    ok,
                    "block `{id}` lists successor `{succ}` which does not list it back"
                );
            }
            for pred in &block.predecessors {
                let ok = self
                    .blocks
                    .get(pred)
                    .is_some_and(|p| p.successors.contains(id));
                graph_ensure!(
                    ok,
                    "block `{id}` lists predecessor `{pred}` which does not list it back"
                );
            }
        }
        Ok(())
    }
}

/// Builder used by front ends (and tests) to assemble a consistent graph.
///
/// Blocks are added with their operations only; edges are derived from each
/// block's terminating `Branch` during [`CfgBuilder::build`].
#[derive(Debug)]
pub struct CfgBuilder {
    function: String,
    entry: BlockId,
    blocks: Vec<(BlockId, Vec<Operation>)>,
}

impl CfgBuilder {
    pub fn new(function: impl Into<String>, entry: impl Into<BlockId>) -> Self {
        Self {
            function: function.into(),
            entry: entry.into(),
            blocks: Vec::new(),
        }
    }

    pub fn block(mut self, id: impl Into<BlockId>, ops: Vec<Operation>) -> Self {
        self.blocks.push((id.into(), ops));
        self
    }

    pub fn build(self) -> AuditResult<ControlFlowGraph> {
        let mut blocks = BTreeMap::new();
        for (id, ops) in self.blocks {
            let prev = blocks.insert(
                id.clone(),
                BasicBlock {
                    id: id.clone(),
                    ops,
                    predecessors: BTreeSet::new(),
                    successors: BTreeSet::new(),
                },
            );
            if prev.is_some() {
                graph_bail!("duplicate block id `{id}` in function `{}`", self.function);
            }
        }

        let mut edges = Vec::new();
        for (id, block) in &blocks {
            if let Some(Operation::Branch { targets, .. }) = block.terminator() {
                for target in targets {
                    edges.push((id.clone(), target.clone()));
                }
            }
        }
        for (from, to) in edges {
            graph_ensure!(
                blocks.contains_key(&to),
                "block `{from}` branches to unknown block `{to}`"
            );
            if let Some(b) = blocks.get_mut(&from) {
                b.successors.insert(to.clone());
            }
            if let Some(b) = blocks.get_mut(&to) {
                b.predecessors.insert(from.clone());
            }
        }

        let cfg = ControlFlowGraph {
            function: self.function,
            entry: self.entry,
            blocks,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
