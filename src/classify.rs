//! Single-pass classification of security-relevant operations.
//!
//! Walks every block exactly once and tags calls by their resolved callee
//! name against the configured policy names. Comparisons are only recorded
//! as rollback guards when the provenance tracer confirms an operand reads
//! the versioned state. The pass never mutates the graph.

use crate::cfg::{BlockId, ControlFlowGraph, Operation};
use crate::policy::PolicyNames;
use crate::provenance::trace_operand;
use std::collections::BTreeSet;

/// One occurrence of the sensitive call. Each site is audited independently,
/// so a function with several install calls yields several reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SensitiveSite {
    pub block: BlockId,
    pub op_index: usize,
}

/// Classification facts feeding the rule evaluator.
#[derive(Debug, Clone, Default)]
pub struct PolicyFacts {
    /// Blocks containing a call to the signature predicate.
    pub signature_checks: BTreeSet<BlockId>,
    /// Blocks containing a call to the source-trust predicate.
    pub source_checks: BTreeSet<BlockId>,
    /// Blocks containing a comparison that provably reads the versioned state.
    pub version_guards: BTreeSet<BlockId>,
    /// Sensitive call sites, ordered by block id then operation index.
    pub sensitive_sites: Vec<SensitiveSite>,
}

pub fn classify(cfg: &ControlFlowGraph, policy: &PolicyNames) -> PolicyFacts {
    // The trace bound scales with the graph so arbitrarily deep operand
    // chains terminate; a one-block function still gets one step.
    let bound = cfg.blocks.len().max(1);

    let mut facts = PolicyFacts::default();
    for (id, block) in &cfg.blocks {
        for (op_index, op) in block.ops.iter().enumerate() {
            match op {
                Operation::Call { callee, .. } => {
                    if *callee == policy.signature_predicate {
                        facts.signature_checks.insert(id.clone());
                    } else if *callee == policy.source_predicate {
                        facts.source_checks.insert(id.clone());
                    } else if *callee == policy.sensitive_call {
                        facts.sensitive_sites.push(SensitiveSite {
                            block: id.clone(),
                            op_index,
                        });
                    }
                }
                Operation::Compare { lhs, rhs, .. } => {
                    if trace_operand(lhs, policy, bound).matched()
                        || trace_operand(rhs, policy, bound).matched()
                    {
                        facts.version_guards.insert(id.clone());
                    }
                }
                Operation::Branch { .. } | Operation::Other => {}
            }
        }
    }
    facts
}
