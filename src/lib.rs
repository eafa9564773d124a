//! Core update-guard engine: dominance-based auditing of a firmware-update
//! routine against a fixed four-rule security policy.
//!
//! The crate consumes an already-built [`cfg::ControlFlowGraph`] (parsing is
//! a front-end concern), computes exact dominance, classifies the
//! security-relevant operations, and evaluates the policy per sensitive call
//! site. It produces an advisory [`report::AuditReport`] only and never
//! modifies the analyzed program.

pub mod cfg;
pub mod classify;
pub mod dominators;
pub mod error;
pub mod policy;
pub mod provenance;
pub mod report;
pub mod rules;
pub mod telemetry;

use crate::cfg::ControlFlowGraph;
use crate::classify::classify;
use crate::dominators::DominatorTree;
use crate::error::AuditResult;
use crate::policy::PolicyNames;
use crate::report::{AuditOutcome, AuditReport};

/// Engine orchestrates one audit: validate the graph, derive dominance,
/// classify operations, evaluate the rules, and assemble reports.
///
/// The engine holds no per-analysis state; a single instance can audit any
/// number of functions, including concurrently from independent threads.
pub struct AuditEngine {
    policy: PolicyNames,
}

impl AuditEngine {
    /// Create an engine with explicit policy names (e.g. from config).
    pub fn new(policy: PolicyNames) -> Self {
        Self { policy }
    }

    /// Create an engine with the default firmware-update policy names.
    pub fn with_default_policy() -> Self {
        Self::new(PolicyNames::default())
    }

    pub fn policy(&self) -> &PolicyNames {
        &self.policy
    }

    /// Audit one function's control-flow graph.
    ///
    /// Returns `Err` only for a malformed graph, so a batch caller can skip
    /// that one function and continue. A function without the sensitive call
    /// yields [`AuditOutcome::NothingToAudit`]; otherwise every sensitive
    /// call site gets its own report.
    pub fn audit_function(&self, graph: &ControlFlowGraph) -> AuditResult<AuditOutcome> {
        graph.validate()?;

        let dom = crate::instrument_block!("dominators", { DominatorTree::build(graph) });
        let facts = crate::instrument_block!("classify", { classify(graph, &self.policy) });

        if facts.sensitive_sites.is_empty() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(function = %graph.function, "no sensitive call, nothing to audit");
            return Ok(AuditOutcome::NothingToAudit {
                function: graph.function.clone(),
            });
        }

        let reports: Vec<AuditReport> = crate::instrument_block!("evaluate", {
            facts
                .sensitive_sites
                .iter()
                .map(|site| {
                    let findings =
                        rules::evaluate_site(graph, &dom, &facts, &self.policy, site);
                    AuditReport::build(graph.function.clone(), site.block.clone(), findings)
                })
                .collect()
        });

        #[cfg(feature = "telemetry")]
        for report in &reports {
            tracing::debug!(summary = %report.summary(), "audited sensitive call site");
        }

        Ok(AuditOutcome::Audited { reports })
    }
}
