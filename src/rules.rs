//! The four-rule security policy, evaluated per sensitive call site.
//!
//! Rules are independent and all four are always reported; an early failure
//! never short-circuits the rest. Everything here is a pure function of the
//! dominator tree, the classification facts, and one site.

use crate::cfg::{BlockId, ControlFlowGraph};
use crate::classify::{PolicyFacts, SensitiveSite};
use crate::dominators::DominatorTree;
use crate::policy::PolicyNames;
use crate::report::RuleFinding;
use serde::Serialize;
use std::collections::BTreeSet;

/// Static description of one policy rule.
#[derive(Debug, Serialize)]
pub struct RuleDescriptor {
    pub id: &'static str,
    pub description: &'static str,
}

pub static SIGNATURE_VERIFIED: RuleDescriptor = RuleDescriptor {
    id: "signature-verified",
    description: "a signature-verification call must dominate the sensitive call",
};

pub static ROLLBACK_GUARDED: RuleDescriptor = RuleDescriptor {
    id: "rollback-guarded",
    description: "a comparison reading the versioned state must dominate the sensitive call",
};

pub static SOURCE_TRUSTED: RuleDescriptor = RuleDescriptor {
    id: "source-trusted",
    description: "a source-trust call must dominate the sensitive call",
};

pub static CONDITIONALLY_REACHED: RuleDescriptor = RuleDescriptor {
    id: "conditionally-reached",
    description: "every immediate predecessor of the sensitive block must end in a conditional branch",
};

/// Fixed rule order used in every report.
pub static ALL_RULES: [&RuleDescriptor; 4] = [
    &SIGNATURE_VERIFIED,
    &ROLLBACK_GUARDED,
    &SOURCE_TRUSTED,
    &CONDITIONALLY_REACHED,
];

/// Evaluate all four rules for one sensitive call site. Always returns
/// exactly four findings, in [`ALL_RULES`] order.
pub fn evaluate_site(
    cfg: &ControlFlowGraph,
    dom: &DominatorTree,
    facts: &PolicyFacts,
    policy: &PolicyNames,
    site: &SensitiveSite,
) -> Vec<RuleFinding> {
    // A sensitive call with no path from entry has no dominance facts at
    // all: every rule fails with the unreachability spelled out.
    if !dom.is_reachable(&site.block) {
        let detail = format!(
            "block `{}` is unreachable from entry `{}`",
            site.block, cfg.entry
        );
        return ALL_RULES
            .into_iter()
            .map(|rule| RuleFinding::fail(rule, detail.clone()))
            .collect();
    }

    vec![
        dominating_check(
            &SIGNATURE_VERIFIED,
            &facts.signature_checks,
            dom,
            site,
            &format!("`{}` call", policy.signature_predicate),
        ),
        dominating_check(
            &ROLLBACK_GUARDED,
            &facts.version_guards,
            dom,
            site,
            "versioned-state comparison",
        ),
        dominating_check(
            &SOURCE_TRUSTED,
            &facts.source_checks,
            dom,
            site,
            &format!("`{}` call", policy.source_predicate),
        ),
        conditional_guard(cfg, site),
    ]
}

/// Rules 1 to 3 share one shape: some tagged block must dominate the site.
/// Candidates are scanned in block-id order so evidence is deterministic.
fn dominating_check(
    rule: &'static RuleDescriptor,
    candidates: &BTreeSet<BlockId>,
    dom: &DominatorTree,
    site: &SensitiveSite,
    what: &str,
) -> RuleFinding {
    match candidates.iter().find(|b| dom.dominates(b, &site.block)) {
        Some(evidence) => RuleFinding::pass(
            rule,
            evidence.clone(),
            format!("{what} in block `{evidence}` dominates block `{}`", site.block),
        ),
        None => RuleFinding::fail(rule, format!("no {what} dominates block `{}`", site.block)),
    }
}

/// Rule 4: the sensitive block is not the entry block and every immediate
/// predecessor ends in a conditional branch. Only the direct predecessors
/// are inspected; an unconditional edge further upstream is out of this
/// rule's reach and deliberately left undetected.
fn conditional_guard(cfg: &ControlFlowGraph, site: &SensitiveSite) -> RuleFinding {
    if site.block == cfg.entry {
        return RuleFinding::fail(
            &CONDITIONALLY_REACHED,
            format!(
                "sensitive call sits in the entry block `{}` and executes unconditionally",
                site.block
            ),
        );
    }

    let Some(block) = cfg.block(&site.block) else {
        return RuleFinding::fail(
            &CONDITIONALLY_REACHED,
            format!("block `{}` is not present in the graph", site.block),
        );
    };
    if block.predecessors.is_empty() {
        return RuleFinding::fail(
            &CONDITIONALLY_REACHED,
            format!("block `{}` has no predecessors", site.block),
        );
    }

    let offender = block.predecessors.iter().find(|pred| {
        !cfg.block(pred)
            .is_some_and(|p| p.ends_in_conditional_branch())
    });
    match offender {
        Some(pred) => RuleFinding::fail(
            &CONDITIONALLY_REACHED,
            format!("predecessor `{pred}` reaches block `{}` unconditionally", site.block),
        ),
        None => RuleFinding::pass(
            &CONDITIONALLY_REACHED,
            site.block.clone(),
            format!(
                "all {} predecessor(s) of block `{}` end in a conditional branch",
                block.predecessors.len(),
                site.block
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{CfgBuilder, Operand, Operation};
    use crate::classify::classify;

    fn audit_first_site(cfg: &ControlFlowGraph) -> Vec<RuleFinding> {
        let policy = PolicyNames::default();
        let dom = DominatorTree::build(cfg);
        let facts = classify(cfg, &policy);
        let site = facts.sensitive_sites.first().expect("a sensitive site");
        evaluate_site(cfg, &dom, &facts, &policy, site)
    }

    #[test]
    fn findings_come_back_in_fixed_rule_order() {
        let cfg = CfgBuilder::new("f", "entry")
            .block("entry", vec![Operation::call("install", vec![])])
            .build()
            .unwrap();
        let findings = audit_first_site(&cfg);
        let ids: Vec<&str> = findings.iter().map(|f| f.rule.id).collect();
        assert_eq!(
            ids,
            vec![
                "signature-verified",
                "rollback-guarded",
                "source-trusted",
                "conditionally-reached"
            ]
        );
    }

    #[test]
    fn sensitive_call_in_entry_block_fails_the_guard_rule() {
        let cfg = CfgBuilder::new("f", "entry")
            .block("entry", vec![Operation::call("install", vec![])])
            .build()
            .unwrap();
        let findings = audit_first_site(&cfg);
        assert!(findings.iter().all(|f| !f.passed));
        assert!(findings[3].detail.contains("entry block"));
    }

    #[test]
    fn unconditional_predecessor_fails_the_guard_rule() {
        let cfg = CfgBuilder::new("f", "entry")
            .block("entry", vec![Operation::branch("do_install")])
            .block("do_install", vec![Operation::call("install", vec![])])
            .build()
            .unwrap();
        let findings = audit_first_site(&cfg);
        let guard = &findings[3];
        assert!(!guard.passed);
        assert!(guard.detail.contains("unconditionally"));
    }

    #[test]
    fn unreachable_site_fails_every_rule_with_detail() {
        let cfg = CfgBuilder::new("f", "entry")
            .block(
                "entry",
                vec![
                    Operation::call("verifySignature", vec![Operand::Opaque]),
                    Operation::branch("exit"),
                ],
            )
            .block("exit", vec![Operation::Other])
            .block("island", vec![Operation::call("install", vec![])])
            .build()
            .unwrap();
        let findings = audit_first_site(&cfg);
        assert_eq!(findings.len(), 4);
        for finding in &findings {
            assert!(!finding.passed);
            assert!(finding.detail.contains("unreachable"));
        }
    }
}
