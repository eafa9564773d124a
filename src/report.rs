//! Audit findings and the per-function report.
//!
//! The builder only aggregates: a report is SECURE exactly when all four
//! findings pass, with no severity weighting between rules. The core never
//! writes to files or the console; `Display` and the serde derives exist so
//! an outer reporting layer can render the audit trail either way.

use crate::cfg::BlockId;
use crate::rules::RuleDescriptor;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;

/// Outcome of evaluating one policy rule against one sensitive call site.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct RuleFinding {
    pub rule: &'static RuleDescriptor,
    pub passed: bool,
    /// Block that supplied the evidence, when the rule passed.
    pub evidence: Option<BlockId>,
    /// Which block supplied evidence, or why none was found.
    pub detail: String,
}

impl RuleFinding {
    pub fn pass(rule: &'static RuleDescriptor, evidence: BlockId, detail: String) -> Self {
        Self {
            rule,
            passed: true,
            evidence: Some(evidence),
            detail,
        }
    }

    pub fn fail(rule: &'static RuleDescriptor, detail: String) -> Self {
        Self {
            rule,
            passed: false,
            evidence: None,
            detail,
        }
    }
}

/// Overall verdict for one sensitive call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Secure,
    Insecure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Secure => "SECURE",
            Verdict::Insecure => "INSECURE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured audit result for one sensitive call site of one function.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct AuditReport {
    pub function: String,
    /// Block containing the audited sensitive call.
    pub sensitive_block: BlockId,
    /// The four rule findings, in fixed rule order.
    pub findings: Vec<RuleFinding>,
    pub passed: usize,
    pub failed: usize,
    pub verdict: Verdict,
}

impl AuditReport {
    pub fn build(function: String, sensitive_block: BlockId, findings: Vec<RuleFinding>) -> Self {
        let passed = findings.iter().filter(|f| f.passed).count();
        let failed = findings.len() - passed;
        let verdict = if failed == 0 {
            Verdict::Secure
        } else {
            Verdict::Insecure
        };
        Self {
            function,
            sensitive_block,
            findings,
            passed,
            failed,
            verdict,
        }
    }

    /// One-line summary suitable for logs.
    pub fn summary(&self) -> String {
        format!(
            "`{}` block `{}`: {} ({}/{} rules passed)",
            self.function,
            self.sensitive_block,
            self.verdict,
            self.passed,
            self.findings.len()
        )
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "audit of `{}` (sensitive call in block `{}`): {}",
            self.function, self.sensitive_block, self.verdict
        )?;
        write!(
            f,
            "{}",
            self.findings.iter().format_with("\n", |finding, g| {
                let status = if finding.passed { "PASS" } else { "FAIL" };
                g(&format_args!(
                    "  [{status}] {}: {}",
                    finding.rule.id, finding.detail
                ))
            })
        )
    }
}

/// Result of auditing one function: either there was nothing to audit (no
/// sensitive call at all, distinct from both verdicts) or one report per
/// sensitive call site.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuditOutcome {
    NothingToAudit { function: String },
    Audited { reports: Vec<AuditReport> },
}

impl AuditOutcome {
    pub fn is_nothing_to_audit(&self) -> bool {
        matches!(self, AuditOutcome::NothingToAudit { .. })
    }

    pub fn reports(&self) -> &[AuditReport] {
        match self {
            AuditOutcome::NothingToAudit { .. } => &[],
            AuditOutcome::Audited { reports } => reports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;

    #[test]
    fn verdict_requires_all_findings_to_pass() {
        let findings = vec![
            RuleFinding::pass(&rules::SIGNATURE_VERIFIED, "entry".into(), "ok".into()),
            RuleFinding::fail(&rules::ROLLBACK_GUARDED, "nothing found".into()),
        ];
        let report = AuditReport::build("f".into(), "b".into(), findings);
        assert_eq!(report.verdict, Verdict::Insecure);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);

        let findings = vec![RuleFinding::pass(
            &rules::SIGNATURE_VERIFIED,
            "entry".into(),
            "ok".into(),
        )];
        let report = AuditReport::build("f".into(), "b".into(), findings);
        assert_eq!(report.verdict, Verdict::Secure);
    }

    #[test]
    fn verdict_serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&Verdict::Secure).unwrap(), "\"SECURE\"");
        assert_eq!(
            serde_json::to_string(&Verdict::Insecure).unwrap(),
            "\"INSECURE\""
        );
    }
}
