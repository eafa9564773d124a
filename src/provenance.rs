//! Backward provenance tracing for comparison operands.
//!
//! A comparison only counts as a rollback guard when one of its operands
//! provably reads the versioned state. Two root shapes match: a direct read
//! of the configured scalar (the "current version" global), or a field access
//! on the configured aggregate (a device-configuration record) whose field is
//! the version field. The walk is bounded; running out of budget means "not
//! matched", never an error, since absence of proof is not proof of absence.

use crate::cfg::Operand;
use crate::policy::PolicyNames;

/// Outcome of tracing one operand back toward the versioned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace {
    Matched,
    NoMatch,
    /// The reference chain was longer than the allowed number of dereference
    /// steps. Callers treat this exactly like `NoMatch`.
    BoundExceeded,
}

impl Trace {
    pub fn matched(self) -> bool {
        self == Trace::Matched
    }
}

/// Follow the operand's dereference/field-access chain for at most `bound`
/// steps, looking for one of the two versioned-state root shapes.
pub fn trace_operand(operand: &Operand, policy: &PolicyNames, bound: usize) -> Trace {
    let mut cur = operand;
    let mut steps = 0usize;
    loop {
        match cur {
            Operand::Global(name) if *name == policy.version_global => return Trace::Matched,
            Operand::Field { base, name } if *name == policy.version_field => {
                if matches!(base.as_ref(), Operand::Global(root) if *root == policy.version_aggregate)
                {
                    return Trace::Matched;
                }
            }
            _ => {}
        }

        let base: &Operand = match cur {
            Operand::Field { base, .. } => base,
            Operand::Index { base } => base,
            _ => return Trace::NoMatch,
        };
        if steps >= bound {
            #[cfg(feature = "telemetry")]
            tracing::trace!(bound, "operand chain exceeded the trace bound");
            return Trace::BoundExceeded;
        }
        steps += 1;
        cur = base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PolicyNames {
        PolicyNames::default()
    }

    #[test]
    fn scalar_global_matches() {
        let op = Operand::global("current_version");
        assert_eq!(trace_operand(&op, &policy(), 8), Trace::Matched);
    }

    #[test]
    fn aggregate_field_matches() {
        let op = Operand::field(Operand::global("device_config"), "version");
        assert_eq!(trace_operand(&op, &policy(), 8), Trace::Matched);
    }

    #[test]
    fn unrelated_global_does_not_match() {
        let op = Operand::global("boot_count");
        assert_eq!(trace_operand(&op, &policy(), 8), Trace::NoMatch);
    }

    #[test]
    fn version_field_off_a_local_does_not_match() {
        // pkg->version: the update package is not the device state.
        let op = Operand::field(Operand::Opaque, "version");
        assert_eq!(trace_operand(&op, &policy(), 8), Trace::NoMatch);
    }

    #[test]
    fn nested_chain_rooted_at_the_scalar_matches() {
        let op = Operand::index(Operand::field(
            Operand::global("current_version"),
            "raw",
        ));
        assert_eq!(trace_operand(&op, &policy(), 8), Trace::Matched);
    }

    #[test]
    fn exhausted_bound_reports_bound_exceeded() {
        let mut op = Operand::global("current_version");
        for _ in 0..4 {
            op = Operand::index(op);
        }
        assert_eq!(trace_operand(&op, &policy(), 2), Trace::BoundExceeded);
        assert_eq!(trace_operand(&op, &policy(), 4), Trace::Matched);
        assert!(!trace_operand(&op, &policy(), 2).matched());
    }

    #[test]
    fn zero_bound_still_matches_a_direct_root() {
        let op = Operand::global("current_version");
        assert_eq!(trace_operand(&op, &policy(), 0), Trace::Matched);
    }
}
