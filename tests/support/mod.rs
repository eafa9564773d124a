//! Fixture control-flow graphs shared by the scenario tests.
//!
//! The secure/insecure shapes mirror the classic firmware-update fixture: a
//! guard chain of signature, rollback, and source checks that each branch to
//! a reject block, with `install` reached only through the final conditional.
#![allow(dead_code)]

use update_guard::cfg::{CfgBuilder, ComparePredicate, ControlFlowGraph, Operand, Operation};

pub fn pkg_version() -> Operand {
    Operand::field(Operand::Opaque, "version")
}

/// updateFirmware with all three checks guarding a conditionally-reached
/// install. Expected verdict: SECURE.
pub fn secure_update() -> ControlFlowGraph {
    CfgBuilder::new("updateFirmware", "entry")
        .block(
            "entry",
            vec![
                Operation::call("verifySignature", vec![Operand::Opaque]),
                Operation::cond_branch(["check.version", "reject.sig"]),
            ],
        )
        .block(
            "check.version",
            vec![
                Operation::compare(
                    ComparePredicate::Le,
                    pkg_version(),
                    Operand::global("current_version"),
                ),
                Operation::cond_branch(["check.source", "reject.rollback"]),
            ],
        )
        .block(
            "check.source",
            vec![
                Operation::call("sourceTrusted", vec![Operand::Opaque]),
                Operation::cond_branch(["do.install", "reject.source"]),
            ],
        )
        .block(
            "do.install",
            vec![
                Operation::call("install", vec![Operand::Opaque]),
                Operation::branch("exit"),
            ],
        )
        .block("reject.sig", vec![Operation::branch("exit")])
        .block("reject.rollback", vec![Operation::branch("exit")])
        .block("reject.source", vec![Operation::branch("exit")])
        .block("exit", vec![Operation::Other])
        .build()
        .expect("secure fixture is well-formed")
}

/// updateFirmware that calls install straight from the entry block with no
/// checks anywhere. Expected verdict: INSECURE with four failing findings.
pub fn insecure_update() -> ControlFlowGraph {
    CfgBuilder::new("updateFirmware", "entry")
        .block(
            "entry",
            vec![Operation::call("install", vec![Operand::Opaque])],
        )
        .build()
        .expect("insecure fixture is well-formed")
}

/// The signature check lives in one arm of an if/else and install sits
/// unconditionally after the merge, so the check does not dominate it.
pub fn sibling_check_update() -> ControlFlowGraph {
    CfgBuilder::new("updateFirmware", "entry")
        .block("entry", vec![Operation::cond_branch(["checked", "unchecked"])])
        .block(
            "checked",
            vec![
                Operation::call("verifySignature", vec![Operand::Opaque]),
                Operation::branch("merge"),
            ],
        )
        .block("unchecked", vec![Operation::branch("merge")])
        .block(
            "merge",
            vec![
                Operation::call("install", vec![Operand::Opaque]),
                Operation::Other,
            ],
        )
        .build()
        .expect("sibling fixture is well-formed")
}
