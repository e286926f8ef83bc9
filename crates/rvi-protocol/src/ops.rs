//! Operation-specific types.

pub mod asm;
pub mod probe;
pub mod run;

pub use asm::{AsmErrorData, AsmRequest, AsmResponse};
pub use probe::{ProbeRequest, ProbeResponse};
pub use run::{OperationReport, OperationStatus, RunRequest, RunResponse};

/// Known operation names.
pub mod names {
    pub const PROBE: &str = "probe";
    pub const RUN: &str = "run";
    pub const ASM: &str = "asm";

    /// Every operation a worker of this version serves.
    pub const ALL: &[&str] = &[PROBE, RUN, ASM];
}
