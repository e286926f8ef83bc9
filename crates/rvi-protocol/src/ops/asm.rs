//! Assembler operation types.

use serde::{Deserialize, Serialize};

/// Asm request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsmRequest {
    /// RV32I assembly source, one instruction per line.
    pub source: String,
}

/// Asm response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmResponse {
    /// Encoded instruction words in program order.
    pub words: Vec<u32>,
}

/// `data` of a MALFORMED_ASSEMBLY error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmErrorData {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}
