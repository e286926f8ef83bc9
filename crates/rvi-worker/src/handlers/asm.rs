//! Asm operation handler.

use rvi_protocol::{
    ops::{AsmRequest, AsmResponse},
    RpcError, RpcRequest,
};

use crate::asm::assemble;

/// Handle the asm operation.
pub fn handle(request: &RpcRequest) -> Result<serde_json::Value, RpcError> {
    let req: AsmRequest = request.parse_payload()?;

    let words = assemble(&req.source).map_err(|e| RpcError::malformed_assembly(e.line, e.message))?;
    tracing::debug!(words = words.len(), "assembled");

    super::to_payload(&AsmResponse { words })
}
