//! RV32I assembler.
//!
//! Turns assembly text into instruction words in program order. Two passes:
//! the first lays out addresses (4 bytes per word, starting at 0) and
//! collects labels, the second encodes with every label known.
//!
//! Syntax: one instruction per line, `#`, `;` or `//` comments, `name:`
//! labels, registers as `x0`..`x31` or ABI names. Branch and jump targets
//! are labels or literal byte offsets relative to the instruction.

mod encode;
mod isa;
mod parser;

use std::collections::HashMap;

/// Assembly failure at a specific source line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct AsmError {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl AsmError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Assemble `source` into 32-bit instruction words.
pub fn assemble(source: &str) -> Result<Vec<u32>, AsmError> {
    let mut statements = Vec::new();
    let mut labels: HashMap<String, u32> = HashMap::new();
    let mut pc: u32 = 0;

    for (idx, text) in source.lines().enumerate() {
        let line = idx + 1;
        let parsed = parser::parse_line(line, text).map_err(|m| AsmError::new(line, m))?;

        for label in parsed.labels {
            if labels.contains_key(&label) {
                return Err(AsmError::new(line, format!("duplicate label '{}'", label)));
            }
            labels.insert(label, pc);
        }

        if let Some(stmt) = parsed.statement {
            let words = isa::word_count(&stmt).map_err(|m| AsmError::new(line, m))?;
            statements.push((pc, stmt));
            pc += 4 * words as u32;
        }
    }

    let mut words = Vec::with_capacity(statements.len());
    for (pc, stmt) in &statements {
        let encoded = isa::encode(stmt, *pc, &labels).map_err(|m| AsmError::new(stmt.line, m))?;
        words.extend(encoded);
    }

    Ok(words)
}
