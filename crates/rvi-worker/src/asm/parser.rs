//! Line-level assembly syntax: comments, labels, directives, operands.

/// One instruction line, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    /// 1-based source line.
    pub line: usize,
    /// Lower-cased mnemonic.
    pub mnemonic: String,
    /// Comma-separated operands, trimmed.
    pub operands: Vec<String>,
}

/// Everything a single source line declares.
#[derive(Debug, Default)]
pub(crate) struct ParsedLine {
    pub labels: Vec<String>,
    pub statement: Option<Statement>,
}

/// Directives accepted and ignored. Everything assembles into one flat
/// text section starting at address 0.
const IGNORED_DIRECTIVES: &[&str] = &[".text", ".globl", ".global"];

pub(crate) fn parse_line(line: usize, text: &str) -> Result<ParsedLine, String> {
    let mut rest = strip_comment(text).trim();
    let mut parsed = ParsedLine::default();

    while let Some(idx) = rest.find(':') {
        let candidate = rest[..idx].trim();
        if !is_identifier(candidate) {
            break;
        }
        parsed.labels.push(candidate.to_string());
        rest = rest[idx + 1..].trim();
    }

    if rest.is_empty() {
        return Ok(parsed);
    }

    let (head, tail) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest, ""),
    };
    let mnemonic = head.to_ascii_lowercase();

    if mnemonic.starts_with('.') {
        check_directive(&mnemonic, tail)?;
        return Ok(parsed);
    }

    let operands = if tail.is_empty() {
        Vec::new()
    } else {
        let operands: Vec<String> = tail.split(',').map(|op| op.trim().to_string()).collect();
        if operands.iter().any(String::is_empty) {
            return Err(format!("empty operand in '{}'", rest));
        }
        operands
    };

    parsed.statement = Some(Statement {
        line,
        mnemonic,
        operands,
    });
    Ok(parsed)
}

fn strip_comment(text: &str) -> &str {
    let end = ["#", ";", "//"]
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
        .unwrap_or(text.len());
    &text[..end]
}

fn check_directive(directive: &str, args: &str) -> Result<(), String> {
    if IGNORED_DIRECTIVES.contains(&directive) {
        return Ok(());
    }
    if directive == ".section" && args.trim() == ".text" {
        return Ok(());
    }
    Err(format!("unsupported directive '{}'", directive))
}

/// Label-style identifier: `[A-Za-z_.$][A-Za-z0-9_.$]*`.
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$') => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

/// `x0`..`x31` or an ABI register name.
pub(crate) fn parse_register(text: &str) -> Result<u8, String> {
    let name = text.trim().to_ascii_lowercase();
    if let Some(num) = name.strip_prefix('x') {
        if let Ok(n) = num.parse::<u8>() {
            if n < 32 && (num == "0" || !num.starts_with('0')) {
                return Ok(n);
            }
        }
    }

    let abi = match name.as_str() {
        "zero" => 0,
        "ra" => 1,
        "sp" => 2,
        "gp" => 3,
        "tp" => 4,
        "t0" => 5,
        "t1" => 6,
        "t2" => 7,
        "s0" | "fp" => 8,
        "s1" => 9,
        "a0" => 10,
        "a1" => 11,
        "a2" => 12,
        "a3" => 13,
        "a4" => 14,
        "a5" => 15,
        "a6" => 16,
        "a7" => 17,
        "s2" => 18,
        "s3" => 19,
        "s4" => 20,
        "s5" => 21,
        "s6" => 22,
        "s7" => 23,
        "s8" => 24,
        "s9" => 25,
        "s10" => 26,
        "s11" => 27,
        "t3" => 28,
        "t4" => 29,
        "t5" => 30,
        "t6" => 31,
        _ => return Err(format!("invalid register '{}'", text.trim())),
    };
    Ok(abi)
}

/// Signed integer literal: decimal, `0x` hex or `0b` binary.
pub(crate) fn parse_immediate(text: &str) -> Result<i64, String> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, lower.as_str())
    };

    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(format!("invalid immediate '{}'", trimmed));
    }
    let magnitude = i64::from_str_radix(&digits, radix)
        .map_err(|_| format!("invalid immediate '{}'", trimmed))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// `offset(reg)` or `(reg)`.
pub(crate) fn parse_memory_operand(text: &str) -> Result<(i64, u8), String> {
    let trimmed = text.trim();
    let open = trimmed
        .find('(')
        .ok_or_else(|| format!("expected offset(register), found '{}'", trimmed))?;
    let inner = trimmed[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| format!("unbalanced parentheses in '{}'", trimmed))?;

    let offset_text = trimmed[..open].trim();
    let offset = if offset_text.is_empty() {
        0
    } else {
        parse_immediate(offset_text)?
    };
    Ok((offset, parse_register(inner)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_instruction() {
        let parsed = parse_line(4, "  ADDI x1, x0, -10  ").unwrap();
        assert!(parsed.labels.is_empty());
        assert_eq!(
            parsed.statement,
            Some(Statement {
                line: 4,
                mnemonic: "addi".to_string(),
                operands: vec!["x1".into(), "x0".into(), "-10".into()],
            })
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        for text in ["", "   ", "# comment", "; comment", "// comment"] {
            let parsed = parse_line(1, text).unwrap();
            assert!(parsed.statement.is_none(), "{:?}", text);
        }
        let parsed = parse_line(1, "nop # trailing").unwrap();
        assert_eq!(parsed.statement.unwrap().mnemonic, "nop");
    }

    #[test]
    fn test_labels() {
        let parsed = parse_line(1, "loop: addi x1, x1, 1").unwrap();
        assert_eq!(parsed.labels, vec!["loop"]);
        assert_eq!(parsed.statement.unwrap().mnemonic, "addi");

        let parsed = parse_line(1, "a: b:").unwrap();
        assert_eq!(parsed.labels, vec!["a", "b"]);
        assert!(parsed.statement.is_none());
    }

    #[test]
    fn test_directives() {
        assert!(parse_line(1, ".text").unwrap().statement.is_none());
        assert!(parse_line(1, ".globl _start").unwrap().statement.is_none());
        assert!(parse_line(1, ".section .text").unwrap().statement.is_none());
        assert!(parse_line(1, ".word 5").is_err());
    }

    #[test]
    fn test_empty_operand_rejected() {
        assert!(parse_line(1, "addi x1,, 3").is_err());
    }

    #[test]
    fn test_registers() {
        assert_eq!(parse_register("x0").unwrap(), 0);
        assert_eq!(parse_register("X31").unwrap(), 31);
        assert_eq!(parse_register("zero").unwrap(), 0);
        assert_eq!(parse_register("fp").unwrap(), 8);
        assert_eq!(parse_register("s11").unwrap(), 27);
        assert_eq!(parse_register("t6").unwrap(), 31);
        assert!(parse_register("x32").is_err());
        assert!(parse_register("x01").is_err());
        assert!(parse_register("r1").is_err());
    }

    #[test]
    fn test_immediates() {
        assert_eq!(parse_immediate("10").unwrap(), 10);
        assert_eq!(parse_immediate("-10").unwrap(), -10);
        assert_eq!(parse_immediate("+7").unwrap(), 7);
        assert_eq!(parse_immediate("0x7FF").unwrap(), 2047);
        assert_eq!(parse_immediate("-0x800").unwrap(), -2048);
        assert_eq!(parse_immediate("0b1010").unwrap(), 10);
        assert!(parse_immediate("0x").is_err());
        assert!(parse_immediate("--1").is_err());
        assert!(parse_immediate("ten").is_err());
    }

    #[test]
    fn test_memory_operand() {
        assert_eq!(parse_memory_operand("8(sp)").unwrap(), (8, 2));
        assert_eq!(parse_memory_operand("-4(x8)").unwrap(), (-4, 8));
        assert_eq!(parse_memory_operand("(a0)").unwrap(), (0, 10));
        assert!(parse_memory_operand("8").is_err());
        assert!(parse_memory_operand("8(sp").is_err());
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("loop"));
        assert!(is_identifier("_start"));
        assert!(is_identifier(".L1"));
        assert!(!is_identifier("1loop"));
        assert!(!is_identifier("lw x1, 0(x2)"));
        assert!(!is_identifier(""));
    }
}
