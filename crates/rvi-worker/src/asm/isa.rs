//! RV32I mnemonic table and pseudo-instruction expansion.

use std::collections::HashMap;

use super::encode::{self, opcode};
use super::parser::{is_identifier, parse_immediate, parse_memory_operand, parse_register, Statement};

const RA: u8 = 1;
const ZERO: u8 = 0;

/// Operand layout and fixed fields of a base instruction.
#[derive(Debug, Clone, Copy)]
enum Format {
    /// `rd, rs1, rs2`
    Register { funct3: u32, funct7: u32 },
    /// `rd, rs1, imm12`
    Immediate { funct3: u32 },
    /// `rd, rs1, shamt`
    Shift { funct3: u32, funct7: u32 },
    /// `rd, imm(rs1)`
    Load { funct3: u32 },
    /// `rs2, imm(rs1)`
    Store { funct3: u32 },
    /// `rs1, rs2, target`
    Branch { funct3: u32 },
    /// `rd, imm20`
    Upper { opcode: u32 },
    /// `rd, target` or `target`
    Jal,
    /// `rd, imm(rs1)`, `rd, rs1, imm`, `rd, rs1` or `rs1`
    Jalr,
    /// `pred, succ` or nothing
    Fence,
    /// no operands, `funct12` in the immediate field
    System { funct12: i32 },
}

const BASE: &[(&str, Format)] = &[
    ("add", Format::Register { funct3: 0b000, funct7: 0b000_0000 }),
    ("sub", Format::Register { funct3: 0b000, funct7: 0b010_0000 }),
    ("sll", Format::Register { funct3: 0b001, funct7: 0b000_0000 }),
    ("slt", Format::Register { funct3: 0b010, funct7: 0b000_0000 }),
    ("sltu", Format::Register { funct3: 0b011, funct7: 0b000_0000 }),
    ("xor", Format::Register { funct3: 0b100, funct7: 0b000_0000 }),
    ("srl", Format::Register { funct3: 0b101, funct7: 0b000_0000 }),
    ("sra", Format::Register { funct3: 0b101, funct7: 0b010_0000 }),
    ("or", Format::Register { funct3: 0b110, funct7: 0b000_0000 }),
    ("and", Format::Register { funct3: 0b111, funct7: 0b000_0000 }),
    ("addi", Format::Immediate { funct3: 0b000 }),
    ("slti", Format::Immediate { funct3: 0b010 }),
    ("sltiu", Format::Immediate { funct3: 0b011 }),
    ("xori", Format::Immediate { funct3: 0b100 }),
    ("ori", Format::Immediate { funct3: 0b110 }),
    ("andi", Format::Immediate { funct3: 0b111 }),
    ("slli", Format::Shift { funct3: 0b001, funct7: 0b000_0000 }),
    ("srli", Format::Shift { funct3: 0b101, funct7: 0b000_0000 }),
    ("srai", Format::Shift { funct3: 0b101, funct7: 0b010_0000 }),
    ("lb", Format::Load { funct3: 0b000 }),
    ("lh", Format::Load { funct3: 0b001 }),
    ("lw", Format::Load { funct3: 0b010 }),
    ("lbu", Format::Load { funct3: 0b100 }),
    ("lhu", Format::Load { funct3: 0b101 }),
    ("sb", Format::Store { funct3: 0b000 }),
    ("sh", Format::Store { funct3: 0b001 }),
    ("sw", Format::Store { funct3: 0b010 }),
    ("beq", Format::Branch { funct3: 0b000 }),
    ("bne", Format::Branch { funct3: 0b001 }),
    ("blt", Format::Branch { funct3: 0b100 }),
    ("bge", Format::Branch { funct3: 0b101 }),
    ("bltu", Format::Branch { funct3: 0b110 }),
    ("bgeu", Format::Branch { funct3: 0b111 }),
    ("lui", Format::Upper { opcode: opcode::LUI }),
    ("auipc", Format::Upper { opcode: opcode::AUIPC }),
    ("jal", Format::Jal),
    ("jalr", Format::Jalr),
    ("fence", Format::Fence),
    ("ecall", Format::System { funct12: 0 }),
    ("ebreak", Format::System { funct12: 1 }),
];

const PSEUDO: &[&str] = &[
    "nop", "mv", "not", "neg", "seqz", "snez", "sltz", "sgtz", "li", "j", "jr", "ret", "beqz",
    "bnez", "blez", "bgez", "bltz", "bgtz", "bgt", "ble", "bgtu", "bleu",
];

fn lookup(mnemonic: &str) -> Option<Format> {
    BASE.iter()
        .find(|(name, _)| *name == mnemonic)
        .map(|(_, format)| *format)
}

/// Number of words `stmt` expands to. Known before labels are resolved.
pub(crate) fn word_count(stmt: &Statement) -> Result<usize, String> {
    if stmt.mnemonic == "li" {
        let (rd, value) = li_operands(&stmt.operands)?;
        return Ok(load_immediate(rd, value).len());
    }
    if lookup(&stmt.mnemonic).is_some() || PSEUDO.contains(&stmt.mnemonic.as_str()) {
        Ok(1)
    } else {
        Err(format!("unknown mnemonic '{}'", stmt.mnemonic))
    }
}

/// Encode `stmt` located at byte address `pc`.
pub(crate) fn encode(
    stmt: &Statement,
    pc: u32,
    labels: &HashMap<String, u32>,
) -> Result<Vec<u32>, String> {
    let ops = &stmt.operands;
    if let Some(format) = lookup(&stmt.mnemonic) {
        return encode_base(format, ops, pc, labels).map(|word| vec![word]);
    }

    let word = match stmt.mnemonic.as_str() {
        "li" => {
            let (rd, value) = li_operands(ops)?;
            return Ok(load_immediate(rd, value));
        }
        "nop" => {
            arity(ops, 0)?;
            encode::i_type(0, ZERO, 0b000, ZERO, opcode::OP_IMM)
        }
        "mv" => unary_immediate(ops, 0b000, 0)?,
        "not" => unary_immediate(ops, 0b100, -1)?,
        "seqz" => unary_immediate(ops, 0b011, 1)?,
        "neg" => {
            arity(ops, 2)?;
            encode::r_type(0b010_0000, reg(&ops[1])?, ZERO, 0b000, reg(&ops[0])?, opcode::OP)
        }
        "snez" => {
            arity(ops, 2)?;
            encode::r_type(0, reg(&ops[1])?, ZERO, 0b011, reg(&ops[0])?, opcode::OP)
        }
        "sltz" => {
            arity(ops, 2)?;
            encode::r_type(0, ZERO, reg(&ops[1])?, 0b010, reg(&ops[0])?, opcode::OP)
        }
        "sgtz" => {
            arity(ops, 2)?;
            encode::r_type(0, reg(&ops[1])?, ZERO, 0b010, reg(&ops[0])?, opcode::OP)
        }
        "j" => {
            arity(ops, 1)?;
            let offset = pc_relative(&ops[0], pc, labels, 21)?;
            encode::j_type(offset, ZERO, opcode::JAL)
        }
        "jr" => {
            arity(ops, 1)?;
            encode::i_type(0, reg(&ops[0])?, 0b000, ZERO, opcode::JALR)
        }
        "ret" => {
            arity(ops, 0)?;
            encode::i_type(0, RA, 0b000, ZERO, opcode::JALR)
        }
        // Compare against zero: (funct3, zero register goes first).
        "beqz" => branch_zero(ops, pc, labels, 0b000, false)?,
        "bnez" => branch_zero(ops, pc, labels, 0b001, false)?,
        "blez" => branch_zero(ops, pc, labels, 0b101, true)?,
        "bgez" => branch_zero(ops, pc, labels, 0b101, false)?,
        "bltz" => branch_zero(ops, pc, labels, 0b100, false)?,
        "bgtz" => branch_zero(ops, pc, labels, 0b100, true)?,
        // Swapped-operand branches.
        "bgt" => branch_swapped(ops, pc, labels, 0b100)?,
        "ble" => branch_swapped(ops, pc, labels, 0b101)?,
        "bgtu" => branch_swapped(ops, pc, labels, 0b110)?,
        "bleu" => branch_swapped(ops, pc, labels, 0b111)?,
        other => return Err(format!("unknown mnemonic '{}'", other)),
    };
    Ok(vec![word])
}

fn encode_base(
    format: Format,
    ops: &[String],
    pc: u32,
    labels: &HashMap<String, u32>,
) -> Result<u32, String> {
    match format {
        Format::Register { funct3, funct7 } => {
            arity(ops, 3)?;
            Ok(encode::r_type(
                funct7,
                reg(&ops[2])?,
                reg(&ops[1])?,
                funct3,
                reg(&ops[0])?,
                opcode::OP,
            ))
        }
        Format::Immediate { funct3 } => {
            arity(ops, 3)?;
            let imm = signed(parse_immediate(&ops[2])?, 12)?;
            Ok(encode::i_type(imm, reg(&ops[1])?, funct3, reg(&ops[0])?, opcode::OP_IMM))
        }
        Format::Shift { funct3, funct7 } => {
            arity(ops, 3)?;
            let shamt = parse_immediate(&ops[2])?;
            if !(0..32).contains(&shamt) {
                return Err(format!("shift amount {} out of range 0..31", shamt));
            }
            let imm = (funct7 << 5) as i32 | shamt as i32;
            Ok(encode::i_type(imm, reg(&ops[1])?, funct3, reg(&ops[0])?, opcode::OP_IMM))
        }
        Format::Load { funct3 } => {
            arity(ops, 2)?;
            let (offset, rs1) = parse_memory_operand(&ops[1])?;
            Ok(encode::i_type(signed(offset, 12)?, rs1, funct3, reg(&ops[0])?, opcode::LOAD))
        }
        Format::Store { funct3 } => {
            arity(ops, 2)?;
            let (offset, rs1) = parse_memory_operand(&ops[1])?;
            Ok(encode::s_type(signed(offset, 12)?, reg(&ops[0])?, rs1, funct3, opcode::STORE))
        }
        Format::Branch { funct3 } => {
            arity(ops, 3)?;
            let offset = pc_relative(&ops[2], pc, labels, 13)?;
            Ok(encode::b_type(offset, reg(&ops[1])?, reg(&ops[0])?, funct3, opcode::BRANCH))
        }
        Format::Upper { opcode } => {
            arity(ops, 2)?;
            Ok(encode::u_type(upper(&ops[1])?, reg(&ops[0])?, opcode))
        }
        Format::Jal => {
            let (rd, target) = match ops {
                [target] => (RA, target),
                [rd, target] => (reg(rd)?, target),
                _ => return Err(arity_error(ops, "1 or 2")),
            };
            let offset = pc_relative(target, pc, labels, 21)?;
            Ok(encode::j_type(offset, rd, opcode::JAL))
        }
        Format::Jalr => {
            let (rd, rs1, offset) = match ops {
                [rs1] => (RA, reg(rs1)?, 0),
                [rd, base] if base.contains('(') => {
                    let (offset, rs1) = parse_memory_operand(base)?;
                    (reg(rd)?, rs1, offset)
                }
                [rd, rs1] => (reg(rd)?, reg(rs1)?, 0),
                [rd, rs1, imm] => (reg(rd)?, reg(rs1)?, parse_immediate(imm)?),
                _ => return Err(arity_error(ops, "1 to 3")),
            };
            Ok(encode::i_type(signed(offset, 12)?, rs1, 0b000, rd, opcode::JALR))
        }
        Format::Fence => {
            let (pred, succ) = match ops {
                [] => (0b1111, 0b1111),
                [pred, succ] => (fence_set(pred)?, fence_set(succ)?),
                _ => return Err(arity_error(ops, "0 or 2")),
            };
            Ok(encode::i_type(((pred << 4) | succ) as i32, ZERO, 0b000, ZERO, opcode::MISC_MEM))
        }
        Format::System { funct12 } => {
            arity(ops, 0)?;
            Ok(encode::i_type(funct12, ZERO, 0b000, ZERO, opcode::SYSTEM))
        }
    }
}

/// `li rd, value`: one `addi` when the value fits in 12 bits, otherwise
/// `lui` for the upper part plus an `addi` for a non-zero remainder. The
/// upper part is rounded so the sign-extended remainder adds back exactly.
fn load_immediate(rd: u8, value: i32) -> Vec<u32> {
    let low = (value << 20) >> 20;
    if low == value {
        return vec![encode::i_type(value, ZERO, 0b000, rd, opcode::OP_IMM)];
    }

    let high = (value.wrapping_sub(low) as u32) >> 12;
    let mut words = vec![encode::u_type(high, rd, opcode::LUI)];
    if low != 0 {
        words.push(encode::i_type(low, rd, 0b000, rd, opcode::OP_IMM));
    }
    words
}

fn li_operands(ops: &[String]) -> Result<(u8, i32), String> {
    arity(ops, 2)?;
    let rd = reg(&ops[0])?;
    let value = parse_immediate(&ops[1])?;
    if !(i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&value) {
        return Err(format!("immediate {} does not fit in 32 bits", value));
    }
    Ok((rd, value as i32))
}

/// `op rd, rs` → `<op>i rd, rs, imm`
fn unary_immediate(ops: &[String], funct3: u32, imm: i32) -> Result<u32, String> {
    arity(ops, 2)?;
    Ok(encode::i_type(imm, reg(&ops[1])?, funct3, reg(&ops[0])?, opcode::OP_IMM))
}

fn branch_zero(
    ops: &[String],
    pc: u32,
    labels: &HashMap<String, u32>,
    funct3: u32,
    zero_first: bool,
) -> Result<u32, String> {
    arity(ops, 2)?;
    let rs = reg(&ops[0])?;
    let offset = pc_relative(&ops[1], pc, labels, 13)?;
    let (rs1, rs2) = if zero_first { (ZERO, rs) } else { (rs, ZERO) };
    Ok(encode::b_type(offset, rs2, rs1, funct3, opcode::BRANCH))
}

fn branch_swapped(
    ops: &[String],
    pc: u32,
    labels: &HashMap<String, u32>,
    funct3: u32,
) -> Result<u32, String> {
    arity(ops, 3)?;
    let offset = pc_relative(&ops[2], pc, labels, 13)?;
    Ok(encode::b_type(offset, reg(&ops[0])?, reg(&ops[1])?, funct3, opcode::BRANCH))
}

/// Branch/jump target: a label, or a literal byte offset from `pc`.
fn pc_relative(
    operand: &str,
    pc: u32,
    labels: &HashMap<String, u32>,
    bits: u32,
) -> Result<i32, String> {
    let offset = match parse_immediate(operand) {
        Ok(offset) => offset,
        Err(_) if is_identifier(operand) => {
            let target = labels
                .get(operand)
                .ok_or_else(|| format!("undefined label '{}'", operand))?;
            i64::from(*target) - i64::from(pc)
        }
        Err(e) => return Err(e),
    };
    if offset % 2 != 0 {
        return Err(format!("target offset {} is not a multiple of 2", offset));
    }
    signed(offset, bits)
}

/// Upper immediate: 0..=0xFFFFF, or a negative 20-bit value.
fn upper(operand: &str) -> Result<u32, String> {
    let value = parse_immediate(operand)?;
    if (-(1 << 19)..=0xF_FFFF).contains(&value) {
        Ok((value as u32) & 0xF_FFFF)
    } else {
        Err(format!("upper immediate {} out of range", value))
    }
}

fn fence_set(operand: &str) -> Result<u32, String> {
    let mut set = 0;
    for c in operand.trim().to_ascii_lowercase().chars() {
        let bit = match c {
            'i' => 0b1000,
            'o' => 0b0100,
            'r' => 0b0010,
            'w' => 0b0001,
            _ => return Err(format!("invalid fence set '{}'", operand.trim())),
        };
        if set & bit != 0 {
            return Err(format!("invalid fence set '{}'", operand.trim()));
        }
        set |= bit;
    }
    if set == 0 {
        return Err("empty fence set".to_string());
    }
    Ok(set)
}

fn signed(value: i64, bits: u32) -> Result<i32, String> {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    if (min..=max).contains(&value) {
        Ok(value as i32)
    } else {
        Err(format!("immediate {} out of range {}..{}", value, min, max))
    }
}

fn reg(operand: &str) -> Result<u8, String> {
    parse_register(operand)
}

fn arity(ops: &[String], expected: usize) -> Result<(), String> {
    if ops.len() == expected {
        Ok(())
    } else {
        Err(arity_error(ops, &expected.to_string()))
    }
}

fn arity_error(ops: &[String], expected: &str) -> String {
    format!("expected {} operands, found {}", expected, ops.len())
}
