//! RV32I instruction formats.
//!
//! Each encoder takes already range-checked fields and places them; the
//! immediates are masked to their field width, so two's-complement values
//! land correctly.

/// Major opcodes (bits 6:0).
pub(crate) mod opcode {
    pub const LOAD: u32 = 0b000_0011;
    pub const MISC_MEM: u32 = 0b000_1111;
    pub const OP_IMM: u32 = 0b001_0011;
    pub const AUIPC: u32 = 0b001_0111;
    pub const STORE: u32 = 0b010_0011;
    pub const OP: u32 = 0b011_0011;
    pub const LUI: u32 = 0b011_0111;
    pub const BRANCH: u32 = 0b110_0011;
    pub const JALR: u32 = 0b110_0111;
    pub const JAL: u32 = 0b110_1111;
    pub const SYSTEM: u32 = 0b111_0011;
}

/// `funct7 | rs2 | rs1 | funct3 | rd | opcode`
pub(crate) fn r_type(funct7: u32, rs2: u8, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (funct7 & 0x7f) << 25
        | (rs2 as u32) << 20
        | (rs1 as u32) << 15
        | (funct3 & 0x7) << 12
        | (rd as u32) << 7
        | opcode
}

/// `imm[11:0] | rs1 | funct3 | rd | opcode`
pub(crate) fn i_type(imm: i32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    ((imm as u32) & 0xfff) << 20
        | (rs1 as u32) << 15
        | (funct3 & 0x7) << 12
        | (rd as u32) << 7
        | opcode
}

/// `imm[11:5] | rs2 | rs1 | funct3 | imm[4:0] | opcode`
pub(crate) fn s_type(imm: i32, rs2: u8, rs1: u8, funct3: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    ((imm >> 5) & 0x7f) << 25
        | (rs2 as u32) << 20
        | (rs1 as u32) << 15
        | (funct3 & 0x7) << 12
        | (imm & 0x1f) << 7
        | opcode
}

/// `imm[12|10:5] | rs2 | rs1 | funct3 | imm[4:1|11] | opcode`
pub(crate) fn b_type(offset: i32, rs2: u8, rs1: u8, funct3: u32, opcode: u32) -> u32 {
    let imm = offset as u32;
    ((imm >> 12) & 0x1) << 31
        | ((imm >> 5) & 0x3f) << 25
        | (rs2 as u32) << 20
        | (rs1 as u32) << 15
        | (funct3 & 0x7) << 12
        | ((imm >> 1) & 0xf) << 8
        | ((imm >> 11) & 0x1) << 7
        | opcode
}

/// `imm[31:12] | rd | opcode`, with `imm20` already the upper 20 bits.
pub(crate) fn u_type(imm20: u32, rd: u8, opcode: u32) -> u32 {
    (imm20 & 0xf_ffff) << 12 | (rd as u32) << 7 | opcode
}

/// `imm[20|10:1|11|19:12] | rd | opcode`
pub(crate) fn j_type(offset: i32, rd: u8, opcode: u32) -> u32 {
    let imm = offset as u32;
    ((imm >> 20) & 0x1) << 31
        | ((imm >> 1) & 0x3ff) << 21
        | ((imm >> 11) & 0x1) << 20
        | ((imm >> 12) & 0xff) << 12
        | (rd as u32) << 7
        | opcode
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i_type_reference_words() {
        assert_eq!(i_type(10, 0, 0, 1, opcode::OP_IMM), 0x00A0_0093);
        assert_eq!(i_type(-10, 0, 0, 1, opcode::OP_IMM), 0xFF60_0093);
        assert_eq!(i_type(-2048, 0, 0, 1, opcode::OP_IMM), 0x8000_0093);
        assert_eq!(i_type(2047, 0, 0, 1, opcode::OP_IMM), 0x7FF0_0093);
    }

    #[test]
    fn test_b_type_scatters_offset_bits() {
        // beq x0, x0, -4
        assert_eq!(b_type(-4, 0, 0, 0, opcode::BRANCH), 0xFE00_0EE3);
        // beq x0, x0, 4094 sets every positive bit but 12
        assert_eq!(b_type(4094, 0, 0, 0, opcode::BRANCH) >> 31, 0);
        assert_eq!(b_type(-4096, 0, 0, 0, opcode::BRANCH), 0x8000_0063);
    }

    #[test]
    fn test_j_type_scatters_offset_bits() {
        assert_eq!(j_type(0, 0, opcode::JAL), 0x0000_006F);
        assert_eq!(j_type(-4, 0, opcode::JAL), 0xFFDF_F06F);
        assert_eq!(j_type(2048, 1, opcode::JAL), 0x0010_00EF);
    }

    #[test]
    fn test_u_and_s_type() {
        assert_eq!(u_type(0x12345, 1, opcode::LUI), 0x1234_50B7);
        assert_eq!(s_type(8, 5, 2, 0b010, opcode::STORE), 0x0051_2423);
        assert_eq!(s_type(-1, 5, 2, 0b010, opcode::STORE), 0xFE51_2FA3);
    }
}
