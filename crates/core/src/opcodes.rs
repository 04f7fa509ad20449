//! M6805/M68HC05 instruction decoder.
//!
//! The 6805 opcode map is regular: the high nibble selects an addressing
//! mode row and the low nibble an operation column. [`decode`] turns an
//! opcode byte into a typed [`Instruction`]; operand bytes are fetched by
//! the execution core while the instruction runs. [`CYCLES`] is the
//! MC68HC05 cycle table indexed by opcode.

/// Addressing modes of the register/memory (0xA0–0xFF) rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `#ii`
    Imm,
    /// `dd` (page zero)
    Dir,
    /// `hhll`
    Ext,
    /// `hhll,X`
    Ix2,
    /// `ff,X`
    Ix1,
    /// `,X`
    Ix,
}

/// Operand location of the read-modify-write (0x30–0x7F) rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwMode {
    Dir,
    Acc,
    Idx,
    Ix1,
    Ix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Sub,
    Cmp,
    Sbc,
    Cpx,
    And,
    Bit,
    Lda,
    Eor,
    Adc,
    Ora,
    Add,
    Ldx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwOp {
    Neg,
    Com,
    Lsr,
    Ror,
    Asr,
    Lsl,
    Rol,
    Dec,
    Inc,
    Tst,
    Clr,
}

/// Relative branch conditions, in opcode order 0x20–0x2F.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Always,
    Never,
    Hi,
    Ls,
    Cc,
    Cs,
    Ne,
    Eq,
    Hcc,
    Hcs,
    Pl,
    Mi,
    Mc,
    Ms,
    /// IRQ line asserted
    Il,
    /// IRQ line clear
    Ih,
}

const CONDS: [Cond; 16] = [
    Cond::Always, Cond::Never, Cond::Hi, Cond::Ls,
    Cond::Cc, Cond::Cs, Cond::Ne, Cond::Eq,
    Cond::Hcc, Cond::Hcs, Cond::Pl, Cond::Mi,
    Cond::Mc, Cond::Ms, Cond::Il, Cond::Ih,
];

/// Decoded 6805 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // Bit manipulation (direct page)
    Brset { bit: u8 },
    Brclr { bit: u8 },
    Bset { bit: u8 },
    Bclr { bit: u8 },
    // Branch
    Branch(Cond),
    Bsr,
    // Read-modify-write
    Rmw { op: RmwOp, mode: RmwMode },
    Mul,
    // Register/memory
    Alu { op: AluOp, mode: Mode },
    Sta { mode: Mode },
    Stx { mode: Mode },
    Jmp { mode: Mode },
    Jsr { mode: Mode },
    // Control
    Rti,
    Rts,
    Swi,
    Stop,
    Wait,
    Tax,
    Txa,
    Clc,
    Sec,
    Cli,
    Sei,
    Rsp,
    Nop,
    Illegal(u8),
}

impl Instruction {
    /// True for opcodes that don't exist on the HC05.
    pub fn is_illegal(&self) -> bool {
        matches!(self, Instruction::Illegal(_))
    }
}

/// Decode one opcode byte.
pub fn decode(op: u8) -> Instruction {
    let row = op >> 4;
    let col = op & 0x0F;
    match row {
        0x0 => {
            let bit = col >> 1;
            if col & 1 == 0 { Instruction::Brset { bit } } else { Instruction::Brclr { bit } }
        }
        0x1 => {
            let bit = col >> 1;
            if col & 1 == 0 { Instruction::Bset { bit } } else { Instruction::Bclr { bit } }
        }
        0x2 => Instruction::Branch(CONDS[col as usize]),
        0x3..=0x7 => {
            if op == 0x42 {
                return Instruction::Mul;
            }
            let mode = match row {
                0x3 => RmwMode::Dir,
                0x4 => RmwMode::Acc,
                0x5 => RmwMode::Idx,
                0x6 => RmwMode::Ix1,
                _ => RmwMode::Ix,
            };
            match decode_rmw(col) {
                Some(op) => Instruction::Rmw { op, mode },
                None => Instruction::Illegal(op),
            }
        }
        0x8 | 0x9 => match op {
            0x80 => Instruction::Rti,
            0x81 => Instruction::Rts,
            0x83 => Instruction::Swi,
            0x8E => Instruction::Stop,
            0x8F => Instruction::Wait,
            0x97 => Instruction::Tax,
            0x98 => Instruction::Clc,
            0x99 => Instruction::Sec,
            0x9A => Instruction::Cli,
            0x9B => Instruction::Sei,
            0x9C => Instruction::Rsp,
            0x9D => Instruction::Nop,
            0x9F => Instruction::Txa,
            _ => Instruction::Illegal(op),
        },
        _ => {
            let mode = match row {
                0xA => Mode::Imm,
                0xB => Mode::Dir,
                0xC => Mode::Ext,
                0xD => Mode::Ix2,
                0xE => Mode::Ix1,
                _ => Mode::Ix,
            };
            match (col, mode) {
                (0x7, Mode::Imm) | (0xC, Mode::Imm) | (0xF, Mode::Imm) => Instruction::Illegal(op),
                (0xD, Mode::Imm) => Instruction::Bsr,
                (0x7, _) => Instruction::Sta { mode },
                (0xC, _) => Instruction::Jmp { mode },
                (0xD, _) => Instruction::Jsr { mode },
                (0xF, _) => Instruction::Stx { mode },
                _ => {
                    let alu = match col {
                        0x0 => AluOp::Sub,
                        0x1 => AluOp::Cmp,
                        0x2 => AluOp::Sbc,
                        0x3 => AluOp::Cpx,
                        0x4 => AluOp::And,
                        0x5 => AluOp::Bit,
                        0x6 => AluOp::Lda,
                        0x8 => AluOp::Eor,
                        0x9 => AluOp::Adc,
                        0xA => AluOp::Ora,
                        0xB => AluOp::Add,
                        _ => AluOp::Ldx,
                    };
                    Instruction::Alu { op: alu, mode }
                }
            }
        }
    }
}

fn decode_rmw(col: u8) -> Option<RmwOp> {
    Some(match col {
        0x0 => RmwOp::Neg,
        0x3 => RmwOp::Com,
        0x4 => RmwOp::Lsr,
        0x6 => RmwOp::Ror,
        0x7 => RmwOp::Asr,
        0x8 => RmwOp::Lsl,
        0x9 => RmwOp::Rol,
        0xA => RmwOp::Dec,
        0xC => RmwOp::Inc,
        0xD => RmwOp::Tst,
        0xF => RmwOp::Clr,
        _ => return None,
    })
}

/// MC68HC05 cycle counts by opcode. Zero marks an illegal opcode.
#[rustfmt::skip]
pub const CYCLES: [u8; 256] = [
    /*     0, 1, 2, 3, 4, 5, 6, 7, 8, 9, A, B, C, D, E, F */
    /*0*/  5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    /*1*/  5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    /*2*/  3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    /*3*/  5, 0, 0, 5, 5, 0, 5, 5, 5, 5, 5, 0, 5, 4, 0, 5,
    /*4*/  3, 0,11, 3, 3, 0, 3, 3, 3, 3, 3, 0, 3, 3, 0, 3,
    /*5*/  3, 0, 0, 3, 3, 0, 3, 3, 3, 3, 3, 0, 3, 3, 0, 3,
    /*6*/  6, 0, 0, 6, 6, 0, 6, 6, 6, 6, 6, 0, 6, 5, 0, 6,
    /*7*/  5, 0, 0, 5, 5, 0, 5, 5, 5, 5, 5, 0, 5, 4, 0, 5,
    /*8*/  9, 6, 0,10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 2,
    /*9*/  0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 0, 2,
    /*A*/  2, 2, 2, 2, 2, 2, 2, 0, 2, 2, 2, 2, 0, 6, 2, 0,
    /*B*/  3, 3, 3, 3, 3, 3, 3, 4, 3, 3, 3, 3, 2, 5, 3, 4,
    /*C*/  4, 4, 4, 4, 4, 4, 4, 5, 4, 4, 4, 4, 3, 6, 4, 5,
    /*D*/  5, 5, 5, 5, 5, 5, 5, 6, 5, 5, 5, 5, 4, 7, 5, 6,
    /*E*/  4, 4, 4, 4, 4, 4, 4, 5, 4, 4, 4, 4, 3, 6, 4, 5,
    /*F*/  3, 3, 3, 3, 3, 3, 3, 4, 3, 3, 3, 3, 2, 5, 3, 4,
];

/// Cycles charged for an illegal opcode.
pub const ILLEGAL_CYCLES: u8 = 2;
