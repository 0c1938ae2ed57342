//! Fixed-width DVD-Video navigation commands.
//!
//! Every command is eight bytes. The top three bits select the command group
//! and each group stores its optional comparison in its own fields, so all
//! condition handling goes through [`Family`].

use serde::{Deserialize, Serialize};

mod decode;
mod disasm;

pub use decode::{Command, Decoded, Jump, Link, LinkSub, SystemSpace};
pub use disasm::disassemble;

/// Hard limit on commands in one PGC command table.
pub const MAX_BLOCK_INSTRUCTIONS: usize = 128;

/// Number of general parameter registers.
pub const GPRM_COUNT: u8 = 16;
/// Number of system parameter registers.
pub const SPRM_COUNT: u8 = 24;

// ── Registers and operands ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    Gprm(u8),
    Sprm(u8),
}

impl Reg {
    /// Register byte as stored in a command: `0..=15` general, `0x80 | n` system.
    pub fn code(self) -> u8 {
        match self {
            Reg::Gprm(n) => n & 0x0F,
            Reg::Sprm(n) => 0x80 | n,
        }
    }

    pub fn from_code(code: u8) -> Option<Reg> {
        if code & 0x80 != 0 {
            let n = code & 0x7F;
            (n < SPRM_COUNT).then_some(Reg::Sprm(n))
        } else {
            (code < GPRM_COUNT).then_some(Reg::Gprm(code))
        }
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::Gprm(n) => write!(f, "g{n}"),
            Reg::Sprm(n) => write!(f, "s{n}"),
        }
    }
}

/// A source value: 16-bit immediate or register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Imm(u16),
    Reg(Reg),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Reg(r) => write!(f, "{r}"),
        }
    }
}

// ── Comparisons ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    /// Bitwise test, `lhs & rhs != 0`.
    Bc,
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

impl CmpOp {
    pub fn code(self) -> u8 {
        match self {
            CmpOp::Bc => 1,
            CmpOp::Eq => 2,
            CmpOp::Ne => 3,
            CmpOp::Ge => 4,
            CmpOp::Gt => 5,
            CmpOp::Le => 6,
            CmpOp::Lt => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<CmpOp> {
        Some(match code {
            1 => CmpOp::Bc,
            2 => CmpOp::Eq,
            3 => CmpOp::Ne,
            4 => CmpOp::Ge,
            5 => CmpOp::Gt,
            6 => CmpOp::Le,
            7 => CmpOp::Lt,
            _ => return None,
        })
    }

    /// Logical complement. The bit test has none.
    pub fn negate(self) -> Option<CmpOp> {
        Some(match self {
            CmpOp::Bc => return None,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Lt => CmpOp::Ge,
        })
    }

    /// Operator to use when the operands are exchanged.
    pub fn mirror(self) -> CmpOp {
        match self {
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Lt => CmpOp::Gt,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Bc => "&",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Lt => "<",
        }
    }

    pub fn eval(self, lhs: u16, rhs: u16) -> bool {
        match self {
            CmpOp::Bc => lhs & rhs != 0,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Lt => lhs < rhs,
        }
    }
}

/// Embedded comparison carried by a command: the command only executes when
/// `lhs op rhs` holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Condition {
    pub op: CmpOp,
    pub lhs: Reg,
    pub rhs: Operand,
}

impl Condition {
    pub fn negate(self) -> Option<Condition> {
        Some(Condition { op: self.op.negate()?, ..self })
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.symbol(), self.rhs)
    }
}

// ── Set operations ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOp {
    Mov,
    Swap,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rnd,
    And,
    Or,
    Xor,
}

impl SetOp {
    pub fn code(self) -> u8 {
        match self {
            SetOp::Mov => 1,
            SetOp::Swap => 2,
            SetOp::Add => 3,
            SetOp::Sub => 4,
            SetOp::Mul => 5,
            SetOp::Div => 6,
            SetOp::Mod => 7,
            SetOp::Rnd => 8,
            SetOp::And => 9,
            SetOp::Or => 10,
            SetOp::Xor => 11,
        }
    }

    pub fn from_code(code: u8) -> Option<SetOp> {
        Some(match code {
            1 => SetOp::Mov,
            2 => SetOp::Swap,
            3 => SetOp::Add,
            4 => SetOp::Sub,
            5 => SetOp::Mul,
            6 => SetOp::Div,
            7 => SetOp::Mod,
            8 => SetOp::Rnd,
            9 => SetOp::And,
            10 => SetOp::Or,
            11 => SetOp::Xor,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SetOp::Mov => "=",
            SetOp::Swap => "<->",
            SetOp::Add => "+=",
            SetOp::Sub => "-=",
            SetOp::Mul => "*=",
            SetOp::Div => "/=",
            SetOp::Mod => "%=",
            SetOp::Rnd => "= random",
            SetOp::And => "&=",
            SetOp::Or => "|=",
            SetOp::Xor => "^=",
        }
    }
}

// ── Command groups ──────────────────────────────────────────────────

/// Command group, from the top three bits of byte 0 (type 1 split on the
/// jump bit). Each group keeps its comparison fields in different bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Type 0: nop, goto, break, set temporary parental level.
    /// Compare: imm flag byte1 bit 7, R1 byte 3, R2 bytes 4-5.
    Special,
    /// Type 1 links. Same compare fields as `Special`.
    Link,
    /// Type 1 jumps and calls. Register-register compare in bytes 6 and 7.
    Jump,
    /// Type 2 system register sets. Compare like `Jump`, exclusive with a link.
    SetSystem,
    /// Type 3 general register sets. Compare: imm flag byte1 bit 7, R1 byte 2,
    /// R2 7-bit immediate in byte 6 or register in byte 7. Exclusive with a link.
    Set,
    /// Types 4 to 6, combined set/compare/link forms. Never emitted.
    Compound,
    Reserved,
}

/// One 8-byte navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instruction([u8; 8]);

const SPECIAL_GOTO: u8 = 1;
const SPECIAL_BREAK: u8 = 2;

const LINK_SUB: u8 = 1;
const LINK_PGCN: u8 = 4;
const LINK_PTTN: u8 = 5;
const LINK_PGN: u8 = 6;
const LINK_CN: u8 = 7;

const JUMP_EXIT: u8 = 1;
const JUMP_TT: u8 = 2;
const JUMP_VTS_TT: u8 = 3;
const JUMP_VTS_PTT: u8 = 5;
const JUMP_SS: u8 = 6;
const CALL_SS: u8 = 8;

const SYS_STREAMS: u8 = 1;
const SYS_GPRM_MODE: u8 = 3;
const SYS_BUTTON: u8 = 6;

impl Instruction {
    pub const NOP: Instruction = Instruction([0; 8]);

    pub fn new(bytes: [u8; 8]) -> Self {
        Instruction(bytes)
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.0
    }

    // ── Builders ────────────────────────────────────────────────────

    pub fn goto(line: u8) -> Self {
        Instruction([0x00, SPECIAL_GOTO, 0, 0, 0, 0, 0, line])
    }

    /// `if (cond) goto line`
    pub fn branch(cond: Condition, line: u8) -> Self {
        let mut ins = Instruction::goto(line);
        ins.write_compare_v1(cond);
        ins
    }

    pub fn break_block() -> Self {
        Instruction([0x00, SPECIAL_BREAK, 0, 0, 0, 0, 0, 0])
    }

    /// General register set: `g[target] op= source`.
    pub fn set(op: SetOp, target: u8, source: Operand) -> Self {
        let target = target & 0x0F;
        match source {
            Operand::Imm(v) => {
                let [hi, lo] = v.to_be_bytes();
                Instruction([0x70 | op.code(), 0, 0, target, hi, lo, 0, 0])
            }
            Operand::Reg(r) => Instruction([0x60 | op.code(), 0, 0, target, 0, r.code(), 0, 0]),
        }
    }

    /// SetSTN for one of audio (1), subpicture (2) or angle (3). Immediates are
    /// 7 bits wide and registers must be general registers.
    pub fn set_stream(slot: u8, source: Operand) -> Self {
        let (head, field) = match source {
            Operand::Imm(v) => (0x50, 0x80 | (v as u8 & 0x7F)),
            Operand::Reg(r) => (0x40, 0x80 | (r.code() & 0x0F)),
        };
        let mut b = [head | SYS_STREAMS, 0, 0, 0, 0, 0, 0, 0];
        b[2 + usize::from(slot.clamp(1, 3))] = field;
        Instruction(b)
    }

    /// SetGPRMMD in counter mode.
    pub fn set_counter(gprm: u8, source: Operand) -> Self {
        let mut b = [0x40 | SYS_GPRM_MODE, 0, 0, 0, 0, 0x80 | (gprm & 0x0F), 0, 0];
        match source {
            Operand::Imm(v) => {
                b[0] |= 0x10;
                [b[2], b[3]] = v.to_be_bytes();
            }
            Operand::Reg(r) => b[3] = r.code(),
        }
        Instruction(b)
    }

    /// SetHL_BTNN: highlighted button, stored as `button << 10`.
    pub fn set_button(source: Operand) -> Self {
        let mut b = [0x40 | SYS_BUTTON, 0, 0, 0, 0, 0, 0, 0];
        match source {
            Operand::Imm(v) => {
                b[0] |= 0x10;
                [b[4], b[5]] = v.to_be_bytes();
            }
            Operand::Reg(r) => b[5] = r.code(),
        }
        Instruction(b)
    }

    pub fn link_sub(op: LinkSub, button: u8) -> Self {
        Instruction([0x20, LINK_SUB, 0, 0, 0, 0, button << 2, op.code()])
    }

    pub fn resume() -> Self {
        Instruction::link_sub(LinkSub::Resume, 0)
    }

    pub fn link_pgcn(pgcn: u16) -> Self {
        let [hi, lo] = (pgcn & 0x7FFF).to_be_bytes();
        Instruction([0x20, LINK_PGCN, 0, 0, 0, 0, hi, lo])
    }

    pub fn link_pttn(chapter: u16, button: u8) -> Self {
        let [hi, lo] = (chapter & 0x3FF).to_be_bytes();
        Instruction([0x20, LINK_PTTN, 0, 0, 0, 0, (button << 2) | hi, lo])
    }

    pub fn link_pgn(program: u8, button: u8) -> Self {
        Instruction([0x20, LINK_PGN, 0, 0, 0, 0, button << 2, program & 0x7F])
    }

    pub fn link_cn(cell: u8, button: u8) -> Self {
        Instruction([0x20, LINK_CN, 0, 0, 0, 0, button << 2, cell])
    }

    pub fn exit() -> Self {
        Instruction([0x30, JUMP_EXIT, 0, 0, 0, 0, 0, 0])
    }

    pub fn jump_tt(title: u8) -> Self {
        Instruction([0x30, JUMP_TT, 0, 0, 0, title & 0x7F, 0, 0])
    }

    pub fn jump_vts_tt(title: u8) -> Self {
        Instruction([0x30, JUMP_VTS_TT, 0, 0, 0, title & 0x7F, 0, 0])
    }

    pub fn jump_vts_ptt(title: u8, chapter: u16) -> Self {
        let [hi, lo] = (chapter & 0x3FF).to_be_bytes();
        Instruction([0x30, JUMP_VTS_PTT, hi, lo, 0, title & 0x7F, 0, 0])
    }

    pub fn jump_ss(space: SystemSpace) -> Self {
        let mut b = [0x30, JUMP_SS, 0, 0, 0, 0, 0, 0];
        space.write(&mut b);
        Instruction(b)
    }

    pub fn call_ss(space: SystemSpace, resume_cell: u8) -> Self {
        let mut b = [0x30, CALL_SS, 0, 0, 0, 0, 0, 0];
        space.write(&mut b);
        b[4] = resume_cell;
        Instruction(b)
    }

    // ── Classification ──────────────────────────────────────────────

    pub fn family(&self) -> Family {
        match self.0[0] >> 5 {
            0 => Family::Special,
            1 if self.0[0] & 0x10 != 0 => Family::Jump,
            1 => Family::Link,
            2 => Family::SetSystem,
            3 => Family::Set,
            4..=6 => Family::Compound,
            _ => Family::Reserved,
        }
    }

    fn special_command(&self) -> Option<u8> {
        (self.family() == Family::Special).then_some(self.0[1] & 0x0F)
    }

    /// Link nibble of byte 1 for groups that can carry a link.
    fn link_op(&self) -> u8 {
        match self.family() {
            Family::Link | Family::SetSystem | Family::Set => self.0[1] & 0x0F,
            _ => 0,
        }
    }

    pub fn is_nop(&self) -> bool {
        self.special_command() == Some(0)
    }

    /// Target line of a goto, conditional or not.
    pub fn goto_line(&self) -> Option<u8> {
        (self.special_command() == Some(SPECIAL_GOTO)).then_some(self.0[7])
    }

    pub fn set_goto_line(&mut self, line: u8) {
        if self.special_command() == Some(SPECIAL_GOTO) {
            self.0[7] = line;
        }
    }

    /// True when the command carries a comparison. Combined forms are always
    /// treated as conditional.
    pub fn is_conditional(&self) -> bool {
        match self.family() {
            Family::Compound | Family::Reserved => true,
            _ => self.0[1] & 0x70 != 0,
        }
    }

    /// True when a link in this command actually leaves the block.
    fn has_link_target(&self) -> bool {
        match self.link_op() {
            LINK_SUB => self.0[7] & 0x1F != 0,
            LINK_PGCN..=LINK_CN => true,
            _ => false,
        }
    }

    /// True when control never reaches the following command.
    pub fn transfers_unconditionally(&self) -> bool {
        if self.is_conditional() {
            return false;
        }
        match self.family() {
            Family::Special => match self.special_command() {
                Some(SPECIAL_GOTO) => self.0[7] != 0,
                Some(SPECIAL_BREAK) => true,
                _ => false,
            },
            Family::Jump => self.0[1] & 0x0F != 0,
            Family::Link | Family::SetSystem | Family::Set => self.has_link_target(),
            Family::Compound | Family::Reserved => false,
        }
    }

    /// SetSTN of any addressing mode.
    pub fn is_stream_set(&self) -> bool {
        self.family() == Family::SetSystem && self.0[0] & 0x0F == SYS_STREAMS
    }

    /// Value of an unconditional immediate SetHL_BTNN without a link.
    pub fn immediate_button(&self) -> Option<u16> {
        let b = &self.0;
        (b[0] == 0x50 | SYS_BUTTON && b[1] == 0 && b[6] == 0 && b[7] == 0)
            .then(|| u16::from_be_bytes([b[4], b[5]]))
    }

    /// Highlight button carried by a link, for the link kinds that have one.
    pub fn link_button(&self) -> Option<u8> {
        match (self.family(), self.0[1] & 0x0F) {
            (Family::Link, LINK_SUB | LINK_PTTN | LINK_PGN | LINK_CN) => Some(self.0[6] >> 2),
            _ => None,
        }
    }

    /// Sets the highlight button of a link that has a free button field.
    pub fn with_link_button(&self, button: u8) -> Option<Instruction> {
        if self.link_button()? != 0 || button == 0 || button > 63 {
            return None;
        }
        let mut b = self.0;
        b[6] = (b[6] & 0x03) | (button << 2);
        Some(Instruction(b))
    }

    /// Folds an unconditional link command into this unconditional set, so the
    /// set runs and then the link is taken.
    pub fn with_link_from(&self, link: &Instruction) -> Option<Instruction> {
        let b = &self.0;
        let l = &link.0;
        if !matches!(self.family(), Family::Set | Family::SetSystem) {
            return None;
        }
        if b[1] != 0 || b[6] != 0 || b[7] != 0 {
            return None;
        }
        if link.family() != Family::Link || l[1] & 0xF0 != 0 || l[2..6] != [0; 4] {
            return None;
        }
        if !matches!(l[1] & 0x0F, LINK_SUB | LINK_PGCN..=LINK_CN) {
            return None;
        }
        let mut merged = *b;
        merged[1] = l[1] & 0x0F;
        merged[6] = l[6];
        merged[7] = l[7];
        Some(Instruction(merged))
    }

    // ── Embedded conditions ─────────────────────────────────────────

    /// The comparison this command is guarded by, if any.
    pub fn condition(&self) -> Option<Condition> {
        let b = &self.0;
        let op = CmpOp::from_code((b[1] >> 4) & 0x07)?;
        let immediate = b[1] & 0x80 != 0;
        let (lhs, rhs) = match self.family() {
            Family::Special | Family::Link => {
                let rhs = if immediate {
                    Operand::Imm(u16::from_be_bytes([b[4], b[5]]))
                } else {
                    Operand::Reg(Reg::from_code(b[5])?)
                };
                (Reg::from_code(b[3])?, rhs)
            }
            Family::Jump | Family::SetSystem => {
                (Reg::from_code(b[6])?, Operand::Reg(Reg::from_code(b[7])?))
            }
            Family::Set => {
                let rhs = if immediate {
                    Operand::Imm(u16::from(b[6] & 0x7F))
                } else {
                    Operand::Reg(Reg::from_code(b[7])?)
                };
                (Reg::from_code(b[2])?, rhs)
            }
            Family::Compound | Family::Reserved => return None,
        };
        Some(Condition { op, lhs, rhs })
    }

    /// Whether `cond` fits this command's comparison fields without
    /// overwriting anything the command already uses.
    pub fn accepts_condition(&self, cond: &Condition) -> bool {
        if self.is_conditional() || self.0[1] & 0x80 != 0 {
            return false;
        }
        let b = &self.0;
        match self.family() {
            Family::Special | Family::Link => b[3..6] == [0; 3],
            Family::Jump => {
                matches!(cond.rhs, Operand::Reg(_)) && b[6] == 0 && b[7] == 0
            }
            Family::SetSystem => {
                matches!(cond.rhs, Operand::Reg(_))
                    && self.link_op() == 0
                    && b[6] == 0
                    && b[7] == 0
            }
            Family::Set => {
                let rhs_fits = match cond.rhs {
                    Operand::Imm(v) => v < 0x80,
                    Operand::Reg(_) => true,
                };
                rhs_fits && self.link_op() == 0 && b[2] == 0 && b[6] == 0 && b[7] == 0
            }
            Family::Compound | Family::Reserved => false,
        }
    }

    /// This command guarded by `cond`, or `None` when the group cannot carry it.
    pub fn with_condition(&self, cond: Condition) -> Option<Instruction> {
        if !self.accepts_condition(&cond) {
            return None;
        }
        let mut ins = *self;
        match self.family() {
            Family::Special | Family::Link => ins.write_compare_v1(cond),
            Family::Jump | Family::SetSystem => {
                let Operand::Reg(rhs) = cond.rhs else { return None };
                ins.0[1] |= cond.op.code() << 4;
                ins.0[6] = cond.lhs.code();
                ins.0[7] = rhs.code();
            }
            Family::Set => {
                ins.0[1] |= cond.op.code() << 4;
                ins.0[2] = cond.lhs.code();
                match cond.rhs {
                    Operand::Imm(v) => {
                        ins.0[1] |= 0x80;
                        ins.0[6] = v as u8 & 0x7F;
                    }
                    Operand::Reg(r) => ins.0[7] = r.code(),
                }
            }
            Family::Compound | Family::Reserved => return None,
        }
        Some(ins)
    }

    fn write_compare_v1(&mut self, cond: Condition) {
        let b = &mut self.0;
        b[1] = (b[1] & 0x0F) | (cond.op.code() << 4);
        b[3] = cond.lhs.code();
        match cond.rhs {
            Operand::Imm(v) => {
                b[1] |= 0x80;
                [b[4], b[5]] = v.to_be_bytes();
            }
            Operand::Reg(r) => b[5] = r.code(),
        }
    }
}

/// Flattens commands into the byte layout stored in a command table.
pub fn to_bytes(code: &[Instruction]) -> Vec<u8> {
    code.iter().flat_map(|ins| ins.0).collect()
}

/// Splits a byte buffer into commands. Trailing bytes that do not fill a
/// whole command are ignored.
pub fn from_bytes(bytes: &[u8]) -> Vec<Instruction> {
    bytes
        .chunks_exact(8)
        .map(|c| Instruction([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect()
}
