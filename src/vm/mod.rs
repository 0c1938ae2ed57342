//! Navigation command simulator.
//!
//! Runs one command block against a register file the way a player does:
//! from line 1 until the block ends, a `break`, or a transfer out of the
//! block. Only register state is modelled; a transfer is reported rather
//! than followed.

use crate::instruction::{
    Command, Condition, GPRM_COUNT, Instruction, Jump, Link, Operand, Reg, SPRM_COUNT, SetOp,
};

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("goto line {line} at line {at} is outside the block of {len} commands")]
    BadLine { at: usize, line: u8, len: usize },
    #[error("gave up after {0} commands, the block does not terminate")]
    StepLimit(usize),
    #[error("cannot simulate command at line {at}: {bytes}")]
    Unsupported { at: usize, bytes: String },
}

type VmResult<T> = Result<T, VmError>;

/// Control leaving the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Jump(Jump),
    Link(Link),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fell off the last command.
    End,
    Break,
    Transfer(Transfer),
}

const DEFAULT_STEP_LIMIT: usize = 100_000;

const SPRM_AUDIO: usize = 1;
const SPRM_SUBTITLE: usize = 2;
const SPRM_ANGLE: usize = 3;
const SPRM_BUTTON: usize = 8;
const SPRM_NAV_TIMER: usize = 9;
const SPRM_TIMER_PGCN: usize = 10;

pub struct Machine {
    pub gprm: [u16; GPRM_COUNT as usize],
    pub sprm: [u16; SPRM_COUNT as usize],
    /// General registers switched to counter mode.
    pub counters: [bool; GPRM_COUNT as usize],
    pub step_limit: usize,
    rng: fastrand::Rng,
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Machine::with_rng(fastrand::Rng::new())
    }

    /// A machine whose `random` results are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Machine::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Machine {
            gprm: [0; GPRM_COUNT as usize],
            sprm: [0; SPRM_COUNT as usize],
            counters: [false; GPRM_COUNT as usize],
            step_limit: DEFAULT_STEP_LIMIT,
            rng,
        }
    }

    pub fn read(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Gprm(n) => self.gprm[usize::from(n & 0x0F)],
            Reg::Sprm(n) => self.sprm.get(usize::from(n)).copied().unwrap_or(0),
        }
    }

    fn value(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Imm(v) => v,
            Operand::Reg(r) => self.read(r),
        }
    }

    fn holds(&self, cond: &Condition) -> bool {
        cond.op.eval(self.read(cond.lhs), self.value(cond.rhs))
    }

    /// Executes `code` from its first command.
    pub fn run(&mut self, code: &[Instruction]) -> VmResult<Outcome> {
        let mut pc = 0usize;
        let mut steps = 0usize;
        while let Some(ins) = code.get(pc) {
            steps += 1;
            if steps > self.step_limit {
                return Err(VmError::StepLimit(self.step_limit));
            }
            let at = pc + 1;
            pc += 1;
            let decoded = ins.decode();
            if let Some(cond) = &decoded.condition {
                if !self.holds(cond) {
                    continue;
                }
            }
            match decoded.command {
                Command::Nop => {}
                Command::Goto(line) => {
                    if line == 0 || usize::from(line) > code.len() {
                        return Err(VmError::BadLine { at, line, len: code.len() });
                    }
                    pc = usize::from(line) - 1;
                }
                Command::Break => return Ok(Outcome::Break),
                Command::Jump(jump) => return Ok(Outcome::Transfer(Transfer::Jump(jump))),
                Command::Set { op, target, source } => self.set(op, target, source),
                Command::SetStreams { audio, subtitle, angle } => {
                    for (slot, value) in [(SPRM_AUDIO, audio), (SPRM_SUBTITLE, subtitle), (SPRM_ANGLE, angle)] {
                        if let Some(v) = value {
                            self.sprm[slot] = self.value(v);
                        }
                    }
                }
                Command::SetNavTimer { value, pgcn } => {
                    self.sprm[SPRM_NAV_TIMER] = self.value(value);
                    self.sprm[SPRM_TIMER_PGCN] = pgcn;
                }
                Command::SetGprmMode { gprm, counter, source } => {
                    let i = usize::from(gprm & 0x0F);
                    self.gprm[i] = self.value(source);
                    self.counters[i] = counter;
                }
                Command::SetButton(value) => self.sprm[SPRM_BUTTON] = self.value(value),
                Command::SetTmpPml { .. } | Command::Unknown => {
                    return Err(VmError::Unsupported { at, bytes: hex(ins) });
                }
            }
            if let Some(link) = decoded.link {
                if link.button() != 0 {
                    self.sprm[SPRM_BUTTON] = u16::from(link.button()) << 10;
                }
                if link.leaves_block() {
                    return Ok(Outcome::Transfer(Transfer::Link(link)));
                }
            }
        }
        Ok(Outcome::End)
    }

    fn set(&mut self, op: SetOp, target: u8, source: Operand) {
        let t = usize::from(target & 0x0F);
        let a = self.gprm[t];
        let b = self.value(source);
        self.gprm[t] = match op {
            SetOp::Mov => b,
            SetOp::Swap => {
                if let Operand::Reg(Reg::Gprm(other)) = source {
                    self.gprm[usize::from(other & 0x0F)] = a;
                }
                b
            }
            SetOp::Add => a.saturating_add(b),
            SetOp::Sub => a.saturating_sub(b),
            SetOp::Mul => a.saturating_mul(b),
            SetOp::Div => a.checked_div(b).unwrap_or(0xFFFF),
            SetOp::Mod => a.checked_rem(b).unwrap_or(0xFFFF),
            SetOp::Rnd if b == 0 => 0,
            SetOp::Rnd => self.rng.u16(1..=b),
            SetOp::And => a & b,
            SetOp::Or => a | b,
            SetOp::Xor => a ^ b,
        };
    }
}

fn hex(ins: &Instruction) -> String {
    ins.bytes().iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}
