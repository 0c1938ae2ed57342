use super::{Condition, Family, Instruction, Operand, Reg, SetOp};

/// Sub-operations of the `LinkSIns` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkSub {
    /// No link, only the highlight button is applied.
    None,
    TopCell,
    NextCell,
    PrevCell,
    TopPg,
    NextPg,
    PrevPg,
    TopPgc,
    NextPgc,
    PrevPgc,
    GoUpPgc,
    TailPgc,
    Resume,
}

impl LinkSub {
    pub fn code(self) -> u8 {
        match self {
            LinkSub::None => 0x00,
            LinkSub::TopCell => 0x01,
            LinkSub::NextCell => 0x02,
            LinkSub::PrevCell => 0x03,
            LinkSub::TopPg => 0x05,
            LinkSub::NextPg => 0x06,
            LinkSub::PrevPg => 0x07,
            LinkSub::TopPgc => 0x09,
            LinkSub::NextPgc => 0x0A,
            LinkSub::PrevPgc => 0x0B,
            LinkSub::GoUpPgc => 0x0C,
            LinkSub::TailPgc => 0x0D,
            LinkSub::Resume => 0x10,
        }
    }

    pub fn from_code(code: u8) -> Option<LinkSub> {
        Some(match code {
            0x00 => LinkSub::None,
            0x01 => LinkSub::TopCell,
            0x02 => LinkSub::NextCell,
            0x03 => LinkSub::PrevCell,
            0x05 => LinkSub::TopPg,
            0x06 => LinkSub::NextPg,
            0x07 => LinkSub::PrevPg,
            0x09 => LinkSub::TopPgc,
            0x0A => LinkSub::NextPgc,
            0x0B => LinkSub::PrevPgc,
            0x0C => LinkSub::GoUpPgc,
            0x0D => LinkSub::TailPgc,
            0x10 => LinkSub::Resume,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            LinkSub::None => "LinkNoLink",
            LinkSub::TopCell => "LinkTopCell",
            LinkSub::NextCell => "LinkNextCell",
            LinkSub::PrevCell => "LinkPrevCell",
            LinkSub::TopPg => "LinkTopPG",
            LinkSub::NextPg => "LinkNextPG",
            LinkSub::PrevPg => "LinkPrevPG",
            LinkSub::TopPgc => "LinkTopPGC",
            LinkSub::NextPgc => "LinkNextPGC",
            LinkSub::PrevPgc => "LinkPrevPGC",
            LinkSub::GoUpPgc => "LinkGoUpPGC",
            LinkSub::TailPgc => "LinkTailPGC",
            LinkSub::Resume => "RSM",
        }
    }
}

/// Destination of a `JumpSS` or `CallSS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemSpace {
    FirstPlay,
    /// A VMGM menu by entry id.
    VmgmMenu(u8),
    /// A titleset menu by entry id. `vts` and `title` are only encoded by
    /// `JumpSS`; `CallSS` always targets the current titleset.
    Vtsm { vts: u8, title: u8, menu: u8 },
    VmgmPgc(u16),
}

impl SystemSpace {
    pub(super) fn write(self, b: &mut [u8; 8]) {
        match self {
            SystemSpace::FirstPlay => b[5] = 0x00,
            SystemSpace::VmgmMenu(menu) => b[5] = 0x10 | (menu & 0x0F),
            SystemSpace::Vtsm { vts, title, menu } => {
                b[3] = title;
                b[4] = vts;
                b[5] = 0x20 | (menu & 0x0F);
            }
            SystemSpace::VmgmPgc(pgcn) => {
                [b[2], b[3]] = (pgcn & 0x7FFF).to_be_bytes();
                b[5] = 0x30;
            }
        }
    }

    fn read(b: &[u8; 8], call: bool) -> SystemSpace {
        let menu = b[5] & 0x0F;
        match b[5] & 0x30 {
            0x00 => SystemSpace::FirstPlay,
            0x10 => SystemSpace::VmgmMenu(menu),
            0x20 if call => SystemSpace::Vtsm { vts: 0, title: 0, menu },
            0x20 => SystemSpace::Vtsm { vts: b[4], title: b[3], menu },
            _ => SystemSpace::VmgmPgc(u16::from_be_bytes([b[2] & 0x7F, b[3]])),
        }
    }
}

/// Transfers out of the current domain (command group 1 with the jump bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Jump {
    Exit,
    Title(u8),
    VtsTitle(u8),
    VtsChapter { title: u8, chapter: u16 },
    Ss(SystemSpace),
    CallSs { space: SystemSpace, resume_cell: u8 },
}

/// Transfers inside the current domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Link {
    Sub { op: LinkSub, button: u8 },
    Pgcn(u16),
    Pttn { chapter: u16, button: u8 },
    Pgn { program: u8, button: u8 },
    Cn { cell: u8, button: u8 },
}

impl Link {
    /// Highlight button applied when the link is taken, 0 for none.
    pub fn button(&self) -> u8 {
        match *self {
            Link::Sub { button, .. }
            | Link::Pttn { button, .. }
            | Link::Pgn { button, .. }
            | Link::Cn { button, .. } => button,
            Link::Pgcn(_) => 0,
        }
    }

    /// False for the no-link sub-operation, which only sets the button.
    pub fn leaves_block(&self) -> bool {
        !matches!(self, Link::Sub { op: LinkSub::None, .. })
    }

    fn read(op: u8, b: &[u8; 8]) -> Option<Link> {
        let button = b[6] >> 2;
        Some(match op {
            1 => Link::Sub { op: LinkSub::from_code(b[7] & 0x1F)?, button },
            4 => Link::Pgcn(u16::from_be_bytes([b[6] & 0x7F, b[7]])),
            5 => Link::Pttn { chapter: u16::from_be_bytes([b[6] & 0x03, b[7]]), button },
            6 => Link::Pgn { program: b[7] & 0x7F, button },
            7 => Link::Cn { cell: b[7], button },
            _ => return None,
        })
    }
}

/// Operation of a command apart from its condition and link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Nop,
    Goto(u8),
    Break,
    SetTmpPml { level: u8, line: u8 },
    Jump(Jump),
    Set { op: SetOp, target: u8, source: Operand },
    SetStreams { audio: Option<Operand>, subtitle: Option<Operand>, angle: Option<Operand> },
    SetNavTimer { value: Operand, pgcn: u16 },
    SetGprmMode { gprm: u8, counter: bool, source: Operand },
    SetButton(Operand),
    /// Combined forms and malformed commands.
    Unknown,
}

/// A command split into the parts the player evaluates in order: the
/// condition, the operation, then the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoded {
    pub condition: Option<Condition>,
    pub command: Command,
    pub link: Option<Link>,
}

impl Instruction {
    pub fn decode(&self) -> Decoded {
        let b = &self.0;
        let condition = self.condition();
        let imm = b[0] & 0x10 != 0;
        let mut link = None;
        let command = match self.family() {
            Family::Special => match b[1] & 0x0F {
                0 => Command::Nop,
                1 => Command::Goto(b[7]),
                2 => Command::Break,
                3 => Command::SetTmpPml { level: b[6] & 0x0F, line: b[7] },
                _ => Command::Unknown,
            },
            Family::Link => match Link::read(b[1] & 0x0F, b) {
                Some(l) => {
                    link = Some(l);
                    Command::Nop
                }
                None => Command::Unknown,
            },
            Family::Jump => decode_jump(b),
            Family::SetSystem => {
                link = self.embedded_link();
                decode_system(b, imm)
            }
            Family::Set => {
                link = self.embedded_link();
                match SetOp::from_code(b[0] & 0x0F) {
                    Some(op) => {
                        let source = if imm {
                            Operand::Imm(u16::from_be_bytes([b[4], b[5]]))
                        } else {
                            match Reg::from_code(b[5]) {
                                Some(r) => Operand::Reg(r),
                                None => return unknown(condition),
                            }
                        };
                        Command::Set { op, target: b[3] & 0x0F, source }
                    }
                    None if b[0] & 0x0F == 0 => Command::Nop,
                    None => Command::Unknown,
                }
            }
            Family::Compound | Family::Reserved => Command::Unknown,
        };
        Decoded { condition, command, link }
    }

    fn embedded_link(&self) -> Option<Link> {
        if self.is_conditional() {
            return None;
        }
        Link::read(self.0[1] & 0x0F, &self.0)
    }
}

fn unknown(condition: Option<Condition>) -> Decoded {
    Decoded { condition, command: Command::Unknown, link: None }
}

fn decode_jump(b: &[u8; 8]) -> Command {
    let jump = match b[1] & 0x0F {
        1 => Jump::Exit,
        2 => Jump::Title(b[5] & 0x7F),
        3 => Jump::VtsTitle(b[5] & 0x7F),
        5 => Jump::VtsChapter {
            title: b[5] & 0x7F,
            chapter: u16::from_be_bytes([b[2] & 0x03, b[3]]),
        },
        6 => Jump::Ss(SystemSpace::read(b, false)),
        8 => Jump::CallSs { space: SystemSpace::read(b, true), resume_cell: b[4] },
        _ => return Command::Unknown,
    };
    Command::Jump(jump)
}

fn stream_field(byte: u8, imm: bool) -> Option<Operand> {
    if byte & 0x80 == 0 {
        None
    } else if imm {
        Some(Operand::Imm(u16::from(byte & 0x7F)))
    } else {
        Some(Operand::Reg(Reg::Gprm(byte & 0x0F)))
    }
}

fn decode_system(b: &[u8; 8], imm: bool) -> Command {
    let wide = |hi: usize, lo: usize| -> Option<Operand> {
        if imm {
            Some(Operand::Imm(u16::from_be_bytes([b[hi], b[lo]])))
        } else {
            Reg::from_code(b[lo]).map(Operand::Reg)
        }
    };
    let decoded = match b[0] & 0x0F {
        1 => Some(Command::SetStreams {
            audio: stream_field(b[3], imm),
            subtitle: stream_field(b[4], imm),
            angle: stream_field(b[5], imm),
        }),
        2 => wide(4, 5).map(|value| Command::SetNavTimer {
            value,
            pgcn: u16::from_be_bytes([b[2] & 0x7F, b[3]]),
        }),
        3 => wide(2, 3).map(|source| Command::SetGprmMode {
            gprm: b[5] & 0x0F,
            counter: b[5] & 0x80 != 0,
            source,
        }),
        6 => wide(4, 5).map(Command::SetButton),
        _ => None,
    };
    decoded.unwrap_or(Command::Unknown)
}
