//! `jump` and `call`: choosing the command for a transfer, and rejecting
//! transfers the player does not allow from the current domain.
//!
//! | from \ to          | FPC      | VMGM menu     | own TS menu     | other TS menu      | title (+chapter)            | chapter/program/cell |
//! |--------------------|----------|---------------|-----------------|--------------------|-----------------------------|----------------------|
//! | VMGM (jump)        | JumpSS   | LinkPGCN      | -               | JumpSS VTSM entry  | JumpTT (chapter: pad)       | program/cell: link   |
//! | VTSM (jump)        | JumpSS   | JumpSS        | LinkPGCN        | pad                | own TS: JumpVTS_TT/PTT, else JumpTT (chapter: pad) | program/cell: link |
//! | VTS (call)         | CallSS   | CallSS        | CallSS entry, pgc: pad | pad         | -                           | -                    |
//! | VTS (jump)         | -        | -             | -               | -                  | as VTSM                     | LinkPTTN/PGN/CN      |
//!
//! "pad" routes through the jumppad: the destination is stored in g15
//! (and the chapter in g14), then control passes to VMGM menu PGC 1, which
//! holds the dispatcher. Without `--jumppad` those cells are errors.

use super::{BlockCompiler, ErrorKind, Result};
use crate::ast::{JumpTarget, MenuEntry, MenuRef, TitlesetRef};
use crate::instruction::{Instruction, Operand, SetOp, SystemSpace};
use crate::workset::{Domain, MenuGroup};

/// VMGM menu PGC holding the jumppad dispatcher.
pub const JUMPPAD_PGC: u16 = 1;
/// Register carrying the jumppad destination code.
pub const JUMPPAD_CODE_REG: u8 = 15;
/// Register carrying the jumppad chapter.
pub const JUMPPAD_CHAPTER_REG: u8 = 14;

const JUMPPAD_MENU: u16 = 0x8000;
const JUMPPAD_TITLE: u16 = 0x4000;

const MAX_PGCN: u16 = 0x7FFF;
const MAX_CHAPTER: u16 = 0x3FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    Jump,
    /// Call with the cell to resume at on return.
    Call(u8),
}

/// Domain a target names, after resolving `Current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Vmgm,
    Titleset(u8),
}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Space::Vmgm => f.write_str("VMGM"),
            Space::Titleset(n) => write!(f, "titleset {n}"),
        }
    }
}

/// A menu PGC, with the entry it was named by.
#[derive(Debug, Clone, Copy)]
struct Menu {
    pgc: u16,
    entry: Option<MenuEntry>,
}

fn illegal(message: &'static str) -> ErrorKind {
    ErrorKind::IllegalTransfer(message)
}

impl BlockCompiler<'_> {
    pub(super) fn compile_transfer(&mut self, target: &JumpTarget, mode: Mode) -> Result<()> {
        let domain = self.location.domain;
        if let Mode::Call(_) = mode {
            if domain.is_menu() {
                return Err(self.err(illegal("cannot call from a menu, use 'jump' instead")));
            }
        }
        match *target {
            JumpTarget::FirstPlay { titleset } => self.first_play(titleset, mode),
            JumpTarget::Menu { titleset, menu } => self.menu(titleset, menu, mode),
            JumpTarget::Title { titleset, title, chapter } => self.title(titleset, title, chapter, mode),
            JumpTarget::Chapter(chapter) => self.chapter(chapter, mode),
            JumpTarget::Program(program) => {
                self.local_transfer(mode)?;
                self.check_pgc_part("program", u16::from(program), |shape| shape.programs)?;
                if program > 0x7F {
                    return Err(self.err(ErrorKind::ValueOutOfRange {
                        what: "program",
                        value: u32::from(program),
                        max: 0x7F,
                    }));
                }
                self.emit(Instruction::link_pgn(program, 0));
                Ok(())
            }
            JumpTarget::Cell(cell) => {
                self.local_transfer(mode)?;
                self.check_pgc_part("cell", u16::from(cell), |shape| shape.cells)?;
                self.emit(Instruction::link_cn(cell, 0));
                Ok(())
            }
        }
    }

    fn local_transfer(&self, mode: Mode) -> Result<()> {
        match mode {
            Mode::Jump => Ok(()),
            Mode::Call(_) => Err(self.err(illegal("cannot call a title/chapter/program/cell, use 'jump' instead"))),
        }
    }

    fn check_pgc_part(&self, what: &'static str, number: u16, count: impl Fn(&crate::workset::PgcShape) -> u16) -> Result<()> {
        let Some(shape) = &self.location.pgc else {
            return Ok(());
        };
        let count = count(shape);
        if number == 0 || number > count {
            return Err(self.err(ErrorKind::NoSuchPgcPart { what, number, count }));
        }
        Ok(())
    }

    fn space(&self, titleset: TitlesetRef) -> Result<Space> {
        let space = match titleset {
            TitlesetRef::Current => match self.location.domain.titleset() {
                Some(ts) => Space::Titleset(ts),
                None => Space::Vmgm,
            },
            TitlesetRef::Vmgm => Space::Vmgm,
            TitlesetRef::Titleset(n) => Space::Titleset(n),
        };
        if let Space::Titleset(n) = space {
            if self.workset.titleset(n).is_none() {
                return Err(self.err(ErrorKind::NoSuchTitleset(n)));
            }
        }
        Ok(space)
    }

    fn first_play(&mut self, titleset: TitlesetRef, mode: Mode) -> Result<()> {
        if titleset != TitlesetRef::Vmgm {
            return Err(self.err(illegal("VMGM must be specified with FPC")));
        }
        match mode {
            Mode::Jump if self.location.domain.is_menu() => {
                self.emit(Instruction::jump_ss(SystemSpace::FirstPlay));
            }
            Mode::Jump => return Err(self.err(illegal("cannot jump to FPC from a title, use 'call' instead"))),
            Mode::Call(resume) => {
                self.emit(Instruction::call_ss(SystemSpace::FirstPlay, resume));
            }
        }
        Ok(())
    }

    // ---- Menus ----

    fn menus(&self, space: Space) -> Result<&MenuGroup> {
        let titleset = match space {
            Space::Vmgm => None,
            Space::Titleset(n) => Some(n),
        };
        self.workset.menus(titleset).ok_or_else(|| self.err(ErrorKind::NoSuchTitleset(titleset.unwrap_or(0))))
    }

    fn resolve_menu(&self, space: Space, menu: MenuRef) -> Result<Menu> {
        let group = self.menus(space)?;
        let entry = match menu {
            MenuRef::Pgc(pgc) => {
                if pgc > MAX_PGCN {
                    return Err(self.err(ErrorKind::ValueOutOfRange {
                        what: "menu",
                        value: u32::from(pgc),
                        max: u32::from(MAX_PGCN),
                    }));
                }
                if !group.has_pgc(pgc) {
                    return Err(self.err(ErrorKind::NoSuchMenu { domain: space.to_string(), pgc }));
                }
                return Ok(Menu { pgc, entry: None });
            }
            MenuRef::Entry(entry) => entry,
            MenuRef::Default if space == Space::Vmgm => MenuEntry::Title,
            MenuRef::Default => MenuEntry::Root,
        };
        let valid = match space {
            Space::Vmgm => entry == MenuEntry::Title,
            Space::Titleset(_) => entry != MenuEntry::Title,
        };
        match group.entry_pgc(entry) {
            Some(pgc) if valid => Ok(Menu { pgc, entry: Some(entry) }),
            _ => Err(self.err(ErrorKind::NoSuchEntry { domain: space.to_string(), entry })),
        }
    }

    fn menu(&mut self, titleset: TitlesetRef, menu: MenuRef, mode: Mode) -> Result<()> {
        let space = self.space(titleset)?;
        let target = self.resolve_menu(space, menu)?;
        let here = self.location.domain;
        match (mode, here, space) {
            (Mode::Jump, Domain::Vts { .. }, _) => {
                Err(self.err(illegal("Cannot jump to a menu from a title, use 'call' instead")))
            }
            (Mode::Jump, Domain::Vmgm, Space::Vmgm) => {
                self.emit(Instruction::link_pgcn(target.pgc));
                Ok(())
            }
            (Mode::Jump, Domain::Vmgm, Space::Titleset(vts)) => match target.entry {
                Some(entry) => {
                    self.emit(Instruction::jump_ss(SystemSpace::Vtsm { vts, title: 1, menu: entry.id() }));
                    Ok(())
                }
                None => self.jumppad_menu(vts, target.pgc, mode, "cannot jump to a titleset menu by number from the VMGM"),
            },
            (Mode::Jump, Domain::Vtsm(_), Space::Vmgm) => {
                let space = match target.entry {
                    Some(entry) => SystemSpace::VmgmMenu(entry.id()),
                    None => SystemSpace::VmgmPgc(target.pgc),
                };
                self.emit(Instruction::jump_ss(space));
                Ok(())
            }
            (Mode::Jump, Domain::Vtsm(ours), Space::Titleset(theirs)) if ours == theirs => {
                self.emit(Instruction::link_pgcn(target.pgc));
                Ok(())
            }
            (Mode::Jump, Domain::Vtsm(_), Space::Titleset(vts)) => {
                self.jumppad_menu(vts, target.pgc, mode, "cannot jump to another titleset's menu")
            }
            (Mode::Call(_), Domain::Vmgm | Domain::Vtsm(_), _) => {
                Err(self.err(illegal("cannot call from a menu, use 'jump' instead")))
            }
            (Mode::Call(resume), Domain::Vts { .. }, Space::Vmgm) => {
                let space = match target.entry {
                    Some(entry) => SystemSpace::VmgmMenu(entry.id()),
                    None => SystemSpace::VmgmPgc(target.pgc),
                };
                self.emit(Instruction::call_ss(space, resume));
                Ok(())
            }
            (Mode::Call(resume), Domain::Vts { titleset: ours, .. }, Space::Titleset(theirs)) if ours == theirs => {
                match target.entry {
                    Some(entry) => {
                        let space = SystemSpace::Vtsm { vts: 0, title: 0, menu: entry.id() };
                        self.emit(Instruction::call_ss(space, resume));
                        Ok(())
                    }
                    None => self.jumppad_menu(ours, target.pgc, mode, "cannot call a titleset menu by number"),
                }
            }
            (Mode::Call(_), Domain::Vts { .. }, Space::Titleset(vts)) => {
                self.jumppad_menu(vts, target.pgc, mode, "cannot call another titleset's menu")
            }
        }
    }

    // ---- Titles and chapters ----

    fn title(&mut self, titleset: TitlesetRef, title: u8, chapter: Option<u16>, mode: Mode) -> Result<()> {
        self.local_transfer(mode)?;
        let space = self.space(titleset)?;
        let (ts, local, global) = match space {
            Space::Vmgm => {
                let (ts, local) = self.workset.locate_title(title).ok_or_else(|| self.err(ErrorKind::NoSuchTitle(title)))?;
                (ts, local, title)
            }
            Space::Titleset(ts) => {
                let global = self.workset.global_title(ts, title).ok_or_else(|| self.err(ErrorKind::NoSuchTitle(title)))?;
                (ts, title, global)
            }
        };
        if let Some(chapter) = chapter {
            self.check_chapter(ts, local, chapter)?;
        }
        let own_titleset = self.location.domain.titleset() == Some(ts) && titleset != TitlesetRef::Vmgm;
        match chapter {
            Some(chapter) if own_titleset => {
                self.emit(Instruction::jump_vts_ptt(local, chapter));
                Ok(())
            }
            None if own_titleset => {
                self.emit(Instruction::jump_vts_tt(local));
                Ok(())
            }
            None => {
                self.emit(Instruction::jump_tt(global));
                Ok(())
            }
            Some(chapter) => {
                let code = JUMPPAD_TITLE | u16::from(global);
                self.jumppad(code, Some(chapter), mode, "cannot jump to a chapter of a title in another domain")
            }
        }
    }

    fn check_chapter(&self, titleset: u8, title: u8, chapter: u16) -> Result<()> {
        if chapter > MAX_CHAPTER {
            return Err(self.err(ErrorKind::ValueOutOfRange {
                what: "chapter",
                value: u32::from(chapter),
                max: u32::from(MAX_CHAPTER),
            }));
        }
        let chapters = self.workset.chapters(titleset, title).unwrap_or(0);
        if chapter == 0 || chapter > chapters {
            return Err(self.err(ErrorKind::NoSuchChapter { title, chapter, chapters }));
        }
        Ok(())
    }

    fn chapter(&mut self, chapter: u16, mode: Mode) -> Result<()> {
        self.local_transfer(mode)?;
        let Domain::Vts { titleset, title } = self.location.domain else {
            return Err(self.err(illegal("cannot jump to a chapter within a menu")));
        };
        if self.workset.titleset(titleset).is_some() {
            self.check_chapter(titleset, title, chapter)?;
        }
        self.emit(Instruction::link_pttn(chapter, 0));
        Ok(())
    }

    // ---- Jumppad ----

    fn jumppad_menu(&mut self, titleset: u8, pgc: u16, mode: Mode, without: &'static str) -> Result<()> {
        if pgc > 0xFF {
            return Err(self.err(ErrorKind::ValueOutOfRange { what: "jumppad menu", value: u32::from(pgc), max: 0xFF }));
        }
        let code = JUMPPAD_MENU | (u16::from(titleset & 0x7F) << 8) | pgc;
        self.jumppad(code, None, mode, without)
    }

    /// Stores the destination for the dispatcher and transfers to it.
    fn jumppad(&mut self, code: u16, chapter: Option<u16>, mode: Mode, without: &'static str) -> Result<()> {
        if !self.options.jumppad {
            return Err(self.err(illegal(without)));
        }
        self.emit(Instruction::set(SetOp::Mov, JUMPPAD_CODE_REG, Operand::Imm(code)));
        if let Some(chapter) = chapter {
            self.emit(Instruction::set(SetOp::Mov, JUMPPAD_CHAPTER_REG, Operand::Imm(chapter)));
        }
        let transfer = match self.location.domain {
            Domain::Vmgm => Instruction::link_pgcn(JUMPPAD_PGC),
            Domain::Vtsm(_) => Instruction::jump_ss(SystemSpace::VmgmPgc(JUMPPAD_PGC)),
            Domain::Vts { .. } => {
                let resume = match mode {
                    Mode::Call(cell) => cell,
                    Mode::Jump => 0,
                };
                Instruction::call_ss(SystemSpace::VmgmPgc(JUMPPAD_PGC), resume)
            }
        };
        log::debug!("jumppad transfer, code {code:#06x}");
        self.emit(transfer);
        Ok(())
    }
}
