use std::fmt::{self, Write as _};

use super::{Command, Instruction, Jump, Link, LinkSub, Operand, SetOp, SystemSpace};

/// Numbered listing, one command per line: line number, raw bytes, then the
/// decoded form.
pub fn disassemble(code: &[Instruction]) -> String {
    let mut out = String::new();
    for (i, ins) in code.iter().enumerate() {
        let _ = write!(out, "{:>3}: ", i + 1);
        for byte in ins.bytes() {
            let _ = write!(out, "{byte:02x} ");
        }
        let _ = writeln!(out, " {ins}");
    }
    out
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.decode();
        if let Some(cond) = d.condition {
            write!(f, "if ({cond}) ")?;
        }
        match d.command {
            Command::Nop if d.link.is_some() => {}
            other => fmt_command(f, &other)?,
        }
        if let Some(link) = d.link {
            if d.command != Command::Nop {
                f.write_str("; ")?;
            }
            fmt_link(f, &link)?;
        }
        Ok(())
    }
}

fn fmt_command(f: &mut fmt::Formatter<'_>, command: &Command) -> fmt::Result {
    match command {
        Command::Nop => f.write_str("nop"),
        Command::Goto(line) => write!(f, "goto {line}"),
        Command::Break => f.write_str("break"),
        Command::SetTmpPml { level, line } => write!(f, "SetTmpPML {level}, goto {line}"),
        Command::Jump(jump) => fmt_jump(f, jump),
        Command::Set { op: SetOp::Rnd, target, source } => write!(f, "g{target} = random({source})"),
        Command::Set { op, target, source } => write!(f, "g{target} {} {source}", op.symbol()),
        Command::SetStreams { audio, subtitle, angle } => {
            let mut sep = "";
            for (name, value) in [("audio", audio), ("subtitle", subtitle), ("angle", angle)] {
                if let Some(v) = value {
                    write!(f, "{sep}{name} = {v}")?;
                    sep = ", ";
                }
            }
            if sep.is_empty() {
                f.write_str("SetSTN")?;
            }
            Ok(())
        }
        Command::SetNavTimer { value, pgcn } => write!(f, "SetNVTMR {value}, pgc {pgcn}"),
        Command::SetGprmMode { gprm, counter: true, source } => write!(f, "counter g{gprm} = {source}"),
        Command::SetGprmMode { gprm, counter: false, source } => write!(f, "register g{gprm} = {source}"),
        Command::SetButton(Operand::Imm(v)) if v & 0x3FF == 0 => {
            write!(f, "button = {v} (button {})", v >> 10)
        }
        Command::SetButton(source) => write!(f, "button = {source}"),
        Command::Unknown => f.write_str("unknown"),
    }
}

fn fmt_space(f: &mut fmt::Formatter<'_>, space: &SystemSpace) -> fmt::Result {
    match space {
        SystemSpace::FirstPlay => f.write_str("FP"),
        SystemSpace::VmgmMenu(menu) => write!(f, "VMGM menu {menu}"),
        SystemSpace::Vtsm { vts: 0, menu, .. } => write!(f, "VTSM menu {menu}"),
        SystemSpace::Vtsm { vts, title, menu } => write!(f, "VTSM {vts}:{title} menu {menu}"),
        SystemSpace::VmgmPgc(pgcn) => write!(f, "VMGM pgc {pgcn}"),
    }
}

fn fmt_jump(f: &mut fmt::Formatter<'_>, jump: &Jump) -> fmt::Result {
    match jump {
        Jump::Exit => f.write_str("exit"),
        Jump::Title(t) => write!(f, "JumpTT {t}"),
        Jump::VtsTitle(t) => write!(f, "JumpVTS_TT {t}"),
        Jump::VtsChapter { title, chapter } => write!(f, "JumpVTS_PTT {title}:{chapter}"),
        Jump::Ss(space) => {
            f.write_str("JumpSS ")?;
            fmt_space(f, space)
        }
        Jump::CallSs { space, resume_cell } => {
            f.write_str("CallSS ")?;
            fmt_space(f, space)?;
            write!(f, ", resume cell {resume_cell}")
        }
    }
}

fn fmt_link(f: &mut fmt::Formatter<'_>, link: &Link) -> fmt::Result {
    match link {
        Link::Sub { op: LinkSub::Resume, .. } => f.write_str("resume")?,
        Link::Sub { op, .. } => f.write_str(op.name())?,
        Link::Pgcn(pgcn) => write!(f, "LinkPGCN {pgcn}")?,
        Link::Pttn { chapter, .. } => write!(f, "LinkPTTN {chapter}")?,
        Link::Pgn { program, .. } => write!(f, "LinkPGN {program}")?,
        Link::Cn { cell, .. } => write!(f, "LinkCN {cell}")?,
    }
    match link.button() {
        0 => Ok(()),
        b => write!(f, " button {b}"),
    }
}
