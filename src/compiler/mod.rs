//! Lowers a parsed command block to navigation commands.
//!
//! Forward branch targets are unknown until the code between them is
//! compiled, so `if` and the short-circuit operators lay their code out by
//! relaxation: guess the length of the part that decides the branch,
//! compile against that guess, and retry until the guess holds.

mod cond;
mod expr;
mod jump;

use serde::{Deserialize, Serialize};

use crate::ast::{Block as Stmts, Cond, Expr, MenuEntry, Program, SetTarget, Span, Spanned, Stmt};
use crate::diagnostic::Diagnostic;
use crate::instruction::{GPRM_COUNT, Instruction, MAX_BLOCK_INSTRUCTIONS, Operand, Reg};
use crate::optimizer;
use crate::workset::{Location, Workset};

/// First register of the scratch pool used for intermediate values.
pub const FIRST_SCRATCH: u8 = 13;

/// Upper bound on layout guesses for one branch region.
const RELAX_LIMIT: usize = 256;

const LAYOUT_DIVERGED: &str = "branch layout did not converge";

/// True for the error a nested layout raises when an enclosing guess left it
/// without a fixed point; the enclosing layout moves on to its next guess.
fn diverged(e: &CompileError) -> bool {
    e.kind == ErrorKind::Internal(LAYOUT_DIVERGED)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Route transfers the player cannot express directly through the
    /// VMGM dispatcher PGC (see [`jump`]).
    pub jumppad: bool,
    /// Let expression temporaries use every register above the assignment
    /// target instead of only the g13..g15 pool.
    pub allow_all_registers: bool,
    pub optimize: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { jumppad: false, allow_all_registers: false, optimize: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("expression too complicated, ran out of registers")]
    OutOfRegisters,
    #[error("cannot set SPRM {0}")]
    CannotSetSprm(u8),
    #[error("{what} {value} is out of range (at most {max})")]
    ValueOutOfRange { what: &'static str, value: u32, max: u32 },
    #[error("{0}")]
    IllegalTransfer(&'static str),
    #[error("titleset {0} does not exist")]
    NoSuchTitleset(u8),
    #[error("title {0} does not exist")]
    NoSuchTitle(u8),
    #[error("chapter {chapter} does not exist, title {title} has {chapters} chapters")]
    NoSuchChapter { title: u8, chapter: u16, chapters: u16 },
    #[error("menu {pgc} does not exist in the {domain}")]
    NoSuchMenu { domain: String, pgc: u16 },
    #[error("no menu with entry '{entry}' in the {domain}")]
    NoSuchEntry { domain: String, entry: MenuEntry },
    #[error("{what} {number} does not exist, the PGC has {count}")]
    NoSuchPgcPart { what: &'static str, number: u16, count: u16 },
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("{count} instructions exceed the limit of {limit}")]
    TooManyInstructions { count: usize, limit: usize },
    #[error("cell command must be exactly one instruction, got {0}")]
    CellCommandLength(usize),
    #[error("internal compiler error: {0}")]
    Internal(&'static str),
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::OutOfRegisters => "NAV-C001",
            ErrorKind::CannotSetSprm(_) => "NAV-C002",
            ErrorKind::ValueOutOfRange { .. } => "NAV-C003",
            ErrorKind::IllegalTransfer(_) => "NAV-C004",
            ErrorKind::NoSuchTitleset(_) => "NAV-C005",
            ErrorKind::NoSuchTitle(_) => "NAV-C006",
            ErrorKind::NoSuchChapter { .. } => "NAV-C007",
            ErrorKind::NoSuchMenu { .. } => "NAV-C008",
            ErrorKind::NoSuchEntry { .. } => "NAV-C009",
            ErrorKind::NoSuchPgcPart { .. } => "NAV-C010",
            ErrorKind::DuplicateLabel(_) => "NAV-C011",
            ErrorKind::UndefinedLabel(_) => "NAV-C012",
            ErrorKind::TooManyInstructions { .. } => "NAV-C013",
            ErrorKind::CellCommandLength(_) => "NAV-C014",
            ErrorKind::Internal(_) => "NAV-C015",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorKind::OutOfRegisters => Some("split the expression or pass --allow-all-registers"),
            ErrorKind::CannotSetSprm(_) => Some("only audio, subtitle, angle and button can be assigned"),
            ErrorKind::TooManyInstructions { .. } => Some("move logic into another PGC"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub span: Span,
}

type Result<T> = std::result::Result<T, CompileError>;

/// A compiled command block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub instructions: Vec<Instruction>,
    pub warnings: Vec<Diagnostic>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        crate::instruction::to_bytes(&self.instructions)
    }
}

struct PendingGoto {
    label: String,
    at: usize,
    span: Span,
}

/// Lengths of the compiler's growable state, for rolling back a layout guess.
#[derive(Clone, Copy)]
struct Mark {
    code: usize,
    labels: usize,
    gotos: usize,
    warnings: usize,
}

pub(crate) struct BlockCompiler<'a> {
    workset: &'a Workset,
    location: &'a Location,
    options: &'a CompilerOptions,
    code: Vec<Instruction>,
    labels: Vec<(String, usize)>,
    gotos: Vec<PendingGoto>,
    warnings: Vec<Diagnostic>,
    span: Span,
    /// General registers read by the expression being compiled, one bit each.
    /// They stay out of the scratch pool.
    live: u16,
}

impl<'a> BlockCompiler<'a> {
    fn new(workset: &'a Workset, location: &'a Location, options: &'a CompilerOptions) -> Self {
        BlockCompiler {
            workset,
            location,
            options,
            code: Vec::new(),
            labels: Vec::new(),
            gotos: Vec::new(),
            warnings: Vec::new(),
            span: Span::UNKNOWN,
            live: 0,
        }
    }

    fn err(&self, kind: ErrorKind) -> CompileError {
        CompileError { kind, span: self.span }
    }

    fn emit(&mut self, ins: Instruction) -> usize {
        self.code.push(ins);
        self.code.len() - 1
    }

    /// 1-based line number of instruction `index`.
    fn line(&self, index: usize) -> Result<u8> {
        u8::try_from(index + 1).map_err(|_| {
            self.err(ErrorKind::TooManyInstructions { count: index + 1, limit: usize::from(u8::MAX) })
        })
    }

    fn emit_goto(&mut self, index: usize) -> Result<()> {
        let line = self.line(index)?;
        self.emit(Instruction::goto(line));
        Ok(())
    }

    fn mark(&self) -> Mark {
        Mark {
            code: self.code.len(),
            labels: self.labels.len(),
            gotos: self.gotos.len(),
            warnings: self.warnings.len(),
        }
    }

    fn rollback(&mut self, mark: Mark) {
        self.code.truncate(mark.code);
        self.labels.truncate(mark.labels);
        self.gotos.truncate(mark.gotos);
        self.warnings.truncate(mark.warnings);
    }

    /// Compiles a region whose code depends on where it ends. `compile` gets
    /// the guessed end index and is retried until its output length matches.
    fn relax<F>(&mut self, what: &'static str, mut compile: F) -> Result<()>
    where
        F: FnMut(&mut Self, usize) -> Result<()>,
    {
        let mark = self.mark();
        for guess in 0..=RELAX_LIMIT {
            self.rollback(mark);
            match compile(self, mark.code + guess) {
                Err(e) if diverged(&e) => continue,
                other => other?,
            }
            let len = self.code.len() - mark.code;
            if len == guess {
                return Ok(());
            }
            log::trace!("{what}: guessed {guess} instructions, got {len}");
        }
        Err(self.err(ErrorKind::Internal(LAYOUT_DIVERGED)))
    }

    /// Next scratch register after `current`, or the first of the pool.
    fn next_target(&self, current: Option<u8>) -> Result<u8> {
        self.scratch_below(current, GPRM_COUNT)
    }

    /// Like [`next_target`](Self::next_target), but only registers below
    /// `limit` are candidates. Registers the current expression reads are
    /// skipped.
    fn scratch_below(&self, current: Option<u8>, limit: u8) -> Result<u8> {
        let first = match current {
            Some(t) if self.options.allow_all_registers => t + 1,
            Some(t) => (t + 1).max(FIRST_SCRATCH),
            None => FIRST_SCRATCH,
        };
        (first..limit)
            .find(|&r| self.live & (1 << r) == 0)
            .ok_or_else(|| self.err(ErrorKind::OutOfRegisters))
    }

    /// Runs `f` with every general register `exprs` read kept out of the
    /// scratch pool.
    fn reading<T>(&mut self, exprs: &[&Expr], f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let read = (0..GPRM_COUNT)
            .filter(|&r| exprs.iter().any(|e| e.reads(Reg::Gprm(r))))
            .fold(0u16, |mask, r| mask | 1 << r);
        if !self.options.allow_all_registers && exprs.iter().any(|e| !e.is_val()) {
            self.warn_scratch_reads(read);
        }
        let outer = self.live;
        self.live |= read;
        let result = f(self);
        self.live = outer;
        result
    }

    /// Compound expressions share g13..g15 with the compiler. Reading one of
    /// them still works but shrinks the pool, and the register may have been
    /// overwritten by an earlier statement's temporaries.
    fn warn_scratch_reads(&mut self, read: u16) {
        for r in FIRST_SCRATCH..GPRM_COUNT {
            if read & (1 << r) != 0 {
                self.warnings.push(
                    Diagnostic::warning(format!("g{r} is a scratch register and may be overwritten by expressions"))
                        .with_code("NAV-W002")
                        .with_span(self.span, "read here")
                        .with_suggestion(format!("keep g{r} out of compound expressions or use g0..g12")),
                );
            }
        }
    }

    /// Clears g15 after its scratch value has been consumed; the jumppad
    /// dispatcher treats a non-zero g15 as a pending transfer.
    fn release_scratch(&mut self, reg: u8) {
        if reg == GPRM_COUNT - 1 {
            self.emit(Instruction::set(crate::instruction::SetOp::Mov, reg, Operand::Imm(0)));
        }
    }

    // ---- Statements ----

    fn compile_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> Result<()> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<()> {
        let outer = self.span;
        self.span = stmt.span;
        let result = match &stmt.node {
            Stmt::Set { target, value } => self.compile_set(*target, value),
            Stmt::If { cond, then_body, else_body } => self.compile_if(cond, then_body, else_body.as_deref()),
            Stmt::Goto(label) => {
                let at = self.emit(Instruction::goto(0));
                self.gotos.push(PendingGoto { label: label.clone(), at, span: stmt.span });
                Ok(())
            }
            Stmt::Label(name) => self.define_label(name),
            Stmt::Jump(target) => self.compile_transfer(target, jump::Mode::Jump),
            Stmt::Call { target, resume_cell } => self.compile_transfer(target, jump::Mode::Call(*resume_cell)),
            Stmt::Exit => {
                self.emit(Instruction::exit());
                Ok(())
            }
            Stmt::Resume => {
                self.emit(Instruction::resume());
                Ok(())
            }
            Stmt::Break => {
                self.emit(Instruction::break_block());
                Ok(())
            }
            Stmt::Nop => {
                self.emit(Instruction::NOP);
                Ok(())
            }
        };
        self.span = outer;
        result
    }

    fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Err(self.err(ErrorKind::DuplicateLabel(name.to_string())));
        }
        self.labels.push((name.to_string(), self.code.len()));
        Ok(())
    }

    fn compile_set(&mut self, target: SetTarget, value: &Expr) -> Result<()> {
        match target {
            SetTarget::Gprm(n) => self.reading(&[value], |c| c.compile_expr(n, value)),
            SetTarget::Counter(n) => {
                let (source, scratch) = self.system_operand(value, false, u16::MAX)?;
                self.emit(Instruction::set_counter(n, source));
                self.release(scratch);
                Ok(())
            }
            SetTarget::Sprm(slot @ 1..=3) => {
                let (source, scratch) = self.system_operand(value, true, 0x7F)?;
                self.emit(Instruction::set_stream(slot, source));
                self.release(scratch);
                Ok(())
            }
            SetTarget::Sprm(8) => {
                let (source, scratch) = self.system_operand(value, false, u16::MAX)?;
                match source {
                    Operand::Imm(v) if v % 1024 != 0 => self.warnings.push(
                        Diagnostic::warning("Button value should be a multiple of 1024")
                            .with_code("NAV-W001")
                            .with_span(self.span, "assigned here")
                            .with_suggestion(format!("button {} is written as {}", v >> 10, (v >> 10) << 10)),
                    ),
                    _ => {}
                }
                self.emit(Instruction::set_button(source));
                self.release(scratch);
                Ok(())
            }
            SetTarget::Sprm(n) => Err(self.err(ErrorKind::CannotSetSprm(n))),
        }
    }

    /// Reduces `value` to an operand a system-set command can carry, computing
    /// it into a scratch register when it is neither a literal nor a plain
    /// register. Returns the scratch register used, if any.
    fn system_operand(&mut self, value: &Expr, gprm_only: bool, max: u16) -> Result<(Operand, Option<u8>)> {
        match value {
            Expr::Val(Operand::Imm(v)) if *v > max => Err(self.err(ErrorKind::ValueOutOfRange {
                what: "value",
                value: u32::from(*v),
                max: u32::from(max),
            })),
            Expr::Val(op @ (Operand::Imm(_) | Operand::Reg(Reg::Gprm(_)))) => Ok((*op, None)),
            Expr::Val(op @ Operand::Reg(Reg::Sprm(_))) if !gprm_only => Ok((*op, None)),
            complex => self.reading(&[complex], |c| {
                let t = c.next_target(None)?;
                c.compile_expr(t, complex)?;
                Ok((Operand::Reg(Reg::Gprm(t)), Some(t)))
            }),
        }
    }

    fn release(&mut self, scratch: Option<u8>) {
        if let Some(reg) = scratch {
            self.release_scratch(reg);
        }
    }

    /// `if` layout: `[condition][then][goto end][else]`. The condition is
    /// compiled last, against the guessed start of the then-part.
    fn compile_if(&mut self, cond: &Cond, then_body: &Stmts, else_body: Option<&[Spanned<Stmt>]>) -> Result<()> {
        let mark = self.mark();
        for guess in 0..=RELAX_LIMIT {
            self.rollback(mark);
            self.code.resize(mark.code + guess, Instruction::NOP);
            let iftrue = self.code.len();
            let iffalse = match self.compile_arms(then_body, else_body) {
                Err(e) if diverged(&e) => continue,
                other => other?,
            };
            let bodies = self.code.split_off(iftrue);
            self.code.truncate(mark.code);
            match self.cond_at(cond, iftrue, iffalse, iftrue) {
                Err(e) if diverged(&e) => continue,
                other => other?,
            }
            let len = self.code.len() - mark.code;
            if len == guess {
                self.code.extend(bodies);
                return Ok(());
            }
            log::trace!("if: guessed {guess} condition instructions, got {len}");
        }
        Err(self.err(ErrorKind::Internal(LAYOUT_DIVERGED)))
    }

    /// Emits the then-part and the optional `[goto end][else]` tail, and
    /// returns where control goes when the condition fails.
    fn compile_arms(&mut self, then_body: &Stmts, else_body: Option<&[Spanned<Stmt>]>) -> Result<usize> {
        self.compile_stmts(then_body)?;
        match else_body {
            Some(else_body) => {
                let skip = self.emit(Instruction::goto(0));
                let else_start = self.code.len();
                self.compile_stmts(else_body)?;
                let end = self.line(self.code.len())?;
                self.code[skip] = Instruction::goto(end);
                Ok(else_start)
            }
            None => Ok(self.code.len()),
        }
    }

    /// Patches every `goto` with its label's line and appends a trailing NOP
    /// when a jump targets the line just past the end.
    fn resolve_gotos(&mut self) -> Result<()> {
        for goto in std::mem::take(&mut self.gotos) {
            let target = self
                .labels
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&goto.label))
                .map(|(_, at)| *at)
                .ok_or_else(|| CompileError { kind: ErrorKind::UndefinedLabel(goto.label.clone()), span: goto.span })?;
            let line = u8::try_from(target + 1).map_err(|_| CompileError {
                kind: ErrorKind::TooManyInstructions { count: target + 1, limit: usize::from(u8::MAX) },
                span: goto.span,
            })?;
            self.code[goto.at] = Instruction::goto(line);
        }
        let past_end = self.code.len() + 1;
        if self.code.iter().any(|ins| ins.goto_line().map(usize::from) == Some(past_end)) {
            self.code.push(Instruction::NOP);
        }
        Ok(())
    }
}

/// Compiles a block without running the peephole optimizer or enforcing
/// the per-PGC instruction limit.
pub fn compile_unoptimized(
    program: &Program,
    location: &Location,
    workset: &Workset,
    options: &CompilerOptions,
) -> std::result::Result<Block, CompileError> {
    let mut compiler = BlockCompiler::new(workset, location, options);
    compiler.compile_stmts(&program.statements)?;
    compiler.resolve_gotos()?;
    Ok(Block { instructions: compiler.code, warnings: compiler.warnings })
}

/// Compiles, optimizes and size-checks one command block.
pub fn compile_block(
    program: &Program,
    location: &Location,
    workset: &Workset,
    options: &CompilerOptions,
) -> std::result::Result<Block, CompileError> {
    let mut block = compile_unoptimized(program, location, workset, options)?;
    let raw = block.len();
    if options.optimize {
        optimizer::optimize(&mut block.instructions);
    }
    log::debug!("compiled {:?}: {raw} instructions, {} after optimization", location.domain, block.len());
    if block.len() > MAX_BLOCK_INSTRUCTIONS {
        return Err(CompileError {
            kind: ErrorKind::TooManyInstructions { count: block.len(), limit: MAX_BLOCK_INSTRUCTIONS },
            span: Span::UNKNOWN,
        });
    }
    Ok(block)
}

/// Compiles a cell command, which must come out as a single instruction.
pub fn compile_cell_command(
    program: &Program,
    location: &Location,
    workset: &Workset,
    options: &CompilerOptions,
) -> std::result::Result<(Instruction, Vec<Diagnostic>), CompileError> {
    let block = compile_block(program, location, workset, options)?;
    match block.instructions.as_slice() {
        [single] => Ok((*single, block.warnings)),
        other => Err(CompileError {
            kind: ErrorKind::CellCommandLength(other.len()),
            span: program.statements.first().map_or(Span::UNKNOWN, |s| s.span),
        }),
    }
}
