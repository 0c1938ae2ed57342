use serde::{Deserialize, Serialize};

use crate::instruction::{CmpOp, Operand, Reg};

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }

    pub fn unknown(node: T) -> Self {
        Spanned { node, span: Span::UNKNOWN }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Spanned<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(|node| Spanned { node, span: Span::UNKNOWN })
    }
}

// ---- Values ----

/// Associative, commutative operators. Operand lists are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssocOp {
    Add,
    Mul,
    And,
    Or,
    Xor,
}

/// Order-sensitive operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Sub,
    Div,
    Mod,
}

/// 16-bit unsigned value expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal or register
    Val(Operand),
    /// `a + b + c`, `a & b`, ...
    Assoc { op: AssocOp, operands: Vec<Expr> },
    /// `a - b`, `a / b`, `a % b`
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `random(n)`, uniform in `1..=n`
    Random(Box<Expr>),
}

impl Expr {
    pub fn imm(value: u16) -> Expr {
        Expr::Val(Operand::Imm(value))
    }

    pub fn reg(reg: Reg) -> Expr {
        Expr::Val(Operand::Reg(reg))
    }

    /// `left op right`, merging into an existing operand list of the same operator.
    pub fn assoc(op: AssocOp, left: Expr, right: Expr) -> Expr {
        let mut operands = Vec::new();
        for side in [left, right] {
            match side {
                Expr::Assoc { op: inner, operands: more } if inner == op => operands.extend(more),
                other => operands.push(other),
            }
        }
        Expr::Assoc { op, operands }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    /// True when evaluating this expression reads `reg`.
    pub fn reads(&self, reg: Reg) -> bool {
        match self {
            Expr::Val(Operand::Reg(r)) => *r == reg,
            Expr::Val(Operand::Imm(_)) => false,
            Expr::Assoc { operands, .. } => operands.iter().any(|e| e.reads(reg)),
            Expr::Binary { left, right, .. } => left.reads(reg) || right.reads(reg),
            Expr::Random(inner) => inner.reads(reg),
        }
    }

    /// True for a bare literal or register.
    pub fn is_val(&self) -> bool {
        matches!(self, Expr::Val(_))
    }
}

// ---- Conditions ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cond {
    Compare { op: CmpOp, left: Expr, right: Expr },
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
}

impl Cond {
    pub fn and(left: Cond, right: Cond) -> Cond {
        let mut terms = Vec::new();
        for side in [left, right] {
            match side {
                Cond::And(more) => terms.extend(more),
                other => terms.push(other),
            }
        }
        Cond::And(terms)
    }

    pub fn or(left: Cond, right: Cond) -> Cond {
        let mut terms = Vec::new();
        for side in [left, right] {
            match side {
                Cond::Or(more) => terms.extend(more),
                other => terms.push(other),
            }
        }
        Cond::Or(terms)
    }

    pub fn not(inner: Cond) -> Cond {
        Cond::Not(Box::new(inner))
    }
}

// ---- Transfers ----

/// Which domain a jump target is named in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitlesetRef {
    /// Nothing named: the titleset the block runs in, or the VMGM.
    Current,
    Vmgm,
    Titleset(u8),
}

/// Named menu entries, with their `JumpSS`/`CallSS` menu ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuEntry {
    Title,
    Root,
    Subtitle,
    Audio,
    Angle,
    Ptt,
}

impl MenuEntry {
    pub fn id(self) -> u8 {
        match self {
            MenuEntry::Title => 2,
            MenuEntry::Root => 3,
            MenuEntry::Subtitle => 4,
            MenuEntry::Audio => 5,
            MenuEntry::Angle => 6,
            MenuEntry::Ptt => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MenuEntry::Title => "title",
            MenuEntry::Root => "root",
            MenuEntry::Subtitle => "subtitle",
            MenuEntry::Audio => "audio",
            MenuEntry::Angle => "angle",
            MenuEntry::Ptt => "ptt",
        }
    }

    pub fn from_name(name: &str) -> Option<MenuEntry> {
        Some(match name.to_ascii_lowercase().as_str() {
            "title" => MenuEntry::Title,
            "root" => MenuEntry::Root,
            "subtitle" | "subpicture" => MenuEntry::Subtitle,
            "audio" => MenuEntry::Audio,
            "angle" => MenuEntry::Angle,
            "ptt" | "chapter" => MenuEntry::Ptt,
            _ => return None,
        })
    }
}

impl std::fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuRef {
    /// `menu` alone: the title menu in the VMGM, the root menu in a titleset.
    Default,
    Pgc(u16),
    Entry(MenuEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpTarget {
    /// `jump vmgm fpc`
    FirstPlay { titleset: TitlesetRef },
    /// `jump [vmgm | titleset N] menu [N | entry E]`
    Menu { titleset: TitlesetRef, menu: MenuRef },
    /// `jump [vmgm | titleset N] title N [chapter M]`
    Title { titleset: TitlesetRef, title: u8, chapter: Option<u16> },
    /// `jump chapter N` within the current title
    Chapter(u16),
    /// `jump program N` within the current PGC
    Program(u8),
    /// `jump cell N` within the current PGC
    Cell(u8),
}

// ---- Statements ----

/// Destination of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetTarget {
    Gprm(u8),
    /// `counter gN = v`: the register switches to counter mode.
    Counter(u8),
    Sprm(u8),
}

pub type Block = Vec<Spanned<Stmt>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Set { target: SetTarget, value: Expr },
    If { cond: Cond, then_body: Block, else_body: Option<Block> },
    Goto(String),
    Label(String),
    Jump(JumpTarget),
    /// `call target [resume N]`
    Call { target: JumpTarget, resume_cell: u8 },
    Exit,
    Resume,
    Break,
    Nop,
}

/// A parsed command block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Block,
}
