/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,
    pub long: &'static str, // full explanation for --explain
}

/// All stable diagnostic codes of the navigation command compiler.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "NAV-L001",
        short: "unexpected input",
        long: r#"## NAV-L001: unexpected input

The script contains characters that are not part of the navigation
language, or a number that does not fit in 32 bits.

**Example:**

    g0 = $1;

Registers are written `g0`..`g15` and `s0`..`s23`; values are decimal or
`0x` hexadecimal numbers up to 65535.
"#,
    },
    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "NAV-P001",
        short: "expected a statement",
        long: r#"## NAV-P001: expected a statement

A statement must start with a register assignment, `if`, `goto`, `jump`,
`call`, `exit`, `resume`, `break`, `counter`, a label (`name:`), a block
(`{ ... }`) or an empty `;`.
"#,
    },
    ErrorEntry {
        code: "NAV-P002",
        short: "unexpected end of input",
        long: r#"## NAV-P002: unexpected end of input

The script ended in the middle of a statement. Every simple statement ends
with `;` and every `{` needs a matching `}`.
"#,
    },
    ErrorEntry {
        code: "NAV-P003",
        short: "unexpected token",
        long: r#"## NAV-P003: unexpected token

A different token was required at this point, for example `;` after a
statement, `(` after `if`, or an assignment operator after a register.
"#,
    },
    ErrorEntry {
        code: "NAV-P004",
        short: "expected a label name",
        long: r#"## NAV-P004: expected a label name

`goto` must be followed by the name of a label defined in the same block:

    loop: g0 += 1;
    if (g0 < 10) goto loop;
"#,
    },
    ErrorEntry {
        code: "NAV-P005",
        short: "expected a number",
        long: r#"## NAV-P005: expected a number

Titleset, title, chapter, program, cell, menu and resume-cell references
take a literal number, not a register.
"#,
    },
    ErrorEntry {
        code: "NAV-P006",
        short: "number out of range",
        long: r#"## NAV-P006: number out of range

Values are 16 bits wide (0 to 65535). Titles and titlesets are numbered
from 1 to 99, chapters from 1 to 999, programs from 1 to 127 and cells
from 1 to 255.
"#,
    },
    ErrorEntry {
        code: "NAV-P007",
        short: "unknown register",
        long: r#"## NAV-P007: unknown register

General registers are `g0` to `g15` and system registers `s0` to `s23`.
The names `audio`, `subtitle`, `angle` and `button` stand for `s1`, `s2`,
`s3` and `s8`.
"#,
    },
    ErrorEntry {
        code: "NAV-P008",
        short: "invalid jump target",
        long: r#"## NAV-P008: invalid jump target

Jump targets are `fpc`, `menu`, `title`, `chapter`, `program` and `cell`,
optionally preceded by `vmgm` or `titleset N`. Chapters, programs and
cells always refer to the current title or menu and take no prefix.
"#,
    },
    ErrorEntry {
        code: "NAV-P009",
        short: "unknown menu entry",
        long: r#"## NAV-P009: unknown menu entry

`menu entry` accepts `title`, `root`, `subtitle`, `audio`, `angle` and
`ptt` (also spelled `chapter`).
"#,
    },
    ErrorEntry {
        code: "NAV-P010",
        short: "condition used as a value",
        long: r#"## NAV-P010: condition used as a value

Comparisons and `&&`, `||`, `!` only appear inside `if ( ... )`. Registers
cannot hold a truth value directly; assign inside an `if` instead:

    if (g1 == 2) g0 = 1; else g0 = 0;
"#,
    },
    ErrorEntry {
        code: "NAV-P011",
        short: "value used as a condition",
        long: r#"## NAV-P011: value used as a condition

An `if` needs a comparison. Write `if (g0 != 0)` rather than `if (g0)`.
"#,
    },
    ErrorEntry {
        code: "NAV-P012",
        short: "counter on a system register",
        long: r#"## NAV-P012: counter on a system register

Only general registers `g0` to `g15` can be switched to counter mode.
"#,
    },
    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "NAV-C001",
        short: "expression too complicated",
        long: r#"## NAV-C001: expression too complicated, ran out of registers

Intermediate results are kept in the scratch registers g13 to g15. An
expression nested deeply enough to need more than those cannot be
compiled. Split it into several assignments, or pass
`--allow-all-registers` to also use the registers above the target.
"#,
    },
    ErrorEntry {
        code: "NAV-C002",
        short: "system register cannot be set",
        long: r#"## NAV-C002: cannot set SPRM

Only `audio` (s1), `subtitle` (s2), `angle` (s3) and `button` (s8) can be
assigned. The other system registers are read-only to navigation commands.
"#,
    },
    ErrorEntry {
        code: "NAV-C003",
        short: "value out of range for the command",
        long: r#"## NAV-C003: value out of range

The value does not fit the field of the command it is encoded in, for
example a stream number above 127 or a menu PGC above 32767.
"#,
    },
    ErrorEntry {
        code: "NAV-C004",
        short: "illegal jump or call",
        long: r#"## NAV-C004: illegal jump or call

The player only allows certain transfers from each domain:

- titles reach menus and the first-play PGC with `call`, never `jump`;
- menus use `jump`, never `call`;
- chapters exist only in titles, and programs and cells only in the
  current PGC.

Transfers the hardware cannot express directly, such as a chapter of a
title in another titleset, need `--jumppad`.
"#,
    },
    ErrorEntry {
        code: "NAV-C005",
        short: "no such titleset",
        long: r#"## NAV-C005: no such titleset

The titleset number is larger than the number of titlesets in the
authoring workset.
"#,
    },
    ErrorEntry {
        code: "NAV-C006",
        short: "no such title",
        long: r#"## NAV-C006: no such title

The title does not exist. Inside a titleset, `title N` counts titles of
that titleset; in the VMGM it counts titles across the whole disc.
"#,
    },
    ErrorEntry {
        code: "NAV-C007",
        short: "no such chapter",
        long: r#"## NAV-C007: no such chapter

The title has fewer chapters than the one requested.
"#,
    },
    ErrorEntry {
        code: "NAV-C008",
        short: "no such menu",
        long: r#"## NAV-C008: no such menu

The menu PGC number is larger than the number of menus in that domain.
"#,
    },
    ErrorEntry {
        code: "NAV-C009",
        short: "menu entry not defined",
        long: r#"## NAV-C009: menu entry not defined

No menu in the target domain carries the requested entry. Entries such as
`root` or `audio` are declared on menu PGCs in the workset.
"#,
    },
    ErrorEntry {
        code: "NAV-C010",
        short: "no such program or cell",
        long: r#"## NAV-C010: no such program or cell

`jump program N` and `jump cell N` are checked against the PGC the block
belongs to.
"#,
    },
    ErrorEntry {
        code: "NAV-C011",
        short: "duplicate label",
        long: r#"## NAV-C011: duplicate label

Each label may be defined once per block. Labels are compared without
regard to case, so `Top:` and `top:` collide.
"#,
    },
    ErrorEntry {
        code: "NAV-C012",
        short: "undefined label",
        long: r#"## NAV-C012: undefined label

A `goto` names a label that is not defined in the same command block.
"#,
    },
    ErrorEntry {
        code: "NAV-C013",
        short: "too many instructions",
        long: r#"## NAV-C013: too many instructions

A PGC holds at most 128 navigation commands across its pre, post and cell
commands, and `goto` can address at most 255 lines.
"#,
    },
    ErrorEntry {
        code: "NAV-C014",
        short: "cell command is not a single instruction",
        long: r#"## NAV-C014: cell command is not a single instruction

A cell command is referenced by number and must compile to exactly one
instruction. Move longer logic into the post commands.
"#,
    },
    ErrorEntry {
        code: "NAV-C015",
        short: "internal compiler error",
        long: r#"## NAV-C015: internal compiler error

The compiler reached a state it cannot handle, such as a branch layout
that never settles. This is a compiler bug, not a script error.
"#,
    },
    // ── Warnings ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "NAV-W001",
        short: "button value not a multiple of 1024",
        long: r#"## NAV-W001: button value not a multiple of 1024

The highlighted button is stored in the upper six bits of SPRM 8, so
button N is written as `button = N * 1024`. Lower bits are ignored by
players.
"#,
    },
    ErrorEntry {
        code: "NAV-W002",
        short: "scratch register read by an expression",
        long: r#"## NAV-W002: scratch register read by an expression

g13, g14 and g15 hold the intermediate values of compound expressions
and comparisons, so their contents can change between statements.
Reading one in a compound expression still compiles, with that register
left out of the pool, but the value read may be a leftover temporary.

Keep long-lived values in g0..g12, or pass --allow-all-registers to
manage registers by hand.
"#,
    },
    // ── Simulator ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "NAV-R001",
        short: "simulation failed",
        long: r#"## NAV-R001: simulation failed

The command simulator hit a command it cannot execute, a `goto` outside
the block, or its step limit.
"#,
    },
];

/// Look up an error entry by code (e.g. `"NAV-C004"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
