//! Whole-pipeline properties checked on the simulator.

use dvdcmd::ast::MenuEntry;
use dvdcmd::compiler::{self, CompilerOptions, ErrorKind, compile_block, compile_unoptimized};
use dvdcmd::instruction::{CmpOp, Instruction, Jump, Link, Operand, SetOp, SystemSpace};
use dvdcmd::optimizer::optimize;
use dvdcmd::vm::{Machine, Outcome, Transfer};
use dvdcmd::workset::{Domain, Location, MenuGroup, Titleset, Vmgm, Workset};

const SEED: u64 = 0x00d5_dc0d;

fn vmgm() -> Location {
    Location::new(Domain::Vmgm)
}

fn title_domain() -> Location {
    Location::new(Domain::Vts { titleset: 1, title: 1 })
}

fn unoptimized(source: &str, location: &Location) -> Vec<Instruction> {
    let program = dvdcmd::parse(source).unwrap_or_else(|d| panic!("{source}: {}", d.message));
    compile_unoptimized(&program, location, &Workset::default(), &CompilerOptions::default())
        .unwrap_or_else(|e| panic!("{source}: {e}"))
        .instructions
}

// --- Random scripts ---

const ASSOC: [&str; 5] = ["+", "*", "&", "|", "^"];
const BINARY: [&str; 3] = ["-", "/", "%"];

#[derive(Debug)]
enum Value {
    Lit(u16),
    Reg(usize),
    Assoc(&'static str, Vec<Value>),
    Binary(&'static str, Box<Value>, Box<Value>),
}

impl Value {
    fn source(&self) -> String {
        match self {
            Value::Lit(v) => v.to_string(),
            Value::Reg(r) => format!("g{r}"),
            Value::Assoc(op, operands) => {
                let parts: Vec<_> = operands.iter().map(Value::source).collect();
                format!("({})", parts.join(&format!(" {op} ")))
            }
            Value::Binary(op, l, r) => format!("({} {op} {})", l.source(), r.source()),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Value::Lit(_) | Value::Reg(_) => 0,
            Value::Assoc(_, operands) => 1 + operands.iter().map(Value::depth).max().unwrap_or(0),
            Value::Binary(_, l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Player arithmetic: saturating, division by zero gives 0xFFFF.
    fn eval(&self, regs: &[u16]) -> u16 {
        match self {
            Value::Lit(v) => *v,
            Value::Reg(r) => regs[*r],
            Value::Assoc(op, operands) => operands
                .iter()
                .map(|e| e.eval(regs))
                .reduce(|a, b| apply(op, a, b))
                .unwrap_or(0),
            Value::Binary(op, l, r) => apply(op, l.eval(regs), r.eval(regs)),
        }
    }
}

fn apply(op: &str, a: u16, b: u16) -> u16 {
    match op {
        "+" => a.saturating_add(b),
        "*" => a.saturating_mul(b),
        "&" => a & b,
        "|" => a | b,
        "^" => a ^ b,
        "-" => a.saturating_sub(b),
        "/" => a.checked_div(b).unwrap_or(0xFFFF),
        "%" => a.checked_rem(b).unwrap_or(0xFFFF),
        other => panic!("unknown operator {other}"),
    }
}

fn leaf(rng: &mut fastrand::Rng) -> Value {
    match rng.u8(0..3) {
        0 => Value::Lit(rng.u16(0..300)),
        _ => Value::Reg(rng.usize(0..13)),
    }
}

/// An expression with operators nested at most `depth` levels.
fn value(rng: &mut fastrand::Rng, depth: usize) -> Value {
    if depth == 0 || rng.u8(0..4) == 0 {
        return leaf(rng);
    }
    if rng.bool() {
        let n = rng.usize(2..6);
        Value::Assoc(ASSOC[rng.usize(..ASSOC.len())], (0..n).map(|_| value(rng, depth - 1)).collect())
    } else {
        let op = BINARY[rng.usize(..BINARY.len())];
        Value::Binary(op, Box::new(value(rng, depth - 1)), Box::new(value(rng, depth - 1)))
    }
}

/// A four-operand chain with a two-level operand, so every case has
/// three operator levels.
fn deep_value(rng: &mut fastrand::Rng) -> Value {
    let inner = Value::Binary(BINARY[rng.usize(..3)], Box::new(leaf(rng)), Box::new(leaf(rng)));
    let mid = Value::Assoc(ASSOC[rng.usize(..5)], vec![leaf(rng), inner]);
    let mut operands = vec![leaf(rng), mid, leaf(rng), value(rng, 2)];
    rng.shuffle(&mut operands);
    Value::Assoc(ASSOC[rng.usize(..5)], operands)
}

#[derive(Debug)]
enum Test {
    Compare(&'static str, String, String),
    Not(Box<Test>),
    And(Box<Test>, Box<Test>),
    Or(Box<Test>, Box<Test>),
}

const COMPARE: [&str; 6] = ["==", "!=", ">=", ">", "<=", "<"];

impl Test {
    fn source(&self) -> String {
        match self {
            Test::Compare(op, l, r) => format!("{l} {op} {r}"),
            Test::Not(inner) => format!("!({})", inner.source()),
            Test::And(l, r) => format!("({}) && ({})", l.source(), r.source()),
            Test::Or(l, r) => format!("({}) || ({})", l.source(), r.source()),
        }
    }

    fn eval(&self, regs: &[u16]) -> bool {
        let side = |s: &str| match s.strip_prefix('g') {
            Some(n) => regs[n.parse::<usize>().unwrap()],
            None => s.parse().unwrap(),
        };
        match self {
            Test::Compare(op, l, r) => {
                let (l, r) = (side(l), side(r));
                match *op {
                    "==" => l == r,
                    "!=" => l != r,
                    ">=" => l >= r,
                    ">" => l > r,
                    "<=" => l <= r,
                    _ => l < r,
                }
            }
            Test::Not(inner) => !inner.eval(regs),
            Test::And(l, r) => l.eval(regs) && r.eval(regs),
            Test::Or(l, r) => l.eval(regs) || r.eval(regs),
        }
    }
}

fn condition(rng: &mut fastrand::Rng, depth: usize) -> Test {
    let side = |rng: &mut fastrand::Rng| match rng.u8(0..4) {
        0 => rng.u16(0..4).to_string(),
        _ => format!("g{}", rng.u8(0..6)),
    };
    if depth == 0 || rng.u8(0..3) == 0 {
        return Test::Compare(COMPARE[rng.usize(..COMPARE.len())], side(rng), side(rng));
    }
    match rng.u8(0..3) {
        0 => Test::Not(Box::new(condition(rng, depth - 1))),
        1 => Test::And(Box::new(condition(rng, depth - 1)), Box::new(condition(rng, depth - 1))),
        _ => Test::Or(Box::new(condition(rng, depth - 1)), Box::new(condition(rng, depth - 1))),
    }
}

/// A block of assignments, branches, forward gotos and system sets, ending
/// in a transfer or falling off the end.
fn script(rng: &mut fastrand::Rng) -> String {
    let mut out = Vec::new();
    let mut next_label = 0;
    let mut pending: Vec<usize> = Vec::new();
    for _ in 0..rng.usize(1..14) {
        if !pending.is_empty() && rng.u8(0..3) == 0 {
            let label = pending.remove(rng.usize(..pending.len()));
            out.push(format!("L{label}:"));
        }
        let g = |rng: &mut fastrand::Rng| format!("g{}", rng.u8(0..6));
        let stmt = match rng.u8(0..9) {
            0 => format!("{} = {};", g(rng), rng.u16(0..200)),
            1 => format!("{} += {};", g(rng), g(rng)),
            2 => format!("if ({} {} {}) {} = {};", g(rng), COMPARE[rng.usize(..6)], rng.u16(0..4), g(rng), rng.u16(0..9)),
            3 => format!(
                "if ({} {} {}) {{ {} = {}; }} else {{ {} -= 1; }}",
                g(rng),
                COMPARE[rng.usize(..6)],
                g(rng),
                g(rng),
                rng.u16(0..9),
                g(rng)
            ),
            4 => format!("audio = {}; subtitle = {};", rng.u16(0..8), rng.u16(0..32)),
            5 => format!("button = {};", rng.u16(1..8) * 1024),
            6 => {
                pending.push(next_label);
                next_label += 1;
                format!("goto L{};", next_label - 1)
            }
            7 => {
                pending.push(next_label);
                next_label += 1;
                format!("if ({}) goto L{}; g5 = 1;", condition(rng, 2).source(), next_label - 1)
            }
            _ => format!("angle = {};", g(rng)),
        };
        out.push(stmt);
    }
    for label in pending {
        out.push(format!("L{label}:"));
    }
    match rng.u8(0..4) {
        0 => out.push("jump program 2;".into()),
        1 => out.push("jump cell 3;".into()),
        2 => out.push("break;".into()),
        _ => {}
    }
    out.join("\n")
}

/// Outcome with link buttons cleared; a button folded into a link still
/// lands in SPRM 8, which is compared separately.
fn without_buttons(outcome: Outcome) -> Outcome {
    match outcome {
        Outcome::Transfer(Transfer::Link(link)) => Outcome::Transfer(Transfer::Link(match link {
            Link::Sub { op, .. } => Link::Sub { op, button: 0 },
            Link::Pttn { chapter, .. } => Link::Pttn { chapter, button: 0 },
            Link::Pgn { program, .. } => Link::Pgn { program, button: 0 },
            Link::Cn { cell, .. } => Link::Cn { cell, button: 0 },
            pgcn @ Link::Pgcn(_) => pgcn,
        })),
        other => other,
    }
}

// --- Addressing ---

#[test]
fn gotos_resolve_to_their_labels() {
    let mut rng = fastrand::Rng::with_seed(SEED);
    for _ in 0..200 {
        let labels = rng.usize(1..6);
        let mut parts = Vec::new();
        let mut expected = Vec::new();
        let mut defined = 0;
        while defined < labels {
            match rng.u8(0..4) {
                0 => {
                    let label = rng.usize(..labels);
                    parts.push(format!("goto L{label};"));
                    expected.push(label);
                }
                1 => parts.push(format!("if (g0 == {}) g1 = 2;", rng.u16(0..3))),
                2 => parts.push(format!("g{} = {};", rng.u8(0..10), rng.u16(0..50))),
                _ => {
                    parts.push(format!("L{defined}: g11 = {};", 1000 + defined));
                    defined += 1;
                }
            }
        }
        let source = parts.join(" ");
        let code = unoptimized(&source, &vmgm());
        let marker = |label: usize| {
            let ins = Instruction::set(SetOp::Mov, 11, Operand::Imm(1000 + label as u16));
            code.iter().position(|i| *i == ins).unwrap() + 1
        };
        let gotos: Vec<usize> = code
            .iter()
            .filter(|ins| !ins.is_conditional())
            .filter_map(|ins| ins.goto_line().map(usize::from))
            .collect();
        let wanted: Vec<usize> = expected.iter().map(|&l| marker(l)).collect();
        assert_eq!(gotos, wanted, "{source}");
    }
}

// --- Optimizer ---

#[test]
fn optimizer_shrinks_and_settles() {
    let mut rng = fastrand::Rng::with_seed(SEED);
    for _ in 0..300 {
        let source = script(&mut rng);
        let code = unoptimized(&source, &title_domain());
        let mut once = code.clone();
        optimize(&mut once);
        assert!(once.len() <= code.len(), "{source}");
        let mut twice = once.clone();
        optimize(&mut twice);
        assert_eq!(twice, once, "{source}");
    }
}

#[test]
fn optimizer_keeps_behaviour() {
    let mut rng = fastrand::Rng::with_seed(SEED ^ 1);
    for _ in 0..300 {
        let source = script(&mut rng);
        let code = unoptimized(&source, &title_domain());
        let mut optimized = code.clone();
        optimize(&mut optimized);
        for _ in 0..4 {
            let regs: Vec<u16> = (0..6).map(|_| rng.u16(0..4)).collect();
            let mut a = Machine::new();
            let mut b = Machine::new();
            a.gprm[..6].copy_from_slice(&regs);
            b.gprm[..6].copy_from_slice(&regs);
            let out_a = a.run(&code).unwrap_or_else(|e| panic!("{source}: {e}"));
            let out_b = b.run(&optimized).unwrap_or_else(|e| panic!("{source}: {e}"));
            assert_eq!(without_buttons(out_a), without_buttons(out_b), "{source} with {regs:?}");
            assert_eq!(a.gprm, b.gprm, "{source} with {regs:?}");
            assert_eq!(a.sprm, b.sprm, "{source} with {regs:?}");
        }
    }
}

#[test]
fn negation_is_an_involution() {
    let mut rng = fastrand::Rng::with_seed(SEED);
    let mut seen = 0;
    for _ in 0..100 {
        let code = unoptimized(&script(&mut rng), &title_domain());
        let mut optimized = code.clone();
        optimize(&mut optimized);
        let conditions = code.iter().chain(&optimized).filter_map(Instruction::condition);
        for cond in conditions.filter(|c| c.op != CmpOp::Bc) {
            seen += 1;
            assert_eq!(cond.negate().and_then(|c| c.negate()), Some(cond));
        }
    }
    assert!(seen > 0);
    for op in [CmpOp::Eq, CmpOp::Ne, CmpOp::Ge, CmpOp::Gt, CmpOp::Le, CmpOp::Lt] {
        assert_eq!(op.negate().and_then(CmpOp::negate), Some(op));
    }
    assert_eq!(CmpOp::Bc.negate(), None);
}

// --- Expressions and conditions ---

#[test]
fn expressions_match_direct_evaluation() {
    let mut rng = fastrand::Rng::with_seed(SEED);
    for case in 0..500 {
        let expr = if case % 2 == 0 { deep_value(&mut rng) } else { value(&mut rng, 3) };
        let target = rng.u8(0..13);
        let source = format!("g{target} = {};", expr.source());
        let code = unoptimized(&source, &vmgm());
        let mut regs = [0u16; 13];
        for r in regs.iter_mut() {
            *r = match rng.u8(0..5) {
                0 => 0,
                1 => rng.u16(60000..=u16::MAX),
                _ => rng.u16(0..1000),
            };
        }
        let mut m = Machine::new();
        m.gprm[..13].copy_from_slice(&regs);
        m.run(&code).unwrap();
        assert_eq!(m.gprm[usize::from(target)], expr.eval(&regs), "{source} with {regs:?}");
        for (i, (&after, &before)) in m.gprm[..13].iter().zip(&regs).enumerate() {
            if i != usize::from(target) {
                assert_eq!(after, before, "g{i} clobbered by {source}");
            }
        }
        if case % 2 == 0 {
            assert!(expr.depth() >= 3);
        }
    }
}

#[test]
fn allow_all_registers_keeps_operands_intact() {
    let options = CompilerOptions { allow_all_registers: true, ..CompilerOptions::default() };
    let mut rng = fastrand::Rng::with_seed(SEED);
    for case in 0..300 {
        let expr = if case % 2 == 0 { deep_value(&mut rng) } else { value(&mut rng, 3) };
        let source = format!("g0 = {};", expr.source());
        let program = dvdcmd::parse(&source).unwrap_or_else(|d| panic!("{source}: {}", d.message));
        let code = compile_unoptimized(&program, &vmgm(), &Workset::default(), &options)
            .unwrap_or_else(|e| panic!("{source}: {e}"))
            .instructions;
        let regs: Vec<u16> = (0..13).map(|_| rng.u16(0..1000)).collect();
        let mut m = Machine::new();
        m.gprm[..13].copy_from_slice(&regs);
        m.run(&code).unwrap();
        assert_eq!(m.gprm[0], expr.eval(&regs), "{source} with {regs:?}");
    }
}

#[test]
fn conditions_match_direct_evaluation() {
    let mut rng = fastrand::Rng::with_seed(SEED);
    for _ in 0..300 {
        let cond = condition(&mut rng, 3);
        let source = format!("if ({}) g12 = 1; else g12 = 2;", cond.source());
        let code = unoptimized(&source, &vmgm());
        for _ in 0..8 {
            let regs: Vec<u16> = (0..6).map(|_| rng.u16(0..4)).collect();
            let mut m = Machine::new();
            m.gprm[..6].copy_from_slice(&regs);
            m.run(&code).unwrap();
            let expected = if cond.eval(&regs) { 1 } else { 2 };
            assert_eq!(m.gprm[12], expected, "{source} with {regs:?}");
        }
    }
}

#[test]
fn boolean_truth_tables() {
    let cases: [(&str, fn(bool, bool) -> bool); 4] = [
        ("g0 == 1 && g1 == 1", |a, b| a && b),
        ("g0 == 1 || g1 == 1", |a, b| a || b),
        ("!(g0 == 1)", |a, _| !a),
        ("(g0 == 1 && g1 == 1) || g2 == 1", |a, b| a && b),
    ];
    for (cond, expected) in cases {
        let code = unoptimized(&format!("if ({cond}) g12 = 1; else g12 = 2;"), &vmgm());
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut m = Machine::new();
            m.gprm[0] = u16::from(a);
            m.gprm[1] = u16::from(b);
            m.run(&code).unwrap();
            assert_eq!(m.gprm[12] == 1, expected(a, b), "{cond} with {a} {b}");
        }
    }
}

// --- Jump and call legality ---

fn disc() -> Workset {
    Workset {
        vmgm: Vmgm { menus: MenuGroup::new(&[&[MenuEntry::Title], &[]]) },
        titlesets: vec![
            Titleset::with_titles(&[3, 2]).with_menus(MenuGroup::new(&[&[MenuEntry::Root], &[MenuEntry::Audio], &[]])),
            Titleset::with_titles(&[4]).with_menus(MenuGroup::new(&[&[MenuEntry::Root, MenuEntry::Ptt]])),
        ],
    }
}

enum Expect {
    Emits(Instruction),
    Illegal(&'static str),
}

use Expect::{Emits, Illegal};

const NO_CALL: &str = "cannot call from a menu, use 'jump' instead";
const NO_MENU_JUMP: &str = "Cannot jump to a menu from a title, use 'call' instead";
const NO_LOCAL_CALL: &str = "cannot call a title/chapter/program/cell, use 'jump' instead";

#[test]
fn legality_matrix() {
    let workset = disc();
    let contexts = [vmgm(), Location::new(Domain::Vtsm(1)), title_domain()];
    let audio = MenuEntry::Audio.id();
    let vtsm_audio = SystemSpace::Vtsm { vts: 1, title: 1, menu: audio };
    let own_audio = SystemSpace::Vtsm { vts: 0, title: 0, menu: audio };
    let table: Vec<(&str, [Expect; 3])> = vec![
        (
            "jump vmgm fpc;",
            [
                Emits(Instruction::jump_ss(SystemSpace::FirstPlay)),
                Emits(Instruction::jump_ss(SystemSpace::FirstPlay)),
                Illegal("cannot jump to FPC from a title, use 'call' instead"),
            ],
        ),
        ("call vmgm fpc;", [Illegal(NO_CALL), Illegal(NO_CALL), Emits(Instruction::call_ss(SystemSpace::FirstPlay, 0))]),
        (
            "jump fpc;",
            [
                Illegal("VMGM must be specified with FPC"),
                Illegal("VMGM must be specified with FPC"),
                Illegal("VMGM must be specified with FPC"),
            ],
        ),
        (
            "jump vmgm menu;",
            [
                Emits(Instruction::link_pgcn(1)),
                Emits(Instruction::jump_ss(SystemSpace::VmgmMenu(MenuEntry::Title.id()))),
                Illegal(NO_MENU_JUMP),
            ],
        ),
        (
            "jump vmgm menu 2;",
            [
                Emits(Instruction::link_pgcn(2)),
                Emits(Instruction::jump_ss(SystemSpace::VmgmPgc(2))),
                Illegal(NO_MENU_JUMP),
            ],
        ),
        (
            "call vmgm menu 2;",
            [Illegal(NO_CALL), Illegal(NO_CALL), Emits(Instruction::call_ss(SystemSpace::VmgmPgc(2), 0))],
        ),
        (
            "jump titleset 1 menu entry audio;",
            [Emits(Instruction::jump_ss(vtsm_audio)), Emits(Instruction::link_pgcn(2)), Illegal(NO_MENU_JUMP)],
        ),
        (
            "jump titleset 1 menu 3;",
            [
                Illegal("cannot jump to a titleset menu by number from the VMGM"),
                Emits(Instruction::link_pgcn(3)),
                Illegal(NO_MENU_JUMP),
            ],
        ),
        (
            "jump titleset 2 menu 1;",
            [
                Illegal("cannot jump to a titleset menu by number from the VMGM"),
                Illegal("cannot jump to another titleset's menu"),
                Illegal(NO_MENU_JUMP),
            ],
        ),
        ("call menu entry audio;", [Illegal(NO_CALL), Illegal(NO_CALL), Emits(Instruction::call_ss(own_audio, 0))]),
        (
            "call titleset 1 menu 2;",
            [Illegal(NO_CALL), Illegal(NO_CALL), Illegal("cannot call a titleset menu by number")],
        ),
        (
            "call titleset 2 menu entry root;",
            [Illegal(NO_CALL), Illegal(NO_CALL), Illegal("cannot call another titleset's menu")],
        ),
        (
            "jump vmgm title 3;",
            [
                Emits(Instruction::jump_tt(3)),
                Emits(Instruction::jump_tt(3)),
                Emits(Instruction::jump_tt(3)),
            ],
        ),
        (
            "jump title 2;",
            [
                Emits(Instruction::jump_tt(2)),
                Emits(Instruction::jump_vts_tt(2)),
                Emits(Instruction::jump_vts_tt(2)),
            ],
        ),
        (
            "jump title 1 chapter 2;",
            [
                Illegal("cannot jump to a chapter of a title in another domain"),
                Emits(Instruction::jump_vts_ptt(1, 2)),
                Emits(Instruction::jump_vts_ptt(1, 2)),
            ],
        ),
        ("call title 1;", [Illegal(NO_CALL), Illegal(NO_CALL), Illegal(NO_LOCAL_CALL)]),
        (
            "jump chapter 2;",
            [
                Illegal("cannot jump to a chapter within a menu"),
                Illegal("cannot jump to a chapter within a menu"),
                Emits(Instruction::link_pttn(2, 0)),
            ],
        ),
        (
            "jump program 2;",
            [
                Emits(Instruction::link_pgn(2, 0)),
                Emits(Instruction::link_pgn(2, 0)),
                Emits(Instruction::link_pgn(2, 0)),
            ],
        ),
        ("call cell 1;", [Illegal(NO_CALL), Illegal(NO_CALL), Illegal(NO_LOCAL_CALL)]),
    ];
    for (source, row) in &table {
        let program = dvdcmd::parse(source).unwrap();
        for (location, expect) in contexts.iter().zip(row) {
            let result = compile_unoptimized(&program, location, &workset, &CompilerOptions::default());
            match (expect, result) {
                (Emits(ins), Ok(block)) => assert_eq!(block.instructions, vec![*ins], "{source} in {location:?}"),
                (Illegal(message), Err(e)) => {
                    assert_eq!(e.kind, ErrorKind::IllegalTransfer(*message), "{source} in {location:?}")
                }
                (Emits(_), Err(e)) => panic!("{source} in {location:?}: unexpected error {e}"),
                (Illegal(message), Ok(block)) => {
                    panic!("{source} in {location:?}: expected '{message}', got {:?}", block.instructions)
                }
            }
        }
    }
}

#[test]
fn jumppad_fills_the_gaps() {
    let workset = disc();
    let options = CompilerOptions { jumppad: true, ..CompilerOptions::default() };
    let cases = [
        ("jump titleset 1 menu 3;", vmgm()),
        ("jump titleset 2 menu 1;", Location::new(Domain::Vtsm(1))),
        ("call titleset 1 menu 2;", title_domain()),
        ("call titleset 2 menu entry root;", title_domain()),
        ("jump title 1 chapter 2;", vmgm()),
    ];
    for (source, location) in cases {
        let program = dvdcmd::parse(source).unwrap();
        let code = compile_unoptimized(&program, &location, &workset, &options).unwrap().instructions;
        let mut m = Machine::new();
        let outcome = m.run(&code).unwrap();
        assert_ne!(m.gprm[15], 0, "{source}");
        assert!(matches!(outcome, Outcome::Transfer(_)), "{source}: {outcome:?}");
    }
}

// --- Budget ---

#[test]
fn budget_is_a_hard_limit() {
    let options = CompilerOptions::default();
    for (count, ok) in [(127, true), (128, true), (129, false), (200, false)] {
        let source = "g0 += 1; ".repeat(count);
        let program = dvdcmd::parse(&source).unwrap();
        let result = compile_block(&program, &vmgm(), &Workset::default(), &options);
        match result {
            Ok(block) => {
                assert!(ok, "{count} instructions accepted");
                assert_eq!(block.len(), count);
            }
            Err(e) => {
                assert!(!ok, "{count} instructions rejected: {e}");
                assert_eq!(e.kind, ErrorKind::TooManyInstructions { count, limit: 128 });
            }
        }
    }
}

// --- End to end ---

#[test]
fn scenario_assignments() {
    let block = dvdcmd::compile("g1 = 3; g2 = g1 + 4;", &vmgm(), &Workset::default(), &CompilerOptions::default())
        .unwrap();
    let mut m = Machine::new();
    assert_eq!(m.run(&block.instructions).unwrap(), Outcome::End);
    assert_eq!((m.gprm[1], m.gprm[2]), (3, 7));
}

#[test]
fn scenario_conditional_jump() {
    let workset = Workset { titlesets: vec![Titleset::with_titles(&[1, 1])], ..Workset::default() };
    let options = CompilerOptions::default();

    // Register compares fit the jump's own comparison fields.
    let block = dvdcmd::compile("if (g0 == g1) { jump title 2; } jump title 1;", &vmgm(), &workset, &options).unwrap();
    assert_eq!(block.len(), 2);
    assert!(block.instructions[0].is_conditional());
    for (g0, title) in [(0, 2), (5, 1)] {
        let mut m = Machine::new();
        m.gprm[0] = g0;
        assert_eq!(m.run(&block.instructions).unwrap(), Outcome::Transfer(Transfer::Jump(Jump::Title(title))));
    }

    // Immediate compares do not: the branch stays.
    let block = dvdcmd::compile("if (g0 == 1) { jump title 2; } jump title 1;", &vmgm(), &workset, &options).unwrap();
    assert_eq!(block.len(), 3);
    assert_eq!(block.instructions[1], Instruction::jump_tt(2));
    assert_eq!(block.instructions[2], Instruction::jump_tt(1));
}

#[test]
fn scenario_empty_block() {
    let program = dvdcmd::parse("").unwrap();
    assert_eq!(program.statements.len(), 1);
    let raw = compiler::compile_unoptimized(&program, &vmgm(), &Workset::default(), &CompilerOptions::default())
        .unwrap();
    assert_eq!(raw.instructions, vec![Instruction::NOP]);
    let block = dvdcmd::compile("  \n", &vmgm(), &Workset::default(), &CompilerOptions::default()).unwrap();
    assert!(block.is_empty());
}
