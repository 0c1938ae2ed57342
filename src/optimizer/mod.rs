//! Peephole rewrites over a finished command block.
//!
//! Rules are tried at every position from the top; as soon as one fires the
//! scan starts over, so a rewrite that enables another rule earlier in the
//! block is always picked up. No rule adds commands.
//!
//! Commands address each other by 1-based line number. Deleting a command
//! renumbers every goto that points past it.

use crate::instruction::{Family, Instruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// `if (c) goto +2; x` becomes `if (!c) x` when `x` can carry the comparison.
    BranchOverOne,
    DeadNop,
    /// Unreferenced command after an unconditional transfer.
    DeadCode,
    MergeStreams,
    MergeButton,
    MergeSetLink,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Rule::BranchOverOne => "branch-over-one",
            Rule::DeadNop => "dead-nop",
            Rule::DeadCode => "dead-code",
            Rule::MergeStreams => "merge-streams",
            Rule::MergeButton => "merge-button",
            Rule::MergeSetLink => "merge-set-link",
        })
    }
}

const RULES: [Rule; 6] = [
    Rule::BranchOverOne,
    Rule::DeadNop,
    Rule::DeadCode,
    Rule::MergeStreams,
    Rule::MergeButton,
    Rule::MergeSetLink,
];

/// Rewrites `code` until no rule applies.
pub fn optimize(code: &mut Vec<Instruction>) {
    let before = code.len();
    let mut fired = 0usize;
    'again: loop {
        for i in 0..code.len() {
            for rule in RULES {
                if apply(rule, code, i) {
                    log::debug!("optimizer: {rule} at line {}", i + 1);
                    fired += 1;
                    continue 'again;
                }
            }
        }
        break;
    }
    if fired > 0 {
        log::debug!("optimizer: {fired} rewrites, {before} -> {} commands", code.len());
    }
}

/// Number of gotos targeting the command at `index`.
fn references(code: &[Instruction], index: usize) -> usize {
    code.iter().filter(|ins| ins.goto_line().map(usize::from) == Some(index + 1)).count()
}

/// Removes the command at `index`. Gotos aimed at it now reach its successor.
fn delete(code: &mut Vec<Instruction>, index: usize) {
    code.remove(index);
    for ins in code.iter_mut() {
        if let Some(line) = ins.goto_line() {
            if usize::from(line) > index + 1 {
                ins.set_goto_line(line - 1);
            }
        }
    }
}

fn apply(rule: Rule, code: &mut Vec<Instruction>, i: usize) -> bool {
    match rule {
        Rule::BranchOverOne => branch_over_one(code, i),
        Rule::DeadNop => dead_nop(code, i),
        Rule::DeadCode => dead_code(code, i),
        Rule::MergeStreams => merge_streams(code, i),
        Rule::MergeButton => merge_button(code, i),
        Rule::MergeSetLink => merge_set_link(code, i),
    }
}

fn branch_over_one(code: &mut [Instruction], i: usize) -> bool {
    let branch = code[i];
    if !branch.is_conditional() || branch.goto_line().map(usize::from) != Some(i + 3) {
        return false;
    }
    let Some(next) = code.get(i + 1).copied() else {
        return false;
    };
    if references(code, i + 1) != 0 {
        return false;
    }
    let Some(negated) = branch.condition().and_then(|c| c.negate()) else {
        return false;
    };
    let Some(guarded) = next.with_condition(negated) else {
        return false;
    };
    code[i] = guarded;
    code[i + 1] = Instruction::NOP;
    true
}

fn dead_nop(code: &mut Vec<Instruction>, i: usize) -> bool {
    if !code[i].is_nop() {
        return false;
    }
    let last = i + 1 == code.len();
    if last && references(code, i) != 0 {
        return false;
    }
    delete(code, i);
    true
}

fn dead_code(code: &mut Vec<Instruction>, i: usize) -> bool {
    if i == 0 || !code[i - 1].transfers_unconditionally() || references(code, i) != 0 {
        return false;
    }
    delete(code, i);
    true
}

fn merge_streams(code: &mut Vec<Instruction>, i: usize) -> bool {
    let Some(second) = code.get(i + 1).copied() else {
        return false;
    };
    let first = code[i];
    if !first.is_stream_set() || !second.is_stream_set() || second.is_conditional() {
        return false;
    }
    let (a, b) = (first.bytes(), second.bytes());
    if a[0] != b[0] || a[1] != 0 || a[6] != 0 || a[7] != 0 || references(code, i + 1) != 0 {
        return false;
    }
    let mut merged = a;
    for k in 3..=5 {
        if b[k] != 0 {
            merged[k] = b[k];
        }
    }
    merged[1] = b[1];
    merged[6] = b[6];
    merged[7] = b[7];
    code[i] = Instruction::new(merged);
    delete(code, i + 1);
    true
}

fn merge_button(code: &mut Vec<Instruction>, i: usize) -> bool {
    let Some(value) = code[i].immediate_button() else {
        return false;
    };
    let Some(link) = code.get(i + 1).copied() else {
        return false;
    };
    if value % 1024 != 0 || link.family() != Family::Link || link.is_conditional() {
        return false;
    }
    let Ok(button) = u8::try_from(value >> 10) else {
        return false;
    };
    if references(code, i + 1) != 0 {
        return false;
    }
    let Some(merged) = link.with_link_button(button) else {
        return false;
    };
    code[i + 1] = merged;
    delete(code, i);
    true
}

fn merge_set_link(code: &mut Vec<Instruction>, i: usize) -> bool {
    let Some(link) = code.get(i + 1).copied() else {
        return false;
    };
    if references(code, i + 1) != 0 {
        return false;
    }
    let Some(merged) = code[i].with_link_from(&link) else {
        return false;
    };
    code[i] = merged;
    delete(code, i + 1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{CmpOp, Condition, LinkSub, Operand, Reg, SetOp};

    fn optimized(mut code: Vec<Instruction>) -> Vec<Instruction> {
        optimize(&mut code);
        code
    }

    fn regs_equal() -> Condition {
        Condition { op: CmpOp::Eq, lhs: Reg::Gprm(0), rhs: Operand::Reg(Reg::Gprm(1)) }
    }

    #[test]
    fn branch_over_one_folds_the_condition() {
        let skip = Condition { op: CmpOp::Ne, lhs: Reg::Gprm(0), rhs: Operand::Reg(Reg::Gprm(1)) };
        let code = vec![Instruction::branch(skip, 3), Instruction::jump_tt(2), Instruction::jump_tt(1)];
        let out = optimized(code);
        assert_eq!(out, vec![Instruction::jump_tt(2).with_condition(regs_equal()).unwrap(), Instruction::jump_tt(1)]);
    }

    #[test]
    fn branch_over_one_needs_a_carrier() {
        let skip = Condition { op: CmpOp::Ne, lhs: Reg::Gprm(0), rhs: Operand::Imm(1) };
        let code = vec![Instruction::branch(skip, 3), Instruction::jump_tt(2), Instruction::jump_tt(1)];
        assert_eq!(optimized(code.clone()), code);
    }

    #[test]
    fn branch_over_one_into_a_set() {
        let skip = Condition { op: CmpOp::Lt, lhs: Reg::Gprm(2), rhs: Operand::Imm(9) };
        let set = Instruction::set(SetOp::Add, 1, Operand::Imm(1));
        let out = optimized(vec![Instruction::branch(skip, 3), set, Instruction::exit()]);
        let expected = Condition { op: CmpOp::Ge, lhs: Reg::Gprm(2), rhs: Operand::Imm(9) };
        assert_eq!(out, vec![set.with_condition(expected).unwrap(), Instruction::exit()]);
    }

    #[test]
    fn nops_are_removed_and_gotos_renumbered() {
        let code = vec![Instruction::NOP, Instruction::goto(4), Instruction::NOP, Instruction::exit()];
        assert_eq!(optimized(code), vec![Instruction::goto(2), Instruction::exit()]);
    }

    #[test]
    fn referenced_trailing_nop_survives() {
        let cond = Condition { op: CmpOp::Eq, lhs: Reg::Gprm(0), rhs: Operand::Imm(5) };
        let code = vec![Instruction::branch(cond, 3), Instruction::jump_tt(2), Instruction::NOP];
        assert_eq!(optimized(code.clone()), code);
    }

    #[test]
    fn empty_block_after_lone_nop() {
        assert!(optimized(vec![Instruction::NOP]).is_empty());
    }

    #[test]
    fn dead_code_after_a_jump() {
        let code = vec![Instruction::jump_tt(1), Instruction::set(SetOp::Mov, 0, Operand::Imm(1)), Instruction::exit()];
        assert_eq!(optimized(code), vec![Instruction::jump_tt(1)]);
    }

    #[test]
    fn referenced_code_after_a_jump_stays() {
        let code = vec![Instruction::goto(3), Instruction::exit(), Instruction::break_block()];
        assert_eq!(optimized(code), vec![Instruction::goto(2), Instruction::break_block()]);
    }

    #[test]
    fn stream_sets_merge() {
        let code = vec![Instruction::set_stream(1, Operand::Imm(2)), Instruction::set_stream(2, Operand::Imm(5))];
        let out = optimized(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes(), [0x51, 0, 0, 0x82, 0x85, 0, 0, 0]);
    }

    #[test]
    fn stream_sets_of_different_modes_stay_apart() {
        let code = vec![
            Instruction::set_stream(1, Operand::Imm(2)),
            Instruction::set_stream(2, Operand::Reg(Reg::Gprm(4))),
        ];
        assert_eq!(optimized(code.clone()), code);
    }

    #[test]
    fn button_folds_into_link() {
        let code = vec![Instruction::set_button(Operand::Imm(3 * 1024)), Instruction::link_pgn(2, 0)];
        assert_eq!(optimized(code), vec![Instruction::link_pgn(2, 3)]);
        let code = vec![Instruction::set_button(Operand::Imm(3 * 1024)), Instruction::link_sub(LinkSub::None, 0)];
        assert_eq!(optimized(code)[0].link_button(), Some(3));
    }

    #[test]
    fn button_stays_before_pgcn_link() {
        let set = Instruction::set_button(Operand::Imm(1024));
        let out = optimized(vec![set, Instruction::link_pgcn(4)]);
        assert_eq!(out, vec![set.with_link_from(&Instruction::link_pgcn(4)).unwrap()]);
    }

    #[test]
    fn set_folds_into_link() {
        let set = Instruction::set(SetOp::Mov, 3, Operand::Imm(10));
        let out = optimized(vec![set, Instruction::link_cn(2, 0)]);
        assert_eq!(out.len(), 1);
        assert!(out[0].transfers_unconditionally());
    }

    #[test]
    fn idempotent_and_monotone() {
        let cond = Condition { op: CmpOp::Gt, lhs: Reg::Gprm(3), rhs: Operand::Reg(Reg::Gprm(4)) };
        let code = vec![
            Instruction::NOP,
            Instruction::branch(cond, 4),
            Instruction::set(SetOp::Mov, 1, Operand::Imm(1)),
            Instruction::goto(6),
            Instruction::set(SetOp::Mov, 1, Operand::Imm(2)),
            Instruction::set_stream(1, Operand::Imm(1)),
            Instruction::set_stream(3, Operand::Imm(2)),
            Instruction::jump_tt(1),
            Instruction::exit(),
        ];
        let once = optimized(code.clone());
        assert!(once.len() <= code.len());
        assert_eq!(optimized(once.clone()), once);
    }
}
