//! Conditions into conditional gotos.
//!
//! A condition is compiled against two instruction indices: where control
//! continues when it holds and where it continues otherwise. A comparison
//! is one conditional goto when either index is the fall-through, two
//! otherwise. `&&` and `||` chain their terms through each other's
//! fall-through, so each non-final term is laid out by relaxation.
//!
//! Comparison sides are never computed into g15, so no branch leaves it
//! holding a value.

use super::{BlockCompiler, Result};
use crate::ast::{Cond, Expr};
use crate::instruction::{CmpOp, Condition, GPRM_COUNT, Instruction, Operand, Reg, SetOp};

impl BlockCompiler<'_> {
    /// Emits code that continues at `iftrue` when `cond` holds and at
    /// `iffalse` when it does not. `next` is the index just past the emitted
    /// code, as guessed by the enclosing layout.
    pub(super) fn cond_at(&mut self, cond: &Cond, iftrue: usize, iffalse: usize, next: usize) -> Result<()> {
        match cond {
            Cond::Compare { op, left, right } => {
                let test = self.compare_operands(*op, left, right)?;
                self.branch(test, iftrue, iffalse, next)
            }
            Cond::Not(inner) => self.cond_at(inner, iffalse, iftrue, next),
            Cond::And(terms) => {
                let Some((last, init)) = terms.split_last() else {
                    return self.goto_unless_next(iftrue, next);
                };
                for term in init {
                    self.relax("&&", |c, after| c.cond_at(term, after, iffalse, after))?;
                }
                self.cond_at(last, iftrue, iffalse, next)
            }
            Cond::Or(terms) => {
                let Some((last, init)) = terms.split_last() else {
                    return self.goto_unless_next(iffalse, next);
                };
                for term in init {
                    self.relax("||", |c, after| c.cond_at(term, iftrue, after, after))?;
                }
                self.cond_at(last, iftrue, iffalse, next)
            }
        }
    }

    /// Reduces both sides of a comparison to the `register op operand` shape
    /// every command encodes, computing compound sides into scratch registers
    /// and swapping the sides when only the right one is a register.
    fn compare_operands(&mut self, op: CmpOp, left: &Expr, right: &Expr) -> Result<Condition> {
        self.reading(&[left, right], |c| {
            let mut used = None;
            let lhs = c.comparison_side(left, &mut used)?;
            let rhs = c.comparison_side(right, &mut used)?;
            match (lhs, rhs) {
                (Operand::Reg(lhs), rhs) => Ok(Condition { op, lhs, rhs }),
                (Operand::Imm(v), Operand::Reg(r)) => Ok(Condition { op: op.mirror(), lhs: r, rhs: Operand::Imm(v) }),
                (Operand::Imm(v), rhs) => {
                    let t = c.scratch_below(used, GPRM_COUNT - 1)?;
                    c.emit(Instruction::set(SetOp::Mov, t, Operand::Imm(v)));
                    Ok(Condition { op, lhs: Reg::Gprm(t), rhs })
                }
            }
        })
    }

    fn comparison_side(&mut self, side: &Expr, used: &mut Option<u8>) -> Result<Operand> {
        match side {
            Expr::Val(v) => Ok(*v),
            complex => {
                let t = self.scratch_below(*used, GPRM_COUNT - 1)?;
                self.compile_expr(t, complex)?;
                *used = Some(t);
                Ok(Operand::Reg(Reg::Gprm(t)))
            }
        }
    }

    /// Conditional goto sequence for one comparison. The taken branch always
    /// goes to an explicit line and the other outcome falls through.
    fn branch(&mut self, test: Condition, iftrue: usize, iffalse: usize, next: usize) -> Result<()> {
        if iftrue == iffalse {
            return self.goto_unless_next(iftrue, next);
        }
        if next == iftrue {
            if let Some(negated) = test.negate() {
                let line = self.line(iffalse)?;
                self.emit(Instruction::branch(negated, line));
                return Ok(());
            }
        }
        let line = self.line(iftrue)?;
        self.emit(Instruction::branch(test, line));
        self.goto_unless_next(iffalse, next)
    }

    fn goto_unless_next(&mut self, target: usize, next: usize) -> Result<()> {
        if target == next {
            return Ok(());
        }
        self.emit_goto(target)
    }
}
