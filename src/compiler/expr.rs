//! Value expressions into chains of register set operations.
//!
//! Every set command is `target op= source` with a literal or register
//! source, so an expression is evaluated into its target register one
//! operand at a time. Operands that are not plain values are computed into
//! a scratch register first.

use super::{BlockCompiler, Result};
use crate::ast::{AssocOp, BinaryOp, Expr};
use crate::instruction::{Instruction, Operand, Reg, SetOp};

impl From<AssocOp> for SetOp {
    fn from(op: AssocOp) -> SetOp {
        match op {
            AssocOp::Add => SetOp::Add,
            AssocOp::Mul => SetOp::Mul,
            AssocOp::And => SetOp::And,
            AssocOp::Or => SetOp::Or,
            AssocOp::Xor => SetOp::Xor,
        }
    }
}

impl From<BinaryOp> for SetOp {
    fn from(op: BinaryOp) -> SetOp {
        match op {
            BinaryOp::Sub => SetOp::Sub,
            BinaryOp::Div => SetOp::Div,
            BinaryOp::Mod => SetOp::Mod,
        }
    }
}

fn is_reg(expr: &Expr, reg: Reg) -> bool {
    matches!(expr, Expr::Val(Operand::Reg(r)) if *r == reg)
}

/// Operand to evaluate into the target first: the target itself (costs
/// nothing), else the one operand that needs the target's old value, else
/// a compound operand (it can be built in place instead of in a scratch
/// register), else the first.
fn pick_first(target: Reg, operands: &[Expr]) -> usize {
    if let Some(i) = operands.iter().position(|e| is_reg(e, target)) {
        return i;
    }
    let mut readers = operands.iter().enumerate().filter(|(_, e)| e.reads(target));
    if let (Some((i, _)), None) = (readers.next(), readers.next()) {
        return i;
    }
    operands.iter().position(|e| !e.is_val()).unwrap_or(0)
}

impl BlockCompiler<'_> {
    /// Evaluates `expr` into general register `target`.
    pub(super) fn compile_expr(&mut self, target: u8, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Val(v) => {
                if *v != Operand::Reg(Reg::Gprm(target)) {
                    self.emit(Instruction::set(SetOp::Mov, target, *v));
                }
                Ok(())
            }
            Expr::Random(range) => {
                let source = match range.as_ref() {
                    Expr::Val(v) => *v,
                    complex => {
                        self.compile_expr(target, complex)?;
                        Operand::Reg(Reg::Gprm(target))
                    }
                };
                self.emit(Instruction::set(SetOp::Rnd, target, source));
                Ok(())
            }
            Expr::Assoc { op, operands } => {
                let reg = Reg::Gprm(target);
                let first = pick_first(reg, operands);
                let clobbered = operands.iter().enumerate().any(|(i, e)| i != first && e.reads(reg));
                if clobbered {
                    return self.spill(target, expr);
                }
                match operands.get(first) {
                    Some(head) => self.compile_expr(target, head)?,
                    None => return Ok(()),
                }
                for (i, operand) in operands.iter().enumerate() {
                    if i != first {
                        self.fold(target, SetOp::from(*op), operand)?;
                    }
                }
                Ok(())
            }
            Expr::Binary { op, left, right } => {
                let reg = Reg::Gprm(target);
                if right.reads(reg) && !is_reg(left, reg) {
                    return self.spill(target, expr);
                }
                self.compile_expr(target, left)?;
                self.fold(target, SetOp::from(*op), right)
            }
        }
    }

    /// `target op= operand`, through a scratch register when `operand` is compound.
    fn fold(&mut self, target: u8, op: SetOp, operand: &Expr) -> Result<()> {
        match operand {
            Expr::Val(v) => {
                self.emit(Instruction::set(op, target, *v));
            }
            complex => {
                let scratch = self.next_target(Some(target))?;
                self.compile_expr(scratch, complex)?;
                self.emit(Instruction::set(op, target, Operand::Reg(Reg::Gprm(scratch))));
                self.release_scratch(scratch);
            }
        }
        Ok(())
    }

    /// Evaluates `expr` in a scratch register and moves the result, for
    /// expressions that read the target after it has been overwritten.
    fn spill(&mut self, target: u8, expr: &Expr) -> Result<()> {
        let scratch = self.next_target(Some(target))?;
        self.compile_expr(scratch, expr)?;
        self.emit(Instruction::set(SetOp::Mov, target, Operand::Reg(Reg::Gprm(scratch))));
        self.release_scratch(scratch);
        Ok(())
    }
}
