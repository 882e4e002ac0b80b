//! Expression stack
//!
//! Arithmetic in the command language is a stack of signed 64-bit integers
//! interleaved with pending operators and three kinds of structural markers:
//!
//! - [`Entry::New`]: argument separator, pushed by `,` and by aggregating
//!   loop ends. Digits never merge across it; `args()` looks through it.
//! - [`Entry::Brace`]: opened by `(`, closed by `)`.
//! - [`Entry::Loop`]: the implicit barrier a non-pass-through loop start
//!   places so the body cannot see outer arguments.
//!
//! Evaluation is strictly left to right: `push_calc` folds every pending
//! operator above the top-most barrier before appending the next one, and
//! `eval_exprs` folds the rest. `eval_exprs` is idempotent.
//!
//! All mutations go through journaled wrappers on [`Interpreter`] so that a
//! rubbed-out character restores the stack exactly.

use crate::interpreter::constants::TecoInt;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, Result};
use crate::undo::UndoOp;

/// Binary operators of the command language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    Xor,
}

impl Op {
    fn apply(self, a: TecoInt, b: TecoInt) -> Result<TecoInt> {
        Ok(match self {
            Op::Add => a.wrapping_add(b),
            Op::Sub => a.wrapping_sub(b),
            Op::Mul => a.wrapping_mul(b),
            Op::Div => {
                if b == 0 {
                    return Err(Error::failed("Division by zero"));
                }
                a.wrapping_div(b)
            }
            Op::Mod => {
                if b == 0 {
                    return Err(Error::failed("Remainder of division by zero"));
                }
                a.wrapping_rem(b)
            }
            Op::Pow => pow(a, b),
            Op::And => a & b,
            Op::Or => a | b,
            Op::Xor => a ^ b,
        })
    }
}

fn pow(base: TecoInt, exp: TecoInt) -> TecoInt {
    if exp < 0 {
        return match base {
            1 => 1,
            -1 if exp & 1 == 0 => 1,
            -1 => -1,
            _ => 0,
        };
    }
    base.wrapping_pow((exp as u64).min(u32::MAX as u64) as u32)
}

/// One slot of the expression stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    Int(TecoInt),
    Op(Op),
    New,
    Brace,
    Loop,
}

impl Entry {
    fn is_barrier(self) -> bool {
        matches!(self, Entry::Brace | Entry::Loop)
    }
}

/// The stack plus the arithmetic context (sign prefix, radix, brace depth).
#[derive(Debug)]
pub struct ExpressionStack {
    pub(crate) entries: Vec<Entry>,
    /// Pending unary sign: -1 after a `-` that had nothing to subtract.
    pub(crate) num_sign: TecoInt,
    pub(crate) radix: TecoInt,
    pub(crate) brace_level: u32,
}

impl ExpressionStack {
    pub fn new() -> Self {
        ExpressionStack {
            entries: Vec::new(),
            num_sign: 1,
            radix: 10,
            brace_level: 0,
        }
    }

    pub fn num_sign(&self) -> TecoInt {
        self.num_sign
    }

    pub fn radix(&self) -> TecoInt {
        self.radix
    }

    pub fn brace_level(&self) -> u32 {
        self.brace_level
    }

    /// Number of integers above the top-most barrier. Interior argument
    /// separators are looked through (`1,2` offers two arguments), but a
    /// trailing separator seals the list: values an aggregating loop end
    /// has set aside are not arguments to the next iteration.
    pub fn args(&self) -> usize {
        if matches!(self.entries.last(), Some(Entry::New)) {
            return 0;
        }
        let mut count = 0;
        for entry in self.entries.iter().rev() {
            match entry {
                Entry::Int(_) => count += 1,
                Entry::New => {}
                _ => break,
            }
        }
        count
    }

    /// The `depth`-th integer from the top (0 is the top), under the same
    /// visibility rule as [`args`](Self::args).
    pub fn peek_num(&self, depth: usize) -> Option<TecoInt> {
        if matches!(self.entries.last(), Some(Entry::New)) {
            return None;
        }
        let mut seen = 0;
        for entry in self.entries.iter().rev() {
            match entry {
                Entry::Int(n) => {
                    if seen == depth {
                        return Some(*n);
                    }
                    seen += 1;
                }
                Entry::New => {}
                _ => break,
            }
        }
        None
    }

    /// The integers above the top-most barrier, bottom first. Used by tests
    /// and by commands that consume their whole argument list.
    pub fn numbers(&self) -> Vec<TecoInt> {
        let mut nums = Vec::new();
        for entry in self.entries.iter().rev() {
            match entry {
                Entry::Int(n) => nums.push(*n),
                Entry::New => {}
                _ => break,
            }
        }
        nums.reverse();
        nums
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integer formatted in the current radix, upper case.
    pub fn format(&self, v: TecoInt) -> String {
        let radix = self.radix as u64;
        let mut out = String::new();
        let (neg, mut rest) = (v < 0, v.unsigned_abs());
        let mut digits = Vec::new();
        while rest > 0 {
            let d = (rest % radix) as u8;
            digits.push(if d < 10 { b'0' + d } else { b'A' + d - 10 });
            rest /= radix;
        }
        if digits.is_empty() {
            digits.push(b'0');
        }
        if neg {
            out.push('-');
        }
        for &d in digits.iter().rev() {
            out.push(d as char);
        }
        out
    }
}

impl Default for ExpressionStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of an alphanumeric digit (0-9, A-Z).
pub fn digit_value(chr: u8) -> TecoInt {
    let upper = chr.to_ascii_uppercase();
    match upper {
        b'0'..=b'9' => (upper - b'0') as TecoInt,
        b'A'..=b'Z' => (upper - b'A' + 10) as TecoInt,
        _ => 0,
    }
}

impl Interpreter {
    // --- journaled primitives ---

    pub(crate) fn expr_push_entry(&mut self, entry: Entry) {
        self.exprs.entries.push(entry);
        self.undo.push(UndoOp::ExprPop);
    }

    pub(crate) fn expr_pop_entry(&mut self) -> Option<Entry> {
        let entry = self.exprs.entries.pop()?;
        self.undo.push(UndoOp::ExprPush(entry));
        Some(entry)
    }

    pub(crate) fn push_num(&mut self, v: TecoInt) {
        self.expr_push_entry(Entry::Int(v));
    }

    /// Pop the top integer. The separator between it and the next argument
    /// is consumed along with it, so `1,2` pops as 2 then 1.
    pub(crate) fn pop_num(&mut self) -> Result<TecoInt> {
        let Some(Entry::Int(_)) = self.exprs.entries.last() else {
            return Err(Error::failed("Too few arguments"));
        };
        let Some(Entry::Int(n)) = self.expr_pop_entry() else {
            unreachable!()
        };
        if matches!(self.exprs.entries.last(), Some(Entry::New)) {
            self.expr_pop_entry();
        }
        Ok(n)
    }

    pub(crate) fn set_num_sign(&mut self, sign: TecoInt) {
        if self.exprs.num_sign != sign {
            self.undo.push(UndoOp::NumSign(self.exprs.num_sign));
            self.exprs.num_sign = sign;
        }
    }

    pub(crate) fn set_radix(&mut self, radix: TecoInt) -> Result<()> {
        if !(2..=36).contains(&radix) {
            return Err(Error::failed(format!("Invalid radix {}", radix)));
        }
        self.undo.push(UndoOp::Radix(self.exprs.radix));
        self.exprs.radix = radix;
        Ok(())
    }

    // --- arithmetic ---

    /// Append one digit to the number under construction. Digits merge only
    /// while an uninterrupted digit run is in progress: `12` is twelve,
    /// `1 2` is two arguments.
    pub(crate) fn add_digit(&mut self, chr: u8) -> Result<()> {
        let n = if self.digit_run { self.pop_num()? } else { 0 };
        let radix = self.exprs.radix;
        let v = n
            .wrapping_mul(radix)
            .wrapping_add(self.exprs.num_sign.wrapping_mul(digit_value(chr)));
        self.push_num(v);
        Ok(())
    }

    /// Fold every completed operator application above the top barrier.
    ///
    /// Operators complete in two shapes: infix, where the operator sits
    /// between its operands (`2+3`), and postfix, where both operands were
    /// already on the stack when the operator arrived (`1 2 +`). A lone
    /// operand applies the operator to an implied 0.
    pub(crate) fn eval_exprs(&mut self) -> Result<()> {
        loop {
            let entries = &self.exprs.entries;
            let n = entries.len();
            let at = |i: usize| entries.get(n.wrapping_sub(i)).copied();
            let boundary = |e: Option<Entry>| {
                matches!(e, None | Some(Entry::New | Entry::Brace | Entry::Loop))
            };

            match (at(3), at(2), at(1)) {
                // infix: a op b
                (Some(Entry::Int(_)), Some(Entry::Op(_)), Some(Entry::Int(_))) => {
                    let Some(Entry::Int(b)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    let Some(Entry::Op(op)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    let Some(Entry::Int(a)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    self.push_num(op.apply(a, b)?);
                }
                // postfix: a b op
                (Some(Entry::Int(_)), Some(Entry::Int(_)), Some(Entry::Op(_))) => {
                    let Some(Entry::Op(op)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    let Some(Entry::Int(b)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    let Some(Entry::Int(a)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    self.push_num(op.apply(a, b)?);
                }
                // a single operand: the other side is an implied 0
                (lead, Some(Entry::Op(_)), Some(Entry::Int(_))) if boundary(lead) => {
                    let Some(Entry::Int(b)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    let Some(Entry::Op(op)) = self.expr_pop_entry() else {
                        unreachable!()
                    };
                    self.push_num(op.apply(0, b)?);
                }
                // a trailing operator stays pending until its operand turns up
                _ => return Ok(()),
            }
        }
    }

    /// Fold pending applications, then push `op` for the next operand.
    pub(crate) fn push_calc(&mut self, op: Op) -> Result<()> {
        self.eval_exprs()?;
        self.expr_push_entry(Entry::Op(op));
        Ok(())
    }

    /// Pop the top integer after evaluation, or substitute `default * sign`
    /// if no argument is present. Consumes the pending unary sign.
    pub(crate) fn pop_num_calc(&mut self, default: TecoInt, sign: TecoInt) -> Result<TecoInt> {
        self.eval_exprs()?;
        if self.exprs.num_sign < 0 {
            self.set_num_sign(1);
        }
        if self.exprs.args() > 0 {
            self.pop_num()
        } else {
            Ok(default.wrapping_mul(sign))
        }
    }

    /// `pop_num_calc` with the conventional implied argument: 1, negated by
    /// a pending sign prefix.
    pub(crate) fn pop_num_calc_implied(&mut self) -> Result<TecoInt> {
        let sign = self.exprs.num_sign;
        self.pop_num_calc(1, sign)
    }

    /// Pop and discard every argument above the top barrier.
    pub(crate) fn discard_args(&mut self) -> Result<()> {
        self.eval_exprs()?;
        while matches!(
            self.exprs.entries.last(),
            Some(Entry::Int(_)) | Some(Entry::New)
        ) {
            self.expr_pop_entry();
        }
        Ok(())
    }

    // --- braces ---

    pub(crate) fn brace_open(&mut self, marker: Entry) {
        debug_assert!(marker.is_barrier());
        self.expr_push_entry(marker);
        self.undo.push(UndoOp::BraceLevel(self.exprs.brace_level));
        self.exprs.brace_level += 1;
    }

    /// Close the innermost barrier, keeping the values above it.
    pub(crate) fn brace_close(&mut self, marker: Entry) -> Result<()> {
        debug_assert!(marker.is_barrier());
        self.eval_exprs()?;
        let mut kept = Vec::new();
        loop {
            match self.exprs.entries.last().copied() {
                Some(e @ (Entry::Int(_) | Entry::New)) => {
                    self.expr_pop_entry();
                    kept.push(e);
                }
                Some(e) if e == marker => {
                    self.expr_pop_entry();
                    break;
                }
                _ => {
                    return Err(Error::failed(match marker {
                        Entry::Brace => "Missing opening brace",
                        _ => "Loop end without corresponding loop start",
                    }));
                }
            }
        }
        for e in kept.into_iter().rev() {
            self.expr_push_entry(e);
        }
        self.undo.push(UndoOp::BraceLevel(self.exprs.brace_level));
        self.exprs.brace_level -= 1;
        Ok(())
    }

    /// Collapse barriers down to `level`, retaining only the top `keep`
    /// integers. Used when a macro returns from within braces or loops.
    pub(crate) fn brace_return(&mut self, level: u32, keep: usize) -> Result<()> {
        self.eval_exprs()?;
        let mut kept = Vec::new();
        for _ in 0..keep.min(self.exprs.args()) {
            kept.push(self.pop_num()?);
        }
        while self.exprs.brace_level > level {
            loop {
                match self.exprs.entries.last().copied() {
                    Some(e) if e.is_barrier() => {
                        self.expr_pop_entry();
                        break;
                    }
                    Some(_) => {
                        self.expr_pop_entry();
                    }
                    None => break,
                }
            }
            self.undo.push(UndoOp::BraceLevel(self.exprs.brace_level));
            self.exprs.brace_level -= 1;
        }
        for n in kept.into_iter().rev() {
            self.push_num(n);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;

    #[test]
    fn test_left_to_right_evaluation() {
        let mut interp = Interpreter::new();
        interp.push_num(2);
        interp.push_calc(Op::Add).unwrap();
        interp.push_num(3);
        interp.push_calc(Op::Mul).unwrap();
        interp.push_num(4);
        interp.eval_exprs().unwrap();
        // (2 + 3) * 4, not 2 + (3 * 4)
        assert_eq!(interp.exprs.numbers(), vec![20]);
    }

    #[test]
    fn test_eval_idempotent() {
        let mut interp = Interpreter::new();
        interp.push_num(1);
        interp.push_calc(Op::Add).unwrap();
        interp.push_num(2);
        interp.eval_exprs().unwrap();
        let snapshot = interp.exprs.numbers();
        interp.eval_exprs().unwrap();
        assert_eq!(interp.exprs.numbers(), snapshot);
    }

    #[test]
    fn test_args_sees_through_separators() {
        let mut interp = Interpreter::new();
        interp.push_num(1);
        interp.expr_push_entry(Entry::New);
        interp.push_num(2);
        assert_eq!(interp.exprs.args(), 2);
        assert_eq!(interp.pop_num().unwrap(), 2);
        assert_eq!(interp.pop_num().unwrap(), 1);
    }

    #[test]
    fn test_pop_num_calc_implied_sign() {
        let mut interp = Interpreter::new();
        interp.set_num_sign(-1);
        assert_eq!(interp.pop_num_calc_implied().unwrap(), -1);
        // the sign prefix was consumed
        assert_eq!(interp.exprs.num_sign(), 1);
        assert_eq!(interp.pop_num_calc_implied().unwrap(), 1);
    }

    #[test]
    fn test_brace_keeps_values() {
        let mut interp = Interpreter::new();
        interp.push_num(7);
        interp.brace_open(Entry::Brace);
        interp.push_num(1);
        interp.expr_push_entry(Entry::New);
        interp.push_num(2);
        interp.brace_close(Entry::Brace).unwrap();
        assert_eq!(interp.exprs.numbers(), vec![7, 1, 2]);
        assert_eq!(interp.exprs.brace_level(), 0);
    }

    #[test]
    fn test_brace_return_keeps_top() {
        let mut interp = Interpreter::new();
        interp.push_num(9);
        interp.brace_open(Entry::Brace);
        interp.push_num(1);
        interp.brace_open(Entry::Loop);
        interp.push_num(2);
        interp.push_num(3);
        interp.brace_return(0, 1).unwrap();
        assert_eq!(interp.exprs.brace_level(), 0);
        assert_eq!(interp.exprs.numbers(), vec![9, 3]);
    }

    #[test]
    fn test_division_by_zero() {
        let mut interp = Interpreter::new();
        interp.push_num(4);
        interp.push_calc(Op::Div).unwrap();
        interp.push_num(0);
        assert!(interp.eval_exprs().is_err());
    }

    #[test]
    fn test_format_radix() {
        let mut stack = ExpressionStack::new();
        stack.radix = 16;
        assert_eq!(stack.format(255), "FF");
        assert_eq!(stack.format(-16), "-10");
        stack.radix = 8;
        assert_eq!(stack.format(9), "11");
        assert_eq!(stack.format(0), "0");
    }
}
