//! Register-specifier states and the register commands
//!
//! Commands taking a register run the specifier machine first; once the
//! name is complete the command's action fires (or, for `EQ`, `^U`, `EU`
//! and `E%`, the register is remembered and a string state follows).

use crate::buffers::registers::RegAddr;
use crate::interpreter::constants::TecoInt;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::parser::strings::RegSpecMachine;
use crate::parser::{Mode, RegCmd, State};
use crate::undo::UndoOp;

/// The state a register command continues in when execution is suppressed.
fn reg_cmd_next(cmd: RegCmd) -> State {
    match cmd {
        RegCmd::Edit => State::LoadReg,
        RegCmd::SetString { building } => State::SetRegString { building },
        RegCmd::SaveFile => State::SaveRegFile,
        _ => State::Start,
    }
}

impl Interpreter {
    pub(crate) fn state_expect_reg(&mut self, cmd: RegCmd, chr: u8) -> Result<State> {
        if chr == 0 {
            return Ok(State::ExpectReg(cmd));
        }

        self.undo.push(UndoOp::RegSpec(self.regspec.clone()));
        let Some((local, name)) = self.regspec.input(chr)? else {
            return Ok(State::ExpectReg(cmd));
        };
        self.regspec = RegSpecMachine::new();

        if self.mode != Mode::Normal {
            return Ok(reg_cmd_next(cmd));
        }
        let addr = self.resolve_reg(RegAddr { local, name })?;
        self.got_register(cmd, addr)
    }

    fn got_register(&mut self, cmd: RegCmd, addr: RegAddr) -> Result<State> {
        match cmd {
            RegCmd::Push => {
                self.reg_stack_push(&addr);
            }
            RegCmd::Pop => {
                self.reg_stack_pop(&addr)?;
            }
            RegCmd::GetString => {
                let s = self.reg_get_string(&addr);
                self.exec_insert(&s);
            }
            RegCmd::Query => {
                self.eval_exprs()?;
                let v = self.reg_get_integer(&addr);
                self.push_num(v);
            }
            RegCmd::SetInteger => {
                let v = self.pop_num_calc_implied()?;
                self.reg_set_integer(&addr, v);
            }
            RegCmd::Increase => {
                let n = self.pop_num_calc_implied()?;
                let v = self.reg_get_integer(&addr).wrapping_add(n);
                self.reg_set_integer(&addr, v);
                self.push_num(v);
            }
            RegCmd::Macro => {
                // colon-modified macros share the caller's locals
                let locals = !self.eval_colon();
                self.reg_execute(&addr, locals)?;
            }
            RegCmd::CopyTo => {
                self.exec_copy_to_reg(&addr)?;
            }
            RegCmd::Edit | RegCmd::SetString { .. } | RegCmd::SaveFile => {
                self.undo.push(UndoOp::RegArgument(self.reg_argument.clone()));
                self.reg_argument = Some(addr);
                return Ok(reg_cmd_next(cmd));
            }
        }
        Ok(State::Start)
    }

    /// `Xq`: copy lines or an absolute range into the register; the colon
    /// modifier appends instead of replacing.
    fn exec_copy_to_reg(&mut self, addr: &RegAddr) -> Result<()> {
        self.eval_exprs()?;

        let (from, len);
        if self.exprs.args() <= 1 {
            let pos = self.view.pos() as TecoInt;
            let line =
                self.view.line_from_position(pos as usize) as TecoInt + self.pop_num_calc_implied()?;
            if !self.validate_line(line) {
                return Err(Error::new(ErrorKind::Range {
                    cmd: "X".to_string(),
                }));
            }
            let target = self.view.position_from_line(line as usize) as TecoInt;
            if target < pos {
                from = target;
                len = pos - target;
            } else {
                from = pos;
                len = target - pos;
            }
        } else {
            let to = self.pop_num()?;
            let start = self.pop_num()?;
            if to < start || !self.validate_pos(start) || !self.validate_pos(to) {
                return Err(Error::new(ErrorKind::Range {
                    cmd: "X".to_string(),
                }));
            }
            from = start;
            len = to - start;
        }

        let text = self.view.text_range(from as usize, len as usize);
        if self.eval_colon() {
            self.reg_append_string(addr, &text);
        } else {
            self.reg_set_string(addr, &text);
        }
        Ok(())
    }
}
