//! Caret commands, the ASCII query and the deferred escape
//!
//! `^x` commands arrive here either as real control codes or in up-arrow
//! notation. The escape state implements the lookahead for `$$`: a single
//! escape discards arguments, but that is deferred until the next character
//! shows it is not the first half of a macro return.

use crate::interpreter::constants::{to_upper, TecoInt, ESCAPE};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::interpreter::expressions::Op;
use crate::parser::{begin_exec, Mode, RegCmd, State};

impl Interpreter {
    pub(crate) fn state_control(&mut self, chr: u8) -> Result<State> {
        match to_upper(chr) {
            0 => return Ok(State::Control),
            b'I' => return Ok(State::InsertIndent),
            b'U' => return Ok(State::ExpectReg(RegCmd::SetString { building: true })),
            b'^' => return Ok(State::Ascii),
            b'[' => return Ok(State::Escape),
            _ => {}
        }

        match to_upper(chr) {
            // ^C: immediate exit, batch mode only
            b'C' => {
                begin_exec!(self, State::Start);
                if self.undo.enabled {
                    return Err(Error::failed("<^C> not allowed in interactive mode"));
                }
                self.quit_requested = true;
                return Err(Error::new(ErrorKind::Quit));
            }

            // radix
            b'O' => {
                begin_exec!(self, State::Start);
                self.set_radix(8)?;
            }
            b'D' => {
                begin_exec!(self, State::Start);
                self.set_radix(10)?;
            }
            b'R' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                if self.exprs.args() == 0 {
                    let radix = self.exprs.radix();
                    self.push_num(radix);
                } else {
                    let radix = self.pop_num_calc(0, 0)?;
                    self.set_radix(radix)?;
                }
            }

            // additional numeric operations
            b'_' => {
                begin_exec!(self, State::Start);
                let v = self.pop_num_calc_implied()?;
                self.push_num(!v);
            }
            b'*' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Pow)?;
            }
            b'/' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Mod)?;
            }
            b'#' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Xor)?;
            }

            _ => {
                return Err(Error::failed(format!(
                    "Unsupported command <^{}>",
                    to_upper(chr) as char
                )));
            }
        }

        Ok(State::Start)
    }

    /// `^^c`: the code of the next character.
    pub(crate) fn state_ascii(&mut self, chr: u8) -> Result<State> {
        if chr == 0 {
            return Ok(State::Ascii);
        }
        begin_exec!(self, State::Start);
        self.push_num(chr as TecoInt);
        Ok(State::Start)
    }

    /// The escape state: `$` alone discards arguments, `$$` returns from
    /// the macro. Discarding is deferred one character since it has no
    /// visible side effect of its own.
    pub(crate) fn state_escape(&mut self, chr: u8) -> Result<State> {
        if chr == 0 {
            return Ok(State::Escape);
        }

        if chr == ESCAPE || chr == b'$' {
            begin_exec!(self, State::Start);
            self.state = State::Start;
            self.eval_exprs()?;
            let args = self.exprs.args();
            return Err(Error::new(ErrorKind::Return { args }));
        }

        if self.mode == Mode::Normal {
            self.discard_args()?;
        }
        // process the character as a fresh command
        self.dispatch(State::Start, chr)
    }
}
