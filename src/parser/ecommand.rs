//! E commands: buffer ring, flags, properties, exit
//!
//! The single-character `E` commands execute here; the ones taking string
//! or register arguments (`EB`, `EW`, `EQ`, `EU`, `EI`, `EM`, `E%`) hand
//! off to their states.

use crate::interpreter::constants::{is_failure, to_upper, TecoInt};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::parser::{begin_exec, Mode, RegCmd, State};
use crate::undo::UndoOp;
use crate::view::EolMode;

/// Property keys of the `EJ` command.
const EJ_USER_INTERFACE: TecoInt = 0;
const EJ_BUFFERS: TecoInt = 1;
const EJ_MEMORY_LIMIT: TecoInt = 2;

impl Interpreter {
    pub(crate) fn state_ecommand(&mut self, chr: u8) -> Result<State> {
        match to_upper(chr) {
            0 => return Ok(State::ECommand),
            b'%' => return Ok(State::ExpectReg(RegCmd::SaveFile)),
            b'B' => return Ok(State::EditFile),
            b'I' => return Ok(State::Insert { building: false }),
            b'M' => return Ok(State::MacroFile),
            b'Q' => return Ok(State::ExpectReg(RegCmd::Edit)),
            b'U' => return Ok(State::ExpectReg(RegCmd::SetString { building: false })),
            b'W' => return Ok(State::SaveFile),
            _ => {}
        }

        match to_upper(chr) {
            // remove the current buffer from the ring
            b'F' => {
                begin_exec!(self, State::Start);
                if self.current_reg.is_some() {
                    return Err(Error::failed("Q-Register currently edited"));
                }
                let force = self.pop_num_calc_implied()?;
                self.check_buffer_dirty(force)?;
                self.close_buffer()?;
            }

            // ED flag bits
            b'D' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                if self.exprs.args() == 0 {
                    let flags = self.ed_flags;
                    self.push_num(flags);
                } else {
                    let on = self.pop_num_calc(0, 0)?;
                    let off = self.pop_num_calc(!0, 1)?;
                    self.undo.push(UndoOp::EdFlags(self.ed_flags));
                    self.ed_flags = (self.ed_flags & !off) | on;
                }
            }

            // system properties
            b'J' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                let property = self.pop_num_calc_implied()?;
                if self.exprs.args() > 0 {
                    let value = self.pop_num_calc(0, 0)?;
                    match property {
                        EJ_MEMORY_LIMIT => {
                            self.undo.push(UndoOp::MemoryLimit(self.memory_limit));
                            self.memory_limit = value.max(0) as usize;
                        }
                        _ => {
                            return Err(Error::failed(format!(
                                "Cannot set property {} for <EJ>",
                                property
                            )));
                        }
                    }
                } else {
                    match property {
                        EJ_USER_INTERFACE => self.push_num(1),
                        EJ_BUFFERS => {
                            let n = self.ring.len() as TecoInt;
                            self.push_num(n);
                        }
                        EJ_MEMORY_LIMIT => {
                            let limit = self.memory_limit as TecoInt;
                            self.push_num(limit);
                        }
                        _ => {
                            return Err(Error::failed(format!(
                                "Invalid property {} for <EJ>",
                                property
                            )));
                        }
                    }
                }
            }

            // End Of Line mode of the current document
            b'L' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                if self.exprs.args() > 0 {
                    let eol = if self.eval_colon() {
                        // EOL characters from the stack
                        match self.pop_num_calc(0, 0)? {
                            13 => EolMode::Cr,
                            10 => {
                                if self.exprs.args() == 0 {
                                    EolMode::Lf
                                } else if self.pop_num_calc(0, 0)? == 13 {
                                    EolMode::CrLf
                                } else {
                                    return Err(Error::failed("Invalid EOL sequence for <EL>"));
                                }
                            }
                            _ => return Err(Error::failed("Invalid EOL sequence for <EL>")),
                        }
                    } else {
                        let code = self.pop_num_calc(0, 0)?;
                        EolMode::from_code(code).ok_or_else(|| {
                            Error::failed(format!("Invalid EOL mode {} for <EL>", code))
                        })?
                    };
                    self.undo.push(UndoOp::ViewEol(self.view.eol_mode()));
                    self.view.set_eol_mode(eol);
                } else if self.eval_colon() {
                    match self.view.eol_mode() {
                        EolMode::CrLf => {
                            self.push_num(13);
                            self.push_num(10);
                        }
                        EolMode::Cr => self.push_num(13),
                        EolMode::Lf => self.push_num(10),
                    }
                } else {
                    let code = self.view.eol_mode().code();
                    self.push_num(code);
                }
            }

            // request program termination
            b'X' => {
                begin_exec!(self, State::Start);
                if self.eval_colon() {
                    self.save_all_dirty()?;
                } else if is_failure(self.pop_num_calc_implied()?) && self.ring.is_any_dirty() {
                    return Err(Error::new(ErrorKind::ModifiedBuffers));
                }
                self.undo.push(UndoOp::QuitRequested(self.quit_requested));
                self.quit_requested = true;
            }

            _ => return Err(Error::new(ErrorKind::Syntax { chr })),
        }

        Ok(State::Start)
    }
}
