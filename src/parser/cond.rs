//! Conditionals
//!
//! `value"Xthen|else'` with a one-character test kind. A failed test (and
//! the `|` of a taken then-arm) switches to [`Mode::ParseOnlyCond`], where
//! only `"`, `|` and `'` are significant: nested conditionals bump the nest
//! counter so the skip ends at the matching delimiter.

use crate::interpreter::constants::{is_failure, is_success, to_upper, TecoInt};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::parser::{begin_exec, Mode, State};

fn is_dir_separator(c: u8) -> bool {
    c == b'/' || (cfg!(windows) && c == b'\\')
}

impl Interpreter {
    pub(crate) fn state_cond(&mut self, chr: u8) -> Result<State> {
        if chr == 0 {
            return Ok(State::CondCommand);
        }

        let mut value: TecoInt = 0;
        match self.mode {
            Mode::ParseOnlyCond => {
                let level = self.nest_level;
                self.set_nest_level(level + 1);
            }
            Mode::Normal => {
                self.eval_exprs()?;
                // ~ tests argument absence and must not pop
                if chr != b'~' {
                    if self.exprs.args() == 0 {
                        return Err(Error::new(ErrorKind::ArgExpected {
                            cmd: "\"".to_string(),
                        }));
                    }
                    value = self.pop_num_calc(0, 0)?;
                }
            }
            _ => {}
        }

        let byte = value as u8;
        let result = match to_upper(chr) {
            b'~' => {
                begin_exec!(self, State::Start);
                self.exprs.args() == 0
            }
            b'A' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_alphabetic()
            }
            b'C' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'$' | b'_')
            }
            b'D' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_digit()
            }
            b'I' => {
                begin_exec!(self, State::Start);
                is_dir_separator(byte)
            }
            b'S' | b'T' => {
                begin_exec!(self, State::Start);
                is_success(value)
            }
            b'F' | b'U' => {
                begin_exec!(self, State::Start);
                is_failure(value)
            }
            b'E' | b'=' => {
                begin_exec!(self, State::Start);
                value == 0
            }
            b'G' | b'>' => {
                begin_exec!(self, State::Start);
                value > 0
            }
            b'L' | b'<' => {
                begin_exec!(self, State::Start);
                value < 0
            }
            b'N' => {
                begin_exec!(self, State::Start);
                value != 0
            }
            b'R' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_alphanumeric()
            }
            b'V' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_lowercase()
            }
            b'W' => {
                begin_exec!(self, State::Start);
                byte.is_ascii_uppercase()
            }
            _ => return Err(Error::new(ErrorKind::InvalidCondType { chr })),
        };

        if !result {
            // skip to the else arm or the end of the conditional
            self.set_mode(Mode::ParseOnlyCond);
        }
        Ok(State::Start)
    }
}
