//! F commands: loop and conditional flow control, change-directory
//!
//! `F<` and `F>` jump within the current loop, `F'` and `F|` jump within
//! the current conditional, `FG` changes the working directory.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::parser::{begin_exec, Mode, State};

impl Interpreter {
    pub(crate) fn state_fcommand(&mut self, chr: u8) -> Result<State> {
        match chr.to_ascii_uppercase() {
            0 => return Ok(State::FCommand),
            b'G' => return Ok(State::ChangeDir),
            _ => {}
        }

        match chr {
            // jump to the loop start, or the beginning of the macro
            b'<' => {
                begin_exec!(self, State::Start);
                self.discard_args()?;
                self.macro_pc = if self.loop_stack.items() > self.loop_fp {
                    self.loop_stack.peek().expect("loop frame vanished").pc
                } else {
                    // wraps to 0 after the step loop's increment
                    usize::MAX
                };
            }

            // jump to the loop end
            b'>' => {
                begin_exec!(self, State::Start);
                self.exec_loop_end(true)?;
            }

            // jump to the end of the conditional
            b'\'' => {
                begin_exec!(self, State::Start);
                self.set_mode(Mode::ParseOnlyCond);
                self.set_skip_else(true);
            }

            // jump to the else arm
            b'|' => {
                begin_exec!(self, State::Start);
                self.set_mode(Mode::ParseOnlyCond);
            }

            _ => return Err(Error::new(ErrorKind::Syntax { chr })),
        }

        Ok(State::Start)
    }
}
