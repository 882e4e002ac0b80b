//! Interactive command line
//!
//! Characters typed by the user execute immediately; the journal boundary
//! is set to the character's position first, so rejecting or rubbing out a
//! character rolls its effects back exactly. Terminating the command line
//! (`$$`) commits the journal and resets the transient machine state.
//!
//! `}` replaces the command line with the contents of the replacement
//! register: the old line is rubbed out back to the first divergence and
//! the rest of the new line is replayed. If the replay fails, the original
//! line is restored the same way and the update is rejected like any other
//! erroneous character.

use crate::buffers::registers::RegAddr;
use crate::interpreter::constants::ESCAPE_NAME;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind};
use crate::interpreter::messages::Severity;
use crate::parser::strings::{RegSpecMachine, StringArg};
use crate::undo::UndoOp;

/// The typed command line. The interpreter's program counter doubles as
/// the executed-prefix pointer while the command line is the active macro.
#[derive(Debug, Default)]
pub struct CommandLine {
    pub(crate) buf: Vec<u8>,
}

impl CommandLine {
    pub fn new() -> Self {
        CommandLine { buf: Vec::new() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// What a keypress did to the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdlineEvent {
    /// Character accepted and executed.
    Ok,
    /// Command line terminated; check `quit_requested`.
    Terminated,
    /// Character rejected; the message line carries the error.
    Rejected,
}

enum FeedOutcome {
    Done,
    Terminated,
    Replace,
    Error(Error),
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

impl Interpreter {
    /// The already-executed prefix of the command line.
    pub(crate) fn cmdline_executed(&self) -> &[u8] {
        &self.cmdline.buf[..self.macro_pc.min(self.cmdline.buf.len())]
    }

    /// Handle one typed character.
    pub fn cmdline_keypress(&mut self, chr: u8) -> CmdlineEvent {
        debug_assert!(self.undo.enabled, "command line needs the journal");
        match self.cmdline_feed(chr) {
            FeedOutcome::Done => CmdlineEvent::Ok,
            FeedOutcome::Terminated => {
                self.cmdline_terminate();
                CmdlineEvent::Terminated
            }
            FeedOutcome::Error(e) => {
                self.report_error(&e);
                CmdlineEvent::Rejected
            }
            FeedOutcome::Replace => {
                let new_line = self.reg_get_string(&RegAddr::global(ESCAPE_NAME));
                let backup = self.cmdline.buf.clone();
                match self.cmdline_replay(&new_line) {
                    Ok(event) => event,
                    Err(e) => {
                        // the updated line failed: bring the old one back
                        let _ = self.cmdline_replay(&backup);
                        self.report_error(&e);
                        CmdlineEvent::Rejected
                    }
                }
            }
        }
    }

    /// Rub out the last typed character.
    pub fn cmdline_rubout(&mut self) {
        if self.cmdline.buf.is_empty() {
            return;
        }
        let pos = self.cmdline.buf.len() - 1;
        self.cmdline.buf.pop();
        self.rubout_to(pos);
        self.macro_pc = pos;
    }

    /// Rub out the whole command line.
    pub fn cmdline_rubout_all(&mut self) {
        while !self.cmdline.buf.is_empty() {
            self.cmdline_rubout();
        }
    }

    fn cmdline_feed(&mut self, chr: u8) -> FeedOutcome {
        let pos = self.cmdline.buf.len();
        self.undo.set_boundary(pos);
        self.cmdline.buf.push(chr);
        let text = self.cmdline.buf.clone();
        match self.step(&text, text.len()) {
            Ok(()) => FeedOutcome::Done,
            Err(e) => match e.kind {
                ErrorKind::Return { .. } => FeedOutcome::Terminated,
                ErrorKind::Replace => {
                    self.cmdline.buf.pop();
                    self.rubout_to(pos);
                    self.macro_pc = pos;
                    FeedOutcome::Replace
                }
                _ => {
                    // reject the character and restore the state exactly
                    self.cmdline.buf.pop();
                    self.rubout_to(pos);
                    self.macro_pc = pos;
                    FeedOutcome::Error(e)
                }
            },
        }
    }

    /// Rub out to the divergence from `target`, then execute its tail.
    fn cmdline_replay(&mut self, target: &[u8]) -> Result<CmdlineEvent, Error> {
        let common = common_prefix_len(self.cmdline_executed(), target);
        self.rubout_to(common);
        self.cmdline.buf.truncate(common);
        self.macro_pc = common;

        let mut i = common;
        while i < target.len() {
            match self.cmdline_feed(target[i]) {
                FeedOutcome::Done => i += 1,
                FeedOutcome::Terminated => {
                    self.cmdline_terminate();
                    return Ok(CmdlineEvent::Terminated);
                }
                FeedOutcome::Replace => {
                    // the replayed line replaces the line again
                    let next = self.reg_get_string(&RegAddr::global(ESCAPE_NAME));
                    return self.cmdline_replay(&next);
                }
                FeedOutcome::Error(e) => return Err(e),
            }
        }
        Ok(CmdlineEvent::Ok)
    }

    /// Commit the journal and reset the per-command-line machine state.
    fn cmdline_terminate(&mut self) {
        self.commit_undo();
        self.cmdline.buf.clear();
        self.macro_pc = 0;

        // a new command line starts with a clean slate; none of this is
        // journaled, the history it belonged to is gone
        self.exprs = crate::interpreter::expressions::ExpressionStack::new();
        self.loop_stack.clear_to(0);
        self.loop_fp = 0;
        self.state = crate::parser::State::Start;
        self.mode = crate::parser::Mode::Normal;
        self.skip_else = false;
        self.nest_level = 0;
        self.colon = false;
        self.at = false;
        self.escape_char = crate::interpreter::constants::ESCAPE;
        self.digit_run = false;
        self.string = StringArg::new();
        self.regspec = RegSpecMachine::new();
        self.reg_argument = None;
        self.label_buf = None;
        self.goto_table.clear();
        self.skip_label = None;
        self.messages.popup_clear();
    }

    fn report_error(&mut self, e: &Error) {
        self.undo.push(UndoOp::Message(self.messages.last.clone()));
        self.messages.show(Severity::Error, e.to_string());
    }
}
