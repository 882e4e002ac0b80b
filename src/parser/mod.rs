//! Command-language parser
//!
//! A table-driven state machine consuming one byte per step. States carry no
//! data of their own: they are a `Copy` enum, and everything a state
//! accumulates (string arguments, register specifications, label names)
//! lives in journaled interpreter fields, so rubbing out a character can
//! restore the machine mid-command.
//!
//! Transition procedure: the current state maps the upper-cased byte either
//! to a follow-up state (a plain transition, no action) or handles it in its
//! command dispatch. After a transition the new state is fed a NUL byte,
//! which string-argument states use as their on-entry hook. A state change
//! is journaled so rubout restores the previous state.
//!
//! Execution modes select what actions do:
//! - [`Mode::Normal`]: actions execute.
//! - [`Mode::ParseOnlyLoop`]: scanning for the end of a skipped loop.
//! - [`Mode::ParseOnlyCond`]: skipping a conditional arm.
//! - [`Mode::ParseOnlyGoto`]: scanning forward for a label.
//!
//! Every action begins by bailing out when the mode is not `Normal`; only
//! syntactically significant characters (`@`, string terminators, nesting
//! characters) record themselves during skipping.

pub mod cond;
pub mod control;
pub mod ecommand;
pub mod fcommand;
pub mod goto;
pub mod qreg;
pub mod start;
pub mod strings;

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::undo::UndoOp;

/// Execution mode of the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ParseOnlyLoop,
    ParseOnlyCond,
    ParseOnlyGoto,
}

/// Which command consumes the register a specifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegCmd {
    /// `[q`
    Push,
    /// `]q`
    Pop,
    /// `Gq`
    GetString,
    /// `Qq`
    Query,
    /// `Uq`
    SetInteger,
    /// `%q`
    Increase,
    /// `Mq`
    Macro,
    /// `Xq`
    CopyTo,
    /// `EQq` (edit or load from file)
    Edit,
    /// `^Uq` / `EUq`
    SetString { building: bool },
    /// `E%q`
    SaveFile,
}

/// Parser states. Reusable singletons in spirit: all mutable state lives on
/// the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Control,
    Ascii,
    Escape,
    FCommand,
    CondCommand,
    ECommand,
    Label,
    /// Register specifier, then the command's action.
    ExpectReg(RegCmd),
    // string-argument states
    GotoCmd,
    EditFile,
    SaveFile,
    ChangeDir,
    MacroFile,
    Insert { building: bool },
    InsertIndent,
    LoadReg,
    SetRegString { building: bool },
    SaveRegFile,
}

impl State {
    pub(crate) fn is_string_state(self) -> bool {
        matches!(
            self,
            State::GotoCmd
                | State::EditFile
                | State::SaveFile
                | State::ChangeDir
                | State::MacroFile
                | State::Insert { .. }
                | State::InsertIndent
                | State::LoadReg
                | State::SetRegString { .. }
                | State::SaveRegFile
        )
    }

    /// Whether the string argument passes through the string-building
    /// machine. `EI` and `EU` take their strings verbatim.
    pub(crate) fn string_building(self) -> bool {
        !matches!(
            self,
            State::Insert { building: false } | State::SetRegString { building: false }
        )
    }
}

/// Bail out of an action when execution is suppressed, still returning the
/// state the action would have produced.
macro_rules! begin_exec {
    ($self:ident, $next:expr) => {
        if $self.mode != Mode::Normal {
            return Ok($next);
        }
    };
}
pub(crate) use begin_exec;

impl Interpreter {
    /// Feed one byte to the state machine.
    pub(crate) fn parser_input(&mut self, chr: u8) -> Result<()> {
        let mut state = self.state;
        let mut chr = chr;
        loop {
            let next = self.dispatch(state, chr)?;
            if next == state {
                break;
            }
            // entering a state feeds it a NUL as its on-entry hook
            state = next;
            chr = 0;
        }
        if state != self.state {
            self.undo.push(UndoOp::State(self.state));
            self.state = state;
        }
        Ok(())
    }

    pub(crate) fn dispatch(&mut self, state: State, chr: u8) -> Result<State> {
        match state {
            State::Start => self.state_start(chr),
            State::Control => self.state_control(chr),
            State::Ascii => self.state_ascii(chr),
            State::Escape => self.state_escape(chr),
            State::FCommand => self.state_fcommand(chr),
            State::CondCommand => self.state_cond(chr),
            State::ECommand => self.state_ecommand(chr),
            State::Label => self.state_label(chr),
            State::ExpectReg(cmd) => self.state_expect_reg(cmd, chr),
            s => self.state_expect_string(s, chr),
        }
    }

    /// Interactive feedback hook, called after the last command-line byte.
    pub(crate) fn state_refresh(&mut self) -> Result<()> {
        if self.state.is_string_state() {
            self.string_refresh()?;
        }
        Ok(())
    }

    /// Some states (commands with lookahead) are valid at the end of a
    /// macro; everything else means a command was left unterminated.
    pub(crate) fn state_end_of_macro(&mut self) -> Result<()> {
        match self.state {
            State::Start => Ok(()),
            // the deferred escape is allowed to end a macro
            State::Escape => {
                if self.mode == Mode::Normal {
                    self.discard_args()?;
                }
                Ok(())
            }
            _ => Err(Error::new(ErrorKind::UnterminatedCommand)),
        }
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.undo.push(UndoOp::Mode(self.mode));
            self.mode = mode;
        }
    }

    pub(crate) fn set_nest_level(&mut self, level: u32) {
        self.undo.push(UndoOp::NestLevel(self.nest_level));
        self.nest_level = level;
    }

    pub(crate) fn set_skip_else(&mut self, value: bool) {
        if self.skip_else != value {
            self.undo.push(UndoOp::SkipElse(self.skip_else));
            self.skip_else = value;
        }
    }

    pub(crate) fn set_digit_run(&mut self, value: bool) {
        if self.digit_run != value {
            self.undo.push(UndoOp::DigitRun(self.digit_run));
            self.digit_run = value;
        }
    }
}
