//! String arguments and string building
//!
//! String-taking commands share one accumulation machine: characters are
//! collected (optionally through the string-building escapes) until the
//! terminator — escape by default, or whatever character follows an
//! `@`-modified command, with `{`...`}` tracked by nesting depth. On
//! termination the command's `done` handler receives the expanded string.
//!
//! String building is a micro state machine of its own:
//! - `^Q`/`^R` take the next character verbatim
//! - `^V`/`^W` fold the next character to lower/upper case, doubled they
//!   latch until the opposite fold
//! - `^Ac` after a caret turns the next letter into its control code
//! - `^EQq`, `^EUq`, `^E\q`, `^E@q`, `^ENq` interpolate a register's
//!   string, its integer as a byte, its formatted integer, and its string
//!   shell-quoted or glob-escaped
//!
//! Register specifiers are themselves a tiny machine: one character, `.x`
//! for locals, `#xy` for two-character names.

use crate::buffers::registers::RegAddr;
use crate::interpreter::constants::{ctl, is_ctl, to_upper, ESCAPE};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, Result};
use crate::parser::{begin_exec, Mode, State};
use crate::undo::UndoOp;
use std::path::PathBuf;

/// Register specifier sub-machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegSpecMachine {
    state: RegSpecState,
    local: bool,
    first: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum RegSpecState {
    #[default]
    Start,
    TwoFirst,
    TwoSecond,
}

impl RegSpecMachine {
    pub fn new() -> Self {
        RegSpecMachine::default()
    }

    /// Feed one character; `Some` carries the completed (local, name) pair.
    pub fn input(&mut self, chr: u8) -> Result<Option<(bool, String)>> {
        match self.state {
            RegSpecState::Start => match chr {
                b'.' if !self.local => {
                    self.local = true;
                    Ok(None)
                }
                b'#' => {
                    self.state = RegSpecState::TwoFirst;
                    Ok(None)
                }
                c if is_ctl(c) => Err(Error::failed("Invalid Q-Register specification")),
                c => Ok(Some((self.local, (to_upper(c) as char).to_string()))),
            },
            RegSpecState::TwoFirst => {
                if is_ctl(chr) {
                    return Err(Error::failed("Invalid Q-Register specification"));
                }
                self.first = to_upper(chr);
                self.state = RegSpecState::TwoSecond;
                Ok(None)
            }
            RegSpecState::TwoSecond => {
                if is_ctl(chr) {
                    return Err(Error::failed("Invalid Q-Register specification"));
                }
                let name: String = [self.first as char, to_upper(chr) as char].iter().collect();
                Ok(Some((self.local, name)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CaseMode {
    #[default]
    Normal,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BuildState {
    #[default]
    Start,
    Escaped,
    Lower,
    Upper,
    CtlE,
    CtlENum,
    CtlEU,
    CtlEQ,
    CtlEQuote,
    CtlEGlob,
}

/// The string-building machine. Cloned into the journal before each
/// mutation so a rubbed-out character restores it mid-escape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringBuilder {
    state: BuildState,
    case_mode: CaseMode,
    toctl: bool,
    regspec: RegSpecMachine,
}

impl StringBuilder {
    pub fn new() -> Self {
        StringBuilder::default()
    }
}

/// Accumulation state of the active string argument.
#[derive(Debug)]
pub struct StringArg {
    pub buf: Option<Vec<u8>>,
    pub nesting: u32,
    /// Accumulated characters not yet handed to `process`.
    pub insert_len: usize,
    pub builder: StringBuilder,
}

impl StringArg {
    pub fn new() -> Self {
        StringArg {
            buf: None,
            nesting: 1,
            insert_len: 0,
            builder: StringBuilder::new(),
        }
    }
}

impl Default for StringArg {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote a byte string for POSIX shells.
pub fn shell_quote(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'\'');
    for &b in bytes {
        if b == b'\'' {
            out.extend_from_slice(b"'\\''");
        } else {
            out.push(b);
        }
    }
    out.push(b'\'');
    out
}

/// Escape glob metacharacters so the string matches itself.
pub fn glob_escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'*' | b'?' | b'[' | b']' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

pub(crate) fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

impl Interpreter {
    fn set_string_nesting(&mut self, nesting: u32) {
        self.undo.push(UndoOp::StringNesting(self.string.nesting));
        self.string.nesting = nesting;
    }

    pub(crate) fn state_expect_string(&mut self, state: State, chr: u8) -> Result<State> {
        if chr == 0 {
            begin_exec!(self, state);
            self.string_initial(state)?;
            return Ok(state);
        }

        // an @-modified command takes its terminator from the first character
        if self.at && matches!(self.escape_char, ESCAPE | b'{') {
            self.undo.push(UndoOp::At(true));
            self.at = false;
            self.undo.push(UndoOp::EscapeChar(self.escape_char));
            self.escape_char = to_upper(chr);
            return Ok(state);
        }

        // termination bookkeeping is syntactic and precedes any building
        if self.escape_char == b'{' {
            match chr {
                b'{' => {
                    let n = self.string.nesting;
                    self.set_string_nesting(n + 1);
                }
                b'}' => {
                    let n = self.string.nesting;
                    self.set_string_nesting(n - 1);
                }
                _ => {}
            }
        } else if to_upper(chr) == self.escape_char {
            let n = self.string.nesting;
            self.set_string_nesting(n - 1);
        }

        if self.string.nesting == 0 {
            self.undo.push(UndoOp::StringBuf(self.string.buf.clone()));
            let string = self.string.buf.take().unwrap_or_default();
            self.undo.push(UndoOp::EscapeChar(self.escape_char));
            self.escape_char = ESCAPE;
            self.string.nesting = 1;
            if state.string_building() {
                self.undo.push(UndoOp::Builder(self.string.builder.clone()));
                self.string.builder = StringBuilder::new();
            }
            if self.string.insert_len > 0 {
                let tail = string[string.len() - self.string.insert_len..].to_vec();
                self.undo.push(UndoOp::InsertLen(self.string.insert_len));
                self.string.insert_len = 0;
                self.string_process(state, &tail)?;
            }
            return self.string_done(state, &string);
        }

        begin_exec!(self, state);

        let expanded: Vec<u8> = if state.string_building() {
            match self.build_input(chr)? {
                Some(bytes) => bytes,
                None => return Ok(state),
            }
        } else {
            vec![chr]
        };
        if expanded.is_empty() {
            return Ok(state);
        }
        self.undo.push(UndoOp::StringBuf(self.string.buf.clone()));
        self.string
            .buf
            .get_or_insert_with(Vec::new)
            .extend_from_slice(&expanded);
        self.undo.push(UndoOp::InsertLen(self.string.insert_len));
        self.string.insert_len += expanded.len();
        Ok(state)
    }

    /// End-of-input feedback: hand accumulated characters to `process` so
    /// interactive insertion happens as the user types.
    pub(crate) fn string_refresh(&mut self) -> Result<()> {
        if self.string.insert_len == 0 {
            return Ok(());
        }
        let state = self.state;
        let buf = self.string.buf.clone().unwrap_or_default();
        let tail = buf[buf.len() - self.string.insert_len..].to_vec();
        self.undo.push(UndoOp::InsertLen(self.string.insert_len));
        self.string.insert_len = 0;
        self.string_process(state, &tail)
    }

    /// On-entry hook of string states.
    fn string_initial(&mut self, state: State) -> Result<()> {
        match state {
            State::Insert { .. } | State::InsertIndent => {
                // arguments are inserted as character codes first
                self.eval_exprs()?;
                let args = self.exprs.args();
                if args > 0 {
                    let mut bytes = Vec::with_capacity(args);
                    for i in (0..args).rev() {
                        bytes.push(self.exprs.peek_num(i).unwrap_or(0) as u8);
                    }
                    for _ in 0..args {
                        self.pop_num_calc(0, 0)?;
                    }
                    self.exec_insert(&bytes);
                }
                if state == State::InsertIndent {
                    let indent = if self.view.use_tabs() {
                        vec![b'\t']
                    } else {
                        let width = self.view.tab_width();
                        let col = self.view.column(self.view.pos());
                        vec![b' '; width - col % width]
                    };
                    self.exec_insert(&indent);
                }
                Ok(())
            }
            State::EditFile => {
                let id = self.pop_num_calc(-1, 1)?;
                self.eb_allow_filename = true;
                if id == 0 {
                    self.show_buffer_list();
                } else if id > 0 {
                    self.eb_allow_filename = false;
                    self.edit_buffer_id(id)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Incremental part of a command: insertion states add text as it is
    /// typed; everything else waits for `done`.
    fn string_process(&mut self, state: State, tail: &[u8]) -> Result<()> {
        if matches!(state, State::Insert { .. } | State::InsertIndent) {
            self.exec_insert(tail);
        }
        Ok(())
    }

    /// Termination handler: the command's actual work.
    fn string_done(&mut self, state: State, string: &[u8]) -> Result<State> {
        begin_exec!(self, State::Start);
        match state {
            State::Insert { .. } | State::InsertIndent => {}

            State::EditFile => {
                if !self.eb_allow_filename {
                    if !string.is_empty() {
                        return Err(Error::failed(
                            "If a buffer is selected by id, the <EB> string argument must be empty",
                        ));
                    }
                } else if string.is_empty() {
                    self.edit_buffer_file(None)?;
                } else {
                    self.edit_buffer_file(Some(&path_from_bytes(string)))?;
                }
            }

            State::SaveFile => {
                let filename = if string.is_empty() {
                    None
                } else {
                    Some(path_from_bytes(string))
                };
                self.save_buffer(filename.as_deref())?;
            }

            State::ChangeDir => {
                self.exec_change_dir(string)?;
            }

            State::MacroFile => {
                let locals = !self.eval_colon();
                self.execute_file(&path_from_bytes(string), locals)?;
            }

            State::LoadReg => {
                let addr = self.take_reg_argument()?;
                if string.is_empty() {
                    // edit the register instead of loading a file
                    self.undo_edit_current();
                    self.edit_register(addr);
                } else {
                    self.reg_load(&addr, &path_from_bytes(string))?;
                }
            }

            State::SetRegString { .. } => {
                let addr = self.take_reg_argument()?;
                self.reg_set_string(&addr, string);
            }

            State::SaveRegFile => {
                let addr = self.take_reg_argument()?;
                self.reg_save(&addr, &path_from_bytes(string))?;
            }

            State::GotoCmd => {
                self.exec_goto(string)?;
            }

            _ => unreachable!("not a string state"),
        }
        Ok(State::Start)
    }

    fn take_reg_argument(&mut self) -> Result<RegAddr> {
        self.reg_argument
            .clone()
            .ok_or_else(|| Error::failed("No Q-Register argument"))
    }

    /// `FG`: change the working directory, defaulting to `$HOME`.
    fn exec_change_dir(&mut self, string: &[u8]) -> Result<()> {
        let dir = if string.is_empty() {
            let home = self.resolve_reg(RegAddr::global("$HOME"))?;
            path_from_bytes(&self.reg_get_string(&home))
        } else {
            path_from_bytes(string)
        };
        let old = std::env::current_dir().map_err(|e| Error::io("Cannot get working directory", e))?;
        self.undo.push(UndoOp::ChangeDir(old));
        std::env::set_current_dir(&dir).map_err(|_| {
            Error::failed(format!(
                "Cannot change working directory to \"{}\"",
                dir.display()
            ))
        })?;
        Ok(())
    }

    /// One character of string building; `Some` is the expansion to append.
    pub(crate) fn build_input(&mut self, chr: u8) -> Result<Option<Vec<u8>>> {
        self.undo.push(UndoOp::Builder(self.string.builder.clone()));

        let mut chr = chr;
        match self.string.builder.case_mode {
            CaseMode::Upper => chr = chr.to_ascii_uppercase(),
            CaseMode::Lower => chr = chr.to_ascii_lowercase(),
            CaseMode::Normal => {}
        }

        if self.string.builder.toctl {
            if chr != b'^' {
                chr = ctl(to_upper(chr));
            }
            self.string.builder.toctl = false;
        } else if chr == b'^' {
            self.string.builder.toctl = true;
            return Ok(None);
        }

        match self.string.builder.state {
            BuildState::Start => {
                match chr {
                    c if c == ctl(b'Q') || c == ctl(b'R') => {
                        self.string.builder.state = BuildState::Escaped;
                        Ok(None)
                    }
                    c if c == ctl(b'V') => {
                        self.string.builder.state = BuildState::Lower;
                        Ok(None)
                    }
                    c if c == ctl(b'W') => {
                        self.string.builder.state = BuildState::Upper;
                        Ok(None)
                    }
                    c if c == ctl(b'E') => {
                        self.string.builder.state = BuildState::CtlE;
                        Ok(None)
                    }
                    c => Ok(Some(vec![c])),
                }
            }

            BuildState::Lower => {
                self.string.builder.state = BuildState::Start;
                if chr != ctl(b'V') {
                    Ok(Some(vec![chr.to_ascii_lowercase()]))
                } else {
                    self.string.builder.case_mode = CaseMode::Lower;
                    Ok(None)
                }
            }

            BuildState::Upper => {
                self.string.builder.state = BuildState::Start;
                if chr != ctl(b'W') {
                    Ok(Some(vec![chr.to_ascii_uppercase()]))
                } else {
                    self.string.builder.case_mode = CaseMode::Upper;
                    Ok(None)
                }
            }

            BuildState::CtlE => {
                let next = match to_upper(chr) {
                    b'\\' => BuildState::CtlENum,
                    b'U' => BuildState::CtlEU,
                    b'Q' => BuildState::CtlEQ,
                    b'@' => BuildState::CtlEQuote,
                    b'N' => BuildState::CtlEGlob,
                    _ => {
                        // unknown ^E sequences pass through untouched
                        self.string.builder.state = BuildState::Start;
                        return Ok(Some(vec![ctl(b'E'), chr]));
                    }
                };
                self.string.builder.regspec = RegSpecMachine::new();
                self.string.builder.state = next;
                Ok(None)
            }

            which @ (BuildState::CtlENum
            | BuildState::CtlEU
            | BuildState::CtlEQ
            | BuildState::CtlEQuote
            | BuildState::CtlEGlob) => {
                let Some((local, name)) = self.string.builder.regspec.input(chr)? else {
                    return Ok(None);
                };
                self.string.builder.state = BuildState::Start;
                let addr = self.resolve_reg(RegAddr { local, name })?;
                let expansion = match which {
                    BuildState::CtlENum => {
                        let v = self.reg_get_integer(&addr);
                        self.exprs.format(v).into_bytes()
                    }
                    BuildState::CtlEU => vec![self.reg_get_integer(&addr) as u8],
                    BuildState::CtlEQ => self.reg_get_string(&addr),
                    BuildState::CtlEQuote => shell_quote(&self.reg_get_string(&addr)),
                    BuildState::CtlEGlob => glob_escape(&self.reg_get_string(&addr)),
                    _ => unreachable!(),
                };
                Ok(Some(expansion))
            }

            BuildState::Escaped => {
                self.string.builder.state = BuildState::Start;
                Ok(Some(vec![chr]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regspec_single_char() {
        let mut machine = RegSpecMachine::new();
        assert_eq!(machine.input(b'a').unwrap(), Some((false, "A".to_string())));
    }

    #[test]
    fn test_regspec_local() {
        let mut machine = RegSpecMachine::new();
        assert_eq!(machine.input(b'.').unwrap(), None);
        assert_eq!(machine.input(b'5').unwrap(), Some((true, "5".to_string())));
    }

    #[test]
    fn test_regspec_two_letter() {
        let mut machine = RegSpecMachine::new();
        assert_eq!(machine.input(b'#').unwrap(), None);
        assert_eq!(machine.input(b'a').unwrap(), None);
        assert_eq!(machine.input(b'b').unwrap(), Some((false, "AB".to_string())));
    }

    #[test]
    fn test_shell_quote_embedded_quote() {
        assert_eq!(shell_quote(b"it's"), b"'it'\\''s'".to_vec());
    }

    #[test]
    fn test_glob_escape() {
        assert_eq!(glob_escape(b"a*b?c"), b"a\\*b\\?c".to_vec());
    }
}
