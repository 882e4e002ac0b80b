//! The start state: one-character commands
//!
//! Everything dispatched directly off the command line: digits and
//! arithmetic, buffer queries and movement, deletion, insertion of integers,
//! loops, conditionals entry points, modifiers and command-line editing.
//! Multi-character families hand off to their own states (`E`, `F`, `^`,
//! `"`, register commands, string arguments).

use crate::interpreter::constants::{
    ctl_echo, is_ctl, is_failure, teco_bool, to_upper, TecoInt, ESCAPE_NAME, FAILURE, SEARCH_REG,
    SUCCESS,
};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::interpreter::expressions::{digit_value, Entry, Op};
use crate::interpreter::loops::LoopFrame;
use crate::parser::{begin_exec, Mode, RegCmd, State};
use crate::undo::UndoOp;

impl Interpreter {
    pub(crate) fn state_start(&mut self, chr: u8) -> Result<State> {
        if chr == 0 {
            return Ok(State::Start);
        }
        if !chr.is_ascii_digit() {
            // any other command ends a digit run
            self.set_digit_run(false);
        }
        if matches!(chr, b' ' | b'\x0c' | b'\r' | b'\n' | b'\x0b') {
            return Ok(State::Start);
        }
        // control characters are commands of the control state
        if is_ctl(chr) {
            return self.dispatch(State::Control, ctl_echo(chr));
        }

        if chr.is_ascii_digit() {
            begin_exec!(self, State::Start);
            self.add_digit(chr)?;
            self.set_digit_run(true);
            return Ok(State::Start);
        }

        match to_upper(chr) {
            // state hand-offs
            b'$' => return Ok(State::Escape),
            b'!' => return Ok(State::Label),
            b'O' => return Ok(State::GotoCmd),
            b'^' => return Ok(State::Control),
            b'F' => return Ok(State::FCommand),
            b'"' => return Ok(State::CondCommand),
            b'E' => return Ok(State::ECommand),
            b'I' => return Ok(State::Insert { building: true }),
            b'[' => return Ok(State::ExpectReg(RegCmd::Push)),
            b']' => return Ok(State::ExpectReg(RegCmd::Pop)),
            b'G' => return Ok(State::ExpectReg(RegCmd::GetString)),
            b'Q' => return Ok(State::ExpectReg(RegCmd::Query)),
            b'U' => return Ok(State::ExpectReg(RegCmd::SetInteger)),
            b'%' => return Ok(State::ExpectReg(RegCmd::Increase)),
            b'M' => return Ok(State::ExpectReg(RegCmd::Macro)),
            b'X' => return Ok(State::ExpectReg(RegCmd::CopyTo)),
            _ => {}
        }

        match to_upper(chr) {
            // arithmetic
            b'/' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Div)?;
            }
            b'*' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Mul)?;
            }
            b'+' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Add)?;
            }
            b'-' => {
                begin_exec!(self, State::Start);
                if self.exprs.args() == 0 {
                    let sign = self.exprs.num_sign();
                    self.set_num_sign(-sign);
                } else {
                    self.push_calc(Op::Sub)?;
                }
            }
            b'&' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::And)?;
            }
            b'#' => {
                begin_exec!(self, State::Start);
                self.push_calc(Op::Or)?;
            }
            b'(' => {
                begin_exec!(self, State::Start);
                if self.exprs.num_sign() < 0 {
                    // a pending sign becomes a multiplication by -1
                    self.set_num_sign(1);
                    self.eval_exprs()?;
                    self.push_num(-1);
                    self.push_calc(Op::Mul)?;
                }
                self.brace_open(Entry::Brace);
            }
            b')' => {
                begin_exec!(self, State::Start);
                self.brace_close(Entry::Brace)?;
            }
            b',' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                self.expr_push_entry(Entry::New);
            }

            // buffer queries
            b'.' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                let pos = self.view.pos() as TecoInt;
                self.push_num(pos);
            }
            b'Z' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                let len = self.view.length() as TecoInt;
                self.push_num(len);
            }
            b'H' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                let len = self.view.length() as TecoInt;
                self.push_num(0);
                self.push_num(len);
            }
            b'\\' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                if self.exprs.args() > 0 {
                    let v = self.pop_num_calc(0, 0)?;
                    self.insert_integer(v);
                } else {
                    let v = self.read_integer();
                    self.push_num(v);
                }
            }

            // loops
            b'<' => {
                if self.mode == Mode::ParseOnlyLoop {
                    let level = self.nest_level;
                    self.set_nest_level(level + 1);
                } else {
                    begin_exec!(self, State::Start);
                    self.eval_exprs()?;
                    let pass_through = self.eval_colon();
                    let counter = self.pop_num_calc(-1, 1)?;
                    if counter != 0 {
                        // a non-pass-through body must not see outer args
                        if !pass_through {
                            self.brace_open(Entry::Loop);
                        }
                        self.loop_push(LoopFrame {
                            counter,
                            pc: self.macro_pc,
                            pass_through,
                        });
                    } else {
                        // skip to the end of the loop
                        self.set_mode(Mode::ParseOnlyLoop);
                    }
                }
            }
            b'>' => {
                if self.mode == Mode::ParseOnlyLoop {
                    if self.nest_level == 0 {
                        self.set_mode(Mode::Normal);
                    } else {
                        let level = self.nest_level;
                        self.set_nest_level(level - 1);
                    }
                } else {
                    begin_exec!(self, State::Start);
                    self.exec_loop_end(false)?;
                }
            }
            b';' => {
                begin_exec!(self, State::Start);
                if self.loop_stack.items() <= self.loop_fp {
                    return Err(Error::new(ErrorKind::LoopUnmatched {
                        cmd: ";".to_string(),
                    }));
                }
                let implied = self
                    .reg_get_integer(&crate::buffers::registers::RegAddr::global(SEARCH_REG));
                let mut rc = self.pop_num_calc(implied, 1)?;
                if self.eval_colon() {
                    rc = !rc;
                }
                if is_failure(rc) {
                    let frame = self.loop_pop().expect("loop frame vanished");
                    self.discard_args()?;
                    if !frame.pass_through {
                        self.brace_close(Entry::Loop)?;
                    }
                    // skip to the end of the loop
                    self.set_mode(Mode::ParseOnlyLoop);
                }
            }

            // conditionals
            b'|' => {
                if self.mode == Mode::ParseOnlyCond {
                    if !self.skip_else && self.nest_level == 0 {
                        self.set_mode(Mode::Normal);
                    }
                    return Ok(State::Start);
                }
                begin_exec!(self, State::Start);
                // the condition succeeded: skip the else arm
                self.set_mode(Mode::ParseOnlyCond);
            }
            b'\'' => {
                if self.mode == Mode::ParseOnlyCond {
                    if self.nest_level == 0 {
                        self.set_mode(Mode::Normal);
                        self.set_skip_else(false);
                    } else {
                        let level = self.nest_level;
                        self.set_nest_level(level - 1);
                    }
                }
            }

            // command-line editing
            b'{' => {
                begin_exec!(self, State::Start);
                if !self.undo.enabled {
                    return Err(Error::failed(
                        "Command-line editing only possible in interactive mode",
                    ));
                }
                self.open_cmdline_edit()?;
            }
            b'}' => {
                begin_exec!(self, State::Start);
                if !self.undo.enabled {
                    return Err(Error::failed(
                        "Command-line editing only possible in interactive mode",
                    ));
                }
                if self.current_reg.as_ref().map(|a| a.name.as_str()) != Some(ESCAPE_NAME)
                    || self.current_reg.as_ref().is_some_and(|a| a.local)
                {
                    return Err(Error::failed(
                        "Command-line replacement only allowed when editing the replacement register",
                    ));
                }
                return Err(Error::new(ErrorKind::Replace));
            }

            // modifiers
            b'@' => {
                // syntactically significant, recorded even while skipping
                self.undo.push(UndoOp::At(self.at));
                self.at = true;
            }
            b':' => {
                begin_exec!(self, State::Start);
                self.undo.push(UndoOp::Colon(self.colon));
                self.colon = true;
            }

            // movement
            b'J' => {
                begin_exec!(self, State::Start);
                let v = self.pop_num_calc(0, 0)?;
                if self.validate_pos(v) {
                    if self.current_doc_must_undo() {
                        self.undo.push(UndoOp::ViewPos(self.view.pos()));
                    }
                    self.view.goto_pos(v as usize);
                    if self.eval_colon() {
                        self.push_num(SUCCESS);
                    }
                } else if self.eval_colon() {
                    self.push_num(FAILURE);
                } else {
                    return Err(Error::new(ErrorKind::Move {
                        cmd: "J".to_string(),
                    }));
                }
            }
            b'C' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.move_chars(n);
                self.movement_result(rc, "C")?;
            }
            b'R' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.move_chars(-n);
                self.movement_result(rc, "R")?;
            }
            b'L' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.move_lines(n);
                self.movement_result(rc, "L")?;
            }
            b'B' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.move_lines(-n);
                self.movement_result(rc, "B")?;
            }
            b'W' => {
                begin_exec!(self, State::Start);
                let v = self.pop_num_calc_implied()?;
                self.exec_move_words(v)?;
            }

            // deletion
            b'V' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.delete_words(n);
                if self.eval_colon() {
                    self.push_num(rc);
                } else if is_failure(rc) {
                    return Err(Error::failed("Not enough words to delete with <V>"));
                }
            }
            b'Y' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let rc = self.delete_words(-n);
                if self.eval_colon() {
                    self.push_num(rc);
                } else if is_failure(rc) {
                    return Err(Error::failed("Not enough words to delete with <Y>"));
                }
            }
            cmd @ (b'K' | b'D') => {
                begin_exec!(self, State::Start);
                self.exec_delete(cmd)?;
            }

            b'=' => {
                begin_exec!(self, State::Start);
                self.eval_exprs()?;
                if self.exprs.args() == 0 {
                    return Err(Error::new(ErrorKind::ArgExpected {
                        cmd: "=".to_string(),
                    }));
                }
                let v = self.pop_num_calc(0, 0)?;
                self.msg_user(v.to_string());
            }

            b'A' => {
                begin_exec!(self, State::Start);
                let n = self.pop_num_calc_implied()?;
                let v = self.view.pos() as TecoInt + n;
                // the end of the buffer holds no character
                if v < 0 || v >= self.view.length() as TecoInt {
                    return Err(Error::new(ErrorKind::Range {
                        cmd: "A".to_string(),
                    }));
                }
                let code = self.view.char_at(v as usize) as TecoInt;
                self.push_num(code);
            }

            _ => return Err(Error::new(ErrorKind::Syntax { chr })),
        }

        Ok(State::Start)
    }

    /// Loop end shared by `>` and `F>`. With `scan_to_end`, the final
    /// iteration enters parse-only mode to find the syntactic loop end.
    pub(crate) fn exec_loop_end(&mut self, scan_to_end: bool) -> Result<()> {
        if self.loop_stack.items() <= self.loop_fp {
            return Err(Error::new(ErrorKind::LoopUnmatched {
                cmd: if scan_to_end { "F>" } else { ">" }.to_string(),
            }));
        }
        let frame = *self.loop_stack.peek().expect("loop frame vanished");
        let colon_modified = self.eval_colon();

        // a colon-modified loop end aggregates values on the stack;
        // pass-through loops always keep them
        if !frame.pass_through {
            if colon_modified {
                self.eval_exprs()?;
                self.expr_push_entry(Entry::New);
            } else {
                self.discard_args()?;
            }
        }

        if frame.counter == 1 {
            // this was the last iteration
            if !frame.pass_through {
                self.brace_close(Entry::Loop)?;
            }
            self.loop_pop();
            if scan_to_end {
                self.set_mode(Mode::ParseOnlyLoop);
            }
        } else {
            self.macro_pc = frame.pc;
            self.loop_decrement();
        }
        Ok(())
    }

    fn movement_result(&mut self, rc: TecoInt, cmd: &str) -> Result<()> {
        if self.eval_colon() {
            self.push_num(rc);
        } else if is_failure(rc) {
            return Err(Error::new(ErrorKind::Move {
                cmd: cmd.to_string(),
            }));
        }
        Ok(())
    }

    pub(crate) fn validate_pos(&self, pos: TecoInt) -> bool {
        pos >= 0 && pos <= self.view.length() as TecoInt
    }

    pub(crate) fn validate_line(&self, line: TecoInt) -> bool {
        line >= 0 && line <= self.view.line_count() as TecoInt
    }

    pub(crate) fn move_chars(&mut self, n: TecoInt) -> TecoInt {
        let pos = self.view.pos() as TecoInt;
        if !self.validate_pos(pos + n) {
            return FAILURE;
        }
        if self.current_doc_must_undo() {
            self.undo.push(UndoOp::ViewPos(pos as usize));
        }
        self.view.goto_pos((pos + n) as usize);
        SUCCESS
    }

    pub(crate) fn move_lines(&mut self, n: TecoInt) -> TecoInt {
        let pos = self.view.pos();
        let line = self.view.line_from_position(pos) as TecoInt + n;
        if !self.validate_line(line) {
            return FAILURE;
        }
        if self.current_doc_must_undo() {
            self.undo.push(UndoOp::ViewPos(pos));
        }
        self.view.goto_line(line as usize);
        SUCCESS
    }

    fn exec_move_words(&mut self, v: TecoInt) -> Result<()> {
        let pos = self.view.pos();
        let leftward = v < 0;
        let mut remaining = v.unsigned_abs();
        while remaining > 0 {
            let before = self.view.pos();
            if leftward {
                self.view.move_word_left_end();
            } else {
                self.view.move_word_right_end();
            }
            if before == self.view.pos() {
                break;
            }
            remaining -= 1;
        }
        if remaining == 0 {
            if self.current_doc_must_undo() {
                self.undo.push(UndoOp::ViewPos(pos));
            }
            if self.eval_colon() {
                self.push_num(SUCCESS);
            }
        } else {
            self.view.goto_pos(pos);
            if self.eval_colon() {
                self.push_num(FAILURE);
            } else {
                return Err(Error::new(ErrorKind::Move {
                    cmd: "W".to_string(),
                }));
            }
        }
        Ok(())
    }

    /// `V`/`Y` word deletion; a partial delete is rolled back through the
    /// widget undo so failure has no observable effect.
    fn delete_words(&mut self, n: TecoInt) -> TecoInt {
        if n == 0 {
            return SUCCESS;
        }
        let pos = self.view.pos();
        let size = self.view.length();
        let leftward = n < 0;
        let mut remaining = n.unsigned_abs();
        self.view.begin_undo_action();
        while remaining > 0 {
            if leftward {
                let before = self.view.pos();
                self.view.move_word_left_end();
                if before == self.view.pos() {
                    break;
                }
                self.view.del_word_right_end();
            } else {
                let before = self.view.length();
                self.view.del_word_right_end();
                if before == self.view.length() {
                    break;
                }
            }
            remaining -= 1;
        }
        self.view.end_undo_action();

        if remaining > 0 {
            if size != self.view.length() {
                self.view.undo();
            }
            self.view.goto_pos(pos);
            return FAILURE;
        }

        self.undo.push(UndoOp::ViewPos(pos));
        if self.current_doc_must_undo() {
            self.undo.push(UndoOp::DocUndo(self.view.current_doc()));
        }
        self.dirtify();
        SUCCESS
    }

    fn exec_delete(&mut self, cmd: u8) -> Result<()> {
        self.eval_exprs()?;
        let (mut from, mut len, rc);
        if self.exprs.args() <= 1 {
            from = self.view.pos() as TecoInt;
            if cmd == b'D' {
                len = self.pop_num_calc_implied()?;
                rc = teco_bool(self.validate_pos(from + len));
            } else {
                let line =
                    self.view.line_from_position(from as usize) as TecoInt + self.pop_num_calc_implied()?;
                let clamped = line.clamp(0, self.view.line_count() as TecoInt) as usize;
                len = self.view.position_from_line(clamped) as TecoInt - from;
                rc = teco_bool(self.validate_line(line));
            }
            if len < 0 {
                from += len;
                len = -len;
            }
        } else {
            let to = self.pop_num()?;
            from = self.pop_num()?;
            len = to - from;
            rc = teco_bool(len >= 0 && self.validate_pos(from) && self.validate_pos(to));
        }

        if self.eval_colon() {
            self.push_num(rc);
        } else if is_failure(rc) {
            return Err(Error::new(ErrorKind::Range {
                cmd: (cmd as char).to_string(),
            }));
        }
        if len == 0 || is_failure(rc) {
            return Ok(());
        }

        if self.current_doc_must_undo() {
            self.undo.push(UndoOp::ViewPos(self.view.pos()));
            self.undo.push(UndoOp::DocUndo(self.view.current_doc()));
        }
        self.view.begin_undo_action();
        self.view.delete_range(from as usize, len as usize);
        self.view.end_undo_action();
        self.dirtify();
        Ok(())
    }

    /// Insert text at dot as one widget action, journaling its reversal.
    pub(crate) fn exec_insert(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.view.begin_undo_action();
        self.view.add_text(bytes);
        self.view.end_undo_action();
        self.dirtify();
        if self.current_doc_must_undo() {
            self.undo.push(UndoOp::DocUndo(self.view.current_doc()));
        }
    }

    pub(crate) fn insert_integer(&mut self, v: TecoInt) {
        let formatted = self.exprs.format(v);
        self.exec_insert(formatted.as_bytes());
    }

    /// Read an integer in the current radix from the buffer at dot, without
    /// moving dot.
    pub(crate) fn read_integer(&self) -> TecoInt {
        let radix = self.exprs.radix();
        let mut pos = self.view.pos();
        let mut sign = 1;
        if self.view.char_at(pos) == b'-' {
            pos += 1;
            sign = -1;
        }
        let mut v: TecoInt = 0;
        loop {
            let c = to_upper(self.view.char_at(pos));
            let valid = match c {
                b'0'..=b'9' => ((c - b'0') as TecoInt) < radix.min(10),
                b'A'..=b'Z' => radix > 10 && ((c - b'A' + 10) as TecoInt) < radix,
                _ => false,
            };
            if !valid {
                break;
            }
            v = v.wrapping_mul(radix).wrapping_add(digit_value(c));
            pos += 1;
        }
        sign * v
    }

    /// `{`: copy the executed command line into the replacement register
    /// and edit it.
    fn open_cmdline_edit(&mut self) -> Result<()> {
        self.undo_edit_current();
        let executed = self.cmdline_executed().to_vec();
        let addr = crate::buffers::registers::RegAddr::global(ESCAPE_NAME);
        let addr = self.resolve_reg(addr)?;
        self.edit_register(addr);

        self.view.begin_undo_action();
        self.view.clear_all();
        self.view.add_text(&executed);
        self.view.end_undo_action();
        // editing the replacement register always supports undo
        self.undo.push(UndoOp::DocUndo(self.view.current_doc()));
        Ok(())
    }
}
