//! Labels and computed goto
//!
//! `!name!` records a label in the current macro frame's goto table,
//! pointing just past its closing `!`. `Olabel$` (or the computed form
//! `nOlab1,lab2,...$`) jumps to it: backwards through the table, forwards
//! by scanning in [`Mode::ParseOnlyGoto`] until the label turns up. A label
//! that never turns up is diagnosed when the macro ends.

use rustc_hash::FxHashMap;

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::parser::{Mode, State};
use crate::undo::UndoOp;

/// Label name to the position of its closing `!`.
pub type GotoTable = FxHashMap<String, usize>;

impl Interpreter {
    pub(crate) fn state_label(&mut self, chr: u8) -> Result<State> {
        if chr == 0 {
            self.undo.push(UndoOp::LabelBuf(self.label_buf.take()));
            self.label_buf = Some(Vec::new());
            return Ok(State::Label);
        }

        if chr != b'!' {
            self.undo.push(UndoOp::LabelBuf(self.label_buf.clone()));
            self.label_buf
                .get_or_insert_with(Vec::new)
                .push(chr);
            return Ok(State::Label);
        }

        // closing '!': register the label at the current position
        self.undo.push(UndoOp::LabelBuf(self.label_buf.clone()));
        let name = String::from_utf8_lossy(&self.label_buf.take().unwrap_or_default()).into_owned();

        match self.goto_table.get(&name) {
            Some(&pc) => self.undo.push(UndoOp::GotoRestore {
                label: name.clone(),
                pc,
            }),
            None => self.undo.push(UndoOp::GotoRemove {
                label: name.clone(),
            }),
        }
        self.goto_table.insert(name.clone(), self.macro_pc);

        if self.mode == Mode::ParseOnlyGoto && self.skip_label.as_deref() == Some(name.as_str()) {
            self.undo.push(UndoOp::SkipLabel(self.skip_label.take()));
            self.set_mode(Mode::Normal);
        }
        Ok(State::Start)
    }

    /// The `O` command's string argument: comma-separated label list, with
    /// an optional index selecting which one to take.
    pub(crate) fn exec_goto(&mut self, labels: &[u8]) -> Result<()> {
        let labels: Vec<&[u8]> = labels.split(|&b| b == b',').collect();
        let index = self.pop_num_calc(1, 1)?;

        if index < 1 || index as usize > labels.len() {
            return Ok(());
        }
        let label = String::from_utf8_lossy(labels[index as usize - 1]).into_owned();
        if label.is_empty() {
            return Ok(());
        }

        match self.goto_table.get(&label) {
            Some(&pc) => {
                self.macro_pc = pc;
            }
            None => {
                // not seen yet: scan forward for it
                self.undo.push(UndoOp::SkipLabel(self.skip_label.clone()));
                self.skip_label = Some(label);
                self.set_mode(Mode::ParseOnlyGoto);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;

    #[test]
    fn test_forward_goto_skips_commands() {
        let mut interp = Interpreter::new();
        interp.execute(b"1Oskip\x1b 100 !skip! 2").unwrap();
        assert_eq!(interp.stack_numbers(), vec![1, 2]);
    }

    #[test]
    fn test_backward_goto_loops() {
        // counts down with an explicit backward jump
        let mut interp = Interpreter::new();
        interp
            .execute(b"3UA !again! QA-1UA QA\"G Oagain\x1b '")
            .unwrap();
        assert_eq!(interp.stack_numbers(), Vec::<i64>::new());
        interp.execute(b"QA").unwrap();
        assert_eq!(interp.stack_numbers(), vec![0]);
    }

    #[test]
    fn test_missing_label_errors() {
        let mut interp = Interpreter::new();
        assert!(interp.execute(b"Onowhere\x1b 1 2").is_err());
    }
}
