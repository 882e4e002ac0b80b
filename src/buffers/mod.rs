//! Document and register model
//!
//! - [`ring`]: the ordered sequence of open file buffers, savepoint-based
//!   saving and deferred buffer destruction
//! - [`registers`]: Q-Register tables, the save/restore stack and register
//!   string payloads
//!
//! Exactly one entity is edited at a time: either a ring buffer or a
//! register. The helpers here switch between them, journaling enough to
//! restore the previous situation on rubout.

pub mod registers;
pub mod ring;

use crate::interpreter::engine::Interpreter;
use crate::undo::UndoOp;
use registers::RegAddr;

impl Interpreter {
    /// Remember the caret of whatever is currently edited in its `dot`
    /// field, so it survives a document switch.
    pub(crate) fn current_save_dot(&mut self) {
        let pos = self.view.pos();
        if let Some(buffer) = self.ring.current_mut() {
            buffer.dot = pos;
        } else if let Some(addr) = self.current_reg.clone() {
            self.reg_mut(&addr).dot = pos;
        }
    }

    /// Journal everything needed to come back to the currently edited
    /// entity: the ring/register pointers and the widget state. Call before
    /// switching to another buffer or register.
    pub(crate) fn undo_edit_current(&mut self) {
        self.undo.push(UndoOp::CurrentBuffer(self.ring.current));
        self.undo
            .push(UndoOp::CurrentRegister(self.current_reg.clone()));
        self.undo.push(UndoOp::ViewPos(self.view.pos()));
        self.undo.push(UndoOp::ViewDoc(self.view.current_doc()));
    }

    /// Switch editing to a register (`EQq$` with an empty string, `{`).
    pub(crate) fn edit_register(&mut self, addr: RegAddr) {
        self.current_save_dot();
        let doc = self.reg_doc_id(&addr);
        let dot = self.reg(&addr).dot;
        self.ring.current = None;
        self.current_reg = Some(addr);
        self.view.set_doc(doc);
        self.view.goto_pos(dot);
    }

    /// Whether mutations of the currently edited document take journal
    /// tokens: always for ring buffers, per-register otherwise.
    pub(crate) fn current_doc_must_undo(&self) -> bool {
        if self.ring.current.is_some() {
            return true;
        }
        match &self.current_reg {
            Some(addr) => self.reg_must_undo(addr),
            None => true,
        }
    }
}
