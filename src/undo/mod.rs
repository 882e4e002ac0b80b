//! Undo journal
//!
//! Every observable mutation pushes a reversal token. Tokens are tagged with
//! the command-line position of the character that caused them; rubbing out
//! characters executes tokens strictly LIFO back to the wanted boundary,
//! which restores the interpreter state exactly.
//!
//! The journal owns captured resources: a closed buffer lives inside its
//! reinsertion token, a savepoint file belongs to its restoration token, a
//! popped register-stack entry keeps the document it received. When the
//! command line commits and the journal is discarded forward, those
//! resources are released ([`Interpreter::dispose_undo_op`]).
//!
//! In batch mode the journal is disabled and every push is a no-op;
//! mutations become irreversible, which is what a munged script wants.

use std::path::PathBuf;

use crate::buffers::registers::{RegAddr, RegStackEntry};
use crate::buffers::ring::{Buffer, BufferId};
use crate::interpreter::constants::TecoInt;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::expressions::Entry;
use crate::interpreter::loops::LoopFrame;
use crate::interpreter::messages::Severity;
use crate::parser::strings::{RegSpecMachine, StringBuilder};
use crate::parser::{Mode, State};
use crate::view::{DocId, EolMode};

/// One reversal token.
#[derive(Debug)]
pub enum UndoOp {
    // parser state machine
    State(State),
    Mode(Mode),
    SkipElse(bool),
    NestLevel(u32),
    Colon(bool),
    At(bool),
    EscapeChar(u8),
    DigitRun(bool),

    // string argument machinery
    StringBuf(Option<Vec<u8>>),
    StringNesting(u32),
    InsertLen(usize),
    Builder(StringBuilder),
    RegSpec(RegSpecMachine),
    RegArgument(Option<RegAddr>),
    LabelBuf(Option<Vec<u8>>),

    // expression stack
    ExprPop,
    ExprPush(Entry),
    NumSign(TecoInt),
    Radix(TecoInt),
    BraceLevel(u32),

    // loop stack
    LoopPop,
    LoopPush(LoopFrame),
    LoopCounter { depth: usize, counter: TecoInt },

    // widget
    ViewDoc(DocId),
    ViewPos(usize),
    ViewEol(EolMode),
    DocUndo(DocId),

    // registers
    RegInt { addr: RegAddr, value: TecoInt },
    RegDot { addr: RegAddr, dot: usize },
    RegDoc { addr: RegAddr, doc: Option<DocId> },
    RegRemove { addr: RegAddr },
    RegStackPop,
    RegStackPush(RegStackEntry),
    RegStackTopDoc(Option<DocId>),

    // buffer ring
    CurrentBuffer(Option<BufferId>),
    CurrentRegister(Option<RegAddr>),
    Dirty { id: BufferId, value: bool },
    Filename { id: BufferId, value: Option<PathBuf> },
    ReinsertBuffer { index: usize, buffer: Buffer },
    CloseBuffer { id: BufferId },

    // filesystem
    RestoreSavepoint {
        savepoint: PathBuf,
        original: PathBuf,
        buffer: BufferId,
    },
    RemoveFile(PathBuf),
    ChangeDir(PathBuf),

    // interpreter flags and goto tables
    QuitRequested(bool),
    EdFlags(TecoInt),
    MemoryLimit(usize),
    Message(Option<(Severity, String)>),
    GotoRemove { label: String },
    GotoRestore { label: String, pc: usize },
    SkipLabel(Option<String>),
}

impl UndoOp {
    /// Rough storage cost for the memory limit check.
    fn weight(&self) -> usize {
        32 + match self {
            UndoOp::StringBuf(Some(s)) | UndoOp::LabelBuf(Some(s)) => s.len(),
            UndoOp::ReinsertBuffer { .. } => 128,
            UndoOp::Message(Some((_, s))) => s.len(),
            _ => 0,
        }
    }
}

/// The LIFO journal, tokens tagged by command-line boundary.
#[derive(Debug, Default)]
pub struct UndoJournal {
    tokens: Vec<(usize, UndoOp)>,
    /// Disabled in batch mode: pushes become no-ops.
    pub enabled: bool,
    /// Boundary assigned to subsequently pushed tokens.
    boundary: usize,
    approx_bytes: usize,
}

impl UndoJournal {
    pub fn new() -> Self {
        UndoJournal {
            tokens: Vec::new(),
            enabled: false,
            boundary: 0,
            approx_bytes: 0,
        }
    }

    pub fn push(&mut self, op: UndoOp) {
        if !self.enabled {
            return;
        }
        self.approx_bytes += op.weight();
        self.tokens.push((self.boundary, op));
    }

    pub fn set_boundary(&mut self, pos: usize) {
        self.boundary = pos;
    }

    /// Remove the tokens belonging to boundaries at or after `pos`, newest
    /// first, ready to be executed.
    pub fn take_to(&mut self, pos: usize) -> Vec<UndoOp> {
        let mut ops = Vec::new();
        while matches!(self.tokens.last(), Some((p, _)) if *p >= pos) {
            let (_, op) = self.tokens.pop().expect("token vanished");
            self.approx_bytes = self.approx_bytes.saturating_sub(op.weight());
            ops.push(op);
        }
        ops
    }

    /// Discard everything forward, handing the tokens out for resource
    /// disposal.
    pub fn drain_all(&mut self) -> Vec<(usize, UndoOp)> {
        self.approx_bytes = 0;
        std::mem::take(&mut self.tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn approx_bytes(&self) -> usize {
        self.approx_bytes
    }
}

impl Interpreter {
    /// Execute reversal tokens back to the command-line boundary `pos`.
    pub(crate) fn rubout_to(&mut self, pos: usize) {
        let ops = self.undo.take_to(pos);
        for op in ops {
            self.run_undo_op(op);
        }
    }

    fn run_undo_op(&mut self, op: UndoOp) {
        match op {
            UndoOp::State(s) => self.state = s,
            UndoOp::Mode(m) => self.mode = m,
            UndoOp::SkipElse(v) => self.skip_else = v,
            UndoOp::NestLevel(v) => self.nest_level = v,
            UndoOp::Colon(v) => self.colon = v,
            UndoOp::At(v) => self.at = v,
            UndoOp::EscapeChar(c) => self.escape_char = c,
            UndoOp::DigitRun(v) => self.digit_run = v,

            UndoOp::StringBuf(buf) => self.string.buf = buf,
            UndoOp::StringNesting(n) => self.string.nesting = n,
            UndoOp::InsertLen(n) => self.string.insert_len = n,
            UndoOp::Builder(b) => self.string.builder = b,
            UndoOp::RegSpec(m) => self.regspec = m,
            UndoOp::RegArgument(a) => self.reg_argument = a,
            UndoOp::LabelBuf(buf) => self.label_buf = buf,

            UndoOp::ExprPop => {
                self.exprs.entries.pop();
            }
            UndoOp::ExprPush(e) => self.exprs.entries.push(e),
            UndoOp::NumSign(v) => self.exprs.num_sign = v,
            UndoOp::Radix(v) => self.exprs.radix = v,
            UndoOp::BraceLevel(v) => self.exprs.brace_level = v,

            UndoOp::LoopPop => {
                self.loop_stack.frames_mut().pop();
            }
            UndoOp::LoopPush(f) => self.loop_stack.frames_mut().push(f),
            UndoOp::LoopCounter { depth, counter } => {
                if let Some(frame) = self.loop_stack.frames_mut().get_mut(depth) {
                    frame.counter = counter;
                }
            }

            UndoOp::ViewDoc(d) => self.view.set_doc(d),
            UndoOp::ViewPos(p) => self.view.goto_pos(p),
            UndoOp::ViewEol(m) => self.view.set_eol_mode(m),
            UndoOp::DocUndo(d) => self.view.undo_doc(d),

            UndoOp::RegInt { addr, value } => self.reg_mut(&addr).integer = value,
            UndoOp::RegDot { addr, dot } => self.reg_mut(&addr).dot = dot,
            UndoOp::RegDoc { addr, doc } => self.reg_mut(&addr).doc = doc,
            UndoOp::RegRemove { addr } => {
                if let Some(reg) = self.remove_reg(&addr) {
                    if let Some(doc) = reg.doc {
                        self.view.free_doc(doc);
                    }
                }
            }
            UndoOp::RegStackPop => {
                if let Some(entry) = self.reg_stack.entries.pop() {
                    if let Some(doc) = entry.doc {
                        self.view.free_doc(doc);
                    }
                }
            }
            UndoOp::RegStackPush(entry) => self.reg_stack.entries.push(entry),
            UndoOp::RegStackTopDoc(doc) => {
                if let Some(top) = self.reg_stack.entries.last_mut() {
                    top.doc = doc;
                }
            }

            UndoOp::CurrentBuffer(id) => self.ring.current = id,
            UndoOp::CurrentRegister(addr) => self.current_reg = addr,
            UndoOp::Dirty { id, value } => {
                if let Some(buffer) = self.ring.get_mut(id) {
                    buffer.dirty = value;
                }
            }
            UndoOp::Filename { id, value } => {
                if let Some(buffer) = self.ring.get_mut(id) {
                    buffer.filename = value;
                }
            }
            UndoOp::ReinsertBuffer { index, buffer } => {
                let id = buffer.id;
                let doc = buffer.doc;
                let dot = buffer.dot;
                let index = index.min(self.ring.buffers.len());
                self.ring.buffers.insert(index, buffer);
                self.ring.current = Some(id);
                self.view.set_doc(doc);
                self.view.goto_pos(dot);
            }
            UndoOp::CloseBuffer { id } => {
                if let Some(index) = self.ring.buffers.iter().position(|b| b.id == id) {
                    let buffer = self.ring.buffers.remove(index);
                    if self.ring.current == Some(id) {
                        self.ring.current = None;
                    }
                    self.view.free_doc(buffer.doc);
                }
            }

            UndoOp::RestoreSavepoint {
                savepoint,
                original,
                buffer,
            } => {
                if std::fs::rename(&savepoint, &original).is_err() {
                    self.msg_warning(format!(
                        "Unable to restore save point file \"{}\"",
                        savepoint.display()
                    ));
                }
                if let Some(b) = self.ring.get_mut(buffer) {
                    b.savepoint_id = b.savepoint_id.saturating_sub(1);
                }
            }
            UndoOp::RemoveFile(path) => {
                let _ = std::fs::remove_file(path);
            }
            UndoOp::ChangeDir(path) => {
                // failure to change back is handled silently
                let _ = std::env::set_current_dir(path);
            }

            UndoOp::QuitRequested(v) => self.quit_requested = v,
            UndoOp::EdFlags(v) => self.ed_flags = v,
            UndoOp::MemoryLimit(v) => self.memory_limit = v,
            UndoOp::Message(m) => self.messages.last = m,
            UndoOp::GotoRemove { label } => {
                self.goto_table.remove(&label);
            }
            UndoOp::GotoRestore { label, pc } => {
                self.goto_table.insert(label, pc);
            }
            UndoOp::SkipLabel(l) => self.skip_label = l,
        }
    }

    /// Commit the command line: discard the journal forward and release the
    /// resources its tokens captured.
    pub(crate) fn commit_undo(&mut self) {
        for (_, op) in self.undo.drain_all() {
            self.dispose_undo_op(op);
        }
    }

    fn dispose_undo_op(&mut self, op: UndoOp) {
        match op {
            UndoOp::ReinsertBuffer { buffer, .. } => {
                // the buffer stays closed for good
                self.view.free_doc(buffer.doc);
            }
            UndoOp::RegStackPush(entry) => {
                if let Some(doc) = entry.doc {
                    self.view.free_doc(doc);
                }
            }
            UndoOp::RestoreSavepoint {
                savepoint, buffer, ..
            } => {
                let _ = std::fs::remove_file(&savepoint);
                if let Some(b) = self.ring.get_mut(buffer) {
                    b.savepoint_id = b.savepoint_id.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    fn remove_reg(&mut self, addr: &RegAddr) -> Option<crate::buffers::registers::Register> {
        if addr.local {
            self.locals.last_mut()?.remove(&addr.name)
        } else {
            self.globals.remove(&addr.name)
        }
    }
}
