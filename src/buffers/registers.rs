//! Q-Registers
//!
//! A register is a named slot holding a signed integer and, lazily, a
//! document of its own (its string payload). Registers serve as variables,
//! clipboards and subroutine storage. The global table exists for the whole
//! session; each macro invocation that asks for locals gets its own table
//! which vanishes when the frame returns.
//!
//! Register mutations are journaled only when the owning table carries
//! `must_undo`; local tables are scratch space and skip token recording.

use rustc_hash::FxHashMap;
use std::path::Path;

use crate::interpreter::constants::TecoInt;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::undo::UndoOp;
use crate::view::DocId;

/// Address of a register: which table plus the normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegAddr {
    pub local: bool,
    pub name: String,
}

impl RegAddr {
    pub fn global(name: impl Into<String>) -> Self {
        RegAddr {
            local: false,
            name: name.into(),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        RegAddr {
            local: true,
            name: name.into(),
        }
    }
}

/// Behavior of a register's value accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegKind {
    Plain,
    /// `*`: ordinal and filename of the current buffer.
    BufferInfo,
    /// `$`: the process working directory.
    WorkingDir,
}

#[derive(Debug)]
pub struct Register {
    pub integer: TecoInt,
    pub dot: usize,
    pub doc: Option<DocId>,
    pub must_undo: bool,
    pub kind: RegKind,
}

impl Register {
    fn new(must_undo: bool) -> Self {
        Register {
            integer: 0,
            dot: 0,
            doc: None,
            must_undo,
            kind: RegKind::Plain,
        }
    }
}

/// One table of registers. `auto_create` lets unknown names spring into
/// existence on first use.
#[derive(Debug)]
pub struct RegisterTable {
    regs: FxHashMap<String, Register>,
    pub must_undo: bool,
    pub auto_create: bool,
}

impl RegisterTable {
    /// An empty table, as used for macro locals.
    pub fn locals() -> Self {
        RegisterTable {
            regs: FxHashMap::default(),
            must_undo: false,
            auto_create: true,
        }
    }

    /// The global table with the general-purpose defaults, the special
    /// registers and one `$NAME` register per environment variable.
    pub fn globals() -> Self {
        let mut table = RegisterTable {
            regs: FxHashMap::default(),
            must_undo: true,
            auto_create: true,
        };
        table.insert_defaults();
        table.insert_special("*", RegKind::BufferInfo);
        table.insert_special("$", RegKind::WorkingDir);
        table.insert_special(crate::interpreter::constants::SEARCH_REG, RegKind::Plain);
        table.insert_special(crate::interpreter::constants::ESCAPE_NAME, RegKind::Plain);
        for (name, _) in std::env::vars_os() {
            let name = name.to_string_lossy().into_owned();
            table.insert_special(&format!("${}", name), RegKind::Plain);
        }
        table
    }

    /// The general-purpose registers A-Z and 0-9.
    pub fn insert_defaults(&mut self) {
        for q in b'A'..=b'Z' {
            self.regs
                .insert((q as char).to_string(), Register::new(self.must_undo));
        }
        for q in b'0'..=b'9' {
            self.regs
                .insert((q as char).to_string(), Register::new(self.must_undo));
        }
    }

    fn insert_special(&mut self, name: &str, kind: RegKind) {
        let mut reg = Register::new(self.must_undo);
        reg.kind = kind;
        self.regs.insert(name.to_string(), reg);
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.regs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Register> {
        self.regs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regs.contains_key(name)
    }

    pub fn insert(&mut self, name: String) -> &mut Register {
        let must_undo = self.must_undo;
        self.regs.entry(name).or_insert_with(|| Register::new(must_undo))
    }

    pub fn remove(&mut self, name: &str) -> Option<Register> {
        self.regs.remove(name)
    }
}

/// A saved register state on the push/pop stack.
#[derive(Debug)]
pub struct RegStackEntry {
    pub integer: TecoInt,
    pub dot: usize,
    pub doc: Option<DocId>,
}

#[derive(Debug, Default)]
pub struct RegisterStack {
    pub(crate) entries: Vec<RegStackEntry>,
}

impl RegisterStack {
    pub fn new() -> Self {
        RegisterStack {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Interpreter {
    fn table(&self, local: bool) -> &RegisterTable {
        if local {
            self.locals.last().expect("no local register table")
        } else {
            &self.globals
        }
    }

    fn table_mut(&mut self, local: bool) -> &mut RegisterTable {
        if local {
            self.locals.last_mut().expect("no local register table")
        } else {
            &mut self.globals
        }
    }

    /// Look a register up by table and name, creating it when the table
    /// auto-creates. Creation of an undoable register is journaled so that
    /// rubout removes it again.
    pub(crate) fn resolve_reg(&mut self, addr: RegAddr) -> Result<RegAddr> {
        if self.table(addr.local).contains(&addr.name) {
            return Ok(addr);
        }
        if !self.table(addr.local).auto_create {
            return Err(Error::failed(format!(
                "Undefined Q-Register \"{}\"",
                addr.name
            )));
        }
        let must_undo = self.table(addr.local).must_undo;
        self.table_mut(addr.local).insert(addr.name.clone());
        if must_undo {
            self.undo.push(UndoOp::RegRemove { addr: addr.clone() });
        }
        Ok(addr)
    }

    pub(crate) fn reg(&self, addr: &RegAddr) -> &Register {
        self.table(addr.local)
            .get(&addr.name)
            .expect("register vanished")
    }

    pub(crate) fn reg_mut(&mut self, addr: &RegAddr) -> &mut Register {
        self.table_mut(addr.local)
            .get_mut(&addr.name)
            .expect("register vanished")
    }

    pub(crate) fn reg_must_undo(&self, addr: &RegAddr) -> bool {
        self.reg(addr).must_undo
    }

    // --- integer access ---

    pub(crate) fn reg_get_integer(&self, addr: &RegAddr) -> TecoInt {
        match self.reg(addr).kind {
            RegKind::Plain => self.reg(addr).integer,
            RegKind::BufferInfo => self.ring.current_ordinal().unwrap_or(0),
            RegKind::WorkingDir => 0,
        }
    }

    pub(crate) fn reg_set_integer(&mut self, addr: &RegAddr, value: TecoInt) {
        if self.reg_must_undo(addr) {
            let old = self.reg(addr).integer;
            self.undo.push(UndoOp::RegInt {
                addr: addr.clone(),
                value: old,
            });
        }
        self.reg_mut(addr).integer = value;
    }

    // --- string access ---

    /// The register's document, created on first use.
    pub(crate) fn reg_doc_id(&mut self, addr: &RegAddr) -> DocId {
        if let Some(doc) = self.reg(addr).doc {
            return doc;
        }
        let doc = self.view.create_doc();
        self.reg_mut(addr).doc = Some(doc);
        doc
    }

    pub(crate) fn reg_get_string(&self, addr: &RegAddr) -> Vec<u8> {
        match self.reg(addr).kind {
            RegKind::Plain => match self.reg(addr).doc {
                Some(doc) => self.view.doc_text(doc),
                None => Vec::new(),
            },
            RegKind::BufferInfo => self
                .ring
                .current()
                .and_then(|b| b.filename.as_ref())
                .map(|p| p.as_os_str().to_string_lossy().into_owned().into_bytes())
                .unwrap_or_default(),
            RegKind::WorkingDir => std::env::current_dir()
                .map(|p| p.as_os_str().to_string_lossy().into_owned().into_bytes())
                .unwrap_or_default(),
        }
    }

    fn reg_undo_string_change(&mut self, addr: &RegAddr, doc: DocId) {
        if self.reg_must_undo(addr) {
            let dot = self.reg(addr).dot;
            self.undo.push(UndoOp::RegDot {
                addr: addr.clone(),
                dot,
            });
            self.undo.push(UndoOp::DocUndo(doc));
        }
    }

    /// Replace the register's string payload. The widget-level changes are
    /// bracketed into one action so a single widget undo reverts them.
    pub(crate) fn reg_set_string(&mut self, addr: &RegAddr, bytes: &[u8]) {
        let doc = self.reg_doc_id(addr);
        self.reg_undo_string_change(addr, doc);
        let current = self.view.current_doc();
        self.view.set_doc(doc);
        self.view.begin_undo_action();
        self.view.set_text(bytes);
        self.view.end_undo_action();
        self.view.set_doc(current);
        self.reg_mut(addr).dot = 0;
    }

    pub(crate) fn reg_append_string(&mut self, addr: &RegAddr, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let doc = self.reg_doc_id(addr);
        self.reg_undo_string_change(addr, doc);
        let current = self.view.current_doc();
        self.view.set_doc(doc);
        self.view.begin_undo_action();
        self.view.append_text(bytes);
        self.view.end_undo_action();
        self.view.set_doc(current);
    }

    /// Replace the register's string with the contents of a file.
    pub(crate) fn reg_load(&mut self, addr: &RegAddr, path: &Path) -> Result<()> {
        let contents = std::fs::read(path)
            .map_err(|e| Error::io(&format!("Cannot read \"{}\"", path.display()), e))?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "register load");
        self.reg_set_string(addr, &contents);
        Ok(())
    }

    /// Write the register's string to a file.
    pub(crate) fn reg_save(&mut self, addr: &RegAddr, path: &Path) -> Result<()> {
        let contents = self.reg_get_string(addr);
        if self.undo.enabled {
            if path.exists() {
                return Err(Error::failed(format!(
                    "Cannot overwrite \"{}\" in interactive mode",
                    path.display()
                )));
            }
            self.undo.push(UndoOp::RemoveFile(path.to_path_buf()));
        }
        std::fs::write(path, &contents)
            .map_err(|e| Error::io(&format!("Cannot write \"{}\"", path.display()), e))?;
        Ok(())
    }

    // --- save/restore stack ---

    /// `[q`: copy the register's state onto the stack.
    pub(crate) fn reg_stack_push(&mut self, addr: &RegAddr) {
        let integer = self.reg_get_integer(addr);
        let dot = self.reg(addr).dot;
        let doc = match self.reg(addr).doc {
            Some(src) => {
                let copy = self.view.create_doc();
                let text = self.view.doc_text(src);
                let current = self.view.current_doc();
                self.view.set_doc(copy);
                self.view.set_text(&text);
                self.view.set_doc(current);
                Some(copy)
            }
            None => None,
        };
        self.reg_stack.entries.push(RegStackEntry { integer, dot, doc });
        self.undo.push(UndoOp::RegStackPop);
    }

    /// `]q`: exchange the top stack entry with the register's state. The
    /// popped entry moves into the journal, which keeps the document it
    /// received from the register alive for a possible rubout.
    pub(crate) fn reg_stack_pop(&mut self, addr: &RegAddr) -> Result<()> {
        let mut entry = self
            .reg_stack
            .entries
            .pop()
            .ok_or(Error::new(ErrorKind::RegisterStackEmpty))?;

        let must_undo = self.reg_must_undo(addr);
        if must_undo {
            let old_int = self.reg(addr).integer;
            let old_dot = self.reg(addr).dot;
            self.undo.push(UndoOp::RegInt {
                addr: addr.clone(),
                value: old_int,
            });
            self.undo.push(UndoOp::RegDot {
                addr: addr.clone(),
                dot: old_dot,
            });
            let old_doc = self.reg(addr).doc;
            self.undo.push(UndoOp::RegDoc {
                addr: addr.clone(),
                doc: old_doc,
            });
        }

        // exchange document ownership between stack entry and register
        let reg_doc = self.reg(addr).doc;
        let entry_doc = entry.doc;
        self.undo.push(UndoOp::RegStackTopDoc(entry_doc));
        self.reg_mut(addr).doc = entry_doc;
        self.reg_mut(addr).integer = entry.integer;
        self.reg_mut(addr).dot = entry.dot;
        entry.doc = reg_doc;

        // the journal owns the popped entry until the command line commits
        self.undo.push(UndoOp::RegStackPush(entry));
        Ok(())
    }

    /// Execute the register's string as a macro.
    pub(crate) fn reg_execute(&mut self, addr: &RegAddr, locals: bool) -> Result<()> {
        let text = self.reg_get_string(addr);
        self.execute_macro(&text, locals).map_err(|mut e| {
            if !e.is_control_flow() {
                e.add_frame(crate::interpreter::errors::FrameKind::Register {
                    name: addr.name.clone(),
                });
            }
            e
        })
    }

    /// Run an edit hook if the hooks flag is active. Hooks execute the
    /// global register `0` with the hook code on the stack.
    pub(crate) fn run_hook(&mut self, code: TecoInt) -> Result<()> {
        if self.ed_flags & crate::interpreter::constants::ED_HOOKS == 0 {
            return Ok(());
        }
        self.push_num(code);
        self.reg_execute(&RegAddr::global("0"), true)
    }
}
