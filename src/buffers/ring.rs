//! Buffer ring
//!
//! The ordered sequence of open documents. Buffers are addressed by ordinal
//! (1 is the first; 0 means "show the chooser") or by canonicalized
//! filename, which is unique within the ring. A closed buffer is not freed
//! immediately: the journal token that can reinsert it owns it until the
//! command line commits.
//!
//! Saving goes through savepoints: the existing file is renamed to a hidden
//! sibling first, and the journal gets a token able to rename it back, so a
//! rubbed-out save restores the on-disk state bit for bit.

use std::path::{Path, PathBuf};

use crate::interpreter::constants::TecoInt;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Error, ErrorKind, Result};
use crate::undo::UndoOp;
use crate::view::{DocId, EolMode};

pub type BufferId = u64;

/// Hook codes executed through the global register `0` when ED hooks are
/// enabled.
pub const HOOK_ADD: TecoInt = 1;
pub const HOOK_EDIT: TecoInt = 2;

#[derive(Debug)]
pub struct Buffer {
    pub id: BufferId,
    pub doc: DocId,
    pub filename: Option<PathBuf>,
    pub dot: usize,
    pub dirty: bool,
    pub savepoint_id: u32,
}

#[derive(Debug, Default)]
pub struct Ring {
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) current: Option<BufferId>,
    next_id: BufferId,
}

impl Ring {
    pub fn new() -> Self {
        Ring {
            buffers: Vec::new(),
            current: None,
            next_id: 1,
        }
    }

    pub(crate) fn allocate(&mut self, doc: DocId) -> BufferId {
        let id = self.next_id;
        self.next_id += 1;
        self.buffers.push(Buffer {
            id,
            doc,
            filename: None,
            dot: 0,
            dirty: false,
            savepoint_id: 0,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.iter_mut().find(|b| b.id == id)
    }

    pub fn current(&self) -> Option<&Buffer> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn current_mut(&mut self) -> Option<&mut Buffer> {
        let id = self.current?;
        self.get_mut(id)
    }

    /// 1-based ordinal of the current buffer.
    pub fn current_ordinal(&self) -> Option<TecoInt> {
        let id = self.current?;
        self.buffers
            .iter()
            .position(|b| b.id == id)
            .map(|i| (i + 1) as TecoInt)
    }

    pub fn find_by_ordinal(&self, ordinal: TecoInt) -> Option<BufferId> {
        if ordinal < 1 {
            return None;
        }
        self.buffers.get(ordinal as usize - 1).map(|b| b.id)
    }

    pub fn find_by_filename(&self, resolved: &Path) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|b| b.filename.as_deref() == Some(resolved))
            .map(|b| b.id)
    }

    pub fn is_any_dirty(&self) -> bool {
        self.buffers.iter().any(|b| b.dirty)
    }

    fn index_of(&self, id: BufferId) -> Option<usize> {
        self.buffers.iter().position(|b| b.id == id)
    }
}

/// Canonical absolute form of a path: realpath when it resolves, otherwise
/// the canonical parent joined with the file name, otherwise a plain CWD
/// join.
pub fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let file_name = path.file_name().map(PathBuf::from);
    if let (Some(parent), Some(name)) = (path.parent(), file_name) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(resolved) = parent.canonicalize() {
            return resolved.join(name);
        }
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn display_name(buffer: &Buffer) -> String {
    buffer
        .filename
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(Unnamed)".to_string())
}

impl Interpreter {
    /// Make the current buffer dirty, journaling the transition.
    pub(crate) fn dirtify(&mut self) {
        let Some(id) = self.ring.current else {
            return;
        };
        let Some(buffer) = self.ring.get(id) else {
            return;
        };
        if buffer.dirty {
            return;
        }
        self.undo.push(UndoOp::Dirty { id, value: false });
        if let Some(buffer) = self.ring.get_mut(id) {
            buffer.dirty = true;
        }
    }

    /// Switch editing to a buffer that is already in the ring.
    pub(crate) fn install_buffer(&mut self, id: BufferId) {
        self.current_save_dot();
        self.current_reg = None;
        self.ring.current = Some(id);
        let (doc, dot) = {
            let buffer = self.ring.get(id).expect("buffer vanished");
            (buffer.doc, buffer.dot)
        };
        self.view.set_doc(doc);
        self.view.goto_pos(dot);
    }

    /// `EB` by ordinal. Fails on an out-of-range id.
    pub(crate) fn edit_buffer_id(&mut self, ordinal: TecoInt) -> Result<()> {
        let id = self
            .ring
            .find_by_ordinal(ordinal)
            .ok_or(Error::new(ErrorKind::InvalidBufferId { id: ordinal }))?;
        self.undo_edit_current();
        self.install_buffer(id);
        self.run_hook(HOOK_EDIT)?;
        Ok(())
    }

    /// `EB` by filename (or unnamed when `None`): switch to an existing
    /// buffer or add a new one to the ring, loading the file if it exists.
    pub(crate) fn edit_buffer_file(&mut self, filename: Option<&Path>) -> Result<()> {
        self.undo_edit_current();

        let resolved = filename.map(absolute_path);
        let existing = match &resolved {
            Some(resolved) => self.ring.find_by_filename(resolved),
            // an empty EB argument selects the first unnamed buffer
            None => self
                .ring
                .buffers
                .iter()
                .find(|b| b.filename.is_none())
                .map(|b| b.id),
        };
        if let Some(id) = existing {
            self.install_buffer(id);
            self.run_hook(HOOK_EDIT)?;
            return Ok(());
        }

        // new ring member; rubbing the command out closes it again
        let doc = self.view.create_doc();
        let id = self.ring.allocate(doc);
        self.current_save_dot();
        self.current_reg = None;
        self.ring.current = Some(id);
        self.view.set_doc(doc);
        self.undo.push(UndoOp::CloseBuffer { id });

        match &resolved {
            Some(path) if path.is_file() => {
                let contents = std::fs::read(path)
                    .map_err(|e| Error::io(&format!("Cannot read \"{}\"", path.display()), e))?;
                tracing::debug!(path = %path.display(), bytes = contents.len(), "buffer load");
                self.view.begin_undo_action();
                self.view.clear_all();
                self.view.append_text(&contents);
                self.view.end_undo_action();
                self.view.goto_pos(0);
                self.view.set_eol_mode(EolMode::detect(&contents));
                if let Some(buffer) = self.ring.get_mut(id) {
                    buffer.filename = Some(path.clone());
                }
                self.msg_info(format!("Added file \"{}\" to ring", path.display()));
            }
            Some(path) => {
                if let Some(buffer) = self.ring.get_mut(id) {
                    buffer.filename = Some(path.clone());
                }
                self.msg_info(format!("Added new file \"{}\" to ring", path.display()));
            }
            None => {
                self.msg_info("Added new unnamed file to ring".to_string());
            }
        }

        self.run_hook(HOOK_ADD)?;
        Ok(())
    }

    /// List the ring on the popup, highlighting the current buffer.
    pub(crate) fn show_buffer_list(&mut self) {
        let entries: Vec<(String, bool)> = self
            .ring
            .buffers
            .iter()
            .map(|b| (display_name(b), Some(b.id) == self.ring.current))
            .collect();
        for (name, highlight) in entries {
            self.messages.popup_add(name, highlight);
        }
        self.messages.popup_show();
    }

    /// Move the existing target file out of the way so the save can be
    /// rubbed out. On failure the save proceeds without a savepoint.
    fn make_savepoint(&mut self, id: BufferId) {
        let Some(buffer) = self.ring.get(id) else {
            return;
        };
        let Some(filename) = buffer.filename.clone() else {
            return;
        };
        let basename = filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let savepoint_name = format!(".teco-{}-{}", basename, buffer.savepoint_id);
        let savepoint = filename
            .parent()
            .map(|d| d.join(&savepoint_name))
            .unwrap_or_else(|| PathBuf::from(&savepoint_name));

        match std::fs::rename(&filename, &savepoint) {
            Ok(()) => {
                tracing::debug!(savepoint = %savepoint.display(), "savepoint created");
                if let Some(buffer) = self.ring.get_mut(id) {
                    buffer.savepoint_id += 1;
                }
                self.undo.push(UndoOp::RestoreSavepoint {
                    savepoint,
                    original: filename,
                    buffer: id,
                });
            }
            Err(_) => {
                self.msg_warning(format!(
                    "Unable to create save point file \"{}\"",
                    savepoint.display()
                ));
            }
        }
    }

    /// `EW`: write the current buffer, to its own filename or a new one.
    pub(crate) fn save_buffer(&mut self, filename: Option<&Path>) -> Result<()> {
        let id = self
            .ring
            .current
            .ok_or_else(|| Error::failed("No buffer to save"))?;
        self.save_buffer_id(id, filename)
    }

    fn save_buffer_id(&mut self, id: BufferId, filename: Option<&Path>) -> Result<()> {
        let target = match filename {
            Some(path) => path.to_path_buf(),
            None => self
                .ring
                .get(id)
                .and_then(|b| b.filename.clone())
                .ok_or_else(|| Error::failed("Unable to save file: no file name"))?,
        };

        if self.undo.enabled {
            let existing = self
                .ring
                .get(id)
                .and_then(|b| b.filename.clone())
                .filter(|p| p.is_file());
            match existing {
                Some(_) => self.make_savepoint(id),
                None => self.undo.push(UndoOp::RemoveFile(absolute_path(&target))),
            }
        }

        let contents = self.view.doc_text(self.ring.get(id).expect("buffer vanished").doc);
        std::fs::write(&target, &contents)
            .map_err(|e| Error::io(&format!("Unable to save \"{}\"", target.display()), e))?;
        tracing::debug!(path = %target.display(), bytes = contents.len(), "buffer saved");

        let old_dirty = self.ring.get(id).map(|b| b.dirty).unwrap_or(false);
        self.undo.push(UndoOp::Dirty {
            id,
            value: old_dirty,
        });
        let old_filename = self.ring.get(id).and_then(|b| b.filename.clone());
        self.undo.push(UndoOp::Filename {
            id,
            value: old_filename,
        });

        let resolved = absolute_path(&target);
        if let Some(buffer) = self.ring.get_mut(id) {
            buffer.dirty = false;
            buffer.filename = Some(resolved);
        }
        Ok(())
    }

    /// `:EX` support: save every dirty buffer in ring order.
    pub(crate) fn save_all_dirty(&mut self) -> Result<()> {
        let dirty: Vec<BufferId> = self
            .ring
            .buffers
            .iter()
            .filter(|b| b.dirty)
            .map(|b| b.id)
            .collect();
        for id in dirty {
            self.save_buffer_id(id, None)?;
        }
        Ok(())
    }

    /// `EF`: remove the current buffer. The journal token owns it and can
    /// put it back in its old ring position.
    pub(crate) fn close_buffer(&mut self) -> Result<()> {
        let id = self
            .ring
            .current
            .ok_or_else(|| Error::failed("No buffer to close"))?;
        self.current_save_dot();

        let index = self.ring.index_of(id).expect("buffer vanished");
        let name = display_name(&self.ring.buffers[index]);
        let buffer = self.ring.buffers.remove(index);
        self.msg_info(format!("Removed file \"{}\" from the ring", name));

        // neighbor after it, else before it
        let neighbor = self
            .ring
            .buffers
            .get(index)
            .or_else(|| self.ring.buffers.get(index.wrapping_sub(1)))
            .map(|b| b.id);
        self.ring.current = None;
        self.undo.push(UndoOp::ReinsertBuffer { index, buffer });

        match neighbor {
            Some(next) => {
                self.install_buffer(next);
                self.run_hook(HOOK_EDIT)?;
            }
            None => {
                // the ring must never be empty
                self.edit_buffer_file(None)?;
            }
        }
        Ok(())
    }

    /// Whether closing the current buffer needs the force argument.
    pub(crate) fn check_buffer_dirty(&self, force: TecoInt) -> Result<()> {
        if crate::interpreter::constants::is_failure(force) {
            if let Some(buffer) = self.ring.current() {
                if buffer.dirty {
                    return Err(Error::new(ErrorKind::BufferDirty {
                        name: display_name(buffer),
                    }));
                }
            }
        }
        Ok(())
    }

}
