//! In-process editor widget
//!
//! This module is the text component the interpreter drives. It owns a set
//! of documents addressed by [`DocId`], exactly one of which is installed in
//! the view at any time:
//! - byte storage with caret (`dot`), line and word queries
//! - grouped modification actions with a per-document undo stack
//! - an End-Of-Line mode per document
//!
//! The interpreter never touches document internals directly; it goes
//! through the message-style methods here (`set_text`, `goto_pos`,
//! `del_word_right_end`, ...). Undo journal tokens replay a small subset of
//! these operations (widget undo, caret moves, document switches) when a
//! command is rubbed out.

use std::fmt;

/// Handle to a document owned by the view.
///
/// Ids are never reused within a session so that undo journal tokens may
/// refer to documents long after they left the buffer ring.
pub type DocId = usize;

/// End-of-line mode of a document, with the conventional numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolMode {
    CrLf,
    Cr,
    Lf,
}

impl EolMode {
    pub fn code(self) -> i64 {
        match self {
            EolMode::CrLf => 0,
            EolMode::Cr => 1,
            EolMode::Lf => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(EolMode::CrLf),
            1 => Some(EolMode::Cr),
            2 => Some(EolMode::Lf),
            _ => None,
        }
    }

    /// Detect the EOL mode from file contents, defaulting to LF.
    pub fn detect(bytes: &[u8]) -> Self {
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                return if i > 0 && bytes[i - 1] == b'\r' {
                    EolMode::CrLf
                } else {
                    EolMode::Lf
                };
            }
        }
        if bytes.contains(&b'\r') {
            EolMode::Cr
        } else {
            EolMode::Lf
        }
    }
}

/// One reversible modification, recorded as its inverse.
#[derive(Debug, Clone)]
enum Change {
    Inserted { pos: usize, len: usize },
    Removed { pos: usize, bytes: Vec<u8> },
}

/// A document: text, caret and its private undo history.
#[derive(Debug)]
struct Document {
    bytes: Vec<u8>,
    caret: usize,
    eol: EolMode,
    use_tabs: bool,
    tab_width: usize,
    /// Completed undo actions, oldest first.
    actions: Vec<Vec<Change>>,
    /// Changes of the currently open action group.
    pending: Vec<Change>,
    /// Nesting depth of begin/end action brackets.
    group_depth: u32,
}

impl Document {
    fn new() -> Self {
        Document {
            bytes: Vec::new(),
            caret: 0,
            eol: EolMode::Lf,
            use_tabs: true,
            tab_width: 8,
            actions: Vec::new(),
            pending: Vec::new(),
            group_depth: 0,
        }
    }

    fn record(&mut self, change: Change) {
        if self.group_depth > 0 {
            self.pending.push(change);
        } else {
            self.actions.push(vec![change]);
        }
    }

    fn insert(&mut self, pos: usize, bytes: &[u8]) {
        debug_assert!(pos <= self.bytes.len());
        self.bytes.splice(pos..pos, bytes.iter().copied());
        self.record(Change::Inserted {
            pos,
            len: bytes.len(),
        });
    }

    fn remove(&mut self, pos: usize, len: usize) {
        debug_assert!(pos + len <= self.bytes.len());
        let removed: Vec<u8> = self.bytes.splice(pos..pos + len, std::iter::empty()).collect();
        self.record(Change::Removed {
            pos,
            bytes: removed,
        });
        // keep the caret inside the document
        if self.caret > pos {
            self.caret = self.caret.saturating_sub(len).max(pos);
        }
        self.caret = self.caret.min(self.bytes.len());
    }

    /// Revert the most recent completed action group.
    fn undo(&mut self) {
        let Some(action) = self.actions.pop() else {
            return;
        };
        for change in action.into_iter().rev() {
            match change {
                Change::Inserted { pos, len } => {
                    self.bytes.drain(pos..pos + len);
                    self.caret = pos.min(self.bytes.len());
                }
                Change::Removed { pos, bytes } => {
                    self.bytes.splice(pos..pos, bytes.iter().copied());
                    self.caret = (pos + bytes.len()).min(self.bytes.len());
                }
            }
        }
    }

    fn line_count(&self) -> usize {
        self.bytes.iter().filter(|&&b| b == b'\n').count() + 1
    }

    fn line_from_position(&self, pos: usize) -> usize {
        let pos = pos.min(self.bytes.len());
        self.bytes[..pos].iter().filter(|&&b| b == b'\n').count()
    }

    /// Byte offset of the start of `line`; `line == line_count()` yields the
    /// document length so that ranges extending past the last line are
    /// expressible.
    fn position_from_line(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        let mut seen = 0;
        for (i, &b) in self.bytes.iter().enumerate() {
            if b == b'\n' {
                seen += 1;
                if seen == line {
                    return i + 1;
                }
            }
        }
        self.bytes.len()
    }

    fn is_word_byte(b: u8) -> bool {
        b.is_ascii_alphanumeric() || b == b'_'
    }

    /// Position after the end of the word to the right of `pos`.
    fn word_right_end(&self, pos: usize) -> usize {
        let len = self.bytes.len();
        let mut p = pos;
        while p < len && !Self::is_word_byte(self.bytes[p]) {
            p += 1;
        }
        while p < len && Self::is_word_byte(self.bytes[p]) {
            p += 1;
        }
        p
    }

    /// End of the word preceding `pos`: any word run containing `pos` is
    /// skipped first, then the separating non-word run.
    fn word_left_end(&self, pos: usize) -> usize {
        let mut p = pos;
        while p > 0 && Self::is_word_byte(self.bytes[p - 1]) {
            p -= 1;
        }
        while p > 0 && !Self::is_word_byte(self.bytes[p - 1]) {
            p -= 1;
        }
        p
    }
}

/// The widget: a set of documents with one installed as current.
pub struct View {
    docs: Vec<Option<Document>>,
    current: DocId,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("docs", &self.docs.len())
            .field("current", &self.current)
            .finish()
    }
}

impl View {
    /// Create a view with a single empty document installed.
    pub fn new() -> Self {
        View {
            docs: vec![Some(Document::new())],
            current: 0,
        }
    }

    pub fn create_doc(&mut self) -> DocId {
        self.docs.push(Some(Document::new()));
        self.docs.len() - 1
    }

    /// Release a document's storage. The id is retired, never reused.
    /// Freeing the installed document is tolerated; the caller must install
    /// another one before the view is used again.
    pub fn free_doc(&mut self, doc: DocId) {
        if let Some(slot) = self.docs.get_mut(doc) {
            *slot = None;
        }
    }

    pub fn current_doc(&self) -> DocId {
        self.current
    }

    /// Install a document (SETDOCPOINTER).
    pub fn set_doc(&mut self, doc: DocId) {
        debug_assert!(self.docs.get(doc).is_some_and(|d| d.is_some()));
        self.current = doc;
    }

    fn doc(&self) -> &Document {
        self.docs[self.current].as_ref().expect("current document freed")
    }

    fn doc_mut(&mut self) -> &mut Document {
        self.docs[self.current].as_mut().expect("current document freed")
    }

    fn doc_at(&self, doc: DocId) -> &Document {
        self.docs[doc].as_ref().expect("document freed")
    }

    fn doc_at_mut(&mut self, doc: DocId) -> &mut Document {
        self.docs[doc].as_mut().expect("document freed")
    }

    // --- queries on the current document ---

    pub fn length(&self) -> usize {
        self.doc().bytes.len()
    }

    pub fn pos(&self) -> usize {
        self.doc().caret
    }

    /// Character at `pos`, or 0 past the end.
    pub fn char_at(&self, pos: usize) -> u8 {
        self.doc().bytes.get(pos).copied().unwrap_or(0)
    }

    pub fn text(&self) -> Vec<u8> {
        self.doc().bytes.clone()
    }

    pub fn text_range(&self, from: usize, len: usize) -> Vec<u8> {
        let bytes = &self.doc().bytes;
        let from = from.min(bytes.len());
        let to = (from + len).min(bytes.len());
        bytes[from..to].to_vec()
    }

    pub fn line_count(&self) -> usize {
        self.doc().line_count()
    }

    pub fn line_from_position(&self, pos: usize) -> usize {
        self.doc().line_from_position(pos)
    }

    pub fn position_from_line(&self, line: usize) -> usize {
        self.doc().position_from_line(line)
    }

    pub fn word_right_end(&self) -> usize {
        self.doc().word_right_end(self.doc().caret)
    }

    pub fn word_left_end(&self) -> usize {
        self.doc().word_left_end(self.doc().caret)
    }

    /// Column of `pos` within its line, expanding tabs.
    pub fn column(&self, pos: usize) -> usize {
        let doc = self.doc();
        let start = doc.position_from_line(doc.line_from_position(pos));
        let mut col = 0;
        for &b in &doc.bytes[start..pos.min(doc.bytes.len())] {
            if b == b'\t' {
                col += doc.tab_width - col % doc.tab_width;
            } else {
                col += 1;
            }
        }
        col
    }

    pub fn use_tabs(&self) -> bool {
        self.doc().use_tabs
    }

    pub fn tab_width(&self) -> usize {
        self.doc().tab_width
    }

    pub fn eol_mode(&self) -> EolMode {
        self.doc().eol
    }

    // --- queries on arbitrary documents ---

    pub fn doc_text(&self, doc: DocId) -> Vec<u8> {
        self.doc_at(doc).bytes.clone()
    }

    pub fn doc_length(&self, doc: DocId) -> usize {
        self.doc_at(doc).bytes.len()
    }

    // --- mutations ---

    pub fn goto_pos(&mut self, pos: usize) {
        let len = self.length();
        self.doc_mut().caret = pos.min(len);
    }

    pub fn goto_line(&mut self, line: usize) {
        let pos = self.position_from_line(line);
        self.doc_mut().caret = pos;
    }

    pub fn begin_undo_action(&mut self) {
        self.doc_mut().group_depth += 1;
    }

    pub fn end_undo_action(&mut self) {
        let doc = self.doc_mut();
        debug_assert!(doc.group_depth > 0);
        doc.group_depth -= 1;
        if doc.group_depth == 0 && !doc.pending.is_empty() {
            let action = std::mem::take(&mut doc.pending);
            doc.actions.push(action);
        }
    }

    /// Undo the most recent action group on the current document.
    pub fn undo(&mut self) {
        self.doc_mut().undo();
    }

    /// Undo on a specific document, without installing it.
    pub fn undo_doc(&mut self, doc: DocId) {
        self.doc_at_mut(doc).undo();
    }

    /// Replace the whole text; caret moves to the start.
    pub fn set_text(&mut self, bytes: &[u8]) {
        let doc = self.doc_mut();
        let len = doc.bytes.len();
        if len > 0 {
            doc.remove(0, len);
        }
        doc.insert(0, bytes);
        doc.caret = 0;
    }

    pub fn clear_all(&mut self) {
        let doc = self.doc_mut();
        let len = doc.bytes.len();
        if len > 0 {
            doc.remove(0, len);
        }
        doc.caret = 0;
    }

    /// Insert at the caret and advance it (ADDTEXT).
    pub fn add_text(&mut self, bytes: &[u8]) {
        let doc = self.doc_mut();
        let pos = doc.caret;
        doc.insert(pos, bytes);
        doc.caret = pos + bytes.len();
    }

    /// Append at the end; caret is unchanged (APPENDTEXT).
    pub fn append_text(&mut self, bytes: &[u8]) {
        let doc = self.doc_mut();
        let pos = doc.bytes.len();
        doc.insert(pos, bytes);
    }

    pub fn delete_range(&mut self, pos: usize, len: usize) {
        self.doc_mut().remove(pos, len);
    }

    /// Delete from the caret to the end of the word to the right
    /// (DELWORDRIGHTEND).
    pub fn del_word_right_end(&mut self) {
        let pos = self.pos();
        let end = self.word_right_end();
        if end > pos {
            self.doc_mut().remove(pos, end - pos);
            self.doc_mut().caret = pos;
        }
    }

    /// Move the caret to the end of the word to the right.
    pub fn move_word_right_end(&mut self) {
        let end = self.word_right_end();
        self.doc_mut().caret = end;
    }

    /// Move the caret to the end of the word to the left.
    pub fn move_word_left_end(&mut self) {
        let end = self.word_left_end();
        self.doc_mut().caret = end;
    }

    pub fn set_eol_mode(&mut self, eol: EolMode) {
        self.doc_mut().eol = eol;
    }

    pub fn set_doc_eol_mode(&mut self, doc: DocId, eol: EolMode) {
        self.doc_at_mut(doc).eol = eol;
    }

    /// Approximate storage cost of all documents, for the memory limit.
    pub fn total_bytes(&self) -> usize {
        self.docs
            .iter()
            .flatten()
            .map(|d| {
                let undo: usize = d
                    .actions
                    .iter()
                    .flatten()
                    .map(|c| match c {
                        Change::Inserted { .. } => 16,
                        Change::Removed { bytes, .. } => 16 + bytes.len(),
                    })
                    .sum();
                d.bytes.len() + undo
            })
            .sum()
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_text_moves_caret() {
        let mut view = View::new();
        view.add_text(b"hello");
        assert_eq!(view.pos(), 5);
        assert_eq!(view.text(), b"hello");
        view.goto_pos(0);
        view.add_text(b"say ");
        assert_eq!(view.text(), b"say hello");
        assert_eq!(view.pos(), 4);
    }

    #[test]
    fn test_undo_action_grouping() {
        let mut view = View::new();
        view.begin_undo_action();
        view.add_text(b"abc");
        view.add_text(b"def");
        view.end_undo_action();
        assert_eq!(view.text(), b"abcdef");
        view.undo();
        assert_eq!(view.text(), b"");
        assert_eq!(view.pos(), 0);
    }

    #[test]
    fn test_undo_restores_deleted_text() {
        let mut view = View::new();
        view.add_text(b"hello world");
        view.begin_undo_action();
        view.delete_range(0, 6);
        view.end_undo_action();
        assert_eq!(view.text(), b"world");
        view.undo();
        assert_eq!(view.text(), b"hello world");
    }

    #[test]
    fn test_line_queries() {
        let mut view = View::new();
        view.add_text(b"one\ntwo\nthree");
        assert_eq!(view.line_count(), 3);
        assert_eq!(view.line_from_position(0), 0);
        assert_eq!(view.line_from_position(5), 1);
        assert_eq!(view.position_from_line(1), 4);
        assert_eq!(view.position_from_line(2), 8);
        // one past the last line addresses the document end
        assert_eq!(view.position_from_line(3), 13);
    }

    #[test]
    fn test_word_motion() {
        let mut view = View::new();
        view.add_text(b"foo bar_baz  qux");
        view.goto_pos(0);
        view.move_word_right_end();
        assert_eq!(view.pos(), 3);
        view.move_word_right_end();
        assert_eq!(view.pos(), 11);
        view.move_word_left_end();
        assert_eq!(view.pos(), 3);
    }

    #[test]
    fn test_del_word_right() {
        let mut view = View::new();
        view.add_text(b"alpha beta");
        view.goto_pos(0);
        view.del_word_right_end();
        assert_eq!(view.text(), b" beta");
        assert_eq!(view.pos(), 0);
    }

    #[test]
    fn test_documents_are_independent() {
        let mut view = View::new();
        view.add_text(b"first");
        let other = view.create_doc();
        view.set_doc(other);
        view.add_text(b"second");
        assert_eq!(view.text(), b"second");
        view.set_doc(0);
        assert_eq!(view.text(), b"first");
        assert_eq!(view.doc_text(other), b"second");
    }

    #[test]
    fn test_eol_detection() {
        assert_eq!(EolMode::detect(b"a\r\nb"), EolMode::CrLf);
        assert_eq!(EolMode::detect(b"a\nb"), EolMode::Lf);
        assert_eq!(EolMode::detect(b"a\rb"), EolMode::Cr);
        assert_eq!(EolMode::detect(b"ab"), EolMode::Lf);
    }
}
