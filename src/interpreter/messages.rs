//! Message line and popup
//!
//! User-visible feedback from commands goes through here, not through the
//! logging layer: the message line is editor state, and the journal rolls it
//! back on rubout like everything else. In batch mode messages print
//! immediately; in interactive mode the front-end renders the stored line.

use crate::interpreter::engine::Interpreter;
use crate::undo::UndoOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    User,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Default)]
pub struct Messages {
    pub last: Option<(Severity, String)>,
    /// Suppresses direct printing; the front-end renders instead.
    pub interactive: bool,
    popup: Vec<(String, bool)>,
    popup_visible: bool,
}

impl Messages {
    pub fn new() -> Self {
        Messages::default()
    }

    pub fn show(&mut self, severity: Severity, text: String) {
        if !self.interactive {
            match severity {
                Severity::User => println!("{}", text),
                Severity::Info => eprintln!("{}", text),
                Severity::Warning => eprintln!("Warning: {}", text),
                Severity::Error => eprintln!("Error: {}", text),
            }
        }
        self.last = Some((severity, text));
    }

    pub fn popup_add(&mut self, name: String, highlight: bool) {
        self.popup.push((name, highlight));
    }

    pub fn popup_show(&mut self) {
        if !self.interactive {
            for (name, highlight) in &self.popup {
                eprintln!("{}{}", if *highlight { "* " } else { "  " }, name);
            }
        }
        self.popup_visible = true;
    }

    pub fn popup_clear(&mut self) {
        self.popup.clear();
        self.popup_visible = false;
    }

    pub fn popup_entries(&self) -> &[(String, bool)] {
        &self.popup
    }

    pub fn popup_visible(&self) -> bool {
        self.popup_visible
    }
}

impl Interpreter {
    fn msg(&mut self, severity: Severity, text: String) {
        self.undo.push(UndoOp::Message(self.messages.last.clone()));
        self.messages.show(severity, text);
    }

    pub(crate) fn msg_user(&mut self, text: String) {
        self.msg(Severity::User, text);
    }

    pub(crate) fn msg_info(&mut self, text: String) {
        self.msg(Severity::Info, text);
    }

    pub(crate) fn msg_warning(&mut self, text: String) {
        self.msg(Severity::Warning, text);
    }
}
