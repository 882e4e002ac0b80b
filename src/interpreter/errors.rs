//! Error types of the command interpreter
//!
//! [`Error`] covers everything a command may raise. Two variants are
//! control-flow transfers rather than failures: [`ErrorKind::Return`]
//! (macro return, caught at the macro boundary) and [`ErrorKind::Quit`]
//! (batch-mode program exit, unwinding every frame). A third,
//! [`ErrorKind::Replace`], carries a command-line replacement request to the
//! command-line machinery.
//!
//! Real errors acquire source coordinates as they cross the step loop and a
//! frame chain as they cross macro invocations, so that batch mode can print
//! a full trace.

use crate::interpreter::constants::TecoInt;
use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong (or which transfer is in flight).
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Unexpected character fed to the parser.
    Syntax { chr: u8 },

    /// A position argument lies outside the buffer.
    Range { cmd: String },

    /// A movement command could not be performed.
    Move { cmd: String },

    /// A command required an argument the stack did not hold.
    ArgExpected { cmd: String },

    /// Unknown conditional test kind after `"`.
    InvalidCondType { chr: u8 },

    /// Loop end or break without a loop in the current invocation frame.
    LoopUnmatched { cmd: String },

    /// A loop was still open when its macro ended.
    UnterminatedLoop,

    /// A command was still collecting input when its macro ended.
    UnterminatedCommand,

    /// Goto target never found while scanning forward.
    LabelNotFound { label: String },

    /// Buffer id out of range for `EB`.
    InvalidBufferId { id: TecoInt },

    /// Closing a dirty buffer without force.
    BufferDirty { name: String },

    /// Exiting while modified buffers exist.
    ModifiedBuffers,

    /// `]` on an empty register stack.
    RegisterStackEmpty,

    /// Interrupt flag observed between characters.
    Interrupted,

    /// Memory limit exceeded.
    Memory { usage: usize, limit: usize },

    /// Operating system error, wrapped with context.
    Io { message: String },

    /// Anything else, with a formatted message.
    Failed { message: String },

    /// Macro return carrying the number of arguments to keep.
    Return { args: usize },

    /// Batch-mode program exit.
    Quit,

    /// Command-line replacement requested by `}`.
    Replace,
}

/// One level of the invocation chain an error crossed.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameKind {
    /// A macro executed from a register.
    Register { name: String },
    /// A macro executed from a file.
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub pos: usize,
    pub line: usize,
    pub column: usize,
}

/// An error with source coordinates and a macro frame chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub kind: ErrorKind,
    /// Byte offset within the innermost not-yet-framed macro.
    pub pos: usize,
    /// 1-based line and column, valid once `set_coord` ran.
    pub line: usize,
    pub column: usize,
    coord_set: bool,
    /// Frames crossed so far, innermost first.
    pub frames: Vec<Frame>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            pos: 0,
            line: 0,
            column: 0,
            coord_set: false,
            frames: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Failed {
            message: message.into(),
        })
    }

    pub fn io(context: &str, err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io {
            message: format!("{}: {}", context, err),
        })
    }

    /// Whether this is a plain control-flow transfer that must never be
    /// reported to the user.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Return { .. } | ErrorKind::Quit | ErrorKind::Replace
        )
    }

    /// Attach line/column derived from the position `pc` in `source`.
    /// Coordinates refer to the innermost frame not yet recorded; the first
    /// annotation wins until a frame consumes it.
    pub fn set_coord(&mut self, source: &[u8], pc: usize) {
        if self.coord_set {
            return;
        }
        self.pos = pc;
        let (mut line, mut column) = (1, 1);
        for &b in source.iter().take(pc) {
            if b == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        self.line = line;
        self.column = column;
        self.coord_set = true;
    }

    /// Record the invocation level the error is about to leave. The current
    /// coordinates move into the frame; the next `set_coord` annotates the
    /// caller's level.
    pub fn add_frame(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            pos: self.pos,
            line: self.line,
            column: self.column,
        });
        self.coord_set = false;
    }

    /// Shift coordinates by a prefix that was stripped before execution
    /// (the `#!` line of a munged file).
    pub fn adjust_prefix(&mut self, bytes: usize, lines: usize) {
        self.pos += bytes;
        self.line += lines;
    }

    /// Render the frame chain, innermost first, for batch-mode traces.
    pub fn frame_trace(&self) -> String {
        let mut out = String::new();
        for frame in &self.frames {
            match &frame.kind {
                FrameKind::Register { name } => {
                    out.push_str(&format!(
                        "  in macro from Q-Register \"{}\" at line {}, column {}\n",
                        name, frame.line, frame.column
                    ));
                }
                FrameKind::File { path } => {
                    out.push_str(&format!(
                        "  in file \"{}\" at line {}, column {}\n",
                        path.display(),
                        frame.line,
                        frame.column
                    ));
                }
            }
        }
        if self.coord_set {
            out.push_str(&format!(
                "  at line {}, column {}\n",
                self.line, self.column
            ));
        }
        out
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

fn printable(chr: u8) -> String {
    if chr.is_ascii_graphic() || chr == b' ' {
        (chr as char).to_string()
    } else {
        format!("\\x{:02X}", chr)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Syntax { chr } => {
                write!(f, "Syntax error \"{}\"", printable(*chr))
            }
            ErrorKind::Range { cmd } => {
                write!(f, "Position out of range for <{}>", cmd)
            }
            ErrorKind::Move { cmd } => {
                write!(f, "Failed to move with <{}>", cmd)
            }
            ErrorKind::ArgExpected { cmd } => {
                write!(f, "Argument expected for <{}>", cmd)
            }
            ErrorKind::InvalidCondType { chr } => {
                write!(f, "Invalid conditional type \"{}\"", printable(*chr))
            }
            ErrorKind::LoopUnmatched { cmd } => {
                write!(f, "<{}> without a loop in the current invocation", cmd)
            }
            ErrorKind::UnterminatedLoop => write!(f, "Unterminated loop"),
            ErrorKind::UnterminatedCommand => write!(f, "Unterminated command"),
            ErrorKind::LabelNotFound { label } => {
                write!(f, "Label \"{}\" not found", label)
            }
            ErrorKind::InvalidBufferId { id } => {
                write!(f, "Invalid buffer id {}", id)
            }
            ErrorKind::BufferDirty { name } => {
                write!(f, "Buffer \"{}\" is dirty", name)
            }
            ErrorKind::ModifiedBuffers => write!(f, "Modified buffers exist"),
            ErrorKind::RegisterStackEmpty => write!(f, "Q-Register stack is empty"),
            ErrorKind::Interrupted => write!(f, "Interrupted"),
            ErrorKind::Memory { usage, limit } => {
                write!(
                    f,
                    "Memory limit exceeded: {} bytes used, limit is {}",
                    usage, limit
                )
            }
            ErrorKind::Io { message } => write!(f, "{}", message),
            ErrorKind::Failed { message } => write!(f, "{}", message),
            ErrorKind::Return { args } => write!(f, "<return {} args>", args),
            ErrorKind::Quit => write!(f, "<quit>"),
            ErrorKind::Replace => write!(f, "<command-line replacement>"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_from_source() {
        let mut err = Error::new(ErrorKind::Syntax { chr: b'%' });
        err.set_coord(b"abc\ndef", 5);
        assert_eq!((err.line, err.column), (2, 2));
        // a second annotation at the same level is ignored
        err.set_coord(b"abc\ndef", 0);
        assert_eq!((err.line, err.column), (2, 2));
    }

    #[test]
    fn test_frames_consume_coordinates() {
        let mut err = Error::failed("nope");
        err.set_coord(b"xy", 1);
        err.add_frame(FrameKind::Register {
            name: "A".to_string(),
        });
        err.set_coord(b"first\nsecond", 7);
        assert_eq!(err.frames.len(), 1);
        assert_eq!(err.frames[0].column, 2);
        assert_eq!((err.line, err.column), (2, 2));
    }
}
