//! Execution engine
//!
//! [`Interpreter`] owns every piece of editor state the command language can
//! observe: the widget, the buffer ring, register tables, the expression and
//! loop stacks, the parser state machine fields and the undo journal. The
//! step loop feeds one byte at a time to the parser, polling the interrupt
//! flag and the memory limit between characters as the only cancellation
//! points.
//!
//! Macro invocation snapshots the frame-sensitive fields (program counter,
//! parser state, loop frame pointer, brace level, goto table, locals table)
//! and restores them on every exit path. A macro's `Return` transfer is
//! caught here; errors get their source coordinates attached as they cross
//! the step loop and a stack frame as they leave the invocation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::buffers::registers::{RegAddr, RegisterStack, RegisterTable};
use crate::buffers::ring::Ring;
use crate::interpreter::cmdline::CommandLine;
use crate::interpreter::constants::{TecoInt, ED_DEFAULT, ESCAPE, MEMORY_LIMIT_DEFAULT};
use crate::interpreter::errors::{Error, ErrorKind, FrameKind, Result};
use crate::interpreter::expressions::ExpressionStack;
use crate::interpreter::loops::LoopStack;
use crate::interpreter::messages::Messages;
use crate::parser::goto::GotoTable;
use crate::parser::strings::{RegSpecMachine, StringArg};
use crate::parser::{Mode, State};
use crate::undo::{UndoJournal, UndoOp};
use crate::view::View;

/// The interpreter: all mutable editor state in one value.
pub struct Interpreter {
    pub view: View,
    pub messages: Messages,
    pub ring: Ring,

    pub(crate) globals: RegisterTable,
    /// Local register tables, one per macro frame that requested them.
    pub(crate) locals: Vec<RegisterTable>,
    pub(crate) reg_stack: RegisterStack,
    /// The currently edited register, exclusive with `ring.current`.
    pub(crate) current_reg: Option<RegAddr>,

    pub(crate) exprs: ExpressionStack,
    pub(crate) loop_stack: LoopStack,
    /// Loop stack depth at entry of the current macro frame.
    pub(crate) loop_fp: usize,

    pub undo: UndoJournal,

    // parser state machine
    pub(crate) state: State,
    pub(crate) mode: Mode,
    pub(crate) skip_else: bool,
    pub(crate) nest_level: u32,
    pub(crate) colon: bool,
    pub(crate) at: bool,
    pub(crate) escape_char: u8,
    pub(crate) digit_run: bool,

    // string argument machinery
    pub(crate) string: StringArg,
    pub(crate) regspec: RegSpecMachine,
    pub(crate) reg_argument: Option<RegAddr>,
    pub(crate) label_buf: Option<Vec<u8>>,

    // goto
    pub(crate) goto_table: GotoTable,
    pub(crate) skip_label: Option<String>,

    pub(crate) macro_pc: usize,
    pub(crate) ed_flags: TecoInt,
    pub(crate) quit_requested: bool,
    pub(crate) memory_limit: usize,
    /// Whether the pending `EB` may still take a filename argument.
    pub(crate) eb_allow_filename: bool,
    interrupted: Arc<AtomicBool>,

    pub(crate) cmdline: CommandLine,
}

impl Interpreter {
    /// A fresh editor: one unnamed buffer in the ring, default registers,
    /// journal disabled (batch mode).
    pub fn new() -> Self {
        let view = View::new();
        let mut ring = Ring::new();
        let id = ring.allocate(view.current_doc());
        ring.current = Some(id);

        Interpreter {
            view,
            messages: Messages::new(),
            ring,
            globals: RegisterTable::globals(),
            // the top level gets a locals table of its own
            locals: vec![RegisterTable::locals()],
            reg_stack: RegisterStack::new(),
            current_reg: None,
            exprs: ExpressionStack::new(),
            loop_stack: LoopStack::new(),
            loop_fp: 0,
            undo: UndoJournal::new(),
            state: State::Start,
            mode: Mode::Normal,
            skip_else: false,
            nest_level: 0,
            colon: false,
            at: false,
            escape_char: ESCAPE,
            digit_run: false,
            string: StringArg::new(),
            regspec: RegSpecMachine::new(),
            reg_argument: None,
            label_buf: None,
            goto_table: GotoTable::default(),
            skip_label: None,
            macro_pc: 0,
            ed_flags: ED_DEFAULT,
            quit_requested: false,
            memory_limit: MEMORY_LIMIT_DEFAULT,
            eb_allow_filename: true,
            interrupted: Arc::new(AtomicBool::new(false)),
            cmdline: CommandLine::new(),
        }
    }

    /// Switch to interactive semantics: journal on, messages rendered by
    /// the front-end.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.undo.enabled = interactive;
        self.messages.interactive = interactive;
    }

    /// The flag a front-end or signal handler sets to interrupt execution.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// The typed command line, for the front-end's echo.
    pub fn cmdline_bytes(&self) -> &[u8] {
        self.cmdline.bytes()
    }

    /// Expression stack contents above the top barrier, for tests and the
    /// front-end status line.
    pub fn stack_numbers(&self) -> Vec<TecoInt> {
        self.exprs.numbers()
    }

    pub(crate) fn check_memory(&self) -> Result<()> {
        if self.memory_limit == 0 {
            return Ok(());
        }
        let usage = self.view.total_bytes() + self.undo.approx_bytes();
        if usage > self.memory_limit {
            return Err(Error::new(ErrorKind::Memory {
                usage,
                limit: self.memory_limit,
            }));
        }
        Ok(())
    }

    /// Consume a pending colon modifier.
    pub(crate) fn eval_colon(&mut self) -> bool {
        if !self.colon {
            return false;
        }
        self.undo.push(UndoOp::Colon(true));
        self.colon = false;
        true
    }

    /// Feed characters to the parser until `stop`, then give the current
    /// state its interactive refresh. Attaches source coordinates to any
    /// error.
    pub(crate) fn step(&mut self, text: &[u8], stop: usize) -> Result<()> {
        let result = self.step_inner(text, stop);
        result.map_err(|mut e| {
            if !e.is_control_flow() {
                e.set_coord(text, self.macro_pc.min(text.len()));
            }
            e
        })
    }

    fn step_inner(&mut self, text: &[u8], stop: usize) -> Result<()> {
        while self.macro_pc < stop {
            let chr = text[self.macro_pc];
            trace!(
                pc = self.macro_pc,
                chr = chr,
                state = ?self.state,
                mode = ?self.mode,
                "exec"
            );

            if self.interrupted.swap(false, Ordering::Relaxed) {
                return Err(Error::new(ErrorKind::Interrupted));
            }
            self.check_memory()?;

            self.parser_input(chr)?;
            // flow commands store the character position they jump to;
            // wrapping lets "start of macro" be expressed as usize::MAX
            self.macro_pc = self.macro_pc.wrapping_add(1);
        }
        self.state_refresh()
    }

    /// Execute a macro in its own invocation frame.
    pub(crate) fn execute_macro(&mut self, text: &[u8], locals: bool) -> Result<()> {
        let parent_state = self.state;
        let parent_pc = self.macro_pc;
        let parent_fp = self.loop_fp;
        let parent_brace = self.exprs.brace_level();
        let parent_goto = std::mem::take(&mut self.goto_table);

        // the state machine journals transitions inside the macro down to
        // Start; this token rewinds past them to the caller's state
        self.undo.push(UndoOp::State(self.state));
        self.state = State::Start;
        self.macro_pc = 0;
        self.loop_fp = self.loop_stack.items();
        if locals {
            self.locals.push(RegisterTable::locals());
        }

        let result = self.run_macro_frame(text, locals, parent_brace);

        if locals {
            self.locals.pop();
        }
        self.skip_label = None;
        self.goto_table = parent_goto;
        self.loop_fp = parent_fp;
        self.macro_pc = parent_pc;
        self.state = parent_state;
        result
    }

    fn run_macro_frame(&mut self, text: &[u8], locals: bool, parent_brace: u32) -> Result<()> {
        match self.step(text, text.len()) {
            Ok(()) => {}
            Err(e) => match e.kind {
                ErrorKind::Return { args } => {
                    // macro returned early: discard its braces except the
                    // arguments, and drop its loop frames
                    debug_assert_eq!(self.state, State::Start);
                    self.brace_return(parent_brace, args)?;
                    self.loop_stack.clear_to(self.loop_fp);
                }
                _ => return Err(e),
            },
        }

        if self.loop_stack.items() > self.loop_fp {
            let pc = self.loop_stack.peek().map(|f| f.pc).unwrap_or(0);
            let mut e = Error::new(ErrorKind::UnterminatedLoop);
            e.set_coord(text, pc.min(text.len()));
            return Err(e);
        }

        let tail = self.finish_macro_frame(locals);
        tail.map_err(|mut e| {
            e.set_coord(text, self.macro_pc.min(text.len()));
            e
        })
    }

    fn finish_macro_frame(&mut self, locals: bool) -> Result<()> {
        if let Some(label) = self.skip_label.take() {
            return Err(Error::new(ErrorKind::LabelNotFound { label }));
        }
        // commands with lookahead may validly end a macro
        self.state_end_of_macro()?;
        if locals && self.current_reg.as_ref().is_some_and(|a| a.local) {
            // the local table is about to vanish with its register still
            // edited; fall back to a ring buffer and diagnose
            self.current_reg = None;
            if let Some(id) = self
                .ring
                .current
                .or_else(|| self.ring.buffers.first().map(|b| b.id))
            {
                self.install_buffer(id);
            }
            return Err(Error::failed(
                "Q-Register of the returning macro is still edited",
            ));
        }
        Ok(())
    }

    /// Execute a macro file, ignoring a leading hash-bang line and fixing
    /// up error coordinates accordingly.
    pub fn execute_file(&mut self, path: &Path, locals: bool) -> Result<()> {
        let raw = std::fs::read(path)
            .map_err(|e| Error::io(&format!("Cannot read \"{}\"", path.display()), e))?;
        tracing::debug!(path = %path.display(), bytes = raw.len(), "macro file");

        let (offset, lines) = if raw.first() == Some(&b'#') {
            match raw.iter().position(|&b| b == b'\r' || b == b'\n') {
                Some(end) => (end + 1, 1),
                // a lone hash-bang line is an empty script
                None => return Ok(()),
            }
        } else {
            (0, 0)
        };

        self.execute_macro(&raw[offset..], locals).map_err(|mut e| {
            if !e.is_control_flow() {
                e.adjust_prefix(offset, lines);
                e.add_frame(FrameKind::File {
                    path: path.to_path_buf(),
                });
            }
            e
        })
    }

    /// Execute a command string as the top-level batch macro.
    pub fn execute(&mut self, src: &[u8]) -> Result<()> {
        self.execute_macro(src, true)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
