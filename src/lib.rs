//! # Introduction
//!
//! RusTECO is the execution core of a TECO-family text editor: a terse
//! one-character-per-operation command language driving a ring of text
//! buffers and a table of Q-Registers, with every side effect recorded on
//! an undo journal.  Rubbing out typed characters replays the journal and
//! restores the editor state — buffers, registers, stacks, even files saved
//! to disk — exactly as it was.
//!
//! ## Execution pipeline
//!
//! ```text
//! Input byte → Parser state machine → Command action
//!                                        ├─ View (documents, caret)
//!                                        ├─ Ring / Q-Registers
//!                                        ├─ Expression & loop stacks
//!                                        └─ Undo journal (reversal tokens)
//! ```
//!
//! 1. [`parser`] — the table-driven state machine mapping bytes to
//!    commands, with string-argument and register-specifier sub-machines.
//! 2. [`interpreter`] — the engine owning all editor state, the expression
//!    evaluator, loop frames, errors and the interactive command line.
//! 3. [`buffers`] — the buffer ring and the Q-Register model.
//! 4. [`undo`] — the journal of reversal tokens executed LIFO on rubout.
//! 5. [`view`] — the in-process editor widget: text storage, caret,
//!    per-document undo actions.
//!
//! ## Command language
//!
//! Arithmetic and argument stacks, movement (`J C R L B W`), deletion
//! (`K D V Y`), insertion (`I EI ^I \`), loops (`< > ; F< F>`),
//! conditionals (`"x | ' F' F|`), labels and goto (`! O`), Q-Registers
//! (`[ ] Q U % M G X EQ EU ^U E%`), buffers (`EB EW EF`), flags and
//! properties (`ED EJ EL EX`), and command-line editing (`{ }`).

pub mod buffers;
pub mod interpreter;
pub mod parser;
pub mod undo;
pub mod view;
