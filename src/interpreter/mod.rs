//! Interpreter core
//!
//! - [`engine`]: the [`engine::Interpreter`] value owning all editor state,
//!   the step loop and macro invocation frames
//! - [`expressions`]: the argument stack with barriers and braces
//! - [`loops`]: iteration frames and the loop frame pointer
//! - [`errors`]: error kinds, source coordinates and macro frame chains
//! - [`messages`]: the journaled message line and popup
//! - [`cmdline`]: interactive command-line insertion, rubout and replacement
//! - [`constants`]: the integer type, condition booleans and byte helpers

pub mod cmdline;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod loops;
pub mod messages;
