//! `rdpt`: an Intel Processor Trace post-processing engine and time-travel
//! debugging core.
//!
//! Consumes a per-thread hardware trace plus a snapshot of the traced
//! process's executable memory image, decodes it into a fully materialized
//! instruction log ([`decoder`]), reconstructs a call/return tree over that
//! log ([`call_tree_builder`], [`function_segment`]), and exposes a cursor
//! that can step forward or backward by instruction, by source line, or by
//! breakpoint, and reconstruct a backtrace at any position without
//! re-executing the program ([`thread_trace`]).
//!
//! The engine never touches the debugger host directly: every external
//! collaborator (process/thread/symbol lookup, breakpoint enumeration, raw
//! trace bytes, etc.) is abstracted behind [`host::DebuggerHost`], and the
//! [`manager::Manager`] facade is the only stateful, shared entry point;
//! everything else here is either immutable after construction or a pure
//! function over already-decoded data.

#[macro_use]
extern crate lazy_static;

pub mod commands;
pub mod cpu;
pub mod decoder;
pub mod error;
pub mod flags;
pub mod frame;
pub mod function_segment;
pub mod host;
pub mod instruction;
pub mod manager;
pub mod thread_trace;

pub mod call_tree_builder;

pub use error::{PtError, PtResult};
pub use manager::Manager;
