use crate::host::{ProcessId, ThreadId};

/// Errors produced by the trace engine's public surface.
///
/// `DecodeGap` is deliberately absent: a decode error is recorded locally as
/// a gap [`crate::instruction::Instruction`] and never escapes the decoder
/// (see `decoder.rs`).
#[derive(Debug, thiserror::Error)]
pub enum PtError {
    #[error("no debugger, target, or live process is selected")]
    InvalidContext,

    #[error("thread {0:?} is not known to process {1:?}")]
    InvalidThread(ThreadId, ProcessId),

    #[error("thread {0:?} is not being traced")]
    NotTracing(ThreadId),

    #[error("host operation failed: {0}")]
    HostFailure(String),

    #[error("failed to initialize the trace decoder: {0}")]
    DecodeFatal(String),

    #[error("position {0} is out of range for a log of length {1}")]
    CursorOutOfRange(usize, usize),

    #[error("reached the {0} of the trace")]
    EndOfTrace(&'static str),

    #[error("this thread trace belongs to a different debugger instance")]
    WrongDebugger,
}

pub type PtResult<T> = Result<T, PtError>;
