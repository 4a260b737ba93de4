//! A transient (segment, instruction) pair representing one stack frame at
//! a trace position. The instruction is absent when the
//! frame is synthesized purely from stack reconstruction; the caller's
//! call site was never captured in the trace window.

use crate::function_segment::SegmentId;
use crate::instruction::InsnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub segment: SegmentId,
    pub instruction: Option<InsnId>,
}

impl Frame {
    pub fn new(segment: SegmentId, instruction: Option<InsnId>) -> Self {
        Frame {
            segment,
            instruction,
        }
    }
}
