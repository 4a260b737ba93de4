//! Per-thread decoded trace plus the time-travel cursor.
//!
//! Everything here is frozen after decode except the cursor position; the
//! host is never stored on `ThreadTrace` itself (it's an external,
//! per-call collaborator per the "global-state pattern" note), so every
//! navigation method takes `&dyn DebuggerHost` explicitly.

use crate::cpu::CpuDescriptor;
use crate::error::{PtError, PtResult};
use crate::frame::Frame;
use crate::function_segment::{FunctionSegment, SegmentId};
use crate::host::{DebuggerHost, ProcessId, Section, ThreadId, TraceHandle};
use crate::instruction::{InsnId, Instruction, InstructionLog};

/// Outcome of a stepping/continue primitive: whether the cursor actually
/// moved, and, for continue/step-over, whether a breakpoint stopped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    HitBreakpoint,
    NoMove,
}

/// One entry of `show-function-call-history`: a segment's id, indentation
/// level, starting address, and display name, in log order.
#[derive(Debug, Clone)]
pub struct CallHistoryEntry {
    pub segment: SegmentId,
    pub level: i32,
    pub start_address: u64,
    pub display_name: String,
}

pub struct ThreadTrace {
    process_id: ProcessId,
    thread_id: ThreadId,
    raw_trace: Vec<u8>,
    sections: Vec<Section>,
    cpu: CpuDescriptor,
    handle: TraceHandle,
    stop_id: u64,
    log: InstructionLog,
    segments: Vec<FunctionSegment>,
    cursor: usize,
}

impl ThreadTrace {
    /// Assemble a trace from an already-decoded log/segment list. Decoding
    /// itself lives in `decoder.rs`; this constructor just freezes the
    /// result and sets the cursor to the last instruction.
    pub fn new(
        process_id: ProcessId,
        thread_id: ThreadId,
        raw_trace: Vec<u8>,
        sections: Vec<Section>,
        cpu: CpuDescriptor,
        handle: TraceHandle,
        stop_id: u64,
        log: InstructionLog,
        segments: Vec<FunctionSegment>,
    ) -> Self {
        let cursor = log.len().saturating_sub(1);
        ThreadTrace {
            process_id,
            thread_id,
            raw_trace,
            sections,
            cpu,
            handle,
            stop_id,
            log,
            segments,
            cursor,
        }
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn raw_trace(&self) -> &[u8] {
        &self.raw_trace
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn cpu(&self) -> CpuDescriptor {
        self.cpu
    }

    pub fn handle(&self) -> TraceHandle {
        self.handle
    }

    pub fn stop_id(&self) -> u64 {
        self.stop_id
    }

    pub fn log(&self) -> &[Instruction] {
        &self.log
    }

    pub fn segments(&self) -> &[FunctionSegment] {
        &self.segments
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn segment_of(&self, insn: InsnId) -> SegmentId {
        self.segments
            .iter()
            .find(|s| s.first() <= insn && insn <= s.last())
            .expect("every instruction id belongs to exactly one segment")
            .id()
    }

    /// Explicit `go-to`: sets the cursor directly, bounds-checked.
    pub fn go_to(&mut self, position: usize) -> PtResult<()> {
        if position >= self.log.len() {
            return Err(PtError::CursorOutOfRange(position, self.log.len()));
        }
        self.cursor = position;
        Ok(())
    }

    fn primitive_move(&mut self, delta: i64) -> bool {
        let next = self.cursor as i64 + delta;
        if next < 0 || next as usize >= self.log.len() {
            return false;
        }
        self.cursor = next as usize;
        true
    }

    pub fn step_inst(&mut self) -> PtResult<StepOutcome> {
        self.step_delta(1)
    }

    pub fn reverse_step_inst(&mut self) -> PtResult<StepOutcome> {
        self.step_delta(-1)
    }

    fn step_delta(&mut self, delta: i64) -> PtResult<StepOutcome> {
        if self.primitive_move(delta) {
            Ok(StepOutcome::Moved)
        } else {
            Err(PtError::EndOfTrace(if delta > 0 { "end" } else { "start" }))
        }
    }

    pub fn continue_(&mut self, host: &dyn DebuggerHost) -> PtResult<StepOutcome> {
        self.continue_delta(host, 1)
    }

    pub fn reverse_continue(&mut self, host: &dyn DebuggerHost) -> PtResult<StepOutcome> {
        self.continue_delta(host, -1)
    }

    fn continue_delta(&mut self, host: &dyn DebuggerHost, delta: i64) -> PtResult<StepOutcome> {
        let breakpoints = host.breakpoint_addresses(self.process_id)?;
        let mut moved = false;
        loop {
            if !self.primitive_move(delta) {
                if moved {
                    return Ok(StepOutcome::Moved);
                }
                return Err(PtError::EndOfTrace(if delta > 0 { "end" } else { "start" }));
            }
            moved = true;
            if breakpoints.contains(&self.log[self.cursor].address()) {
                return Ok(StepOutcome::HitBreakpoint);
            }
        }
    }

    pub fn step_over(&mut self, host: &dyn DebuggerHost) -> PtResult<StepOutcome> {
        self.step_over_delta(host, 1)
    }

    pub fn reverse_step_over(&mut self, host: &dyn DebuggerHost) -> PtResult<StepOutcome> {
        self.step_over_delta(host, -1)
    }

    fn step_over_delta(&mut self, host: &dyn DebuggerHost, delta: i64) -> PtResult<StepOutcome> {
        let cur_addr = self.log[self.cursor].address();
        let line = host.line_entry_at(self.process_id, cur_addr)?;
        let Some(line) = line else {
            return self.step_delta(delta);
        };

        let start_level = self.segments[self.segment_of(self.log[self.cursor].id()) as usize].level();
        let breakpoints = host.breakpoint_addresses(self.process_id)?;
        let mut moved = false;
        loop {
            if !self.primitive_move(delta) {
                if moved {
                    return Ok(StepOutcome::Moved);
                }
                return Err(PtError::EndOfTrace(if delta > 0 { "end" } else { "start" }));
            }
            moved = true;
            let insn = &self.log[self.cursor];
            let addr = insn.address();
            if breakpoints.contains(&addr) {
                return Ok(StepOutcome::HitBreakpoint);
            }
            if insn.is_error() {
                return Ok(StepOutcome::Moved);
            }
            let level = self.segments[self.segment_of(insn.id()) as usize].level();
            if level < start_level {
                return Ok(StepOutcome::Moved);
            }
            if level == start_level
                && (addr < line.start_address || addr >= line.end_address)
            {
                return Ok(StepOutcome::Moved);
            }
            // level > start_level: inside a callee, keep going.
        }
    }

    /// Backtrace rooted at the segment owning the instruction at `p`,
    /// innermost frame first.
    pub fn backtrace(&self) -> Vec<Frame> {
        let insn = &self.log[self.cursor];
        if insn.is_error() {
            let seg = self.segment_of_gap(self.cursor);
            return self.backtrace_from(seg, None);
        }
        let seg = self.segment_of(insn.id());
        self.backtrace_from(seg, Some(insn.id()))
    }

    fn segment_of_gap(&self, log_idx: usize) -> SegmentId {
        let id = self.log[log_idx].id();
        self.segments
            .iter()
            .find(|s| s.first() <= id && id <= s.last())
            .expect("every log position belongs to exactly one segment")
            .id()
    }

    fn backtrace_from(&self, innermost: SegmentId, innermost_insn: Option<InsnId>) -> Vec<Frame> {
        let mut frames = Vec::new();
        frames.push(Frame::new(innermost, innermost_insn));

        let mut callee = innermost;
        let mut cur = self.segments[innermost as usize].parent();
        while let Some(seg_id) = cur {
            let caller = &self.segments[seg_id as usize];
            let instruction = if callee > seg_id {
                Some(caller.last())
            } else {
                None
            };
            frames.push(Frame::new(seg_id, instruction));
            callee = seg_id;
            cur = caller.parent();
        }
        frames
    }

    /// `show-function-call-history`: the segment list itself, in order.
    pub fn function_call_history(&self) -> Vec<CallHistoryEntry> {
        self.segments
            .iter()
            .map(|s| CallHistoryEntry {
                segment: s.id(),
                level: s.level(),
                start_address: self.log[s.first() as usize].address(),
                display_name: s.display_name().to_string(),
            })
            .collect()
    }

    /// `show-instr-log -o <offset> -c <count>`: the exact offset/count
    /// counting `offset` back from the tail.
    pub fn instruction_log_window(&self, offset: usize, count: usize) -> PtResult<&[Instruction]> {
        let len = self.log.len();
        if len == 0 || count == 0 || offset >= len {
            return Err(PtError::CursorOutOfRange(offset, len));
        }
        let last = len - 1;
        let start = last.saturating_sub(offset);
        let end = (start + count).min(len);
        if start >= end {
            return Err(PtError::CursorOutOfRange(offset, len));
        }
        Ok(&self.log[start..end])
    }
}
