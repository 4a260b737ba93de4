//! In-memory `DebuggerHost` used by the integration tests to drive the
//! engine against hand-built instruction streams, plus small fixture
//! builders shared across scenario tests.

use rdpt::cpu::CpuDescriptor;
use rdpt::error::PtResult;
use rdpt::host::{
    DebuggerHost, DebuggerId, LineRange, ProcessId, ProcessState, ResolvedAddress, Section,
    StartTraceRequest, ThreadId, TraceHandle,
};
use std::cell::RefCell;
use std::collections::HashSet;

/// A stand-in for the real debugger host: every answer is pre-seeded by the
/// test instead of being derived from a live process.
pub struct MockHost {
    pub debugger_id: DebuggerId,
    pub process_id: ProcessId,
    pub thread_ids: Vec<ThreadId>,
    pub stop_id: RefCell<u64>,
    pub breakpoints: HashSet<u64>,
    pub line_ranges: Vec<(u64, u64, LineRange)>,
    pub resolved: Vec<(u64, ResolvedAddress)>,
}

impl MockHost {
    pub fn new(process_id: ProcessId, thread_ids: Vec<ThreadId>) -> Self {
        MockHost {
            debugger_id: 1,
            process_id,
            thread_ids,
            stop_id: RefCell::new(0),
            breakpoints: HashSet::new(),
            line_ranges: Vec::new(),
            resolved: Vec::new(),
        }
    }

    pub fn with_breakpoint(mut self, addr: u64) -> Self {
        self.breakpoints.insert(addr);
        self
    }

    pub fn with_line_range(mut self, start: u64, end: u64, line: LineRange) -> Self {
        self.line_ranges.push((start, end, line));
        self
    }

    pub fn bump_stop_id(&self) {
        *self.stop_id.borrow_mut() += 1;
    }
}

impl DebuggerHost for MockHost {
    fn debugger_id(&self) -> DebuggerId {
        self.debugger_id
    }

    fn current_process(&self) -> PtResult<ProcessId> {
        Ok(self.process_id)
    }

    fn process_state(&self, _pid: ProcessId) -> PtResult<ProcessState> {
        Ok(ProcessState::Stopped)
    }

    fn thread_ids(&self, _pid: ProcessId) -> PtResult<Vec<ThreadId>> {
        Ok(self.thread_ids.clone())
    }

    fn stop_id(&self, _pid: ProcessId, _tid: ThreadId) -> PtResult<u64> {
        Ok(*self.stop_id.borrow())
    }

    fn read_execute_sections(&self, _pid: ProcessId) -> PtResult<Vec<Section>> {
        Ok(Vec::new())
    }

    fn resolve_address(&self, _pid: ProcessId, addr: u64) -> PtResult<ResolvedAddress> {
        Ok(self
            .resolved
            .iter()
            .find(|(a, _)| *a == addr)
            .map(|(_, r)| r.clone())
            .unwrap_or_default())
    }

    fn breakpoint_addresses(&self, _pid: ProcessId) -> PtResult<HashSet<u64>> {
        Ok(self.breakpoints.clone())
    }

    fn line_entry_at(&self, _pid: ProcessId, addr: u64) -> PtResult<Option<LineRange>> {
        Ok(self
            .line_ranges
            .iter()
            .find(|(start, end, _)| addr >= *start && addr < *end)
            .map(|(_, _, line)| *line))
    }

    fn start_trace(&self, _req: StartTraceRequest) -> PtResult<TraceHandle> {
        Ok(TraceHandle(1))
    }

    fn stop_trace(&self, _handle: TraceHandle) -> PtResult<()> {
        Ok(())
    }

    fn read_raw_trace(&self, _handle: TraceHandle) -> PtResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn read_cpu_info(&self, _handle: TraceHandle) -> PtResult<CpuDescriptor> {
        Ok(CpuDescriptor::native())
    }
}
