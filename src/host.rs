//! The abstract surface this crate consumes from its host (the interactive
//! debugger). Every call is synchronous and fallible; implementations live
//! outside this crate (the real host adapter, or `mock_host` in tests).

use crate::cpu::CpuDescriptor;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

pub type DebuggerId = u64;
pub type ProcessId = u64;
pub type ThreadId = u64;
pub type FunctionHandle = u64;
pub type SymbolHandle = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Running,
    Exited,
    Detached,
    Invalid,
}

/// One read-execute section of the traced process's memory image, as
/// snapshotted by the host (`(load_addr, file_offset, size, image_path)`).
#[derive(Debug, Clone)]
pub struct Section {
    pub load_address: u64,
    pub file_offset: u64,
    pub size: u64,
    pub image_path: String,
}

/// What the host's address resolution returns for a load address: the
/// owning function/symbol (either may be missing) and, when known, the
/// function's start address (used by the call-tree tail-call heuristics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub function: Option<FunctionHandle>,
    pub function_name: Option<String>,
    pub function_start: Option<u64>,
    pub symbol: Option<SymbolHandle>,
    pub symbol_name: Option<String>,
}

impl ResolvedAddress {
    pub fn is_unresolved(&self) -> bool {
        self.function.is_none() && self.symbol.is_none()
    }
}

/// A source line's address range, as returned by the host's line-entry
/// lookup (`[start, end)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start_address: u64,
    pub end_address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceHandle(pub u64);

#[derive(Debug, Clone)]
pub struct StartTraceRequest {
    pub trace_buffer_size: u64,
    pub metadata_buffer_size: u64,
    /// `None` means whole-process tracing.
    pub thread_id: Option<ThreadId>,
    pub custom_params: JsonValue,
}

pub trait DebuggerHost {
    fn debugger_id(&self) -> DebuggerId;

    fn current_process(&self) -> crate::error::PtResult<ProcessId>;

    fn process_state(&self, pid: ProcessId) -> crate::error::PtResult<ProcessState>;

    /// All threads currently known to `pid`.
    fn thread_ids(&self, pid: ProcessId) -> crate::error::PtResult<Vec<ThreadId>>;

    /// Monotonically increasing counter that changes every stop/run
    /// transition; used to invalidate a cached `ThreadTrace`.
    fn stop_id(&self, pid: ProcessId, tid: ThreadId) -> crate::error::PtResult<u64>;

    fn read_execute_sections(&self, pid: ProcessId) -> crate::error::PtResult<Vec<Section>>;

    fn resolve_address(
        &self,
        pid: ProcessId,
        addr: u64,
    ) -> crate::error::PtResult<ResolvedAddress>;

    fn breakpoint_addresses(&self, pid: ProcessId) -> crate::error::PtResult<HashSet<u64>>;

    fn line_entry_at(
        &self,
        pid: ProcessId,
        addr: u64,
    ) -> crate::error::PtResult<Option<LineRange>>;

    fn start_trace(&self, req: StartTraceRequest) -> crate::error::PtResult<TraceHandle>;

    fn stop_trace(&self, handle: TraceHandle) -> crate::error::PtResult<()>;

    fn read_raw_trace(&self, handle: TraceHandle) -> crate::error::PtResult<Vec<u8>>;

    fn read_cpu_info(&self, handle: TraceHandle) -> crate::error::PtResult<CpuDescriptor>;
}
