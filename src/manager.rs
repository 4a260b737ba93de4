//! Registry facade: `debugger-id -> process-id -> thread-id -> ThreadTrace`,
//! behind one mutex. Every public method re-validates staleness and
//! debugger identity before touching a `ThreadTrace`.

use crate::decoder::Decoder;
use crate::error::{PtError, PtResult};
use crate::host::{
    DebuggerHost, DebuggerId, ProcessId, ResolvedAddress, StartTraceRequest, ThreadId,
};
use crate::instruction::Instruction;
use crate::thread_trace::ThreadTrace;

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Mutex;

/// Thread index selector for the `-t` flag family: a specific thread, or
/// `all` to fan out over every thread of the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSelector {
    Index(ThreadId),
    All,
}

/// What `show-trace-options` reports for a thread's trace.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub trace_type: &'static str,
    pub trace_buffer_size: u64,
    pub metadata_buffer_size: u64,
    pub custom_params: JsonValue,
}

struct Slot {
    owner_debugger: DebuggerId,
    whole_process: bool,
    options: TraceOptions,
    handle: crate::host::TraceHandle,
    trace: Option<ThreadTrace>,
}

#[derive(Default)]
struct Registry {
    // process-id -> thread-id -> Slot
    slots: HashMap<(ProcessId, ThreadId), Slot>,
}

pub struct Manager {
    registry: Mutex<Registry>,
}

impl Manager {
    pub fn new() -> Self {
        Manager {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Start tracing a single thread, or (when `req.thread_id` is `None`)
    /// the whole process; per-thread slots for a whole-process trace are
    /// synthesized lazily on first query.
    pub fn start(&self, host: &dyn DebuggerHost, mut req: StartTraceRequest) -> PtResult<()> {
        let pid = host.current_process()?;
        self.reap_dead(host, pid)?;

        req.trace_buffer_size = req
            .trace_buffer_size
            .min(crate::flags::EngineConfig::get().max_trace_buffer_size);
        let whole_process = req.thread_id.is_none();
        let handle = host.start_trace(req.clone())?;

        let options = TraceOptions {
            trace_type: "processor-trace",
            trace_buffer_size: req.trace_buffer_size,
            metadata_buffer_size: req.metadata_buffer_size,
            custom_params: req.custom_params.clone(),
        };

        let mut registry = self.registry.lock().unwrap();
        let threads = match req.thread_id {
            Some(tid) => vec![tid],
            None => host.thread_ids(pid)?,
        };
        for tid in threads {
            registry.slots.insert(
                (pid, tid),
                Slot {
                    owner_debugger: host.debugger_id(),
                    whole_process,
                    options: options.clone(),
                    handle,
                    trace: None,
                },
            );
        }
        Ok(())
    }

    /// Stop a thread's trace, or, if it belongs to a whole-process trace,
    /// every sibling slot synthesized under it.
    pub fn stop(&self, host: &dyn DebuggerHost, tid: ThreadId) -> PtResult<()> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        let slot = registry
            .slots
            .get(&(pid, tid))
            .ok_or(PtError::NotTracing(tid))?;
        Self::check_debugger(slot, host)?;
        host.stop_trace(slot.handle)?;

        if slot.whole_process {
            registry.slots.retain(|(p, _), s| *p != pid || !s.whole_process);
        } else {
            registry.slots.remove(&(pid, tid));
        }
        Ok(())
    }

    pub fn get_trace_options(&self, host: &dyn DebuggerHost, tid: ThreadId) -> PtResult<TraceOptions> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        self.ensure_slot(host, &mut registry, pid, tid)?;
        let slot = registry
            .slots
            .get(&(pid, tid))
            .ok_or(PtError::NotTracing(tid))?;
        Self::check_debugger(slot, host)?;
        Ok(slot.options.clone())
    }

    /// `show-instr-log -o <offset> -c <count>`, after ensuring the
    /// thread's decode is fresh.
    pub fn get_instruction_log_at_offset(
        &self,
        host: &dyn DebuggerHost,
        tid: ThreadId,
        offset: usize,
        count: usize,
    ) -> PtResult<Vec<Instruction>> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        self.refresh(host, &mut registry, pid, tid)?;
        let slot = registry.slots.get(&(pid, tid)).ok_or(PtError::NotTracing(tid))?;
        let trace = slot.trace.as_ref().ok_or(PtError::NotTracing(tid))?;
        Ok(trace.instruction_log_window(offset, count)?.to_vec())
    }

    pub fn get_processor_trace_info(
        &self,
        host: &dyn DebuggerHost,
        tid: ThreadId,
    ) -> PtResult<crate::cpu::CpuDescriptor> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        self.refresh(host, &mut registry, pid, tid)?;
        let slot = registry.slots.get(&(pid, tid)).ok_or(PtError::NotTracing(tid))?;
        let trace = slot.trace.as_ref().ok_or(PtError::NotTracing(tid))?;
        Ok(trace.cpu())
    }

    pub fn function_call_history(
        &self,
        host: &dyn DebuggerHost,
        tid: ThreadId,
    ) -> PtResult<Vec<crate::thread_trace::CallHistoryEntry>> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        self.refresh(host, &mut registry, pid, tid)?;
        let slot = registry.slots.get(&(pid, tid)).ok_or(PtError::NotTracing(tid))?;
        let trace = slot.trace.as_ref().ok_or(PtError::NotTracing(tid))?;
        Ok(trace.function_call_history())
    }

    /// Run `f` against a freshly-decoded `ThreadTrace`, holding the
    /// registry mutex for the duration (cursor ops on a single trace must
    /// be serialized).
    pub fn with_thread_trace<R>(
        &self,
        host: &dyn DebuggerHost,
        tid: ThreadId,
        f: impl FnOnce(&mut ThreadTrace, &dyn DebuggerHost) -> PtResult<R>,
    ) -> PtResult<R> {
        let pid = host.current_process()?;
        let mut registry = self.registry.lock().unwrap();
        self.refresh(host, &mut registry, pid, tid)?;
        let slot = registry
            .slots
            .get_mut(&(pid, tid))
            .ok_or(PtError::NotTracing(tid))?;
        let trace = slot.trace.as_mut().ok_or(PtError::NotTracing(tid))?;
        f(trace, host)
    }

    fn check_debugger(slot: &Slot, host: &dyn DebuggerHost) -> PtResult<()> {
        if slot.owner_debugger != host.debugger_id() {
            return Err(PtError::WrongDebugger);
        }
        Ok(())
    }

    /// If `(pid, tid)` has no slot yet but a whole-process trace owned by
    /// the calling debugger is active for `pid`, synthesize a per-thread
    /// slot for it lazily instead of leaving the query to fail with
    /// `NotTracing`; per-thread entries may be synthesized lazily on
    /// first query for a member thread.
    fn ensure_slot(
        &self,
        host: &dyn DebuggerHost,
        registry: &mut Registry,
        pid: ProcessId,
        tid: ThreadId,
    ) -> PtResult<()> {
        if registry.slots.contains_key(&(pid, tid)) {
            return Ok(());
        }
        let whole_process_slot = registry.slots.iter().find_map(|((p, _), s)| {
            if *p == pid && s.whole_process && s.owner_debugger == host.debugger_id() {
                Some((s.owner_debugger, s.options.clone(), s.handle))
            } else {
                None
            }
        });
        if let Some((owner_debugger, options, handle)) = whole_process_slot {
            registry.slots.insert(
                (pid, tid),
                Slot {
                    owner_debugger,
                    whole_process: true,
                    options,
                    handle,
                    trace: None,
                },
            );
        }
        Ok(())
    }

    /// Re-decode when the thread's stop-id has advanced past the cached
    /// one, or when no trace has been decoded yet.
    fn refresh(
        &self,
        host: &dyn DebuggerHost,
        registry: &mut Registry,
        pid: ProcessId,
        tid: ThreadId,
    ) -> PtResult<()> {
        self.ensure_slot(host, registry, pid, tid)?;
        let slot = registry
            .slots
            .get_mut(&(pid, tid))
            .ok_or(PtError::NotTracing(tid))?;
        Self::check_debugger(slot, host)?;

        let current_stop_id = host.stop_id(pid, tid)?;
        let needs_decode = match &slot.trace {
            Some(trace) => trace.stop_id() != current_stop_id,
            None => true,
        };
        if !needs_decode {
            return Ok(());
        }

        log::debug!(
            "thread trace for ({:?}, {:?}) is stale (stop-id {} -> {}); re-decoding",
            pid,
            tid,
            slot.trace.as_ref().map_or(u64::MAX, |t| t.stop_id()),
            current_stop_id
        );

        let handle = slot.handle;
        let sections = host.read_execute_sections(pid)?;
        let cpu = host
            .read_cpu_info(handle)
            .unwrap_or(crate::cpu::CpuDescriptor::native());
        let raw_trace = host.read_raw_trace(handle)?;
        let (log, segments) = Decoder::decode(&raw_trace, &sections, cpu, host, pid)?;

        slot.trace = Some(ThreadTrace::new(
            pid,
            tid,
            raw_trace,
            sections,
            cpu,
            handle,
            current_stop_id,
            log,
            segments,
        ));
        Ok(())
    }

    /// Dead-thread/process reaping triggered lazily on `start`.
    fn reap_dead(&self, host: &dyn DebuggerHost, pid: ProcessId) -> PtResult<()> {
        let mut registry = self.registry.lock().unwrap();
        let live_pids: Vec<ProcessId> = registry.slots.keys().map(|(p, _)| *p).collect();
        for p in live_pids {
            if host.process_state(p).map_or(true, |s| {
                matches!(s, crate::host::ProcessState::Exited | crate::host::ProcessState::Invalid)
            }) {
                registry.slots.retain(|(pp, _), _| *pp != p);
                continue;
            }
            if p == pid {
                if let Ok(live_tids) = host.thread_ids(p) {
                    registry
                        .slots
                        .retain(|(pp, tt), _| *pp != p || live_tids.contains(tt));
                }
            }
        }
        Ok(())
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
