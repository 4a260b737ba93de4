use super::{resolve_threads, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::{DebuggerHost, StartTraceRequest};
use crate::manager::Manager;

pub struct StartCommand {
    buffer_size: Option<u64>,
    thread: Option<ThreadArg>,
}

impl StartCommand {
    pub fn new(buffer_size: Option<u64>, thread: Option<ThreadArg>) -> Self {
        StartCommand { buffer_size, thread }
    }
}

impl PtCommand for StartCommand {
    fn name(&self) -> &'static str {
        "start"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Start Intel Processor Trace on a thread, or the whole process"
    }

    fn syntax(&self) -> &'static str {
        "start [-b <buffer-size>] [-t <thread-index>|all]"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        let buffer_size = self
            .buffer_size
            .unwrap_or_else(|| crate::flags::EngineConfig::get().max_trace_buffer_size);

        let thread_id = match &self.thread {
            None | Some(ThreadArg::All) => None,
            Some(arg) => resolve_threads(arg, host)?.into_iter().next(),
        };

        let req = StartTraceRequest {
            trace_buffer_size: buffer_size,
            metadata_buffer_size: 4096,
            thread_id,
            custom_params: serde_json::json!({"trace-tech": "intel-pt"}),
        };
        manager.start(host, req)?;
        Ok("processor trace started".to_string())
    }
}
