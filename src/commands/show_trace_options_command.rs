use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

pub struct ShowTraceOptionsCommand {
    thread: ThreadArg,
}

impl ShowTraceOptionsCommand {
    pub fn new(thread: ThreadArg) -> Self {
        ShowTraceOptionsCommand { thread }
    }
}

impl PtCommand for ShowTraceOptionsCommand {
    fn name(&self) -> &'static str {
        "show-trace-options"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Show the trace options in effect for a thread's Intel Processor Trace"
    }

    fn syntax(&self) -> &'static str {
        "show-trace-options -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            let options = manager.get_trace_options(host, tid)?;
            Ok(format!(
                "trace-type={} trace-buffer-size={} metadata-buffer-size={} custom-params={}",
                options.trace_type,
                options.trace_buffer_size,
                options.metadata_buffer_size,
                options.custom_params
            ))
        })
    }
}
