use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

pub struct BacktraceCommand {
    thread: ThreadArg,
}

impl BacktraceCommand {
    pub fn new(thread: ThreadArg) -> Self {
        BacktraceCommand { thread }
    }
}

impl PtCommand for BacktraceCommand {
    fn name(&self) -> &'static str {
        "backtrace"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Reconstruct the call stack at the current trace cursor position"
    }

    fn syntax(&self) -> &'static str {
        "backtrace -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            manager.with_thread_trace(host, tid, |trace, _host| {
                let frames = trace.backtrace();
                let mut out = String::new();
                for (i, frame) in frames.iter().enumerate() {
                    let segment = &trace.segments()[frame.segment as usize];
                    let loc = match frame.instruction {
                        Some(id) => format!("{:#x}", trace.log()[id as usize].address()),
                        None => "<call site not captured>".to_string(),
                    };
                    out.push_str(&format!(
                        "  #{} {} in {}\n",
                        i,
                        loc,
                        segment.display_name()
                    ));
                }
                Ok(out)
            })
        })
    }
}
