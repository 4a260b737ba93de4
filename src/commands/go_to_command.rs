use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

pub struct GoToCommand {
    position: usize,
    thread: ThreadArg,
}

impl GoToCommand {
    pub fn new(position: usize, thread: ThreadArg) -> Self {
        GoToCommand { position, thread }
    }
}

impl PtCommand for GoToCommand {
    fn name(&self) -> &'static str {
        "go-to"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Move the cursor to an explicit instruction-log position"
    }

    fn syntax(&self) -> &'static str {
        "go-to <position> -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            manager.with_thread_trace(host, tid, |trace, _host| {
                let before = trace.cursor();
                trace.go_to(self.position)?;
                log::debug!(
                    "go-to: thread {} cursor {} -> {}",
                    tid,
                    before,
                    trace.cursor()
                );
                Ok(format!("cursor moved from {} to {}", before, trace.cursor()))
            })
        })
    }
}
