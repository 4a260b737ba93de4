use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

pub struct StopCommand {
    thread: ThreadArg,
}

impl StopCommand {
    pub fn new(thread: ThreadArg) -> Self {
        StopCommand { thread }
    }
}

impl PtCommand for StopCommand {
    fn name(&self) -> &'static str {
        "stop"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Stop an active Intel Processor Trace"
    }

    fn syntax(&self) -> &'static str {
        "stop -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            manager.stop(host, tid)?;
            Ok("trace stopped".to_string())
        })
    }
}
