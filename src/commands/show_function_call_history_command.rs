use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

/// `show-function-call-history`: a thin read-only view over the segment
/// list, distinct from `backtrace` (which only reports the current
/// position).
pub struct ShowFunctionCallHistoryCommand {
    thread: ThreadArg,
}

impl ShowFunctionCallHistoryCommand {
    pub fn new(thread: ThreadArg) -> Self {
        ShowFunctionCallHistoryCommand { thread }
    }
}

impl PtCommand for ShowFunctionCallHistoryCommand {
    fn name(&self) -> &'static str {
        "show-function-call-history"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Show the function call history (segment list) for a thread's trace"
    }

    fn syntax(&self) -> &'static str {
        "show-function-call-history -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        false
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            let history = manager.function_call_history(host, tid)?;
            let mut out = String::new();
            for entry in &history {
                let indent = "  ".repeat(entry.level.max(0) as usize);
                out.push_str(&format!(
                    "{}[{}] {:#x} {}\n",
                    indent, entry.segment, entry.start_address, entry.display_name
                ));
            }
            Ok(out)
        })
    }
}
