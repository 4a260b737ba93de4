use super::{fan_out, PtCommand, ThreadArg};
use crate::error::PtResult;
use crate::host::DebuggerHost;
use crate::manager::Manager;

pub struct ShowInstrLogCommand {
    offset: Option<usize>,
    count: Option<usize>,
    thread: ThreadArg,
}

impl ShowInstrLogCommand {
    pub fn new(offset: Option<usize>, count: Option<usize>, thread: ThreadArg) -> Self {
        ShowInstrLogCommand {
            offset,
            count,
            thread,
        }
    }
}

impl PtCommand for ShowInstrLogCommand {
    fn name(&self) -> &'static str {
        "show-instr-log"
    }

    fn alias(&self) -> Option<&'static str> {
        None
    }

    fn help(&self) -> &'static str {
        "Show a window of the decoded instruction log"
    }

    fn syntax(&self) -> &'static str {
        "show-instr-log [-o <offset>] [-c <count>] -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        true
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        let offset = self.offset.unwrap_or(0);
        let count = self
            .count
            .unwrap_or_else(|| crate::flags::EngineConfig::get().default_instr_log_count as usize);

        fan_out(&self.thread, host, |tid| {
            let window = manager.get_instruction_log_at_offset(host, tid, offset, count)?;
            let mut out = String::new();
            for insn in &window {
                if insn.is_error() {
                    out.push_str(&format!(
                        "  [{}] <gap, error {}>\n",
                        insn.id(),
                        insn.error_code()
                    ));
                } else {
                    out.push_str(&format!(
                        "  [{}] {:#x} {:?}{}\n",
                        insn.id(),
                        insn.address(),
                        insn.class(),
                        if insn.speculative() { " (speculative)" } else { "" }
                    ));
                }
            }
            Ok(out)
        })
    }
}
