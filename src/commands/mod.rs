//! The `processor-trace` (alias `pt`) command surface, parsed with
//! `structopt`.

pub mod backtrace_command;
pub mod go_to_command;
pub mod show_function_call_history_command;
pub mod show_instr_log_command;
pub mod show_trace_options_command;
pub mod start_command;
pub mod step_command;
pub mod stop_command;

use crate::error::PtResult;
use crate::host::{DebuggerHost, ThreadId};
use crate::manager::{Manager, ThreadSelector};
use structopt::StructOpt;

/// Resolve a `-t` argument to the concrete thread ids it selects, fanning
/// out over the whole process for `-t all`.
pub fn resolve_threads(arg: &ThreadArg, host: &dyn DebuggerHost) -> PtResult<Vec<ThreadId>> {
    match arg {
        ThreadArg::Index(tid) => Ok(vec![*tid]),
        ThreadArg::All => {
            let pid = host.current_process()?;
            host.thread_ids(pid)
        }
    }
}

/// Run `per_thread` over every thread `arg` selects. For a single explicit
/// `-t <index>` a per-thread error aborts the whole command, same as any
/// other query. For `-t all` a per-thread error is reported inline and the
/// fan-out continues to the next thread instead of aborting, reporting
/// that thread's error inline.
pub fn fan_out(
    arg: &ThreadArg,
    host: &dyn DebuggerHost,
    mut per_thread: impl FnMut(ThreadId) -> PtResult<String>,
) -> PtResult<String> {
    let threads = resolve_threads(arg, host)?;
    match arg {
        ThreadArg::Index(_) => {
            let tid = *threads.first().expect("resolve_threads always yields one entry for Index");
            per_thread(tid)
        }
        ThreadArg::All => {
            let mut out = String::new();
            for tid in threads {
                match per_thread(tid) {
                    Ok(line) => out.push_str(&format!("thread {}: {}\n", tid, line)),
                    Err(e) => {
                        log::warn!("processor-trace: thread {} failed: {}", tid, e);
                        out.push_str(&format!("thread {}: error: {}\n", tid, e));
                    }
                }
            }
            Ok(out)
        }
    }
}

/// Shared surface every subcommand implements.
pub trait PtCommand {
    fn name(&self) -> &'static str;
    fn alias(&self) -> Option<&'static str>;
    fn help(&self) -> &'static str;
    fn syntax(&self) -> &'static str;
    fn supports_auto_repeat(&self) -> bool;
    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String>;
}

/// `-t <thread-index>` / `-t all`.
#[derive(Debug, Clone)]
pub enum ThreadArg {
    Index(u64),
    All,
}

impl std::str::FromStr for ThreadArg {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(ThreadArg::All)
        } else {
            Ok(ThreadArg::Index(s.parse()?))
        }
    }
}

impl From<ThreadArg> for ThreadSelector {
    fn from(arg: ThreadArg) -> Self {
        match arg {
            ThreadArg::Index(i) => ThreadSelector::Index(i),
            ThreadArg::All => ThreadSelector::All,
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "processor-trace", alias = "pt")]
pub struct PtOptions {
    #[structopt(subcommand)]
    pub cmd: PtSubCommand,
}

#[derive(Debug, StructOpt)]
pub enum PtSubCommand {
    /// Start Intel PT tracing on a thread, or the whole process.
    Start {
        #[structopt(short = "b", long)]
        buffer_size: Option<u64>,
        #[structopt(short = "t", long)]
        thread: Option<ThreadArg>,
    },
    /// Stop an active trace.
    Stop {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Show the trace options in effect for a thread's trace.
    ShowTraceOptions {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Show a window of the decoded instruction log.
    ShowInstrLog {
        #[structopt(short = "o", long)]
        offset: Option<usize>,
        #[structopt(short = "c", long)]
        count: Option<usize>,
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Show the function call history (segment list) for a thread.
    ShowFunctionCallHistory {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Show the current backtrace at the cursor position.
    Backtrace {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Move the cursor to an explicit instruction-log position.
    GoTo {
        position: usize,
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "step-inst", alias = "ptsi")]
    StepInst {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "reverse-step-inst", alias = "ptrsi")]
    ReverseStepInst {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "step-over", alias = "ptn")]
    StepOver {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "reverse-step-over", alias = "ptrn")]
    ReverseStepOver {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "continue", alias = "ptc")]
    Continue {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "reverse-continue", alias = "ptrc")]
    ReverseContinue {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    /// Not implemented: declared for CLI-surface parity, always fails.
    #[structopt(name = "step-in", alias = "pts")]
    StepIn {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "reverse-step-in", alias = "ptrs")]
    ReverseStepIn {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "step-out", alias = "ptfinish")]
    StepOut {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
    #[structopt(name = "reverse-step-out", alias = "ptrfinish")]
    ReverseStepOut {
        #[structopt(short = "t", long)]
        thread: ThreadArg,
    },
}

/// Build the concrete [`PtCommand`] for a parsed subcommand and run it.
pub fn dispatch(opts: &PtOptions, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
    use start_command::StartCommand;
    use stop_command::StopCommand;

    match &opts.cmd {
        PtSubCommand::Start { buffer_size, thread } => {
            StartCommand::new(*buffer_size, thread.clone()).execute(host, manager)
        }
        PtSubCommand::Stop { thread } => StopCommand::new(thread.clone()).execute(host, manager),
        PtSubCommand::ShowTraceOptions { thread } => {
            show_trace_options_command::ShowTraceOptionsCommand::new(thread.clone())
                .execute(host, manager)
        }
        PtSubCommand::ShowInstrLog { offset, count, thread } => {
            show_instr_log_command::ShowInstrLogCommand::new(*offset, *count, thread.clone())
                .execute(host, manager)
        }
        PtSubCommand::ShowFunctionCallHistory { thread } => {
            show_function_call_history_command::ShowFunctionCallHistoryCommand::new(thread.clone())
                .execute(host, manager)
        }
        PtSubCommand::Backtrace { thread } => {
            backtrace_command::BacktraceCommand::new(thread.clone()).execute(host, manager)
        }
        PtSubCommand::GoTo { position, thread } => {
            go_to_command::GoToCommand::new(*position, thread.clone()).execute(host, manager)
        }
        PtSubCommand::StepInst { thread } => {
            step_command::StepCommand::step_inst(thread.clone()).execute(host, manager)
        }
        PtSubCommand::ReverseStepInst { thread } => {
            step_command::StepCommand::reverse_step_inst(thread.clone()).execute(host, manager)
        }
        PtSubCommand::StepOver { thread } => {
            step_command::StepCommand::step_over(thread.clone()).execute(host, manager)
        }
        PtSubCommand::ReverseStepOver { thread } => {
            step_command::StepCommand::reverse_step_over(thread.clone()).execute(host, manager)
        }
        PtSubCommand::Continue { thread } => {
            step_command::StepCommand::continue_(thread.clone()).execute(host, manager)
        }
        PtSubCommand::ReverseContinue { thread } => {
            step_command::StepCommand::reverse_continue(thread.clone()).execute(host, manager)
        }
        PtSubCommand::StepIn { thread }
        | PtSubCommand::ReverseStepIn { thread }
        | PtSubCommand::StepOut { thread }
        | PtSubCommand::ReverseStepOut { thread } => {
            step_command::StepCommand::unimplemented(thread.clone()).execute(host, manager)
        }
    }
}
