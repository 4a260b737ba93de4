use super::{fan_out, PtCommand, ThreadArg};
use crate::error::{PtError, PtResult};
use crate::host::DebuggerHost;
use crate::manager::Manager;
use crate::thread_trace::{StepOutcome, ThreadTrace};

/// The six implemented stepping primitives, plus a stub for `step-in`/
/// `step-out` (declared in the command enum but left unimplemented).
enum Kind {
    StepInst,
    ReverseStepInst,
    StepOver,
    ReverseStepOver,
    Continue,
    ReverseContinue,
    Unimplemented,
}

pub struct StepCommand {
    kind: Kind,
    thread: ThreadArg,
}

impl StepCommand {
    pub fn step_inst(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::StepInst, thread }
    }

    pub fn reverse_step_inst(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::ReverseStepInst, thread }
    }

    pub fn step_over(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::StepOver, thread }
    }

    pub fn reverse_step_over(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::ReverseStepOver, thread }
    }

    pub fn continue_(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::Continue, thread }
    }

    pub fn reverse_continue(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::ReverseContinue, thread }
    }

    pub fn unimplemented(thread: ThreadArg) -> Self {
        StepCommand { kind: Kind::Unimplemented, thread }
    }

    fn run(&self, trace: &mut ThreadTrace, host: &dyn DebuggerHost) -> PtResult<StepOutcome> {
        match self.kind {
            Kind::StepInst => trace.step_inst(),
            Kind::ReverseStepInst => trace.reverse_step_inst(),
            Kind::StepOver => trace.step_over(host),
            Kind::ReverseStepOver => trace.reverse_step_over(host),
            Kind::Continue => trace.continue_(host),
            Kind::ReverseContinue => trace.reverse_continue(host),
            Kind::Unimplemented => Err(PtError::HostFailure(
                "step-in/step-out not implemented".to_string(),
            )),
        }
    }
}

impl PtCommand for StepCommand {
    fn name(&self) -> &'static str {
        match self.kind {
            Kind::StepInst => "step-inst",
            Kind::ReverseStepInst => "reverse-step-inst",
            Kind::StepOver => "step-over",
            Kind::ReverseStepOver => "reverse-step-over",
            Kind::Continue => "continue",
            Kind::ReverseContinue => "reverse-continue",
            Kind::Unimplemented => "step-in/step-out",
        }
    }

    fn alias(&self) -> Option<&'static str> {
        match self.kind {
            Kind::StepInst => Some("ptsi"),
            Kind::ReverseStepInst => Some("ptrsi"),
            Kind::StepOver => Some("ptn"),
            Kind::ReverseStepOver => Some("ptrn"),
            Kind::Continue => Some("ptc"),
            Kind::ReverseContinue => Some("ptrc"),
            Kind::Unimplemented => None,
        }
    }

    fn help(&self) -> &'static str {
        match self.kind {
            Kind::StepInst => "Step forward one instruction",
            Kind::ReverseStepInst => "Step backward one instruction",
            Kind::StepOver => "Step over the current source line",
            Kind::ReverseStepOver => "Step backward over the current source line",
            Kind::Continue => "Run forward to the next breakpoint",
            Kind::ReverseContinue => "Run backward to the previous breakpoint",
            Kind::Unimplemented => "Not implemented",
        }
    }

    fn syntax(&self) -> &'static str {
        "<step-kind> -t <thread-index>|all"
    }

    fn supports_auto_repeat(&self) -> bool {
        !matches!(self.kind, Kind::Unimplemented)
    }

    fn execute(&self, host: &dyn DebuggerHost, manager: &Manager) -> PtResult<String> {
        fan_out(&self.thread, host, |tid| {
            manager.with_thread_trace(host, tid, |trace, host| match self.run(trace, host)? {
                StepOutcome::Moved => Ok(format!("stopped at instruction {}", trace.cursor())),
                StepOutcome::HitBreakpoint => {
                    Ok(format!("breakpoint hit at instruction {}", trace.cursor()))
                }
                StepOutcome::NoMove => Ok("no move".to_string()),
            })
        })
    }
}
