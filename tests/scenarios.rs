//! End-to-end scenario tests: a hand-built instruction log runs through
//! `CallTreeBuilder`, the result is frozen into a `ThreadTrace`, and
//! cursor/backtrace behavior is asserted against a `MockHost`.

mod common;

use arrayvec::ArrayVec;
use common::MockHost;
use rdpt::call_tree_builder::CallTreeBuilder;
use rdpt::cpu::CpuDescriptor;
use rdpt::function_segment::FunctionSegment;
use rdpt::host::{LineRange, ResolvedAddress, TraceHandle};
use rdpt::instruction::{InsnClass, Instruction, InstructionLog};
use rdpt::thread_trace::{StepOutcome, ThreadTrace};

fn raw(n: usize) -> ArrayVec<[u8; 15]> {
    let mut v = ArrayVec::new();
    for i in 0..n {
        v.push(i as u8);
    }
    v
}

fn resolved(handle: u64, name: &str, start: u64) -> ResolvedAddress {
    ResolvedAddress {
        function: Some(handle),
        function_name: Some(name.to_string()),
        function_start: Some(start),
        symbol: Some(handle),
        symbol_name: Some(name.to_string()),
    }
}

fn build(log: InstructionLog, resolved_for: &[ResolvedAddress]) -> (InstructionLog, Vec<FunctionSegment>) {
    let mut builder = CallTreeBuilder::new();
    for idx in 0..log.len() {
        builder.append(&log, idx, &resolved_for[idx]);
    }
    let segments = builder.finalize();
    (log, segments)
}

fn trace(log: InstructionLog, segments: Vec<FunctionSegment>) -> ThreadTrace {
    ThreadTrace::new(
        1,
        1,
        Vec::new(),
        Vec::new(),
        CpuDescriptor::native(),
        TraceHandle(1),
        0,
        log,
        segments,
    )
}

/// Every structural invariant: segment ranges partition the log, the `parent`
/// chain is acyclic, `next`/`prev` stay consistent, and each maximal
/// non-gap run starts at level 0.
fn assert_universals(log: &[Instruction], segments: &[FunctionSegment]) {
    let mut expect_first = 0u32;
    for (i, s) in segments.iter().enumerate() {
        assert_eq!(s.first(), expect_first, "segment {} doesn't start where the previous one ended", i);
        assert!(s.first() <= s.last());
        expect_first = s.last() + 1;
    }
    assert_eq!(expect_first as usize, log.len());

    for s in segments {
        let mut steps = 0;
        let mut cur = s.parent();
        while let Some(p) = cur {
            steps += 1;
            assert!(steps <= segments.len(), "parent chain did not terminate");
            cur = segments[p as usize].parent();
        }
    }

    for s in segments {
        if let Some(next) = s.next() {
            let n = &segments[next as usize];
            assert_eq!(n.prev(), Some(s.id()));
            assert_eq!(n.level(), s.level());
            assert_eq!(n.parent(), s.parent());
        }
    }

    let mut i = 0;
    while i < segments.len() {
        if segments[i].is_gap() {
            i += 1;
            continue;
        }
        let mut j = i;
        let mut min_level = segments[i].level();
        while j + 1 < segments.len() && !segments[j + 1].is_gap() {
            j += 1;
            min_level = min_level.min(segments[j].level());
        }
        assert_eq!(min_level, 0, "run [{}, {}] does not start at level 0", i, j);
        i = j + 1;
    }
}

/// Scenario 1: simple call/return.
#[test]
fn simple_call_return_backtrace() {
    let log = vec![
        Instruction::decoded(0, 0x100, raw(1), InsnClass::Other, false),
        Instruction::decoded(1, 0x100, raw(5), InsnClass::Call, false),
        Instruction::decoded(2, 0x200, raw(1), InsnClass::Other, false),
        Instruction::decoded(3, 0x200, raw(1), InsnClass::Return, false),
    ];
    let a = resolved(1, "A", 0x100);
    let b = resolved(2, "B", 0x200);
    let resolved_for = [a.clone(), a, b.clone(), b];
    let (log, segments) = build(log, &resolved_for);
    assert_universals(&log, &segments);

    let mut t = trace(log, segments);
    t.go_to(3).unwrap();
    let frames = t.backtrace();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].instruction, Some(3));
    assert_eq!(frames[1].instruction, Some(1));
}

/// Scenario 2: tail call via jump to the start of another function.
#[test]
fn tail_call_via_jump() {
    let log = vec![
        Instruction::decoded(0, 0x10, raw(1), InsnClass::Other, false),
        Instruction::decoded(1, 0x10, raw(1), InsnClass::Jump, false),
        Instruction::decoded(2, 0x50, raw(1), InsnClass::Other, false),
    ];
    let a = resolved(1, "A", 0x10);
    let b = resolved(2, "B", 0x50);
    let resolved_for = [a, b.clone(), b];
    let (log, segments) = build(log, &resolved_for);
    assert_universals(&log, &segments);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].level(), 0);
    assert_eq!(segments[1].level(), 1);
    assert_eq!(segments[1].parent(), Some(0));
}

/// Scenario 4: return to an untraced caller. The builder discovers the
/// caller only retroactively and re-roots the callee beneath it.
#[test]
fn return_to_untraced_caller_levels() {
    let log = vec![
        Instruction::decoded(0, 0x400, raw(1), InsnClass::Other, false),
        Instruction::decoded(1, 0x400, raw(1), InsnClass::Return, false),
        Instruction::decoded(2, 0x300, raw(1), InsnClass::Other, false),
    ];
    let x = resolved(9, "X", 0x400);
    let y = resolved(8, "Y", 0x300);
    let resolved_for = [x.clone(), x, y];
    let (log, segments) = build(log, &resolved_for);
    assert_universals(&log, &segments);

    let x_seg = segments.iter().find(|s| s.function_name() == Some("X")).unwrap();
    let y_seg = segments.iter().find(|s| s.function_name() == Some("Y")).unwrap();
    assert_eq!(x_seg.level(), 1);
    assert_eq!(y_seg.level(), 0);
    assert_eq!(x_seg.parent(), Some(y_seg.id()));
}

/// Scenario 6: a decode gap splits the run into two independent roots.
#[test]
fn decode_gap_yields_independent_roots() {
    let log = vec![
        Instruction::decoded(0, 0x10, raw(1), InsnClass::Other, false),
        Instruction::decoded(1, 0x11, raw(1), InsnClass::Other, false),
        Instruction::gap(2, -1),
        Instruction::gap(3, -1),
        Instruction::decoded(4, 0x50, raw(1), InsnClass::Other, false),
    ];
    let a = resolved(1, "A", 0x10);
    let b = resolved(2, "B", 0x50);
    let noop = ResolvedAddress::default();
    let resolved_for = [a.clone(), a, noop.clone(), noop, b];
    let (log, segments) = build(log, &resolved_for);
    assert_universals(&log, &segments);

    assert_eq!(segments.len(), 3);
    assert!(segments[1].is_gap());
    assert_eq!(segments[1].first(), 2);
    assert_eq!(segments[1].last(), 3);
    assert_eq!(segments[0].level(), 0);
    assert_eq!(segments[2].level(), 0);
}

/// Scenario 5: reverse-step-over across a callee. The cursor should land
/// on the last instruction of the previous source line in the same
/// function, skipping the callee's deeper-level instructions entirely.
#[test]
fn reverse_step_over_skips_callee() {
    // F: [0] other@0x100 (line1 0x100..0x108)
    //    [1] call@0x104 (size1) -> G         <- last insn of line1
    //    [2] G: other@0x200 (level 1)
    //    [3] G: return@0x200
    //    [4] F: other@0x108 (line2 0x108..0x110)
    //    [5] F: other@0x109 (line2)           <- starting cursor
    let log = vec![
        Instruction::decoded(0, 0x100, raw(4), InsnClass::Other, false),
        Instruction::decoded(1, 0x104, raw(1), InsnClass::Call, false),
        Instruction::decoded(2, 0x200, raw(1), InsnClass::Other, false),
        Instruction::decoded(3, 0x200, raw(1), InsnClass::Return, false),
        Instruction::decoded(4, 0x108, raw(1), InsnClass::Other, false),
        Instruction::decoded(5, 0x109, raw(1), InsnClass::Other, false),
    ];
    let f = resolved(1, "F", 0x100);
    let g = resolved(2, "G", 0x200);
    let resolved_for = [f.clone(), f.clone(), g.clone(), g, f.clone(), f];
    let (log, segments) = build(log, &resolved_for);
    assert_universals(&log, &segments);

    let line2 = LineRange { start_address: 0x108, end_address: 0x110 };
    let host = MockHost::new(1, vec![1]).with_line_range(0x108, 0x110, line2);

    let mut t = trace(log, segments);
    t.go_to(5).unwrap();
    let outcome = t.reverse_step_over(&host).unwrap();
    assert_eq!(outcome, StepOutcome::Moved);
    assert_eq!(t.cursor(), 1, "should land on the call instruction, the last of line1");
}

/// Same scenario, but with a breakpoint inside the callee: stepping must
/// stop there instead of skipping past it.
#[test]
fn reverse_step_over_stops_early_at_breakpoint() {
    let log = vec![
        Instruction::decoded(0, 0x100, raw(4), InsnClass::Other, false),
        Instruction::decoded(1, 0x104, raw(1), InsnClass::Call, false),
        Instruction::decoded(2, 0x200, raw(1), InsnClass::Other, false),
        Instruction::decoded(3, 0x200, raw(1), InsnClass::Return, false),
        Instruction::decoded(4, 0x108, raw(1), InsnClass::Other, false),
        Instruction::decoded(5, 0x109, raw(1), InsnClass::Other, false),
    ];
    let f = resolved(1, "F", 0x100);
    let g = resolved(2, "G", 0x200);
    let resolved_for = [f.clone(), f.clone(), g.clone(), g, f.clone(), f];
    let (log, segments) = build(log, &resolved_for);

    let line2 = LineRange { start_address: 0x108, end_address: 0x110 };
    let host = MockHost::new(1, vec![1])
        .with_line_range(0x108, 0x110, line2)
        .with_breakpoint(0x200);

    let mut t = trace(log, segments);
    t.go_to(5).unwrap();
    let outcome = t.reverse_step_over(&host).unwrap();
    assert_eq!(outcome, StepOutcome::HitBreakpoint);
    assert_eq!(t.cursor(), 3);
}

/// Reverse-then-forward idempotence.
#[test]
fn reverse_then_forward_restores_cursor() {
    let log = vec![
        Instruction::decoded(0, 0x100, raw(1), InsnClass::Other, false),
        Instruction::decoded(1, 0x101, raw(1), InsnClass::Other, false),
    ];
    let a = resolved(1, "A", 0x100);
    let (log, segments) = build(log, &[a.clone(), a]);
    let mut t = trace(log, segments);
    let before = t.cursor();
    t.step_inst().unwrap();
    t.reverse_step_inst().unwrap();
    assert_eq!(t.cursor(), before);
}
