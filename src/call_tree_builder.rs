//! Streaming state machine that turns a flat instruction log into a tree of
//! [`FunctionSegment`]s. Segments are stored in a single arena
//! (`Vec`), with `parent`/`prev`/`next` as plain indices; see the note in
//! `function_segment.rs` for why this sidesteps `Rc`/`Weak` entirely.

use crate::function_segment::{FunctionSegment, SegmentId};
use crate::host::ResolvedAddress;
use crate::instruction::{InsnClass, InsnId, Instruction};

const DL_RUNTIME_RESOLVE_NAMES: [&str; 2] =
    ["_dl_runtime_resolve", "_dl_runtime_resolve_xsave"];

pub struct CallTreeBuilder {
    segments: Vec<FunctionSegment>,
    next_id: SegmentId,
}

impl CallTreeBuilder {
    pub fn new() -> Self {
        CallTreeBuilder {
            segments: Vec::new(),
            next_id: 0,
        }
    }

    /// Ingest the instruction at `log[idx]`, given its host-resolved
    /// symbolication, and return the id of the segment it was assigned to.
    /// `log[..=idx]` must already be populated; `log[idx+1..]` is never
    /// read.
    pub fn append(
        &mut self,
        log: &[Instruction],
        idx: usize,
        resolved: &ResolvedAddress,
    ) -> SegmentId {
        let insn = &log[idx];

        if insn.is_error() {
            return self.append_gap(insn.id());
        }

        let tail_is_gap_or_absent = self
            .segments
            .last()
            .map_or(true, |s| s.is_gap());

        if tail_is_gap_or_absent {
            return self.open_root(resolved, insn.id());
        }

        // Invariant: a non-gap tail was opened by the immediately preceding
        // log entry (every instruction is assigned to the then-current
        // tail), so `log[idx - 1]` is the tail's last instruction.
        debug_assert!(idx > 0);
        let prev = &log[idx - 1];
        debug_assert!(!prev.is_error());
        let tail_id = self.segments.last().unwrap().id();

        match prev.class() {
            InsnClass::Call => {
                if insn.address() == prev.address() + prev.size() {
                    // Call-to-next: the common PIC idiom. Not a real call.
                    self.extend_tail(tail_id, insn.id())
                } else {
                    self.append_child(tail_id, resolved, insn.id())
                }
            }
            InsnClass::Return => {
                let tail_name = self.segments[tail_id as usize].function_name();
                if tail_name.map_or(false, |n| DL_RUNTIME_RESOLVE_NAMES.contains(&n)) {
                    self.append_child(tail_id, resolved, insn.id())
                } else {
                    self.resolve_return(tail_id, resolved, insn.id(), log)
                }
            }
            InsnClass::Jump => self.handle_jump(tail_id, resolved, insn.id(), log),
            InsnClass::Other => self.fallthrough(tail_id, resolved, insn.id()),
            InsnClass::Error => unreachable!("tail cannot be built from a gap instruction"),
        }
    }

    /// Normalize levels so every maximal run of contiguous non-gap segments
    /// starts at level 0, and hand over the finished segment list.
    pub fn finalize(mut self) -> Vec<FunctionSegment> {
        let mut i = 0usize;
        while i < self.segments.len() {
            if self.segments[i].is_gap() {
                i += 1;
                continue;
            }
            let mut min_level = self.segments[i].level();
            let mut j = i;
            if i == 0 || self.segments[i - 1].is_gap() {
                while j + 1 < self.segments.len() && !self.segments[j + 1].is_gap() {
                    j += 1;
                    min_level = min_level.min(self.segments[j].level());
                }
            }
            for k in i..=j {
                let level = self.segments[k].level();
                self.segments[k].set_level(level - min_level);
            }
            i = j + 1;
        }
        self.segments
    }

    // -- segment-identity helpers ("identity rule") ----------------------

    fn switched(&self, seg_id: SegmentId, new: &ResolvedAddress) -> bool {
        let seg = &self.segments[seg_id as usize];
        let prev_has_symbol = seg.symbol().is_some();
        let prev_has_function = seg.function().is_some();
        let new_has_symbol = new.symbol.is_some();
        let new_has_function = new.function.is_some();

        if prev_has_symbol && new_has_symbol && seg.symbol_name() != new.symbol_name.as_deref() {
            return true;
        }
        if prev_has_function && new_has_function && seg.function_start() != new.function_start {
            return true;
        }
        if (prev_has_symbol || prev_has_function) && !new_has_symbol && !new_has_function {
            return true;
        }
        if (new_has_symbol || new_has_function) && !prev_has_symbol && !prev_has_function {
            return true;
        }
        false
    }

    // -- transitions (state-machine transitions) --------------------------

    fn handle_jump(
        &mut self,
        tail_id: SegmentId,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
        log: &[Instruction],
    ) -> SegmentId {
        let insn_address = log[insn_id as usize].address();

        if let Some(start) = resolved.function_start {
            if start == insn_address {
                return self.append_child(tail_id, resolved, insn_id);
            }
        }

        let tail_starts_unwind = self.segments[tail_id as usize]
            .function_name()
            .map_or(false, |n| n.starts_with("_Unwind_"));
        if tail_starts_unwind {
            let parent = self.segments[tail_id as usize].parent();
            if self.innermost_matching_caller(parent, resolved).is_some() {
                return self.resolve_return(tail_id, resolved, insn_id, log);
            }
        }

        if resolved.function_start.is_none() && self.switched(tail_id, resolved) {
            return self.append_child(tail_id, resolved, insn_id);
        }

        self.fallthrough(tail_id, resolved, insn_id)
    }

    fn fallthrough(
        &mut self,
        tail_id: SegmentId,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
    ) -> SegmentId {
        if self.switched(tail_id, resolved) {
            let level = self.segments[tail_id as usize].level();
            let parent = self.segments[tail_id as usize].parent();
            self.push_segment(resolved, insn_id, level, parent)
        } else {
            self.extend_tail(tail_id, insn_id)
        }
    }

    /// Full return-resolution procedure, used both for an
    /// ordinary `return` and for the `_Unwind_*`/jump-as-return heuristic.
    fn resolve_return(
        &mut self,
        prev_segment_id: SegmentId,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
        log: &[Instruction],
    ) -> SegmentId {
        let search_start = self.segments[prev_segment_id as usize].parent();

        if let Some(caller) = self.innermost_matching_caller(search_start, resolved) {
            let new_id = self.push_segment(resolved, insn_id, 0, None);
            self.set_next_segment(caller, new_id);
            return new_id;
        }

        if self.innermost_caller_with_call_last(search_start, log).is_some() {
            log::trace!(
                "return at insn {} resolves to an uninstrumented context switch; \
                 starting a new back trace one level below segment {}",
                insn_id,
                prev_segment_id
            );
            let level = self.segments[prev_segment_id as usize].level() - 1;
            let new_id = self.push_segment(resolved, insn_id, level, None);
            self.segments[prev_segment_id as usize].set_parent(Some(new_id));
            return new_id;
        }

        // No call anywhere in prev's back trace: assume an initial,
        // untraced tail call and re-root the whole span beneath a new
        // synthetic caller.
        let mut topmost = prev_segment_id;
        while let Some(p) = self.segments[topmost as usize].parent() {
            topmost = p;
        }
        log::trace!(
            "return at insn {} has no traced caller anywhere in segment {}'s back trace; \
             treating as an initial untraced tail call and re-rooting under a synthetic caller",
            insn_id,
            topmost
        );
        let level = self.segments[topmost as usize].level() - 1;
        let new_id = self.push_segment(resolved, insn_id, level, None);
        self.fix_caller(topmost, new_id);
        new_id
    }

    fn innermost_matching_caller(
        &self,
        start: Option<SegmentId>,
        resolved: &ResolvedAddress,
    ) -> Option<SegmentId> {
        let mut cur = start;
        while let Some(id) = cur {
            if !self.switched(id, resolved) {
                return Some(id);
            }
            cur = self.segments[id as usize].parent();
        }
        None
    }

    fn innermost_caller_with_call_last(
        &self,
        start: Option<SegmentId>,
        log: &[Instruction],
    ) -> Option<SegmentId> {
        let mut cur = start;
        while let Some(id) = cur {
            let last = self.segments[id as usize].last();
            if log[last as usize].class() == InsnClass::Call {
                return Some(id);
            }
            cur = self.segments[id as usize].parent();
        }
        None
    }

    /// Reparent `callee` (and every segment in its `prev`/`next` span)
    /// under `caller`.
    fn fix_caller(&mut self, callee: SegmentId, caller: SegmentId) {
        self.segments[callee as usize].set_parent(Some(caller));

        let mut fprev = self.segments[callee as usize].prev();
        while let Some(p) = fprev {
            self.segments[p as usize].set_parent(Some(caller));
            fprev = self.segments[p as usize].prev();
        }

        let mut fnext = self.segments[callee as usize].next();
        while let Some(n) = fnext {
            self.segments[n as usize].set_parent(Some(caller));
            fnext = self.segments[n as usize].next();
        }
    }

    /// Link `next_segment` as `segment`'s continuation: same level, same
    /// parent, reciprocal `prev` link.
    fn set_next_segment(&mut self, segment: SegmentId, next_segment: SegmentId) {
        debug_assert!(self.segments[segment as usize].next().is_none());
        self.segments[segment as usize].set_next(Some(next_segment));
        let level = self.segments[segment as usize].level();
        let parent = self.segments[segment as usize].parent();
        self.segments[next_segment as usize].set_prev(Some(segment));
        self.segments[next_segment as usize].set_level(level);
        self.segments[next_segment as usize].set_parent(parent);
    }

    // -- segment construction ---------------------------------------------

    fn open_root(
        &mut self,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
    ) -> SegmentId {
        self.push_segment(resolved, insn_id, 0, None)
    }

    /// A call or tail-call: child of `parent_id`, one level deeper.
    fn append_child(
        &mut self,
        parent_id: SegmentId,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
    ) -> SegmentId {
        let level = self.segments[parent_id as usize].level() + 1;
        self.push_segment(resolved, insn_id, level, Some(parent_id))
    }

    fn extend_tail(
        &mut self,
        tail_id: SegmentId,
        insn_id: InsnId,
    ) -> SegmentId {
        self.segments[tail_id as usize].set_last(insn_id);
        tail_id
    }

    fn append_gap(&mut self, insn_id: InsnId) -> SegmentId {
        if let Some(tail) = self.segments.last_mut() {
            if tail.is_gap() {
                tail.set_last(insn_id);
                return tail.id();
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.segments.push(FunctionSegment::new_gap(id, insn_id));
        id
    }

    fn push_segment(
        &mut self,
        resolved: &ResolvedAddress,
        insn_id: InsnId,
        level: i32,
        parent: Option<SegmentId>,
    ) -> SegmentId {
        let id = self.next_id;
        self.next_id += 1;
        self.segments
            .push(FunctionSegment::new(id, resolved, insn_id, level, parent));
        id
    }
}

impl Default for CallTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
