//! A contiguous run of instructions executed inside one function
//! activation.
//!
//! Segments live in a single arena (`Vec<FunctionSegment>` owned by the
//! `ThreadTrace`) and `parent`/`prev`/`next` are plain indices rather than
//! `Rc`/`Weak` pointers; this sidesteps strong/weak bookkeeping while
//! preserving the same observable tree shape.

use crate::host::{FunctionHandle, SymbolHandle};
use crate::instruction::InsnId;

pub type SegmentId = u32;

#[derive(Debug, Clone)]
pub struct FunctionSegment {
    id: SegmentId,
    function: Option<FunctionHandle>,
    function_name: Option<String>,
    function_start: Option<u64>,
    symbol: Option<SymbolHandle>,
    symbol_name: Option<String>,
    first: InsnId,
    last: InsnId,
    level: i32,
    is_gap: bool,
    parent: Option<SegmentId>,
    prev: Option<SegmentId>,
    next: Option<SegmentId>,
}

impl FunctionSegment {
    pub(crate) fn new_gap(id: SegmentId, insn: InsnId) -> Self {
        FunctionSegment {
            id,
            function: None,
            function_name: None,
            function_start: None,
            symbol: None,
            symbol_name: None,
            first: insn,
            last: insn,
            level: 0,
            is_gap: true,
            parent: None,
            prev: None,
            next: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SegmentId,
        resolved: &crate::host::ResolvedAddress,
        insn: InsnId,
        level: i32,
        parent: Option<SegmentId>,
    ) -> Self {
        FunctionSegment {
            id,
            function: resolved.function,
            function_name: resolved.function_name.clone(),
            function_start: resolved.function_start,
            symbol: resolved.symbol,
            symbol_name: resolved.symbol_name.clone(),
            first: insn,
            last: insn,
            level,
            is_gap: false,
            parent,
            prev: None,
            next: None,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn is_gap(&self) -> bool {
        self.is_gap
    }

    pub fn first(&self) -> InsnId {
        self.first
    }

    pub fn last(&self) -> InsnId {
        self.last
    }

    pub(crate) fn set_last(&mut self, insn: InsnId) {
        self.last = insn;
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    pub fn parent(&self) -> Option<SegmentId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<SegmentId>) {
        self.parent = parent;
    }

    pub fn prev(&self) -> Option<SegmentId> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<SegmentId>) {
        self.prev = prev;
    }

    pub fn next(&self) -> Option<SegmentId> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<SegmentId>) {
        self.next = next;
    }

    pub fn function(&self) -> Option<FunctionHandle> {
        self.function
    }

    pub fn function_start(&self) -> Option<u64> {
        self.function_start
    }

    pub fn symbol(&self) -> Option<SymbolHandle> {
        self.symbol
    }

    pub fn symbol_name(&self) -> Option<&str> {
        self.symbol_name.as_deref()
    }

    /// Display name: the function name if known, else a synthesized
    /// "gap" / "unknown" label, used by `show-function-call-history`.
    pub fn display_name(&self) -> &str {
        if self.is_gap {
            "<gap>"
        } else {
            self.function_name.as_deref().unwrap_or("<unknown>")
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }
}
