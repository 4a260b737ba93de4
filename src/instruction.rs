//! A single decoded instruction, or one decode-gap marker.
//!
//! Identity is the dense index into the owning thread's instruction log;
//! ids are assigned in append order by the decoder and never reused.

use crate::function_segment::SegmentId;
use arrayvec::ArrayVec;

pub type InsnId = u32;

/// libipt's instruction classification, plus `Error` for a decode gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsnClass {
    Call,
    Return,
    Jump,
    Other,
    Error,
}

/// An assembly instruction as the PT decoder observed it, or a gap marker
/// standing in for a span the decoder could not resolve.
///
/// Invariant: `error_code != 0` implies `class == InsnClass::Error` and
/// `address` carries no meaning; a non-error instruction always has a
/// valid `address`.
#[derive(Debug, Clone)]
pub struct Instruction {
    id: InsnId,
    address: u64,
    raw: ArrayVec<[u8; 15]>,
    class: InsnClass,
    speculative: bool,
    error_code: i32,
    segment: Option<SegmentId>,
}

impl Instruction {
    pub fn decoded(
        id: InsnId,
        address: u64,
        raw: ArrayVec<[u8; 15]>,
        class: InsnClass,
        speculative: bool,
    ) -> Self {
        debug_assert_ne!(class, InsnClass::Error);
        Instruction {
            id,
            address,
            raw,
            class,
            speculative,
            error_code: 0,
            segment: None,
        }
    }

    /// A decode-gap instruction: no valid address, carries the libipt
    /// error code that produced it.
    pub fn gap(id: InsnId, error_code: i32) -> Self {
        debug_assert_ne!(error_code, 0);
        Instruction {
            id,
            address: 0,
            raw: ArrayVec::new(),
            class: InsnClass::Error,
            speculative: false,
            error_code,
            segment: None,
        }
    }

    pub fn id(&self) -> InsnId {
        self.id
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn class(&self) -> InsnClass {
        self.class
    }

    pub fn speculative(&self) -> bool {
        self.speculative
    }

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn is_error(&self) -> bool {
        self.error_code != 0
    }

    pub fn size(&self) -> u64 {
        self.raw.len() as u64
    }

    pub fn segment(&self) -> Option<SegmentId> {
        self.segment
    }

    pub fn set_segment(&mut self, segment: SegmentId) {
        self.segment = Some(segment);
    }
}

pub type InstructionLog = Vec<Instruction>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_has_error_class_and_no_address() {
        let g = Instruction::gap(3, -1);
        assert!(g.is_error());
        assert_eq!(g.class(), InsnClass::Error);
    }

    #[test]
    fn decoded_is_not_an_error() {
        let i = Instruction::decoded(0, 0x1000, ArrayVec::new(), InsnClass::Other, false);
        assert!(!i.is_error());
        assert_eq!(i.error_code(), 0);
    }
}
