//! Drives libipt's instruction-level decoder against a thread's raw PT
//! buffer and image sections.
//!
//! Mirrors the allocate/sync/next loop of `libipt`'s block decoder, but at
//! instruction granularity: each `decoder.next()` call yields exactly one
//! `pt_insn`, which we translate into our own [`Instruction`] and feed to
//! the [`CallTreeBuilder`] as we go, rather than buffering the whole log
//! before building the tree.

use crate::call_tree_builder::CallTreeBuilder;
use crate::cpu::CpuDescriptor;
use crate::error::{PtError, PtResult};
use crate::function_segment::FunctionSegment;
use crate::host::{DebuggerHost, ProcessId, ResolvedAddress, Section};
use crate::instruction::{InsnClass, Instruction, InstructionLog};

use arrayvec::ArrayVec;
use libipt::config::Config;
use libipt::image::Image;
use libipt::insn::InsnDecoder;

/// Runs one full decode pass over a raw trace buffer, producing the frozen
/// instruction log and segment list a [`crate::thread_trace::ThreadTrace`]
/// is built from.
pub struct Decoder;

impl Decoder {
    /// Decode `raw_trace` against `sections`, resolving each instruction's
    /// address through `host` as it is appended.
    ///
    /// A configuration failure (no sections, allocator failure) is fatal
    /// and returned as [`PtError::DecodeFatal`]; per-record decode errors
    /// become gap instructions instead.
    pub fn decode(
        raw_trace: &[u8],
        sections: &[Section],
        cpu: CpuDescriptor,
        host: &dyn DebuggerHost,
        pid: ProcessId,
    ) -> PtResult<(InstructionLog, Vec<FunctionSegment>)> {
        if sections.is_empty() {
            return Err(PtError::DecodeFatal("no executable sections registered".into()));
        }
        if raw_trace.is_empty() {
            return Err(PtError::DecodeFatal("empty trace buffer".into()));
        }

        let mut config = Config::new(raw_trace);
        config.cpu = pt_cpu_from(cpu);

        let mut image = Image::new(None)
            .map_err(|e| PtError::DecodeFatal(format!("failed to allocate image: {:?}", e)))?;
        for section in sections {
            image
                .add_file(&section.image_path, section.file_offset, section.size, None, section.load_address)
                .map_err(|e| {
                    PtError::DecodeFatal(format!(
                        "failed to map {} at {:#x}: {:?}",
                        section.image_path, section.load_address, e
                    ))
                })?;
        }

        let mut decoder = InsnDecoder::new(&config)
            .map_err(|e| PtError::DecodeFatal(format!("failed to allocate decoder: {:?}", e)))?;
        decoder
            .set_image(Some(&mut image))
            .map_err(|e| PtError::DecodeFatal(format!("failed to bind image: {:?}", e)))?;

        let mut log = InstructionLog::new();
        let mut builder = CallTreeBuilder::new();
        let mut next_id: u32 = 0;

        loop {
            match decoder.sync_forward() {
                Ok(_) => {}
                Err(e) if is_eos(&e) => break,
                Err(e) => {
                    // Could not find another sync point; nothing more to decode.
                    log::debug!("pt sync_forward failed: {:?}", e);
                    break;
                }
            }

            'segment: loop {
                loop {
                    match decoder.event() {
                        Ok(_) => continue,
                        Err(_) => break,
                    }
                }

                match decoder.next() {
                    Ok((insn, _status)) => {
                        let class = classify(&insn);
                        let raw = raw_bytes(&insn);
                        let address = insn.ip;
                        let id = next_id;
                        next_id += 1;
                        let resolved = host.resolve_address(pid, address).unwrap_or_default();
                        let instruction = Instruction::decoded(
                            id,
                            address,
                            raw,
                            class,
                            insn.speculative != 0,
                        );
                        log.push(instruction);
                        builder.append(&log, log.len() - 1, &resolved);
                    }
                    Err(e) if is_eos(&e) => break 'segment,
                    Err(e) => {
                        let id = next_id;
                        next_id += 1;
                        let error_code = libipt_error_code(&e);
                        log::debug!(
                            "pt decode error at insn {}: {:?} (code {}); recording a gap",
                            id,
                            e,
                            error_code
                        );
                        log.push(Instruction::gap(id, error_code));
                        let noop = ResolvedAddress::default();
                        builder.append(&log, log.len() - 1, &noop);
                        // A hard error leaves the decoder out of sync; break
                        // out to resynchronize at the next PSB.
                        break 'segment;
                    }
                }
            }
        }

        let segments = builder.finalize();
        Ok((log, segments))
    }
}

// Far call/return/jump and conditional jumps never open or close a
// call-tree segment; they fall through to `Other` along with every other
// intra-function instruction.
fn classify(insn: &libipt::insn::Insn) -> InsnClass {
    use libipt_sys::pt_insn_class::*;
    match insn.iclass {
        ptic_call => InsnClass::Call,
        ptic_return => InsnClass::Return,
        ptic_jump => InsnClass::Jump,
        _ => InsnClass::Other,
    }
}

fn raw_bytes(insn: &libipt::insn::Insn) -> ArrayVec<[u8; 15]> {
    let mut v = ArrayVec::new();
    let len = (insn.size as usize).min(15);
    for b in insn.raw[..len].iter() {
        v.push(*b);
    }
    v
}

fn pt_cpu_from(cpu: CpuDescriptor) -> libipt_sys::pt_cpu {
    libipt_sys::pt_cpu {
        vendor: match cpu.vendor {
            crate::cpu::CpuVendor::Intel => libipt_sys::pt_cpu_vendor::pcv_intel,
            crate::cpu::CpuVendor::Unknown => libipt_sys::pt_cpu_vendor::pcv_unknown,
        },
        family: cpu.family,
        model: cpu.model,
        stepping: cpu.stepping,
    }
}

fn is_eos(err: &libipt::error::PtError) -> bool {
    matches!(err.code(), libipt_sys::pt_error_code::pte_eos)
}

fn libipt_error_code(err: &libipt::error::PtError) -> i32 {
    err.code() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_fails_fast_with_no_sections() {
        struct Unused;
        impl DebuggerHost for Unused {
            fn debugger_id(&self) -> crate::host::DebuggerId {
                unreachable!()
            }
            fn current_process(&self) -> PtResult<ProcessId> {
                unreachable!()
            }
            fn process_state(&self, _pid: ProcessId) -> PtResult<crate::host::ProcessState> {
                unreachable!()
            }
            fn thread_ids(&self, _pid: ProcessId) -> PtResult<Vec<crate::host::ThreadId>> {
                unreachable!()
            }
            fn stop_id(&self, _pid: ProcessId, _tid: crate::host::ThreadId) -> PtResult<u64> {
                unreachable!()
            }
            fn read_execute_sections(&self, _pid: ProcessId) -> PtResult<Vec<Section>> {
                unreachable!()
            }
            fn resolve_address(&self, _pid: ProcessId, _addr: u64) -> PtResult<ResolvedAddress> {
                unreachable!()
            }
            fn breakpoint_addresses(
                &self,
                _pid: ProcessId,
            ) -> PtResult<std::collections::HashSet<u64>> {
                unreachable!()
            }
            fn line_entry_at(
                &self,
                _pid: ProcessId,
                _addr: u64,
            ) -> PtResult<Option<crate::host::LineRange>> {
                unreachable!()
            }
            fn start_trace(
                &self,
                _req: crate::host::StartTraceRequest,
            ) -> PtResult<crate::host::TraceHandle> {
                unreachable!()
            }
            fn stop_trace(&self, _handle: crate::host::TraceHandle) -> PtResult<()> {
                unreachable!()
            }
            fn read_raw_trace(&self, _handle: crate::host::TraceHandle) -> PtResult<Vec<u8>> {
                unreachable!()
            }
            fn read_cpu_info(
                &self,
                _handle: crate::host::TraceHandle,
            ) -> PtResult<CpuDescriptor> {
                unreachable!()
            }
        }

        let cpu = CpuDescriptor {
            vendor: crate::cpu::CpuVendor::Intel,
            family: 6,
            model: 1,
            stepping: 1,
        };
        let result = Decoder::decode(&[1, 2, 3], &[], cpu, &Unused, 1);
        assert!(matches!(result, Err(PtError::DecodeFatal(_))));
    }
}
