//! CPU descriptor used to configure the PT decoder (the `pt_cpu` equivalent
//! of a CPU identification struct). A small `Copy` machine-state struct,
//! rather than reaching into the kernel ABI bindings for every field.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuVendor {
    Intel,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuDescriptor {
    pub vendor: CpuVendor,
    pub family: u16,
    pub model: u8,
    pub stepping: u8,
}

impl CpuDescriptor {
    /// Read the descriptor for the CPU this process is currently running
    /// on, via `raw_cpuid`. Used when the host doesn't snapshot a foreign
    /// CPU descriptor (e.g. local-process tracing).
    pub fn native() -> Self {
        let cpuid = raw_cpuid::CpuId::new();
        let vendor = match cpuid.get_vendor_info() {
            Some(v) if v.as_str() == "GenuineIntel" => CpuVendor::Intel,
            _ => CpuVendor::Unknown,
        };
        let (family, model, stepping) = cpuid
            .get_feature_info()
            .map(|f| {
                (
                    f.family_id() as u16,
                    f.model_id(),
                    f.stepping_id(),
                )
            })
            .unwrap_or((0, 0, 0));
        CpuDescriptor {
            vendor,
            family,
            model,
            stepping,
        }
    }
}
