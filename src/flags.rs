//! Process-wide tunables for the trace engine, read once at startup;
//! distinct from per-`start` trace options, which are request parameters
//! rather than process configuration.

lazy_static! {
    static ref ENGINE_CONFIG: EngineConfig = init_engine_config();
}

#[derive(Clone)]
pub struct EngineConfig {
    /// Hardware-implied clamp on a single trace's buffer size.
    pub max_trace_buffer_size: u64,
    /// Default `-c` count for `show-instr-log` when the flag is omitted.
    pub default_instr_log_count: u32,
}

impl EngineConfig {
    pub fn get() -> &'static EngineConfig {
        &ENGINE_CONFIG
    }
}

fn init_engine_config() -> EngineConfig {
    EngineConfig {
        max_trace_buffer_size: 128 * 1024 * 1024,
        default_instr_log_count: 10,
    }
}
