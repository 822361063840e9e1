/// Per-transaction access-log quotas: the runtime rejects any
/// transaction whose accrued `AccessLog` exceeds
/// either bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub max_reads: usize,
    pub max_writes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_reads: 256,
            max_writes: 64,
        }
    }
}
