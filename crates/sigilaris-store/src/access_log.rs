use std::collections::{HashMap, HashSet};

/// Reads and writes accrued while running a single store effect, grouped by
/// table prefix with the full `tablePrefix ‖ encodeKey(K)` bytes as set
/// members. Duplicate accesses coalesce — touching the same key twice
/// within one transaction counts once toward quotas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessLog {
    reads: HashMap<Vec<u8>, HashSet<Vec<u8>>>,
    writes: HashMap<Vec<u8>, HashSet<Vec<u8>>>,
}

impl AccessLog {
    pub fn new() -> Self {
        AccessLog::default()
    }

    pub fn record_read(&mut self, table_prefix: &[u8], full_key: &[u8]) {
        self.reads
            .entry(table_prefix.to_vec())
            .or_default()
            .insert(full_key.to_vec());
    }

    pub fn record_write(&mut self, table_prefix: &[u8], full_key: &[u8]) {
        self.writes
            .entry(table_prefix.to_vec())
            .or_default()
            .insert(full_key.to_vec());
    }

    pub fn reads(&self) -> &HashMap<Vec<u8>, HashSet<Vec<u8>>> {
        &self.reads
    }

    pub fn writes(&self) -> &HashMap<Vec<u8>, HashSet<Vec<u8>>> {
        &self.writes
    }

    pub fn read_count(&self) -> usize {
        self.reads.values().map(HashSet::len).sum()
    }

    pub fn write_count(&self) -> usize {
        self.writes.values().map(HashSet::len).sum()
    }

    /// True iff any `(tablePrefix, key)` appears in
    /// `self.writes ∩ other.writes`, `self.reads ∩ other.writes`, or
    /// `self.writes ∩ other.reads`. Two read-only logs never conflict.
    pub fn conflicts_with(&self, other: &AccessLog) -> bool {
        sets_intersect(&self.writes, &other.writes)
            || sets_intersect(&self.reads, &other.writes)
            || sets_intersect(&self.writes, &other.reads)
    }

    pub fn exceeds_limits(&self, max_reads: usize, max_writes: usize) -> bool {
        self.read_count() > max_reads || self.write_count() > max_writes
    }
}

fn sets_intersect(a: &HashMap<Vec<u8>, HashSet<Vec<u8>>>, b: &HashMap<Vec<u8>, HashSet<Vec<u8>>>) -> bool {
    for (prefix, a_keys) in a {
        if let Some(b_keys) = b.get(prefix) {
            if a_keys.intersection(b_keys).next().is_some() {
                return true;
            }
        }
    }
    false
}
