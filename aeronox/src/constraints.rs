//! Reference-counted edit/delete blocks.
//!
//! Queued and running jobs block the entities they read so that editors
//! cannot remove or mutate data mid-run. Blocks are counted: the same entity
//! may be held by several queued jobs and is released only when every hold is
//! gone. `queue()` takes the blocks, `reset()` releases them.

use std::collections::HashMap;
use std::sync::Mutex;

fn with_counts<R>(counts: &Mutex<HashMap<String, usize>>, f: impl FnOnce(&mut HashMap<String, usize>) -> R) -> R {
    let mut guard = counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

#[derive(Debug, Default)]
struct BlockSet {
    counts: Mutex<HashMap<String, usize>>,
}

impl BlockSet {
    fn block(&self, name: &str) {
        with_counts(&self.counts, |counts| {
            *counts.entry(name.to_owned()).or_insert(0) += 1;
        });
    }

    fn unblock(&self, name: &str) {
        with_counts(&self.counts, |counts| {
            if let Some(count) = counts.get_mut(name) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(name);
                }
            }
        });
    }

    fn blocked(&self, name: &str) -> bool {
        with_counts(&self.counts, |counts| counts.contains_key(name))
    }
}

/// Blocks held per entity type.
#[derive(Debug, Default)]
pub struct Constraints {
    operations: BlockSet,
    noise_records: BlockSet,
    lto_engines: BlockSet,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_operation(&self, name: &str) {
        self.operations.block(name);
    }

    pub fn unblock_operation(&self, name: &str) {
        self.operations.unblock(name);
    }

    pub fn block_noise_record(&self, name: &str) {
        self.noise_records.block(name);
    }

    pub fn unblock_noise_record(&self, name: &str) {
        self.noise_records.unblock(name);
    }

    pub fn block_lto_engine(&self, name: &str) {
        self.lto_engines.block(name);
    }

    pub fn unblock_lto_engine(&self, name: &str) {
        self.lto_engines.unblock(name);
    }

    /// True while any job holds the operation.
    pub fn operation_blocked(&self, name: &str) -> bool {
        self.operations.blocked(name)
    }

    pub fn noise_record_blocked(&self, name: &str) -> bool {
        self.noise_records.blocked(name)
    }

    pub fn lto_engine_blocked(&self, name: &str) -> bool {
        self.lto_engines.blocked(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_counts_are_reference_counted() {
        let constraints = Constraints::new();
        constraints.block_operation("op-1");
        constraints.block_operation("op-1");
        assert!(constraints.operation_blocked("op-1"));

        constraints.unblock_operation("op-1");
        assert!(constraints.operation_blocked("op-1"));

        constraints.unblock_operation("op-1");
        assert!(!constraints.operation_blocked("op-1"));
    }

    #[test]
    fn test_unblock_unknown_is_harmless() {
        let constraints = Constraints::new();
        constraints.unblock_noise_record("missing");
        assert!(!constraints.noise_record_blocked("missing"));
    }

    #[test]
    fn test_entity_types_are_independent() {
        let constraints = Constraints::new();
        constraints.block_lto_engine("CFM56");
        assert!(constraints.lto_engine_blocked("CFM56"));
        assert!(!constraints.operation_blocked("CFM56"));
        assert!(!constraints.noise_record_blocked("CFM56"));
    }
}
