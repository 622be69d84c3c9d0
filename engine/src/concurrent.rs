//! Execution modes and the sharded relevance accumulator used by the
//! parallel ranking path.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::document::DocumentId;

/// Selects the sequential or fork-join parallel form of an operation.
/// Both forms produce identical results for the same inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

pub(crate) const SHARD_COUNT: usize = 16;

/// Relevance accumulator partitioned into independently locked shards keyed
/// by `id % SHARD_COUNT`, merged into one plain map after the parallel
/// phase. Accumulation is commutative, so any interleaving serializes to
/// the same final state.
pub(crate) struct ShardedAccumulator {
    shards: Vec<Mutex<HashMap<DocumentId, f64>>>,
}

impl ShardedAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    pub(crate) fn add(&self, id: DocumentId, delta: f64) {
        let shard = id.unsigned_abs() as usize % SHARD_COUNT;
        *self.shards[shard].lock().entry(id).or_insert(0.0) += delta;
    }

    pub(crate) fn into_map(self) -> HashMap<DocumentId, f64> {
        let mut merged = HashMap::new();
        for shard in self.shards {
            merged.extend(shard.into_inner());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn accumulates_across_shards() {
        let acc = ShardedAccumulator::new();
        acc.add(0, 1.0);
        acc.add(16, 2.0); // same shard as id 0
        acc.add(3, 0.5);
        acc.add(3, 0.5);
        let merged = acc.into_map();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[&0], 1.0);
        assert_eq!(merged[&16], 2.0);
        assert_eq!(merged[&3], 1.0);
    }

    #[test]
    fn parallel_adds_merge_to_the_sequential_total() {
        let acc = ShardedAccumulator::new();
        (0..1000).into_par_iter().for_each(|i| acc.add(i % 7, 1.0));
        let merged = acc.into_map();
        let total: f64 = merged.values().sum();
        assert_eq!(total, 1000.0);
        assert_eq!(merged.len(), 7);
    }
}
