//! Grouping records into upserts that fit the store's payload limit.

use super::UpsertRecord;

/// Records sent in one upsert call.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadBatch {
    pub records: Vec<UpsertRecord>,
    /// Sum of the records' estimated sizes.
    pub estimated_bytes: usize,
}

/// Greedy batcher driven by an estimated serialized size.
///
/// The estimate is `values * bytes_per_number + metadata JSON + id`, which is
/// an approximation of the wire size; callers keep a margin below the hard
/// limit.
#[derive(Debug, Clone)]
pub struct PayloadBatcher {
    max_bytes: usize,
    bytes_per_number: usize,
}

impl PayloadBatcher {
    pub fn new(max_bytes: usize, bytes_per_number: usize) -> Self {
        Self {
            max_bytes,
            bytes_per_number,
        }
    }

    /// Estimated serialized size of one record.
    pub fn estimate(&self, record: &UpsertRecord) -> usize {
        let values = record.values.len() * self.bytes_per_number;
        let metadata = record
            .metadata
            .as_ref()
            .and_then(|m| serde_json::to_string(m).ok())
            .map(|json| json.len())
            .unwrap_or(0);
        values + metadata + record.id.len()
    }

    /// Split records into ordered batches.
    ///
    /// A record that alone exceeds the limit is emitted as a batch of one.
    pub fn batch(&self, records: Vec<UpsertRecord>) -> Vec<PayloadBatch> {
        let mut batches = Vec::new();
        let mut current: Vec<UpsertRecord> = Vec::new();
        let mut current_bytes = 0usize;

        for record in records {
            let size = self.estimate(&record);

            if !current.is_empty() && current_bytes + size > self.max_bytes {
                batches.push(PayloadBatch {
                    records: std::mem::take(&mut current),
                    estimated_bytes: current_bytes,
                });
                current_bytes = 0;
            }

            current.push(record);
            current_bytes += size;
        }

        if !current.is_empty() {
            batches.push(PayloadBatch {
                records: current,
                estimated_bytes: current_bytes,
            });
        }

        batches
    }
}
