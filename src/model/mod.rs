use chrono::{DateTime, Utc};

pub mod processor;

pub use curbviz::model::{Area, Zone, ZoneTable};

/// Counters collected while reading one record stream
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Records that deserialized and were handed on
    pub records: usize,

    /// Records that failed to deserialize and were skipped
    pub malformed: usize,

    /// Zone ids seen more than once; the later record wins
    pub duplicates: usize,

    /// Referenced zone ids missing from the zone table
    pub unresolved_references: usize,

    /// Most recent `last_updated_date` among the records
    pub newest_update: Option<DateTime<Utc>>,
}

impl StreamStats {
    pub fn observe_update(&mut self, updated: Option<DateTime<Utc>>) {
        if let Some(updated) = updated {
            if self.newest_update.is_none_or(|newest| updated > newest) {
                self.newest_update = Some(updated);
            }
        }
    }
}
