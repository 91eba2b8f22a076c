use serde::{Deserialize, Serialize};

use crate::models::ChangeRecord;

/// All change records of one run, in source-configuration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    records: Vec<ChangeRecord>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenates per-source change lists without reordering them.
    pub fn aggregate<I>(per_source: I) -> Self
    where
        I: IntoIterator<Item = Vec<ChangeRecord>>,
    {
        let mut report = Self::new();
        for records in per_source {
            report.extend_source(records);
        }
        report
    }

    pub fn extend_source(&mut self, records: Vec<ChangeRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Runs of consecutive records sharing a source name.
    pub fn by_source(&self) -> impl Iterator<Item = (&str, &[ChangeRecord])> {
        self.records
            .chunk_by(|a, b| a.source == b.source)
            .map(|group| (group[0].source.as_str(), group))
    }
}
