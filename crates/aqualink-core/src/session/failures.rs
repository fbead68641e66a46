use std::collections::BTreeMap;

use crate::FailureSummary;
use crate::protocol::DecodeError;

/// Examples kept per failure id.
pub(crate) const MAX_EXAMPLES: usize = 3;

#[derive(Debug)]
struct FailureEntry {
    summary: &'static str,
    count: u64,
    examples: Vec<String>,
}

/// Groups decode failures by stable id.
#[derive(Debug, Default)]
pub(crate) struct FailureStore {
    by_id: BTreeMap<&'static str, FailureEntry>,
}

impl FailureStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, err: &DecodeError) {
        let entry = self.by_id.entry(err.id()).or_insert_with(|| FailureEntry {
            summary: err.summary(),
            count: 0,
            examples: Vec::new(),
        });
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES {
            entry.examples.push(err.to_string());
        }
    }

    pub(crate) fn extend<'a>(&mut self, errs: impl IntoIterator<Item = &'a DecodeError>) {
        for err in errs {
            self.push(err);
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.by_id.values().map(|entry| entry.count).sum()
    }

    /// Summaries sorted by id.
    pub(crate) fn into_summaries(self) -> Vec<FailureSummary> {
        self.by_id
            .into_iter()
            .map(|(id, entry)| FailureSummary {
                id: id.to_string(),
                message: entry.summary.to_string(),
                count: entry.count,
                examples: entry.examples,
            })
            .collect()
    }
}
