//! Ordered history of accepted readings and the aggregated view pushed to
//! subscribers.

use crate::telemetry::signature::Signature;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Full state pushed to every subscriber after each accepted reading.
///
/// The complete history is retransmitted on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSnapshot<'a> {
    /// Every accepted reading in arrival order
    pub signatures: Cow<'a, [Signature]>,
    /// Reading at the middle temperature rank
    pub median_signature: Signature,
}

/// Append-only history of accepted readings.
///
/// Entries are kept in arrival order, not timestamp order, and are never
/// evicted.
#[derive(Debug, Default)]
pub struct SignatureStore {
    history: Vec<Signature>,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading at the end of the history.
    pub fn append(&mut self, signature: Signature) {
        self.history.push(signature);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Borrow the ordered history.
    pub fn history(&self) -> &[Signature] {
        &self.history
    }

    /// Owned copy of the ordered history.
    pub fn snapshot_all(&self) -> Vec<Signature> {
        self.history.clone()
    }

    /// The reading at rank `len / 2` in ascending temperature order.
    ///
    /// Equal temperatures keep their arrival order. An empty history yields
    /// [`Signature::empty`].
    pub fn current_median(&self) -> Signature {
        if self.history.is_empty() {
            return Signature::empty();
        }

        let mut ranked: Vec<&Signature> = self.history.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
        ranked[ranked.len() / 2].clone()
    }

    /// Borrowing view of the history plus the current median.
    pub fn aggregated_snapshot(&self) -> AggregatedSnapshot<'_> {
        AggregatedSnapshot {
            signatures: Cow::Borrowed(self.history.as_slice()),
            median_signature: self.current_median(),
        }
    }
}
