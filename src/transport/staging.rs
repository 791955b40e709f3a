//! Two-phase staging of deferred operations: stage now, flush once.

use crate::transport::VarId;
use bytes::Bytes;

/// Puts staged against declared variables, waiting for a flush.
#[derive(Debug, Default)]
pub struct PutBatch {
    staged: Vec<(VarId, Bytes)>,
}

impl PutBatch {
    pub fn stage(&mut self, var: VarId, data: Bytes) {
        self.staged.push((var, data));
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Total staged payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.staged.iter().map(|(_, b)| b.len()).sum()
    }

    /// Hand the staged puts over for a flush, leaving the batch empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, (VarId, Bytes)> {
        self.staged.drain(..)
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }
}

/// Claim on the result of one deferred get.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct GetTicket(pub(crate) usize);

/// Results of one flush of deferred gets, claimed by ticket.
#[derive(Debug, Default)]
pub struct GetBatch {
    results: Vec<Option<Bytes>>,
}

impl GetBatch {
    pub(crate) fn new(results: Vec<Bytes>) -> Self {
        Self {
            results: results.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Take the bytes a ticket refers to; each ticket can be claimed once.
    pub fn take(&mut self, ticket: GetTicket) -> Option<Bytes> {
        self.results.get_mut(ticket.0).and_then(Option::take)
    }
}
