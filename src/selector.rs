//! Hash-sticky weighted backend selection
//!
//! A [`WeightedSelector`] expands each enabled backend into `weight`
//! contiguous slots of a lookup sequence, then maps a flow hash onto that
//! sequence with `hash % len`. The sequence is built once and never changes,
//! so lookups are plain reads and the same hash always lands on the same
//! backend for the lifetime of the selector.
//!
//! Backend blocks are concatenated in input order, not interleaved: with
//! weights `1, 2, 3` the sequence is `[A, B, B, C, C, C]`. Proportional
//! traffic therefore relies on the caller supplying well-dispersed hashes
//! (see [`crate::flow`]).

use crate::backend::Backend;
use std::ops::Range;
use std::sync::Arc;

/// Immutable weighted lookup table over a set of backends
///
/// Built once per configuration snapshot. There are no mutating operations;
/// reconfiguration means building a new selector and swapping it in
/// (see [`crate::handle::SelectorHandle`]).
#[derive(Debug, Clone, Default)]
pub struct WeightedSelector {
    sequence: Vec<Arc<Backend>>,
    /// Index range of each enabled input entry, in input order
    blocks: Vec<Range<usize>>,
}

/// One backend's contiguous run inside the expanded sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    pub backend: &'a Arc<Backend>,
    /// Half-open range of sequence indices owned by this backend
    pub range: Range<usize>,
}

impl Block<'_> {
    /// Number of slots (equal to the backend's weight)
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Always false: disabled backends never get a block
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl WeightedSelector {
    /// Build a selector from an ordered list of backends
    ///
    /// Each backend with `weight > 0` contributes `weight` consecutive
    /// references to the sequence. Backends with `weight <= 0` are skipped;
    /// that is a valid way to drain a backend, not an error.
    ///
    /// Construction returns no error. An empty or fully disabled input produces a
    /// selector whose [`select`](Self::select) always returns `None`.
    ///
    /// # Memory
    ///
    /// The sequence holds one `Arc` per unit of weight, so memory is
    /// proportional to the sum of positive weights. Callers must bound that
    /// sum the way configuration loading does (see
    /// [`crate::config::MAX_TOTAL_WEIGHT`]).
    ///
    /// # Panics
    ///
    /// Panics with `capacity overflow` if the sum of positive weights cannot
    /// be allocated as a sequence, e.g. a single weight near `i64::MAX`.
    pub fn new(backends: &[Arc<Backend>]) -> Self {
        let capacity = backends
            .iter()
            .map(|backend| slot_count(backend))
            .fold(0usize, usize::saturating_add);

        let mut sequence = Vec::with_capacity(capacity);
        let mut blocks = Vec::new();

        for (position, backend) in backends.iter().enumerate() {
            if !backend.is_enabled() {
                tracing::debug!(
                    backend = %backend.name(),
                    weight = backend.weight(),
                    position,
                    "Skipping disabled backend (weight <= 0)"
                );
                continue;
            }

            let start = sequence.len();
            sequence.extend(std::iter::repeat_n(
                Arc::clone(backend),
                slot_count(backend),
            ));
            blocks.push(start..sequence.len());
        }

        if sequence.is_empty() {
            tracing::warn!(
                configured_backends = backends.len(),
                "No backend has a positive weight - every selection will return none"
            );
        } else {
            tracing::debug!(
                configured_backends = backends.len(),
                eligible_backends = blocks.len(),
                sequence_length = sequence.len(),
                "Built weighted selection sequence"
            );
        }

        Self { sequence, blocks }
    }

    /// Build a selector that owns the given backends
    pub fn from_backends(backends: impl IntoIterator<Item = Backend>) -> Self {
        let backends: Vec<Arc<Backend>> = backends.into_iter().map(Arc::new).collect();
        Self::new(&backends)
    }

    /// Select the backend for a flow hash
    ///
    /// Returns `sequence[hash % len]`, or `None` when no backend is eligible.
    /// This is a pure lookup: repeated calls with the same hash return the
    /// same backend, and `select(h) == select(h + k * len)` for any `k`.
    pub fn select(&self, hash: u64) -> Option<&Arc<Backend>> {
        let len = self.sequence.len() as u64;
        if len == 0 {
            return None;
        }

        let index = (hash % len) as usize;
        self.sequence.get(index)
    }

    /// Select the backend for a signed hash
    ///
    /// Negative hashes are normalized with the Euclidean remainder, so the
    /// index is always in range and periodicity holds across zero:
    /// `select_signed(-1)` is the last slot of the sequence. For `hash >= 0`
    /// this agrees with [`select`](Self::select).
    pub fn select_signed(&self, hash: i64) -> Option<&Arc<Backend>> {
        if self.sequence.is_empty() {
            return None;
        }

        let len = i128::try_from(self.sequence.len()).ok()?;
        let index = usize::try_from(i128::from(hash).rem_euclid(len)).ok()?;
        self.sequence.get(index)
    }

    /// Length of the expanded sequence (sum of positive weights)
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// True when no backend is eligible
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Sum of all positive weights
    pub fn total_weight(&self) -> u64 {
        self.sequence.len() as u64
    }

    /// Enabled backends, one per enabled input entry, in block order
    pub fn eligible_backends(&self) -> impl Iterator<Item = &Arc<Backend>> + '_ {
        self.blocks.iter().map(|range| &self.sequence[range.start])
    }

    /// Contiguous blocks of the sequence, in input order
    pub fn blocks(&self) -> impl Iterator<Item = Block<'_>> + '_ {
        self.blocks.iter().map(|range| Block {
            backend: &self.sequence[range.start],
            range: range.clone(),
        })
    }
}

/// Number of sequence slots a backend occupies
fn slot_count(backend: &Backend) -> usize {
    if backend.is_enabled() {
        usize::try_from(backend.weight()).unwrap_or(usize::MAX)
    } else {
        0
    }
}
