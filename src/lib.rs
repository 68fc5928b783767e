//! flowpick - Deterministic hash-sticky weighted backend selection
//!
//! This library expands a list of weighted backends into an immutable lookup
//! sequence and maps externally computed flow hashes onto it, so a given flow
//! always resolves to the same backend while aggregate traffic follows the
//! configured weights.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod handle;
pub mod metrics;
pub mod selector;
pub mod simulate;
pub mod telemetry;

pub use backend::Backend;
pub use flow::{FlowHasher, FlowKey, SeededFlowHasher};
pub use handle::SelectorHandle;
pub use selector::WeightedSelector;
