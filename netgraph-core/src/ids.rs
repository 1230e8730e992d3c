//! Stable identifier generation (§6.4) and the flow identity type used on working-graph
//! edges (§3 Data Model, "Flow").

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// 22 ASCII characters from `[A-Za-z0-9_-]`: URL-safe base64 of a v4 UUID's 16 bytes,
/// trailing `=` padding stripped.
fn short_uuid() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Bit-exact link identifier: `{source}|{target}|<22-char base64 uuid>`.
pub fn make_link_id(source: &str, target: &str) -> String {
    format!("{source}|{target}|{}", short_uuid())
}

/// Edge key used by [`crate::graph::StrictMultiDiGraph`] when the caller does not supply
/// one explicitly.
pub fn make_edge_key() -> String {
    short_uuid()
}

/// Derives a deterministic 64-bit child seed (§5) from a master seed and a tuple of
/// string components (e.g. `("failure_policy", policy_name, iteration_index)`):
/// SHA-256 over the master seed's little-endian bytes followed by each component,
/// truncated to its first 8 bytes.
pub fn derive_child_seed(master_seed: u64, components: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_le_bytes());
    for component in components {
        hasher.update(component.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[..8].try_into().expect("sha256 digest is 32 bytes"))
}

/// Identifies a single flow placed by the Flow-Policy Layer: a demand's (src, dst,
/// class) plus a monotonic id distinguishing multiple flows of the same demand
/// (e.g. one per LSP in a TE policy).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowIndex {
    pub src: String,
    pub dst: String,
    pub flow_class: i64,
    pub id: u64,
}

impl FlowIndex {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, flow_class: i64, id: u64) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            flow_class,
            id,
        }
    }
}

impl std::fmt::Display for FlowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}:{}#{}", self.src, self.dst, self.flow_class, self.id)
    }
}

/// Process-wide monotonic counter backing the SPF heap tie-breaker (§4.2.2) and any
/// other place that needs a deterministic-within-a-run, strictly increasing sequence.
///
/// Each [`Sequence`] instance is independent; callers that need determinism across
/// repeated runs construct a fresh `Sequence` per call rather than sharing one
/// globally (see `design note` in `netgraph-algo::path::spf`).
#[derive(Debug, Default)]
pub struct Sequence(AtomicU64);

impl Sequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
