//! Wire formats for snapshot trees
//!
//! The snapshot tree is format-agnostic; a [`WireFormat`] turns it into bytes and
//! back. [`JsonFormat`] is the reference format: a versioned envelope carrying a
//! BLAKE3 digest of the canonical snapshot so corrupted payloads are rejected
//! instead of half-restored.

use crate::error::PersistError;
use crate::pm::description::PmDescription;
use crate::state::snapshot::PmSnapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current envelope version. Snapshots written with another version are rejected.
pub const SNAPSHOT_VERSION: u32 = 1;

pub trait WireFormat {
    fn encode<D: PmDescription>(&self, snapshot: &PmSnapshot<D>) -> Result<Vec<u8>, PersistError>;
    fn decode<D: PmDescription>(&self, bytes: &[u8]) -> Result<PmSnapshot<D>, PersistError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(default)]
    saved_at: Option<String>,
    digest: String,
    snapshot: Value,
}

/// JSON envelope format
#[derive(Debug, Clone, Copy)]
pub struct JsonFormat {
    /// Pretty-print the output
    pub pretty: bool,
    /// Reject payloads whose digest does not match their content
    pub verify_digest: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self {
            pretty: false,
            verify_digest: true,
        }
    }
}

impl JsonFormat {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

/// Hex BLAKE3 digest of the canonical (sorted-key, compact) JSON form
fn digest_of(snapshot: &Value) -> Result<String, PersistError> {
    let canonical =
        serde_json::to_vec(snapshot).map_err(|e| PersistError::Encode(e.to_string()))?;
    Ok(hex::encode(blake3::hash(&canonical).as_bytes()))
}

impl WireFormat for JsonFormat {
    fn encode<D: PmDescription>(&self, snapshot: &PmSnapshot<D>) -> Result<Vec<u8>, PersistError> {
        let snapshot =
            serde_json::to_value(snapshot).map_err(|e| PersistError::Encode(e.to_string()))?;
        let envelope = Envelope {
            version: SNAPSHOT_VERSION,
            saved_at: Some(Utc::now().to_rfc3339()),
            digest: digest_of(&snapshot)?,
            snapshot,
        };

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&envelope)
        } else {
            serde_json::to_vec(&envelope)
        };
        bytes.map_err(|e| PersistError::Encode(e.to_string()))
    }

    fn decode<D: PmDescription>(&self, bytes: &[u8]) -> Result<PmSnapshot<D>, PersistError> {
        let envelope: Envelope =
            serde_json::from_slice(bytes).map_err(|e| PersistError::Decode(e.to_string()))?;

        if envelope.version != SNAPSHOT_VERSION {
            return Err(PersistError::IncompatibleVersion {
                expected: SNAPSHOT_VERSION,
                found: envelope.version,
            });
        }

        if self.verify_digest {
            let actual = digest_of(&envelope.snapshot)?;
            if actual != envelope.digest {
                return Err(PersistError::DigestMismatch {
                    expected: envelope.digest,
                    actual,
                });
            }
        }

        serde_json::from_value(envelope.snapshot).map_err(|e| PersistError::Decode(e.to_string()))
    }
}
