//! Persisted binding state

use serde::{Deserialize, Serialize};

/// What survives a restart
///
/// Stored as an opaque blob by the settings backend. Names that no longer
/// exist when the state is applied are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// `(source name, PTZ name)` pairs
    pub sources: Vec<(String, String)>,
    /// Source name bound to each camera slot, by slot index
    pub cameras: Vec<String>,
}
