//! Selector configuration.
//!
//! ```yaml
//! disabled_kernels: [bucketize_ref]
//! forced_kernels:
//!   "bucketize:0": bucketize_ref
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::OpError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    /// Candidates never selected
    pub disabled_kernels: Vec<String>,
    /// Layer id → the only candidate considered for that layer
    pub forced_kernels: BTreeMap<String, String>,
}

impl SelectorConfig {
    pub fn from_yaml(src: &str) -> Result<Self, OpError> {
        serde_yaml::from_str(src).map_err(|e| OpError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, OpError> {
        let src = std::fs::read_to_string(path).map_err(|e| {
            OpError::InvalidConfig(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&src)
    }

    pub fn is_disabled(&self, kernel: &str) -> bool {
        self.disabled_kernels.iter().any(|k| k == kernel)
    }

    pub fn forced_for(&self, layer_id: &str) -> Option<&str> {
        self.forced_kernels.get(layer_id).map(String::as_str)
    }
}
