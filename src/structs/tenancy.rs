//! Tenancy scope of a replicated record

use serde::{Deserialize, Serialize};

/// Name of the partition and namespace every record lives in when no
/// other scope is given.
pub const DEFAULT_TENANCY_NAME: &str = "default";

fn default_name() -> String {
    DEFAULT_TENANCY_NAME.to_string()
}

/// Partition and namespace a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TenancyScope {
    #[serde(default = "default_name")]
    pub partition: String,
    #[serde(default = "default_name")]
    pub namespace: String,
}

impl TenancyScope {
    pub fn new(partition: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            namespace: namespace.into(),
        }
    }

    /// Whether this is the default partition and namespace.
    pub fn is_default(&self) -> bool {
        self.partition == DEFAULT_TENANCY_NAME && self.namespace == DEFAULT_TENANCY_NAME
    }
}

impl Default for TenancyScope {
    fn default() -> Self {
        Self::new(DEFAULT_TENANCY_NAME, DEFAULT_TENANCY_NAME)
    }
}
