//! Apply operation tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a [`StateApplier`](crate::replication::StateApplier) should do with a batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpTag {
    /// Create or update; idempotent
    #[serde(rename = "set")]
    Set,
    /// Deprecated alias for `Set`, still accepted from older servers
    #[serde(rename = "force-set")]
    ForceSet,
    /// Remove
    #[serde(rename = "delete")]
    Delete,
}

impl OpTag {
    /// Fold the deprecated alias into `Set`.
    pub fn normalize(self) -> Self {
        match self {
            Self::ForceSet => Self::Set,
            other => other,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::ForceSet => "force-set",
            Self::Delete => "delete",
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_set_normalizes_to_set() {
        assert_eq!(OpTag::ForceSet.normalize(), OpTag::Set);
        assert_eq!(OpTag::Set.normalize(), OpTag::Set);
        assert_eq!(OpTag::Delete.normalize(), OpTag::Delete);
    }

    #[test]
    fn test_wire_names() {
        let tag: OpTag = serde_json::from_str("\"force-set\"").unwrap();
        assert_eq!(tag, OpTag::ForceSet);
        assert_eq!(serde_json::to_string(&OpTag::Delete).unwrap(), "\"delete\"");
    }
}
