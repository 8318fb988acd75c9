//! Service intentions

use serde::{Deserialize, Serialize};

use super::raft_index::RaftIndex;
use super::tenancy::TenancyScope;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionAction {
    Allow,
    Deny,
}

/// Allow or deny traffic from one service to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Intention {
    #[serde(rename = "ID")]
    pub id: String,
    pub source_name: String,
    pub destination_name: String,
    pub action: IntentionAction,
    #[serde(default)]
    pub description: String,
    /// Evaluation order; higher wins
    #[serde(default)]
    pub precedence: u32,
    #[serde(flatten)]
    pub tenancy: TenancyScope,
    #[serde(flatten)]
    pub raft_index: RaftIndex,
}

impl Intention {
    pub fn is_same(&self, other: &Intention) -> bool {
        let Intention {
            id,
            source_name,
            destination_name,
            action,
            description,
            precedence,
            tenancy,
            raft_index: _,
        } = self;
        *id == other.id
            && *source_name == other.source_name
            && *destination_name == other.destination_name
            && *action == other.action
            && *description == other.description
            && *precedence == other.precedence
            && *tenancy == other.tenancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_change_detected() {
        let a = Intention {
            id: "i1".to_string(),
            source_name: "web".to_string(),
            destination_name: "db".to_string(),
            action: IntentionAction::Allow,
            description: String::new(),
            precedence: 9,
            tenancy: TenancyScope::default(),
            raft_index: RaftIndex::new(2, 2),
        };
        let mut b = a.clone();
        b.raft_index = RaftIndex::default();
        assert!(a.is_same(&b));
        b.action = IntentionAction::Deny;
        assert!(!a.is_same(&b));
    }
}
