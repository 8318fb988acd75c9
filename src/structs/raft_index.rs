//! RaftIndex - Local log positions carried by every replicated record
//!
//! Both indices are assigned by the consensus log of the datacenter that
//! holds the copy. A replicated record therefore has different indices in
//! its source and destination datacenters.
//!
//! Zero values mean the record has not been committed yet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Creation and last-modification index of a record.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RaftIndex {
    /// Index at which the record was first written
    pub create_index: u64,
    /// Index of the most recent write
    pub modify_index: u64,
}

impl RaftIndex {
    /// Create an index pair.
    pub fn new(create_index: u64, modify_index: u64) -> Self {
        Self {
            create_index,
            modify_index,
        }
    }

    /// Index pair for a record written for the first time at `index`.
    pub fn created_at(index: u64) -> Self {
        Self::new(index, index)
    }

    /// Whether the record has been committed to a log.
    pub fn is_committed(&self) -> bool {
        self.create_index > 0
    }

    /// Check `ModifyIndex >= CreateIndex > 0` for committed records.
    ///
    /// The all-zero pair is valid (not yet committed). Anything else with a
    /// zero create index, or a modify index below the create index, is not.
    pub fn validate(&self) -> Result<(), RaftIndexViolation> {
        if self.create_index == 0 && self.modify_index == 0 {
            return Ok(());
        }
        if self.create_index == 0 {
            return Err(RaftIndexViolation::MissingCreateIndex {
                modify_index: self.modify_index,
            });
        }
        if self.modify_index < self.create_index {
            return Err(RaftIndexViolation::ModifyBeforeCreate {
                create_index: self.create_index,
                modify_index: self.modify_index,
            });
        }
        Ok(())
    }

    /// Record a new modification at `index`, keeping the creation index.
    pub fn touch(&mut self, index: u64) {
        if self.create_index == 0 {
            self.create_index = index;
        }
        self.modify_index = index;
    }
}

/// Violation of the committed index invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaftIndexViolation {
    /// Modify index set without a create index
    MissingCreateIndex { modify_index: u64 },
    /// Modify index lower than create index
    ModifyBeforeCreate { create_index: u64, modify_index: u64 },
}

impl fmt::Display for RaftIndexViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCreateIndex { modify_index } => {
                write!(f, "modify index {} set without a create index", modify_index)
            }
            Self::ModifyBeforeCreate {
                create_index,
                modify_index,
            } => write!(
                f,
                "modify index {} is lower than create index {}",
                modify_index, create_index
            ),
        }
    }
}

impl std::error::Error for RaftIndexViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_index_is_uncommitted_and_valid() {
        let index = RaftIndex::default();
        assert!(!index.is_committed());
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_committed_index_valid() {
        assert!(RaftIndex::new(1, 2).validate().is_ok());
        assert!(RaftIndex::created_at(7).validate().is_ok());
    }

    #[test]
    fn test_modify_before_create_rejected() {
        let err = RaftIndex::new(5, 3).validate().unwrap_err();
        assert_eq!(
            err,
            RaftIndexViolation::ModifyBeforeCreate {
                create_index: 5,
                modify_index: 3
            }
        );
    }

    #[test]
    fn test_missing_create_index_rejected() {
        assert!(RaftIndex::new(0, 4).validate().is_err());
    }

    #[test]
    fn test_touch_keeps_create_index() {
        let mut index = RaftIndex::default();
        index.touch(10);
        assert_eq!(index, RaftIndex::new(10, 10));
        index.touch(12);
        assert_eq!(index, RaftIndex::new(10, 12));
    }
}
