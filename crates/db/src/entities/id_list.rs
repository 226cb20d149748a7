//! JSON-encoded id sets stored on subscriptions and payments.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered set of ids, persisted as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct IdList(pub Vec<Uuid>);

impl IdList {
    /// Returns true if `id` is in the list.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.0.contains(&id)
    }

    /// Appends `id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Number of ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Uuid>> for IdList {
    fn from(ids: Vec<Uuid>) -> Self {
        Self(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let id = Uuid::new_v4();
        let mut list = IdList::default();
        assert!(list.insert(id));
        assert!(!list.insert(id));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let id = Uuid::nil();
        let json = serde_json::to_string(&IdList(vec![id])).unwrap();
        assert_eq!(json, format!("[\"{id}\"]"));
    }
}
