//! Remote summary: the ref listing a repository publishes to pullers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::Result;
use crate::traits::RefStore;

/// Branch names and their commits as advertised by a remote.
///
/// Serialized as `{"refs": {"<name>": "<hex checksum>"}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub refs: BTreeMap<String, ObjectId>,
}

impl Summary {
    /// Summarize the local branches of `store`.
    pub fn from_store(store: &dyn RefStore) -> Result<Self> {
        let refs = store
            .branches()?
            .into_iter()
            .map(|r| (r.short_name().to_string(), r.target()))
            .collect();
        Ok(Self { refs })
    }

    /// Commit advertised for `name`.
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.refs.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
