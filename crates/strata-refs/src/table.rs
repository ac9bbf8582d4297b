//! Plain name-to-commit map shared by the store backends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Ref, RefUpdate};

/// All refs of a repository keyed by canonical name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct RefTable {
    refs: BTreeMap<String, ObjectId>,
}

impl RefTable {
    pub(crate) fn get(&self, name: &str) -> Result<Option<Ref>> {
        self.refs
            .get(name)
            .map(|commit| Ref::from_canonical(name, *commit))
            .transpose()
    }

    pub(crate) fn insert(&mut self, reference: &Ref) -> Result<()> {
        reference.validate()?;
        self.refs.insert(reference.canonical_name(), reference.target());
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.refs.remove(name).is_some()
    }

    pub(crate) fn with_prefix(&self, prefix: &str) -> Result<Vec<Ref>> {
        self.refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, commit)| Ref::from_canonical(name, *commit))
            .collect()
    }

    /// Check every expectation first, then write. Nothing changes on error.
    pub(crate) fn apply(&mut self, updates: &[RefUpdate]) -> Result<()> {
        for update in updates {
            update.target.validate()?;
            let name = update.name();
            let actual = self.refs.get(&name).copied();
            if actual != update.old {
                return Err(RefError::Conflict {
                    name,
                    expected: update.old,
                    actual,
                });
            }
        }
        for update in updates {
            self.refs.insert(update.name(), update.new_commit());
        }
        Ok(())
    }
}
