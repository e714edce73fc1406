// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! An index store holding content in memory. */

use {
    crate::{
        error::{PackagesIndexError, Result},
        repository::IndexStore,
    },
    async_trait::async_trait,
    std::{
        collections::BTreeMap,
        sync::{Mutex, MutexGuard},
    },
};

/// An [IndexStore] backed by an in-process map.
///
/// Content is lost when the instance is dropped. This is useful for testing and for
/// assembling indices before publishing them elsewhere.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryIndexStore {
    fn entries(&self, key: &str) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|e| PackagesIndexError::storage(key, e.to_string()))
    }

    /// Obtain a copy of the content stored at a key.
    pub fn content(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries(key)?.get(key).cloned())
    }

    /// Store content at a key, replacing any existing value.
    pub fn insert(&self, key: impl ToString, data: Vec<u8>) -> Result<()> {
        let key = key.to_string();
        self.entries(&key)?.insert(key, data);

        Ok(())
    }

    /// Obtain stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries("")?.keys().cloned().collect())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.content(key)
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.insert(key, data)
    }
}
