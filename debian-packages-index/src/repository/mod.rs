// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Storage of repository indices.

A Debian repository is a collection of files holding packages and support
primitives. See <https://wiki.debian.org/DebianRepository/Format> for the
canonical definition of a Debian repository.

Index files live in a key/value store addressed by relative paths such as
`dists/bullseye/main/binary-amd64/Packages.gz`. The [IndexStore] trait abstracts
that store.
*/

use {
    crate::{error::Result, io::MultiContentDigest},
    async_trait::async_trait,
};

pub mod filesystem;
pub mod memory;

/// Describes a completed write of an index file.
#[derive(Clone, Debug)]
pub struct IndexWrite {
    /// The key that was written.
    pub key: String,
    /// The number of stanzas in the written index.
    pub stanza_count: usize,
    /// The number of bytes written.
    pub bytes_written: u64,
    /// Digests of the written bytes.
    ///
    /// These are the values a `Release` file records for the index.
    pub digests: MultiContentDigest,
}

/// A durable key/value store holding index files.
///
/// Implementations must distinguish an absent key from a key holding empty content.
/// Failures should be reported as [crate::error::PackagesIndexError::Storage].
///
/// No compare-and-swap semantics are offered. Callers that need multiple writers
/// to update the same key must serialize those updates themselves.
#[async_trait]
pub trait IndexStore: Sync {
    /// Fetch the content stored at a key.
    ///
    /// Resolves to [None] if nothing is stored at the key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store content at a key, replacing any existing value.
    ///
    /// Resolves once the content is durably stored.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl<S: IndexStore + ?Sized> IndexStore for &S {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        (**self).put(key, data).await
    }
}
