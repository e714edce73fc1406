// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Add packages to stored `Packages` indices.

[IndexMerger] performs a read-modify-write of a compressed `Packages` file held
in an [IndexStore]: the existing index is fetched and decoded, a new stanza is
merged in, and the re-encoded index replaces the stored one.

The store is written only once the new index has been fully produced. Any failure
before that point leaves the stored value untouched.
*/

use {
    crate::{
        control::{PackagesIndex, Stanza},
        error::{PackagesIndexError, Result},
        io::{ArchiveCodec, GzipCodec, MultiContentDigest},
        repository::{IndexStore, IndexWrite},
    },
    log::{debug, info, warn},
    std::sync::Arc,
};

/// How a new stanza is combined with the stanzas already in an index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MergePolicy {
    /// Append the new stanza after all existing stanzas.
    ///
    /// Existing stanzas are never removed, so adding a package name that is already
    /// present results in multiple stanzas for that name.
    #[default]
    Append,

    /// Remove existing stanzas having the same `Package` value, then append.
    ///
    /// The new stanza must have a `Package` field.
    ReplacePackage,
}

impl MergePolicy {
    /// Merge a stanza into an index.
    ///
    /// Returns the number of existing stanzas that were removed.
    pub fn merge(&self, index: &mut PackagesIndex, stanza: Stanza) -> usize {
        let removed = match (self, stanza.package()) {
            (Self::ReplacePackage, Some(package)) => {
                let before = index.len();
                index.retain(|existing| existing.package() != Some(package));
                before - index.len()
            }
            _ => 0,
        };

        index.push(stanza);

        removed
    }
}

/// Decode the raw content of a compressed index.
///
/// Decompressed content must be UTF-8. Content in another encoding is reported as
/// [PackagesIndexError::CorruptArchive] even though it decompressed cleanly, since
/// it can't be merged without re-encoding existing stanzas.
pub fn decode_index(codec: &dyn ArchiveCodec, data: &[u8]) -> Result<PackagesIndex> {
    let raw = codec.decompress(data)?;

    let text = std::str::from_utf8(&raw).map_err(|e| {
        PackagesIndexError::CorruptArchive(format!("index content is not UTF-8: {}", e))
    })?;

    Ok(PackagesIndex::parse_str(text))
}

/// Encode an index to compressed content.
pub fn encode_index(codec: &dyn ArchiveCodec, index: &PackagesIndex) -> Result<Vec<u8>> {
    let mut raw = vec![];
    index.write(&mut raw)?;

    codec.compress(&raw)
}

/// Adds package stanzas to `Packages` indices held in an [IndexStore].
///
/// Every operation builds its own in-memory index; no state is retained between
/// calls. Concurrent [Self::add()] calls against the same key race: the last write
/// wins and may discard stanzas added by the others. Callers wanting multiple
/// writers must serialize calls per key.
pub struct IndexMerger<S> {
    store: S,
    codec: Arc<dyn ArchiveCodec>,
    policy: MergePolicy,
}

impl<S: IndexStore> IndexMerger<S> {
    /// Construct an instance writing gzip indices to a store with [MergePolicy::Append].
    pub fn new(store: S) -> Self {
        Self {
            store,
            codec: Arc::new(GzipCodec),
            policy: MergePolicy::default(),
        }
    }

    /// Use a different [ArchiveCodec] for reading and writing indices.
    #[must_use]
    pub fn with_codec(mut self, codec: impl ArchiveCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Use a different [MergePolicy].
    #[must_use]
    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The store this instance reads from and writes to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The [MergePolicy] in effect.
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Read the index stored at a key without modifying it.
    ///
    /// An absent key yields an empty index.
    pub async fn read_index(&self, key: &str) -> Result<PackagesIndex> {
        match self.store.get(key).await? {
            Some(data) => {
                let codec = self.codec.clone();
                async_std::task::spawn_blocking(move || decode_index(codec.as_ref(), &data))
                    .await
            }
            None => Ok(PackagesIndex::default()),
        }
    }

    /// Add a package stanza to the index stored at `key`.
    ///
    /// `stanza_text` must hold exactly one control paragraph. It is parsed before
    /// the store is accessed, so malformed input never causes I/O.
    ///
    /// If nothing is stored at `key`, a new index holding only the stanza is written.
    /// Otherwise the stored index is decoded, the stanza merged according to the
    /// [MergePolicy], and the result replaces the stored value.
    ///
    /// A stored index that decompresses to something other than UTF-8 is rejected
    /// with [PackagesIndexError::CorruptArchive], the same as one that fails to
    /// decompress. Indices in legacy encodings such as Latin-1 can't be appended to.
    ///
    /// Resolves once the store has acknowledged the write.
    pub async fn add(&self, stanza_text: &str, key: &str) -> Result<IndexWrite> {
        let stanza = Stanza::parse_str(stanza_text)?;

        if self.policy == MergePolicy::ReplacePackage && stanza.package().is_none() {
            return Err(PackagesIndexError::MalformedStanza(
                "Package field required to replace existing entries".to_string(),
            ));
        }

        let existing = self.store.get(key).await?;

        match &existing {
            Some(data) => debug!("read {} bytes of existing index {}", data.len(), key),
            None => debug!("{} does not exist; creating new index", key),
        }

        let codec = self.codec.clone();
        let policy = self.policy;

        let (data, stanza_count, removed) = async_std::task::spawn_blocking(move || {
            let mut index = match existing {
                Some(data) => decode_index(codec.as_ref(), &data)?,
                None => PackagesIndex::default(),
            };

            let removed = policy.merge(&mut index, stanza);
            let data = encode_index(codec.as_ref(), &index)?;

            Ok::<_, PackagesIndexError>((data, index.len(), removed))
        })
        .await?;

        if removed > 0 {
            warn!("replaced {} existing stanzas in {}", removed, key);
        }

        let digests = MultiContentDigest::from_data(&data);
        let bytes_written = data.len() as u64;

        self.store.put(key, data).await?;

        info!(
            "wrote {} ({} stanzas; {} bytes)",
            key, stanza_count, bytes_written
        );
        debug!(
            "{} {}: {}",
            key,
            digests.sha256.field_name(),
            digests.sha256.digest_hex()
        );

        Ok(IndexWrite {
            key: key.to_string(),
            stanza_count,
            bytes_written,
            digests,
        })
    }
}
