// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Error type for errors raised by a store backing indices.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum PackagesIndexError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("corrupt compressed index: {0}")]
    CorruptArchive(String),

    #[error("malformed stanza: {0}")]
    MalformedStanza(String),

    #[error("storage error on {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StoreError,
    },
}

impl PackagesIndexError {
    /// Construct a [Self::Storage] from a store key and the error the store raised.
    pub fn storage(key: impl ToString, source: impl Into<StoreError>) -> Self {
        Self::Storage {
            key: key.to_string(),
            source: source.into(),
        }
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, PackagesIndexError>;
