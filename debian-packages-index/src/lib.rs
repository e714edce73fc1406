// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Maintain `Packages` indices of Debian repositories.

A Debian repository publishes, for each component and architecture, a `Packages`
file listing every available binary package. Clients like `apt` fetch this file,
usually gzip compressed as `Packages.gz`, to discover packages, their versions and
where to download them.

This crate implements adding packages to such an index in place: the stored
compressed index is read, the control paragraph of a new package is merged in and
the updated index is compressed and stored again.

# Goals

## Fidelity

Existing index content is never re-formatted. Paragraphs are retained as the exact
lines they were read from, so merging a package into an index only ever appends
content (or, if requested, removes paragraphs that the new one supersedes).

## All or Nothing

A stored index is only replaced once a complete new index has been produced. If
decoding the existing index fails or the new paragraph is malformed, the store is
not written to.

# A Tour of Functionality

*Control files* consist of *paragraphs* of key-value metadata. The [control] module
defines [control::Stanza], a paragraph describing a single package, and
[control::PackagesIndex], an ordered series of stanzas forming a `Packages` file.

The [io] module defines the [io::ArchiveCodec] trait for converting between raw and
compressed index content. [io::GzipCodec] implements it for gzip. Content digests
of written indices are represented by [io::MultiContentDigest].

The [repository] module defines the [repository::IndexStore] trait, which abstracts
the durable key/value store holding index files.
[repository::filesystem::FilesystemIndexStore] stores indices in a local directory
and [repository::memory::MemoryIndexStore] keeps them in memory.

The [merger] module contains [merger::IndexMerger], which adds a package stanza to
an index in an [repository::IndexStore]. [merger::MergePolicy] controls whether
existing stanzas for the same package are retained.

# Concurrency

[merger::IndexMerger::add()] is a read-modify-write against one store key and the
store is not expected to offer compare-and-swap. Concurrent adds targeting the same
key must be serialized by the caller, or later writes will discard stanzas added by
earlier ones.

# Logging

Activity is reported through the [log] crate. No logger is installed by this crate.
*/

pub mod control;
pub mod error;
pub mod io;
pub mod merger;
pub mod repository;
