// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers.

This module holds the [ArchiveCodec] used to move index content between its raw
and compressed forms as well as content digest primitives describing written
indices.
*/

use {
    crate::error::{PackagesIndexError, Result},
    digest::Digest,
    std::io::{Read, Write},
};

/// A content digest of a written index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentDigest {
    /// An MD5 digest.
    Md5(Vec<u8>),
    /// A SHA-1 digest.
    Sha1(Vec<u8>),
    /// A SHA-256 digest.
    Sha256(Vec<u8>),
}

impl ContentDigest {
    /// Obtain the hex encoded content digest.
    pub fn digest_hex(&self) -> String {
        match self {
            Self::Md5(x) | Self::Sha1(x) | Self::Sha256(x) => hex::encode(x),
        }
    }

    /// Name of the control field in `Release` files listing digests of this flavor.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Md5(_) => "MD5Sum",
            Self::Sha1(_) => "SHA1",
            Self::Sha256(_) => "SHA256",
        }
    }
}

/// The digests a `Release` file records for an index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiContentDigest {
    pub md5: ContentDigest,
    pub sha1: ContentDigest,
    pub sha256: ContentDigest,
}

impl MultiContentDigest {
    /// Compute all digest flavors over a buffer.
    pub fn from_data(data: &[u8]) -> Self {
        Self {
            md5: ContentDigest::Md5(md5::Md5::digest(data).to_vec()),
            sha1: ContentDigest::Sha1(sha1::Sha1::digest(data).to_vec()),
            sha256: ContentDigest::Sha256(sha2::Sha256::digest(data).to_vec()),
        }
    }
}

/// Lossless conversion between raw bytes and a compressed container.
///
/// Implementations are stateless. Both operations work on complete in-memory
/// buffers: the full decompressed payload is materialized.
pub trait ArchiveCodec: Send + Sync {
    /// Decode a complete compressed stream.
    ///
    /// Malformed input (bad header, truncation, checksum mismatch) results in
    /// [PackagesIndexError::CorruptArchive].
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Produce a complete compressed stream holding `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// An [ArchiveCodec] producing and consuming gzip streams.
///
/// Written streams have a zero modification time in their header, so compressing
/// the same input yields the same bytes. Concatenated gzip members are accepted on
/// read, as `gunzip` does.
#[derive(Clone, Copy, Debug, Default)]
pub struct GzipCodec;

impl ArchiveCodec for GzipCodec {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder =
            libflate::gzip::MultiDecoder::new(data).map_err(corrupt_or_io("gzip header"))?;

        let mut buffer = vec![];
        decoder
            .read_to_end(&mut buffer)
            .map_err(corrupt_or_io("gzip stream"))?;

        Ok(buffer)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let header = libflate::gzip::HeaderBuilder::new()
            .modification_time(0)
            .finish();

        let mut encoder = libflate::gzip::Encoder::with_options(
            Vec::with_capacity(data.len() / 4),
            libflate::gzip::EncodeOptions::new().header(header),
        )?;
        encoder.write_all(data)?;

        Ok(encoder.finish().into_result()?)
    }
}

/// Map a decoder [std::io::Error] to our error type.
///
/// Decoders signal malformed content through `InvalidData` and truncated content
/// through `UnexpectedEof`. Anything else is a failure of the byte source itself.
fn corrupt_or_io(context: &'static str) -> impl Fn(std::io::Error) -> PackagesIndexError {
    move |e| match e.kind() {
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
            PackagesIndexError::CorruptArchive(format!("{}: {}", context, e))
        }
        _ => PackagesIndexError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES: &str = include_str!("testdata/Packages");

    #[test]
    fn gzip_round_trip() -> Result<()> {
        let codec = GzipCodec;

        let inputs: [&[u8]; 4] = [
            b"",
            b"\n",
            PACKAGES.as_bytes(),
            &[0u8, 255, 0, 1, 2, 3, 0x1f, 0x8b],
        ];

        for data in inputs {
            let compressed = codec.compress(data)?;
            assert_eq!(&compressed[0..2], &[0x1f, 0x8b]);
            assert_eq!(codec.decompress(&compressed)?, data);
        }

        Ok(())
    }

    #[test]
    fn gzip_large_payload() -> Result<()> {
        let codec = GzipCodec;

        let data = PACKAGES.repeat(2048);
        let compressed = codec.compress(data.as_bytes())?;
        assert!(compressed.len() < data.len());
        assert_eq!(codec.decompress(&compressed)?, data.as_bytes());

        Ok(())
    }

    #[test]
    fn gzip_compress_is_reproducible() -> Result<()> {
        let codec = GzipCodec;

        let compressed = codec.compress(b"hello")?;
        // MTIME occupies header bytes 4 through 7.
        assert_eq!(&compressed[4..8], &[0, 0, 0, 0]);

        let first = codec.compress(PACKAGES.as_bytes())?;
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(first, codec.compress(PACKAGES.as_bytes())?);

        Ok(())
    }

    #[test]
    fn gzip_concatenated_members() -> Result<()> {
        let codec = GzipCodec;

        let mut data = codec.compress(b"Package: a\n")?;
        data.extend(codec.compress(b"\nPackage: b\n")?);

        assert_eq!(codec.decompress(&data)?, b"Package: a\n\nPackage: b\n");

        Ok(())
    }

    #[test]
    fn gzip_rejects_malformed() -> Result<()> {
        let codec = GzipCodec;
        let compressed = codec.compress(PACKAGES.as_bytes())?;

        // Not gzip at all.
        assert!(matches!(
            codec.decompress(PACKAGES.as_bytes()),
            Err(PackagesIndexError::CorruptArchive(_))
        ));

        // Empty input lacks a header.
        assert!(matches!(
            codec.decompress(b""),
            Err(PackagesIndexError::CorruptArchive(_))
        ));

        // Truncated stream.
        assert!(matches!(
            codec.decompress(&compressed[0..compressed.len() / 2]),
            Err(PackagesIndexError::CorruptArchive(_))
        ));

        // The trailer holds the CRC32 followed by the payload size.
        let mut bad_crc = compressed.clone();
        let crc_offset = bad_crc.len() - 8;
        bad_crc[crc_offset] ^= 0xff;
        assert!(matches!(
            codec.decompress(&bad_crc),
            Err(PackagesIndexError::CorruptArchive(_))
        ));

        Ok(())
    }

    #[test]
    fn multi_digest() {
        let digests = MultiContentDigest::from_data(b"");

        assert_eq!(
            digests.md5.digest_hex(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            digests.sha1.digest_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            digests.sha256.digest_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digests.sha256.field_name(), "SHA256");
        assert_ne!(digests, MultiContentDigest::from_data(b"\n"));
    }
}
