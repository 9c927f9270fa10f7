//! Deterministic tar archive creation and extraction.
//!
//! Archives preserve relative paths rooted at a base directory so
//! extraction reproduces the original layout under any destination. The
//! compression method is chosen per host and returned to the caller,
//! which records it as object metadata; extraction always dispatches on
//! the stored method.

use crate::types::CompressionMethod;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use strata_core::{Error, Result};
use tracing::{debug, warn};

const ZSTD_LEVEL: i32 = 3;

/// Create a compressed tar of `paths` (relative to `base_dir`) at
/// `archive_path`, returning the compression method used.
pub fn create_archive(
    archive_path: &Path,
    paths: &[PathBuf],
    base_dir: &Path,
) -> Result<CompressionMethod> {
    let method = CompressionMethod::preferred();
    create_archive_with(archive_path, paths, base_dir, method)?;
    Ok(method)
}

/// Create an archive with an explicit compression method.
pub fn create_archive_with(
    archive_path: &Path,
    paths: &[PathBuf],
    base_dir: &Path,
    method: CompressionMethod,
) -> Result<()> {
    debug!(
        archive = %archive_path.display(),
        method = method.as_str(),
        count = paths.len(),
        "creating cache archive"
    );
    let file = File::create(archive_path)
        .map_err(|e| Error::ArchiveCreate(format!("failed to create archive file: {e}")))?;
    let writer = BufWriter::new(file);

    match method {
        CompressionMethod::Zstd => {
            let mut encoder = zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)
                .map_err(|e| Error::ArchiveCreate(format!("zstd init failed: {e}")))?;
            append_paths(&mut encoder, paths, base_dir)?;
            let mut inner = encoder
                .finish()
                .map_err(|e| Error::ArchiveCreate(format!("zstd finish failed: {e}")))?;
            inner
                .flush()
                .map_err(|e| Error::ArchiveCreate(format!("flush failed: {e}")))?;
        }
        CompressionMethod::Gzip => {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            append_paths(&mut encoder, paths, base_dir)?;
            let mut inner = encoder
                .finish()
                .map_err(|e| Error::ArchiveCreate(format!("gzip finish failed: {e}")))?;
            inner
                .flush()
                .map_err(|e| Error::ArchiveCreate(format!("flush failed: {e}")))?;
        }
    }
    Ok(())
}

fn append_paths<W: Write>(writer: &mut W, paths: &[PathBuf], base_dir: &Path) -> Result<()> {
    let mut builder = tar::Builder::new(writer);
    for rel in paths {
        let abs = base_dir.join(rel);
        if !abs.exists() {
            warn!(path = %rel.display(), "skipping missing path");
            continue;
        }
        if abs.is_dir() {
            builder
                .append_dir_all(rel, &abs)
                .map_err(|e| Error::ArchiveCreate(format!("failed to pack dir: {e}")))?;
        } else {
            builder
                .append_path_with_name(&abs, rel)
                .map_err(|e| Error::ArchiveCreate(format!("failed to pack file: {e}")))?;
        }
    }
    builder
        .finish()
        .map_err(|e| Error::ArchiveCreate(format!("failed to finish tar: {e}")))
}

/// Extract an archive into `dest` using the method recorded alongside
/// the stored object.
pub fn extract_archive(archive_path: &Path, method: CompressionMethod, dest: &Path) -> Result<()> {
    debug!(
        archive = %archive_path.display(),
        method = method.as_str(),
        dest = %dest.display(),
        "extracting cache archive"
    );
    let file = File::open(archive_path)
        .map_err(|e| Error::ArchiveExtract(format!("failed to open archive: {e}")))?;
    let reader = BufReader::new(file);

    match method {
        CompressionMethod::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(reader)
                .map_err(|e| Error::ArchiveExtract(format!("zstd init failed: {e}")))?;
            unpack(tar::Archive::new(decoder), dest)
        }
        CompressionMethod::Gzip => unpack(tar::Archive::new(GzDecoder::new(reader)), dest),
    }
}

fn unpack<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<()> {
    archive
        .unpack(dest)
        .map_err(|e| Error::ArchiveExtract(format!("failed to unpack archive: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("pkg/node_modules/.bin")).unwrap();
        fs::write(root.join("pkg/node_modules/.bin/tsc"), b"#!/bin/sh").unwrap();
        fs::write(root.join("pkg/node_modules/index.js"), b"module.exports = 1;").unwrap();
        fs::write(root.join("lockfile"), b"lockfile-contents").unwrap();
    }

    fn roundtrip(method: CompressionMethod) {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        build_tree(src.path());

        let archive = tempfile::NamedTempFile::new().unwrap();
        let paths = vec![PathBuf::from("pkg/node_modules"), PathBuf::from("lockfile")];
        create_archive_with(archive.path(), &paths, src.path(), method).unwrap();

        extract_archive(archive.path(), method, dst.path()).unwrap();

        assert_eq!(
            fs::read(dst.path().join("pkg/node_modules/.bin/tsc")).unwrap(),
            b"#!/bin/sh"
        );
        assert_eq!(
            fs::read(dst.path().join("pkg/node_modules/index.js")).unwrap(),
            b"module.exports = 1;"
        );
        assert_eq!(fs::read(dst.path().join("lockfile")).unwrap(), b"lockfile-contents");
    }

    #[test]
    fn test_zstd_roundtrip_preserves_layout() {
        roundtrip(CompressionMethod::Zstd);
    }

    #[test]
    fn test_gzip_roundtrip_preserves_layout() {
        roundtrip(CompressionMethod::Gzip);
    }

    #[test]
    fn test_missing_paths_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("present"), b"data").unwrap();

        let archive = tempfile::NamedTempFile::new().unwrap();
        let paths = vec![PathBuf::from("present"), PathBuf::from("absent")];
        let method = create_archive(archive.path(), &paths, src.path()).unwrap();

        extract_archive(archive.path(), method, dst.path()).unwrap();
        assert_eq!(fs::read(dst.path().join("present")).unwrap(), b"data");
        assert!(!dst.path().join("absent").exists());
    }

    #[test]
    fn test_extract_garbage_fails() {
        let dst = tempfile::tempdir().unwrap();
        let mut archive = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write as _;
        archive.write_all(b"definitely not a tarball").unwrap();

        let result = extract_archive(archive.path(), CompressionMethod::Zstd, dst.path());
        assert!(matches!(result, Err(Error::ArchiveExtract(_))));
    }
}
