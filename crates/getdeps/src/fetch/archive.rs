use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, warn};
use xz2::read::XzDecoder;

use crate::error::{Error, Result};

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
// XZ file format, section 2.1.1.1.
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
}

/// Sniffs the compression format from the leading magic bytes.
pub fn detect_compression(data: &[u8]) -> Result<Compression> {
    if data.starts_with(GZIP_MAGIC) {
        Ok(Compression::Gzip)
    } else if data.starts_with(XZ_MAGIC) {
        Ok(Compression::Xz)
    } else {
        Err(Error::UnsupportedCompression)
    }
}

/// Decompresses a gzip or xz tarball held in memory and unpacks it into `dest`.
/// Entries that would land outside `dest` are skipped.
pub fn extract(data: &[u8], dest: &Path) -> Result<()> {
    let reader: Box<dyn Read + '_> = match detect_compression(data)? {
        Compression::Gzip => Box::new(GzDecoder::new(data)),
        Compression::Xz => Box::new(XzDecoder::new(data)),
    };

    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| Error::msg(format!("failed to read tar stream: {e}")))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::msg(format!("corrupt tar entry: {e}")))?;
        let name = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<invalid path>".into());
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| Error::msg(format!("failed to unpack {name}: {e}")))?;
        if unpacked {
            debug!("unpacked {name}");
        } else {
            warn!("skipped {name}: outside of {}", dest.display());
        }
    }
    Ok(())
}
