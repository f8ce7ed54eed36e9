//! vc::lfs::cache
//!
//! Pointer files and the local object cache.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

const POINTER_VERSION: &str = "version https://git-lfs.github.com/spec/v1";
const OID_PREFIX: &str = "oid sha256:";
/// Pointer files are always smaller than this.
pub const MAX_POINTER_SIZE: usize = 1024;

/// A parsed pointer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsPointer {
    /// Lowercase hex SHA-256 of the content.
    pub oid: String,
    pub size: u64,
}

fn parse_oid(value: &str) -> Option<String> {
    let oid = value.trim();
    (oid.len() == 64 && oid.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| oid.to_ascii_lowercase())
}

/// Parse pointer-file content. `None` for anything else.
pub fn parse_pointer(bytes: &[u8]) -> Option<LfsPointer> {
    if bytes.len() >= MAX_POINTER_SIZE {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    let mut lines = text.lines();
    if lines.next()?.trim() != POINTER_VERSION {
        return None;
    }

    let mut oid = None;
    let mut size = None;
    for line in lines {
        if let Some(value) = line.strip_prefix(OID_PREFIX) {
            oid = Some(parse_oid(value)?);
        } else if let Some(value) = line.strip_prefix("size ") {
            size = Some(value.trim().parse().ok()?);
        }
    }
    Some(LfsPointer {
        oid: oid?,
        size: size?,
    })
}

/// The two object ids of a pointer file with conflict markers, as
/// `(current, incoming)`.
pub fn parse_conflicting_pointer(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    if lines.next()?.trim() != POINTER_VERSION {
        return None;
    }

    let mut current = None;
    let mut incoming = None;
    let mut side = None;
    for line in lines {
        if line.starts_with("<<<<<<<") {
            side = Some(true);
        } else if line.starts_with("=======") {
            side = Some(false);
        } else if line.starts_with(">>>>>>>") {
            side = None;
        } else if let Some(value) = line.strip_prefix(OID_PREFIX) {
            match side {
                Some(true) => current = parse_oid(value),
                Some(false) => incoming = parse_oid(value),
                None => {}
            }
        }
    }
    Some((current?, incoming?))
}

/// Whether the file at `path` hashes to `oid`.
pub fn verify_object(path: &Path, oid: &str) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()).eq_ignore_ascii_case(oid))
}
