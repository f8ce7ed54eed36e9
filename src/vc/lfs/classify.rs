//! vc::lfs::classify
//!
//! Text or binary, decided from the path first and the content second.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// OS metadata files, text regardless of content.
pub const TEXT_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", ".localized"];

/// Non-`text/*` MIME subtypes that are still textual.
pub const TEXT_SUBTYPES: &[&str] = &[
    "json",
    "ld+json",
    "x-httpd-php",
    "x-sh",
    "x-csh",
    "xhtml+xml",
    "xml",
    "svg",
    "svg+xml",
];

const SNIFF_LEN: usize = 1024;
const CONTROL_RATIO: f64 = 0.3;

/// Why a file was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    DeniedName,
    TextMime,
    TextSubtype,
    Empty,
    ByteOrderMark,
    NulByte,
    Utf8,
    ControlBytes,
    PlainBytes,
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub binary: bool,
    pub reason: Reason,
}

impl Classification {
    fn text(reason: Reason) -> Self {
        Self {
            binary: false,
            reason,
        }
    }

    fn binary(reason: Reason) -> Self {
        Self {
            binary: true,
            reason,
        }
    }
}

pub fn classify(path: &Path) -> Classification {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if TEXT_FILE_NAMES.contains(&name) {
        return Classification::text(Reason::DeniedName);
    }

    if let Some(mime) = mime_guess::from_path(path).first() {
        if mime.type_() == mime_guess::mime::TEXT {
            return Classification::text(Reason::TextMime);
        }
        let subtype = match mime.suffix() {
            Some(suffix) => format!("{}+{}", mime.subtype().as_str(), suffix.as_str()),
            None => mime.subtype().as_str().to_string(),
        };
        if TEXT_SUBTYPES.contains(&subtype.as_str()) {
            return Classification::text(Reason::TextSubtype);
        }
    }

    match read_head(path) {
        Some(head) => sniff(&head),
        // Unreadable files are left alone rather than tracked
        None => Classification::text(Reason::Unreadable),
    }
}

pub fn is_binary(path: &Path) -> bool {
    classify(path).binary
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    Some(head)
}

/// Classify the first bytes of a file.
pub fn sniff(bytes: &[u8]) -> Classification {
    if bytes.is_empty() {
        return Classification::text(Reason::Empty);
    }
    const BOMS: [&[u8]; 5] = [
        &[0xEF, 0xBB, 0xBF],
        &[0x00, 0x00, 0xFE, 0xFF],
        &[0xFF, 0xFE, 0x00, 0x00],
        &[0xFE, 0xFF],
        &[0xFF, 0xFE],
    ];
    if BOMS.iter().any(|bom| bytes.starts_with(bom)) {
        return Classification::text(Reason::ByteOrderMark);
    }
    if bytes.contains(&0) {
        return Classification::binary(Reason::NulByte);
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => return Classification::text(Reason::Utf8),
        // Cut mid-character at the sniff boundary
        Err(e) if e.error_len().is_none() => return Classification::text(Reason::Utf8),
        Err(_) => {}
    }

    let control = bytes.iter().filter(|&&b| is_control(b)).count();
    if control as f64 / bytes.len() as f64 > CONTROL_RATIO {
        Classification::binary(Reason::ControlBytes)
    } else {
        Classification::text(Reason::PlainBytes)
    }
}

fn is_control(b: u8) -> bool {
    matches!(b, 0x01..=0x08 | 0x0E..=0x1F | 0x7F)
}
