// ─── File Selector ───
// Picks the authoritative "latest" build out of a mod's published files
// and extracts its binary location, declared size, and filename.

use url::Url;

use crate::core::api::ModFile;

pub const FALLBACK_FILENAME: &str = "modfile.bin";

/// Select the most recently published file: single linear scan, replace
/// only on a strictly greater `date_added` so the earliest-indexed entry
/// wins ties. `None` when no entry carries a valid timestamp — that is a
/// recoverable "no file available" condition, not a failure.
pub fn select_latest(files: &[ModFile]) -> Option<&ModFile> {
    let mut latest: Option<&ModFile> = None;
    let mut latest_date = i64::MIN;

    for file in files {
        let Some(date_added) = file.date_added else {
            continue;
        };
        if date_added > latest_date {
            latest_date = date_added;
            latest = Some(file);
        }
    }

    latest
}

/// Extract `(binary_url, filename)` from a file version.
///
/// The API serves JSON-escaped URLs (`\/`); those are unescaped here.
/// A declared filename wins; otherwise the percent-decoded basename of
/// the URL path; otherwise a fixed placeholder. A missing or blank URL
/// means "no usable file" and yields `None`.
pub fn extract_download_info(file: &ModFile) -> Option<(String, String)> {
    let download = file.download.as_ref()?;
    let raw_url = download.binary_url.as_deref()?.trim();
    if raw_url.is_empty() {
        return None;
    }
    let binary_url = raw_url.replace("\\/", "/");

    let filename = file
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| filename_from_url(&binary_url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    Some((binary_url, filename))
}

/// Declared size of a file version, from the file itself or its
/// download descriptor.
pub fn expected_size(file: &ModFile) -> Option<u64> {
    file.filesize
        .or_else(|| file.download.as_ref().and_then(|d| d.filesize))
}

fn filename_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let basename = parsed.path_segments()?.next_back()?;
    if basename.is_empty() {
        return None;
    }
    percent_decode(basename)
}

/// Minimal percent-decode for a URL path segment; rejects invalid UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let mut out = Vec::with_capacity(input.len());
    let mut bytes = input.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let high = bytes.next().and_then(hex_digit)?;
            let low = bytes.next().and_then(hex_digit)?;
            out.push(high << 4 | low);
        } else {
            out.push(b);
        }
    }
    String::from_utf8(out).ok()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
