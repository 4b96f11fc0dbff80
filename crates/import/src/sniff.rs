use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::normalize::parse_flexible_date;
use outlay_core::parse_money;

/// How much of the file the sniffer looks at. Dialect detection rarely
/// needs more than the first few rows.
const SAMPLE_BYTES: usize = 4096;

/// How many sampled lines the delimiter scorer considers.
const SAMPLE_LINES: usize = 20;

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Encodings bank exports actually arrive in, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, tolerating (and stripping) a byte-order mark.
    Utf8Bom,
    Utf8,
    /// Legacy Mac OS exports (Numbers/AppleWorks era).
    MacRoman,
    Latin1,
}

impl TextEncoding {
    pub const PRIORITY: [TextEncoding; 4] = [
        TextEncoding::Utf8Bom,
        TextEncoding::Utf8,
        TextEncoding::MacRoman,
        TextEncoding::Latin1,
    ];

    /// Decode a complete buffer. `None` means the bytes are not valid
    /// in this encoding.
    pub fn decode(self, raw: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Bom => {
                let stripped = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw);
                std::str::from_utf8(stripped).ok().map(str::to_owned)
            }
            TextEncoding::Utf8 => std::str::from_utf8(raw).ok().map(str::to_owned),
            TextEncoding::MacRoman => {
                let (decoded, had_errors) =
                    encoding_rs::MACINTOSH.decode_without_bom_handling(raw);
                if had_errors {
                    None
                } else {
                    Some(decoded.into_owned())
                }
            }
            // Latin-1 maps every byte to the code point of the same
            // value, so this cannot fail.
            TextEncoding::Latin1 => Some(raw.iter().map(|&b| b as char).collect()),
        }
    }

    /// Decode a possibly mid-character-truncated prefix, dropping an
    /// incomplete trailing sequence rather than failing on it.
    fn decode_prefix(self, raw: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Bom | TextEncoding::Utf8 => {
                let stripped = if self == TextEncoding::Utf8Bom {
                    raw.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(raw)
                } else {
                    raw
                };
                match std::str::from_utf8(stripped) {
                    Ok(s) => Some(s.to_owned()),
                    Err(e) if e.error_len().is_none() => {
                        // Truncated multi-byte sequence at the sample
                        // boundary; keep the valid part.
                        std::str::from_utf8(&stripped[..e.valid_up_to()])
                            .ok()
                            .map(str::to_owned)
                    }
                    Err(_) => None,
                }
            }
            other => other.decode(raw),
        }
    }
}

/// Detected CSV dialect for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedFormat {
    pub encoding: TextEncoding,
    pub delimiter: u8,
    pub quote: u8,
    pub has_header: bool,
}

impl Default for SniffedFormat {
    fn default() -> Self {
        SniffedFormat {
            encoding: TextEncoding::Utf8Bom,
            delimiter: b',',
            quote: b'"',
            has_header: true,
        }
    }
}

/// Detect encoding, delimiter, quote character, and header presence
/// from a bounded prefix of the file.
///
/// Encodings are tried in fixed priority order; the first one that
/// both decodes the sample and yields a plausible delimiter wins. If
/// nothing works (unreadable file, no recognizable delimiter) the
/// fixed default dialect is returned — this function never fails.
pub fn sniff_format(path: &Path) -> SniffedFormat {
    let mut sample = Vec::with_capacity(SAMPLE_BYTES);
    let read_ok = File::open(path)
        .and_then(|f| f.take(SAMPLE_BYTES as u64).read_to_end(&mut sample))
        .is_ok();
    if !read_ok || sample.is_empty() {
        return SniffedFormat::default();
    }

    for encoding in TextEncoding::PRIORITY {
        let Some(text) = encoding.decode_prefix(&sample) else {
            continue;
        };
        let Some(delimiter) = detect_delimiter(&text) else {
            continue;
        };
        let has_header = detect_header(&text, delimiter);
        return SniffedFormat {
            encoding,
            delimiter,
            quote: b'"',
            has_header,
        };
    }

    SniffedFormat::default()
}

fn sample_lines(text: &str) -> Vec<&str> {
    // Normalize terminators so CR-only files still split into lines.
    text.split(['\r', '\n'])
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect()
}

/// Pick the candidate whose per-line count is non-zero and identical
/// across the sampled lines. Ties go to the earlier candidate. When no
/// candidate is consistent, fall back to the one that occurs most
/// overall; `None` when no candidate occurs at all.
fn detect_delimiter(text: &str) -> Option<u8> {
    let lines = sample_lines(text);
    if lines.is_empty() {
        return None;
    }

    for candidate in DELIMITER_CANDIDATES {
        let ch = candidate as char;
        let first = lines[0].matches(ch).count();
        if first > 0 && lines.iter().all(|l| l.matches(ch).count() == first) {
            return Some(candidate);
        }
    }

    DELIMITER_CANDIDATES
        .iter()
        .map(|&c| (c, text.matches(c as char).count()))
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(c, _)| c)
}

/// A first row where no field parses as a number or a date is taken
/// to be a header.
fn detect_header(text: &str, delimiter: u8) -> bool {
    let lines = sample_lines(text);
    let Some(first) = lines.first() else {
        return false;
    };
    first
        .split(delimiter as char)
        .map(|field| field.trim().trim_matches('"'))
        .all(|field| parse_money(field).is_none() && parse_flexible_date(field).is_none())
}
