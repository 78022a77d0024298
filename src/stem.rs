use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Matches `<stem><ordinal>.pdf`. The stem is lazy, so the ordinal captures
/// the longest trailing digit run (`ab12cd34.pdf` -> stem `ab12cd`, ordinal 34).
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+?)(\d+)\.pdf$").expect("valid regex"));

/// Result of classifying one filename.
///
/// Total over all inputs: names that do not follow the numbered pattern get
/// their extension-less name as stem and ordinal 0 (the "base" file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemParts {
    pub stem: String,
    pub ordinal: u32,
    /// Whether the name matched the `<stem><digits>.pdf` pattern.
    pub matched: bool,
}

pub fn classify(name: &str) -> StemParts {
    if let Some(caps) = NUMBERED.captures(name) {
        if let Ok(ordinal) = caps[2].parse::<u32>() {
            return StemParts {
                stem: caps[1].to_string(),
                ordinal,
                matched: true,
            };
        }
    }
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    StemParts {
        stem,
        ordinal: 0,
        matched: false,
    }
}

/// Membership test for a stem group: the bare `stem.pdf`, or `stem<digits>.pdf`.
pub fn belongs_to(stem: &str, name: &str) -> bool {
    if let Some(rest) = name.strip_prefix(stem) {
        if rest == ".pdf" {
            return true;
        }
        if let Some(digits) = rest.strip_suffix(".pdf") {
            return !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        }
    }
    false
}

/// Final on-disk name for an output ordinal: ordinal 0 is the bare stem file.
pub fn file_name(stem: &str, ordinal: u32) -> String {
    if ordinal == 0 {
        format!("{}.pdf", stem)
    } else {
        format!("{}{}.pdf", stem, ordinal)
    }
}
