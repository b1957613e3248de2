//! LDtk format version checks

use std::cmp::Ordering;

/// Oldest `jsonVersion` whose layout this crate reads without guessing
///
/// Older files still load; callers are expected to surface a warning.
pub const MIN_SUPPORTED_VERSION: &str = "1.5.3";

/// Compare two dotted version strings numerically (`1.10.0 > 1.9.2`)
///
/// Missing components count as zero and non-numeric suffixes such as
/// `-beta` are ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ord = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Whether a document version is at least [`MIN_SUPPORTED_VERSION`]
pub fn is_version_supported(version: &str) -> bool {
    compare_versions(version, MIN_SUPPORTED_VERSION) != Ordering::Less
}
