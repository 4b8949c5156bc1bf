use serde::{Deserialize, Serialize};

/// Minimum digit count of a postal code worth sending upstream.
pub const ZIP_CODE_MIN_DIGITS: usize = 7;

const HYPHENS: [char; 4] = ['-', '－', 'ー', '‐'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCandidate {
    pub prefecture: String,
    pub city: String,
    pub address1: String,
}

pub fn strip_hyphens(raw: &str) -> String {
    raw.trim().chars().filter(|ch| !HYPHENS.contains(ch)).collect()
}

/// Returns the digits of a postal code, or `None` when the input is too short
/// or contains anything other than digits and hyphens.
pub fn normalize_zip_code(raw: &str) -> Option<String> {
    let digits = strip_hyphens(raw);
    let valid = digits.chars().count() >= ZIP_CODE_MIN_DIGITS
        && digits.chars().all(|ch| ch.is_ascii_digit());
    valid.then_some(digits)
}
