use regex::Regex;
use sha1::Digest;
use std::sync::OnceLock;

/// Length of a hex encoded object id.
pub const SHA_HEX_LEN: usize = 40;

pub fn sha(data: &[u8]) -> String {
    let mut hasher = sha1::Sha1::new();

    hasher.update(data);

    hex::encode(hasher.finalize())
}

/// Whether `s` has the shape of a full object id: 40 lowercase hex digits.
pub fn is_sha(s: &str) -> bool {
    static SHA_REGEX: OnceLock<Regex> = OnceLock::new();

    SHA_REGEX
        .get_or_init(|| {
            let pattern = format!("^[0-9a-f]{{{SHA_HEX_LEN}}}$");
            Regex::new(&pattern).expect("object id regex is valid")
        })
        .is_match(s)
}
