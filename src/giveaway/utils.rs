use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

lazy_static! {
    static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

pub const SLUG_SUFFIX_LENGTH: usize = 6;
const SLUG_MAX_BASE_LENGTH: usize = 48;
const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// Turns the title into an URL-friendly slug with a random suffix, e.g.
// "Big Currency Giveaway!" -> "big-currency-giveaway-x8k2pq".
pub fn generate_slug(title: &str) -> String {
    generate_slug_with(&mut rand::rng(), title)
}

pub fn generate_slug_with<R: Rng + ?Sized>(rng: &mut R, title: &str) -> String {
    let lowercase = title.to_lowercase();
    let collapsed = SLUG_SEPARATOR_REGEX.replace_all(&lowercase, "-");
    let mut base = collapsed
        .trim_matches('-')
        .chars()
        .take(SLUG_MAX_BASE_LENGTH)
        .collect::<String>();
    base = base.trim_end_matches('-').to_string();
    if base.is_empty() {
        base = "giveaway".to_string();
    }

    let suffix = (0..SLUG_SUFFIX_LENGTH)
        .map(|_| SLUG_ALPHABET[rng.random_range(0..SLUG_ALPHABET.len())] as char)
        .collect::<String>();
    format!("{}-{}", base, suffix)
}

// Trims the value and drops it when nothing is left.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
