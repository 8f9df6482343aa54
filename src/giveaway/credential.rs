// Shared-secret passwords handed out to giveaway creators. Moderate strength,
// not a cryptographic key.
use rand::Rng;

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_password(length: usize) -> String {
    generate_password_with(&mut rand::rng(), length)
}

pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| {
            let index = rng.random_range(0..PASSWORD_ALPHABET.len());
            PASSWORD_ALPHABET[index] as char
        })
        .collect()
}
