use rand::Rng;

/// Characters that survive being read aloud over the phone (no 0/O, 1/I/L)
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";
const CODE_LENGTH: usize = 6;
const CODE_PREFIX: &str = "BK-";

/// Generate a short human-legible booking code such as `BK-7KQ2MX`.
/// Uniqueness is enforced by storage.
pub fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}
