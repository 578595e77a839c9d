use rand::RngExt;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of generated shortcodes (62^6, roughly 35.7 bits)
pub const GENERATED_LENGTH: usize = 6;

/// Source of candidate shortcodes.
///
/// Candidates need not be unique; the registry resamples until one can be
/// inserted.
pub trait ShortcodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform random alphanumeric codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomShortcodeGenerator;

impl ShortcodeGenerator for RandomShortcodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..GENERATED_LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
