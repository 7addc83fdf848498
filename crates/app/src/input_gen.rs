//! Sample message generation.
//!
//! When no message is given, we generate text with mixed compressibility so
//! the LZ77 decision is visible in the metrics:
//! - Repeated sensor-style records (highly compressible)
//! - Word salad from a small vocabulary (moderately compressible)
//! - Random alphanumerics (incompressible)
//!
//! Output is always ASCII, so it is a valid payload string.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const WORDS: &[&str] = &[
    "light", "signal", "frame", "camera", "pulse", "bright", "dark", "sync", "link", "byte", "code",
    "lamp",
];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate `size_bytes` of sample message text.
pub fn generate_sample_message(seed: u64, size_bytes: usize) -> String {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut text = String::with_capacity(size_bytes + 64);

    while text.len() < size_bytes {
        let remaining = size_bytes - text.len();
        let section = remaining.min(rng.gen_range(32..=256));

        match rng.gen_range(0..10) {
            // 40% repeated records
            0..=3 => {
                let id: u8 = rng.gen_range(1..=9);
                let record = format!("sensor{id}=ok;");
                let start = text.len();
                while text.len() - start < section {
                    text.push_str(&record);
                }
            }

            // 40% words
            4..=7 => {
                let start = text.len();
                while text.len() - start < section {
                    text.push_str(WORDS[rng.gen_range(0..WORDS.len())]);
                    text.push(' ');
                }
            }

            // 20% random
            _ => {
                for _ in 0..section {
                    text.push(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char);
                }
            }
        }
    }

    text.truncate(size_bytes);
    text
}
