//! # Password module
//!
//! This module provide password generators used to protect the master account
//! of database instances.

use rand::{seq::SliceRandom, Rng};

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_LENGTH: usize = 27;

pub const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &[u8] = b"0123456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=";

// -----------------------------------------------------------------------------
// Generator trait

/// source of new passwords, a generated password must never be logged
pub trait Generator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> Generator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

// -----------------------------------------------------------------------------
// Random structure

/// generates passwords from the thread local random number generator
#[derive(Clone, Debug)]
pub struct Random {
    pub length: usize,
}

impl Default for Random {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
        }
    }
}

impl Generator for Random {
    fn generate(&self) -> String {
        generate(&mut rand::thread_rng(), self.length)
    }
}

// -----------------------------------------------------------------------------
// helpers

/// returns a password of the given length, which contains at least one
/// character of each class when the length allows it
pub fn generate<R>(rng: &mut R, length: usize) -> String
where
    R: Rng + ?Sized,
{
    let classes = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS];
    let alphabet = classes.concat();

    let mut buf: Vec<u8> = classes
        .iter()
        .take(length)
        .filter_map(|class| class.choose(rng).copied())
        .collect();

    while buf.len() < length {
        buf.push(alphabet[rng.gen_range(0..alphabet.len())]);
    }

    buf.shuffle(rng);
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn generate_respects_length_and_classes() {
        let mut rng = StdRng::seed_from_u64(42);
        let password = generate(&mut rng, DEFAULT_LENGTH);

        assert_eq!(password.len(), DEFAULT_LENGTH);
        assert!(password.bytes().any(|c| LOWERCASE.contains(&c)));
        assert!(password.bytes().any(|c| UPPERCASE.contains(&c)));
        assert!(password.bytes().any(|c| DIGITS.contains(&c)));
        assert!(password.bytes().any(|c| SYMBOLS.contains(&c)));
    }

    #[test]
    fn generate_is_deterministic_for_a_seed() {
        let first = generate(&mut StdRng::seed_from_u64(7), 16);
        let second = generate(&mut StdRng::seed_from_u64(7), 16);

        assert_eq!(first, second);
    }

    #[test]
    fn generate_short_password() {
        let password = generate(&mut StdRng::seed_from_u64(1), 2);

        assert_eq!(password.len(), 2);
    }

    #[test]
    fn random_generates_fresh_passwords() {
        let generator = Random::default();

        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn closures_are_generators() {
        let generator = || "super-secret".to_string();

        assert_eq!(Generator::generate(&generator), "super-secret");
    }
}
