// Correlation and instance id generation

use uuid::Uuid;

/// Generates random ids.
pub struct IdGenerator;

impl IdGenerator {
    /// Short id (9 hex characters), used for correlation ids.
    pub fn next_short() -> String {
        Uuid::new_v4().simple().to_string()[..9].to_string()
    }

    /// Long id (32 hex characters), used for instance ids.
    pub fn next_long() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_and_uniqueness() {
        let a = IdGenerator::next_short();
        let b = IdGenerator::next_short();

        assert_eq!(a.len(), 9);
        assert_ne!(a, b);
        assert_eq!(IdGenerator::next_long().len(), 32);
    }
}
