//! Human-typable passphrase generation for new accounts.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Built-in word list used when none is configured.
pub const DEFAULT_WORDS: [&str; 48] = [
    "Table", "Chair", "Lamp", "Book", "Phone", "Desk", "Window", "House", "Tree", "Paper", "Door",
    "Floor", "Water", "Coffee", "Music", "Mountain", "River", "Ocean", "Cloud", "Flower", "Garden",
    "School", "Office", "Market", "Store", "Glass", "Bottle", "Plate", "Spoon", "Fork", "Knife",
    "Bread", "Cheese", "Apple", "Orange", "Banana", "Carrot", "Potato", "Tomato", "Onion", "Pepper",
    "Sugar", "Sunshine", "Rainbow", "Thunder", "Planet", "Galaxy", "Universe",
];

/// Built-in separator set.
pub const DEFAULT_SEPARATORS: &str = "*-.";

/// Number of words in a passphrase.
pub const WORDS_PER_PASSPHRASE: usize = 3;

/// Credential generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Word list; empty means the built-in list
    #[serde(default)]
    pub words: Vec<String>,
    /// Separator characters; empty means `*-.`
    #[serde(default)]
    pub separators: String,
}

/// Generates passphrases shaped `Word{sep}Word{sep}Word`.
///
/// Every draw comes from the operating system CSPRNG. Words and separators are
/// picked with `rand`'s uniform range sampling, which rejects out-of-range
/// samples instead of reducing modulo the list length, so selection stays
/// unbiased for list sizes that are not a power of two.
#[derive(Debug, Clone)]
pub struct CredentialGenerator {
    words: Vec<String>,
    separators: Vec<char>,
}

impl CredentialGenerator {
    pub fn new(config: &CredentialConfig) -> Self {
        let words: Vec<String> = config
            .words
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        let words = if words.is_empty() {
            DEFAULT_WORDS.iter().map(|w| w.to_string()).collect()
        } else {
            words
        };

        let separators: Vec<char> = config
            .separators
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let separators = if separators.is_empty() {
            DEFAULT_SEPARATORS.chars().collect()
        } else {
            separators
        };

        Self { words, separators }
    }

    /// Produces a fresh passphrase.
    pub fn generate(&self) -> String {
        let mut rng = OsRng;
        let mut passphrase = String::new();

        for i in 0..WORDS_PER_PASSPHRASE {
            if i > 0 {
                // Lists are non-empty by construction.
                if let Some(sep) = self.separators.choose(&mut rng) {
                    passphrase.push(*sep);
                }
            }
            if let Some(word) = self.words.choose(&mut rng) {
                passphrase.push_str(word);
            }
        }

        passphrase
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn separators(&self) -> &[char] {
        &self.separators
    }
}

impl Default for CredentialGenerator {
    fn default() -> Self {
        Self::new(&CredentialConfig::default())
    }
}
