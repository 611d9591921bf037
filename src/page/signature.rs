use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content fingerprint used for near-duplicate detection
///
/// A 64-bit SimHash over lowercase word tokens. Similar texts differ in few
/// bits, so similarity is the fraction of matching bits. `0` means "no
/// signature" (the page was never fetched or had no text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature(pub u64);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    /// Builds a signature from document text
    pub fn from_text(text: &str) -> Self {
        let mut weights = [0i64; 64];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bits = u64::from_le_bytes(head);
            for (i, weight) in weights.iter_mut().enumerate() {
                if bits & (1 << i) != 0 {
                    *weight += 1;
                } else {
                    *weight -= 1;
                }
            }
            tokens += 1;
        }

        if tokens == 0 {
            return Self::EMPTY;
        }

        let mut value = 0u64;
        for (i, weight) in weights.iter().enumerate() {
            if *weight > 0 {
                value |= 1 << i;
            }
        }
        // Keep a non-empty document distinguishable from "no signature"
        Self(if value == 0 { 1 } else { value })
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Fraction of equal bits, in `[0, 1]`
    pub fn similarity(&self, other: &Signature) -> f64 {
        let differing = (self.0 ^ other.0).count_ones();
        1.0 - differing as f64 / 64.0
    }

    /// Returns true when `similarity >= threshold`
    pub fn is_similar(&self, other: &Signature, threshold: f64) -> bool {
        self.similarity(other) >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_gives_empty_signature() {
        assert!(Signature::from_text("").is_empty());
        assert!(Signature::from_text("  ,;  ").is_empty());
    }

    #[test]
    fn test_identical_text_is_fully_similar() {
        let a = Signature::from_text("the quick brown fox");
        let b = Signature::from_text("The QUICK brown fox");
        assert_eq!(a.similarity(&b), 1.0);
        assert!(a.is_similar(&b, 0.99));
    }

    #[test]
    fn test_small_edit_stays_closer_than_unrelated_text() {
        let base = "crawl frontier engines track pages scores link graphs and fetch history \
                    across cycles using sorted stores and consolidation passes";
        let edited = format!("{} today", base);
        let unrelated = "completely different vocabulary about cooking pasta sauces";

        let a = Signature::from_text(base);
        let b = Signature::from_text(&edited);
        let c = Signature::from_text(unrelated);
        assert!(a.similarity(&b) > a.similarity(&c));
    }
}
