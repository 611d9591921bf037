use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of a [`UrlHash`]
pub const URL_HASH_LEN: usize = 16;

/// Fixed-size digest of a URL, used as the sort and de-duplication key
///
/// Two distinct URLs with the same digest are treated as the same page.
/// Ordering is plain lexicographic byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UrlHash(pub [u8; URL_HASH_LEN]);

impl UrlHash {
    /// Computes the digest of a URL string
    ///
    /// # Examples
    ///
    /// ```
    /// use ripple_frontier::page::UrlHash;
    ///
    /// let a = UrlHash::of("https://example.com/");
    /// assert_eq!(a, UrlHash::of("https://example.com/"));
    /// assert_ne!(a, UrlHash::of("https://example.com/other"));
    /// ```
    pub fn of(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        let mut bytes = [0u8; URL_HASH_LEN];
        bytes.copy_from_slice(&digest[..URL_HASH_LEN]);
        Self(bytes)
    }

    /// Leading eight bytes as a big-endian integer, used for routing
    pub fn prefix_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(head)
    }

    pub fn as_bytes(&self) -> &[u8; URL_HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for UrlHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
