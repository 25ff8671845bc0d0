//! Share-link parsing, classification and deduplication.
//!
//! Everything here is synchronous and network-free: raw text is turned into
//! typed share links before any check is dispatched.
//!
//! ```
//! use pan_check::link::{classify, dedup, extract_candidates, ClassifiedLink};
//!
//! let text = "https://pan.quark.cn/s/abcdef 提取码: 1234\nhttps://pan.quark.cn/s/abcdef?pwd=1234";
//! let links: Vec<_> = extract_candidates(text)
//!     .into_iter()
//!     .filter_map(|c| match classify(c) {
//!         ClassifiedLink::Recognized(link) => Some(link),
//!         ClassifiedLink::Unrecognized(_) => None,
//!     })
//!     .collect();
//! let deduped = dedup(links);
//! assert_eq!(deduped.unique.len(), 1);
//! assert_eq!(deduped.duplicate_count, 1);
//! ```

mod classify;
mod dedup;
mod extract;
mod platform;

use serde::{Deserialize, Serialize};

pub use classify::classify;
pub use dedup::{dedup, Deduplicated};
pub use extract::extract_candidates;
pub use platform::Platform;

/// A fragment of input text believed to be a share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// The text as it appeared in the input.
    pub original: String,
    /// Normalized absolute URL. `None` for a bare token that isn't a URL at all.
    pub url: Option<String>,
    /// Extraction code found next to the URL (same or following line).
    pub password: Option<String>,
}

/// A link bound to a platform and its share id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareLink {
    pub platform: Platform,
    /// Platform-specific share identifier (Baidu `surl`, Quark `pwd_id`, ...).
    pub share_id: String,
    /// Extraction code. A code in the URL wins over one found in surrounding text.
    pub password: Option<String>,
    /// Normalized URL the link was classified from.
    pub url: String,
    /// Original input text.
    pub original: String,
}

impl ShareLink {
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            platform: self.platform,
            share_id: self.share_id.clone(),
            password: self.password.clone(),
        }
    }
}

/// Outcome of classification. Every candidate becomes exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedLink {
    Recognized(ShareLink),
    Unrecognized(LinkCandidate),
}

/// Identity used to detect duplicate submissions of the same share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    pub platform: Platform,
    pub share_id: String,
    pub password: Option<String>,
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.password {
            Some(code) => write!(f, "{}:{}#{}", self.platform, self.share_id, code),
            None => write!(f, "{}:{}", self.platform, self.share_id),
        }
    }
}
