//! Managed region handling inside the target file.
//!
//! The region is bracketed by a start and end marker line. Everything
//! outside it belongs to the user or to other tools and is never touched
//! beyond trimming surrounding whitespace.

use crate::config::HostConfig;

/// Marker opening the managed region.
pub const START_MARKER: &str = "# --- SWITCHHOSTS_CONTENT_START ---";

/// Marker closing the managed region.
pub const END_MARKER: &str = "# --- SWITCHHOSTS_CONTENT_END ---";

/// Comment prefix written before each injected config's name.
pub const HEADER_PREFIX: &str = "# active: ";

/// Marker pair and header format of the managed region.
///
/// # Example
///
/// ```
/// use switch_hosts::{HostConfig, ManagedBlock};
///
/// let block = ManagedBlock::default();
/// let mut dev = HostConfig::new("dev", "10.0.0.1 dev.local");
/// dev.is_active = true;
///
/// let merged = block.inject("127.0.0.1 localhost", [&dev]);
/// assert!(merged.contains("# active: dev\n10.0.0.1 dev.local\n"));
/// assert_eq!(block.strip(&merged), "127.0.0.1 localhost");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedBlock {
    /// Line opening the region.
    pub start_marker: String,
    /// Line closing the region.
    pub end_marker: String,
    /// Prefix of the per-config header comment.
    pub header_prefix: String,
}

impl ManagedBlock {
    /// Creates a block with custom markers.
    #[must_use]
    pub fn new(
        start_marker: impl Into<String>,
        end_marker: impl Into<String>,
        header_prefix: impl Into<String>,
    ) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
            header_prefix: header_prefix.into(),
        }
    }

    /// Removes the managed region from `blob`.
    ///
    /// Without a start marker the blob is returned unchanged. With a start
    /// marker and a later end marker, the text around the region is joined
    /// and trimmed. A start marker with no end marker after it drops
    /// everything from the start marker onward.
    #[must_use]
    pub fn strip(&self, blob: &str) -> String {
        let Some(start) = blob.find(&self.start_marker) else {
            return blob.to_string();
        };
        let prefix = &blob[..start];
        let after_start = start + self.start_marker.len();

        match blob[after_start..].find(&self.end_marker) {
            Some(pos) => {
                let suffix = &blob[after_start + pos + self.end_marker.len()..];
                format!("{prefix}{suffix}").trim().to_string()
            }
            None => {
                tracing::warn!("Managed region has no end marker, truncating at start marker");
                prefix.trim().to_string()
            }
        }
    }

    /// Returns the canonical system base of `blob`: the managed region
    /// stripped and surrounding whitespace trimmed.
    ///
    /// Unlike [`strip`](Self::strip), unmarked input is trimmed too, so the
    /// system config's content is always this trimmed form and the first
    /// apply on an unmarked file already matches every later apply byte
    /// for byte.
    #[must_use]
    pub fn base_of(&self, blob: &str) -> String {
        self.strip(blob).trim().to_string()
    }

    /// Appends the managed region holding every active non-system config
    /// of `configs`, in iteration order, to `base`.
    #[must_use]
    pub fn inject<'a, I>(&self, base: &str, configs: I) -> String
    where
        I: IntoIterator<Item = &'a HostConfig>,
    {
        let mut out = String::with_capacity(base.len() + 128);
        out.push_str(base);
        out.push_str("\n\n");
        out.push_str(&self.start_marker);
        out.push('\n');

        for config in configs.into_iter().filter(|c| c.is_injected()) {
            out.push('\n');
            out.push_str(&self.header_prefix);
            out.push_str(&config.name);
            out.push('\n');
            out.push_str(&config.content);
            if !config.content.ends_with('\n') {
                out.push('\n');
            }
        }

        out.push_str(&self.end_marker);
        out.push('\n');
        out
    }

    /// Returns `true` if `blob` contains either marker.
    #[must_use]
    pub fn contains_marker(&self, blob: &str) -> bool {
        blob.contains(&self.start_marker) || blob.contains(&self.end_marker)
    }
}

impl Default for ManagedBlock {
    fn default() -> Self {
        Self::new(START_MARKER, END_MARKER, HEADER_PREFIX)
    }
}
