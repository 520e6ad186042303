//! Mapping rendered-view selections back to offsets in the source document.
//!
//! A fragment captured from the rendered document is located with an ordered set of
//! strategies, each a pure function over `(source, fragment)`. The first strategy that
//! produces a range wins. Every search takes the leftmost occurrence, so a fragment that
//! appears several times always resolves to its first occurrence.

use crate::app::whitespace::{advance_chars, normalize, retreat_chars, source_index_for_normalized};
use crate::domain::model::{MatchTier, ResolvedRange};
use crate::infra::config::Config;

const DEFAULT_ANCHOR_WINDOW: usize = 100;
const DEFAULT_MIN_ANCHOR_WORD_LEN: usize = 3;

/// Tunables for the resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Characters searched on either side of a normalised anchor.
    pub anchor_window: usize,
    /// Shortest word (in characters) usable as a bracketing anchor.
    pub min_anchor_word_len: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            anchor_window: DEFAULT_ANCHOR_WINDOW,
            min_anchor_word_len: DEFAULT_MIN_ANCHOR_WORD_LEN,
        }
    }
}

impl ResolverOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            anchor_window: config.editor.anchor_window,
            min_anchor_word_len: config.editor.min_anchor_word_len.max(1),
        }
    }
}

/// A successful resolution together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tier: MatchTier,
    pub range: ResolvedRange,
}

type TierFn = fn(&ResolverOptions, &str, &str) -> Option<ResolvedRange>;

const TIERS: [(MatchTier, TierFn); 3] = [
    (MatchTier::Exact, exact_match),
    (MatchTier::Normalized, normalized_match),
    (MatchTier::Bracketed, bracketed_match),
];

/// Stateless resolver applying the tiers in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ResolverOptions::from_config(config))
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `fragment` against `source`, returning `None` when no tier can place it.
    pub fn resolve(&self, source: &str, fragment: &str) -> Option<ResolvedRange> {
        self.resolve_with_tier(source, fragment)
            .map(|resolution| resolution.range)
    }

    /// Like [`Resolver::resolve`] but also reports which tier matched.
    pub fn resolve_with_tier(&self, source: &str, fragment: &str) -> Option<Resolution> {
        if fragment.is_empty() {
            return None;
        }

        let resolution = TIERS.iter().find_map(|(tier, run)| {
            let range = run(&self.options, source, fragment);
            tracing::trace!(tier = %tier, matched = range.is_some(), "resolution tier attempted");
            range.map(|range| Resolution { tier: *tier, range })
        });

        match &resolution {
            Some(found) => tracing::debug!(
                tier = %found.tier,
                start = found.range.start,
                end = found.range.end,
                "resolved selection"
            ),
            None => tracing::debug!(fragment_len = fragment.len(), "selection not found in source"),
        }

        resolution
    }
}

/// Resolve with default options.
pub fn resolve(source: &str, fragment: &str) -> Option<ResolvedRange> {
    Resolver::default().resolve(source, fragment)
}

/// Leftmost literal occurrence of the fragment.
pub fn exact_match(_: &ResolverOptions, source: &str, fragment: &str) -> Option<ResolvedRange> {
    let start = source.find(fragment)?;
    Some(ResolvedRange::from_source(source, start, start + fragment.len()))
}

/// Locate the fragment after collapsing whitespace on both sides.
///
/// The normalised match only fixes an anchor. The literal fragment is searched for
/// within `anchor_window` characters of that anchor; failing that, the normalised span
/// is projected back onto the source so the returned text is always a real slice of it.
pub fn normalized_match(
    options: &ResolverOptions,
    source: &str,
    fragment: &str,
) -> Option<ResolvedRange> {
    let normalized_fragment = normalize(fragment);
    if normalized_fragment.trim().is_empty() {
        return None;
    }
    let normalized_source = normalize(source);
    let normalized_start = normalized_source.find(&normalized_fragment)?;
    let anchor = source_index_for_normalized(source, normalized_start);

    let window_start = retreat_chars(source, anchor, options.anchor_window);
    let window_end = advance_chars(
        source,
        anchor,
        fragment.chars().count() + options.anchor_window,
    );
    if let Some(local) = source[window_start..window_end].find(fragment) {
        let start = window_start + local;
        return Some(ResolvedRange::from_source(source, start, start + fragment.len()));
    }

    let end = source_index_for_normalized(source, normalized_start + normalized_fragment.len());
    (end >= anchor).then(|| ResolvedRange::from_source(source, anchor, end))
}

/// Bracket the span between the first and last distinctive words of the fragment.
///
/// Words shorter than `min_anchor_word_len` are too common to anchor on and are
/// skipped. Both words are matched leftmost, so the span may cover unrelated text when
/// the words also occur earlier in the document.
pub fn bracketed_match(
    options: &ResolverOptions,
    source: &str,
    fragment: &str,
) -> Option<ResolvedRange> {
    let mut anchors = fragment
        .split_whitespace()
        .filter(|word| word.chars().count() >= options.min_anchor_word_len);
    let first_word = anchors.next()?;
    let last_word = anchors.last().unwrap_or(first_word);

    let start = source.find(first_word)?;
    let last_start = start + source[start..].find(last_word)?;
    Some(ResolvedRange::from_source(source, start, last_start + last_word.len()))
}
