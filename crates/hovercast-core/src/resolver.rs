#![forbid(unsafe_code)]

//! Channel-name resolution from thumbnail link hrefs.
//!
//! Thumbnail cards link to heterogeneous destinations: live channels
//! (`/somechannel`), site-wide VOD and clip pages (`/videos`, `/clip/...`),
//! channel subpages (`/somechannel/videos`, `/somechannel/about`), and site
//! sections (`/directory/...`). Only live-channel links are previewable;
//! everything else must resolve to `None` so the hover machine leaves the
//! card alone.
//!
//! Resolution is pure path classification: absolutize the href (relative
//! hrefs are joined against the page origin), split the path into non-empty
//! segments, and run the segment checks in [`ResolverPolicy::resolve`].
//! Malformed hrefs are silently ineligible — never logged, never an error.

use core::fmt;

use url::Url;

/// Base used to absolutize relative hrefs when no page origin is supplied.
pub const DEFAULT_ORIGIN: &str = "https://www.twitch.tv";

/// Exclusive upper bound on accepted channel-name length, in bytes.
///
/// Longer first segments are almost always slugs or tracking paths, not
/// logins.
pub const MAX_CHANNEL_NAME_LEN: usize = 30;

/// First path segments naming site-wide content pages, not channels.
pub const CONTENT_ROOTS: &[&str] = &["videos", "clip", "clips"];

/// First path segments naming site sections that are never a channel.
pub const SITE_SECTIONS: &[&str] = &[
    "directory",
    "settings",
    "subscriptions",
    "inventory",
    "wallet",
];

/// Second path segments marking a channel *subpage* (VODs, clips, about,
/// schedule, social lists) rather than the live channel itself.
pub const CHANNEL_SUBPAGES: &[&str] = &[
    "clip",
    "clips",
    "videos",
    "about",
    "schedule",
    "following",
    "followers",
];

/// A resolved live-channel login.
///
/// Only constructible from strings that survive the default policy's
/// segment rules, so an instance is always safe to interpolate into an
/// embed URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Wrap a known channel login.
    ///
    /// Returns `None` when the name would not survive resolution under the
    /// default policy (empty, at/over the length cap, or containing `.` or
    /// `/`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        ResolverPolicy::default()
            .eligible_segment(&name)
            .then_some(Self(name))
    }

    /// The login as it appeared in the link path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Classification rules for [`ResolverPolicy::resolve`].
///
/// The defaults are the production constants; tests substitute fields to pin
/// individual rules. There is no runtime configuration surface beyond the
/// page origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Base URL used to absolutize relative hrefs (the page origin).
    pub origin: String,
    /// Exclusive upper bound on accepted channel-name length, in bytes.
    pub max_channel_name_len: usize,
    /// First-segment values naming site-wide content pages.
    pub content_roots: &'static [&'static str],
    /// First-segment values naming non-channel site sections.
    pub site_sections: &'static [&'static str],
    /// Second-segment values naming channel subpages.
    pub channel_subpages: &'static [&'static str],
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_owned(),
            max_channel_name_len: MAX_CHANNEL_NAME_LEN,
            content_roots: CONTENT_ROOTS,
            site_sections: SITE_SECTIONS,
            channel_subpages: CHANNEL_SUBPAGES,
        }
    }
}

impl ResolverPolicy {
    /// Default rules with a specific page origin for relative hrefs.
    #[must_use]
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Classify an href; `Some` only for live-channel links.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<ChannelName> {
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let url = self.absolutize(href)?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
        let &first = segments.first()?;
        if self.content_roots.contains(&first) {
            return None;
        }
        if self.site_sections.contains(&first) {
            return None;
        }
        if let Some(&second) = segments.get(1)
            && self.channel_subpages.contains(&second)
        {
            return None;
        }
        self.eligible_segment(first)
            .then(|| ChannelName(first.to_owned()))
    }

    fn absolutize(&self, href: &str) -> Option<Url> {
        match Url::parse(href) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&self.origin).ok()?.join(href).ok()
            }
            Err(_) => None,
        }
    }

    fn eligible_segment(&self, segment: &str) -> bool {
        !segment.is_empty()
            && segment.len() < self.max_channel_name_len
            && !segment.contains('.')
            && !segment.contains('/')
    }
}

/// Classify `href` under the default policy.
#[must_use]
pub fn resolve(href: &str) -> Option<ChannelName> {
    ResolverPolicy::default().resolve(href)
}
