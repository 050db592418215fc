#![forbid(unsafe_code)]

//! Embed player URL construction.
//!
//! The player embed is gated by a domain allowlist: its `parent` query
//! parameter must name the embedding page's hostname or the player refuses
//! to load. Parameter set, values, and order are therefore part of the
//! produced contract and are pinned by tests.

use std::sync::LazyLock;

use url::Url;

use crate::resolver::ChannelName;

/// Quality preset requested for previews. Low bitrate keeps hover cheap.
pub const DEFAULT_QUALITY: &str = "360p";

static PLAYER_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://player.twitch.tv/").expect("player base URL parses"));

/// Build the muted, autoplaying, chrome-less preview URL for `channel`,
/// embeddable from a page served at `parent_hostname`.
#[must_use]
pub fn embed_url(channel: &ChannelName, parent_hostname: &str, quality: &str) -> Url {
    let mut url = PLAYER_BASE.clone();
    url.query_pairs_mut()
        .append_pair("channel", channel.as_str())
        .append_pair("parent", parent_hostname)
        .append_pair("muted", "true")
        .append_pair("quality", quality)
        .append_pair("autoplay", "true")
        .append_pair("controls", "false");
    url
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_QUALITY, embed_url};
    use crate::resolver::ChannelName;
    use pretty_assertions::assert_eq;

    fn channel(name: &str) -> ChannelName {
        ChannelName::new(name).expect("test channel name is valid")
    }

    #[test]
    fn produces_the_exact_contract_url() {
        let url = embed_url(&channel("somechannel"), "example.com", DEFAULT_QUALITY);
        assert_eq!(
            url.as_str(),
            "https://player.twitch.tv/?channel=somechannel&parent=example.com\
             &muted=true&quality=360p&autoplay=true&controls=false"
        );
    }

    #[test]
    fn quality_preset_is_caller_controlled() {
        let url = embed_url(&channel("somechannel"), "example.com", "480p");
        assert_eq!(
            url.query(),
            Some(
                "channel=somechannel&parent=example.com&muted=true\
                 &quality=480p&autoplay=true&controls=false"
            )
        );
    }

    #[test]
    fn underscores_pass_through_unencoded() {
        let url = embed_url(&channel("some_channel"), "www.twitch.tv", DEFAULT_QUALITY);
        assert!(url.as_str().contains("channel=some_channel"));
        assert!(url.as_str().contains("parent=www.twitch.tv"));
    }
}
