#![forbid(unsafe_code)]

//! `hovercast-web` binds the Hovercast engine to a real browser page.
//!
//! Design goals:
//! - **Thin DOM seam**: [`dom::DomSurface`] is the only code that touches the
//!   page; everything stateful lives in `hovercast-core`.
//! - **Single-threaded**: one `Rc<RefCell<_>>` driver serviced by the event
//!   loop, suitable for `wasm32-unknown-unknown` content scripts.
//! - **Observable**: every machine dispatch is buffered as a JSONL record the
//!   host can drain for triage.
//!
//! The JS-facing entry point is [`HoverPreview`], exported via `wasm-bindgen`.
//! The dispatch-trace schema in [`trace`] is target-independent and tested
//! natively.

/// CSS selector identifying thumbnail card links.
pub const THUMBNAIL_LINK_SELECTOR: &str = r#"a[data-a-target="preview-card-image-link"]"#;

/// Cards whose thumbnail renders without an offset parent (side-nav avatars)
/// are exempt from the visibility check.
pub const AVATAR_CARD_SELECTOR: &str = r#"div[data-a-target="side-nav-card-avatar"]"#;

/// Marker attribute stamped on every preview iframe this crate inserts.
pub const EMBED_MARKER_ATTR: &str = "data-hovercast-embed";

/// Marker attribute stamped on thumbnails hidden behind a preview.
pub const HIDDEN_IMAGE_MARKER_ATTR: &str = "data-hovercast-hidden";

/// Stable HovercastJS API semver for host-side compatibility checks.
///
/// Intentionally distinct from crate/package semver.
pub const HOVERCAST_JS_API_VERSION: &str = "1.0.0";

/// One-line API identity string surfaced in the contract snapshot.
pub const HOVERCAST_JS_API_LINE: &str =
    "HovercastJS: hover-intent Twitch previews (attach/detach/sweep/drain)";

/// Methods a JS host may rely on across minor versions.
pub const HOVERCAST_JS_PUBLIC_METHODS: [&str; 7] = [
    "apiVersion",
    "apiContract",
    "attach",
    "detach",
    "isAttached",
    "sweepOrphans",
    "drainDispatchJsonl",
];

/// Compatibility rules rendered into the contract snapshot.
pub const HOVERCAST_JS_VERSIONING_POLICY: [&str; 3] = [
    "apiVersion follows semver independently of crate versions",
    "apiContract may gain fields without a major bump; fields are never repurposed",
    "dispatch JSONL changes bump dispatchSchemaVersion",
];

pub mod trace;

#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod driver;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::HoverPreview;
