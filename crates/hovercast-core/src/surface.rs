#![forbid(unsafe_code)]

//! Rendering seam between the hover machine and the host page.
//!
//! The machine never touches the DOM. Everything it needs from the page —
//! href lookup, preview liveness, preview insertion and removal — goes
//! through [`PreviewSurface`], so the timing logic is testable with a
//! scripted fake and the real DOM adapter stays in the web crate.

use core::fmt;

use crate::resolver::ChannelName;

/// Host-page capabilities the hover machine drives.
///
/// `Target` is the hover-target handle: a DOM element in the browser, a
/// plain id in tests. Equality is identity over the host page's elements.
pub trait PreviewSurface {
    type Target: Clone + PartialEq;
    type Error: fmt::Display;

    /// The raw `href` attribute of the target link, if present.
    fn hover_href(&self, target: &Self::Target) -> Option<String>;

    /// Whether the target already contains a marked preview element.
    fn preview_live(&self, target: &Self::Target) -> bool;

    /// Swap the target's thumbnail image for an embedded preview.
    fn render_preview(
        &mut self,
        target: &Self::Target,
        channel: &ChannelName,
    ) -> Result<RenderOutcome, Self::Error>;

    /// Remove the preview and restore the thumbnail image. Idempotent.
    fn revert_preview(&mut self, target: &Self::Target) -> Result<RevertOutcome, Self::Error>;
}

/// What a render request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The preview element was inserted and the thumbnail image hidden.
    Rendered,
    /// Nothing was mutated; the target was not previewable right now.
    Skipped(RenderSkip),
}

/// Deterministic reason a render request was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSkip {
    /// The target contains no thumbnail image.
    MissingImage,
    /// The image is not laid out (no offset parent) and not inside an
    /// always-rendered exception region.
    NotVisible,
    /// The image has a zero rendered width or height.
    ZeroSized,
}

impl RenderSkip {
    /// Stable lowercase token for logs and dispatch traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingImage => "missing_image",
            Self::NotVisible => "not_visible",
            Self::ZeroSized => "zero_sized",
        }
    }
}

/// What a revert request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    /// A preview element and/or hidden image was restored.
    Reverted,
    /// The target had no preview state to undo.
    NothingToRevert,
}
