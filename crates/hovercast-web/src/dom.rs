#![forbid(unsafe_code)]

//! DOM implementation of the preview surface.
//!
//! All page mutations are marker-driven: every inserted iframe carries
//! [`EMBED_MARKER_ATTR`] and every hidden thumbnail carries
//! [`HIDDEN_IMAGE_MARKER_ATTR`], so reverts and orphan sweeps only ever touch
//! nodes this crate created. None of these calls dispatch DOM events
//! synchronously, which keeps the single-threaded driver re-entrancy free.

use hovercast_core::{
    ChannelName, DEFAULT_QUALITY, PreviewSurface, RenderOutcome, RenderSkip, RevertOutcome,
    embed_url,
};
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

use crate::{AVATAR_CARD_SELECTOR, EMBED_MARKER_ATTR, HIDDEN_IMAGE_MARKER_ATTR};

/// Page-level knobs for embed rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacePolicy {
    /// Hostname passed as the embed `parent` parameter.
    pub parent_hostname: String,
    /// Stream quality preset requested from the player.
    pub quality: String,
    /// Ancestor selector exempting a thumbnail from the visibility check.
    pub visibility_exception_selector: String,
}

impl SurfacePolicy {
    #[must_use]
    pub fn for_page(parent_hostname: impl Into<String>) -> Self {
        Self {
            parent_hostname: parent_hostname.into(),
            quality: DEFAULT_QUALITY.to_owned(),
            visibility_exception_selector: AVATAR_CARD_SELECTOR.to_owned(),
        }
    }
}

/// DOM mutation failure, with the browser's detail flattened to text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomSurfaceError {
    #[error("selector query failed: {0}")]
    Query(String),
    #[error("element creation failed: {0}")]
    Create(String),
    #[error("attribute update failed: {0}")]
    Attribute(String),
    #[error("inline style update failed: {0}")]
    Style(String),
    #[error("embed insertion failed: {0}")]
    Insert(String),
    #[error("thumbnail image is detached from the document")]
    DetachedImage,
    #[error("{0} is not an HTML element")]
    NotAnHtmlElement(&'static str),
}

fn js_detail(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl DomSurfaceError {
    fn query(value: JsValue) -> Self {
        Self::Query(js_detail(&value))
    }

    fn create(value: JsValue) -> Self {
        Self::Create(js_detail(&value))
    }

    fn attribute(value: JsValue) -> Self {
        Self::Attribute(js_detail(&value))
    }

    fn style(value: JsValue) -> Self {
        Self::Style(js_detail(&value))
    }

    fn insert(value: JsValue) -> Self {
        Self::Insert(js_detail(&value))
    }
}

/// Live-document preview surface.
///
/// Holds no per-card state; all bookkeeping lives in the markers themselves,
/// so a surface rebuilt after navigation still recognizes its own nodes.
#[derive(Debug, Clone)]
pub struct DomSurface {
    document: Document,
    policy: SurfacePolicy,
    embed_query: String,
    hidden_image_query: String,
}

impl DomSurface {
    #[must_use]
    pub fn new(document: Document, policy: SurfacePolicy) -> Self {
        Self {
            document,
            policy,
            embed_query: format!(r#"iframe[{EMBED_MARKER_ATTR}="true"]"#),
            hidden_image_query: format!(r#"img[{HIDDEN_IMAGE_MARKER_ATTR}="true"]"#),
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn policy(&self) -> &SurfacePolicy {
        &self.policy
    }

    fn always_visible(&self, image: &Element) -> bool {
        image
            .closest(&self.policy.visibility_exception_selector)
            .ok()
            .flatten()
            .is_some()
    }

    /// Remove every marked embed and unhide every marked thumbnail in the
    /// document, returning the number of nodes repaired.
    ///
    /// Covers previews orphaned by page rewrites that replaced a card's
    /// subtree while it was active.
    pub fn sweep_orphans(&self) -> Result<usize, DomSurfaceError> {
        let mut repaired = 0usize;

        let frames = self
            .document
            .query_selector_all(&self.embed_query)
            .map_err(DomSurfaceError::query)?;
        for index in 0..frames.length() {
            if let Some(node) = frames.item(index)
                && let Some(frame) = node.dyn_ref::<Element>()
            {
                frame.remove();
                repaired += 1;
            }
        }

        let images = self
            .document
            .query_selector_all(&self.hidden_image_query)
            .map_err(DomSurfaceError::query)?;
        for index in 0..images.length() {
            if let Some(node) = images.item(index)
                && let Some(image) = node.dyn_ref::<HtmlElement>()
            {
                image
                    .style()
                    .remove_property("display")
                    .map_err(DomSurfaceError::style)?;
                image
                    .remove_attribute(HIDDEN_IMAGE_MARKER_ATTR)
                    .map_err(DomSurfaceError::attribute)?;
                repaired += 1;
            }
        }

        Ok(repaired)
    }
}

impl PreviewSurface for DomSurface {
    type Target = Element;
    type Error = DomSurfaceError;

    fn hover_href(&self, target: &Element) -> Option<String> {
        // The raw attribute, not the resolved property: relative hrefs are
        // absolutized by the resolver against the configured origin.
        target.get_attribute("href")
    }

    fn preview_live(&self, target: &Element) -> bool {
        target
            .query_selector(&self.embed_query)
            .ok()
            .flatten()
            .is_some()
    }

    fn render_preview(
        &mut self,
        target: &Element,
        channel: &ChannelName,
    ) -> Result<RenderOutcome, DomSurfaceError> {
        let Some(image) = target
            .query_selector("img")
            .map_err(DomSurfaceError::query)?
        else {
            return Ok(RenderOutcome::Skipped(RenderSkip::MissingImage));
        };
        let image: HtmlElement = image
            .dyn_into()
            .map_err(|_| DomSurfaceError::NotAnHtmlElement("thumbnail image"))?;

        if image.offset_parent().is_none() && !self.always_visible(image.as_ref()) {
            return Ok(RenderOutcome::Skipped(RenderSkip::NotVisible));
        }
        // Captured before hiding the image, which zeroes its offsets.
        let width = image.offset_width();
        let height = image.offset_height();
        if width <= 0 || height <= 0 {
            return Ok(RenderOutcome::Skipped(RenderSkip::ZeroSized));
        }

        image
            .style()
            .set_property("display", "none")
            .map_err(DomSurfaceError::style)?;
        image
            .set_attribute(HIDDEN_IMAGE_MARKER_ATTR, "true")
            .map_err(DomSurfaceError::attribute)?;

        let src = embed_url(channel, &self.policy.parent_hostname, &self.policy.quality);
        let frame: HtmlElement = self
            .document
            .create_element("iframe")
            .map_err(DomSurfaceError::create)?
            .dyn_into()
            .map_err(|_| DomSurfaceError::NotAnHtmlElement("preview iframe"))?;
        frame
            .set_attribute("src", src.as_str())
            .map_err(DomSurfaceError::attribute)?;
        frame
            .set_attribute(EMBED_MARKER_ATTR, "true")
            .map_err(DomSurfaceError::attribute)?;
        frame
            .set_attribute("width", &width.to_string())
            .map_err(DomSurfaceError::attribute)?;
        frame
            .set_attribute("height", &height.to_string())
            .map_err(DomSurfaceError::attribute)?;
        let style = frame.style();
        style
            .set_property("border", "none")
            .map_err(DomSurfaceError::style)?;
        style
            .set_property("display", "block")
            .map_err(DomSurfaceError::style)?;
        // The pointer must keep hitting the card link underneath.
        style
            .set_property("pointer-events", "none")
            .map_err(DomSurfaceError::style)?;

        let parent = image.parent_node().ok_or(DomSurfaceError::DetachedImage)?;
        parent
            .insert_before(frame.as_ref(), Some(image.as_ref()))
            .map_err(DomSurfaceError::insert)?;
        Ok(RenderOutcome::Rendered)
    }

    fn revert_preview(&mut self, target: &Element) -> Result<RevertOutcome, DomSurfaceError> {
        let mut reverted = false;

        if let Some(frame) = target
            .query_selector(&self.embed_query)
            .map_err(DomSurfaceError::query)?
        {
            frame.remove();
            reverted = true;
        }

        if let Some(image) = target
            .query_selector(&self.hidden_image_query)
            .map_err(DomSurfaceError::query)?
        {
            let image: HtmlElement = image
                .dyn_into()
                .map_err(|_| DomSurfaceError::NotAnHtmlElement("thumbnail image"))?;
            image
                .style()
                .remove_property("display")
                .map_err(DomSurfaceError::style)?;
            image
                .remove_attribute(HIDDEN_IMAGE_MARKER_ATTR)
                .map_err(DomSurfaceError::attribute)?;
            reverted = true;
        } else if let Some(image) = target
            .query_selector("img")
            .map_err(DomSurfaceError::query)?
        {
            // Marker lost to a page rewrite; clear a leftover inline hide.
            let image: HtmlElement = image
                .dyn_into()
                .map_err(|_| DomSurfaceError::NotAnHtmlElement("thumbnail image"))?;
            if image.style().get_property_value("display").ok().as_deref() == Some("none") {
                image
                    .style()
                    .remove_property("display")
                    .map_err(DomSurfaceError::style)?;
                reverted = true;
            }
        }

        Ok(if reverted {
            RevertOutcome::Reverted
        } else {
            RevertOutcome::NothingToRevert
        })
    }
}
