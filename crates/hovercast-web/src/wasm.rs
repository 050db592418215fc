#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use hovercast_core::{HoverConfig, ResolverPolicy};
use js_sys::{Array, Object, Reflect};
use tracing::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::MouseEvent;

use crate::dom::{DomSurface, SurfacePolicy};
use crate::driver::PreviewDriver;
use crate::trace::DISPATCH_SCHEMA_VERSION;
use crate::{
    EMBED_MARKER_ATTR, HIDDEN_IMAGE_MARKER_ATTR, HOVERCAST_JS_API_LINE, HOVERCAST_JS_API_VERSION,
    HOVERCAST_JS_PUBLIC_METHODS, HOVERCAST_JS_VERSIONING_POLICY, THUMBNAIL_LINK_SELECTOR,
};

#[wasm_bindgen(start)]
pub fn module_init() {
    console_error_panic_hook::set_once();
}

fn js_array_from_strings(items: &[&str]) -> Array {
    let arr = Array::new_with_length(items.len() as u32);
    for (idx, item) in items.iter().enumerate() {
        arr.set(idx as u32, JsValue::from_str(item));
    }
    arr
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// JS-facing hover preview controller for one document.
///
/// Owns the delegated listeners, the debounce timers, and the preview state;
/// `detach` (or dropping the instance) restores the page.
#[wasm_bindgen]
pub struct HoverPreview {
    driver: Rc<RefCell<PreviewDriver>>,
    listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl HoverPreview {
    /// Build a controller wired to this page's document and origin.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<HoverPreview, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window unavailable"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document unavailable"))?;
        let location = window.location();
        let hostname = location.hostname()?;
        let origin = location.origin()?;

        let surface = DomSurface::new(document, SurfacePolicy::for_page(hostname));
        let config = HoverConfig {
            resolver: ResolverPolicy::with_origin(origin),
            ..HoverConfig::default()
        };
        Ok(Self {
            driver: PreviewDriver::new(surface, config),
            listeners: Vec::new(),
        })
    }

    /// Stable HovercastJS API semver for host-side compatibility checks.
    ///
    /// This is intentionally distinct from crate/package semver.
    #[wasm_bindgen(js_name = apiVersion)]
    pub fn api_version(&self) -> String {
        HOVERCAST_JS_API_VERSION.to_owned()
    }

    /// Canonical API contract snapshot for deterministic host validation.
    ///
    /// Shape:
    /// `{ apiLine, apiVersion, packageName, packageVersion,
    ///    dispatchSchemaVersion, thumbnailSelector, embedMarkerAttr,
    ///    hiddenImageMarkerAttr, methods, versioningPolicy }`
    #[wasm_bindgen(js_name = apiContract)]
    pub fn api_contract(&self) -> JsValue {
        let obj = Object::new();
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("apiLine"),
            &JsValue::from_str(HOVERCAST_JS_API_LINE),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("apiVersion"),
            &JsValue::from_str(HOVERCAST_JS_API_VERSION),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("packageName"),
            &JsValue::from_str(env!("CARGO_PKG_NAME")),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("packageVersion"),
            &JsValue::from_str(env!("CARGO_PKG_VERSION")),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("dispatchSchemaVersion"),
            &JsValue::from_str(DISPATCH_SCHEMA_VERSION),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("thumbnailSelector"),
            &JsValue::from_str(THUMBNAIL_LINK_SELECTOR),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("embedMarkerAttr"),
            &JsValue::from_str(EMBED_MARKER_ATTR),
        );
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("hiddenImageMarkerAttr"),
            &JsValue::from_str(HIDDEN_IMAGE_MARKER_ATTR),
        );
        let methods = js_array_from_strings(&HOVERCAST_JS_PUBLIC_METHODS);
        let _ = Reflect::set(&obj, &JsValue::from_str("methods"), &methods);
        let versioning_policy = js_array_from_strings(&HOVERCAST_JS_VERSIONING_POLICY);
        let _ = Reflect::set(
            &obj,
            &JsValue::from_str("versioningPolicy"),
            &versioning_policy,
        );
        obj.into()
    }

    /// Install delegated hover listeners on the document.
    ///
    /// Idempotent: re-attaching tears the previous attachment down first.
    /// Returns the number of orphaned preview nodes repaired on the way in.
    pub fn attach(&mut self) -> Result<u32, JsValue> {
        self.detach();

        let repaired = self.driver.borrow_mut().attach_reset().map_err(js_error)?;
        let document = self.driver.borrow().document();

        let driver = Rc::downgrade(&self.driver);
        let over = EventListener::new(&document, "mouseover", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            if let Some(driver) = driver.upgrade() {
                driver.borrow_mut().pointer_over(event);
            }
        });

        let driver = Rc::downgrade(&self.driver);
        let out = EventListener::new(&document, "mouseout", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            if let Some(driver) = driver.upgrade() {
                driver.borrow_mut().pointer_out(event);
            }
        });

        self.listeners = vec![over, out];
        info!(target: "hovercast_web::wasm", repaired, "hover preview attached");
        Ok(u32::try_from(repaired).unwrap_or(u32::MAX))
    }

    /// Remove the listeners and restore the page. Safe to call repeatedly.
    pub fn detach(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        self.listeners.clear();
        self.driver.borrow_mut().detach_cleanup();
        debug!(target: "hovercast_web::wasm", "hover preview detached");
    }

    /// Whether hover listeners are currently installed.
    #[wasm_bindgen(js_name = isAttached)]
    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Remove marked embeds and unhide marked thumbnails document-wide,
    /// returning the number of nodes repaired.
    #[wasm_bindgen(js_name = sweepOrphans)]
    pub fn sweep_orphans(&self) -> Result<u32, JsValue> {
        let repaired = self.driver.borrow().sweep_orphans().map_err(js_error)?;
        Ok(u32::try_from(repaired).unwrap_or(u32::MAX))
    }

    /// Drain buffered dispatch records as JSONL lines, oldest first.
    #[wasm_bindgen(js_name = drainDispatchJsonl)]
    pub fn drain_dispatch_jsonl(&self) -> Array {
        let arr = Array::new();
        for line in self.driver.borrow_mut().drain_trace_jsonl() {
            arr.push(&JsValue::from_str(&line));
        }
        arr
    }
}

impl Drop for HoverPreview {
    fn drop(&mut self) {
        self.detach();
    }
}
