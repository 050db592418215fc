#![forbid(unsafe_code)]

//! Core: channel resolution, embed URLs, and the hover-intent state machine.
//!
//! # Role in Hovercast
//! `hovercast-core` is the deterministic engine. It decides *whether* a
//! hovered link is previewable, *when* a preview should start and stop, and
//! *what* embed URL to load — without ever touching a DOM node or a host
//! timer.
//!
//! # Primary responsibilities
//! - **resolver**: classify link hrefs into live channels vs. everything else.
//! - **embed**: build the allowlist-gated player embed URL.
//! - **machine**: debounce pointer traffic into start/stop intent, emitting
//!   timer commands for the host scheduler.
//! - **surface**: the capability trait the machine drives a renderer through.
//!
//! # How it fits in the system
//! The web adapter (`hovercast-web`) implements [`surface::PreviewSurface`]
//! over `web-sys`, forwards pointer events and fired timers into
//! [`machine::HoverIntentMachine`], and applies the returned
//! [`machine::TimerOps`]. Because every entry point returns a
//! [`machine::HoverDispatch`] record, the full timing model is testable
//! natively with a scripted fake surface.

pub mod embed;
pub mod machine;
pub mod resolver;
pub mod surface;

pub use embed::{DEFAULT_QUALITY, embed_url};
pub use machine::{
    HoverConfig, HoverDispatch, HoverIntentMachine, HoverOutcome, HoverPhase, StartGeneration,
    StartTimerOp, StopGeneration, StopTimerOp, TimerOps,
};
pub use resolver::{ChannelName, ResolverPolicy};
pub use surface::{PreviewSurface, RenderOutcome, RenderSkip, RevertOutcome};
