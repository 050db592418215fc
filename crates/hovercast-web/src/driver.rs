#![forbid(unsafe_code)]

//! Single-threaded glue between the hover machine and the page.
//!
//! The driver owns the machine, the DOM surface, the two outstanding
//! timeouts, and the dispatch trace. It lives behind `Rc<RefCell<_>>` and
//! hands timer callbacks a `Weak` to itself, so a detached (dropped) driver
//! silently absorbs any callbacks still queued on the event loop. Dropping a
//! [`Timeout`] clears the underlying `setTimeout`, which keeps the pending
//! slots an exact mirror of the host's armed timers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gloo::timers::callback::Timeout;
use hovercast_core::{
    HoverConfig, HoverDispatch, HoverIntentMachine, PreviewSurface, StartGeneration, StartTimerOp,
    StopGeneration, StopTimerOp,
};
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, MouseEvent, Node};

use crate::THUMBNAIL_LINK_SELECTOR;
use crate::dom::{DomSurface, DomSurfaceError};
use crate::trace::DispatchTrace;

/// Card link the event landed in, if any.
fn hover_target(event: &MouseEvent) -> Option<Element> {
    event
        .target()?
        .dyn_into::<Element>()
        .ok()?
        .closest(THUMBNAIL_LINK_SELECTOR)
        .ok()
        .flatten()
}

fn delay_ms(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}

/// Event-loop driver for one attached document.
pub struct PreviewDriver {
    machine: HoverIntentMachine<Element>,
    surface: DomSurface,
    trace: DispatchTrace,
    start_timeout: Option<Timeout>,
    stop_timeout: Option<Timeout>,
    self_ref: Weak<RefCell<PreviewDriver>>,
}

impl PreviewDriver {
    pub fn new(surface: DomSurface, config: HoverConfig) -> Rc<RefCell<Self>> {
        Rc::new_cyclic(|self_ref| {
            RefCell::new(Self {
                machine: HoverIntentMachine::new(config),
                surface,
                trace: DispatchTrace::default(),
                start_timeout: None,
                stop_timeout: None,
                self_ref: self_ref.clone(),
            })
        })
    }

    #[must_use]
    pub fn document(&self) -> Document {
        self.surface.document().clone()
    }

    /// Delegated `mouseover` entry point.
    pub fn pointer_over(&mut self, event: &MouseEvent) {
        let Some(target) = hover_target(event) else {
            return;
        };
        let dispatch = self.machine.pointer_enter(&self.surface, &target);
        self.apply(dispatch);
    }

    /// Delegated `mouseout` entry point.
    pub fn pointer_out(&mut self, event: &MouseEvent) {
        let target = hover_target(event);
        // Moving between a card's own descendants is not an exit; the
        // machine only stops previews once the pointer truly leaves.
        let pointer_exited = target.as_ref().is_none_or(|target| {
            match event
                .related_target()
                .and_then(|related| related.dyn_into::<Node>().ok())
            {
                Some(related) => !target.contains(Some(&related)),
                None => true,
            }
        });
        let dispatch = self.machine.pointer_leave(target.as_ref(), pointer_exited);
        self.apply(dispatch);
    }

    fn start_fired(&mut self, generation: StartGeneration) {
        self.start_timeout = None;
        let dispatch = self.machine.start_elapsed(&mut self.surface, generation);
        self.apply(dispatch);
    }

    fn stop_fired(&mut self, generation: StopGeneration) {
        self.stop_timeout = None;
        let dispatch = self.machine.stop_elapsed(&mut self.surface, generation);
        self.apply(dispatch);
    }

    /// Reset hover state for a fresh attach, sweeping stale nodes first.
    ///
    /// Returns the number of orphaned preview nodes repaired.
    pub fn attach_reset(&mut self) -> Result<usize, DomSurfaceError> {
        let repaired = self.surface.sweep_orphans()?;
        if repaired > 0 {
            info!(
                target: "hovercast_web::driver",
                repaired,
                "cleared orphaned previews on attach"
            );
        }
        let dispatch = self.machine.reset();
        self.apply(dispatch);
        Ok(repaired)
    }

    /// Tear down for detach: revert the live preview and drop all timers.
    pub fn detach_cleanup(&mut self) {
        if let Some(active) = self.machine.active().cloned()
            && let Err(error) = self.surface.revert_preview(&active)
        {
            warn!(
                target: "hovercast_web::driver",
                error = %error,
                "failed to revert active preview on detach"
            );
        }
        let dispatch = self.machine.reset();
        self.apply(dispatch);
    }

    pub fn sweep_orphans(&self) -> Result<usize, DomSurfaceError> {
        self.surface.sweep_orphans()
    }

    pub fn drain_trace_jsonl(&mut self) -> Vec<String> {
        self.trace.drain_jsonl()
    }

    /// Execute a dispatch's timer commands and record it.
    ///
    /// Assigning a timeout slot drops (and thereby clears) whatever was
    /// armed there, so `Schedule` doubles as replace.
    fn apply(&mut self, dispatch: HoverDispatch) {
        match dispatch.timer.start {
            Some(StartTimerOp::Schedule { generation, delay }) => {
                let driver = self.self_ref.clone();
                self.start_timeout = Some(Timeout::new(delay_ms(delay), move || {
                    if let Some(driver) = driver.upgrade() {
                        driver.borrow_mut().start_fired(generation);
                    }
                }));
            }
            Some(StartTimerOp::Cancel) => self.start_timeout = None,
            None => {}
        }
        match dispatch.timer.stop {
            Some(StopTimerOp::Schedule { generation, delay }) => {
                let driver = self.self_ref.clone();
                self.stop_timeout = Some(Timeout::new(delay_ms(delay), move || {
                    if let Some(driver) = driver.upgrade() {
                        driver.borrow_mut().stop_fired(generation);
                    }
                }));
            }
            Some(StopTimerOp::Cancel) => self.stop_timeout = None,
            None => {}
        }
        self.trace.push(&dispatch);
    }
}
