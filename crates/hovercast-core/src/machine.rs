#![forbid(unsafe_code)]

//! Hover-intent debouncing for thumbnail previews.
//!
//! Two cooperating timers turn raw pointer traffic into preview intent: a
//! hover delay before a preview starts (drive-by pointer travel stays
//! cheap) and a shorter leave delay before it stops (jitter across a card's
//! internal elements doesn't flicker the preview). The machine owns all
//! hover state and is host-agnostic: callers feed it pointer events and
//! fired timers, it answers with a [`HoverDispatch`] describing the outcome
//! plus [`TimerOps`] for the host scheduler to apply.
//!
//! # Timer contract
//!
//! The machine never touches host timers. Each dispatch carries at most one
//! op per timer kind:
//!
//! - `Schedule { generation, delay }` — clear that kind's outstanding
//!   timeout (if any) and arm a new one; on fire, call the matching
//!   `*_elapsed` entry point with `generation`.
//! - `Cancel` — clear that kind's outstanding timeout.
//!
//! Generations are monotonic per machine. A fired timer whose generation no
//! longer matches the pending slot is stale and dispatches to a no-op, so
//! even a host that fails to clear timeouts converges to the same state.
//!
//! # Error boundary
//!
//! Surface failures never propagate out of a dispatch. They are logged,
//! answered with a best-effort defensive revert, and reported as
//! [`HoverOutcome::Failed`].

use core::time::Duration;

use crate::resolver::{ChannelName, ResolverPolicy};
use crate::surface::{PreviewSurface, RenderOutcome, RenderSkip};

/// Delay between pointer-enter and preview start.
pub const DEFAULT_HOVER_DELAY: Duration = Duration::from_millis(350);

/// Grace period between pointer-exit and preview stop.
pub const DEFAULT_LEAVE_DELAY: Duration = Duration::from_millis(100);

/// Timing and resolution configuration for [`HoverIntentMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverConfig {
    /// How long the pointer must rest on a link before a preview starts.
    pub hover_delay: Duration,
    /// How long after pointer-exit an active preview survives.
    pub leave_delay: Duration,
    /// Link-classification rules for lazy channel resolution.
    pub resolver: ResolverPolicy,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            hover_delay: DEFAULT_HOVER_DELAY,
            leave_delay: DEFAULT_LEAVE_DELAY,
            resolver: ResolverPolicy::default(),
        }
    }
}

/// Identity of one scheduled preview start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StartGeneration(u64);

impl StartGeneration {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identity of one scheduled preview stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopGeneration(u64);

impl StopGeneration {
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

/// Host scheduling command for the start timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTimerOp {
    /// Replace any outstanding start timeout with a new one.
    Schedule {
        generation: StartGeneration,
        delay: Duration,
    },
    /// Clear the outstanding start timeout.
    Cancel,
}

/// Host scheduling command for the stop timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTimerOp {
    /// Replace any outstanding stop timeout with a new one.
    Schedule {
        generation: StopGeneration,
        delay: Duration,
    },
    /// Clear the outstanding stop timeout.
    Cancel,
}

/// Timer commands attached to one dispatch.
///
/// `None` means leave that timer alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerOps {
    pub start: Option<StartTimerOp>,
    pub stop: Option<StopTimerOp>,
}

impl TimerOps {
    /// No timer changes.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            start: None,
            stop: None,
        }
    }
}

/// Entry point recorded for one machine dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverPhase {
    PointerEnter,
    StartElapsed,
    PointerLeave,
    StopElapsed,
    Reset,
}

/// Deterministic result category for one machine dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    /// A start was scheduled, superseding any outstanding one.
    StartScheduled,
    /// The target is already active with a live preview; nothing to do.
    AlreadyActive,
    /// The hover delay elapsed and a preview was rendered.
    PreviewStarted { channel: ChannelName },
    /// The hover delay elapsed but the target already holds a marked
    /// preview this machine did not render; it is left alone.
    PreviewAlreadyLive,
    /// The hover delay elapsed but the renderer skipped. The target does
    /// not become active.
    StartSkipped { reason: RenderSkip },
    /// The hover delay elapsed on a link that resolves to no channel.
    Ineligible,
    /// As [`Self::Ineligible`], but the target was active: its stale
    /// preview was reverted.
    IneligibleReverted,
    /// Pointer left something that is not the active target.
    NotActive,
    /// Pointer moved between descendants of the active target.
    PointerStillInside,
    /// A stop was scheduled for the active target.
    StopScheduled,
    /// A stop is already pending for this target; its deadline stands.
    StopAlreadyPending,
    /// The leave delay elapsed and the preview was reverted.
    PreviewStopped,
    /// A fired timer's generation was superseded; no effects.
    StaleTimer,
    /// A surface call failed; state was defensively cleared.
    Failed { message: String },
    /// All hover state was cleared.
    Reset,
}

/// Result of one machine entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverDispatch {
    /// Monotonic dispatch counter (1-based), for trace ordering.
    pub seq: u64,
    pub phase: HoverPhase,
    pub outcome: HoverOutcome,
    pub timer: TimerOps,
}

#[derive(Debug, Clone)]
struct PendingStart<T> {
    target: T,
    generation: StartGeneration,
}

#[derive(Debug, Clone)]
struct PendingStop<T> {
    target: T,
    generation: StopGeneration,
}

/// Owns all hover state for one attached document.
///
/// `T` is the hover-target handle; the machine only needs cloneable
/// identity. Entry points are strictly serialized by the host's single
/// callback queue; the machine itself is synchronous.
///
/// Invariants held between dispatches:
/// - at most one target is active, and an active target was actually
///   rendered (its subtree holds the preview, its image is hidden);
/// - a pending stop always names the active target;
/// - a pending start mirrors exactly one outstanding host start timeout,
///   and likewise for the pending stop.
#[derive(Debug, Clone)]
pub struct HoverIntentMachine<T> {
    config: HoverConfig,
    active: Option<T>,
    pending_start: Option<PendingStart<T>>,
    pending_stop: Option<PendingStop<T>>,
    next_start_generation: u64,
    next_stop_generation: u64,
    next_seq: u64,
}

impl<T: Clone + PartialEq> HoverIntentMachine<T> {
    #[must_use]
    pub fn new(config: HoverConfig) -> Self {
        Self {
            config,
            active: None,
            pending_start: None,
            pending_stop: None,
            next_start_generation: 1,
            next_stop_generation: 1,
            next_seq: 1,
        }
    }

    /// Machine configuration.
    #[must_use]
    pub fn config(&self) -> &HoverConfig {
        &self.config
    }

    /// Target currently showing a preview, if any.
    #[must_use]
    pub fn active(&self) -> Option<&T> {
        self.active.as_ref()
    }

    /// Target with a scheduled, not yet fired, preview start.
    #[must_use]
    pub fn pending_start(&self) -> Option<(&T, StartGeneration)> {
        self.pending_start
            .as_ref()
            .map(|pending| (&pending.target, pending.generation))
    }

    /// Target with a scheduled, not yet fired, preview stop.
    #[must_use]
    pub fn pending_stop(&self) -> Option<(&T, StopGeneration)> {
        self.pending_stop
            .as_ref()
            .map(|pending| (&pending.target, pending.generation))
    }

    /// Pointer entered a thumbnail link.
    ///
    /// Callers only forward events whose target ancestry matched the link
    /// selector; non-matching pointer traffic never reaches the machine.
    pub fn pointer_enter<S>(&mut self, surface: &S, target: &T) -> HoverDispatch
    where
        S: PreviewSurface<Target = T>,
    {
        let mut timer = TimerOps::none();

        // Re-entering the target whose stop is pending revokes that stop:
        // the pointer never really left. A stop pending for a different
        // target keeps running.
        if self
            .pending_stop
            .as_ref()
            .is_some_and(|pending| pending.target == *target)
        {
            self.pending_stop = None;
            timer.stop = Some(StopTimerOp::Cancel);
        }

        if self.active.as_ref() == Some(target) && surface.preview_live(target) {
            return self.dispatch(HoverPhase::PointerEnter, HoverOutcome::AlreadyActive, timer);
        }

        // Only the most recent enter counts; every enter restarts the
        // debounce window.
        let generation = self.next_start_generation();
        self.pending_start = Some(PendingStart {
            target: target.clone(),
            generation,
        });
        timer.start = Some(StartTimerOp::Schedule {
            generation,
            delay: self.config.hover_delay,
        });
        self.dispatch(HoverPhase::PointerEnter, HoverOutcome::StartScheduled, timer)
    }

    /// Pointer left `target`, or left a non-link area when `None`.
    ///
    /// `pointer_exited` is the caller's containment verdict: true iff the
    /// pointer's new position is outside the target's subtree.
    pub fn pointer_leave(&mut self, target: Option<&T>, pointer_exited: bool) -> HoverDispatch {
        let mut timer = TimerOps::none();

        // Any scheduled start dies on the first leave, wherever it happened.
        if self.pending_start.take().is_some() {
            timer.start = Some(StartTimerOp::Cancel);
        }

        let outcome = match target {
            Some(target) if self.active.as_ref() == Some(target) => {
                if !pointer_exited {
                    HoverOutcome::PointerStillInside
                } else if self
                    .pending_stop
                    .as_ref()
                    .is_some_and(|pending| pending.target == *target)
                {
                    HoverOutcome::StopAlreadyPending
                } else {
                    let generation = self.next_stop_generation();
                    self.pending_stop = Some(PendingStop {
                        target: target.clone(),
                        generation,
                    });
                    timer.stop = Some(StopTimerOp::Schedule {
                        generation,
                        delay: self.config.leave_delay,
                    });
                    HoverOutcome::StopScheduled
                }
            }
            _ => HoverOutcome::NotActive,
        };
        self.dispatch(HoverPhase::PointerLeave, outcome, timer)
    }

    /// The start timer fired.
    pub fn start_elapsed<S>(
        &mut self,
        surface: &mut S,
        generation: StartGeneration,
    ) -> HoverDispatch
    where
        S: PreviewSurface<Target = T>,
    {
        let Some(pending) = self
            .pending_start
            .take_if(|pending| pending.generation == generation)
        else {
            return self.dispatch(
                HoverPhase::StartElapsed,
                HoverOutcome::StaleTimer,
                TimerOps::none(),
            );
        };

        let target = pending.target;
        let mut timer = TimerOps::none();
        match self.run_start(surface, &target, &mut timer) {
            Ok(outcome) => self.dispatch(HoverPhase::StartElapsed, outcome, timer),
            Err(error) => {
                let message = error.to_string();
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "hovercast_core::machine",
                    error = %message,
                    "preview start failed; reverting defensively"
                );
                let _ = surface.revert_preview(&target);
                self.active = None;
                self.dispatch(
                    HoverPhase::StartElapsed,
                    HoverOutcome::Failed { message },
                    timer,
                )
            }
        }
    }

    /// The stop timer fired.
    pub fn stop_elapsed<S>(&mut self, surface: &mut S, generation: StopGeneration) -> HoverDispatch
    where
        S: PreviewSurface<Target = T>,
    {
        let Some(pending) = self
            .pending_stop
            .take_if(|pending| pending.generation == generation)
        else {
            return self.dispatch(
                HoverPhase::StopElapsed,
                HoverOutcome::StaleTimer,
                TimerOps::none(),
            );
        };

        // State clears even when the revert fails below.
        if self.active.as_ref() == Some(&pending.target) {
            self.active = None;
        }
        match surface.revert_preview(&pending.target) {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "hovercast_core::machine", "preview stopped");
                self.dispatch(
                    HoverPhase::StopElapsed,
                    HoverOutcome::PreviewStopped,
                    TimerOps::none(),
                )
            }
            Err(error) => {
                let message = error.to_string();
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    target: "hovercast_core::machine",
                    error = %message,
                    "preview stop failed; state cleared anyway"
                );
                self.dispatch(
                    HoverPhase::StopElapsed,
                    HoverOutcome::Failed { message },
                    TimerOps::none(),
                )
            }
        }
    }

    /// Clear all hover state, cancelling outstanding timers.
    ///
    /// Generation counters are not rewound, so timers that already fired
    /// into the host queue stay stale after the reset.
    pub fn reset(&mut self) -> HoverDispatch {
        let mut timer = TimerOps::none();
        if self.pending_start.take().is_some() {
            timer.start = Some(StartTimerOp::Cancel);
        }
        if self.pending_stop.take().is_some() {
            timer.stop = Some(StopTimerOp::Cancel);
        }
        self.active = None;
        self.dispatch(HoverPhase::Reset, HoverOutcome::Reset, timer)
    }

    fn run_start<S>(
        &mut self,
        surface: &mut S,
        target: &T,
        timer: &mut TimerOps,
    ) -> Result<HoverOutcome, S::Error>
    where
        S: PreviewSurface<Target = T>,
    {
        // A different active target is stopped right away: the new hover
        // already waited out its own delay.
        if self.active.as_ref().is_some_and(|active| active != target) {
            if self.pending_stop.take().is_some() {
                timer.stop = Some(StopTimerOp::Cancel);
            }
            if let Some(old) = self.active.take() {
                surface.revert_preview(&old)?;
            }
        }

        let channel = surface
            .hover_href(target)
            .and_then(|href| self.config.resolver.resolve(&href));
        let Some(channel) = channel else {
            // The link stopped resolving while its preview was live (href
            // rewritten under us): tear the stale preview down.
            if self.active.as_ref() == Some(target) {
                self.active = None;
                surface.revert_preview(target)?;
                return Ok(HoverOutcome::IneligibleReverted);
            }
            return Ok(HoverOutcome::Ineligible);
        };

        if surface.preview_live(target) {
            return Ok(HoverOutcome::PreviewAlreadyLive);
        }

        match surface.render_preview(target, &channel)? {
            RenderOutcome::Rendered => {
                self.active = Some(target.clone());
                if self
                    .pending_stop
                    .as_ref()
                    .is_some_and(|pending| pending.target == *target)
                {
                    self.pending_stop = None;
                    timer.stop = Some(StopTimerOp::Cancel);
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    target: "hovercast_core::machine",
                    channel = %channel,
                    "preview started"
                );
                Ok(HoverOutcome::PreviewStarted { channel })
            }
            RenderOutcome::Skipped(reason) => Ok(HoverOutcome::StartSkipped { reason }),
        }
    }

    fn next_start_generation(&mut self) -> StartGeneration {
        let generation = StartGeneration(self.next_start_generation);
        self.next_start_generation = self.next_start_generation.saturating_add(1);
        generation
    }

    fn next_stop_generation(&mut self) -> StopGeneration {
        let generation = StopGeneration(self.next_stop_generation);
        self.next_stop_generation = self.next_stop_generation.saturating_add(1);
        generation
    }

    fn dispatch(
        &mut self,
        phase: HoverPhase,
        outcome: HoverOutcome,
        timer: TimerOps,
    ) -> HoverDispatch {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        HoverDispatch {
            seq,
            phase,
            outcome,
            timer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_HOVER_DELAY, DEFAULT_LEAVE_DELAY, HoverConfig, HoverDispatch, HoverIntentMachine,
        HoverOutcome, HoverPhase, StartGeneration, StartTimerOp, StopGeneration, StopTimerOp,
    };
    use crate::resolver::ChannelName;
    use crate::surface::{PreviewSurface, RenderOutcome, RevertOutcome};
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Debug, Default)]
    struct MapSurface {
        hrefs: BTreeMap<u32, String>,
        live: BTreeSet<u32>,
        fail_render: bool,
        renders: usize,
        reverts: usize,
    }

    #[derive(Debug)]
    struct SurfaceFailure;

    impl core::fmt::Display for SurfaceFailure {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str("surface failure")
        }
    }

    impl PreviewSurface for MapSurface {
        type Target = u32;
        type Error = SurfaceFailure;

        fn hover_href(&self, target: &u32) -> Option<String> {
            self.hrefs.get(target).cloned()
        }

        fn preview_live(&self, target: &u32) -> bool {
            self.live.contains(target)
        }

        fn render_preview(
            &mut self,
            target: &u32,
            _channel: &ChannelName,
        ) -> Result<RenderOutcome, SurfaceFailure> {
            if self.fail_render {
                return Err(SurfaceFailure);
            }
            self.renders += 1;
            self.live.insert(*target);
            Ok(RenderOutcome::Rendered)
        }

        fn revert_preview(&mut self, target: &u32) -> Result<RevertOutcome, SurfaceFailure> {
            self.reverts += 1;
            if self.live.remove(target) {
                Ok(RevertOutcome::Reverted)
            } else {
                Ok(RevertOutcome::NothingToRevert)
            }
        }
    }

    fn surface_with(target: u32, href: &str) -> MapSurface {
        let mut surface = MapSurface::default();
        surface.hrefs.insert(target, href.to_owned());
        surface
    }

    fn machine() -> HoverIntentMachine<u32> {
        HoverIntentMachine::new(HoverConfig::default())
    }

    fn start_generation(dispatch: &HoverDispatch) -> StartGeneration {
        match dispatch.timer.start {
            Some(StartTimerOp::Schedule { generation, .. }) => generation,
            other => panic!("expected a scheduled start, got {other:?}"),
        }
    }

    fn stop_generation(dispatch: &HoverDispatch) -> StopGeneration {
        match dispatch.timer.stop {
            Some(StopTimerOp::Schedule { generation, .. }) => generation,
            other => panic!("expected a scheduled stop, got {other:?}"),
        }
    }

    #[test]
    fn enter_schedules_start_with_the_hover_delay() {
        let surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let dispatch = machine.pointer_enter(&surface, &1);
        assert_eq!(dispatch.phase, HoverPhase::PointerEnter);
        assert_eq!(dispatch.outcome, HoverOutcome::StartScheduled);
        assert!(matches!(
            dispatch.timer.start,
            Some(StartTimerOp::Schedule { delay, .. }) if delay == DEFAULT_HOVER_DELAY
        ));
        assert_eq!(machine.pending_start().map(|(target, _)| *target), Some(1));
    }

    #[test]
    fn start_elapsed_renders_and_activates() {
        let mut surface = surface_with(1, "https://www.twitch.tv/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        let dispatch = machine.start_elapsed(&mut surface, generation);
        assert_eq!(
            dispatch.outcome,
            HoverOutcome::PreviewStarted {
                channel: ChannelName::new("somechannel").expect("valid channel")
            }
        );
        assert_eq!(machine.active(), Some(&1));
        assert!(surface.live.contains(&1));
    }

    #[test]
    fn a_second_enter_supersedes_the_first_start() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let first = start_generation(&machine.pointer_enter(&surface, &1));
        let second = start_generation(&machine.pointer_enter(&surface, &1));
        assert_ne!(first, second);
        let dispatch = machine.start_elapsed(&mut surface, first);
        assert_eq!(dispatch.outcome, HoverOutcome::StaleTimer);
        assert_eq!(surface.renders, 0);
        assert_eq!(machine.pending_start().map(|(_, g)| g), Some(second));
    }

    #[test]
    fn enter_while_active_and_live_is_a_no_op() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let dispatch = machine.pointer_enter(&surface, &1);
        assert_eq!(dispatch.outcome, HoverOutcome::AlreadyActive);
        assert_eq!(dispatch.timer.start, None);
        assert!(machine.pending_start().is_none());
    }

    #[test]
    fn leave_cancels_a_scheduled_start() {
        let surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        machine.pointer_enter(&surface, &1);
        let dispatch = machine.pointer_leave(Some(&1), true);
        assert_eq!(dispatch.outcome, HoverOutcome::NotActive);
        assert_eq!(dispatch.timer.start, Some(StartTimerOp::Cancel));
        assert!(machine.pending_start().is_none());
    }

    #[test]
    fn leave_without_a_target_cancels_the_scheduled_start() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));

        // A mouseout whose target matched no thumbnail link still kills
        // the pending start.
        let dispatch = machine.pointer_leave(None, true);
        assert_eq!(dispatch.outcome, HoverOutcome::NotActive);
        assert_eq!(dispatch.timer.start, Some(StartTimerOp::Cancel));
        assert!(machine.pending_start().is_none());

        let late = machine.start_elapsed(&mut surface, generation);
        assert_eq!(late.outcome, HoverOutcome::StaleTimer);
        assert_eq!(surface.renders, 0);
    }

    #[test]
    fn leave_of_the_active_target_schedules_a_stop() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let dispatch = machine.pointer_leave(Some(&1), true);
        assert_eq!(dispatch.outcome, HoverOutcome::StopScheduled);
        assert!(matches!(
            dispatch.timer.stop,
            Some(StopTimerOp::Schedule { delay, .. }) if delay == DEFAULT_LEAVE_DELAY
        ));
    }

    #[test]
    fn internal_pointer_moves_do_not_schedule_a_stop() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let dispatch = machine.pointer_leave(Some(&1), false);
        assert_eq!(dispatch.outcome, HoverOutcome::PointerStillInside);
        assert_eq!(dispatch.timer.stop, None);
        assert!(machine.pending_stop().is_none());
    }

    #[test]
    fn reentry_cancels_the_pending_stop() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let stop = stop_generation(&machine.pointer_leave(Some(&1), true));

        let dispatch = machine.pointer_enter(&surface, &1);
        assert_eq!(dispatch.outcome, HoverOutcome::AlreadyActive);
        assert_eq!(dispatch.timer.stop, Some(StopTimerOp::Cancel));

        let late = machine.stop_elapsed(&mut surface, stop);
        assert_eq!(late.outcome, HoverOutcome::StaleTimer);
        assert_eq!(machine.active(), Some(&1));
        assert_eq!(surface.reverts, 0);
    }

    #[test]
    fn a_repeated_leave_keeps_the_original_stop_deadline() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let stop = stop_generation(&machine.pointer_leave(Some(&1), true));
        let dispatch = machine.pointer_leave(Some(&1), true);
        assert_eq!(dispatch.outcome, HoverOutcome::StopAlreadyPending);
        assert_eq!(dispatch.timer.stop, None);
        assert_eq!(machine.pending_stop().map(|(_, g)| g), Some(stop));
    }

    #[test]
    fn stop_elapsed_reverts_and_clears() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let stop = stop_generation(&machine.pointer_leave(Some(&1), true));
        let dispatch = machine.stop_elapsed(&mut surface, stop);
        assert_eq!(dispatch.outcome, HoverOutcome::PreviewStopped);
        assert_eq!(machine.active(), None);
        assert!(surface.live.is_empty());
    }

    #[test]
    fn switching_targets_reverts_the_old_preview_first() {
        let mut surface = surface_with(1, "/alpha");
        surface.hrefs.insert(2, "/beta".to_owned());
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);

        let generation = start_generation(&machine.pointer_enter(&surface, &2));
        let dispatch = machine.start_elapsed(&mut surface, generation);
        assert_eq!(
            dispatch.outcome,
            HoverOutcome::PreviewStarted {
                channel: ChannelName::new("beta").expect("valid channel")
            }
        );
        assert_eq!(machine.active(), Some(&2));
        assert!(!surface.live.contains(&1));
        assert!(surface.live.contains(&2));
    }

    #[test]
    fn ineligible_links_never_activate() {
        let mut surface = surface_with(1, "/directory/category/just-chatting");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        let dispatch = machine.start_elapsed(&mut surface, generation);
        assert_eq!(dispatch.outcome, HoverOutcome::Ineligible);
        assert_eq!(machine.active(), None);
        assert_eq!(surface.renders, 0);
    }

    #[test]
    fn render_failure_is_caught_and_reverted_defensively() {
        let mut surface = surface_with(1, "/somechannel");
        surface.fail_render = true;
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        let dispatch = machine.start_elapsed(&mut surface, generation);
        assert!(matches!(dispatch.outcome, HoverOutcome::Failed { .. }));
        assert_eq!(machine.active(), None);
        assert_eq!(surface.reverts, 1);
    }

    #[test]
    fn reset_cancels_outstanding_timers() {
        let mut surface = surface_with(1, "/somechannel");
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        let stop = stop_generation(&machine.pointer_leave(Some(&1), true));
        machine.pointer_enter(&surface, &2);

        let dispatch = machine.reset();
        assert_eq!(dispatch.outcome, HoverOutcome::Reset);
        assert_eq!(dispatch.timer.start, Some(StartTimerOp::Cancel));
        assert_eq!(dispatch.timer.stop, Some(StopTimerOp::Cancel));
        assert_eq!(machine.active(), None);

        let late = machine.stop_elapsed(&mut surface, stop);
        assert_eq!(late.outcome, HoverOutcome::StaleTimer);
    }

    #[test]
    fn leaving_a_non_active_target_only_cancels_the_start() {
        let mut surface = surface_with(1, "/alpha");
        surface.hrefs.insert(2, "/beta".to_owned());
        let mut machine = machine();
        let generation = start_generation(&machine.pointer_enter(&surface, &1));
        machine.start_elapsed(&mut surface, generation);
        machine.pointer_enter(&surface, &2);

        let dispatch = machine.pointer_leave(Some(&2), true);
        assert_eq!(dispatch.outcome, HoverOutcome::NotActive);
        assert_eq!(dispatch.timer.start, Some(StartTimerOp::Cancel));
        assert!(machine.pending_stop().is_none());
        assert_eq!(machine.active(), Some(&1));
    }
}
