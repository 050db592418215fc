#![forbid(unsafe_code)]

//! Bounded JSONL trace of machine dispatches.
//!
//! Every [`HoverDispatch`] the driver applies is flattened into a
//! [`DispatchRecord`] and buffered here until the host drains it via
//! `drainDispatchJsonl`. Records are plain data with a stable schema tag so
//! hosts can triage hover behavior without attaching a debugger to the page.

use hovercast_core::{HoverDispatch, HoverOutcome, HoverPhase, StartTimerOp, StopTimerOp};
use serde::Serialize;

/// Schema tag stamped on every record.
pub const DISPATCH_SCHEMA_VERSION: &str = "hovercast-dispatch-v1";

/// Bounded buffer limit; oldest records are dropped past this.
pub const MAX_DISPATCH_RECORDS: usize = 2048;

/// One timer command attached to a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerOpRecord {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

/// Flattened, serializable image of one [`HoverDispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub schema: &'static str,
    pub seq: u64,
    pub phase: &'static str,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timer: Option<TimerOpRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timer: Option<TimerOpRecord>,
}

fn phase_label(phase: HoverPhase) -> &'static str {
    match phase {
        HoverPhase::PointerEnter => "pointer_enter",
        HoverPhase::StartElapsed => "start_elapsed",
        HoverPhase::PointerLeave => "pointer_leave",
        HoverPhase::StopElapsed => "stop_elapsed",
        HoverPhase::Reset => "reset",
    }
}

fn clamped_ms(delay: core::time::Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn start_record(op: StartTimerOp) -> TimerOpRecord {
    match op {
        StartTimerOp::Schedule { generation, delay } => TimerOpRecord {
            op: "schedule",
            generation: Some(generation.as_u64()),
            delay_ms: Some(clamped_ms(delay)),
        },
        StartTimerOp::Cancel => TimerOpRecord {
            op: "cancel",
            generation: None,
            delay_ms: None,
        },
    }
}

fn stop_record(op: StopTimerOp) -> TimerOpRecord {
    match op {
        StopTimerOp::Schedule { generation, delay } => TimerOpRecord {
            op: "schedule",
            generation: Some(generation.as_u64()),
            delay_ms: Some(clamped_ms(delay)),
        },
        StopTimerOp::Cancel => TimerOpRecord {
            op: "cancel",
            generation: None,
            delay_ms: None,
        },
    }
}

impl DispatchRecord {
    #[must_use]
    pub fn from_dispatch(dispatch: &HoverDispatch) -> Self {
        let (outcome, channel, skip_reason, error) = match &dispatch.outcome {
            HoverOutcome::StartScheduled => ("start_scheduled", None, None, None),
            HoverOutcome::AlreadyActive => ("already_active", None, None, None),
            HoverOutcome::PreviewStarted { channel } => (
                "preview_started",
                Some(channel.as_str().to_owned()),
                None,
                None,
            ),
            HoverOutcome::PreviewAlreadyLive => ("preview_already_live", None, None, None),
            HoverOutcome::StartSkipped { reason } => {
                ("start_skipped", None, Some(reason.as_str()), None)
            }
            HoverOutcome::Ineligible => ("ineligible", None, None, None),
            HoverOutcome::IneligibleReverted => ("ineligible_reverted", None, None, None),
            HoverOutcome::NotActive => ("not_active", None, None, None),
            HoverOutcome::PointerStillInside => ("pointer_still_inside", None, None, None),
            HoverOutcome::StopScheduled => ("stop_scheduled", None, None, None),
            HoverOutcome::StopAlreadyPending => ("stop_already_pending", None, None, None),
            HoverOutcome::PreviewStopped => ("preview_stopped", None, None, None),
            HoverOutcome::StaleTimer => ("stale_timer", None, None, None),
            HoverOutcome::Failed { message } => ("failed", None, None, Some(message.clone())),
            HoverOutcome::Reset => ("reset", None, None, None),
        };
        Self {
            schema: DISPATCH_SCHEMA_VERSION,
            seq: dispatch.seq,
            phase: phase_label(dispatch.phase),
            outcome,
            channel,
            skip_reason,
            error,
            start_timer: dispatch.timer.start.map(start_record),
            stop_timer: dispatch.timer.stop.map(stop_record),
        }
    }
}

/// Bounded FIFO of dispatch records with drop accounting.
#[derive(Debug, Default)]
pub struct DispatchTrace {
    records: Vec<DispatchRecord>,
    dropped_total: u64,
}

impl DispatchTrace {
    pub fn push(&mut self, dispatch: &HoverDispatch) {
        if self.records.len() >= MAX_DISPATCH_RECORDS {
            let overflow = self.records.len() - MAX_DISPATCH_RECORDS + 1;
            self.records.drain(..overflow);
            self.dropped_total = self.dropped_total.saturating_add(overflow as u64);
        }
        self.records.push(DispatchRecord::from_dispatch(dispatch));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records evicted by the bound since construction.
    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    /// Serialize and clear all buffered records, oldest first.
    ///
    /// Records that fail to serialize are skipped rather than aborting the
    /// drain.
    pub fn drain_jsonl(&mut self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            if let Ok(line) = serde_json::to_string(&record) {
                lines.push(line);
            }
        }
        lines
    }
}
