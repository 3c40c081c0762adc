//! Progress reporting for long-running pipelines
//!
//! Pipelines report through a [`ProgressSink`]:
//! - the current phase (Checking, Provisioning, Loading, Committing)
//! - feature progress (current/total)
//! - free-form activity messages

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Pipeline phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    Provisioning,
    Loading,
    Committing,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Checking => write!(f, "Checking catalog"),
            Phase::Provisioning => write!(f, "Provisioning table"),
            Phase::Loading => write!(f, "Loading features"),
            Phase::Committing => write!(f, "Committing"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Trait for progress sinks - a terminal bar, the log, or nothing at all
pub trait ProgressSink {
    fn set_phase(&mut self, phase: Phase);
    fn set_progress(&mut self, current: u64, total: u64);
    fn log(&mut self, message: impl Into<String>);
}

/// Sink that discards everything (tests, library callers)
#[derive(Debug, Default)]
pub struct SilentProgress;

impl SilentProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for SilentProgress {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_progress(&mut self, _current: u64, _total: u64) {}
    fn log(&mut self, _message: impl Into<String>) {}
}

/// Sink that forwards to `tracing`
#[derive(Debug, Default)]
pub struct LogProgress {
    phase: Option<Phase>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }
}

impl ProgressSink for LogProgress {
    fn set_phase(&mut self, phase: Phase) {
        info!(phase = %phase, "Pipeline phase");
        self.phase = Some(phase);
    }

    fn set_progress(&mut self, current: u64, total: u64) {
        debug!(current, total, "Pipeline progress");
    }

    fn log(&mut self, message: impl Into<String>) {
        info!("{}", message.into());
    }
}

/// Terminal progress bar for the command line
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg:24} [{bar:40.cyan/blue}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn set_phase(&mut self, phase: Phase) {
        if phase == Phase::Complete {
            self.bar.finish_with_message(phase.to_string());
        } else {
            self.bar.set_message(phase.to_string());
        }
    }

    fn set_progress(&mut self, current: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(current);
    }

    fn log(&mut self, message: impl Into<String>) {
        self.bar.println(message.into());
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
