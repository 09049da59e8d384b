//! # ScanStream Detector
//!
//! A handheld scanner behaves like a keyboard that types very fast and stops
//! once the symbology's fixed length has been emitted. The detector buffers
//! characters in arrival order and reports a completed scan as soon as the
//! buffer reaches [`ScanPolicy::completion_length`].
//!
//! ```text
//! idle --start()/first char--> active --len >= N--> completed --> idle
//!   ^                            |
//!   +---------- reset() ---------+
//! ```
//!
//! Keystroke timing is used only to label the burst as scanner or human
//! input; the length threshold is the sole completion rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::barcode::Barcode;
use crate::config::ScanConfig;
use crate::constants;

/// Tunable scan-completion policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Buffer length at which a scan is complete
    pub completion_length: usize,
    /// Largest gap between keystrokes still attributed to a hardware scanner
    pub max_keystroke_gap: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            completion_length: constants::SCAN_COMPLETION_LENGTH,
            max_keystroke_gap: constants::SCANNER_MAX_KEYSTROKE_GAP,
        }
    }
}

impl From<&ScanConfig> for ScanPolicy {
    fn from(config: &ScanConfig) -> Self {
        Self {
            completion_length: config.completion_length.max(1),
            max_keystroke_gap: Duration::from_millis(config.max_keystroke_gap_ms),
        }
    }
}

/// Who produced a burst of input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Scanner,
    Human,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanner => write!(f, "scanner"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// A completed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCompletion {
    pub barcode: Barcode,
    pub source: InputSource,
}

/// What happened to a single fed character
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFeed {
    /// Dropped without touching the buffer
    Ignored,
    /// Buffered; `auto_started` is set when this character opened the scan
    Accepted { auto_started: bool },
    Completed(ScanCompletion),
}

impl ScanFeed {
    pub fn completion(&self) -> Option<&ScanCompletion> {
        match self {
            Self::Completed(completion) => Some(completion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanDetector {
    policy: ScanPolicy,
    buffer: String,
    buffered: usize,
    active: bool,
    last_keystroke: Option<Instant>,
    widest_gap: Duration,
}

impl Default for ScanDetector {
    fn default() -> Self {
        Self::new(ScanPolicy::default())
    }
}

impl ScanDetector {
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            policy,
            buffer: String::new(),
            buffered: 0,
            active: false,
            last_keystroke: None,
            widest_gap: Duration::ZERO,
        }
    }

    pub fn policy(&self) -> ScanPolicy {
        self.policy
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Operator pressed "Scan": open a fresh scan
    pub fn start(&mut self) {
        self.clear();
        self.active = true;
        debug!("Scan mode started");
    }

    /// Abandon any partial scan
    pub fn reset(&mut self) {
        self.clear();
        self.active = false;
    }

    pub fn feed(&mut self, ch: char) -> ScanFeed {
        self.feed_at(ch, Instant::now())
    }

    /// Apply one character received at `at`.
    ///
    /// Control and whitespace characters (scanner CR/LF suffixes) are dropped.
    pub fn feed_at(&mut self, ch: char, at: Instant) -> ScanFeed {
        if ch.is_control() || ch.is_whitespace() {
            return ScanFeed::Ignored;
        }

        let auto_started = !self.active;
        if auto_started {
            self.clear();
            self.active = true;
            debug!("Scan auto-started by incoming input");
        }

        if let Some(previous) = self.last_keystroke {
            let gap = at.saturating_duration_since(previous);
            self.widest_gap = self.widest_gap.max(gap);
        }
        self.last_keystroke = Some(at);
        self.buffer.push(ch);
        self.buffered += 1;

        if self.buffered < self.policy.completion_length {
            return ScanFeed::Accepted { auto_started };
        }

        let source = self.classify();
        let raw = std::mem::take(&mut self.buffer);
        self.reset();

        match Barcode::parse(&raw) {
            Ok(barcode) => {
                debug!(barcode = %barcode, source = %source, "Scan completed");
                ScanFeed::Completed(ScanCompletion { barcode, source })
            }
            Err(e) => {
                warn!(error = %e, "Discarding unusable scan");
                ScanFeed::Ignored
            }
        }
    }

    fn classify(&self) -> InputSource {
        if self.widest_gap <= self.policy.max_keystroke_gap {
            InputSource::Scanner
        } else {
            InputSource::Human
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.buffered = 0;
        self.last_keystroke = None;
        self.widest_gap = Duration::ZERO;
    }
}
