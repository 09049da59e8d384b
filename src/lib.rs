#![allow(clippy::doc_markdown)] // Allow technical terms like ePassport, RPO in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Booking Core
//!
//! Booking fulfillment workflow for dispatching printed ePassports to
//! regional passport offices.
//!
//! ## Overview
//!
//! An operator selects a destination office. The workflow then drives a
//! parcel barcode through a chain of independent backend services: barcode
//! lookup, fallback allocation from a shared pool, provisional-record
//! persistence, booking submission, passport submission and a downstream
//! licence check. Alongside that it interprets the keystroke stream of a
//! handheld barcode scanner.
//!
//! Some failures are expected (a barcode that was never pre-assigned), some
//! are retryable (transport failures), some must be shown verbatim (backend
//! rejections) and some are invisible best-effort side paths.
//!
//! ## Module Organization
//!
//! - [`session`] - Booking Session orchestrator
//! - [`state_machine`] - Session states and the pure transition function
//! - [`resolver`] - Resolve-or-allocate barcode resolution
//! - [`scanner`] - ScanStream Detector for hardware scanner input
//! - [`submission`] - Booking and passport submitters
//! - [`licence`] - Best-effort licence-check notifier
//! - [`services`] - Backend service traits, wire types and the HTTP backend
//! - [`directory`] - Destination office reference data
//! - [`config`] - Layered configuration
//! - [`events`] - In-process workflow event publisher
//! - [`error`] - Error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use booking_core::config::ConfigManager;
//! use booking_core::directory::DestinationDirectory;
//! use booking_core::events::EventPublisher;
//! use booking_core::session::BookingSession;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! booking_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let session = BookingSession::with_http_backend(
//!     "operator-17",
//!     manager.config(),
//!     EventPublisher::default(),
//! )?;
//!
//! let directory = DestinationDirectory::builtin();
//! if let Some(office) = directory.find_by_code("1001") {
//!     session.open_session(office.clone()).await?;
//!     session.commit().await?;
//! }
//! println!("{:?}", session.last_message());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod barcode;
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod events;
pub mod licence;
pub mod logging;
pub mod resolver;
pub mod scanner;
pub mod services;
pub mod session;
pub mod state_machine;
pub mod submission;
pub mod utils;

pub use barcode::{Barcode, BarcodeProvenance, ResolvedBarcode};
pub use config::{BookingConfig, ConfigManager};
pub use directory::{DestinationDirectory, DestinationOffice};
pub use error::{BestEffortOutcome, BookingError, BookingResult};
pub use events::{EventPublisher, PublishedEvent};
pub use resolver::{BarcodeResolver, LookupOutcome, PoolCredential, ProvisionalRecorder};
pub use scanner::{InputSource, ScanCompletion, ScanDetector, ScanFeed, ScanPolicy};
pub use session::{BookingServices, BookingSession, SessionSnapshot};
pub use state_machine::{FailedStage, SessionEvent, SessionState};
pub use submission::{BookingFacts, BookingSubmitter, CommitResult, PassportSubmitter, SubmissionRecord};
