//! Licence-check notifier.
//!
//! Runs the downstream licence check after a booking has been fully
//! submitted. The outcome is observational only: it is logged and published
//! as an event, and never reported back as an error.

use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{events, services};
use crate::error::BestEffortOutcome;
use crate::events::EventPublisher;
use crate::services::{bounded, LicenceCheckService};

#[derive(Clone)]
pub struct LicenceCheckNotifier {
    service: Arc<dyn LicenceCheckService>,
    publisher: EventPublisher,
    timeout: Duration,
}

impl fmt::Debug for LicenceCheckNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenceCheckNotifier")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LicenceCheckNotifier {
    pub fn new(
        service: Arc<dyn LicenceCheckService>,
        publisher: EventPublisher,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            publisher,
            timeout,
        }
    }

    pub async fn check(&self, session_id: &str) -> BestEffortOutcome {
        let result = bounded(
            services::LICENCE_CHECK,
            self.timeout,
            self.service.check_licence(),
        )
        .await;

        let outcome = match result {
            Ok(response) if response.is_success() => {
                info!(session_id = session_id, "Licence check passed");
                BestEffortOutcome::Succeeded
            }
            Ok(response) => {
                let reason = response
                    .message
                    .unwrap_or_else(|| "licence check was not successful".to_string());
                warn!(session_id = session_id, reason = %reason, "Licence check did not pass");
                BestEffortOutcome::Failed(reason)
            }
            Err(e) => {
                warn!(session_id = session_id, error = %e, "Licence check failed");
                BestEffortOutcome::Failed(e.to_string())
            }
        };

        match &outcome {
            BestEffortOutcome::Succeeded => self.publisher.publish(
                events::LICENCE_CHECK_COMPLETED,
                json!({ "session_id": session_id }),
            ),
            BestEffortOutcome::Failed(reason) => self.publisher.publish(
                events::LICENCE_CHECK_FAILED,
                json!({ "session_id": session_id, "reason": reason }),
            ),
        }

        outcome
    }
}
