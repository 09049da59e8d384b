//! # Booking and Passport Submission
//!
//! [`BookingSubmitter`] commits a [`SubmissionRecord`] to the booking service.
//! [`PassportSubmitter`] records the ePassport item once that booking has been
//! confirmed; it takes a [`CommitResult`], which only a successful booking
//! produces, so a passport record can never be sent on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::barcode::Barcode;
use crate::config::ShipmentConfig;
use crate::constants::{services, status};
use crate::directory::DestinationOffice;
use crate::error::{BookingError, BookingResult};
use crate::services::{bounded, BookingService, PassportRequest, PassportService};

/// Flattened booking payload.
///
/// Built only through [`SubmissionRecord::new`], which copies the barcode the
/// session holds into `printed_item_id`, so the submitted barcode always
/// matches the one on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    user_group: String,
    city_post_status: String,
    is_city_post: String,
    emts_branch_code: String,
    my_branch_code: String,
    shift: String,
    hnddevice: String,
    service_type: String,
    item_weight: u32,
    #[serde(rename = "isCharge")]
    is_charge: String,
    #[serde(rename = "isStation")]
    is_station: String,
    #[serde(rename = "delivery_Branch_Code")]
    delivery_branch_code: String,
    vas_type: String,
    set_ad: String,
    vp_service: String,
    vp_amount: u32,
    item_price: u32,
    insurance_price: u32,
    is_bulk_mail: String,
    rec_name: String,
    rec_contact: String,
    rec_address: String,
    sen_name: String,
    sen_contact: String,
    sen_address: String,
    item_desc: String,
    image_src: String,
    image_pod: u32,
    ad_pod_id: u32,
    user_id: String,
    printed_item_id: Barcode,
}

impl SubmissionRecord {
    pub fn new(
        user_id: impl Into<String>,
        barcode: &Barcode,
        office: &DestinationOffice,
        shipment: &ShipmentConfig,
    ) -> Self {
        Self {
            user_group: shipment.user_group.clone(),
            city_post_status: shipment.city_post_status.clone(),
            is_city_post: shipment.is_city_post.clone(),
            emts_branch_code: shipment.emts_branch_code.clone(),
            my_branch_code: shipment.my_branch_code.clone(),
            shift: shipment.shift.clone(),
            hnddevice: shipment.handheld_device.clone(),
            service_type: shipment.service_type.clone(),
            item_weight: shipment.item_weight,
            is_charge: shipment.is_charge.clone(),
            is_station: shipment.is_station.clone(),
            delivery_branch_code: shipment.delivery_branch_code.clone(),
            vas_type: shipment.vas_type.clone(),
            set_ad: shipment.set_ad.clone(),
            vp_service: shipment.vp_service.clone(),
            vp_amount: shipment.vp_amount,
            item_price: shipment.item_price,
            insurance_price: shipment.insurance_price,
            is_bulk_mail: shipment.is_bulk_mail.clone(),
            rec_name: office.name.clone(),
            rec_contact: office.phone.clone(),
            rec_address: office.address.clone(),
            sen_name: shipment.sender_name.clone(),
            sen_contact: shipment.sender_contact.clone(),
            sen_address: shipment.sender_address.clone(),
            item_desc: shipment.item_description.clone(),
            image_src: shipment.image_src.clone(),
            image_pod: shipment.image_pod,
            ad_pod_id: shipment.ad_pod_id,
            user_id: user_id.into(),
            printed_item_id: barcode.clone(),
        }
    }

    pub fn printed_item_id(&self) -> &Barcode {
        &self.printed_item_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn recipient_name(&self) -> &str {
        &self.rec_name
    }

    pub fn recipient_address(&self) -> &str {
        &self.rec_address
    }

    pub fn recipient_contact(&self) -> &str {
        &self.rec_contact
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn vas_type(&self) -> &str {
        &self.vas_type
    }
}

/// Outcome of an accepted booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Service-assigned item id, or the submitted barcode when none was returned
    pub item_id: String,
    pub barcode: Barcode,
}

/// Booking facts echoed into the passport record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFacts {
    pub service_type: String,
    pub vas_type: String,
}

impl From<&ShipmentConfig> for BookingFacts {
    fn from(shipment: &ShipmentConfig) -> Self {
        Self {
            service_type: shipment.service_type.clone(),
            vas_type: shipment.vas_type.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BookingSubmitter {
    service: Arc<dyn BookingService>,
    timeout: Duration,
}

impl fmt::Debug for BookingSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingSubmitter")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BookingSubmitter {
    pub fn new(service: Arc<dyn BookingService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Submit a booking.
    ///
    /// Fails with [`BookingError::Rejected`] when the service refuses the
    /// booking and [`BookingError::Transport`] when the call did not complete.
    /// Transport failures may be retried with the same record.
    pub async fn submit(&self, record: &SubmissionRecord) -> BookingResult<CommitResult> {
        let response = bounded(
            services::BOOKING_SUBMIT,
            self.timeout,
            self.service.submit_booking(record),
        )
        .await?;

        if !response.is_accepted() {
            let code = response.reported_code();
            let message = response.reported_message();
            warn!(
                barcode = %record.printed_item_id,
                status_code = %code,
                message = %message,
                "Booking rejected"
            );
            return Err(BookingError::rejected(services::BOOKING_SUBMIT, code, message));
        }

        let item_id = response
            .item_id()
            .unwrap_or(record.printed_item_id.as_str())
            .to_string();

        info!(
            barcode = %record.printed_item_id,
            item_id = %item_id,
            "Booking accepted"
        );

        Ok(CommitResult {
            item_id,
            barcode: record.printed_item_id.clone(),
        })
    }
}

#[derive(Clone)]
pub struct PassportSubmitter {
    service: Arc<dyn PassportService>,
    timeout: Duration,
}

impl fmt::Debug for PassportSubmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassportSubmitter")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PassportSubmitter {
    pub fn new(service: Arc<dyn PassportService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Record the passport item for a confirmed booking
    pub async fn submit_passport(
        &self,
        user_id: &str,
        commit: &CommitResult,
        facts: &BookingFacts,
    ) -> BookingResult<()> {
        let request = PassportRequest {
            user_id: user_id.to_string(),
            item_id: commit.item_id.clone(),
            total_charge: 0,
            service_type: facts.service_type.clone(),
            vas_type: facts.vas_type.clone(),
            price: 0,
            insured: 0,
            booking_status: status::BOOKED.to_string(),
        };

        let ack = bounded(
            services::PASSPORT_SUBMIT,
            self.timeout,
            self.service.submit_passport(&request),
        )
        .await?;

        if ack.is_success() {
            info!(item_id = %commit.item_id, "Passport record submitted");
            return Ok(());
        }

        Err(BookingError::rejected(
            services::PASSPORT_SUBMIT,
            ack.reported_code(),
            ack.reported_message("Passport submission was not accepted"),
        ))
    }
}
