//! # HTTP Backend
//!
//! `reqwest` implementation of every backend service trait. A single client is
//! shared across services; each service resolves to its own URL built from
//! [`EndpointConfig`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use super::traits::{
    BarcodeAllocationService, BarcodeLookupService, BookingService, LicenceCheckService,
    PassportService, ProvisionalRecordStore,
};
use super::wire::{
    AckResponse, AllocationRequest, AllocationResponse, BarcodeCheckRequest,
    BarcodeCheckResponse, BookingResponse, LicenceCheckResponse, PassportRequest,
    ProvisionalRecordRequest,
};
use crate::config::EndpointConfig;
use crate::constants::services;
use crate::error::{BookingError, BookingResult};
use crate::submission::SubmissionRecord;

const MAX_LOGGED_BODY: usize = 256;

#[derive(Debug, Clone)]
struct ServiceUrls {
    lookup: Url,
    allocation: Url,
    provisional_store: Url,
    booking: Url,
    passport: Url,
    licence_check: Url,
}

/// HTTP client for all booking backend collaborators
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    urls: ServiceUrls,
    bearer_token: Option<String>,
    timeout_ms: u64,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("booking_url", &self.urls.booking.as_str())
            .field("lookup_url", &self.urls.lookup.as_str())
            .field("timeout_ms", &self.timeout_ms)
            .field("auth_enabled", &self.bearer_token.is_some())
            .finish()
    }
}

impl HttpBackend {
    /// Create a backend client, validating every service URL up front
    pub fn new(config: &EndpointConfig) -> BookingResult<Self> {
        let urls = ServiceUrls {
            lookup: join_url(&config.dms_base_url, &config.lookup_path)?,
            allocation: join_url(&config.allocation_base_url, &config.allocation_path)?,
            provisional_store: join_url(&config.dms_base_url, &config.provisional_store_path)?,
            booking: join_url(&config.booking_base_url, &config.booking_path)?,
            passport: join_url(&config.dms_base_url, &config.passport_path)?,
            licence_check: join_url(&config.dms_base_url, &config.licence_check_path)?,
        };

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("booking-core/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BookingError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        let bearer_token = config
            .bearer_token
            .as_ref()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if bearer_token.is_none() {
            warn!("No bearer token configured; authenticated booking calls will be sent without credentials");
        }

        info!(
            booking_url = %urls.booking,
            timeout_ms = config.request_timeout_ms,
            auth_enabled = bearer_token.is_some(),
            "Created booking HTTP backend"
        );

        Ok(Self {
            client,
            urls,
            bearer_token,
            timeout_ms: config.request_timeout_ms,
        })
    }

    /// Replace the operator credential, e.g. after a fresh login
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the body.
    ///
    /// Returns `Ok(None)` for an empty 2xx body. 4xx responses are business
    /// rejections; every other failure is a transport failure.
    async fn execute<T: DeserializeOwned>(
        &self,
        service: &str,
        request: RequestBuilder,
    ) -> BookingResult<Option<T>> {
        let response = request.send().await.map_err(|e| {
            error!(service = service, error = %e, "Network error calling backend");
            BookingError::transport(service, e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BookingError::transport(service, format!("Failed to read body: {e}")))?;

        debug!(
            service = service,
            status = %status,
            body = %truncate(&body),
            "Backend response received"
        );

        if status.is_client_error() {
            let message = serde_json::from_str::<AckResponse>(&body)
                .ok()
                .and_then(|ack| ack.message)
                .unwrap_or_else(|| truncate(&body));
            warn!(service = service, status = %status, message = %message, "Backend rejected request");
            return Err(BookingError::rejected(service, status.as_u16().to_string(), message));
        }

        if !status.is_success() {
            error!(service = service, status = %status, "Backend returned server error");
            return Err(BookingError::transport(
                service,
                format!("HTTP {status}: {}", truncate(&body)),
            ));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body).map(Some).map_err(|e| {
            error!(service = service, error = %e, "Undecodable backend response");
            BookingError::transport(service, format!("Undecodable response: {e}"))
        })
    }

    async fn execute_required<T: DeserializeOwned>(
        &self,
        service: &str,
        request: RequestBuilder,
    ) -> BookingResult<T> {
        self.execute(service, request)
            .await?
            .ok_or_else(|| BookingError::transport(service, "Empty response body"))
    }
}

#[async_trait]
impl BarcodeLookupService for HttpBackend {
    async fn lookup(&self, request: &BarcodeCheckRequest) -> BookingResult<BarcodeCheckResponse> {
        let builder = self.client.post(self.urls.lookup.clone()).json(request);
        self.execute_required(services::BARCODE_LOOKUP, builder).await
    }
}

#[async_trait]
impl BarcodeAllocationService for HttpBackend {
    async fn allocate(&self, request: &AllocationRequest) -> BookingResult<AllocationResponse> {
        let builder = self.client.post(self.urls.allocation.clone()).json(request);
        self.execute_required(services::BARCODE_ALLOCATION, builder).await
    }
}

#[async_trait]
impl ProvisionalRecordStore for HttpBackend {
    async fn store_provisional(
        &self,
        request: &ProvisionalRecordRequest,
    ) -> BookingResult<AckResponse> {
        let builder = self.authorized(self.client.post(self.urls.provisional_store.clone()).json(request));
        Ok(self
            .execute(services::PROVISIONAL_STORE, builder)
            .await?
            .unwrap_or_else(AckResponse::empty_success))
    }
}

#[async_trait]
impl BookingService for HttpBackend {
    async fn submit_booking(&self, record: &SubmissionRecord) -> BookingResult<BookingResponse> {
        let builder = self.authorized(self.client.post(self.urls.booking.clone()).json(record));
        self.execute_required(services::BOOKING_SUBMIT, builder).await
    }
}

#[async_trait]
impl PassportService for HttpBackend {
    async fn submit_passport(&self, request: &PassportRequest) -> BookingResult<AckResponse> {
        let builder = self.authorized(self.client.post(self.urls.passport.clone()).json(request));
        Ok(self
            .execute(services::PASSPORT_SUBMIT, builder)
            .await?
            .unwrap_or_else(AckResponse::empty_success))
    }
}

#[async_trait]
impl LicenceCheckService for HttpBackend {
    async fn check_licence(&self) -> BookingResult<LicenceCheckResponse> {
        let builder = self.authorized(self.client.get(self.urls.licence_check.clone()));
        self.execute_required(services::LICENCE_CHECK, builder).await
    }
}

fn join_url(base: &str, path: &str) -> BookingResult<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| BookingError::Configuration(format!("Invalid service URL '{joined}': {e}")))
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let mut end = MAX_LOGGED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_slashes() {
        let url = join_url("https://example.test/", "/api/epassportchack").unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/epassportchack");

        let url = join_url("https://example.test", "api/epassportsubmit").unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/epassportsubmit");
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = join_url("not a url", "/api");
        assert!(matches!(result, Err(BookingError::Configuration(_))));
    }

    #[test]
    fn test_new_builds_from_default_config() {
        let backend = HttpBackend::new(&EndpointConfig::default()).unwrap();
        assert_eq!(
            backend.urls.booking.as_str(),
            "https://bpodms.ekdak.com/app_dommail_internal_api/public/ws/bookingreq"
        );
        assert!(!format!("{backend:?}").contains("token"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(300);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }
}
