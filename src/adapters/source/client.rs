//! HTTP client for FHIR R4 servers
//!
//! Talks plain FHIR REST: `GET {base}/Patient/{id}/$everything` for a
//! patient's record set and `GET {base}/Patient?_count=N` for the patient
//! directory. Transient failures are retried with exponential backoff.

use super::FhirSource;
use crate::config::{FhirSourceConfig, RetryConfig};
use crate::domain::ids::PatientId;
use crate::domain::{Result, SourceError, SyncError};
use crate::fhir::{parse_bundle, Bundle};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use tracing::Span;
use url::Url;

const FHIR_JSON: &str = "application/fhir+json";

/// FHIR server client
///
/// # Example
///
/// ```no_run
/// use fhirsync::adapters::source::{FhirSource, FhirSourceClient};
/// use fhirsync::config::FhirSourceConfig;
/// use fhirsync::domain::PatientId;
///
/// # async fn example() -> fhirsync::domain::Result<()> {
/// let config = FhirSourceConfig {
///     base_url: "https://hapi.fhir.org/baseR4".to_string(),
///     ..Default::default()
/// };
/// let client = FhirSourceClient::new(config)?;
/// let bundle = client
///     .fetch_patient_record_set(&PatientId::new("592912").unwrap())
///     .await?;
/// println!("{} entries", bundle.entry_count());
/// # Ok(())
/// # }
/// ```
pub struct FhirSourceClient {
    base_url: Url,
    client: Client,
    config: FhirSourceConfig,
    span: Span,
}

impl FhirSourceClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Configuration` if the base URL is not an absolute
    /// HTTP URL or the HTTP client cannot be built.
    pub fn new(config: FhirSourceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            SyncError::Configuration(format!("Invalid source.base_url '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Configuration(format!(
                "source.base_url '{}' cannot carry a path",
                config.base_url
            )));
        }

        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            config,
            span: Span::none(),
        })
    }

    /// Emit this client's events under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Check that the server answers a minimal patient search
    pub async fn health_check(&self) -> Result<()> {
        self.fetch_patient_directory(1).await?;
        tracing::info!(parent: &self.span, base_url = %self.base_url, "FHIR server is reachable");
        Ok(())
    }

    fn patient_everything_url(&self, patient_id: &PatientId) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidFormat(self.config.base_url.clone()))?
            .pop_if_empty()
            .push("Patient")
            .push(patient_id.as_str())
            .push("$everything");
        Ok(url)
    }

    fn patient_directory_url(&self, count: usize) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidFormat(self.config.base_url.clone()))?
            .pop_if_empty()
            .push("Patient");
        url.query_pairs_mut()
            .append_pair("_count", &count.to_string());
        Ok(url)
    }

    /// GET one bundle, retrying transient failures
    async fn get_bundle(&self, url: &Url) -> Result<Bundle> {
        self.retry_request(|| self.get_bundle_once(url)).await
    }

    async fn get_bundle_once(&self, url: &Url) -> Result<Bundle> {
        tracing::debug!(parent: &self.span, url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(status_error(status, url, body).into());
        }

        parse_bundle(&body).map_err(|e| {
            SyncError::from(SourceError::InvalidResponse(format!("{url}: {e}")))
        })
    }

    /// Retry a request with exponential backoff
    ///
    /// The operation runs at most `max_retries + 1` times. Only errors for
    /// which [`SourceError::is_retryable`] holds are retried.
    async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let retryable = matches!(&e, SyncError::Source(source) if source.is_retryable());
                    if !retryable || attempt >= max_retries {
                        return Err(e);
                    }
                    attempt += 1;

                    let delay = backoff_delay(&self.config.retry, attempt);
                    tracing::warn!(
                        parent: &self.span,
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying request after error"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based)
fn backoff_delay(retry: &RetryConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
    let delay_ms = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(exponent);
    Duration::from_millis(delay_ms.min(retry.max_delay_ms as f64) as u64)
}

fn request_error(error: reqwest::Error) -> SyncError {
    if error.is_timeout() {
        SourceError::Timeout(error.to_string()).into()
    } else {
        SourceError::ConnectionFailed(error.to_string()).into()
    }
}

fn status_error(status: StatusCode, url: &Url, body: String) -> SourceError {
    let code = status.as_u16();
    if status == StatusCode::NOT_FOUND {
        SourceError::NotFound(url.to_string())
    } else if status.is_client_error() {
        SourceError::ClientError {
            status: code,
            message: body,
        }
    } else if status.is_server_error() {
        SourceError::ServerError {
            status: code,
            message: body,
        }
    } else {
        SourceError::InvalidResponse(format!("unexpected status {code} from {url}"))
    }
}

#[async_trait]
impl FhirSource for FhirSourceClient {
    async fn fetch_patient_record_set(&self, patient_id: &PatientId) -> Result<Bundle> {
        let url = self.patient_everything_url(patient_id)?;
        let mut bundle = self.get_bundle(&url).await?;
        let mut pages = 1;

        loop {
            let next_url = match bundle.next_link() {
                Some(next) => url
                    .join(next)
                    .map_err(|e| SourceError::InvalidResponse(format!("bad next link {next}: {e}")))?,
                None => break,
            };

            if pages >= self.config.max_pages {
                tracing::warn!(
                    parent: &self.span,
                    patient_id = %patient_id,
                    max_pages = self.config.max_pages,
                    "Page limit reached; remaining pages are not fetched"
                );
                break;
            }

            let page = self.get_bundle(&next_url).await?;
            bundle.absorb_page(page);
            pages += 1;
        }

        tracing::debug!(
            parent: &self.span,
            patient_id = %patient_id,
            pages = pages,
            entries = bundle.entry_count(),
            "Fetched patient record set"
        );
        Ok(bundle)
    }

    async fn fetch_patient_directory(&self, count: usize) -> Result<Bundle> {
        let url = self.patient_directory_url(count)?;
        self.get_bundle(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn client(base_url: &str) -> FhirSourceClient {
        FhirSourceClient::new(FhirSourceConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test_case("https://hapi.fhir.org/baseR4" ; "no trailing slash")]
    #[test_case("https://hapi.fhir.org/baseR4/" ; "trailing slash")]
    fn test_patient_everything_url(base: &str) {
        let client = client(base);
        let url = client
            .patient_everything_url(&PatientId::new("592912").unwrap())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://hapi.fhir.org/baseR4/Patient/592912/$everything"
        );
    }

    #[test]
    fn test_patient_directory_url() {
        let client = client("https://hapi.fhir.org/baseR4");
        let url = client.patient_directory_url(5).unwrap();
        assert_eq!(url.as_str(), "https://hapi.fhir.org/baseR4/Patient?_count=5");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = FhirSourceClient::new(FhirSourceConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SyncError::Configuration(_))));
    }

    #[test_case(1, 1000 ; "first retry uses initial delay")]
    #[test_case(2, 2000 ; "second retry doubles")]
    #[test_case(3, 4000 ; "third retry doubles again")]
    #[test_case(10, 30000 ; "capped at max delay")]
    fn test_backoff_delay(attempt: usize, expected_ms: u64) {
        let retry = RetryConfig::default();
        assert_eq!(backoff_delay(&retry, attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn test_status_error_mapping() {
        let url = Url::parse("https://fhir.example.com/Patient/1").unwrap();

        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, &url, String::new()),
            SourceError::NotFound(_)
        ));
        let client_error = status_error(StatusCode::BAD_REQUEST, &url, "bad".to_string());
        assert!(matches!(client_error, SourceError::ClientError { status: 400, .. }));
        assert!(!client_error.is_retryable());

        let server_error = status_error(StatusCode::BAD_GATEWAY, &url, String::new());
        assert!(matches!(server_error, SourceError::ServerError { status: 502, .. }));
        assert!(server_error.is_retryable());
    }
}
