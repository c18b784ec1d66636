// --- File: crates/callback_gcal/src/auth.rs ---
//! Service-account authentication for the calendar hub.

use crate::service::GcalError;
use callback_config::GcalConfig;
use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator},
    CalendarHub,
};
use std::path::Path;
use tracing::info;

// Type aliases for clarity
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

/// Builds an authenticated calendar hub from the configured
/// service-account key. Fails with `GcalError::Auth` when the key is
/// missing or unreadable; there is no interactive OAuth fallback.
pub async fn create_calendar_hub(config: &GcalConfig) -> Result<HubType, GcalError> {
    let key_path = config
        .key_path
        .as_deref()
        .ok_or_else(|| GcalError::Auth("missing key_path in gcal config".to_string()))?;

    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|err| {
            GcalError::Auth(format!(
                "cannot read service-account key {key_path}: {err}"
            ))
        })?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|err| GcalError::Auth(format!("service-account authenticator: {err}")))?;

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| GcalError::Auth(format!("TLS root store: {err}")))?
        .https_or_http()
        .enable_http1()
        .build();

    // Create client without specifying body type
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    info!(key_path, "calendar hub authenticated");
    Ok(CalendarHub::new(client, auth))
}
