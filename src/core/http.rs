use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

pub const APP_USER_AGENT: &str = "ModioDirect/1.1 (TheRootExec)";

/// Timeout for metadata requests (resolution, details, file listings).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for streamed archive downloads.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(10))
        .build()
}
