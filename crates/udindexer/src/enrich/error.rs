use thiserror::Error;

/// Failures talking to the metadata service. Callers in the ingest path
/// log these and carry on without enrichment.
///
/// Wrapped `reqwest` errors are stripped of their URL since the request
/// carries the API key as a query parameter.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to '{endpoint}' failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to '{endpoint}' returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Failed to decode response from '{endpoint}': {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}
