//! TMDB client: a title search followed by a detail lookup with external ids.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{year_of, Enrichment, EnrichmentError, MetadataProvider};
use crate::classify::MediaType;
use crate::config::TmdbSettings;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
}

/// Detail payload. Series and movies name the same fields differently.
#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: i64,
    #[serde(default, alias = "title")]
    name: Option<String>,
    #[serde(default, alias = "original_title")]
    original_name: Option<String>,
    #[serde(default, alias = "release_date")]
    first_air_date: Option<String>,
    #[serde(default)]
    external_ids: ExternalIds,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(default)]
    imdb_id: Option<String>,
}

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl TmdbClient {
    pub fn new(settings: &TmdbSettings) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(EnrichmentError::Client)?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(settings.api_key.expose_secret().to_string()),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, EnrichmentError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.expose_secret())])
            .query(params)
            .send()
            .await
            .map_err(|e| EnrichmentError::Request {
                endpoint: endpoint.to_string(),
                source: e.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| EnrichmentError::Decode {
            endpoint: endpoint.to_string(),
            source: e.without_url(),
        })
    }
}

fn path_segment(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Series => "tv",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn enrichment_from_detail(detail: DetailResponse) -> Enrichment {
    let release_date = non_empty(detail.first_air_date);
    let release_year = release_date.as_deref().and_then(year_of);

    Enrichment {
        tmdb_id: detail.id,
        external_id: non_empty(detail.external_ids.imdb_id),
        canonical_title: non_empty(detail.name),
        original_title: non_empty(detail.original_name),
        release_date,
        release_year,
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn lookup(
        &self,
        media_type: MediaType,
        title: &str,
    ) -> Result<Option<Enrichment>, EnrichmentError> {
        let segment = path_segment(media_type);

        let search: SearchResponse = self
            .get_json(&format!("/search/{}", segment), &[("query", title)])
            .await?;

        let Some(first) = search.results.first() else {
            return Ok(None);
        };

        let detail: DetailResponse = self
            .get_json(
                &format!("/{}/{}", segment, first.id),
                &[("append_to_response", "external_ids")],
            )
            .await?;

        Ok(Some(enrichment_from_detail(detail)))
    }
}
