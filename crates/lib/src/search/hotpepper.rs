//! Hot Pepper Gourmet API client (gourmet/v1 search by coordinates).

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://webservice.recruit.co.jp/hotpepper";

/// A shop as shown in a carousel column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shop {
    pub name: String,
    pub address: String,
    /// Mobile large photo (`photo.mobile.l`).
    pub photo_url: String,
    /// PC page URL (`urls.pc`).
    pub page_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search api error: {0}")]
    Api(String),
    #[error("search response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid search url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    shop: Vec<ShopEntry>,
    #[serde(default)]
    error: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ShopEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    photo: Photo,
    #[serde(default)]
    urls: Urls,
}

#[derive(Debug, Default, Deserialize)]
struct Photo {
    #[serde(default)]
    mobile: MobilePhoto,
}

#[derive(Debug, Default, Deserialize)]
struct MobilePhoto {
    #[serde(default)]
    l: String,
}

#[derive(Debug, Default, Deserialize)]
struct Urls {
    #[serde(default)]
    pc: String,
}

impl From<ShopEntry> for Shop {
    fn from(entry: ShopEntry) -> Self {
        Shop {
            name: entry.name,
            address: entry.address,
            photo_url: entry.photo.mobile.l,
            page_url: entry.urls.pc,
        }
    }
}

/// Format a coordinate as a decimal string with 2 fractional digits (35.6812 -> "35.68").
pub fn format_coordinate(value: f64) -> String {
    format!("{:.2}", value)
}

/// Client for the gourmet search endpoint.
#[derive(Clone)]
pub struct HotpepperClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HotpepperClient {
    pub fn new(base_url: Option<String>, api_key: String, timeout: Duration) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("search client builder failed, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Request URL for the given (already formatted) coordinates.
    pub fn search_url(&self, lat: &str, lng: &str) -> Result<Url, SearchError> {
        let url = Url::parse_with_params(
            &format!("{}/gourmet/v1/", self.base_url),
            &[
                ("format", "json"),
                ("key", self.api_key.as_str()),
                ("lat", lat),
                ("lng", lng),
            ],
        )?;
        Ok(url)
    }

    /// Same as `search_url` with the key replaced, for logging.
    fn redacted_url(&self, url: &Url) -> String {
        let mut redacted = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "key" { "***".to_string() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }

    /// GET gourmet/v1 around (lat, lng). Shops are returned in API order.
    pub async fn search(&self, lat: &str, lng: &str) -> Result<Vec<Shop>, SearchError> {
        let url = self.search_url(lat, lng)?;
        log::debug!("search request: {}", self.redacted_url(&url));
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::Api(format!("{} {}", status, body)));
        }
        let body = res.bytes().await?;
        parse_search_response(&body)
    }
}

fn parse_search_response(body: &[u8]) -> Result<Vec<Shop>, SearchError> {
    let data: SearchResponse = serde_json::from_slice(body)?;
    if let Some(err) = data.results.error.first() {
        let code = err
            .code
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default();
        return Err(SearchError::Api(format!("{} {}", code, err.message).trim().to_string()));
    }
    Ok(data.results.shop.into_iter().map(Shop::from).collect())
}
