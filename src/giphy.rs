use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::Form;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub const GIPHY_API_BASE: &str = "https://api.giphy.com/v1";
pub const GIPHY_UPLOAD_URL: &str = "https://upload.giphy.com/v1/gifs";
// Giphy public beta key, safe for client-side demos.
pub const PUBLIC_BETA_KEY: &str = "WGZE6THab8arUPRsvqPP6js7Kkcf5w3z";

#[derive(Debug, thiserror::Error)]
pub enum GiphyError {
    #[error("giphy api key required")]
    MissingApiKey,
    #[error("giphy: invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("giphy: request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("giphy: {endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("giphy: decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("giphy: read upload file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub upload_url: Option<String>,
    pub user_agent: String,
    pub rating: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    api_key: String,
    user_agent: String,
    rating: Option<String>,
    base_url: String,
    upload_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub gifs: Vec<Gif>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, GiphyError> {
        if config.api_key.trim().is_empty() {
            return Err(GiphyError::MissingApiKey);
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        let base_url = config
            .base_url
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| GIPHY_API_BASE.to_string());
        let upload_url = config
            .upload_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| GIPHY_UPLOAD_URL.to_string());
        Url::parse(&base_url)?;
        Url::parse(&upload_url)?;

        Ok(Client {
            http,
            api_key: config.api_key.trim().to_string(),
            user_agent: config.user_agent,
            rating: config.rating.filter(|r| !r.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            upload_url,
        })
    }

    pub fn trending(&self, offset: usize, limit: usize) -> Result<Page, GiphyError> {
        let mut params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        self.push_rating(&mut params);
        let envelope: Envelope<Vec<Gif>> = self.get("trending", "/gifs/trending", &params)?;
        Ok(envelope.into_page())
    }

    pub fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Page, GiphyError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        self.push_rating(&mut params);
        let envelope: Envelope<Vec<Gif>> = self.get("search", "/gifs/search", &params)?;
        Ok(envelope.into_page())
    }

    /// Fetches the given ids in one request. An empty id list never touches the network.
    pub fn by_ids(&self, ids: &[String]) -> Result<Page, GiphyError> {
        if ids.is_empty() {
            return Ok(Page::default());
        }
        let params = vec![("ids", ids.join(","))];
        let envelope: Envelope<Vec<Gif>> = self.get("by ids", "/gifs", &params)?;
        Ok(envelope.into_page())
    }

    pub fn by_id(&self, id: &str) -> Result<Option<Gif>, GiphyError> {
        let path = format!("/gifs/{}", id.trim());
        match self.get::<Envelope<Value>>("by id", &path, &[]) {
            Ok(envelope) => gif_from_value("by id", envelope.data),
            Err(GiphyError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn random(&self) -> Result<Option<Gif>, GiphyError> {
        let mut params = Vec::new();
        self.push_rating(&mut params);
        let envelope: Envelope<Value> = self.get("random", "/gifs/random", &params)?;
        gif_from_value("random", envelope.data)
    }

    /// Uploads a local file and returns the new GIF id.
    pub fn upload(&self, path: &Path) -> Result<String, GiphyError> {
        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .file("file", path)
            .map_err(|source| GiphyError::File {
                path: path.display().to_string(),
                source,
            })?;
        let response = self
            .http
            .post(&self.upload_url)
            .header(USER_AGENT, &self.user_agent)
            .multipart(form)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GiphyError::Status {
                endpoint: "upload",
                status,
            });
        }
        let body = response.text()?;
        let envelope: Envelope<UploadData> = serde_json::from_str(&body)
            .map_err(|source| GiphyError::Decode {
                endpoint: "upload",
                source,
            })?;
        if envelope.meta.status != 0 && envelope.meta.status != 200 {
            return Err(GiphyError::Status {
                endpoint: "upload",
                status: StatusCode::from_u16(envelope.meta.status)
                    .unwrap_or(StatusCode::BAD_GATEWAY),
            });
        }
        Ok(envelope.data.id)
    }

    fn push_rating(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(rating) = &self.rating {
            params.push(("rating", rating.clone()));
        }
    }

    fn request(&self, path: &str, params: &[(&'static str, String)]) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = vec![("api_key", self.api_key.as_str())];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
        self.http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .query(&query)
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, GiphyError> {
        debug!(endpoint, path, "giphy request");
        let response = self.request(path, params).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GiphyError::Status { endpoint, status });
        }
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|source| GiphyError::Decode { endpoint, source })
    }
}

fn gif_from_value(endpoint: &'static str, data: Value) -> Result<Option<Gif>, GiphyError> {
    // empty results come back as `{}` or `[]`
    let has_id = data
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_id {
        return Ok(None);
    }
    serde_json::from_value(data)
        .map(Some)
        .map_err(|source| GiphyError::Decode { endpoint, source })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Meta,
}

impl Envelope<Vec<Gif>> {
    fn into_page(self) -> Page {
        Page { gifs: self.data }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub status: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct UploadData {
    id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gif {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub import_datetime: Option<String>,
    #[serde(default)]
    pub images: Images,
    // legacy random endpoint fields
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_original_url: Option<String>,
    #[serde(default)]
    pub image_fixed_height_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub fixed_height: Option<Rendition>,
    #[serde(default)]
    pub fixed_width: Option<Rendition>,
    #[serde(default)]
    pub original: Option<Rendition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rendition {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "de_dimension")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "de_dimension")]
    pub height: Option<f64>,
}

/// Giphy sends sizes as strings ("200"); numbers and garbage are tolerated.
fn de_dimension<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(de::Error::invalid_type(
                de::Unexpected::Other(&other.to_string()),
                &"a number or numeric string",
            ))
        }
    })
}
