//! REST client for Flow Production Tracking
//!
//! Authenticates with an OAuth token grant and fetches single records
//! from `/api/v1/entity/<collection>/<id>`. The client owns a
//! current-thread runtime so it can be called from synchronous code;
//! it must not be called from inside another tokio runtime.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{DatabaseClient, Record};
use crate::config::{Connection, Credentials};
use crate::error::BackendError;

const TOKEN_PATH: &str = "api/v1/auth/access_token";
const ENTITY_PATH: &str = "api/v1/entity";
/// Refresh tokens this long before the server expires them.
const TOKEN_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_none_or(|expires_at| Instant::now() + TOKEN_MARGIN < expires_at)
    }
}

pub struct RestClient {
    connection: Connection,
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    token: Mutex<Option<AccessToken>>,
}

impl RestClient {
    pub fn new(connection: Connection) -> Result<Self, BackendError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("fptio/", env!("CARGO_PKG_VERSION")));
        if let Some(proxy) = &connection.http_proxy {
            let proxy_url = proxy_url(proxy);
            let proxy = reqwest::Proxy::all(&proxy_url).map_err(|source| BackendError::Transport {
                url: proxy_url,
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(|source| BackendError::Transport {
            url: connection.server_url.to_string(),
            source,
        })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BackendError::Runtime)?;

        Ok(Self {
            connection,
            http,
            runtime,
            token: Mutex::new(None),
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.connection.server_url
    }

    async fn access_token(&self) -> Result<String, BackendError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let url = join(&self.connection.server_url, TOKEN_PATH);
        tracing::debug!("Requesting access token from {}", url);
        let response = self
            .http
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&token_form(&self.connection.credentials))
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(BackendError::Authentication {
                server: self.connection.server_url.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), error_detail(&reason)),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let access = AccessToken {
            value: token.access_token,
            expires_at: token_expiry(Instant::now(), token.expires_in),
        };
        let value = access.value.clone();
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(access);
        Ok(value)
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.value.clone())
    }

    fn forget_token(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn fetch_record(
        &self,
        entity_type: &str,
        entity_id: u64,
        fields: &[String],
    ) -> Result<Option<Record>, BackendError> {
        let token = self.access_token().await?;
        let url = record_url(&self.connection.server_url, entity_type, entity_id, fields);

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        match status.as_u16() {
            404 => return Ok(None),
            401 | 403 => {
                self.forget_token();
                let reason = response.text().await.unwrap_or_default();
                return Err(BackendError::Authentication {
                    server: self.connection.server_url.to_string(),
                    reason: format!("HTTP {}: {}", status.as_u16(), error_detail(&reason)),
                });
            }
            _ if !status.is_success() => {
                return Err(BackendError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        parse_record(&body)
            .map(Some)
            .ok_or_else(|| BackendError::InvalidResponse {
                url: url.to_string(),
                reason: "missing 'data' object".to_string(),
            })
    }
}

impl DatabaseClient for RestClient {
    fn find_one(
        &self,
        entity_type: &str,
        entity_id: u64,
        fields: &[String],
    ) -> Result<Option<Record>, BackendError> {
        self.runtime
            .block_on(self.fetch_record(entity_type, entity_id, fields))
    }
}

/// REST collection of an entity type: `PublishedFile` -> `published_files`.
pub fn collection_name(entity_type: &str) -> String {
    let mut snake = String::with_capacity(entity_type.len() + 4);
    let mut previous: Option<char> = None;
    for c in entity_type.chars() {
        if c.is_ascii_uppercase() {
            if previous.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
        previous = Some(c);
    }

    if snake.ends_with('s') || snake.ends_with('x') {
        snake.push_str("es");
    } else if let Some(stem) = snake.strip_suffix('y')
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
    {
        snake = format!("{}ies", stem);
    } else {
        snake.push('s');
    }
    snake
}

fn join(server: &Url, path: &str) -> Url {
    let mut url = server.clone();
    let base = server.path().trim_end_matches('/');
    url.set_path(&format!("{}/{}", base, path));
    url
}

fn record_url(server: &Url, entity_type: &str, entity_id: u64, fields: &[String]) -> Url {
    let mut url = join(
        server,
        &format!("{}/{}/{}", ENTITY_PATH, collection_name(entity_type), entity_id),
    );
    let fields = if fields.is_empty() {
        "id".to_string()
    } else {
        fields.join(",")
    };
    url.query_pairs_mut().append_pair("fields", &fields);
    url
}

fn token_form(credentials: &Credentials) -> Vec<(&'static str, String)> {
    match credentials {
        Credentials::Script {
            script_name,
            api_key,
        } => vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", script_name.clone()),
            ("client_secret", api_key.clone()),
        ],
        Credentials::User { login, password } => vec![
            ("grant_type", "password".to_string()),
            ("username", login.clone()),
            ("password", password.clone()),
        ],
        Credentials::Session { session_token } => vec![
            ("grant_type", "session_token".to_string()),
            ("session_token", session_token.clone()),
        ],
    }
}

/// Proxies are configured as `[user:pass@]host[:port]`.
fn proxy_url(proxy: &str) -> String {
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

/// Flatten a `{"data": {...}}` body into one record.
///
/// Attributes and relationship values land side by side with `id` and
/// `type`, matching the field names that were requested.
fn parse_record(body: &Value) -> Option<Record> {
    let data = body.get("data")?.as_object()?;

    let mut record = Record::new();
    for key in ["id", "type"] {
        if let Some(value) = data.get(key) {
            record.insert(key.to_string(), value.clone());
        }
    }
    if let Some(attributes) = data.get("attributes").and_then(Value::as_object) {
        for (name, value) in attributes {
            record.insert(name.clone(), value.clone());
        }
    }
    if let Some(relationships) = data.get("relationships").and_then(Value::as_object) {
        for (name, relation) in relationships {
            let value = relation.get("data").cloned().unwrap_or(Value::Null);
            record.insert(name.clone(), value);
        }
    }
    Some(record)
}

/// Expiry instant for a token issued at `now`.
///
/// Lifetimes too large to represent are treated as open-ended.
fn token_expiry(now: Instant, expires_in: Option<u64>) -> Option<Instant> {
    expires_in.and_then(|secs| now.checked_add(Duration::from_secs(secs)))
}

/// First error title from an error body, or the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("errors")?
                .get(0)?
                .get("title")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server() -> Url {
        Url::parse("https://studio.example.com").unwrap()
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name("PublishedFile"), "published_files");
        assert_eq!(collection_name("Version"), "versions");
        assert_eq!(collection_name("HumanUser"), "human_users");
        assert_eq!(collection_name("CustomEntity01"), "custom_entity01s");
        assert_eq!(collection_name("Status"), "statuses");
        assert_eq!(collection_name("Delivery"), "deliveries");
    }

    #[test]
    fn test_record_url() {
        let url = record_url(
            &server(),
            "PublishedFile",
            123,
            &["path".to_string(), "entity.Shot.sg_head_in".to_string()],
        );
        assert_eq!(
            url.as_str(),
            "https://studio.example.com/api/v1/entity/published_files/123?fields=path%2Centity.Shot.sg_head_in"
        );
    }

    #[test]
    fn test_record_url_without_fields_requests_id() {
        let url = record_url(&server(), "Version", 7, &[]);
        assert_eq!(url.query(), Some("fields=id"));
    }

    #[test]
    fn test_join_keeps_base_path() {
        let base = Url::parse("https://proxy.example.com/fpt/").unwrap();
        assert_eq!(
            join(&base, TOKEN_PATH).as_str(),
            "https://proxy.example.com/fpt/api/v1/auth/access_token"
        );
    }

    #[test]
    fn test_token_form() {
        let form = token_form(&Credentials::Script {
            script_name: "openassetio".to_string(),
            api_key: "secret".to_string(),
        });
        assert_eq!(form[0], ("grant_type", "client_credentials".to_string()));
        assert_eq!(form[1], ("client_id", "openassetio".to_string()));

        let form = token_form(&Credentials::Session {
            session_token: "abc".to_string(),
        });
        assert_eq!(form[0].1, "session_token");
    }

    #[test]
    fn test_proxy_url() {
        assert_eq!(proxy_url("proxy:3128"), "http://proxy:3128");
        assert_eq!(proxy_url("user:pw@proxy:3128"), "http://user:pw@proxy:3128");
        assert_eq!(proxy_url("https://proxy:443"), "https://proxy:443");
    }

    #[test]
    fn test_parse_record() {
        let body = json!({
            "data": {
                "id": 123,
                "type": "PublishedFile",
                "attributes": {
                    "code": "comp.v003.exr",
                    "path": {"local_path": "/mnt/show/comp.v003.exr"}
                },
                "relationships": {
                    "entity": {"data": {"id": 4, "type": "Shot", "name": "sh010"}},
                    "entity.Shot.sg_head_in": {"data": 1001}
                },
                "links": {"self": "/api/v1/entity/published_files/123"}
            }
        });

        let record = parse_record(&body).unwrap();
        assert_eq!(record["id"], json!(123));
        assert_eq!(record["code"], json!("comp.v003.exr"));
        assert_eq!(record["entity"]["name"], json!("sh010"));
        assert_eq!(record["entity.Shot.sg_head_in"], json!(1001));
        assert!(!record.contains_key("links"));
    }

    #[test]
    fn test_parse_record_requires_data() {
        assert!(parse_record(&json!({"errors": []})).is_none());
    }

    #[test]
    fn test_error_detail() {
        let body = r#"{"errors":[{"status":401,"title":"Invalid credentials"}]}"#;
        assert_eq!(error_detail(body), "Invalid credentials");
        assert_eq!(error_detail(" bad gateway "), "bad gateway");
    }

    #[test]
    fn test_token_freshness() {
        let expired = AccessToken {
            value: "t".to_string(),
            expires_at: Some(Instant::now()),
        };
        let open_ended = AccessToken {
            value: "t".to_string(),
            expires_at: None,
        };
        assert!(!expired.is_fresh());
        assert!(open_ended.is_fresh());
    }

    #[test]
    fn test_token_expiry() {
        let now = Instant::now();
        assert_eq!(
            token_expiry(now, Some(3600)),
            Some(now + Duration::from_secs(3600))
        );
        assert_eq!(token_expiry(now, None), None);
        assert_eq!(token_expiry(now, Some(u64::MAX)), None);

        let open_ended = AccessToken {
            value: "t".to_string(),
            expires_at: token_expiry(now, Some(u64::MAX)),
        };
        assert!(open_ended.is_fresh());
    }

    #[test]
    fn test_new_client_caches_nothing() {
        let client = RestClient::new(Connection {
            server_url: server(),
            credentials: Credentials::Session {
                session_token: "abc".to_string(),
            },
            http_proxy: Some("proxy:3128".to_string()),
        })
        .unwrap();

        assert_eq!(client.server_url().as_str(), "https://studio.example.com/");
        assert!(client.cached_token().is_none());
    }
}
