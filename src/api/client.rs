use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use super::envelope::{decode_list, decode_record};
use super::errors::ApiError;
use super::SchoolApi;
use crate::config::Config;
use crate::models::{FormData, Record, Resource, User};
use crate::session::Session;

const LOGIN_ENDPOINT: &str = "/users/login/";
const CURRENT_USER_ENDPOINT: &str = "/users/me/";

// Upper bound on `next` links followed for one collection
const MAX_FOLLOWED_PAGES: usize = 100;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "token")]
    access: String,
    #[serde(default)]
    user: Option<User>,
}

/// reqwest-backed client for the school management API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/students/`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn item_endpoint(&self, resource: Resource, id: i64) -> String {
        format!("{}{}/", self.endpoint(resource.path()), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn user_for_token(&self, token: &str) -> Result<User, ApiError> {
        let url = self.endpoint(CURRENT_USER_ENDPOINT);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode_user(classify(status, &text, &url)?, url)
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Result<Value, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("{} -> {}", url, status);

        match classify(status, &text, url) {
            Err(ApiError::Unauthorized) => {
                warn!("Request to {} was rejected with 401, clearing session", url);
                self.session.invalidate();
                Err(ApiError::Unauthorized)
            }
            other => other,
        }
    }
}

#[async_trait]
impl SchoolApi for ApiClient {
    async fn list(&self, resource: Resource) -> Result<Vec<Record>, ApiError> {
        let mut url = self.endpoint(resource.path());
        let mut records = Vec::new();

        for _ in 0..MAX_FOLLOWED_PAGES {
            let body = self.execute(self.http.get(&url), &url).await?;
            let page = decode_list(&url, body)?;
            records.extend(page.records);

            match page.next {
                Some(next) if next != url => url = next,
                _ => {
                    debug!("Fetched {} {}", records.len(), resource);
                    return Ok(records);
                }
            }
        }

        warn!(
            "Stopped following pagination links for {} after {} pages",
            resource, MAX_FOLLOWED_PAGES
        );
        Ok(records)
    }

    async fn get(&self, resource: Resource, id: i64) -> Result<Record, ApiError> {
        let url = self.item_endpoint(resource, id);
        let body = self.execute(self.http.get(&url), &url).await?;
        decode_record(&url, body)
    }

    async fn create(&self, resource: Resource, form: &FormData) -> Result<Option<Record>, ApiError> {
        let url = self.endpoint(resource.path());
        info!("Creating {} record", resource);
        let body = self.execute(self.http.post(&url).json(&form.to_json()), &url).await?;
        Ok(Record::from_value(body))
    }

    async fn update(
        &self,
        resource: Resource,
        id: i64,
        form: &FormData,
    ) -> Result<Option<Record>, ApiError> {
        let url = self.item_endpoint(resource, id);
        info!("Updating {} record {}", resource, id);
        let body = self.execute(self.http.put(&url).json(&form.to_json()), &url).await?;
        Ok(Record::from_value(body))
    }

    async fn delete(&self, resource: Resource, id: i64) -> Result<(), ApiError> {
        let url = self.item_endpoint(resource, id);
        info!("Deleting {} record {}", resource, id);
        self.execute(self.http.delete(&url), &url).await?;
        Ok(())
    }

    async fn upload_document(&self, title: &str, path: &Path) -> Result<Option<Record>, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = multipart::Form::new()
            .text("title", title.to_string())
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let url = self.endpoint(Resource::Documents.path());
        let body = self.execute(self.http.post(&url).multipart(form), &url).await?;
        Ok(Record::from_value(body))
    }

    async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let url = self.endpoint(LOGIN_ENDPOINT);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Bad credentials are a form error here, not an expired session
        let body = match classify(status, &text, &url) {
            Err(ApiError::Unauthorized) => {
                return Err(ApiError::Validation {
                    status: status.as_u16(),
                    body: parse_body(&text),
                })
            }
            other => other?,
        };

        let login: LoginResponse = serde_json::from_value(body).map_err(|e| ApiError::Decode {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;

        // The session only takes the token once the user is known
        let user = match login.user {
            Some(user) => user,
            None => self.user_for_token(&login.access).await?,
        };

        if let Err(e) = self.session.establish(login.access, user.clone()) {
            warn!("Logged in but could not persist session: {:#}", e);
        }
        Ok(user)
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        let url = self.endpoint(CURRENT_USER_ENDPOINT);
        let body = self.execute(self.http.get(&url), &url).await?;
        decode_user(body, url)
    }
}

fn decode_user(body: Value, endpoint: String) -> Result<User, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Decode {
        endpoint,
        reason: e.to_string(),
    })
}

/// Map an HTTP status and body onto the error taxonomy
pub(crate) fn classify(status: StatusCode, text: &str, url: &str) -> Result<Value, ApiError> {
    let body = parse_body(text);
    if status.is_success() {
        return Ok(body);
    }

    match status.as_u16() {
        401 => Err(ApiError::Unauthorized),
        403 => Err(ApiError::Forbidden {
            detail: body.get("detail").and_then(Value::as_str).map(str::to_string),
        }),
        404 => Err(ApiError::NotFound(url.to_string())),
        code @ 400..=499 => Err(ApiError::Validation { status: code, body }),
        code => Err(ApiError::Server {
            status: code,
            body: text.to_string(),
        }),
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let config = Config {
            api_url: "http://school.test/api/".to_string(),
            ..Config::default()
        };
        let client = ApiClient::new(&config, Session::in_memory(None)).unwrap();
        assert_eq!(client.base_url(), "http://school.test/api");
        assert_eq!(
            client.endpoint(Resource::Classes.path()),
            "http://school.test/api/academics/classes/"
        );
        assert_eq!(
            client.item_endpoint(Resource::Fees, 9),
            "http://school.test/api/billing/fees/9/"
        );
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(StatusCode::OK, "", "/x/").unwrap(), Value::Null);
        assert_eq!(
            classify(StatusCode::CREATED, r#"{"id":1}"#, "/x/").unwrap(),
            json!({"id": 1})
        );
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "", "/x/"),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, r#"{"detail":"nope"}"#, "/x/"),
            Err(ApiError::Forbidden { detail: Some(d) }) if d == "nope"
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "", "/x/"),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, r#"{"name":["required"]}"#, "/x/"),
            Err(ApiError::Validation { status: 400, .. })
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, "<html>", "/x/"),
            Err(ApiError::Server { status: 502, .. })
        ));
    }

    #[test]
    fn test_non_json_error_body_is_kept_as_text() {
        match classify(StatusCode::CONFLICT, "duplicate entry", "/x/") {
            Err(e) => assert_eq!(e.user_message(), "duplicate entry"),
            Ok(_) => panic!("409 must be an error"),
        }
    }
}
