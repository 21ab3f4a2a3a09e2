//! DocLink HTTP API backend
//!
//! Talks to the DocLink REST API, either the cloud flavour (`CloudAPI/`,
//! logged in with a site code) or an on-premise server (`DocLinkAPI/`).
//! Requests carry the session's auth code in the `AuthCode` header.
//!
//! ## Features
//!
//! The `reqwest` transport is compiled with the `api` feature. Without it,
//! [`ApiBackend::from_settings`] returns a configuration error; tests drive
//! the backend through [`crate::MockTransport`] instead.
//!
//! Generated artifacts are written to files: the API cannot run DDL.

use crate::backend::{
    optional_table, AccessibleItems, Backend, Delivery, TableData, AI_PROFILE_TABLE, DIST_STAMP_FIELD_TABLE,
    DIST_STAMP_TABLE, EVENT_TASK_TABLE, WORKFLOW_ACTIVITY_TABLE, WORKFLOW_TABLE,
};
use crate::cache::AccessibleItemsCache;
use crate::error::BackendError;
use doclink_core::{
    link_document_types, ApiSettings, DistributionStamp, DistributionStampField, DocumentType, DocumentTypeRecord,
    Property, Workflow, WorkflowActivity,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;

/// Auth code sent before login
pub const DEFAULT_AUTH_CODE: &str = "none_yet";
pub const CLOUD_PREFIX: &str = "CloudAPI/";
pub const ON_PREM_PREFIX: &str = "DocLinkAPI/";

const LOGIN_CLOUD: &str = "LoginCloud";
const LOGIN_ON_PREM: &str = "LoginOnPremise";
const LOGOUT: &str = "Logout";
const DOCUMENT_TYPES: &str = "DocumentTypes";
const PROPERTIES: &str = "Properties";
const ACCESSIBLE_ITEMS: &str = "AccessibleItems";
const QUERY_TABLE: &str = "QueryTable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request ready to hand to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,

    /// Full URL including base and prefix
    pub url: String,

    pub auth_code: String,

    pub body: Option<Value>,
}

/// Raw HTTP exchange used by [`ApiBackend`]
///
/// Returns the decoded JSON body, or `Value::Null` for an empty body.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Value, BackendError>;
}

/// Login body expected by both login endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiCredentials {
    #[serde(rename = "URL")]
    pub url: String,
    pub user_id: String,
    pub password: String,
    pub machine_name: String,
    pub site_code: Option<String>,
}

impl ApiCredentials {
    pub fn from_settings(settings: &ApiSettings, password: String) -> Self {
        Self {
            url: settings.url.clone(),
            user_id: settings.user_id.clone(),
            password,
            machine_name: settings.machine_name.clone(),
            site_code: settings.site_code.clone(),
        }
    }
}

/// Login state of an API connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSession {
    /// Server the session talks to, ending in `/`
    pub base_url: String,
    pub prefix: &'static str,
    pub auth_code: String,
    pub authenticated: bool,
}

impl ApiSession {
    /// State before login and after logout
    pub fn signed_out(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: CLOUD_PREFIX,
            auth_code: DEFAULT_AUTH_CODE.to_string(),
            authenticated: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedItem {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessibleItemsResponse {
    #[serde(default)]
    tables: Vec<NamedItem>,
    #[serde(default)]
    procedures: Vec<NamedItem>,
}

pub struct ApiBackend {
    base_url: String,
    transport: Box<dyn HttpTransport>,
    session: RwLock<ApiSession>,
    accessible: AccessibleItemsCache,
}

impl ApiBackend {
    pub fn new(base_url: impl Into<String>, transport: Box<dyn HttpTransport>, whitelist_ttl: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            session: RwLock::new(ApiSession::signed_out(base_url.clone())),
            base_url,
            transport,
            accessible: AccessibleItemsCache::new(whitelist_ttl),
        }
    }

    /// Build a backend over the `reqwest` transport
    #[cfg(feature = "api")]
    pub fn from_settings(settings: &ApiSettings, whitelist_ttl: Duration) -> Result<Self, BackendError> {
        Ok(Self::new(settings.url.clone(), Box::new(ReqwestTransport::new()?), whitelist_ttl))
    }

    /// Build a backend without the api feature (returns error)
    #[cfg(not(feature = "api"))]
    pub fn from_settings(_settings: &ApiSettings, _whitelist_ttl: Duration) -> Result<Self, BackendError> {
        Err(BackendError::Config(
            "HTTP API support not compiled. Rebuild with: cargo build --features api".to_string(),
        ))
    }

    pub async fn session(&self) -> ApiSession {
        self.session.read().await.clone()
    }

    /// Log in, choosing cloud or on-premise by the presence of a site code
    ///
    /// Any previous session and its whitelist are discarded first. A
    /// non-empty `credentials.url` replaces the configured server.
    pub async fn connect(&self, credentials: &ApiCredentials) -> Result<(), BackendError> {
        if credentials.password.is_empty() {
            return Err(BackendError::NoCredentials("API"));
        }
        self.reset().await;

        let (prefix, endpoint) = match credentials.site_code.as_deref() {
            Some(site) if !site.is_empty() => {
                tracing::info!(site_code = site, user = %credentials.user_id, "logging into cloud");
                (CLOUD_PREFIX, LOGIN_CLOUD)
            }
            _ => {
                tracing::info!(user = %credentials.user_id, "logging into on-premise server");
                (ON_PREM_PREFIX, LOGIN_ON_PREM)
            }
        };

        let base_url = if credentials.url.is_empty() {
            self.base_url.clone()
        } else {
            credentials.url.clone()
        };
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}{}{}", base_url, prefix, endpoint),
            auth_code: DEFAULT_AUTH_CODE.to_string(),
            body: Some(serde_json::to_value(credentials)?),
        };

        let auth_code = match self.transport.send(request).await? {
            Value::String(code) => code,
            other => return Err(BackendError::InvalidResponse(format!("expected auth code, got {}", other))),
        };

        *self.session.write().await = ApiSession {
            base_url,
            prefix,
            auth_code,
            authenticated: true,
        };
        Ok(())
    }

    /// Log out; the local session is cleared even when the request fails
    pub async fn disconnect(&self) -> Result<(), BackendError> {
        tracing::debug!("sending logout request");
        let result = self.post(LOGOUT, json!({}), true).await;
        self.reset().await;
        result.map(|_| ())
    }

    async fn reset(&self) {
        *self.session.write().await = ApiSession::signed_out(self.base_url.clone());
        self.accessible.invalidate().await;
    }

    async fn request(&self, method: HttpMethod, endpoint: &str, body: Option<Value>, requires_auth: bool) -> Result<Value, BackendError> {
        let request = {
            let session = self.session.read().await;
            if requires_auth && !session.authenticated {
                return Err(BackendError::NotAuthenticated);
            }
            HttpRequest {
                method,
                url: format!("{}{}{}", session.base_url, session.prefix, endpoint),
                auth_code: session.auth_code.clone(),
                body,
            }
        };

        tracing::debug!(?method, url = %request.url, "sending request");
        self.transport.send(request).await
    }

    async fn get(&self, endpoint: &str) -> Result<Value, BackendError> {
        self.request(HttpMethod::Get, endpoint, None, true).await
    }

    async fn post(&self, endpoint: &str, body: Value, requires_auth: bool) -> Result<Value, BackendError> {
        self.request(HttpMethod::Post, endpoint, Some(body), requires_auth).await
    }

    async fn accessible_items(&self, refresh: bool) -> Result<AccessibleItems, BackendError> {
        self.accessible
            .get_or_fetch(refresh, || async move {
                let response: AccessibleItemsResponse = serde_json::from_value(self.get(ACCESSIBLE_ITEMS).await?)?;
                Ok::<_, BackendError>(AccessibleItems {
                    tables: response.tables.into_iter().map(|t| t.name).collect(),
                    procedures: response.procedures.into_iter().map(|p| p.name).collect(),
                })
            })
            .await
    }

    async fn table_records<T: serde::de::DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, BackendError> {
        let result = match self.query_table(table).await {
            Ok(data) => data.records(),
            Err(e) => Err(e),
        };
        optional_table(result, table)
    }

    async fn table_names(&self, table: &str) -> Result<Vec<String>, BackendError> {
        let result = self.query_table(table).await.map(|data| data.first_column());
        optional_table(result, table)
    }
}

#[async_trait::async_trait]
impl Backend for ApiBackend {
    fn name(&self) -> &'static str {
        "api"
    }

    fn delivery(&self) -> Delivery {
        Delivery::File
    }

    async fn get_properties(&self) -> Result<Vec<Property>, BackendError> {
        tracing::debug!("fetching properties");
        Ok(serde_json::from_value(self.get(PROPERTIES).await?)?)
    }

    async fn get_document_types_with_props(&self, properties: &[Property]) -> Result<Vec<DocumentType>, BackendError> {
        tracing::debug!("fetching document types");
        let records: Vec<DocumentTypeRecord> = serde_json::from_value(self.get(DOCUMENT_TYPES).await?)?;
        Ok(link_document_types(records, Vec::new(), properties)?)
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, BackendError> {
        self.table_records(WORKFLOW_TABLE).await
    }

    async fn get_workflow_activities(&self) -> Result<Vec<WorkflowActivity>, BackendError> {
        self.table_records(WORKFLOW_ACTIVITY_TABLE).await
    }

    async fn get_ai_profiles(&self) -> Result<Vec<String>, BackendError> {
        self.table_names(AI_PROFILE_TABLE).await
    }

    async fn get_event_task_names(&self) -> Result<Vec<String>, BackendError> {
        self.table_names(EVENT_TASK_TABLE).await
    }

    async fn get_dist_stamps(&self) -> Result<Vec<DistributionStamp>, BackendError> {
        self.table_records(DIST_STAMP_TABLE).await
    }

    async fn get_dist_stamp_fields(&self) -> Result<Vec<DistributionStampField>, BackendError> {
        self.table_records(DIST_STAMP_FIELD_TABLE).await
    }

    async fn check_sproc_exists(&self, sproc_name: &str) -> Result<u32, BackendError> {
        let items = self.accessible_items(true).await?;
        Ok(u32::from(items.has_procedure(sproc_name)))
    }

    async fn table_whitelisted(&self, table: &str, refresh: bool) -> Result<bool, BackendError> {
        Ok(self.accessible_items(refresh).await?.has_table(table))
    }

    async fn query_table(&self, table: &str) -> Result<TableData, BackendError> {
        if !self.table_whitelisted(table, false).await? {
            return Err(BackendError::TableNotWhitelisted(table.to_string()));
        }

        tracing::debug!(table, "querying table");
        let response = self.post(QUERY_TABLE, json!({ "TableName": table, "Filters": [] }), true).await?;
        Ok(serde_json::from_value(response)?)
    }
}

/// [`HttpTransport`] backed by `reqwest`
#[cfg(feature = "api")]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "api")]
impl ReqwestTransport {
    pub fn new() -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "api")]
#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, BackendError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url).json(&request.body.unwrap_or_else(|| json!({}))),
        };

        let response = builder
            .header("AuthCode", &request.auth_code)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let bytes = response.bytes().await.map_err(|e| BackendError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn credentials(site_code: Option<&str>) -> ApiCredentials {
        ApiCredentials {
            url: "https://doclink.test/".to_string(),
            user_id: "admin".to_string(),
            password: "secret".to_string(),
            machine_name: "doclink-cli".to_string(),
            site_code: site_code.map(str::to_string),
        }
    }

    fn backend(transport: &MockTransport) -> ApiBackend {
        ApiBackend::new("https://doclink.test/", Box::new(transport.clone()), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn requests_require_login() {
        let transport = MockTransport::new();
        let api = backend(&transport);

        assert_eq!(api.get_properties().await.unwrap_err(), BackendError::NotAuthenticated);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn cloud_login_sets_auth_code() {
        let transport = MockTransport::new().with_response(HttpMethod::Post, LOGIN_CLOUD, json!("abc123"));
        let api = backend(&transport);

        api.connect(&credentials(Some("ACME"))).await.unwrap();

        let session = api.session().await;
        assert!(session.authenticated);
        assert_eq!(session.auth_code, "abc123");
        assert_eq!(session.prefix, CLOUD_PREFIX);

        let login = &transport.requests()[0];
        assert_eq!(login.url, "https://doclink.test/CloudAPI/LoginCloud");
        assert_eq!(login.auth_code, DEFAULT_AUTH_CODE);
        assert_eq!(login.body.as_ref().unwrap()["SiteCode"], json!("ACME"));
    }

    #[tokio::test]
    async fn on_premise_login_switches_prefix() {
        let transport = MockTransport::new()
            .with_response(HttpMethod::Post, LOGIN_ON_PREM, json!("xyz"))
            .with_response(HttpMethod::Post, LOGOUT, Value::Null);
        let api = backend(&transport);

        api.connect(&credentials(None)).await.unwrap();
        assert_eq!(transport.requests()[0].url, "https://doclink.test/DocLinkAPI/LoginOnPremise");

        api.disconnect().await.unwrap();
        let session = api.session().await;
        assert!(!session.authenticated);
        assert_eq!(session.auth_code, DEFAULT_AUTH_CODE);
        assert_eq!(transport.requests()[1].auth_code, "xyz");
    }

    #[tokio::test]
    async fn reconnect_starts_a_fresh_session() {
        let transport = MockTransport::new()
            .with_response(HttpMethod::Post, LOGIN_ON_PREM, json!("xyz"))
            .with_response(HttpMethod::Post, LOGIN_CLOUD, json!("abc123"))
            .with_response(HttpMethod::Post, LOGOUT, Value::Null)
            .with_response(HttpMethod::Get, ACCESSIBLE_ITEMS, json!({ "Tables": [{ "Name": "DynamicUI" }] }));
        let api = backend(&transport);

        api.connect(&credentials(None)).await.unwrap();
        assert!(api.table_whitelisted("DynamicUI", false).await.unwrap());
        api.disconnect().await.unwrap();

        api.connect(&credentials(Some("ACME"))).await.unwrap();
        let session = api.session().await;
        assert_eq!(session.prefix, CLOUD_PREFIX);
        assert_eq!(session.auth_code, "abc123");
        assert_eq!(transport.requests().last().unwrap().url, "https://doclink.test/CloudAPI/LoginCloud");

        // Whitelist of the previous login is not reused
        assert!(api.table_whitelisted("DynamicUI", false).await.unwrap());
        assert_eq!(transport.count(ACCESSIBLE_ITEMS), 2);
        assert_eq!(transport.requests().last().unwrap().url, "https://doclink.test/CloudAPI/AccessibleItems");
    }

    #[tokio::test]
    async fn login_url_overrides_configured_server() {
        let transport = MockTransport::new().with_response(HttpMethod::Post, LOGIN_CLOUD, json!("abc123"));
        let api = backend(&transport);
        let mut creds = credentials(Some("ACME"));
        creds.url = "https://other.test/".to_string();

        api.connect(&creds).await.unwrap();
        assert_eq!(transport.requests()[0].url, "https://other.test/CloudAPI/LoginCloud");
        assert_eq!(api.session().await.base_url, "https://other.test/");
    }

    #[tokio::test]
    async fn failed_login_leaves_session_signed_out() {
        let transport = MockTransport::new().with_response(HttpMethod::Post, LOGIN_CLOUD, json!("abc123"));
        let api = backend(&transport);

        api.connect(&credentials(Some("ACME"))).await.unwrap();
        // No on-premise login endpoint is registered
        assert!(api.connect(&credentials(None)).await.is_err());

        let session = api.session().await;
        assert!(!session.authenticated);
        assert_eq!(session.prefix, CLOUD_PREFIX);
    }

    #[tokio::test]
    async fn empty_password_is_rejected() {
        let api = backend(&MockTransport::new());
        let mut creds = credentials(None);
        creds.password.clear();

        assert_eq!(api.connect(&creds).await.unwrap_err(), BackendError::NoCredentials("API"));
    }
}
