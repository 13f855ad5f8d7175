//! Bot server REST client.

use crate::plugins::{DataEnvelope, PluginListEntry};
use crate::{
    ActionResult, ApiError, ApiResult, AuthResponse, BotInfo, ChatGroup, ChatMessage, Plugin,
    PluginInfo, PluginSummary, SendMessageRequest, SendResult,
};
use console_config_and_utils::{Config, TokenStore};
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// REST client rooted at `<origin>/api`.
///
/// Authenticated requests carry the token both as a bearer header and as
/// the `auth_token` cookie the server's session middleware reads.
#[derive(Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    token_store: Option<TokenStore>,
}

impl ApiClient {
    /// Create a client for the server at `origin`.
    pub fn new(origin: &Url, timeout: Duration) -> ApiResult<Self> {
        let mut base_url = origin.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);
        base_url
            .path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot be a base URL", origin)))?
            .clear()
            .push("api");

        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            token: None,
            token_store: None,
        })
    }

    /// Create a client from the loaded configuration, picking up any token
    /// persisted by an earlier login.
    pub fn from_config(config: &Config, token_store: TokenStore) -> ApiResult<Self> {
        let origin = config.server_origin()?;
        let token = token_store.load()?;
        let client = Self::new(&origin, Duration::from_secs(config.request_timeout_secs))?;
        Ok(client.with_token_store(token_store).with_token(token))
    }

    /// Persist the token on login and remove it on logout.
    pub fn with_token_store(mut self, token_store: TokenStore) -> Self {
        self.token_store = Some(token_store);
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange an access token for a session.
    ///
    /// A rejected token is reported as `success: false`, not as an error.
    /// On success the token is kept for later requests and persisted.
    pub async fn login(&mut self, token: &str) -> ApiResult<AuthResponse> {
        let token = token.trim();
        let request = self
            .request(Method::POST, &["auth"])?
            .json(&json!({ "token": token }));

        let auth: AuthResponse = match self.send_json(request).await {
            Ok(auth) => auth,
            Err(ApiError::Unauthorized) => {
                warn!("Login rejected");
                return Ok(AuthResponse::failed("Authentication failed"));
            }
            Err(e) => return Err(e),
        };

        if auth.success {
            self.token = Some(token.to_string());
            if let Some(store) = &self.token_store {
                store.save(token)?;
            }
            info!(role = ?auth.role, "Logged in");
        } else {
            warn!(message = ?auth.message, "Login rejected");
        }

        Ok(auth)
    }

    /// Forget the token locally and in the store.
    pub fn logout(&mut self) -> ApiResult<()> {
        self.token = None;
        if let Some(store) = &self.token_store {
            store.clear()?;
        }
        info!("Logged out");
        Ok(())
    }

    pub async fn bot_info(&self) -> ApiResult<BotInfo> {
        self.send_json(self.request(Method::GET, &["bot"])?).await
    }

    pub async fn groups(&self) -> ApiResult<Vec<ChatGroup>> {
        let groups: Vec<ChatGroup> = self.send_json(self.request(Method::GET, &["groups"])?).await?;
        debug!(count = groups.len(), "Fetched groups");
        Ok(groups)
    }

    /// Recent history of one group.
    pub async fn group_messages(&self, group_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let request = self.request(Method::GET, &["groups", group_id, "messages"])?;
        let messages: Vec<ChatMessage> = self.send_json(request).await?;
        debug!(group_id = %group_id, count = messages.len(), "Fetched group messages");
        Ok(messages)
    }

    /// Broadcast to the request's groups.
    ///
    /// The request is validated first and never sent when it fails; a
    /// non-zero result code is returned as [`ApiError::Rejected`].
    pub async fn send_message(&self, request: SendMessageRequest) -> ApiResult<SendResult> {
        let request = request.prepare()?;
        info!(
            groups = request.group_ids.len(),
            items = request.message_content.len(),
            "Sending broadcast"
        );

        let builder = self.request(Method::POST, &["message", "send"])?.json(&request);
        let result: SendResult = self.send_json(builder).await?;
        result.into_result()
    }

    pub async fn plugins(&self) -> ApiResult<Vec<PluginSummary>> {
        let envelope: DataEnvelope<Vec<PluginListEntry>> =
            self.send_json(self.request(Method::GET, &["plugins"])?).await?;
        Ok(envelope.data.into_iter().map(PluginSummary::from).collect())
    }

    /// Raw configuration of one plugin.
    pub async fn plugin_info(&self, plugin_id: &str) -> ApiResult<PluginInfo> {
        let request = self
            .request(Method::GET, &["plugins", "config"])?
            .query(&[("module_name", plugin_id)]);
        let envelope: DataEnvelope<Vec<PluginInfo>> = self.send_json(request).await?;

        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("plugin {}", plugin_id)))
    }

    /// Plugin with its settings flattened for editing.
    pub async fn plugin_config(&self, plugin_id: &str) -> ApiResult<Plugin> {
        self.plugin_info(plugin_id).await.map(Plugin::from)
    }

    /// Replace the given setting values. Keys not in `settings` are left
    /// untouched by the server.
    pub async fn update_plugin_settings(
        &self,
        plugin_id: &str,
        settings: &Map<String, Value>,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::POST, &["plugins", "set_config"])?
            .json(&json!({ "module_name": plugin_id, "config": settings }));
        self.send(request).await?;
        info!(plugin = %plugin_id, keys = settings.len(), "Updated plugin settings");
        Ok(())
    }

    pub async fn trigger_plugin_action(
        &self,
        plugin_id: &str,
        endpoint: &str,
    ) -> ApiResult<ActionResult> {
        let request = self
            .request(Method::POST, &["plugins", "action"])?
            .json(&json!({ "module_name": plugin_id, "action": endpoint }));
        let result: ActionResult = self.send_json(request).await?;
        debug!(plugin = %plugin_id, action = %endpoint, success = result.success, "Plugin action");
        Ok(result)
    }

    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let mut builder = self.http_client.request(method, self.url(segments)?);
        if let Some(token) = &self.token {
            builder = builder
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::COOKIE, format!("auth_token={}", token));
        }
        Ok(builder)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        self.check_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn check_response(&self, response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        if status == StatusCode::UNAUTHORIZED {
            warn!(path = %url, "Request unauthorized");
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), path = %url, "Request failed");
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            message: body,
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(origin: &str) -> ApiClient {
        ApiClient::new(&Url::parse(origin).unwrap(), Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_base_url_is_api_root() {
        let client = client("https://bot.example.com/dashboard/?tab=1");
        assert_eq!(client.base_url().as_str(), "https://bot.example.com/api");
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = client("http://127.0.0.1:8080");
        let url = client.url(&["groups", "12 34/5", "messages"]).unwrap();
        assert_eq!(url.path(), "/api/groups/12%2034%2F5/messages");
    }

    #[test]
    fn test_debug_hides_token() {
        let client = client("http://127.0.0.1:8080").with_token(Some("secret".to_string()));
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("authenticated: true"));
    }
}
