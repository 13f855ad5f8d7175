#![allow(dead_code)]

use console_api::ApiClient;
use console_config_and_utils::TokenStore;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";

pub fn unauthenticated(server: &MockServer) -> ApiClient {
    let origin = Url::parse(&server.uri()).expect("mock server uri");
    ApiClient::new(&origin, Duration::from_secs(5)).expect("client")
}

pub fn authenticated(server: &MockServer) -> ApiClient {
    unauthenticated(server).with_token(Some(TOKEN.to_string()))
}

/// Client persisting its token under a fresh temporary directory.
pub fn with_store(server: &MockServer) -> (ApiClient, TokenStore, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = TokenStore::at(dir.path().join("auth_token"));
    let client = unauthenticated(server).with_token_store(store.clone());
    (client, store, dir)
}
