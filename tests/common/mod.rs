//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use oauth_bridge::auth::{FauxProvider, ProviderRegistry};
use oauth_bridge::{AppState, config};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server with default settings and the faux provider
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Server running `build_router` over `config`
    pub async fn with_config(config: config::AppConfig) -> Self {
        let state = test_state(config);
        let app = oauth_bridge::build_router(state.clone());
        Self::serve(state, app).await
    }

    /// Server running a caller-built router
    pub async fn serve(state: AppState, app: axum::Router) -> Self {
        oauth_bridge::metrics::init_metrics();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET `path`, sending `cookie` ("name=value") if given
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.unwrap()
    }

    /// Start a faux login; returns the session cookie and the state token
    pub async fn begin_login(&self) -> (String, String) {
        let response = self.get("/auth/faux", None).await;
        assert_eq!(response.status(), 307);

        let cookie = session_cookie(&response).expect("session cookie");
        let state = location_state(&response).expect("state in location");
        (cookie, state)
    }
}

pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        session: config::SessionConfig::default(),
        auth: config::AuthConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

pub fn test_state(config: config::AppConfig) -> AppState {
    let providers = ProviderRegistry::new();
    providers.register(FauxProvider::new());
    providers.register(
        FauxProvider::new()
            .with_name("other")
            .with_auth_endpoint("http://other.example.com/authorize"),
    );
    AppState::from_config(config, Arc::new(providers))
}

/// First `Set-Cookie` of the response as "name=value"
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// `state` query parameter of the response's Location header
pub fn location_state(response: &reqwest::Response) -> Option<String> {
    let location = response.headers().get("location")?.to_str().ok()?;
    url::Url::parse(location)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
}
