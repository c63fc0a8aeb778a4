//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client carrying an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set
    pub token: Option<String>,
    /// Id of the user the token was issued for
    pub user_id: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
            user_id: None,
        }
    }

    /// Same server, arbitrary raw token
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.to_string()),
            user_id: None,
        }
    }

    /// Registers a new user and returns a client authenticated as them
    ///
    /// # Panics
    ///
    /// Panics if registration fails (indicates test infrastructure problem).
    pub async fn registered(base_url: String, email: &str, password: &str, name: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.register(email, password, name).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Test user registration failed"
        );
        let body: Value = response.json().await.expect("Invalid register response");
        client.token = body["token"].as_str().map(str::to_string);
        client.user_id = body["user"]["id"].as_str().map(str::to_string);

        client
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Server Endpoints
    // ========================================================================

    /// GET /
    pub async fn get_stats(&self) -> Response {
        self.authorized(self.client.get(self.url("/")))
            .send()
            .await
            .expect("Stats request failed")
    }

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(self.url("/health"))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/register
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Response {
        self.client
            .post(self.url("/v1/auth/register"))
            .json(&json!({
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await
            .expect("Register request failed")
    }

    /// POST /v1/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.client
            .post(self.url("/v1/auth/login"))
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    /// GET /v1/auth/profile
    pub async fn get_auth_profile(&self) -> Response {
        self.authorized(self.client.get(self.url("/v1/auth/profile")))
            .send()
            .await
            .expect("Get auth profile request failed")
    }

    /// PUT /v1/auth/profile
    pub async fn update_auth_profile(&self, body: Value) -> Response {
        self.authorized(self.client.put(self.url("/v1/auth/profile")))
            .json(&body)
            .send()
            .await
            .expect("Update auth profile request failed")
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /v1/users/profile
    pub async fn get_own_user_profile(&self) -> Response {
        self.authorized(self.client.get(self.url("/v1/users/profile")))
            .send()
            .await
            .expect("Get user profile request failed")
    }

    /// PUT /v1/users/profile
    pub async fn update_user_profile(&self, body: Value) -> Response {
        self.authorized(self.client.put(self.url("/v1/users/profile")))
            .json(&body)
            .send()
            .await
            .expect("Update user profile request failed")
    }

    /// GET /v1/users/search?query=
    pub async fn search_users(&self, query: &str) -> Response {
        self.authorized(self.client.get(self.url("/v1/users/search")))
            .query(&[("query", query)])
            .send()
            .await
            .expect("Search users request failed")
    }

    /// GET /v1/users/top
    pub async fn get_top_users(&self) -> Response {
        self.authorized(self.client.get(self.url("/v1/users/top")))
            .send()
            .await
            .expect("Top users request failed")
    }

    /// GET /v1/users/{id}
    pub async fn get_user(&self, id: &str) -> Response {
        self.authorized(self.client.get(self.url(&format!("/v1/users/{}", id))))
            .send()
            .await
            .expect("Get user request failed")
    }

    // ========================================================================
    // Playlist Endpoints
    // ========================================================================

    /// POST /v1/playlists
    pub async fn create_playlist(&self, body: Value) -> Response {
        self.authorized(self.client.post(self.url("/v1/playlists")))
            .json(&body)
            .send()
            .await
            .expect("Create playlist request failed")
    }

    /// GET /v1/playlists/me
    pub async fn get_own_playlists(&self) -> Response {
        self.authorized(self.client.get(self.url("/v1/playlists/me")))
            .send()
            .await
            .expect("Get own playlists request failed")
    }

    /// GET /v1/playlists/search?query=
    pub async fn search_playlists(&self, query: &str) -> Response {
        self.authorized(self.client.get(self.url("/v1/playlists/search")))
            .query(&[("query", query)])
            .send()
            .await
            .expect("Search playlists request failed")
    }

    /// GET /v1/playlists/{id}
    pub async fn get_playlist(&self, id: &str) -> Response {
        self.authorized(self.client.get(self.url(&format!("/v1/playlists/{}", id))))
            .send()
            .await
            .expect("Get playlist request failed")
    }

    /// PUT /v1/playlists/{id}
    pub async fn update_playlist(&self, id: &str, body: Value) -> Response {
        self.authorized(self.client.put(self.url(&format!("/v1/playlists/{}", id))))
            .json(&body)
            .send()
            .await
            .expect("Update playlist request failed")
    }

    /// DELETE /v1/playlists/{id}
    pub async fn delete_playlist(&self, id: &str) -> Response {
        self.authorized(
            self.client
                .delete(self.url(&format!("/v1/playlists/{}", id))),
        )
        .send()
        .await
        .expect("Delete playlist request failed")
    }

    /// POST /v1/playlists/{id}/tracks
    pub async fn add_playlist_track(&self, id: &str, track_id: &str) -> Response {
        self.authorized(
            self.client
                .post(self.url(&format!("/v1/playlists/{}/tracks", id))),
        )
        .json(&json!({ "trackId": track_id }))
        .send()
        .await
        .expect("Add playlist track request failed")
    }

    /// DELETE /v1/playlists/{id}/tracks/{track_id}
    pub async fn remove_playlist_track(&self, id: &str, track_id: &str) -> Response {
        self.authorized(
            self.client
                .delete(self.url(&format!("/v1/playlists/{}/tracks/{}", id, track_id))),
        )
        .send()
        .await
        .expect("Remove playlist track request failed")
    }

    // ========================================================================
    // Track Endpoints
    // ========================================================================

    /// POST /v1/tracks
    pub async fn register_track(&self, title: &str) -> Response {
        self.authorized(self.client.post(self.url("/v1/tracks")))
            .json(&json!({
                "title": title,
                "artist": "Test Artist",
                "durationSecs": 180,
            }))
            .send()
            .await
            .expect("Register track request failed")
    }

    /// GET /v1/tracks/{id}
    pub async fn get_track(&self, id: &str) -> Response {
        self.authorized(self.client.get(self.url(&format!("/v1/tracks/{}", id))))
            .send()
            .await
            .expect("Get track request failed")
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Creates a playlist and returns its id
    pub async fn create_playlist_named(&self, name: &str) -> String {
        let response = self.create_playlist(json!({ "name": name })).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid playlist response");
        body["id"].as_str().expect("Playlist has no id").to_string()
    }

    /// Registers a track and returns its id
    pub async fn register_track_titled(&self, title: &str) -> String {
        let response = self.register_track(title).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid track response");
        body["id"].as_str().expect("Track has no id").to_string()
    }
}
