//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides one method per server endpoint.
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in with the given credentials
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as a regular user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    async fn post_json(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn put_json(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PUT request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/register
    pub async fn register(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/register",
            json!({ "handle": handle, "password": password }),
        )
        .await
    }

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            json!({ "handle": handle, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /v1/user/profile
    pub async fn get_profile(&self) -> Response {
        self.get("/v1/user/profile").await
    }

    /// PUT /v1/user/profile
    pub async fn update_profile(&self, update: Value) -> Response {
        self.put_json("/v1/user/profile", update).await
    }

    /// GET /v1/user/{id}
    pub async fn get_public_profile(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/user/{}", user_id)).await
    }

    /// POST /v1/user/playlist
    pub async fn create_playlist(&self, name: &str, tracks: Vec<Value>) -> Response {
        self.post_json(
            "/v1/user/playlist",
            json!({ "name": name, "tracks": tracks }),
        )
        .await
    }

    /// GET /v1/user/playlist/{id}
    pub async fn get_playlist(&self, id: &str) -> Response {
        self.get(&format!("/v1/user/playlist/{}", id)).await
    }

    /// PUT /v1/user/playlist/{id}
    pub async fn update_playlist(&self, id: &str, update: Value) -> Response {
        self.put_json(&format!("/v1/user/playlist/{}", id), update)
            .await
    }

    /// DELETE /v1/user/playlist/{id}
    pub async fn delete_playlist(&self, id: &str) -> Response {
        self.delete(&format!("/v1/user/playlist/{}", id)).await
    }

    /// PUT /v1/user/playlist/{id}/add
    pub async fn add_playlist_tracks(&self, id: &str, tracks: Vec<Value>) -> Response {
        self.put_json(
            &format!("/v1/user/playlist/{}/add", id),
            json!({ "tracks": tracks }),
        )
        .await
    }

    /// PUT /v1/user/playlist/{id}/remove
    pub async fn remove_playlist_tracks(&self, id: &str, positions: Vec<usize>) -> Response {
        self.put_json(
            &format!("/v1/user/playlist/{}/remove", id),
            json!({ "positions": positions }),
        )
        .await
    }

    /// GET /v1/user/playlists
    pub async fn get_playlists(&self) -> Response {
        self.get("/v1/user/playlists").await
    }

    /// GET /v1/user/history
    pub async fn get_history(&self) -> Response {
        self.get("/v1/user/history").await
    }

    /// GET /v1/user/activities
    pub async fn get_activities(&self) -> Response {
        self.get("/v1/user/activities").await
    }

    // ========================================================================
    // Feed Endpoints
    // ========================================================================

    /// GET /v1/feed
    pub async fn get_feed(&self, query: &str) -> Response {
        self.get(&format!("/v1/feed{}", query)).await
    }

    /// POST /v1/feed/post
    pub async fn create_post(&self, body: Value) -> Response {
        self.post_json("/v1/feed/post", body).await
    }

    /// GET /v1/feed/post/{id}
    pub async fn get_post(&self, id: &str) -> Response {
        self.get(&format!("/v1/feed/post/{}", id)).await
    }

    /// PUT /v1/feed/post/{id}
    pub async fn edit_post(&self, id: &str, body: Value) -> Response {
        self.put_json(&format!("/v1/feed/post/{}", id), body).await
    }

    /// DELETE /v1/feed/post/{id}
    pub async fn delete_post(&self, id: &str) -> Response {
        self.delete(&format!("/v1/feed/post/{}", id)).await
    }

    /// PUT /v1/feed/post/{id}/reaction
    pub async fn react(&self, id: &str, kind: &str) -> Response {
        self.put_json(
            &format!("/v1/feed/post/{}/reaction", id),
            json!({ "kind": kind }),
        )
        .await
    }

    /// DELETE /v1/feed/post/{id}/reaction
    pub async fn remove_reaction(&self, id: &str) -> Response {
        self.delete(&format!("/v1/feed/post/{}/reaction", id)).await
    }

    /// POST /v1/feed/post/{id}/comment
    pub async fn add_comment(&self, post_id: &str, body: &str, parent_id: Option<&str>) -> Response {
        self.post_json(
            &format!("/v1/feed/post/{}/comment", post_id),
            json!({ "body": body, "parent_id": parent_id }),
        )
        .await
    }

    /// DELETE /v1/feed/comment/{id}
    pub async fn delete_comment(&self, id: &str) -> Response {
        self.delete(&format!("/v1/feed/comment/{}", id)).await
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// GET /v1/admin/users
    pub async fn admin_get_users(&self) -> Response {
        self.get("/v1/admin/users").await
    }

    /// PUT /v1/admin/users/{id}/role
    pub async fn admin_set_role(&self, user_id: usize, role: &str) -> Response {
        self.put_json(
            &format!("/v1/admin/users/{}/role", user_id),
            json!({ "role": role }),
        )
        .await
    }

    /// PUT /v1/admin/users/{id}/approval
    pub async fn admin_set_approval(&self, user_id: usize, approved: bool) -> Response {
        self.put_json(
            &format!("/v1/admin/users/{}/approval", user_id),
            json!({ "approved": approved }),
        )
        .await
    }

    // ========================================================================
    // Playback Endpoints
    // ========================================================================

    /// GET /v1/playback/state
    pub async fn get_playback_state(&self) -> Response {
        self.get("/v1/playback/state").await
    }

    /// POST /v1/playback/command
    pub async fn playback_command(&self, op: Value) -> Response {
        self.post_json("/v1/playback/command", op).await
    }

    // ========================================================================
    // Content Endpoints
    // ========================================================================

    /// GET /v1/content/search
    pub async fn search(&self, query: &str) -> Response {
        self.client
            .get(self.url("/v1/content/search"))
            .query(&[("q", query)])
            .send()
            .await
            .expect("Search request failed")
    }

    /// GET /v1/content/video/{id}
    pub async fn get_video(&self, id: &str) -> Response {
        self.get(&format!("/v1/content/video/{}", id)).await
    }

    /// GET /v1/content/download/{id}
    pub async fn download_audio(&self, id: &str, title: Option<&str>) -> Response {
        let mut request = self
            .client
            .get(self.url(&format!("/v1/content/download/{}", id)));
        if let Some(title) = title {
            request = request.query(&[("title", title)]);
        }
        request.send().await.expect("Download request failed")
    }

    /// GET /v1/offline/tracks
    pub async fn get_offline_tracks(&self, query: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/v1/offline/tracks"));
        if let Some(query) = query {
            request = request.query(&[("q", query)]);
        }
        request.send().await.expect("Offline tracks request failed")
    }
}
