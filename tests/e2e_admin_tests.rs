//! End-to-end tests for user administration
//!
//! Covers the role hierarchy: who may list, promote, demote and approve whom.

mod common;

use common::{
    TestClient, TestServer, ADMIN_PASS, ADMIN_USER, MODERATOR_USER, OTHER_USER, OWNER_PASS,
    OWNER_USER, PENDING_PASS, PENDING_USER, TEST_USER,
};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_admin_lists_users() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_admin(server.base_url.clone()).await;

    let response = client.admin_get_users().await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<Value> = response.json().await.unwrap();
    let handles: Vec<&str> = users.iter().filter_map(|u| u["handle"].as_str()).collect();
    for handle in [TEST_USER, OTHER_USER, MODERATOR_USER, ADMIN_USER, OWNER_USER, PENDING_USER] {
        assert!(handles.contains(&handle), "missing {}", handle);
    }
}

#[tokio::test]
async fn test_regular_user_cannot_manage_users() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;
    let other_id = server.user_id(OTHER_USER);

    assert_eq!(client.admin_get_users().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        client.admin_set_approval(other_id, false).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_admin_approves_pending_user() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let pending_id = server.user_id(PENDING_USER);

    let pending =
        TestClient::authenticated_as(server.base_url.clone(), PENDING_USER, PENDING_PASS).await;
    assert_eq!(pending.get_feed("").await.status(), StatusCode::FORBIDDEN);

    let response = admin.admin_set_approval(pending_id, true).await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["approved"], true);

    // Existing sessions pick up the change on the next request
    assert_eq!(pending.get_feed("").await.status(), StatusCode::OK);

    // The change is recorded in the target's activity log
    let activities: Vec<Value> = pending.get_activities().await.json().await.unwrap();
    assert!(activities
        .iter()
        .any(|a| a["kind"] == "approval_changed"));
}

#[tokio::test]
async fn test_admin_promotes_user_to_moderator() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let user_id = server.user_id(TEST_USER);

    let response = admin.admin_set_role(user_id, "moderator").await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["role"], "moderator");
}

#[tokio::test]
async fn test_admin_cannot_grant_admin_or_owner() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let user_id = server.user_id(TEST_USER);

    assert_eq!(
        admin.admin_set_role(user_id, "admin").await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        admin.admin_set_role(user_id, "owner").await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_admin_cannot_change_self_or_owner() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;

    let admin_id = server.user_id(ADMIN_USER);
    assert_eq!(
        admin.admin_set_role(admin_id, "user").await.status(),
        StatusCode::FORBIDDEN
    );

    let owner_id = server.user_id(OWNER_USER);
    assert_eq!(
        admin.admin_set_approval(owner_id, false).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_owner_can_promote_to_admin() {
    let server = TestServer::spawn().await;
    let owner = TestClient::authenticated_as(server.base_url.clone(), OWNER_USER, OWNER_PASS).await;
    let moderator_id = server.user_id(MODERATOR_USER);

    let response = owner.admin_set_role(moderator_id, "admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["role"], "admin");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_as(server.base_url.clone(), ADMIN_USER, ADMIN_PASS).await;

    assert_eq!(
        admin.admin_set_approval(9999, true).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_invalid_role_is_rejected() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let user_id = server.user_id(TEST_USER);

    let response = admin.admin_set_role(user_id, "superuser").await;
    assert!(response.status().is_client_error());
}
