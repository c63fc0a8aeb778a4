//! End-to-end tests for user profiles, search and rankings

mod common;

use common::{
    TestClient, TestServer, ALICE_EMAIL, ALICE_NAME, ALICE_PASS, BOB_EMAIL, BOB_NAME, BOB_PASS,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_user_profile_counts() {
    let server = TestServer::spawn().await;
    let alice =
        TestClient::registered(server.base_url.clone(), ALICE_EMAIL, ALICE_PASS, ALICE_NAME)
            .await;
    let bob = TestClient::registered(server.base_url.clone(), BOB_EMAIL, BOB_PASS, BOB_NAME).await;

    alice.create_playlist_named("One").await;
    alice.create_playlist_named("Two").await;
    alice.register_track_titled("Uploaded").await;

    let response = alice.get_own_user_profile().await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["name"], ALICE_NAME);
    assert_eq!(profile["counts"], json!({ "playlists": 2, "tracks": 1 }));
    assert_eq!(profile["playlists"].as_array().unwrap().len(), 2);

    // Bob sees the same profile by id
    let response = bob.get_user(alice.user_id.as_deref().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let seen: Value = response.json().await.unwrap();
    assert_eq!(seen["counts"], profile["counts"]);

    let response = bob.get_user("missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_user_profile() {
    let server = TestServer::spawn().await;
    let alice =
        TestClient::registered(server.base_url.clone(), ALICE_EMAIL, ALICE_PASS, ALICE_NAME)
            .await;

    let response = alice
        .update_user_profile(json!({ "avatar": "https://example.com/alice.png" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["name"], ALICE_NAME);
    assert_eq!(user["avatar"], "https://example.com/alice.png");

    let response = alice.update_user_profile(json!({ "avatar": "nope" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = alice.update_user_profile(json!({ "name": "A" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_users_excludes_requester() {
    let server = TestServer::spawn().await;
    let alice =
        TestClient::registered(server.base_url.clone(), ALICE_EMAIL, ALICE_PASS, ALICE_NAME)
            .await;
    TestClient::registered(server.base_url.clone(), BOB_EMAIL, BOB_PASS, BOB_NAME).await;

    let response = alice.search_users("EXAMPLE.COM").await;
    assert_eq!(response.status(), StatusCode::OK);
    let results: Value = response.json().await.unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], BOB_NAME);
    assert_eq!(results[0]["playlistCount"], 0);

    let response = alice.search_users("").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_users() {
    let server = TestServer::spawn().await;
    let alice =
        TestClient::registered(server.base_url.clone(), ALICE_EMAIL, ALICE_PASS, ALICE_NAME)
            .await;
    let bob = TestClient::registered(server.base_url.clone(), BOB_EMAIL, BOB_PASS, BOB_NAME).await;
    for i in 0..5 {
        TestClient::registered(
            server.base_url.clone(),
            &format!("member{}@example.com", i),
            "memberpass1",
            &format!("Member {}", i),
        )
        .await;
    }

    bob.create_playlist_named("Bob 1").await;
    bob.create_playlist_named("Bob 2").await;
    alice.create_playlist_named("Alice 1").await;

    let response = alice.get_top_users().await;
    assert_eq!(response.status(), StatusCode::OK);
    let top: Value = response.json().await.unwrap();
    let top = top.as_array().unwrap();
    assert_eq!(top.len(), 5);
    assert_eq!(top[0]["name"], BOB_NAME);
    assert_eq!(top[0]["playlistCount"], 2);
    assert_eq!(top[1]["name"], ALICE_NAME);
}
