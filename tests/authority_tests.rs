mod common;

use std::time::Duration;

use common::{login, start_authority, start_authority_with_ttls, validate};

#[tokio::test]
async fn test_login_returns_token_pair() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/session/login", authority.base_url))
        .json(&serde_json::json!({ "username": "alice", "secret": "wonderland" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["access_token"].as_str().unwrap().contains('.'));
    assert!(body["refresh_token"].as_str().unwrap().contains('.'));
    assert_eq!(body["expires_in"], 300);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/session/login", authority.base_url))
        .json(&serde_json::json!({ "username": "alice", "secret": "queen-of-hearts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "unauthenticated" }));
}

#[tokio::test]
async fn test_login_rejects_unknown_user() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/session/login", authority.base_url))
        .json(&serde_json::json!({ "username": "mallory", "secret": "anything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_validate_accepts_fresh_access_token() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (access, _refresh) = login(&client, &authority, "alice", "wonderland").await;

    let response = validate(&client, &authority, &access).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["sub"], "alice");
    assert_eq!(body["roles"], serde_json::json!(["user", "admin"]));
    assert!(body["exp"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_validate_rejects_refresh_token() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (_access, refresh) = login(&client, &authority, "alice", "wonderland").await;

    // Refresh tokens never pass the access-token boundary.
    let response = validate(&client, &authority, &refresh).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_validate_rejects_garbage_and_expired_uniformly() {
    let authority =
        start_authority_with_ttls(Duration::from_secs(1), Duration::from_secs(86400)).await;
    let client = reqwest::Client::new();

    let (access, _refresh) = login(&client, &authority, "alice", "wonderland").await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let expired = validate(&client, &authority, &access).await;
    let garbage = validate(&client, &authority, "not.a.token").await;

    assert_eq!(expired.status(), 401);
    assert_eq!(garbage.status(), 401);

    // The caller cannot distinguish why a token was rejected.
    let expired_body: serde_json::Value = expired.json().await.unwrap();
    let garbage_body: serde_json::Value = garbage.json().await.unwrap();
    assert_eq!(expired_body, garbage_body);
    assert_eq!(expired_body, serde_json::json!({ "error": "unauthenticated" }));
}

#[tokio::test]
async fn test_refresh_rotates_pair_and_retires_old_access() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (old_access, old_refresh) = login(&client, &authority, "alice", "wonderland").await;

    let response = client
        .post(format!("{}/session/refresh", authority.base_url))
        .json(&serde_json::json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let new_access = body["access_token"].as_str().unwrap();
    assert_ne!(new_access, old_access);

    // Rotation revokes the paired access token along with the refresh token.
    assert_eq!(validate(&client, &authority, &old_access).await.status(), 401);
    assert_eq!(validate(&client, &authority, new_access).await.status(), 200);
}

#[tokio::test]
async fn test_refresh_reuse_kills_session_family() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (_access, old_refresh) = login(&client, &authority, "alice", "wonderland").await;

    let first = client
        .post(format!("{}/session/refresh", authority.base_url))
        .json(&serde_json::json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let body: serde_json::Value = first.json().await.unwrap();
    let rotated_access = body["access_token"].as_str().unwrap().to_string();

    // Replaying the consumed refresh token is treated as theft.
    let replay = client
        .post(format!("{}/session/refresh", authority.base_url))
        .json(&serde_json::json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 401);

    // The whole family dies, including the pair issued by the first refresh.
    assert_eq!(
        validate(&client, &authority, &rotated_access).await.status(),
        401
    );
}

#[tokio::test]
async fn test_concurrent_refresh_succeeds_exactly_once() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (_access, refresh) = login(&client, &authority, "alice", "wonderland").await;

    let url = format!("{}/session/refresh", authority.base_url);
    let body = serde_json::json!({ "refresh_token": refresh });

    let (a, b) = tokio::join!(
        client.post(&url).json(&body).send(),
        client.post(&url).json(&body).send(),
    );

    let statuses = [a.unwrap().status(), b.unwrap().status()];
    let successes = statuses.iter().filter(|s| s.as_u16() == 200).count();
    assert_eq!(successes, 1, "exactly one racer may win: {:?}", statuses);
}

#[tokio::test]
async fn test_logout_revokes_both_tokens() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (access, refresh) = login(&client, &authority, "alice", "wonderland").await;

    let response = client
        .post(format!("{}/session/logout", authority.base_url))
        .json(&serde_json::json!({ "access_token": access, "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(validate(&client, &authority, &access).await.status(), 401);

    let refresh_after = client
        .post(format!("{}/session/refresh", authority.base_url))
        .json(&serde_json::json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(refresh_after.status(), 401);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (access, refresh) = login(&client, &authority, "alice", "wonderland").await;

    let body = serde_json::json!({ "access_token": access, "refresh_token": refresh });
    for _ in 0..2 {
        let response = client
            .post(format!("{}/session/logout", authority.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    // Garbage tokens are swallowed too; logout never leaks token state.
    let response = client
        .post(format!("{}/session/logout", authority.base_url))
        .json(&serde_json::json!({ "access_token": "not.a.token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_logout_without_body_succeeds() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/session/logout", authority.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_login_rate_limit_enforced() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let mut saw_limited = false;
    for _ in 0..12 {
        let response = client
            .post(format!("{}/session/login", authority.base_url))
            .json(&serde_json::json!({ "username": "alice", "secret": "wrong" }))
            .send()
            .await
            .unwrap();
        if response.status() == 429 {
            saw_limited = true;
            break;
        }
    }
    assert!(saw_limited, "login should be rate limited within 12 attempts");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let authority = start_authority().await;
    let client = reqwest::Client::new();

    let (alice_access, _alice_refresh) = login(&client, &authority, "alice", "wonderland").await;
    let (bob_access, bob_refresh) = login(&client, &authority, "bob", "builder").await;

    // Bob logging out does not disturb Alice's session.
    let response = client
        .post(format!("{}/session/logout", authority.base_url))
        .json(&serde_json::json!({ "access_token": bob_access, "refresh_token": bob_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(validate(&client, &authority, &bob_access).await.status(), 401);
    assert_eq!(validate(&client, &authority, &alice_access).await.status(), 200);
}
