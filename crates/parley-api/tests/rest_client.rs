//! REST client against an in-process collaborator.

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::collections::HashMap;

use parley_api::error::ApiError;
use parley_api::permissions::PermissionProvider;
use parley_api::{ApiClient, SessionStore, auth, chats, guilds, messages};
use parley_types::api::{Claims, SendMessageRequest};
use parley_types::permissions::PermissionKey;

fn mint(user_id: &str) -> String {
    let claims = Claims {
        user_id: user_id.into(),
        token: Some("relay-credential".into()),
        username: Some("alice".into()),
        exp: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"collaborator")).unwrap()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == "correct-horse" {
        (StatusCode::OK, Json(json!({ "token": mint("user-a") })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": { "info": "Invalid credentials" } })))
    }
}

async fn history(headers: HeaderMap, Path(chat_id): Path<String>) -> impl IntoResponse {
    if bearer(&headers).as_deref() != Some(mint("user-a").as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Auth failure" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "messages": [
                { "senderId": "user-b", "content": "first", "chatId": chat_id, "messageId": "m1",
                  "createdAt": "2024-05-01T10:00:00Z", "senderUsername": "bob" },
                { "senderId": "user-a", "content": "second", "chatId": chat_id, "messageId": "m2" }
            ]
        })),
    )
}

async fn permissions(Path(guild_id): Path<String>) -> impl IntoResponse {
    Json(json!({
        "guildId": guild_id,
        "permissions": [
            { "permission": "can_manage_channels", "allowed": false, "grantedByRole": null },
            { "permission": "can_message", "allowed": true, "grantedByRole": "@everyone" }
        ]
    }))
}

async fn relay(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if bearer(&headers).as_deref() != Some("relay-credential") {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    if body["message"] == "you are awful" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "TOXIC_CONTENT", "message": "Message flagged", "toxicityScore": 0.92 })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "guildId": query.get("guildId") })))
}

async fn expired() -> impl IntoResponse {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Auth failure" })))
}

async fn spawn_collaborator() -> String {
    let app = Router::new()
        .route("/users/login", post(login))
        .route("/chats/{chat_id}/messages", get(history))
        .route("/guilds/{guild_id}/permissions", get(permissions))
        .route("/guilds/user", get(expired))
        .route("/api/messages", post(relay));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn login_installs_token_and_history_is_authorized() {
    let base = spawn_collaborator().await;
    let api = ApiClient::new(&base, SessionStore::new());

    auth::login(&api, "alice", "correct-horse").await.unwrap();
    assert_eq!(api.session().claims().unwrap().user_id, "user-a");

    let page = messages::history(&api, "general").await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "first");
    assert_eq!(page[0].display_name(), "bob");
    assert!(page[1].is_just_sent());
}

#[tokio::test]
async fn rejected_login_surfaces_info() {
    let base = spawn_collaborator().await;
    let api = ApiClient::new(&base, SessionStore::new());

    let err = auth::login(&api, "alice", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(!api.session().is_authenticated());
}

#[tokio::test]
async fn missing_session_fails_before_the_network() {
    let base = spawn_collaborator().await;
    let api = ApiClient::new(&base, SessionStore::new());

    let err = chats::direct_messages(&api).await.unwrap_err();
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn unauthorized_response_is_an_auth_failure() {
    let base = spawn_collaborator().await;
    let session = SessionStore::new();
    session.login(mint("user-a"));
    let api = ApiClient::new(&base, session);

    let err = guilds::my_guilds(&api).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn permission_provider_fetches_snapshot() {
    let base = spawn_collaborator().await;
    let session = SessionStore::new();
    session.login(mint("user-a"));
    let api = ApiClient::new(&base, session);

    let provider = PermissionProvider::new();
    let snapshot = provider.enter_guild(&api, "g1").await.unwrap();
    assert!(!snapshot.allows(PermissionKey::ManageChannels));
    assert_eq!(
        snapshot.permission(PermissionKey::Message).and_then(|p| p.reason.as_deref()),
        Some("@everyone")
    );
    assert_eq!(provider.snapshot().unwrap().guild_id(), "g1");
}

#[tokio::test]
async fn relay_send_uses_embedded_credential_and_maps_moderation() {
    let base = spawn_collaborator().await;
    let session = SessionStore::new();
    session.login(mint("user-a"));
    let relay = ApiClient::new(&base, session);

    let ok = SendMessageRequest {
        chat_id: "general".into(),
        sender_id: "user-a".into(),
        message: "hello".into(),
    };
    messages::relay_send(&relay, &ok, Some("g1"), Some("relay-credential"))
        .await
        .unwrap();

    let toxic = SendMessageRequest {
        message: "you are awful".into(),
        ..ok
    };
    match messages::relay_send(&relay, &toxic, None, Some("relay-credential")).await {
        Err(ApiError::Moderation { message, toxicity_score }) => {
            assert_eq!(message, "Message flagged");
            assert_eq!(toxicity_score, Some(0.92));
        }
        other => panic!("expected moderation rejection, got {other:?}"),
    }
}
