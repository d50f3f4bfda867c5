use reqwest::Method;

use parley_types::api::{FriendRequestsResponse, FriendsResponse};
use parley_types::models::{Friend, FriendRequest};

use crate::client::ApiClient;
use crate::error::ApiError;

pub async fn friends(api: &ApiClient) -> Result<Vec<Friend>, ApiError> {
    let resp: FriendsResponse = api.get("/users/friends").await?;
    Ok(resp.friends)
}

pub async fn incoming_requests(api: &ApiClient) -> Result<Vec<FriendRequest>, ApiError> {
    let resp: FriendRequestsResponse = api.get("/users/friends/requests").await?;
    Ok(resp.requests)
}

pub async fn send_request(api: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::POST, &format!("/users/friends/requests/{}", user_id))
        .await
}

pub async fn accept_request(api: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::POST, &format!("/users/friends/requests/{}/accept", user_id))
        .await
}

pub async fn reject_request(api: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::POST, &format!("/users/friends/requests/{}/reject", user_id))
        .await
}

pub async fn remove_friend(api: &ApiClient, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/users/friends/{}", user_id))
        .await
}
