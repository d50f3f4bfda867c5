use reqwest::Method;

use parley_types::api::{
    BansResponse, GuildNameRequest, GuildsResponse, MembersResponse, PermissionsResponse,
    RoleRequest, RolesResponse,
};
use parley_types::models::{Ban, Guild, Member, Role};

use crate::client::ApiClient;
use crate::error::ApiError;

// -- Guild CRUD --

pub async fn my_guilds(api: &ApiClient) -> Result<Vec<Guild>, ApiError> {
    let resp: GuildsResponse = api.get("/guilds/user").await?;
    Ok(resp.guilds)
}

pub async fn get_guild(api: &ApiClient, guild_id: &str) -> Result<Guild, ApiError> {
    api.get(&format!("/guilds/{}", guild_id)).await
}

pub async fn create_guild(api: &ApiClient, guild_name: &str) -> Result<(), ApiError> {
    let body = GuildNameRequest {
        guild_name: guild_name.to_string(),
    };
    api.send(Method::POST, "/guilds", &body).await
}

pub async fn rename_guild(api: &ApiClient, guild_id: &str, guild_name: &str) -> Result<(), ApiError> {
    let body = GuildNameRequest {
        guild_name: guild_name.to_string(),
    };
    api.send(Method::PATCH, &format!("/guilds/{}", guild_id), &body).await
}

pub async fn delete_guild(api: &ApiClient, guild_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/guilds/{}", guild_id)).await
}

pub async fn join_guild(api: &ApiClient, guild_id: &str) -> Result<(), ApiError> {
    api.execute(Method::POST, &format!("/guilds/{}/join", guild_id)).await
}

pub async fn transfer_ownership(api: &ApiClient, guild_id: &str, new_owner_id: &str) -> Result<(), ApiError> {
    api.execute(Method::PATCH, &format!("/guilds/{}/ownership/{}", guild_id, new_owner_id))
        .await
}

// -- Membership --

pub async fn members(api: &ApiClient, guild_id: &str) -> Result<Vec<Member>, ApiError> {
    let resp: MembersResponse = api.get(&format!("/guilds/{}/members", guild_id)).await?;
    Ok(resp.members)
}

/// Kick a member, or leave the guild when `user_id` is the caller.
pub async fn remove_member(api: &ApiClient, guild_id: &str, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/guilds/{}/members/{}", guild_id, user_id))
        .await
}

pub async fn bans(api: &ApiClient, guild_id: &str) -> Result<Vec<Ban>, ApiError> {
    let resp: BansResponse = api.get(&format!("/guilds/{}/bans", guild_id)).await?;
    Ok(resp.bans)
}

pub async fn ban_member(api: &ApiClient, guild_id: &str, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::POST, &format!("/guilds/{}/bans/{}", guild_id, user_id))
        .await
}

pub async fn unban_member(api: &ApiClient, guild_id: &str, user_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/guilds/{}/bans/{}", guild_id, user_id))
        .await
}

// -- Roles --

pub async fn roles(api: &ApiClient, guild_id: &str) -> Result<Vec<Role>, ApiError> {
    let resp: RolesResponse = api.get(&format!("/guilds/{}/roles", guild_id)).await?;
    Ok(resp.roles)
}

pub async fn member_roles(api: &ApiClient, guild_id: &str, member_id: &str) -> Result<Vec<Role>, ApiError> {
    let resp: RolesResponse = api
        .get(&format!("/guilds/{}/roles/{}", guild_id, member_id))
        .await?;
    Ok(resp.roles)
}

pub async fn create_role(api: &ApiClient, guild_id: &str, role: &RoleRequest) -> Result<(), ApiError> {
    api.send(Method::POST, &format!("/guilds/{}/roles", guild_id), role).await
}

pub async fn update_role(
    api: &ApiClient,
    guild_id: &str,
    role_id: &str,
    role: &RoleRequest,
) -> Result<(), ApiError> {
    api.send(Method::PATCH, &format!("/guilds/{}/roles/{}", guild_id, role_id), role)
        .await
}

pub async fn delete_role(api: &ApiClient, guild_id: &str, role_id: &str) -> Result<(), ApiError> {
    api.execute(Method::DELETE, &format!("/guilds/{}/roles/{}", guild_id, role_id))
        .await
}

pub async fn assign_role(api: &ApiClient, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), ApiError> {
    api.execute(
        Method::POST,
        &format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id),
    )
    .await
}

pub async fn unassign_role(api: &ApiClient, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), ApiError> {
    api.execute(
        Method::DELETE,
        &format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id),
    )
    .await
}

// -- Permissions --

pub async fn permissions(api: &ApiClient, guild_id: &str) -> Result<PermissionsResponse, ApiError> {
    api.get(&format!("/guilds/{}/permissions", guild_id)).await
}
