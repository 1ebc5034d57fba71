//! Group API endpoints

use api_types::group::{Group, GroupInfoResponse, GroupNew, GroupView, GroupsResponse};
use api_types::membership::MemberView;
use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{ServerError, memberships, server::ServerState, user};

/// Handle requests for creating a new group.
pub async fn group_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<Group>), ServerError> {
    let group_id = state.engine.new_group(&payload.name, &user.username).await?;

    Ok((
        StatusCode::CREATED,
        Json(Group {
            id: Some(group_id),
            name: Some(payload.name),
        }),
    ))
}

/// Handle requests for reading one group with its member list.
pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Group>,
) -> Result<Json<GroupInfoResponse>, ServerError> {
    if payload.id.is_none() && payload.name.is_none() {
        return Err(ServerError::Generic("id or name required".to_string()));
    }

    let (group, members) = state
        .engine
        .group_details(payload.id.as_deref(), payload.name, &user.username)
        .await?;

    let members = members
        .into_iter()
        .map(|(username, role)| MemberView {
            role: memberships::map_role(&role),
            username,
        })
        .collect();

    Ok(Json(GroupInfoResponse {
        id: group.id,
        name: group.name,
        owner: group.user_id,
        members,
    }))
}

/// Handle requests for deleting a group (owner only).
pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<Group>,
) -> Result<StatusCode, ServerError> {
    let Some(group_id) = payload.id else {
        return Err(ServerError::Generic("id required".to_string()));
    };

    state.engine.delete_group(&group_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle requests for listing the caller's groups.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GroupsResponse>, ServerError> {
    let groups = state
        .engine
        .list_user_groups(&user.username)
        .await?
        .into_iter()
        .map(|group| GroupView {
            id: group.id,
            name: group.name,
            owner: group.user_id,
        })
        .collect();

    Ok(Json(GroupsResponse { groups }))
}
