//! HTTP request handlers.
//!
//! Store work is synchronous, so every handler moves it onto the blocking
//! pool. Search handlers also hand the directory a cancellation token that
//! fires if the request future is dropped.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use circles_directory::DirectoryError;
use circles_types::{Group, GroupId, User, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Run store work on the blocking pool and fold its error into [`ApiError`].
async fn blocking<T, E, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?.map_err(Into::into)
}

fn parse_group_id(raw: &str) -> Result<GroupId, ApiError> {
    GroupId::parse(raw).map_err(|_| ApiError::InvalidArgument("Group ID is required".into()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidArgument(rejection.body_text()))
}

// ── Follow ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    #[serde(default)]
    pub group_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub message: String,
    pub group_id: GroupId,
    pub is_following: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowResponse {
    pub message: String,
    pub group_id: GroupId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatusEntry {
    #[serde(rename = "_id")]
    pub id: GroupId,
    pub title: String,
    pub is_following: bool,
}

/// `POST /follow`: toggle the caller's follow of a group.
pub async fn follow(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: Result<Json<GroupRequest>, JsonRejection>,
) -> Result<Json<FollowResponse>, ApiError> {
    let group_id = parse_group_id(&json_body(body)?.group_id)?;

    let reconciler = state.reconciler.clone();
    let (u, g) = (user_id.clone(), group_id.clone());
    let is_following = blocking(move || reconciler.toggle_follow(&u, &g)).await?;

    if let Some(metrics) = &state.metrics {
        let change = if is_following { "follow" } else { "unfollow" };
        metrics.follow_changes.with_label_values(&[change]).inc();
    }
    tracing::info!(user = %user_id, group = %group_id, is_following, "follow toggled");

    let message = if is_following {
        "Followed the group successfully"
    } else {
        "Unfollowed the group successfully"
    };
    Ok(Json(FollowResponse {
        message: message.into(),
        group_id,
        is_following,
    }))
}

/// `POST /unfollow`: remove the caller's follow of a group, if any.
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: Result<Json<GroupRequest>, JsonRejection>,
) -> Result<Json<UnfollowResponse>, ApiError> {
    let group_id = parse_group_id(&json_body(body)?.group_id)?;

    let reconciler = state.reconciler.clone();
    let (u, g) = (user_id.clone(), group_id.clone());
    let changed = blocking(move || reconciler.unfollow(&u, &g)).await?;

    if changed {
        if let Some(metrics) = &state.metrics {
            metrics.follow_changes.with_label_values(&["unfollow"]).inc();
        }
        tracing::info!(user = %user_id, group = %group_id, "unfollowed group");
    }

    Ok(Json(UnfollowResponse {
        message: "Successfully unfollowed the group.".into(),
        group_id,
    }))
}

/// `GET /follow-status`: every group the caller follows.
pub async fn follow_status(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<FollowStatusEntry>>, ApiError> {
    let reconciler = state.reconciler.clone();
    let followed = if state.repair_on_read {
        let outcome = blocking(move || reconciler.reconcile_follow_status(&user_id)).await?;
        if let Some(metrics) = &state.metrics {
            metrics.follows_repaired.inc_by(outcome.repaired.len() as u64);
        }
        outcome.followed
    } else {
        blocking(move || reconciler.followed_groups(&user_id)).await?
    };

    Ok(Json(
        followed
            .into_iter()
            .map(|group| FollowStatusEntry {
                id: group.id,
                title: group.title,
                is_following: true,
            })
            .collect(),
    ))
}

// ── Group ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersResponse {
    pub success: bool,
    pub message: String,
    pub group_id: GroupId,
    pub added: Vec<UserId>,
}

/// `POST /addMember`: add users to a group with the full follow relation.
pub async fn add_members(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    body: Result<Json<AddMembersRequest>, JsonRejection>,
) -> Result<Json<AddMembersResponse>, ApiError> {
    let request = json_body(body)?;
    let group_id = parse_group_id(&request.group_id)?;
    let member_ids = request
        .member_ids
        .iter()
        .map(|raw| UserId::parse(raw))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::InvalidArgument("member ids must not be blank".into()))?;

    let reconciler = state.reconciler.clone();
    let g = group_id.clone();
    let added = blocking(move || reconciler.add_members(&g, &member_ids)).await?;

    if let Some(metrics) = &state.metrics {
        metrics.members_added.inc_by(added.len() as u64);
    }
    tracing::info!(caller = %caller, group = %group_id, added = added.len(), "members added");

    Ok(Json(AddMembersResponse {
        success: true,
        message: "Members added successfully".into(),
        group_id,
        added,
    }))
}

/// `GET /group/:group_id`: a single group record.
pub async fn group(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let group_id = parse_group_id(&raw_id)?;
    let reconciler = state.reconciler.clone();
    let group = blocking(move || reconciler.group(&group_id)).await?;
    Ok(Json(group))
}

// ── Search ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: Option<String>,
    pub group_id: Option<String>,
}

/// Run one directory search with a per-request cancellation token.
///
/// If the client disconnects, axum drops this future, the drop guard
/// cancels the token and the blocking scan stops at its next check.
async fn run_search<F>(
    state: &AppState,
    kind: &'static str,
    search: F,
) -> Result<Json<Vec<User>>, ApiError>
where
    F: FnOnce(&CancellationToken) -> Result<Vec<User>, DirectoryError> + Send + 'static,
{
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    let started = Instant::now();

    let users = blocking(move || search(&token)).await?;
    guard.disarm();

    if let Some(metrics) = &state.metrics {
        metrics.searches.with_label_values(&[kind]).inc();
        metrics
            .search_seconds
            .with_label_values(&[kind])
            .observe(started.elapsed().as_secs_f64());
    }
    Ok(Json(users))
}

/// `GET /search?query=`: influencer and brand accounts.
pub async fn search_influencers_and_brands(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    let directory = state.directory.clone();
    let query = params.query.unwrap_or_default();
    run_search(&state, "promoted", move |cancel| {
        directory.search_influencers_and_brands(&query, cancel)
    })
    .await
}

/// `GET /searchUsersGroup?query=`: every matching user.
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    let directory = state.directory.clone();
    let query = params.query.unwrap_or_default();
    run_search(&state, "users", move |cancel| {
        directory.search_users(&query, cancel)
    })
    .await
}

/// `GET /searchUsersGroupMember?query=&groupId=`: matching users who are
/// not members of the group (nor the caller, when authenticated).
pub async fn search_users_excluding_group_members(
    State(state): State<AppState>,
    caller: Option<Extension<AuthUser>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    let query = params.query.unwrap_or_default();
    // Checked here as well so an empty query wins over a missing group id.
    if query.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "Search query cannot be empty".into(),
        ));
    }
    let group_id = parse_group_id(params.group_id.as_deref().unwrap_or_default())?;
    let caller = caller.map(|Extension(AuthUser(id))| id);

    let directory = state.directory.clone();
    run_search(&state, "non_members", move |cancel| {
        directory.search_users_excluding_group_members(
            &query,
            &group_id,
            caller.as_ref(),
            cancel,
        )
    })
    .await
}

// ── Service ──────────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let Some(metrics) = &state.metrics else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let body = metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
