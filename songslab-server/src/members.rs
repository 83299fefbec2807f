use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{delete, get, post},
    Json,
};
use songslab_collab::NewAccessRequest;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{CheckAccessQuery, RejectSchema, RequestAccessSchema, ValidatedJson},
    serialized::{AccessRequested, AccessStatus, Member, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/sounding-board",
    tag = "sounding-board",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Member>)
    )
)]
pub(crate) async fn list_members(
    session: Session,
    context: ServerContext,
) -> ServerResult<Json<Vec<Member>>> {
    let members: Vec<Member> = context
        .songslab
        .memberships
        .members_for_owner(&session.user())
        .await?
        .to_serialized();

    Ok(Json(members))
}

#[utoipa::path(
    get,
    path = "/v1/sounding-board/song/{songId}",
    tag = "sounding-board",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Member>)
    )
)]
pub(crate) async fn song_members(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<Json<Vec<Member>>> {
    let members: Vec<Member> = context
        .songslab
        .memberships
        .members_for_song(song_id, &session.user())
        .await?
        .to_serialized();

    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/v1/sounding-board/{memberId}/approve",
    tag = "sounding-board",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Member),
        (status = 400, description = "The request was already responded to"),
        (status = 404, description = "No such member on the owner's songs")
    )
)]
pub(crate) async fn approve_member(
    session: Session,
    context: ServerContext,
    Path(member_id): Path<i64>,
) -> ServerResult<Json<Member>> {
    let membership = context
        .songslab
        .memberships
        .approve(member_id, &session.user())
        .await?;

    Ok(Json(ToSerialized::<Member>::to_serialized(&membership)))
}

#[utoipa::path(
    post,
    path = "/v1/sounding-board/{memberId}/reject",
    tag = "sounding-board",
    request_body = RejectSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Member),
        (status = 400, description = "The request was already responded to"),
        (status = 404, description = "No such member on the owner's songs")
    )
)]
pub(crate) async fn reject_member(
    session: Session,
    context: ServerContext,
    Path(member_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<RejectSchema>,
) -> ServerResult<Json<Member>> {
    let membership = context
        .songslab
        .memberships
        .reject(member_id, &session.user(), body.reason)
        .await?;

    Ok(Json(ToSerialized::<Member>::to_serialized(&membership)))
}

#[utoipa::path(
    delete,
    path = "/v1/sounding-board/{memberId}",
    tag = "sounding-board",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Member was removed and access revoked")
    )
)]
pub(crate) async fn remove_member(
    session: Session,
    context: ServerContext,
    Path(member_id): Path<i64>,
) -> ServerResult<()> {
    context
        .songslab
        .memberships
        .remove(member_id, &session.user())
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/share/{token}/request-access",
    tag = "share",
    request_body = RequestAccessSchema,
    responses(
        (status = 201, body = AccessRequested),
        (status = 404, description = "The share link is invalid"),
        (status = 409, description = "A request for this email already exists")
    )
)]
pub(crate) async fn request_access(
    context: ServerContext,
    Path(token): Path<String>,
    ValidatedJson(body): ValidatedJson<RequestAccessSchema>,
) -> ServerResult<(StatusCode, Json<AccessRequested>)> {
    let membership = context
        .songslab
        .memberships
        .request_access(
            &token,
            NewAccessRequest {
                name: body.name,
                email: body.email,
                phone: body.phone,
                contact_preference: body.contact_preference,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ToSerialized::<AccessRequested>::to_serialized(&membership)),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/share/{token}/check-access",
    tag = "share",
    params(CheckAccessQuery),
    responses(
        (status = 200, body = AccessStatus)
    )
)]
pub(crate) async fn check_access(
    context: ServerContext,
    Path(token): Path<String>,
    Query(query): Query<CheckAccessQuery>,
) -> ServerResult<Json<AccessStatus>> {
    let membership = context
        .songslab
        .memberships
        .check_access(&token, &query.email)
        .await?;

    Ok(Json(membership.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_members))
        .route("/song/:songId", get(song_members))
        .route("/:memberId", delete(remove_member))
        .route("/:memberId/approve", post(approve_member))
        .route("/:memberId/reject", post(reject_member))
}

pub fn share_router() -> Router {
    Router::new()
        .route("/request-access", post(request_access))
        .route("/check-access", get(check_access))
}
