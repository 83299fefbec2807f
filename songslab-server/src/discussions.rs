use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json,
};
use songslab_collab::{NewCommentRequest, Principal};

use crate::{
    auth::OptionalSession,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{DiscussionQuery, NewCommentSchema, ValidatedJson},
    serialized::{Comment, DiscussionPage, ToSerialized},
    Router,
};

/// Resolves who is talking. A session wins, otherwise the caller has
/// to identify themselves by the email their membership was made with.
fn principal_from(
    session: OptionalSession,
    email: Option<String>,
) -> Result<Principal, ServerError> {
    if let Some(session) = session.0 {
        return Ok(Principal::User(session.user));
    }

    email
        .map(Principal::Email)
        .ok_or(ServerError::BadRequest("An email or session is required"))
}

#[utoipa::path(
    get,
    path = "/v1/songs/{id}/discussions",
    tag = "discussions",
    params(DiscussionQuery),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = DiscussionPage),
        (status = 403, description = "The caller has no access to the song")
    )
)]
pub(crate) async fn list_discussions(
    session: OptionalSession,
    context: ServerContext,
    Path(song_id): Path<i64>,
    Query(query): Query<DiscussionQuery>,
) -> ServerResult<Json<DiscussionPage>> {
    let principal = principal_from(session, query.email)?;

    let discussion = context
        .songslab
        .discussions
        .list(song_id, &principal, query.limit, query.offset)
        .await?;

    Ok(Json(discussion.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/songs/{id}/discussions",
    tag = "discussions",
    request_body = NewCommentSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 201, body = Comment),
        (status = 403, description = "The caller has no access to the song"),
        (status = 422, description = "The content was rejected by moderation")
    )
)]
pub(crate) async fn post_comment(
    session: OptionalSession,
    context: ServerContext,
    Path(song_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<NewCommentSchema>,
) -> ServerResult<(StatusCode, Json<Comment>)> {
    let principal = principal_from(session, body.email)?;

    let comment = context
        .songslab
        .discussions
        .post_comment(
            song_id,
            &principal,
            NewCommentRequest {
                content: body.content,
                parent_id: body.parent_id,
                topic_id: body.feedback_topic_id,
            },
        )
        .await?;

    let serialized = songslab_collab::ThreadedComment {
        comment,
        replies: vec![],
    }
    .to_serialized();

    Ok((StatusCode::CREATED, Json(serialized)))
}

pub fn songs_router() -> Router {
    Router::new()
        .route("/:id/discussions", get(list_discussions))
        .route("/:id/discussions", post(post_comment))
}
