use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, patch, post},
    Json,
};
use songslab_collab::FeedbackItem;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{FeedbackSubmissionSchema, ValidatedJson, VisibilitySchema},
    serialized::{FeedbackEntry, FeedbackSubmitResult, ToSerialized, Topic},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/feedback-topics",
    tag = "feedback",
    responses(
        (status = 200, body = Vec<Topic>)
    )
)]
pub(crate) async fn list_topics(context: ServerContext) -> ServerResult<Json<Vec<Topic>>> {
    let topics = context.songslab.feedback.topics().await?;

    Ok(Json(topics.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/songs/{id}/feedback",
    tag = "feedback",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<FeedbackEntry>)
    )
)]
pub(crate) async fn song_feedback(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<Json<Vec<FeedbackEntry>>> {
    let entries = context
        .songslab
        .feedback
        .list_for_song(song_id, &session.user())
        .await?;

    Ok(Json(entries.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/feedback/{id}/visibility",
    tag = "feedback",
    request_body = VisibilitySchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = FeedbackEntry)
    )
)]
pub(crate) async fn set_visibility(
    session: Session,
    context: ServerContext,
    Path(entry_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<VisibilitySchema>,
) -> ServerResult<Json<FeedbackEntry>> {
    let entry = context
        .songslab
        .feedback
        .set_visibility(entry_id, &session.user(), body.visibility)
        .await?;

    Ok(Json(entry.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/feedback",
    tag = "feedback",
    request_body = FeedbackSubmissionSchema,
    responses(
        (status = 201, body = FeedbackSubmitResult),
        (status = 403, description = "The email has no approved membership")
    )
)]
pub(crate) async fn submit_feedback(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<FeedbackSubmissionSchema>,
) -> ServerResult<(StatusCode, Json<FeedbackSubmitResult>)> {
    let FeedbackSubmissionSchema {
        share_token,
        email,
        feedback_items,
    } = body;

    let items = feedback_items
        .into_iter()
        .map(|entry| FeedbackItem {
            topic_id: entry.feedback_topic_id,
            content: entry.content,
        })
        .collect();

    let feedback_count = context
        .songslab
        .feedback
        .submit(&share_token, &email, items)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FeedbackSubmitResult { feedback_count }),
    ))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_feedback))
        .route("/:id/visibility", patch(set_visibility))
}

pub fn songs_router() -> Router {
    Router::new().route("/:id/feedback", get(song_feedback))
}
