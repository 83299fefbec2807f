use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, discussions, feedback, members, schemas, serialized, songs};

#[derive(OpenApi)]
#[openapi(
    modifiers(&Security),
    info(
        description = "songslab-server exposes endpoints to interact with this songslab instance"
    ),
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::user,
        songs::list_songs,
        songs::create_song,
        songs::song,
        songs::update_song,
        songs::delete_song,
        songs::restore_song,
        songs::regenerate_share_token,
        songs::public_song,
        members::list_members,
        members::song_members,
        members::approve_member,
        members::reject_member,
        members::remove_member,
        members::request_access,
        members::check_access,
        discussions::list_discussions,
        discussions::post_comment,
        feedback::list_topics,
        feedback::song_feedback,
        feedback::set_visibility,
        feedback::submit_feedback,
    ),
    components(schemas(
        schemas::LoginSchema,
        schemas::RegisterSchema,
        schemas::NewSongSchema,
        schemas::UpdateSongSchema,
        schemas::RequestAccessSchema,
        schemas::RejectSchema,
        schemas::NewCommentSchema,
        schemas::FeedbackItemSchema,
        schemas::FeedbackSubmissionSchema,
        schemas::VisibilitySchema,
        serialized::User,
        serialized::LoginResult,
        serialized::Song,
        serialized::PublicSong,
        serialized::Member,
        serialized::AccessRequested,
        serialized::AccessStatus,
        serialized::Comment,
        serialized::DiscussionPage,
        serialized::Topic,
        serialized::FeedbackEntry,
        serialized::FeedbackSubmitResult,
    ))
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
