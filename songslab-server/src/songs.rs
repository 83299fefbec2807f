use axum::{
    extract::Path,
    routing::{delete, get, patch, post},
    Json,
};
use songslab_collab::{NewSongRequest, UpdatedSongRequest, Principal};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewSongSchema, UpdateSongSchema, ValidatedJson},
    serialized::{PublicSong, Song, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/songs",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Song>)
    )
)]
pub(crate) async fn list_songs(session: Session, context: ServerContext) -> ServerResult<Json<Vec<Song>>> {
    let songs = context.songslab.songs.list_for(&session.user()).await?;

    Ok(Json(songs.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/songs",
    tag = "songs",
    request_body = NewSongSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Song)
    )
)]
pub(crate) async fn create_song(
    session: Session,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewSongSchema>,
) -> ServerResult<Json<Song>> {
    let song = context
        .songslab
        .songs
        .create(
            &session.user(),
            NewSongRequest {
                title: body.title,
                description: body.description,
                development_stage: body.development_stage,
            },
        )
        .await?;

    Ok(Json(song.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/songs/{id}",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Song)
    )
)]
pub(crate) async fn song(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<Json<Song>> {
    let principal = Principal::User(session.user());
    let (song, _) = context.songslab.songs.song_for(song_id, &principal).await?;

    Ok(Json(song.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/songs/{id}",
    tag = "songs",
    request_body = UpdateSongSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Song)
    )
)]
pub(crate) async fn update_song(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateSongSchema>,
) -> ServerResult<Json<Song>> {
    let song = context
        .songslab
        .songs
        .update(
            song_id,
            &session.user(),
            UpdatedSongRequest {
                title: body.title,
                description: body.description,
                development_stage: body.development_stage,
            },
        )
        .await?;

    Ok(Json(song.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/songs/{id}",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Song was soft deleted")
    )
)]
pub(crate) async fn delete_song(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<()> {
    context.songslab.songs.delete(song_id, &session.user()).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/songs/{id}/restore",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Song)
    )
)]
pub(crate) async fn restore_song(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<Json<Song>> {
    let song = context
        .songslab
        .songs
        .restore(song_id, &session.user())
        .await?;

    Ok(Json(song.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/songs/{id}/share",
    tag = "songs",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Song)
    )
)]
pub(crate) async fn regenerate_share_token(
    session: Session,
    context: ServerContext,
    Path(song_id): Path<i64>,
) -> ServerResult<Json<Song>> {
    let song = context
        .songslab
        .songs
        .regenerate_share_token(song_id, &session.user())
        .await?;

    Ok(Json(song.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/share/{token}",
    tag = "share",
    responses(
        (status = 200, body = PublicSong)
    )
)]
pub(crate) async fn public_song(
    context: ServerContext,
    Path(token): Path<String>,
) -> ServerResult<Json<PublicSong>> {
    let song_and_owner = context.songslab.songs.public_song(&token).await?;

    Ok(Json(song_and_owner.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_songs))
        .route("/", post(create_song))
        .route("/:id", get(song))
        .route("/:id", patch(update_song))
        .route("/:id", delete(delete_song))
        .route("/:id/restore", post(restore_song))
        .route("/:id/share", post(regenerate_share_token))
}

pub fn share_router() -> Router {
    Router::new().route("/", get(public_song))
}
