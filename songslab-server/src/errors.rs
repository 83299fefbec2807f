use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use songslab_collab::{
    AuthError, DatabaseError, DiscussionError, FeedbackError, MembershipError, SongError,
};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("You already have a request for this song")]
    DuplicateRequest,
    #[error("This request has already been responded to")]
    AlreadyResponded,
    #[error("You don't have access to this song")]
    Forbidden,
    #[error("{0}")]
    ContentRejected(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::DuplicateRequest => StatusCode::CONFLICT,
            Self::AlreadyResponded => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ContentRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<SongError> for ServerError {
    fn from(value: SongError) -> Self {
        match value {
            SongError::Forbidden => Self::Forbidden,
            SongError::Db(e) => e.into(),
        }
    }
}

impl From<MembershipError> for ServerError {
    fn from(value: MembershipError) -> Self {
        match value {
            MembershipError::DuplicateRequest => Self::DuplicateRequest,
            MembershipError::AlreadyResponded => Self::AlreadyResponded,
            MembershipError::Db(e) => e.into(),
        }
    }
}

impl From<DiscussionError> for ServerError {
    fn from(value: DiscussionError) -> Self {
        match value {
            DiscussionError::Forbidden => Self::Forbidden,
            DiscussionError::ContentRejected(_) | DiscussionError::ContentTooLong => {
                Self::ContentRejected(value.to_string())
            }
            DiscussionError::Db(e) => e.into(),
        }
    }
}

impl From<FeedbackError> for ServerError {
    fn from(value: FeedbackError) -> Self {
        match value {
            FeedbackError::Forbidden => Self::Forbidden,
            FeedbackError::UnknownTopic(_) => Self::ContentRejected(value.to_string()),
            FeedbackError::Db(e) => e.into(),
        }
    }
}
