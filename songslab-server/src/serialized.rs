//! All schemas that are exposed from endpoints are defined here
//! along with the conversion impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use songslab_collab::{
    CommentAuthor, Discussion as CollabDiscussion, FeedbackEntryData, MembershipData, SessionData,
    SongData, ThreadedComment, TopicData, UserData,
};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: i64,
    username: String,
    display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Song {
    id: i64,
    title: String,
    description: Option<String>,
    development_stage: Option<String>,
    share_token: String,
    created_at: DateTime<Utc>,
}

/// What a share link visitor sees before requesting access
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicSong {
    id: i64,
    title: String,
    description: Option<String>,
    development_stage: Option<String>,
    owner_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Member {
    id: i64,
    song_id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    #[schema(value_type = String)]
    contact_preference: songslab_collab::ContactPreference,
    #[schema(value_type = String)]
    status: songslab_collab::MembershipStatus,
    rejection_reason: Option<String>,
    requested_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

/// Returned when a visitor requests access through a share link
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessRequested {
    member_id: i64,
    #[schema(value_type = String)]
    status: songslab_collab::MembershipStatus,
}

/// What a membership looks like to the visitor that requested it
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessStatus {
    has_request: bool,
    #[schema(value_type = Option<String>)]
    status: Option<songslab_collab::MembershipStatus>,
    requested_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Comment {
    id: i64,
    author_name: String,
    /// True when the songwriter wrote the comment
    from_owner: bool,
    topic_id: Option<i64>,
    depth: i64,
    content: String,
    created_at: DateTime<Utc>,
    replies: Vec<Comment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscussionPage {
    comments: Vec<Comment>,
    total_count: i64,
    has_more: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Topic {
    id: i64,
    key: String,
    label: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackEntry {
    id: i64,
    member_id: i64,
    topic_id: i64,
    content: String,
    #[schema(value_type = String)]
    visibility: songslab_collab::Visibility,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeedbackSubmitResult {
    /// How many topic entries were written
    pub feedback_count: usize,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Song> for SongData {
    fn to_serialized(&self) -> Song {
        Song {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            development_stage: self.development_stage.clone(),
            share_token: self.share_token.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<PublicSong> for (SongData, UserData) {
    fn to_serialized(&self) -> PublicSong {
        PublicSong {
            id: self.0.id,
            title: self.0.title.clone(),
            description: self.0.description.clone(),
            development_stage: self.0.development_stage.clone(),
            owner_name: self.1.display_name.clone(),
        }
    }
}

impl ToSerialized<Member> for MembershipData {
    fn to_serialized(&self) -> Member {
        Member {
            id: self.id,
            song_id: self.song_id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            contact_preference: self.contact_preference,
            status: self.status,
            rejection_reason: self.rejection_reason.clone(),
            requested_at: self.requested_at,
            responded_at: self.responded_at,
        }
    }
}

impl ToSerialized<AccessRequested> for MembershipData {
    fn to_serialized(&self) -> AccessRequested {
        AccessRequested {
            member_id: self.id,
            status: self.status,
        }
    }
}

impl ToSerialized<AccessStatus> for Option<MembershipData> {
    fn to_serialized(&self) -> AccessStatus {
        match self {
            Some(membership) => AccessStatus {
                has_request: true,
                status: Some(membership.status),
                requested_at: Some(membership.requested_at),
                responded_at: membership.responded_at,
                rejection_reason: membership.rejection_reason.clone(),
            },
            None => AccessStatus {
                has_request: false,
                status: None,
                requested_at: None,
                responded_at: None,
                rejection_reason: None,
            },
        }
    }
}

impl ToSerialized<Comment> for ThreadedComment {
    fn to_serialized(&self) -> Comment {
        Comment {
            id: self.comment.id,
            author_name: self.comment.author_name.clone(),
            from_owner: matches!(self.comment.author, CommentAuthor::User(_)),
            topic_id: self.comment.topic_id,
            depth: self.comment.depth,
            content: self.comment.content.clone(),
            created_at: self.comment.created_at,
            replies: self.replies.to_serialized(),
        }
    }
}

impl ToSerialized<DiscussionPage> for CollabDiscussion {
    fn to_serialized(&self) -> DiscussionPage {
        DiscussionPage {
            comments: self.roots.to_serialized(),
            total_count: self.total_count,
            has_more: self.has_more,
        }
    }
}

impl ToSerialized<Topic> for TopicData {
    fn to_serialized(&self) -> Topic {
        Topic {
            id: self.id,
            key: self.key.clone(),
            label: self.label.clone(),
        }
    }
}

impl ToSerialized<FeedbackEntry> for FeedbackEntryData {
    fn to_serialized(&self) -> FeedbackEntry {
        FeedbackEntry {
            id: self.id,
            member_id: self.member_id,
            topic_id: self.topic_id,
            content: self.content.clone(),
            visibility: self.visibility,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
