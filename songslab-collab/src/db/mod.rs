use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can fetch songslab data from a database
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn song_by_id(&self, song_id: PrimaryKey) -> Result<SongData>;
    async fn song_by_share_token(&self, token: &str) -> Result<SongData>;
    async fn songs_by_owner(&self, user_id: PrimaryKey) -> Result<Vec<SongData>>;
    async fn create_song(&self, new_song: NewSong) -> Result<SongData>;
    async fn update_song(&self, updated_song: UpdatedSong) -> Result<SongData>;
    async fn set_song_share_token(&self, song_id: PrimaryKey, token: &str) -> Result<SongData>;
    /// Tombstones a visible song. Fails with NotFound if the song is
    /// absent or already deleted.
    async fn soft_delete_song(&self, song_id: PrimaryKey) -> Result<()>;
    /// Clears the tombstone of a deleted song owned by `user_id`.
    async fn restore_song(&self, song_id: PrimaryKey, user_id: PrimaryKey) -> Result<SongData>;

    async fn membership_by_id(&self, member_id: PrimaryKey) -> Result<MembershipData>;
    async fn membership_by_song_and_email(
        &self,
        song_id: PrimaryKey,
        email: &str,
    ) -> Result<MembershipData>;
    async fn memberships_by_song(&self, song_id: PrimaryKey) -> Result<Vec<MembershipData>>;
    async fn memberships_by_owner(&self, owner_id: PrimaryKey) -> Result<Vec<MembershipData>>;
    async fn create_membership(&self, new_membership: NewMembership) -> Result<MembershipData>;
    /// Atomically responds to a pending membership. Returns None when
    /// the row exists but is no longer pending.
    async fn respond_to_membership(
        &self,
        response: MembershipResponse,
    ) -> Result<Option<MembershipData>>;
    async fn delete_membership(&self, member_id: PrimaryKey) -> Result<()>;
    /// Binds memberships without a linked user to registered users
    /// sharing their email. Idempotent, only links, never unlinks.
    /// Returns the number of memberships linked.
    async fn link_memberships_to_users(&self) -> Result<u64>;
    /// Finds an approved membership matching the user id or the email,
    /// whichever is given. Null arguments never match.
    async fn approved_membership(
        &self,
        song_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        email: Option<&str>,
    ) -> Result<Option<MembershipData>>;

    async fn comment_by_id(&self, comment_id: PrimaryKey) -> Result<CommentData>;
    async fn create_comment(&self, new_comment: NewComment) -> Result<CommentData>;
    async fn count_root_comments(&self, song_id: PrimaryKey) -> Result<i64>;
    async fn root_comments(
        &self,
        song_id: PrimaryKey,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentData>>;
    /// All direct replies to any of the given parents, newest first
    async fn replies_to(&self, parent_ids: &[PrimaryKey]) -> Result<Vec<CommentData>>;

    async fn topics(&self) -> Result<Vec<TopicData>>;
    async fn topic_by_id(&self, topic_id: PrimaryKey) -> Result<TopicData>;
    async fn upsert_topic(&self, new_topic: NewTopic) -> Result<()>;

    async fn feedback_entry_by_id(&self, entry_id: PrimaryKey) -> Result<FeedbackEntryData>;
    async fn feedback_by_song(&self, song_id: PrimaryKey) -> Result<Vec<FeedbackEntryData>>;
    /// Inserts a ledger entry, or updates the content of the existing
    /// entry for the same (song, member, topic)
    async fn upsert_feedback_entry(&self, entry: NewFeedbackEntry) -> Result<FeedbackEntryData>;
    async fn set_feedback_visibility(
        &self,
        entry_id: PrimaryKey,
        visibility: Visibility,
    ) -> Result<FeedbackEntryData>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewSong {
    /// The owner of the new song
    pub user_id: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
    pub development_stage: Option<String>,
    pub share_token: String,
}

/// A merge-style update. Fields left as [None] keep their current
/// value, which means an update can never clear a description or
/// development stage back to null.
#[derive(Debug)]
pub struct UpdatedSong {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub description: Option<String>,
    pub development_stage: Option<String>,
}

#[derive(Debug)]
pub struct NewMembership {
    pub song_id: PrimaryKey,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub contact_preference: ContactPreference,
    pub status: MembershipStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<PrimaryKey>,
}

#[derive(Debug)]
pub struct MembershipResponse {
    pub member_id: PrimaryKey,
    /// Approved or Rejected, never Pending
    pub status: MembershipStatus,
    pub rejection_reason: Option<String>,
    pub responded_by: PrimaryKey,
}

#[derive(Debug)]
pub struct NewComment {
    pub song_id: PrimaryKey,
    pub parent_id: Option<PrimaryKey>,
    pub depth: i64,
    pub author: CommentAuthor,
    pub topic_id: Option<PrimaryKey>,
    pub content: String,
}

#[derive(Debug)]
pub struct NewTopic {
    pub key: String,
    pub label: String,
    pub display_order: i64,
    pub is_active: bool,
}

#[derive(Debug)]
pub struct NewFeedbackEntry {
    pub song_id: PrimaryKey,
    pub member_id: PrimaryKey,
    pub topic_id: PrimaryKey,
    pub content: String,
}
