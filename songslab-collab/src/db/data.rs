use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// A songslab account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A song uploaded by a songwriter
#[derive(Debug, Clone)]
pub struct SongData {
    pub id: PrimaryKey,
    /// The songwriter that owns the song
    pub user_id: PrimaryKey,
    pub title: String,
    pub description: Option<String>,
    pub development_stage: Option<String>,
    /// Opaque unguessable token used in share links
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    /// Set when the song is soft deleted. Tombstoned songs are
    /// invisible to every read path until restored.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Where a membership is in its access lifecycle.
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown membership status: {}", other)),
        }
    }
}

/// How an invitee wants to be contacted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPreference {
    Email,
    Sms,
    Whatsapp,
}

impl ContactPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl FromStr for ContactPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(format!("unknown contact preference: {}", other)),
        }
    }
}

/// One (song, contact) access relationship
#[derive(Debug, Clone)]
pub struct MembershipData {
    pub id: PrimaryKey,
    pub song_id: PrimaryKey,
    /// Null until the invitee registers an account with the same email
    pub user_id: Option<PrimaryKey>,
    /// Name provided when requesting access
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub contact_preference: ContactPreference,
    pub status: MembershipStatus,
    /// Set only when the request was rejected
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    /// The songwriter who approved or rejected the request
    pub responded_by: Option<PrimaryKey>,
}

impl MembershipData {
    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }

    pub fn is_pending(&self) -> bool {
        self.status == MembershipStatus::Pending
    }
}

/// Who wrote a comment. Exactly one of the two, never both, never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAuthor {
    /// The songwriter, by user id
    User(PrimaryKey),
    /// A sounding board member, by membership id
    Member(PrimaryKey),
}

/// A threaded discussion comment
#[derive(Debug, Clone)]
pub struct CommentData {
    pub id: PrimaryKey,
    pub song_id: PrimaryKey,
    /// Null for root comments
    pub parent_id: Option<PrimaryKey>,
    /// Cached tree depth: 0 for roots, parent depth + 1 otherwise
    pub depth: i64,
    pub author: CommentAuthor,
    /// Display name resolved at read time. Prefers the linked user
    /// profile over the name stored on the membership.
    pub author_name: String,
    /// Only meaningful on root comments
    pub topic_id: Option<PrimaryKey>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A feedback topic, read-mostly reference data
#[derive(Debug, Clone)]
pub struct TopicData {
    pub id: PrimaryKey,
    pub key: String,
    pub label: String,
    pub display_order: i64,
    pub is_active: bool,
}

/// Who can see a structured feedback entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Group,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "group" => Ok(Self::Group),
            other => Err(format!("unknown visibility: {}", other)),
        }
    }
}

/// One row of the structured feedback ledger, unique per (song, member, topic)
#[derive(Debug, Clone)]
pub struct FeedbackEntryData {
    pub id: PrimaryKey,
    pub song_id: PrimaryKey,
    pub member_id: PrimaryKey,
    pub topic_id: PrimaryKey,
    pub content: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
