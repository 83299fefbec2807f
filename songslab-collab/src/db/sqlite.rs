use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Error as SqlxError, QueryBuilder, Row, Sqlite, SqlitePool,
};

use crate::{
    CommentAuthor, CommentData, ContactPreference, Database, DatabaseError, FeedbackEntryData,
    IntoDatabaseError, MembershipData, MembershipResponse, MembershipStatus, NewComment,
    NewFeedbackEntry, NewMembership, NewSession, NewSong, NewTopic, NewUser, PrimaryKey, Result,
    SessionData, SongData, TopicData, UpdatedSong, UserData, Visibility,
};

/// The tables songslab stores its data in
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        display_name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        expires_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        development_stage TEXT,
        share_token TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        deleted_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS sounding_board_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL REFERENCES songs (id) ON DELETE CASCADE,
        user_id INTEGER REFERENCES users (id),
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        contact_preference TEXT NOT NULL DEFAULT 'email',
        status TEXT NOT NULL DEFAULT 'pending',
        rejection_reason TEXT,
        requested_at TEXT NOT NULL,
        responded_at TEXT,
        responded_by INTEGER REFERENCES users (id),
        UNIQUE (song_id, email)
    )",
    "CREATE TABLE IF NOT EXISTS feedback_topics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        label TEXT NOT NULL,
        display_order INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL REFERENCES songs (id) ON DELETE CASCADE,
        parent_id INTEGER REFERENCES comments (id) ON DELETE CASCADE,
        depth INTEGER NOT NULL DEFAULT 0,
        user_id INTEGER REFERENCES users (id) ON DELETE CASCADE,
        member_id INTEGER REFERENCES sounding_board_members (id) ON DELETE CASCADE,
        topic_id INTEGER REFERENCES feedback_topics (id),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        CHECK ((user_id IS NULL) <> (member_id IS NULL))
    )",
    "CREATE TABLE IF NOT EXISTS feedback_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL REFERENCES songs (id) ON DELETE CASCADE,
        member_id INTEGER NOT NULL REFERENCES sounding_board_members (id) ON DELETE CASCADE,
        topic_id INTEGER NOT NULL REFERENCES feedback_topics (id),
        content TEXT NOT NULL,
        visibility TEXT NOT NULL DEFAULT 'private',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (song_id, member_id, topic_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_members_song ON sounding_board_members (song_id)",
    "CREATE INDEX IF NOT EXISTS idx_members_email ON sounding_board_members (email)",
    "CREATE INDEX IF NOT EXISTS idx_comments_song_parent ON comments (song_id, parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments (parent_id)",
];

/// Shared column list for comment queries. The display name of the
/// author is resolved here: a songwriter comment uses their profile, a
/// member comment prefers the linked user profile over the name stored
/// on the membership.
const COMMENT_SELECT: &str = "
    SELECT
        comments.*,
        owner.display_name AS user_name,
        members.name AS member_name,
        linked.display_name AS linked_name
    FROM comments
        LEFT JOIN users AS owner ON comments.user_id = owner.id
        LEFT JOIN sounding_board_members AS members ON comments.member_id = members.id
        LEFT JOIN users AS linked ON members.user_id = linked.id";

/// A SQLite database implementation for songslab
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true)
            .foreign_keys(true);

        // SQLite serializes writers anyway, and a single pooled
        // connection keeps :memory: databases alive across queries
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        let db = Self { pool };
        db.setup_schema().await?;

        Ok(db)
    }

    async fn setup_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(())
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        map_user(&row)
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "username"))?;

        map_user(&row)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        match self.user_by_username(&new_user.username).await {
            Ok(_) => {
                return Err(DatabaseError::Conflict {
                    resource: "user",
                    field: "username",
                    value: new_user.username,
                })
            }
            Err(DatabaseError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let result = sqlx::query(
            "INSERT INTO users (username, email, password, display_name) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .execute(&self.pool)
        .await
        .map_err(|e| e.conflict_or("user", "email", &new_user.email))?;

        self.user_by_id(result.last_insert_rowid()).await
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row = sqlx::query(
            "SELECT
                sessions.*,
                users.username,
                users.email,
                users.password,
                users.display_name
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.try_get("id").map_err(|e| e.any())?,
            token: row.try_get("token").map_err(|e| e.any())?,
            expires_at: row.try_get("expires_at").map_err(|e| e.any())?,
            user: UserData {
                id: row.try_get("user_id").map_err(|e| e.any())?,
                username: row.try_get("username").map_err(|e| e.any())?,
                email: row.try_get("email").map_err(|e| e.any())?,
                password: row.try_get("password").map_err(|e| e.any())?,
                display_name: row.try_get("display_name").map_err(|e| e.any())?,
            },
        })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or("session", "token", &new_session.token))?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn song_by_id(&self, song_id: PrimaryKey) -> Result<SongData> {
        let row = sqlx::query("SELECT * FROM songs WHERE id = ? AND deleted_at IS NULL")
            .bind(song_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("song", "id"))?;

        map_song(&row)
    }

    async fn song_by_share_token(&self, token: &str) -> Result<SongData> {
        let row = sqlx::query("SELECT * FROM songs WHERE share_token = ? AND deleted_at IS NULL")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("song", "share_token"))?;

        map_song(&row)
    }

    async fn songs_by_owner(&self, user_id: PrimaryKey) -> Result<Vec<SongData>> {
        let rows = sqlx::query(
            "SELECT * FROM songs
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_song).collect()
    }

    async fn create_song(&self, new_song: NewSong) -> Result<SongData> {
        let result = sqlx::query(
            "INSERT INTO songs (user_id, title, description, development_stage, share_token, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new_song.user_id)
        .bind(&new_song.title)
        .bind(&new_song.description)
        .bind(&new_song.development_stage)
        .bind(&new_song.share_token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| e.conflict_or("song", "share_token", &new_song.share_token))?;

        self.song_by_id(result.last_insert_rowid()).await
    }

    async fn update_song(&self, updated_song: UpdatedSong) -> Result<SongData> {
        let song = self.song_by_id(updated_song.id).await?;

        sqlx::query(
            "UPDATE songs SET
                title = ?,
                description = ?,
                development_stage = ?
            WHERE id = ?",
        )
        .bind(updated_song.title.unwrap_or(song.title))
        .bind(updated_song.description.or(song.description))
        .bind(updated_song.development_stage.or(song.development_stage))
        .bind(updated_song.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.song_by_id(updated_song.id).await
    }

    async fn set_song_share_token(&self, song_id: PrimaryKey, token: &str) -> Result<SongData> {
        // Ensure song exists and is visible
        let _ = self.song_by_id(song_id).await?;

        sqlx::query("UPDATE songs SET share_token = ? WHERE id = ?")
            .bind(token)
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.conflict_or("song", "share_token", token))?;

        self.song_by_id(song_id).await
    }

    async fn soft_delete_song(&self, song_id: PrimaryKey) -> Result<()> {
        let result =
            sqlx::query("UPDATE songs SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(Utc::now())
                .bind(song_id)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "song",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn restore_song(&self, song_id: PrimaryKey, user_id: PrimaryKey) -> Result<SongData> {
        let result = sqlx::query(
            "UPDATE songs SET deleted_at = NULL
            WHERE id = ? AND user_id = ? AND deleted_at IS NOT NULL",
        )
        .bind(song_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "song",
                identifier: "id",
            });
        }

        self.song_by_id(song_id).await
    }

    async fn membership_by_id(&self, member_id: PrimaryKey) -> Result<MembershipData> {
        let row = sqlx::query("SELECT * FROM sounding_board_members WHERE id = ?")
            .bind(member_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("sounding board member", "id"))?;

        map_membership(&row)
    }

    async fn membership_by_song_and_email(
        &self,
        song_id: PrimaryKey,
        email: &str,
    ) -> Result<MembershipData> {
        let row = sqlx::query("SELECT * FROM sounding_board_members WHERE song_id = ? AND email = ?")
            .bind(song_id)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("sounding board member", "song:email"))?;

        map_membership(&row)
    }

    async fn memberships_by_song(&self, song_id: PrimaryKey) -> Result<Vec<MembershipData>> {
        let rows = sqlx::query(
            "SELECT * FROM sounding_board_members
            WHERE song_id = ?
            ORDER BY requested_at DESC, id DESC",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_membership).collect()
    }

    async fn memberships_by_owner(&self, owner_id: PrimaryKey) -> Result<Vec<MembershipData>> {
        let rows = sqlx::query(
            "SELECT sounding_board_members.* FROM sounding_board_members
                INNER JOIN songs ON sounding_board_members.song_id = songs.id
            WHERE songs.user_id = ? AND songs.deleted_at IS NULL
            ORDER BY sounding_board_members.requested_at DESC, sounding_board_members.id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_membership).collect()
    }

    async fn create_membership(&self, new_membership: NewMembership) -> Result<MembershipData> {
        let result = sqlx::query(
            "INSERT INTO sounding_board_members
                (song_id, name, email, phone, contact_preference, status, requested_at, responded_at, responded_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_membership.song_id)
        .bind(&new_membership.name)
        .bind(&new_membership.email)
        .bind(&new_membership.phone)
        .bind(new_membership.contact_preference.as_str())
        .bind(new_membership.status.as_str())
        .bind(Utc::now())
        .bind(new_membership.responded_at)
        .bind(new_membership.responded_by)
        .execute(&self.pool)
        .await
        .map_err(|e| e.conflict_or("sounding board member", "song:email", &new_membership.email))?;

        self.membership_by_id(result.last_insert_rowid()).await
    }

    async fn respond_to_membership(
        &self,
        response: MembershipResponse,
    ) -> Result<Option<MembershipData>> {
        // The status precondition is part of the update itself, so a
        // concurrent second response affects zero rows instead of
        // overwriting the first
        let result = sqlx::query(
            "UPDATE sounding_board_members SET
                status = ?,
                rejection_reason = ?,
                responded_at = ?,
                responded_by = ?
            WHERE id = ? AND status = 'pending'",
        )
        .bind(response.status.as_str())
        .bind(&response.rejection_reason)
        .bind(Utc::now())
        .bind(response.responded_by)
        .bind(response.member_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a non-pending one
            let _ = self.membership_by_id(response.member_id).await?;
            return Ok(None);
        }

        self.membership_by_id(response.member_id).await.map(Some)
    }

    async fn delete_membership(&self, member_id: PrimaryKey) -> Result<()> {
        // Ensure membership exists
        let _ = self.membership_by_id(member_id).await?;

        sqlx::query("DELETE FROM sounding_board_members WHERE id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn link_memberships_to_users(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sounding_board_members
            SET user_id = (
                SELECT id FROM users WHERE users.email = sounding_board_members.email
            )
            WHERE user_id IS NULL
                AND email IS NOT NULL
                AND EXISTS (
                    SELECT 1 FROM users WHERE users.email = sounding_board_members.email
                )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(result.rows_affected())
    }

    async fn approved_membership(
        &self,
        song_id: PrimaryKey,
        user_id: Option<PrimaryKey>,
        email: Option<&str>,
    ) -> Result<Option<MembershipData>> {
        // A null bind never matches, so absent principals fall out of
        // the OR naturally
        let row = sqlx::query(
            "SELECT * FROM sounding_board_members
            WHERE song_id = ? AND status = 'approved' AND (user_id = ? OR email = ?)",
        )
        .bind(song_id)
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        row.as_ref().map(map_membership).transpose()
    }

    async fn comment_by_id(&self, comment_id: PrimaryKey) -> Result<CommentData> {
        let row = sqlx::query(&format!("{} WHERE comments.id = ?", COMMENT_SELECT))
            .bind(comment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("comment", "id"))?;

        map_comment(&row)
    }

    async fn create_comment(&self, new_comment: NewComment) -> Result<CommentData> {
        let (user_id, member_id) = match new_comment.author {
            CommentAuthor::User(id) => (Some(id), None),
            CommentAuthor::Member(id) => (None, Some(id)),
        };

        let result = sqlx::query(
            "INSERT INTO comments (song_id, parent_id, depth, user_id, member_id, topic_id, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_comment.song_id)
        .bind(new_comment.parent_id)
        .bind(new_comment.depth)
        .bind(user_id)
        .bind(member_id)
        .bind(new_comment.topic_id)
        .bind(&new_comment.content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.comment_by_id(result.last_insert_rowid()).await
    }

    async fn count_root_comments(&self, song_id: PrimaryKey) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM comments WHERE song_id = ? AND parent_id IS NULL",
        )
        .bind(song_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        row.try_get("count").map_err(|e| e.any())
    }

    async fn root_comments(
        &self,
        song_id: PrimaryKey,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentData>> {
        let rows = sqlx::query(&format!(
            "{} WHERE comments.song_id = ? AND comments.parent_id IS NULL
            ORDER BY comments.created_at DESC, comments.id DESC
            LIMIT ? OFFSET ?",
            COMMENT_SELECT
        ))
        .bind(song_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_comment).collect()
    }

    async fn replies_to(&self, parent_ids: &[PrimaryKey]) -> Result<Vec<CommentData>> {
        if parent_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("{} WHERE comments.parent_id IN (", COMMENT_SELECT));

        let mut ids = builder.separated(", ");
        for id in parent_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY comments.created_at DESC, comments.id DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        rows.iter().map(map_comment).collect()
    }

    async fn topics(&self) -> Result<Vec<TopicData>> {
        let rows = sqlx::query(
            "SELECT * FROM feedback_topics WHERE is_active = 1 ORDER BY display_order ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_topic).collect()
    }

    async fn topic_by_id(&self, topic_id: PrimaryKey) -> Result<TopicData> {
        let row = sqlx::query("SELECT * FROM feedback_topics WHERE id = ?")
            .bind(topic_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("feedback topic", "id"))?;

        map_topic(&row)
    }

    async fn upsert_topic(&self, new_topic: NewTopic) -> Result<()> {
        sqlx::query(
            "INSERT INTO feedback_topics (key, label, display_order, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                label = excluded.label,
                display_order = excluded.display_order,
                is_active = excluded.is_active",
        )
        .bind(&new_topic.key)
        .bind(&new_topic.label)
        .bind(new_topic.display_order)
        .bind(new_topic.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn feedback_entry_by_id(&self, entry_id: PrimaryKey) -> Result<FeedbackEntryData> {
        let row = sqlx::query("SELECT * FROM feedback_entries WHERE id = ?")
            .bind(entry_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("feedback entry", "id"))?;

        map_entry(&row)
    }

    async fn feedback_by_song(&self, song_id: PrimaryKey) -> Result<Vec<FeedbackEntryData>> {
        let rows = sqlx::query(
            "SELECT * FROM feedback_entries WHERE song_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(map_entry).collect()
    }

    async fn upsert_feedback_entry(&self, entry: NewFeedbackEntry) -> Result<FeedbackEntryData> {
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO feedback_entries (song_id, member_id, topic_id, content, visibility, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'private', ?, ?)
            ON CONFLICT (song_id, member_id, topic_id) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            RETURNING id",
        )
        .bind(entry.song_id)
        .bind(entry.member_id)
        .bind(entry.topic_id)
        .bind(&entry.content)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let id: PrimaryKey = row.try_get("id").map_err(|e| e.any())?;

        self.feedback_entry_by_id(id).await
    }

    async fn set_feedback_visibility(
        &self,
        entry_id: PrimaryKey,
        visibility: Visibility,
    ) -> Result<FeedbackEntryData> {
        // Ensure entry exists
        let _ = self.feedback_entry_by_id(entry_id).await?;

        sqlx::query("UPDATE feedback_entries SET visibility = ?, updated_at = ? WHERE id = ?")
            .bind(visibility.as_str())
            .bind(Utc::now())
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.feedback_entry_by_id(entry_id).await
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }

    fn conflict_or(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        let is_unique_violation = self
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false);

        if is_unique_violation {
            DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }
        } else {
            Self::any(self)
        }
    }
}

fn column<'a, T>(row: &'a SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name).map_err(|e| e.any())
}

fn parse<T: FromStr<Err = String>>(value: String) -> Result<T> {
    value.parse().map_err(|e: String| DatabaseError::Internal(e.into()))
}

fn map_user(row: &SqliteRow) -> Result<UserData> {
    Ok(UserData {
        id: column(row, "id")?,
        username: column(row, "username")?,
        email: column(row, "email")?,
        password: column(row, "password")?,
        display_name: column(row, "display_name")?,
    })
}

fn map_song(row: &SqliteRow) -> Result<SongData> {
    Ok(SongData {
        id: column(row, "id")?,
        user_id: column(row, "user_id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        development_stage: column(row, "development_stage")?,
        share_token: column(row, "share_token")?,
        created_at: column(row, "created_at")?,
        deleted_at: column(row, "deleted_at")?,
    })
}

fn map_membership(row: &SqliteRow) -> Result<MembershipData> {
    Ok(MembershipData {
        id: column(row, "id")?,
        song_id: column(row, "song_id")?,
        user_id: column(row, "user_id")?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        phone: column(row, "phone")?,
        contact_preference: parse::<ContactPreference>(column(row, "contact_preference")?)?,
        status: parse::<MembershipStatus>(column(row, "status")?)?,
        rejection_reason: column(row, "rejection_reason")?,
        requested_at: column(row, "requested_at")?,
        responded_at: column(row, "responded_at")?,
        responded_by: column(row, "responded_by")?,
    })
}

fn map_comment(row: &SqliteRow) -> Result<CommentData> {
    let user_id: Option<PrimaryKey> = column(row, "user_id")?;
    let member_id: Option<PrimaryKey> = column(row, "member_id")?;

    let user_name: Option<String> = column(row, "user_name")?;
    let member_name: Option<String> = column(row, "member_name")?;
    let linked_name: Option<String> = column(row, "linked_name")?;

    let (author, author_name) = match (user_id, member_id) {
        (Some(id), None) => (
            CommentAuthor::User(id),
            user_name.unwrap_or_else(|| "Unknown".to_string()),
        ),
        (None, Some(id)) => (
            CommentAuthor::Member(id),
            linked_name
                .or(member_name)
                .unwrap_or_else(|| "Unknown".to_string()),
        ),
        _ => {
            return Err(DatabaseError::Internal(
                "comment row violates the exactly-one-author constraint".into(),
            ))
        }
    };

    Ok(CommentData {
        id: column(row, "id")?,
        song_id: column(row, "song_id")?,
        parent_id: column(row, "parent_id")?,
        depth: column(row, "depth")?,
        author,
        author_name,
        topic_id: column(row, "topic_id")?,
        content: column(row, "content")?,
        created_at: column(row, "created_at")?,
    })
}

fn map_topic(row: &SqliteRow) -> Result<TopicData> {
    Ok(TopicData {
        id: column(row, "id")?,
        key: column(row, "key")?,
        label: column(row, "label")?,
        display_order: column(row, "display_order")?,
        is_active: column(row, "is_active")?,
    })
}

fn map_entry(row: &SqliteRow) -> Result<FeedbackEntryData> {
    Ok(FeedbackEntryData {
        id: column(row, "id")?,
        song_id: column(row, "song_id")?,
        member_id: column(row, "member_id")?,
        topic_id: column(row, "topic_id")?,
        content: column(row, "content")?,
        visibility: parse::<Visibility>(column(row, "visibility")?)?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}
