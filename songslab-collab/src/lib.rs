//! The songslab system in a box.
//!
//! A songwriter uploads works in progress, invites trusted listeners
//! to a song's sounding board through a share link, and collects
//! their feedback as threaded discussion and structured topic
//! entries. This crate owns the domain logic and persistence; the
//! HTTP surface lives in the server crate.

use std::sync::Arc;

use log::info;

mod access;
mod auth;
mod config;
mod db;
mod discussions;
mod feedback;
pub mod filter;
mod memberships;
mod notify;
mod songs;
pub mod util;

pub use access::*;
pub use auth::*;
pub use config::*;
pub use db::*;
pub use discussions::*;
pub use feedback::*;
pub use memberships::*;
pub use notify::*;
pub use songs::*;

/// The root of the songslab system
pub struct Songslab<Db> {
    context: SongslabContext<Db>,

    pub auth: Auth<Db>,
    pub songs: SongManager<Db>,
    pub memberships: MembershipManager<Db>,
    pub discussions: DiscussionManager<Db>,
    pub feedback: FeedbackManager<Db>,
}

/// A type passed around to all the different managers
pub struct SongslabContext<Db> {
    pub database: Arc<Db>,
    pub mailer: Arc<dyn Mailer>,
    pub config: SongslabConfig,
}

impl<Db> Songslab<Db>
where
    Db: Database,
{
    pub fn new(database: Db, mailer: Arc<dyn Mailer>, config: SongslabConfig) -> Self {
        let context = SongslabContext {
            database: Arc::new(database),
            mailer,
            config,
        };

        Self {
            auth: Auth::new(&context),
            songs: SongManager::new(&context),
            memberships: MembershipManager::new(&context),
            discussions: DiscussionManager::new(&context),
            feedback: FeedbackManager::new(&context),
            context,
        }
    }

    /// Prepares the system for serving. Seeds the topic catalog and
    /// binds any memberships left unlinked since the last run.
    pub async fn init(&self) -> db::Result<()> {
        self.feedback.seed_default_topics().await?;

        let linked = self.memberships.link_accounts().await?;

        if linked > 0 {
            info!("Linked {} sounding board member(s) to accounts", linked);
        }

        Ok(())
    }

    pub fn config(&self) -> &SongslabConfig {
        &self.context.config
    }
}

impl<Db> Clone for SongslabContext<Db> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            mailer: self.mailer.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use crate::{
        ContactPreference, LogMailer, MembershipData, NewAccessRequest, NewRegistration,
        NewSongRequest, SongData, Songslab, SongslabConfig, SqliteDatabase, UserData,
    };

    pub const PASSWORD: &str = "fearlessly trusted demo";

    pub async fn setup() -> Songslab<SqliteDatabase> {
        setup_with(SongslabConfig::default()).await
    }

    pub async fn setup_with(config: SongslabConfig) -> Songslab<SqliteDatabase> {
        let database = SqliteDatabase::connect("sqlite::memory:")
            .await
            .expect("database connects");

        let lab = Songslab::new(database, Arc::new(LogMailer), config);
        lab.init().await.expect("init succeeds");

        lab
    }

    pub async fn register_user(lab: &Songslab<SqliteDatabase>, username: &str) -> UserData {
        lab.auth
            .register(NewRegistration {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password: PASSWORD.to_string(),
                display_name: username.to_string(),
            })
            .await
            .expect("registration succeeds")
    }

    pub async fn create_song(lab: &Songslab<SqliteDatabase>, owner: &UserData) -> SongData {
        lab.songs
            .create(
                owner,
                NewSongRequest {
                    title: "Fearless Demo".to_string(),
                    description: Some("Rough mix, vocals still scratch".to_string()),
                    development_stage: Some("demo".to_string()),
                },
            )
            .await
            .expect("song creation succeeds")
    }

    pub fn access_request(email: &str) -> NewAccessRequest {
        let name = email.split('@').next().unwrap_or(email).to_string();

        NewAccessRequest {
            name,
            email: email.to_string(),
            phone: None,
            contact_preference: ContactPreference::Email,
        }
    }

    pub async fn request_access(
        lab: &Songslab<SqliteDatabase>,
        song: &SongData,
        email: &str,
    ) -> MembershipData {
        lab.memberships
            .request_access(&song.share_token, access_request(email))
            .await
            .expect("access request succeeds")
    }

    pub async fn approved_member(
        lab: &Songslab<SqliteDatabase>,
        owner: &UserData,
        song: &SongData,
        email: &str,
    ) -> MembershipData {
        let membership = request_access(lab, song, email).await;

        lab.memberships
            .approve(membership.id, owner)
            .await
            .expect("approval succeeds")
    }
}
