use thiserror::Error;

use crate::{
    access::{access_for, AccessGrant, Principal},
    util::share_token,
    Database, DatabaseError, NewSong, SongData, SongslabContext, UpdatedSong, UserData,
};

pub struct SongManager<Db> {
    context: SongslabContext<Db>,
}

#[derive(Debug, Error)]
pub enum SongError {
    #[error("You do not have access to this song")]
    Forbidden,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> SongManager<Db>
where
    Db: Database,
{
    pub fn new(context: &SongslabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a new song with a freshly minted share token
    pub async fn create(
        &self,
        owner: &UserData,
        new_song: NewSongRequest,
    ) -> Result<SongData, DatabaseError> {
        self.context
            .database
            .create_song(NewSong {
                user_id: owner.id,
                title: new_song.title,
                description: new_song.description,
                development_stage: new_song.development_stage,
                share_token: share_token(),
            })
            .await
    }

    /// All visible songs owned by the user, newest first
    pub async fn list_for(&self, owner: &UserData) -> Result<Vec<SongData>, DatabaseError> {
        self.context.database.songs_by_owner(owner.id).await
    }

    /// Fetches a song for any principal with access to it
    pub async fn song_for(
        &self,
        song_id: i64,
        principal: &Principal,
    ) -> Result<(SongData, AccessGrant), SongError> {
        let song = self.context.database.song_by_id(song_id).await?;

        let grant = access_for(self.context.database.as_ref(), &song, principal)
            .await?
            .ok_or(SongError::Forbidden)?;

        Ok((song, grant))
    }

    /// The public landing view of a shared song: the song and its
    /// songwriter's profile
    pub async fn public_song(&self, token: &str) -> Result<(SongData, UserData), DatabaseError> {
        let song = self.context.database.song_by_share_token(token).await?;
        let owner = self.context.database.user_by_id(song.user_id).await?;

        Ok((song, owner))
    }

    /// Updates a song's metadata
    pub async fn update(
        &self,
        song_id: i64,
        owner: &UserData,
        updated: UpdatedSongRequest,
    ) -> Result<SongData, DatabaseError> {
        let song = self.owned_song(song_id, owner).await?;

        self.context
            .database
            .update_song(UpdatedSong {
                id: song.id,
                title: updated.title,
                description: updated.description,
                development_stage: updated.development_stage,
            })
            .await
    }

    /// Tombstones a song. The song disappears from every read path but
    /// stays recoverable.
    pub async fn delete(&self, song_id: i64, owner: &UserData) -> Result<(), DatabaseError> {
        let song = self.owned_song(song_id, owner).await?;

        self.context.database.soft_delete_song(song.id).await
    }

    /// Clears a tombstone set by [Self::delete]
    pub async fn restore(&self, song_id: i64, owner: &UserData) -> Result<SongData, DatabaseError> {
        self.context.database.restore_song(song_id, owner.id).await
    }

    /// Replaces the share token, invalidating every previously shared link
    pub async fn regenerate_share_token(
        &self,
        song_id: i64,
        owner: &UserData,
    ) -> Result<SongData, DatabaseError> {
        let song = self.owned_song(song_id, owner).await?;

        self.context
            .database
            .set_song_share_token(song.id, &share_token())
            .await
    }

    /// Fetches a song, reporting NotFound when it isn't owned by the
    /// user so ownership never leaks
    async fn owned_song(&self, song_id: i64, owner: &UserData) -> Result<SongData, DatabaseError> {
        let song = self.context.database.song_by_id(song_id).await?;

        if song.user_id != owner.id {
            return Err(DatabaseError::NotFound {
                resource: "song",
                identifier: "id",
            });
        }

        Ok(song)
    }
}

#[derive(Debug)]
pub struct NewSongRequest {
    pub title: String,
    pub description: Option<String>,
    pub development_stage: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedSongRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub development_stage: Option<String>,
}

#[cfg(test)]
mod test {
    use crate::test_util;

    #[tokio::test]
    async fn updates_keep_fields_that_were_not_sent() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let updated = lab
            .songs
            .update(
                song.id,
                &owner,
                crate::UpdatedSongRequest {
                    title: Some("Fearless (Final)".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update succeeds");

        assert_eq!(updated.title, "Fearless (Final)");
        assert_eq!(updated.description, song.description);
        assert_eq!(updated.development_stage, song.development_stage);
    }

    #[tokio::test]
    async fn deleted_songs_disappear_until_restored() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        lab.songs.delete(song.id, &owner).await.expect("delete succeeds");

        assert!(lab.songs.list_for(&owner).await.unwrap().is_empty());
        assert!(lab.songs.public_song(&song.share_token).await.is_err());

        let restored = lab
            .songs
            .restore(song.id, &owner)
            .await
            .expect("restore succeeds");

        assert_eq!(restored.id, song.id);
        assert!(restored.deleted_at.is_none());
        assert!(lab.songs.public_song(&song.share_token).await.is_ok());
    }

    #[tokio::test]
    async fn regenerating_the_share_token_invalidates_the_old_link() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let updated = lab
            .songs
            .regenerate_share_token(song.id, &owner)
            .await
            .expect("regeneration succeeds");

        assert_ne!(updated.share_token, song.share_token);
        assert!(lab.songs.public_song(&song.share_token).await.is_err());
        assert!(lab.songs.public_song(&updated.share_token).await.is_ok());
    }

    #[tokio::test]
    async fn strangers_cannot_manage_someone_elses_song() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let stranger = test_util::register_user(&lab, "stranger").await;
        let song = test_util::create_song(&lab, &owner).await;

        assert!(lab.songs.delete(song.id, &stranger).await.is_err());
        assert!(lab
            .songs
            .regenerate_share_token(song.id, &stranger)
            .await
            .is_err());
    }
}
