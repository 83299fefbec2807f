//! The structured feedback ledger. Members fill in one entry per
//! topic per song, and resubmitting a topic replaces the earlier
//! content instead of stacking a second entry. Entries start private
//! to the songwriter, who can open individual ones up to the group.

use thiserror::Error;

use crate::{
    Database, DatabaseError, FeedbackEntryData, MembershipData, NewFeedbackEntry, NewTopic,
    PrimaryKey, SongslabContext, TopicData, UserData, Visibility,
};

/// The built-in topic catalog, in display order
const DEFAULT_TOPICS: &[(&str, &str)] = &[
    ("lyrics", "Lyrics"),
    ("melodies", "Melodies"),
    ("genre", "Genre"),
    ("placement", "Placement"),
    ("playlist_artists", "Playlist Artists"),
    ("musicianship", "Musicianship"),
    ("vocal_harmonies", "Vocal Harmonies"),
    ("mood", "Mood"),
    ("mix", "Mix"),
    ("song_structure", "Song Structure"),
    ("song_sections", "Song Sections"),
    ("instrumentation_choices", "Instrumentation Choices"),
    ("arrangement", "Arrangement"),
    ("overall_sound", "Overall Sound"),
    ("tempo", "Tempo"),
    ("key", "Key"),
    ("production", "Production"),
    ("commercial_potential", "Commercial Potential"),
    ("overall_impressions", "Overall Impressions"),
    ("context_comparison", "Context Comparison"),
    ("song_strengths", "Song Strengths"),
    ("song_shortcomings", "Song Shortcomings"),
];

pub struct FeedbackManager<Db> {
    context: SongslabContext<Db>,
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("You don't have access to this song")]
    Forbidden,
    #[error("There is no feedback topic with id {0}")]
    UnknownTopic(PrimaryKey),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> FeedbackManager<Db>
where
    Db: Database,
{
    pub fn new(context: &SongslabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Submits a batch of topic entries for a song. Each topic the
    /// member already covered is overwritten in place. Returns how
    /// many entries were written.
    pub async fn submit(
        &self,
        share_token: &str,
        email: &str,
        items: Vec<FeedbackItem>,
    ) -> Result<usize, FeedbackError> {
        let db = &self.context.database;
        let song = db.song_by_share_token(share_token).await?;

        let membership = self.approved_member(song.id, email).await?;
        let written = items.len();

        // Every topic is checked before the first write so a bad id in
        // the middle of a batch cannot leave earlier entries behind
        for item in &items {
            db.topic_by_id(item.topic_id).await.map_err(|e| match e {
                DatabaseError::NotFound { .. } => FeedbackError::UnknownTopic(item.topic_id),
                e => FeedbackError::Db(e),
            })?;
        }

        for item in items {
            db.upsert_feedback_entry(NewFeedbackEntry {
                song_id: song.id,
                member_id: membership.id,
                topic_id: item.topic_id,
                content: item.content,
            })
            .await?;
        }

        Ok(written)
    }

    /// Every ledger entry on the song, for the songwriter
    pub async fn list_for_song(
        &self,
        song_id: PrimaryKey,
        owner: &UserData,
    ) -> Result<Vec<FeedbackEntryData>, FeedbackError> {
        let song = self.context.database.song_by_id(song_id).await?;

        if song.user_id != owner.id {
            return Err(DatabaseError::NotFound {
                resource: "song",
                identifier: "id",
            }
            .into());
        }

        self.context
            .database
            .feedback_by_song(song.id)
            .await
            .map_err(Into::into)
    }

    /// Toggles an entry between private and group visibility
    pub async fn set_visibility(
        &self,
        entry_id: PrimaryKey,
        owner: &UserData,
        visibility: Visibility,
    ) -> Result<FeedbackEntryData, FeedbackError> {
        let db = &self.context.database;

        let entry = db.feedback_entry_by_id(entry_id).await?;
        let song = db.song_by_id(entry.song_id).await?;

        if song.user_id != owner.id {
            return Err(DatabaseError::NotFound {
                resource: "feedback entry",
                identifier: "id",
            }
            .into());
        }

        db.set_feedback_visibility(entry.id, visibility)
            .await
            .map_err(Into::into)
    }

    pub async fn topics(&self) -> Result<Vec<TopicData>, DatabaseError> {
        self.context.database.topics().await
    }

    /// Writes the built-in topic catalog, keeping any labels the
    /// operator has edited since the last run
    pub async fn seed_default_topics(&self) -> Result<(), DatabaseError> {
        for (order, (key, label)) in DEFAULT_TOPICS.iter().enumerate() {
            self.context
                .database
                .upsert_topic(NewTopic {
                    key: key.to_string(),
                    label: label.to_string(),
                    display_order: order as i64,
                    is_active: true,
                })
                .await?;
        }

        Ok(())
    }

    async fn approved_member(
        &self,
        song_id: PrimaryKey,
        email: &str,
    ) -> Result<MembershipData, FeedbackError> {
        let membership = self
            .context
            .database
            .membership_by_song_and_email(song_id, email)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => FeedbackError::Forbidden,
                e => FeedbackError::Db(e),
            })?;

        if !membership.is_approved() {
            return Err(FeedbackError::Forbidden);
        }

        Ok(membership)
    }
}

#[derive(Debug)]
pub struct FeedbackItem {
    pub topic_id: PrimaryKey,
    pub content: String,
}

#[cfg(test)]
mod test {
    use super::FeedbackItem;
    use crate::{test_util, FeedbackError, Visibility};

    #[tokio::test]
    async fn resubmitting_a_topic_replaces_the_entry() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        test_util::approved_member(&lab, &owner, &song, "sue@example.com").await;

        let topic = lab.feedback.topics().await.unwrap().remove(0);

        lab.feedback
            .submit(
                &song.share_token,
                "sue@example.com",
                vec![FeedbackItem {
                    topic_id: topic.id,
                    content: "a bit wordy".to_string(),
                }],
            )
            .await
            .unwrap();

        lab.feedback
            .submit(
                &song.share_token,
                "sue@example.com",
                vec![FeedbackItem {
                    topic_id: topic.id,
                    content: "reads great now".to_string(),
                }],
            )
            .await
            .unwrap();

        let entries = lab.feedback.list_for_song(song.id, &owner).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "reads great now");
    }

    #[tokio::test]
    async fn pending_members_cannot_submit() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        test_util::request_access(&lab, &song, "sue@example.com").await;

        let topic = lab.feedback.topics().await.unwrap().remove(0);

        let submitted = lab
            .feedback
            .submit(
                &song.share_token,
                "sue@example.com",
                vec![FeedbackItem {
                    topic_id: topic.id,
                    content: "love it".to_string(),
                }],
            )
            .await;

        assert!(matches!(submitted, Err(FeedbackError::Forbidden)));
    }

    #[tokio::test]
    async fn a_batch_with_an_unknown_topic_writes_nothing() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        test_util::approved_member(&lab, &owner, &song, "sue@example.com").await;

        let topic = lab.feedback.topics().await.unwrap().remove(0);

        let submitted = lab
            .feedback
            .submit(
                &song.share_token,
                "sue@example.com",
                vec![
                    FeedbackItem {
                        topic_id: topic.id,
                        content: "the verse sits well".to_string(),
                    },
                    FeedbackItem {
                        topic_id: 9999,
                        content: "never stored".to_string(),
                    },
                ],
            )
            .await;

        assert!(matches!(submitted, Err(FeedbackError::UnknownTopic(9999))));

        let entries = lab.feedback.list_for_song(song.id, &owner).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn entries_start_private_and_can_be_opened_up() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        test_util::approved_member(&lab, &owner, &song, "sue@example.com").await;

        let topic = lab.feedback.topics().await.unwrap().remove(0);

        lab.feedback
            .submit(
                &song.share_token,
                "sue@example.com",
                vec![FeedbackItem {
                    topic_id: topic.id,
                    content: "the outro drags".to_string(),
                }],
            )
            .await
            .unwrap();

        let entry = lab
            .feedback
            .list_for_song(song.id, &owner)
            .await
            .unwrap()
            .remove(0);

        assert_eq!(entry.visibility, Visibility::Private);

        let shared = lab
            .feedback
            .set_visibility(entry.id, &owner, Visibility::Group)
            .await
            .unwrap();

        assert_eq!(shared.visibility, Visibility::Group);
    }

    #[tokio::test]
    async fn seeding_twice_keeps_one_catalog() {
        let lab = test_util::setup().await;

        let before = lab.feedback.topics().await.unwrap();
        lab.feedback.seed_default_topics().await.unwrap();
        let after = lab.feedback.topics().await.unwrap();

        assert_eq!(before.len(), after.len());
        assert_eq!(after.len(), 22);
    }
}
