//! Threaded discussions on a song. Comments form a forest keyed by
//! song, with the nesting depth cached on every row. Listing pages
//! over root comments and materializes each root's full subtree.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    access_for, filter, AccessGrant, CommentAuthor, CommentData, Database, DatabaseError,
    NewComment, PrimaryKey, Principal, SongslabContext,
};

/// Longest accepted comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

pub struct DiscussionManager<Db> {
    context: SongslabContext<Db>,
}

#[derive(Debug, Error)]
pub enum DiscussionError {
    #[error("You don't have access to this song")]
    Forbidden,
    #[error("{}", .0.reason())]
    ContentRejected(filter::Rejection),
    #[error("Comments cannot be longer than {MAX_COMMENT_LENGTH} characters")]
    ContentTooLong,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// A comment with its materialized subtree
#[derive(Debug)]
pub struct ThreadedComment {
    pub comment: CommentData,
    pub replies: Vec<ThreadedComment>,
}

/// One page of a song's discussion
#[derive(Debug)]
pub struct Discussion {
    pub roots: Vec<ThreadedComment>,
    /// Total number of root comments on the song
    pub total_count: i64,
    pub has_more: bool,
}

impl<Db> DiscussionManager<Db>
where
    Db: Database,
{
    pub fn new(context: &SongslabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Posts a comment or a reply. The content passes through the
    /// moderation filter first, and the principal needs access to the
    /// song. Topic tags only apply to root comments.
    pub async fn post_comment(
        &self,
        song_id: PrimaryKey,
        principal: &Principal,
        new_comment: NewCommentRequest,
    ) -> Result<CommentData, DiscussionError> {
        let db = &self.context.database;
        let song = db.song_by_id(song_id).await?;

        let grant = access_for(db.as_ref(), &song, principal)
            .await?
            .ok_or(DiscussionError::Forbidden)?;

        let content = new_comment.content.trim().to_string();

        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(DiscussionError::ContentTooLong);
        }

        filter::validate(&content).map_err(DiscussionError::ContentRejected)?;

        let (parent_id, depth, topic_id) = match new_comment.parent_id {
            Some(parent_id) => {
                let parent = db.comment_by_id(parent_id).await?;

                if parent.song_id != song.id {
                    return Err(DatabaseError::NotFound {
                        resource: "comment",
                        identifier: "id",
                    }
                    .into());
                }

                // Replies inherit the thread, never a topic of their own
                (Some(parent.id), parent.depth + 1, None)
            }
            None => {
                if let Some(topic_id) = new_comment.topic_id {
                    db.topic_by_id(topic_id).await?;
                }

                (None, 0, new_comment.topic_id)
            }
        };

        let author = match grant {
            AccessGrant::Owner => CommentAuthor::User(song.user_id),
            AccessGrant::Member(membership) => CommentAuthor::Member(membership.id),
        };

        db.create_comment(NewComment {
            song_id: song.id,
            parent_id,
            depth,
            author,
            topic_id,
            content,
        })
        .await
        .map_err(Into::into)
    }

    /// One page of the discussion, roots newest first with their full
    /// subtrees attached
    pub async fn list(
        &self,
        song_id: PrimaryKey,
        principal: &Principal,
        limit: i64,
        offset: i64,
    ) -> Result<Discussion, DiscussionError> {
        let db = &self.context.database;
        let song = db.song_by_id(song_id).await?;

        access_for(db.as_ref(), &song, principal)
            .await?
            .ok_or(DiscussionError::Forbidden)?;

        let total_count = db.count_root_comments(song.id).await?;
        let roots = db.root_comments(song.id, limit, offset).await?;
        let has_more = offset + (roots.len() as i64) < total_count;

        // Collect the subtrees level by level, then build bottom-up
        let mut levels: Vec<Vec<CommentData>> = vec![];
        let mut frontier: Vec<PrimaryKey> = roots.iter().map(|c| c.id).collect();

        while !frontier.is_empty() {
            let replies = db.replies_to(&frontier).await?;
            frontier = replies.iter().map(|c| c.id).collect();
            levels.push(replies);
        }

        let mut children: HashMap<PrimaryKey, Vec<ThreadedComment>> = HashMap::new();

        for level in levels.into_iter().rev() {
            for comment in level {
                let parent_id = comment
                    .parent_id
                    .expect("comments below the root level have a parent");

                let threaded = ThreadedComment {
                    replies: children.remove(&comment.id).unwrap_or_default(),
                    comment,
                };

                children.entry(parent_id).or_default().push(threaded);
            }
        }

        let roots = roots
            .into_iter()
            .map(|comment| ThreadedComment {
                replies: children.remove(&comment.id).unwrap_or_default(),
                comment,
            })
            .collect();

        Ok(Discussion {
            roots,
            total_count,
            has_more,
        })
    }
}

#[derive(Debug)]
pub struct NewCommentRequest {
    pub content: String,
    pub parent_id: Option<PrimaryKey>,
    pub topic_id: Option<PrimaryKey>,
}

#[cfg(test)]
mod test {
    use super::NewCommentRequest;
    use crate::{test_util, DiscussionError, Principal};

    fn comment(content: &str) -> NewCommentRequest {
        NewCommentRequest {
            content: content.to_string(),
            parent_id: None,
            topic_id: None,
        }
    }

    fn reply(content: &str, parent_id: i64) -> NewCommentRequest {
        NewCommentRequest {
            content: content.to_string(),
            parent_id: Some(parent_id),
            topic_id: None,
        }
    }

    #[tokio::test]
    async fn replies_nest_with_cached_depths() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;
        let principal = Principal::User(owner);

        let mut parent_id = None;

        for turn in 0i64..5 {
            let request = NewCommentRequest {
                content: format!("take {}", turn),
                parent_id,
                topic_id: None,
            };

            let posted = lab
                .discussions
                .post_comment(song.id, &principal, request)
                .await
                .expect("comment posts");

            assert_eq!(posted.depth, turn);
            parent_id = Some(posted.id);
        }

        let discussion = lab
            .discussions
            .list(song.id, &principal, 10, 0)
            .await
            .unwrap();

        assert_eq!(discussion.total_count, 1);

        // The chain comes back as one fully materialized branch
        let mut node = discussion.roots.first().expect("one root");
        let mut depth = 0;

        while let Some(next) = node.replies.first() {
            depth += 1;
            assert_eq!(next.comment.depth, depth);
            node = next;
        }

        assert_eq!(depth, 4);
    }

    #[tokio::test]
    async fn listing_pages_over_roots_only() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;
        let principal = Principal::User(owner);

        for index in 0..5 {
            let posted = lab
                .discussions
                .post_comment(song.id, &principal, comment(&format!("root {}", index)))
                .await
                .unwrap();

            // Replies must not count towards the page
            lab.discussions
                .post_comment(song.id, &principal, reply("noted", posted.id))
                .await
                .unwrap();
        }

        let first = lab
            .discussions
            .list(song.id, &principal, 3, 0)
            .await
            .unwrap();

        assert_eq!(first.total_count, 5);
        assert_eq!(first.roots.len(), 3);
        assert!(first.has_more);

        let second = lab
            .discussions
            .list(song.id, &principal, 3, 3)
            .await
            .unwrap();

        assert_eq!(second.roots.len(), 2);
        assert!(!second.has_more);

        // Newest first, no overlap between pages
        assert_eq!(first.roots[0].comment.content, "root 4");
        assert_eq!(second.roots[0].comment.content, "root 1");

        for root in first.roots.iter().chain(second.roots.iter()) {
            assert_eq!(root.replies.len(), 1);
        }
    }

    #[tokio::test]
    async fn strangers_cannot_join_the_discussion() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let stranger = Principal::Email("lurker@example.com".to_string());

        let posted = lab
            .discussions
            .post_comment(song.id, &stranger, comment("first!"))
            .await;

        assert!(matches!(posted, Err(DiscussionError::Forbidden)));

        let listed = lab.discussions.list(song.id, &stranger, 3, 0).await;
        assert!(matches!(listed, Err(DiscussionError::Forbidden)));
    }

    #[tokio::test]
    async fn approved_members_can_comment() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        test_util::approved_member(&lab, &owner, &song, "sue@example.com").await;
        let sue = Principal::Email("sue@example.com".to_string());

        let posted = lab
            .discussions
            .post_comment(song.id, &sue, comment("love the bridge"))
            .await
            .expect("member comments");

        assert_eq!(posted.author_name, "sue");
    }

    #[tokio::test]
    async fn moderated_content_is_rejected() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;
        let principal = Principal::User(owner);

        let posted = lab
            .discussions
            .post_comment(
                song.id,
                &principal,
                comment("check this out: https://spam.example"),
            )
            .await;

        assert!(matches!(posted, Err(DiscussionError::ContentRejected(_))));

        let listed = lab
            .discussions
            .list(song.id, &principal, 3, 0)
            .await
            .unwrap();

        assert_eq!(listed.total_count, 0);
    }

    #[tokio::test]
    async fn replies_never_carry_a_topic() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;
        let principal = Principal::User(owner);

        let topic = lab.feedback.topics().await.unwrap().remove(0);

        let root = lab
            .discussions
            .post_comment(
                song.id,
                &principal,
                NewCommentRequest {
                    content: "thoughts on the words".to_string(),
                    parent_id: None,
                    topic_id: Some(topic.id),
                },
            )
            .await
            .unwrap();

        assert_eq!(root.topic_id, Some(topic.id));

        let nested = lab
            .discussions
            .post_comment(
                song.id,
                &principal,
                NewCommentRequest {
                    content: "agreed".to_string(),
                    parent_id: Some(root.id),
                    topic_id: Some(topic.id),
                },
            )
            .await
            .unwrap();

        assert_eq!(nested.topic_id, None);
    }
}
