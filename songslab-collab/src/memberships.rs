//! The sounding board membership state machine. A membership starts
//! pending and is responded to exactly once, moving it to approved or
//! rejected. The operator can flip [crate::SongslabConfig] to
//! auto-approve new requests instead.

use chrono::Utc;
use log::warn;
use thiserror::Error;

use crate::{
    notify, ContactPreference, Database, DatabaseError, MembershipData, MembershipResponse,
    MembershipStatus, NewMembership, PrimaryKey, SongData, SongslabContext, UserData,
};

pub struct MembershipManager<Db> {
    context: SongslabContext<Db>,
}

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("You already have a request for this song")]
    DuplicateRequest,
    #[error("This request has already been responded to")]
    AlreadyResponded,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> MembershipManager<Db>
where
    Db: Database,
{
    pub fn new(context: &SongslabContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Requests access to a song through its share link. Creates a
    /// pending membership, or an approved one when auto-approval is
    /// configured. At most one membership can exist per (song, email).
    pub async fn request_access(
        &self,
        share_token: &str,
        request: NewAccessRequest,
    ) -> Result<MembershipData, MembershipError> {
        let db = &self.context.database;
        let song = db.song_by_share_token(share_token).await?;

        let auto_approve = self.context.config.auto_approve_membership;

        let (status, responded_at, responded_by) = if auto_approve {
            // Approved by the system on behalf of the songwriter
            (
                MembershipStatus::Approved,
                Some(Utc::now()),
                Some(song.user_id),
            )
        } else {
            (MembershipStatus::Pending, None, None)
        };

        let membership = db
            .create_membership(NewMembership {
                song_id: song.id,
                name: request.name,
                email: request.email,
                phone: request.phone,
                contact_preference: request.contact_preference,
                status,
                responded_at,
                responded_by,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => MembershipError::DuplicateRequest,
                e => MembershipError::Db(e),
            })?;

        if auto_approve {
            self.send_welcome(&membership, &song).await;
        } else {
            self.notify_owner(&membership, &song).await;
        }

        Ok(membership)
    }

    /// The membership a share link visitor has for the song, if any
    pub async fn check_access(
        &self,
        share_token: &str,
        email: &str,
    ) -> Result<Option<MembershipData>, MembershipError> {
        let db = &self.context.database;
        let song = db.song_by_share_token(share_token).await?;

        match db.membership_by_song_and_email(song.id, email).await {
            Ok(membership) => Ok(Some(membership)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Approves a pending request. Responding a second time fails.
    pub async fn approve(
        &self,
        member_id: PrimaryKey,
        responder: &UserData,
    ) -> Result<MembershipData, MembershipError> {
        let (_, song) = self.owned_membership(member_id, responder).await?;

        let updated = self
            .context
            .database
            .respond_to_membership(MembershipResponse {
                member_id,
                status: MembershipStatus::Approved,
                rejection_reason: None,
                responded_by: responder.id,
            })
            .await?
            .ok_or(MembershipError::AlreadyResponded)?;

        self.send_approved(&updated, &song, responder).await;

        Ok(updated)
    }

    /// Rejects a pending request, optionally with a reason
    pub async fn reject(
        &self,
        member_id: PrimaryKey,
        responder: &UserData,
        reason: Option<String>,
    ) -> Result<MembershipData, MembershipError> {
        let _ = self.owned_membership(member_id, responder).await?;

        self.context
            .database
            .respond_to_membership(MembershipResponse {
                member_id,
                status: MembershipStatus::Rejected,
                rejection_reason: reason,
                responded_by: responder.id,
            })
            .await?
            .ok_or(MembershipError::AlreadyResponded)
    }

    /// Hard-deletes a membership, revoking access immediately. No
    /// state precondition.
    pub async fn remove(
        &self,
        member_id: PrimaryKey,
        owner: &UserData,
    ) -> Result<(), MembershipError> {
        let _ = self.owned_membership(member_id, owner).await?;

        self.context
            .database
            .delete_membership(member_id)
            .await
            .map_err(Into::into)
    }

    /// All memberships across the owner's songs, newest request first
    pub async fn members_for_owner(
        &self,
        owner: &UserData,
    ) -> Result<Vec<MembershipData>, DatabaseError> {
        self.context.database.memberships_by_owner(owner.id).await
    }

    /// All memberships of one song, for the songwriter's dashboard
    pub async fn members_for_song(
        &self,
        song_id: PrimaryKey,
        owner: &UserData,
    ) -> Result<Vec<MembershipData>, MembershipError> {
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
            .memberships_by_song(song.id)
            .await
            .map_err(Into::into)
    }

    /// Binds unlinked memberships to registered users sharing their
    /// email. Safe to re-run; only links, never unlinks. Returns how
    /// many memberships were linked.
    pub async fn link_accounts(&self) -> Result<u64, DatabaseError> {
        self.context.database.link_memberships_to_users().await
    }

    /// Fetches a membership, reporting NotFound unless the responder
    /// owns the song it belongs to
    async fn owned_membership(
        &self,
        member_id: PrimaryKey,
        owner: &UserData,
    ) -> Result<(MembershipData, SongData), MembershipError> {
        let db = &self.context.database;

        let membership = db.membership_by_id(member_id).await?;
        let song = db.song_by_id(membership.song_id).await?;

        if song.user_id != owner.id {
            return Err(DatabaseError::NotFound {
                resource: "sounding board member",
                identifier: "id",
            }
            .into());
        }

        Ok((membership, song))
    }

    async fn notify_owner(&self, membership: &MembershipData, song: &SongData) {
        let owner = match self.context.database.user_by_id(song.user_id).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!("skipping access request notification: {}", e);
                return;
            }
        };

        let email = notify::access_request_email(
            &owner.display_name,
            &owner.email,
            &membership.name,
            &song.title,
            &self.context.config.dashboard_link(),
        );

        notify::send_detached(self.context.mailer.clone(), email);
    }

    async fn send_welcome(&self, membership: &MembershipData, song: &SongData) {
        let owner_name = match self.context.database.user_by_id(song.user_id).await {
            Ok(owner) => owner.display_name,
            Err(e) => {
                warn!("skipping welcome notification: {}", e);
                return;
            }
        };

        let email = notify::welcome_email(
            &membership.name,
            &membership.email,
            &song.title,
            &owner_name,
            &self.context.config.share_link(&song.share_token),
        );

        notify::send_detached(self.context.mailer.clone(), email);
    }

    async fn send_approved(&self, membership: &MembershipData, song: &SongData, owner: &UserData) {
        let email = notify::access_approved_email(
            &membership.name,
            &membership.email,
            &song.title,
            &owner.display_name,
            &self.context.config.share_link(&song.share_token),
        );

        notify::send_detached(self.context.mailer.clone(), email);
    }
}

#[derive(Debug)]
pub struct NewAccessRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub contact_preference: ContactPreference,
}

#[cfg(test)]
mod test {
    use crate::{test_util, MembershipError, MembershipStatus, SongslabConfig};

    #[tokio::test]
    async fn requests_start_pending_by_default() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;

        assert_eq!(membership.status, MembershipStatus::Pending);
        assert!(membership.responded_at.is_none());
        assert!(membership.user_id.is_none());
    }

    #[tokio::test]
    async fn auto_approval_responds_at_creation_time() {
        let config = SongslabConfig {
            auto_approve_membership: true,
            ..Default::default()
        };

        let lab = test_util::setup_with(config).await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;

        assert_eq!(membership.status, MembershipStatus::Approved);
        assert!(membership.responded_at.is_some());
        assert_eq!(membership.responded_by, Some(owner.id));
    }

    #[tokio::test]
    async fn a_second_request_with_the_same_email_conflicts() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let original = test_util::request_access(&lab, &song, "sue@example.com").await;

        let duplicate = lab
            .memberships
            .request_access(
                &song.share_token,
                test_util::access_request("sue@example.com"),
            )
            .await;

        assert!(matches!(duplicate, Err(MembershipError::DuplicateRequest)));

        // The original request is untouched
        let kept = lab
            .memberships
            .check_access(&song.share_token, "sue@example.com")
            .await
            .unwrap()
            .expect("membership exists");

        assert_eq!(kept.id, original.id);
        assert_eq!(kept.status, MembershipStatus::Pending);
    }

    #[tokio::test]
    async fn responding_twice_is_an_invalid_transition() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;

        let approved = lab
            .memberships
            .approve(membership.id, &owner)
            .await
            .expect("first response succeeds");

        assert_eq!(approved.status, MembershipStatus::Approved);

        let again = lab.memberships.approve(membership.id, &owner).await;
        assert!(matches!(again, Err(MembershipError::AlreadyResponded)));

        let rejected = lab
            .memberships
            .reject(membership.id, &owner, Some("too late".to_string()))
            .await;
        assert!(matches!(rejected, Err(MembershipError::AlreadyResponded)));

        // Status and response metadata are unchanged
        let kept = lab
            .memberships
            .check_access(&song.share_token, "sue@example.com")
            .await
            .unwrap()
            .expect("membership exists");

        assert_eq!(kept.status, MembershipStatus::Approved);
        assert_eq!(kept.responded_at, approved.responded_at);
        assert!(kept.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn rejection_stores_the_reason() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;

        let rejected = lab
            .memberships
            .reject(membership.id, &owner, Some("not this time".to_string()))
            .await
            .expect("rejection succeeds");

        assert_eq!(rejected.status, MembershipStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("not this time"));
    }

    #[tokio::test]
    async fn only_the_owner_can_respond() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let stranger = test_util::register_user(&lab, "stranger").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;

        assert!(lab.memberships.approve(membership.id, &stranger).await.is_err());
        assert!(lab.memberships.remove(membership.id, &stranger).await.is_err());
    }

    #[tokio::test]
    async fn removal_revokes_access_unconditionally() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::approved_member(&lab, &owner, &song, "sue@example.com").await;

        lab.memberships
            .remove(membership.id, &owner)
            .await
            .expect("removal succeeds");

        let gone = lab
            .memberships
            .check_access(&song.share_token, "sue@example.com")
            .await
            .unwrap();

        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn linking_binds_memberships_by_email_and_is_idempotent() {
        let lab = test_util::setup().await;
        let owner = test_util::register_user(&lab, "writer").await;
        let song = test_util::create_song(&lab, &owner).await;

        let membership = test_util::request_access(&lab, &song, "sue@example.com").await;
        assert!(membership.user_id.is_none());

        // "sue" registers with the email the membership was created with
        let sue = test_util::register_user(&lab, "sue").await;

        let linked = lab.memberships.link_accounts().await.unwrap();
        assert_eq!(linked, 1);

        let bound = lab
            .memberships
            .check_access(&song.share_token, "sue@example.com")
            .await
            .unwrap()
            .expect("membership exists");

        assert_eq!(bound.user_id, Some(sue.id));

        // Re-running links nothing new and never unlinks
        let linked_again = lab.memberships.link_accounts().await.unwrap();
        assert_eq!(linked_again, 0);
    }
}
