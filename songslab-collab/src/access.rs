//! Derives whether a principal may take part in a song's discussion
//! and feedback. Used uniformly by every gated read and write path.

use crate::{Database, MembershipData, Result, SongData, UserData};

/// Who is asking for access
#[derive(Debug, Clone)]
pub enum Principal {
    /// An authenticated user
    User(UserData),
    /// An unauthenticated sounding board contact, identified by email
    Email(String),
}

/// What a principal is allowed to do with a song
#[derive(Debug, Clone)]
pub enum AccessGrant {
    /// The principal owns the song
    Owner,
    /// The principal is an approved sounding board member
    Member(MembershipData),
}

/// Returns the principal's grant for the song, or None if they have no
/// access. A membership matches on the linked user id OR the email,
/// never requiring both, since members may interact before their
/// account is linked.
pub async fn access_for<Db: Database>(
    db: &Db,
    song: &SongData,
    principal: &Principal,
) -> Result<Option<AccessGrant>> {
    let (user_id, email) = match principal {
        Principal::User(user) => {
            if song.user_id == user.id {
                return Ok(Some(AccessGrant::Owner));
            }

            (Some(user.id), Some(user.email.as_str()))
        }
        Principal::Email(email) => (None, Some(email.as_str())),
    };

    let membership = db.approved_membership(song.id, user_id, email).await?;

    Ok(membership.map(AccessGrant::Member))
}
