//! The email collaborator seam. Delivery is external to songslab, so
//! the system only renders messages and hands them to a [Mailer].
//! Every send is best-effort: failures are logged and never affect the
//! request that triggered them.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MailerError(pub String);

/// A rendered message ready for the external email service
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

/// Represents a type that can deliver a rendered email
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: Email) -> Result<(), MailerError>;
}

/// A mailer that only writes to the log, used when no email service is
/// configured and in tests
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailerError> {
        info!(
            "email to {} <{}>: {}",
            email.to_name, email.to, email.subject
        );

        Ok(())
    }
}

/// Sends an email outside the current request, so no database work
/// ever waits on the mail collaborator
pub fn send_detached(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        let to = email.to.clone();

        if let Err(e) = mailer.send(email).await {
            error!("failed to send notification to {}: {}", to, e);
        }
    });
}

/// Notifies a songwriter that someone wants to join their sounding board
pub fn access_request_email(
    owner_name: &str,
    owner_email: &str,
    member_name: &str,
    song_title: &str,
    dashboard_link: &str,
) -> Email {
    Email {
        to: owner_email.to_string(),
        to_name: owner_name.to_string(),
        subject: format!("New Sounding Board request for \"{}\" - SongSlab", song_title),
        html: format!(
            "<p>Hi {},</p>\
            <p><strong>{}</strong> wants to join your Sounding Board for <strong>\"{}\"</strong>.</p>\
            <p><a href=\"{}\">Review Request</a></p>",
            owner_name, member_name, song_title, dashboard_link
        ),
    }
}

/// Welcomes an auto-approved member with the share link
pub fn welcome_email(
    member_name: &str,
    member_email: &str,
    song_title: &str,
    owner_name: &str,
    share_link: &str,
) -> Email {
    Email {
        to: member_email.to_string(),
        to_name: member_name.to_string(),
        subject: format!("Welcome to {}'s Sounding Board - SongSlab", owner_name),
        html: format!(
            "<p>Hi {},</p>\
            <p>You are invited to listen to <strong>{}'s</strong> song, \
            <strong>\"{}\"</strong> and to share your feedback.</p>\
            <p><a href=\"{}\">Listen to Song</a></p>",
            member_name, owner_name, song_title, share_link
        ),
    }
}

/// Tells a member their access request was approved
pub fn access_approved_email(
    member_name: &str,
    member_email: &str,
    song_title: &str,
    owner_name: &str,
    share_link: &str,
) -> Email {
    Email {
        to: member_email.to_string(),
        to_name: member_name.to_string(),
        subject: format!("Access Approved for \"{}\" - SongSlab", song_title),
        html: format!(
            "<p>Hi {},</p>\
            <p>Great news! <strong>{}</strong> has approved your access to \
            <strong>\"{}\"</strong>.</p>\
            <p><a href=\"{}\">Listen to Song</a></p>",
            member_name, owner_name, song_title, share_link
        ),
    }
}
