use std::env;

/// Composition-time configuration for a songslab instance
#[derive(Debug, Clone)]
pub struct SongslabConfig {
    /// If this is true, access requests are approved at creation time
    /// instead of waiting for the songwriter to respond
    pub auto_approve_membership: bool,
    /// The frontend base url, used to render share links in notifications
    pub base_url: String,
}

impl SongslabConfig {
    pub fn from_env() -> Self {
        let auto_approve_membership = env::var("SONGSLAB_AUTO_APPROVE")
            .map(|x| matches!(x.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let base_url = env::var("SONGSLAB_BASE_URL").unwrap_or_else(|_| Self::default().base_url);

        Self {
            auto_approve_membership,
            base_url,
        }
    }

    /// The share link a sounding board member opens the song with
    pub fn share_link(&self, token: &str) -> String {
        format!("{}/share/{}", self.base_url, token)
    }

    /// The page where a songwriter reviews pending requests
    pub fn dashboard_link(&self) -> String {
        format!("{}/songwriter-dashboard", self.base_url)
    }
}

impl Default for SongslabConfig {
    fn default() -> Self {
        Self {
            auto_approve_membership: false,
            base_url: "http://localhost:3004".to_string(),
        }
    }
}
