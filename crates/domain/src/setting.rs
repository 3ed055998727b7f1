// crates/domain/src/setting.rs

use crate::item::{Toggle, UserId};
use crate::resource::RestOverride;
use crate::security::Role;
use crate::status::StatusObject;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// IP address to bind the HTTP listener
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    /// Public base URL, without trailing slash
    pub url: String,

    /// Path segment under which the REST routes are mounted
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Offset of site-local time from UTC
    #[serde(default)]
    pub gmt_offset_minutes: i32,

    /// Days before trashed items are purged; 0 disables trash
    #[serde(default = "default_trash_days")]
    pub trash_days: u32,

    /// Whether media items may be trashed at all
    #[serde(default)]
    pub media_trash: bool,

    /// Template slug -> label
    #[serde(default)]
    pub page_templates: BTreeMap<String, String>,

    #[serde(default)]
    pub default_comment_status: Toggle,

    #[serde(default)]
    pub default_ping_status: Toggle,
}

fn default_api_prefix() -> String {
    "api".into()
}

fn default_namespace() -> String {
    "wp/v2".into()
}

fn default_trash_days() -> u32 {
    30
}

impl SiteSettings {
    /// Base URL of the REST routes, e.g. `https://example.org/api`.
    pub fn rest_root(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSettings {
    pub id: UserId,
    pub login: String,
    pub role: Role,
    /// argon2 PHC string
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub site: SiteSettings,
    #[serde(default)]
    pub users: Vec<UserSettings>,
    #[serde(default)]
    pub statuses: Vec<StatusObject>,
    #[serde(default)]
    pub taxonomies: Vec<RestOverride>,
    #[serde(default)]
    pub types: Vec<RestOverride>,
}

impl Settings {
    pub fn user(&self, login: &str) -> Option<&UserSettings> {
        self.users.iter().find(|u| u.login == login)
    }

    /// Reject settings that parse but cannot be served.
    pub fn validate(&self) -> crate::Result<()> {
        if self.site.url.is_empty() {
            return Err(crate::Error::Settings("site.url must not be empty".into()));
        }
        if self.site.namespace.trim_matches('/').is_empty() {
            return Err(crate::Error::Settings("site.namespace must not be empty".into()));
        }
        let mut ids: Vec<_> = self.users.iter().map(|u| u.id).collect();
        ids.sort_unstable();
        if ids.contains(&0) {
            return Err(crate::Error::Settings("user id 0 is reserved".into()));
        }
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(crate::Error::Settings("duplicate user id".into()));
        }
        Ok(())
    }
}
