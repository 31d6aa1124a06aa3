//! Authentication models

use serde::{Deserialize, Serialize};

/// Identity provider used to sign in to devtunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Microsoft,
    #[serde(rename = "github")]
    GitHub,
}

/// Signed-in user as reported by `devtunnel user show`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub provider: AuthProvider,
    pub is_authenticated: bool,
}

impl UserInfo {
    /// Name to show, falling back to the user ID
    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_id)
    }
}
