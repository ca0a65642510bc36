//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Role assigned to every self-registered account.
pub const DEFAULT_ROLE: &str = "user";

/// User profile stored in Firestore (document ID = identity provider UID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider UID (also used as document ID)
    pub user_id: String,
    /// Email address (may be None for providers that do not share it)
    pub email: Option<String>,
    /// Unique handle
    pub username: String,
    /// Display name
    pub display_name: String,
    /// Role tag
    pub role: String,
    /// When the profile was created
    pub created_at: String,
    /// Last profile update
    pub updated_at: String,
    /// Denormalized count of notes owned by this user
    #[serde(default)]
    pub number_of_posts: i64,
    /// Nested profile block
    #[serde(default)]
    pub other_account_details: AccountDetails,
}

/// Profile block shown on the user's page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    /// Avatar URL
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub user_description: String,
    #[serde(default)]
    pub user_location: String,
}

/// Generated avatar used when the identity provider has no picture.
pub fn default_avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random&color=fff&size=128",
        urlencoding::encode(name)
    )
}
