use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::resource::Document;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: String,
    pub notification_email: bool,
}

/// Stored user record. Never serialized into a response: see [`Profile`],
/// [`PublicProfile`] and [`UserSummary`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "userid")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub phone_number: String,
    pub bio: String,
    pub preferences: Preferences,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub profile_picture: String,
    pub address: String,
    pub social_links: BTreeMap<String, String>,
    pub is_verified: bool,
    pub follows: Vec<String>,
    pub followers: Vec<String>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const ID_FIELD: &'static str = "userid";
    const NAME: &'static str = "User";
}

impl User {
    pub fn is_following(&self, user_id: &str) -> bool {
        self.follows.iter().any(|id| id == user_id)
    }
}

/// The caller's own profile.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub userid: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub name: String,
    pub bio: String,
    pub phone_number: String,
    pub profile_picture: String,
    pub address: String,
    pub social_links: BTreeMap<String, String>,
    pub preferences: Preferences,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub follows: Vec<String>,
    pub followers: Vec<String>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            userid: user.user_id,
            username: user.username,
            email: user.email,
            role: user.role,
            name: user.name,
            bio: user.bio,
            phone_number: user.phone_number,
            profile_picture: user.profile_picture,
            address: user.address,
            social_links: user.social_links,
            preferences: user.preferences,
            is_active: user.is_active,
            is_verified: user.is_verified,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
            follows: user.follows,
            followers: user.followers,
        }
    }
}

/// Another user's profile, as seen by an optional viewer.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub userid: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone_number: String,
    pub profile_picture: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub social_links: BTreeMap<String, String>,
    pub is_following: bool,
    pub followers_count: usize,
    pub following_count: usize,
}

impl PublicProfile {
    pub fn new(user: User, viewer: Option<&User>) -> Self {
        let is_following = viewer.map(|v| v.is_following(&user.user_id)).unwrap_or(false);

        Self {
            followers_count: user.followers.len(),
            following_count: user.follows.len(),
            userid: user.user_id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            phone_number: user.phone_number,
            profile_picture: user.profile_picture,
            social_links: user.social_links,
            is_following,
        }
    }
}

/// Entry in follower/following/suggestion lists.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub userid: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub profile_picture: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            userid: user.user_id,
            username: user.username,
            name: user.name,
            bio: user.bio,
            profile_picture: user.profile_picture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_never_carry_the_password() {
        let user = User {
            user_id: "uabc".to_string(),
            username: "alice".to_string(),
            password: "$argon2id$secret".to_string(),
            followers: vec!["ubob".to_string()],
            ..Default::default()
        };

        let own = serde_json::to_string(&Profile::from(user.clone())).unwrap();
        let public = serde_json::to_value(PublicProfile::new(user.clone(), None)).unwrap();
        let summary = serde_json::to_string(&UserSummary::from(user)).unwrap();

        assert!(!own.contains("password") && !own.contains("argon2"));
        assert!(!summary.contains("argon2"));
        assert!(public.get("password").is_none());
        assert_eq!(public["followers_count"], 1);
        assert_eq!(public["is_following"], false);
    }
}
