use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Education {
    #[serde(rename = "UG")]
    Undergraduate,
    #[serde(rename = "PG")]
    Postgraduate,
    Diploma,
    Other,
}

/// Job seeker profile captured by the profile form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub age: u8,
    pub phone: String,
    pub state: String,
    pub city: String,
    /// Field of interest, e.g. "AI" or "Data Science".
    pub domain: String,
    pub education: Education,
}

/// A job seeker. Persisted in the `users` collection keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    /// Extracted text of the latest uploaded resume; empty until one is uploaded.
    #[serde(default)]
    pub resume: String,
    /// Object key of the original upload, when object storage is configured.
    #[serde(default)]
    pub resume_object_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a user may see about their own account.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub profile: Option<UserProfile>,
    pub has_resume: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserView {
    fn from(user: &UserAccount) -> Self {
        Self {
            email: user.email.clone(),
            profile: user.profile.clone(),
            has_resume: !user.resume.trim().is_empty(),
            created_at: user.created_at,
        }
    }
}
