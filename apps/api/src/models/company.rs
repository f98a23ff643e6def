use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hiring company. Persisted in the `companies` collection keyed by its
/// contact email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub location: String,
    /// Required skills, as entered; matching trims and lowercases them.
    pub skills: Vec<String>,
    #[serde(default)]
    pub logo_object_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public listing of a company, without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyView {
    pub email: String,
    pub name: String,
    pub branch: Option<String>,
    pub location: String,
    pub skills: Vec<String>,
    pub has_logo: bool,
}

impl From<&CompanyAccount> for CompanyView {
    fn from(company: &CompanyAccount) -> Self {
        Self {
            email: company.email.clone(),
            name: company.name.clone(),
            branch: company.branch.clone(),
            location: company.location.clone(),
            skills: company.skills.clone(),
            has_logo: company.logo_object_key.is_some(),
        }
    }
}
