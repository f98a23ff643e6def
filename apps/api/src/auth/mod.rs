//! Identity: password hashing, credential checks and session issue.

pub mod extract;
pub mod handlers;
pub mod session;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::{normalize_email, Role};
use crate::storage::Tables;

/// Administrator credential, supplied by configuration.
#[derive(Debug, Clone)]
pub struct OwnerCredentials {
    pub email: String,
    pub password_hash: String,
}

/// Who a set of credentials belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub role: Role,
    pub email: String,
}

pub const MIN_PASSWORD_LEN: usize = 8;

/// Salted bcrypt hash, computed off the async runtime.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))
}

/// A malformed stored hash counts as a mismatch rather than an error.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(verified.unwrap_or_else(|e| {
        warn!("Stored password hash could not be verified: {e}");
        false
    }))
}

pub fn validate_new_credentials(email: &str, password: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    let well_formed = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !well_formed {
        return Err(AppError::Validation(format!("'{email}' is not a valid email")));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(email)
}

/// Checks credentials against the owner credential, then users, then
/// companies. A claimed role restricts the check to that table.
pub async fn authenticate(
    tables: &Tables,
    owner: &OwnerCredentials,
    email: &str,
    password: &str,
    claimed: Option<Role>,
) -> Result<Identity, AppError> {
    let email = normalize_email(email);
    let wants = |role: Role| claimed.map_or(true, |c| c == role);

    if wants(Role::Owner)
        && email == owner.email
        && verify_password(password, &owner.password_hash).await?
    {
        return Ok(Identity {
            role: Role::Owner,
            email,
        });
    }

    if wants(Role::User) {
        if let Some(user) = tables.users.get(&email).await? {
            if verify_password(password, &user.password_hash).await? {
                return Ok(Identity {
                    role: Role::User,
                    email,
                });
            }
        }
    }

    if wants(Role::Company) {
        if let Some(company) = tables.companies.get(&email).await? {
            if verify_password(password, &company.password_hash).await? {
                return Ok(Identity {
                    role: Role::Company,
                    email,
                });
            }
        }
    }

    debug!("Authentication failed for {email}");
    Err(AppError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::CompanyAccount;
    use crate::models::user::UserAccount;
    use crate::storage::testing::temp_tables;
    use chrono::Utc;

    const COST: u32 = 4;

    async fn owner(password: &str) -> OwnerCredentials {
        OwnerCredentials {
            email: "owner@example.com".to_string(),
            password_hash: hash_password(password, COST).await.unwrap(),
        }
    }

    async fn user(email: &str, password: &str) -> UserAccount {
        UserAccount {
            email: email.to_string(),
            password_hash: hash_password(password, COST).await.unwrap(),
            profile: None,
            resume: String::new(),
            resume_object_key: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_login_and_wrong_password() {
        let (tables, _dir) = temp_tables();
        let owner = owner("owner-secret").await;
        tables
            .users
            .put("ana@x.io", &user("ana@x.io", "correct-horse").await)
            .await
            .unwrap();

        let identity = authenticate(&tables, &owner, " Ana@X.io ", "correct-horse", None)
            .await
            .unwrap();
        assert_eq!(identity.role, Role::User);
        assert_eq!(identity.email, "ana@x.io");

        let err = authenticate(&tables, &owner, "ana@x.io", "wrong-horse", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let (tables, _dir) = temp_tables();
        let owner = owner("owner-secret").await;
        let err = authenticate(&tables, &owner, "ghost@x.io", "whatever1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_owner_takes_priority_over_identical_user() {
        let (tables, _dir) = temp_tables();
        let owner = owner("shared-secret").await;
        tables
            .users
            .put(
                "owner@example.com",
                &user("owner@example.com", "shared-secret").await,
            )
            .await
            .unwrap();

        let identity = authenticate(&tables, &owner, "owner@example.com", "shared-secret", None)
            .await
            .unwrap();
        assert_eq!(identity.role, Role::Owner);
    }

    #[tokio::test]
    async fn test_claimed_role_restricts_tables() {
        let (tables, _dir) = temp_tables();
        let owner = owner("owner-secret").await;
        tables
            .companies
            .put(
                "hr@techcorp.io",
                &CompanyAccount {
                    email: "hr@techcorp.io".to_string(),
                    password_hash: hash_password("company-pass", COST).await.unwrap(),
                    name: "TechCorp".to_string(),
                    branch: None,
                    location: "Pune".to_string(),
                    skills: vec!["Java".to_string()],
                    logo_object_key: None,
                    created_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let ok = authenticate(&tables, &owner, "hr@techcorp.io", "company-pass", Some(Role::Company))
            .await
            .unwrap();
        assert_eq!(ok.role, Role::Company);

        let err = authenticate(&tables, &owner, "hr@techcorp.io", "company-pass", Some(Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_a_mismatch() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash").await.unwrap());
    }

    #[test]
    fn test_validate_new_credentials() {
        assert_eq!(
            validate_new_credentials(" Bob@Mail.com", "longenough").unwrap(),
            "bob@mail.com"
        );
        assert!(validate_new_credentials("bob", "longenough").is_err());
        assert!(validate_new_credentials("bob@mail.com", "short").is_err());
    }
}
