//! Registration and profile capture for users and companies.

pub mod handlers;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, validate_new_credentials};
use crate::errors::AppError;
use crate::matching::parse_skill_list;
use crate::models::company::CompanyAccount;
use crate::models::schedule::ScheduleEntry;
use crate::models::user::{Education, UserAccount, UserProfile};
use crate::models::{normalize_email, Role};
use crate::storage::Tables;

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 60;

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
}

/// Skills arrive either as the form's comma-separated text or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillsInput {
    List(Vec<String>),
    Text(String),
}

impl SkillsInput {
    fn into_skills(self) -> Vec<String> {
        match self {
            SkillsInput::Text(raw) => parse_skill_list(&raw),
            SkillsInput::List(items) => parse_skill_list(&items.join(",")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterCompanyRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub location: String,
    pub skills: SkillsInput,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub name: String,
    pub age: u8,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub domain: String,
    pub education: Education,
}

/// One candidate's outcome as seen by a company.
#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
    pub user_email: String,
    pub name: Option<String>,
    pub entry: ScheduleEntry,
}

/// Claims `email` for one account kind. The `accounts` keyspace is the only
/// authority on uniqueness: of two racing registrations, whichever kind, one
/// `insert_new` wins. The owner email is never claimable.
async fn reserve_email(
    tables: &Tables,
    owner_email: &str,
    email: &str,
    role: Role,
) -> Result<(), AppError> {
    if email == owner_email || !tables.accounts.insert_new(email, &role).await? {
        return Err(AppError::DuplicateAccount(email.to_string()));
    }
    Ok(())
}

/// Gives a reservation back after the account write did not happen.
async fn release_email(tables: &Tables, email: &str) {
    if let Err(e) = tables.accounts.remove(email).await {
        warn!("Could not release reservation of {email}: {e}");
    }
}

/// Reserves the emails of accounts written before the `accounts` keyspace
/// existed. Returns how many were added.
pub async fn backfill_reservations(tables: &Tables) -> Result<usize, AppError> {
    let mut added = 0;
    for email in tables.users.load_all().await?.into_keys() {
        if tables.accounts.insert_new(&email, &Role::User).await? {
            added += 1;
        }
    }
    for email in tables.companies.load_all().await?.into_keys() {
        if tables.accounts.insert_new(&email, &Role::Company).await? {
            added += 1;
        }
    }
    Ok(added)
}

pub async fn register_user(
    tables: &Tables,
    owner_email: &str,
    bcrypt_cost: u32,
    req: RegisterUserRequest,
) -> Result<UserAccount, AppError> {
    let email = validate_new_credentials(&req.email, &req.password)?;
    reserve_email(tables, owner_email, &email, Role::User).await?;

    match create_user(tables, &email, &req.password, bcrypt_cost).await {
        Ok(user) => {
            info!("Registered user {email}");
            Ok(user)
        }
        Err(e) => {
            release_email(tables, &email).await;
            Err(e)
        }
    }
}

async fn create_user(
    tables: &Tables,
    email: &str,
    password: &str,
    bcrypt_cost: u32,
) -> Result<UserAccount, AppError> {
    let user = UserAccount {
        email: email.to_string(),
        password_hash: hash_password(password, bcrypt_cost).await?,
        profile: None,
        resume: String::new(),
        resume_object_key: None,
        created_at: Utc::now(),
    };
    if !tables.users.insert_new(email, &user).await? {
        return Err(AppError::DuplicateAccount(email.to_string()));
    }
    Ok(user)
}

pub async fn register_company(
    tables: &Tables,
    owner_email: &str,
    bcrypt_cost: u32,
    req: RegisterCompanyRequest,
) -> Result<CompanyAccount, AppError> {
    let email = validate_new_credentials(&req.email, &req.password)?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Company name is required".to_string()));
    }
    let skills = req.skills.into_skills();
    if skills.is_empty() {
        return Err(AppError::Validation(
            "At least one required skill must be listed".to_string(),
        ));
    }
    reserve_email(tables, owner_email, &email, Role::Company).await?;

    let company = CompanyAccount {
        email: email.clone(),
        password_hash: String::new(),
        name,
        branch: req
            .branch
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty()),
        location: req.location.trim().to_string(),
        skills,
        logo_object_key: None,
        created_at: Utc::now(),
    };

    match create_company(tables, company, &req.password, bcrypt_cost).await {
        Ok(company) => {
            info!("Registered company {} <{email}>", company.name);
            Ok(company)
        }
        Err(e) => {
            release_email(tables, &email).await;
            Err(e)
        }
    }
}

async fn create_company(
    tables: &Tables,
    mut company: CompanyAccount,
    password: &str,
    bcrypt_cost: u32,
) -> Result<CompanyAccount, AppError> {
    company.password_hash = hash_password(password, bcrypt_cost).await?;
    if !tables.companies.insert_new(&company.email, &company).await? {
        return Err(AppError::DuplicateAccount(company.email));
    }
    Ok(company)
}

pub fn validate_profile(input: ProfileInput) -> Result<UserProfile, AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !(MIN_AGE..=MAX_AGE).contains(&input.age) {
        return Err(AppError::Validation(format!(
            "Age must be between {MIN_AGE} and {MAX_AGE}"
        )));
    }
    Ok(UserProfile {
        name,
        age: input.age,
        phone: input.phone.trim().to_string(),
        state: input.state.trim().to_string(),
        city: input.city.trim().to_string(),
        domain: input.domain.trim().to_string(),
        education: input.education,
    })
}

pub async fn update_profile(
    tables: &Tables,
    email: &str,
    input: ProfileInput,
) -> Result<UserAccount, AppError> {
    let profile = validate_profile(input)?;
    tables
        .users
        .update(email, |user| {
            user.map(|mut u| {
                u.profile = Some(profile.clone());
                u
            })
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {email} not found")))
}

pub async fn get_user(tables: &Tables, email: &str) -> Result<UserAccount, AppError> {
    tables
        .users
        .get(email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {email} not found")))
}

pub async fn set_company_logo(
    tables: &Tables,
    company_email: &str,
    object_key: String,
) -> Result<CompanyAccount, AppError> {
    tables
        .companies
        .update(company_email, |company| {
            company.map(|mut c| {
                c.logo_object_key = Some(object_key.clone());
                c
            })
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {company_email} not found")))
}

/// Every user whose latest resume was evaluated against this company.
pub async fn company_applicants(
    tables: &Tables,
    company_email: &str,
) -> Result<Vec<Applicant>, AppError> {
    let company_email = normalize_email(company_email);
    let schedules = tables.schedules.load_all().await?;
    let users = tables.users.load_all().await?;

    Ok(schedules
        .into_iter()
        .filter_map(|(user_email, mut schedule)| {
            let entry = schedule.remove(&company_email)?;
            let name = users
                .get(&user_email)
                .and_then(|u| u.profile.as_ref())
                .map(|p| p.name.clone());
            Some(Applicant {
                user_email,
                name,
                entry,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::UserSchedule;
    use crate::storage::testing::temp_tables;

    const OWNER: &str = "owner@example.com";
    const COST: u32 = 4;

    fn user_req(email: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    fn company_req(email: &str, skills: &str) -> RegisterCompanyRequest {
        RegisterCompanyRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            name: "CompanyX".to_string(),
            branch: Some("  ".to_string()),
            location: "Bengaluru".to_string(),
            skills: SkillsInput::Text(skills.to_string()),
        }
    }

    fn profile(age: u8) -> ProfileInput {
        ProfileInput {
            name: " Ana ".to_string(),
            age,
            phone: "99999".to_string(),
            state: "KA".to_string(),
            city: "Bengaluru".to_string(),
            domain: "AI".to_string(),
            education: Education::Postgraduate,
        }
    }

    #[tokio::test]
    async fn test_register_user_stores_hash_not_password() {
        let (tables, _dir) = temp_tables();
        let user = register_user(&tables, OWNER, COST, user_req("Ana@X.io")).await.unwrap();
        assert_eq!(user.email, "ana@x.io");
        assert_ne!(user.password_hash, "password123");
        assert!(tables.users.get("ana@x.io").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_user_leaves_existing_record() {
        let (tables, _dir) = temp_tables();
        let first = register_user(&tables, OWNER, COST, user_req("ana@x.io")).await.unwrap();

        let err = register_user(
            &tables,
            OWNER,
            COST,
            RegisterUserRequest {
                email: "ana@x.io".to_string(),
                password: "different-password".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount(_)));

        let stored = tables.users.get("ana@x.io").await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_email_unique_across_tables_and_owner() {
        let (tables, _dir) = temp_tables();
        register_company(&tables, OWNER, COST, company_req("hr@x.io", "Python"))
            .await
            .unwrap();

        let err = register_user(&tables, OWNER, COST, user_req("hr@x.io")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount(_)));

        let err = register_user(&tables, OWNER, COST, user_req(OWNER)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_user_and_company_registration_has_one_winner() {
        let (tables, _dir) = temp_tables();

        for i in 0..6 {
            let email = format!("race{i}@x.io");
            let as_user = {
                let tables = tables.clone();
                let email = email.clone();
                tokio::spawn(async move { register_user(&tables, OWNER, COST, user_req(&email)).await })
            };
            let as_company = {
                let tables = tables.clone();
                let email = email.clone();
                tokio::spawn(async move {
                    register_company(&tables, OWNER, COST, company_req(&email, "Python")).await
                })
            };
            let user = as_user.await.unwrap();
            let company = as_company.await.unwrap();

            assert!(
                user.is_ok() != company.is_ok(),
                "exactly one registration of {email} must win"
            );
            let loser = user.err().or(company.err()).unwrap();
            assert!(matches!(loser, AppError::DuplicateAccount(_)));

            let in_users = tables.users.get(&email).await.unwrap().is_some();
            let in_companies = tables.companies.get(&email).await.unwrap().is_some();
            assert!(in_users != in_companies);
        }
    }

    #[tokio::test]
    async fn test_backfill_reserves_existing_accounts() {
        let (tables, _dir) = temp_tables();
        let user = register_user(&tables, OWNER, COST, user_req("ana@x.io")).await.unwrap();
        tables.accounts.clear().await.unwrap();
        tables.users.put("ana@x.io", &user).await.unwrap();

        assert_eq!(backfill_reservations(&tables).await.unwrap(), 1);
        assert_eq!(backfill_reservations(&tables).await.unwrap(), 0);

        let err = register_company(&tables, OWNER, COST, company_req("ana@x.io", "Python"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount(_)));
    }

    #[tokio::test]
    async fn test_register_company_parses_skills() {
        let (tables, _dir) = temp_tables();
        let company = register_company(
            &tables,
            OWNER,
            COST,
            company_req("hr@x.io", "Python, Machine Learning,,Communication "),
        )
        .await
        .unwrap();
        assert_eq!(company.skills, vec!["Python", "Machine Learning", "Communication"]);
        assert_eq!(company.branch, None);

        let err = register_company(&tables, OWNER, COST, company_req("hr2@x.io", " , "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (tables, _dir) = temp_tables();
        register_user(&tables, OWNER, COST, user_req("ana@x.io")).await.unwrap();

        let user = update_profile(&tables, "ana@x.io", profile(30)).await.unwrap();
        assert_eq!(user.profile.as_ref().unwrap().name, "Ana");

        let err = update_profile(&tables, "ana@x.io", profile(17)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_profile(&tables, "ghost@x.io", profile(30)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_company_applicants_filters_by_company() {
        let (tables, _dir) = temp_tables();
        register_user(&tables, OWNER, COST, user_req("ana@x.io")).await.unwrap();
        update_profile(&tables, "ana@x.io", profile(30)).await.unwrap();

        let mut schedule = UserSchedule::new();
        schedule.insert(
            "hr@x.io".to_string(),
            ScheduleEntry::Rejected {
                company_name: "CompanyX".to_string(),
                feedback: Some("Learn Java".to_string()),
            },
        );
        tables.schedules.put("ana@x.io", &schedule).await.unwrap();
        tables.schedules.put("bob@x.io", &UserSchedule::new()).await.unwrap();

        let applicants = company_applicants(&tables, "HR@x.io").await.unwrap();
        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].user_email, "ana@x.io");
        assert_eq!(applicants[0].name.as_deref(), Some("Ana"));
    }
}
