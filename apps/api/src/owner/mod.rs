//! Owner Console: bulk and targeted deletion, platform counts.
//!
//! Deletions cascade into the schedules collection so no entry outlives the
//! user or company it refers to, and give the email back for registration.

pub mod handlers;

use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::models::{normalize_email, Role};
use crate::storage::Tables;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformMetrics {
    pub users: usize,
    pub companies: usize,
    /// Users with at least one evaluated resume.
    pub schedules: usize,
    pub selected: usize,
    pub rejected: usize,
}

pub async fn clear_users(tables: &Tables, actor: &str) -> Result<(), AppError> {
    tables.users.clear().await?;
    tables.schedules.clear().await?;
    release_orphaned_reservations(tables, Role::User).await?;
    warn!("{actor} deleted all users");
    Ok(())
}

pub async fn clear_companies(tables: &Tables, actor: &str) -> Result<(), AppError> {
    tables.companies.clear().await?;
    strip_companies_from_schedules(tables, |_| true).await?;
    release_orphaned_reservations(tables, Role::Company).await?;
    warn!("{actor} deleted all companies");
    Ok(())
}

pub async fn delete_user(tables: &Tables, actor: &str, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if !tables.users.remove(&email).await? {
        return Err(AppError::NotFound(format!("User {email} not found")));
    }
    tables.schedules.remove(&email).await?;
    tables.accounts.remove(&email).await?;
    warn!("{actor} deleted user {email}");
    Ok(())
}

pub async fn delete_company(tables: &Tables, actor: &str, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);
    if !tables.companies.remove(&email).await? {
        return Err(AppError::NotFound(format!("Company {email} not found")));
    }
    strip_companies_from_schedules(tables, |key| key == email).await?;
    tables.accounts.remove(&email).await?;
    warn!("{actor} deleted company {email}");
    Ok(())
}

/// Removes matching company entries from every user's schedule, one
/// compare-and-swap per affected user.
async fn strip_companies_from_schedules<F>(tables: &Tables, doomed: F) -> Result<(), AppError>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    let schedules = tables.schedules.load_all().await?;
    for (user_email, schedule) in schedules {
        if !schedule.keys().any(|k| doomed(k.as_str())) {
            continue;
        }
        tables
            .schedules
            .update(&user_email, |current| {
                current.map(|mut s| {
                    s.retain(|k, _| !doomed(k.as_str()));
                    s
                })
            })
            .await?;
    }
    Ok(())
}

/// Drops `role` reservations whose account no longer exists. Accounts
/// registered after the clear keep theirs.
async fn release_orphaned_reservations(tables: &Tables, role: Role) -> Result<(), AppError> {
    for (email, reserved) in tables.accounts.load_all().await? {
        if reserved != role {
            continue;
        }
        let exists = match role {
            Role::User => tables.users.get(&email).await?.is_some(),
            Role::Company => tables.companies.get(&email).await?.is_some(),
            Role::Owner => true,
        };
        if !exists {
            tables.accounts.remove(&email).await?;
        }
    }
    Ok(())
}

pub async fn metrics(tables: &Tables) -> Result<PlatformMetrics, AppError> {
    let schedules = tables.schedules.load_all().await?;
    let (selected, rejected) = schedules
        .values()
        .flat_map(|s| s.values())
        .fold((0, 0), |(sel, rej), entry| {
            if entry.is_selected() {
                (sel + 1, rej)
            } else {
                (sel, rej + 1)
            }
        });

    Ok(PlatformMetrics {
        users: tables.users.count().await?,
        companies: tables.companies.count().await?,
        schedules: schedules.len(),
        selected,
        rejected,
    })
}
