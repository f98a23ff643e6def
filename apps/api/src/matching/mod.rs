//! Resume Matching Engine: keyword containment of company skills in resume text.
//!
//! A resume matches a company when any one required skill occurs in it as a
//! case-insensitive substring. Every upload is evaluated against every company
//! and replaces the user's whole schedule:
//! - match → `selected`, with a placeholder interview slot
//! - no match → `rejected`, with AI-written feedback (fan-out bounded by a semaphore)

pub mod document;
pub mod handlers;
pub mod prompts;

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::prompts::{excerpt, fill, BREVITY_INSTRUCTION, HR_PERSONA, MAX_RESUME_CHARS};
use crate::llm_client::{ChatCompletion, ChatMessage, LlmError};
use crate::matching::prompts::{REJECTION_PROMPT, REJECTION_SYSTEM};
use crate::models::company::CompanyAccount;
use crate::models::schedule::{InterviewMode, ScheduleEntry, UserSchedule};
use crate::routes::upload::UploadedFile;
use crate::storage::blob::BlobStore;
use crate::storage::Tables;

/// Placeholder interview slot for selected candidates.
const INTERVIEW_HOUR: u32 = 10;

#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Max rejection-feedback calls in flight per upload.
    pub feedback_concurrency: usize,
    /// When false, rejections are recorded without calling the AI.
    pub rejection_feedback: bool,
    /// Days between the upload and the placeholder interview date.
    pub lead_days: i64,
}

impl MatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feedback_concurrency: config.match_feedback_concurrency,
            rejection_feedback: config.match_rejection_feedback,
            lead_days: config.interview_lead_days,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub selected: Vec<String>,
    pub rejected: Vec<String>,
    /// Rejected companies whose feedback call failed; their entries carry no feedback.
    pub feedback_failures: Vec<String>,
    pub schedule: UserSchedule,
}

impl MatchReport {
    /// First selected company, in key order.
    pub fn first_selected(&self) -> Option<&str> {
        self.selected.first().map(String::as_str)
    }
}

/// Collapses inner whitespace the same way resume text is collapsed, so a
/// multi-word skill can still occur in it.
fn normalize_term(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits the comma-separated skills field, dropping blanks.
pub fn parse_skill_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_term)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Required skills that occur in the resume, case-insensitively. Blank terms
/// never match.
pub fn matched_skills(resume: &str, skills: &[String]) -> Vec<String> {
    let haystack = resume.to_lowercase();
    skills
        .iter()
        .map(|s| normalize_term(s))
        .filter(|s| !s.is_empty() && haystack.contains(&s.to_lowercase()))
        .collect()
}

fn selected_entry(
    company: &CompanyAccount,
    matched: Vec<String>,
    today: NaiveDate,
    lead_days: i64,
) -> ScheduleEntry {
    ScheduleEntry::Selected {
        company_name: company.name.clone(),
        date: today + Duration::days(lead_days),
        time: NaiveTime::from_hms_opt(INTERVIEW_HOUR, 0, 0).unwrap_or_default(),
        mode: InterviewMode::Online,
        matched_skills: matched,
    }
}

fn rejection_messages(company: &CompanyAccount, resume: &str) -> Vec<ChatMessage> {
    let skills = company.skills.join(", ");
    vec![
        ChatMessage::system(format!("{HR_PERSONA} {REJECTION_SYSTEM} {BREVITY_INSTRUCTION}")),
        ChatMessage::user(fill(
            REJECTION_PROMPT,
            &[
                ("company", company.name.as_str()),
                ("skills", skills.as_str()),
                ("resume", excerpt(resume, MAX_RESUME_CHARS)),
            ],
        )),
    ]
}

/// Evaluates `resume` against every company and replaces the user's schedule.
pub async fn evaluate_resume(
    tables: &Tables,
    llm: Arc<dyn ChatCompletion>,
    settings: &MatchSettings,
    user_email: &str,
    resume: &str,
    today: NaiveDate,
) -> Result<MatchReport, AppError> {
    let companies = tables.companies.load_all().await?;

    let mut schedule = UserSchedule::new();
    let mut selected = Vec::new();
    let mut rejected = Vec::new();
    let mut feedback_failures = Vec::new();

    let permits = Arc::new(Semaphore::new(settings.feedback_concurrency.max(1)));
    let mut feedback_tasks: JoinSet<(String, Result<String, LlmError>)> = JoinSet::new();

    for (key, company) in &companies {
        let matched = matched_skills(resume, &company.skills);
        if !matched.is_empty() {
            schedule.insert(key.clone(), selected_entry(company, matched, today, settings.lead_days));
            selected.push(key.clone());
            continue;
        }

        rejected.push(key.clone());
        schedule.insert(
            key.clone(),
            ScheduleEntry::Rejected {
                company_name: company.name.clone(),
                feedback: None,
            },
        );

        if settings.rejection_feedback {
            let llm = llm.clone();
            let permits = permits.clone();
            let messages = rejection_messages(company, resume);
            let key = key.clone();
            feedback_tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (key, llm.complete(&messages).await)
            });
        }
    }

    while let Some(joined) = feedback_tasks.join_next().await {
        let (key, result) = joined.map_err(|e| AppError::Internal(e.into()))?;
        match result {
            Ok(text) => {
                if let Some(ScheduleEntry::Rejected { feedback, .. }) = schedule.get_mut(&key) {
                    *feedback = Some(text);
                }
            }
            Err(e) => {
                warn!("Rejection feedback for {key} failed: {e}");
                feedback_failures.push(key);
            }
        }
    }
    feedback_failures.sort();

    tables.schedules.put(user_email, &schedule).await?;

    // Deletions may have cascaded while the feedback calls were running, and
    // the write above would have resurrected what they removed.
    if tables.users.get(user_email).await?.is_none() {
        tables.schedules.remove(user_email).await?;
        return Err(AppError::NotFound(format!("User {user_email} not found")));
    }
    let live = tables.companies.load_all().await?;
    let gone: Vec<String> = schedule
        .keys()
        .filter(|key| !live.contains_key(key.as_str()))
        .cloned()
        .collect();
    if !gone.is_empty() {
        warn!("{} companies were deleted while evaluating {user_email}", gone.len());
        tables
            .schedules
            .update(user_email, |current| {
                current.map(|mut s| {
                    s.retain(|key, _| !gone.contains(key));
                    s
                })
            })
            .await?;
        schedule.retain(|key, _| !gone.contains(key));
        for keys in [&mut selected, &mut rejected, &mut feedback_failures] {
            keys.retain(|key| !gone.contains(key));
        }
    }

    info!(
        "Evaluated resume of {user_email}: {} selected, {} rejected",
        selected.len(),
        rejected.len()
    );

    Ok(MatchReport {
        selected,
        rejected,
        feedback_failures,
        schedule,
    })
}

/// Extracts the resume text, keeps the original when object storage is
/// configured, stores the text on the user and re-runs matching. Nothing is
/// uploaded for an unknown user.
pub async fn upload_resume(
    tables: &Tables,
    blobs: Option<&BlobStore>,
    llm: Arc<dyn ChatCompletion>,
    settings: &MatchSettings,
    user_email: &str,
    file: UploadedFile,
    today: NaiveDate,
) -> Result<MatchReport, AppError> {
    let not_found = || AppError::NotFound(format!("User {user_email} not found"));
    if tables.users.get(user_email).await?.is_none() {
        return Err(not_found());
    }

    let resume = {
        let file_name = file.file_name.clone();
        let content_type = file.content_type.clone();
        let bytes = file.bytes.clone();
        tokio::task::spawn_blocking(move || {
            document::extract_text(&file_name, content_type.as_deref(), &bytes)
        })
        .await
        .map_err(|e| {
            AppError::UnsupportedDocumentFormat(format!("Document could not be parsed: {e}"))
        })??
    };

    let object_key = match blobs {
        Some(blobs) => Some(
            blobs
                .upload(
                    "resumes",
                    user_email,
                    &file.file_name,
                    file.content_type.as_deref(),
                    file.bytes,
                )
                .await?,
        ),
        None => None,
    };

    let stored = tables
        .users
        .update(user_email, |user| {
            user.map(|mut u| {
                u.resume = resume.clone();
                if object_key.is_some() {
                    u.resume_object_key = object_key.clone();
                }
                u
            })
        })
        .await?;
    if stored.is_none() {
        // Deleted while the upload was in flight.
        if let (Some(blobs), Some(key)) = (blobs, &object_key) {
            blobs.delete(key).await?;
        }
        return Err(not_found());
    }

    evaluate_resume(tables, llm, settings, user_email, &resume, today).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedLlm;
    use crate::models::user::UserAccount;
    use crate::storage::testing::temp_tables;
    use async_trait::async_trait;
    use chrono::Utc;

    fn skills(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resume_matches(resume: &str, required: &[String]) -> bool {
        !matched_skills(resume, required).is_empty()
    }

    fn company(name: &str, email: &str, required: &[&str]) -> CompanyAccount {
        CompanyAccount {
            email: email.to_string(),
            password_hash: "x".to_string(),
            name: name.to_string(),
            branch: None,
            location: "Remote".to_string(),
            skills: skills(required),
            logo_object_key: None,
            created_at: Utc::now(),
        }
    }

    fn settings() -> MatchSettings {
        MatchSettings {
            feedback_concurrency: 2,
            rejection_feedback: true,
            lead_days: 7,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    async fn seed_user(tables: &Tables, email: &str) {
        let user = UserAccount {
            email: email.to_string(),
            password_hash: "x".to_string(),
            profile: None,
            resume: String::new(),
            resume_object_key: None,
            created_at: Utc::now(),
        };
        tables.users.put(email, &user).await.unwrap();
    }

    async fn seed(tables: &Tables) {
        seed_user(tables, "ana@x.io").await;
        tables
            .companies
            .put(
                "hr@companyx.io",
                &company("CompanyX", "hr@companyx.io", &["Python", "Machine Learning", "Communication"]),
            )
            .await
            .unwrap();
        tables
            .companies
            .put(
                "jobs@techcorp.io",
                &company("TechCorp", "jobs@techcorp.io", &["Java", "Spring", "REST API"]),
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        assert!(resume_matches("Built ML pipelines in PYTHON", &skills(&["python"])));
        assert!(resume_matches("javascript", &skills(&["Java"])));
        assert!(!resume_matches("Rust and Go", &skills(&["Java", "Spring"])));
    }

    #[test]
    fn test_empty_requirements_never_match() {
        assert!(!resume_matches("Python Java", &[]));
        assert!(!resume_matches("Python Java", &skills(&["", "   "])));
    }

    #[test]
    fn test_empty_resume_matches_nothing() {
        assert!(!resume_matches("", &skills(&["Python", "Java"])));
    }

    #[test]
    fn test_matched_skills_lists_hits_trimmed() {
        let hits = matched_skills("python, communication", &skills(&[" Python ", "Java", "Communication"]));
        assert_eq!(hits, vec!["Python", "Communication"]);
    }

    #[test]
    fn test_parse_skill_list() {
        assert_eq!(
            parse_skill_list("Java, Spring ,, REST \t API,"),
            vec!["Java", "Spring", "REST API"]
        );
        assert!(parse_skill_list(" , ").is_empty());
    }

    #[test]
    fn test_inner_whitespace_in_skill_still_matches() {
        let resume = "Designed REST API services";
        assert_eq!(matched_skills(resume, &skills(&["REST  API"])), vec!["REST API"]);
        assert!(resume_matches(resume, &skills(&["rest\tapi"])));
    }

    #[tokio::test]
    async fn test_python_resume_selected_by_companyx_rejected_by_techcorp() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::always("Consider learning Java and Spring."));

        let report = evaluate_resume(
            &tables,
            llm.clone(),
            &settings(),
            "ana@x.io",
            "Data scientist. Python, pandas, SQL.",
            today(),
        )
        .await
        .unwrap();

        assert_eq!(report.selected, vec!["hr@companyx.io"]);
        assert_eq!(report.rejected, vec!["jobs@techcorp.io"]);
        assert!(report.feedback_failures.is_empty());
        assert_eq!(llm.call_count(), 1);

        let stored = tables.schedules.get("ana@x.io").await.unwrap().unwrap();
        assert_eq!(stored, report.schedule);
        match &stored["hr@companyx.io"] {
            ScheduleEntry::Selected { date, matched_skills, mode, .. } => {
                assert_eq!(*date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
                assert_eq!(matched_skills, &vec!["Python".to_string()]);
                assert_eq!(*mode, InterviewMode::Online);
            }
            other => panic!("expected selected, got {other:?}"),
        }
        match &stored["jobs@techcorp.io"] {
            ScheduleEntry::Rejected { feedback, company_name } => {
                assert_eq!(company_name, "TechCorp");
                assert_eq!(feedback.as_deref(), Some("Consider learning Java and Spring."));
            }
            other => panic!("expected rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_resume_is_rejected_everywhere() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::always("Please upload a resume."));

        let report = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "", today())
            .await
            .unwrap();

        assert!(report.selected.is_empty());
        assert_eq!(report.rejected.len(), 2);
        assert!(report.schedule.values().all(|e| !e.is_selected()));
    }

    #[tokio::test]
    async fn test_reupload_overwrites_previous_entries() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm: Arc<dyn ChatCompletion> = Arc::new(ScriptedLlm::always("feedback"));

        evaluate_resume(&tables, llm.clone(), &settings(), "ana@x.io", "Java Spring", today())
            .await
            .unwrap();
        tables.companies.remove("jobs@techcorp.io").await.unwrap();

        let report = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "Python", today())
            .await
            .unwrap();

        let stored = tables.schedules.get("ana@x.io").await.unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored["hr@companyx.io"].is_selected());
        assert_eq!(report.selected, vec!["hr@companyx.io"]);
    }

    #[tokio::test]
    async fn test_feedback_failure_is_recoverable() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::failing());

        let report = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "Python", today())
            .await
            .unwrap();

        assert_eq!(report.feedback_failures, vec!["jobs@techcorp.io"]);
        assert_eq!(
            report.schedule["jobs@techcorp.io"],
            ScheduleEntry::Rejected {
                company_name: "TechCorp".to_string(),
                feedback: None
            }
        );
    }

    #[tokio::test]
    async fn test_feedback_can_be_switched_off() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let mut settings = settings();
        settings.rejection_feedback = false;

        let report = evaluate_resume(&tables, llm.clone(), &settings, "ana@x.io", "Go", today())
            .await
            .unwrap();

        assert_eq!(report.rejected.len(), 2);
        assert_eq!(llm.call_count(), 0);
        assert!(report.feedback_failures.is_empty());
    }

    #[tokio::test]
    async fn test_no_companies_writes_empty_schedule() {
        let (tables, _dir) = temp_tables();
        seed_user(&tables, "ana@x.io").await;
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let report = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "Python", today())
            .await
            .unwrap();
        assert!(report.schedule.is_empty());
        assert_eq!(
            tables.schedules.get("ana@x.io").await.unwrap(),
            Some(UserSchedule::new())
        );
    }

    #[tokio::test]
    async fn test_upload_resume_stores_text_and_matches() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::always("Learn Spring."));
        let file = UploadedFile {
            file_name: "cv.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: bytes::Bytes::from_static(b"Python developer\nGood communication"),
        };

        let report = upload_resume(&tables, None, llm, &settings(), "ana@x.io", file, today())
            .await
            .unwrap();

        assert_eq!(report.first_selected(), Some("hr@companyx.io"));
        let user = tables.users.get("ana@x.io").await.unwrap().unwrap();
        assert_eq!(user.resume, "Python developer Good communication");
    }

    #[tokio::test]
    async fn test_upload_unsupported_document_changes_nothing() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let file = UploadedFile {
            file_name: "cv.doc".to_string(),
            content_type: Some("application/msword".to_string()),
            bytes: bytes::Bytes::from_static(b"\xd0\xcf\x11\xe0"),
        };

        let err = upload_resume(&tables, None, llm, &settings(), "ana@x.io", file, today())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedDocumentFormat(_)));
        assert!(tables.schedules.get("ana@x.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_for_unknown_user_is_not_found() {
        let (tables, _dir) = temp_tables();
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let file = UploadedFile {
            file_name: "cv.txt".to_string(),
            content_type: None,
            bytes: bytes::Bytes::from_static(b"Python"),
        };
        let err = upload_resume(&tables, None, llm, &settings(), "ghost@x.io", file, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_is_checked_before_the_document() {
        let (tables, _dir) = temp_tables();
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let file = UploadedFile {
            file_name: "cv.doc".to_string(),
            content_type: None,
            bytes: bytes::Bytes::from_static(b"\xd0\xcf\x11\xe0"),
        };
        let err = upload_resume(&tables, None, llm, &settings(), "ghost@x.io", file, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Deletes an account from inside the feedback call, the way an owner
    /// acting during a slow AI request would.
    struct DeletingLlm {
        tables: Tables,
        user: Option<&'static str>,
        company: Option<&'static str>,
    }

    #[async_trait]
    impl ChatCompletion for DeletingLlm {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
            if let Some(email) = self.user {
                let _ = crate::owner::delete_user(&self.tables, "owner@x.io", email).await;
            }
            if let Some(email) = self.company {
                let _ = crate::owner::delete_company(&self.tables, "owner@x.io", email).await;
            }
            Ok("Consider learning Java.".to_string())
        }
    }

    #[tokio::test]
    async fn test_user_deleted_during_evaluation_leaves_no_schedule() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(DeletingLlm {
            tables: tables.clone(),
            user: Some("ana@x.io"),
            company: None,
        });

        let err = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "Python", today())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(tables.users.get("ana@x.io").await.unwrap().is_none());
        assert!(tables.schedules.get("ana@x.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_company_deleted_during_evaluation_is_dropped() {
        let (tables, _dir) = temp_tables();
        seed(&tables).await;
        let llm = Arc::new(DeletingLlm {
            tables: tables.clone(),
            user: None,
            company: Some("jobs@techcorp.io"),
        });

        let report = evaluate_resume(&tables, llm, &settings(), "ana@x.io", "Python", today())
            .await
            .unwrap();

        assert_eq!(report.selected, vec!["hr@companyx.io"]);
        assert!(report.rejected.is_empty());
        let stored = tables.schedules.get("ana@x.io").await.unwrap().unwrap();
        assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["hr@companyx.io"]);
        assert_eq!(stored, report.schedule);
    }
}
