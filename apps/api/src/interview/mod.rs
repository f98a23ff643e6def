//! Mock Interview Conductor: drives `machine::InterviewState` with the AI.
//!
//! Every AI call happens before the session state is touched, so a failed
//! call aborts the step and leaves the interview exactly where it was.

pub mod handlers;
pub mod machine;
pub mod prompts;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::session::Session;
use crate::errors::AppError;
use crate::interview::machine::{
    InterviewState, Level, QuestionSource, StepOutcome, FIXED_QUESTIONS, QUESTION_COUNT,
};
use crate::interview::prompts::{FEEDBACK_PROMPT, FEEDBACK_SYSTEM, QUESTION_PROMPT, QUESTION_SYSTEM};
use crate::llm_client::prompts::{excerpt, fill, BREVITY_INSTRUCTION, HR_PERSONA, MAX_RESUME_CHARS};
use crate::llm_client::{ChatCompletion, ChatMessage};
use crate::models::normalize_email;
use crate::storage::Tables;

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Company email to practise for; defaults to the session's selected company.
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub level: Option<Level>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewView {
    pub in_progress: bool,
    pub step: usize,
    pub total: usize,
    pub question: Option<String>,
    pub source: Option<QuestionSource>,
}

impl From<&InterviewState> for InterviewView {
    fn from(state: &InterviewState) -> Self {
        Self {
            in_progress: state.is_in_progress(),
            step: state.step(),
            total: QUESTION_COUNT,
            question: state.current_question().map(str::to_string),
            source: state.progress().map(|p| p.source.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub feedback: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Everything needed to write a generated question.
struct GenerationContext {
    company_name: String,
    skills: Vec<String>,
    resume: String,
    level: Level,
}

async fn generation_context(
    tables: &Tables,
    user_email: &str,
    source: &QuestionSource,
) -> Result<Option<GenerationContext>, AppError> {
    let QuestionSource::Generated {
        company,
        company_name,
        level,
    } = source
    else {
        return Ok(None);
    };
    let skills = tables
        .companies
        .get(company)
        .await?
        .map(|c| c.skills)
        .ok_or_else(|| AppError::NotFound(format!("Company {company} not found")))?;
    let resume = tables
        .users
        .get(user_email)
        .await?
        .map(|u| u.resume)
        .unwrap_or_default();
    Ok(Some(GenerationContext {
        company_name: company_name.clone(),
        skills,
        resume,
        level: *level,
    }))
}

async fn generate_question(
    llm: &dyn ChatCompletion,
    ctx: &GenerationContext,
    number: usize,
    asked: &[&str],
) -> Result<String, AppError> {
    let asked = if asked.is_empty() {
        "(none)".to_string()
    } else {
        asked
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let skills = ctx.skills.join(", ");
    let number = number.to_string();
    let total = QUESTION_COUNT.to_string();
    let messages = vec![
        ChatMessage::system(format!(
            "{HR_PERSONA} {}",
            fill(QUESTION_SYSTEM, &[("level", ctx.level.describe())])
        )),
        ChatMessage::user(fill(
            QUESTION_PROMPT,
            &[
                ("company", ctx.company_name.as_str()),
                ("resume", excerpt(&ctx.resume, MAX_RESUME_CHARS)),
                ("skills", skills.as_str()),
                ("level", ctx.level.describe()),
                ("number", number.as_str()),
                ("total", total.as_str()),
                ("asked", asked.as_str()),
            ],
        )),
    ];
    Ok(llm.complete(&messages).await?)
}

async fn answer_feedback(
    llm: &dyn ChatCompletion,
    question: &str,
    answer: &str,
) -> Result<String, AppError> {
    let messages = vec![
        ChatMessage::system(format!("{HR_PERSONA} {FEEDBACK_SYSTEM} {BREVITY_INSTRUCTION}")),
        ChatMessage::user(fill(
            FEEDBACK_PROMPT,
            &[("question", question), ("answer", answer)],
        )),
    ];
    Ok(llm.complete(&messages).await?)
}

/// Starts (or restarts) the caller's interview at step 0.
///
/// Questions are AI-generated when a company is known and the user has a
/// resume; otherwise the fixed question list is used.
pub async fn start_interview(
    tables: &Tables,
    llm: &dyn ChatCompletion,
    session: &mut Session,
    req: StartRequest,
) -> Result<InterviewView, AppError> {
    let explicit = req.company.as_deref().map(normalize_email);
    let company_key = explicit.clone().or_else(|| session.selected_company.clone());

    let company = match &company_key {
        Some(key) => tables.companies.get(key).await?,
        None => None,
    };
    if let (Some(key), None) = (&explicit, &company) {
        return Err(AppError::NotFound(format!("Company {key} not found")));
    }

    let has_resume = tables
        .users
        .get(&session.email)
        .await?
        .is_some_and(|u| !u.resume.trim().is_empty());

    let source = match company {
        Some(company) if has_resume => QuestionSource::Generated {
            company: company.email,
            company_name: company.name,
            level: req.level.unwrap_or_default(),
        },
        _ => QuestionSource::Fixed,
    };

    let first_question = match generation_context(tables, &session.email, &source).await? {
        Some(ctx) => generate_question(llm, &ctx, 1, &[]).await?,
        None => FIXED_QUESTIONS[0].to_string(),
    };

    if explicit.is_some() {
        session.selected_company = explicit;
    }
    session.interview.start(source, first_question);
    info!("{} started an interview", session.email);

    Ok(InterviewView::from(&session.interview))
}

/// Gets feedback on the answer and moves to the next question, or completes
/// the interview after the last one.
pub async fn submit_answer(
    tables: &Tables,
    llm: &dyn ChatCompletion,
    session: &mut Session,
    req: AnswerRequest,
) -> Result<AnswerResponse, AppError> {
    let answer = req.answer.trim().to_string();
    if answer.is_empty() {
        return Err(AppError::Validation("Answer cannot be empty".to_string()));
    }
    let progress = session
        .interview
        .progress()
        .cloned()
        .ok_or_else(|| AppError::Validation("No interview in progress".to_string()))?;

    let feedback = answer_feedback(llm, &progress.question, &answer).await?;

    let next_question = if session.interview.has_next_question() {
        let next_step = progress.step + 1;
        let question = match generation_context(tables, &session.email, &progress.source).await? {
            Some(ctx) => {
                let mut asked: Vec<&str> =
                    progress.turns.iter().map(|t| t.question.as_str()).collect();
                asked.push(progress.question.as_str());
                generate_question(llm, &ctx, next_step + 1, &asked).await?
            }
            None => FIXED_QUESTIONS[next_step].to_string(),
        };
        Some(question)
    } else {
        None
    };

    let outcome = session
        .interview
        .advance(answer, feedback.clone(), next_question)?;
    if matches!(outcome, StepOutcome::Complete { .. }) {
        info!("{} completed an interview", session.email);
    }

    Ok(AnswerResponse { feedback, outcome })
}
