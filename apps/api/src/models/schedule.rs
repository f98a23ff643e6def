use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewMode {
    Online,
    Onsite,
}

/// Outcome of matching one user's resume against one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScheduleEntry {
    Selected {
        company_name: String,
        date: NaiveDate,
        time: NaiveTime,
        mode: InterviewMode,
        matched_skills: Vec<String>,
    },
    Rejected {
        company_name: String,
        /// AI-written explanation; absent when the AI call failed.
        feedback: Option<String>,
    },
}

impl ScheduleEntry {
    pub fn is_selected(&self) -> bool {
        matches!(self, ScheduleEntry::Selected { .. })
    }
}

/// All of one user's entries, keyed by company email. Persisted in the
/// `schedules` collection under the user's email, so a re-upload replaces the
/// whole set in one write.
pub type UserSchedule = BTreeMap<String, ScheduleEntry>;
