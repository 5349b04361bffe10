use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Highest score a single assessment parameter can receive.
pub const MAX_PARAMETER_SCORE: u8 = 2;
/// Totals at or above this are satisfactory.
pub const SATISFACTORY_THRESHOLD: u8 = 11;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub trainer: Option<String>,
    pub location: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub training_date: NaiveDate,
    pub duration_minutes: Option<u32>,
    /// Cleared when the creating user is permanently deleted.
    pub created_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTraining {
    #[schema(example = "Fire safety")]
    pub title: String,
    pub description: Option<String>,
    pub trainer: Option<String>,
    pub location: Option<String>,
    #[schema(example = "2025-06-10", value_type = String, format = "date")]
    pub training_date: NaiveDate,
    #[schema(example = 90)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewTraining {
    pub title: String,
    pub description: Option<String>,
    pub trainer: Option<String>,
    pub location: Option<String>,
    pub training_date: NaiveDate,
    pub duration_minutes: Option<u32>,
    pub created_by: u64,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendeeStatus {
    Registered,
    Present,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingAttendee {
    pub id: u64,
    pub training_id: u64,
    pub user_id: u64,
    pub status: AttendeeStatus,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAttendees {
    pub user_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPresent {
    pub training_id: u64,
    pub user_id: u64,
}

/// The fixed assessment sheet; every parameter is scored 0, 1 or 2.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScores {
    pub punctuality: u8,
    pub participation: u8,
    pub comprehension: u8,
    pub practical_application: u8,
    pub teamwork: u8,
    pub communication: u8,
    pub safety_awareness: u8,
    pub attitude: u8,
}

impl AssessmentScores {
    fn named(&self) -> [(&'static str, u8); 8] {
        [
            ("punctuality", self.punctuality),
            ("participation", self.participation),
            ("comprehension", self.comprehension),
            ("practicalApplication", self.practical_application),
            ("teamwork", self.teamwork),
            ("communication", self.communication),
            ("safetyAwareness", self.safety_awareness),
            ("attitude", self.attitude),
        ]
    }

    pub fn validate(&self) -> AppResult<()> {
        match self.named().into_iter().find(|(_, score)| *score > MAX_PARAMETER_SCORE) {
            Some((name, score)) => Err(AppError::validation(format!(
                "{name} must be between 0 and {MAX_PARAMETER_SCORE}, got {score}"
            ))),
            None => Ok(()),
        }
    }

    pub fn total(&self) -> u8 {
        self.named().iter().map(|(_, score)| score).sum()
    }

    pub fn result(&self) -> AssessmentResult {
        if self.total() >= SATISFACTORY_THRESHOLD {
            AssessmentResult::Satisfactory
        } else {
            AssessmentResult::Unsatisfactory
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssessmentResult {
    Satisfactory,
    Unsatisfactory,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingAssessment {
    pub id: u64,
    pub training_id: u64,
    pub user_id: u64,
    pub assessor_id: u64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub scores: AssessmentScores,
    pub total_score: u8,
    pub status: AssessmentResult,
    pub comments: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessment {
    pub training_id: u64,
    pub user_id: u64,
    #[serde(flatten)]
    pub scores: AssessmentScores,
    pub comments: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub training_id: u64,
    pub user_id: u64,
    pub assessor_id: u64,
    pub scores: AssessmentScores,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AssessmentFilter {
    pub training_id: Option<u64>,
    pub user_id: Option<u64>,
}

impl AssessmentFilter {
    pub fn matches(&self, a: &TrainingAssessment) -> bool {
        self.training_id.is_none_or(|id| a.training_id == id)
            && self.user_id.is_none_or(|id| a.user_id == id)
    }
}

/// Yes/no questions of the feedback form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow, ToSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnswers {
    pub objectives_met: bool,
    pub content_relevant: bool,
    pub trainer_effective: bool,
    pub materials_useful: bool,
    pub would_recommend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingFeedback {
    pub id: u64,
    pub training_id: u64,
    pub user_id: u64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub answers: FeedbackAnswers,
    pub most_valuable: Option<String>,
    pub improvements: Option<String>,
    pub comments: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedback {
    pub training_id: u64,
    /// Defaults to the caller.
    pub user_id: Option<u64>,
    #[serde(flatten)]
    pub answers: FeedbackAnswers,
    pub most_valuable: Option<String>,
    pub improvements: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub training_id: u64,
    pub user_id: u64,
    pub answers: FeedbackAnswers,
    pub most_valuable: Option<String>,
    pub improvements: Option<String>,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
}
