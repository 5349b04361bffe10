use chrono::Utc;
use serde_json::json;

use super::bulk::{self, BulkSummary};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::training::{
    AssessmentFilter, AttendeeStatus, CreateAssessment, CreateTraining, NewAssessment, NewFeedback,
    NewTraining, SubmitFeedback, TrainingAssessment, TrainingAttendee, TrainingFeedback,
    TrainingRecord,
};
use crate::store::Store;

async fn require_training(store: &dyn Store, id: u64) -> AppResult<TrainingRecord> {
    store
        .find_training(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Training record {id} not found")))
}

async fn require_user(store: &dyn Store, id: u64) -> AppResult<()> {
    match store.find_user(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found(format!("User {id} not found"))),
    }
}

pub async fn create(
    store: &dyn Store,
    caller: &AuthUser,
    input: CreateTraining,
) -> AppResult<TrainingRecord> {
    caller.require_manager_or_admin()?;

    let title = input.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }

    let training = store
        .insert_training(NewTraining {
            title: title.to_string(),
            description: input.description,
            trainer: input.trainer,
            location: input.location,
            training_date: input.training_date,
            duration_minutes: input.duration_minutes,
            created_by: caller.user_id,
        })
        .await?;

    tracing::info!(
        training_id = training.id,
        created_by = caller.user_id,
        "Training record created"
    );
    Ok(training)
}

pub async fn list(store: &dyn Store) -> AppResult<Vec<TrainingRecord>> {
    store.list_trainings().await
}

pub async fn get(store: &dyn Store, id: u64) -> AppResult<TrainingRecord> {
    require_training(store, id).await
}

/// Existing attendees keep their status; unknown users fail individually.
pub async fn register_attendees(
    store: &dyn Store,
    training_id: u64,
    user_ids: Vec<u64>,
) -> AppResult<BulkSummary<TrainingAttendee>> {
    require_training(store, training_id).await?;

    Ok(bulk::run("userId", user_ids, |id| json!(id), |user_id| async move {
        require_user(store, user_id).await?;
        store.register_attendee(training_id, user_id).await
    })
    .await)
}

pub async fn list_attendees(
    store: &dyn Store,
    training_id: u64,
) -> AppResult<Vec<TrainingAttendee>> {
    require_training(store, training_id).await?;
    store.list_attendees(training_id).await
}

pub async fn mark_present(
    store: &dyn Store,
    training_id: u64,
    user_id: u64,
) -> AppResult<TrainingAttendee> {
    require_training(store, training_id).await?;
    require_user(store, user_id).await?;
    store
        .set_attendee_status(training_id, user_id, AttendeeStatus::Present)
        .await
}

pub async fn create_assessment(
    store: &dyn Store,
    caller: &AuthUser,
    input: CreateAssessment,
) -> AppResult<TrainingAssessment> {
    caller.require_manager_or_admin()?;
    input.scores.validate()?;
    require_training(store, input.training_id).await?;
    require_user(store, input.user_id).await?;

    let assessment = store
        .insert_assessment(NewAssessment {
            training_id: input.training_id,
            user_id: input.user_id,
            assessor_id: caller.user_id,
            scores: input.scores,
            comments: input.comments,
        })
        .await?;

    tracing::info!(
        assessment_id = assessment.id,
        training_id = assessment.training_id,
        user_id = assessment.user_id,
        total = assessment.total_score,
        status = %assessment.status,
        "Assessment recorded"
    );
    Ok(assessment)
}

pub async fn list_assessments(
    store: &dyn Store,
    filter: AssessmentFilter,
) -> AppResult<Vec<TrainingAssessment>> {
    store.list_assessments(&filter).await
}

/// Stores the feedback and marks the submitter present in one unit.
pub async fn submit_feedback(
    store: &dyn Store,
    caller: &AuthUser,
    input: SubmitFeedback,
) -> AppResult<(TrainingFeedback, TrainingAttendee)> {
    let user_id = input.user_id.unwrap_or(caller.user_id);
    caller.require_self_or_manager(user_id)?;
    require_training(store, input.training_id).await?;
    require_user(store, user_id).await?;

    store
        .submit_feedback(NewFeedback {
            training_id: input.training_id,
            user_id,
            answers: input.answers,
            most_valuable: input.most_valuable,
            improvements: input.improvements,
            comments: input.comments,
            submitted_at: Utc::now(),
        })
        .await
}

pub async fn list_feedback(
    store: &dyn Store,
    training_id: Option<u64>,
) -> AppResult<Vec<TrainingFeedback>> {
    store.list_feedback(training_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::training::{AssessmentResult, AssessmentScores, FeedbackAnswers};
    use crate::model::user::User;
    use crate::service::fixtures::seed_user;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn as_caller(user: &User) -> AuthUser {
        AuthUser {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    async fn session(store: &MemoryStore, manager: &AuthUser) -> TrainingRecord {
        create(
            store,
            manager,
            CreateTraining {
                title: "Forklift safety".into(),
                description: None,
                trainer: Some("R. Lee".into()),
                location: Some("Warehouse".into()),
                training_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                duration_minutes: Some(90),
            },
        )
        .await
        .unwrap()
    }

    fn feedback(training_id: u64, user_id: Option<u64>) -> SubmitFeedback {
        SubmitFeedback {
            training_id,
            user_id,
            answers: FeedbackAnswers {
                objectives_met: true,
                would_recommend: true,
                ..FeedbackAnswers::default()
            },
            most_valuable: Some("hands-on part".into()),
            improvements: None,
            comments: None,
        }
    }

    #[actix_web::test]
    async fn employees_cannot_create_sessions() {
        let store = MemoryStore::new();
        let emp = as_caller(&seed_user(&store, "emp", Role::Employee).await);
        let input = CreateTraining {
            title: "x".into(),
            description: None,
            trainer: None,
            location: None,
            training_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            duration_minutes: None,
        };
        assert!(matches!(create(&store, &emp, input).await, Err(AppError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn repeated_feedback_keeps_one_present_attendee() {
        let store = MemoryStore::new();
        let mgr = as_caller(&seed_user(&store, "mgr", Role::Manager).await);
        let emp = as_caller(&seed_user(&store, "emp", Role::Employee).await);
        let training = session(&store, &mgr).await;

        let (_, attendee) = submit_feedback(&store, &emp, feedback(training.id, None))
            .await
            .unwrap();
        assert_eq!(attendee.status, AttendeeStatus::Present);
        assert_eq!(attendee.user_id, emp.user_id);

        submit_feedback(&store, &emp, feedback(training.id, None)).await.unwrap();

        let attendees = list_attendees(&store, training.id).await.unwrap();
        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].status, AttendeeStatus::Present);
        assert_eq!(list_feedback(&store, Some(training.id)).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn feedback_for_unknown_training_writes_nothing() {
        let store = MemoryStore::new();
        let emp = as_caller(&seed_user(&store, "emp", Role::Employee).await);

        let err = submit_feedback(&store, &emp, feedback(77, None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(list_feedback(&store, None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn feedback_on_behalf_of_someone_else_needs_a_manager() {
        let store = MemoryStore::new();
        let mgr = as_caller(&seed_user(&store, "mgr", Role::Manager).await);
        let emp = as_caller(&seed_user(&store, "emp", Role::Employee).await);
        let other = seed_user(&store, "other", Role::Employee).await;
        let training = session(&store, &mgr).await;

        let err = submit_feedback(&store, &emp, feedback(training.id, Some(other.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let (fb, _) = submit_feedback(&store, &mgr, feedback(training.id, Some(other.id)))
            .await
            .unwrap();
        assert_eq!(fb.user_id, other.id);
    }

    #[actix_web::test]
    async fn registration_keeps_existing_status_and_reports_unknown_users() {
        let store = MemoryStore::new();
        let mgr = as_caller(&seed_user(&store, "mgr", Role::Manager).await);
        let a = seed_user(&store, "a", Role::Employee).await;
        let b = seed_user(&store, "b", Role::Employee).await;
        let training = session(&store, &mgr).await;

        mark_present(&store, training.id, a.id).await.unwrap();

        let summary = register_attendees(&store, training.id, vec![a.id, 500, b.id]).await.unwrap();
        assert_eq!((summary.successful, summary.failed), (2, 1));
        assert_eq!(summary.errors[0].value, json!(500));
        assert_eq!(summary.results[0].status, AttendeeStatus::Present);
        assert_eq!(summary.results[1].status, AttendeeStatus::Registered);

        assert!(matches!(
            register_attendees(&store, 12345, vec![a.id]).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn assessment_totals_and_validation() {
        let store = MemoryStore::new();
        let mgr = as_caller(&seed_user(&store, "mgr", Role::Manager).await);
        let emp = seed_user(&store, "emp", Role::Employee).await;
        let training = session(&store, &mgr).await;

        let scores = AssessmentScores {
            punctuality: 2,
            participation: 2,
            comprehension: 1,
            practical_application: 2,
            teamwork: 1,
            communication: 1,
            safety_awareness: 2,
            attitude: 0,
        };
        let assessment = create_assessment(
            &store,
            &mgr,
            CreateAssessment { training_id: training.id, user_id: emp.id, scores, comments: None },
        )
        .await
        .unwrap();
        assert_eq!(assessment.total_score, 11);
        assert_eq!(assessment.status, AssessmentResult::Satisfactory);
        assert_eq!(assessment.assessor_id, mgr.user_id);

        let too_high = AssessmentScores { attitude: 3, ..scores };
        let err = create_assessment(
            &store,
            &mgr,
            CreateAssessment {
                training_id: training.id,
                user_id: emp.id,
                scores: too_high,
                comments: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let filter = AssessmentFilter { training_id: Some(training.id), user_id: Some(emp.id) };
        assert_eq!(list_assessments(&store, filter).await.unwrap().len(), 1);
    }
}
