use crate::api::BulkResponse;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::training::{
    AssessmentFilter, CreateAssessment, CreateTraining, MarkPresent, RegisterAttendees,
    SubmitFeedback, TrainingAssessment, TrainingAttendee, TrainingFeedback, TrainingRecord,
};
use crate::service::training;
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentQuery {
    pub training_id: Option<u64>,
    /// Employees always see only their own assessments
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    pub training_id: Option<u64>,
}

/// The stored feedback plus the attendee row it marked present.
#[derive(Serialize, ToSchema)]
pub struct FeedbackReceipt {
    pub feedback: TrainingFeedback,
    pub attendee: TrainingAttendee,
}

/* =========================
Training records
========================= */
#[utoipa::path(
    get,
    path = "/api/training-records",
    responses(
        (status = 200, description = "Training sessions, latest first", body = [TrainingRecord])
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn list_trainings(
    _auth: AuthUser,
    state: web::Data<AppState>,
) -> AppResult<impl Responder> {
    Ok(HttpResponse::Ok().json(training::list(state.store()).await?))
}

#[utoipa::path(
    post,
    path = "/api/training-records",
    request_body = CreateTraining,
    responses(
        (status = 201, description = "Training session created", body = TrainingRecord),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn create_training(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateTraining>,
) -> AppResult<impl Responder> {
    let record = training::create(state.store(), &auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(record))
}

#[utoipa::path(
    get,
    path = "/api/training-records/{id}",
    params(("id" = u64, Path, description = "Training record id")),
    responses(
        (status = 200, description = "Training session", body = TrainingRecord),
        (status = 404, description = "Training record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn get_training(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    Ok(HttpResponse::Ok().json(training::get(state.store(), path.into_inner()).await?))
}

/* =========================
Attendees
========================= */
#[utoipa::path(
    get,
    path = "/api/training-records/{id}/attendees",
    params(("id" = u64, Path, description = "Training record id")),
    responses(
        (status = 200, description = "Attendees", body = [TrainingAttendee]),
        (status = 404, description = "Training record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn list_attendees(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    Ok(HttpResponse::Ok().json(training::list_attendees(state.store(), path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/training-records/{id}/attendees",
    params(("id" = u64, Path, description = "Training record id")),
    request_body = RegisterAttendees,
    responses(
        (status = 200, description = "Per-user outcome", body = Object, example = json!({
            "success": true,
            "processed": 2,
            "successful": 1,
            "failed": 1,
            "results": [{"id": 4, "trainingId": 1, "userId": 5, "status": "registered"}],
            "errors": [{"userId": 99, "error": "User 99 not found"}]
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Training record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn register_attendees(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RegisterAttendees>,
) -> AppResult<impl Responder> {
    auth.require_manager_or_admin()?;
    let summary = training::register_attendees(
        state.store(),
        path.into_inner(),
        payload.into_inner().user_ids,
    )
    .await?;
    Ok(HttpResponse::Ok().json(BulkResponse::from(summary)))
}

#[utoipa::path(
    post,
    path = "/api/training-attendance/mark-present",
    request_body = MarkPresent,
    responses(
        (status = 200, description = "Attendee marked present", body = TrainingAttendee),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Training record or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn mark_present(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<MarkPresent>,
) -> AppResult<impl Responder> {
    auth.require_manager_or_admin()?;
    let attendee = training::mark_present(state.store(), payload.training_id, payload.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(attendee))
}

/* =========================
Assessments
========================= */
#[utoipa::path(
    post,
    path = "/api/training-assessments",
    request_body = CreateAssessment,
    responses(
        (status = 201, description = "Assessment stored with computed total and status",
         body = TrainingAssessment),
        (status = 400, description = "A score is outside 0..=2"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Training record or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn create_assessment(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateAssessment>,
) -> AppResult<impl Responder> {
    let assessment = training::create_assessment(state.store(), &auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(assessment))
}

#[utoipa::path(
    get,
    path = "/api/training-assessments",
    params(AssessmentQuery),
    responses((status = 200, description = "Assessments", body = [TrainingAssessment])),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn list_assessments(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AssessmentQuery>,
) -> AppResult<impl Responder> {
    let user_id = if auth.is_employee() { Some(auth.user_id) } else { query.user_id };
    let filter = AssessmentFilter {
        training_id: query.training_id,
        user_id,
    };
    Ok(HttpResponse::Ok().json(training::list_assessments(state.store(), filter).await?))
}

/* =========================
Feedback
========================= */
#[utoipa::path(
    post,
    path = "/api/training-feedback",
    request_body = SubmitFeedback,
    responses(
        (status = 201, description = "Feedback stored and attendee marked present",
         body = FeedbackReceipt),
        (status = 403, description = "Submitting for someone else"),
        (status = 404, description = "Training record or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn submit_feedback(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<SubmitFeedback>,
) -> AppResult<impl Responder> {
    let (feedback, attendee) = training::submit_feedback(state.store(), &auth, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(FeedbackReceipt { feedback, attendee }))
}

#[utoipa::path(
    get,
    path = "/api/training-feedback",
    params(FeedbackQuery),
    responses(
        (status = 200, description = "Feedback entries", body = [TrainingFeedback]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Training"
)]
pub async fn list_feedback(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<FeedbackQuery>,
) -> AppResult<impl Responder> {
    auth.require_manager_or_admin()?;
    Ok(HttpResponse::Ok().json(training::list_feedback(state.store(), query.training_id).await?))
}
