use crate::api::attendance::{BulkAttendance, CheckInRequest, CheckOutRequest};
use crate::api::leave_request::LeaveListResponse;
use crate::api::training::FeedbackReceipt;
use crate::api::users::BulkCreateUsers;
use crate::model::attendance::{
    Attendance, AttendanceStatus, CheckMethod, RecordAttendance, UpdateAttendance,
};
use crate::model::leave_request::{
    LeaveDecision, LeaveRequest, LeaveStatus, LeaveType, RespondLeave, SubmitLeave,
};
use crate::model::role::Role;
use crate::model::training::{
    AssessmentResult, AssessmentScores, AttendeeStatus, CreateAssessment, CreateTraining,
    FeedbackAnswers, MarkPresent, RegisterAttendees, SubmitFeedback, TrainingAssessment,
    TrainingAttendee, TrainingFeedback, TrainingRecord,
};
use crate::model::user::{CreateUser, UpdateUser, User};
use crate::models::{LoginReqDto, LoginResponse, RegisterReq, TokenResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

### 🔹 Key Features
- **Users**: create, import in bulk, search, update, deactivate or permanently delete
- **Attendance**: QR/biometric/manual check-in and check-out, one row per user per day
- **Leave**: submit requests, approve or reject once
- **Training**: sessions, attendees, scored assessments and feedback

### 🔐 Security
Every endpoint except register/login/refresh/logout requires a **JWT Bearer** access token.
Admin and manager roles unlock operations on other people's records.

### 📦 Response Format
- camelCase JSON
- Errors: `{"success": false, "message": "..."}`
- Bulk endpoints always answer 200 with a per-item breakdown
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::users::list_users,
        crate::api::users::search_users,
        crate::api::users::get_user,
        crate::api::users::create_user,
        crate::api::users::bulk_create_users,
        crate::api::users::update_user,
        crate::api::users::delete_user,
        crate::api::users::purge_user,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::record_attendance,
        crate::api::attendance::bulk_record,
        crate::api::attendance::update_attendance,
        crate::api::attendance::today,
        crate::api::attendance::user_attendance,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::respond_leave,

        crate::api::training::list_trainings,
        crate::api::training::create_training,
        crate::api::training::get_training,
        crate::api::training::list_attendees,
        crate::api::training::register_attendees,
        crate::api::training::mark_present,
        crate::api::training::create_assessment,
        crate::api::training::list_assessments,
        crate::api::training::submit_feedback,
        crate::api::training::list_feedback
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            TokenResponse,
            Role,
            User,
            CreateUser,
            UpdateUser,
            BulkCreateUsers,
            Attendance,
            AttendanceStatus,
            CheckMethod,
            RecordAttendance,
            UpdateAttendance,
            BulkAttendance,
            CheckInRequest,
            CheckOutRequest,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            LeaveDecision,
            SubmitLeave,
            RespondLeave,
            LeaveListResponse,
            TrainingRecord,
            CreateTraining,
            TrainingAttendee,
            AttendeeStatus,
            RegisterAttendees,
            MarkPresent,
            AssessmentScores,
            AssessmentResult,
            TrainingAssessment,
            CreateAssessment,
            FeedbackAnswers,
            TrainingFeedback,
            SubmitFeedback,
            FeedbackReceipt
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Users", description = "User management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Training", description = "Training records, assessments and feedback"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/leave-requests/{id}/respond"));
        assert!(doc.paths.paths.contains_key("/api/users/bulk"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
