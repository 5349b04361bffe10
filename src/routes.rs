use crate::{
    api::{attendance, leave_request, training, users},
    auth::{handlers, middleware::auth_middleware}, config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login: build_limiter(config.rate_login_per_min),
            register: build_limiter(config.rate_register_per_min),
            refresh: build_limiter(config.rate_refresh_per_min),
            protected: build_limiter(config.rate_protected_per_min),
        }
    }
}

// requests_per_min tokens, refilled evenly over a minute
fn build_limiter(requests_per_min: u32) -> Limiter {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(|| {
            tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
            GovernorConfig::default()
        });
    cfg
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limits: &RateLimits) {
    cfg.service(
        web::scope(api_prefix)
            // Public routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(Governor::new(&limits.login))
                            .route(web::post().to(handlers::login)),
                    )
                    .service(
                        web::resource("/register")
                            .wrap(Governor::new(&limits.register))
                            .route(web::post().to(handlers::register)),
                    )
                    .service(
                        web::resource("/refresh")
                            .wrap(Governor::new(&limits.refresh))
                            .route(web::post().to(handlers::refresh_token)),
                    )
                    .service(
                        web::resource("/logout")
                            .wrap(Governor::new(&limits.login))
                            .route(web::post().to(handlers::logout)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(from_fn(auth_middleware))
                            .wrap(Governor::new(&limits.protected))
                            .route(web::get().to(handlers::me)),
                    ),
            )
            // Protected routes
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware))
                    .wrap(Governor::new(&limits.protected))
                    .service(
                        web::scope("/users")
                            .service(
                                web::resource("")
                                    .route(web::get().to(users::list_users))
                                    .route(web::post().to(users::create_user)),
                            )
                            // before /{id}
                            .service(
                                web::resource("/search")
                                    .route(web::get().to(users::search_users)),
                            )
                            .service(
                                web::resource("/bulk")
                                    .route(web::post().to(users::bulk_create_users)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(users::get_user))
                                    .route(web::put().to(users::update_user))
                                    .route(web::delete().to(users::delete_user)),
                            )
                            .service(
                                web::resource("/{id}/permanent")
                                    .route(web::delete().to(users::purge_user)),
                            ),
                    )
                    .service(
                        web::scope("/attendance")
                            .service(
                                web::resource("")
                                    .route(web::post().to(attendance::record_attendance)),
                            )
                            .service(
                                web::resource("/today")
                                    .route(web::get().to(attendance::today)),
                            )
                            .service(
                                web::resource("/bulk")
                                    .route(web::post().to(attendance::bulk_record)),
                            )
                            .service(
                                web::resource("/check-in")
                                    .route(web::post().to(attendance::check_in)),
                            )
                            .service(
                                web::resource("/check-out")
                                    .route(web::post().to(attendance::check_out)),
                            )
                            .service(
                                web::resource("/user/{user_id}")
                                    .route(web::get().to(attendance::user_attendance)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::put().to(attendance::update_attendance)),
                            ),
                    )
                    .service(
                        web::scope("/leave-requests")
                            .service(
                                web::resource("")
                                    .route(web::get().to(leave_request::leave_list))
                                    .route(web::post().to(leave_request::create_leave)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(leave_request::get_leave)),
                            )
                            .service(
                                web::resource("/{id}/respond")
                                    .route(web::put().to(leave_request::respond_leave)),
                            ),
                    )
                    .service(
                        web::scope("/training-records")
                            .service(
                                web::resource("")
                                    .route(web::get().to(training::list_trainings))
                                    .route(web::post().to(training::create_training)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(training::get_training)),
                            )
                            .service(
                                web::resource("/{id}/attendees")
                                    .route(web::get().to(training::list_attendees))
                                    .route(web::post().to(training::register_attendees)),
                            ),
                    )
                    .service(
                        web::resource("/training-assessments")
                            .route(web::get().to(training::list_assessments))
                            .route(web::post().to(training::create_assessment)),
                    )
                    .service(
                        web::resource("/training-feedback")
                            .route(web::get().to(training::list_feedback))
                            .route(web::post().to(training::submit_feedback)),
                    )
                    .service(
                        web::resource("/training-attendance/mark-present")
                            .route(web::post().to(training::mark_present)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new access/refresh pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::Harness;
    use crate::model::role::Role;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    fn limits() -> RateLimits {
        RateLimits {
            login: build_limiter(10_000),
            register: build_limiter(10_000),
            refresh: build_limiter(10_000),
            protected: build_limiter(10_000),
        }
    }

    macro_rules! app {
        ($h:expr) => {{
            let limits = limits();
            test::init_service(
                App::new()
                    .app_data($h.state.clone())
                    .app_data($h.identity.clone())
                    .configure(|cfg| configure(cfg, "/api", &limits)),
            )
            .await
        }};
    }

    fn req(method: &str, uri: &str, auth: Option<&str>) -> test::TestRequest {
        let mut r = match method {
            "GET" => test::TestRequest::get(),
            "PUT" => test::TestRequest::put(),
            "DELETE" => test::TestRequest::delete(),
            _ => test::TestRequest::post(),
        }
        .uri(uri)
        .peer_addr("127.0.0.1:40000".parse().unwrap());
        if let Some(token) = auth {
            r = r.insert_header(("Authorization", token));
        }
        r
    }

    async fn body(resp: ServiceResponse) -> Value {
        test::read_body_json(resp).await
    }

    #[actix_web::test]
    async fn protected_routes_need_a_bearer_token() {
        let h = Harness::new();
        let app = app!(h);

        let resp = test::call_service(&app, req("GET", "/api/users", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(resp).await["success"], false);

        let resp = test::call_service(
            &app,
            req("GET", "/api/auth/me", Some("Bearer junk")).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn register_login_refresh_logout() {
        let h = Harness::new();
        let app = app!(h);

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/register", None)
                .set_json(json!({
                    "username": "jdoe",
                    "email": "jdoe@example.com",
                    "name": "John Doe",
                    "password": "hunter22"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user = body(resp).await;
        assert_eq!(user["role"], "employee");
        assert!(user.get("passwordHash").is_none());

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/login", None)
                .set_json(json!({"username": "jdoe", "password": "wrong"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/login", None)
                .set_json(json!({"username": "jdoe", "password": "hunter22"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens = body(resp).await;
        let access = format!("Bearer {}", tokens["accessToken"].as_str().unwrap());
        let refresh = format!("Bearer {}", tokens["refreshToken"].as_str().unwrap());

        let resp = test::call_service(&app, req("GET", "/api/auth/me", Some(&access)).to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me = body(resp).await;
        assert_eq!(me["username"], "jdoe");
        assert!(me["lastLoginAt"].is_string());

        // a refresh token is not an access token
        let resp = test::call_service(&app, req("GET", "/api/users", Some(&refresh)).to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/refresh", Some(&refresh)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let rotated = format!("Bearer {}", body(resp).await["refreshToken"].as_str().unwrap());

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/refresh", Some(&refresh)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/logout", Some(&rotated)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = test::call_service(
            &app,
            req("POST", "/api/auth/refresh", Some(&rotated)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(&app, req("POST", "/api/auth/logout", None).to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn leave_request_is_answered_once() {
        let h = Harness::new();
        let app = app!(h);
        let (emp, emp_token) = h.user("emp", Role::Employee).await;
        let (_, mgr_token) = h.user("mgr", Role::Manager).await;

        let resp = test::call_service(
            &app,
            req("POST", "/api/leave-requests", Some(&emp_token))
                .set_json(json!({
                    "userId": emp.id,
                    "startDate": "2025-05-01",
                    "endDate": "2025-05-03",
                    "type": "annual"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let leave = body(resp).await;
        assert_eq!(leave["status"], "pending");
        let uri = format!("/api/leave-requests/{}/respond", leave["id"]);

        let resp = test::call_service(
            &app,
            req("PUT", &uri, Some(&emp_token)).set_json(json!({"status": "approved"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(
            &app,
            req("PUT", &uri, Some(&mgr_token)).set_json(json!({"status": "approved"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let approved = body(resp).await;
        assert_eq!(approved["status"], "approved");
        assert!(approved["responseDate"].is_string());

        let resp = test::call_service(
            &app,
            req("PUT", &uri, Some(&mgr_token)).set_json(json!({"status": "rejected"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = test::call_service(
            &app,
            req("POST", "/api/leave-requests", Some(&emp_token))
                .set_json(json!({
                    "startDate": "2025-05-03",
                    "endDate": "2025-05-01",
                    "type": "sick"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = test::call_service(
            &app,
            req("GET", "/api/leave-requests?perPage=5", Some(&emp_token)).to_request(),
        )
        .await;
        let page = body(resp).await;
        assert_eq!(page["total"], 1);
        assert_eq!(page["perPage"], 5);
    }

    #[actix_web::test]
    async fn bulk_user_import_reports_per_item() {
        let h = Harness::new();
        let app = app!(h);
        let (_, admin) = h.user("admin", Role::Admin).await;
        let (_, emp) = h.user("emp", Role::Employee).await;

        let payload = json!({"users": [
            {"username": "new1", "email": "new1@example.com", "name": "New One"},
            {"username": "emp", "email": "other@example.com", "name": "Dup"},
            {"username": "new2", "email": "new2@example.com", "name": "New Two"}
        ]});

        let resp = test::call_service(
            &app,
            req("POST", "/api/users/bulk", Some(&emp)).set_json(&payload).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(
            &app,
            req("POST", "/api/users/bulk", Some(&admin)).set_json(&payload).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body(resp).await;
        assert_eq!(summary["success"], true);
        assert_eq!(summary["processed"], 3);
        assert_eq!(summary["successful"], 2);
        assert_eq!(summary["failed"], 1);
        assert_eq!(summary["results"][1]["username"], "new2");
        assert_eq!(
            summary["errors"][0],
            json!({"username": "emp", "error": "Username already taken"})
        );

        let resp = test::call_service(
            &app,
            req("GET", "/api/users/search?q=new", Some(&emp)).to_request(),
        )
        .await;
        assert_eq!(body(resp).await.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn attendance_resubmission_updates_one_row() {
        let h = Harness::new();
        let app = app!(h);
        let (emp, emp_token) = h.user("emp", Role::Employee).await;
        let (_, mgr) = h.user("mgr", Role::Manager).await;
        let (_, admin) = h.user("root", Role::Admin).await;

        for status in ["present", "late"] {
            let resp = test::call_service(
                &app,
                req("POST", "/api/attendance", Some(&mgr))
                    .set_json(json!({"userId": emp.id, "date": "2025-05-01", "status": status}))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let uri = format!("/api/attendance/user/{}?date=2025-05-01", emp.id);
        let resp = test::call_service(&app, req("GET", &uri, Some(&emp_token)).to_request()).await;
        let rows = body(resp).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["status"], "late");

        let records = json!({"records": [
            {"userId": emp.id, "date": "2025-05-02", "status": "present"},
            {"userId": 9999, "date": "2025-05-02", "status": "present"}
        ]});
        let resp = test::call_service(
            &app,
            req("POST", "/api/attendance/bulk", Some(&mgr)).set_json(&records).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test::call_service(
            &app,
            req("POST", "/api/attendance/bulk", Some(&admin)).set_json(&records).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body(resp).await;
        assert_eq!(summary["successful"], 1);
        assert_eq!(summary["errors"][0]["userId"], 9999);

        let resp = test::call_service(
            &app,
            req("POST", "/api/attendance/check-out", Some(&emp_token))
                .set_json(json!({}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn feedback_marks_submitter_present() {
        let h = Harness::new();
        let app = app!(h);
        let (_, emp) = h.user("emp", Role::Employee).await;
        let (_, mgr) = h.user("mgr", Role::Manager).await;

        let resp = test::call_service(
            &app,
            req("POST", "/api/training-records", Some(&mgr))
                .set_json(json!({"title": "First aid", "trainingDate": "2025-06-01"}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let training_id = body(resp).await["id"].clone();

        let feedback = json!({
            "trainingId": training_id,
            "objectivesMet": true,
            "contentRelevant": true,
            "trainerEffective": false,
            "materialsUseful": true,
            "wouldRecommend": true
        });
        for _ in 0..2 {
            let resp = test::call_service(
                &app,
                req("POST", "/api/training-feedback", Some(&emp)).set_json(&feedback).to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let uri = format!("/api/training-records/{training_id}/attendees");
        let resp = test::call_service(&app, req("GET", &uri, Some(&mgr)).to_request()).await;
        let attendees = body(resp).await;
        assert_eq!(attendees.as_array().unwrap().len(), 1);
        assert_eq!(attendees[0]["status"], "present");
    }
}
