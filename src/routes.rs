use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{
            AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
        HeaderValue, Method,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    admin::{dto as admin_dto, handlers as admin_handlers},
    auth::{
        auth_dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            RefreshResponse, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
            ValidateResetTokenRequest, ValidateResetTokenResponse,
        },
        auth_handlers, password_reset_handlers,
    },
    config::Config,
    error::AppError,
    handlers::health,
    middleware::{
        admin_middleware, auth_middleware, global_rate_limit, login_rate_limit,
        register_rate_limit, request_context_middleware,
    },
    response::{ApiErrorBody, FieldError, MessageResponse, ResponseMeta},
    settings::{SettingResponse, SettingType},
    state::AppState,
    storage::FileInfo,
    upload::{
        upload_handlers,
        upload_service::{MAX_FILES_PER_REQUEST, MAX_FILE_SIZE},
    },
    user::{Role, UserResponse},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::auth::auth_handlers::register,
        crate::auth::auth_handlers::login,
        crate::auth::auth_handlers::refresh,
        crate::auth::auth_handlers::logout,
        crate::auth::auth_handlers::me,
        crate::auth::auth_handlers::update_profile,
        crate::auth::auth_handlers::change_password,
        crate::auth::password_reset_handlers::forgot_password,
        crate::auth::password_reset_handlers::validate_reset_token,
        crate::auth::password_reset_handlers::reset_password,
        crate::upload::upload_handlers::upload_single,
        crate::upload::upload_handlers::upload_multiple,
        crate::upload::upload_handlers::delete_upload,
        crate::admin::handlers::get_dashboard,
        crate::admin::handlers::list_users,
        crate::admin::handlers::get_user,
        crate::admin::handlers::create_user,
        crate::admin::handlers::update_user,
        crate::admin::handlers::delete_user,
        crate::admin::handlers::list_settings,
        crate::admin::handlers::get_setting,
        crate::admin::handlers::update_setting,
        crate::admin::handlers::update_settings,
        crate::admin::handlers::list_files,
        crate::admin::handlers::delete_file,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            RefreshResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            ForgotPasswordRequest,
            ValidateResetTokenRequest,
            ValidateResetTokenResponse,
            ResetPasswordRequest,
            UserResponse,
            Role,
            MessageResponse,
            ApiErrorBody,
            FieldError,
            ResponseMeta,
            FileInfo,
            upload_handlers::UploadResponse,
            upload_handlers::UploadedFile,
            upload_handlers::FailedUpload,
            upload_handlers::MultiUploadResponse,
            admin_dto::CreateUserRequest,
            admin_dto::UpdateUserRequest,
            admin_dto::DashboardStats,
            admin_dto::RecentUser,
            admin_dto::UpdateSettingRequest,
            admin_dto::BatchUpdateSettingsRequest,
            admin_dto::SettingUpdate,
            admin_dto::FileEntry,
            admin_dto::FileListing,
            SettingResponse,
            SettingType,
            health::HealthResponse,
            health::ReadyResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "auth", description = "Authentication and account endpoints"),
        (name = "upload", description = "File upload endpoints"),
        (name = "admin", description = "Admin dashboard, users, settings and files")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

async fn not_found() -> AppError {
    AppError::NotFound("Resource not found".to_string())
}

/// Turns a handler panic into the usual 500 envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());
    tracing::error!(%detail, "Request handler panicked");
    AppError::Internal(format!("Handler panicked: {detail}")).into_response()
}

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Public routes (no auth required)
    let auth_routes = Router::new()
        .route(
            "/register",
            post(auth_handlers::register).route_layer(middleware::from_fn_with_state(
                state.clone(),
                register_rate_limit,
            )),
        )
        .route(
            "/login",
            post(auth_handlers::login).route_layer(middleware::from_fn_with_state(
                state.clone(),
                login_rate_limit,
            )),
        )
        .route("/refresh", post(auth_handlers::refresh))
        .route("/logout", post(auth_handlers::logout))
        .route("/forgot-password", post(password_reset_handlers::forgot_password))
        .route(
            "/validate-reset-token",
            post(password_reset_handlers::validate_reset_token),
        )
        .route("/reset-password", post(password_reset_handlers::reset_password));

    // Protected routes (auth required)
    let account_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .route("/profile", put(auth_handlers::update_profile))
        .route("/change-password", put(auth_handlers::change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let upload_routes = Router::new()
        .route("/", post(upload_handlers::upload_single))
        .route("/multiple", post(upload_handlers::upload_multiple))
        .route("/*key", delete(upload_handlers::delete_upload))
        .layer(DefaultBodyLimit::max(
            MAX_FILE_SIZE * MAX_FILES_PER_REQUEST + 1024 * 1024,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Admin routes
    let admin_routes = Router::new()
        .route("/dashboard", get(admin_handlers::get_dashboard))
        .route(
            "/users",
            get(admin_handlers::list_users).post(admin_handlers::create_user),
        )
        .route(
            "/users/:id",
            get(admin_handlers::get_user)
                .put(admin_handlers::update_user)
                .delete(admin_handlers::delete_user),
        )
        .route(
            "/settings",
            get(admin_handlers::list_settings).put(admin_handlers::update_settings),
        )
        .route(
            "/settings/:key",
            get(admin_handlers::get_setting).put(admin_handlers::update_setting),
        )
        .route("/files", get(admin_handlers::list_files))
        .route("/files/*path", delete(admin_handlers::delete_file))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes.merge(account_routes))
        .nest("/upload", upload_routes)
        .nest("/admin", admin_routes);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api", api_routes)
        .fallback(not_found);

    if config.s3.is_none() {
        let mount = if config.upload_base_url.starts_with('/') && config.upload_base_url.len() > 1
        {
            config.upload_base_url.trim_end_matches('/').to_string()
        } else {
            "/uploads".to_string()
        };
        router = router.nest_service(&mount, ServeDir::new(&config.upload_dir));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(cors_layer(&config))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_context_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::hash_password,
        config::Config,
        db::test_pool,
        email::MockSender,
        storage::LocalStorage,
        user::{NewUser, UserRepository},
    };

    struct TestApp {
        router: Router,
        state: AppState,
        _uploads: tempfile::TempDir,
    }

    async fn test_app() -> TestApp {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests();
        config.upload_dir = uploads.path().to_string_lossy().into_owned();

        let storage = LocalStorage::new(&config.upload_dir, &config.upload_base_url)
            .await
            .unwrap();
        let state = AppState::new(
            test_pool().await,
            Arc::new(config),
            Arc::new(storage),
            Arc::new(MockSender::default()),
        );
        state.settings_service.seed_defaults().await.unwrap();

        TestApp {
            router: create_router(state.clone()),
            state,
            _uploads: uploads,
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_cookie(method: Method, uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn with_bearer(method: Method, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// `name=value` part of the response's `Set-Cookie` header.
    fn cookie_pair(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    async fn login_token(app: &TestApp, email: &str, password: &str) -> String {
        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "email": email, "password": password }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn register_login_refresh_logout_flow() {
        let app = test_app().await;

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "email": "a@x.com", "password": "password123", "name": "Ann" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["email"], "a@x.com");
        assert_eq!(body["data"]["expiresIn"], 900);
        assert!(body["meta"]["requestId"].is_string());

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "email": "a@x.com", "password": "wrong-password" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_CREDENTIALS");

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "email": "a@x.com", "password": "password123" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = cookie_pair(&response);
        let access_token = body_json(response).await["data"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .send(with_bearer(Method::GET, "/api/auth/me", &access_token))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["name"], "Ann");

        let response = app
            .send(with_cookie(Method::POST, "/api/auth/refresh", &cookie))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["data"]["accessToken"].is_string());

        let response = app
            .send(with_cookie(Method::POST, "/api/auth/logout", &cookie))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cookie_pair(&response), "refresh_token=");
        assert_eq!(
            body_json(response).await["data"]["message"],
            "Logged out successfully"
        );

        let response = app
            .send(with_cookie(Method::POST, "/api/auth/refresh", &cookie))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(cookie_pair(&response), "refresh_token=");
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_REFRESH_TOKEN");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app().await;
        let payload = json!({ "email": "a@x.com", "password": "password123" });

        let first = app
            .send(json_request(Method::POST, "/api/auth/register", payload.clone()))
            .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .send(json_request(Method::POST, "/api/auth/register", payload))
            .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["error"]["code"], "USER_EXISTS");
    }

    #[tokio::test]
    async fn validation_errors_carry_field_details() {
        let app = test_app().await;

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "email": "not-an-email", "password": "short" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        let fields: Vec<_> = body["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["email", "password"]);

        let response = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_rejected() {
        let app = test_app().await;
        let response = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "NO_REFRESH_TOKEN");
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let app = test_app().await;

        let response = app
            .send(
                Request::builder()
                    .uri("/api/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");

        let response = app
            .send(with_bearer(Method::GET, "/api/auth/me", "garbage"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_require_admin_role() {
        let app = test_app().await;
        let users = UserRepository::new(app.state.db.clone());
        users
            .create(&NewUser::new(
                "user@x.com".into(),
                hash_password("password123").unwrap(),
                None,
                Role::User,
            ))
            .await
            .unwrap();
        users
            .create(&NewUser::new(
                "admin@x.com".into(),
                hash_password("password123").unwrap(),
                None,
                Role::Admin,
            ))
            .await
            .unwrap();

        let user_token = login_token(&app, "user@x.com", "password123").await;
        let response = app
            .send(with_bearer(Method::GET, "/api/admin/dashboard", &user_token))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");

        let admin_token = login_token(&app, "admin@x.com", "password123").await;
        let response = app
            .send(with_bearer(Method::GET, "/api/admin/dashboard", &admin_token))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["totalUsers"], 2);
        assert_eq!(body["data"]["adminUsers"], 1);

        let response = app
            .send(with_bearer(
                Method::GET,
                "/api/admin/users?search=user&pageSize=5",
                &admin_token,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["pageSize"], 5);
        assert_eq!(body["data"]["items"][0]["email"], "user@x.com");
    }

    #[tokio::test]
    async fn registration_can_be_disabled() {
        let app = test_app().await;
        app.state
            .settings_service
            .update("allow_registration", "false")
            .await
            .unwrap();

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "email": "a@x.com", "password": "password123" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_is_rate_limited() {
        let app = test_app().await;
        let payload = json!({ "email": "nobody@x.com", "password": "whatever1" });

        for _ in 0..5 {
            let response = app
                .send(json_request(Method::POST, "/api/auth/login", payload.clone()))
                .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .send(json_request(Method::POST, "/api/auth/login", payload))
            .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(body_json(response).await["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn health_probes_and_security_headers() {
        let app = test_app().await;

        let response = app
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[X_FRAME_OPTIONS], "DENY");

        let response = app
            .send(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["database"], "connected");
    }

    #[tokio::test]
    async fn over_long_password_is_rejected_before_hashing() {
        let app = test_app().await;

        let response = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                json!({ "email": "long@x.com", "password": "a".repeat(80) }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "password");
        assert_eq!(
            body["error"]["details"][0]["message"],
            "password must be at most 72 bytes"
        );
    }

    #[tokio::test]
    async fn unknown_routes_get_the_envelope() {
        let app = test_app().await;

        for uri in ["/api/does-not-exist", "/nowhere"] {
            let response = app
                .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert!(response.headers().contains_key("x-request-id"));
            let body = body_json(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"]["code"], "NOT_FOUND");
            assert_eq!(body["error"]["message"], "Resource not found");
            assert!(body["meta"]["requestId"].is_string());
        }
    }

    async fn explode() -> &'static str {
        panic!("handler blew up")
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let router = Router::new()
            .route("/boom", get(explode))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = router
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn responses_are_gzipped_on_request() {
        let app = test_app().await;

        let response = app
            .send(
                Request::builder()
                    .uri("/health")
                    .header(header::ACCEPT_ENCODING, "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }

    #[tokio::test]
    async fn admin_batch_settings_and_extreme_paging() {
        let app = test_app().await;
        UserRepository::new(app.state.db.clone())
            .create(&NewUser::new(
                "admin@x.com".into(),
                hash_password("password123").unwrap(),
                None,
                Role::Admin,
            ))
            .await
            .unwrap();
        let token = login_token(&app, "admin@x.com", "password123").await;

        let batch = |body: Value| {
            Request::builder()
                .method(Method::PUT)
                .uri("/api/admin/settings")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let response = app.send(batch(json!({ "settings": [] }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "settings");

        let response = app
            .send(batch(json!({ "settings": [
                { "key": "app_name", "value": "Renamed" },
                { "key": "max_login_attempts", "value": "9" }
            ] })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let app_name = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["key"] == "app_name")
            .unwrap()
            .clone();
        assert_eq!(app_name["value"], "Renamed");

        let response = app
            .send(with_bearer(
                Method::GET,
                "/api/admin/users?page=4294967295&pageSize=100",
                &token,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    }
}
