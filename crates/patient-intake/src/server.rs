//! HTTP front end.
//!
//! Serves the patient details form, accepts submissions, and exposes the
//! password check and the rule registry as JSON endpoints. Blocking work
//! (Argon2 and `SQLite`) runs on the tokio blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::form::{render_form, FormValues, FormView};
use crate::intake::{IntakeService, RegistrationOutcome};
use crate::password::{Rule, RuleState, ValidationOutcome};
use crate::patient::PatientSubmission;
use crate::storage::RuleFilter;

/// State shared by every handler.
pub type SharedState = Arc<IntakeService>;

const FORM_ACTION: &str = "/details";
const DEFAULT_RULE_LIMIT: usize = 100;
const UNREADABLE_FORM: &str = "The form could not be read, please check the fields and try again";

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_details))
        .route("/details", post(submit_details))
        .route("/password/validate", post(validate_password))
        .route("/rules", get(list_rules).post(create_rule).put(update_rule))
        .route("/rules/:rule_id", get(get_rule))
        .route("/health", get(health))
        .with_state(state)
}

/// Open the configured database and serve until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails.
pub async fn serve(config: &Config) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|e| Error::ConfigValidation {
            message: format!("invalid bind_address {}: {e}", config.server.bind_address),
        })?;

    let service = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || IntakeService::from_config(&config))
            .await
            .map_err(|e| Error::internal(format!("startup task failed: {e}")))??
    };

    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Patient intake listening");

    axum::serve(listener, router(Arc::new(service)).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Run blocking service work on the blocking pool.
async fn run_blocking<T, F>(state: &SharedState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&IntakeService) -> Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}

/// Plain-text error response for the JSON endpoints.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRule { message } => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            Error::DuplicatePatient { .. } => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
            other => {
                error!(error = %other, "Request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health() -> &'static str {
    "ok"
}

async fn show_form() -> Html<String> {
    Html(render_form(&FormView {
        action: FORM_ACTION,
        ..FormView::default()
    }))
}

fn form_page(
    status: StatusCode,
    errors: &[String],
    notice: Option<&str>,
    values: FormValues,
) -> Response {
    let html = render_form(&FormView {
        action: FORM_ACTION,
        errors,
        notice,
        values,
        ..FormView::default()
    });
    (status, Html(html)).into_response()
}

async fn submit_details(
    State(state): State<SharedState>,
    form: std::result::Result<Form<PatientSubmission>, FormRejection>,
) -> Response {
    let submission = match form {
        Ok(Form(submission)) => submission,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable form submission");
            let errors = [UNREADABLE_FORM.to_string()];
            return form_page(rejection.status(), &errors, None, FormValues::default());
        }
    };
    let sticky = FormValues::from(&submission);
    let result = run_blocking(&state, move |intake| intake.register(&submission)).await;

    match result {
        Ok(RegistrationOutcome::Registered(record)) => {
            let notice = format!("Patient {} registered", record.patient_id);
            form_page(StatusCode::CREATED, &[], Some(&notice), FormValues::default())
        }
        Ok(RegistrationOutcome::Rejected(errors)) => {
            form_page(StatusCode::UNPROCESSABLE_ENTITY, &errors, None, sticky)
        }
        Err(Error::DuplicatePatient { patient_id }) => {
            let errors = [format!("PATIENT ID {patient_id} is already registered")];
            form_page(StatusCode::CONFLICT, &errors, None, sticky)
        }
        Err(e) => {
            error!(error = %e, "Registration failed");
            let errors = ["Registration failed, please try again later".to_string()];
            form_page(StatusCode::INTERNAL_SERVER_ERROR, &errors, None, sticky)
        }
    }
}

/// Body of `POST /password/validate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordCheckRequest {
    password: String,
    #[serde(default)]
    patient_id: Option<String>,
}

async fn validate_password(
    State(state): State<SharedState>,
    Json(request): Json<PasswordCheckRequest>,
) -> ApiResult<Json<ValidationOutcome>> {
    let outcome = run_blocking(&state, move |intake| {
        intake.check_password(&request.password, request.patient_id.as_deref())
    })
    .await?;
    Ok(Json(outcome))
}

/// Query string of `GET /rules`.
#[derive(Debug, Deserialize)]
struct RulesQuery {
    state: Option<RuleState>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// Response of `GET /rules`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleCollection {
    rules: Vec<Rule>,
    total_records: i64,
}

async fn list_rules(
    State(state): State<SharedState>,
    Query(query): Query<RulesQuery>,
) -> ApiResult<Json<RuleCollection>> {
    let filter = RuleFilter {
        state: query.state,
        limit: query.limit.unwrap_or(DEFAULT_RULE_LIMIT),
        offset: query.offset.unwrap_or(0),
    };
    let collection = run_blocking(&state, move |intake| {
        intake.with_storage(|storage| {
            Ok(RuleCollection {
                rules: storage.list_rules(&filter)?,
                total_records: storage.count_rules(filter.state)?,
            })
        })
    })
    .await?;
    Ok(Json(collection))
}

async fn create_rule(
    State(state): State<SharedState>,
    Json(rule): Json<Rule>,
) -> ApiResult<(StatusCode, Json<Rule>)> {
    let created = run_blocking(&state, move |intake| {
        intake.with_storage(|storage| storage.create_rule(&rule))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_rule(
    State(state): State<SharedState>,
    Json(rule): Json<Rule>,
) -> ApiResult<Json<Rule>> {
    let rule_id = rule.rule_id.clone().unwrap_or_default();
    let updated = run_blocking(&state, move |intake| {
        intake.with_storage(|storage| storage.update_rule(&rule))
    })
    .await?;
    updated
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Rule {rule_id} not found")))
}

async fn get_rule(
    State(state): State<SharedState>,
    Path(rule_id): Path<String>,
) -> ApiResult<Json<Rule>> {
    let lookup_id = rule_id.clone();
    let rule = run_blocking(&state, move |intake| {
        intake.with_storage(|storage| storage.get_rule(&lookup_id))
    })
    .await?;
    rule.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Rule {rule_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::Params;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::password::PasswordHasher;
    use crate::patient::IntakeLimits;
    use crate::storage::Storage;

    fn test_state() -> SharedState {
        Arc::new(IntakeService::new(
            Storage::open_in_memory().unwrap(),
            PasswordHasher::new(Params::new(8, 1, 1, None).unwrap()),
            IntakeLimits::default(),
            true,
        ))
    }

    async fn send(state: &SharedState, request: Request<Body>) -> (StatusCode, String) {
        let response = router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn form_post(path: &str, body: &str) -> Request<Body> {
        Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_request(method: &str, path: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const VALID_FORM: &str = "patient_id=P-1001&patient_name=Meera+Sekar&password=Tr1ck-Pony\
                              &password_confirmation=Tr1ck-Pony&age=42&blood_group=AB+Negative\
                              &gender=female&address=12+Gandhi+Road";

    fn patient_count(state: &SharedState) -> i64 {
        state.with_storage(Storage::count_patients).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let (status, body) = send(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_get_form() {
        let state = test_state();
        let (status, body) = send(&state, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("PATIENT DETAILS"));
        assert!(body.contains("action=\"/details\""));
    }

    #[tokio::test]
    async fn test_submit_registers_patient() {
        let state = test_state();
        let (status, body) = send(&state, form_post("/details", VALID_FORM)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body.contains("Patient P-1001 registered"));
        assert_eq!(patient_count(&state), 1);
    }

    #[tokio::test]
    async fn test_submit_with_legacy_field_names() {
        let state = test_state();
        let body = "PATIENT_ID=P-2002&PATIENT_NAME=Sekar&PASSWORD=Tr1ck-Pony&psw_repeat=Tr1ck-Pony\
                    &AGE=30&BLOOD_GROUP=O+Positive&GENDER=male&ADDRESS=Madurai";
        let (status, _) = send(&state, form_post("/", body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(state
            .with_storage(|s| s.patient_exists("P-2002"))
            .unwrap());
    }

    #[tokio::test]
    async fn test_conflicting_field_names_rerender_form() {
        let state = test_state();
        let body = format!("{VALID_FORM}&PATIENT_ID=P-9009");
        let (status, html) = send(&state, form_post("/details", &body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(html.contains("PATIENT DETAILS"));
        assert!(html.contains(UNREADABLE_FORM));
        assert_eq!(patient_count(&state), 0);
    }

    #[tokio::test]
    async fn test_mismatched_passwords_rejected() {
        let state = test_state();
        let body = VALID_FORM.replace("password_confirmation=Tr1ck-Pony", "password_confirmation=other");
        let (status, html) = send(&state, form_post("/details", &body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(html.contains("Passwords do not match"));
        assert!(html.contains("value=\"P-1001\""));
        assert!(!html.contains("Tr1ck-Pony"));
        assert_eq!(patient_count(&state), 0);
    }

    #[tokio::test]
    async fn test_rejected_input_is_escaped() {
        let state = test_state();
        let (status, html) = send(
            &state,
            form_post("/details", "patient_name=%3Cscript%3Ealert(1)%3C%2Fscript%3E"),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_duplicate_submission_conflicts() {
        let state = test_state();
        send(&state, form_post("/details", VALID_FORM)).await;
        let (status, html) = send(&state, form_post("/details", VALID_FORM)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert!(html.contains("already registered"));
        assert_eq!(patient_count(&state), 1);
    }

    #[tokio::test]
    async fn test_validate_password_endpoint() {
        let state = test_state();
        let request = json_request(
            "POST",
            "/password/validate",
            &serde_json::json!({ "password": "P-1001aaa", "patientId": "P-1001" }),
        );
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);

        let outcome: ValidationOutcome = serde_json::from_str(&body).unwrap();
        assert!(!outcome.is_valid());
        assert!(outcome
            .messages
            .contains(&"password.usernameDuplicate.invalid".to_string()));
    }

    #[tokio::test]
    async fn test_list_rules() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Request::get("/rules?state=Enabled&limit=2&offset=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let collection: RuleCollection = serde_json::from_str(&body).unwrap();
        assert_eq!(collection.total_records, 8);
        let names: Vec<_> = collection.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alphabetical_letters", "numeric_symbol"]);
    }

    #[tokio::test]
    async fn test_create_get_and_update_rule() {
        let state = test_state();
        let new_rule = serde_json::json!({
            "name": "no_clinic",
            "type": "RegExp",
            "validationType": "Strong",
            "state": "Enabled",
            "expression": "^[^#]*$",
            "description": "Must not contain a hash sign",
            "orderNo": 8,
            "errMessageId": "password.hash.invalid"
        });
        let (status, body) = send(&state, json_request("POST", "/rules", &new_rule)).await;
        assert_eq!(status, StatusCode::CREATED);
        let mut created: Rule = serde_json::from_str(&body).unwrap();
        let rule_id = created.rule_id.clone().unwrap();

        let (status, body) = send(
            &state,
            Request::get(format!("/rules/{rule_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Rule>(&body).unwrap(), created);

        created.state = RuleState::Disabled;
        let (status, body) = send(
            &state,
            json_request("PUT", "/rules", &serde_json::to_value(&created).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Rule>(&body).unwrap().state, RuleState::Disabled);
    }

    #[tokio::test]
    async fn test_invalid_rule_is_bad_request() {
        let state = test_state();
        let rule = serde_json::json!({
            "name": "soft_regexp",
            "type": "RegExp",
            "validationType": "Soft",
            "expression": ".*",
            "orderNo": 1,
            "errMessageId": "x"
        });
        let (status, body) = send(&state, json_request("POST", "/rules", &rule)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "In case of RegExp rule Validation Type can only be Strong");
    }

    #[tokio::test]
    async fn test_missing_rule_not_found() {
        let state = test_state();
        let (status, _) = send(
            &state,
            Request::get("/rules/missing").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let rule = serde_json::json!({
            "ruleId": "missing",
            "name": "x",
            "type": "Programmatic",
            "validationType": "Soft",
            "implementationReference": "digit",
            "orderNo": 1,
            "errMessageId": "x"
        });
        let (status, _) = send(&state, json_request("PUT", "/rules", &rule)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
