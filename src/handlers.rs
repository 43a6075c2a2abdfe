use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::catalog::{NewUnit, Upload};
use crate::contact::ContactInput;
use crate::error::{PortalError, Warning};
use crate::registry::Registration;
use crate::state::AppState;
use crate::storage::Scope;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "message": message.into() })),
    )
        .into_response()
}

fn not_authorized() -> Response {
    // One uniform response: never logged in and expired look the same
    fail(StatusCode::FORBIDDEN, "Not authorized")
}

fn log_warnings(operation: &str, warnings: &[Warning]) {
    for warning in warnings {
        warn!(?warning, "{} completed with a non-fatal warning", operation);
    }
}

/// Maps a service error onto the original API shape: domain outcomes stay
/// 200 with `success: false`, validation is 400, backing-store failures 500.
fn service_failure(e: PortalError) -> Response {
    match e {
        PortalError::NotFound(_) | PortalError::AlreadyExists(_) => {
            fail(StatusCode::OK, e.to_string())
        }
        PortalError::MissingField(_) | PortalError::InvalidNumber => {
            fail(StatusCode::BAD_REQUEST, e.to_string())
        }
        PortalError::NotAuthorized => not_authorized(),
        other => fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", other),
        ),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, Response> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(fail(
            StatusCode::BAD_REQUEST,
            format!("Missing required field: {}", field),
        )),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "notes-dock",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

// The form posts year as either a number or a string
fn coerce_year(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, Response> {
    let department = required(req.department, "department")?;
    let section = required(req.section, "section")?;
    let name = required(req.name, "name")?;
    let email = required(req.email, "email")?;
    let year = match &req.year {
        None | Some(Value::Null) => {
            return Err(fail(
                StatusCode::BAD_REQUEST,
                "Missing required field: year",
            ))
        }
        Some(v) => coerce_year(v)
            .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "Invalid numeric values"))?,
    };

    let reg = Registration {
        department,
        year,
        section,
        name,
        email,
    };
    match state.registry.upsert(&reg).await {
        Ok(out) => {
            log_warnings("register-user", &out.warnings);
            let message = if out.value.created {
                "New user created"
            } else {
                "User updated"
            };
            Ok(Json(json!({ "success": true, "message": message })).into_response())
        }
        Err(e) => Err(service_failure(e)),
    }
}

pub async fn get_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if state.sessions.authorize(bearer(&headers)).is_none() {
        return not_authorized();
    }
    match state.registry.list_sorted().await {
        Ok(out) => {
            log_warnings("get-users", &out.warnings);
            Json(json!({ "success": true, "users": out.value })).into_response()
        }
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    year: Option<u16>,
    semester: Option<u8>,
}

pub async fn subjects(
    State(state): State<AppState>,
    Query(q): Query<ScopeQuery>,
) -> Response {
    let (Some(year), Some(semester)) = (q.year, q.semester) else {
        return fail(StatusCode::BAD_REQUEST, "Year and semester are required");
    };

    match state.catalog.visit(Scope::new(year, semester)).await {
        Ok(out) => {
            log_warnings("subjects", &out.warnings);
            Json(json!({
                "success": true,
                "subjects": out.value.subjects,
                "stats": out.value.stats
            }))
            .into_response()
        }
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    year: Option<u16>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, Response> {
    let Some(year) = req.year else {
        return Err(fail(StatusCode::BAD_REQUEST, "Please select year first"));
    };
    let username = required(req.username, "username")?;
    let password = required(req.password, "password")?;

    match state
        .sessions
        .login(&state.config.admins, year, &username, &password)
    {
        Some(token) => Ok(Json(json!({ "success": true, "token": token })).into_response()),
        None => Ok(fail(StatusCode::OK, "Invalid credentials")),
    }
}

pub async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match bearer(&headers) {
        Some(token) if state.sessions.logout(token) => {
            Json(json!({ "success": true })).into_response()
        }
        _ => not_authorized(),
    }
}

fn default_subject_icon() -> String {
    "fas fa-book".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AddSubjectRequest {
    #[serde(default)]
    semester: Option<u8>,
    #[serde(default)]
    subject_name: Option<String>,
    #[serde(default = "default_subject_icon")]
    subject_icon: String,
}

pub async fn add_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddSubjectRequest>,
) -> Response {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return not_authorized();
    };
    let Some(semester) = req.semester else {
        return fail(StatusCode::BAD_REQUEST, "Missing required field: semester");
    };
    let Some(name) = req.subject_name.filter(|s| !s.trim().is_empty()) else {
        return fail(StatusCode::BAD_REQUEST, "Subject name is required");
    };

    let scope = Scope::new(ctx.year, semester);
    match state
        .catalog
        .add_subject(scope, &name, &req.subject_icon)
        .await
    {
        Ok(out) => {
            log_warnings("add-subject", &out.warnings);
            Json(json!({ "success": true, "subject": out.value })).into_response()
        }
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EditSubjectRequest {
    #[serde(default)]
    semester: Option<u8>,
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    subject_name: Option<String>,
    #[serde(default)]
    subject_icon: Option<String>,
}

pub async fn edit_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EditSubjectRequest>,
) -> Response {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return not_authorized();
    };
    let (Some(semester), Some(subject_id), Some(name), Some(icon)) =
        (req.semester, req.subject_id, req.subject_name, req.subject_icon)
    else {
        return fail(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let scope = Scope::new(ctx.year, semester);
    match state
        .catalog
        .edit_subject(scope, &subject_id, &name, &icon)
        .await
    {
        Ok(out) => {
            log_warnings("edit-subject", &out.warnings);
            Json(json!({ "success": true, "subject": out.value })).into_response()
        }
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SemesterQuery {
    semester: Option<u8>,
}

pub async fn delete_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
    Query(q): Query<SemesterQuery>,
) -> Response {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return not_authorized();
    };
    let Some(semester) = q.semester else {
        return fail(StatusCode::BAD_REQUEST, "Missing required field: semester");
    };

    let scope = Scope::new(ctx.year, semester);
    match state.catalog.delete_subject(scope, &subject_id).await {
        Ok(out) => {
            log_warnings("delete-subject", &out.warnings);
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Default)]
struct UnitForm {
    semester: Option<u8>,
    subject_id: Option<String>,
    unit_id: Option<String>,
    unit_number: Option<String>,
    unit_title: Option<String>,
    unit_description: String,
    topics: String,
    pages_count: Option<String>,
    upload: Option<Upload>,
}

async fn read_unit_form(mut multipart: Multipart) -> Result<UnitForm, String> {
    let mut form = UnitForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| e.to_string())?.to_vec();
            if !filename.is_empty() {
                form.upload = Some(Upload { filename, bytes });
            }
            continue;
        }
        let text = field.text().await.map_err(|e| e.to_string())?;
        match name.as_str() {
            "semester" => form.semester = text.trim().parse().ok(),
            "subject_id" => form.subject_id = Some(text),
            "unit_id" => form.unit_id = Some(text),
            "unit_number" => form.unit_number = Some(text),
            "unit_title" => form.unit_title = Some(text),
            "unit_description" => form.unit_description = text,
            "topics" => form.topics = text,
            "pages_count" => form.pages_count = Some(text),
            _ => {}
        }
    }
    Ok(form)
}

fn parse_count(raw: Option<&str>, default: u32) -> Result<u32, Response> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| fail(StatusCode::BAD_REQUEST, "Invalid numeric values")),
    }
}

pub async fn add_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, Response> {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return Err(not_authorized());
    };
    let form = read_unit_form(multipart)
        .await
        .map_err(|msg| fail(StatusCode::BAD_REQUEST, msg))?;

    let (Some(semester), Some(subject_id)) = (form.semester, form.subject_id) else {
        return Err(fail(StatusCode::BAD_REQUEST, "Missing required fields"));
    };
    let title = required(form.unit_title, "unit_title")
        .map_err(|_| fail(StatusCode::BAD_REQUEST, "Missing required fields"))?;
    let number = parse_count(form.unit_number.as_deref(), 1)?;
    let pages_count = parse_count(form.pages_count.as_deref(), 0)?;

    let fields = NewUnit {
        number,
        title,
        description: form.unit_description,
        topics: form.topics,
        pages_count,
    };
    let scope = Scope::new(ctx.year, semester);
    match state
        .catalog
        .add_unit(scope, &subject_id, fields, form.upload)
        .await
    {
        Ok(out) => {
            log_warnings("add-unit", &out.warnings);
            Ok(Json(json!({ "success": true, "unit": out.value })).into_response())
        }
        Err(e) => Err(service_failure(e)),
    }
}

pub async fn edit_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, Response> {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return Err(not_authorized());
    };
    let form = read_unit_form(multipart)
        .await
        .map_err(|msg| fail(StatusCode::BAD_REQUEST, msg))?;

    let (Some(semester), Some(subject_id), Some(unit_id)) =
        (form.semester, form.subject_id, form.unit_id)
    else {
        return Err(fail(StatusCode::BAD_REQUEST, "Missing required fields"));
    };
    let (Some(title), Some(number_raw)) = (form.unit_title, form.unit_number) else {
        return Err(fail(StatusCode::BAD_REQUEST, "Missing required fields"));
    };
    let number: u32 = number_raw
        .trim()
        .parse()
        .map_err(|_| fail(StatusCode::BAD_REQUEST, "Invalid numeric values"))?;
    let pages_count = parse_count(form.pages_count.as_deref(), 0)?;

    let fields = NewUnit {
        number,
        title,
        description: form.unit_description,
        topics: form.topics,
        pages_count,
    };
    let scope = Scope::new(ctx.year, semester);
    match state
        .catalog
        .edit_unit(scope, &subject_id, &unit_id, fields, form.upload)
        .await
    {
        Ok(out) => {
            log_warnings("edit-unit", &out.warnings);
            Ok(Json(json!({ "success": true, "unit": out.value })).into_response())
        }
        Err(e) => Err(service_failure(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteUnitRequest {
    #[serde(default)]
    semester: Option<u8>,
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    unit_id: Option<String>,
}

pub async fn delete_unit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeleteUnitRequest>,
) -> Response {
    let Some(ctx) = state.sessions.authorize(bearer(&headers)) else {
        return not_authorized();
    };
    let (Some(semester), Some(subject_id), Some(unit_id)) =
        (req.semester, req.subject_id, req.unit_id)
    else {
        return fail(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let scope = Scope::new(ctx.year, semester);
    match state.catalog.delete_unit(scope, &subject_id, &unit_id).await {
        Ok(out) => {
            log_warnings("delete-unit", &out.warnings);
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => service_failure(e),
    }
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(q): Query<ScopeQuery>,
) -> Response {
    let (Some(year), Some(semester)) = (q.year, q.semester) else {
        return fail(StatusCode::BAD_REQUEST, "Year and semester are required");
    };
    // The path parameter arrives percent-decoded; a separator or dot
    // segment here would escape the scope prefix in the blob key
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return fail(StatusCode::NOT_FOUND, "File not found");
    }

    match state
        .catalog
        .download(Scope::new(year, semester), &filename)
        .await
    {
        Ok(out) => match out.value {
            Some(bytes) => {
                log_warnings("download", &out.warnings);
                (
                    [
                        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                        (
                            header::CONTENT_DISPOSITION,
                            format!("attachment; filename=\"{}\"", filename),
                        ),
                    ],
                    bytes,
                )
                    .into_response()
            }
            None => fail(StatusCode::NOT_FOUND, "File not found"),
        },
        Err(e) => service_failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

pub async fn contact_submit(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Response, Response> {
    let input = ContactInput {
        name: required(req.name, "name")?,
        email: required(req.email, "email")?,
        year: required(req.year, "year")?,
        section: required(req.section, "section")?,
        subject: required(req.subject, "subject")?,
        message: required(req.message, "message")?,
        timestamp: req.timestamp,
    };

    let out = state.contacts.append(input).await;
    // The sender always hears success; a dropped append only changes the copy
    let message = if out.warnings.is_empty() {
        "Your message has been sent successfully!"
    } else {
        log_warnings("contact", &out.warnings);
        "Your message has been received! We will get back to you soon."
    };
    Ok(Json(json!({ "success": true, "message": message })).into_response())
}
