use std::path::Path;

use drive_registry::storage::StagedFile;
use drive_registry::workflow::{GrantRequest, UploadRequest};
use drive_registry::{AppContext, FileRecord, RegistryError};
use rocket::form::{Errors, Form};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{catch, get, post, FromForm, Request, State};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(FromForm)]
pub struct UploadForm<'r> {
    file: Result<TempFile<'r>, Errors<'r>>,
    name: Option<String>,
    email: Option<String>,
    #[field(name = "desiredFileName")]
    desired_file_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    success: bool,
    file_id: String,
    name: String,
    web_view_link: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantBody {
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
pub struct GrantResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    error: String,
}

pub const UPLOAD_TOO_LARGE: &str = "Upload is too large.";

/// Request failure rendered as `{"error": ...}` with a matching status.
pub enum ApiError {
    Workflow(RegistryError),
    PayloadTooLarge,
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Workflow(err)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let (status, message) = match self {
            ApiError::PayloadTooLarge => (Status::PayloadTooLarge, UPLOAD_TOO_LARGE.to_string()),
            ApiError::Workflow(err) if err.is_client_error() => {
                (Status::BadRequest, err.to_string())
            }
            ApiError::Workflow(err) => {
                error!(uri = %request.uri(), error = %err, "Request failed");
                (Status::InternalServerError, err.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).respond_to(request)
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Moves Rocket's temporary upload into the staging directory.
async fn stage(dir: &Path, file: &mut TempFile<'_>) -> Result<StagedFile, RegistryError> {
    let original_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string());
    let content_type = file.content_type().map(|ct| ct.to_string());

    let staged = StagedFile::reserve(dir, original_name, content_type).await?;
    file.persist_to(staged.path()).await?;
    Ok(staged)
}

#[post("/upload", data = "<form>")]
pub async fn upload(
    form: Form<UploadForm<'_>>,
    ctx: &State<AppContext>,
) -> ApiResult<UploadResponse> {
    let UploadForm {
        file,
        name,
        email,
        desired_file_name,
    } = form.into_inner();

    // A missing or empty part is left to the workflow's field validation.
    let staged = match file {
        Ok(mut file) if file.len() > 0 => Some(stage(&ctx.config.staging_dir, &mut file).await?),
        Ok(_) => None,
        Err(errors) if errors.status() == Status::PayloadTooLarge => {
            return Err(ApiError::PayloadTooLarge)
        }
        Err(_) => None,
    };

    let outcome = ctx
        .upload(UploadRequest {
            uploader_name: name,
            uploader_email: email,
            file: staged,
            desired_name: desired_file_name,
        })
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        file_id: outcome.file_id,
        name: outcome.file_name,
        web_view_link: outcome.web_view_link,
    }))
}

#[post("/grant-access", data = "<body>")]
pub async fn grant_access(
    body: Json<GrantBody>,
    ctx: &State<AppContext>,
) -> ApiResult<GrantResponse> {
    let GrantBody { file_id, email } = body.into_inner();
    let outcome = ctx.grant_access(GrantRequest { file_id, email }).await?;
    Ok(Json(GrantResponse {
        success: true,
        message: outcome.message,
    }))
}

#[get("/files")]
pub async fn files(ctx: &State<AppContext>) -> ApiResult<Vec<FileRecord>> {
    Ok(Json(ctx.list_all().await?))
}

#[get("/files-for-email/<email>")]
pub async fn files_for_email(email: &str, ctx: &State<AppContext>) -> ApiResult<Vec<FileRecord>> {
    Ok(Json(ctx.list_for_email(email).await?))
}

#[catch(default)]
pub fn json_catcher(status: Status, _request: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let error = match status.code {
        400 | 422 => "Malformed request body.".to_string(),
        404 => "Not found.".to_string(),
        413 => UPLOAD_TOO_LARGE.to_string(),
        _ => status.reason().unwrap_or("Request failed.").to_string(),
    };
    (status, Json(ErrorBody { error }))
}
