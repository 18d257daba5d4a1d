use crate::domain::{Report, ReportDraft, ReportFilter, ReportStatus};
use crate::error::{AppError, AppResult};
use crate::handlers::profile::ProfileResponse;
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::lifecycle::Resolution;
use crate::services::profile::ProfileService;
use crate::state::AppState;
use crate::store::ImageStore;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReportRequest {
    /// What was found (1-2000 characters)
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    /// Human-readable place (1-255 characters)
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    /// GPS latitude; send together with `longitude`
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    /// GPS longitude; send together with `latitude`
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    /// Reference returned by `POST /api/v1/upload/image`
    #[validate(length(min = 1, max = 255))]
    pub image_ref: String,
}

impl From<CreateReportRequest> for ReportDraft {
    fn from(req: CreateReportRequest) -> Self {
        Self {
            description: req.description,
            location: req.location,
            latitude: req.latitude,
            longitude: req.longitude,
            image_ref: req.image_ref,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    /// Filter by status (PENDING, RESOLVED, REJECTED)
    pub status: Option<String>,
    /// Only reports by this author
    pub author_id: Option<i32>,
    /// Only the caller's own reports
    pub mine: Option<bool>,
    /// Page number
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: i32,
    pub description: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Opaque image reference
    pub image_ref: String,
    /// Where clients can fetch the image
    pub image_url: String,
    pub author_id: i32,
    pub author_name: String,
    pub status: ReportStatus,
    /// Authority who resolved the report
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<String>,
    pub created_at: String,
}

impl ReportResponse {
    fn new(report: Report, images: &dyn ImageStore) -> Self {
        Self {
            id: report.id,
            description: report.description,
            location: report.location,
            latitude: report.coordinates.map(|c| c.latitude),
            longitude: report.coordinates.map(|c| c.longitude),
            image_url: images.public_url(&report.image_ref),
            image_ref: report.image_ref,
            author_id: report.author_id,
            author_name: report.author_name,
            status: report.status,
            resolved_by: report.resolved_by,
            resolved_at: report.resolved_at.map(|t| t.to_string()),
            created_at: report.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveResponse {
    pub report: ReportResponse,
    /// The credited author; absent when the report was already resolved
    pub author: Option<ProfileResponse>,
    pub already_resolved: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Report submitted in PENDING", body = ReportResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 403, description = "Helpers only", body = AppError),
    ),
    tag = "reports"
)]
pub async fn create_report(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateReportRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let actor = ProfileService::new(&state).actor(auth_user.user_id).await?;
    let report = state
        .lifecycle()
        .submit(&actor, ReportDraft::from(payload))
        .await?;

    Ok(ApiResponse::with_message(
        ReportResponse::new(report, state.images.as_ref()),
        "Report submitted",
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    security(("jwt_token" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("author_id" = Option<i32>, Query, description = "Filter by author"),
        ("mine" = Option<bool>, Query, description = "Only the caller's reports"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Reports, newest first", body = PaginatedResponse<ReportResponse>),
        (status = 400, description = "Unknown status", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "reports"
)]
pub async fn list_reports(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ListReportsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = build_filter(&params, auth_user.user_id)?;

    let (reports, total) = state.lifecycle().list(&filter).await?;
    let items = reports
        .into_iter()
        .map(|r| ReportResponse::new(r, state.images.as_ref()))
        .collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items,
        total,
        filter.page,
        filter.per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 404, description = "Report not found", body = AppError),
    ),
    tag = "reports"
)]
pub async fn get_report(
    Extension(state): Extension<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let report = state.lifecycle().get(id).await?;
    Ok(ApiResponse::ok(ReportResponse::new(
        report,
        state.images.as_ref(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}/resolve",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Report ID")),
    responses(
        (status = 200, description = "Report resolved (or already was)", body = ResolveResponse),
        (status = 403, description = "Authorities only", body = AppError),
        (status = 404, description = "Report not found", body = AppError),
        (status = 409, description = "Report cannot be resolved", body = AppError),
        (status = 503, description = "Award failed; report left PENDING", body = AppError),
    ),
    tag = "reports"
)]
pub async fn resolve_report(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let actor = ProfileService::new(&state).actor(auth_user.user_id).await?;
    let resolution = state.lifecycle().resolve(&actor, id).await?;

    let images = state.images.as_ref();
    let response = match resolution {
        Resolution::Resolved { report, author } => ApiResponse::with_message(
            ResolveResponse {
                report: ReportResponse::new(report, images),
                author: Some(ProfileResponse::from(author)),
                already_resolved: false,
            },
            "Report resolved",
        ),
        Resolution::AlreadyResolved(report) => ApiResponse::with_message(
            ResolveResponse {
                report: ReportResponse::new(report, images),
                author: None,
                already_resolved: true,
            },
            "Report was already resolved",
        ),
    };
    Ok(response)
}

fn build_filter(params: &ListReportsQuery, caller_id: i32) -> AppResult<ReportFilter> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ReportStatus>)
        .transpose()?;
    let author_id = if params.mine.unwrap_or(false) {
        Some(caller_id)
    } else {
        params.author_id
    };
    let (page, per_page) = PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve();

    Ok(ReportFilter {
        status,
        author_id,
        page,
        per_page,
    })
}
