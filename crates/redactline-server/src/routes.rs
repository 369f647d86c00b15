//! JSON HTTP API
//!
//! Routes:
//! - `GET /api/health`
//! - `POST /api/analyze`, `POST /api/preview`, `POST /api/redact`
//! - `GET /api/documents` to list stored documents
//! - `POST /api/documents?filename=...` with the raw file as the body
//! - `POST /api/upload` with a multipart form carrying a `file` field
//! - `GET|DELETE /api/documents/{id}`
//! - `GET /api/documents/{id}/download`, `GET /api/documents/{id}/audit`
//!
//! Detection, redaction and extraction run on the blocking thread pool.

use crate::config::UploadConfig;
use crate::error::{ApiError, ApiResult};
use crate::export::{redacted_filename, render_redacted_document};
use crate::extract::{extract_text, validate_upload};
use crate::store::{DocumentStore, StoredDocument, StoredRedaction};
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local, Utc};
use redactline_pii::{
    assess_risk, redact, Detection, DetectionEngine, DetectionSummary, PIIType, RedactionOptions,
    RedactionResult, RiskAssessment,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Multipart field holding the uploaded file
const FILE_FIELD: &str = "file";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DetectionEngine>,
    pub store: Arc<dyn DocumentStore>,
    pub uploads: UploadConfig,
}

impl AppState {
    pub fn new(
        engine: Arc<DetectionEngine>,
        store: Arc<dyn DocumentStore>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            engine,
            store,
            uploads,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.uploads.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/preview", post(preview))
        .route("/api/redact", post(redact_text))
        .route(
            "/api/documents",
            get(list_documents).post(upload_document),
        )
        .route("/api/upload", post(upload_form))
        .route(
            "/api/documents/{id}",
            get(get_document).delete(delete_document),
        )
        .route("/api/documents/{id}/download", get(download_document))
        .route("/api/documents/{id}/audit", get(document_audit))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub text: String,
    #[serde(default)]
    pub options: RedactionOptions,
}

#[derive(Debug, Deserialize)]
pub struct RedactRequest {
    pub text: String,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub options: RedactionOptions,
    /// Stored document to attach the result to
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: String,
}

/// Detections for one text with their summary and risk classification
///
/// A non-empty `skipped_rules` means those rules ran out of time and the
/// detections are partial.
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub detections: Vec<Detection>,
    pub summary: DetectionSummary,
    pub risk: RiskAssessment,
    pub skipped_rules: Vec<PIIType>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    success: bool,
    analysis: Analysis,
}

#[derive(Debug, Serialize)]
struct PreviewResponse {
    success: bool,
    original_text: String,
    redacted_text: String,
    redactions_applied: usize,
    total_detections: usize,
    skipped_rules: Vec<PIIType>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    document_id: String,
    original_filename: String,
    file_size: usize,
    file_type: String,
    text_length: usize,
    has_text: bool,
    extracted_text: Option<String>,
    analysis: Option<Analysis>,
}

/// Listing entry; omits the document text
#[derive(Debug, Serialize)]
struct DocumentSummary {
    document_id: String,
    original_filename: String,
    file_type: String,
    file_size: usize,
    uploaded_at: DateTime<Utc>,
    has_text: bool,
    redacted: bool,
}

impl From<StoredDocument> for DocumentSummary {
    fn from(document: StoredDocument) -> Self {
        Self {
            has_text: document.extracted_text.is_some(),
            redacted: document.redaction.is_some(),
            document_id: document.id,
            original_filename: document.original_filename,
            file_type: document.file_type,
            file_size: document.file_size,
            uploaded_at: document.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct DocumentList {
    success: bool,
    total: usize,
    documents: Vec<DocumentSummary>,
}

fn analyze_text(engine: &DetectionEngine, text: &str) -> Analysis {
    let report = engine.detect(text);
    if !report.skipped_rules.is_empty() {
        warn!(skipped = ?report.skipped_rules, "Detection is partial, rules ran out of time");
    }
    let risk = assess_risk(&report.detections);

    Analysis {
        detections: report.detections,
        summary: report.summary,
        risk,
        skipped_rules: report.skipped_rules,
    }
}

/// Run CPU-bound work on the blocking pool so it does not stall the
/// async workers
async fn run_blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}

fn require_text(text: &str) -> ApiResult<()> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Text cannot be empty".to_string()));
    }
    Ok(())
}

async fn find_document(state: &AppState, id: &str) -> ApiResult<StoredDocument> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document not found: {id}")))
}

fn find_redaction(document: StoredDocument) -> ApiResult<(StoredDocument, StoredRedaction)> {
    match document.redaction.clone() {
        Some(redaction) => Ok((document, redaction)),
        None => Err(ApiError::NotFound(format!(
            "Document {} has not been redacted",
            document.id
        ))),
    }
}

/// Keep a header-safe version of an uploaded name
fn attachment_name(original_filename: &str) -> String {
    redacted_filename(original_filename)
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "redactline",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload?;
    require_text(&request.text)?;

    let engine = state.engine.clone();
    let analysis = run_blocking(move || analyze_text(&engine, &request.text)).await?;
    debug!(
        detections = analysis.summary.total_detections,
        risk = ?analysis.risk.risk_level,
        "Analyzed text"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis,
    }))
}

async fn preview(
    State(state): State<AppState>,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> ApiResult<Json<PreviewResponse>> {
    let Json(request) = payload?;
    require_text(&request.text)?;

    let engine = state.engine.clone();
    let response = run_blocking(move || {
        let report = engine.detect(&request.text);
        let result = redact(&request.text, &report.detections, &request.options);

        PreviewResponse {
            success: true,
            redacted_text: result.redacted_text,
            redactions_applied: result.summary.total_redactions,
            total_detections: report.detections.len(),
            skipped_rules: report.skipped_rules,
            original_text: request.text,
        }
    })
    .await?;

    Ok(Json(response))
}

async fn redact_text(
    State(state): State<AppState>,
    payload: Result<Json<RedactRequest>, JsonRejection>,
) -> ApiResult<Json<RedactionResult>> {
    let Json(RedactRequest {
        text,
        detections,
        options,
        document_id,
    }) = payload?;
    let result = run_blocking(move || redact(&text, &detections, &options)).await?;

    if let Some(id) = &document_id {
        state
            .store
            .update_redaction(
                id,
                StoredRedaction {
                    redacted_text: result.redacted_text.clone(),
                    audit_trail: result.audit_trail.clone(),
                },
            )
            .await?;
        info!(
            document_id = %id,
            redactions = result.summary.total_redactions,
            "Stored redaction"
        );
    }

    Ok(Json(result))
}

/// Validate, extract, analyze and store one uploaded file
async fn store_upload(state: &AppState, filename: String, body: Bytes) -> ApiResult<UploadResponse> {
    let file_type = validate_upload(&filename, body.len(), &state.uploads)?;
    let file_size = body.len();

    let engine = state.engine.clone();
    let extract_type = file_type.clone();
    let (extracted_text, analysis) = run_blocking(move || {
        let text = extract_text(&body, &extract_type);
        let analysis = text.as_deref().map(|text| analyze_text(&engine, text));
        (text, analysis)
    })
    .await?;

    let document = StoredDocument {
        id: Uuid::new_v4().to_string(),
        original_filename: filename,
        file_type,
        file_size,
        extracted_text,
        uploaded_at: Utc::now(),
        redaction: None,
    };
    state.store.put(document.clone()).await?;

    info!(
        document_id = %document.id,
        file_type = %document.file_type,
        file_size = document.file_size,
        "Stored uploaded document"
    );

    Ok(UploadResponse {
        success: true,
        text_length: document
            .extracted_text
            .as_deref()
            .map_or(0, |text| text.chars().count()),
        has_text: document.extracted_text.is_some(),
        document_id: document.id,
        original_filename: document.original_filename,
        file_size: document.file_size,
        file_type: document.file_type,
        extracted_text: document.extracted_text,
        analysis,
    })
}

async fn upload_document(
    State(state): State<AppState>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let Query(query) = query?;
    let body = body?;

    Ok(Json(store_upload(&state, query.filename, body).await?))
}

async fn upload_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let body = field.bytes().await?;
        return Ok(Json(store_upload(&state, filename, body).await?));
    }

    Err(ApiError::InvalidRequest("No file provided".to_string()))
}

async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<DocumentList>> {
    let documents: Vec<DocumentSummary> = state
        .store
        .list()
        .await?
        .into_iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentList {
        success: true,
        total: documents.len(),
        documents,
    }))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StoredDocument>> {
    Ok(Json(find_document(&state, &id).await?))
}

async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (document, redaction) = find_redaction(find_document(&state, &id).await?)?;

    let body = render_redacted_document(
        &redaction.redacted_text,
        &document.original_filename,
        Local::now(),
    );
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment_name(&document.original_filename)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn document_audit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (_, redaction) = find_redaction(find_document(&state, &id).await?)?;
    Ok(Json(redaction.audit_trail).into_response())
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    if !state.store.remove(&id).await? {
        return Err(ApiError::NotFound(format!("Document not found: {id}")));
    }

    info!(document_id = %id, "Deleted document");
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Document deleted",
    })))
}
