//! REST API over the store, the coordinate table and the renderers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::background::BackgroundProvider;
use crate::coordinates::{CoordinateConfig, CoordinateStore};
use crate::error::{ApiError, RenderError};
use crate::model::{Client, CompanySettings, Report, ReportData, WholesalerInfo};
use crate::render::{
    generate_form222, generate_inventory, generate_invoice, Form222Options, RenderContext,
    RenderedPdf,
};
use crate::store::{JsonStore, Record};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub coordinates: Arc<CoordinateStore>,
    /// Form 222 calibration backdrop; `None` in production
    pub background: Option<Arc<dyn BackgroundProvider>>,
    pub show_grid: bool,
}

impl AppState {
    pub fn new(store: JsonStore) -> Self {
        AppState {
            store: Arc::new(store),
            coordinates: Arc::new(CoordinateStore::default()),
            background: None,
            show_grid: false,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/clients",
            get(list_records::<Client>).post(create_record::<Client>),
        )
        .route(
            "/api/clients/:id",
            get(get_record::<Client>)
                .put(update_record::<Client>)
                .delete(delete_record::<Client>),
        )
        .route(
            "/api/wholesalers",
            get(list_records::<WholesalerInfo>).post(create_record::<WholesalerInfo>),
        )
        .route(
            "/api/wholesalers/:id",
            get(get_record::<WholesalerInfo>)
                .put(update_record::<WholesalerInfo>)
                .delete(delete_record::<WholesalerInfo>),
        )
        .route(
            "/api/company-settings",
            get(get_company_settings).put(put_company_settings),
        )
        .route("/api/reports", get(list_reports).post(create_record::<Report>))
        .route(
            "/api/reports/:id",
            get(get_record::<Report>)
                .put(update_record::<Report>)
                .delete(delete_record::<Report>),
        )
        .route("/api/reports/:id/form222", get(form222_pdf))
        .route("/api/reports/:id/inventory", get(inventory_pdf))
        .route("/api/reports/:id/invoice", get(invoice_pdf))
        .route("/api/coordinates", get(get_coordinates).put(update_coordinates))
        .route("/api/coordinates/reset", post(reset_coordinates))
        .with_state(state)
}

// ============================================================================
// RECORDS
// ============================================================================

async fn list_records<R: Record>(State(state): State<AppState>) -> ApiResult<Json<Vec<R>>> {
    Ok(Json(state.store.list::<R>()?))
}

async fn get_record<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<R>> {
    Ok(Json(state.store.get::<R>(&id)?))
}

async fn create_record<R: Record>(
    State(state): State<AppState>,
    Json(record): Json<R>,
) -> ApiResult<(StatusCode, Json<R>)> {
    let created = state.store.create(record)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_record<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(record): Json<R>,
) -> ApiResult<Json<R>> {
    Ok(Json(state.store.update(&id, record)?))
}

async fn delete_record<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete::<R>(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportQuery {
    client_id: Option<String>,
}

async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Vec<Report>>> {
    let reports = match query.client_id {
        Some(client_id) if client_id.trim().is_empty() => {
            return Err(ApiError::BadRequest("clientId must not be empty".to_string()));
        }
        Some(client_id) => state.store.reports_for_client(&client_id)?,
        None => state.store.list::<Report>()?,
    };
    Ok(Json(reports))
}

async fn get_company_settings(State(state): State<AppState>) -> ApiResult<Json<CompanySettings>> {
    Ok(Json(state.store.company_settings()?))
}

async fn put_company_settings(
    State(state): State<AppState>,
    Json(settings): Json<CompanySettings>,
) -> ApiResult<Json<CompanySettings>> {
    state.store.put_company_settings(&settings)?;
    Ok(Json(settings))
}

// ============================================================================
// COORDINATES
// ============================================================================

async fn get_coordinates(State(state): State<AppState>) -> Json<CoordinateConfig> {
    Json(CoordinateConfig::clone(&state.coordinates.snapshot()))
}

async fn update_coordinates(
    State(state): State<AppState>,
    Json(partial): Json<Value>,
) -> ApiResult<Json<CoordinateConfig>> {
    let updated = state.coordinates.update(&partial)?;
    Ok(Json(CoordinateConfig::clone(&updated)))
}

async fn reset_coordinates(State(state): State<AppState>) -> Json<CoordinateConfig> {
    Json(CoordinateConfig::clone(&state.coordinates.reset()))
}

// ============================================================================
// DOCUMENTS
// ============================================================================

/// Resolves a stored report into everything a renderer needs.
fn report_data(state: &AppState, report_id: &str) -> ApiResult<ReportData> {
    let report = state.store.get::<Report>(report_id)?;
    let client = state.store.get::<Client>(&report.client_id)?;
    let company_settings = state.store.company_settings()?;
    let wholesaler_info = state.store.find_wholesaler_by_name(&client.wholesaler)?;

    Ok(ReportData {
        client,
        line_items: report.line_items,
        company_settings: Some(company_settings),
        wholesaler_info,
    })
}

async fn form222_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let pdf = render_blocking(move || {
        let data = report_data(&state, &id)?;
        let config = state.coordinates.snapshot();
        let options = Form222Options {
            background: state.background.as_deref(),
            show_grid: state.show_grid,
        };
        Ok(generate_form222(&data, &config, &options, &RenderContext::now())?)
    })
    .await?;
    Ok(pdf_response(pdf))
}

async fn inventory_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let pdf = render_blocking(move || {
        let data = report_data(&state, &id)?;
        Ok(generate_inventory(&data, &RenderContext::now())?)
    })
    .await?;
    Ok(pdf_response(pdf))
}

async fn invoice_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let pdf = render_blocking(move || {
        let data = report_data(&state, &id)?;
        Ok(generate_invoice(&data, &RenderContext::now())?)
    })
    .await?;
    Ok(pdf_response(pdf))
}

/// Store reads and PDF generation run off the async workers.
async fn render_blocking<F>(render: F) -> ApiResult<RenderedPdf>
where
    F: FnOnce() -> ApiResult<RenderedPdf> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| ApiError::from(RenderError::Generation(e.to_string())))?
}

fn pdf_response(pdf: RenderedPdf) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&pdf.filename)),
        ],
        pdf.bytes,
    )
        .into_response()
}

/// `attachment` with a plain ASCII `filename` plus the exact name as RFC 5987
/// `filename*`.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
