use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::inference::InferenceEngine;
use crate::models::{ClassificationResult, PatientRecord, Sex};
use crate::report::{render_pdf, ReportDocument};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared, read-only state. The engine is loaded once at startup.
pub struct AppState {
    pub engine: InferenceEngine,
    pub config: Config,
}

impl AppState {
    pub fn new(engine: InferenceEngine, config: Config) -> Self {
        Self { engine, config }
    }
}

/// Register every route on an app or test service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/classify").route(web::post().to(classify)));
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub request_id: String,
    pub classification: ClassificationResult,
    pub confidence_percent: String,
    pub recommendations: Vec<String>,
    pub patient: PatientRecord,
    pub report_text: String,
    pub report_filename: String,
    /// Base64 PDF rendered from this response's own classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_pdf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
}

/// Multipart fields collected from the upload form.
#[derive(Default)]
struct UploadForm {
    image: Option<Vec<u8>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn insert(&mut self, name: &str, data: Vec<u8>) -> Result<(), ApiError> {
        if name == "image" {
            self.image = Some(data);
        } else {
            let value = String::from_utf8(data)
                .map_err(|_| ApiError::BadRequest(format!("field '{name}' is not valid UTF-8")))?;
            self.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Result<&str, ApiError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::BadRequest(format!("missing field '{name}'")))
    }

    fn into_parts(self) -> Result<(Vec<u8>, PatientRecord), ApiError> {
        let sex: Sex = self.field("sex")?.parse().map_err(ApiError::BadRequest)?;
        let date_raw = self.field("diagnosis_date")?;
        let diagnosis_date = NaiveDate::parse_from_str(date_raw.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::BadRequest(format!("diagnosis_date '{date_raw}' is not YYYY-MM-DD"))
        })?;
        let patient = PatientRecord {
            name: self.field("name")?.to_string(),
            age: self.field("age")?.to_string(),
            sex,
            address: self.field("address")?.to_string(),
            diagnosis_date,
        };
        let image = self
            .image
            .ok_or_else(|| ApiError::BadRequest("missing field 'image'".to_string()))?;
        Ok((image, patient))
    }
}

/// Read the whole multipart body into memory, enforcing the upload limit.
async fn read_form(mut payload: Multipart, limit: usize) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    let mut received = 0usize;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("malformed upload: {e}")))?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::BadRequest(format!("malformed upload: {e}")))?;
            received += chunk.len();
            if received > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }
        form.insert(&name, data)?;
    }

    Ok(form)
}

/// Classify an uploaded X-ray and return the result with the text and PDF report.
pub async fn classify(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let limit = state.config.server.max_upload_bytes;

    let (image, patient) = read_form(payload, limit).await?.into_parts()?;
    info!(request_id = %request_id, bytes = image.len(), "Classification requested");

    let engine_state = state.clone();
    let result = web::block(move || engine_state.engine.classify(&image))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!(request_id = %request_id, error = %e, "Classification failed");
            ApiError::from(e)
        })?;

    info!(
        request_id = %request_id,
        label = %result.label,
        confidence = result.confidence,
        "Classification complete"
    );

    let document = ReportDocument::build(&patient, &result);
    let report_text = document.to_text();
    let recommendations: Vec<String> = document
        .recommendations()
        .into_iter()
        .map(str::to_string)
        .collect();

    // The classification is returned even when the PDF cannot be rendered.
    let report_config = state.config.report.clone();
    let rendered = web::block(move || render_pdf(&document, &report_config))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let (report_pdf, report_error) = match rendered {
        Ok(bytes) => {
            info!(request_id = %request_id, bytes = bytes.len(), "Report generated");
            (Some(STANDARD.encode(bytes)), None)
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Report rendering failed");
            (None, Some(e.to_string()))
        }
    };

    let response = ClassifyResponse {
        request_id,
        classification: result,
        confidence_percent: result.confidence_percent(),
        recommendations,
        report_text,
        report_filename: patient.report_filename(),
        patient,
        report_pdf,
        report_error,
    };

    Ok(HttpResponse::Ok().json(response))
}
