//! Translation export and upload endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use domain::models::tenant::site_url;
use domain::models::{ExportFormat, UploadResponse};
use shared::validation::{validate_locale, validate_tenant_slug};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_translation_export, record_translation_import};
use crate::services::ExportTarget;

/// Query parameters for translation export.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub lang: Option<String>,
}

fn parse_format(format: Option<&str>) -> Result<ExportFormat, ApiError> {
    match format.map(|f| f.to_ascii_lowercase()).as_deref() {
        None | Some("csv") => Ok(ExportFormat::Csv),
        Some("json") => Ok(ExportFormat::Json),
        Some(other) => Err(ApiError::Validation(format!(
            "Unsupported format '{}': use csv or json",
            other
        ))),
    }
}

fn check_tenant(tenant: &str) -> Result<(), ApiError> {
    validate_tenant_slug(tenant)
        .map_err(|_| ApiError::Validation(format!("Invalid tenant slug '{}'", tenant)))
}

fn check_lang(lang: &str) -> Result<(), ApiError> {
    validate_locale(lang)
        .map_err(|_| ApiError::Validation(format!("Invalid language tag '{}'", lang)))
}

async fn export(
    state: &AppState,
    tenant: &str,
    format: ExportFormat,
    lang: Option<String>,
) -> Result<Response, ApiError> {
    check_tenant(tenant)?;
    if let Some(lang) = &lang {
        check_lang(lang)?;
    }

    let target = ExportTarget {
        url: site_url(&state.config.docker.public_base_url, tenant),
        lang,
    };
    let export = state.translations.export(&target).await?;
    record_translation_export(export.source);

    let body = export
        .render(format)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"{}-translations.{}\"",
        tenant,
        format.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Export a tenant's translation strings.
///
/// GET /download_transcriptions/:tenant?format=csv|json&lang=xx_YY
pub async fn download_transcriptions(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = parse_format(query.format.as_deref())?;
    export(&state, &tenant, format, query.lang).await
}

/// Legacy CSV-only export.
///
/// GET /download_csv/:tenant
pub async fn download_csv(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<Response, ApiError> {
    export(&state, &tenant, ExportFormat::Csv, None).await
}

/// Upload translations for one language.
///
/// POST /upload_csv/:tenant (multipart: `file`, `lang`)
pub async fn upload_csv(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    check_tenant(&tenant)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut lang: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed upload: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Malformed upload: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("lang") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Malformed upload: {}", e)))?;
                lang = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let (filename, contents) =
        file.ok_or_else(|| ApiError::Validation("Missing 'file' field".to_string()))?;
    let lang = lang.ok_or_else(|| ApiError::Validation("Missing 'lang' field".to_string()))?;
    check_lang(&lang)?;

    let url = site_url(&state.config.docker.public_base_url, &tenant);
    let response = state
        .translations
        .import(&url, &lang, &filename, &contents)
        .await?;
    record_translation_import(response.entries);

    Ok(Json(response))
}
