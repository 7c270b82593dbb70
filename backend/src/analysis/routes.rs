use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use shared::AnalysisSummary;

use crate::auth::middleware::AuthenticatedUser;
use crate::db::repository::AnalysisRepository;
use crate::error::ApiError;
use crate::storage::MAX_UPLOAD_BYTES;

use super::pipeline::{AnalysisService, UploadRequest};
use super::query;

/// POST /api/analysis/upload. Multipart with a `file` part and a JSON
/// `metadata` part; responds with the full analysis detail.
pub async fn upload(
    user: AuthenticatedUser,
    pipeline: web::Data<AnalysisService>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(payload).await?;
    let detail = pipeline.process_upload(user.id, upload).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// GET /api/analysis/history. Newest-first summaries for the caller.
pub async fn history(
    user: AuthenticatedUser,
    repo: web::Data<AnalysisRepository>,
) -> Result<HttpResponse, ApiError> {
    let rows = repo.history_for_user(user.id).await?;
    let summaries: Vec<AnalysisSummary> = rows.iter().map(query::summarize).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /api/analysis/{id}. Rows owned by other users read as absent.
pub async fn detail(
    user: AuthenticatedUser,
    repo: web::Data<AnalysisRepository>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let row = repo
        .detail_for_user(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Análisis no encontrado".into()))?;
    Ok(HttpResponse::Ok().json(query::detail(&row)))
}

/// GET /api/analysis/{id}/pdf. Streams the stored report as an attachment.
pub async fn download_pdf(
    user: AuthenticatedUser,
    repo: web::Data<AnalysisRepository>,
    path: web::Path<i64>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let content = repo
        .report_content_for_user(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reporte no encontrado".into()))?;
    let pdf_path = query::pdf_location(&content)
        .ok_or_else(|| ApiError::NotFound("PDF no disponible".into()))?;
    let file = NamedFile::open_async(&pdf_path)
        .await
        .map_err(|_| ApiError::NotFound("PDF no disponible".into()))?;
    info!("Serving report PDF for analysis {} to user {}", id, user.id);
    let response = file
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!("reporte_{}.pdf", id))],
        })
        .into_response(&req);
    Ok(response)
}

/// Reads the multipart stream into memory, enforcing the size cap per chunk.
async fn read_upload(mut payload: Multipart) -> Result<UploadRequest, ApiError> {
    let mut file_name = None;
    let mut content_type = None;
    let mut data = Vec::new();
    let mut metadata_raw = String::new();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart inválido: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                content_type = field.content_type().map(|m| m.essence_str().to_string());
                file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(ToString::to_string);
                while let Some(chunk) = field.try_next().await.map_err(|e| {
                    ApiError::BadRequest(format!("Error leyendo el archivo: {}", e))
                })? {
                    if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                        return Err(ApiError::BadRequest("Archivo demasiado grande".into()));
                    }
                    data.extend_from_slice(&chunk);
                }
            }
            "metadata" => {
                let mut raw = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(|e| {
                    ApiError::BadRequest(format!("Error leyendo metadata: {}", e))
                })? {
                    raw.extend_from_slice(&chunk);
                }
                metadata_raw = String::from_utf8_lossy(&raw).into_owned();
            }
            _ => {
                // Drain unknown parts so the stream stays consistent.
                while field.try_next().await.ok().flatten().is_some() {}
            }
        }
    }

    Ok(UploadRequest {
        file_name,
        content_type,
        data,
        metadata_raw,
    })
}
