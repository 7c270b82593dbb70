//! Upload processing pipeline: validate, store, classify, persist, render.
//!
//! Classification, report narrative and the PDF all happen inside one request.
//! Database writes for an accepted upload are committed atomically: either the
//! image, its classification and its report all land, or none of them do.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;
use shared::{AnalysisDetail, ReportPayload, REPORT_SCHEMA_VERSION};

use crate::db::models::{NewClassification, NewImage, NewReport};
use crate::db::repository::AnalysisRepository;
use crate::error::ApiError;
use crate::ml::model::Classifier;
use crate::report::narrative::{build_narrative, NarrativeContext, MODEL_DISPLAY_NAME};
use crate::report::pdf::PdfRenderer;
use crate::storage::LocalStorage;

/// Value persisted in the classifications table.
const MODEL_USED: &str = "CNN";

const ALLOWED_CONTENT_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// Raw parts of a multipart upload, already read off the wire.
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub metadata_raw: String,
}

#[derive(Clone)]
pub struct AnalysisService {
    repo: AnalysisRepository,
    classifier: Arc<dyn Classifier>,
    storage: LocalStorage,
    renderer: PdfRenderer,
}

impl AnalysisService {
    pub fn new(
        repo: AnalysisRepository,
        classifier: Arc<dyn Classifier>,
        storage: LocalStorage,
        renderer: PdfRenderer,
    ) -> Self {
        Self {
            repo,
            classifier,
            storage,
            renderer,
        }
    }

    /// Run the full pipeline for one upload and return the fresh analysis.
    pub async fn process_upload(
        &self,
        user_id: i64,
        upload: UploadRequest,
    ) -> Result<AnalysisDetail, ApiError> {
        let metadata = parse_metadata(&upload.metadata_raw)?;

        let content_type = upload.content_type.unwrap_or_default();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::BadRequest("Solo se aceptan PNG o JPEG".into()));
        }

        let extension = LocalStorage::extension_for(upload.file_name.as_deref());
        let file_name = LocalStorage::generate_file_name(&extension);
        let stored = self.storage.save_upload(&file_name, &upload.data).await?;

        let prediction = self
            .classifier
            .predict_path(&stored.path)
            .map_err(|e| {
                error!("Inference failed for {}: {}", stored.file_name, e);
                ApiError::Internal("Error al procesar la imagen con el modelo".into())
            })?;
        let percent = prediction.percent();
        info!(
            "Classified {} as {} ({}%)",
            stored.file_name,
            prediction.label.as_str(),
            percent
        );

        let now = Utc::now();
        let mut tx = self.repo.begin().await?;

        let image_id = self
            .repo
            .insert_image(
                &mut tx,
                &NewImage {
                    user_id,
                    file_path: stored.path.to_string_lossy().into_owned(),
                    size_bytes: stored.size_bytes as i64,
                    format: content_type.clone(),
                    state: "processed".into(),
                    uploaded_at: now,
                },
            )
            .await?;

        let classification_id = self
            .repo
            .insert_classification(
                &mut tx,
                &NewClassification {
                    image_id,
                    label: prediction.label.as_str().into(),
                    confidence: round_fraction(prediction.confidence),
                    model_used: MODEL_USED.into(),
                    classified_at: now,
                },
            )
            .await?;

        let ctx = NarrativeContext::from_metadata(&metadata);
        let narrative = build_narrative(prediction.label, percent, &ctx);

        let mut payload = ReportPayload {
            schema_version: REPORT_SCHEMA_VERSION,
            id: classification_id,
            date: now.to_rfc3339(),
            zone: ctx.zone.clone(),
            category: ctx.category.clone(),
            risk_level: ctx.risk_level.clone(),
            copper_grade: narrative.copper_grade,
            ai_summary: narrative.summary,
            recommendations: narrative.recommendations,
            metadata: enrich_metadata(metadata, &ctx, percent),
            image_url: LocalStorage::public_url(&stored.file_name),
            status: prediction.label.as_str().into(),
            pdf_path: None,
        };

        let pdf_path = self.storage.report_path(classification_id);
        if let Err(e) = self.renderer.render(&payload, &pdf_path) {
            error!("PDF rendering failed for analysis {}: {}", classification_id, e);
            remove_orphan_pdf(&pdf_path);
            return Err(ApiError::Internal("Error al generar el reporte PDF".into()));
        }
        payload.pdf_path = Some(pdf_path.to_string_lossy().into_owned());

        let content = serde_json::to_string(&payload)
            .map_err(|e| ApiError::Internal(format!("No se pudo serializar el reporte: {}", e)))?;

        let persisted = async {
            self.repo
                .insert_report(
                    &mut tx,
                    &NewReport {
                        classification_id,
                        content,
                        format: "pdf".into(),
                        generated_at: now,
                    },
                )
                .await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = persisted {
            warn!(
                "Rolling back analysis {} after persistence failure: {}",
                classification_id, e
            );
            remove_orphan_pdf(&pdf_path);
            return Err(ApiError::Database(e));
        }

        Ok(AnalysisDetail::from(payload))
    }
}

fn parse_metadata(raw: &str) -> Result<serde_json::Map<String, Value>, ApiError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::BadRequest("Metadata inválida".into())),
    }
}

/// Stored confidence keeps four decimals of the raw fraction.
fn round_fraction(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Copy the client metadata and stamp in the registry fields the report shows.
fn enrich_metadata(
    mut metadata: serde_json::Map<String, Value>,
    ctx: &NarrativeContext,
    percent: f64,
) -> serde_json::Map<String, Value> {
    metadata.insert("coordinates".into(), Value::String(ctx.coordinates.clone()));
    metadata.insert("responsible".into(), Value::String(ctx.responsible.clone()));
    metadata.insert("personnel".into(), ctx.personnel.clone());
    metadata.insert("modelo".into(), Value::String(MODEL_DISPLAY_NAME.into()));
    metadata.insert("confianza_porcentaje".into(), serde_json::json!(percent));
    metadata
}

fn remove_orphan_pdf(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Could not remove orphaned PDF {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_must_be_a_json_object() {
        assert!(parse_metadata("{\"location\": \"Rajo\"}").is_ok());
        assert!(parse_metadata("[1, 2]").is_err());
        assert!(parse_metadata("\"texto\"").is_err());
        assert!(parse_metadata("not json at all").is_err());
    }

    #[test]
    fn fraction_rounds_to_four_decimals() {
        assert_eq!(round_fraction(0.923456), 0.9235);
        assert_eq!(round_fraction(0.08), 0.08);
        assert_eq!(round_fraction(1.0), 1.0);
    }

    #[test]
    fn enriched_metadata_keeps_client_keys_and_adds_registry_fields() {
        let mut client = serde_json::Map::new();
        client.insert("location".into(), json!("Rajo Norte"));
        let ctx = NarrativeContext {
            zone: "Rajo Norte".into(),
            category: "Sondaje".into(),
            risk_level: "Alto".into(),
            coordinates: "-24.2,-69.0".into(),
            responsible: "I. Soto".into(),
            personnel: json!(["turno A"]),
        };

        let enriched = enrich_metadata(client, &ctx, 92.0);
        assert_eq!(enriched["location"], json!("Rajo Norte"));
        assert_eq!(enriched["coordinates"], json!("-24.2,-69.0"));
        assert_eq!(enriched["responsible"], json!("I. Soto"));
        assert_eq!(enriched["personnel"], json!(["turno A"]));
        assert_eq!(enriched["modelo"], json!("CopperCNN"));
        assert_eq!(enriched["confianza_porcentaje"], json!(92.0));
    }
}
