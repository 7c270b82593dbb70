//! Read-side reconstruction of history and detail views.
//!
//! The stored report payload is the source of truth; rows whose content is
//! missing or unparsable degrade to raw classification fields. The parse
//! outcome is an explicit three-state value so the fallback is a branch, not
//! a swallowed error.

use log::warn;
use shared::{AnalysisDetail, AnalysisSummary, ReportPayload, REPORT_SCHEMA_VERSION};

use crate::db::models::{DetailRow, HistoryRow};

pub const DEFAULT_ZONE: &str = "Zona no especificada";
pub const DEFAULT_CATEGORY: &str = "No especificada";
pub const DEFAULT_RISK: &str = "No especificado";

/// Parse state of one stored report payload.
#[derive(Debug)]
pub enum StoredPayload {
    /// Valid JSON carrying the supported schema version.
    Parsed(ReportPayload),
    /// Content exists but is not usable (bad JSON or unknown version).
    Corrupt,
    /// No report row for the classification.
    Missing,
}

impl StoredPayload {
    pub fn parse(content: Option<&str>) -> StoredPayload {
        let Some(raw) = content else {
            return StoredPayload::Missing;
        };
        match serde_json::from_str::<ReportPayload>(raw) {
            Ok(payload) if payload.schema_version == REPORT_SCHEMA_VERSION => {
                StoredPayload::Parsed(payload)
            }
            Ok(payload) => {
                warn!(
                    "Stored report has unsupported schema version {}",
                    payload.schema_version
                );
                StoredPayload::Corrupt
            }
            Err(e) => {
                warn!("Stored report content is not valid JSON: {}", e);
                StoredPayload::Corrupt
            }
        }
    }
}

/// Anything other than the detected label falls back to "sin_cobre".
fn fallback_status(label: &str) -> String {
    if label == "con_cobre" {
        "con_cobre".into()
    } else {
        "sin_cobre".into()
    }
}

fn file_basename(path: &str) -> &str {
    std::path::Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

pub fn summarize(row: &HistoryRow) -> AnalysisSummary {
    match StoredPayload::parse(row.report_content.as_deref()) {
        StoredPayload::Parsed(payload) => AnalysisSummary {
            id: row.classification_id,
            date: payload.date,
            zone: payload.zone,
            category: payload.category,
            risk_level: payload.risk_level,
            copper_grade: payload.copper_grade,
            status: payload.status,
        },
        StoredPayload::Corrupt | StoredPayload::Missing => AnalysisSummary {
            id: row.classification_id,
            date: row.classified_at.to_rfc3339(),
            zone: DEFAULT_ZONE.into(),
            category: DEFAULT_CATEGORY.into(),
            risk_level: DEFAULT_RISK.into(),
            copper_grade: row.label.clone(),
            status: fallback_status(&row.label),
        },
    }
}

pub fn detail(row: &DetailRow) -> AnalysisDetail {
    match StoredPayload::parse(row.report_content.as_deref()) {
        StoredPayload::Parsed(payload) => {
            let mut detail = AnalysisDetail::from(payload);
            // The row id is authoritative even over the stored blob.
            detail.id = row.classification_id;
            detail
        }
        StoredPayload::Corrupt | StoredPayload::Missing => AnalysisDetail {
            id: row.classification_id,
            date: row.classified_at.to_rfc3339(),
            zone: DEFAULT_ZONE.into(),
            category: DEFAULT_CATEGORY.into(),
            risk_level: DEFAULT_RISK.into(),
            copper_grade: row.label.clone(),
            ai_summary: String::new(),
            recommendations: Vec::new(),
            metadata: serde_json::Map::new(),
            image_url: format!("/uploads/{}", file_basename(&row.image_path)),
            status: fallback_status(&row.label),
        },
    }
}

/// On-disk PDF location from stored report content, when recoverable.
pub fn pdf_location(content: &str) -> Option<String> {
    match StoredPayload::parse(Some(content)) {
        StoredPayload::Parsed(payload) => payload.pdf_path,
        StoredPayload::Corrupt | StoredPayload::Missing => None,
    }
}
