use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Schema tag written into every stored report payload. Readers treat any other
/// value as unparsable content and fall back to raw classification fields.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Binary classification outcome for a rock-surface image.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CopperLabel {
    ConCobre,
    SinCobre,
}

impl CopperLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopperLabel::ConCobre => "con_cobre",
            CopperLabel::SinCobre => "sin_cobre",
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, CopperLabel::ConCobre)
    }
}

impl fmt::Display for CopperLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full analysis record persisted as the report's serialized content.
///
/// This blob is the single source of truth for everything later served to
/// clients; the summary/detail DTOs below are projections of it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    #[serde(default)]
    pub schema_version: u32,
    pub id: i64,
    pub date: String,
    pub zone: String,
    pub category: String,
    pub risk_level: String,
    pub copper_grade: String,
    pub ai_summary: String,
    pub recommendations: Vec<String>,
    pub metadata: Map<String, Value>,
    pub image_url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
}

/// One row of the history listing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: i64,
    pub date: String,
    pub zone: String,
    pub category: String,
    pub risk_level: String,
    pub copper_grade: String,
    pub status: String,
}

/// Full analysis view returned by the upload and detail endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetail {
    pub id: i64,
    pub date: String,
    pub zone: String,
    pub category: String,
    pub risk_level: String,
    pub copper_grade: String,
    pub ai_summary: String,
    pub recommendations: Vec<String>,
    pub metadata: Map<String, Value>,
    pub image_url: String,
    pub status: String,
}

impl From<ReportPayload> for AnalysisDetail {
    fn from(payload: ReportPayload) -> Self {
        AnalysisDetail {
            id: payload.id,
            date: payload.date,
            zone: payload.zone,
            category: payload.category,
            risk_level: payload.risk_level,
            copper_grade: payload.copper_grade,
            ai_summary: payload.ai_summary,
            recommendations: payload.recommendations,
            metadata: payload.metadata,
            image_url: payload.image_url,
            status: payload.status,
        }
    }
}
