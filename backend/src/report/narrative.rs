//! Deterministic narrative generation. Two fixed templates (detected / not
//! detected), each interpolating defaulted metadata fields and the display
//! percentage; recommendation lists are hard-coded per branch.

use serde_json::{Map, Value};
use shared::CopperLabel;

/// Model name echoed into the payload metadata.
pub const MODEL_DISPLAY_NAME: &str = "CopperCNN";

pub const DETECTED_RECOMMENDATIONS: [&str; 3] = [
    "Derivar el registro al área de geología para evaluación detallada.",
    "Actualizar el modelo geológico de la zona con esta evidencia.",
    "Priorizar esta zona en el plan de explotación según los lineamientos de la faena.",
];

pub const NOT_DETECTED_RECOMMENDATIONS: [&str; 2] = [
    "Archivar el registro como caso sin presencia de cobre.",
    "Utilizar esta imagen como ejemplo negativo para seguir entrenando el modelo.",
];

/// Client metadata fields the narrative interpolates, already defaulted.
#[derive(Debug, Clone)]
pub struct NarrativeContext {
    pub zone: String,
    pub category: String,
    pub risk_level: String,
    pub coordinates: String,
    pub responsible: String,
    pub personnel: Value,
}

impl NarrativeContext {
    /// Missing, null and empty-string fields take their documented defaults.
    /// The zone comes from the client's `location` key.
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        NarrativeContext {
            zone: string_field(metadata, "location", "Zona no especificada"),
            category: string_field(metadata, "category", "No especificada"),
            risk_level: string_field(metadata, "riskLevel", "No especificado"),
            coordinates: string_field(metadata, "coordinates", ""),
            responsible: string_field(metadata, "responsible", ""),
            personnel: metadata.get("personnel").cloned().unwrap_or(Value::Null),
        }
    }

    fn responsible_display(&self) -> &str {
        if self.responsible.is_empty() {
            "N/D"
        } else {
            &self.responsible
        }
    }

    fn personnel_display(&self) -> String {
        match &self.personnel {
            Value::Null => "N/D".to_string(),
            Value::String(s) if s.is_empty() => "N/D".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn string_field(metadata: &Map<String, Value>, key: &str, default: &str) -> String {
    match metadata.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) if s.is_empty() => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Percentage formatting shared by narrative text, payload metadata and the
/// PDF: at least one decimal digit, no further trailing zeros (92 -> "92.0",
/// 85.25 -> "85.25").
pub fn format_percent(percent: f64) -> String {
    let fixed = format!("{:.2}", percent);
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Narrative output for one classification.
#[derive(Debug, Clone)]
pub struct Narrative {
    pub copper_grade: String,
    pub summary: String,
    pub recommendations: Vec<String>,
}

pub fn build_narrative(label: CopperLabel, percent: f64, ctx: &NarrativeContext) -> Narrative {
    let pct = format_percent(percent);
    let resp = ctx.responsible_display();
    let pers = ctx.personnel_display();
    if label.is_detected() {
        Narrative {
            copper_grade: format!("Presencia de cobre detectada ({pct} % de confianza)"),
            summary: format!(
                "Se detecta PRESENCIA de vetas de cobre en la imagen con una confianza \
                 de {pct}%. Zona: {zone}. Nivel de riesgo declarado: {risk}. \
                 Responsable del registro: {resp}. Personal involucrado: {pers}.",
                zone = ctx.zone,
                risk = ctx.risk_level,
            ),
            recommendations: DETECTED_RECOMMENDATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    } else {
        Narrative {
            copper_grade: format!("Sin evidencia significativa de cobre ({pct} % de confianza)"),
            summary: format!(
                "No se detecta presencia significativa de vetas de cobre en la imagen \
                 (confianza {pct}%). Zona: {zone}. Nivel de riesgo declarado: {risk}. \
                 Responsable del registro: {resp}. Personal involucrado: {pers}.",
                zone = ctx.zone,
                risk = ctx.risk_level,
            ),
            recommendations: NOT_DETECTED_RECOMMENDATIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
