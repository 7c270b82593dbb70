//! Fixed-layout PDF rendering for analysis reports.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use shared::ReportPayload;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("could not write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("document generation failed: {0}")]
    Pdf(String),
}

/// Column budget for body text. Lines break on whitespace; a word longer than
/// the budget keeps its own line rather than being split.
pub const WRAP_COLUMNS: usize = 90;

// A4 in millimeters with 2 cm margins. Vertical steps approximate the point
// leadings of the layout (14 pt body, 18 pt after the title, 16 pt after a
// section heading, 6 pt block gap).
const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TITLE_STEP_MM: f32 = 6.35;
const SECTION_STEP_MM: f32 = 5.64;
const LINE_STEP_MM: f32 = 4.94;
const BLOCK_GAP_MM: f32 = 2.12;

pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor<'_> {
    fn line(&mut self, text: &str, font: &IndirectFontRef, size: f32, step: f32) {
        if self.y < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
        self.y -= step;
    }

    fn gap(&mut self, step: f32) {
        self.y -= step;
    }
}

/// Renders the structured payload to a paginated A4 document.
#[derive(Clone)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        PdfRenderer
    }

    pub fn render(&self, payload: &ReportPayload, dest: &Path) -> Result<(), RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            "Reporte MinerIA",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        {
            let mut cursor = PageCursor {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                y: PAGE_HEIGHT_MM - MARGIN_MM,
            };

            cursor.line("MinerIA - Reporte de análisis", &bold, 14.0, TITLE_STEP_MM);
            for text in [
                format!("Fecha: {}", payload.date),
                format!("Zona: {}", payload.zone),
                format!("Categoría: {}", payload.category),
                format!("Riesgo: {}", payload.risk_level),
                format!("Ley Cu: {}", payload.copper_grade),
                format!("Estado: {}", payload.status),
            ] {
                cursor.line(&text, &regular, 10.0, LINE_STEP_MM);
            }

            cursor.gap(BLOCK_GAP_MM);
            cursor.line("Resumen IA", &bold, 12.0, SECTION_STEP_MM);
            for line in wrap_text(&payload.ai_summary, WRAP_COLUMNS) {
                cursor.line(&line, &regular, 10.0, LINE_STEP_MM);
            }

            cursor.gap(BLOCK_GAP_MM);
            cursor.line("Recomendaciones", &bold, 12.0, SECTION_STEP_MM);
            for rec in &payload.recommendations {
                for line in wrap_text(&format!("• {}", rec), WRAP_COLUMNS) {
                    cursor.line(&line, &regular, 10.0, LINE_STEP_MM);
                }
            }
        }

        let file = File::create(dest)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(())
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use shared::REPORT_SCHEMA_VERSION;

    #[test]
    fn wrap_breaks_on_whitespace_within_budget() {
        let text = "uno dos tres cuatro";
        assert_eq!(wrap_text(text, 90), vec!["uno dos tres cuatro"]);
        assert_eq!(
            wrap_text(text, 8),
            vec!["uno dos", "tres", "cuatro"]
        );
    }

    #[test]
    fn wrap_never_splits_a_word() {
        let long = "palabrainterminablementelarga";
        assert_eq!(wrap_text(long, 10), vec![long.to_string()]);
        assert_eq!(
            wrap_text(&format!("corta {long}"), 10),
            vec!["corta".to_string(), long.to_string()]
        );
    }

    #[test]
    fn wrap_collapses_runs_of_whitespace() {
        assert_eq!(wrap_text("a   b\t c", 90), vec!["a b c"]);
        assert!(wrap_text("", 90).is_empty());
        assert!(wrap_text("   ", 90).is_empty());
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        // Accented Spanish text must wrap by visible length.
        let text = "análisis según categoría minería";
        let lines = wrap_text(text, 16);
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
        assert_eq!(lines.join(" "), text);
    }

    fn sample_payload(recommendations: Vec<String>) -> ReportPayload {
        ReportPayload {
            schema_version: REPORT_SCHEMA_VERSION,
            id: 1,
            date: "2025-03-01T12:00:00+00:00".into(),
            zone: "Rajo Norte".into(),
            category: "Exploración".into(),
            risk_level: "Alto".into(),
            copper_grade: "Presencia de cobre detectada (92.0 % de confianza)".into(),
            ai_summary: "Se detecta PRESENCIA de vetas de cobre en la imagen con una \
                         confianza de 92.0%."
                .into(),
            recommendations,
            metadata: Map::new(),
            image_url: "/uploads/x.jpg".into(),
            status: "con_cobre".into(),
            pdf_path: None,
        }
    }

    #[test]
    fn render_writes_a_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("reporte_1.pdf");
        let payload = sample_payload(vec!["Derivar el registro.".into()]);
        PdfRenderer::new().render(&payload, &dest).unwrap();
        let bytes = std::fs::read(&dest).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn render_survives_content_longer_than_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("reporte_2.pdf");
        let many = (0..120)
            .map(|i| format!("Recomendación número {i} con texto suficientemente largo \
                              como para ocupar más de una línea completa del documento"))
            .collect();
        let payload = sample_payload(many);
        PdfRenderer::new().render(&payload, &dest).unwrap();
        let short_dest = dir.path().join("reporte_3.pdf");
        PdfRenderer::new()
            .render(&sample_payload(vec!["una".into()]), &short_dest)
            .unwrap();
        let long_len = std::fs::metadata(&dest).unwrap().len();
        let short_len = std::fs::metadata(&short_dest).unwrap().len();
        assert!(long_len > short_len);
    }
}
