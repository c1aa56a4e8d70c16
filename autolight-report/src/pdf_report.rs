use autolight_core::report::ReportKind;
use autolight_core::room::LightSource;
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::{ProjectReport, REPORT_TITLE, ReportError, ReportRenderer};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN_LEFT: i64 = 50;
const FIRST_BASELINE: i64 = 742;
const LEADING: i64 = 13;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Title(String),
    Heading(String),
    Text(String),
    Blank,
}

/// 纯文本排版的 PDF 报表，标题使用 Helvetica-Bold，表格使用等宽 Courier。
pub struct PdfRenderer {
    lines_per_page: usize,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self { lines_per_page: 54 }
    }
}

impl PdfRenderer {
    pub fn with_lines_per_page(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
        }
    }
}

impl ReportRenderer for PdfRenderer {
    fn kind(&self) -> ReportKind {
        ReportKind::Pdf
    }

    fn render(&self, report: &ProjectReport) -> Result<Vec<u8>, ReportError> {
        let lines = layout(report);
        let pages: Vec<&[Line]> = lines.chunks(self.lines_per_page).collect();

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let body_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let heading_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => body_font,
                "F2" => heading_font,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for page_lines in pages {
            let content = Stream::new(dictionary! {}, page_content(page_lines).into_bytes());
            let content_id = doc.add_object(content);
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
                "Resources" => resources_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|err| ReportError::Pdf(err.to_string()))?;
        Ok(buffer)
    }
}

fn layout(report: &ProjectReport) -> Vec<Line> {
    let drawing = &report.drawing;
    let mut lines = vec![
        Line::Title(REPORT_TITLE.to_string()),
        Line::Blank,
        Line::Text(format!("Project:   {}", drawing.project_name)),
        Line::Text(format!("File:      {}", drawing.filename)),
        Line::Text(format!(
            "Uploaded:  {}",
            drawing.uploaded_at.format("%Y-%m-%d %H:%M")
        )),
        Line::Text(format!("User:      {}", drawing.owner)),
        Line::Text(format!(
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M")
        )),
        Line::Blank,
        Line::Heading("Room Analysis".to_string()),
    ];

    for section in &report.rooms {
        let room = &section.room;
        let analysis = &section.analysis;
        lines.push(Line::Blank);
        lines.push(Line::Heading(room.name.clone()));
        lines.push(Line::Text(format!("Area:          {:.2} m2", room.area)));
        lines.push(Line::Text(format!("Height:        {:.2} m", room.height)));
        lines.push(Line::Text(format!(
            "Required Lux:  {:.0} lux",
            room.required_lux
        )));
        lines.push(Line::Text(format!(
            "Current Lux:   {:.0} lux",
            analysis.current_lux
        )));
        lines.push(Line::Text(format!(
            "Status:        {}",
            analysis.status_label()
        )));

        if room.fixtures.is_empty() {
            lines.push(Line::Text("No fixtures installed in this room".to_string()));
            continue;
        }
        lines.push(Line::Text(format!(
            "{:<20} {:>5} {:>8} {:>9} {:>10} {:>11}",
            "Fixture", "Qty", "Lm/Unit", "Total Lm", "Unit Cost", "Total Cost"
        )));
        for fixture in &room.fixtures {
            lines.push(Line::Text(format!(
                "{:<20} {:>5} {:>8} {:>9} {:>10} {:>11}",
                fixture.catalog.symbol_name,
                fixture.quantity,
                fixture.catalog.lumens,
                fixture.total_lumens(),
                format!("${:.2}", fixture.catalog.unit_cost),
                format!("${:.2}", fixture.total_cost()),
            )));
        }
    }

    lines.push(Line::Blank);
    lines.push(Line::Heading("Project Summary".to_string()));
    lines.push(Line::Text(format!(
        "Total Rooms:         {}",
        report.total_rooms()
    )));
    lines.push(Line::Text(format!(
        "Total Fixtures:      {}",
        report.total_fixtures()
    )));
    lines.push(Line::Text(format!(
        "Total Project Cost:  ${:.2}",
        report.total_cost()
    )));
    lines
}

fn page_content(lines: &[Line]) -> String {
    let mut content = String::new();
    content.push_str("BT\n");
    content.push_str(&format!("{MARGIN_LEFT} {FIRST_BASELINE} Td\n"));
    content.push_str(&format!("{LEADING} TL\n"));
    for line in lines {
        match line {
            Line::Title(text) => {
                content.push_str(&format!("/F2 16 Tf ({}) Tj T*\n", escape_pdf_string(text)));
            }
            Line::Heading(text) => {
                content.push_str(&format!("/F2 11 Tf ({}) Tj T*\n", escape_pdf_string(text)));
            }
            Line::Text(text) => {
                content.push_str(&format!("/F1 9 Tf ({}) Tj T*\n", escape_pdf_string(text)));
            }
            Line::Blank => content.push_str("T*\n"),
        }
    }
    content.push_str("ET\n");
    content
}

/// 标准 Type1 字体只覆盖 ASCII，其余字符替换为 `?`。
fn escape_pdf_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => escaped.push(c),
            _ => escaped.push('?'),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::test_support::completed_project;

    fn report() -> ProjectReport {
        let (store, id) = completed_project();
        ProjectReport::build(&store, id, Utc::now()).unwrap()
    }

    #[test]
    fn pdf_is_loadable_and_contains_room_data() {
        let bytes = PdfRenderer::default().render(&report()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).expect("reload pdf");
        assert_eq!(doc.get_pages().len(), 1);

        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("(Main Area) Tj"));
        assert!(raw.contains("Insufficient"));
        assert!(raw.contains("Total Project Cost:  $194.96"));
    }

    #[test]
    fn long_reports_span_multiple_pages() {
        let bytes = PdfRenderer::with_lines_per_page(10)
            .render(&report())
            .unwrap();
        let doc = Document::load_mem(&bytes).expect("reload pdf");
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn pdf_strings_are_escaped_and_ascii_only() {
        assert_eq!(escape_pdf_string("Room (A)"), "Room \\(A\\)");
        assert_eq!(escape_pdf_string("Area m²"), "Area m?");
        assert_eq!(escape_pdf_string("a\\b"), "a\\\\b");
    }
}
