use autolight_core::report::ReportKind;
use autolight_core::room::LightSource;

use crate::{ProjectReport, REPORT_TITLE, ReportError, ReportRenderer};

/// 分节的 CSV 报表：抬头、逐房间数据、项目汇总。各节列数不同。
pub struct CsvRenderer;

impl ReportRenderer for CsvRenderer {
    fn kind(&self) -> ReportKind {
        ReportKind::Csv
    }

    fn render(&self, report: &ProjectReport) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        let drawing = &report.drawing;

        writer.write_record([REPORT_TITLE])?;
        writer.write_record(["Project:", drawing.project_name.as_str()])?;
        writer.write_record(["File:", drawing.filename.as_str()])?;
        writer.write_record([
            "Date:".to_string(),
            drawing.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
        ])?;
        writer.write_record(["User:", drawing.owner.as_str()])?;
        writer.write_record([""])?;

        for section in &report.rooms {
            let room = &section.room;
            let analysis = &section.analysis;
            writer.write_record([format!("Room: {}", room.name)])?;
            writer.write_record([
                "Area (m²)",
                "Height (m)",
                "Required Lux",
                "Current Lux",
                "Status",
            ])?;
            writer.write_record([
                format!("{:.2}", room.area),
                format!("{:.2}", room.height),
                format!("{:.0}", room.required_lux),
                format!("{:.0}", analysis.current_lux),
                analysis.status_label().to_string(),
            ])?;
            writer.write_record([""])?;

            writer.write_record([
                "Fixture",
                "Quantity",
                "Lumens/Unit",
                "Total Lumens",
                "Unit Cost",
                "Total Cost",
            ])?;
            for fixture in &room.fixtures {
                writer.write_record([
                    fixture.catalog.symbol_name.clone(),
                    fixture.quantity.to_string(),
                    fixture.catalog.lumens.to_string(),
                    fixture.total_lumens().to_string(),
                    format!("{:.2}", fixture.catalog.unit_cost),
                    format!("{:.2}", fixture.total_cost()),
                ])?;
            }
            writer.write_record([""])?;
        }

        writer.write_record(["Summary"])?;
        writer.write_record(["Total Rooms".to_string(), report.total_rooms().to_string()])?;
        writer.write_record([
            "Total Fixtures".to_string(),
            report.total_fixtures().to_string(),
        ])?;
        writer.write_record([
            "Total Cost".to_string(),
            format!("{:.2}", report.total_cost()),
        ])?;

        writer
            .into_inner()
            .map_err(|err| ReportError::Buffer(err.into_error()))
    }
}
