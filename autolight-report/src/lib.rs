//! 照明分析报表：数据汇总与 CSV / PDF 渲染。

use std::fs;
use std::path::{Path, PathBuf};

use autolight_core::drawing::{Drawing, DrawingId, DrawingStatus};
use autolight_core::report::{GeneratedReport, ReportKind};
use autolight_core::room::Room;
use autolight_engine::illuminance::RoomAnalysis;
use autolight_store::{ProjectStore, StoreError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

mod csv_report;
mod pdf_report;

pub use csv_report::CsvRenderer;
pub use pdf_report::PdfRenderer;

/// 报表在媒体目录下的子目录。
pub const REPORTS_DIR: &str = "reports";

pub const REPORT_TITLE: &str = "AutoLight Analyser Report";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("图纸 {0} 不存在")]
    DrawingNotFound(DrawingId),
    #[error("图纸 {id} 当前状态为 {status}，处理完成后才能生成报表")]
    NotReady { id: DrawingId, status: DrawingStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("CSV 写入失败: {0}")]
    Csv(#[from] csv::Error),
    #[error("PDF 生成失败: {0}")]
    Pdf(String),
    #[error("写入报表文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("报表缓冲区写入失败: {0}")]
    Buffer(#[source] std::io::Error),
}

/// 单个房间在报表中的一节。
#[derive(Debug, Clone)]
pub struct RoomSection {
    pub room: Room,
    pub analysis: RoomAnalysis,
}

/// 渲染器的输入：某张图纸已提交的全部分析数据。
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub drawing: Drawing,
    pub rooms: Vec<RoomSection>,
    pub generated_at: DateTime<Utc>,
}

impl ProjectReport {
    /// 从存储中读取已完成图纸的房间与灯具。
    pub fn build(
        store: &dyn ProjectStore,
        drawing_id: DrawingId,
        generated_at: DateTime<Utc>,
    ) -> Result<Self, ReportError> {
        let drawing = store
            .drawing(drawing_id)?
            .ok_or(ReportError::DrawingNotFound(drawing_id))?;
        if drawing.status != DrawingStatus::Completed {
            return Err(ReportError::NotReady {
                id: drawing_id,
                status: drawing.status,
            });
        }

        let rooms = store
            .rooms(drawing_id)?
            .into_iter()
            .map(|room| RoomSection {
                analysis: RoomAnalysis::of(&room),
                room,
            })
            .collect();

        Ok(Self {
            drawing,
            rooms,
            generated_at,
        })
    }

    #[inline]
    pub fn total_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// 全部灯具数量之和（按盏计）。
    pub fn total_fixtures(&self) -> u64 {
        self.rooms.iter().map(|s| s.room.fixture_quantity()).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.rooms.iter().map(|s| s.room.total_cost()).sum()
    }
}

pub trait ReportRenderer {
    fn kind(&self) -> ReportKind;
    fn render(&self, report: &ProjectReport) -> Result<Vec<u8>, ReportError>;
}

pub fn renderer_for(kind: ReportKind) -> Box<dyn ReportRenderer> {
    match kind {
        ReportKind::Csv => Box::new(CsvRenderer),
        ReportKind::Pdf => Box::new(PdfRenderer::default()),
    }
}

/// `lighting_report_<图纸 id>_<YYYYMMDD_HHMMSS>.<扩展名>`
pub fn report_file_name(drawing_id: DrawingId, kind: ReportKind, at: DateTime<Utc>) -> String {
    format!(
        "lighting_report_{}_{}.{}",
        drawing_id,
        at.format("%Y%m%d_%H%M%S"),
        kind.extension()
    )
}

/// 生成报表文件并追加生成记录。
pub fn generate_report(
    store: &dyn ProjectStore,
    drawing_id: DrawingId,
    kind: ReportKind,
    report_dir: &Path,
) -> Result<GeneratedReport, ReportError> {
    let now = Utc::now();
    let report = ProjectReport::build(store, drawing_id, now)?;
    let bytes = renderer_for(kind).render(&report)?;

    fs::create_dir_all(report_dir).map_err(|source| ReportError::Io {
        path: report_dir.to_path_buf(),
        source,
    })?;
    let path = report_dir.join(report_file_name(drawing_id, kind, now));
    fs::write(&path, &bytes).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;

    let entry = store.record_report(drawing_id, kind, &path)?;
    info!(
        drawing_id = drawing_id.get(),
        kind = %kind,
        path = %path.display(),
        bytes = bytes.len(),
        "报表已生成"
    );
    Ok(entry)
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test_support::completed_project;

    #[test]
    fn file_name_follows_timestamp_pattern() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            report_file_name(DrawingId::new(12), ReportKind::Pdf, at),
            "lighting_report_12_20240309_140507.pdf"
        );
    }

    #[test]
    fn renderer_matches_requested_kind() {
        assert_eq!(renderer_for(ReportKind::Csv).kind(), ReportKind::Csv);
        assert_eq!(renderer_for(ReportKind::Pdf).kind(), ReportKind::Pdf);
    }

    #[test]
    fn project_totals_sum_quantities_and_costs() {
        let (store, id) = completed_project();
        let report = ProjectReport::build(&store, id, Utc::now()).unwrap();
        assert_eq!(report.total_rooms(), 2);
        assert_eq!(report.total_fixtures(), 4);
        // 3 * 34.99 + 89.99
        assert_eq!(report.total_cost(), Decimal::new(19496, 2));
        assert_eq!(report.rooms[0].analysis.current_lux, 106.4);
    }

    #[test]
    fn unfinished_drawing_has_no_report() {
        let store = autolight_store::SqliteStore::open_in_memory().unwrap();
        let drawing = store
            .create_drawing(&autolight_core::drawing::NewDrawing::new(
                "bob", "plan.dxf", "plan.dxf",
            ))
            .unwrap();
        let err = ProjectReport::build(&store, drawing.id, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::NotReady {
                status: DrawingStatus::Pending,
                ..
            }
        ));
        assert!(matches!(
            ProjectReport::build(&store, DrawingId::new(77), Utc::now()),
            Err(ReportError::DrawingNotFound(_))
        ));
    }

    #[test]
    fn generated_reports_are_written_and_logged() {
        let (store, id) = completed_project();
        let dir = tempfile::tempdir().unwrap();
        let report_dir = dir.path().join(REPORTS_DIR);

        let csv = generate_report(&store, id, ReportKind::Csv, &report_dir).unwrap();
        let pdf = generate_report(&store, id, ReportKind::Pdf, &report_dir).unwrap();

        assert!(csv.file_path.exists());
        assert!(pdf.file_path.exists());
        let name = csv
            .file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        assert!(name.starts_with(&format!("lighting_report_{id}_")));
        assert!(name.ends_with(".csv"));

        let log = store.reports(id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, ReportKind::Pdf);
    }
}
