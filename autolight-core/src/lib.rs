pub mod catalog;

pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标单位与图纸一致。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 以原点为基准的二维叉积 `x1*y2 - x2*y1`，鞋带公式的单项。
        #[inline]
        pub fn perp_dot(self, other: Point2) -> f64 {
            self.0.perp_dot(other.0)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 三维点，块插入点带有 Z 坐标。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        /// 投影到 XY 平面。
        #[inline]
        pub fn xy(self) -> Point2 {
            Point2(self.0.truncate())
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 鞋带公式计算闭合多边形面积（首尾隐式相连），结果与顶点方向无关。
    /// 顶点少于 3 个时面积为 0。
    pub fn polygon_area(points: &[Point2]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let twice_signed: f64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(current, next)| current.perp_dot(*next))
            .sum();
        twice_signed.abs() / 2.0
    }

}

pub mod drawing {
    use std::fmt;
    use std::path::PathBuf;
    use std::str::FromStr;

    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct DrawingId(i64);

    impl DrawingId {
        #[inline]
        pub fn new(raw: i64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于持久化或日志输出。
        #[inline]
        pub fn get(self) -> i64 {
            self.0
        }
    }

    impl fmt::Display for DrawingId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// 图纸处理状态。只能向前推进：
    /// `Pending -> Processing -> Completed | Failed`，另允许 `Pending -> Failed`。
    /// `Completed` 与 `Failed` 均为终态。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DrawingStatus {
        Pending,
        Processing,
        Completed,
        Failed,
    }

    impl DrawingStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                DrawingStatus::Pending => "pending",
                DrawingStatus::Processing => "processing",
                DrawingStatus::Completed => "completed",
                DrawingStatus::Failed => "failed",
            }
        }

        #[inline]
        pub fn is_terminal(self) -> bool {
            matches!(self, DrawingStatus::Completed | DrawingStatus::Failed)
        }

        /// 校验并执行一次状态迁移，非法迁移返回错误且不改变任何状态。
        pub fn transition(self, to: DrawingStatus) -> Result<DrawingStatus, TransitionError> {
            use DrawingStatus::*;
            match (self, to) {
                (Pending, Processing)
                | (Processing, Completed)
                | (Pending, Failed)
                | (Processing, Failed) => Ok(to),
                (from, to) => Err(TransitionError { from, to }),
            }
        }
    }

    impl fmt::Display for DrawingStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for DrawingStatus {
        type Err = UnknownStatus;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "pending" => Ok(DrawingStatus::Pending),
                "processing" => Ok(DrawingStatus::Processing),
                "completed" => Ok(DrawingStatus::Completed),
                "failed" => Ok(DrawingStatus::Failed),
                other => Err(UnknownStatus(other.to_string())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("非法的图纸状态迁移：{from} -> {to}")]
    pub struct TransitionError {
        pub from: DrawingStatus,
        pub to: DrawingStatus,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("未知的图纸状态 \"{0}\"")]
    pub struct UnknownStatus(pub String);

    /// 上传时登记的图纸信息，尚未分配 ID。
    #[derive(Debug, Clone)]
    pub struct NewDrawing {
        pub owner: String,
        pub project_name: String,
        pub filename: String,
        pub source_path: PathBuf,
    }

    impl NewDrawing {
        pub fn new(
            owner: impl Into<String>,
            filename: impl Into<String>,
            source_path: impl Into<PathBuf>,
        ) -> Self {
            Self {
                owner: owner.into(),
                project_name: DEFAULT_PROJECT_NAME.to_string(),
                filename: filename.into(),
                source_path: source_path.into(),
            }
        }

        pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
            self.project_name = name.into();
            self
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        pub id: DrawingId,
        pub owner: String,
        pub project_name: String,
        pub filename: String,
        pub source_path: PathBuf,
        pub status: DrawingStatus,
        pub error_message: Option<String>,
        pub uploaded_at: DateTime<Utc>,
        pub processed_at: Option<DateTime<Utc>>,
    }

    impl Drawing {
        pub fn start_processing(&mut self) -> Result<(), TransitionError> {
            self.status = self.status.transition(DrawingStatus::Processing)?;
            Ok(())
        }

        pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
            self.status = self.status.transition(DrawingStatus::Completed)?;
            self.processed_at = Some(at);
            self.error_message = None;
            Ok(())
        }

        pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
            self.status = self.status.transition(DrawingStatus::Failed)?;
            self.error_message = Some(message.into());
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn pending_drawing() -> Drawing {
            Drawing {
                id: DrawingId::new(1),
                owner: "demo".to_string(),
                project_name: DEFAULT_PROJECT_NAME.to_string(),
                filename: "plan.dxf".to_string(),
                source_path: PathBuf::from("cad_files/plan.dxf"),
                status: DrawingStatus::Pending,
                error_message: None,
                uploaded_at: Utc::now(),
                processed_at: None,
            }
        }

        #[test]
        fn forward_transitions_reach_completed() {
            let mut drawing = pending_drawing();
            drawing.start_processing().expect("pending -> processing");
            let at = Utc::now();
            drawing.complete(at).expect("processing -> completed");
            assert_eq!(drawing.status, DrawingStatus::Completed);
            assert_eq!(drawing.processed_at, Some(at));
        }

        #[test]
        fn failure_is_terminal() {
            let mut drawing = pending_drawing();
            drawing.start_processing().unwrap();
            drawing.fail("无法读取").unwrap();
            assert_eq!(drawing.error_message.as_deref(), Some("无法读取"));

            let err = drawing.start_processing().unwrap_err();
            assert_eq!(err.from, DrawingStatus::Failed);
            assert!(drawing.complete(Utc::now()).is_err());
            assert!(drawing.fail("again").is_err());
            assert_eq!(drawing.status, DrawingStatus::Failed);
        }

        #[test]
        fn completed_cannot_restart_or_skip_processing() {
            assert!(
                DrawingStatus::Pending
                    .transition(DrawingStatus::Completed)
                    .is_err()
            );
            assert!(
                DrawingStatus::Completed
                    .transition(DrawingStatus::Processing)
                    .is_err()
            );
            assert!(
                DrawingStatus::Processing
                    .transition(DrawingStatus::Processing)
                    .is_err()
            );
        }

        #[test]
        fn status_round_trips_through_text() {
            for status in [
                DrawingStatus::Pending,
                DrawingStatus::Processing,
                DrawingStatus::Completed,
                DrawingStatus::Failed,
            ] {
                assert_eq!(status.as_str().parse::<DrawingStatus>(), Ok(status));
            }
            assert!("archived".parse::<DrawingStatus>().is_err());
        }
    }
}

pub mod room {
    use std::fmt;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Serialize};

    use crate::catalog::CatalogEntry;
    use crate::drawing::DrawingId;
    use crate::geometry::Point2;

    /// 未指定目标照度时采用的默认值（lux）。
    pub const DEFAULT_REQUIRED_LUX: f64 = 300.0;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct RoomId(i64);

    impl RoomId {
        #[inline]
        pub fn new(raw: i64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> i64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct FixtureId(i64);

    impl FixtureId {
        #[inline]
        pub fn new(raw: i64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> i64 {
            self.0
        }
    }

    impl fmt::Display for FixtureId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    /// 可提供光通量的对象（草稿或已安装灯具）。
    pub trait LightSource {
        fn catalog(&self) -> &CatalogEntry;
        fn quantity(&self) -> u32;

        /// 单灯流明 × 数量。
        fn total_lumens(&self) -> u64 {
            u64::from(self.catalog().lumens) * u64::from(self.quantity())
        }

        /// 单价 × 数量。
        fn total_cost(&self) -> Decimal {
            self.catalog().unit_cost * Decimal::from(self.quantity())
        }
    }

    /// 聚合阶段生成、尚未落库的灯具记录。
    #[derive(Debug, Clone, PartialEq)]
    pub struct FixtureDraft {
        pub catalog: CatalogEntry,
        pub quantity: u32,
        pub position: Option<Point2>,
    }

    impl LightSource for FixtureDraft {
        fn catalog(&self) -> &CatalogEntry {
            &self.catalog
        }

        fn quantity(&self) -> u32 {
            self.quantity
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RoomDraft {
        pub name: String,
        pub area: f64,
        pub height: f64,
        pub required_lux: f64,
        pub fixtures: Vec<FixtureDraft>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct FixtureInstallation {
        pub id: FixtureId,
        pub room_id: RoomId,
        pub catalog: CatalogEntry,
        pub quantity: u32,
        pub position: Option<Point2>,
    }

    impl LightSource for FixtureInstallation {
        fn catalog(&self) -> &CatalogEntry {
            &self.catalog
        }

        fn quantity(&self) -> u32 {
            self.quantity
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Room {
        pub id: RoomId,
        pub drawing_id: DrawingId,
        pub name: String,
        pub area: f64,
        pub height: f64,
        pub required_lux: f64,
        pub fixtures: Vec<FixtureInstallation>,
    }

    impl Room {
        /// 房间总需求流明（面积 × 目标照度），不含效率折减。
        #[inline]
        pub fn total_lumens_required(&self) -> f64 {
            self.area * self.required_lux
        }

        pub fn installed_lumens(&self) -> u64 {
            self.fixtures.iter().map(LightSource::total_lumens).sum()
        }

        pub fn fixture_quantity(&self) -> u64 {
            self.fixtures.iter().map(|f| u64::from(f.quantity)).sum()
        }

        pub fn total_cost(&self) -> Decimal {
            self.fixtures.iter().map(LightSource::total_cost).sum()
        }
    }

}

pub mod report {
    use std::fmt;
    use std::path::PathBuf;
    use std::str::FromStr;

    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::drawing::DrawingId;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct ReportId(i64);

    impl ReportId {
        #[inline]
        pub fn new(raw: i64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> i64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ReportKind {
        Pdf,
        Csv,
    }

    impl ReportKind {
        pub fn as_str(self) -> &'static str {
            match self {
                ReportKind::Pdf => "pdf",
                ReportKind::Csv => "csv",
            }
        }

        /// 报表文件扩展名与类型标识一致。
        #[inline]
        pub fn extension(self) -> &'static str {
            self.as_str()
        }
    }

    impl fmt::Display for ReportKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl FromStr for ReportKind {
        type Err = UnknownReportKind;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.to_ascii_lowercase().as_str() {
                "pdf" => Ok(ReportKind::Pdf),
                "csv" => Ok(ReportKind::Csv),
                _ => Err(UnknownReportKind(s.to_string())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("未知的报表类型 \"{0}\"（仅支持 pdf / csv）")]
    pub struct UnknownReportKind(pub String);

    /// 报表生成日志，只追加不修改。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct GeneratedReport {
        pub id: ReportId,
        pub drawing_id: DrawingId,
        pub kind: ReportKind,
        pub file_path: PathBuf,
        pub generated_at: DateTime<Utc>,
    }
}
