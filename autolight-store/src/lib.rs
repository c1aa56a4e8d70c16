//! 持久化层：目录、图纸、房间、灯具与报表日志。
//!
//! 上层只依赖 [`ProjectStore`] trait；默认实现 [`SqliteStore`] 基于 rusqlite，
//! 所有访问通过 `Mutex<Connection>` 串行化。

use std::path::{Path, PathBuf};

use autolight_core::catalog::{CatalogEntry, CatalogError, CatalogQuery, CatalogSnapshot};
use autolight_core::drawing::{Drawing, DrawingId, DrawingStatus, NewDrawing};
use autolight_core::report::{GeneratedReport, ReportKind};
use autolight_core::room::{FixtureId, FixtureInstallation, Room, RoomDraft, RoomId};
use thiserror::Error;

mod migrations;
mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite 错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("创建目录 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("数据库迁移 v{version} 失败: {reason}")]
    Migration { version: u32, reason: String },
    #[error("数据库连接锁已中毒")]
    LockPoisoned,
    #[error("{entity} {key} 不存在")]
    NotFound { entity: &'static str, key: String },
    #[error("图纸 {id} 的状态不是 {expected}，可能已被其他流程修改")]
    StatusConflict {
        id: DrawingId,
        expected: DrawingStatus,
    },
    #[error(transparent)]
    InvalidCatalog(#[from] CatalogError),
}

/// 流水线与报表所需的最小持久化接口。
pub trait ProjectStore {
    /// 新建或更新目录条目（以符号名为键）。
    fn upsert_catalog_entry(&self, entry: &CatalogEntry) -> Result<(), StoreError>;

    fn catalog_entry(&self, symbol: &str) -> Result<Option<CatalogEntry>, StoreError>;

    /// 按符号名子串与流明范围过滤，结果按符号名排序。
    fn search_catalog(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, StoreError>;

    fn catalog_snapshot(&self) -> Result<CatalogSnapshot, StoreError> {
        Ok(CatalogSnapshot::new(
            self.search_catalog(&CatalogQuery::default())?,
        ))
    }

    fn create_drawing(&self, drawing: &NewDrawing) -> Result<Drawing, StoreError>;

    fn drawing(&self, id: DrawingId) -> Result<Option<Drawing>, StoreError>;

    /// 比较并写入：仅当库中状态仍为 `expected` 时才写入 `drawing` 的
    /// 状态、错误信息与处理时间。返回是否写入成功。
    fn transition_drawing(
        &self,
        drawing: &Drawing,
        expected: DrawingStatus,
    ) -> Result<bool, StoreError>;

    /// 在同一事务中写入全部房间与灯具，并把图纸状态从 `Processing`
    /// 更新为 `drawing.status`。任一步失败都会整体回滚。
    fn commit_results(&self, drawing: &Drawing, rooms: &[RoomDraft])
    -> Result<Vec<RoomId>, StoreError>;

    /// 按创建顺序返回图纸下的房间及其灯具。
    fn rooms(&self, drawing: DrawingId) -> Result<Vec<Room>, StoreError>;

    /// 把已安装灯具替换为另一个目录条目，数量与位置保持不变。
    fn reassign_fixture(
        &self,
        fixture: FixtureId,
        symbol: &str,
    ) -> Result<FixtureInstallation, StoreError>;

    fn record_report(
        &self,
        drawing: DrawingId,
        kind: ReportKind,
        path: &Path,
    ) -> Result<GeneratedReport, StoreError>;

    /// 最新生成的报表排在最前。
    fn reports(&self, drawing: DrawingId) -> Result<Vec<GeneratedReport>, StoreError>;
}
