use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use autolight_core::catalog::{CatalogEntry, CatalogQuery};
use autolight_core::drawing::{Drawing, DrawingId, DrawingStatus, NewDrawing};
use autolight_core::geometry::Point2;
use autolight_core::report::{GeneratedReport, ReportId, ReportKind};
use autolight_core::room::{FixtureId, FixtureInstallation, Room, RoomDraft, RoomId};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{ProjectStore, StoreError, migrations};

const DRAWING_COLUMNS: &str = "id, owner, project_name, filename, source_path, status, \
                               error_message, uploaded_at, processed_at";

const FIXTURE_COLUMNS: &str = "f.id, f.room_id, f.quantity, f.x_coordinate, f.y_coordinate";

const REPORT_COLUMNS: &str = "id, drawing_id, report_type, file_path, generated_at";

/// 基于 SQLite 的存储实现。克隆只复制内部 `Arc`。
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件并执行待处理的迁移。
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;
        info!(path = %path.display(), "数据库已打开");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库，主要用于测试。
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

impl ProjectStore for SqliteStore {
    fn upsert_catalog_entry(&self, entry: &CatalogEntry) -> Result<(), StoreError> {
        entry.validate()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO catalog_entries (symbol_name, brand, model_number, lumens, wattage,
                 beam_angle, color_temp, unit_cost)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (symbol_name) DO UPDATE SET
                    brand = excluded.brand,
                    model_number = excluded.model_number,
                    lumens = excluded.lumens,
                    wattage = excluded.wattage,
                    beam_angle = excluded.beam_angle,
                    color_temp = excluded.color_temp,
                    unit_cost = excluded.unit_cost,
                    updated_at = datetime('now')",
                params![
                    entry.symbol_name,
                    entry.brand,
                    entry.model_number,
                    entry.lumens,
                    entry.wattage,
                    entry.beam_angle,
                    entry.color_temp,
                    entry.unit_cost.to_string(),
                ],
            )?;
            debug!(symbol = %entry.symbol_name, "目录条目已写入");
            Ok(())
        })
    }

    fn catalog_entry(&self, symbol: &str) -> Result<Option<CatalogEntry>, StoreError> {
        self.with_conn(|conn| {
            let entry = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM catalog_entries c WHERE c.symbol_name = ?1",
                        catalog_columns()
                    ),
                    params![symbol],
                    |row| catalog_from_row(row, 0),
                )
                .optional()?;
            Ok(entry)
        })
    }

    fn search_catalog(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM catalog_entries c
                 WHERE (?1 IS NULL OR instr(lower(c.symbol_name), lower(?1)) > 0)
                   AND (?2 IS NULL OR c.lumens >= ?2)
                   AND (?3 IS NULL OR c.lumens <= ?3)
                 ORDER BY c.symbol_name",
                catalog_columns()
            ))?;
            let entries = stmt
                .query_map(
                    params![query.symbol_contains, query.min_lumens, query.max_lumens],
                    |row| catalog_from_row(row, 0),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn create_drawing(&self, drawing: &NewDrawing) -> Result<Drawing, StoreError> {
        let uploaded_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO drawings (owner, project_name, filename, source_path, status, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    drawing.owner,
                    drawing.project_name,
                    drawing.filename,
                    path_text(&drawing.source_path),
                    DrawingStatus::Pending.as_str(),
                    uploaded_at.to_rfc3339(),
                ],
            )?;
            let id = DrawingId::new(conn.last_insert_rowid());
            info!(drawing_id = id.get(), filename = %drawing.filename, "已登记上传图纸");
            Ok(Drawing {
                id,
                owner: drawing.owner.clone(),
                project_name: drawing.project_name.clone(),
                filename: drawing.filename.clone(),
                source_path: drawing.source_path.clone(),
                status: DrawingStatus::Pending,
                error_message: None,
                uploaded_at,
                processed_at: None,
            })
        })
    }

    fn drawing(&self, id: DrawingId) -> Result<Option<Drawing>, StoreError> {
        self.with_conn(|conn| {
            let drawing = conn
                .query_row(
                    &format!("SELECT {DRAWING_COLUMNS} FROM drawings WHERE id = ?1"),
                    params![id.get()],
                    drawing_from_row,
                )
                .optional()?;
            Ok(drawing)
        })
    }

    fn transition_drawing(
        &self,
        drawing: &Drawing,
        expected: DrawingStatus,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE drawings SET status = ?1, error_message = ?2, processed_at = ?3
                 WHERE id = ?4 AND status = ?5",
                params![
                    drawing.status.as_str(),
                    drawing.error_message,
                    drawing.processed_at.map(|at| at.to_rfc3339()),
                    drawing.id.get(),
                    expected.as_str(),
                ],
            )?;
            debug!(
                drawing_id = drawing.id.get(),
                from = %expected,
                to = %drawing.status,
                applied = changed == 1,
                "图纸状态比较写入"
            );
            Ok(changed == 1)
        })
    }

    fn commit_results(
        &self,
        drawing: &Drawing,
        rooms: &[RoomDraft],
    ) -> Result<Vec<RoomId>, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE drawings SET status = ?1, error_message = ?2, processed_at = ?3
                 WHERE id = ?4 AND status = ?5",
                params![
                    drawing.status.as_str(),
                    drawing.error_message,
                    drawing.processed_at.map(|at| at.to_rfc3339()),
                    drawing.id.get(),
                    DrawingStatus::Processing.as_str(),
                ],
            )?;
            if changed != 1 {
                // 事务未提交，离开作用域时自动回滚
                return Err(StoreError::StatusConflict {
                    id: drawing.id,
                    expected: DrawingStatus::Processing,
                });
            }

            let mut room_ids = Vec::with_capacity(rooms.len());
            let mut fixture_count = 0usize;
            {
                let mut insert_room = tx.prepare(
                    "INSERT INTO rooms (drawing_id, name, area, height, required_lux)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                let mut insert_fixture = tx.prepare(
                    "INSERT INTO fixtures (room_id, catalog_symbol, quantity, x_coordinate, y_coordinate)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for room in rooms {
                    let room_id = insert_room.insert(params![
                        drawing.id.get(),
                        room.name,
                        room.area,
                        room.height,
                        room.required_lux,
                    ])?;
                    for fixture in &room.fixtures {
                        insert_fixture.execute(params![
                            room_id,
                            fixture.catalog.symbol_name,
                            fixture.quantity,
                            fixture.position.map(|p| p.x()),
                            fixture.position.map(|p| p.y()),
                        ])?;
                        fixture_count += 1;
                    }
                    room_ids.push(RoomId::new(room_id));
                }
            }
            tx.commit()?;

            info!(
                drawing_id = drawing.id.get(),
                rooms = room_ids.len(),
                fixtures = fixture_count,
                "处理结果已提交"
            );
            Ok(room_ids)
        })
    }

    fn rooms(&self, drawing: DrawingId) -> Result<Vec<Room>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, drawing_id, name, area, height, required_lux
                 FROM rooms WHERE drawing_id = ?1 ORDER BY id",
            )?;
            let mut rooms = stmt
                .query_map(params![drawing.get()], |row| {
                    Ok(Room {
                        id: RoomId::new(row.get(0)?),
                        drawing_id: DrawingId::new(row.get(1)?),
                        name: row.get(2)?,
                        area: row.get(3)?,
                        height: row.get(4)?,
                        required_lux: row.get(5)?,
                        fixtures: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {FIXTURE_COLUMNS}, {}
                 FROM fixtures f
                 JOIN rooms r ON r.id = f.room_id
                 JOIN catalog_entries c ON c.symbol_name = f.catalog_symbol
                 WHERE r.drawing_id = ?1
                 ORDER BY f.id",
                catalog_columns()
            ))?;
            let fixtures = stmt
                .query_map(params![drawing.get()], fixture_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            for fixture in fixtures {
                if let Some(room) = rooms.iter_mut().find(|room| room.id == fixture.room_id) {
                    room.fixtures.push(fixture);
                }
            }
            Ok(rooms)
        })
    }

    fn reassign_fixture(
        &self,
        fixture: FixtureId,
        symbol: &str,
    ) -> Result<FixtureInstallation, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS (SELECT 1 FROM catalog_entries WHERE symbol_name = ?1)",
                params![symbol],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound {
                    entity: "目录条目",
                    key: symbol.to_string(),
                });
            }

            let changed = tx.execute(
                "UPDATE fixtures SET catalog_symbol = ?1 WHERE id = ?2",
                params![symbol, fixture.get()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound {
                    entity: "灯具",
                    key: fixture.to_string(),
                });
            }

            let updated = tx.query_row(
                &format!(
                    "SELECT {FIXTURE_COLUMNS}, {}
                     FROM fixtures f
                     JOIN catalog_entries c ON c.symbol_name = f.catalog_symbol
                     WHERE f.id = ?1",
                    catalog_columns()
                ),
                params![fixture.get()],
                fixture_from_row,
            )?;
            tx.commit()?;
            info!(fixture_id = fixture.get(), symbol, "灯具已替换为新的目录条目");
            Ok(updated)
        })
    }

    fn record_report(
        &self,
        drawing: DrawingId,
        kind: ReportKind,
        path: &Path,
    ) -> Result<GeneratedReport, StoreError> {
        let generated_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (drawing_id, report_type, file_path, generated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    drawing.get(),
                    kind.as_str(),
                    path_text(path),
                    generated_at.to_rfc3339(),
                ],
            )?;
            Ok(GeneratedReport {
                id: ReportId::new(conn.last_insert_rowid()),
                drawing_id: drawing,
                kind,
                file_path: path.to_path_buf(),
                generated_at,
            })
        })
    }

    fn reports(&self, drawing: DrawingId) -> Result<Vec<GeneratedReport>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE drawing_id = ?1
                 ORDER BY generated_at DESC, id DESC"
            ))?;
            let reports = stmt
                .query_map(params![drawing.get()], report_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(reports)
        })
    }
}

fn catalog_columns() -> &'static str {
    "c.symbol_name, c.brand, c.model_number, c.lumens, c.wattage, c.beam_angle, \
     c.color_temp, c.unit_cost"
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn parse_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| conversion_error(index, err))
}

fn catalog_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<CatalogEntry> {
    let cost: String = row.get(offset + 7)?;
    Ok(CatalogEntry {
        symbol_name: row.get(offset)?,
        brand: row.get(offset + 1)?,
        model_number: row.get(offset + 2)?,
        lumens: row.get(offset + 3)?,
        wattage: row.get(offset + 4)?,
        beam_angle: row.get(offset + 5)?,
        color_temp: row.get(offset + 6)?,
        unit_cost: Decimal::from_str(&cost).map_err(|err| conversion_error(offset + 7, err))?,
    })
}

fn fixture_from_row(row: &Row<'_>) -> rusqlite::Result<FixtureInstallation> {
    let x: Option<f64> = row.get(3)?;
    let y: Option<f64> = row.get(4)?;
    Ok(FixtureInstallation {
        id: FixtureId::new(row.get(0)?),
        room_id: RoomId::new(row.get(1)?),
        quantity: row.get(2)?,
        position: x.zip(y).map(|(x, y)| Point2::new(x, y)),
        catalog: catalog_from_row(row, 5)?,
    })
}

fn drawing_from_row(row: &Row<'_>) -> rusqlite::Result<Drawing> {
    let source_path: String = row.get(4)?;
    let status: String = row.get(5)?;
    let uploaded_at: String = row.get(7)?;
    let processed_at: Option<String> = row.get(8)?;
    Ok(Drawing {
        id: DrawingId::new(row.get(0)?),
        owner: row.get(1)?,
        project_name: row.get(2)?,
        filename: row.get(3)?,
        source_path: PathBuf::from(source_path),
        status: status
            .parse::<DrawingStatus>()
            .map_err(|err| conversion_error(5, err))?,
        error_message: row.get(6)?,
        uploaded_at: parse_timestamp(7, &uploaded_at)?,
        processed_at: processed_at
            .as_deref()
            .map(|raw| parse_timestamp(8, raw))
            .transpose()?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<GeneratedReport> {
    let kind: String = row.get(2)?;
    let file_path: String = row.get(3)?;
    let generated_at: String = row.get(4)?;
    Ok(GeneratedReport {
        id: ReportId::new(row.get(0)?),
        drawing_id: DrawingId::new(row.get(1)?),
        kind: kind
            .parse::<ReportKind>()
            .map_err(|err| conversion_error(2, err))?,
        file_path: PathBuf::from(file_path),
        generated_at: parse_timestamp(4, &generated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use autolight_core::catalog::sample_catalog;
    use autolight_core::room::{FixtureDraft, LightSource};

    use super::*;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        for entry in sample_catalog() {
            store.upsert_catalog_entry(&entry).expect("seed catalog");
        }
        store
    }

    fn processing_drawing(store: &SqliteStore) -> Drawing {
        let mut drawing = store
            .create_drawing(&NewDrawing::new("demo", "plan.dxf", "cad_files/plan.dxf"))
            .expect("create drawing");
        drawing.start_processing().unwrap();
        assert!(
            store
                .transition_drawing(&drawing, DrawingStatus::Pending)
                .unwrap()
        );
        drawing
    }

    fn draft(store: &SqliteStore, symbol: &str, quantity: u32) -> FixtureDraft {
        FixtureDraft {
            catalog: store.catalog_entry(symbol).unwrap().expect("catalog entry"),
            quantity,
            position: Some(Point2::new(1.0, 2.0)),
        }
    }

    #[test]
    fn catalog_upsert_search_and_snapshot() {
        let store = seeded_store();
        let mut panel = store
            .catalog_entry("LED_PANEL_600X600")
            .unwrap()
            .expect("panel exists");
        assert_eq!(panel.unit_cost, Decimal::new(8999, 2));

        panel.lumens = 4100;
        store.upsert_catalog_entry(&panel).unwrap();
        let snapshot = store.catalog_snapshot().unwrap();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot.get("LED_PANEL_600X600").map(|e| e.lumens), Some(4100));

        let hits = store
            .search_catalog(&CatalogQuery::default().symbol_contains("light"))
            .unwrap();
        let names: Vec<&str> = hits.iter().map(|e| e.symbol_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "DOWNLIGHT_12W",
                "DOWNLIGHT_8W",
                "FLOODLIGHT_50W",
                "TRACKLIGHT_20W"
            ]
        );

        let bright = store
            .search_catalog(&CatalogQuery::default().lumens_between(5000, 20000))
            .unwrap();
        assert_eq!(bright.len(), 3);
    }

    #[test]
    fn invalid_catalog_entry_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut entry = sample_catalog().remove(0);
        entry.beam_angle = f64::NAN;
        let err = store.upsert_catalog_entry(&entry).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCatalog(_)));
    }

    #[test]
    fn drawing_status_is_compare_and_set() {
        let store = seeded_store();
        let drawing = processing_drawing(&store);

        // 第二个流程仍以 Pending 为预期，写入应被拒绝
        let mut stale = drawing.clone();
        stale.status = DrawingStatus::Processing;
        assert!(
            !store
                .transition_drawing(&stale, DrawingStatus::Pending)
                .unwrap()
        );

        let loaded = store.drawing(drawing.id).unwrap().expect("drawing exists");
        assert_eq!(loaded.status, DrawingStatus::Processing);
        assert_eq!(loaded.uploaded_at, drawing.uploaded_at);
        assert!(store.drawing(DrawingId::new(999)).unwrap().is_none());
    }

    #[test]
    fn committed_rooms_are_read_back_with_catalog_data() {
        let store = seeded_store();
        let mut drawing = processing_drawing(&store);
        drawing.complete(Utc::now()).unwrap();

        let rooms = vec![
            RoomDraft {
                name: "Main Area".to_string(),
                area: 50.0,
                height: 3.0,
                required_lux: 300.0,
                fixtures: vec![
                    draft(&store, "DOWNLIGHT_12W", 3),
                    draft(&store, "LED_PANEL_600X600", 1),
                ],
            },
            RoomDraft {
                name: "Room 1".to_string(),
                area: 30.0,
                height: 3.0,
                required_lux: 300.0,
                fixtures: Vec::new(),
            },
        ];
        let ids = store.commit_results(&drawing, &rooms).expect("commit");
        assert_eq!(ids.len(), 2);

        let loaded = store.rooms(drawing.id).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "Main Area");
        assert_eq!(loaded[0].fixtures.len(), 2);
        assert_eq!(loaded[0].fixtures[0].total_lumens(), 3600);
        assert_eq!(loaded[0].fixtures[0].position, Some(Point2::new(1.0, 2.0)));
        assert_eq!(loaded[0].installed_lumens(), 7600);
        assert!(loaded[1].fixtures.is_empty());

        let stored = store.drawing(drawing.id).unwrap().unwrap();
        assert_eq!(stored.status, DrawingStatus::Completed);
        assert!(stored.processed_at.is_some());
    }

    #[test]
    fn commit_is_rolled_back_when_any_insert_fails() {
        let store = seeded_store();
        let mut drawing = processing_drawing(&store);
        drawing.complete(Utc::now()).unwrap();

        let mut orphan = draft(&store, "DOWNLIGHT_12W", 1);
        orphan.catalog.symbol_name = "NOT_IN_CATALOG".to_string();
        let rooms = vec![
            RoomDraft {
                name: "Main Area".to_string(),
                area: 50.0,
                height: 3.0,
                required_lux: 300.0,
                fixtures: vec![draft(&store, "DOWNLIGHT_12W", 2)],
            },
            RoomDraft {
                name: "Room 1".to_string(),
                area: 20.0,
                height: 3.0,
                required_lux: 300.0,
                fixtures: vec![orphan],
            },
        ];
        assert!(store.commit_results(&drawing, &rooms).is_err());
        assert!(store.rooms(drawing.id).unwrap().is_empty());
        let stored = store.drawing(drawing.id).unwrap().unwrap();
        assert_eq!(stored.status, DrawingStatus::Processing);
    }

    #[test]
    fn commit_requires_processing_status() {
        let store = seeded_store();
        let mut drawing = store
            .create_drawing(&NewDrawing::new("demo", "plan.dxf", "plan.dxf"))
            .unwrap();
        drawing.status = DrawingStatus::Completed;
        let err = store.commit_results(&drawing, &[]).unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
    }

    #[test]
    fn fixture_can_be_reassigned_to_another_entry() {
        let store = seeded_store();
        let mut drawing = processing_drawing(&store);
        drawing.complete(Utc::now()).unwrap();
        let rooms = vec![RoomDraft {
            name: "Main Area".to_string(),
            area: 100.0,
            height: 3.0,
            required_lux: 300.0,
            fixtures: vec![draft(&store, "DOWNLIGHT_12W", 4)],
        }];
        store.commit_results(&drawing, &rooms).unwrap();
        let fixture_id = store.rooms(drawing.id).unwrap()[0].fixtures[0].id;

        let updated = store
            .reassign_fixture(fixture_id, "DOWNLIGHT_8W")
            .expect("reassign");
        assert_eq!(updated.catalog.symbol_name, "DOWNLIGHT_8W");
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.total_cost(), Decimal::new(9996, 2));

        let err = store.reassign_fixture(fixture_id, "MISSING").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        let err = store
            .reassign_fixture(FixtureId::new(404), "DOWNLIGHT_8W")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn report_log_is_append_only_and_newest_first() {
        let store = seeded_store();
        let drawing = processing_drawing(&store);
        store
            .record_report(drawing.id, ReportKind::Csv, Path::new("reports/a.csv"))
            .unwrap();
        let second = store
            .record_report(drawing.id, ReportKind::Pdf, Path::new("reports/b.pdf"))
            .unwrap();
        let reports = store.reports(drawing.id).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, second.id);
        assert_eq!(reports[0].kind, ReportKind::Pdf);
        assert_eq!(reports[1].file_path, PathBuf::from("reports/a.csv"));
    }

    #[test]
    fn file_database_is_created_with_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("autolight.db");
        let store = SqliteStore::open(&path).expect("open file db");
        store
            .upsert_catalog_entry(&sample_catalog().remove(0))
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.catalog_snapshot().unwrap().len(), 1);
    }
}
