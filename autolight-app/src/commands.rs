use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use autolight_config::{AppConfig, PipelineConfig, RoomSelectionMode};
use autolight_core::catalog::{CatalogEntry, CatalogQuery, CatalogSnapshot, sample_catalog};
use autolight_core::drawing::{DrawingId, NewDrawing};
use autolight_core::report::ReportKind;
use autolight_core::room::{FixtureId, LightSource};
use autolight_engine::aggregate::{RoomDefaults, RoomSelection};
use autolight_engine::illuminance::RoomAnalysis;
use autolight_engine::intake::{UploadPolicy, stage_upload};
use autolight_engine::pipeline::{Pipeline, PipelineSettings, ProcessOutcome};
use autolight_engine::recommend::recommend_alternatives;
use autolight_io::DxfExtractor;
use autolight_report::{REPORTS_DIR, generate_report};
use autolight_store::{ProjectStore, SqliteStore};
use tracing::info;

use crate::{CatalogCommand, Command};

pub fn run(command: Command, config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    match command {
        Command::Catalog { action } => catalog(action, &store),
        Command::Process {
            file,
            project,
            owner,
            legend,
        } => process(
            &store,
            config,
            &file,
            project.as_deref(),
            &owner,
            legend.as_deref(),
        ),
        Command::Show { drawing, json } => show(&store, DrawingId::new(drawing), json),
        Command::Report { drawing, kind } => report(&store, config, DrawingId::new(drawing), kind),
        Command::SwapFixture { fixture, symbol } => {
            swap_fixture(&store, FixtureId::new(fixture), &symbol)
        }
    }
}

fn open_store(config: &AppConfig) -> Result<SqliteStore> {
    let path = &config.storage.database_path;
    SqliteStore::open(path).with_context(|| format!("无法打开数据库 {}", path.display()))
}

fn pipeline_settings(config: &PipelineConfig) -> PipelineSettings {
    PipelineSettings {
        rooms: RoomDefaults {
            area: config.default_room_area,
            height: config.default_room_height,
            required_lux: config.required_lux,
            max_area: config.max_room_area,
        },
        selection: match config.room_selection {
            RoomSelectionMode::First => RoomSelection::First,
            RoomSelectionMode::Largest => RoomSelection::Largest,
        },
    }
}

fn catalog(action: CatalogCommand, store: &SqliteStore) -> Result<()> {
    match action {
        CatalogCommand::Seed => {
            let entries = sample_catalog();
            for entry in &entries {
                store.upsert_catalog_entry(entry)?;
            }
            info!(count = entries.len(), "示例目录已写入");
            println!("已写入 {} 个目录条目", entries.len());
        }
        CatalogCommand::List {
            symbol,
            min_lumens,
            max_lumens,
        } => {
            let query = CatalogQuery {
                symbol_contains: symbol,
                min_lumens,
                max_lumens,
            };
            let entries = store.search_catalog(&query)?;
            println!(
                "{:<20} {:<12} {:<14} {:>7} {:>7} {:>6} {:>10}",
                "SYMBOL", "BRAND", "MODEL", "LUMENS", "WATTS", "CCT", "UNIT COST"
            );
            for entry in &entries {
                println!(
                    "{:<20} {:<12} {:<14} {:>7} {:>7.1} {:>6} {:>10.2}",
                    entry.symbol_name,
                    entry.brand,
                    entry.model_number,
                    entry.lumens,
                    entry.wattage,
                    entry.color_temp,
                    entry.unit_cost
                );
            }
            println!("共 {} 条", entries.len());
        }
        CatalogCommand::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("无法读取 {}", file.display()))?;
            let entries: Vec<CatalogEntry> = serde_json::from_str(&text)
                .with_context(|| format!("{} 不是有效的目录 JSON 数组", file.display()))?;
            for entry in &entries {
                store
                    .upsert_catalog_entry(entry)
                    .with_context(|| format!("导入 {} 失败", entry.symbol_name))?;
            }
            println!("已导入 {} 个目录条目", entries.len());
        }
    }
    Ok(())
}

fn process(
    store: &SqliteStore,
    config: &AppConfig,
    file: &Path,
    project: Option<&str>,
    owner: &str,
    legend: Option<&Path>,
) -> Result<()> {
    let legend_text = legend
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("无法读取图例 {}", path.display()))
        })
        .transpose()?;

    let policy = UploadPolicy {
        max_file_size: config.upload.max_file_size,
        allowed_extensions: config
            .upload
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect(),
    };
    let upload = policy.validate(file, legend_text.as_deref())?;
    let staged = stage_upload(&upload, &config.storage.media_root)?;

    let mut new_drawing = NewDrawing::new(owner, upload.filename.clone(), staged);
    if let Some(name) = project {
        new_drawing = new_drawing.with_project_name(name);
    }
    let drawing = store.create_drawing(&new_drawing)?;

    let extractor = DxfExtractor::new();
    let outcome = Pipeline::new(store, &extractor)
        .with_settings(pipeline_settings(&config.pipeline))
        .run(drawing.id, upload.legend.as_ref());

    match outcome {
        ProcessOutcome::Completed(summary) => {
            println!(
                "图纸 {} 处理完成：{} 个房间，{} 组灯具（共 {} 个块）",
                summary.drawing_id, summary.rooms, summary.fixtures, summary.blocks
            );
            if !summary.unresolved.is_empty() {
                println!("未匹配的块：{}", summary.unresolved.join(", "));
            }
            if summary.skipped_outlines > 0 {
                println!("已跳过 {} 个面积越界的闭合多段线", summary.skipped_outlines);
            }
            Ok(())
        }
        ProcessOutcome::Failed {
            drawing_id,
            message,
        } => bail!("图纸 {drawing_id} 处理失败：{message}"),
        ProcessOutcome::Refused { drawing_id, status } => {
            bail!("图纸 {drawing_id} 未处理（当前状态：{status:?}）")
        }
    }
}

fn show(store: &SqliteStore, id: DrawingId, json: bool) -> Result<()> {
    let Some(drawing) = store.drawing(id)? else {
        bail!("图纸 {id} 不存在");
    };
    let rooms = store.rooms(id)?;

    if json {
        let analyses: Vec<RoomAnalysis> = rooms.iter().map(RoomAnalysis::of).collect();
        println!("{}", serde_json::to_string_pretty(&analyses)?);
        return Ok(());
    }

    println!(
        "图纸 {}：{}（{}）状态 {}",
        drawing.id, drawing.project_name, drawing.filename, drawing.status
    );
    if let Some(message) = &drawing.error_message {
        println!("错误信息：{message}");
    }

    let catalog: CatalogSnapshot = store.catalog_snapshot()?;
    for room in &rooms {
        let analysis = RoomAnalysis::of(room);
        println!();
        println!(
            "[{}] 面积 {:.2} m², 层高 {:.2} m, 目标 {:.0} lux, 当前 {:.2} lux, {}",
            room.name,
            room.area,
            room.height,
            room.required_lux,
            analysis.current_lux,
            analysis.status_label()
        );
        if let Some(extra) = analysis.additional_fixtures.filter(|n| *n > 0) {
            println!("  还需约 {extra} 盏主灯具才能达标");
        }
        for fixture in &room.fixtures {
            println!(
                "  #{} {} x{}  {} lm  {:.2}",
                fixture.id,
                fixture.catalog.symbol_name,
                fixture.quantity,
                fixture.total_lumens(),
                fixture.total_cost()
            );
            let alternatives = recommend_alternatives(&fixture.catalog, catalog.iter());
            if !alternatives.is_empty() {
                let names: Vec<&str> = alternatives
                    .iter()
                    .map(|entry| entry.symbol_name.as_str())
                    .collect();
                println!("     可替换：{}", names.join(", "));
            }
        }
    }
    Ok(())
}

fn report(store: &SqliteStore, config: &AppConfig, id: DrawingId, kind: ReportKind) -> Result<()> {
    let report_dir = config.storage.media_root.join(REPORTS_DIR);
    let entry = generate_report(store, id, kind, &report_dir)?;
    println!("{}", entry.file_path.display());
    Ok(())
}

fn swap_fixture(store: &SqliteStore, fixture: FixtureId, symbol: &str) -> Result<()> {
    let updated = store.reassign_fixture(fixture, symbol)?;
    println!(
        "灯具 #{} 已替换为 {}（数量 {}，合计 {} lm）",
        updated.id,
        updated.catalog.symbol_name,
        updated.quantity,
        updated.total_lumens()
    );
    Ok(())
}
