use std::time::Instant;

use autolight_core::drawing::{Drawing, DrawingId, DrawingStatus};
use autolight_io::GeometryExtractor;
use autolight_store::ProjectStore;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::aggregate::{
    RoomDefaults, RoomPlan, RoomSelection, attach_fixtures, group_blocks, plan_rooms,
};
use crate::errors::EngineError;
use crate::mapper::{Legend, SymbolMapper};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    pub rooms: RoomDefaults,
    pub selection: RoomSelection,
}

/// 一次成功运行的摘要。
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSummary {
    pub drawing_id: DrawingId,
    pub rooms: usize,
    pub fixtures: usize,
    pub blocks: usize,
    pub unresolved: Vec<String>,
    /// 面积越界被跳过的闭合多段线数量。
    pub skipped_outlines: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed(ProcessSummary),
    /// 运行失败，图纸已（尽可能）标记为 failed。
    Failed {
        drawing_id: DrawingId,
        message: String,
    },
    /// 图纸不存在或不处于 pending，未做任何修改。
    Refused {
        drawing_id: DrawingId,
        status: Option<DrawingStatus>,
    },
}

impl ProcessOutcome {
    #[inline]
    pub fn succeeded(&self) -> bool {
        matches!(self, ProcessOutcome::Completed(_))
    }

    pub fn drawing_id(&self) -> DrawingId {
        match self {
            ProcessOutcome::Completed(summary) => summary.drawing_id,
            ProcessOutcome::Failed { drawing_id, .. }
            | ProcessOutcome::Refused { drawing_id, .. } => *drawing_id,
        }
    }
}

/// 图纸处理流水线：抽取 → 映射 → 聚合 → 一次性提交。
///
/// `run` 从不向调用方返回错误，所有失败都体现在 [`ProcessOutcome`]
/// 与图纸的 failed 状态中。
pub struct Pipeline<'a> {
    store: &'a dyn ProjectStore,
    extractor: &'a dyn GeometryExtractor,
    mapper: SymbolMapper,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn ProjectStore, extractor: &'a dyn GeometryExtractor) -> Self {
        Self {
            store,
            extractor,
            mapper: SymbolMapper::new(),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_mapper(mut self, mapper: SymbolMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn run(&self, drawing_id: DrawingId, legend: Option<&Legend>) -> ProcessOutcome {
        let pending = match self.store.drawing(drawing_id) {
            Ok(Some(drawing)) => drawing,
            Ok(None) => {
                warn!(drawing_id = drawing_id.get(), "图纸不存在");
                return ProcessOutcome::Refused {
                    drawing_id,
                    status: None,
                };
            }
            Err(err) => {
                error!(drawing_id = drawing_id.get(), error = %err, "读取图纸失败");
                return ProcessOutcome::Failed {
                    drawing_id,
                    message: EngineError::from(err).to_string(),
                };
            }
        };

        if pending.status != DrawingStatus::Pending {
            warn!(
                drawing_id = drawing_id.get(),
                status = %pending.status,
                "图纸不处于 pending，拒绝处理"
            );
            return ProcessOutcome::Refused {
                drawing_id,
                status: Some(pending.status),
            };
        }

        let mut drawing = pending.clone();
        if let Err(err) = drawing.start_processing() {
            return self.fail(pending, DrawingStatus::Pending, EngineError::from(err));
        }
        match self.store.transition_drawing(&drawing, DrawingStatus::Pending) {
            Ok(true) => {}
            Ok(false) => {
                let status = self
                    .store
                    .drawing(drawing_id)
                    .ok()
                    .flatten()
                    .map(|current| current.status);
                warn!(drawing_id = drawing_id.get(), "图纸已被其他流程启动");
                return ProcessOutcome::Refused { drawing_id, status };
            }
            Err(err) => {
                return self.fail(pending, DrawingStatus::Pending, EngineError::from(err));
            }
        }

        info!(
            drawing_id = drawing_id.get(),
            path = %drawing.source_path.display(),
            "开始处理图纸"
        );
        let started = Instant::now();
        match self.process(&drawing, legend) {
            Ok(summary) => {
                info!(
                    drawing_id = drawing_id.get(),
                    rooms = summary.rooms,
                    fixtures = summary.fixtures,
                    unresolved = summary.unresolved.len(),
                    skipped_outlines = summary.skipped_outlines,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "图纸处理完成"
                );
                ProcessOutcome::Completed(summary)
            }
            Err(err) => self.fail(drawing, DrawingStatus::Processing, err),
        }
    }

    fn process(
        &self,
        drawing: &Drawing,
        legend: Option<&Legend>,
    ) -> Result<ProcessSummary, EngineError> {
        let extraction = self.extractor.extract(&drawing.source_path)?;
        let catalog = self.store.catalog_snapshot()?;

        let groups = group_blocks(&extraction.blocks);
        let symbols = self.mapper.map_symbols(
            groups.iter().map(|group| group.name.as_str()),
            legend,
            &catalog,
        );
        let RoomPlan { mut rooms, skipped } =
            plan_rooms(&extraction.polygons, &self.settings.rooms);
        let fixtures = attach_fixtures(&mut rooms, &groups, &symbols, self.settings.selection);

        let mut completed = drawing.clone();
        completed.complete(Utc::now())?;
        self.store.commit_results(&completed, &rooms)?;

        Ok(ProcessSummary {
            drawing_id: drawing.id,
            rooms: rooms.len(),
            fixtures,
            blocks: extraction.total_blocks(),
            unresolved: symbols.unresolved().to_vec(),
            skipped_outlines: skipped,
        })
    }

    /// 记录失败状态。写入失败只记日志，不再向上传播。
    fn fail(&self, mut drawing: Drawing, expected: DrawingStatus, err: EngineError) -> ProcessOutcome {
        let drawing_id = drawing.id;
        let message = err.to_string();
        error!(drawing_id = drawing_id.get(), error = %message, "图纸处理失败");

        match drawing.fail(message.clone()) {
            Ok(()) => match self.store.transition_drawing(&drawing, expected) {
                Ok(true) => {}
                Ok(false) => warn!(
                    drawing_id = drawing_id.get(),
                    "图纸状态已被修改，失败状态未写入"
                ),
                Err(store_err) => error!(
                    drawing_id = drawing_id.get(),
                    error = %store_err,
                    "写入失败状态时出错"
                ),
            },
            Err(transition) => error!(
                drawing_id = drawing_id.get(),
                error = %transition,
                "无法切换到 failed"
            ),
        }

        ProcessOutcome::Failed {
            drawing_id,
            message,
        }
    }
}
