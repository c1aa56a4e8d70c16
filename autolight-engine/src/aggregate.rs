use autolight_core::geometry::Point2;
use autolight_core::room::{DEFAULT_REQUIRED_LUX, FixtureDraft, RoomDraft};
use autolight_io::{BlockInsert, ClosedPolygon};
use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::mapper::SymbolTable;

pub const MAIN_AREA: &str = "Main Area";

/// 生成房间时使用的默认值与约束。
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDefaults {
    /// 图纸中没有闭合多段线时，"Main Area" 的面积。
    pub area: f64,
    pub height: f64,
    pub required_lux: f64,
    /// 面积上限，超出视为图纸单位或几何有误。
    pub max_area: f64,
}

impl Default for RoomDefaults {
    fn default() -> Self {
        Self {
            area: 100.0,
            height: 3.0,
            required_lux: DEFAULT_REQUIRED_LUX,
            max_area: 1_000_000.0,
        }
    }
}

/// 灯具归属哪个房间。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomSelection {
    /// 全部灯具放入第一个房间。
    #[default]
    First,
    /// 全部灯具放入面积最大的房间，面积相同取靠前者。
    Largest,
}

impl RoomSelection {
    pub fn select(self, rooms: &[RoomDraft]) -> Option<usize> {
        match self {
            RoomSelection::First => (!rooms.is_empty()).then_some(0),
            RoomSelection::Largest => rooms
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f64)>, (index, room)| match best {
                    Some((_, area)) if area >= room.area => best,
                    _ => Some((index, room.area)),
                })
                .map(|(index, _)| index),
        }
    }
}

/// 同名块插入的分组。
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGroup {
    pub name: String,
    pub count: u32,
    /// 组内第一条记录的平面坐标。
    pub first_position: Point2,
}

/// 按块名分组，组顺序为块名首次出现的顺序。
pub fn group_blocks(blocks: &[BlockInsert]) -> Vec<BlockGroup> {
    let mut groups: Vec<BlockGroup> = Vec::new();
    for block in blocks {
        match groups.iter_mut().find(|group| group.name == block.name) {
            Some(group) => group.count = group.count.saturating_add(1),
            None => groups.push(BlockGroup {
                name: block.name.clone(),
                count: 1,
                first_position: block.position.xy(),
            }),
        }
    }
    groups
}

/// 房间规划结果。
#[derive(Debug, Clone, PartialEq)]
pub struct RoomPlan {
    pub rooms: Vec<RoomDraft>,
    /// 面积越界而被跳过的闭合多段线数量。
    pub skipped: usize,
}

/// 检查房间面积是否在 (0, max_area] 内。
pub fn check_room_area(name: &str, area: f64, defaults: &RoomDefaults) -> Result<(), EngineError> {
    if !area.is_finite() || area <= 0.0 || area > defaults.max_area {
        return Err(EngineError::RoomConstraintViolation {
            room: name.to_string(),
            area,
            max_area: defaults.max_area,
        });
    }
    Ok(())
}

/// 由闭合多段线生成房间草稿。面积越界的多段线记 warn 后跳过，
/// 房间名按保留下来的顺序编号；没有可用多段线时生成一个默认的 "Main Area"。
pub fn plan_rooms(polygons: &[ClosedPolygon], defaults: &RoomDefaults) -> RoomPlan {
    let mut rooms: Vec<RoomDraft> = Vec::with_capacity(polygons.len().max(1));
    let mut skipped = 0;
    for (index, polygon) in polygons.iter().enumerate() {
        let name = match rooms.len() {
            0 => MAIN_AREA.to_string(),
            n => format!("Room {n}"),
        };
        if let Err(err) = check_room_area(&name, polygon.area, defaults) {
            warn!(polygon = index, layer = %polygon.layer, error = %err, "跳过面积越界的闭合多段线");
            skipped += 1;
            continue;
        }
        rooms.push(room_draft(name, polygon.area, defaults));
    }

    if rooms.is_empty() {
        rooms.push(room_draft(MAIN_AREA.to_string(), defaults.area, defaults));
    }
    RoomPlan { rooms, skipped }
}

fn room_draft(name: String, area: f64, defaults: &RoomDefaults) -> RoomDraft {
    RoomDraft {
        name,
        area,
        height: defaults.height,
        required_lux: defaults.required_lux,
        fixtures: Vec::new(),
    }
}

/// 把已解析的分组作为灯具挂到选定房间上，返回挂载的灯具记录数。
/// 未解析的分组被跳过。
pub fn attach_fixtures(
    rooms: &mut [RoomDraft],
    groups: &[BlockGroup],
    symbols: &SymbolTable,
    selection: RoomSelection,
) -> usize {
    let Some(target) = selection.select(rooms) else {
        if !groups.is_empty() {
            warn!(groups = groups.len(), "没有可用房间，灯具未挂载");
        }
        return 0;
    };

    let room = &mut rooms[target];
    let mut attached = 0;
    for group in groups {
        let Some(mapping) = symbols.get(&group.name) else {
            continue;
        };
        room.fixtures.push(FixtureDraft {
            catalog: mapping.entry.clone(),
            quantity: group.count,
            position: Some(group.first_position),
        });
        attached += 1;
    }
    debug!(room = %room.name, fixtures = attached, "灯具已归入房间");
    attached
}
