//! 照明计算引擎：符号映射、灯具聚合、照度计算与处理流水线。

pub mod aggregate;
pub mod intake;
pub mod mapper;
pub mod pipeline;
pub mod recommend;

pub mod errors {
    use autolight_core::drawing::TransitionError;
    use autolight_io::ExtractError;
    use autolight_store::StoreError;
    use thiserror::Error;

    /// 单次处理运行中的终止性错误。任何一种都会让图纸进入 failed。
    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("无法读取图纸: {0}")]
        DocumentUnreadable(#[from] ExtractError),
        #[error("房间 {room} 的面积 {area} 超出允许范围 (0, {max_area}]")]
        RoomConstraintViolation {
            room: String,
            area: f64,
            max_area: f64,
        },
        #[error("持久化失败: {0}")]
        Persistence(#[from] StoreError),
        #[error(transparent)]
        InvalidTransition(#[from] TransitionError),
    }
}

/// 面积计算与抽取层共用同一实现。
pub mod area {
    pub use autolight_core::geometry::polygon_area;
}

pub mod illuminance {
    use autolight_core::room::{LightSource, Room};
    use rust_decimal::Decimal;
    use serde::Serialize;

    /// 光通量利用系数（维护系数与利用系数的合并近似）。
    pub const EFFICIENCY_FACTOR: f64 = 0.7;

    /// 达到目标照度所需的灯具数量，向上取整。
    ///
    /// 单灯流明不大于 0 时返回 0。
    pub fn required_fixtures(area: f64, lumens_per_fixture: f64, target_lux: f64) -> u32 {
        if lumens_per_fixture <= 0.0 || area <= 0.0 || target_lux <= 0.0 {
            return 0;
        }
        let count = (area * target_lux / (lumens_per_fixture * EFFICIENCY_FACTOR)).ceil();
        // f64 -> u32 的 `as` 转换会饱和截断
        count as u32
    }

    /// 由总光通量计算平均照度，保留两位小数。
    pub fn lux_from_lumens(area: f64, total_lumens: u64) -> f64 {
        if area <= 0.0 || total_lumens == 0 {
            return 0.0;
        }
        round2(total_lumens as f64 * EFFICIENCY_FACTOR / area)
    }

    /// 房间当前平均照度（lux）。
    pub fn current_lux<S: LightSource>(area: f64, fixtures: &[S]) -> f64 {
        let total: u64 = fixtures.iter().map(LightSource::total_lumens).sum();
        lux_from_lumens(area, total)
    }

    #[inline]
    pub fn is_adequately_lit(current_lux: f64, required_lux: f64) -> bool {
        current_lux >= required_lux
    }

    fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    /// 单个房间的照度分析结果，报表与命令行共用。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct RoomAnalysis {
        pub room_name: String,
        pub area: f64,
        pub height: f64,
        pub required_lux: f64,
        pub current_lux: f64,
        pub adequate: bool,
        pub installed_lumens: u64,
        pub fixture_quantity: u64,
        pub total_cost: Decimal,
        /// 数量最多的灯具类型还需追加多少盏才能达标；房间无灯具时为空。
        pub additional_fixtures: Option<u32>,
    }

    impl RoomAnalysis {
        pub fn of(room: &Room) -> Self {
            let current = current_lux(room.area, &room.fixtures);
            let adequate = is_adequately_lit(current, room.required_lux);
            let additional_fixtures = room
                .fixtures
                .iter()
                .max_by_key(|fixture| fixture.quantity)
                .map(|dominant| {
                    if adequate {
                        0
                    } else {
                        required_fixtures(
                            room.area,
                            f64::from(dominant.catalog.lumens),
                            room.required_lux - current,
                        )
                    }
                });

            Self {
                room_name: room.name.clone(),
                area: room.area,
                height: room.height,
                required_lux: room.required_lux,
                current_lux: current,
                adequate,
                installed_lumens: room.installed_lumens(),
                fixture_quantity: room.fixture_quantity(),
                total_cost: room.total_cost(),
                additional_fixtures,
            }
        }

        pub fn status_label(&self) -> &'static str {
            if self.adequate { "Adequate" } else { "Insufficient" }
        }
    }

}
