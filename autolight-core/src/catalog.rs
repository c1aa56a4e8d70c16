use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 灯具目录条目，以 `symbol_name` 作为唯一标识。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub symbol_name: String,
    pub brand: String,
    pub model_number: String,
    /// 光通量（lm）。
    pub lumens: u32,
    /// 功率（W）。
    pub wattage: f64,
    /// 光束角（度）。
    pub beam_angle: f64,
    /// 色温（K）。
    pub color_temp: u32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("目录条目缺少符号名")]
    EmptySymbol,
    #[error("目录条目 {symbol} 的 {field} 非法（值：{value}）")]
    InvalidField {
        symbol: String,
        field: &'static str,
        value: String,
    },
}

impl CatalogEntry {
    /// 校验数值字段非负且有限。
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.symbol_name.trim().is_empty() {
            return Err(CatalogError::EmptySymbol);
        }
        for (field, value) in [("wattage", self.wattage), ("beam_angle", self.beam_angle)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogError::InvalidField {
                    symbol: self.symbol_name.clone(),
                    field,
                    value: value.to_string(),
                });
            }
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(CatalogError::InvalidField {
                symbol: self.symbol_name.clone(),
                field: "unit_cost",
                value: self.unit_cost.to_string(),
            });
        }
        Ok(())
    }
}

/// 目录的只读快照，按符号名排序。
///
/// 每次流水线运行开始时获取一次，之后的符号解析都只针对该快照，
/// 不会再访问存储层。
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: BTreeMap<String, CatalogEntry>,
}

impl CatalogSnapshot {
    /// 同名条目以后出现者为准。
    pub fn new(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.symbol_name.clone(), entry))
            .collect();
        Self { entries }
    }

    #[inline]
    pub fn get(&self, symbol: &str) -> Option<&CatalogEntry> {
        self.entries.get(symbol)
    }

    /// 以符号名升序遍历。
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> + '_ {
        self.entries.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for CatalogSnapshot {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// 目录筛选条件：符号名子串（不区分大小写）与流明闭区间。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub symbol_contains: Option<String>,
    pub min_lumens: Option<u32>,
    pub max_lumens: Option<u32>,
}

impl CatalogQuery {
    pub fn symbol_contains(mut self, fragment: impl Into<String>) -> Self {
        self.symbol_contains = Some(fragment.into());
        self
    }

    pub fn lumens_between(mut self, min: u32, max: u32) -> Self {
        self.min_lumens = Some(min);
        self.max_lumens = Some(max);
        self
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(fragment) = &self.symbol_contains {
            if !entry
                .symbol_name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if self.min_lumens.is_some_and(|min| entry.lumens < min) {
            return false;
        }
        if self.max_lumens.is_some_and(|max| entry.lumens > max) {
            return false;
        }
        true
    }
}

/// 内置的示例目录，供 `catalog seed` 初始化使用。
pub fn sample_catalog() -> Vec<CatalogEntry> {
    fn entry(
        symbol_name: &str,
        model_number: &str,
        brand: &str,
        lumens: u32,
        wattage: f64,
        beam_angle: f64,
        color_temp: u32,
        cents: i64,
    ) -> CatalogEntry {
        CatalogEntry {
            symbol_name: symbol_name.to_string(),
            brand: brand.to_string(),
            model_number: model_number.to_string(),
            lumens,
            wattage,
            beam_angle,
            color_temp,
            unit_cost: Decimal::new(cents, 2),
        }
    }

    vec![
        entry("LED_PANEL_600X600", "LP-600-40W", "Philips", 4000, 40.0, 120.0, 4000, 8999),
        entry("DOWNLIGHT_12W", "DL-12W-CCT", "Osram", 1200, 12.0, 60.0, 3000, 3499),
        entry("TRACKLIGHT_20W", "TL-20W-ADJ", "GE Lighting", 2000, 20.0, 30.0, 3500, 5499),
        entry("LINEAR_LED_40W", "LL-1200-40W", "Philips", 4800, 40.0, 110.0, 4000, 7999),
        entry("HIGHBAY_150W", "HB-150W-IP65", "Cree", 18000, 150.0, 90.0, 5000, 18999),
        entry("PANEL_300X1200", "LP-1200-48W", "Osram", 5200, 48.0, 120.0, 4000, 9999),
        entry("DOWNLIGHT_8W", "DL-8W-DIM", "GE Lighting", 800, 8.0, 45.0, 2700, 2499),
        entry("BULKHEAD_18W", "BH-18W-IP54", "Philips", 1800, 18.0, 180.0, 4000, 4499),
        entry("STRIP_14W", "LS-600-14W", "Osram", 1400, 14.0, 120.0, 3000, 2999),
        entry("FLOODLIGHT_50W", "FL-50W-IP66", "Cree", 6000, 50.0, 90.0, 5000, 6999),
    ]
}
