use autolight_core::catalog::CatalogEntry;

pub const MAX_RECOMMENDATIONS: usize = 3;

/// 备选灯具允许的流明偏差（±20%），以百分比表示以便整数比较。
pub const LUMEN_TOLERANCE_PERCENT: u64 = 20;

/// 为已选灯具挑选最多三个流明相近的替代目录条目，不含自身。
///
/// 结果保持 `catalog` 的迭代顺序。
pub fn recommend_alternatives<'c, I>(current: &CatalogEntry, catalog: I) -> Vec<&'c CatalogEntry>
where
    I: IntoIterator<Item = &'c CatalogEntry>,
{
    let low = u64::from(current.lumens) * (100 - LUMEN_TOLERANCE_PERCENT);
    let high = u64::from(current.lumens) * (100 + LUMEN_TOLERANCE_PERCENT);

    catalog
        .into_iter()
        .filter(|entry| entry.symbol_name != current.symbol_name)
        .filter(|entry| {
            let candidate = u64::from(entry.lumens) * 100;
            (low..=high).contains(&candidate)
        })
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use autolight_core::catalog::{CatalogSnapshot, sample_catalog};

    use super::*;

    #[test]
    fn alternatives_stay_within_lumen_window() {
        let catalog = CatalogSnapshot::new(sample_catalog());
        let current = catalog.get("LED_PANEL_600X600").expect("panel");
        let names: Vec<&str> = recommend_alternatives(current, catalog.iter())
            .into_iter()
            .map(|entry| entry.symbol_name.as_str())
            .collect();
        // 4000 lm ± 20% => [3200, 4800]
        assert_eq!(names, vec!["LINEAR_LED_40W"]);
    }

    #[test]
    fn at_most_three_alternatives_are_returned() {
        let mut entries = sample_catalog();
        for (index, lumens) in [1100, 1150, 1250, 1300].into_iter().enumerate() {
            let mut entry = entries[1].clone();
            entry.symbol_name = format!("ALT_{index}");
            entry.lumens = lumens;
            entries.push(entry);
        }
        let catalog = CatalogSnapshot::new(entries);
        let current = catalog.get("DOWNLIGHT_12W").expect("downlight");
        let picks = recommend_alternatives(current, catalog.iter());
        assert_eq!(picks.len(), MAX_RECOMMENDATIONS);
        assert!(picks.iter().all(|entry| entry.symbol_name != "DOWNLIGHT_12W"));
    }

    #[test]
    fn no_alternatives_for_outlier() {
        let catalog = CatalogSnapshot::new(sample_catalog());
        let current = catalog.get("HIGHBAY_150W").expect("highbay");
        assert!(recommend_alternatives(current, catalog.iter()).is_empty());
    }
}
