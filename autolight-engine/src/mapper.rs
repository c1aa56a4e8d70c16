use std::collections::{BTreeMap, HashMap};

use autolight_core::catalog::{CatalogEntry, CatalogSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 模糊匹配时取块名前缀的字符数。
pub const FUZZY_PREFIX_LEN: usize = 3;

/// 用户提供的图例：CAD 块名 → 目录符号名。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Legend {
    entries: BTreeMap<String, String>,
}

impl Legend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block_name: impl Into<String>, symbol: impl Into<String>) {
        self.entries.insert(block_name.into(), symbol.into());
    }

    #[inline]
    pub fn get(&self, block_name: &str) -> Option<&str> {
        self.entries.get(block_name).map(String::as_str)
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

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Legend {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(block, symbol)| (block.into(), symbol.into()))
                .collect(),
        }
    }
}

/// 单个块名的解析请求。`candidate` 为图例映射后的符号名（无图例时即块名）。
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRequest<'a> {
    pub block_name: &'a str,
    pub candidate: &'a str,
}

pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve<'c>(
        &self,
        request: &ResolutionRequest<'_>,
        catalog: &'c CatalogSnapshot,
    ) -> Option<&'c CatalogEntry>;
}

/// 候选符号名与目录完全一致。
pub struct ExactMatch;

impl ResolutionStrategy for ExactMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn resolve<'c>(
        &self,
        request: &ResolutionRequest<'_>,
        catalog: &'c CatalogSnapshot,
    ) -> Option<&'c CatalogEntry> {
        catalog.get(request.candidate)
    }
}

/// 原始块名的前三个字符（不区分大小写）出现在目录符号名中，
/// 按符号名顺序取第一个。
pub struct PrefixContainsMatch;

impl ResolutionStrategy for PrefixContainsMatch {
    fn name(&self) -> &'static str {
        "prefix_contains"
    }

    fn resolve<'c>(
        &self,
        request: &ResolutionRequest<'_>,
        catalog: &'c CatalogSnapshot,
    ) -> Option<&'c CatalogEntry> {
        let prefix: String = request
            .block_name
            .chars()
            .take(FUZZY_PREFIX_LEN)
            .collect::<String>()
            .to_lowercase();
        if prefix.is_empty() {
            return None;
        }
        catalog
            .iter()
            .find(|entry| entry.symbol_name.to_lowercase().contains(&prefix))
    }
}

/// 块名解析结果，附带命中的策略名。
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMapping {
    pub block_name: String,
    pub entry: CatalogEntry,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    resolved: HashMap<String, SymbolMapping>,
    unresolved: Vec<String>,
}

impl SymbolTable {
    #[inline]
    pub fn get(&self, block_name: &str) -> Option<&SymbolMapping> {
        self.resolved.get(block_name)
    }

    #[inline]
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    /// 未能解析的块名，保持首次出现的顺序。
    #[inline]
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }
}

/// 按注册顺序依次尝试各解析策略，第一个命中者生效。
pub struct SymbolMapper {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl SymbolMapper {
    pub fn new() -> Self {
        let mut mapper = Self::empty();
        mapper.register(ExactMatch);
        mapper.register(PrefixContainsMatch);
        mapper
    }

    /// 不含任何策略的映射器，所有块名都会解析失败。
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn register<S: ResolutionStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|strategy| strategy.name())
    }

    /// 解析单个块名。图例值优先作为候选符号名。
    pub fn resolve(
        &self,
        block_name: &str,
        legend: Option<&Legend>,
        catalog: &CatalogSnapshot,
    ) -> Option<SymbolMapping> {
        let candidate = legend
            .and_then(|legend| legend.get(block_name))
            .unwrap_or(block_name);
        let request = ResolutionRequest {
            block_name,
            candidate,
        };
        self.strategies.iter().find_map(|strategy| {
            strategy
                .resolve(&request, catalog)
                .map(|entry| SymbolMapping {
                    block_name: block_name.to_string(),
                    entry: entry.clone(),
                    strategy: strategy.name(),
                })
        })
    }

    /// 解析一组块名，重复的名称只解析一次。
    pub fn map_symbols<'a, I>(
        &self,
        block_names: I,
        legend: Option<&Legend>,
        catalog: &CatalogSnapshot,
    ) -> SymbolTable
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = SymbolTable::default();
        for name in block_names {
            if table.resolved.contains_key(name) || table.unresolved.iter().any(|n| n == name) {
                continue;
            }
            match self.resolve(name, legend, catalog) {
                Some(mapping) => {
                    debug!(
                        block = name,
                        symbol = %mapping.entry.symbol_name,
                        strategy = mapping.strategy,
                        "块名已解析"
                    );
                    table.resolved.insert(name.to_string(), mapping);
                }
                None => {
                    warn!(block = name, "块名未匹配任何目录条目，已忽略");
                    table.unresolved.push(name.to_string());
                }
            }
        }
        table
    }
}

impl Default for SymbolMapper {
    fn default() -> Self {
        Self::new()
    }
}
