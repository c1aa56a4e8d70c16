use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "AUTOLIGHT_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `AUTOLIGHT_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查数值范围，避免把明显错误的配置带入流水线。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pipeline = &self.pipeline;
        let positive = [
            ("pipeline.default_room_area", pipeline.default_room_area),
            ("pipeline.default_room_height", pipeline.default_room_height),
            ("pipeline.required_lux", pipeline.required_lux),
            ("pipeline.max_room_area", pipeline.max_room_area),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("必须为正数，实际为 {value}"),
                });
            }
        }
        if pipeline.default_room_area > pipeline.max_room_area {
            return Err(ConfigError::Invalid {
                field: "pipeline.default_room_area",
                reason: "不能大于 pipeline.max_room_area".to_string(),
            });
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::Invalid {
                field: "upload.max_file_size",
                reason: "不能为 0".to_string(),
            });
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "upload.allowed_extensions",
                reason: "至少需要一个扩展名".to_string(),
            });
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_database_path")]
    pub database_path: PathBuf,
    /// 上传图纸与报表文件的根目录。
    #[serde(default = "StorageConfig::default_media_root")]
    pub media_root: PathBuf,
}

impl StorageConfig {
    fn default_database_path() -> PathBuf {
        PathBuf::from("data/autolight.db")
    }

    fn default_media_root() -> PathBuf {
        PathBuf::from("media")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: Self::default_database_path(),
            media_root: Self::default_media_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "PipelineConfig::default_room_area")]
    pub default_room_area: f64,
    #[serde(default = "PipelineConfig::default_room_height")]
    pub default_room_height: f64,
    #[serde(default = "PipelineConfig::default_required_lux")]
    pub required_lux: f64,
    #[serde(default = "PipelineConfig::default_max_room_area")]
    pub max_room_area: f64,
    /// 灯具归属策略：`first` 或 `largest`。
    #[serde(default)]
    pub room_selection: RoomSelectionMode,
}

impl PipelineConfig {
    fn default_room_area() -> f64 {
        100.0
    }

    fn default_room_height() -> f64 {
        3.0
    }

    fn default_required_lux() -> f64 {
        300.0
    }

    fn default_max_room_area() -> f64 {
        1_000_000.0
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_room_area: Self::default_room_area(),
            default_room_height: Self::default_room_height(),
            required_lux: Self::default_required_lux(),
            max_room_area: Self::default_max_room_area(),
            room_selection: RoomSelectionMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomSelectionMode {
    #[default]
    First,
    Largest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// 单位：字节。
    #[serde(default = "UploadConfig::default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "UploadConfig::default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    fn default_max_file_size() -> u64 {
        50 * 1024 * 1024
    }

    fn default_allowed_extensions() -> Vec<String> {
        vec!["dwg".to_string(), "dxf".to_string()]
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: Self::default_max_file_size(),
            allowed_extensions: Self::default_allowed_extensions(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {field} 无效: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
