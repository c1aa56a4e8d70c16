//! 上传校验与图纸文件入库。

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::mapper::Legend;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 上传文件在媒体目录下的子目录。
pub const CAD_FILES_DIR: &str = "cad_files";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("访问文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("文件 {path:?} 缺少文件名")]
    MissingFileName { path: PathBuf },
    #[error("不支持的文件类型 {filename}（允许：{allowed}）")]
    UnsupportedExtension { filename: String, allowed: String },
    #[error("文件大小 {size} 字节超过上限 {limit} 字节")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("图例格式错误: {0}")]
    InvalidLegend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    pub max_file_size: u64,
    /// 小写、不带点的扩展名。
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: vec!["dwg".to_string(), "dxf".to_string()],
        }
    }
}

/// 通过校验的上传。
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub source: PathBuf,
    pub filename: String,
    pub size: u64,
    pub legend: Option<Legend>,
}

impl UploadPolicy {
    /// 校验扩展名、文件大小与图例（可选）。
    pub fn validate(
        &self,
        path: &Path,
        legend_json: Option<&str>,
    ) -> Result<ValidatedUpload, IntakeError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| IntakeError::MissingFileName {
                path: path.to_path_buf(),
            })?;

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            return Err(IntakeError::UnsupportedExtension {
                filename,
                allowed: self.allowed_extensions.join(", "),
            });
        }

        let size = fs::metadata(path)
            .map_err(|source| IntakeError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > self.max_file_size {
            return Err(IntakeError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let legend = match legend_json.map(str::trim) {
            Some(text) if !text.is_empty() => Some(parse_legend(text)?),
            _ => None,
        };

        Ok(ValidatedUpload {
            source: path.to_path_buf(),
            filename,
            size,
            legend,
        })
    }
}

/// 图例必须是值全部为字符串的 JSON 对象。
pub fn parse_legend(text: &str) -> Result<Legend, IntakeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| IntakeError::InvalidLegend(err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(IntakeError::InvalidLegend(
            "图例必须是 JSON 对象".to_string(),
        ));
    };

    let mut legend = Legend::new();
    for (block, symbol) in map {
        match symbol {
            Value::String(symbol) => legend.insert(block, symbol),
            other => {
                return Err(IntakeError::InvalidLegend(format!(
                    "块 {block} 的映射值必须是字符串，实际为 {other}"
                )));
            }
        }
    }
    Ok(legend)
}

/// 将上传文件复制到 `<media_root>/cad_files/`，重名时追加序号。
pub fn stage_upload(upload: &ValidatedUpload, media_root: &Path) -> Result<PathBuf, IntakeError> {
    let dir = media_root.join(CAD_FILES_DIR);
    fs::create_dir_all(&dir).map_err(|source| IntakeError::Io {
        path: dir.clone(),
        source,
    })?;

    let original = Path::new(&upload.filename);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = original
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut target = dir.join(&upload.filename);
    let mut counter = 1;
    while target.exists() {
        target = dir.join(format!("{stem}_{counter}.{extension}"));
        counter += 1;
    }

    fs::copy(&upload.source, &target).map_err(|source| IntakeError::Io {
        path: target.clone(),
        source,
    })?;
    info!(target = %target.display(), size = upload.size, "图纸文件已保存");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn accepts_cad_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "Plan.DXF", b"0\nEOF\n");
        let upload = UploadPolicy::default().validate(&path, None).unwrap();
        assert_eq!(upload.filename, "Plan.DXF");
        assert_eq!(upload.size, 6);
        assert!(upload.legend.is_none());
    }

    #[test]
    fn rejects_other_extensions_and_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_file(dir.path(), "plan.pdf", b"%PDF");
        assert!(matches!(
            UploadPolicy::default().validate(&pdf, None),
            Err(IntakeError::UnsupportedExtension { .. })
        ));

        let big = write_file(dir.path(), "big.dwg", &[0u8; 64]);
        let policy = UploadPolicy {
            max_file_size: 32,
            ..UploadPolicy::default()
        };
        assert!(matches!(
            policy.validate(&big, None),
            Err(IntakeError::FileTooLarge { size: 64, limit: 32 })
        ));
    }

    #[test]
    fn legend_must_be_object_of_strings() {
        let legend = parse_legend(r#"{"DL-A": "DOWNLIGHT_12W", "PNL": "LED_PANEL_600X600"}"#)
            .expect("valid legend");
        assert_eq!(legend.len(), 2);
        assert_eq!(legend.get("DL-A"), Some("DOWNLIGHT_12W"));

        assert!(matches!(
            parse_legend(r#"["DOWNLIGHT_12W"]"#),
            Err(IntakeError::InvalidLegend(_))
        ));
        assert!(matches!(
            parse_legend(r#"{"DL-A": 12}"#),
            Err(IntakeError::InvalidLegend(_))
        ));
        assert!(parse_legend("{not json").is_err());
    }

    #[test]
    fn blank_legend_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "plan.dxf", b"");
        let upload = UploadPolicy::default().validate(&path, Some("  ")).unwrap();
        assert!(upload.legend.is_none());
    }

    #[test]
    fn staged_copies_do_not_overwrite_each_other() {
        let source_dir = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let path = write_file(source_dir.path(), "plan.dxf", b"0\nEOF\n");
        let upload = UploadPolicy::default().validate(&path, None).unwrap();

        let first = stage_upload(&upload, media.path()).unwrap();
        let second = stage_upload(&upload, media.path()).unwrap();
        assert_eq!(first, media.path().join("cad_files").join("plan.dxf"));
        assert_eq!(second, media.path().join("cad_files").join("plan_1.dxf"));
        assert_eq!(fs::read(&second).unwrap(), b"0\nEOF\n");
    }
}
