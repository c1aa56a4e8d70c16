use std::fs;
use std::path::{Path, PathBuf};

use autolight_core::geometry::{Point2, Point3, polygon_area};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod binary;

use binary::BinaryPairs;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("不支持的文档格式：{0}")]
    UnsupportedFormat(String),
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

/// 块插入记录（INSERT），灯具符号一般以块的形式放置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInsert {
    pub name: String,
    pub position: Point3,
    /// 旋转角，单位为度，与 DXF 组码 50 保持一致。
    pub rotation: f64,
    pub layer: String,
}

/// 闭合多段线，作为房间边界候选。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPolygon {
    pub vertices: Vec<Point2>,
    pub area: f64,
    pub layer: String,
}

/// 单个图纸的抽取结果。只包含模型空间中的块插入与闭合多段线。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub blocks: Vec<BlockInsert>,
    pub polygons: Vec<ClosedPolygon>,
}

impl Extraction {
    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn total_rooms(&self) -> usize {
        self.polygons.len()
    }
}

pub trait GeometryExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError>;
}

pub struct DxfExtractor;

impl DxfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 直接解析内存中的 DXF 字节，支持 ASCII 与二进制 DXF。
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        if let Some(format) = detect_unsupported_format(bytes) {
            return Err(ExtractError::UnsupportedFormat(format));
        }
        let result = if bytes.starts_with(binary::SENTINEL) {
            DxfParser::new(DxfReader::binary(bytes)).parse()
        } else {
            // 旧版 DXF 常用本地代码页保存，非 UTF-8 字节按替换字符处理
            let data = String::from_utf8_lossy(bytes);
            DxfParser::new(DxfReader::text(&data)).parse()
        };
        result.map_err(|err| match err {
            DxfError::Unsupported { feature } => ExtractError::UnsupportedFormat(feature),
            DxfError::Invalid { message } => ExtractError::InvalidDocument(message),
        })
    }
}

impl Default for DxfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryExtractor for DxfExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let data = fs::read(path).map_err(|source| ExtractError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.extract_bytes(&data)
    }
}

fn detect_unsupported_format(bytes: &[u8]) -> Option<String> {
    if bytes.len() >= 6 && bytes.starts_with(b"AC10") {
        let version = String::from_utf8_lossy(&bytes[..6]).into_owned();
        return Some(format!("DWG 文件（版本 {version}）暂不支持，请导出为 DXF"));
    }
    None
}

#[derive(Debug)]
pub(crate) enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(reader: DxfReader<'a>) -> Self {
        Self { reader }
    }

    fn parse(mut self) -> Result<Extraction, DxfError> {
        let mut extraction = Extraction::default();
        let mut sections = 0usize;
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                // 注释
                continue;
            }
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    sections += 1;
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut extraction)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        if sections == 0 {
            return Err(DxfError::Unsupported {
                feature: "文件中没有任何 SECTION，可能不是 DXF 文档".to_string(),
            });
        }
        Ok(extraction)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, extraction: &mut Extraction) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "INSERT" => {
                    if let Some(block) = self.parse_insert()? {
                        extraction.blocks.push(block);
                    }
                }
                "LWPOLYLINE" => {
                    if let Some(polygon) = self.parse_lwpolyline()? {
                        extraction.polygons.push(polygon);
                    }
                }
                // ATTRIB / SEQEND 以及其他实体类型均不参与照明分析
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    /// 返回 `None` 表示实体位于图纸空间。
    fn parse_insert(&mut self) -> Result<Option<BlockInsert>, DxfError> {
        let mut layer = None;
        let mut name = None;
        let mut insert_x = None;
        let mut insert_y = None;
        let mut insert_z = None;
        let mut rotation_deg: f64 = 0.0;
        let mut paper_space = false;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    2 => {
                        if name.is_some() {
                            return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                        }
                        name = Some(value.trim().to_string());
                    }
                    10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X")?,
                    20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y")?,
                    30 => assign_coord(&mut insert_z, &value, "INSERT 插入点 Z")?,
                    50 => {
                        rotation_deg = parse_f64(&value, "INSERT 旋转角")?;
                    }
                    67 => paper_space = parse_i32(&value, "INSERT 空间标志")? == 1,
                    _ => {}
                },
                None => return Err(DxfError::invalid("INSERT 未正确结束")),
            }
        }

        let layer = layer.unwrap_or_else(|| "0".to_string());
        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;

        if paper_space {
            return Ok(None);
        }

        Ok(Some(BlockInsert {
            name,
            position: Point3::new(ix, iy, insert_z.unwrap_or(0.0)),
            rotation: rotation_deg,
            layer,
        }))
    }

    /// 仅返回模型空间中的闭合多段线；开放多段线返回 `None`。
    fn parse_lwpolyline(&mut self) -> Result<Option<ClosedPolygon>, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut paper_space = false;
        let mut vertices: Vec<Point2> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => {
                        let flag = parse_i32(&value, "LWPOLYLINE 标志")?;
                        is_closed = flag & 0x01 == 0x01;
                    }
                    67 => paper_space = parse_i32(&value, "LWPOLYLINE 空间标志")? == 1,
                    10 => {
                        let x = parse_f64(&value, "LWPOLYLINE 顶点 X")?;
                        if let Some(y) = pending_y.take() {
                            vertices.push(Point2::new(x, y));
                        } else if pending_x.replace(x).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                            ));
                        }
                    }
                    20 => {
                        let y = parse_f64(&value, "LWPOLYLINE 顶点 Y")?;
                        if let Some(x) = pending_x.take() {
                            vertices.push(Point2::new(x, y));
                        } else if pending_y.replace(y).is_some() {
                            return Err(DxfError::invalid(
                                "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                            ));
                        }
                    }
                    // 凸度（42）暂按直线段处理
                    _ => {}
                },
                None => return Err(DxfError::invalid("LWPOLYLINE 未正确结束")),
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        if vertices.is_empty() {
            return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
        }

        if !is_closed || paper_space {
            return Ok(None);
        }

        let area = polygon_area(&vertices);
        Ok(Some(ClosedPolygon {
            vertices,
            area,
            layer: layer.unwrap_or_else(|| "0".to_string()),
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    source: PairSource<'a>,
    buffer: Option<(i32, String)>,
}

enum PairSource<'a> {
    Text(TextPairs<'a>),
    Binary(BinaryPairs<'a>),
}

impl<'a> DxfReader<'a> {
    fn text(source: &'a str) -> Self {
        Self {
            source: PairSource::Text(TextPairs {
                lines: source.lines(),
                line_number: 0,
            }),
            buffer: None,
        }
    }

    fn binary(bytes: &'a [u8]) -> Self {
        Self {
            source: PairSource::Binary(BinaryPairs::new(bytes)),
            buffer: None,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }
        match &mut self.source {
            PairSource::Text(pairs) => pairs.next_pair(),
            PairSource::Binary(pairs) => pairs.next_pair(),
        }
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

struct TextPairs<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl TextPairs<'_> {
    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 容忍文件末尾或段之间的空行
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}
