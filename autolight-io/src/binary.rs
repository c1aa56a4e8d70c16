//! 二进制 DXF 的组码/值解码。输出与 ASCII 读取器相同的 `(组码, 文本值)` 对，
//! 数值按十进制文本给出，由上层解析器统一处理。

use crate::DxfError;

/// 二进制 DXF 文件头，共 22 字节。
pub(crate) const SENTINEL: &[u8] = b"AutoCAD Binary DXF\r\n\x1a\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Text,
    Double,
    Int16,
    Int32,
    Int64,
    Bool,
    Chunk,
}

fn value_kind(code: i32) -> ValueKind {
    match code {
        10..=59 | 110..=149 | 210..=239 | 460..=469 | 1010..=1059 => ValueKind::Double,
        60..=79 | 170..=179 | 270..=289 | 370..=389 | 400..=409 | 1060..=1070 => {
            ValueKind::Int16
        }
        90..=99 | 420..=429 | 440..=459 | 1071 => ValueKind::Int32,
        160..=169 => ValueKind::Int64,
        290..=299 => ValueKind::Bool,
        310..=319 | 1004 => ValueKind::Chunk,
        _ => ValueKind::Text,
    }
}

pub(crate) struct BinaryPairs<'a> {
    data: &'a [u8],
    offset: usize,
    /// R13 及以后版本组码占 2 字节，R12 为 1 字节（255 作为扩展前缀）。
    wide_codes: bool,
}

impl<'a> BinaryPairs<'a> {
    /// `bytes` 需以 [`SENTINEL`] 开头。
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        let data = &bytes[SENTINEL.len().min(bytes.len())..];
        // 第一个组码必为 0（SECTION）：宽组码下第二个字节也是 0
        let wide_codes = data.len() >= 2 && data[0] == 0 && data[1] == 0;
        Self {
            data,
            offset: 0,
            wide_codes,
        }
    }

    pub(crate) fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let code = self.read_code()?;
        let value = match value_kind(code) {
            ValueKind::Text => self.read_text()?,
            ValueKind::Double => f64::from_le_bytes(self.take_array()?).to_string(),
            ValueKind::Int16 => i16::from_le_bytes(self.take_array()?).to_string(),
            ValueKind::Int32 => i32::from_le_bytes(self.take_array()?).to_string(),
            ValueKind::Int64 => i64::from_le_bytes(self.take_array()?).to_string(),
            ValueKind::Bool => u8::from_le_bytes(self.take_array()?).to_string(),
            ValueKind::Chunk => {
                let [len] = self.take_array::<1>()?;
                self.take(len as usize)?
                    .iter()
                    .map(|byte| format!("{byte:02X}"))
                    .collect()
            }
        };
        Ok(Some((code, value)))
    }

    fn read_code(&mut self) -> Result<i32, DxfError> {
        if self.wide_codes {
            return Ok(i32::from(u16::from_le_bytes(self.take_array()?)));
        }
        match self.take_array::<1>()? {
            [255] => Ok(i32::from(u16::from_le_bytes(self.take_array()?))),
            [code] => Ok(i32::from(code)),
        }
    }

    fn read_text(&mut self) -> Result<String, DxfError> {
        let rest = &self.data[self.offset..];
        let Some(end) = rest.iter().position(|byte| *byte == 0) else {
            return Err(self.truncated());
        };
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.offset += end + 1;
        Ok(text)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DxfError> {
        let slice = self.take(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DxfError> {
        let end = self.offset + len;
        if end > self.data.len() {
            return Err(self.truncated());
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn truncated(&self) -> DxfError {
        DxfError::invalid(format!(
            "二进制 DXF 在偏移 {} 处截断",
            self.offset + SENTINEL.len()
        ))
    }
}
