//! Disk spill for large history payloads. Large captured blocks (removed row
//! blocks, visibility mask slices, size-vector slices) are written to a
//! `.ersnap` file rather than held in memory for the lifetime of the undo
//! stack; the command only stores the path.
//!
//! `.ersnap` is a small self-contained uncompressed columnar format — not a
//! real parquet file — standing in for the external parquet writer the
//! original engine spills history payloads through.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::column::{CellValue, Column, DType};
use crate::error::{EngineError, EngineResult};
use crate::frame::ColumnName;

/// Supplies fresh writable paths for spill files; injected so tests can
/// redirect spills to a scratch directory and assert cleanup.
pub trait TempFilePath {
    fn fresh_path(&self) -> PathBuf;
}

/// Default provider: `std::env::temp_dir()` with a counter-suffixed name.
pub struct OsTempFilePath {
    prefix: String,
    counter: std::sync::atomic::AtomicU64,
}

impl OsTempFilePath {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), counter: std::sync::atomic::AtomicU64::new(0) }
    }
}

impl Default for OsTempFilePath {
    fn default() -> Self {
        Self::new("grid-engine")
    }
}

impl TempFilePath for OsTempFilePath {
    fn fresh_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        std::env::temp_dir().join(format!("{}-{}-{}.ersnap", self.prefix, std::process::id(), n))
    }
}

fn dtype_tag(dtype: DType) -> u8 {
    match dtype {
        DType::Null => 0,
        DType::Bool => 1,
        DType::I8 => 2,
        DType::I16 => 3,
        DType::I32 => 4,
        DType::I64 => 5,
        DType::U8 => 6,
        DType::U16 => 7,
        DType::U32 => 8,
        DType::U64 => 9,
        DType::F32 => 10,
        DType::F64 => 11,
        DType::Decimal { .. } => 12,
        DType::Utf8 => 13,
        DType::Date => 14,
        DType::Time => 15,
        DType::Datetime => 16,
        DType::Categorical => 17,
    }
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// Serializes a block of named columns to the `.ersnap` binary layout and
/// writes it to `path`.
pub fn write_block(path: &Path, block: &[(ColumnName, Column)]) -> EngineResult<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"ERSNAP1\0");
    buf.extend_from_slice(&(block.len() as u32).to_le_bytes());
    for (name, col) in block {
        write_len_prefixed(&mut buf, name.as_bytes());
        buf.push(dtype_tag(col.dtype()));
        let scale = if let Column::Decimal(_, s) = col { *s } else { 0 };
        buf.push(scale);
        buf.extend_from_slice(&(col.len() as u32).to_le_bytes());
        for row in 0..col.len() {
            let v = col.get(row);
            match v {
                CellValue::Null => buf.push(0),
                other => {
                    buf.push(1);
                    let s = other.to_display_string();
                    write_len_prefixed(&mut buf, s.as_bytes());
                }
            }
        }
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(&buf)?;
    Ok(())
}

/// Reads back a block written by [`write_block`].
pub fn read_block(path: &Path) -> EngineResult<Vec<(ColumnName, Column)>> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    let mut cursor = 0usize;

    fn take<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize) -> &'a [u8] {
        let slice = &bytes[*cursor..*cursor + n];
        *cursor += n;
        slice
    }
    fn take_u32(bytes: &[u8], cursor: &mut usize) -> u32 {
        u32::from_le_bytes(take(bytes, cursor, 4).try_into().unwrap())
    }
    fn take_string(bytes: &[u8], cursor: &mut usize) -> EngineResult<String> {
        let len = take_u32(bytes, cursor) as usize;
        String::from_utf8(take(bytes, cursor, len).to_vec())
            .map_err(|_| EngineError::Parse { what: "spill string", text: "<invalid utf8>".into() })
    }

    if take(&bytes, &mut cursor, 8) != b"ERSNAP1\0" {
        return Err(EngineError::Parse { what: "spill header", text: "bad magic".into() });
    }
    let ncols = take_u32(&bytes, &mut cursor);
    let mut out = Vec::with_capacity(ncols as usize);
    for _ in 0..ncols {
        let name = take_string(&bytes, &mut cursor)?;
        let tag = take(&bytes, &mut cursor, 1)[0];
        let scale = take(&bytes, &mut cursor, 1)[0];
        let dtype = tag_to_dtype(tag, scale)?;
        let nrows = take_u32(&bytes, &mut cursor) as usize;
        let mut col = Column::new_null(dtype, nrows);
        for row in 0..nrows {
            let present = take(&bytes, &mut cursor, 1)[0];
            if present == 0 {
                continue;
            }
            let text = take_string(&bytes, &mut cursor)?;
            col.set(row, parse_into(dtype, &text)?)?;
        }
        out.push((name, col));
    }
    Ok(out)
}

fn tag_to_dtype(tag: u8, scale: u8) -> EngineResult<DType> {
    Ok(match tag {
        0 => DType::Null,
        1 => DType::Bool,
        2 => DType::I8,
        3 => DType::I16,
        4 => DType::I32,
        5 => DType::I64,
        6 => DType::U8,
        7 => DType::U16,
        8 => DType::U32,
        9 => DType::U64,
        10 => DType::F32,
        11 => DType::F64,
        12 => DType::Decimal { precision: 38, scale },
        13 => DType::Utf8,
        14 => DType::Date,
        15 => DType::Time,
        16 => DType::Datetime,
        17 => DType::Categorical,
        _ => return Err(EngineError::Parse { what: "spill dtype tag", text: tag.to_string() }),
    })
}

fn parse_into(dtype: DType, text: &str) -> EngineResult<CellValue> {
    let fail = || EngineError::Parse { what: "spill value", text: text.to_string() };
    Ok(match dtype {
        DType::Utf8 => CellValue::Utf8(text.to_string()),
        DType::Categorical => CellValue::Categorical(text.to_string()),
        DType::Bool => CellValue::Bool(text.parse().map_err(|_| fail())?),
        DType::I8 => CellValue::I8(text.parse().map_err(|_| fail())?),
        DType::I16 => CellValue::I16(text.parse().map_err(|_| fail())?),
        DType::I32 => CellValue::I32(text.parse().map_err(|_| fail())?),
        DType::I64 => CellValue::I64(text.parse().map_err(|_| fail())?),
        DType::U8 => CellValue::U8(text.parse().map_err(|_| fail())?),
        DType::U16 => CellValue::U16(text.parse().map_err(|_| fail())?),
        DType::U32 => CellValue::U32(text.parse().map_err(|_| fail())?),
        DType::U64 => CellValue::U64(text.parse().map_err(|_| fail())?),
        DType::F32 => CellValue::F32(text.parse().map_err(|_| fail())?),
        DType::F64 => CellValue::F64(text.parse().map_err(|_| fail())?),
        DType::Decimal { scale, .. } => CellValue::Decimal(text.parse().map_err(|_| fail())?, scale),
        DType::Date => CellValue::Date(text.parse().map_err(|_| fail())?),
        DType::Time => CellValue::Time(text.parse().map_err(|_| fail())?),
        DType::Datetime => CellValue::Datetime(text.parse().map_err(|_| fail())?),
        DType::Null => CellValue::Null,
    })
}

/// Boolean masks/size vectors are small enough to spill as a single column
/// named `_mask` / `_sizes`.
pub fn write_bool_mask(path: &Path, mask: &[bool]) -> EngineResult<()> {
    let col = Column::Bool(mask.iter().map(|&b| Some(b)).collect());
    write_block(path, &[("_mask".to_string(), col)])
}

pub fn read_bool_mask(path: &Path) -> EngineResult<Vec<bool>> {
    let block = read_block(path)?;
    let (_, col) = block.into_iter().next().ok_or_else(|| EngineError::Parse { what: "spill mask", text: "empty".into() })?;
    Ok((0..col.len()).map(|i| matches!(col.get(i), CellValue::Bool(true))).collect())
}

pub fn write_i64_vec(path: &Path, values: &[i64]) -> EngineResult<()> {
    let col = Column::I64(values.iter().map(|&v| Some(v)).collect());
    write_block(path, &[("_sizes".to_string(), col)])
}

pub fn read_i64_vec(path: &Path) -> EngineResult<Vec<i64>> {
    let block = read_block(path)?;
    let (_, col) = block.into_iter().next().ok_or_else(|| EngineError::Parse { what: "spill sizes", text: "empty".into() })?;
    Ok((0..col.len())
        .map(|i| match col.get(i) {
            CellValue::I64(v) => v,
            _ => 0,
        })
        .collect())
}

pub fn delete(path: &Path) {
    let _ = std::fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("grid-engine-test-{}", std::process::id()));
        let path = dir.with_extension("ersnap");
        let block = vec![
            ("a".to_string(), Column::I64(vec![Some(1), None, Some(3)])),
            ("b".to_string(), Column::Utf8(vec![Some("x".into()), Some("y".into()), None])),
        ];
        write_block(&path, &block).unwrap();
        let back = read_block(&path).unwrap();
        assert_eq!(back[0].1.get(0), CellValue::I64(1));
        assert_eq!(back[0].1.get(1), CellValue::Null);
        assert_eq!(back[1].1.get(0), CellValue::Utf8("x".into()));
        delete(&path);
        assert!(!path.exists());
    }
}
