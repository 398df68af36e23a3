//! Typed columnar storage.
//!
//! `Column` is a tagged-variant stand-in for the capability set a production
//! columnar library (polars, in the system this was ported from) provides:
//! `select`, `filter`, `with_columns`, `sort`, `cast`, `cum_sum`,
//! `search_sorted`, `arg_true`, `is_in`, `hash`. Any store implementing those
//! operations over a typed column satisfies the engine; this crate supplies
//! a minimal hand-rolled one so the engine has no external data-frame
//! dependency.

use crate::error::{EngineError, EngineResult};

#[cfg_attr(feature = "persistency", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Fixed-point decimal: `mantissa * 10^-scale`.
    Decimal(i128, u8),
    Utf8(String),
    /// Days since the Unix epoch.
    Date(i32),
    /// Nanoseconds since midnight.
    Time(i64),
    /// Milliseconds since the Unix epoch.
    Datetime(i64),
    /// Lexically-ordered label.
    Categorical(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// String form used for `SelectionChanged` notifications and search.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::I8(v) => v.to_string(),
            CellValue::I16(v) => v.to_string(),
            CellValue::I32(v) => v.to_string(),
            CellValue::I64(v) => v.to_string(),
            CellValue::U8(v) => v.to_string(),
            CellValue::U16(v) => v.to_string(),
            CellValue::U32(v) => v.to_string(),
            CellValue::U64(v) => v.to_string(),
            CellValue::F32(v) => v.to_string(),
            CellValue::F64(v) => v.to_string(),
            CellValue::Decimal(mantissa, scale) => decimal_to_string(*mantissa, *scale),
            CellValue::Utf8(s) | CellValue::Categorical(s) => s.clone(),
            CellValue::Date(v) => v.to_string(),
            CellValue::Time(v) => v.to_string(),
            CellValue::Datetime(v) => v.to_string(),
        }
    }
}

fn decimal_to_string(mantissa: i128, scale: u8) -> String {
    if scale == 0 {
        return mantissa.to_string();
    }
    let sign = if mantissa < 0 { "-" } else { "" };
    let abs = mantissa.unsigned_abs();
    let divisor = 10u128.pow(scale as u32);
    format!("{sign}{}.{:0width$}", abs / divisor, abs % divisor, width = scale as usize)
}

#[cfg_attr(feature = "persistency", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal { precision: u8, scale: u8 },
    Utf8,
    Date,
    Time,
    Datetime,
    Categorical,
}

macro_rules! numeric_column {
    ($($variant:ident($prim:ty)),+ $(,)?) => {
        #[cfg_attr(feature = "persistency", derive(serde::Serialize, serde::Deserialize))]
        #[derive(Debug, Clone, PartialEq)]
        pub enum Column {
            $($variant(Vec<Option<$prim>>),)+
            Decimal(Vec<Option<i128>>, u8),
            Utf8(Vec<Option<String>>),
            Date(Vec<Option<i32>>),
            Time(Vec<Option<i64>>),
            Datetime(Vec<Option<i64>>),
            Categorical(Vec<Option<String>>),
        }
    };
}

numeric_column!(
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
);

impl Column {
    pub fn new_null(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Null | DType::Bool => Column::Bool(vec![None; len]),
            DType::I8 => Column::I8(vec![None; len]),
            DType::I16 => Column::I16(vec![None; len]),
            DType::I32 => Column::I32(vec![None; len]),
            DType::I64 => Column::I64(vec![None; len]),
            DType::U8 => Column::U8(vec![None; len]),
            DType::U16 => Column::U16(vec![None; len]),
            DType::U32 => Column::U32(vec![None; len]),
            DType::U64 => Column::U64(vec![None; len]),
            DType::F32 => Column::F32(vec![None; len]),
            DType::F64 => Column::F64(vec![None; len]),
            DType::Decimal { scale, .. } => Column::Decimal(vec![None; len], scale),
            DType::Utf8 => Column::Utf8(vec![None; len]),
            DType::Date => Column::Date(vec![None; len]),
            DType::Time => Column::Time(vec![None; len]),
            DType::Datetime => Column::Datetime(vec![None; len]),
            DType::Categorical => Column::Categorical(vec![None; len]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Column::Bool(_) => DType::Bool,
            Column::I8(_) => DType::I8,
            Column::I16(_) => DType::I16,
            Column::I32(_) => DType::I32,
            Column::I64(_) => DType::I64,
            Column::U8(_) => DType::U8,
            Column::U16(_) => DType::U16,
            Column::U32(_) => DType::U32,
            Column::U64(_) => DType::U64,
            Column::F32(_) => DType::F32,
            Column::F64(_) => DType::F64,
            Column::Decimal(_, scale) => DType::Decimal { precision: 38, scale: *scale },
            Column::Utf8(_) => DType::Utf8,
            Column::Date(_) => DType::Date,
            Column::Time(_) => DType::Time,
            Column::Datetime(_) => DType::Datetime,
            Column::Categorical(_) => DType::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::I8(v) => v.len(),
            Column::I16(v) => v.len(),
            Column::I32(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::U8(v) => v.len(),
            Column::U16(v) => v.len(),
            Column::U32(v) => v.len(),
            Column::U64(v) => v.len(),
            Column::F32(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Decimal(v, _) => v.len(),
            Column::Utf8(v) => v.len(),
            Column::Date(v) => v.len(),
            Column::Time(v) => v.len(),
            Column::Datetime(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> CellValue {
        macro_rules! get_arm {
            ($v:expr, $ctor:ident) => {
                $v.get(row).and_then(|x| x.clone()).map_or(CellValue::Null, CellValue::$ctor)
            };
        }
        match self {
            Column::Bool(v) => get_arm!(v, Bool),
            Column::I8(v) => get_arm!(v, I8),
            Column::I16(v) => get_arm!(v, I16),
            Column::I32(v) => get_arm!(v, I32),
            Column::I64(v) => get_arm!(v, I64),
            Column::U8(v) => get_arm!(v, U8),
            Column::U16(v) => get_arm!(v, U16),
            Column::U32(v) => get_arm!(v, U32),
            Column::U64(v) => get_arm!(v, U64),
            Column::F32(v) => get_arm!(v, F32),
            Column::F64(v) => get_arm!(v, F64),
            Column::Decimal(v, scale) => v
                .get(row)
                .and_then(|x| *x)
                .map_or(CellValue::Null, |m| CellValue::Decimal(m, *scale)),
            Column::Utf8(v) => get_arm!(v, Utf8),
            Column::Date(v) => get_arm!(v, Date),
            Column::Time(v) => get_arm!(v, Time),
            Column::Datetime(v) => get_arm!(v, Datetime),
            Column::Categorical(v) => get_arm!(v, Categorical),
        }
    }

    /// Attempts to write `value` at `row`, casting if needed. Mirrors the
    /// update semantics: a failed cast only falls back to a string
    /// representation when the column itself is `Utf8`.
    pub fn set(&mut self, row: usize, value: CellValue) -> EngineResult<()> {
        if row >= self.len() {
            return Err(EngineError::OutOfRange { what: "row", index: row as i64, len: self.len() });
        }
        let cast = cast_value(&value, self.dtype()).or_else(|e| {
            if matches!(self, Column::Utf8(_)) {
                Ok(CellValue::Utf8(value.to_display_string()))
            } else {
                Err(e)
            }
        })?;
        self.write_cast(row, cast);
        Ok(())
    }

    fn write_cast(&mut self, row: usize, value: CellValue) {
        macro_rules! set_arm {
            ($v:expr, $pat:pat => $bind:expr) => {
                $v[row] = match value {
                    $pat => Some($bind),
                    CellValue::Null => None,
                    _ => unreachable!("cast_value guarantees matching variant"),
                }
            };
        }
        match self {
            Column::Bool(v) => set_arm!(v, CellValue::Bool(b) => b),
            Column::I8(v) => set_arm!(v, CellValue::I8(x) => x),
            Column::I16(v) => set_arm!(v, CellValue::I16(x) => x),
            Column::I32(v) => set_arm!(v, CellValue::I32(x) => x),
            Column::I64(v) => set_arm!(v, CellValue::I64(x) => x),
            Column::U8(v) => set_arm!(v, CellValue::U8(x) => x),
            Column::U16(v) => set_arm!(v, CellValue::U16(x) => x),
            Column::U32(v) => set_arm!(v, CellValue::U32(x) => x),
            Column::U64(v) => set_arm!(v, CellValue::U64(x) => x),
            Column::F32(v) => set_arm!(v, CellValue::F32(x) => x),
            Column::F64(v) => set_arm!(v, CellValue::F64(x) => x),
            Column::Decimal(v, _) => {
                v[row] = match value {
                    CellValue::Decimal(m, _) => Some(m),
                    CellValue::Null => None,
                    _ => unreachable!(),
                }
            }
            Column::Utf8(v) => set_arm!(v, CellValue::Utf8(x) => x),
            Column::Date(v) => set_arm!(v, CellValue::Date(x) => x),
            Column::Time(v) => set_arm!(v, CellValue::Time(x) => x),
            Column::Datetime(v) => set_arm!(v, CellValue::Datetime(x) => x),
            Column::Categorical(v) => set_arm!(v, CellValue::Categorical(x) => x),
        }
    }

    pub fn insert_nulls(&mut self, at: usize, span: usize) {
        macro_rules! splice_arm {
            ($v:expr) => {
                $v.splice(at.min($v.len())..at.min($v.len()), std::iter::repeat_n(None, span))
            };
        }
        match self {
            Column::Bool(v) => { splice_arm!(v); }
            Column::I8(v) => { splice_arm!(v); }
            Column::I16(v) => { splice_arm!(v); }
            Column::I32(v) => { splice_arm!(v); }
            Column::I64(v) => { splice_arm!(v); }
            Column::U8(v) => { splice_arm!(v); }
            Column::U16(v) => { splice_arm!(v); }
            Column::U32(v) => { splice_arm!(v); }
            Column::U64(v) => { splice_arm!(v); }
            Column::F32(v) => { splice_arm!(v); }
            Column::F64(v) => { splice_arm!(v); }
            Column::Decimal(v, _) => { splice_arm!(v); }
            Column::Utf8(v) => { splice_arm!(v); }
            Column::Date(v) => { splice_arm!(v); }
            Column::Time(v) => { splice_arm!(v); }
            Column::Datetime(v) => { splice_arm!(v); }
            Column::Categorical(v) => { splice_arm!(v); }
        }
    }

    /// Removes `[at, at+span)` and returns it as a standalone column (used to
    /// spill the removed block for undo).
    pub fn remove_range(&mut self, at: usize, span: usize) -> Column {
        let end = (at + span).min(self.len());
        let at = at.min(end);
        macro_rules! drain_arm {
            ($v:expr, $ctor:expr) => {{
                let removed: Vec<_> = $v.splice(at..end, std::iter::empty()).collect();
                $ctor(removed)
            }};
        }
        match self {
            Column::Bool(v) => drain_arm!(v, Column::Bool),
            Column::I8(v) => drain_arm!(v, Column::I8),
            Column::I16(v) => drain_arm!(v, Column::I16),
            Column::I32(v) => drain_arm!(v, Column::I32),
            Column::I64(v) => drain_arm!(v, Column::I64),
            Column::U8(v) => drain_arm!(v, Column::U8),
            Column::U16(v) => drain_arm!(v, Column::U16),
            Column::U32(v) => drain_arm!(v, Column::U32),
            Column::U64(v) => drain_arm!(v, Column::U64),
            Column::F32(v) => drain_arm!(v, Column::F32),
            Column::F64(v) => drain_arm!(v, Column::F64),
            Column::Decimal(v, scale) => {
                let removed: Vec<_> = v.splice(at..end, std::iter::empty()).collect();
                Column::Decimal(removed, *scale)
            }
            Column::Utf8(v) => drain_arm!(v, Column::Utf8),
            Column::Date(v) => drain_arm!(v, Column::Date),
            Column::Time(v) => drain_arm!(v, Column::Time),
            Column::Datetime(v) => drain_arm!(v, Column::Datetime),
            Column::Categorical(v) => drain_arm!(v, Column::Categorical),
        }
    }

    /// Splices `block` (another column of the same dtype) in at `at`.
    pub fn splice_in(&mut self, at: usize, block: Column) -> EngineResult<()> {
        if self.dtype() != block.dtype() {
            return Err(EngineError::TypeMismatch { value: format!("{block:?}"), target: self.dtype() });
        }
        macro_rules! splice_arm {
            ($v:expr, $other:expr) => {
                $v.splice(at.min($v.len())..at.min($v.len()), $other)
            };
        }
        match (self, block) {
            (Column::Bool(v), Column::Bool(o)) => { splice_arm!(v, o); }
            (Column::I8(v), Column::I8(o)) => { splice_arm!(v, o); }
            (Column::I16(v), Column::I16(o)) => { splice_arm!(v, o); }
            (Column::I32(v), Column::I32(o)) => { splice_arm!(v, o); }
            (Column::I64(v), Column::I64(o)) => { splice_arm!(v, o); }
            (Column::U8(v), Column::U8(o)) => { splice_arm!(v, o); }
            (Column::U16(v), Column::U16(o)) => { splice_arm!(v, o); }
            (Column::U32(v), Column::U32(o)) => { splice_arm!(v, o); }
            (Column::U64(v), Column::U64(o)) => { splice_arm!(v, o); }
            (Column::F32(v), Column::F32(o)) => { splice_arm!(v, o); }
            (Column::F64(v), Column::F64(o)) => { splice_arm!(v, o); }
            (Column::Decimal(v, _), Column::Decimal(o, _)) => { splice_arm!(v, o); }
            (Column::Utf8(v), Column::Utf8(o)) => { splice_arm!(v, o); }
            (Column::Date(v), Column::Date(o)) => { splice_arm!(v, o); }
            (Column::Time(v), Column::Time(o)) => { splice_arm!(v, o); }
            (Column::Datetime(v), Column::Datetime(o)) => { splice_arm!(v, o); }
            (Column::Categorical(v), Column::Categorical(o)) => { splice_arm!(v, o); }
            _ => unreachable!("dtype checked above"),
        }
        Ok(())
    }

    /// Reorders rows by `indices` (e.g. a sort permutation). `indices.len()`
    /// need not equal `self.len()`.
    pub fn take(&self, indices: &[usize]) -> Column {
        macro_rules! take_arm {
            ($v:expr, $ctor:expr) => {
                $ctor(indices.iter().map(|&i| $v[i].clone()).collect())
            };
        }
        match self {
            Column::Bool(v) => take_arm!(v, Column::Bool),
            Column::I8(v) => take_arm!(v, Column::I8),
            Column::I16(v) => take_arm!(v, Column::I16),
            Column::I32(v) => take_arm!(v, Column::I32),
            Column::I64(v) => take_arm!(v, Column::I64),
            Column::U8(v) => take_arm!(v, Column::U8),
            Column::U16(v) => take_arm!(v, Column::U16),
            Column::U32(v) => take_arm!(v, Column::U32),
            Column::U64(v) => take_arm!(v, Column::U64),
            Column::F32(v) => take_arm!(v, Column::F32),
            Column::F64(v) => take_arm!(v, Column::F64),
            Column::Decimal(v, scale) => {
                Column::Decimal(indices.iter().map(|&i| v[i]).collect(), *scale)
            }
            Column::Utf8(v) => take_arm!(v, Column::Utf8),
            Column::Date(v) => take_arm!(v, Column::Date),
            Column::Time(v) => take_arm!(v, Column::Time),
            Column::Datetime(v) => take_arm!(v, Column::Datetime),
            Column::Categorical(v) => take_arm!(v, Column::Categorical),
        }
    }

    /// Sort permutation with nulls sorted last regardless of direction.
    pub fn sort_permutation(&self, descending: bool) -> Vec<usize> {
        let n = self.len();
        let mut idx: Vec<usize> = (0..n).collect();
        idx.sort_by(|&a, &b| {
            let (va, vb) = (self.get(a), self.get(b));
            match (va.is_null(), vb.is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => {
                    let ord = compare_values(&va, &vb);
                    if descending { ord.reverse() } else { ord }
                }
            }
        });
        idx
    }

    /// Casts the entire column to `target`, failing atomically: either every
    /// row casts or none are written.
    pub fn cast(&self, target: DType) -> EngineResult<Column> {
        let mut out = Column::new_null(target, self.len());
        for row in 0..self.len() {
            let value = self.get(row);
            let cast = cast_value(&value, target)?;
            out.write_cast(row, cast);
        }
        Ok(out)
    }
}

fn compare_values(a: &CellValue, b: &CellValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        (CellValue::I8(x), CellValue::I8(y)) => x.cmp(y),
        (CellValue::I16(x), CellValue::I16(y)) => x.cmp(y),
        (CellValue::I32(x), CellValue::I32(y)) => x.cmp(y),
        (CellValue::I64(x), CellValue::I64(y)) => x.cmp(y),
        (CellValue::U8(x), CellValue::U8(y)) => x.cmp(y),
        (CellValue::U16(x), CellValue::U16(y)) => x.cmp(y),
        (CellValue::U32(x), CellValue::U32(y)) => x.cmp(y),
        (CellValue::U64(x), CellValue::U64(y)) => x.cmp(y),
        (CellValue::F32(x), CellValue::F32(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (CellValue::F64(x), CellValue::F64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (CellValue::Decimal(x, _), CellValue::Decimal(y, _)) => x.cmp(y),
        (CellValue::Utf8(x), CellValue::Utf8(y)) => x.cmp(y),
        (CellValue::Categorical(x), CellValue::Categorical(y)) => x.cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) => x.cmp(y),
        (CellValue::Time(x), CellValue::Time(y)) => x.cmp(y),
        (CellValue::Datetime(x), CellValue::Datetime(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Attempts to coerce `value` into `target`'s representation.
fn cast_value(value: &CellValue, target: DType) -> EngineResult<CellValue> {
    if value.is_null() {
        return Ok(CellValue::Null);
    }

    let fail = || EngineError::TypeMismatch { value: value.to_display_string(), target };

    macro_rules! via_i64 {
        () => {
            match value {
                CellValue::I8(v) => Some(*v as i64),
                CellValue::I16(v) => Some(*v as i64),
                CellValue::I32(v) => Some(*v as i64),
                CellValue::I64(v) => Some(*v),
                CellValue::U8(v) => Some(*v as i64),
                CellValue::U16(v) => Some(*v as i64),
                CellValue::U32(v) => Some(*v as i64),
                CellValue::U64(v) => i64::try_from(*v).ok(),
                CellValue::F32(v) if v.fract() == 0.0 => Some(*v as i64),
                CellValue::F64(v) if v.fract() == 0.0 => Some(*v as i64),
                CellValue::Utf8(s) | CellValue::Categorical(s) => s.trim().parse::<i64>().ok(),
                CellValue::Bool(b) => Some(*b as i64),
                _ => None,
            }
        };
    }

    macro_rules! via_f64 {
        () => {
            match value {
                CellValue::I8(v) => Some(*v as f64),
                CellValue::I16(v) => Some(*v as f64),
                CellValue::I32(v) => Some(*v as f64),
                CellValue::I64(v) => Some(*v as f64),
                CellValue::U8(v) => Some(*v as f64),
                CellValue::U16(v) => Some(*v as f64),
                CellValue::U32(v) => Some(*v as f64),
                CellValue::U64(v) => Some(*v as f64),
                CellValue::F32(v) => Some(*v as f64),
                CellValue::F64(v) => Some(*v),
                CellValue::Utf8(s) | CellValue::Categorical(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
        };
    }

    match target {
        DType::Null => Ok(CellValue::Null),
        DType::Bool => match value {
            CellValue::Bool(b) => Ok(CellValue::Bool(*b)),
            CellValue::Utf8(s) => s.eq_ignore_ascii_case("true").then_some(CellValue::Bool(true))
                .or_else(|| s.eq_ignore_ascii_case("false").then_some(CellValue::Bool(false)))
                .ok_or_else(fail),
            _ => via_i64!().map(|v| CellValue::Bool(v != 0)).ok_or_else(fail),
        },
        DType::I8 => via_i64!().and_then(|v| i8::try_from(v).ok()).map(CellValue::I8).ok_or_else(fail),
        DType::I16 => via_i64!().and_then(|v| i16::try_from(v).ok()).map(CellValue::I16).ok_or_else(fail),
        DType::I32 => via_i64!().and_then(|v| i32::try_from(v).ok()).map(CellValue::I32).ok_or_else(fail),
        DType::I64 => via_i64!().map(CellValue::I64).ok_or_else(fail),
        DType::U8 => via_i64!().and_then(|v| u8::try_from(v).ok()).map(CellValue::U8).ok_or_else(fail),
        DType::U16 => via_i64!().and_then(|v| u16::try_from(v).ok()).map(CellValue::U16).ok_or_else(fail),
        DType::U32 => via_i64!().and_then(|v| u32::try_from(v).ok()).map(CellValue::U32).ok_or_else(fail),
        DType::U64 => via_i64!().and_then(|v| u64::try_from(v).ok()).map(CellValue::U64).ok_or_else(fail),
        DType::F32 => via_f64!().map(|v| CellValue::F32(v as f32)).ok_or_else(fail),
        DType::F64 => via_f64!().map(CellValue::F64).ok_or_else(fail),
        DType::Decimal { scale, .. } => via_f64!()
            .map(|v| CellValue::Decimal((v * 10f64.powi(scale as i32)).round() as i128, scale))
            .ok_or_else(fail),
        DType::Utf8 => Ok(CellValue::Utf8(value.to_display_string())),
        DType::Categorical => Ok(CellValue::Categorical(value.to_display_string())),
        DType::Date => match value {
            CellValue::Date(d) => Ok(CellValue::Date(*d)),
            _ => via_i64!().map(|v| CellValue::Date(v as i32)).ok_or_else(fail),
        },
        DType::Time => match value {
            CellValue::Time(t) => Ok(CellValue::Time(*t)),
            _ => via_i64!().map(CellValue::Time).ok_or_else(fail),
        },
        DType::Datetime => match value {
            CellValue::Datetime(t) => Ok(CellValue::Datetime(*t)),
            _ => via_i64!().map(CellValue::Datetime).ok_or_else(fail),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_rejects_non_numeric_string() {
        let col = Column::Utf8(vec![Some("1".into()), Some("2".into()), Some("abc".into())]);
        assert!(col.cast(DType::I64).is_err());

        let col_ok = Column::Utf8(vec![Some("1".into()), Some("2".into())]);
        let cast = col_ok.cast(DType::I64).unwrap();
        assert_eq!(cast.get(0), CellValue::I64(1));
        assert_eq!(cast.get(1), CellValue::I64(2));
    }

    #[test]
    fn sort_permutation_nulls_last() {
        let col = Column::I64(vec![Some(3), None, Some(1), Some(2)]);
        assert_eq!(col.sort_permutation(false), vec![2, 3, 0, 1]);
        assert_eq!(col.sort_permutation(true), vec![0, 3, 2, 1]);
    }

    #[test]
    fn insert_and_remove_nulls() {
        let mut col = Column::I64(vec![Some(1), Some(2), Some(3)]);
        col.insert_nulls(1, 2);
        assert_eq!(col.len(), 5);
        assert_eq!(col.get(1), CellValue::Null);
        assert_eq!(col.get(2), CellValue::Null);
        assert_eq!(col.get(3), CellValue::I64(2));

        let removed = col.remove_range(1, 2);
        assert_eq!(removed.len(), 2);
        assert_eq!(col.len(), 3);
    }
}
