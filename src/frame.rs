//! `Frame`: an ordered, named, typed columnar table.

use crate::column::{CellValue, Column, DType};
use crate::error::{EngineError, EngineResult};

pub type ColumnName = String;

#[cfg_attr(feature = "persistency", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Frame {
    names: Vec<ColumnName>,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new(columns: Vec<(ColumnName, Column)>) -> Self {
        let height = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        debug_assert!(
            columns.iter().all(|(_, c)| c.len() == height),
            "all columns of a frame must have identical length"
        );
        let (names, columns) = columns.into_iter().unzip();
        Self { names, columns }
    }

    pub fn empty() -> Self {
        Self { names: Vec::new(), columns: Vec::new() }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn schema(&self) -> impl Iterator<Item = (&str, DType)> {
        self.names.iter().map(|s| s.as_str()).zip(self.columns.iter().map(Column::dtype))
    }

    pub fn column_names(&self) -> &[ColumnName] {
        &self.names
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    pub fn column_index_by_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Smallest positive integer `N` such that `column_N` is not already a
    /// column name in this frame.
    pub fn next_auto_column_number(&self) -> usize {
        let mut max_seen = 0usize;
        for name in &self.names {
            if let Some(rest) = name.strip_prefix("column_") {
                if let Ok(n) = rest.parse::<usize>() {
                    max_seen = max_seen.max(n);
                }
            }
        }
        max_seen + 1
    }

    pub fn rename_column(&mut self, index: usize, new_name: ColumnName) -> EngineResult<()> {
        let name = self
            .names
            .get_mut(index)
            .ok_or(EngineError::OutOfRange { what: "column", index: index as i64, len: self.names.len() })?;
        *name = new_name;
        Ok(())
    }

    pub fn get(&self, col: usize, row: usize) -> CellValue {
        self.columns.get(col).map(|c| c.get(row)).unwrap_or(CellValue::Null)
    }

    pub fn set(&mut self, col: usize, row: usize, value: CellValue) -> EngineResult<()> {
        let column = self
            .columns
            .get_mut(col)
            .ok_or(EngineError::OutOfRange { what: "column", index: col as i64, len: self.columns.len() })?;
        column.set(row, value)
    }

    pub fn insert_blank_rows(&mut self, at: usize, span: usize) {
        for col in &mut self.columns {
            col.insert_nulls(at, span);
        }
    }

    /// Removes rows `[at, at+span)`, returning each column's removed slice
    /// as a standalone block for spilling.
    pub fn remove_rows(&mut self, at: usize, span: usize) -> Vec<(ColumnName, Column)> {
        self.names.iter().cloned().zip(self.columns.iter_mut().map(|c| c.remove_range(at, span))).collect()
    }

    pub fn splice_rows(&mut self, at: usize, block: Vec<(ColumnName, Column)>) -> EngineResult<()> {
        for (col, (_, data)) in self.columns.iter_mut().zip(block) {
            col.splice_in(at, data)?;
        }
        Ok(())
    }

    pub fn insert_blank_columns(&mut self, at: usize, span: usize, left: bool) {
        let height = self.height();
        let mut number = self.next_auto_column_number();
        let mut at = at;
        if left {
            at += span.saturating_sub(1);
            number += span.saturating_sub(1);
        }
        for _ in 0..span {
            let name = format!("column_{number}");
            self.names.insert(at.min(self.names.len()), name);
            self.columns.insert(at.min(self.columns.len()), Column::new_null(DType::Utf8, height));
            if !left {
                at += 1;
                number += 1;
            } else {
                number = number.saturating_sub(1);
            }
        }
    }

    pub fn remove_columns(&mut self, at: usize, span: usize) -> Vec<(ColumnName, Column)> {
        let end = (at + span).min(self.names.len());
        let at = at.min(end);
        let names: Vec<_> = self.names.drain(at..end).collect();
        let cols: Vec<_> = self.columns.drain(at..end).collect();
        names.into_iter().zip(cols).collect()
    }

    pub fn insert_columns(&mut self, at: usize, block: Vec<(ColumnName, Column)>) {
        let mut at = at.min(self.names.len());
        for (name, col) in block {
            self.names.insert(at, name);
            self.columns.insert(at, col);
            at += 1;
        }
    }

    /// Name for a duplicate of `source`: strips a trailing `_N` suffix and
    /// appends the next free `_M`.
    pub fn duplicate_name_for(&self, source: &str) -> ColumnName {
        let base = source.rfind('_').map_or(source, |i| &source[..i]);
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.names.iter().any(|x| x == &candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn sort_by(&mut self, col: usize, descending: bool) -> Vec<usize> {
        let perm = self.columns[col].sort_permutation(descending);
        for c in &mut self.columns {
            *c = c.take(&perm);
        }
        perm
    }

    /// Reorders all columns by an externally supplied permutation (used to
    /// undo a sort, or to permute a visibility mask alongside the data).
    pub fn reorder_rows(&mut self, perm: &[usize]) {
        for c in &mut self.columns {
            *c = c.take(perm);
        }
    }

    pub fn cast_columns(&mut self, at: usize, span: usize, target: DType) -> EngineResult<()> {
        let end = (at + span).min(self.columns.len());
        let mut casted = Vec::with_capacity(end - at);
        for col in &self.columns[at..end] {
            casted.push(col.cast(target)?);
        }
        for (slot, new_col) in self.columns[at..end].iter_mut().zip(casted) {
            *slot = new_col;
        }
        Ok(())
    }

    /// Boolean mask (header always true) of rows equal to `value` at `col`,
    /// conjoined with an existing mask if supplied.
    pub fn filter_mask(&self, col: usize, value: &CellValue, existing: Option<&[bool]>) -> Vec<bool> {
        let column = &self.columns[col];
        let mut mask = Vec::with_capacity(self.height());
        for row in 0..self.height() {
            let matches = &column.get(row) == value;
            let prior = existing.and_then(|m| m.get(row)).copied().unwrap_or(true);
            mask.push(matches && prior);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(vec![("a".into(), Column::I64(vec![Some(1), Some(2), Some(3)]))])
    }

    #[test]
    fn auto_column_numbering_skips_taken_names() {
        let mut f = sample();
        f.insert_blank_columns(1, 1, false);
        assert_eq!(f.column_names(), &["a", "column_1"]);
        f.insert_blank_columns(2, 1, false);
        assert_eq!(f.column_names(), &["a", "column_1", "column_2"]);
    }

    #[test]
    fn duplicate_name_strips_suffix() {
        let mut f = sample();
        f.insert_blank_columns(1, 1, false);
        assert_eq!(f.duplicate_name_for("column_1"), "column_2");
    }

    #[test]
    fn remove_rows_header_clip() {
        let mut f = sample();
        let removed = f.remove_rows(0, 2);
        assert_eq!(removed[0].1.len(), 2);
        assert_eq!(f.height(), 1);
    }
}
