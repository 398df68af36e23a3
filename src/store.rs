//! `TableStore`: placement of `Frame`s in the unbounded visual grid, and all
//! structural mutations. Grounded in `sheet_data.py`.

use tap::Tap;

use crate::cell::CellMetadata;
use crate::column::{CellValue, Column, DType};
use crate::error::EngineResult;
use crate::frame::{ColumnName, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub origin_col: i64,
    pub origin_row: i64,
    pub col_span: i64,
    pub row_span: i64,
}

impl BBox {
    fn contains(&self, col: i64, row: i64) -> bool {
        col >= self.origin_col
            && col < self.origin_col + self.col_span
            && row >= self.origin_row
            && row < self.origin_row + self.row_span
    }
}

/// One of: a single value, a batch of names, or a typed block — the
/// `replacer` shape.
pub enum Replacer {
    Scalar(CellValue),
    HeaderNames(Vec<ColumnName>),
    Block(Vec<(ColumnName, Column)>),
}

#[derive(Debug, Clone, Default)]
pub struct TableStore {
    frames: Vec<Frame>,
    bboxes: Vec<BBox>,
    filter_exprs: Vec<Option<Vec<bool>>>,
}

impl TableStore {
    pub fn with_frame(frame: Frame) -> Self {
        let bbox = BBox { origin_col: 1, origin_row: 1, col_span: frame.width() as i64, row_span: frame.height() as i64 + 1 };
        Self { frames: vec![frame], bboxes: vec![bbox], filter_exprs: vec![None] }
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn bbox(&self, index: usize) -> Option<BBox> {
        self.bboxes.get(index).copied()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn resolve(&self, col: i64, row: i64) -> CellMetadata {
        let col = col.max(1);
        let row = row.max(1);
        for (i, bbox) in self.bboxes.iter().enumerate() {
            if bbox.contains(col, row) {
                return CellMetadata {
                    frame_index: i as i64,
                    intra_col: col - bbox.origin_col,
                    intra_row: row - bbox.origin_row,
                };
            }
        }
        CellMetadata::NONE
    }

    pub fn read(&self, frame_index: usize, col: usize, row: i64, col_span: i64, row_span: i64) -> Option<Vec<Vec<CellValue>>> {
        let frame = self.frames.get(frame_index)?;
        if row < 0 {
            let end = if col_span < 0 { frame.width() } else { col + col_span.max(1) as usize };
            let names = frame.column_names()[col..end.min(frame.width())]
                .iter()
                .map(|n| CellValue::Utf8(n.clone()))
                .collect();
            return Some(vec![names]);
        }
        let row = (row - 1) as usize;
        let row_span = if row_span < 0 { frame.height() - row } else { row_span as usize };
        let col_span = if col_span < 0 { frame.width() - col } else { col_span as usize };
        let mut out = Vec::with_capacity(row_span);
        for r in row..row + row_span {
            let mut line = Vec::with_capacity(col_span);
            for c in col..col + col_span {
                line.push(frame.get(c, r));
            }
            out.push(line);
        }
        Some(out)
    }

    pub fn read_block(&self, frame_index: usize, column_names: &[ColumnName], row: i64, row_span: i64) -> Option<Vec<(ColumnName, Column)>> {
        let frame = self.frames.get(frame_index)?;
        let row0 = if row < 0 { 0 } else { (row - 1).max(0) as usize };
        let span = if row_span < 0 { frame.height() - row0 } else { row_span as usize };
        let mut out = Vec::with_capacity(column_names.len());
        for name in column_names {
            let idx = frame.column_index_by_name(name)?;
            let col = frame.column(idx)?;
            let sliced_indices: Vec<usize> = (row0..row0 + span).collect();
            out.push((name.clone(), col.take(&sliced_indices)));
        }
        Some(out)
    }

    pub fn insert_rows_blank(&mut self, frame_index: usize, at_row: usize, row_span: usize) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        frame.insert_blank_rows(at_row, row_span);
        self.bboxes[frame_index].row_span += row_span as i64;
        true
    }

    pub fn insert_rows_from_block(&mut self, frame_index: usize, at_row: usize, block: Vec<(ColumnName, Column)>) -> EngineResult<bool> {
        let Some(frame) = self.frames.get_mut(frame_index) else { return Ok(false) };
        let span = block.first().map(|(_, c)| c.len()).unwrap_or(0);
        frame.splice_rows(at_row, block)?;
        self.bboxes[frame_index].row_span += span as i64;
        Ok(true)
    }

    pub fn insert_cols_blank(&mut self, frame_index: usize, at_col: usize, col_span: usize, left: bool) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        frame.insert_blank_columns(at_col, col_span, left);
        self.bboxes[frame_index].col_span += col_span as i64;
        true
    }

    pub fn insert_cols_from_block(&mut self, frame_index: usize, at_col: usize, block: Vec<(ColumnName, Column)>) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        let span = block.len() as i64;
        frame.insert_columns(at_col, block);
        self.bboxes[frame_index].col_span += span;
        true
    }

    pub fn delete_rows(&mut self, frame_index: usize, at_row: usize, row_span: usize) -> Option<Vec<(ColumnName, Column)>> {
        let frame = self.frames.get_mut(frame_index)?;
        let (at_row, row_span) = if at_row == 0 { (1, row_span.saturating_sub(1)) } else { (at_row, row_span) };
        if row_span == 0 {
            return Some(Vec::new());
        }
        let removed = frame.remove_rows(at_row - 1, row_span);
        self.bboxes[frame_index].row_span -= row_span as i64;
        Some(removed)
    }

    pub fn delete_cols(&mut self, frame_index: usize, at_col: usize, col_span: usize) -> Option<Vec<(ColumnName, Column)>> {
        let frame = self.frames.get_mut(frame_index)?;
        let removed = frame.remove_columns(at_col, col_span);
        self.bboxes[frame_index].col_span -= removed.len() as i64;
        Some(removed)
    }

    pub fn duplicate_rows(&mut self, frame_index: usize, at_row: usize, row_span: usize) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        let height = frame.height();
        if at_row >= height {
            return false;
        }
        let end = (at_row + row_span).min(height);
        let names = frame.column_names().to_vec();
        let mut block = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let col = frame.column(i).unwrap();
            let indices: Vec<usize> = (at_row..end).collect();
            block.push((name.clone(), col.take(&indices)));
        }
        let span = end - at_row;
        let _ = frame.splice_rows(end, block);
        self.bboxes[frame_index].row_span += span as i64;
        true
    }

    pub fn duplicate_cols(&mut self, frame_index: usize, at_col: usize, col_span: usize, left: bool) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        let width = frame.width();
        if at_col >= width {
            return false;
        }
        let end = (at_col + col_span).min(width);
        let mut block = Vec::with_capacity(end - at_col);
        for i in at_col..end {
            let name = frame.duplicate_name_for(&frame.column_names()[i]);
            block.push((name, frame.column(i).unwrap().clone()));
        }
        let at = if left { at_col } else { end };
        frame.insert_columns(at, block);
        self.bboxes[frame_index].col_span += (end - at_col) as i64;
        true
    }

    pub fn update(&mut self, frame_index: usize, col: usize, row: usize, replacer: Replacer) -> EngineResult<bool> {
        let Some(frame) = self.frames.get_mut(frame_index) else { return Ok(false) };
        match replacer {
            Replacer::Scalar(value) if row == 0 => {
                if let CellValue::Utf8(name) = value {
                    frame.rename_column(col, name)?;
                } else {
                    let auto = frame.next_auto_column_number();
                    frame.rename_column(col, format!("column_{auto}"))?;
                }
                Ok(true)
            }
            Replacer::HeaderNames(names) => {
                for (i, name) in names.into_iter().enumerate() {
                    frame.rename_column(col + i, name)?;
                }
                Ok(true)
            }
            Replacer::Scalar(value) => {
                frame.set(col, row - 1, value)?;
                Ok(true)
            }
            Replacer::Block(block) => {
                let at = row.saturating_sub(1);
                for (offset, (_, data)) in block.into_iter().enumerate() {
                    for (i, value_row) in (0..data.len()).enumerate() {
                        let value = data.get(value_row);
                        frame.set(col + offset, at + i, value)?;
                    }
                }
                Ok(true)
            }
        }
    }

    pub fn filter_mask(&self, frame_index: usize, col: usize, row: usize) -> Option<Vec<bool>> {
        let frame = self.frames.get(frame_index)?;
        let value = frame.get(col, row.saturating_sub(1));
        let existing = self.filter_exprs.get(frame_index)?.as_deref();
        Some(frame.filter_mask(col, &value, existing).tap_mut(|m| m.insert(0, true)))
    }

    pub fn set_filter_expr(&mut self, frame_index: usize, mask: Option<Vec<bool>>) {
        if let Some(slot) = self.filter_exprs.get_mut(frame_index) {
            *slot = mask;
        }
    }

    pub fn filter_expr(&self, frame_index: usize) -> Option<&Vec<bool>> {
        self.filter_exprs.get(frame_index)?.as_ref()
    }

    pub fn sort(&mut self, frame_index: usize, col: usize, descending: bool) -> Option<Vec<usize>> {
        let frame = self.frames.get_mut(frame_index)?;
        Some(frame.sort_by(col, descending))
    }

    pub fn reorder_rows(&mut self, frame_index: usize, perm: &[usize]) {
        if let Some(frame) = self.frames.get_mut(frame_index) {
            frame.reorder_rows(perm);
        }
    }

    pub fn cast_columns(&mut self, frame_index: usize, at_col: usize, col_span: usize, dtype: DType) -> bool {
        let Some(frame) = self.frames.get_mut(frame_index) else { return false };
        frame.cast_columns(at_col, col_span, dtype).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;

    fn store_with(values: Vec<i64>) -> TableStore {
        let frame = Frame::new(vec![("a".into(), Column::I64(values.into_iter().map(Some).collect()))]);
        TableStore::with_frame(frame)
    }

    #[test]
    fn resolve_locator_vs_content() {
        let store = store_with(vec![1, 2, 3]);
        assert!(store.resolve(0, 0).is_none());
        let md = store.resolve(1, 1);
        assert_eq!(md, CellMetadata { frame_index: 0, intra_col: 0, intra_row: 0 });
    }

    #[test]
    fn delete_rows_clips_header() {
        let mut store = store_with(vec![1, 2, 3]);
        let removed = store.delete_rows(0, 0, 2).unwrap();
        assert_eq!(removed[0].1.len(), 1);
        assert_eq!(store.frame(0).unwrap().height(), 2);
    }
}
