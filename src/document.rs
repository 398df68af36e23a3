//! `Document`: owns one `TableStore` + `ViewIndex` + `SelectionModel` +
//! `HistoryEngine` and exposes the user-facing command surface. Grounded in
//! `sheet_document.py`.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::Regex;

use crate::a1;
use crate::cell::CellMetadata;
use crate::column::{CellValue, Column, DType};
use crate::frame::Frame;
use crate::history::{Command, HistoryEngine, SelectionCoords, SelectionSnapshot};
use crate::selection::SelectionModel;
use crate::spill::{self, OsTempFilePath, TempFilePath};
use crate::store::{Replacer, TableStore};
use crate::view::{ViewIndex, DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH};

/// Tunables the source hard-codes as class constants.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub default_cell_width: i64,
    pub default_cell_height: i64,
    pub selection_coalesce_window: Duration,
    pub viewport_width: i64,
    pub viewport_height: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_cell_width: DEFAULT_CELL_WIDTH,
            default_cell_height: DEFAULT_CELL_HEIGHT,
            selection_coalesce_window: crate::history::COALESCE_WINDOW,
            viewport_width: 800,
            viewport_height: 600,
        }
    }
}

/// Emitted after every selection-moving command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub cell_name: String,
    pub cell_value_as_string: String,
}

pub struct Document<T: TempFilePath = OsTempFilePath> {
    store: TableStore,
    view: ViewIndex,
    selection: SelectionModel,
    history: HistoryEngine,
    config: EngineConfig,
    temp: T,
    /// Suppresses nested history recording while replaying undo/redo
    /// (a per-Document field, never a process-wide static).
    is_changing_state: bool,
    listeners: Vec<Box<dyn FnMut(&SelectionChanged)>>,
}

impl Document<OsTempFilePath> {
    pub fn new(frame: Frame, config: EngineConfig) -> Self {
        Self::with_temp_provider(frame, config, OsTempFilePath::default())
    }
}

impl<T: TempFilePath> Document<T> {
    pub fn with_temp_provider(frame: Frame, config: EngineConfig, temp: T) -> Self {
        let store = TableStore::with_frame(frame);
        let view = ViewIndex::default();
        let selection = SelectionModel::default();
        let initial_snapshot = SelectionSnapshot {
            active_range: selection.active_range,
            active_cell: selection.active_cell,
            cursor_cell: selection.cursor_cell,
            scroll_x: view.scroll_x,
            scroll_y: view.scroll_y,
        };
        Self {
            store,
            view,
            selection,
            history: HistoryEngine::new(initial_snapshot),
            config,
            temp,
            is_changing_state: false,
            listeners: Vec::new(),
        }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn view(&self) -> &ViewIndex {
        &self.view
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn on_selection_changed(&mut self, listener: impl FnMut(&SelectionChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            active_range: self.selection.active_range,
            active_cell: self.selection.active_cell,
            cursor_cell: self.selection.cursor_cell,
            scroll_x: self.view.scroll_x,
            scroll_y: self.view.scroll_y,
        }
    }

    fn restore_snapshot(&mut self, s: SelectionSnapshot) {
        self.selection.active_range = s.active_range;
        self.selection.active_cell = s.active_cell;
        self.selection.cursor_cell = s.cursor_cell;
        self.view.scroll_x = s.scroll_x;
        self.view.scroll_y = s.scroll_y;
    }

    fn record(&mut self, command: Command) {
        if self.is_changing_state {
            return;
        }
        self.history.push(command, Instant::now());
    }

    fn notify_selection_changed(&mut self) {
        let g = self.selection.active_cell.geometry();
        let cell_name = format!("{}{}", a1::encode_column((g.col.max(1) - 1) as usize), g.row.max(1));
        let metadata: CellMetadata = g.metadata;
        let cell_value_as_string = if metadata.is_none() {
            String::new()
        } else {
            self.store
                .frame(metadata.frame_index as usize)
                .map(|f| f.get(metadata.intra_col as usize, metadata.intra_row as usize).to_display_string())
                .unwrap_or_default()
        };
        let event = SelectionChanged { cell_name, cell_value_as_string };
        trace!("selection changed: {event:?}");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /* ---------------------------------------------------------------- */
    /* Selection movement                                                */
    /* ---------------------------------------------------------------- */

    pub fn select_from_position(&mut self, c1: i64, r1: i64, c2: i64, r2: i64, keep_order: bool) {
        let pre = self.snapshot();
        self.selection.update_from_position(
            &self.store,
            &mut self.view,
            c1,
            r1,
            c2,
            r2,
            keep_order,
            true,
            Some((self.config.viewport_width, self.config.viewport_height)),
        );
        let g = self.selection.active_range.geometry();
        self.record(Command::Selection {
            coords: SelectionCoords { c1: g.col, r1: g.row, c2: g.col + g.col_span - 1, r2: g.row + g.row_span - 1 },
            pre,
        });
        self.notify_selection_changed();
    }

    pub fn select_from_a1_name(&mut self, name: &str) -> bool {
        let pre = self.snapshot();
        let ok = self.selection.update_from_a1_name(&self.store, &mut self.view, name, Some((self.config.viewport_width, self.config.viewport_height)));
        if ok {
            let g = self.selection.active_range.geometry();
            self.record(Command::Selection {
                coords: SelectionCoords { c1: g.col, r1: g.row, c2: g.col + g.col_span - 1, r2: g.row + g.row_span - 1 },
                pre,
            });
            self.notify_selection_changed();
        }
        ok
    }

    pub fn select_element_from_point(&mut self, x: i64, y: i64) {
        let pre = self.snapshot();
        self.selection.select_element_from_point(&self.store, &mut self.view, x, y);
        let g = self.selection.active_range.geometry();
        self.record(Command::Selection {
            coords: SelectionCoords { c1: g.col, r1: g.row, c2: g.col, r2: g.row },
            pre,
        });
        self.notify_selection_changed();
    }

    pub fn begin_drag(&mut self, x: i64, y: i64) {
        self.selection.begin_drag(&self.store, &mut self.view, x, y);
        self.notify_selection_changed();
    }

    pub fn drag_to(&mut self, x: i64, y: i64) {
        self.selection
            .drag_to(&self.store, &mut self.view, x, y, (self.config.viewport_width, self.config.viewport_height));
        self.notify_selection_changed();
    }

    pub fn end_drag(&mut self) {
        self.selection.end_drag();
    }

    /* ---------------------------------------------------------------- */
    /* Structural commands                                               */
    /* ---------------------------------------------------------------- */

    fn active_metadata(&self) -> CellMetadata {
        self.selection.active_cell_metadata()
    }

    pub fn insert_blank_rows(&mut self, above: bool) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.row_span.max(1) as usize;
        let at_row = if above { md.intra_row as usize } else { md.intra_row as usize + span };
        let pre = self.snapshot();

        self.store.insert_rows_blank(md.frame_index as usize, at_row, span);
        self.view.rows.insert_default(at_row, span, self.config.default_cell_height);

        self.record(Command::InsertBlankRow { frame_index: md.frame_index as usize, at_row, row_span: span, pre });
        true
    }

    pub fn insert_blank_cols(&mut self, left: bool) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.col_span.max(1) as usize;
        let at_col = md.intra_col as usize;
        let pre = self.snapshot();

        self.store.insert_cols_blank(md.frame_index as usize, at_col, span, left);
        self.view.cols.insert_default(resolved_insert_at(at_col, span, left), span, self.config.default_cell_width);

        self.record(Command::InsertBlankCol { frame_index: md.frame_index as usize, at_col, col_span: span, left, pre });
        true
    }

    pub fn delete_current_rows(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.row_span.max(1) as usize;
        let at_row = md.intra_row as usize;
        let pre = self.snapshot();

        let Some(removed) = self.store.delete_rows(md.frame_index as usize, at_row, span) else { return false };
        let (mask_removed, sizes_removed) = self.view.rows.remove(at_row, span);

        let data_path = self.temp.fresh_path();
        if let Err(e) = spill::write_block(&data_path, &removed) {
            warn!("failed to spill deleted rows: {e}");
            return false;
        }
        let mask_path = mask_removed.map(|m| {
            let p = self.temp.fresh_path();
            let _ = spill::write_bool_mask(&p, &m);
            p
        });
        let sizes_path = sizes_removed.map(|s| {
            let p = self.temp.fresh_path();
            let _ = spill::write_i64_vec(&p, &s);
            p
        });

        self.record(Command::DeleteRow { frame_index: md.frame_index as usize, at_row, row_span: span, data_path, mask_path, sizes_path, pre });
        true
    }

    pub fn delete_current_cols(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.col_span.max(1) as usize;
        let at_col = md.intra_col as usize;
        let pre = self.snapshot();

        let Some(removed) = self.store.delete_cols(md.frame_index as usize, at_col, span) else { return false };
        let (mask_removed, sizes_removed) = self.view.cols.remove(at_col, span);

        let data_path = self.temp.fresh_path();
        if let Err(e) = spill::write_block(&data_path, &removed) {
            warn!("failed to spill deleted columns: {e}");
            return false;
        }
        let mask_path = mask_removed.map(|m| {
            let p = self.temp.fresh_path();
            let _ = spill::write_bool_mask(&p, &m);
            p
        });
        let sizes_path = sizes_removed.map(|s| {
            let p = self.temp.fresh_path();
            let _ = spill::write_i64_vec(&p, &s);
            p
        });

        self.record(Command::DeleteCol { frame_index: md.frame_index as usize, at_col, col_span: span, data_path, mask_path, sizes_path, pre });
        true
    }

    pub fn duplicate_current_rows(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.row_span.max(1) as usize;
        let at_row = md.intra_row as usize;
        let pre = self.snapshot();
        if !self.store.duplicate_rows(md.frame_index as usize, at_row, span) {
            return false;
        }
        self.view.rows.insert_default(at_row + span, span, self.config.default_cell_height);
        self.record(Command::DuplicateRow { frame_index: md.frame_index as usize, at_row, row_span: span, pre });
        true
    }

    pub fn duplicate_current_cols(&mut self, left: bool) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.col_span.max(1) as usize;
        let at_col = md.intra_col as usize;
        let pre = self.snapshot();
        if !self.store.duplicate_cols(md.frame_index as usize, at_col, span, left) {
            return false;
        }
        let insertion_point = if left { at_col } else { at_col + span };
        self.view.cols.insert_default(insertion_point, span, self.config.default_cell_width);
        self.record(Command::DuplicateCol { frame_index: md.frame_index as usize, at_col, col_span: span, left, pre });
        true
    }

    pub fn hide_current_rows(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.row_span.max(1) as usize;
        let at_row = md.intra_row as usize;
        let pre = self.snapshot();
        let Some(frame) = self.store.frame(md.frame_index as usize) else { return false };
        let height = frame.height();
        let had_sizes = !self.view.rows.sizes.is_empty();
        self.view.rows.hide(height, at_row, span);
        let sizes_path = had_sizes.then(|| {
            let p = self.temp.fresh_path();
            let slice: Vec<i64> = (at_row..at_row + span).map(|i| self.view.rows.size_of(i, self.config.default_cell_height)).collect();
            let _ = spill::write_i64_vec(&p, &slice);
            p
        });
        self.record(Command::HideRow { frame_index: md.frame_index as usize, at_row, row_span: span, sizes_path, pre });
        true
    }

    pub fn hide_current_cols(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let g = self.selection.active_range.geometry();
        let span = g.col_span.max(1) as usize;
        let at_col = md.intra_col as usize;
        let pre = self.snapshot();
        let Some(frame) = self.store.frame(md.frame_index as usize) else { return false };
        let width = frame.width();
        let had_sizes = !self.view.cols.sizes.is_empty();
        self.view.cols.hide(width, at_col, span);
        let sizes_path = had_sizes.then(|| {
            let p = self.temp.fresh_path();
            let slice: Vec<i64> = (at_col..at_col + span).map(|i| self.view.cols.size_of(i, self.config.default_cell_width)).collect();
            let _ = spill::write_i64_vec(&p, &slice);
            p
        });
        self.record(Command::HideCol { frame_index: md.frame_index as usize, at_col, col_span: span, sizes_path, pre });
        true
    }

    pub fn unhide_rows(&mut self, at_row: usize, row_span: usize) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let pre = self.snapshot();
        let mask_path = self.temp.fresh_path();
        let _ = spill::write_bool_mask(&mask_path, &self.view.rows.visibility);
        self.view.unhide_rows(at_row, row_span, None);
        self.record(Command::UnhideRow { frame_index: md.frame_index as usize, at_row, row_span, mask_path, sizes_path: None, pre });
        true
    }

    pub fn unhide_cols(&mut self, at_col: usize, col_span: usize) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let pre = self.snapshot();
        let mask_path = self.temp.fresh_path();
        let _ = spill::write_bool_mask(&mask_path, &self.view.cols.visibility);
        self.view.unhide_cols(at_col, col_span, None);
        self.record(Command::UnhideCol { frame_index: md.frame_index as usize, at_col, col_span, mask_path, sizes_path: None, pre });
        true
    }

    pub fn unhide_all_rows(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let pre = self.snapshot();
        let mask_path = self.temp.fresh_path();
        let _ = spill::write_bool_mask(&mask_path, &self.view.rows.visibility);
        self.view.unhide_all_rows();
        self.record(Command::UnhideAllRow { frame_index: md.frame_index as usize, mask_path, pre });
        true
    }

    pub fn unhide_all_cols(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let pre = self.snapshot();
        let mask_path = self.temp.fresh_path();
        let _ = spill::write_bool_mask(&mask_path, &self.view.cols.visibility);
        self.view.unhide_all_cols();
        self.record(Command::UnhideAllCol { frame_index: md.frame_index as usize, mask_path, pre });
        true
    }

    pub fn filter_current_rows(&mut self) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let pre = self.snapshot();
        let frame_index = md.frame_index as usize;
        let Some(mask) = self.store.filter_mask(frame_index, md.intra_col as usize, md.intra_row as usize) else { return false };

        let previous_mask = self.store.filter_expr(frame_index).cloned();
        // filter_exprs stores the data-only mask (no header bit); strip it here.
        self.store.set_filter_expr(frame_index, Some(mask[1..].to_vec()));
        self.view.set_row_filter_mask(mask);

        debug!("filter applied to frame {frame_index} col {}", md.intra_col);
        self.record(Command::FilterRow { frame_index, previous_mask, pre });
        true
    }

    pub fn sort_current_rows(&mut self, descending: bool) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let frame_index = md.frame_index as usize;
        let pre = self.snapshot();

        let height = self.store.frame(frame_index).map(Frame::height).unwrap_or(0);
        let identity: Vec<i64> = (0..height as i64).collect();
        let pre_perm_path = self.temp.fresh_path();
        let _ = spill::write_i64_vec(&pre_perm_path, &identity);

        let Some(perm) = self.store.sort(frame_index, md.intra_col as usize, descending) else { return false };
        if !self.view.rows.visibility.is_empty() {
            self.view.rows.visibility = perm.iter().map(|&i| self.view.rows.visibility[i]).collect();
            self.view.rows.recompute_visible_indices_pub();
        }

        self.record(Command::SortRow { frame_index, descending, pre_perm_path, pre });
        true
    }

    pub fn convert_current_columns_dtype(&mut self, dtype: DType) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let frame_index = md.frame_index as usize;
        let g = self.selection.active_range.geometry();
        let span = g.col_span.max(1) as usize;
        let at_col = md.intra_col as usize;
        let before = self.store.frame(frame_index).and_then(|f| f.column(at_col)).map(Column::dtype);
        let Some(before) = before else { return false };
        let pre = self.snapshot();

        if !self.store.cast_columns(frame_index, at_col, span, dtype) {
            warn!("cast rejected for frame {frame_index} cols {at_col}..{}", at_col + span);
            return false;
        }
        self.record(Command::ConvertData { frame_index, at_col, col_span: span, before, after: dtype, pre });
        true
    }

    pub fn update_active_cell(&mut self, value: CellValue) -> bool {
        let md = self.active_metadata();
        if md.is_none() {
            return false;
        }
        let frame_index = md.frame_index as usize;
        let col = md.intra_col as usize;
        let row = (md.intra_row + 1) as usize;
        let pre = self.snapshot();

        let header_pre = if row == 0 {
            self.store.frame(frame_index).map(|f| vec![f.column_names()[col].clone()])
        } else {
            None
        };
        let content_pre_path = if row != 0 {
            let block = self.store.read_block(frame_index, &[self.store.frame(frame_index).unwrap().column_names()[col].clone()], row as i64, 1);
            block.and_then(|b| {
                let p = self.temp.fresh_path();
                spill::write_block(&p, &b).ok()?;
                Some(p)
            })
        } else {
            None
        };

        match self.store.update(frame_index, col, row, Replacer::Scalar(value.clone())) {
            Ok(true) => {
                self.record(Command::UpdateData { frame_index, col, row, header_pre, content_pre_path, new_value: value, pre });
                true
            }
            _ => false,
        }
    }

    /* ---------------------------------------------------------------- */
    /* Find / replace                                                    */
    /* ---------------------------------------------------------------- */

    /// Returns, for each string column in the active frame, a per-row mask
    /// of matching cells, and the total number of matches.
    pub fn find_in_current_table(&self, text: &str, match_case: bool, use_regexp: bool) -> (Vec<(String, Vec<bool>)>, usize) {
        let md = self.active_metadata();
        if md.is_none() {
            return (Vec::new(), 0);
        }
        let frame_index = md.frame_index as usize;
        let Some(frame) = self.store.frame(frame_index) else { return (Vec::new(), 0) };

        let regex = if use_regexp {
            let pattern = if match_case { text.to_string() } else { format!("(?i){text}") };
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("invalid search regex {text:?}: {e}");
                    return (Vec::new(), 0);
                }
            }
        } else {
            None
        };

        let mut total = 0usize;
        let mut out = Vec::new();
        for (idx, (name, dtype)) in frame.schema().enumerate() {
            if dtype != DType::Utf8 && dtype != DType::Categorical {
                continue;
            }
            let col = frame.column(idx).unwrap();
            let mut mask = Vec::with_capacity(frame.height());
            for row in 0..frame.height() {
                let value = col.get(row).to_display_string();
                let hit = if let Some(re) = &regex {
                    re.is_match(&value)
                } else if match_case {
                    value.contains(text)
                } else {
                    value.to_lowercase().contains(&text.to_lowercase())
                };
                total += hit as usize;
                mask.push(hit);
            }
            out.push((name.to_string(), mask));
        }
        (out, total)
    }

    pub fn replace_all_in_current_table(&mut self, text: &str, replacement: &str, match_case: bool) -> usize {
        let md = self.active_metadata();
        if md.is_none() {
            return 0;
        }
        let frame_index = md.frame_index as usize;
        let mut changed = 0usize;
        let Some(frame) = self.store.frame_mut(frame_index) else { return 0 };
        for idx in 0..frame.width() {
            if frame.column(idx).map(Column::dtype) != Some(DType::Utf8) {
                continue;
            }
            for row in 0..frame.height() {
                let CellValue::Utf8(current) = frame.get(idx, row) else { continue };
                let replaced = if match_case {
                    current.replace(text, replacement)
                } else {
                    replace_case_insensitive(&current, text, replacement)
                };
                if replaced != current {
                    changed += 1;
                    let new_value = if replaced.is_empty() { CellValue::Null } else { CellValue::Utf8(replaced) };
                    let _ = frame.set(idx, row, new_value);
                }
            }
        }
        changed
    }

    /* ---------------------------------------------------------------- */
    /* Undo / redo                                                       */
    /* ---------------------------------------------------------------- */

    pub fn undo(&mut self) -> bool {
        let Some(command) = self.history.pop_undo() else { return false };
        self.is_changing_state = true;
        let pre = crate::history::selection_of(&command);
        self.invert(&command);
        self.is_changing_state = false;
        self.restore_snapshot(pre);
        self.history.push_redo(command);
        self.notify_selection_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(command) = self.history.pop_redo() else { return false };
        self.is_changing_state = true;
        self.apply_forward(&command);
        self.is_changing_state = false;
        self.history.push_undo_from_redo(command);
        self.notify_selection_changed();
        true
    }

    fn apply_forward(&mut self, command: &Command) {
        match command.clone() {
            Command::Selection { .. } => {}
            Command::InsertBlankRow { frame_index, at_row, row_span, .. } => {
                self.store.insert_rows_blank(frame_index, at_row, row_span);
                self.view.rows.insert_default(at_row, row_span, self.config.default_cell_height);
            }
            Command::InsertBlankCol { frame_index, at_col, col_span, left, .. } => {
                self.store.insert_cols_blank(frame_index, at_col, col_span, left);
                self.view.cols.insert_default(resolved_insert_at(at_col, col_span, left), col_span, self.config.default_cell_width);
            }
            Command::UpdateData { frame_index, col, row, new_value, .. } => {
                let _ = self.store.update(frame_index, col, row, Replacer::Scalar(new_value));
            }
            Command::DuplicateRow { frame_index, at_row, row_span, .. } => {
                self.store.duplicate_rows(frame_index, at_row, row_span);
                self.view.rows.insert_default(at_row + row_span, row_span, self.config.default_cell_height);
            }
            Command::DuplicateCol { frame_index, at_col, col_span, left, .. } => {
                self.store.duplicate_cols(frame_index, at_col, col_span, left);
                let insertion_point = if left { at_col } else { at_col + col_span };
                self.view.cols.insert_default(insertion_point, col_span, self.config.default_cell_width);
            }
            Command::DeleteRow { frame_index, at_row, row_span, .. } => {
                self.store.delete_rows(frame_index, at_row, row_span);
                self.view.rows.remove(at_row, row_span);
            }
            Command::DeleteCol { frame_index, at_col, col_span, .. } => {
                self.store.delete_cols(frame_index, at_col, col_span);
                self.view.cols.remove(at_col, col_span);
            }
            Command::HideRow { frame_index, at_row, row_span, .. } => {
                let height = self.store.frame(frame_index).map(Frame::height).unwrap_or(0);
                self.view.rows.hide(height, at_row, row_span);
            }
            Command::HideCol { frame_index, at_col, col_span, .. } => {
                let width = self.store.frame(frame_index).map(Frame::width).unwrap_or(0);
                self.view.cols.hide(width, at_col, col_span);
            }
            Command::UnhideRow { at_row, row_span, .. } => {
                self.view.unhide_rows(at_row, row_span, None);
            }
            Command::UnhideCol { at_col, col_span, .. } => {
                self.view.unhide_cols(at_col, col_span, None);
            }
            Command::UnhideAllRow { .. } => self.view.unhide_all_rows(),
            Command::UnhideAllCol { .. } => self.view.unhide_all_cols(),
            Command::FilterRow { frame_index, .. } => {
                if let Some(md) = Some(self.active_metadata()).filter(|m| !m.is_none()) {
                    if let Some(mask) = self.store.filter_mask(frame_index, md.intra_col as usize, md.intra_row as usize) {
                        self.store.set_filter_expr(frame_index, Some(mask[1..].to_vec()));
                        self.view.set_row_filter_mask(mask);
                    }
                }
            }
            Command::SortRow { frame_index, descending, .. } => {
                if let Some(col) = self.history_sort_column(frame_index) {
                    self.store.sort(frame_index, col, descending);
                }
            }
            Command::ConvertData { frame_index, at_col, col_span, after, .. } => {
                self.store.cast_columns(frame_index, at_col, col_span, after);
            }
        }
    }

    /// Best-effort: sort commands don't retain which column they sorted by
    /// beyond the moment they were issued, so redo re-sorts by the active
    /// cell's current column (matches source behavior of re-running the
    /// last interactive sort target).
    fn history_sort_column(&self, _frame_index: usize) -> Option<usize> {
        let md = self.active_metadata();
        (!md.is_none()).then_some(md.intra_col as usize)
    }

    fn invert(&mut self, command: &Command) {
        match command.clone() {
            Command::Selection { .. } => {}
            Command::InsertBlankRow { frame_index, at_row, row_span, .. } => {
                self.store.delete_rows(frame_index, at_row, row_span);
                self.view.rows.remove(at_row, row_span);
            }
            Command::InsertBlankCol { frame_index, at_col, col_span, left, .. } => {
                let resolved = resolved_insert_at(at_col, col_span, left);
                self.store.delete_cols(frame_index, resolved, col_span);
                self.view.cols.remove(resolved, col_span);
            }
            Command::UpdateData { frame_index, col, row, header_pre, content_pre_path, .. } => {
                if let Some(names) = header_pre {
                    let _ = self.store.update(frame_index, col, 0, Replacer::HeaderNames(names));
                }
                if let Some(path) = content_pre_path {
                    if let Ok(block) = spill::read_block(&path) {
                        let _ = self.store.update(frame_index, col, row, Replacer::Block(block));
                    }
                    spill::delete(&path);
                }
            }
            Command::DuplicateRow { frame_index, at_row, row_span, .. } => {
                self.store.delete_rows(frame_index, at_row + row_span, row_span);
                self.view.rows.remove(at_row + row_span, row_span);
            }
            Command::DuplicateCol { frame_index, at_col, col_span, left, .. } => {
                let insertion_point = if left { at_col } else { at_col + col_span };
                self.store.delete_cols(frame_index, insertion_point, col_span);
                self.view.cols.remove(insertion_point, col_span);
            }
            Command::DeleteRow { frame_index, at_row, data_path, mask_path, sizes_path, .. } => {
                if let Ok(block) = spill::read_block(&data_path) {
                    let _ = self.store.insert_rows_from_block(frame_index, at_row, block);
                }
                let saved_sizes = sizes_path.as_ref().and_then(|p| spill::read_i64_vec(p).ok());
                if let Some(mask_path) = &mask_path {
                    if let Ok(mask) = spill::read_bool_mask(mask_path) {
                        let span = mask.len();
                        self.view.rows.insert_default(at_row, span, self.config.default_cell_height);
                        if !self.view.rows.visibility.is_empty() {
                            for (i, bit) in mask.into_iter().enumerate() {
                                self.view.rows.visibility[at_row + i] = bit;
                            }
                            self.view.rows.recompute_visible_indices_pub();
                        }
                    }
                } else {
                    let span = spill::read_block(&data_path).map(|b| b.first().map(|(_, c)| c.len()).unwrap_or(0)).unwrap_or(0);
                    self.view.rows.insert_default(at_row, span, self.config.default_cell_height);
                }
                if let (Some(p), Some(sizes)) = (&sizes_path, saved_sizes) {
                    for (i, s) in sizes.into_iter().enumerate() {
                        if let Some(slot) = self.view.rows.sizes.get_mut(at_row + i) {
                            *slot = s;
                        }
                    }
                    self.view.rows.recompute_cumulative_pub();
                    spill::delete(p);
                }
                spill::delete(&data_path);
                if let Some(p) = &mask_path {
                    spill::delete(p);
                }
            }
            Command::DeleteCol { frame_index, at_col, data_path, mask_path, sizes_path, .. } => {
                if let Ok(block) = spill::read_block(&data_path) {
                    self.store.insert_cols_from_block(frame_index, at_col, block);
                }
                if let Some(mask_path) = &mask_path {
                    if let Ok(mask) = spill::read_bool_mask(mask_path) {
                        let span = mask.len();
                        self.view.cols.insert_default(at_col, span, self.config.default_cell_width);
                        if !self.view.cols.visibility.is_empty() {
                            for (i, bit) in mask.into_iter().enumerate() {
                                self.view.cols.visibility[at_col + i] = bit;
                            }
                            self.view.cols.recompute_visible_indices_pub();
                        }
                    }
                }
                if let Some(p) = &sizes_path {
                    if let Ok(sizes) = spill::read_i64_vec(p) {
                        for (i, s) in sizes.into_iter().enumerate() {
                            if let Some(slot) = self.view.cols.sizes.get_mut(at_col + i) {
                                *slot = s;
                            }
                        }
                        self.view.cols.recompute_cumulative_pub();
                    }
                }
                spill::delete(&data_path);
                if let Some(p) = &mask_path {
                    spill::delete(p);
                }
                if let Some(p) = &sizes_path {
                    spill::delete(p);
                }
            }
            Command::HideRow { at_row, row_span, sizes_path, .. } => {
                let saved = sizes_path.as_ref().and_then(|p| spill::read_i64_vec(p).ok());
                self.view.unhide_rows(at_row, row_span, saved);
                if let Some(p) = &sizes_path {
                    spill::delete(p);
                }
            }
            Command::HideCol { at_col, col_span, sizes_path, .. } => {
                let saved = sizes_path.as_ref().and_then(|p| spill::read_i64_vec(p).ok());
                self.view.unhide_cols(at_col, col_span, saved);
                if let Some(p) = &sizes_path {
                    spill::delete(p);
                }
            }
            Command::UnhideRow { at_row, row_span, mask_path, .. } => {
                let height = self.store.frame(0).map(Frame::height).unwrap_or(0);
                self.view.rows.hide(height, at_row, row_span);
                spill::delete(&mask_path);
            }
            Command::UnhideCol { at_col, col_span, mask_path, .. } => {
                let width = self.store.frame(0).map(Frame::width).unwrap_or(0);
                self.view.cols.hide(width, at_col, col_span);
                spill::delete(&mask_path);
            }
            Command::UnhideAllRow { mask_path, .. } => {
                if let Ok(mask) = spill::read_bool_mask(&mask_path) {
                    self.view.set_row_filter_mask(mask);
                }
                spill::delete(&mask_path);
            }
            Command::UnhideAllCol { mask_path, .. } => {
                if let Ok(mask) = spill::read_bool_mask(&mask_path) {
                    self.view.cols.set_mask(mask);
                }
                spill::delete(&mask_path);
            }
            Command::FilterRow { frame_index, previous_mask, .. } => {
                self.store.set_filter_expr(frame_index, previous_mask.clone());
                match previous_mask {
                    Some(mask) => {
                        let mut with_header = vec![true];
                        with_header.extend(mask);
                        self.view.set_row_filter_mask(with_header);
                    }
                    None => self.view.unhide_all_rows(),
                }
            }
            Command::SortRow { frame_index, pre_perm_path, .. } => {
                if let Ok(perm) = spill::read_i64_vec(&pre_perm_path) {
                    let perm: Vec<usize> = perm.into_iter().map(|v| v as usize).collect();
                    self.store.reorder_rows(frame_index, &perm);
                }
                spill::delete(&pre_perm_path);
            }
            Command::ConvertData { frame_index, at_col, col_span, before, .. } => {
                self.store.cast_columns(frame_index, at_col, col_span, before);
            }
        }
    }

    pub fn close(mut self) {
        self.history.cleanup_all();
    }
}

fn resolved_insert_at(at: usize, span: usize, left: bool) -> usize {
    if left {
        at + span.saturating_sub(1)
    } else {
        at
    }
}

fn replace_case_insensitive(haystack: &str, pattern: &str, replacement: &str) -> String {
    if pattern.is_empty() {
        return haystack.to_string();
    }
    let lower_hay = haystack.to_lowercase();
    let lower_pat = pattern.to_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut rest_lower = lower_hay.as_str();
    while let Some(pos) = rest_lower.find(&lower_pat) {
        out.push_str(&rest[..pos]);
        out.push_str(replacement);
        rest = &rest[pos + pattern.len()..];
        rest_lower = &rest_lower[pos + pattern.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ScratchTemp {
        dir: PathBuf,
        counter: AtomicU64,
    }

    impl ScratchTemp {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("grid-engine-doc-test-{}", std::process::id()));
            let _ = std::fs::create_dir_all(&dir);
            Self { dir, counter: AtomicU64::new(0) }
        }
    }

    impl TempFilePath for ScratchTemp {
        fn fresh_path(&self) -> PathBuf {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            self.dir.join(format!("{n}.ersnap"))
        }
    }

    fn doc(values: Vec<i64>) -> Document<ScratchTemp> {
        let frame = Frame::new(vec![
            ("a".into(), Column::I64(values.iter().copied().map(Some).collect())),
            ("b".into(), Column::I64(values.into_iter().map(Some).collect())),
        ]);
        Document::with_temp_provider(frame, EngineConfig::default(), ScratchTemp::new())
    }

    #[test]
    fn insert_then_undo_restores_data() {
        let mut d = doc(vec![1, 2, 3, 4, 5]);
        d.select_from_position(1, 3, 1, 3, false);
        assert!(d.insert_blank_rows(true));
        assert_eq!(d.store().frame(0).unwrap().height(), 6);
        assert!(d.undo());
        assert_eq!(d.store().frame(0).unwrap().height(), 5);
        assert_eq!(d.store().frame(0).unwrap().get(0, 0), CellValue::I64(1));
    }

    #[test]
    fn filter_then_undo_restores_full_visibility() {
        let mut d = doc(vec![1, 2, 1, 3, 1]);
        d.select_from_position(1, 1, 1, 1, false);
        assert!(d.filter_current_rows());
        assert!(!d.view().rows.visibility.is_empty());
        assert!(d.undo());
        assert!(d.view().rows.visibility.is_empty());
    }

    #[test]
    fn cast_rejection_leaves_column_unchanged() {
        let frame = Frame::new(vec![("x".into(), Column::Utf8(vec![Some("1".into()), Some("abc".into())]))]);
        let mut d = Document::with_temp_provider(frame, EngineConfig::default(), ScratchTemp::new());
        d.select_from_position(1, 1, 1, 1, false);
        assert!(!d.convert_current_columns_dtype(DType::I64));
        assert_eq!(d.store().frame(0).unwrap().column(0).unwrap().dtype(), DType::Utf8);
    }
}
