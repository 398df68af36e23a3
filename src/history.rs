//! `HistoryEngine`: undo/redo command stacks, selection coalescing, and
//! spill-file lifecycle. Grounded in `history_manager.py`.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

use crate::cell::Cell;
use crate::column::{CellValue, DType};
use crate::frame::ColumnName;

/// Selection coordinates captured for undo of any command: pre-operation
/// scroll_x/scroll_y plus the selection snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SelectionSnapshot {
    pub active_range: Cell,
    pub active_cell: Cell,
    pub cursor_cell: Cell,
    pub scroll_x: i64,
    pub scroll_y: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionCoords {
    pub c1: i64,
    pub r1: i64,
    pub c2: i64,
    pub r2: i64,
}

#[derive(Debug, Clone)]
pub enum Command {
    Selection { coords: SelectionCoords, pre: SelectionSnapshot },
    InsertBlankRow { frame_index: usize, at_row: usize, row_span: usize, pre: SelectionSnapshot },
    InsertBlankCol { frame_index: usize, at_col: usize, col_span: usize, left: bool, pre: SelectionSnapshot },
    UpdateData {
        frame_index: usize,
        col: usize,
        row: usize,
        header_pre: Option<Vec<ColumnName>>,
        content_pre_path: Option<PathBuf>,
        /// The value the user actually wrote, so redo can re-apply it
        /// without having retained the forward spill (only the pre-image
        /// is spilled, since this is always a single scalar).
        new_value: CellValue,
        pre: SelectionSnapshot,
    },
    DuplicateRow { frame_index: usize, at_row: usize, row_span: usize, pre: SelectionSnapshot },
    DuplicateCol { frame_index: usize, at_col: usize, col_span: usize, left: bool, pre: SelectionSnapshot },
    DeleteRow { frame_index: usize, at_row: usize, row_span: usize, data_path: PathBuf, mask_path: Option<PathBuf>, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    DeleteCol { frame_index: usize, at_col: usize, col_span: usize, data_path: PathBuf, mask_path: Option<PathBuf>, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    HideRow { frame_index: usize, at_row: usize, row_span: usize, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    HideCol { frame_index: usize, at_col: usize, col_span: usize, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    UnhideRow { frame_index: usize, at_row: usize, row_span: usize, mask_path: PathBuf, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    UnhideCol { frame_index: usize, at_col: usize, col_span: usize, mask_path: PathBuf, sizes_path: Option<PathBuf>, pre: SelectionSnapshot },
    UnhideAllRow { frame_index: usize, mask_path: PathBuf, pre: SelectionSnapshot },
    UnhideAllCol { frame_index: usize, mask_path: PathBuf, pre: SelectionSnapshot },
    FilterRow { frame_index: usize, previous_mask: Option<Vec<bool>>, pre: SelectionSnapshot },
    SortRow { frame_index: usize, descending: bool, pre_perm_path: PathBuf, pre: SelectionSnapshot },
    ConvertData { frame_index: usize, at_col: usize, col_span: usize, before: DType, after: DType, pre: SelectionSnapshot },
}

impl Command {
    /// All spill paths this command owns, for cleanup.
    pub fn spill_paths(&self) -> Vec<&PathBuf> {
        match self {
            Command::UpdateData { content_pre_path: Some(p), .. } => vec![p],
            Command::DeleteRow { data_path, mask_path, sizes_path, .. } | Command::DeleteCol { data_path, mask_path, sizes_path, .. } => {
                let mut v = vec![data_path];
                v.extend(mask_path.iter());
                v.extend(sizes_path.iter());
                v
            }
            Command::HideRow { sizes_path: Some(p), .. } | Command::HideCol { sizes_path: Some(p), .. } => vec![p],
            Command::UnhideRow { mask_path, sizes_path, .. } | Command::UnhideCol { mask_path, sizes_path, .. } => {
                let mut v = vec![mask_path];
                v.extend(sizes_path.iter());
                v
            }
            Command::UnhideAllRow { mask_path, .. } | Command::UnhideAllCol { mask_path, .. } => vec![mask_path],
            Command::SortRow { pre_perm_path, .. } => vec![pre_perm_path],
            _ => Vec::new(),
        }
    }

    fn is_selection(&self) -> bool {
        matches!(self, Command::Selection { .. })
    }
}

/// Rapid Selection commands within this window replace the prior one
/// instead of stacking.
pub const COALESCE_WINDOW: std::time::Duration = std::time::Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct HistoryEngine {
    undo: VecDeque<Command>,
    redo: VecDeque<Command>,
    last_selection_at: Option<Instant>,
}

impl HistoryEngine {
    /// Always starts with one Selection command so every state has an undo
    /// target.
    pub fn new(initial: SelectionSnapshot) -> Self {
        let mut engine = Self::default();
        engine.undo.push_back(Command::Selection {
            coords: SelectionCoords { c1: 0, r1: 0, c2: 0, r2: 0 },
            pre: initial,
        });
        engine
    }

    pub fn push(&mut self, command: Command, now: Instant) {
        if command.is_selection() {
            let coords = match &command {
                Command::Selection { coords, .. } => *coords,
                _ => unreachable!(),
            };
            if let Some(Command::Selection { coords: top_coords, .. }) = self.undo.back() {
                let same = top_coords.c1 == coords.c1 && top_coords.r1 == coords.r1 && top_coords.c2 == coords.c2 && top_coords.r2 == coords.r2;
                let recent = self.last_selection_at.is_some_and(|t| now.duration_since(t) < COALESCE_WINDOW);
                if same {
                    return;
                }
                if recent {
                    self.undo.pop_back();
                }
            }
            self.last_selection_at = Some(now);
        } else {
            self.last_selection_at = None;
            self.cleanup_stack(true);
        }
        self.undo.push_back(command);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn pop_undo(&mut self) -> Option<Command> {
        if !self.can_undo() {
            return None;
        }
        self.undo.pop_back()
    }

    pub fn push_redo(&mut self, command: Command) {
        self.redo.push_back(command);
    }

    pub fn pop_redo(&mut self) -> Option<Command> {
        self.redo.pop_back()
    }

    pub fn push_undo_from_redo(&mut self, command: Command) {
        self.undo.push_back(command);
    }

    pub fn top_undo_scroll(&self) -> Option<(i64, i64)> {
        self.undo.back().map(|c| selection_of(c)).map(|s| (s.scroll_x, s.scroll_y))
    }

    /// Deletes every spill file referenced by the redo stack and clears it
    /// (run whenever a fresh non-selection command invalidates redo).
    fn cleanup_stack(&mut self, clear_redo: bool) {
        if clear_redo {
            for cmd in self.redo.drain(..) {
                for path in cmd.spill_paths() {
                    crate::spill::delete(path);
                }
            }
        }
    }

    /// Deletes every spill file referenced by either stack; called on
    /// document close.
    pub fn cleanup_all(&mut self) {
        for cmd in self.undo.drain(..).chain(self.redo.drain(..)) {
            for path in cmd.spill_paths() {
                crate::spill::delete(path);
            }
        }
    }
}

pub(crate) fn selection_of(command: &Command) -> SelectionSnapshot {
    match command {
        Command::Selection { pre, .. }
        | Command::InsertBlankRow { pre, .. }
        | Command::InsertBlankCol { pre, .. }
        | Command::UpdateData { pre, .. }
        | Command::DuplicateRow { pre, .. }
        | Command::DuplicateCol { pre, .. }
        | Command::DeleteRow { pre, .. }
        | Command::DeleteCol { pre, .. }
        | Command::HideRow { pre, .. }
        | Command::HideCol { pre, .. }
        | Command::UnhideRow { pre, .. }
        | Command::UnhideCol { pre, .. }
        | Command::UnhideAllRow { pre, .. }
        | Command::UnhideAllCol { pre, .. }
        | Command::FilterRow { pre, .. }
        | Command::SortRow { pre, .. }
        | Command::ConvertData { pre, .. } => *pre,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> SelectionSnapshot {
        SelectionSnapshot {
            active_range: Cell::default(),
            active_cell: Cell::default(),
            cursor_cell: Cell::default(),
            scroll_x: 0,
            scroll_y: 0,
        }
    }

    #[test]
    fn selection_coalesces_within_window() {
        let mut engine = HistoryEngine::new(snap());
        let t0 = Instant::now();
        engine.push(Command::Selection { coords: SelectionCoords { c1: 1, r1: 1, c2: 1, r2: 1 }, pre: snap() }, t0);
        engine.push(
            Command::Selection { coords: SelectionCoords { c1: 2, r1: 1, c2: 2, r2: 1 }, pre: snap() },
            t0 + std::time::Duration::from_millis(100),
        );
        assert_eq!(engine.undo.len(), 2);

        engine.push(
            Command::Selection { coords: SelectionCoords { c1: 3, r1: 1, c2: 3, r2: 1 }, pre: snap() },
            t0 + std::time::Duration::from_millis(700),
        );
        assert_eq!(engine.undo.len(), 3);
    }

    #[test]
    fn identical_selection_is_dropped() {
        let mut engine = HistoryEngine::new(snap());
        let t0 = Instant::now();
        engine.push(Command::Selection { coords: SelectionCoords { c1: 1, r1: 1, c2: 1, r2: 1 }, pre: snap() }, t0);
        engine.push(Command::Selection { coords: SelectionCoords { c1: 1, r1: 1, c2: 1, r2: 1 }, pre: snap() }, t0);
        assert_eq!(engine.undo.len(), 2);
    }

    #[test]
    fn initial_selection_is_never_popped() {
        let mut engine = HistoryEngine::new(snap());
        assert!(!engine.can_undo());
    }
}
