//! `SelectionModel`: active range/cell/cursor tracking and the drag state
//! machine, grounded in `sheet_selection.py` and
//! `sheet_document.py::update_selection_from_position`.

use crate::a1;
use crate::cell::{Cell, CellGeometry, CellMetadata};
use crate::store::TableStore;
use crate::view::ViewIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

#[derive(Debug, Clone)]
pub struct SelectionModel {
    pub active_range: Cell,
    pub previous_active_range: Cell,
    pub active_cell: Cell,
    pub cursor_cell: Cell,
    pub search_range: Option<Cell>,
    pub drag: DragState,
    drag_anchor: (i64, i64),
}

impl Default for SelectionModel {
    fn default() -> Self {
        let origin = Cell::default();
        Self {
            active_range: origin,
            previous_active_range: origin,
            active_cell: origin,
            cursor_cell: origin,
            search_range: None,
            drag: DragState::Idle,
            drag_anchor: (0, 0),
        }
    }
}

impl SelectionModel {
    /// Core selection algorithm. `keep_order` preserves `rtl`/`btt`
    /// direction bits instead of normalizing to `(min..max)`.
    pub fn update_from_position(
        &mut self,
        store: &TableStore,
        view: &mut ViewIndex,
        mut c1: i64,
        mut r1: i64,
        mut c2: i64,
        mut r2: i64,
        keep_order: bool,
        follow_cursor: bool,
        auto_scroll: Option<(i64, i64)>,
    ) {
        // "entire sheet" shorthand.
        if (c1 == 0 && r2 == 0) || (r1 == 0 && c2 == 0) {
            c1 = 0;
            r1 = 0;
            c2 = 0;
            r2 = 0;
        }

        let rtl = c2 < c1;
        let btt = r2 < r1;

        let (mut left, mut right) = if keep_order { (c1, c2) } else { (c1.min(c2), c1.max(c2)) };
        let (mut top, mut bottom) = if keep_order { (r1, r2) } else { (r1.min(r2), r1.max(r2)) };
        if !keep_order {
            left = left.min(right);
            right = right.max(left);
            top = top.min(bottom);
            bottom = bottom.max(top);
        }

        self.previous_active_range = self.active_range;

        let metadata = store.resolve(left.max(1), top.max(1));

        let geometry = CellGeometry {
            x: view.cell_x(left),
            y: view.cell_y(top),
            col: left,
            row: top,
            width: view.cell_x(right) - view.cell_x(left) + view.cell_width(right),
            height: view.cell_y(bottom) - view.cell_y(top) + view.cell_height(bottom),
            col_span: (right - left + 1).max(1),
            row_span: (bottom - top + 1).max(1),
            metadata,
            rtl,
            btt,
        };

        self.active_range = Cell::classify(left, top, geometry);

        let active_col = if rtl { right } else { left };
        let active_row = if btt { bottom } else { top };
        self.active_cell = Cell::classify(
            active_col,
            active_row,
            CellGeometry {
                col: active_col,
                row: active_row,
                metadata: store.resolve(active_col.max(1), active_row.max(1)),
                ..geometry
            },
        );

        let cursor_col = if rtl { left } else { right };
        let cursor_row = if btt { top } else { bottom };
        self.cursor_cell = Cell::classify(
            cursor_col,
            cursor_row,
            CellGeometry {
                col: cursor_col,
                row: cursor_row,
                metadata: store.resolve(cursor_col.max(1), cursor_row.max(1)),
                ..geometry
            },
        );

        if let Some((vw, vh)) = auto_scroll {
            let target = if follow_cursor { &self.cursor_cell } else { &self.active_cell };
            let g = target.geometry();
            view.scroll_to(g.col, g.row, vw, vh);
        }
    }

    pub fn update_from_a1_name(
        &mut self,
        store: &TableStore,
        view: &mut ViewIndex,
        name: &str,
        auto_scroll: Option<(i64, i64)>,
    ) -> bool {
        let Some(range) = a1::parse_range(name) else { return false };
        self.update_from_position(store, view, range.c1 as i64, range.r1 as i64, range.c2 as i64, range.r2 as i64, false, true, auto_scroll);
        true
    }

    pub fn select_element_from_point(&mut self, store: &TableStore, view: &mut ViewIndex, x: i64, y: i64) {
        let (col, row) = view.cell_at_point(x, y);
        self.update_from_position(store, view, col, row, col, row, false, false, None);
    }

    pub fn check_contains_point(&self, x: i64, y: i64) -> bool {
        let g = self.active_range.geometry();
        x >= g.x && x < g.x + g.width && y >= g.y && y < g.y + g.height
    }

    pub fn begin_drag(&mut self, store: &TableStore, view: &mut ViewIndex, x: i64, y: i64) {
        self.select_element_from_point(store, view, x, y);
        let g = self.active_cell.geometry();
        self.drag_anchor = (g.col, g.row);
        self.drag = DragState::Dragging;
    }

    pub fn drag_to(&mut self, store: &TableStore, view: &mut ViewIndex, x: i64, y: i64, viewport: (i64, i64)) {
        if self.drag != DragState::Dragging {
            return;
        }
        let (anchor_col, anchor_row) = self.drag_anchor;
        let (col, row) = view.cell_at_point(x, y);
        self.update_from_position(store, view, anchor_col, anchor_row, col, row, true, true, Some(viewport));
    }

    pub fn end_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn active_cell_metadata(&self) -> CellMetadata {
        self.active_cell.geometry().metadata
    }
}
