//! Tagged-variant `Cell`: a visual grid cell, classified as content or one
//! of the three locator kinds, replacing the source's class hierarchy
//! (`SheetContentCell` / `SheetTopLocatorCell` / `SheetLeftLocatorCell` /
//! `SheetCornerLocatorCell`).

/// Resolved location of a visual cell inside the `TableStore`. `{-1,-1,-1}`
/// means the visual cell has no underlying frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetadata {
    pub frame_index: i64,
    pub intra_col: i64,
    pub intra_row: i64,
}

impl CellMetadata {
    pub const NONE: CellMetadata = CellMetadata { frame_index: -1, intra_col: -1, intra_row: -1 };

    pub fn is_none(&self) -> bool {
        self.frame_index < 0
    }
}

/// Geometry and resolution shared by every cell kind. All fields are
/// carried by every variant; only the tag differs (enum-of-structs, not
/// subclassing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub x: i64,
    pub y: i64,
    pub col: i64,
    pub row: i64,
    pub width: i64,
    pub height: i64,
    pub col_span: i64,
    pub row_span: i64,
    pub metadata: CellMetadata,
    /// Selection was extended right-to-left.
    pub rtl: bool,
    /// Selection was extended bottom-to-top.
    pub btt: bool,
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            col: 0,
            row: 0,
            width: 0,
            height: 0,
            col_span: 0,
            row_span: 0,
            metadata: CellMetadata::NONE,
            rtl: false,
            btt: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Content(CellGeometry),
    TopLocator(CellGeometry),
    LeftLocator(CellGeometry),
    CornerLocator(CellGeometry),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Content(CellGeometry::default())
    }
}

impl Cell {
    pub fn geometry(&self) -> &CellGeometry {
        match self {
            Cell::Content(g) | Cell::TopLocator(g) | Cell::LeftLocator(g) | Cell::CornerLocator(g) => g,
        }
    }

    pub fn geometry_mut(&mut self) -> &mut CellGeometry {
        match self {
            Cell::Content(g) | Cell::TopLocator(g) | Cell::LeftLocator(g) | Cell::CornerLocator(g) => g,
        }
    }

    /// Classifies a resolved `(col, row)` pair into the matching variant,
    /// mirroring `update_selection_from_position`'s dispatch on whether the
    /// start column/row is zero.
    pub fn classify(col: i64, row: i64, mut geometry: CellGeometry) -> Self {
        match (col == 0, row == 0) {
            (true, true) => Cell::CornerLocator(geometry),
            (false, true) => {
                geometry.row = geometry.row.max(1);
                Cell::TopLocator(geometry)
            }
            (true, false) => {
                geometry.col = geometry.col.max(1);
                Cell::LeftLocator(geometry)
            }
            (false, false) => Cell::Content(geometry),
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Cell::Content(_))
    }
}
