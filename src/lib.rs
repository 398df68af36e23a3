//! Core engine for a spreadsheet-style data studio: a typed columnar table
//! store overlaid on an unbounded A1-style grid, with view indexing,
//! selection tracking and full undo/redo.
//!
//! This crate has no UI dependency. A host application drives the
//! [`Document`] command surface and listens for [`document::SelectionChanged`]
//! notifications.

pub mod a1;
pub mod cell;
pub mod codec;
pub mod column;
pub mod document;
pub mod error;
pub mod frame;
pub mod history;
pub mod selection;
pub mod spill;
pub mod store;
pub mod view;

pub use cell::{Cell, CellMetadata};
pub use column::{CellValue, Column, DType};
pub use document::{Document, EngineConfig, SelectionChanged};
pub use error::EngineError;
pub use frame::Frame;
pub use store::TableStore;
pub use view::ViewIndex;

fn default<T: Default>() -> T {
    T::default()
}
