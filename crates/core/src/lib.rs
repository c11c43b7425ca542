//! `salesdash-core` - value types shared by the reader, the analytics engine
//! and the workbook writer.
//!
//! Nothing in here performs IO.

pub mod plan;
pub mod sheet;
pub mod table;
pub mod value;

pub use plan::{PlannedSheet, RawSlice, SheetContent, SheetPlan};
pub use sheet::{disambiguate_labels, RawSheet};
pub use table::{AggregateTable, TableKind};
pub use value::{datetime_to_serial, serial_to_datetime, CellValue};
