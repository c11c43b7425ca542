// File I/O operations

pub mod csv;
pub mod error;
pub mod html;
pub mod reader;
pub mod writer;

pub use error::{Backend, BackendFailure, ReadError};
pub use reader::{read, ReadOptions, ReadOutput};
