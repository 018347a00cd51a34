//! Mock device implementations for testing and development.
//!
//! These simulate the scanner hardware in memory and are controlled
//! programmatically through their handles.

pub mod indicator;
pub mod table;

// Re-export commonly used types
pub use indicator::{MockIndicator, MockIndicatorHandle};
pub use table::{BusOperation, MockMultiplexer, MockReader, MockTable, MockTableHandle};
