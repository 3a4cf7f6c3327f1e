//! Streaming Ring Buffers
//!
//! Bounded sliding buffers, one per (asset, channel), that re-implement the
//! windowing contract incrementally over live input.

mod buffer;
mod table;

pub use buffer::{BufferState, StreamBuffer};
pub use table::BufferTable;
