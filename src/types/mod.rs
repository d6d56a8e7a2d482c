//! Data types for block extraction and annotation.

mod block;
mod cell;
mod comment;
mod grid;
mod style;

pub use block::*;
pub use cell::*;
pub use comment::*;
pub use grid::*;
pub use style::*;
