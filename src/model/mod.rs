//! Document model types.
//!
//! Pages hold ordered text blocks with their geometry; the outline types
//! describe the recovered title and heading hierarchy.

mod block;
mod outline;
mod page;

pub use block::{BBox, Block, Line, Span, StyleFlags};
pub use outline::{DocumentOutline, Level, OutlineEntry};
pub use page::Page;
