//! Core types for CourseHub.

mod event;
mod identifiers;
mod identity;
mod record;

pub use event::*;
pub use identifiers::*;
pub use identity::*;
pub use record::*;
