//! Domain models for the MediMate system.

mod dose_time;
mod medicine;
mod schedule;

pub use dose_time::*;
pub use medicine::*;
pub use schedule::*;
