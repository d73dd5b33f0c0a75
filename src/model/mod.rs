// File: ./src/model/mod.rs
// Aggregates the split model files
pub mod block;
pub mod item;
pub mod parser;

pub use block::{Block, Identity, SlotRow};
pub use item::{Course, CourseMembership, CourseRoster, DAYS_PER_WEEK, DayCodes, StudentRecord};
