pub mod base;
pub mod research;
