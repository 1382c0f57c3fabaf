pub mod agent;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod providers;
pub mod toolkit;
pub mod tools;
