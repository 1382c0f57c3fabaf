pub mod calc;
pub mod web;
