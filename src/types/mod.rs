pub mod config;
pub mod grade;
