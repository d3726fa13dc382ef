pub mod app;
pub mod output;
pub mod report;
