pub mod annotator;
pub mod app;
pub mod toolbar;
