pub mod browser;
pub mod config;
pub mod crawler;
pub mod sink;

mod data;
mod error;
mod extractor;

pub use data::{FieldSpec, Property, Record, UrlEntry};
pub use error::CrawlerError;
pub use extractor::Extractor;
