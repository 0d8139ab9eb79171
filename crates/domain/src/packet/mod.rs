pub mod entity;
pub mod error;
pub mod extractor;
pub mod trace;
