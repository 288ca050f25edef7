//! Extraction stage: list every configured table, then find attachments
//!
//! - [`tables`] fans out one worker per base and merges their results
//! - [`attachments`] walks record fields for attachment descriptors

pub mod attachments;
pub mod tables;

pub use attachments::extract_attachments;
pub use tables::extract_all_tables;
