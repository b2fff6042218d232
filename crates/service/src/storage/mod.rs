//! Storage abstractions for service layer
//!
//! Contains the file-backed JSON document store that backs the social data.

pub mod json_doc_store;
