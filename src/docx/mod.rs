//!
//! OOXML document assembly and parsing: the shared document model, XML
//! helpers, and the writer/reader pipelines.

pub mod model;
pub mod reader;
pub mod writer;
pub mod xml;
