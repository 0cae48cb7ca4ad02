//! CSV ingestion → geocoding enrichment → center calculation → HTML export.

pub mod center;
pub mod export;
pub mod geocode;
pub mod parse;
