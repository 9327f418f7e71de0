pub mod ingest;
pub mod persist;
