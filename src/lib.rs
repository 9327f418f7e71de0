// Trawler: search-results post collector.
//
// This is the library root. Each module is one stage or capability of the
// ingest pipeline: fetch a results page, extract post records, resolve
// author profiles, assemble posts and persist them with their links.

pub mod assemble;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod profile;
