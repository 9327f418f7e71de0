// Page fetching: the browser-automation capability behind a trait.

pub mod file;
pub mod render;
pub mod traits;

pub use traits::{Browser, Credentials, FetchRequest, PageFetcher};
