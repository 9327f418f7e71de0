// Author profile resolution: wraps the external profile service with a
// per-run memo, a rate limiter, and a timeout per lookup.

pub mod client;
pub mod rate_limiter;
pub mod resolver;
pub mod traits;

pub use resolver::ProfileResolver;
pub use traits::ProfileLookup;
