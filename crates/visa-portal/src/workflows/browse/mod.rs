//! Public browse pages: country listing, details, popular destinations and the visa finder.

pub mod filter;
pub mod router;
pub mod samples;
pub mod service;

#[cfg(test)]
mod tests;

pub use filter::{CountryQuery, CountrySort, CountrySummary, FinderMatch, FinderQuery};
pub use router::browse_router;
pub use service::{BrowseError, BrowseService, CountryDetails, DataSource, Sourced};
