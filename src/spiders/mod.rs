//! Ready-made spiders.
//!
//! [`ListingSpider`] covers the common case of a paginated listing whose
//! records and "next" link can be described with CSS selectors.

mod listing;

pub use listing::{FieldSpec, ListingConfig, ListingSpider};
