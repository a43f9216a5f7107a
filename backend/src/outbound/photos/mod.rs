//! Photo lookup adapters.

mod commons;

pub use commons::{CommonsPhotoResolver, DEFAULT_COMMONS_ENDPOINT, DEFAULT_MEMO_CAPACITY};
