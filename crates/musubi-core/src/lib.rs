//! Cross-catalog anime entity resolution.
//!
//! Given a target description from one catalog and a pool of candidate
//! records from another, [`resolve`] returns the single candidate denoting
//! the same work, with a confidence score and the tier that found it.

pub mod cascade;
pub mod config;
pub mod error;
pub mod media_type;
pub mod models;
pub mod normalize;
pub mod similarity;

pub use cascade::{resolve, MatchMethod, MatchResult, Resolver, Tier};
pub use config::{FuzzyTierConfig, MatchConfig};
pub use error::MusubiError;
pub use media_type::{compatible, MediaType};
pub use models::{Candidate, CatalogEntry, TargetDescription, Title, TitleVariants};
pub use normalize::{clean, is_derivative, normalize, search_query};
pub use similarity::{breakdown, similarity, Breakdown, Containment};
