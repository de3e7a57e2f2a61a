mod candidate;
mod target;

pub use candidate::{Candidate, CatalogEntry, Title, TitleVariants};
pub use target::TargetDescription;
