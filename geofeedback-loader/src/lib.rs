pub mod error;
pub mod feature;
pub mod loader;
pub mod source;

pub use error::LoadError;
pub use feature::{Category, Coordinates, Dataset, Facility, RiskLevel};
pub use loader::{DataLoader, DataOrigin, LoadOutcome, ProgressCallback};
pub use source::{DataSource, LocalSource};
