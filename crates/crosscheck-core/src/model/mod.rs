//! Value types shared across the engine.

pub mod filter;
pub mod job;
pub mod tag;
pub mod version;

pub use filter::Filter;
pub use job::{local_path, Job, Project, Source, Target};
pub use tag::{parse_local_date, Tag};
pub use version::{Version, VersionContext};
