//! Store access for cvdict-ingest
//!
//! - `entries`: Primary Store `dictionary` rows and their child collections
//! - `sources`: Source Store `cedict_entries` rows

pub mod entries;
pub mod sources;
