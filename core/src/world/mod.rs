//! Shared world state: datasets, subdatasets, their metadata, the
//! color palette and the anchor round. All mutation happens under
//! `datasetMutex` (`World`) or `mapMutex` (the color palette, which
//! lives on `session::table::ConnectionTable` instead — see §5 for why
//! the split follows lock ownership rather than logical grouping).

pub mod anchor;
pub mod dataset;
pub mod metadata;
pub mod palette;
pub mod state;

pub use state::World;
