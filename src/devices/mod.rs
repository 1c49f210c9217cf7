//! Turning raw agent records into the rows the dashboard shows.

pub mod normalize;
pub mod pipeline;
pub mod status;

pub use normalize::{DeviceId, NormalizedDevice, normalize_all};
pub use pipeline::{DeviceQuery, StatusCounts, StatusFilter};
