pub mod atera;
pub mod error;

pub use error::ApiError;
