//! Buyer profile: contact and shipping details remembered from the last
//! checkout, used to pre-fill the next one.

mod aggregate;
mod events;
mod service;

pub use aggregate::Profile;
pub use events::{ProfileDetailsSavedData, ProfileEvent};
pub use service::ProfileService;

use thiserror::Error;

/// Errors that can occur when saving profile details.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid contact info: {0}")]
    InvalidContact(&'static str),
}
