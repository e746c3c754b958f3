//! Profile domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{ContactInfo, ShippingAddress};

/// Events that can occur on a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProfileEvent {
    /// Checkout details were remembered. Absent fields leave the stored
    /// value untouched.
    ProfileDetailsSaved(ProfileDetailsSavedData),
}

impl DomainEvent for ProfileEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProfileEvent::ProfileDetailsSaved(_) => "ProfileDetailsSaved",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDetailsSavedData {
    pub profile_id: AggregateId,
    pub user: UserId,
    pub contact_info: Option<ContactInfo>,
    pub shipping_address: Option<ShippingAddress>,
    pub saved_at: DateTime<Utc>,
}
