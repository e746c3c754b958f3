//! Profile aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::value_objects::{ContactInfo, ShippingAddress};

use super::{ProfileError, ProfileEvent, events::ProfileDetailsSavedData};

#[derive(Debug, Clone, Default)]
pub struct Profile {
    id: Option<AggregateId>,
    version: Version,
    user: Option<UserId>,
    contact_info: Option<ContactInfo>,
    shipping_address: Option<ShippingAddress>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Profile {
    type Event = ProfileEvent;
    type Error = ProfileError;

    fn aggregate_type() -> &'static str {
        "Profile"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProfileEvent::ProfileDetailsSaved(data) => {
                self.id = Some(data.profile_id);
                self.user = Some(data.user);
                if data.contact_info.is_some() {
                    self.contact_info = data.contact_info;
                }
                if data.shipping_address.is_some() {
                    self.shipping_address = data.shipping_address;
                }
                self.updated_at = Some(data.saved_at);
            }
        }
    }
}

impl Profile {
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn contact_info(&self) -> Option<&ContactInfo> {
        self.contact_info.as_ref()
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Remembers whatever was supplied. Nothing new means nothing written.
    pub fn save_checkout_details(
        &self,
        profile_id: AggregateId,
        user: &UserId,
        contact_info: Option<ContactInfo>,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<Vec<ProfileEvent>, ProfileError> {
        if let Some(contact) = &contact_info {
            if contact.full_name.trim().is_empty() {
                return Err(ProfileError::InvalidContact("full name is required"));
            }
        }

        let contact_info = contact_info.filter(|c| Some(c) != self.contact_info.as_ref());
        let shipping_address =
            shipping_address.filter(|a| Some(a) != self.shipping_address.as_ref());
        if contact_info.is_none() && shipping_address.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![ProfileEvent::ProfileDetailsSaved(
            ProfileDetailsSavedData {
                profile_id,
                user: user.clone(),
                contact_info,
                shipping_address,
                saved_at: Utc::now(),
            },
        )])
    }
}
