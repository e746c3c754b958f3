//! Profile service.

use common::{AggregateId, UserId};
use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::value_objects::{ContactInfo, ShippingAddress};

use super::{Profile, ProfileError};

impl From<ProfileError> for DomainError {
    fn from(e: ProfileError) -> Self {
        DomainError::Profile(e)
    }
}

pub struct ProfileService<S: EventStore> {
    handler: CommandHandler<S, Profile>,
}

impl<S: EventStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn profile_id(user: &UserId) -> AggregateId {
        AggregateId::derived("profile", user.as_str())
    }

    #[tracing::instrument(skip(self, contact_info, shipping_address), fields(user_id = %user))]
    pub async fn save_checkout_details(
        &self,
        user: &UserId,
        contact_info: Option<ContactInfo>,
        shipping_address: Option<ShippingAddress>,
    ) -> Result<CommandResult<Profile>, DomainError> {
        let profile_id = Self::profile_id(user);
        self.handler
            .execute(profile_id, |profile| {
                profile.save_checkout_details(profile_id, user, contact_info, shipping_address)
            })
            .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn get(&self, user: &UserId) -> Result<Option<Profile>, DomainError> {
        self.handler.load_existing(Self::profile_id(user)).await
    }
}

impl<S: EventStore + Clone> Clone for ProfileService<S> {
    fn clone(&self) -> Self {
        Self::new(self.handler.store().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;

    #[tokio::test]
    async fn save_and_get() {
        let service = ProfileService::new(InMemoryEventStore::new());
        let user = UserId::new("u-1");
        assert!(service.get(&user).await.unwrap().is_none());

        service
            .save_checkout_details(&user, Some(ContactInfo::new("Ann Lee", "555")), None)
            .await
            .unwrap();

        let profile = service.get(&user).await.unwrap().unwrap();
        assert_eq!(profile.contact_info().unwrap().phone, "555");
        assert!(profile.shipping_address().is_none());
    }
}
