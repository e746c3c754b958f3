use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an event stream (one aggregate instance).
///
/// Most streams get a random id. Streams that are naturally keyed by
/// something else (a user's cart, a product's reviews) use
/// [`AggregateId::derived`] so the same key always maps to the same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic aggregate ID from a stream kind and a key.
    ///
    /// `derived("cart", "u-1")` returns the same id on every call and
    /// never collides with `derived("profile", "u-1")`.
    pub fn derived(kind: &str, key: &str) -> Self {
        let name = format!("storefront:{kind}:{key}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses an aggregate ID from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

/// Identifier of a user as issued by the authentication service.
///
/// Opaque to this system; only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A verified caller identity, attached to every authenticated request.
///
/// Authentication happens elsewhere; this type only carries the result so
/// that authorization checks (ownership, admin override) can be made
/// explicitly at each call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub is_admin: bool,
    pub is_seller: bool,
}

impl Identity {
    /// Creates a regular (non-admin, non-seller) identity.
    pub fn customer(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            is_admin: false,
            is_seller: false,
        }
    }

    /// Creates an administrator identity.
    pub fn admin(user_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::customer(user_id, name)
        }
    }

    /// Returns true if this identity may act on a resource owned by `owner`.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.is_admin || &self.user_id == owner
    }
}
