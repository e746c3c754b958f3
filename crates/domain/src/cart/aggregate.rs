//! Cart aggregate implementation.

use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::money::{Money, MoneyError};
use crate::value_objects::ProductId;

use super::{CartError, CartEvent};

/// One product in a cart, priced at the moment it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub name: String,
    pub image: String,
    pub unit_price: Money,
    pub qty: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price.multiply(self.qty)
    }
}

/// What the buyer sends when adding or updating a line.
#[derive(Debug, Clone)]
pub struct CartLineInput {
    pub product: ProductId,
    pub name: String,
    pub image: String,
    pub qty: i64,
    pub price: Money,
    /// Zero when the product has no discount.
    pub discounted_price: Money,
}

impl CartLineInput {
    pub fn new(product: impl Into<ProductId>, name: impl Into<String>, qty: i64, price: Money) -> Self {
        Self {
            product: product.into(),
            name: name.into(),
            image: String::new(),
            qty,
            price,
            discounted_price: Money::zero(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_discounted_price(mut self, discounted_price: Money) -> Self {
        self.discounted_price = discounted_price;
        self
    }

    /// The discounted price when there is one, else the list price.
    pub fn effective_price(&self) -> Money {
        if self.discounted_price.is_positive() {
            self.discounted_price
        } else {
            self.price
        }
    }

    fn validate(&self) -> Result<u32, CartError> {
        if self.product.as_str().trim().is_empty() {
            return Err(CartError::ProductRequired);
        }
        let qty = u32::try_from(self.qty)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity { qty: self.qty })?;
        if self.price.is_negative() || self.discounted_price.is_negative() {
            return Err(CartError::InvalidPrice {
                product: self.product.clone(),
            });
        }
        Ok(qty)
    }
}

/// A user's cart.
///
/// Lines keep insertion order; re-adding a product replaces the quantity
/// of its existing line instead of appending a second one.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    id: Option<AggregateId>,
    version: Version,
    owner: Option<UserId>,
    lines: Vec<CartLine>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
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
            CartEvent::CartOpened(data) => {
                self.id = Some(data.cart_id);
                self.owner = Some(data.owner);
            }
            CartEvent::CartLineAdded(line) => self.lines.push(line),
            CartEvent::CartLineQuantityChanged(data) => {
                if let Some(line) = self.line_mut(&data.product) {
                    line.qty = data.new_qty;
                }
            }
            CartEvent::CartLineRemoved(data) => {
                self.lines.retain(|line| line.product != data.product);
            }
            CartEvent::CartCleared(_) => self.lines.clear(),
        }
    }
}

// Query methods
impl Cart {
    pub fn owner(&self) -> Option<&UserId> {
        self.owner.as_ref()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product == product)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn items_price(&self) -> Result<Money, MoneyError> {
        Money::try_sum(self.lines.iter().map(CartLine::line_total))
    }

    fn line_mut(&mut self, product: &ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| &line.product == product)
    }
}

// Command methods
impl Cart {
    /// Adds a line, or replaces the quantity of an existing one.
    ///
    /// An existing line keeps its original price snapshot. The cart is
    /// opened on the first add.
    pub fn upsert_line(
        &self,
        cart_id: AggregateId,
        owner: &UserId,
        input: CartLineInput,
    ) -> Result<Vec<CartEvent>, CartError> {
        let qty = input.validate()?;

        let mut events = Vec::new();
        if self.id.is_none() {
            events.push(CartEvent::cart_opened(cart_id, owner.clone()));
        }

        let unit_price = match self.line(&input.product) {
            Some(existing) => existing.unit_price,
            None => input.effective_price(),
        };
        if unit_price.multiply(qty).is_err() {
            return Err(CartError::AmountOutOfRange {
                product: input.product,
            });
        }

        match self.line(&input.product) {
            Some(existing) if existing.qty == qty => {}
            Some(existing) => events.push(CartEvent::line_quantity_changed(
                input.product.clone(),
                existing.qty,
                qty,
            )),
            None => {
                events.push(CartEvent::CartLineAdded(CartLine {
                    product: input.product,
                    name: input.name,
                    image: input.image,
                    unit_price,
                    qty,
                }));
            }
        }

        Ok(events)
    }

    /// Drops the line for `product`. Absent products are a no-op.
    pub fn remove_line(&self, product: &ProductId) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_exists()?;

        if self.line(product).is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::line_removed(product.clone())])
    }

    pub fn clear(&self) -> Result<Vec<CartEvent>, CartError> {
        self.ensure_exists()?;

        if self.lines.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::cart_cleared(self.lines.len())])
    }

    fn ensure_exists(&self) -> Result<(), CartError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(CartError::NotFound),
        }
    }
}
