//! Session/cart resolver.
//!
//! Every cart operation resolves the request identity to exactly one cart,
//! applies a line-item mutation and returns the materialized cart. There is no
//! in-process state: "one cart per identity" and "one item per (cart,
//! product)" are store constraints, and a conflict on either means a
//! concurrent request got there first, so the existing row is re-read.

use tracing::{debug, info};

use bazaar_core::{CartItemId, ProductId};

use crate::cookies::{GUEST_SESSION_COOKIE, StagedCookies, session_cookie};
use crate::db::{CartStore, ProductStore, RepositoryError};
use crate::error::AppError;
use crate::models::{Cart, CartItemRecord, CartOwner, CartRecord, GuestToken, Identity, OwnedCartItem};

/// Decide whether `caller` may modify `item`.
///
/// An absent item and an item in someone else's cart are indistinguishable
/// to the caller: both are `NotFound`.
///
/// # Errors
///
/// Returns `AppError::NotFound` unless the item exists and its cart belongs
/// to `caller`.
pub fn authorize_item(
    caller: &CartOwner,
    item: Option<OwnedCartItem>,
) -> Result<CartItemRecord, AppError> {
    match item {
        Some(owned) if &owned.owner == caller => Ok(owned.item),
        _ => Err(AppError::NotFound("Cart item not found".to_string())),
    }
}

/// Cart operations for one request.
pub struct CartService<'a> {
    carts: &'a dyn CartStore,
    products: &'a dyn ProductStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(carts: &'a dyn CartStore, products: &'a dyn ProductStore) -> Self {
        Self { carts, products }
    }

    /// The caller's cart, or `None` if the identity has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the store fails.
    pub async fn get(&self, identity: &Identity) -> Result<Option<Cart>, AppError> {
        let Some(owner) = identity.cart_owner() else {
            return Ok(None);
        };
        let Some(record) = self.carts.find_cart(&owner).await? else {
            return Ok(None);
        };
        Ok(self.carts.load_cart(record.id).await?)
    }

    /// Add `quantity` of a product to the caller's cart.
    ///
    /// A first-time guest gets a new session token, staged as a cookie on
    /// `cookies`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a quantity below 1 or one that
    /// would overflow, `AppError::NotFound` if the product does not exist and
    /// `AppError::Store` if the store fails.
    pub async fn add_item(
        &self,
        identity: &Identity,
        cookies: &mut StagedCookies,
        secure_cookies: bool,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, AppError> {
        if quantity < 1 {
            return Err(AppError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        if self.products.get(product_id).await?.is_none() {
            return Err(AppError::NotFound("Product not found".to_string()));
        }

        let owner = match identity.cart_owner() {
            Some(owner) => owner,
            None => {
                let token = GuestToken::generate();
                cookies.stage(session_cookie(
                    GUEST_SESSION_COOKIE,
                    token.as_str().to_owned(),
                    secure_cookies,
                ));
                debug!("Minted guest session");
                CartOwner::Guest(token)
            }
        };

        let cart = self.find_or_create_cart(&owner).await?;

        match self.carts.find_item(cart.id, product_id).await? {
            Some(existing) => self.increment(&existing, quantity).await?,
            None => match self.carts.insert_item(cart.id, product_id, quantity).await {
                Ok(_) => {}
                Err(RepositoryError::Conflict(_)) => {
                    let existing = self
                        .carts
                        .find_item(cart.id, product_id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal("cart item conflict without a row".to_string())
                        })?;
                    self.increment(&existing, quantity).await?;
                }
                Err(e) => return Err(e.into()),
            },
        }

        self.carts
            .load_cart(cart.id)
            .await?
            .ok_or_else(|| AppError::Internal("cart disappeared after update".to_string()))
    }

    /// Set the quantity of one of the caller's cart items. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a negative quantity,
    /// `AppError::Unauthorized` if the request has no cart identity,
    /// `AppError::NotFound` if the item is absent or not the caller's, and
    /// `AppError::Store` if the store fails.
    pub async fn set_quantity(
        &self,
        identity: &Identity,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Option<Cart>, AppError> {
        if quantity < 0 {
            return Err(AppError::Validation(
                "quantity cannot be negative".to_string(),
            ));
        }

        let item = self.owned_item(identity, item_id).await?;

        if quantity == 0 {
            self.carts.delete_item(item.id).await?;
        } else {
            self.carts
                .set_item_quantity(item.id, quantity)
                .await
                .map_err(not_found_as_item)?;
        }

        Ok(self.carts.load_cart(item.cart_id).await?)
    }

    /// Remove one of the caller's cart items.
    ///
    /// # Errors
    ///
    /// Same as [`CartService::set_quantity`], minus validation.
    pub async fn remove_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<Option<Cart>, AppError> {
        let item = self.owned_item(identity, item_id).await?;
        self.carts.delete_item(item.id).await?;
        Ok(self.carts.load_cart(item.cart_id).await?)
    }

    async fn owned_item(
        &self,
        identity: &Identity,
        item_id: CartItemId,
    ) -> Result<CartItemRecord, AppError> {
        let caller = identity.cart_owner().ok_or(AppError::Unauthorized)?;
        let item = self.carts.item_with_owner(item_id).await?;
        authorize_item(&caller, item)
    }

    async fn find_or_create_cart(&self, owner: &CartOwner) -> Result<CartRecord, AppError> {
        if let Some(cart) = self.carts.find_cart(owner).await? {
            return Ok(cart);
        }

        match self.carts.create_cart(owner).await {
            Ok(cart) => {
                info!(cart_id = %cart.id, "Created cart");
                Ok(cart)
            }
            Err(RepositoryError::Conflict(_)) => self
                .carts
                .find_cart(owner)
                .await?
                .ok_or_else(|| AppError::Internal("cart conflict without a row".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment(&self, existing: &CartItemRecord, by: i32) -> Result<(), AppError> {
        let quantity = existing
            .quantity
            .checked_add(by)
            .ok_or_else(|| AppError::Validation("quantity is too large".to_string()))?;
        self.carts
            .set_item_quantity(existing.id, quantity)
            .await
            .map_err(not_found_as_item)
    }
}

fn not_found_as_item(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Cart item not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use bazaar_core::{CartId, UserId};

    fn owned(owner: CartOwner) -> OwnedCartItem {
        OwnedCartItem {
            item: CartItemRecord {
                id: CartItemId::generate(),
                cart_id: CartId::generate(),
                product_id: ProductId::generate(),
                quantity: 1,
            },
            owner,
        }
    }

    #[test]
    fn test_authorize_own_item() {
        let owner = CartOwner::User(UserId::generate());
        let item = owned(owner.clone());
        let expected = item.item.clone();
        assert_eq!(authorize_item(&owner, Some(item)).unwrap(), expected);
    }

    #[test]
    fn test_foreign_item_is_not_found() {
        let caller = CartOwner::User(UserId::generate());
        let item = owned(CartOwner::User(UserId::generate()));
        assert!(matches!(
            authorize_item(&caller, Some(item)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_guest_cannot_touch_user_item() {
        let caller = CartOwner::Guest(GuestToken::generate());
        let item = owned(CartOwner::User(UserId::generate()));
        assert!(matches!(
            authorize_item(&caller, Some(item)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_absent_item_is_not_found() {
        let caller = CartOwner::Guest(GuestToken::generate());
        assert!(matches!(
            authorize_item(&caller, None),
            Err(AppError::NotFound(_))
        ));
    }
}
