//! Cart reconciliation between the guest cart and the server cart.
//!
//! Signed-in shoppers use the server cart under `/carts/mine`; everyone else
//! uses the guest cart in storage. When a server call fails the same change
//! is applied to the guest cart instead, so the shopper never loses an
//! action. After sign-in [`CartService::sync_guest_cart`] replays the guest
//! lines into the server cart.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use dream_collections_core::api::{
    AddCartItemRequest, CartView, MessageResponse, UpdateCartItemRequest,
};
use dream_collections_core::{GuestCart, VariantId};

use crate::api::ApiClient;
use crate::auth::is_authenticated;
use crate::error::ClientError;
use crate::storage::{Storage, keys, read_json, write_json};

/// The server-side cart of the signed-in user.
pub trait RemoteCart: Send + Sync {
    /// `GET /carts/mine`
    fn fetch(&self) -> impl Future<Output = Result<CartView, ClientError>> + Send;

    /// `POST /carts/mine/items`
    fn add(
        &self,
        variant: VariantId,
        quantity: i32,
    ) -> impl Future<Output = Result<CartView, ClientError>> + Send;

    /// `PUT /carts/mine/items/{variantId}`
    fn update(
        &self,
        variant: VariantId,
        quantity: i32,
    ) -> impl Future<Output = Result<CartView, ClientError>> + Send;

    /// `DELETE /carts/mine/items/{variantId}`
    fn remove(&self, variant: VariantId)
    -> impl Future<Output = Result<CartView, ClientError>> + Send;

    /// `DELETE /carts/mine`
    fn clear(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl RemoteCart for ApiClient {
    async fn fetch(&self) -> Result<CartView, ClientError> {
        self.get("/carts/mine", &[]).await
    }

    async fn add(&self, variant: VariantId, quantity: i32) -> Result<CartView, ClientError> {
        let request = AddCartItemRequest {
            product_variant_id: variant,
            quantity,
        };
        self.post("/carts/mine/items", &request).await
    }

    async fn update(&self, variant: VariantId, quantity: i32) -> Result<CartView, ClientError> {
        self.put(
            &format!("/carts/mine/items/{variant}"),
            &UpdateCartItemRequest { quantity },
        )
        .await
    }

    async fn remove(&self, variant: VariantId) -> Result<CartView, ClientError> {
        self.delete(&format!("/carts/mine/items/{variant}")).await
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let _: MessageResponse = self.delete("/carts/mine").await?;
        Ok(())
    }
}

/// Whichever cart answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartSnapshot {
    Remote(CartView),
    Guest(GuestCart),
}

impl CartSnapshot {
    /// Units in the cart.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        match self {
            Self::Remote(view) => view.total_items_count,
            Self::Guest(cart) => cart.item_count(),
        }
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        match self {
            Self::Remote(view) => view.items.len(),
            Self::Guest(cart) => cart.items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    #[must_use]
    pub fn quantity_of(&self, variant: VariantId) -> Option<i32> {
        match self {
            Self::Remote(view) => view.quantity_of(variant),
            Self::Guest(cart) => cart.quantity_of(variant),
        }
    }
}

/// Cart operations with guest fallback.
#[derive(Clone)]
pub struct CartService<R> {
    remote: R,
    storage: Arc<dyn Storage>,
}

impl<R> std::fmt::Debug for CartService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("authenticated", &is_authenticated(self.storage.as_ref()))
            .finish_non_exhaustive()
    }
}

impl CartService<ApiClient> {
    /// Cart service over the API client and its storage.
    #[must_use]
    pub fn for_api(api: ApiClient) -> Self {
        let storage = api.storage_handle();
        Self::new(api, storage)
    }
}

impl<R: RemoteCart> CartService<R> {
    #[must_use]
    pub fn new(remote: R, storage: Arc<dyn Storage>) -> Self {
        Self { remote, storage }
    }

    fn authenticated(&self) -> bool {
        is_authenticated(self.storage.as_ref())
    }

    /// The server cart when signed in, otherwise (or on failure) the guest cart.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> CartSnapshot {
        if self.authenticated() {
            match self.remote.fetch().await {
                Ok(view) => return CartSnapshot::Remote(view),
                Err(e) => warn!(error = %e, "Failed to fetch cart, using guest cart"),
            }
        }
        CartSnapshot::Guest(self.guest_cart())
    }

    /// Add units of a variant.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidQuantity` for a quantity below one and
    /// `ClientError::Storage` if the guest cart cannot be saved.
    #[instrument(skip(self), fields(variant = %variant))]
    pub async fn add_item(
        &self,
        variant: VariantId,
        quantity: i32,
    ) -> Result<CartSnapshot, ClientError> {
        if quantity < 1 {
            return Err(ClientError::InvalidQuantity(quantity));
        }
        if self.authenticated() {
            match self.remote.add(variant, quantity).await {
                Ok(view) => return Ok(CartSnapshot::Remote(view)),
                Err(e) => warn!(error = %e, "Failed to add to cart, using guest cart"),
            }
        }
        self.mutate_guest(|cart| cart.add(variant, quantity))
    }

    /// Set the quantity of a line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be saved.
    #[instrument(skip(self), fields(variant = %variant))]
    pub async fn update_item(
        &self,
        variant: VariantId,
        quantity: i32,
    ) -> Result<CartSnapshot, ClientError> {
        if self.authenticated() {
            match self.remote.update(variant, quantity).await {
                Ok(view) => return Ok(CartSnapshot::Remote(view)),
                Err(e) => warn!(error = %e, "Failed to update cart, using guest cart"),
            }
        }
        self.mutate_guest(|cart| cart.update(variant, quantity))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be saved.
    #[instrument(skip(self), fields(variant = %variant))]
    pub async fn remove_item(&self, variant: VariantId) -> Result<CartSnapshot, ClientError> {
        if self.authenticated() {
            match self.remote.remove(variant).await {
                Ok(view) => return Ok(CartSnapshot::Remote(view)),
                Err(e) => warn!(error = %e, "Failed to remove from cart, using guest cart"),
            }
        }
        self.mutate_guest(|cart| cart.remove(variant))
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ClientError> {
        if self.authenticated() {
            match self.remote.clear().await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(error = %e, "Failed to clear cart, clearing guest cart"),
            }
        }
        self.clear_guest_cart()
    }

    /// Move guest lines into the server cart after sign-in.
    ///
    /// Lines the server refuses stay in the guest cart; the guest cart is
    /// removed once every line has been accepted. Failures are logged and
    /// never returned. Returns the number of lines moved.
    #[instrument(skip(self))]
    pub async fn sync_guest_cart(&self) -> usize {
        if !self.authenticated() {
            return 0;
        }
        let mut guest = self.guest_cart();
        if guest.is_empty() {
            return 0;
        }

        let mut moved = 0;
        let mut kept = Vec::new();
        for item in std::mem::take(&mut guest.items) {
            match self.remote.add(item.product_variant_id, item.quantity).await {
                Ok(_) => moved += 1,
                Err(e) => {
                    warn!(
                        variant = %item.product_variant_id,
                        error = %e,
                        "Failed to sync guest cart line"
                    );
                    kept.push(item);
                }
            }
        }

        let saved = if kept.is_empty() {
            self.clear_guest_cart()
        } else {
            guest.items = kept;
            self.save_guest_cart(&guest)
        };
        if let Err(e) = saved {
            warn!(error = %e, "Failed to update guest cart after sync");
        }

        info!(moved, "Guest cart synced");
        moved
    }

    /// Units in whichever cart [`Self::get_cart`] returns.
    pub async fn item_count(&self) -> i64 {
        self.get_cart().await.item_count()
    }

    /// The stored guest cart, or an empty one.
    #[must_use]
    pub fn guest_cart(&self) -> GuestCart {
        read_json(self.storage.as_ref(), keys::GUEST_CART).unwrap_or_default()
    }

    fn save_guest_cart(&self, cart: &GuestCart) -> Result<(), ClientError> {
        write_json(self.storage.as_ref(), keys::GUEST_CART, cart)
    }

    fn clear_guest_cart(&self) -> Result<(), ClientError> {
        self.storage.remove(keys::GUEST_CART)
    }

    fn mutate_guest(&self, change: impl FnOnce(&mut GuestCart)) -> Result<CartSnapshot, ClientError> {
        let mut cart = self.guest_cart();
        change(&mut cart);
        self.save_guest_cart(&cart)?;
        debug!(lines = cart.items.len(), "Guest cart saved");
        Ok(CartSnapshot::Guest(cart))
    }
}

/// The shopper's current cart, as shown in a cart badge or cart page.
#[derive(Debug)]
pub struct CartState<R> {
    service: CartService<R>,
    cart: Option<CartSnapshot>,
}

impl<R: RemoteCart> CartState<R> {
    #[must_use]
    pub const fn new(service: CartService<R>) -> Self {
        Self {
            service,
            cart: None,
        }
    }

    #[must_use]
    pub const fn cart(&self) -> Option<&CartSnapshot> {
        self.cart.as_ref()
    }

    #[must_use]
    pub const fn service(&self) -> &CartService<R> {
        &self.service
    }

    /// Reload the cart. Signed-out shoppers have no loaded cart.
    pub async fn refresh(&mut self) {
        self.cart = if self.service.authenticated() {
            Some(self.service.get_cart().await)
        } else {
            None
        };
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be saved.
    pub async fn add(&mut self, variant: VariantId, quantity: i32) -> Result<(), ClientError> {
        self.cart = Some(self.service.add_item(variant, quantity).await?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be saved.
    pub async fn update(&mut self, variant: VariantId, quantity: i32) -> Result<(), ClientError> {
        self.cart = Some(self.service.update_item(variant, quantity).await?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be saved.
    pub async fn remove(&mut self, variant: VariantId) -> Result<(), ClientError> {
        self.cart = Some(self.service.remove_item(variant).await?);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the guest cart cannot be removed.
    pub async fn clear(&mut self) -> Result<(), ClientError> {
        self.service.clear().await?;
        self.cart = None;
        Ok(())
    }

    /// Units in the loaded cart; 0 when nothing is loaded.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.cart.as_ref().map_or(0, CartSnapshot::item_count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use dream_collections_core::api::CartLine;
    use dream_collections_core::{CartId, CartItemId, UserId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    const RING: VariantId = VariantId::new(11);
    const CHAIN: VariantId = VariantId::new(12);

    /// Server cart double: every unit costs 100.00.
    #[derive(Default)]
    struct MockRemote {
        lines: Mutex<GuestCart>,
        calls: AtomicUsize,
        failing: AtomicBool,
        reject: Mutex<Option<VariantId>>,
    }

    impl MockRemote {
        fn failing() -> Self {
            let mock = Self::default();
            mock.failing.store(true, Ordering::SeqCst);
            mock
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn begin(&self, variant: Option<VariantId>) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rejected = variant.is_some() && *self.reject.lock().unwrap() == variant;
            if self.failing.load(Ordering::SeqCst) || rejected {
                return Err(ClientError::Status {
                    status: 503,
                    message: "Service unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn view(&self) -> CartView {
            let lines = self.lines.lock().unwrap();
            let items = lines
                .items
                .iter()
                .zip(1..)
                .map(|(item, id)| {
                    let unit = Decimal::new(10_000, 2);
                    CartLine {
                        cart_item_id: CartItemId::new(id),
                        product_variant_id: item.product_variant_id,
                        product_name: "Kundan Choker".to_string(),
                        product_image_url: None,
                        variant_size: "One Size".to_string(),
                        unit_price: Some(unit),
                        quantity: item.quantity,
                        subtotal: unit * Decimal::from(item.quantity),
                    }
                })
                .collect();
            CartView::from_lines(CartId::new(1), UserId::new(5), items)
        }
    }

    impl RemoteCart for &MockRemote {
        async fn fetch(&self) -> Result<CartView, ClientError> {
            self.begin(None)?;
            Ok(self.view())
        }

        async fn add(&self, variant: VariantId, quantity: i32) -> Result<CartView, ClientError> {
            self.begin(Some(variant))?;
            self.lines.lock().unwrap().add(variant, quantity);
            Ok(self.view())
        }

        async fn update(&self, variant: VariantId, quantity: i32) -> Result<CartView, ClientError> {
            self.begin(Some(variant))?;
            self.lines.lock().unwrap().update(variant, quantity);
            Ok(self.view())
        }

        async fn remove(&self, variant: VariantId) -> Result<CartView, ClientError> {
            self.begin(Some(variant))?;
            self.lines.lock().unwrap().remove(variant);
            Ok(self.view())
        }

        async fn clear(&self) -> Result<(), ClientError> {
            self.begin(None)?;
            self.lines.lock().unwrap().clear();
            Ok(())
        }
    }

    fn guest_storage() -> Arc<dyn Storage> {
        Arc::new(MemoryStorage::new())
    }

    fn signed_in_storage() -> Arc<dyn Storage> {
        let storage = guest_storage();
        storage.set(keys::TOKEN, "access").unwrap();
        storage.set(keys::USER, r#"{"id":5}"#).unwrap();
        storage
    }

    #[tokio::test]
    async fn test_guest_never_calls_remote() {
        let remote = MockRemote::default();
        let service = CartService::new(&remote, guest_storage());

        service.add_item(RING, 1).await.unwrap();
        service.add_item(RING, 2).await.unwrap();
        let cart = service.update_item(CHAIN, 4).await.unwrap();
        assert_eq!(cart.quantity_of(CHAIN), None);

        let cart = service.get_cart().await;
        assert!(!cart.is_remote());
        assert_eq!(cart.quantity_of(RING), Some(3));
        assert_eq!(service.item_count().await, 3);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_guest_cart_persists_in_storage() {
        let remote = MockRemote::default();
        let storage = guest_storage();
        let service = CartService::new(&remote, Arc::clone(&storage));

        service.add_item(RING, 2).await.unwrap();
        assert_eq!(
            storage.get(keys::GUEST_CART).as_deref(),
            Some(r#"{"items":[{"productVariantId":11,"quantity":2}],"totalAmount":0.0}"#)
        );

        service.update_item(RING, 0).await.unwrap();
        assert!(service.guest_cart().is_empty());

        service.add_item(CHAIN, 1).await.unwrap();
        service.clear().await.unwrap();
        assert!(storage.get(keys::GUEST_CART).is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let remote = MockRemote::default();
        let storage = signed_in_storage();
        let service = CartService::new(&remote, Arc::clone(&storage));

        for quantity in [0, -4] {
            let err = service.add_item(RING, quantity).await.unwrap_err();
            assert!(matches!(err, ClientError::InvalidQuantity(q) if q == quantity));
        }
        assert_eq!(remote.calls(), 0);
        assert!(storage.get(keys::GUEST_CART).is_none());
    }

    #[tokio::test]
    async fn test_signed_in_uses_server_cart() {
        let remote = MockRemote::default();
        let service = CartService::new(&remote, signed_in_storage());

        let cart = service.add_item(RING, 2).await.unwrap();
        let CartSnapshot::Remote(view) = &cart else {
            panic!("expected server cart");
        };
        assert_eq!(view.total_price, Decimal::new(20_000, 2));
        assert!(service.guest_cart().is_empty());

        service.remove_item(RING).await.unwrap();
        assert_eq!(service.item_count().await, 0);
        assert_eq!(remote.calls(), 3);
    }

    #[tokio::test]
    async fn test_server_failure_falls_back_to_guest_cart() {
        let remote = MockRemote::failing();
        let service = CartService::new(&remote, signed_in_storage());

        let cart = service.add_item(RING, 1).await.unwrap();
        assert_eq!(cart, CartSnapshot::Guest(service.guest_cart()));
        service.add_item(CHAIN, 2).await.unwrap();
        service.update_item(RING, 5).await.unwrap();
        service.remove_item(CHAIN).await.unwrap();

        let cart = service.get_cart().await;
        assert!(!cart.is_remote());
        assert_eq!(cart.quantity_of(RING), Some(5));
        assert_eq!(cart.quantity_of(CHAIN), None);
        assert_eq!(remote.calls(), 5);

        service.clear().await.unwrap();
        assert!(service.guest_cart().is_empty());
    }

    #[tokio::test]
    async fn test_sync_moves_guest_lines_to_server() {
        let remote = MockRemote::default();
        let storage = guest_storage();
        let service = CartService::new(&remote, Arc::clone(&storage));
        service.add_item(RING, 1).await.unwrap();
        service.add_item(CHAIN, 3).await.unwrap();

        assert_eq!(service.sync_guest_cart().await, 0);

        storage.set(keys::TOKEN, "access").unwrap();
        storage.set(keys::USER, r#"{"id":5}"#).unwrap();
        assert_eq!(service.sync_guest_cart().await, 2);

        assert!(storage.get(keys::GUEST_CART).is_none());
        let cart = service.get_cart().await;
        assert!(cart.is_remote());
        assert_eq!(cart.item_count(), 4);
    }

    #[tokio::test]
    async fn test_sync_keeps_rejected_lines() {
        let remote = MockRemote::default();
        *remote.reject.lock().unwrap() = Some(CHAIN);
        let storage = signed_in_storage();
        let mut guest = GuestCart::default();
        guest.add(RING, 1);
        guest.add(CHAIN, 3);
        write_json(storage.as_ref(), keys::GUEST_CART, &guest).unwrap();

        let service = CartService::new(&remote, storage);
        assert_eq!(service.sync_guest_cart().await, 1);

        let left = service.guest_cart();
        assert_eq!(left.items.len(), 1);
        assert_eq!(left.quantity_of(CHAIN), Some(3));
    }

    #[tokio::test]
    async fn test_cart_state_follows_mutations() {
        let remote = MockRemote::default();
        let storage = guest_storage();
        let mut state = CartState::new(CartService::new(&remote, Arc::clone(&storage)));

        state.refresh().await;
        assert!(state.cart().is_none());
        assert_eq!(state.item_count(), 0);

        state.add(RING, 2).await.unwrap();
        assert_eq!(state.item_count(), 2);

        storage.set(keys::TOKEN, "access").unwrap();
        storage.set(keys::USER, r#"{"id":5}"#).unwrap();
        state.refresh().await;
        assert!(state.cart().unwrap().is_remote());

        state.add(CHAIN, 1).await.unwrap();
        state.update(CHAIN, 4).await.unwrap();
        assert_eq!(state.item_count(), 4);

        state.clear().await.unwrap();
        assert!(state.cart().is_none());
        assert_eq!(state.item_count(), 0);
    }
}
