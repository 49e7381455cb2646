//! Application root and per-session service graph.
//!
//! [`App`] owns the injected backend and the auth service; opening a
//! session builds the user-scoped repositories and services in one place.
//! Nothing here is a process-wide singleton: tests run many apps side by
//! side over independent in-memory backends.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::instrument;

use thriftr_core::{Order, OrderId, OrderStatus, Price, UserId};

use crate::auth::{AuthService, SessionStatus};
use crate::backend::{AuthApi, AuthUser, DocumentStore, FileStore};
use crate::cart::{CartService, SyncEvent};
use crate::catalog::CatalogService;
use crate::config::{AppConfig, BucketIds, CollectionIds};
use crate::error::{AppError, Result};
use crate::repository::{
    CartRepository, OrderRepository, ProductRepository, ProfileRepository, WishlistRepository,
};
use crate::wishlist::{WishlistEvent, WishlistService};

/// The full backend contract the client runs against.
pub trait Backend: DocumentStore + FileStore + AuthApi {}

impl<T: DocumentStore + FileStore + AuthApi> Backend for T {}

/// Application root: backend, auth, and collection wiring.
pub struct App<B> {
    backend: Arc<B>,
    auth: AuthService<B>,
    collections: CollectionIds,
    buckets: BucketIds,
}

impl<B: Backend> App<B> {
    /// Wire an app over an injected backend.
    #[must_use]
    pub fn new(backend: Arc<B>, collections: CollectionIds, buckets: BucketIds) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&backend)),
            backend,
            collections,
            buckets,
        }
    }

    /// The auth service, for probes and recovery flows.
    #[must_use]
    pub fn auth(&self) -> &AuthService<B> {
        &self.auth
    }

    /// The startup probe; see [`AuthService::check_session`].
    pub async fn startup(&self) -> SessionStatus {
        self.auth.check_session().await
    }

    /// Register, open a session, and persist the initial profile.
    #[instrument(skip(self, password), level = "debug")]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Session<B>> {
        let user = self.auth.sign_up(email, password).await?;
        let session = self.open_session(user);

        let mut profile = session.profile.fetch().await?;
        profile.first_name = first_name.to_string();
        profile.last_name = last_name.to_string();
        session.profile.save(&profile).await?;
        Ok(session)
    }

    /// Open a session with email/password credentials.
    #[instrument(skip(self, password), level = "debug")]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session<B>> {
        let user = self.auth.sign_in(email, password).await?;
        Ok(self.open_session(user))
    }

    /// Build the user-scoped service graph for an authenticated user.
    #[must_use]
    pub fn open_session(&self, user: AuthUser) -> Session<B> {
        let products = Arc::new(ProductRepository::new(
            Arc::clone(&self.backend),
            self.collections.products.clone(),
            self.buckets.product_images.clone(),
        ));
        let cart_repo = Arc::new(CartRepository::new(
            Arc::clone(&self.backend),
            self.collections.carts.clone(),
            user.id.clone(),
        ));
        let wishlist_repo = Arc::new(WishlistRepository::new(
            Arc::clone(&self.backend),
            self.collections.wishlists.clone(),
            user.id.clone(),
        ));

        let (cart, cart_events) = CartService::new(cart_repo, Arc::clone(&products));
        let (wishlist, wishlist_events) = WishlistService::new(wishlist_repo);

        Session {
            cart,
            cart_events,
            wishlist,
            wishlist_events,
            catalog: CatalogService::new(Arc::clone(&products)),
            products,
            orders: OrderRepository::new(
                Arc::clone(&self.backend),
                self.collections.orders.clone(),
                user.id.clone(),
            ),
            profile: ProfileRepository::new(
                Arc::clone(&self.backend),
                self.collections.users.clone(),
                self.buckets.profile_images.clone(),
                user.id.clone(),
                user.email.clone(),
            ),
            user,
        }
    }

    /// Tear down a session and close it remotely.
    #[instrument(skip(self, session), level = "debug")]
    pub async fn sign_out(&self, session: &mut Session<B>) -> Result<()> {
        session.shutdown();
        self.auth.sign_out().await
    }
}

impl App<crate::backend::AppwriteBackend> {
    /// Wire the production app from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(crate::backend::AppwriteBackend::new(config)),
            config.collections.clone(),
            config.buckets.clone(),
        )
    }
}

/// One signed-in user's services.
pub struct Session<B> {
    user: AuthUser,
    pub cart: CartService<B>,
    pub wishlist: WishlistService<B>,
    pub catalog: CatalogService<B>,
    pub profile: ProfileRepository<B>,
    products: Arc<ProductRepository<B>>,
    orders: OrderRepository<B>,
    cart_events: mpsc::UnboundedReceiver<SyncEvent>,
    wishlist_events: mpsc::UnboundedReceiver<WishlistEvent>,
}

impl<B: Backend> Session<B> {
    /// The authenticated user.
    #[must_use]
    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    /// The shared product repository (detail screens, admin entry).
    #[must_use]
    pub fn products(&self) -> &ProductRepository<B> {
        &self.products
    }

    /// Load the confirmed cart and wishlist after opening the session.
    pub async fn refresh(&mut self) -> Result<()> {
        self.cart.refresh().await?;
        self.wishlist.refresh().await
    }

    /// Fold any completed background writes into local state. Call from
    /// the UI loop; never blocks.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.cart_events.try_recv() {
            self.cart.apply_event(event);
        }
        while let Ok(event) = self.wishlist_events.try_recv() {
            self.wishlist.apply_event(event);
        }
    }

    /// Place an order for the current cart and empty it.
    #[instrument(skip(self), level = "debug")]
    pub async fn checkout(&mut self, shipping_address: String) -> Result<Order> {
        let lines = self.cart.items();
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }
        let summary = self.cart.summary();
        let order = Order::from_cart(&lines, Price::new(summary.total), shipping_address);
        self.orders.place(&order).await?;
        self.cart.clear().await?;
        Ok(order)
    }

    /// The user's order history, oldest first.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.orders.fetch().await
    }

    /// Cancel a placed order.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<()> {
        self.orders
            .update_status(order_id, OrderStatus::Cancelled)
            .await
    }

    /// Cancel timers and drop local state. Remote documents are kept.
    pub fn shutdown(&mut self) {
        self.cart.shutdown();
        self.wishlist.shutdown();
    }
}
