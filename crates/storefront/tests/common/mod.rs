//! Shared fixtures for router tests: in-memory stores, a fake auth provider
//! and fake object storage behind the real router.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;
use url::Url;

use bazaar_core::{CartId, CartItemId, Price, ProductId, StoreSlug, TagList, UserId};
use bazaar_storefront::config::{AuthProviderConfig, GatePolicy, StorageConfig, StorefrontConfig};
use bazaar_storefront::db::{CartStore, ProductStore, ProfileStore, RepositoryError, Stores};
use bazaar_storefront::models::{
    Cart, CartItemRecord, CartLine, CartOwner, CartRecord, NewProduct, OwnedCartItem, Product,
    ProductChanges, ProductSnapshot, Profile,
};
use bazaar_storefront::routes;
use bazaar_storefront::services::auth::{
    AccessClaims, AuthProvider, AuthProviderError, AuthSession,
};
use bazaar_storefront::services::storage::{ImageStorage, StorageError};
use bazaar_storefront::state::AppState;

pub const JWT_SECRET: &str = "r0uter-T3st-s1gning-k3y-9f2c";
pub const AUDIENCE: &str = "authenticated";

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    products: Vec<Product>,
    carts: Vec<CartRecord>,
    items: Vec<CartItemRecord>,
}

/// Profiles, products and carts held in memory, with the same uniqueness
/// rules as the database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Make every profile lookup, cart operation and ping fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn seed_profile(&self, user: UserId, store: Option<(&str, &str)>) {
        let now = Utc::now();
        let profile = Profile {
            id: user,
            store_name: store.map(|(name, _)| name.to_string()),
            store_slug: store.map(|(_, slug)| StoreSlug::parse(slug).unwrap()),
            is_setup_complete: store.is_some(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().profiles.insert(user, profile);
    }

    pub fn seed_product(&self, owner: UserId, title: &str, price: &str, stock: i32) -> ProductId {
        self.seed_product_with_image(owner, title, price, stock, None)
    }

    pub fn seed_product_with_image(
        &self,
        owner: UserId,
        title: &str,
        price: &str,
        stock: i32,
        image_path: Option<&str>,
    ) -> ProductId {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            profile_id: owner,
            title: title.to_string(),
            description: String::new(),
            tags: TagList::default(),
            stock,
            price: Price::parse(price).unwrap(),
            image_path: image_path.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        let id = product.id;
        self.tables.lock().unwrap().products.push(product);
        id
    }

    pub fn profile(&self, user: UserId) -> Option<Profile> {
        self.tables.lock().unwrap().profiles.get(&user).cloned()
    }

    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.tables
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn cart_count(&self) -> usize {
        self.tables.lock().unwrap().carts.len()
    }

    pub fn item_count(&self) -> usize {
        self.tables.lock().unwrap().items.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }

    async fn setup_state(&self, user: UserId) -> Result<Option<bool>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .profiles
            .get(&user)
            .map(|p| p.is_setup_complete))
    }

    async fn get(&self, user: UserId) -> Result<Option<Profile>, RepositoryError> {
        self.check_available()?;
        Ok(self.profile(user))
    }

    async fn get_storefront(&self, slug: &StoreSlug) -> Result<Option<Profile>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .profiles
            .values()
            .find(|p| p.is_setup_complete && p.store_slug.as_ref() == Some(slug))
            .cloned())
    }

    async fn ensure(&self, user: UserId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let now = Utc::now();
        self.tables
            .lock()
            .unwrap()
            .profiles
            .entry(user)
            .or_insert_with(|| Profile {
                id: user,
                store_name: None,
                store_slug: None,
                is_setup_complete: false,
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn complete_setup(
        &self,
        user: UserId,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<Profile, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        let taken = tables
            .profiles
            .values()
            .any(|p| p.id != user && p.store_slug.as_ref() == Some(slug));
        if taken {
            return Err(RepositoryError::Conflict("store slug".to_string()));
        }

        let now = Utc::now();
        let profile = tables.profiles.entry(user).or_insert_with(|| Profile {
            id: user,
            store_name: None,
            store_slug: None,
            is_setup_complete: false,
            created_at: now,
            updated_at: now,
        });
        profile.store_name = Some(store_name.to_string());
        profile.store_slug = Some(slug.clone());
        profile.is_setup_complete = true;
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn list_storefronts(&self) -> Result<Vec<Profile>, RepositoryError> {
        self.check_available()?;
        let mut stores: Vec<Profile> = self
            .tables
            .lock()
            .unwrap()
            .profiles
            .values()
            .filter(|p| p.is_setup_complete)
            .cloned()
            .collect();
        stores.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stores)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn create(&self, owner: UserId, product: &NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            profile_id: owner,
            title: product.title.clone(),
            description: product.description.clone(),
            tags: product.tags.clone(),
            stock: product.stock,
            price: product.price,
            image_path: product.image_path.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().products.push(product.clone());
        Ok(product)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.product(id))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .products
            .iter()
            .rev()
            .filter(|p| p.profile_id == owner)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(product) = tables
            .products
            .iter_mut()
            .find(|p| p.id == id && p.profile_id == owner)
        else {
            return Ok(None);
        };
        product.title = changes.title.clone();
        if let Some(description) = &changes.description {
            product.description = description.clone();
        }
        if let Some(tags) = &changes.tags {
            product.tags = tags.clone();
        }
        product.stock = changes.stock;
        product.price = changes.price;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId, owner: UserId) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(index) = tables
            .products
            .iter()
            .position(|p| p.id == id && p.profile_id == owner)
        else {
            return Ok(None);
        };
        let product = tables.products.remove(index);
        tables.items.retain(|item| item.product_id != id);
        Ok(Some(product))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<CartRecord>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .carts
            .iter()
            .find(|c| &c.owner == owner)
            .cloned())
    }

    async fn create_cart(&self, owner: &CartOwner) -> Result<CartRecord, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.carts.iter().any(|c| &c.owner == owner) {
            return Err(RepositoryError::Conflict("cart owner".to_string()));
        }
        let now = Utc::now();
        let cart = CartRecord {
            id: CartId::generate(),
            owner: owner.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.carts.push(cart.clone());
        Ok(cart)
    }

    async fn find_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Option<CartItemRecord>, RepositoryError> {
        self.check_available()?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.cart_id == cart && i.product_id == product)
            .cloned())
    }

    async fn insert_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItemRecord, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        if tables
            .items
            .iter()
            .any(|i| i.cart_id == cart && i.product_id == product)
        {
            return Err(RepositoryError::Conflict("cart item".to_string()));
        }
        let item = CartItemRecord {
            id: CartItemId::generate(),
            cart_id: cart,
            product_id: product,
            quantity,
        };
        tables.items.push(item.clone());
        Ok(item)
    }

    async fn set_item_quantity(
        &self,
        item: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.lock().unwrap();
        let record = tables
            .items
            .iter_mut()
            .find(|i| i.id == item)
            .ok_or(RepositoryError::NotFound)?;
        record.quantity = quantity;
        Ok(())
    }

    async fn delete_item(&self, item: CartItemId) -> Result<(), RepositoryError> {
        self.check_available()?;
        self.tables.lock().unwrap().items.retain(|i| i.id != item);
        Ok(())
    }

    async fn item_with_owner(
        &self,
        item: CartItemId,
    ) -> Result<Option<OwnedCartItem>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().unwrap();
        let Some(record) = tables.items.iter().find(|i| i.id == item) else {
            return Ok(None);
        };
        let owner = tables
            .carts
            .iter()
            .find(|c| c.id == record.cart_id)
            .map(|c| c.owner.clone());
        Ok(owner.map(|owner| OwnedCartItem {
            item: record.clone(),
            owner,
        }))
    }

    async fn load_cart(&self, cart: CartId) -> Result<Option<Cart>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.lock().unwrap();
        let Some(record) = tables.carts.iter().find(|c| c.id == cart) else {
            return Ok(None);
        };
        let lines = tables
            .items
            .iter()
            .filter(|i| i.cart_id == cart)
            .filter_map(|item| {
                let product = tables.products.iter().find(|p| p.id == item.product_id)?;
                Some(CartLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product: ProductSnapshot {
                        id: product.id,
                        title: product.title.clone(),
                        price: product.price,
                        stock: product.stock,
                        image_path: product.image_path.clone(),
                    },
                })
            })
            .collect();
        Ok(Some(Cart::new(record, lines)))
    }
}

/// Cart store whose next `find_cart` and `find_item` miss, as if a
/// concurrent request inserted the row between the read and the write.
pub struct StaleReadCarts {
    inner: Arc<MemoryStore>,
    stale_cart: AtomicBool,
    stale_item: AtomicBool,
}

impl StaleReadCarts {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            stale_cart: AtomicBool::new(false),
            stale_item: AtomicBool::new(false),
        }
    }

    /// Make the next cart read and the next item read return `None`.
    pub fn miss_next_reads(&self) {
        self.stale_cart.store(true, Ordering::SeqCst);
        self.stale_item.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CartStore for StaleReadCarts {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<CartRecord>, RepositoryError> {
        if self.stale_cart.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_cart(owner).await
    }

    async fn create_cart(&self, owner: &CartOwner) -> Result<CartRecord, RepositoryError> {
        self.inner.create_cart(owner).await
    }

    async fn find_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Option<CartItemRecord>, RepositoryError> {
        if self.stale_item.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_item(cart, product).await
    }

    async fn insert_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItemRecord, RepositoryError> {
        self.inner.insert_item(cart, product, quantity).await
    }

    async fn set_item_quantity(
        &self,
        item: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.inner.set_item_quantity(item, quantity).await
    }

    async fn delete_item(&self, item: CartItemId) -> Result<(), RepositoryError> {
        self.inner.delete_item(item).await
    }

    async fn item_with_owner(
        &self,
        item: CartItemId,
    ) -> Result<Option<OwnedCartItem>, RepositoryError> {
        self.inner.item_with_owner(item).await
    }

    async fn load_cart(&self, cart: CartId) -> Result<Option<Cart>, RepositoryError> {
        self.inner.load_cart(cart).await
    }
}

// =============================================================================
// Fake auth provider
// =============================================================================

/// Auth provider answering from canned sessions.
#[derive(Default)]
pub struct FakeAuth {
    /// Refresh token -> session handed out for it. Unknown tokens are rejected.
    pub refreshes: Mutex<HashMap<String, AuthSession>>,
    /// Authorization code -> session handed out for it.
    pub codes: Mutex<HashMap<String, AuthSession>>,
    /// Verifiers received with code exchanges.
    pub verifiers: Mutex<Vec<String>>,
    pub sign_outs: Mutex<Vec<String>>,
    /// Fail refreshes as if the provider were unreachable.
    pub offline: AtomicBool,
}

impl FakeAuth {
    pub fn allow_refresh(&self, refresh_token: &str, session: AuthSession) {
        self.refreshes
            .lock()
            .unwrap()
            .insert(refresh_token.to_string(), session);
    }

    pub fn allow_code(&self, code: &str, session: AuthSession) {
        self.codes.lock().unwrap().insert(code.to_string(), session);
    }
}

fn rejected() -> AuthProviderError {
    AuthProviderError::Rejected {
        status: 400,
        message: "invalid_grant".to_string(),
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    fn authorize_url(&self, code_challenge: &str, redirect_to: &str) -> String {
        format!(
            "http://auth.test/authorize?code_challenge={code_challenge}&redirect_to={}",
            urlencoding::encode(redirect_to)
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        self.verifiers
            .lock()
            .unwrap()
            .push(code_verifier.to_string());
        self.codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(rejected)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthProviderError::Parse("connection reset".to_string()));
        }
        self.refreshes
            .lock()
            .unwrap()
            .get(refresh_token)
            .cloned()
            .ok_or_else(rejected)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        self.sign_outs
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(())
    }
}

// =============================================================================
// Fake object storage
// =============================================================================

/// Object storage that keeps paths in memory.
#[derive(Default)]
pub struct FakeStorage {
    pub objects: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_removals: AtomicBool,
}

#[async_trait]
impl ImageStorage for FakeStorage {
    async fn upload(
        &self,
        path: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.objects.lock().unwrap().push(path.to_string());
        Ok(path.to_string())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(StorageError::Api {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }
        self.objects.lock().unwrap().retain(|p| p != path);
        self.removed.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://storage.test/object/public/product_images/{path}")
    }
}

// =============================================================================
// Application
// =============================================================================

pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/bazaar_test".to_string()),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        auth: AuthProviderConfig {
            url: Url::parse("http://auth.test/auth/v1/").unwrap(),
            anon_key: "anon".to_string(),
            jwt_secret: SecretString::from(JWT_SECRET.to_string()),
            audience: AUDIENCE.to_string(),
            oauth_provider: "google".to_string(),
        },
        storage: StorageConfig {
            url: Url::parse("http://storage.test/").unwrap(),
            service_key: SecretString::from("service".to_string()),
            bucket: "product_images".to_string(),
        },
        gate: GatePolicy::default(),
        max_upload_bytes: 1024 * 1024,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The real router over in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<FakeAuth>,
    pub storage: Arc<FakeStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_carts(|store| store as Arc<dyn CartStore>)
    }

    /// Route cart operations through a wrapper around the memory store.
    pub fn with_carts(carts: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn CartStore>) -> Self {
        let store = Arc::new(MemoryStore::default());
        let auth = Arc::new(FakeAuth::default());
        let storage = Arc::new(FakeStorage::default());

        let stores = Stores {
            profiles: store.clone(),
            products: store.clone(),
            carts: carts(store.clone()),
        };
        let state = AppState::new(test_config(), stores, auth.clone(), storage.clone());

        Self {
            router: routes::app(state),
            store,
            auth,
            storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

// =============================================================================
// Tokens, requests and responses
// =============================================================================

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// A signed access token for `user`, valid for an hour.
pub fn access_token(user: UserId) -> String {
    sign_token(user, now() + 3600)
}

/// A correctly signed access token that expired an hour ago.
pub fn expired_token(user: UserId) -> String {
    sign_token(user, now() - 3600)
}

fn sign_token(user: UserId, exp: u64) -> String {
    let claims = AccessClaims {
        sub: user.to_string(),
        email: Some("seller@example.com".to_string()),
        exp,
        aud: AUDIENCE.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn session_for(user: UserId, refresh_token: &str) -> AuthSession {
    AuthSession {
        access_token: access_token(user),
        refresh_token: refresh_token.to_string(),
        expires_in: Some(3600),
    }
}

/// Cookie header for a signed-in user.
pub fn user_cookie(user: UserId) -> String {
    format!("bz-access-token={}", access_token(user))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: Method, uri: &str, cookie: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of a cookie set by the response, if any.
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response).iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    })
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Quantity of `product` in a cart JSON body.
pub fn quantity_in(cart: &serde_json::Value, product: ProductId) -> i64 {
    cart["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|line| line["product_id"] == product.to_string())
        .map_or(0, |line| line["quantity"].as_i64().unwrap())
}

pub fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}
