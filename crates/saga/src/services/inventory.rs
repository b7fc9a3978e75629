//! Inventory collaborator: product records owned by sellers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};

/// A product offered by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: UserId,
    /// Unique among the seller's products.
    pub name: String,
    pub price: Money,
    pub delivery_cost: Money,
    pub quantity: u32,
}

/// Full replacement of a product's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: String,
    pub price: Money,
    pub delivery_cost: Money,
    pub quantity: u32,
}

impl Product {
    /// An update that keeps everything but the quantity.
    pub fn with_quantity(&self, quantity: u32) -> ProductUpdate {
        ProductUpdate {
            name: self.name.clone(),
            price: self.price,
            delivery_cost: self.delivery_cost,
            quantity,
        }
    }
}

/// Product reads and whole-record updates.
///
/// Quantity changes are not deltas: callers read, modify and write back.
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Product>>;

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    products: HashMap<ProductId, Product>,
}

impl InMemoryInventoryState {
    fn name_taken(&self, seller_id: UserId, name: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.seller_id == seller_id && p.name == name && Some(p.id) != except)
    }
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
    fail_on_update: Arc<AtomicBool>,
}

impl InMemoryInventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a product for a seller.
    pub async fn add_product(
        &self,
        seller_id: UserId,
        name: impl Into<String>,
        price: Money,
        delivery_cost: Money,
        quantity: u32,
    ) -> Result<Product> {
        let name = name.into();
        let mut state = self.state.write().await;
        if state.name_taken(seller_id, &name, None) {
            return Err(SagaError::Upstream(format!(
                "product '{name}' already exists for seller {seller_id}"
            )));
        }

        let product = Product {
            id: ProductId::new(),
            seller_id,
            name,
            price,
            delivery_cost,
            quantity,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    /// Makes every subsequent update fail until reset.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.fail_on_update.store(fail, Ordering::SeqCst);
    }

    /// Current quantity of a product, if it exists.
    pub async fn quantity(&self, id: ProductId) -> Option<u32> {
        self.state.read().await.products.get(&id).map(|p| p.quantity)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.state
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| SagaError::not_found("product", id))
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product> {
        if self.fail_on_update.load(Ordering::SeqCst) {
            return Err(SagaError::Upstream("inventory unavailable".to_string()));
        }

        let mut state = self.state.write().await;
        let seller_id = state
            .products
            .get(&id)
            .map(|p| p.seller_id)
            .ok_or_else(|| SagaError::not_found("product", id))?;
        if state.name_taken(seller_id, &update.name, Some(id)) {
            return Err(SagaError::Upstream(format!(
                "product '{}' already exists for seller {seller_id}",
                update.name
            )));
        }

        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| SagaError::not_found("product", id))?;
        product.name = update.name;
        product.price = update.price;
        product.delivery_cost = update.delivery_cost;
        product.quantity = update.quantity;
        Ok(product.clone())
    }
}
