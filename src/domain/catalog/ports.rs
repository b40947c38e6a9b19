use async_trait::async_trait;
use uuid::Uuid;

use super::entities::{Customer, Dish};
use super::errors::CatalogError;
use crate::domain::fiscal::value_objects::Money;

#[async_trait]
pub trait CustomerRepository: Send + Sync {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, CatalogError>;
  async fn list_all(&self) -> Result<Vec<Customer>, CatalogError>;

  /// Adds a deferred-sale amount to the customer's outstanding balance.
  /// Implementations perform the read-modify-write atomically.
  async fn add_outstanding(&self, id: Uuid, amount: &Money) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait DishRepository: Send + Sync {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Dish>, CatalogError>;
  async fn list_all(&self) -> Result<Vec<Dish>, CatalogError>;
}
