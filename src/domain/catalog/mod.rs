pub mod entities;
pub mod errors;
pub mod ports;

pub use entities::{Customer, Dish};
pub use errors::CatalogError;
pub use ports::{CustomerRepository, DishRepository};
