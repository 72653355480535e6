//! Postgres repositories
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use products::{ProductRepository, Purchase};
pub use users::UserRepository;
