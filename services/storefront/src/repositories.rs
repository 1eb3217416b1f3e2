//! Repositories over the record store collections

pub mod product;
pub mod user;

pub use product::ProductRepository;
pub use user::UserRepository;
