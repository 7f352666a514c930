pub mod auth;
pub mod clients;
pub mod orders;
pub mod payments;
pub mod products;
