pub mod account_service;
pub mod asteroid_service;
pub mod asteroid_store;
pub mod feed;
pub mod user_store;
