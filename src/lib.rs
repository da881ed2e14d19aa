pub mod accounts;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod kyc;
pub mod ledger;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
