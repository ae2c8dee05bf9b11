//! Library crate root (C10, ambient). Module declarations and the shared
//! `AppState` live here so both the `clob-exchange` binary (`main.rs`) and
//! this crate's `tests/` integration suite can exercise the matching and
//! settlement substrate without going through the HTTP surface.

use std::sync::Arc;

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::{AdminService, ExchangeService, ReadService, Router};

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub router: Arc<Router>,
    pub exchange: ExchangeService,
    pub admin: AdminService,
    pub read: ReadService,
}
