//! MediCore 병원 포털 상태 저장소
//!
//! 화면 계층은 [`Portal`] 만 호출합니다. 로컬 SQLite 에 즉시 영속화하고,
//! 원격(Supabase)이 설정되어 있으면 변경을 미러링합니다.

pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod projection;
pub mod remote;
pub mod repository;
pub mod seed;
pub mod store;
pub mod sync;
pub mod validation;

pub use auth::Session;
pub use commands::{Mutation, Portal};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use models::*;
pub use store::Store;
pub use sync::{SyncAdapter, SyncOutcome};
