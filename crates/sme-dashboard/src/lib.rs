//! sme-dashboard: Admin dashboard for the Thai SME LINE Bot
//!
//! 会話・Webhook・システムログの統計とページング API、管理画面、
//! `/health` を提供します。
//!
//! ## Endpoints
//!
//! - `GET /admin` - dashboard page
//! - `GET /api/stats?days=7`
//! - `GET /api/conversations`, `/api/webhooks`, `/api/logs?level=`
//! - `GET /health`, `GET /`

pub mod api;
pub mod auth;
pub mod error;
pub mod server;

pub use api::{DashboardState, LogProvider, Pagination, create_router};
pub use error::{DashboardError, Result};
pub use server::DashboardServer;
