//! Dashboard API types and handlers
//!
//! Provides the admin page and the JSON endpoints it reads.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    middleware,
    response::{Html, IntoResponse, Json},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use sme_core::cache::truncate_chars;
use sme_core::storage::{ConversationRow, Page, Stats, SystemLogRow, WebhookEventRow};
use sme_core::{DatabaseStatus, LogStore};

use crate::auth::require_api_key;
use crate::error::{DashboardError, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Characters of a message shown in the conversation list
const PREVIEW_CHARS: usize = 100;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const DEFAULT_STATS_DAYS: i64 = 7;

/// Read access to the log tables
#[async_trait]
pub trait LogProvider: Send + Sync {
    async fn stats(&self, days: i64) -> Result<Stats>;

    async fn conversations(&self, page: u32, per_page: u32) -> Result<Page<ConversationRow>>;

    async fn webhook_events(&self, page: u32, per_page: u32) -> Result<Page<WebhookEventRow>>;

    /// `None` returns every level
    async fn system_logs(&self, page: u32, per_page: u32, level: Option<String>) -> Result<Page<SystemLogRow>>;

    async fn database_status(&self) -> DatabaseStatus;
}

/// Run a blocking SQLite call off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> sme_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DashboardError::ServerError(e.to_string()))?
        .map_err(DashboardError::from)
}

#[async_trait]
impl LogProvider for LogStore {
    async fn stats(&self, days: i64) -> Result<Stats> {
        let store = self.clone();
        blocking(move || store.stats(days)).await
    }

    async fn conversations(&self, page: u32, per_page: u32) -> Result<Page<ConversationRow>> {
        let store = self.clone();
        blocking(move || store.conversations(page, per_page)).await
    }

    async fn webhook_events(&self, page: u32, per_page: u32) -> Result<Page<WebhookEventRow>> {
        let store = self.clone();
        blocking(move || store.webhook_events(page, per_page)).await
    }

    async fn system_logs(&self, page: u32, per_page: u32, level: Option<String>) -> Result<Page<SystemLogRow>> {
        let store = self.clone();
        blocking(move || store.system_logs(page, per_page, level.as_deref())).await
    }

    async fn database_status(&self) -> DatabaseStatus {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.health())
            .await
            .unwrap_or(DatabaseStatus::Unhealthy)
    }
}

/// Dashboard state shared across handlers
#[derive(Clone)]
pub struct DashboardState {
    pub logs: Arc<dyn LogProvider>,
    /// Bearer token required on `/api/*` when set
    pub admin_api_key: Option<String>,
    /// Required settings that are not configured, reported by `/health`
    pub missing_env_vars: Vec<String>,
}

impl DashboardState {
    pub fn new(logs: Arc<dyn LogProvider>) -> Self {
        Self {
            logs,
            admin_api_key: None,
            missing_env_vars: Vec::new(),
        }
    }

    pub fn with_admin_api_key(mut self, key: Option<String>) -> Self {
        self.admin_api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_missing_env_vars(mut self, missing: Vec<String>) -> Self {
        self.missing_env_vars = missing;
        self
    }
}

/// `?days=`
#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// `?page=&per_page=&level=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub level: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    /// Level filter; `ALL` or empty means no filter
    pub fn level(&self) -> Option<String> {
        self.level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("all"))
            .map(str::to_uppercase)
    }
}

/// Pagination block of list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub pages: i64,
    pub per_page: u32,
    pub total: i64,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            pages: page.pages(),
            per_page: page.per_page,
            total: page.total,
        }
    }
}

/// Create the dashboard router
pub fn create_router(state: DashboardState) -> Router {
    let state = Arc::new(state);

    let api = Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/conversations", get(list_conversations))
        .route("/api/webhooks", get(list_webhooks))
        .route("/api/logs", get(list_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(service_info))
        .route("/admin", get(dashboard_index))
        .route("/health", get(health_check))
        .merge(api)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

/// Dashboard index page
async fn dashboard_index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "Thai SME LINE Bot",
        "version": VERSION,
        "status": "running",
        "endpoints": {
            "webhook": "/webhook",
            "health": "/health",
            "admin": "/admin",
            "api": ["/api/stats", "/api/conversations", "/api/webhooks", "/api/logs"]
        }
    }))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<DashboardState>>) -> Json<Value> {
    let database = state.logs.database_status().await;
    let healthy = state.missing_env_vars.is_empty() && database != DatabaseStatus::Unhealthy;

    let mut body = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "version": VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database.as_str(),
    });
    if !state.missing_env_vars.is_empty() {
        body["missing_env_vars"] = json!(state.missing_env_vars);
    }

    Json(body)
}

async fn get_stats(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Stats>> {
    let days = query.days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, 365);
    Ok(Json(state.logs.stats(days).await?))
}

/// Shorten a message for the list view
fn preview(text: Option<String>) -> Option<String> {
    text.map(|t| {
        let cut = truncate_chars(&t, PREVIEW_CHARS);
        if cut.len() < t.len() {
            format!("{}...", cut)
        } else {
            t
        }
    })
}

async fn list_conversations(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let page = state.logs.conversations(query.page(), query.per_page()).await?;
    let pagination = Pagination::from(&page);

    let conversations: Vec<ConversationRow> = page
        .items
        .into_iter()
        .map(|mut row| {
            row.user_message = preview(row.user_message.take());
            row.bot_response = preview(row.bot_response.take());
            row
        })
        .collect();

    Ok(Json(json!({
        "conversations": conversations,
        "pagination": pagination,
    })))
}

async fn list_webhooks(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let page = state.logs.webhook_events(query.page(), query.per_page()).await?;
    Ok(Json(json!({
        "webhooks": page.items,
        "pagination": Pagination::from(&page),
    })))
}

async fn list_logs(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    let page = state
        .logs
        .system_logs(query.page(), query.per_page(), query.level())
        .await?;
    Ok(Json(json!({
        "logs": page.items,
        "pagination": Pagination::from(&page),
    })))
}

/// Admin page
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="th">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Thai SME LINE Bot - Admin</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f5f5f5;
            color: #333;
            line-height: 1.6;
        }
        .container { max-width: 1200px; margin: 0 auto; padding: 20px; }
        header {
            background: #06c755;
            color: white;
            padding: 20px;
            margin-bottom: 20px;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        header h1 { font-size: 24px; }
        header input { padding: 6px 10px; border: none; border-radius: 4px; }
        .stats-grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 20px;
            margin-bottom: 20px;
        }
        .stat-card, .panel {
            background: white;
            border-radius: 8px;
            padding: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .panel { margin-bottom: 20px; }
        .stat-card h3 { color: #666; font-size: 14px; margin-bottom: 10px; }
        .stat-card .value { font-size: 32px; font-weight: bold; color: #2c3e50; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 10px; text-align: left; border-bottom: 1px solid #eee; vertical-align: top; }
        th { background: #f8f9fa; font-weight: 600; }
        .level-ERROR { color: #c0392b; font-weight: 600; }
        .level-WARN { color: #d68910; font-weight: 600; }
        .toolbar { margin-bottom: 10px; }
        button, select {
            padding: 6px 14px;
            border-radius: 4px;
            border: 1px solid #ccc;
            background: white;
            cursor: pointer;
        }
    </style>
</head>
<body>
    <header>
        <h1>Thai SME LINE Bot</h1>
        <input type="password" id="api-key" placeholder="Admin API key" onchange="saveKey()">
    </header>
    <div class="container">
        <div class="toolbar">
            <select id="days" onchange="loadStats()">
                <option value="1">24h</option>
                <option value="7" selected>7 days</option>
                <option value="30">30 days</option>
            </select>
            <button onclick="loadAll()">Refresh</button>
        </div>

        <div class="stats-grid">
            <div class="stat-card"><h3>Conversations</h3><div class="value" id="total-conversations">-</div></div>
            <div class="stat-card"><h3>Users</h3><div class="value" id="total-users">-</div></div>
            <div class="stat-card"><h3>Webhooks</h3><div class="value" id="total-webhooks">-</div></div>
            <div class="stat-card"><h3>Errors</h3><div class="value" id="error-count">-</div></div>
            <div class="stat-card"><h3>Avg. response (ms)</h3><div class="value" id="avg-response">-</div></div>
        </div>

        <div class="panel">
            <h2>Recent conversations</h2>
            <table>
                <thead><tr><th>Time</th><th>User</th><th>Type</th><th>Lang</th><th>Message</th><th>Response</th></tr></thead>
                <tbody id="conversations-body"></tbody>
            </table>
        </div>

        <div class="panel">
            <h2>System logs</h2>
            <div class="toolbar">
                <select id="level" onchange="loadLogs()">
                    <option value="ALL">All</option>
                    <option value="ERROR">Error</option>
                    <option value="WARN">Warning</option>
                </select>
            </div>
            <table>
                <thead><tr><th>Time</th><th>Level</th><th>Message</th><th>User</th></tr></thead>
                <tbody id="logs-body"></tbody>
            </table>
        </div>
    </div>
    <script>
        const keyInput = document.getElementById('api-key');
        keyInput.value = localStorage.getItem('adminApiKey') || '';

        function saveKey() {
            localStorage.setItem('adminApiKey', keyInput.value);
            loadAll();
        }

        function escapeHtml(s) {
            return String(s ?? '').replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
        }

        async function api(path) {
            const headers = keyInput.value ? { 'Authorization': 'Bearer ' + keyInput.value } : {};
            const res = await fetch(path, { headers });
            if (!res.ok) throw new Error(path + ': ' + res.status);
            return res.json();
        }

        async function loadStats() {
            const days = document.getElementById('days').value;
            const stats = await api('/api/stats?days=' + days);
            const s = stats.summary;
            document.getElementById('total-conversations').textContent = s.total_conversations;
            document.getElementById('total-users').textContent = s.total_users;
            document.getElementById('total-webhooks').textContent = s.total_webhooks;
            document.getElementById('error-count').textContent = s.error_count;
            document.getElementById('avg-response').textContent = s.avg_response_time.toFixed(0);
        }

        async function loadConversations() {
            const data = await api('/api/conversations?per_page=20');
            document.getElementById('conversations-body').innerHTML = data.conversations.map(c => `
                <tr>
                    <td>${escapeHtml(new Date(c.created_at).toLocaleString())}</td>
                    <td>${escapeHtml(c.user_name || c.user_id.substring(0, 10))}</td>
                    <td>${escapeHtml(c.message_type)}</td>
                    <td>${escapeHtml(c.language)}</td>
                    <td>${escapeHtml(c.user_message)}</td>
                    <td>${escapeHtml(c.bot_response)}</td>
                </tr>`).join('');
        }

        async function loadLogs() {
            const level = document.getElementById('level').value;
            const data = await api('/api/logs?per_page=50&level=' + level);
            document.getElementById('logs-body').innerHTML = data.logs.map(l => `
                <tr>
                    <td>${escapeHtml(new Date(l.created_at).toLocaleString())}</td>
                    <td class="level-${escapeHtml(l.level)}">${escapeHtml(l.level)}</td>
                    <td>${escapeHtml(l.message)}</td>
                    <td>${escapeHtml(l.user_id)}</td>
                </tr>`).join('');
        }

        function loadAll() {
            Promise.all([loadStats(), loadConversations(), loadLogs()])
                .catch(e => console.error('Failed to load data:', e));
        }

        loadAll();
        setInterval(loadAll, 30000);
    </script>
</body>
</html>
"#;
