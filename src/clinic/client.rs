//! 患者管理客户端
//!
//! 根据配置组装记录存储、同步控制器和事件循环。

use crate::clinic::db::create_sqlite_pool_with_migration;
use crate::clinic::patient::events::UiEvent;
use crate::clinic::patient::listener::{EmptyPatientListener, PatientListener};
use crate::clinic::patient::runtime::{spawn_controller, ControllerHandle};
use crate::clinic::patient::service::PatientSyncController;
use crate::clinic::patient::state::ViewState;
use crate::clinic::patient::store::RecordStore;
use crate::clinic::patient::{PatientApi, PatientDao};
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// 记录存储后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// 远程 HTTP 后端
    Http,
    /// 本地 SQLite（自托管）
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(StoreBackend::Http),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("未知的存储后端: {}（可选 http / sqlite）", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Http => f.write_str("http"),
            StoreBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 存储后端
    pub backend: StoreBackend,
    /// HTTP API 基础地址
    pub api_base_url: String,
    /// 认证 token（为空时不附加 token 头）
    pub token: String,
    /// 本地 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://patients.db?mode=rwc`
    pub db_url: String,
    /// 启动后是否立即拉取一次患者列表
    pub load_on_start: bool,
}

impl ClientConfig {
    /// 创建默认配置（本地 SQLite 后端）
    pub fn new() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            api_base_url: "http://localhost:10002".to_string(),
            token: String::new(),
            db_url: "sqlite://patients.db?mode=rwc".to_string(),
            load_on_start: true,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 根据配置创建记录存储
pub async fn build_store(config: &ClientConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend {
        StoreBackend::Http => {
            // 创建带认证拦截器的 HTTP 客户端（token 通过 default_headers 自动添加）
            let mut headers = reqwest::header::HeaderMap::new();
            if !config.token.is_empty() {
                headers.insert(
                    reqwest::header::HeaderName::from_static("token"),
                    reqwest::header::HeaderValue::from_str(&config.token)
                        .context("无效的 token")?,
                );
            }
            let http_client = reqwest::ClientBuilder::new()
                .default_headers(headers)
                .build()
                .context("创建 HTTP 客户端失败")?;
            info!("[Client] 使用 HTTP 后端: {}", config.api_base_url);
            Ok(Arc::new(PatientApi::new(
                http_client,
                config.api_base_url.clone(),
            )))
        }
        StoreBackend::Sqlite => {
            let pool = create_sqlite_pool_with_migration(&config.db_url).await?;
            info!("[Client] 使用本地 SQLite 后端: {}", config.db_url);
            Ok(Arc::new(PatientDao::new(pool)))
        }
    }
}

/// 患者管理客户端
pub struct PatientManagerClient {
    handle: ControllerHandle,
    task: JoinHandle<PatientSyncController>,
}

impl PatientManagerClient {
    /// 创建客户端（使用默认空监听器）
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with_listener(config, Arc::new(EmptyPatientListener)).await
    }

    /// 创建客户端（自定义监听器）
    pub async fn connect_with_listener(
        config: ClientConfig,
        listener: Arc<dyn PatientListener>,
    ) -> Result<Self> {
        let store = build_store(&config).await?;
        Ok(Self::with_store(store, listener, config.load_on_start))
    }

    /// 使用已有的记录存储创建客户端
    pub fn with_store(
        store: Arc<dyn RecordStore>,
        listener: Arc<dyn PatientListener>,
        load_on_start: bool,
    ) -> Self {
        let controller = PatientSyncController::with_listener(store, listener);
        let (handle, task) = spawn_controller(controller);
        if load_on_start {
            // 事件循环刚启动，发送不会失败
            let _ = handle.send(UiEvent::Refresh);
        }
        Self { handle, task }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn dispatch(&self, event: impl Into<UiEvent>) -> Result<()> {
        self.handle.send(event)
    }

    pub async fn snapshot(&self) -> Result<ViewState> {
        self.handle.snapshot().await
    }

    pub async fn wait_idle(&self) -> Result<()> {
        self.handle.wait_idle().await
    }

    /// 停止事件循环并等待其退出
    pub async fn shutdown(self) -> Result<ViewState> {
        self.handle.shutdown();
        let controller = self
            .task
            .await
            .map_err(|e| anyhow!("控制器任务异常退出: {}", e))?;
        Ok(controller.state().clone())
    }
}
