// ==========================================
// 停机申报引擎 - 引擎上下文
// ==========================================
// 职责: 管理共享连接、仓储、服务与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::mpsc;

use crate::api::{DeclarationApi, DeclarationListSource, ProductionApi};
use crate::config::{ConfigManager, EngineConfig};
use crate::db::{open_in_memory, open_shared_connection};
use crate::domain::declaration::DeclarationFilter;
use crate::engine::events::NotificationChannel;
use crate::engine::state_machine::DeclarationStateMachine;
use crate::repository::{
    SqliteDeclarationRepository, SqliteProductionRepository, SqliteReferenceRepository,
};
use crate::services::{
    DispatchWarning, NotificationDispatcher, ReferenceCatalog, RefreshController,
};

/// 引擎上下文
///
/// 所有仓储共用同一个 SQLite 连接
pub struct EngineContext {
    /// 数据库路径（内存库为 ":memory:"）
    pub db_path: String,

    /// 加载时的引擎配置
    pub config: EngineConfig,

    pub config_manager: Arc<ConfigManager>,

    /// 参考数据仓储（初始化/维护参考数据时使用）
    pub reference_repo: Arc<SqliteReferenceRepository>,

    /// 参考数据快照
    pub catalog: Arc<ReferenceCatalog>,

    /// 维修通知分发
    pub dispatcher: Arc<NotificationDispatcher>,

    /// 停机申报API
    pub declaration_api: Arc<DeclarationApi>,

    /// 小时产量API
    pub production_api: Arc<ProductionApi>,

    warnings: Mutex<mpsc::UnboundedReceiver<DispatchWarning>>,
}

impl EngineContext {
    /// 打开数据库文件并装配引擎
    ///
    /// # 返回
    /// - Ok(EngineContext)
    /// - Err(String): 初始化错误
    pub fn new(db_path: String, channel: Arc<dyn NotificationChannel>) -> Result<Self, String> {
        tracing::info!("初始化EngineContext，数据库路径: {}", db_path);
        let conn = open_shared_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::build(db_path, conn, channel)
    }

    /// 内存库（本地开发/测试）
    pub fn in_memory(channel: Arc<dyn NotificationChannel>) -> Result<Self, String> {
        let conn = open_in_memory().map_err(|e| format!("无法打开内存数据库: {}", e))?;
        Self::build(":memory:".to_string(), conn, channel)
    }

    fn build(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Result<Self, String> {
        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_engine_config()
            .map_err(|e| format!("无法加载引擎配置: {}", e))?;

        // ==========================================
        // Repository层
        // ==========================================
        let declaration_repo = Arc::new(
            SqliteDeclarationRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建SqliteDeclarationRepository: {}", e))?,
        );
        let reference_repo = Arc::new(
            SqliteReferenceRepository::from_connection(conn.clone())
                .map_err(|e| format!("无法创建SqliteReferenceRepository: {}", e))?,
        );
        let production_repo = Arc::new(
            SqliteProductionRepository::from_connection(conn)
                .map_err(|e| format!("无法创建SqliteProductionRepository: {}", e))?,
        );

        // ==========================================
        // 服务层
        // ==========================================
        let catalog = Arc::new(ReferenceCatalog::new(reference_repo.clone()));
        let (warning_tx, warning_rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(
            NotificationDispatcher::new(channel, config.notification_timeout())
                .with_warning_sink(warning_tx),
        );

        // ==========================================
        // API层
        // ==========================================
        let declaration_api = Arc::new(DeclarationApi::new(
            declaration_repo,
            catalog.clone(),
            dispatcher.clone(),
            DeclarationStateMachine::new(config.creation_limits()),
        ));
        let production_api = Arc::new(ProductionApi::new(
            production_repo,
            catalog.clone(),
            config.max_hourly_downtime_minutes,
        ));

        tracing::info!(?config, "EngineContext初始化完成");

        Ok(Self {
            db_path,
            config,
            config_manager,
            reference_repo,
            catalog,
            dispatcher,
            declaration_api,
            production_api,
            warnings: Mutex::new(warning_rx),
        })
    }

    /// 为一个视图创建工单列表轮询控制器（未启动）
    pub fn refresh_controller(&self, filter: DeclarationFilter) -> RefreshController {
        let source = Arc::new(DeclarationListSource::new(
            self.declaration_api.clone(),
            filter,
        ));
        RefreshController::new(
            source,
            self.config.refresh_interval(),
            self.config.overlap_policy,
        )
        .with_fetch_timeout(self.config.refresh_fetch_timeout())
    }

    /// 取出目前累积的通知告警
    pub fn take_warnings(&self) -> Vec<DispatchWarning> {
        let mut rx = self.warnings.lock().unwrap_or_else(|p| p.into_inner());
        let mut drained = Vec::new();
        while let Ok(warning) = rx.try_recv() {
            drained.push(warning);
        }
        drained
    }
}
