//! 加载编排器
//!
//! 顶层驱动：标识符查找 -> 清单解析 -> 导入 -> 提取与激活 ->
//! 注册桥接，跨整个批次管理用户可见进度，并清理失效标识符。
//! 单个Bundle的失败绝不中止批次其余部分。

use crate::config::LoaderConfig;
use crate::error::{LivePanelError, Result};
use crate::host::{HostRegistry, ProgressChannel};
use crate::loader::activator::{ModuleActivator, ModuleInstance};
use crate::loader::dispatch::RuntimeWidgetResolver;
use crate::loader::extractor::PluginExtractor;
use crate::loader::gate::LoadGate;
use crate::loader::manifest::{BundleImporter, BundleTransport};
use crate::loader::registry::{RegistryBridge, WidgetFactoryTable};
use crate::session::SessionProvider;
use crate::store::IdentifierStore;
use crate::types::{Application, BundleId, RuntimeContext, Session};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 加载编排器
///
/// 每个进程生命周期内假定只执行一次逻辑加载；`load_all`不可与
/// 自身并发调用
pub struct LoadOrchestrator {
    config: LoaderConfig,
    store: Arc<dyn IdentifierStore>,
    session: Arc<dyn SessionProvider>,
    importer: BundleImporter,
    extractor: PluginExtractor,
    activator: ModuleActivator,
    bridge: RegistryBridge,
    table: Arc<WidgetFactoryTable>,
    host: Arc<dyn HostRegistry>,
    progress: Arc<dyn ProgressChannel>,
    gate: LoadGate,
}

impl LoadOrchestrator {
    pub fn new(
        config: LoaderConfig,
        store: Arc<dyn IdentifierStore>,
        session: Arc<dyn SessionProvider>,
        transport: Arc<dyn BundleTransport>,
        host: Arc<dyn HostRegistry>,
        progress: Arc<dyn ProgressChannel>,
    ) -> Result<Self> {
        config.validate()?;
        let activator = ModuleActivator::from_config(&config)?;
        let table = Arc::new(WidgetFactoryTable::new());
        Ok(Self {
            importer: BundleImporter::new(transport, config.clone()),
            extractor: PluginExtractor::new(),
            activator,
            bridge: RegistryBridge::new(Arc::clone(&table), Arc::clone(&host)),
            table,
            host,
            progress,
            gate: LoadGate::new(),
            config,
            store,
            session,
        })
    }

    /// 加载门控
    pub fn gate(&self) -> LoadGate {
        self.gate.clone()
    }

    /// 本地工厂表
    pub fn factory_table(&self) -> Arc<WidgetFactoryTable> {
        Arc::clone(&self.table)
    }

    /// 构建注入宿主的调度解析器
    pub fn resolver(&self) -> RuntimeWidgetResolver {
        RuntimeWidgetResolver::new(
            Arc::clone(&self.table),
            Arc::clone(&self.host),
            self.gate.clone(),
        )
    }

    /// 执行完整加载批次
    ///
    /// 仅顶层前置条件失败（无匹配应用、存储不可用）是致命的；
    /// 单Bundle粒度以下的失败只记录并以警告上报
    pub async fn load_all(&self) -> Result<()> {
        match self.run_batch().await {
            Ok(()) => {
                self.progress.close();
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Widget load batch aborted");
                self.progress.alert(&format!("Widget loading failed: {}", err));
                self.progress.close();
                Err(err)
            }
        }
    }

    async fn run_batch(&self) -> Result<()> {
        // 步骤1：等待已认证会话，无超时
        let session = self.session.current_session().await;
        info!(user = %session.user_id, "Starting widget bundle load batch");

        // 步骤2：解析当前应用与Bundle标识符集合
        let application = self.resolve_application(&session).await?;
        let context = self.find_runtime_context(&application).await?;
        let bundle_ids = union_bundle_ids(&application, context.as_ref());

        if bundle_ids.is_empty() {
            info!("No widget bundles configured, opening load gate");
            self.gate.open();
            return Ok(());
        }

        // 步骤3+4：逐个导入、提取并激活；失败隔离按标识符生效
        let total = bundle_ids.len();
        let mut instances: Vec<ModuleInstance> = Vec::new();
        let mut removals: HashSet<BundleId> = HashSet::new();

        for (index, bundle_id) in bundle_ids.iter().enumerate() {
            self.progress.update(&format!(
                "Loading widget bundles ({}/{})",
                index + 1,
                total
            ));

            let exports = match self.importer.resolve(bundle_id).await {
                Ok(exports) => exports,
                Err(err) => {
                    self.classify_import_failure(bundle_id, &err, &mut removals)
                        .await;
                    continue;
                }
            };

            let descriptors = self.extractor.extract(&exports);
            if descriptors.is_empty() {
                warn!(bundle_id = %bundle_id, "Bundle exports no widget modules");
                self.progress.alert(&format!(
                    "Bundle '{}' exports no widget modules",
                    bundle_id
                ));
                continue;
            }

            for descriptor in descriptors {
                let module = descriptor.module_name.clone();
                match self.activator.activate(descriptor) {
                    Ok(instance) => instances.push(instance),
                    Err(err) => {
                        warn!(bundle_id = %bundle_id, module = %module, error = %err, "Module activation failed");
                        self.progress
                            .alert(&format!("Widget module '{}' failed to load: {}", module, err));
                    }
                }
            }
        }

        // 步骤5：等待宿主内置注册表完成自身引导
        self.await_builtin_registry().await;

        // 步骤6：桥接全部收集到的组件定义
        for instance in &instances {
            for definition in &instance.definitions {
                if let Err(err) = self.bridge.register(definition, instance) {
                    warn!(widget_id = %definition.id, error = %err, "Widget registration failed");
                    self.progress
                        .alert(&format!("Widget '{}' failed to register: {}", definition.id, err));
                }
            }
        }

        // 步骤7：打开加载门控（单调，每进程一次）
        self.gate.open();

        // 步骤8：一次原子更新应用失效标识符清理
        self.apply_removals(context, &removals).await?;

        info!(
            registered = self.table.len(),
            removed = removals.len(),
            "Widget bundle load batch finished"
        );
        Ok(())
    }

    /// 解析当前宿主应用：优先自有应用匹配当前路径，
    /// 其次任意（含共享/订阅）应用匹配当前路径
    async fn resolve_application(&self, session: &Session) -> Result<Application> {
        let applications = self.store.list_applications(&session.user_id).await?;

        let private = applications.iter().find(|app| {
            app.path == self.config.app_path && app.owner == session.user_id && !app.shared
        });
        if let Some(app) = private {
            return Ok(app.clone());
        }

        applications
            .iter()
            .find(|app| app.path == self.config.app_path)
            .cloned()
            .ok_or_else(|| LivePanelError::ApplicationNotFound {
                path: self.config.app_path.clone(),
            })
    }

    async fn find_runtime_context(
        &self,
        application: &Application,
    ) -> Result<Option<RuntimeContext>> {
        let mut contexts = self
            .store
            .list_runtime_contexts(&application.id)
            .await?;
        Ok(if contexts.is_empty() {
            None
        } else {
            Some(contexts.remove(0))
        })
    }

    /// 失败隔离策略：标识符不再对应任何已知应用时标记移除
    /// （上游已删除/卸载），否则仅警告跳过（版本不匹配/编译错误）
    async fn classify_import_failure(
        &self,
        bundle_id: &BundleId,
        err: &LivePanelError,
        removals: &mut HashSet<BundleId>,
    ) {
        let known = match self.store.is_bundle_known(bundle_id).await {
            Ok(known) => known,
            Err(store_err) => {
                // 存储不可达时保守处理：视为仍然已知，不触发移除
                warn!(bundle_id = %bundle_id, error = %store_err, "Could not verify bundle, keeping it");
                true
            }
        };

        if known {
            warn!(bundle_id = %bundle_id, error = %err, "Bundle failed to load, skipping");
            self.progress
                .alert(&format!("Bundle '{}' failed to load: {}", bundle_id, err));
        } else {
            warn!(bundle_id = %bundle_id, error = %err, "Bundle no longer exists, scheduling removal");
            removals.insert(bundle_id.clone());
        }
    }

    /// 内置组件注册表报告至少一个条目后才允许写入运行时定义
    async fn await_builtin_registry(&self) {
        let mut count_rx = self.host.definition_count();
        while *count_rx.borrow_and_update() == 0 {
            if count_rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn apply_removals(
        &self,
        context: Option<RuntimeContext>,
        removals: &HashSet<BundleId>,
    ) -> Result<()> {
        let Some(context) = context else {
            return Ok(());
        };
        if removals.is_empty() {
            return Ok(());
        }

        let remaining: Vec<BundleId> = context
            .bundle_ids
            .iter()
            .filter(|id| !removals.contains(*id))
            .cloned()
            .collect();

        if remaining != context.bundle_ids {
            info!(
                context_id = %context.id,
                removed = context.bundle_ids.len() - remaining.len(),
                "Removing stale bundle identifiers from runtime context"
            );
            self.store
                .update_runtime_context(&context.id, remaining)
                .await?;
        }
        Ok(())
    }
}

/// 应用记录与运行时上下文记录上Bundle列表的并集，保序去重
fn union_bundle_ids(
    application: &Application,
    context: Option<&RuntimeContext>,
) -> Vec<BundleId> {
    let mut seen: HashSet<&BundleId> = HashSet::new();
    let mut union = Vec::new();
    let context_ids = context.map(|ctx| ctx.bundle_ids.as_slice()).unwrap_or(&[]);

    for id in application.bundle_ids.iter().chain(context_ids) {
        if seen.insert(id) {
            union.push(id.clone());
        }
    }
    union
}
