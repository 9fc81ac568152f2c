//! Configuration snapshots and hot reload
//!
//! Nodes never read configuration from globals. Every invocation asks a
//! [`SettingsProvider`] for an immutable [`Snapshot`] holding settings,
//! prompts, model tiers and tools. Reloading builds a new snapshot and swaps
//! the shared `Arc`; snapshots already handed out stay valid and unchanged.

use crate::config::AgentSettings;
use crate::error::{CreditError, Result};
use crate::store::TableCache;
use crate::{prompts, tiers, tools};
use agent_prompt::PromptRegistry;
use agent_runtime::ModelTiers;
use agent_tools::ToolRegistry;
use agent_utils::{ConfigError, EnvSnapshot};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Everything a node needs, resolved at one point in time
#[derive(Debug)]
pub struct Snapshot {
    /// Increases by one with every successful rebuild
    pub generation: u64,
    /// Resolved settings
    pub settings: Arc<AgentSettings>,
    /// Role prompts
    pub prompts: Arc<PromptRegistry>,
    /// Model tiers, not yet bound to tools
    pub tiers: ModelTiers,
    /// Every tool, configured from `settings`
    pub tools: Arc<ToolRegistry>,
}

impl Snapshot {
    /// Assemble a snapshot from ready parts
    pub fn new(
        generation: u64,
        settings: AgentSettings,
        prompts: PromptRegistry,
        tiers: ModelTiers,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            generation,
            settings: Arc::new(settings),
            prompts: Arc::new(prompts),
            tiers,
            tools: Arc::new(tools),
        }
    }

    /// Build prompts, tiers and tools from `settings`
    ///
    /// Missing credentials only leave tiers absent; an unreadable prompts
    /// directory or an invalid scoring client is an error.
    pub fn build(settings: AgentSettings, generation: u64, cache: &TableCache) -> Result<Self> {
        let prompts = prompts::load(settings.prompts_dir.as_deref())?;
        let tiers = tiers::build(&settings);
        let tools = tools::build_registry(&settings, cache)?;
        Ok(Self::new(generation, settings, prompts, tiers, tools))
    }
}

/// Source of configuration snapshots
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Snapshot to use for the next node invocation
    async fn snapshot(&self) -> Result<Arc<Snapshot>>;
}

/// Provider that always returns the snapshot built at startup
#[derive(Debug, Clone)]
pub struct StaticSettings {
    snapshot: Arc<Snapshot>,
}

impl StaticSettings {
    /// Wrap an existing snapshot
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// Load settings once and build the only snapshot
    pub fn load(env_file: Option<&Path>) -> Result<Self> {
        let settings = AgentSettings::load(env_file)?;
        Ok(Self::new(Snapshot::build(settings, 1, &TableCache::default())?))
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        Ok(Arc::clone(&self.snapshot))
    }
}

type EnvLoader = Arc<dyn Fn() -> std::result::Result<EnvSnapshot, ConfigError> + Send + Sync>;

/// What a snapshot was built from
#[derive(Clone, PartialEq)]
struct Inputs {
    settings: AgentSettings,
    /// Contents of every file in the prompts directory, sorted by path
    prompt_files: Vec<(PathBuf, Vec<u8>)>,
}

impl Inputs {
    fn read(loader: &EnvLoader) -> Result<Self> {
        let settings = resolve(loader)?;
        let prompt_files = settings
            .prompts_dir
            .as_deref()
            .map(read_prompt_files)
            .unwrap_or_default();
        Ok(Self {
            settings,
            prompt_files,
        })
    }
}

struct Current {
    snapshot: Arc<Snapshot>,
    inputs: Inputs,
}

/// Provider that re-reads configuration before every node invocation
///
/// A new snapshot is built only when the environment or the prompt files
/// changed. A failed reload keeps serving the last good snapshot.
pub struct HotReloadSettings {
    loader: EnvLoader,
    cache: TableCache,
    current: RwLock<Current>,
}

impl HotReloadSettings {
    /// Reload from the process environment and an optional `.env` file
    pub fn new(env_file: Option<PathBuf>) -> Result<Self> {
        Self::with_loader(move || EnvSnapshot::load(env_file.as_deref()))
    }

    /// Reload from a custom source
    ///
    /// The first snapshot is built immediately so configuration errors
    /// surface at startup.
    pub fn with_loader<F>(loader: F) -> Result<Self>
    where
        F: Fn() -> std::result::Result<EnvSnapshot, ConfigError> + Send + Sync + 'static,
    {
        let loader: EnvLoader = Arc::new(loader);
        let cache = TableCache::default();
        let inputs = Inputs::read(&loader)?;
        let snapshot = Snapshot::build(inputs.settings.clone(), 1, &cache)?;

        Ok(Self {
            loader,
            cache,
            current: RwLock::new(Current {
                snapshot: Arc::new(snapshot),
                inputs,
            }),
        })
    }

    /// Last successfully built snapshot
    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().await.snapshot)
    }

    /// Rebuild the snapshot now, reporting failures to the caller
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        self.reload(true).await
    }

    /// Read the inputs and rebuild when they changed or `force` is set
    ///
    /// Reading and building run on the blocking pool; the lock is only
    /// held to compare inputs and to swap the snapshot.
    async fn reload(&self, force: bool) -> Result<Arc<Snapshot>> {
        let loader = Arc::clone(&self.loader);
        let inputs = blocking(move || Inputs::read(&loader)).await?;

        if !force {
            let current = self.current.read().await;
            if current.inputs == inputs {
                return Ok(Arc::clone(&current.snapshot));
            }
        }

        let cache = self.cache.clone();
        let settings = inputs.settings.clone();
        let mut snapshot = blocking(move || Snapshot::build(settings, 0, &cache)).await?;

        let mut current = self.current.write().await;
        let generation = current.snapshot.generation + 1;
        snapshot.generation = generation;
        let snapshot = Arc::new(snapshot);
        *current = Current {
            snapshot: Arc::clone(&snapshot),
            inputs,
        };
        drop(current);

        info!(generation, "Configuration reloaded");
        Ok(snapshot)
    }
}

fn resolve(loader: &EnvLoader) -> Result<AgentSettings> {
    let settings = AgentSettings::from_env(&loader()?)?;
    settings.validate()?;
    Ok(settings)
}

/// Unreadable entries are skipped; a missing directory reads as empty
fn read_prompt_files(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter_map(|path| std::fs::read(&path).ok().map(|bytes| (path, bytes)))
        .collect();
    files.sort();
    files
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CreditError::Join(e.to_string()))?
}

#[async_trait]
impl SettingsProvider for HotReloadSettings {
    async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        match self.reload(false).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                let current = self.current().await;
                warn!(error = %err, generation = current.generation, "Configuration reload failed, keeping last snapshot");
                Ok(current)
            }
        }
    }
}

impl std::fmt::Debug for HotReloadSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotReloadSettings").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::ORCHESTRATOR;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn write_env(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    fn file_provider(path: &Path) -> Result<HotReloadSettings> {
        let path = path.to_path_buf();
        HotReloadSettings::with_loader(move || EnvSnapshot::read_env_file(&path))
    }

    #[tokio::test]
    async fn test_static_settings_return_same_snapshot() {
        let provider = StaticSettings::new(
            Snapshot::build(AgentSettings::default(), 1, &TableCache::default()).unwrap(),
        );
        let first = provider.snapshot().await.unwrap();
        let second = provider.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.tools.len(), 6);
        assert!(first.tiers.is_empty());
    }

    #[tokio::test]
    async fn test_hot_reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join(".env");
        write_env(&env, "GEMINI_MODEL=gemini-a\nGOOGLE_API_KEY=key\n");

        let provider = file_provider(&env).unwrap();
        let first = provider.snapshot().await.unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(first.settings.gemini_model, "gemini-a");
        assert_eq!(first.tiers.get(0).unwrap().id(), "gemini-a");

        // unchanged inputs reuse the snapshot
        let again = provider.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        write_env(&env, "GEMINI_MODEL=gemini-b\nGOOGLE_API_KEY=key\n");
        let second = provider.snapshot().await.unwrap();
        assert_eq!(second.generation, 2);
        assert_eq!(second.tiers.get(0).unwrap().id(), "gemini-b");

        // earlier snapshots are never touched
        assert_eq!(first.settings.gemini_model, "gemini-a");
    }

    #[tokio::test]
    async fn test_prompt_overrides_reload() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join("prompts");
        std::fs::create_dir(&prompts).unwrap();
        let env = dir.path().join(".env");
        write_env(&env, &format!("PROMPTS_DIR={}\n", prompts.display()));

        let provider = file_provider(&env).unwrap();
        std::fs::write(prompts.join("orchestrator.jinja"), "CRO v2 for {{ company_id }}").unwrap();

        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 2);
        let rendered = snapshot.prompts.render(ORCHESTRATOR, &json!({ "company_id": 5 })).unwrap();
        assert_eq!(rendered, "CRO v2 for 5");

        std::fs::write(prompts.join("orchestrator.jinja"), "CRO v3 for {{ company_id }}").unwrap();
        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 3);
        let rendered = snapshot.prompts.render(ORCHESTRATOR, &json!({ "company_id": 5 })).unwrap();
        assert_eq!(rendered, "CRO v3 for 5");
    }

    #[tokio::test]
    async fn test_unrenderable_prompt_keeps_last_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join("prompts");
        std::fs::create_dir(&prompts).unwrap();
        let env = dir.path().join(".env");
        write_env(&env, &format!("PROMPTS_DIR={}\n", prompts.display()));
        let provider = file_provider(&env).unwrap();

        std::fs::write(prompts.join("data_scientist.jinja"), "Scientist for {{ company_id.x.y }}")
            .unwrap();
        assert!(provider.refresh().await.is_err());

        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        let rendered = snapshot
            .prompts
            .render(crate::prompts::DATA_SCIENTIST, &json!({ "company_id": 5 }))
            .unwrap();
        assert!(rendered.contains("Lead Data Scientist"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_reload_does_not_block_readers() {
        let slow = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(
            HotReloadSettings::with_loader({
                let slow = Arc::clone(&slow);
                move || {
                    if slow.load(Ordering::SeqCst) {
                        std::thread::sleep(Duration::from_millis(600));
                    }
                    Ok(EnvSnapshot::from_pairs([("HF_MODEL", "slow-model")]))
                }
            })
            .unwrap(),
        );

        slow.store(true, Ordering::SeqCst);
        let reloading = tokio::spawn({
            let provider = Arc::clone(&provider);
            async move { provider.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let current = tokio::time::timeout(Duration::from_millis(200), provider.current())
            .await
            .expect("readers must not wait for a reload");
        assert_eq!(current.generation, 1);
        assert!(!reloading.is_finished());

        let refreshed = reloading.await.unwrap().unwrap();
        assert_eq!(refreshed.generation, 2);
        assert_eq!(provider.current().await.generation, 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_last_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join(".env");
        write_env(&env, "HF_MODEL=good-model\n");
        let provider = file_provider(&env).unwrap();

        write_env(&env, "HF_MODEL=other\nML_API_URL=not a url\n");
        assert!(provider.refresh().await.is_err());

        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.settings.hf_model, "good-model");
    }

    #[test]
    fn test_startup_fails_fast() {
        let err = HotReloadSettings::with_loader(|| {
            Ok(EnvSnapshot::from_pairs([("DEFAULT_LLM_PROVIDER", "nope")]))
        })
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported provider"));
    }
}
