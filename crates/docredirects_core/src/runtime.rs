use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{DEFAULT_RECORDS_PATH, DEFAULT_REGISTRY_PATH, RedirectsConfig};

pub const STATE_DIR_NAME: &str = ".docredirects";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Config,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Config => "config",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub records: Option<PathBuf>,
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
}

/// Input files for one run, after flags, env and config are applied.
#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub records_path: PathBuf,
    pub registry_path: PathBuf,
    pub script_template: Option<PathBuf>,
    pub records_source: ValueSource,
    pub registry_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstate_dir={}\nconfig_path={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.state_dir),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

impl ResolvedInputs {
    pub fn diagnostics(&self) -> String {
        format!(
            "records_path={} ({})\nregistry_path={} ({})\nscript_template={}",
            normalize_for_display(&self.records_path),
            self.records_source.as_str(),
            normalize_for_display(&self.registry_path),
            self.registry_source.as_str(),
            self.script_template
                .as_deref()
                .map(normalize_for_display)
                .unwrap_or_else(|| "<embedded>".to_string()),
        )
    }
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub created_dirs: Vec<PathBuf>,
    pub wrote_config: bool,
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

pub fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);
    let state_dir = project_root.join(STATE_DIR_NAME);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_non_empty(&lookup_env, "DOCREDIRECTS_CONFIG") {
        (absolutize(Path::new(&value), &project_root), ValueSource::Env)
    } else {
        (state_dir.join(CONFIG_FILENAME), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        project_root,
        state_dir,
        config_path,
        root_source,
        config_source,
    })
}

pub fn resolve_inputs(
    paths: &ResolvedPaths,
    config: &RedirectsConfig,
    overrides: &PathOverrides,
) -> ResolvedInputs {
    resolve_inputs_with_lookup(paths, config, overrides, |key| env::var(key).ok())
}

pub fn resolve_inputs_with_lookup<F>(
    paths: &ResolvedPaths,
    config: &RedirectsConfig,
    overrides: &PathOverrides,
    lookup_env: F,
) -> ResolvedInputs
where
    F: Fn(&str) -> Option<String>,
{
    let root = &paths.project_root;
    let (records_path, records_source) = pick_path(
        root,
        overrides.records.as_deref(),
        lookup_non_empty(&lookup_env, "DOCREDIRECTS_RECORDS"),
        config.records(),
        DEFAULT_RECORDS_PATH,
    );
    let (registry_path, registry_source) = pick_path(
        root,
        overrides.registry.as_deref(),
        lookup_non_empty(&lookup_env, "DOCREDIRECTS_REGISTRY"),
        config.registry(),
        DEFAULT_REGISTRY_PATH,
    );

    ResolvedInputs {
        records_path,
        registry_path,
        script_template: config
            .script_template()
            .map(|path| absolutize(Path::new(path), root)),
        records_source,
        registry_source,
    }
}

pub fn init_layout(paths: &ResolvedPaths, force: bool) -> Result<InitReport> {
    let mut created_dirs = Vec::new();
    if !paths.state_dir.exists() {
        fs::create_dir_all(&paths.state_dir)
            .with_context(|| format!("failed to create {}", paths.state_dir.display()))?;
        created_dirs.push(paths.state_dir.clone());
    }

    let wrote_config = write_text_file(&paths.config_path, &render_materialized_config(), force)?;

    Ok(InitReport {
        created_dirs,
        wrote_config,
    })
}

pub fn render_materialized_config() -> String {
    format!(
        "# docredirects configuration (materialized by `docredirects init`)\n# Relative paths are resolved from the project root.\n\n[redirects]\nrecords = \"{DEFAULT_RECORDS_PATH}\"\nregistry = \"{DEFAULT_REGISTRY_PATH}\"\n# script_template = \"doc/redirects.js\"\n# placeholder = \"REDIRECTS_PLACEHOLDER\"\n",
    )
}

fn pick_path(
    project_root: &Path,
    flag: Option<&Path>,
    env_value: Option<String>,
    config_value: Option<&str>,
    default: &str,
) -> (PathBuf, ValueSource) {
    if let Some(path) = flag {
        return (absolutize(path, project_root), ValueSource::Flag);
    }
    if let Some(value) = env_value {
        return (absolutize(Path::new(&value), project_root), ValueSource::Env);
    }
    if let Some(value) = config_value {
        return (absolutize(Path::new(value), project_root), ValueSource::Config);
    }
    (project_root.join(default), ValueSource::Default)
}

fn lookup_non_empty<F>(lookup_env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = lookup_non_empty(lookup_env, "DOCREDIRECTS_PROJECT_ROOT") {
        return (absolutize(Path::new(&value), &context.cwd), ValueSource::Env);
    }

    match detect_project_root_heuristic(&context.cwd) {
        Some(root) => (root, ValueSource::Heuristic),
        None => (context.cwd.clone(), ValueSource::Default),
    }
}

fn detect_project_root_heuristic(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|candidate| {
            candidate.join(STATE_DIR_NAME).is_dir() || candidate.join(DEFAULT_RECORDS_PATH).is_file()
        })
        .map(Path::to_path_buf)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn write_text_file(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
