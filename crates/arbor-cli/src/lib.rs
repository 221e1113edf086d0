//! Runner side of the `arbor` binary: configuration, document loading and the tick loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arbor_bt::{
    instantiate_with, ActionRegistry, BtStatus, InstanceOptions, RuntimeTree, TickDriver,
    TreeDocument, TreeTemplate,
};
use arbor_core::Blackboard;
use arbor_tools::{SharedTraceLog, TraceLog};
use serde::{Deserialize, Serialize};

/// File picked up next to a tree document when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "arbor.yaml";

/// Runner configuration, loaded from `arbor.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds of simulated time per tick
    #[serde(default = "default_dt_seconds")]
    pub dt_seconds: f32,

    /// Upper bound on ticks per run
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Seed for random selectors
    pub seed: u64,

    /// Stop as soon as the root completes
    #[serde(default = "default_true")]
    pub stop_on_completion: bool,

    /// Run the fixed-rate hooks every N ticks (0 = never)
    pub fixed_every_ticks: u64,
}

fn default_dt_seconds() -> f32 {
    0.1
}
fn default_max_ticks() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dt_seconds: default_dt_seconds(),
            max_ticks: default_max_ticks(),
            seed: 0,
            stop_on_completion: true,
            fixed_every_ticks: 0,
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load `explicit` if given, else `arbor.yaml` beside the tree, else defaults.
    pub fn load_for_tree(tree: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let beside = tree
            .parent()
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if beside.exists() {
            Self::load(&beside)
        } else {
            Ok(Self::default())
        }
    }
}

/// Parse a tree document; `.json` files are read as JSON, anything else as YAML.
pub fn load_document(path: &Path) -> Result<TreeDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree from {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let doc = if is_json {
        TreeDocument::from_json_str(&content)
    } else {
        TreeDocument::from_yaml_str(&content)
    };
    doc.with_context(|| format!("Failed to parse tree from {}", path.display()))
}

/// Load and validate a tree document with the built-in actions.
pub fn load_template(path: &Path) -> Result<TreeTemplate> {
    let doc = load_document(path)?;
    let template = doc
        .to_template(&ActionRegistry::with_builtins())
        .with_context(|| format!("Invalid tree {}", path.display()))?;
    Ok(template)
}

/// One line per node, depth-first: indentation by depth, kind label and call stack.
pub fn describe(tree: &RuntimeTree) -> Vec<String> {
    let mut lines = Vec::with_capacity(tree.len());
    let mut pending = vec![tree.root()];
    while let Some(handle) = pending.pop() {
        let Some(node) = tree.node(handle) else {
            continue;
        };
        let mut line = format!(
            "{:indent$}{} [{}] stack={}",
            "",
            node.name(),
            node.label(),
            node.call_stack_id().0,
            indent = node.depth() as usize * 2,
        );
        if !node.tag().is_empty() {
            line.push_str(&format!(" tag={}", node.tag()));
        }
        lines.push(line);
        pending.extend(node.children().iter().rev().copied());
    }
    lines
}

/// Outcome of [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: BtStatus,
    pub ticks: u64,
    pub blackboard: Blackboard,
    /// Empty unless tracing was requested.
    pub trace: TraceLog,
}

/// Instantiate `template` and tick it as configured.
pub fn run(template: &TreeTemplate, config: &RunnerConfig, trace: bool) -> Result<RunSummary> {
    let mut tree = instantiate_with(template, InstanceOptions::with_seed(config.seed))?;
    let log = SharedTraceLog::new();
    if trace {
        tree.set_trace_sink(Box::new(log.clone()));
    }

    let mut driver =
        TickDriver::new(tree, config.dt_seconds).with_fixed_every(config.fixed_every_ticks);
    let status = if config.stop_on_completion {
        driver.run_until_done(config.max_ticks)
    } else {
        for _ in 0..config.max_ticks {
            driver.tick();
        }
        driver.last_status()
    };
    tracing::info!(ticks = driver.ticks(), status = ?status, "run finished");

    Ok(RunSummary {
        status,
        ticks: driver.ticks(),
        blackboard: driver.tree().blackboard().clone(),
        trace: log.snapshot(),
    })
}
