use crate::config::RuleSet;
use lazy_static::lazy_static;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub const DEFAULT_RULES_PATH: &str = "config/spam_rules.yaml";
pub const RULES_PATH_ENV: &str = "SMART_MAIL_RULES";

/// Where the currently cached rules came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// No rule file on disk
    Defaults,
    File,
    /// The file exists but could not be used; defaults are in effect
    Invalid(String),
}

#[derive(Debug)]
struct CachedRules {
    mtime: Option<SystemTime>,
    rules: Arc<RuleSet>,
    source: RuleSource,
}

/// Loads the rule file and caches the parsed result keyed by the file's
/// modification time. A missing or broken file never fails the caller.
#[derive(Debug)]
pub struct RuleLoader {
    path: PathBuf,
    cache: Option<CachedRules>,
}

impl RuleLoader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    /// `$SMART_MAIL_RULES`, or `config/spam_rules.yaml`
    pub fn from_env() -> Self {
        let path = std::env::var_os(RULES_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source of the cached rules, `None` before the first load.
    pub fn source(&self) -> Option<&RuleSource> {
        self.cache.as_ref().map(|c| &c.source)
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn load(&mut self, force: bool) -> Arc<RuleSet> {
        let metadata = std::fs::metadata(&self.path);
        let mtime = metadata.as_ref().ok().and_then(|m| m.modified().ok());

        if !force {
            if let Some(cached) = &self.cache {
                let unchanged = match &metadata {
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        cached.source == RuleSource::Defaults
                    }
                    _ => cached.mtime == mtime && cached.source != RuleSource::Defaults,
                };
                if unchanged {
                    return Arc::clone(&cached.rules);
                }
            }
        }

        let (rules, source) = match metadata {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "Rule file {} not found, using built-in defaults",
                    self.path.display()
                );
                (RuleSet::default(), RuleSource::Defaults)
            }
            Err(e) => {
                log::warn!(
                    "Cannot stat rule file {}: {e}; using built-in defaults",
                    self.path.display()
                );
                (RuleSet::default(), RuleSource::Invalid(e.to_string()))
            }
            Ok(_) => match RuleSet::from_file(&self.path) {
                Ok(rules) => {
                    log::info!("Loaded spam rules from {}", self.path.display());
                    (rules, RuleSource::File)
                }
                Err(e) => {
                    log::warn!("{e:#}; using built-in defaults");
                    (RuleSet::default(), RuleSource::Invalid(format!("{e:#}")))
                }
            },
        };

        let rules = Arc::new(rules);
        self.cache = Some(CachedRules {
            mtime,
            rules: Arc::clone(&rules),
            source,
        });
        rules
    }
}

lazy_static! {
    static ref GLOBAL_LOADER: Mutex<RuleLoader> = Mutex::new(RuleLoader::from_env());
}

/// Process-wide rules from the default location. Prefer an owned
/// `RuleLoader` where one can be passed around.
pub fn load_rules(force: bool) -> Arc<RuleSet> {
    let mut loader = GLOBAL_LOADER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    loader.load(force)
}
