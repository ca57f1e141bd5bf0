//! Sentence length highlighting core engine.
//! Splits prose into sentences and list items, counts their words and
//! buckets each one into a length category an editor can colour.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

pub mod classify;
pub mod decorate;
pub mod markers;
pub mod position;
pub mod segments;
pub mod words;

pub use classify::{classify, Category, ThresholdOverrides, Thresholds};
pub use decorate::{compute, report, Decorations, DocumentReport, Span};
pub use markers::{detect, ListMarker, MarkerKind};
pub use position::{encode_spans, LineIndex, Location, OffsetEncoding, Position};
pub use segments::{Abbreviations, Segments, DEFAULT_ABBREVIATIONS};
pub use words::{count_words, WordRule};

/// Name of the profile built from the top-level settings.
pub const DEFAULT_PROFILE: &str = "default";

/// Default config file name looked up next to the documents.
pub const CONFIG_FILE_NAME: &str = "lenmark.yml";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        source: globset::Error,
    },
    #[error("unknown profile `{0}`")]
    UnknownProfile(String),
    #[error("profile `{0}` is part of an extends cycle")]
    ProfileCycle(String),
    #[error("cannot set `{key}`: {message}")]
    Override { key: String, message: String },
}

/// Sentence boundary options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SentenceRules {
    /// Keep `Mr. Smith` together instead of splitting after `Mr.`.
    pub respect_abbreviations: bool,
    pub abbreviations: Vec<String>,
}

impl Default for SentenceRules {
    fn default() -> Self {
        Self {
            respect_abbreviations: false,
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Per-path overrides of the top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProfileConfig {
    pub name: String,
    pub globs: Vec<String>,
    pub extends: Option<String>,
    /// Cut points left unset are inherited from the parent profile.
    pub thresholds: ThresholdOverrides,
    pub word_rule: Option<WordRule>,
    pub respect_abbreviations: Option<bool>,
}

/// Top-level configuration, usually read from `lenmark.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub thresholds: Thresholds,
    pub word_rule: WordRule,
    pub sentences: SentenceRules,
    pub ignore_globs: Vec<String>,
    pub profiles: Vec<ProfileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            word_rule: WordRule::default(),
            sentences: SentenceRules::default(),
            ignore_globs: vec![
                "**/.git/**".into(),
                "**/node_modules/**".into(),
                "**/target/**".into(),
                "**/dist/**".into(),
                "**/build/**".into(),
                "**/vendor/**".into(),
            ],
            profiles: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserialises to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`Config::load`] but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            Ok(Config::default())
        }
    }

    /// Apply a `key=value` style override.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let invalid = |message: String| Error::Override {
            key: key.to_string(),
            message,
        };
        let parse_count = |value: &str| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("`{value}` is not a word count ({e})")))
        };
        match key.trim() {
            "thresholds.short" => self.thresholds.short = parse_count(value)?,
            "thresholds.medium" => self.thresholds.medium = parse_count(value)?,
            "thresholds.long" => self.thresholds.long = parse_count(value)?,
            "word_rule" => self.word_rule = value.parse().map_err(invalid)?,
            "sentences.respect_abbreviations" => {
                self.sentences.respect_abbreviations =
                    match value.trim().to_ascii_lowercase().as_str() {
                        "true" | "1" | "yes" | "on" => true,
                        "false" | "0" | "no" | "off" => false,
                        other => return Err(invalid(format!("`{other}` is not a boolean"))),
                    };
            }
            _ => return Err(invalid("unknown key".to_string())),
        }
        Ok(())
    }
}

/// Resolved, immutable inputs of one `compute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub thresholds: Thresholds,
    pub word_rule: WordRule,
    pub abbreviations: Option<Abbreviations>,
}

impl Settings {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn with_word_rule(mut self, word_rule: WordRule) -> Self {
        self.word_rule = word_rule;
        self
    }

    pub fn with_abbreviations(mut self, abbreviations: Abbreviations) -> Self {
        self.abbreviations = Some(abbreviations);
        self
    }
}

#[derive(Debug, Clone)]
struct ProfileRecipe {
    thresholds: Thresholds,
    word_rule: WordRule,
    respect_abbreviations: bool,
}

impl ProfileRecipe {
    fn from_config(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds,
            word_rule: config.word_rule,
            respect_abbreviations: config.sentences.respect_abbreviations,
        }
    }

    fn extend_with(&mut self, overrides: &ProfileConfig) {
        self.thresholds = overrides.thresholds.apply(self.thresholds);
        if let Some(word_rule) = overrides.word_rule {
            self.word_rule = word_rule;
        }
        if let Some(respect) = overrides.respect_abbreviations {
            self.respect_abbreviations = respect;
        }
    }

    fn compile(self, name: &str, abbreviations: &Abbreviations) -> Settings {
        let thresholds = self.thresholds.repaired();
        if thresholds != self.thresholds {
            tracing::warn!(
                profile = name,
                given = ?self.thresholds,
                repaired = ?thresholds,
                "thresholds must be positive and ascending; repaired"
            );
        }
        Settings {
            thresholds,
            word_rule: self.word_rule,
            abbreviations: self.respect_abbreviations.then(|| abbreviations.clone()),
        }
    }
}

fn resolve_profile_recipe(
    name: &str,
    configs: &HashMap<String, ProfileConfig>,
    cache: &mut HashMap<String, ProfileRecipe>,
    visiting: &mut HashSet<String>,
    base: &Config,
) -> Result<ProfileRecipe, Error> {
    if let Some(recipe) = cache.get(name) {
        return Ok(recipe.clone());
    }

    if name == DEFAULT_PROFILE {
        let recipe = ProfileRecipe::from_config(base);
        cache.insert(name.to_string(), recipe.clone());
        return Ok(recipe);
    }

    let config = configs
        .get(name)
        .ok_or_else(|| Error::UnknownProfile(name.to_string()))?;
    if !visiting.insert(name.to_string()) {
        return Err(Error::ProfileCycle(name.to_string()));
    }

    let mut recipe = match &config.extends {
        Some(parent) => resolve_profile_recipe(parent, configs, cache, visiting, base)?,
        None => ProfileRecipe::from_config(base),
    };
    recipe.extend_with(config);
    visiting.remove(name);
    cache.insert(name.to_string(), recipe.clone());
    Ok(recipe)
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>, Error> {
    let mut builder = GlobSetBuilder::new();
    let mut any = false;
    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }
        let glob = Glob::new(pattern).map_err(|source| Error::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?;
        builder.add(glob);
        any = true;
    }
    if !any {
        return Ok(None);
    }
    builder
        .build()
        .map(Some)
        .map_err(|source| Error::InvalidGlob {
            pattern: patterns.join(", "),
            source,
        })
}

struct ProfileMatcher {
    name: String,
    globs: GlobSet,
}

/// Compiled configuration, shared across documents.
pub struct Highlighter {
    profiles: HashMap<String, Settings>,
    matchers: Vec<ProfileMatcher>,
    ignore: Option<GlobSet>,
}

impl Highlighter {
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut profile_configs: HashMap<String, ProfileConfig> = HashMap::new();
        for profile in &config.profiles {
            let name = profile.name.trim();
            if name.is_empty() || name == DEFAULT_PROFILE {
                continue;
            }
            profile_configs.insert(name.to_string(), profile.clone());
        }

        let abbreviations = Abbreviations::new(&config.sentences.abbreviations);
        let mut cache = HashMap::new();
        let mut profiles = HashMap::new();
        let default = resolve_profile_recipe(
            DEFAULT_PROFILE,
            &profile_configs,
            &mut cache,
            &mut HashSet::new(),
            &config,
        )?;
        profiles.insert(
            DEFAULT_PROFILE.to_string(),
            default.compile(DEFAULT_PROFILE, &abbreviations),
        );
        for name in profile_configs.keys() {
            let recipe = resolve_profile_recipe(
                name,
                &profile_configs,
                &mut cache,
                &mut HashSet::new(),
                &config,
            )?;
            tracing::debug!(profile = %name, ?recipe, "resolved profile");
            profiles.insert(name.clone(), recipe.compile(name, &abbreviations));
        }

        let mut matchers = Vec::new();
        for profile in &config.profiles {
            let name = profile.name.trim();
            if !profile_configs.contains_key(name) {
                continue;
            }
            if let Some(globs) = build_glob_set(&profile.globs)? {
                matchers.push(ProfileMatcher {
                    name: name.to_string(),
                    globs,
                });
            }
        }

        Ok(Self {
            profiles,
            matchers,
            ignore: build_glob_set(&config.ignore_globs)?,
        })
    }

    pub fn default_profile(&self) -> &str {
        DEFAULT_PROFILE
    }

    /// Settings of the default profile.
    pub fn settings(&self) -> &Settings {
        &self.profiles[DEFAULT_PROFILE]
    }

    pub fn profile(&self, name: &str) -> Result<&Settings, Error> {
        self.profiles
            .get(name)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// First profile whose globs match `path` (forward slashes, relative to
    /// the config root), or the default profile.
    pub fn profile_for_path(&self, path: &str) -> &str {
        self.matchers
            .iter()
            .find(|m| m.globs.is_match(path))
            .map(|m| m.name.as_str())
            .unwrap_or(DEFAULT_PROFILE)
    }

    pub fn settings_for_path(&self, path: &str) -> &Settings {
        &self.profiles[self.profile_for_path(path)]
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(path))
    }

    /// Spans for `text` under the default profile.
    pub fn compute(&self, text: &str, base_offset: usize) -> Vec<Span> {
        compute(text, self.settings(), base_offset)
    }

    pub fn compute_with_profile(
        &self,
        text: &str,
        profile: &str,
        base_offset: usize,
    ) -> Result<Vec<Span>, Error> {
        Ok(compute(text, self.profile(profile)?, base_offset))
    }
}
