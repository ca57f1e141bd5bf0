//! Length categories and the thresholds that separate them.

use serde::{Deserialize, Serialize};

/// Length bucket assigned to a segment, ordered from shortest to longest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Mini,
    Short,
    Medium,
    Long,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Mini,
        Category::Short,
        Category::Medium,
        Category::Long,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mini => "mini",
            Category::Short => "short",
            Category::Medium => "medium",
            Category::Long => "long",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == n)
            .ok_or_else(|| format!("unknown category `{n}`"))
    }
}

/// Three ascending cut points in words.
///
/// `mini` is below `short`, `short` runs up to and including `medium`,
/// `medium` up to and including `long`, and anything above `long` is `long`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Thresholds {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            short: 8,
            medium: 16,
            long: 25,
        }
    }
}

impl Thresholds {
    pub fn new(short: usize, medium: usize, long: usize) -> Self {
        Self {
            short,
            medium,
            long,
        }
    }

    /// Positive and strictly ascending.
    pub fn is_valid(&self) -> bool {
        self.short >= 1 && self.short < self.medium && self.medium < self.long
    }

    /// Force the triple into a valid shape by raising each cut point just
    /// above its predecessor. Valid thresholds come back unchanged.
    pub fn repaired(self) -> Self {
        let short = self.short.max(1);
        let medium = self.medium.max(short + 1);
        let long = self.long.max(medium + 1);
        Self {
            short,
            medium,
            long,
        }
    }
}

/// Cut points a profile sets on top of the thresholds it inherits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThresholdOverrides {
    pub short: Option<usize>,
    pub medium: Option<usize>,
    pub long: Option<usize>,
}

impl ThresholdOverrides {
    pub fn apply(&self, base: Thresholds) -> Thresholds {
        Thresholds {
            short: self.short.unwrap_or(base.short),
            medium: self.medium.unwrap_or(base.medium),
            long: self.long.unwrap_or(base.long),
        }
    }
}

impl From<Thresholds> for ThresholdOverrides {
    fn from(t: Thresholds) -> Self {
        Self {
            short: Some(t.short),
            medium: Some(t.medium),
            long: Some(t.long),
        }
    }
}

/// Bucket a word count. Assumes `thresholds` is valid.
pub fn classify(words: usize, thresholds: &Thresholds) -> Category {
    if words < thresholds.short {
        Category::Mini
    } else if words <= thresholds.medium {
        Category::Short
    } else if words <= thresholds.long {
        Category::Medium
    } else {
        Category::Long
    }
}
