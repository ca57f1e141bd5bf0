//! Word counting rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LETTER_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+(?:['\u{2018}\u{2019}][A-Za-z]+)?").expect("valid letter word regex")
});

static ALNUM_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Za-z_]+").expect("valid alphanumeric word regex"));

/// Lexical rule deciding what counts as a word.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WordRule {
    /// Runs of ASCII letters, with at most one internal apostrophe
    /// (`don't`, `Ada's`). Digits, punctuation and markup never count.
    #[default]
    Letters,
    /// Runs of ASCII letters, digits and underscores. Apostrophes split
    /// words, so `don't` counts as two.
    Alphanumeric,
}

impl WordRule {
    fn regex(self) -> &'static Regex {
        match self {
            WordRule::Letters => &*LETTER_WORD_RE,
            WordRule::Alphanumeric => &*ALNUM_WORD_RE,
        }
    }
}

impl std::fmt::Display for WordRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WordRule::Letters => "letters",
            WordRule::Alphanumeric => "alphanumeric",
        })
    }
}

impl std::str::FromStr for WordRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letters" => Ok(WordRule::Letters),
            "alphanumeric" | "alnum" => Ok(WordRule::Alphanumeric),
            other => Err(format!("unknown word rule `{other}`")),
        }
    }
}

/// Count the words in `text` under `rule`.
pub fn count_words(text: &str, rule: WordRule) -> usize {
    rule.regex().find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_words_and_ignores_punctuation() {
        assert_eq!(count_words("Hello, world!", WordRule::Letters), 2);
        assert_eq!(count_words("...?!", WordRule::Letters), 0);
        assert_eq!(count_words("", WordRule::Letters), 0);
    }

    #[test]
    fn contractions_are_one_word() {
        assert_eq!(count_words("don't stop", WordRule::Letters), 2);
        assert_eq!(count_words("Ada\u{2019}s notes", WordRule::Letters), 2);
        assert_eq!(count_words("don't stop", WordRule::Alphanumeric), 3);
    }

    #[test]
    fn digits_depend_on_rule() {
        assert_eq!(count_words("3 apples", WordRule::Letters), 1);
        assert_eq!(count_words("3 apples", WordRule::Alphanumeric), 2);
    }

    #[test]
    fn markup_is_not_counted() {
        assert_eq!(count_words("**bold** and _soft_", WordRule::Letters), 3);
        assert_eq!(count_words("# - > [ ] *", WordRule::Letters), 0);
    }

    #[test]
    fn trailing_apostrophe_is_not_part_of_word() {
        assert_eq!(count_words("the dogs' bowls", WordRule::Letters), 3);
        assert_eq!(count_words("'quoted'", WordRule::Letters), 1);
    }

    #[test]
    fn parses_rule_names() {
        assert_eq!("letters".parse::<WordRule>(), Ok(WordRule::Letters));
        assert_eq!(" Alnum ".parse::<WordRule>(), Ok(WordRule::Alphanumeric));
        assert!("graphemes".parse::<WordRule>().is_err());
    }
}
