use std::fs;
use std::path::{Path, PathBuf};

use lenmark_core::{Category, Config, Error, Highlighter, Thresholds, WordRule, CONFIG_FILE_NAME};

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let mut dir = std::env::temp_dir();
        let unique = format!(
            "{prefix}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        dir.push(unique);
        fs::create_dir_all(&dir).expect("create temp dir");
        Self { path: dir }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

#[test]
fn loads_yaml_with_profiles() {
    let tmp = TempDir::new("lenmark-config");
    let path = tmp.path.join(CONFIG_FILE_NAME);
    write_file(
        &path,
        r#"thresholds:
  short: 5
  medium: 7
  long: 9
word_rule: alphanumeric
sentences:
  respect_abbreviations: true
  abbreviations: ["Mr.", "Dr."]
profiles:
  - name: poetry
    globs: ["poems/**"]
    thresholds: { short: 2, medium: 4, long: 6 }
    respect_abbreviations: false
"#,
    );

    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.thresholds, Thresholds::new(5, 7, 9));
    assert_eq!(cfg.word_rule, WordRule::Alphanumeric);
    assert_eq!(cfg.profiles.len(), 1);

    let h = Highlighter::new(cfg).unwrap();
    let text = "Mr. Smith waved at Dr. Who again.";
    let spans = h.compute(text, 0);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].words, 7);
    assert_eq!(spans[0].category, Category::Short);

    assert_eq!(h.profile_for_path("poems/rain.md"), "poetry");
    let poem = h.compute_with_profile(text, "poetry", 0).unwrap();
    assert_eq!(poem.len(), 3);
    assert!(h.compute_with_profile(text, "missing", 0).is_err());
}

#[test]
fn partial_thresholds_fill_from_defaults() {
    let cfg = Config::from_yaml_str("thresholds:\n  short: 3\n").unwrap();
    let defaults = Thresholds::default();
    assert_eq!(
        cfg.thresholds,
        Thresholds::new(3, defaults.medium, defaults.long)
    );
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let tmp = TempDir::new("lenmark-missing");
    let cfg = Config::load_or_default(&tmp.path.join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(cfg, Config::default());
    assert!(matches!(
        Config::load(&tmp.path.join(CONFIG_FILE_NAME)),
        Err(Error::Read { .. })
    ));
}

#[test]
fn malformed_yaml_reports_path() {
    let tmp = TempDir::new("lenmark-bad");
    let path = tmp.path.join(CONFIG_FILE_NAME);
    write_file(&path, "thresholds: [1, 2\n");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn unknown_word_rule_is_rejected() {
    assert!(Config::from_yaml_str("word_rule: syllables\n").is_err());
}

#[test]
fn inverted_thresholds_are_repaired_before_use() {
    let cfg = Config::from_yaml_str("thresholds: { short: 9, medium: 7, long: 5 }\n").unwrap();
    let h = Highlighter::new(cfg).unwrap();
    assert_eq!(h.settings().thresholds, Thresholds::new(9, 10, 11));
    let spans = h.compute("one two three four five six seven eight nine ten.", 0);
    assert_eq!(spans[0].category, Category::Short);
}

#[test]
fn profile_thresholds_inherit_unset_cut_points() {
    let cfg = Config::from_yaml_str(
        r#"thresholds: { short: 2, medium: 4, long: 6 }
profiles:
  - name: base
    thresholds: { short: 3, medium: 5, long: 7 }
  - name: child
    extends: base
    globs: ["drafts/**"]
    thresholds: { long: 40 }
  - name: sibling
    thresholds: { short: 1 }
"#,
    )
    .unwrap();
    let h = Highlighter::new(cfg).unwrap();
    assert_eq!(
        h.settings_for_path("drafts/one.md").thresholds,
        Thresholds::new(3, 5, 40)
    );
    assert_eq!(h.profile("sibling").unwrap().thresholds, Thresholds::new(1, 4, 6));
}
