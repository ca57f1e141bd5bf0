use std::{
    collections::BTreeMap,
    env,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use console::{style, Style};
use lenmark_core::{
    encode_spans, report, Category, Config, DocumentReport, Highlighter, LineIndex,
    OffsetEncoding, Span, CONFIG_FILE_NAME,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Sentence length highlighter CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "lenmark",
    about = "Mark every sentence and list item by length category."
)]
struct Args {
    /// Path to config file (YAML). Defaults to lenmark.yml if present.
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Emit JSON output for automation / editor integrations.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Print each document with its spans coloured by category.
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "json")]
    render: bool,

    /// Only print the totals line.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Files or directories to scan. Use `-` for stdin.
    #[arg(value_name = "PATH", default_value = ".", num_args = 0..)]
    paths: Vec<PathBuf>,

    /// Force a specific profile name for all files (overrides glob matching).
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Unit for span offsets in JSON output: utf8, utf16 or char.
    #[arg(long, value_name = "UNIT", default_value = "utf8")]
    offsets: OffsetEncoding,

    /// Exit non-zero when any span reaches this category (mini, short, medium, long).
    #[arg(long, value_name = "CATEGORY")]
    fail_on: Option<Category>,

    /// Set config overrides (repeatable as key=value). Example: --set thresholds.long=30
    #[arg(long = "set", value_name = "KEY=VALUE", num_args = 0..)]
    sets: Vec<String>,
}

enum Input {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Serialize)]
struct FileResult {
    path: String,
    profile: String,
    word_count: usize,
    category_counts: BTreeMap<Category, usize>,
    spans: Vec<Span>,
}

#[derive(Debug, Serialize)]
struct OutputReport {
    offsets: OffsetEncoding,
    files: Vec<FileResult>,
    total_word_count: usize,
    category_counts: BTreeMap<Category, usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LENMARK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let (mut cfg, config_root) = load_config(&args.config)?;
    apply_overrides(&mut cfg, &args.sets)?;
    let highlighter = Highlighter::new(cfg).context("invalid configuration")?;
    if let Some(profile) = &args.profile {
        highlighter.profile(profile)?;
    }

    let inputs = collect_inputs(&args.paths, &highlighter, &config_root)?;
    tracing::debug!(count = inputs.len(), "collected inputs");

    let mut files = Vec::new();
    let mut totals: BTreeMap<Category, usize> = BTreeMap::new();
    let mut total_words = 0usize;
    let mut failed = false;

    for input in inputs {
        let (label, rel_path, content) = match &input {
            Input::Stdin => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                ("<stdin>".to_string(), String::new(), buf)
            }
            Input::File(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                (
                    path.to_string_lossy().to_string(),
                    relative_path(path, &config_root),
                    content,
                )
            }
        };

        let profile = match &args.profile {
            Some(force) => force.as_str(),
            None => highlighter.profile_for_path(&rel_path),
        };
        let doc = report(&content, highlighter.profile(profile)?);

        total_words += doc.word_count;
        for (category, count) in &doc.category_counts {
            *totals.entry(*category).or_default() += count;
        }
        if let (Some(limit), Some(worst)) = (args.fail_on, doc.worst()) {
            if worst >= limit {
                failed = true;
            }
        }

        if !args.json && !args.quiet {
            if args.render {
                print_rendered(&label, profile, &content, &doc);
            } else {
                print_human_report(&label, profile, &content, &doc);
            }
        }

        files.push(FileResult {
            path: label,
            profile: profile.to_string(),
            word_count: doc.word_count,
            spans: encode_spans(&content, &doc.spans, args.offsets),
            category_counts: doc.category_counts,
        });
    }

    if args.json {
        let output = OutputReport {
            offsets: args.offsets,
            files,
            total_word_count: total_words,
            category_counts: totals,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "\n{} files, {} words, {}",
            files.len(),
            total_words,
            summarize(&totals)
        );
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<(Config, PathBuf)> {
    let cfg = Config::load_or_default(path)?;
    let dir = if path.exists() {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => env::current_dir()?,
        }
    } else {
        env::current_dir()?
    };
    Ok((cfg, dir))
}

fn apply_overrides(cfg: &mut Config, sets: &[String]) -> anyhow::Result<()> {
    for kv in sets {
        let (key, value) = kv
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{kv}`"))?;
        if key.trim().is_empty() {
            continue;
        }
        cfg.apply_override(key, value)?;
    }
    Ok(())
}

fn relative_path(path: &Path, root: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let rel = pathdiff::diff_paths(&absolute, root).unwrap_or(absolute);
    rel.to_string_lossy()
        .replace('\\', "/")
        .trim_start_matches("./")
        .to_string()
}

fn collect_inputs(
    paths: &[PathBuf],
    highlighter: &Highlighter,
    root: &Path,
) -> anyhow::Result<Vec<Input>> {
    let mut files = Vec::new();
    let mut stdin = false;
    for path in paths {
        if path.as_os_str() == "-" {
            stdin = true;
        } else if path.is_dir() {
            let mut walker = WalkDir::new(path).sort_by_file_name().into_iter();
            while let Some(entry_res) = walker.next() {
                let entry = entry_res?;
                let entry_path = entry.path();
                if highlighter.is_ignored(&relative_path(entry_path, root)) {
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
                if entry.file_type().is_file() && is_supported(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else if path.is_file() {
            // Explicitly named files are read whatever their extension.
            files.push(path.clone());
        } else {
            return Err(anyhow!("No such file or directory: {}", path.display()));
        }
    }
    files.sort();
    files.dedup();
    let mut inputs: Vec<Input> = files.into_iter().map(Input::File).collect();
    if stdin {
        inputs.insert(0, Input::Stdin);
    }
    Ok(inputs)
}

fn is_supported(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "md" | "markdown" | "txt"
        ),
        None => false,
    }
}

fn category_style(category: Category) -> Style {
    match category {
        Category::Mini => Style::new().cyan(),
        Category::Short => Style::new().green(),
        Category::Medium => Style::new().yellow(),
        Category::Long => Style::new().red().bold(),
    }
}

fn highlight_style(category: Category) -> Style {
    let base = Style::new().black();
    match category {
        Category::Mini => base.on_cyan(),
        Category::Short => base.on_green(),
        Category::Medium => base.on_yellow(),
        Category::Long => base.on_red(),
    }
}

fn summarize(counts: &BTreeMap<Category, usize>) -> String {
    Category::ALL
        .iter()
        .map(|c| {
            let n = counts.get(c).copied().unwrap_or(0);
            format!("{} {}", n, category_style(*c).apply_to(c))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_CHARS - 1).collect();
    format!("{cut}…")
}

fn print_human_report(label: &str, profile: &str, content: &str, doc: &DocumentReport) {
    println!(
        "{} ({} words, profile {})",
        style(label).bold(),
        doc.word_count,
        profile
    );
    if doc.spans.is_empty() {
        println!("  {}", style("no sentences").dim());
        return;
    }
    let index = LineIndex::new(content);
    for span in &doc.spans {
        let loc = index.location(span.start);
        println!(
            "  {:>4}:{:<3} {:<8} {:>3}w  {}",
            loc.line,
            loc.column,
            category_style(span.category).apply_to(span.category),
            span.words,
            snippet(&content[span.range()])
        );
    }
}

fn print_rendered(label: &str, profile: &str, content: &str, doc: &DocumentReport) {
    println!("{} (profile {})", style(label).bold(), profile);
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for span in &doc.spans {
        out.push_str(&content[cursor..span.start]);
        out.push_str(
            &highlight_style(span.category)
                .apply_to(&content[span.range()])
                .to_string(),
        );
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    println!("{out}");
    println!("  {}", summarize(&doc.category_counts));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_prose_extensions_are_walked() {
        for name in ["notes.md", "README.MARKDOWN", "draft.txt"] {
            assert!(is_supported(Path::new(name)), "{name}");
        }
        for name in ["page.mdx", "main.rs", "Makefile"] {
            assert!(!is_supported(Path::new(name)), "{name}");
        }
    }
}
