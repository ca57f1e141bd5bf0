use lenmark_core::{
    compute, detect, report, Abbreviations, Category, Settings, Span, Thresholds, WordRule,
    DEFAULT_ABBREVIATIONS,
};

const CORPUS: &[&str] = &[
    "",
    "   \n\t\n",
    "Hi there. This sentence has eight words inside it.\n- A short list item here.",
    "# Heading line\n\nA paragraph. Another one follows here!\n\n> quoted text. More quote.",
    "1. First step.\n2. Second step, with a clause. And more.\n10. Tenth.",
    "- [ ] open task\n- [x] done task. Extra sentence.\n  * nested bullet?!",
    "Roses are red\nViolets are blue\nNo punctuation here",
    "Wait... what?! Really... yes.\r\nWindows line. Ending.\r\n",
    "Mr. Smith met Dr. Jones at 5 p.m. on Main St. yesterday. They talked.",
    "Emoji 😀 sentence. Ünïcödé wörds too. “Quoted” text!",
    "...\n!!!\n???\n- ...\n> !",
    "trailing spaces here.    \n    leading spaces there.",
];

fn sample_settings() -> Vec<Settings> {
    vec![
        Settings::default(),
        Settings::new(Thresholds::new(3, 6, 9)),
        Settings::new(Thresholds::new(1, 2, 3)).with_word_rule(WordRule::Alphanumeric),
        Settings::new(Thresholds::new(2, 5, 8))
            .with_abbreviations(Abbreviations::new(DEFAULT_ABBREVIATIONS)),
    ]
}

fn slices<'t>(text: &'t str, spans: &[Span]) -> Vec<&'t str> {
    spans.iter().map(|s| &text[s.start..s.end]).collect()
}

#[test]
fn spans_are_ordered_and_disjoint() {
    for settings in sample_settings() {
        for text in CORPUS {
            let spans = compute(text, &settings, 0);
            for span in &spans {
                assert!(span.start < span.end, "empty span in {text:?}: {span:?}");
                assert!(span.end <= text.len());
            }
            for pair in spans.windows(2) {
                assert!(
                    pair[0].end <= pair[1].start,
                    "overlap in {text:?}: {pair:?}"
                );
            }
        }
    }
}

#[test]
fn spans_are_trimmed_and_never_cross_lines() {
    for settings in sample_settings() {
        for text in CORPUS {
            for slice in slices(text, &compute(text, &settings, 0)) {
                assert_eq!(slice, slice.trim(), "untrimmed span {slice:?}");
                assert!(!slice.contains('\n'));
            }
        }
    }
}

#[test]
fn base_offset_only_shifts() {
    for settings in sample_settings() {
        for text in CORPUS {
            let plain = compute(text, &settings, 0);
            for base in [1usize, 17, 4_096] {
                let shifted: Vec<Span> = plain.iter().map(|s| s.shifted(base)).collect();
                assert_eq!(compute(text, &settings, base), shifted);
            }
        }
    }
}

#[test]
fn compute_is_idempotent() {
    for settings in sample_settings() {
        for text in CORPUS {
            assert_eq!(compute(text, &settings, 3), compute(text, &settings, 3));
        }
    }
}

#[test]
fn viewport_slice_matches_full_document() {
    let settings = Settings::new(Thresholds::new(3, 6, 9));
    let text = CORPUS.join("\n");
    let full = compute(&text, &settings, 0);

    let mut line_starts: Vec<usize> = vec![0];
    line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    for window in line_starts.windows(2).step_by(3) {
        let (start, end) = (window[0], window[1]);
        let partial = compute(&text[start..end], &settings, start);
        let expected: Vec<Span> = full
            .iter()
            .copied()
            .filter(|s| s.start >= start && s.end <= end)
            .collect();
        assert_eq!(partial, expected, "viewport {start}..{end}");
    }
}

#[test]
fn end_to_end_scenario() {
    let text = "Hi there. This sentence has eight words inside it.\n- A short list item here.";
    let spans = compute(text, &Settings::new(Thresholds::new(3, 6, 9)), 0);
    assert_eq!(spans.len(), 3);
    assert_eq!(
        slices(text, &spans),
        vec![
            "Hi there.",
            "This sentence has eight words inside it.",
            "A short list item here."
        ]
    );
    assert_eq!(
        spans.iter().map(|s| (s.category, s.words)).collect::<Vec<_>>(),
        vec![
            (Category::Mini, 2),
            (Category::Medium, 7),
            (Category::Short, 5)
        ]
    );
    let list_line = text.find("- A").unwrap();
    assert_eq!(spans[2].start, list_line + "- ".len());
}

#[test]
fn list_content_offsets_are_exact() {
    let settings = Settings::new(Thresholds::new(1, 2, 3));
    let text = "intro\n  - [x] Done quickly now.\n2. Short one.\n> > Quoted bit.";
    let spans = compute(text, &settings, 0);
    assert_eq!(
        slices(text, &spans),
        vec!["intro", "Done quickly now.", "Short one.", "Quoted bit."]
    );

    for line in ["  - [x] Done quickly now.", "2. Short one.", "> > Quoted bit."] {
        let marker = detect(line).unwrap();
        assert_eq!(marker.marker_len + marker.content.len(), line.len());
    }
    assert_eq!(detect("  - [x] Done quickly now.").unwrap().marker_len, 8);
    assert_eq!(detect("2. Short one.").unwrap().marker_len, 3);
}

#[test]
fn degenerate_inputs_yield_nothing() {
    let settings = Settings::default();
    for text in ["", "   ", "\n\n\r\n", "- ", "- [ ] ", "> ", "...!?", "123 456."] {
        assert!(compute(text, &settings, 0).is_empty(), "{text:?}");
    }
}

#[test]
fn digits_follow_the_word_rule() {
    let letters = Settings::default();
    assert!(compute("123 456.", &letters, 0).is_empty());
    let alnum = Settings::default().with_word_rule(WordRule::Alphanumeric);
    let spans = compute("123 456.", &alnum, 0);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].words, 2);
}

#[test]
fn abbreviations_merge_only_when_enabled() {
    let text = "Mr. Smith met Dr. Jones. They talked.";
    let plain = compute(text, &Settings::default(), 0);
    assert_eq!(plain.len(), 4);
    let aware = Settings::default().with_abbreviations(Abbreviations::new(DEFAULT_ABBREVIATIONS));
    let merged = compute(text, &aware, 0);
    assert_eq!(
        slices(text, &merged),
        vec!["Mr. Smith met Dr. Jones.", "They talked."]
    );
}

#[test]
fn adversarial_input_runs_in_linear_time() {
    let mut text = String::new();
    text.push_str(&" ".repeat(200_000));
    text.push_str(&".".repeat(200_000));
    text.push_str(&"- ".repeat(50_000));
    text.push_str("end\n");
    text.push_str(&"word ".repeat(100_000));
    let started = std::time::Instant::now();
    let spans = compute(&text, &Settings::default(), 0);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1].words, 100_000);
    assert_eq!(spans[1].category, Category::Long);
    assert!(started.elapsed().as_secs() < 10);
}

#[test]
fn adversarial_input_with_abbreviations_runs_in_linear_time() {
    let settings =
        Settings::default().with_abbreviations(Abbreviations::new(DEFAULT_ABBREVIATIONS));
    let mut text = "a.".repeat(200_000);
    text.push('\n');
    text.push_str(&"e.g.".repeat(50_000));
    text.push_str(" done.");
    let started = std::time::Instant::now();
    let spans = compute(&text, &settings, 0);
    assert_eq!(spans.len(), 200_000 + 100_000 + 1);
    assert!(started.elapsed().as_secs() < 10);
}

#[test]
fn report_serializes_with_kebab_case_categories() {
    let r = report(
        "Tiny. This one is a little bit longer than that.",
        &Settings::new(Thresholds::new(2, 4, 6)),
    );
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["spans"][0]["category"], "mini");
    assert_eq!(json["spans"][1]["category"], "long");
    assert_eq!(json["category_counts"]["mini"], 1);
    assert_eq!(json["word_count"], 11);
}
