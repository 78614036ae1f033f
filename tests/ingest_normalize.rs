// tests/ingest_normalize.rs
use headline_sentiment::ingest::dedup::dedup_key;
use headline_sentiment::ingest::{normalize_text, MAX_HEADLINE_CHARS};

#[test]
fn normalize_basic_html_and_ws() {
    let raw = "  <b>Palantir&nbsp;wins</b>\n\t&ldquo;big&rdquo;  contract ";
    assert_eq!(normalize_text(raw), r#"Palantir wins "big" contract"#);
}

#[test]
fn normalize_typographic_quotes() {
    assert_eq!(
        normalize_text("Karp\u{2019}s \u{00AB}AIP\u{00BB} bet"),
        "Karp's \"AIP\" bet"
    );
}

#[test]
fn normalize_keeps_trailing_punctuation() {
    assert_eq!(normalize_text("Palantir soars!!"), "Palantir soars!!");
}

#[test]
fn normalize_caps_length() {
    let long = "a".repeat(MAX_HEADLINE_CHARS + 250);
    assert_eq!(normalize_text(&long).chars().count(), MAX_HEADLINE_CHARS);
}

#[test]
fn normalize_tag_only_input_is_empty() {
    assert_eq!(normalize_text("<p> </p>"), "");
}

#[test]
fn dedup_key_strips_trailing_punctuation_and_case() {
    assert_eq!(
        dedup_key("Palantir Beats Estimates!"),
        dedup_key("palantir beats estimates.")
    );
    assert_eq!(dedup_key("Why Palantir?!;"), "why palantir");
    // Interior punctuation still matters.
    assert_ne!(dedup_key("Palantir, Inc. wins"), dedup_key("Palantir Inc wins"));
}
