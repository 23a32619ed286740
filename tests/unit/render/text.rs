use super::*;

fn mono(s: &str) -> f64 {
    s.chars().count() as f64 * 10.0
}

#[test]
fn greedy_wrap_breaks_on_overflow() {
    let lines = wrap_words("the quick brown fox", 100.0, mono);
    assert_eq!(lines, vec!["the quick", "brown fox"]);
}

#[test]
fn exact_fit_stays_on_one_line() {
    let lines = wrap_words("abcd efghi", 100.0, mono);
    assert_eq!(lines, vec!["abcd efghi"]);
}

#[test]
fn overlong_word_gets_its_own_line() {
    let lines = wrap_words("a supercalifragilistic b", 50.0, mono);
    assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
}

#[test]
fn newlines_start_paragraphs_and_blank_input_is_empty() {
    assert_eq!(wrap_words("one\ntwo three", 1000.0, mono), vec!["one", "two three"]);
    assert!(wrap_words("   ", 100.0, mono).is_empty());
    assert!(wrap_words("", 100.0, mono).is_empty());
}

#[test]
fn wrapping_is_deterministic() {
    let text = "Manga pages are read right to left, panel by panel, bubble by bubble.";
    let first = wrap_words(text, 120.0, mono);
    for _ in 0..5 {
        assert_eq!(wrap_words(text, 120.0, mono), first);
    }
}

#[test]
fn engine_measure_handles_degenerate_input() {
    let mut engine = TextEngine::new();
    assert_eq!(engine.measure("", "sans-serif", 16.0), 0.0);
    assert_eq!(engine.measure("abc", "sans-serif", 0.0), 0.0);
    let w = engine.measure("abc", "sans-serif", 16.0);
    assert!(w.is_finite() && w >= 0.0);
}

#[test]
fn brush_from_color() {
    let b = TextBrush::from(Color::rgba(1, 2, 3, 4));
    assert_eq!((b.r, b.g, b.b, b.a), (1, 2, 3, 4));
}
