use super::*;

#[test]
fn plain_text_passes_through() {
    assert_eq!(strip_to_plain_text("Hello there"), "Hello there");
}

#[test]
fn tags_are_removed_and_text_kept() {
    assert_eq!(
        strip_to_plain_text("<p>Hello <strong>brave</strong> <em>world</em></p>"),
        "Hello brave world"
    );
}

#[test]
fn block_boundaries_become_line_breaks() {
    assert_eq!(
        strip_to_plain_text("<p>First</p><p>Second<br/>Third</p>"),
        "First\nSecond\nThird"
    );
}

#[test]
fn entities_are_decoded() {
    assert_eq!(
        strip_to_plain_text("Tom &amp; Jerry &lt;3 &#33; &#x41;&nbsp;b"),
        "Tom & Jerry <3 ! A b"
    );
}

#[test]
fn unknown_entities_and_stray_ampersands_survive() {
    assert_eq!(strip_to_plain_text("R&D &bogus; ok"), "R&D &bogus; ok");
}

#[test]
fn unterminated_tag_is_literal() {
    assert_eq!(strip_to_plain_text("a < b"), "a < b");
}

#[test]
fn whitespace_collapses() {
    assert_eq!(strip_to_plain_text("  lots   of\t space  "), "lots of space");
}
