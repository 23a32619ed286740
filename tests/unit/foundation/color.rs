use super::*;
use serde_json::json;

#[test]
fn parses_hex_forms() {
    let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, Color::rgb(255, 0, 0));

    let c: Color = serde_json::from_value(json!("#fff")).unwrap();
    assert_eq!(c, Color::WHITE);

    let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
    assert_eq!(c, Color::rgba(0, 0, 255, 128));
}

#[test]
fn parses_css_functions_and_names() {
    assert_eq!(
        Color::parse("rgba(10, 20, 30, 0.5)").unwrap(),
        Color::rgba(10, 20, 30, 128)
    );
    assert_eq!(Color::parse("RGB(1,2,3)").unwrap(), Color::rgb(1, 2, 3));
    assert_eq!(Color::parse("transparent").unwrap(), Color::TRANSPARENT);
    assert!(Color::parse("chartreuse-ish").is_err());
}

#[test]
fn parses_object_and_array() {
    let c: Color = serde_json::from_value(json!({"r": 10, "g": 20, "b": 30})).unwrap();
    assert_eq!(c, Color::rgb(10, 20, 30));

    let c: Color = serde_json::from_value(json!([10, 20, 30, 0.0])).unwrap();
    assert_eq!(c, Color::rgba(10, 20, 30, 0));
}

#[test]
fn serializes_as_hex() {
    assert_eq!(serde_json::to_value(Color::BLACK).unwrap(), json!("#000000"));
    assert_eq!(
        serde_json::to_value(Color::rgba(1, 2, 3, 4)).unwrap(),
        json!("#01020304")
    );
}

#[test]
fn alpha_mul_clamps() {
    assert_eq!(Color::WHITE.with_alpha_mul(0.5).a, 128);
    assert_eq!(Color::WHITE.with_alpha_mul(7.0).a, 255);
}

#[test]
fn parses_hsl_forms() {
    assert_eq!(Color::parse("hsl(0, 100%, 50%)").unwrap(), Color::rgb(255, 0, 0));
    assert_eq!(
        Color::parse("hsla(120deg, 100%, 25%, 0.5)").unwrap(),
        Color::rgba(0, 128, 0, 128)
    );
    assert_eq!(Color::parse("hsl(0, 0%, 100%)").unwrap(), Color::WHITE);
    assert!(Color::parse("hsl(1, 2)").is_err());

    let c: Color = serde_json::from_value(json!({"h": 240.0, "s": 1.0, "l": 0.5})).unwrap();
    assert_eq!(c, Color::rgb(0, 0, 255));
}

#[test]
fn knows_the_css_named_colors() {
    assert_eq!(Color::parse("orange").unwrap(), Color::rgb(255, 165, 0));
    assert_eq!(Color::parse("RebeccaPurple").unwrap(), Color::rgb(102, 51, 153));
    assert_eq!(Color::parse("whitesmoke").unwrap(), Color::rgb(245, 245, 245));
    assert_eq!(Color::parse("aliceblue").unwrap(), Color::rgb(240, 248, 255));
    assert!(NAMED.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn style_fields_fall_back_on_bad_values() {
    #[derive(serde::Deserialize)]
    struct Style {
        #[serde(deserialize_with = "black_if_invalid")]
        ink: Color,
        #[serde(deserialize_with = "white_if_invalid")]
        paper: Color,
        #[serde(default, deserialize_with = "none_if_invalid")]
        fill: Option<Color>,
    }

    let s: Style =
        serde_json::from_value(json!({"ink": "inky", "paper": 42, "fill": "nope"})).unwrap();
    assert_eq!((s.ink, s.paper, s.fill), (Color::BLACK, Color::WHITE, None));

    let s: Style =
        serde_json::from_value(json!({"ink": "navy", "paper": "#eee", "fill": null})).unwrap();
    assert_eq!(s.ink, Color::rgb(0, 0, 128));
    assert_eq!(s.paper, Color::rgb(238, 238, 238));
    assert_eq!(s.fill, None);
}
