use super::*;
use serde_json::json;

#[test]
fn panel_deserializes_with_defaults() {
    let e: Element = serde_json::from_value(json!({
        "id": "p1",
        "type": "panel",
        "x": 0, "y": 0, "width": 400, "height": 600,
        "zIndex": 10
    }))
    .unwrap();
    assert_eq!(e.element_type(), ElementType::Panel);
    assert_eq!(e.z_index(), 10);
    assert_eq!(e.transform.opacity, 1.0);
    let p = e.as_panel().unwrap();
    assert_eq!(p.panel_style, PanelStyle::default());
    assert!(p.image_url.is_none());
}

#[test]
fn unknown_panel_shape_is_custom() {
    let e: Element = serde_json::from_value(json!({
        "id": "p1", "type": "panel",
        "x": 0, "y": 0, "width": 10, "height": 10,
        "panelStyle": { "shape": "hexagon", "fillColor": "#ff0000", "fillAlpha": 0.5 }
    }))
    .unwrap();
    let style = &e.as_panel().unwrap().panel_style;
    assert_eq!(style.shape, PanelShape::Custom("hexagon".to_owned()));
    assert_eq!(style.fill_color, Some(Color::rgb(255, 0, 0)));
    assert_eq!(style.fill_alpha, 0.5);
    assert_eq!(style.border_width, 6.0);
}

#[test]
fn dialogue_partial_style_keeps_other_defaults() {
    let e: Element = serde_json::from_value(json!({
        "id": "b1", "type": "dialogue",
        "x": 10, "y": 10, "width": 200, "height": 100,
        "text": "<p>Hi</p>",
        "dialogueStyle": { "bubbleType": "shout", "fontSize": 20 }
    }))
    .unwrap();
    let ElementKind::Dialogue(d) = &e.kind else {
        panic!("expected dialogue");
    };
    assert_eq!(d.dialogue_style.bubble_type, BubbleType::Shout);
    assert_eq!(d.dialogue_style.font_size, 20.0);
    assert_eq!(d.dialogue_style.tail_length, 30.0);
    assert_eq!(d.dialogue_style.background_color, Color::WHITE);
}

#[test]
fn element_roundtrips_through_json_shape() {
    let e = Element::image("i1", "assets/a.png", 1.0, 2.0, 3.0, 4.0, 5);
    let v = serde_json::to_value(&e).unwrap();
    assert_eq!(v["type"], "image");
    assert_eq!(v["zIndex"], 5);
    assert_eq!(v["url"], "assets/a.png");
    let back: Element = serde_json::from_value(v).unwrap();
    assert_eq!(back, e);
}

#[test]
fn page_validation_rejects_duplicates_and_bad_geometry() {
    let page = Page::new("pg", 1)
        .with_element(Element::panel("a", 0.0, 0.0, 10.0, 10.0, 1))
        .with_element(Element::panel("a", 0.0, 0.0, 10.0, 10.0, 1));
    assert!(page.validate().is_err());

    let page = Page::new("pg", 1).with_element(Element::panel("a", 0.0, 0.0, -1.0, 10.0, 1));
    assert!(page.validate().is_err());

    let page = Page::new("pg", 1).with_element(Element::panel("a", f64::NAN, 0.0, 1.0, 1.0, 1));
    assert!(page.validate().is_err());
}

#[test]
fn with_panel_image_only_touches_panels() {
    let p = Element::panel("p", 0.0, 0.0, 1.0, 1.0, 0).with_panel_image("x.png");
    assert_eq!(p.as_panel().unwrap().image_url.as_deref(), Some("x.png"));
    let t = Element::text("t", "hi", 0.0, 0.0, 1.0, 1.0, 0).with_panel_image("x.png");
    assert!(t.as_panel().is_none());
}

#[test]
fn unusable_style_colors_resolve_to_defaults() {
    let e: Element = serde_json::from_value(json!({
        "id": "b", "type": "dialogue", "x": 0, "y": 0, "width": 10, "height": 10,
        "text": "hi",
        "dialogueStyle": { "backgroundColor": "paper-ish", "fontColor": "orange" }
    }))
    .unwrap();
    let ElementKind::Dialogue(d) = &e.kind else {
        panic!("expected dialogue");
    };
    assert_eq!(d.dialogue_style.background_color, Color::WHITE);
    assert_eq!(d.dialogue_style.font_color, Color::rgb(255, 165, 0));

    let e: Element = serde_json::from_value(json!({
        "id": "t", "type": "text", "x": 0, "y": 0, "width": 10, "height": 10,
        "content": "hi",
        "textStyle": { "color": {"x": 1} }
    }))
    .unwrap();
    let ElementKind::Text(t) = &e.kind else {
        panic!("expected text");
    };
    assert_eq!(t.text_style.color, Color::BLACK);

    let e: Element = serde_json::from_value(json!({
        "id": "p", "type": "panel", "x": 0, "y": 0, "width": 10, "height": 10,
        "panelStyle": { "fillColor": "hsl(120, 100%, 50%)", "borderColor": "??" }
    }))
    .unwrap();
    let p = e.as_panel().unwrap();
    assert_eq!(p.panel_style.fill_color, Some(Color::rgb(0, 255, 0)));
    assert_eq!(p.panel_style.border_color, Color::BLACK);
}
