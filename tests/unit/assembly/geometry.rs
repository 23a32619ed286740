use super::*;

fn panel(id: &str, x: f64, y: f64, w: f64, h: f64, z: i32) -> Element {
    Element::panel(id, x, y, w, h, z)
}

fn image(id: &str, x: f64, y: f64, w: f64, h: f64, z: i32) -> Element {
    Element::image(id, "img.png", x, y, w, h, z)
}

#[test]
fn disjoint_rects_do_not_intersect() {
    let a = panel("a", 0.0, 0.0, 10.0, 10.0, 1);
    let b = image("b", 20.0, 20.0, 10.0, 10.0, 0);
    assert!(intersect(&a, &b).is_none());
}

#[test]
fn edge_touch_is_not_an_intersection() {
    let a = panel("a", 0.0, 0.0, 10.0, 10.0, 1);
    let b = image("b", 10.0, 0.0, 10.0, 10.0, 0);
    assert!(intersect(&a, &b).is_none());
}

#[test]
fn quarter_overlap_is_significant() {
    let a = panel("a", 0.0, 0.0, 100.0, 100.0, 1);
    let b = image("b", 50.0, 50.0, 100.0, 100.0, 0);
    let hit = intersect(&a, &b).unwrap();
    assert_eq!(hit.bounds, Rect::new(50.0, 50.0, 100.0, 100.0));
    assert_eq!(hit.bounds.width(), 50.0);
    assert_eq!(hit.bounds.height(), 50.0);
    assert!((hit.coverage_percentage - 25.0).abs() < 1e-9);
    assert!(hit.is_significant);
    assert_eq!(hit.panel_id, "a");
    assert_eq!(hit.image_id, "b");
}

#[test]
fn exactly_ten_percent_is_not_significant() {
    // Image 100x100, overlap 10x100 => 10%.
    let a = panel("a", 0.0, 0.0, 10.0, 100.0, 1);
    let b = image("b", 0.0, 0.0, 100.0, 100.0, 0);
    let hit = intersect(&a, &b).unwrap();
    assert!((hit.coverage_percentage - 10.0).abs() < 1e-9);
    assert!(!hit.is_significant);
}

#[test]
fn just_above_ten_percent_is_significant() {
    // Image 100x100, overlap 10.01x100 => 10.01%.
    let a = panel("a", 0.0, 0.0, 10.01, 100.0, 1);
    let b = image("b", 0.0, 0.0, 100.0, 100.0, 0);
    let hit = intersect(&a, &b).unwrap();
    assert!(hit.coverage_percentage > 10.0);
    assert!(hit.is_significant);
}

#[test]
fn zero_area_image_never_intersects() {
    assert!(intersect_rects(Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(5.0, 5.0, 5.0, 8.0)).is_none());
}

#[test]
fn detect_under_only_considers_images_below_the_panel() {
    let elements = vec![
        panel("p", 0.0, 0.0, 100.0, 100.0, 10),
        image("below", 0.0, 0.0, 50.0, 50.0, 5),
        image("above", 0.0, 0.0, 50.0, 50.0, 15),
        image("same", 0.0, 0.0, 50.0, 50.0, 10),
        image("far", 500.0, 500.0, 50.0, 50.0, 1),
        Element::text("t", "hi", 0.0, 0.0, 50.0, 50.0, 1),
    ];
    let hits = detect_under("p", &elements);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].image_id, "below");
}

#[test]
fn detect_under_unknown_panel_is_empty() {
    let elements = vec![image("i", 0.0, 0.0, 10.0, 10.0, 0)];
    assert!(detect_under("missing", &elements).is_empty());
    assert!(detect_under("i", &elements).is_empty());
}

#[test]
fn significant_ids_filter_small_overlaps() {
    let elements = vec![
        panel("p", 0.0, 0.0, 100.0, 100.0, 10),
        image("big", 0.0, 0.0, 100.0, 100.0, 1),
        image("sliver", 95.0, 0.0, 100.0, 100.0, 1),
    ];
    assert_eq!(significant_image_ids("p", &elements), vec!["big".to_owned()]);
}
