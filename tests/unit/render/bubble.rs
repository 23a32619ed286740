use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn tail_direction_zero_points_down() {
    let d = tail_direction(0.0);
    assert!(close(d.x, 0.0) && close(d.y, 1.0));
    let d = tail_direction(90.0);
    assert!(close(d.x, -1.0) && close(d.y, 0.0));
}

#[test]
fn speech_tail_extends_below_the_box() {
    let p = speech_path(200.0, 100.0, 0.0, 30.0, 20.0);
    let bb = p.bounding_box();
    assert!(close(bb.y1, 130.0), "bbox {bb:?}");
    assert!(close(bb.y0, 0.0));
    assert!(bb.x0 >= -1e-6 && bb.x1 <= 200.0 + 1e-6);
    assert!(p.contains(Point::new(100.0, 50.0)));
    assert!(p.contains(Point::new(100.0, 115.0)));
}

#[test]
fn speech_without_tail_is_plain_ellipse() {
    let bb = speech_path(80.0, 40.0, 45.0, 0.0, 20.0).bounding_box();
    assert!(close(bb.y1, 40.0) && close(bb.x1, 80.0));
}

#[test]
fn thought_has_two_trailing_circles() {
    let (body, extras) = thought_paths(100.0, 60.0, 0.0, 40.0, 20.0);
    assert!(close(body.bounding_box().y1, 60.0));
    assert_eq!(extras.len(), 2);
    let near = extras[0].bounding_box();
    let far = extras[1].bounding_box();
    assert!(near.center().y > 60.0);
    assert!(far.center().y > near.center().y);
    assert!(far.width() < near.width());
}

#[test]
fn shout_star_has_sixteen_spikes_touching_the_box() {
    let p = shout_path(120.0, 80.0);
    let line_count = p
        .elements()
        .iter()
        .filter(|e| matches!(e, kurbo::PathEl::LineTo(_)))
        .count();
    assert_eq!(line_count, 31);
    let bb = p.bounding_box();
    assert!(close(bb.x0, 0.0) && close(bb.y0, 0.0));
    assert!(close(bb.x1, 120.0) && close(bb.y1, 80.0));
}

#[test]
fn degenerate_boxes_produce_empty_paths() {
    assert!(speech_path(0.0, 10.0, 0.0, 10.0, 10.0).elements().is_empty());
    assert!(shout_path(10.0, -1.0).elements().is_empty());
    let g = bubble_geometry(BubbleType::Thought, 0.0, 0.0, &DialogueStyle::default());
    assert!(g.body.elements().is_empty() && g.extras.is_empty());
}
