use super::*;
use crate::assembly::association::AssociationType;
use crate::assembly::drag_drop::DragPayload;

fn session() -> EditorSession {
    let page = Page::new("page-1", 1)
        .with_element(Element::panel("p1", 100.0, 100.0, 300.0, 300.0, 10))
        .with_element(Element::panel("p2", 600.0, 100.0, 300.0, 300.0, 10));
    EditorSession::new(page)
}

#[test]
fn drop_on_panel_inserts_and_associates() {
    let mut s = session();
    assert_eq!(s.drag().drop_zones().len(), 2);
    s.drag_mut()
        .start_drag(DragPayload::new("src", "hero.png", 200.0, 200.0));
    let id = s.drop_at(150.0, 150.0).unwrap();

    assert!(!s.drag().is_dragging());
    let e = s.page().element(&id).unwrap();
    assert_eq!(e.z_index(), 5);
    let assoc = s.associations().get("p1").unwrap();
    assert_eq!(assoc.image_ids, vec![id.clone()]);
    assert_eq!(assoc.association_type, AssociationType::Automatic);
    assert!(s.associations().get("p2").is_none());
}

#[test]
fn second_drop_merges_into_existing_association() {
    let mut s = session();
    for _ in 0..2 {
        s.drag_mut()
            .start_drag(DragPayload::new("src", "hero.png", 100.0, 100.0));
        s.drop_at(200.0, 200.0).unwrap();
    }
    assert_eq!(s.associations().images_for("p1").len(), 2);
}

#[test]
fn canvas_drop_sits_above_panels_and_is_not_associated() {
    let mut s = session();
    s.drag_mut()
        .start_drag(DragPayload::new("src", "hero.png", 50.0, 50.0));
    let id = s.drop_at(150.0, 1000.0).unwrap();
    assert_eq!(s.page().element(&id).unwrap().z_index(), 20);
    assert!(s.associations().is_empty());
}

#[test]
fn drop_without_drag_does_nothing() {
    let mut s = session();
    assert!(s.drop_at(150.0, 150.0).is_none());
    assert_eq!(s.page().elements.len(), 2);
}

#[test]
fn removing_image_cleans_associations() {
    let mut s = session();
    s.drag_mut()
        .start_drag(DragPayload::new("src", "hero.png", 100.0, 100.0));
    let id = s.drop_at(200.0, 200.0).unwrap();
    assert!(s.remove_element(&id).is_some());
    assert!(s.associations().get("p1").is_none());
    assert!(s.remove_element(&id).is_none());
}

#[test]
fn removing_panel_drops_zone_and_association() {
    let mut s = session();
    s.drag_mut()
        .start_drag(DragPayload::new("src", "hero.png", 100.0, 100.0));
    s.drop_at(200.0, 200.0).unwrap();
    s.remove_element("p1").unwrap();
    assert!(s.associations().is_empty());
    assert_eq!(s.drag().drop_zones().len(), 1);
}

#[test]
fn add_element_rejects_duplicates_and_refreshes_zones() {
    let mut s = session();
    assert!(s
        .add_element(Element::panel("p1", 0.0, 0.0, 10.0, 10.0, 1))
        .is_err());
    s.add_element(Element::panel("p3", 0.0, 600.0, 10.0, 10.0, 1))
        .unwrap();
    assert_eq!(s.drag().drop_zones().len(), 3);
}

#[test]
fn masked_container_follows_mask_flag() {
    let mut s = session();
    s.drag_mut()
        .start_drag(DragPayload::new("src", "hero.png", 100.0, 100.0));
    let id = s.drop_at(200.0, 200.0).unwrap();

    let c = s
        .masked_container_for("p1", &MaskOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(c.children.len(), 1);
    assert_eq!(c.children[0].image_id, id);
    assert_eq!((c.children[0].x, c.children[0].y), (10.0, 10.0));
    assert_eq!(c.parent.as_deref(), Some("page-1"));

    s.associations_mut().toggle_masking("p1", false);
    assert!(s
        .masked_container_for("p1", &MaskOptions::default())
        .unwrap()
        .is_none());
    assert!(s
        .masked_container_for("p2", &MaskOptions::default())
        .unwrap()
        .is_none());
}
