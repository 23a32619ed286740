use super::*;
use serde_json::json;

fn write_project(dir: &std::path::Path, id: &str, value: serde_json::Value) {
    std::fs::write(dir.join(format!("{id}.json")), value.to_string()).unwrap();
}

#[test]
fn json_source_sorts_by_page_number() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        "proj",
        json!({
            "projectId": "proj",
            "title": "Demo",
            "pages": [
                { "id": "b", "pageNumber": 2, "elements": [] },
                { "id": "a", "pageNumber": 1, "elements": [
                    { "id": "p", "type": "panel", "x": 0, "y": 0, "width": 10, "height": 10 }
                ] }
            ]
        }),
    );
    let src = JsonPageSource::new(dir.path());
    let pages = src.fetch_all_pages("proj").unwrap();
    let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(src.read_project("proj").unwrap().title, "Demo");
}

#[test]
fn json_source_failures_are_fetch_errors() {
    let dir = tempfile::tempdir().unwrap();
    let src = JsonPageSource::new(dir.path());
    assert!(matches!(
        src.fetch_all_pages("missing"),
        Err(KomaError::Fetch { .. })
    ));
    assert!(matches!(
        src.fetch_all_pages("../escape"),
        Err(KomaError::Fetch { .. })
    ));

    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    assert!(matches!(
        src.fetch_all_pages("broken"),
        Err(KomaError::Fetch { .. })
    ));

    write_project(dir.path(), "other", json!({ "projectId": "different", "pages": [] }));
    assert!(src.fetch_all_pages("other").is_err());
}

#[test]
fn malformed_elements_are_left_for_the_renderer() {
    let dir = tempfile::tempdir().unwrap();
    write_project(
        dir.path(),
        "dup",
        json!({
            "projectId": "dup",
            "pages": [{ "id": "a", "pageNumber": 1, "elements": [
                { "id": "x", "type": "panel", "x": 0, "y": 0, "width": 1, "height": 1 },
                { "id": "x", "type": "panel", "x": 0, "y": 0, "width": 1, "height": 1 },
                { "id": "t", "type": "text", "x": 50, "y": 50, "width": -10, "height": 20,
                  "content": "dragged up-left" }
            ] }]
        }),
    );
    let pages = JsonPageSource::new(dir.path())
        .fetch_all_pages("dup")
        .unwrap();
    assert_eq!(pages[0].elements.len(), 3);
    assert!(pages[0].validate().is_err());
}

#[test]
fn in_memory_source() {
    let src = InMemoryPageSource::new()
        .with_project("p", vec![Page::new("two", 2), Page::new("one", 1)]);
    let pages = src.fetch_all_pages("p").unwrap();
    assert_eq!(pages[0].id, "one");
    assert!(matches!(
        src.fetch_all_pages("nope"),
        Err(KomaError::Fetch { .. })
    ));
}
