//! Tests for document construction and navigation

use super::*;

fn sample() -> Document {
    let root = NodeSpec::element("hvml")
        .child(NodeSpec::content("hello"))
        .child(NodeSpec::element("body").child(NodeSpec::element("p")))
        .child(NodeSpec::comment("note"))
        .child(NodeSpec::element("footer"));
    Document::from_tree(root).expect("build document")
}

#[test]
fn test_root_element_is_wrapped_in_document_node() {
    let doc = sample();

    assert_eq!(doc.kind(doc.root()), Some(&NodeKind::Document));
    let root = doc.root_element().unwrap();
    assert_eq!(doc.element(root).unwrap().tag, "hvml");
    assert_eq!(doc.parent(root), Some(doc.root()));
}

#[test]
fn test_children_keep_document_order() {
    let doc = sample();
    let root = doc.root_element().unwrap();

    let kinds: Vec<String> = doc
        .children(root)
        .map(|id| match doc.kind(id).unwrap() {
            NodeKind::Element(e) => format!("<{}>", e.tag),
            NodeKind::Content(t) => format!("text:{}", t),
            NodeKind::Comment(t) => format!("comment:{}", t),
            NodeKind::Document => "document".to_string(),
        })
        .collect();

    assert_eq!(
        kinds,
        vec!["text:hello", "<body>", "comment:note", "<footer>"]
    );
}

#[test]
fn test_first_child_and_next_sibling_navigation() {
    let doc = sample();
    let root = doc.root_element().unwrap();

    let first = doc.first_child(root).unwrap();
    let body = doc.next_sibling(first).unwrap();
    assert_eq!(doc.element(body).unwrap().tag, "body");

    let p = doc.first_child(body).unwrap();
    assert_eq!(doc.element(p).unwrap().tag, "p");
    assert_eq!(doc.next_sibling(p), None);
    assert_eq!(doc.first_child(p), None);
}

#[test]
fn test_document_without_element_is_rejected() {
    let spec = NodeSpec::Document {
        children: vec![NodeSpec::comment("only a comment")],
    };

    let err = Document::from_tree(spec).unwrap_err();
    assert!(matches!(err, DocumentError::NoRootElement));
}

#[test]
fn test_from_json() {
    let source = r#"{
        "t": "element",
        "tag": "hvml",
        "pos": {"line": 1, "column": 1, "offset": 0},
        "children": [{
            "t": "element",
            "tag": "catch",
            "attrs": [{
                "name": "for",
                "value": {"t": "Lit", "v": {"t": "Str", "v": "NoData Timeout"}}
            }, {
                "name": "silently",
                "op": "~="
            }]
        }, {
            "t": "content",
            "text": "done"
        }]
    }"#;

    let doc = Document::from_json(source).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(
        doc.element(root).unwrap().pos,
        Some(SourcePos {
            line: 1,
            column: 1,
            offset: 0
        })
    );

    let catch = doc.first_child(root).unwrap();
    let element = doc.element(catch).unwrap();
    assert_eq!(element.tag, "catch");
    assert_eq!(element.attrs.len(), 2);
    assert_eq!(element.attrs[0].op, AttrOp::Assign);
    assert_eq!(
        element.attrs[0].value,
        Some(Expr::lit("NoData Timeout"))
    );
    assert_eq!(element.attrs[1].op, AttrOp::Regex);
    assert_eq!(element.attrs[1].value, None);
}

#[test]
fn test_invalid_json_is_reported() {
    let err = Document::from_json(r#"{"t": "element"}"#).unwrap_err();
    assert!(matches!(err, DocumentError::Json(_)));
}

#[test]
fn test_documents_get_distinct_ids() {
    assert_ne!(sample().id(), sample().id());
}

#[test]
fn test_elements_iterates_in_document_order() {
    let doc = sample();
    let tags: Vec<&str> = doc.elements().map(|(_, e)| e.tag.as_str()).collect();
    assert_eq!(tags, vec!["hvml", "body", "p", "footer"]);
}
