//! Severity of content edits.
//!
//! Classification looks only at the JSON Pointer paths of a patch, so its cost
//! is linear in the size of the diff, not the size of the document.

use json_patch::{Patch, PatchOperation};
use serde::{Deserialize, Serialize};

/// Severity of a change to an advisory's content, in increasing order.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Patch,
    Minor,
    Major,
}

/// Lists whose new elements count as minor additions, under `/document`.
const DOCUMENT_LISTS: &[&str] = &["acknowledgments", "notes", "references"];

/// Lists whose new elements count as minor additions, under each vulnerability.
const VULNERABILITY_LISTS: &[&str] = &[
    "acknowledgments", "flags", "ids", "involvements", "notes", "references",
    "remediations", "scores", "threats",
];

/// Parts of the product tree which define product identities.
const PRODUCT_DEFINITIONS: &[&str] = &["branches", "full_product_names", "relationships"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// Classify a patch computed between two versions of an advisory's content.
///
/// An empty patch is a patch-level change.
pub fn classify(patch: &Patch) -> ChangeType {
    patch.0.iter()
        .map(classify_operation)
        .max()
        .unwrap_or(ChangeType::Patch)
}

fn classify_operation(op: &PatchOperation) -> ChangeType {
    match op {
        PatchOperation::Add(op) => classify_path(Kind::Add, &op.path),
        PatchOperation::Remove(op) => classify_path(Kind::Remove, &op.path),
        PatchOperation::Replace(op) => classify_path(Kind::Replace, &op.path),
        PatchOperation::Move(op) => classify_path(Kind::Remove, &op.from)
            .max(classify_path(Kind::Move, &op.path)),
        PatchOperation::Copy(op) => classify_path(Kind::Copy, &op.path),
        PatchOperation::Test(op) => classify_path(Kind::Test, &op.path),
    }
}

fn classify_path(kind: Kind, path: &str) -> ChangeType {
    if kind == Kind::Test {
        return ChangeType::Patch;
    }

    let segments = split_pointer(path);
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
    let adds = kind != Kind::Remove && kind != Kind::Replace;

    match segments.as_slice() {
        // Whole document replaced.
        [] => ChangeType::Major,

        ["product_tree"] => ChangeType::Major,
        ["product_tree", section, ..] if PRODUCT_DEFINITIONS.contains(section) =>
            ChangeType::Major,
        ["product_tree", "product_groups", ..] if adds => ChangeType::Minor,

        ["vulnerabilities"] | ["vulnerabilities", _] => ChangeType::Major,
        ["vulnerabilities", _, "product_status", ..] => ChangeType::Major,
        ["vulnerabilities", _, list] | ["vulnerabilities", _, list, _]
            if adds && VULNERABILITY_LISTS.contains(list) => ChangeType::Minor,

        ["document", list] | ["document", list, _]
            if adds && DOCUMENT_LISTS.contains(list) => ChangeType::Minor,

        _ => ChangeType::Patch,
    }
}

/// Split a JSON Pointer (RFC 6901) into unescaped reference tokens.
fn split_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }

    pointer.trim_start_matches('/')
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    fn change(old: serde_json::Value, new: serde_json::Value) -> ChangeType {
        classify(&json_patch::diff(&old, &new))
    }

    fn base() -> serde_json::Value {
        json!({
            "document": {
                "title": "Title1",
                "notes": [{"category": "summary", "text": "a"}],
                "tracking": {"version": "0.0.1"},
            },
            "product_tree": {
                "full_product_names": [{"name": "Product A", "product_id": "CSAFPID-1"}],
            },
            "vulnerabilities": [{
                "title": "V1",
                "product_status": {"known_affected": ["CSAFPID-1"]},
            }],
        })
    }

    #[test]
    fn title_change_is_patch() {
        let mut new = base();
        new["document"]["title"] = json!("Title2");
        assert_eq!(change(base(), new), ChangeType::Patch);
    }

    #[test]
    fn tracking_change_is_patch() {
        let mut new = base();
        new["document"]["tracking"]["version"] = json!("0.0.2");
        assert_eq!(change(base(), new), ChangeType::Patch);
    }

    #[test]
    fn product_status_change_is_major() {
        let mut new = base();
        new["vulnerabilities"][0]["product_status"]["fixed"] = json!(["CSAFPID-1"]);
        assert_eq!(change(base(), new), ChangeType::Major);
    }

    #[test]
    fn adding_or_removing_vulnerabilities_is_major() {
        let mut added = base();
        added["vulnerabilities"].as_array_mut().unwrap().push(json!({"title": "V2"}));
        assert_eq!(change(base(), added), ChangeType::Major);

        let mut removed = base();
        removed.as_object_mut().unwrap().remove("vulnerabilities");
        assert_eq!(change(base(), removed), ChangeType::Major);
    }

    #[test]
    fn product_tree_change_is_major() {
        let mut new = base();
        new["product_tree"]["full_product_names"][0]["name"] = json!("Product B");
        assert_eq!(change(base(), new), ChangeType::Major);

        let mut removed = base();
        removed.as_object_mut().unwrap().remove("product_tree");
        assert_eq!(change(base(), removed), ChangeType::Major);
    }

    #[test]
    fn new_notes_and_references_are_minor() {
        let mut new = base();
        new["document"]["notes"].as_array_mut().unwrap()
            .push(json!({"category": "details", "text": "b"}));
        assert_eq!(change(base(), new), ChangeType::Minor);

        let mut new = base();
        new["vulnerabilities"][0]["references"] = json!([{"url": "https://example.com"}]);
        assert_eq!(change(base(), new), ChangeType::Minor);
    }

    #[test]
    fn edits_inside_existing_notes_are_patch() {
        let mut new = base();
        new["document"]["notes"][0]["text"] = json!("changed");
        assert_eq!(change(base(), new), ChangeType::Patch);
    }

    #[test]
    fn most_severe_operation_wins() {
        let mut new = base();
        new["document"]["title"] = json!("Title2");
        new["document"]["notes"].as_array_mut().unwrap().push(json!({"text": "b"}));
        new["vulnerabilities"][0]["product_status"] = json!({});
        assert_eq!(change(base(), new), ChangeType::Major);
    }

    #[test]
    fn empty_patch_is_patch() {
        assert_eq!(change(base(), base()), ChangeType::Patch);
    }

    #[test]
    fn pointer_tokens_are_unescaped() {
        assert_eq!(split_pointer("/a~1b/c~0d"), vec!["a/b", "c~d"]);
        assert!(split_pointer("").is_empty());
    }
}
