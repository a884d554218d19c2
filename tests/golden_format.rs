use permMatrix::perm::golden::{to_golden_bytes, Baseline};
use permMatrix::CanonicalError;

fn sample() -> Baseline {
    let mut baseline = Baseline::new();
    baseline.insert(
        "bob/0001".into(),
        CanonicalError::LinkLike {
            op: "rename".into(),
            old_path: "bob/0001".into(),
            new_path: "bob/0001.new".into(),
            message: "operation not permitted".into(),
        },
    );
    baseline.insert("bob/0000".into(), CanonicalError::None);
    baseline.insert(
        "alice/0644".into(),
        CanonicalError::PathLike {
            op: "chmod".into(),
            path: "alice/0644".into(),
            message: "permission denied".into(),
        },
    );
    baseline.insert(
        "bob/0002".into(),
        CanonicalError::Opaque {
            message: "unsupported probe".into(),
        },
    );
    baseline
}

#[test]
fn golden_file_layout() {
    let bytes = to_golden_bytes(&sample()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.ends_with("}\n"));

    insta::assert_snapshot!(text.trim_end(), @r#"
    {
      "alice/0644": {
        "kind": "path-like",
        "operation": "chmod",
        "path": "alice/0644",
        "message": "permission denied"
      },
      "bob/0000": {
        "kind": "none"
      },
      "bob/0001": {
        "kind": "link-like",
        "operation": "rename",
        "old-path": "bob/0001",
        "new-path": "bob/0001.new",
        "message": "operation not permitted"
      },
      "bob/0002": {
        "kind": "opaque",
        "message": "unsupported probe"
      }
    }
    "#);
}

#[test]
fn keys_are_written_in_sorted_order() {
    let text = String::from_utf8(to_golden_bytes(&sample()).unwrap()).unwrap();
    let keys: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("  \"") && l.ends_with('{'))
        .map(|l| l.trim().trim_end_matches(": {").trim_matches('"'))
        .collect();
    assert_eq!(keys, ["alice/0644", "bob/0000", "bob/0001", "bob/0002"]);
}
