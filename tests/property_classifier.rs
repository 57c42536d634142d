// tests/property_classifier.rs

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use treemirror::MirrorError;
use treemirror::patterns::{Classifier, Decision, PatternSet};

fn classifier(include: &[&str], exclude: &[&str]) -> Classifier {
    let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
    let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
    Classifier::new(
        PatternSet::new(&include, &exclude).expect("valid patterns"),
        "/out",
    )
}

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("temp".to_string()),
        Just("dir".to_string()),
        Just("a.jpg".to_string()),
        Just("b.png".to_string()),
        Just("notes.txt".to_string()),
        "[a-z]{1,6}",
    ]
}

fn rel_path() -> impl Strategy<Value = String> {
    proptest::collection::vec(segment(), 1..5).prop_map(|segs| segs.join("/"))
}

proptest! {
    // Files are enqueued exactly when some include and no exclude matches.
    #[test]
    fn file_decision_matches_pattern_sets(rel in rel_path()) {
        let c = classifier(&["**/*.jpg", "**/*.png"], &["temp/**", "**/*.tmp"]);
        let path = Path::new("/in").join(&rel);
        let decision = c.classify(&path, &rel, false);

        let excluded = c.patterns().is_excluded(&rel);
        let included = c.patterns().is_included(&rel);

        if !excluded && included {
            prop_assert_eq!(
                decision,
                Decision::Enqueue(treemirror::Task::new(path, PathBuf::from("/out").join(&rel)))
            );
        } else {
            prop_assert_eq!(decision, Decision::Skip);
        }
    }

    // Directories are never enqueued: they are pruned or descended.
    #[test]
    fn directories_never_become_tasks(rel in rel_path()) {
        let c = classifier(&["**"], &["temp/**"]);
        let decision = c.classify(&Path::new("/in").join(&rel), &rel, true);

        if c.patterns().is_dir_excluded(&rel) {
            prop_assert_eq!(decision, Decision::SkipSubtree);
        } else {
            prop_assert_eq!(decision, Decision::Descend);
        }
    }

    // Wildcards never cross a separator.
    #[test]
    fn single_star_stays_in_one_segment(dirs in proptest::collection::vec("[a-z]{1,4}", 1..4)) {
        let c = classifier(&["*.jpg"], &[]);
        let rel = format!("{}/x.jpg", dirs.join("/"));
        prop_assert_eq!(c.classify(Path::new("/in/x"), &rel, false), Decision::Skip);
        prop_assert!(matches!(
            c.classify(Path::new("/in/x.jpg"), "x.jpg", false),
            Decision::Enqueue(_)
        ));
    }
}

#[test]
fn exclude_takes_precedence_over_include() {
    let c = classifier(&["**/*.jpg"], &["temp/**"]);
    assert_eq!(
        c.classify(Path::new("/in/temp/b.jpg"), "temp/b.jpg", false),
        Decision::Skip
    );
    assert_eq!(
        c.classify(Path::new("/in/temp/deep"), "temp/deep", true),
        Decision::SkipSubtree
    );
}

#[test]
fn recursive_exclude_prunes_the_directory_itself() {
    let c = classifier(&["**/*.jpg"], &["temp/**"]);
    assert_eq!(
        c.classify(Path::new("/in/temp"), "temp", true),
        Decision::SkipSubtree
    );
    assert_eq!(
        c.classify(Path::new("/in/temporary"), "temporary", true),
        Decision::Descend
    );
    assert_eq!(
        c.classify(Path::new("/in/dir/temp"), "dir/temp", true),
        Decision::Descend
    );
    // A file named like the directory is not affected by the trailing-slash test.
    assert_eq!(
        c.classify(Path::new("/in/temp"), "temp", false),
        Decision::Skip
    );
}

#[test]
fn root_always_descends() {
    let c = classifier(&["*.jpg"], &["**"]);
    assert_eq!(c.classify(Path::new("/in"), "", true), Decision::Descend);
}

#[test]
fn brace_alternation_is_supported() {
    let c = classifier(&["**/*.{jpg,png}"], &[]);
    assert!(matches!(
        c.classify(Path::new("/in/d/c.png"), "d/c.png", false),
        Decision::Enqueue(_)
    ));
}

#[test]
fn malformed_pattern_names_the_pattern() {
    let err = PatternSet::new(&["ok/*.jpg".to_string(), "bad/[".to_string()], &[])
        .expect_err("unclosed class");
    match err {
        MirrorError::Pattern { pattern, .. } => assert_eq!(pattern, "bad/["),
        other => panic!("expected Pattern error, got {other:?}"),
    }
}
