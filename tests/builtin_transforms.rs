// tests/builtin_transforms.rs

use std::path::Path;

use treemirror::exec::{CommandTransform, CopyTransform, Transform};
use treemirror::logging::build_filter;
use treemirror::cli::LogLevel;
use treemirror::Flow;

#[test]
fn copy_transform_copies_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("a.txt");
    let output = tmp.path().join("b.txt");
    std::fs::write(&input, b"hello").unwrap();

    let flow = CopyTransform.transform(&input, &output).unwrap();

    assert_eq!(flow, Flow::Continue);
    assert_eq!(std::fs::read(&output).unwrap(), b"hello");
}

#[test]
fn copy_transform_reports_missing_input() {
    let tmp = tempfile::tempdir().unwrap();
    let err = CopyTransform
        .transform(&tmp.path().join("nope"), &tmp.path().join("out"))
        .unwrap_err();
    assert!(err.to_string().contains("copying"));
}

#[cfg(unix)]
#[test]
fn render_quotes_paths() {
    let t = CommandTransform::new("convert {input} {output}.webp");
    let line = t.render(Path::new("/in/it's here.jpg"), Path::new("/out/x.jpg"));
    assert_eq!(line, r"convert '/in/it'\''s here.jpg' '/out/x.jpg'.webp");
}

#[cfg(unix)]
#[test]
fn command_transform_runs_with_placeholders_and_env() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("with space.txt");
    let output = tmp.path().join("copy.txt");
    let env_out = tmp.path().join("env.txt");
    std::fs::write(&input, b"data").unwrap();

    let cmd = format!(
        "cp {{input}} {{output}} && printf %s \"$TREEMIRROR_INPUT\" > '{}'",
        env_out.display()
    );
    let flow = CommandTransform::new(cmd).transform(&input, &output).unwrap();

    assert_eq!(flow, Flow::Continue);
    assert_eq!(std::fs::read(&output).unwrap(), b"data");
    assert_eq!(
        std::fs::read_to_string(&env_out).unwrap(),
        input.to_string_lossy()
    );
}

#[cfg(unix)]
#[test]
fn command_transform_fails_on_nonzero_exit() {
    let err = CommandTransform::new("echo oops >&2; exit 3")
        .transform(Path::new("/in/a"), Path::new("/out/a"))
        .unwrap_err();
    assert!(err.to_string().contains("status 3"), "{err}");
}

#[test]
fn log_flag_overrides_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap();
    assert!(filter.to_string().to_lowercase().contains("debug"));

    let filter = build_filter(None, Some("treemirror=trace")).unwrap();
    assert!(filter.to_string().to_lowercase().contains("treemirror=trace"));

    let filter = build_filter(None, None).unwrap();
    assert!(filter.to_string().to_lowercase().contains("info"));
}
