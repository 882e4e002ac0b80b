//! Buffer ring and filesystem behavior, driven in batch mode.

use rusteco::interpreter::engine::Interpreter;
use rusteco::interpreter::errors::ErrorKind;

fn interp() -> Interpreter {
    Interpreter::new()
}

#[test]
fn test_load_leaves_buffer_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"file bytes").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EB{}\x1b", path.display()).as_bytes())
        .unwrap();
    assert_eq!(interp.view.text(), b"file bytes");
    let buffer = interp.ring.current().unwrap();
    assert!(!buffer.dirty);
    assert_eq!(buffer.filename.as_deref(), Some(path.canonicalize().unwrap().as_path()));
}

#[test]
fn test_save_writes_and_canonicalizes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let mut interp = interp();
    interp
        .execute(format!("Ihello\x1bEW{}\x1b", path.display()).as_bytes())
        .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"hello");

    let buffer = interp.ring.current().unwrap();
    assert!(!buffer.dirty);
    assert_eq!(
        buffer.filename.as_deref(),
        Some(path.canonicalize().unwrap().as_path())
    );
}

#[test]
fn test_save_unnamed_without_filename_fails() {
    let mut interp = interp();
    let err = interp.execute(b"Ix\x1bEW\x1b").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Failed { .. }));
}

#[test]
fn test_reopening_same_file_reuses_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one.txt");
    let two = dir.path().join("two.txt");
    std::fs::write(&one, b"1").unwrap();
    std::fs::write(&two, b"2").unwrap();

    let mut interp = interp();
    let script = format!(
        "EB{}\x1bEB{}\x1bEB{}\x1b",
        one.display(),
        two.display(),
        one.display()
    );
    interp.execute(script.as_bytes()).unwrap();
    // initial unnamed buffer plus the two files
    assert_eq!(interp.ring.len(), 3);
    assert_eq!(interp.view.text(), b"1");
}

#[test]
fn test_buffer_selection_by_ordinal() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one.txt");
    std::fs::write(&one, b"1").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EB{}\x1b", one.display()).as_bytes())
        .unwrap();
    // ordinal 1 is the initial unnamed buffer
    interp.execute(b"1EB\x1b").unwrap();
    assert!(interp.ring.current().unwrap().filename.is_none());
    interp.execute(b"2EB\x1b").unwrap();
    assert_eq!(interp.view.text(), b"1");

    let err = interp.execute(b"9EB\x1b").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidBufferId { id: 9 });
}

#[test]
fn test_selection_by_id_refuses_filename() {
    let mut interp = interp();
    assert!(interp.execute(b"1EBname\x1b").is_err());
}

#[test]
fn test_buffer_count_property() {
    let dir = tempfile::tempdir().unwrap();
    let one = dir.path().join("one.txt");
    std::fs::write(&one, b"1").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EB{}\x1bEJ", one.display()).as_bytes())
        .unwrap();
    assert_eq!(interp.stack_numbers(), vec![2]);
}

#[test]
fn test_close_dirty_needs_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"data").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EB{}\x1bIx\x1b", path.display()).as_bytes())
        .unwrap();
    let err = interp.execute(b"EF").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::BufferDirty { .. }));

    interp.execute(b"-EF").unwrap();
    assert_eq!(interp.ring.len(), 1);
}

#[test]
fn test_closing_last_buffer_leaves_unnamed() {
    let mut interp = interp();
    interp.execute(b"Ix\x1b-EF").unwrap();
    assert_eq!(interp.ring.len(), 1);
    assert_eq!(interp.view.text(), b"");
    assert!(interp.ring.current().unwrap().filename.is_none());
}

#[test]
fn test_register_load_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.txt");
    let dst = dir.path().join("dst.txt");
    std::fs::write(&src, b"register payload").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EQA{}\x1bGA", src.display()).as_bytes())
        .unwrap();
    assert_eq!(interp.view.text(), b"register payload");

    interp
        .execute(format!("^UBdata\x1bE%B{}\x1b", dst.display()).as_bytes())
        .unwrap();
    assert_eq!(std::fs::read(&dst).unwrap(), b"data");
}

#[test]
fn test_edit_register_and_back() {
    let mut interp = interp();
    interp
        .execute(b"Ibuffer\x1b^UAregister\x1bEQA\x1bIX\x1bGA")
        .unwrap();
    // editing register A: X lands at its dot, then GA re-inserts the
    // register's own updated contents there
    assert_eq!(interp.view.text(), b"XXregisterregister");
}

#[test]
fn test_exit_with_dirty_buffers_fails() {
    let mut interp = interp();
    interp.execute(b"Ix\x1b").unwrap();
    let err = interp.execute(b"EX").unwrap_err();
    assert_eq!(err.kind, ErrorKind::ModifiedBuffers);

    interp.execute(b"-EX").unwrap();
    assert!(interp.quit_requested());
}

#[test]
fn test_save_all_on_colon_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"old").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EB{}\x1bInew \x1b:EX", path.display()).as_bytes())
        .unwrap();
    assert!(interp.quit_requested());
    assert_eq!(std::fs::read(&path).unwrap(), b"new old");
}

#[test]
fn test_macro_file_with_hash_bang() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.teco");
    std::fs::write(&script, b"#!rusteco\n7UA QA").unwrap();

    let mut interp = interp();
    interp.execute_file(&script, true).unwrap();
    assert_eq!(interp.stack_numbers(), vec![7]);
}

#[test]
fn test_macro_file_error_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.teco");
    std::fs::write(&script, b"#!rusteco\n1 ~").unwrap();

    let mut interp = interp();
    let err = interp.execute_file(&script, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax { chr: b'~' });
    assert_eq!(err.frames.len(), 1);
    // the hash-bang line counts towards the reported line
    assert_eq!(err.frames[0].line, 2);
}

#[test]
fn test_macro_file_via_em() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script.teco");
    std::fs::write(&script, b"3UA").unwrap();

    let mut interp = interp();
    interp
        .execute(format!("EM{}\x1bQA", script.display()).as_bytes())
        .unwrap();
    assert_eq!(interp.stack_numbers(), vec![3]);
}

#[test]
fn test_change_dir() {
    let original = std::env::current_dir().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut interp = interp();
    interp
        .execute(format!("FG{}\x1b", dir.path().display()).as_bytes())
        .unwrap();
    assert_eq!(
        std::env::current_dir().unwrap(),
        dir.path().canonicalize().unwrap()
    );

    std::env::set_current_dir(original).unwrap();
}
