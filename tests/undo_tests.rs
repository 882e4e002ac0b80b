//! Rubout semantics: executing characters and undoing them restores the
//! editor state exactly, including files saved to disk.

use rusteco::interpreter::cmdline::CmdlineEvent;
use rusteco::interpreter::engine::Interpreter;

fn interactive() -> Interpreter {
    let mut interp = Interpreter::new();
    interp.set_interactive(true);
    interp
}

fn type_all(interp: &mut Interpreter, bytes: &[u8]) {
    for &b in bytes {
        let event = interp.cmdline_keypress(b);
        assert_ne!(
            event,
            CmdlineEvent::Rejected,
            "character {:?} was rejected: {:?}",
            b as char,
            interp.messages.last
        );
    }
}

#[test]
fn test_move_then_undo() {
    let mut interp = interactive();
    type_all(&mut interp, b"Ihello\x1b0J");
    assert_eq!(interp.view.pos(), 0);

    type_all(&mut interp, b"3C");
    assert_eq!(interp.view.pos(), 3);

    // rub out the C: dot returns, the argument comes back
    interp.cmdline_rubout();
    assert_eq!(interp.view.pos(), 0);
    assert_eq!(interp.stack_numbers(), vec![3]);
}

#[test]
fn test_insert_rubs_out_per_character() {
    let mut interp = interactive();
    type_all(&mut interp, b"Iabc");
    assert_eq!(interp.view.text(), b"abc");

    interp.cmdline_rubout();
    assert_eq!(interp.view.text(), b"ab");
    interp.cmdline_rubout();
    assert_eq!(interp.view.text(), b"a");
}

#[test]
fn test_full_rubout_restores_everything() {
    let mut interp = interactive();
    type_all(&mut interp, b"Iabc\x1b5UA^UBxy\x1b0J1D");
    assert_eq!(interp.view.text(), b"bc");

    interp.cmdline_rubout_all();
    assert_eq!(interp.view.text(), b"");
    assert_eq!(interp.view.pos(), 0);
    assert_eq!(interp.stack_numbers(), Vec::<i64>::new());
    assert!(interp.cmdline_bytes().is_empty());

    // the registers hold their initial values again
    type_all(&mut interp, b"QA");
    assert_eq!(interp.stack_numbers(), vec![0]);
    type_all(&mut interp, b"GB");
    assert_eq!(interp.view.text(), b"");
}

#[test]
fn test_rejected_character_has_no_effect() {
    let mut interp = interactive();
    type_all(&mut interp, b"Ix\x1b0J");
    let before_text = interp.view.text();
    let before_pos = interp.view.pos();

    // deleting five characters from a one-character buffer fails
    let event = interp.cmdline_keypress(b'5');
    assert_eq!(event, CmdlineEvent::Ok);
    let event = interp.cmdline_keypress(b'D');
    assert_eq!(event, CmdlineEvent::Rejected);

    assert_eq!(interp.view.text(), before_text);
    assert_eq!(interp.view.pos(), before_pos);
    // the 5 is still pending
    assert_eq!(interp.stack_numbers(), vec![5]);
}

#[test]
fn test_register_undo() {
    let mut interp = interactive();
    type_all(&mut interp, b"42UA");
    type_all(&mut interp, b"7UA");
    interp.cmdline_rubout(); // the second A
    interp.cmdline_rubout(); // the U
    interp.cmdline_rubout(); // the 7
    type_all(&mut interp, b"QA");
    assert_eq!(interp.stack_numbers(), vec![42]);
}

#[test]
fn test_loop_rubs_out_as_a_group() {
    let mut interp = interactive();
    type_all(&mut interp, b"0UA5<%A$>");
    type_all(&mut interp, b"QA");
    assert_eq!(interp.stack_numbers(), vec![5]);

    // the > character ran iterations two to five; rubbing it out undoes
    // them as a group, and rubbing out the first %A undoes the rest
    for _ in 0..5 {
        interp.cmdline_rubout();
    }
    type_all(&mut interp, b"QA");
    assert_eq!(interp.stack_numbers(), vec![0]);
}

#[test]
fn test_terminate_commits_and_resets() {
    let mut interp = interactive();
    type_all(&mut interp, b"Ihi\x1b3");
    type_all(&mut interp, b"\x1b\x1b"); // $$ terminates
    assert!(interp.cmdline_bytes().is_empty());
    assert!(interp.undo.is_empty());
    // the stack is clean, the buffer survives
    assert_eq!(interp.stack_numbers(), Vec::<i64>::new());
    assert_eq!(interp.view.text(), b"hi");
}

#[test]
fn test_state_machine_rubout() {
    let mut interp = interactive();
    // E alone leaves the machine mid-command; rubbing it out recovers
    type_all(&mut interp, b"1E");
    interp.cmdline_rubout();
    type_all(&mut interp, b"2");
    // 1 then 2 merge back into one digit run
    assert_eq!(interp.stack_numbers(), vec![12]);
}

#[test]
fn test_save_rollback_restores_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"old contents").unwrap();

    let mut interp = interactive();
    type_all(&mut interp, format!("EB{}\x1b", path.display()).as_bytes());
    assert_eq!(interp.view.text(), b"old contents");

    type_all(&mut interp, b"Inew \x1b");
    assert!(interp.ring.current().unwrap().dirty);

    type_all(&mut interp, b"EW\x1b");
    assert_eq!(std::fs::read(&path).unwrap(), b"new old contents");
    assert!(!interp.ring.current().unwrap().dirty);
    // the old contents moved to a savepoint next to the file
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 2);

    // rub out the whole save command
    interp.cmdline_rubout();
    interp.cmdline_rubout();
    interp.cmdline_rubout();
    assert_eq!(std::fs::read(&path).unwrap(), b"old contents");
    assert!(interp.ring.current().unwrap().dirty);
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_save_of_new_file_rolls_back_to_absence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.txt");

    let mut interp = interactive();
    type_all(&mut interp, b"Idata\x1b");
    type_all(&mut interp, format!("EW{}\x1b", path.display()).as_bytes());
    assert_eq!(std::fs::read(&path).unwrap(), b"data");

    interp.cmdline_rubout();
    assert!(!path.exists());
}

#[test]
fn test_close_rubout_reopens_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"data").unwrap();

    let mut interp = interactive();
    type_all(&mut interp, format!("EB{}\x1b", path.display()).as_bytes());
    assert_eq!(interp.ring.len(), 2);

    type_all(&mut interp, b"-EF");
    assert_eq!(interp.ring.len(), 1);

    interp.cmdline_rubout();
    assert_eq!(interp.ring.len(), 2);
    assert_eq!(interp.view.text(), b"data");
}

#[test]
fn test_open_rubout_closes_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.txt");
    std::fs::write(&path, b"data").unwrap();

    let mut interp = interactive();
    let cmd = format!("EB{}\x1b", path.display());
    type_all(&mut interp, cmd.as_bytes());
    assert_eq!(interp.ring.len(), 2);

    interp.cmdline_rubout_all();
    assert_eq!(interp.ring.len(), 1);
    assert_eq!(interp.view.text(), b"");
}

#[test]
fn test_message_rollback() {
    let mut interp = interactive();
    type_all(&mut interp, b"1=");
    let first = interp.messages.last.clone();
    type_all(&mut interp, b"2=");
    assert_ne!(interp.messages.last, first);
    interp.cmdline_rubout();
    assert_eq!(interp.messages.last, first);
}

#[test]
fn test_register_stack_rubout() {
    let mut interp = interactive();
    type_all(&mut interp, b"^UAone\x1b42UA[A");
    type_all(&mut interp, b"0UA^UA\x1b"); // clobber A
    type_all(&mut interp, b"]A");
    type_all(&mut interp, b"QA");
    assert_eq!(interp.stack_numbers(), vec![42]);

    // rub the pop back out, then redo it: still consistent
    interp.cmdline_rubout(); // A of QA
    interp.cmdline_rubout(); // Q
    interp.cmdline_rubout(); // A of ]A
    interp.cmdline_rubout(); // ]
    type_all(&mut interp, b"]AQA");
    assert_eq!(interp.stack_numbers(), vec![42]);
}
