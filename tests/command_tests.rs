//! Command-language semantics, driven through batch execution.

use rusteco::interpreter::engine::Interpreter;
use rusteco::interpreter::errors::ErrorKind;
use rusteco::interpreter::messages::Severity;

fn run(src: &[u8]) -> Interpreter {
    let mut interp = Interpreter::new();
    interp.execute(src).expect("execution failed");
    interp
}

#[test]
fn test_arithmetic_and_insert() {
    // two space-separated arguments, added, serialized into the buffer
    let interp = run(b"1 2+\\");
    assert_eq!(interp.view.text(), b"3");
    assert_eq!(interp.stack_numbers(), Vec::<i64>::new());
}

#[test]
fn test_digit_runs() {
    let interp = run(b"12 3");
    assert_eq!(interp.stack_numbers(), vec![12, 3]);

    let interp = run(b"12 3+\\");
    assert_eq!(interp.view.text(), b"15");
}

#[test]
fn test_left_to_right_arithmetic() {
    let interp = run(b"2+3*4");
    assert_eq!(interp.stack_numbers(), vec![20]);
}

#[test]
fn test_unary_minus() {
    let interp = run(b"-5");
    assert_eq!(interp.stack_numbers(), vec![-5]);

    let interp = run(b"10-3");
    assert_eq!(interp.stack_numbers(), vec![7]);
}

#[test]
fn test_braces_absorb_sign() {
    let interp = run(b"-(2+3)");
    assert_eq!(interp.stack_numbers(), vec![-5]);
}

#[test]
fn test_bitwise_and_power() {
    let interp = run(b"12&10");
    assert_eq!(interp.stack_numbers(), vec![8]);
    let interp = run(b"12#10");
    assert_eq!(interp.stack_numbers(), vec![14]);
    let interp = run(b"2^*10");
    assert_eq!(interp.stack_numbers(), vec![1024]);
    let interp = run(b"17^/5");
    assert_eq!(interp.stack_numbers(), vec![2]);
    let interp = run(b"0^_");
    assert_eq!(interp.stack_numbers(), vec![-1]);
}

#[test]
fn test_radix_commands() {
    let interp = run(b"^O 10\\");
    assert_eq!(interp.view.text(), b"10");

    let interp = run(b"16^R 255\\");
    // 255 in decimal digits under radix 16 is 2*16+5*... the digits are
    // appended under the new radix: 2*16 = 37, *16 + 5 = 597
    assert_eq!(interp.view.text(), b"255");

    let interp = run(b"^R");
    assert_eq!(interp.stack_numbers(), vec![10]);
}

#[test]
fn test_ascii_query() {
    let interp = run(b"^^A");
    assert_eq!(interp.stack_numbers(), vec![65]);
}

#[test]
fn test_dot_z_h_queries() {
    let interp = run(b"Ihello\x1b. Z");
    assert_eq!(interp.stack_numbers(), vec![5, 5]);

    let interp = run(b"Ihello\x1bH");
    assert_eq!(interp.stack_numbers(), vec![0, 5]);
}

#[test]
fn test_movement() {
    let mut interp = run(b"Ihello\x1b0J");
    assert_eq!(interp.view.pos(), 0);
    interp.execute(b"3C").unwrap();
    assert_eq!(interp.view.pos(), 3);
    interp.execute(b"2R").unwrap();
    assert_eq!(interp.view.pos(), 1);
}

#[test]
fn test_jump_bounds() {
    let mut interp = run(b"Ihello\x1b");
    interp.execute(b"5J").unwrap();
    assert_eq!(interp.view.pos(), 5);
    assert!(interp.execute(b"6J").is_err());
    interp.execute(b"6:J").unwrap();
    assert_eq!(interp.stack_numbers(), vec![0]);
    interp.execute(b"5:J").unwrap();
    assert_eq!(interp.stack_numbers(), vec![0, -1]);
}

#[test]
fn test_line_movement() {
    let mut interp = run(b"Ione\ntwo\nthree\x1b0J");
    interp.execute(b"1L").unwrap();
    assert_eq!(interp.view.pos(), 4);
    interp.execute(b"1L").unwrap();
    assert_eq!(interp.view.pos(), 8);
    interp.execute(b"2B").unwrap();
    assert_eq!(interp.view.pos(), 0);
}

#[test]
fn test_word_movement() {
    let mut interp = run(b"Ifoo bar baz\x1b0J");
    interp.execute(b"2W").unwrap();
    assert_eq!(interp.view.pos(), 7);
    interp.execute(b"-1W").unwrap();
    assert_eq!(interp.view.pos(), 3);
}

#[test]
fn test_char_query() {
    let interp = run(b"Iabc\x1b0J 0A");
    assert_eq!(interp.stack_numbers(), vec![97]);

    let mut interp = run(b"Iabc\x1b0J");
    assert!(interp.execute(b"3A").is_err());
}

#[test]
fn test_delete_chars_and_range() {
    let interp = run(b"Iabcdef\x1b0J2D");
    assert_eq!(interp.view.text(), b"cdef");

    let interp = run(b"Iabcdef\x1b1,3D");
    assert_eq!(interp.view.text(), b"adef");

    let mut interp = run(b"Iabc\x1b0J");
    interp.execute(b"9:D").unwrap();
    assert_eq!(interp.stack_numbers(), vec![0]);
    assert_eq!(interp.view.text(), b"abc");
}

#[test]
fn test_kill_lines() {
    let interp = run(b"Ione\ntwo\nthree\x1b0J1K");
    assert_eq!(interp.view.text(), b"two\nthree");

    // 0KK deletes the whole current line regardless of position
    let interp = run(b"Ione\ntwo\x1b0J6J0KK");
    assert_eq!(interp.view.text(), b"one\n");
}

#[test]
fn test_delete_words() {
    let interp = run(b"Ifoo bar baz\x1b0J1V");
    assert_eq!(interp.view.text(), b" bar baz");

    // more words than the buffer holds: no observable effect
    let mut interp = run(b"Ifoo bar\x1b0J");
    assert!(interp.execute(b"5V").is_err());
    assert_eq!(interp.view.text(), b"foo bar");
}

#[test]
fn test_insert_integer_and_read() {
    let interp = run(b"42\\");
    assert_eq!(interp.view.text(), b"42");

    let interp = run(b"I42xyz\x1b0J\\");
    assert_eq!(interp.stack_numbers(), vec![42]);
    assert_eq!(interp.view.pos(), 0);
}

#[test]
fn test_insert_codepoint_arguments() {
    let interp = run(b"65,66I!\x1b");
    assert_eq!(interp.view.text(), b"AB!");
}

#[test]
fn test_insert_indent() {
    let interp = run(b"Ia\x1b^Ib\x1b");
    assert_eq!(interp.view.text(), b"a\tb");
}

#[test]
fn test_loops() {
    let interp = run(b"0UA 5<QA1+UA> QA");
    assert_eq!(interp.stack_numbers(), vec![5]);
}

#[test]
fn test_empty_loop_skips_body() {
    let interp = run(b"0UA 0<9UA> QA");
    assert_eq!(interp.stack_numbers(), vec![0]);
}

#[test]
fn test_loop_aggregation() {
    // a colon-modified loop end keeps one value per iteration
    let interp = run(b"0UA 3<%A:>");
    assert_eq!(interp.stack_numbers(), vec![1, 2, 3]);
}

#[test]
fn test_conditional_break() {
    let interp = run(b"0UA -1< %A QA-3\"E 0; ' > QA");
    assert_eq!(interp.stack_numbers(), vec![3]);
}

#[test]
fn test_break_outside_loop_fails() {
    let mut interp = Interpreter::new();
    assert!(interp.execute(b"1;").is_err());
}

#[test]
fn test_break_across_macro_frame_fails() {
    let mut interp = Interpreter::new();
    assert!(interp.execute(b"^UA1;\x1b -1<MA>").is_err());
}

#[test]
fn test_loop_restart_and_exit() {
    let interp = run(b"0UB 0UC -1< %B QB-3\"E 0; ' F< 9UC > QB QC");
    assert_eq!(interp.stack_numbers(), vec![3, 0]);

    let interp = run(b"0UA 0UB 3<%A F> 9UB > QA QB");
    assert_eq!(interp.stack_numbers(), vec![3, 0]);
}

#[test]
fn test_return_from_loop() {
    let interp = run(b"-1<5$$>");
    assert_eq!(interp.stack_numbers(), vec![5]);
}

#[test]
fn test_unterminated_loop_diagnosed() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"3<1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedLoop);
}

#[test]
fn test_conditionals() {
    let interp = run(b"0UA 5\"G 1UA | 2UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![1]);

    let interp = run(b"0UA -1\"G 1UA | 2UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![2]);
}

#[test]
fn test_conditional_kinds() {
    let interp = run(b"0UA 65\"A 1UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![1]);

    let interp = run(b"0UA 0\"E 1UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![1]);

    let interp = run(b"0UA -1\"L 1UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![1]);

    let interp = run(b"0UA \"~ 1UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![1]);
}

#[test]
fn test_nested_conditional_skip() {
    // the whole skipped arm contains a nested conditional
    let interp = run(b"0UA 0\"N 1\"E 9UA ' 8UA ' QA");
    assert_eq!(interp.stack_numbers(), vec![0]);
}

#[test]
fn test_invalid_conditional_type() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"1\"Z'").unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCondType { chr: b'Z' });
}

#[test]
fn test_registers_integer() {
    let interp = run(b"42UA QA");
    assert_eq!(interp.stack_numbers(), vec![42]);

    // the increment's result stays on the stack
    let interp = run(b"5UA %A QA");
    assert_eq!(interp.stack_numbers(), vec![6, 6]);
}

#[test]
fn test_register_two_letter_and_local() {
    let interp = run(b"7U#XY Q#xy");
    assert_eq!(interp.stack_numbers(), vec![7]);

    // locals vanish with their macro frame
    let interp = run(b"^UA5U.L Q.L\x1b MA Q.L");
    assert_eq!(interp.stack_numbers(), vec![5, 0]);
}

#[test]
fn test_register_string_roundtrip() {
    let interp = run(b"^UAworld\x1bGA");
    assert_eq!(interp.view.text(), b"world");
}

#[test]
fn test_register_push_pop() {
    let interp = run(b"42UA [A 7UA ]A QA");
    assert_eq!(interp.stack_numbers(), vec![42]);
}

#[test]
fn test_register_pop_empty_fails() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"]A").unwrap_err();
    assert_eq!(err.kind, ErrorKind::RegisterStackEmpty);
}

#[test]
fn test_register_push_pop_string() {
    let interp = run(b"^UAone\x1b [A ^UAtwo\x1b ]A GA");
    assert_eq!(interp.view.text(), b"one");
}

#[test]
fn test_copy_to_register() {
    let interp = run(b"Ihello world\x1b 0,5XA GA");
    assert_eq!(interp.view.text(), b"hello worldhello");

    // colon appends
    let interp = run(b"Iab\x1b 0,1XA 1,2:XA 0J GA");
    assert_eq!(interp.view.text(), b"abab");
}

#[test]
fn test_macro_execution() {
    let interp = run(b"^UA1UB\x1b MA QB");
    assert_eq!(interp.stack_numbers(), vec![1]);
}

#[test]
fn test_macro_return_keeps_arguments() {
    let interp = run(b"^UA5$$\x1b MA");
    assert_eq!(interp.stack_numbers(), vec![5]);
}

#[test]
fn test_editing_local_register_past_its_frame_fails() {
    // the macro leaves its own local register edited; diagnosed on return
    let mut interp = Interpreter::new();
    let err = interp.execute(b"@^UA{EQ.X\x1b} MA").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Failed { .. }));
}

#[test]
fn test_macro_error_carries_frame() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"^UA;\x1b MA").unwrap_err();
    assert!(!err.frames.is_empty());
}

#[test]
fn test_trailing_escape_discards() {
    let interp = run(b"1 2$");
    assert_eq!(interp.stack_numbers(), Vec::<i64>::new());
}

#[test]
fn test_escape_then_command() {
    // $ discards, then the next command runs with a clean list
    let interp = run(b"5$Ix\x1b");
    assert_eq!(interp.view.text(), b"x");
}

#[test]
fn test_string_building_interpolation() {
    let interp = run(b"^UAworld\x1b I^EQA\x1b");
    assert_eq!(interp.view.text(), b"world");

    let interp = run(b"42UA I=^E\\A=\x1b");
    assert_eq!(interp.view.text(), b"=42=");

    let interp = run(b"65UA I^EUA\x1b");
    assert_eq!(interp.view.text(), b"A");
}

#[test]
fn test_string_building_case_folding() {
    let interp = run(b"I^W^Wabc\x1b");
    assert_eq!(interp.view.text(), b"ABC");

    let interp = run(b"I^Wabc\x1b");
    assert_eq!(interp.view.text(), b"Abc");
}

#[test]
fn test_string_building_verbatim() {
    let interp = run(b"I^Q^W\x1b");
    assert_eq!(interp.view.text(), vec![0x17]);
}

#[test]
fn test_insert_nobuilding() {
    // EI takes ^EQA literally
    let interp = run(b"EI^EQA\x1b");
    assert_eq!(interp.view.text(), b"^EQA");
}

#[test]
fn test_at_modified_delimiters() {
    let interp = run(b"@I/abc/");
    assert_eq!(interp.view.text(), b"abc");

    let interp = run(b"@I{ab{c}d}");
    assert_eq!(interp.view.text(), b"ab{c}d");
}

#[test]
fn test_print_message() {
    let interp = run(b"5=");
    assert_eq!(
        interp.messages.last,
        Some((Severity::User, "5".to_string()))
    );
}

#[test]
fn test_print_without_argument_fails() {
    let mut interp = Interpreter::new();
    assert!(interp.execute(b"=").is_err());
}

#[test]
fn test_ed_flags() {
    let interp = run(b"ED");
    assert_eq!(interp.stack_numbers(), vec![16]);

    let interp = run(b"0,32ED ED");
    assert_eq!(interp.stack_numbers(), vec![48]);
}

#[test]
fn test_ej_properties() {
    let interp = run(b"EJ");
    assert_eq!(interp.stack_numbers(), vec![1]);

    let interp = run(b"0EJ");
    assert_eq!(interp.stack_numbers(), vec![1]);
}

#[test]
fn test_eol_mode() {
    let interp = run(b"2EL EL");
    assert_eq!(interp.stack_numbers(), vec![2]);

    let interp = run(b"0EL :EL");
    assert_eq!(interp.stack_numbers(), vec![13, 10]);
}

#[test]
fn test_exit_request() {
    let mut interp = Interpreter::new();
    interp.execute(b"EX").unwrap();
    assert!(interp.quit_requested());
}

#[test]
fn test_quit_immediate() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"^C 1UA").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Quit);
    assert!(interp.quit_requested());
}

#[test]
fn test_interrupt_flag() {
    let mut interp = Interpreter::new();
    interp
        .interrupt_flag()
        .store(true, std::sync::atomic::Ordering::Relaxed);
    let err = interp.execute(b"1").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Interrupted);
}

#[test]
fn test_memory_limit() {
    let mut interp = Interpreter::new();
    interp.execute(b"100,2EJ").unwrap();
    assert!(interp.execute(b"-1<IX\x1b>").is_err());
}

#[test]
fn test_syntax_error_coordinates() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"1 2\n  ~").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax { chr: b'~' });
    assert_eq!((err.line, err.column), (2, 3));
}

#[test]
fn test_unterminated_command_diagnosed() {
    let mut interp = Interpreter::new();
    let err = interp.execute(b"Iabc").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedCommand);
}
