mod common;

use common::{Draw, config, load_error, session, try_session_with};
use wasmstage_core::{
    CallError, CapabilityContext, HostConfig, InputAction, LoadError, Phase, Rgba, Session,
    SessionError, Tick,
};
use wasmtime::Val;

fn i32_result(results: &[Val]) -> i32 {
    results[0].i32().expect("i32 result")
}

#[test]
fn log_delivers_exact_text() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 10) "hello")
  (func (export "frame") (call $log (i32.const 10) (i32.const 5))))
"#,
    );
    session.tick().unwrap();
    assert_eq!(rec.lines(), ["hello"]);
}

#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "ok\ff!")
  (func (export "frame") (call $log (i32.const 0) (i32.const 4))))
"#,
    );
    assert_eq!(session.tick().unwrap(), Tick::Continue);
    assert_eq!(rec.lines(), ["ok\u{FFFD}!"]);
}

#[test]
fn out_of_bounds_log_closes_the_session() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "bye")
  (func (export "frame") (call $log (i32.const 65530) (i32.const 10)))
  (func (export "teardown") (call $log (i32.const 0) (i32.const 3))))
"#,
    );

    let err = session.tick().unwrap_err();
    let SessionError::MemoryFault(fault) = err else {
        panic!("expected a memory fault, got {err}");
    };
    assert_eq!((fault.offset, fault.len, fault.memory_size), (65530, 10, 65536));

    assert_eq!(session.phase(), Phase::Closed);
    assert_eq!(rec.lines(), ["bye"], "teardown still ran, nothing was logged from the bad range");
    assert_eq!(session.tick().unwrap(), Tick::Exited);
    drop(session);
    assert_eq!(rec.lines(), ["bye"]);
}

#[test]
fn bounds_follow_memory_growth() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "setup")
    (drop (memory.grow (i32.const 1)))
    (i32.store16 (i32.const 65540) (i32.const 0x6968)))
  (func (export "frame") (call $log (i32.const 65540) (i32.const 2))))
"#,
    );
    assert_eq!(session.guest_mut().memory_size(), 65536);

    assert_eq!(session.tick().unwrap(), Tick::Continue);
    assert_eq!(session.guest_mut().memory_size(), 2 * 65536);
    assert_eq!(rec.lines(), ["hi"]);
}

#[test]
fn guest_without_memory_faults_on_any_text() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "GfxText" (func $text (param i32 i32 f32 f32)))
  (func (export "setup") (call $text (i32.const 0) (i32.const 1) (f32.const 0) (f32.const 0))))
"#,
    );
    assert!(matches!(
        session.tick(),
        Err(SessionError::MemoryFault(_))
    ));
    assert!(rec.draws().is_empty());
}

#[test]
fn zero_length_text_at_the_end_of_memory_is_fine() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "frame") (call $log (i32.const 65536) (i32.const 0))))
"#,
    );
    assert_eq!(session.tick().unwrap(), Tick::Continue);
    assert_eq!(rec.lines(), [""]);
}

#[test]
fn draw_calls_arrive_in_order_with_saturated_colors() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "GfxClear" (func $clear (param f32 f32 f32 f32)))
  (import "env" "GfxRectangle" (func $rect (param f32 f32 f32 f32 f32 f32 f32 f32)))
  (import "env" "GfxText" (func $text (param i32 i32 f32 f32)))
  (memory (export "memory") 1)
  (data (i32.const 100) "hi")
  (func (export "frame")
    (call $clear (f32.const 0) (f32.const 0) (f32.const 0) (f32.const 1))
    (call $rect (f32.const 1) (f32.const 2) (f32.const 3) (f32.const 4)
                (f32.const 1.5) (f32.const 0.5) (f32.const -0.2) (f32.const 1))
    (call $text (i32.const 100) (i32.const 2) (f32.const 8) (f32.const 9))))
"#,
    );
    session.tick().unwrap();
    assert_eq!(
        rec.draws(),
        [
            Draw::Clear(Rgba::BLACK),
            Draw::Rectangle {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
                color: Rgba::new(255, 127, 0, 255)
            },
            Draw::Text {
                text: "hi".into(),
                x: 8.0,
                y: 9.0
            },
        ]
    );
}

#[test]
fn drawing_without_a_surface_is_silent() {
    let config = config();
    let caps = CapabilityContext::new(&config);
    let wat = r#"
(module
  (import "env" "GfxClear" (func $clear (param f32 f32 f32 f32)))
  (import "env" "GfxImage" (func $image (param f32 f32 f32 f32 f32 f32)))
  (func (export "frame")
    (call $clear (f32.const 0) (f32.const 0) (f32.const 0) (f32.const 1))
    (call $image (f32.const 0) (f32.const 0) (f32.const 1) (f32.const 1) (f32.const 1) (f32.const 1))))
"#;
    let mut session = match Session::start(wat.as_bytes(), &config, caps) {
        Ok(session) => session,
        Err(err) => panic!("{err}"),
    };
    assert_eq!(session.tick().unwrap(), Tick::Continue);
    assert_eq!(session.tick().unwrap(), Tick::Continue);
}

const RANDOM_GUEST: &str = r#"
(module
  (import "env" "EngineRandomInt" (func $rand (param i32) (result i32)))
  (import "env" "EngineRandomFloat" (func $randf (result f32)))
  (func (export "rand") (param i32) (result i32) (call $rand (local.get 0)))
  (func (export "randf") (result f32) (call $randf)))
"#;

#[test]
fn random_int_with_non_positive_bound_returns_zero() {
    let (mut session, _rec) = session(RANDOM_GUEST);
    let guest = session.guest_mut();
    assert_eq!(i32_result(guest.call("rand", &[Val::I32(0)]).unwrap()), 0);
    assert_eq!(i32_result(guest.call("rand", &[Val::I32(-7)]).unwrap()), 0);
    assert_eq!(i32_result(guest.call("rand", &[Val::I32(i32::MIN)]).unwrap()), 0);
}

#[test]
fn random_values_stay_in_range() {
    let (mut session, _rec) = session(RANDOM_GUEST);
    let guest = session.guest_mut();
    for _ in 0..200 {
        let n = i32_result(guest.call("rand", &[Val::I32(6)]).unwrap());
        assert!((0..6).contains(&n), "{n}");
        let f = guest.call("randf", &[]).unwrap()[0].f32().unwrap();
        assert!((0.0..1.0).contains(&f), "{f}");
    }
}

#[test]
fn input_pressed_reports_edges_once() {
    let (mut session, rec) = session(
        r#"
(module
  (import "env" "InputPressed" (func $pressed (param i32) (result i32)))
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "esc")
  (data (i32.const 4) "click")
  (func (export "frame")
    (if (call $pressed (i32.const 1)) (then (call $log (i32.const 0) (i32.const 3))))
    (if (call $pressed (i32.const 2)) (then (call $log (i32.const 4) (i32.const 5))))
    (if (call $pressed (i32.const 9)) (then unreachable))))
"#,
    );

    session.context_mut().input_mut().set_down(InputAction::Escape, true);
    session.tick().unwrap();
    session.tick().unwrap();
    assert_eq!(rec.lines(), ["esc"], "held key is pressed once");

    let input = session.context_mut().input_mut();
    input.set_down(InputAction::Escape, false);
    input.set_down(InputAction::PrimaryClick, true);
    session.tick().unwrap();
    assert_eq!(rec.lines(), ["esc", "click"]);
}

#[test]
fn cursor_position_is_forwarded() {
    let (mut session, _rec) = session(
        r#"
(module
  (import "env" "InputCursorX" (func $x (result f32)))
  (import "env" "InputCursorY" (func $y (result f32)))
  (func (export "cursor") (result f32 f32) (call $x) (call $y)))
"#,
    );
    session.context_mut().input_mut().set_cursor(12.5, 300.0);
    let results = session.guest_mut().call("cursor", &[]).unwrap();
    assert_eq!(results[0].f32(), Some(12.5));
    assert_eq!(results[1].f32(), Some(300.0));
}

#[test]
fn call_buffer_holds_no_residue_between_calls() {
    let (mut session, _rec) = session(
        r#"
(module
  (func (export "add") (param i32 i32) (result i32) (i32.add (local.get 0) (local.get 1)))
  (func (export "seven") (result i32) (i32.const 7))
  (func (export "nothing")))
"#,
    );
    let guest = session.guest_mut();

    assert_eq!(i32_result(guest.call("add", &[Val::I32(40), Val::I32(2)]).unwrap()), 42);
    assert_eq!(guest.call_buffer().len(), 3);

    assert_eq!(i32_result(guest.call("seven", &[]).unwrap()), 7);
    assert!(guest.call_buffer().params().is_empty());
    assert_eq!(guest.call_buffer().results().len(), 1);

    assert!(guest.call("nothing", &[]).unwrap().is_empty());
    assert!(guest.call_buffer().is_empty());
}

#[test]
fn call_errors_are_reported_per_call() {
    let (mut session, _rec) = session(
        r#"
(module
  (func (export "boom") unreachable)
  (func (export "one") (param i32) (result i32) (local.get 0)))
"#,
    );
    let guest = session.guest_mut();

    assert!(matches!(guest.call("boom", &[]), Err(CallError::Trap { .. })));
    assert!(matches!(guest.call("missing", &[]), Err(CallError::MissingExport(_))));
    assert!(matches!(
        guest.call("one", &[Val::F32(0)]),
        Err(CallError::Signature { .. })
    ));
    assert!(matches!(guest.call("one", &[]), Err(CallError::Signature { .. })));

    // The module is still usable after a trap.
    assert_eq!(i32_result(guest.call("one", &[Val::I32(5)]).unwrap()), 5);
}

#[test]
fn calls_wider_than_the_buffer_are_refused() {
    let config = HostConfig {
        call_stack_words: 2,
        ..config()
    };
    let (mut session, _rec) = match try_session_with(
        r#"(module (func (export "add") (param i32 i32) (result i32) (i32.add (local.get 0) (local.get 1))))"#,
        &config,
    ) {
        Ok(pair) => pair,
        Err(err) => panic!("{err}"),
    };
    let err = session
        .guest_mut()
        .call("add", &[Val::I32(1), Val::I32(2)])
        .unwrap_err();
    assert!(matches!(
        err,
        CallError::StackOverflow {
            needed: 3,
            capacity: 2,
            ..
        }
    ));
}

#[test]
fn undeclared_import_is_a_load_error() {
    let err = load_error(r#"(module (import "env" "EngineTeleport" (func)))"#);
    assert!(
        matches!(&err, LoadError::UnknownImport { module, name } if module == "env" && name == "EngineTeleport"),
        "{err}"
    );

    let err = load_error(r#"(module (import "other" "EngineLog" (func (param i32 i32))))"#);
    assert!(matches!(err, LoadError::UnknownImport { .. }), "{err}");
}

#[test]
fn mismatched_import_signature_is_a_load_error() {
    let err = load_error(r#"(module (import "env" "EngineLog" (func (param i32))))"#);
    match err {
        LoadError::ImportSignature {
            name,
            expected,
            found,
        } => {
            assert_eq!(name, "EngineLog");
            assert_eq!(expected, "(i32, i32) -> ()");
            assert_eq!(found, "(i32) -> ()");
        }
        other => panic!("unexpected error {other}"),
    }

    let err = load_error(r#"(module (import "env" "EngineRandomInt" (func (param i32) (result f32))))"#);
    assert!(matches!(err, LoadError::ImportSignature { .. }), "{err}");
}

#[test]
fn non_function_import_is_a_load_error() {
    let err = load_error(r#"(module (import "env" "EngineFps" (global f32)))"#);
    assert!(matches!(err, LoadError::ImportKind { .. }), "{err}");
}

#[test]
fn wasi_imports_depend_on_configuration() {
    let wat = r#"
(module
  (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
  (memory (export "memory") 1))
"#;
    let err = load_error(wat);
    assert!(matches!(err, LoadError::UnknownImport { .. }), "{err}");

    let wasi = HostConfig {
        enable_wasi: true,
        ..config()
    };
    assert!(try_session_with(wat, &wasi).is_ok());
}

#[test]
fn lifecycle_export_with_wrong_signature_is_a_load_error() {
    let err = load_error(r#"(module (func (export "frame") (param i32)))"#);
    assert!(
        matches!(err, LoadError::LifecycleSignature { name: "frame", .. }),
        "{err}"
    );
}

#[test]
fn trapping_initializer_is_a_load_error() {
    let err = load_error(r#"(module (func (export "_initialize") unreachable))"#);
    assert!(matches!(err, LoadError::Instantiate(_)), "{err}");
}

#[test]
fn malformed_artifacts_are_load_errors() {
    let config = config();
    let inputs: [&[u8]; 3] = [b"", b"garbage", b"\0asm\x01\x00\x00\x00\xff"];
    for bytes in inputs {
        let caps = CapabilityContext::new(&config);
        match Session::start(bytes, &config, caps) {
            Ok(_) => panic!("{bytes:?} loaded"),
            Err(err) => assert!(matches!(err, SessionError::Load(_)), "{err}"),
        }
    }

    let missing = HostConfig {
        module_path: "/nonexistent/game.wasm".into(),
        ..config
    };
    let caps = CapabilityContext::new(&missing);
    assert!(matches!(
        Session::from_file(&missing, caps),
        Err(SessionError::Load(LoadError::Io { .. }))
    ));
}
