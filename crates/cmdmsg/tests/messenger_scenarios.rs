#![cfg(feature = "peer")]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cmdmsg::frame::{FrameConfig, FrameError, Separators};
use cmdmsg::peer::{Message, Messenger, PeerError, RecoveryPolicy, UnknownCommand};
use cmdmsg::schema::{CommandSpec, CommandTable, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn ping_pong() -> Vec<CommandSpec> {
    vec![
        CommandSpec::named("ping"),
        CommandSpec::with_params("pong", ["int16"]),
    ]
}

fn device_schema() -> Vec<CommandSpec> {
    vec![
        CommandSpec::named("ack"),
        CommandSpec::with_params("say", ["string"]),
        CommandSpec::with_params("raw", ["bint16"]),
        CommandSpec::with_params("set", ["string", "bool", "double"]),
        CommandSpec::with_params("status", ["i32", "c"]),
    ]
}

fn wire_from(schema: Vec<CommandSpec>, frames: &[(&str, Vec<Value>)]) -> Vec<u8> {
    let mut tx = Messenger::new(Vec::<u8>::new(), schema).unwrap();
    for (command, args) in frames {
        tx.send(*command, args).unwrap();
    }
    tx.into_inner()
}

fn recorded(
    messenger: &mut Messenger<Cursor<Vec<u8>>>,
    command: &str,
    tag: &'static str,
) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    messenger
        .attach(command, move |_| {
            sink.lock().unwrap().push(tag.to_string());
            Ok(())
        })
        .unwrap();
    log
}

#[test]
fn pong_with_int16_argument() {
    init_tracing();
    let wire = wire_from(ping_pong(), &[("pong", vec![Value::Int16(5)])]);
    assert_eq!(wire, b"1,5;");

    let mut rx = Messenger::new(Cursor::new(wire), ping_pong()).unwrap();
    assert_eq!(
        rx.receive().unwrap(),
        Some(Message::new(1, vec![Value::Int16(5)]))
    );
}

#[test]
fn pong_accepts_plain_integer_literal() {
    init_tracing();
    let mut tx = Messenger::new(Vec::<u8>::new(), ping_pong()).unwrap();
    tx.send("pong", &[5.into()]).unwrap();
    assert_eq!(tx.into_inner(), b"1,5;");
}

#[test]
fn separator_inside_string_is_escaped() {
    init_tracing();
    let wire = wire_from(device_schema(), &[("say", vec![Value::from("a,b")])]);
    assert_eq!(wire, b"1,a/,b;");

    let mut rx = Messenger::new(Cursor::new(wire), device_schema()).unwrap();
    let message = rx.receive().unwrap().unwrap();
    assert_eq!(message.args, vec![Value::from("a,b")]);
}

#[test]
fn binary_minus_one_is_two_ff_bytes() {
    init_tracing();
    let wire = wire_from(device_schema(), &[("raw", vec![Value::Int16(-1)])]);
    assert_eq!(wire, [b'2', b',', 0xFF, 0xFF, b';']);

    let mut rx = Messenger::new(Cursor::new(wire), device_schema()).unwrap();
    let message = rx.receive().unwrap().unwrap();
    assert_eq!(message.args, vec![Value::Int16(-1)]);
}

#[test]
fn handlers_fire_in_order_and_detach() {
    init_tracing();
    let wire = b"0;0;".to_vec();
    let mut rx = Messenger::new(Cursor::new(wire), ping_pong()).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let a = Arc::clone(&log);
    let first = rx
        .attach("ping", move |_| {
            a.lock().unwrap().push("a");
            Ok(())
        })
        .unwrap();
    let b = Arc::clone(&log);
    rx.attach(0u16, move |_| {
        b.lock().unwrap().push("b");
        Ok(())
    })
    .unwrap();

    rx.receive().unwrap();
    assert!(rx.detach(first));
    rx.receive().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "b"]);
}

#[test]
fn unhandled_command_reaches_hook_once_with_args() {
    init_tracing();
    let wire = wire_from(ping_pong(), &[("pong", vec![Value::Int16(-300)])]);
    let mut rx = Messenger::new(Cursor::new(wire), ping_pong()).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    rx.on_unknown(move |unknown| {
        if let UnknownCommand::Unhandled(message) = unknown {
            sink.lock().unwrap().push(message.clone());
        }
        Ok(())
    });

    rx.run(RecoveryPolicy::Abort).unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![Message::new(1, vec![Value::Int16(-300)])]
    );
}

#[test]
fn fewer_fields_than_declared_never_dispatches() {
    init_tracing();
    let mut rx = Messenger::new(Cursor::new(b"3,only;1,next;".to_vec()), device_schema()).unwrap();
    let set = recorded(&mut rx, "set", "set");
    let say = recorded(&mut rx, "say", "say");

    let err = rx.receive().unwrap_err();
    assert!(matches!(
        err,
        PeerError::Frame(FrameError::MissingFields {
            expected: 3,
            found: 1
        })
    ));
    assert!(err.is_frame_complete());
    assert!(set.lock().unwrap().is_empty());

    rx.receive().unwrap();
    assert_eq!(*say.lock().unwrap(), vec!["say"]);
}

#[test]
fn extra_fields_do_not_disturb_next_frame() {
    init_tracing();
    let mut rx = Messenger::new(Cursor::new(b"1,5,6/;,7;1,9;".to_vec()), ping_pong()).unwrap();

    assert_eq!(
        rx.receive().unwrap(),
        Some(Message::new(1, vec![Value::Int16(5)]))
    );
    assert_eq!(
        rx.receive().unwrap(),
        Some(Message::new(1, vec![Value::Int16(9)]))
    );
}

#[test]
fn reserved_bytes_survive_any_arrangement() {
    init_tracing();
    let pieces = [",", ";", "/", "\0", "//", ",,", "/;", ";/", "///", "x"];
    let mut originals = Vec::new();
    for a in pieces {
        for b in pieces {
            originals.push(format!("{a}{b}"));
            originals.push(format!("{a}mid{b}"));
        }
    }

    let frames: Vec<(&str, Vec<Value>)> = originals
        .iter()
        .map(|text| ("say", vec![Value::from(text.as_str())]))
        .collect();
    let wire = wire_from(device_schema(), &frames);

    let mut rx = Messenger::new(Cursor::new(wire), device_schema()).unwrap();
    for original in &originals {
        let message = rx.receive().unwrap().unwrap();
        assert_eq!(message.args, vec![Value::from(original.as_str())], "{original:?}");
    }
    assert!(matches!(
        rx.receive(),
        Err(PeerError::Frame(FrameError::ConnectionClosed))
    ));
}

#[test]
fn binary_values_containing_separator_bytes() {
    init_tracing();
    // 0x2C ',' 0x3B ';' 0x2F '/' 0x00 in every position of an int16.
    let values: Vec<i16> = [0x2C, 0x3B, 0x2F, 0x00]
        .iter()
        .flat_map(|lo| [0x2C, 0x3B, 0x2F, 0x00].map(move |hi| i16::from_le_bytes([*lo, hi])))
        .collect();

    let frames: Vec<(&str, Vec<Value>)> = values
        .iter()
        .map(|v| ("raw", vec![Value::Int16(*v)]))
        .collect();
    let wire = wire_from(device_schema(), &frames);

    let mut rx = Messenger::new(Cursor::new(wire), device_schema()).unwrap();
    for value in values {
        let message = rx.receive().unwrap().unwrap();
        assert_eq!(message.args, vec![Value::Int16(value)]);
    }
}

#[test]
fn mixed_frames_through_run() {
    init_tracing();
    let wire = wire_from(
        device_schema(),
        &[
            ("set", vec![Value::from("speed"), Value::Bool(true), Value::Double(-12.5)]),
            ("status", vec![Value::Int32(70_000), Value::Char(';')]),
            ("ack", vec![]),
        ],
    );

    let mut rx = Messenger::new(Cursor::new(wire), device_schema()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in ["set", "status", "ack"] {
        let sink = Arc::clone(&seen);
        rx.attach(name, move |message| {
            sink.lock().unwrap().push(message.clone());
            Ok(())
        })
        .unwrap();
    }

    rx.run(RecoveryPolicy::Resync).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            Message::new(
                3,
                vec![Value::from("speed"), Value::Bool(true), Value::Double(-12.5)]
            ),
            Message::new(4, vec![Value::Int32(70_000), Value::Char(';')]),
            Message::new(0, vec![]),
        ]
    );
}

#[test]
fn run_skips_garbage_and_unknown_ids() {
    init_tracing();
    let mut rx = Messenger::new(
        Cursor::new(b"1,notanumber;99,x;,;1,7;".to_vec()),
        ping_pong(),
    )
    .unwrap();
    let unknown = Arc::new(Mutex::new(0usize));
    let count = Arc::clone(&unknown);
    rx.on_unknown(move |_| {
        *count.lock().unwrap() += 1;
        Ok(())
    });
    let pongs = recorded(&mut rx, "pong", "pong");

    rx.run(RecoveryPolicy::Resync).unwrap();
    assert_eq!(*unknown.lock().unwrap(), 2);
    assert_eq!(*pongs.lock().unwrap(), vec!["pong"]);
}

#[test]
fn custom_separators_end_to_end() {
    init_tracing();
    let config = FrameConfig {
        separators: Separators::new(b'|', b'\n', b'\\').unwrap(),
        ..FrameConfig::default()
    };
    let mut tx = Messenger::with_config(Vec::<u8>::new(), device_schema(), config).unwrap();
    tx.send("say", &[Value::from("a|b,c;d\n")]).unwrap();
    let wire = tx.into_inner();
    assert_eq!(wire, b"1|a\\|b,c;d\\\n\n");

    let mut rx = Messenger::with_config(Cursor::new(wire), device_schema(), config).unwrap();
    assert_eq!(
        rx.receive().unwrap().unwrap().args,
        vec![Value::from("a|b,c;d\n")]
    );
}

#[test]
fn command_table_from_json() {
    init_tracing();
    let table = CommandTable::from_json(r#"["ping", {"name": "pong", "params": ["i"]}]"#).unwrap();
    let mut tx = Messenger::with_table(Vec::<u8>::new(), table, FrameConfig::default()).unwrap();
    tx.send("pong", &[Value::Int16(5)]).unwrap();
    assert_eq!(tx.get_ref(), b"1,5;");
}

#[test]
#[cfg(unix)]
fn ping_pong_with_device_thread() {
    init_tracing();
    let (host_end, device_end) = std::os::unix::net::UnixStream::pair().unwrap();

    let device = std::thread::spawn(move || {
        let mut device = Messenger::new(device_end, ping_pong()).unwrap();
        let mut answered = 0i16;
        loop {
            match device.receive() {
                Ok(Some(message)) if message.command == 0 => {
                    answered += 1;
                    device.send("pong", &[Value::Int16(answered)]).unwrap();
                }
                Ok(_) => {}
                Err(PeerError::Frame(FrameError::ConnectionClosed)) => return answered,
                Err(err) => panic!("device failed: {err}"),
            }
        }
    });

    let mut host = Messenger::new(host_end, ping_pong()).unwrap();
    for expected in 1..=3i16 {
        host.send("ping", &[]).unwrap();
        let reply = host.receive().unwrap().unwrap();
        assert_eq!(reply, Message::new(1, vec![Value::Int16(expected)]));
    }
    drop(host);

    assert_eq!(device.join().unwrap(), 3);
}
