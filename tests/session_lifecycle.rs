//! End-to-end session lifecycle scenarios against a scripted port driver

use emuterm_core::{
    Capabilities, CommandId, Emulation, Mode, PortDriver, PortError, PortHandle, Session,
    SessionMessage, UiSink,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Shared ordered record of everything the session touched.
#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: &str) {
        self.0.lock().push(event.to_string());
    }

    fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }
}

/// Port driver whose opened handles replay a scripted sequence of reads,
/// then block (in timeout-sized slices) with nothing to say.
struct ScriptedDriver {
    log: EventLog,
    reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
    fail_open_code: Option<i32>,
    read_block: Duration,
}

impl ScriptedDriver {
    fn new(log: EventLog) -> Self {
        Self {
            log,
            reads: Arc::new(Mutex::new(VecDeque::new())),
            fail_open_code: None,
            read_block: Duration::from_millis(20),
        }
    }

    fn with_reads(mut self, reads: &[&[u8]]) -> Self {
        self.reads = Arc::new(Mutex::new(
            reads.iter().map(|r| r.to_vec()).collect::<VecDeque<_>>(),
        ));
        self
    }

    fn failing_open(mut self, code: i32) -> Self {
        self.fail_open_code = Some(code);
        self
    }
}

impl PortDriver for ScriptedDriver {
    fn open(&self, port: &str) -> Result<Box<dyn PortHandle>, PortError> {
        if let Some(code) = self.fail_open_code {
            return Err(PortError::Open {
                port: port.to_string(),
                source: io::Error::from_raw_os_error(code),
            });
        }
        self.log.push("open");
        Ok(Box::new(ScriptedHandle {
            log: self.log.clone(),
            reads: self.reads.clone(),
            read_block: self.read_block,
            closed: false,
        }))
    }

    fn list_ports(&self) -> Result<Vec<String>, PortError> {
        Ok(vec!["COM1".to_string()])
    }
}

struct ScriptedHandle {
    log: EventLog,
    reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
    read_block: Duration,
    closed: bool,
}

impl PortHandle for ScriptedHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError> {
        if self.closed {
            self.log.push("read-after-close");
            return Err(PortError::NotOpen);
        }
        self.log.push("read");
        if let Some(data) = self.reads.lock().pop_front() {
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            return Ok(n);
        }
        // Idle line: block for one timeout slice, report no data.
        thread::sleep(self.read_block);
        Ok(0)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError> {
        self.log.push("write");
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<(), PortError> {
        self.log.push("close");
        self.closed = true;
        Ok(())
    }
}

/// UI sink recording errors and command states for assertions.
#[derive(Default)]
struct RecordingUi {
    errors: Mutex<Vec<String>>,
    menu_entries: Mutex<Vec<(CommandId, String)>>,
}

impl UiSink for RecordingUi {
    fn set_command_enabled(&self, _id: CommandId, _enabled: bool) {}

    fn insert_menu_entry(&self, id: CommandId, label: &str) {
        self.menu_entries.lock().push((id, label.to_string()));
    }

    fn request_redraw(&self) {}

    fn show_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}

struct HookedEmulation {
    name: &'static str,
    log: EventLog,
}

impl Emulation for HookedEmulation {
    fn display_name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn on_connect(&mut self) {
        self.log.push("on_connect");
    }

    fn on_disconnect(&mut self) {
        self.log.push("on_disconnect");
    }
}

#[test]
fn full_lifecycle_streams_and_disconnects_cleanly() {
    let log = EventLog::default();
    let driver = ScriptedDriver::new(log.clone()).with_reads(&[b"boot ok\r\n".as_slice()]);
    let ui = Arc::new(RecordingUi::default());
    let mut session = Session::new(Box::new(driver), ui.clone());

    let index = session.register_emulation(Box::new(HookedEmulation {
        name: "VT100",
        log: log.clone(),
    }));
    session.select_emulation(index);
    session.enter_command();

    let rx = session.messages();
    session.enter_connect("COM1");
    assert_eq!(session.mode(), Mode::Connect);
    assert!(session.is_port_open());

    // The scripted boot banner arrives through the reader thread.
    let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(msg, SessionMessage::RxData(d) if &d[..] == b"boot ok\r\n"));

    // Transmit path posts alongside the write.
    session.send(b"version\r\n").unwrap();
    let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(msg, SessionMessage::TxData(d) if &d[..] == b"version\r\n"));

    session.enter_command();
    assert_eq!(session.mode(), Mode::Command);
    assert!(!session.is_port_open());
    assert!(!session.reader_active());

    assert_eq!(log.count("on_connect"), 1);
    assert_eq!(log.count("on_disconnect"), 1);
    assert_eq!(log.count("close"), 1);
    assert!(ui.errors.lock().is_empty());
}

#[test]
fn disconnect_mid_read_joins_reader_before_close() {
    let log = EventLog::default();
    // No scripted data: every read blocks for a full timeout slice, so the
    // Command transition lands while a read is in flight.
    let driver = ScriptedDriver::new(log.clone());
    let ui = Arc::new(RecordingUi::default());
    let mut session = Session::new(Box::new(driver), ui.clone());

    let index = session.register_emulation(Box::new(HookedEmulation {
        name: "VT100",
        log: log.clone(),
    }));
    session.select_emulation(index);

    session.enter_connect("COM1");
    assert!(session.reader_active());

    // Let the reader get into a blocking read.
    thread::sleep(Duration::from_millis(30));

    session.enter_command();

    assert_eq!(session.mode(), Mode::Command);
    assert!(!session.is_port_open());
    assert!(!session.reader_active());
    assert_eq!(log.count("on_disconnect"), 1);
    // The reader observed the flag and stopped; nothing touched the handle
    // after it closed.
    assert_eq!(log.count("read-after-close"), 0);
    assert!(log.count("read") >= 1);
}

#[test]
fn failed_connect_reports_driver_code_and_spawns_nothing() {
    let log = EventLog::default();
    let driver = ScriptedDriver::new(log.clone()).failing_open(5);
    let ui = Arc::new(RecordingUi::default());
    let mut session = Session::new(Box::new(driver), ui.clone());

    session.enter_connect("COM3");

    assert_eq!(session.mode(), Mode::Command);
    assert!(!session.is_port_open());
    assert!(!session.reader_active());

    let errors = ui.errors.lock().clone();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("COM3"), "got: {}", errors[0]);
    assert!(errors[0].contains("os error 5"), "got: {}", errors[0]);
    assert_eq!(log.count("open"), 0);
    assert_eq!(log.count("read"), 0);
}

#[test]
fn registered_emulations_become_menu_entries() {
    let log = EventLog::default();
    let ui = Arc::new(RecordingUi::default());
    let mut session = Session::new(Box::new(ScriptedDriver::new(log.clone())), ui.clone());

    session.register_emulation(Box::new(HookedEmulation {
        name: "Echo",
        log: log.clone(),
    }));

    assert_eq!(session.emulations().len(), 2);
    assert_eq!(session.emulations().name(0), Some("No Emulation"));
    assert_eq!(session.emulations().name(1), Some("Echo"));

    let entries = ui.menu_entries.lock().clone();
    assert!(entries
        .iter()
        .any(|(id, label)| *id == CommandId::Emulation(1) && label == "Echo"));
}

#[test]
fn dropping_a_connected_session_tears_down_cleanly() {
    let log = EventLog::default();
    let ui = Arc::new(RecordingUi::default());

    {
        let mut session = Session::new(Box::new(ScriptedDriver::new(log.clone())), ui.clone());
        let index = session.register_emulation(Box::new(HookedEmulation {
            name: "VT100",
            log: log.clone(),
        }));
        session.select_emulation(index);
        session.enter_connect("COM1");
    }

    assert_eq!(log.count("on_disconnect"), 1);
    assert_eq!(log.count("close"), 1);
    assert_eq!(log.count("read-after-close"), 0);
}
