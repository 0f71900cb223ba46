//! End-to-end console sessions driven through `App`

use std::io::Cursor;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use tandem_console::{App, ConsoleEvent, Output, Session};
use tandem_core::{EventLoop, LoopControl, Receiver, WaitIndicator, WorkerConfig, WorkerThread};

struct Console {
    worker: Arc<WorkerThread>,
    session: Receiver<Session>,
    ui: EventLoop<ConsoleEvent>,
    app: App,
    out: Output,
}

impl Console {
    fn new() -> Self {
        let worker = WorkerThread::spawn(&WorkerConfig {
            name: "console-session".to_string(),
            ..WorkerConfig::default()
        })
        .expect("spawn worker");
        let session = Receiver::new(worker.dispatcher(), Session::demo());
        let ui: EventLoop<ConsoleEvent> = EventLoop::new();
        let out = Output::capture();
        let app = App::new(session.sender(), ui.dispatcher(), out.clone());
        Self {
            worker,
            session,
            ui,
            app,
            out,
        }
    }

    fn line(&mut self, text: &str) -> LoopControl {
        self.app.handle_event(ConsoleEvent::Line(text.to_string()))
    }

    /// Feed `script` through the input reader and the UI event loop
    fn run(mut self, script: &str) -> Vec<String> {
        let reader = self
            .app
            .run(&mut self.ui, Cursor::new(script.to_string()))
            .expect("start reader");
        reader.join().expect("reader thread");
        self.out.captured()
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.worker.stop();
    }
}

fn run_script(lines: &[&str]) -> (Vec<String>, LoopControl) {
    let worker = WorkerThread::spawn(&WorkerConfig {
        name: "script-session".to_string(),
        ..WorkerConfig::default()
    })
    .expect("spawn worker");
    let session = Receiver::new(worker.dispatcher(), Session::demo());
    let mut ui: EventLoop<ConsoleEvent> = EventLoop::new();
    let out = Output::capture();
    let mut app = App::new(session.sender(), ui.dispatcher(), out.clone());
    let mut ind = WaitIndicator::new();

    let mut control = LoopControl::Continue;
    for line in lines {
        control = app.handle_event(ConsoleEvent::Line((*line).to_string()));
        assert!(ind.sync(&session.sender()));
        ui.process_pending();
        if control == LoopControl::Quit {
            break;
        }
    }

    drop(app);
    drop(session);
    worker.stop();
    (out.captured(), control)
}

#[test]
fn test_turns_and_scores() {
    let (lines, control) = run_script(&[
        "turn",
        "advance",
        "turn",
        "score ada 3",
        "score zed 1",
        "score ada 9223372036854775807",
        "players",
        "quit",
        "turn",
    ]);

    assert_eq!(control, LoopControl::Quit);
    assert_eq!(
        lines,
        vec![
            "Turn 1",
            "Turn 2 begins",
            "Turn 2",
            "ada now has 15 points",
            "No player named zed",
            "Score of ada would overflow, 9223372036854775807 points refused",
            "Players: ada (15), alan (7), grace (15), linus (3)",
        ]
    );
}

#[test]
fn test_search_and_files() {
    let (lines, _) = run_script(&["search gr", "search x", "files", "read save.log", "read nope"]);

    assert_eq!(
        lines,
        vec![
            "Found: grace (15)",
            "No players found",
            "Files: menu.txt, motd.txt, save.log",
            "turn 1",
            "Game saved.",
            "No such file: nope",
        ]
    );
}

#[test]
fn test_bad_input_keeps_running() {
    let (lines, control) = run_script(&["", "dance", "score ada", "sync"]);

    assert_eq!(control, LoopControl::Continue);
    assert_eq!(
        lines,
        vec![
            "Unknown command: dance (try 'help')",
            "score: missing points",
            "Session idle",
        ]
    );
}

#[test]
fn test_bench_adaptor_reports_both_paths() {
    let (lines, _) = run_script(&["bench-adaptor 20"]);

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("20 round trips: direct "));
    assert!(lines[0].contains("via adaptor"));
}

#[test]
fn test_eof_quits() {
    let out = Output::capture();
    let worker = WorkerThread::spawn(&WorkerConfig::default()).expect("spawn worker");
    let session = Receiver::new(worker.dispatcher(), Session::demo());
    let ui: EventLoop<ConsoleEvent> = EventLoop::new();
    let mut app = App::new(session.sender(), ui.dispatcher(), out);

    assert_eq!(app.handle_event(ConsoleEvent::Eof), LoopControl::Quit);
    drop(app);
    drop(session);
    worker.stop();
}

#[test]
fn test_reader_keeps_replies_ahead_of_next_line() {
    for _ in 0..50 {
        let lines = Console::new().run("advance\nturn\nadvance\nturn\nquit\nturn\n");
        assert_eq!(lines, vec!["Turn 2 begins", "Turn 2", "Turn 3 begins", "Turn 3"]);
    }
}

#[test]
fn test_reader_stops_at_end_of_input() {
    let lines = Console::new().run("search li\nscore linus 1\n");
    assert_eq!(lines, vec!["Found: linus (3)", "linus now has 4 points"]);
}

#[test]
fn test_cancel_stops_bench_adaptor() {
    let mut console = Console::new();
    // Queued before the command starts; delivered inside its first round trip.
    console.app.interrupt().cancel(1);

    assert_eq!(console.line("bench-adaptor 1000"), LoopControl::Continue);

    assert_eq!(
        console.out.captured(),
        vec!["bench-adaptor cancelled after 1 of 2000 round trips"]
    );
}

#[test]
fn test_cancel_for_an_earlier_line_is_ignored() {
    let mut console = Console::new();
    console.app.interrupt().cancel(1);

    console.line("sync");
    console.line("bench-adaptor 10");
    console.line("cancel");

    let lines = console.out.captured();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Session idle");
    assert!(lines[1].starts_with("10 round trips: direct "));
    assert_eq!(lines[2], "Nothing to cancel");
}

#[test]
fn test_cancel_line_zero_is_ignored() {
    let mut console = Console::new();
    console.app.interrupt().cancel(0);

    console.line("bench-adaptor 5");

    let lines = console.out.captured();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("5 round trips: direct "));
    assert!(console.app.settle());
    assert!(console.session.sender().is_connected());
}
