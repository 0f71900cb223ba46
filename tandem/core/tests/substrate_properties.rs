//! Integration tests for the request/response substrate
//!
//! These tests run real worker threads and verify the guarantees the rest of
//! the client builds on:
//! - FIFO delivery per target, from any number of posting threads
//! - At-most-once delivery, zero times once the receiver is gone
//! - Synchronous round trips with interleaved and reentrant work
//! - Proxy teardown with replies still in flight
//! - `sync()` as a completion barrier
//! - Per-request adaptor construction through `make_temporary`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use tandem_core::{
    DispatcherExt, EventLoop, ProxyBase, Receiver, Sender, Signal, WaitIndicator, WorkerConfig,
    WorkerThread,
};

// ============================================================================
// Helpers
// ============================================================================

fn worker(name: &str) -> Arc<WorkerThread> {
    WorkerThread::spawn(&WorkerConfig {
        name: name.to_string(),
        ..WorkerConfig::default()
    })
    .expect("spawn worker")
}

/// Block the worker until the returned sender is signalled (or dropped)
fn hold(worker: &WorkerThread) -> std_mpsc::Sender<()> {
    let (tx, rx) = std_mpsc::channel::<()>();
    worker.post(move || {
        let _ = rx.recv();
    });
    tx
}

#[derive(Default)]
struct Counter {
    value: i64,
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_fifo_per_target_from_many_threads() {
    let worker = worker("fifo");
    let receiver = Receiver::new(worker.dispatcher(), Vec::<(usize, usize)>::new());

    let posters: Vec<_> = (0..4)
        .map(|tag| {
            let sender = receiver.sender();
            thread::spawn(move || {
                for seq in 0..500 {
                    sender.post_request(move |log: &mut Vec<(usize, usize)>| log.push((tag, seq)));
                }
            })
        })
        .collect();
    for poster in posters {
        poster.join().unwrap();
    }

    let mut ind = WaitIndicator::new();
    let log = ind
        .call(&receiver.sender(), |log: &mut Vec<(usize, usize)>| log.clone())
        .unwrap();

    assert_eq!(log.len(), 2000);
    for tag in 0..4 {
        let seqs: Vec<usize> = log.iter().filter(|(t, _)| *t == tag).map(|(_, s)| *s).collect();
        assert_eq!(seqs, (0..500).collect::<Vec<_>>(), "thread {tag} out of order");
    }
}

#[test]
fn test_increment_increment_read_scenario() {
    let worker = worker("abc");
    let receiver = Receiver::new(worker.dispatcher(), Counter::default());
    let observed = Arc::new(Mutex::new(None));

    let (a_done, b_go) = std_mpsc::channel::<()>();
    let (b_done, c_go) = std_mpsc::channel::<()>();

    let a = {
        let sender = receiver.sender();
        thread::spawn(move || {
            sender.post_request(|c: &mut Counter| c.value += 1);
            a_done.send(()).unwrap();
        })
    };
    let b = {
        let sender = receiver.sender();
        thread::spawn(move || {
            b_go.recv().unwrap();
            sender.post_request(|c: &mut Counter| c.value += 1);
            b_done.send(()).unwrap();
        })
    };
    let c = {
        let sender = receiver.sender();
        let observed = Arc::clone(&observed);
        thread::spawn(move || {
            c_go.recv().unwrap();
            sender.post_request(move |c: &mut Counter| *observed.lock() = Some(c.value));
        })
    };
    for t in [a, b, c] {
        t.join().unwrap();
    }

    let mut ind = WaitIndicator::new();
    assert!(ind.sync(&receiver.sender()));

    let counter = ind.call(&receiver.sender(), |c: &mut Counter| c.value).unwrap();
    assert_eq!(counter, 2);

    let seen = observed.lock().expect("read request ran");
    assert!((0..=2).contains(&seen));
    // A and B were posted before C, so FIFO puts C last.
    assert_eq!(seen, 2);
}

// ============================================================================
// Delivery
// ============================================================================

#[test]
fn test_at_most_once_and_zero_after_receiver_death() {
    let worker = worker("once");
    let runs = Arc::new(AtomicUsize::new(0));

    let receiver = Receiver::new(worker.dispatcher(), ());
    let sender = receiver.sender();

    let r = Arc::clone(&runs);
    sender.post_request(move |(): &mut ()| {
        r.fetch_add(1, Ordering::SeqCst);
    });
    let mut ind = WaitIndicator::new();
    assert!(ind.sync(&sender));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Queue work behind a held worker, then kill the receiver.
    let release = hold(&worker);
    for _ in 0..10 {
        let r = Arc::clone(&runs);
        sender.post_request(move |(): &mut ()| {
            r.fetch_add(1, Ordering::SeqCst);
        });
    }
    drop(receiver);
    release.send(()).unwrap();
    worker.stop();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sync_barrier_covers_prior_requests() {
    let worker = worker("barrier");
    let receiver = Receiver::new(worker.dispatcher(), Counter::default());
    let sender = receiver.sender();
    let finished = Arc::new(AtomicUsize::new(0));

    let release = hold(&worker);
    for _ in 0..100 {
        let f = Arc::clone(&finished);
        sender.post_request(move |c: &mut Counter| {
            c.value += 1;
            f.fetch_add(1, Ordering::SeqCst);
        });
    }
    release.send(()).unwrap();

    let mut ind = WaitIndicator::new();
    assert!(ind.sync(&sender));
    assert_eq!(finished.load(Ordering::SeqCst), 100);
}

// ============================================================================
// Synchronous round trips
// ============================================================================

#[test]
fn test_round_trip_with_interleaved_tasks() {
    let worker = worker("round-trip");
    let receiver = Receiver::new(worker.dispatcher(), Counter { value: 41 });
    let mut ind = WaitIndicator::new();
    let ui_dispatcher = ind.dispatcher();
    let reply = ind.reply_handle();
    let unrelated = Arc::new(AtomicUsize::new(0));
    let answer = Arc::new(Mutex::new(0));

    let u = Arc::clone(&unrelated);
    let a = Arc::clone(&answer);
    receiver.sender().post_request(move |c: &mut Counter| {
        c.value += 1;
        for _ in 0..5 {
            let u = Arc::clone(&u);
            ui_dispatcher.post(move || {
                u.fetch_add(1, Ordering::SeqCst);
            });
        }
        *a.lock() = c.value;
        ui_dispatcher.post(move || reply.post(true));
    });

    assert!(ind.wait());
    assert_eq!(*answer.lock(), 42);
    assert_eq!(unrelated.load(Ordering::SeqCst), 5);
}

#[test]
fn test_reentrant_wait_runs_tasks_inline() {
    let worker = worker("reentrant");
    let receiver = Receiver::new(worker.dispatcher(), ());
    let mut ind = WaitIndicator::new();
    let waiter_thread = thread::current().id();
    let ran_on = Arc::new(Mutex::new(None));

    let dispatcher = ind.dispatcher();
    let reply = ind.reply_handle();
    let r = Arc::clone(&ran_on);
    receiver.sender().post_request(move |(): &mut ()| {
        let (ack_tx, ack_rx) = std_mpsc::channel();
        dispatcher.post(move || {
            *r.lock() = Some(thread::current().id());
            ack_tx.send(()).unwrap();
        });
        // The waiter must run the task before any reply exists.
        ack_rx.recv().unwrap();
        reply.post(true);
    });

    assert!(ind.wait());
    assert_eq!(*ran_on.lock(), Some(waiter_thread));
}

#[test]
fn test_call_resolves_none_when_receiver_dies_first() {
    let worker = worker("dies");
    let receiver = Receiver::new(worker.dispatcher(), Counter::default());
    let sender = receiver.sender();

    // The receiver is dropped on the worker, ahead of the call in the queue.
    let release = hold(&worker);
    worker.post(move || drop(receiver));
    release.send(()).unwrap();

    let mut ind = WaitIndicator::new();
    assert_eq!(ind.call(&sender, |c: &mut Counter| c.value), None);
    assert!(!sender.is_connected());
}

// ============================================================================
// Proxies
// ============================================================================

struct Session {
    turn: u32,
}

struct TurnReplies {
    sig_turn: Signal<u32>,
    _sentinel: Arc<()>,
}

#[test]
fn test_proxy_teardown_drops_in_flight_reply() {
    let worker = worker("teardown");
    let session = Receiver::new(worker.dispatcher(), Session { turn: 1 });
    let mut ui: EventLoop<()> = EventLoop::new();
    let sentinel = Arc::new(());
    let delivered = Arc::new(AtomicUsize::new(0));

    let proxy = ProxyBase::new(
        session.sender(),
        ui.dispatcher(),
        TurnReplies {
            sig_turn: Signal::new(),
            _sentinel: Arc::clone(&sentinel),
        },
    );

    let release = hold(&worker);
    let d = Arc::clone(&delivered);
    proxy.post_with_reply(
        |s: &mut Session| {
            s.turn += 1;
            s.turn
        },
        move |r: &mut TurnReplies, turn| {
            d.fetch_add(1, Ordering::SeqCst);
            r.sig_turn.raise(&turn);
        },
    );
    drop(proxy);
    assert_eq!(Arc::strong_count(&sentinel), 1);

    release.send(()).unwrap();
    let mut ind = WaitIndicator::new();
    assert!(ind.sync(&session.sender()));
    ui.process_pending();

    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    let turn = ind.call(&session.sender(), |s: &mut Session| s.turn);
    assert_eq!(turn, Some(2));
}

#[test]
fn test_debounced_proxy_delivers_latest_only() {
    let worker = worker("debounce");
    let session = Receiver::new(worker.dispatcher(), Session { turn: 0 });
    let mut ui: EventLoop<()> = EventLoop::new();
    let sig_turn = Signal::new();
    let proxy = ProxyBase::new(
        session.sender(),
        ui.dispatcher(),
        TurnReplies {
            sig_turn: sig_turn.clone(),
            _sentinel: Arc::new(()),
        },
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let _conn = sig_turn.add(move |turn| s.lock().push(*turn));

    for _ in 0..3 {
        proxy.post_latest(
            |s: &mut Session| {
                s.turn += 1;
                s.turn
            },
            |r: &mut TurnReplies, turn| r.sig_turn.raise(&turn),
        );
    }

    let mut ind = WaitIndicator::new();
    assert!(ind.sync(proxy.session()));
    ui.process_pending();

    assert_eq!(*seen.lock(), vec![3]);
}

// ============================================================================
// Adaptors
// ============================================================================

struct Root {
    log: Arc<Mutex<Vec<String>>>,
    built: usize,
}

struct Adaptor {
    id: usize,
    log: Arc<Mutex<Vec<String>>>,
}

impl Drop for Adaptor {
    fn drop(&mut self) {
        self.log.lock().push(format!("drop#{}", self.id));
    }
}

#[test]
fn test_temporary_builds_adaptor_per_request() {
    let worker = worker("adaptor");
    let log = Arc::new(Mutex::new(Vec::new()));
    let receiver = Receiver::new(
        worker.dispatcher(),
        Root {
            log: Arc::clone(&log),
            built: 0,
        },
    );

    let narrowed: Sender<Adaptor> = receiver.sender().make_temporary(|root: &mut Root| {
        root.built += 1;
        root.log.lock().push(format!("make#{}", root.built));
        Adaptor {
            id: root.built,
            log: Arc::clone(&root.log),
        }
    });

    for _ in 0..2 {
        narrowed.post_request(|a: &mut Adaptor| {
            let line = format!("handle#{}", a.id);
            a.log.lock().push(line);
        });
    }

    let mut ind = WaitIndicator::new();
    assert!(ind.sync(&narrowed));

    // The sync itself goes through the adaptor, hence make#3/drop#3.
    assert_eq!(
        *log.lock(),
        vec!["make#1", "handle#1", "drop#1", "make#2", "handle#2", "drop#2", "make#3", "drop#3"]
    );
}

struct SlowTeardown {
    dropped: Arc<AtomicUsize>,
}

impl Drop for SlowTeardown {
    fn drop(&mut self) {
        thread::sleep(std::time::Duration::from_millis(5));
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_sync_through_adaptor_waits_for_adaptor_drop() {
    let worker = worker("adaptor-drop");
    let dropped = Arc::new(AtomicUsize::new(0));
    let receiver = Receiver::new(worker.dispatcher(), Arc::clone(&dropped));
    let narrowed: Sender<SlowTeardown> =
        receiver
            .sender()
            .make_temporary(|dropped: &mut Arc<AtomicUsize>| SlowTeardown {
                dropped: Arc::clone(dropped),
            });

    let mut ind = WaitIndicator::new();
    for round in 1..=20 {
        assert!(ind.sync(&narrowed));
        assert_eq!(dropped.load(Ordering::SeqCst), 2 * round - 1);

        let value = ind.call(&narrowed, move |_: &mut SlowTeardown| round);
        assert_eq!(value, Some(round));
        assert_eq!(dropped.load(Ordering::SeqCst), 2 * round);
    }
}
