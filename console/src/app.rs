//! Console Application
//!
//! The UI-thread side of the console. An [`App`] owns the feature proxies and
//! a [`WaitIndicator`] for synchronous queries, turns input events into
//! proxy calls, and prints whatever the proxies' signals report.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tandem_core::{Connection, DispatcherRef, EventLoop, LoopControl, Sender, WaitIndicator};

use crate::commands::{self, Command, HELP};
use crate::input::{spawn_reader, ConsoleEvent, Interrupt};
use crate::proxy::{FileProxy, PlayerProxy, ScoreUpdate, TurnProxy};
use crate::session::{Player, Session};

const SESSION_GONE: &str = "Session unavailable";

/// Where console output goes
#[derive(Clone, Debug)]
pub enum Output {
    /// Print to standard output
    Stdout,
    /// Collect lines in memory
    Capture(Arc<Mutex<Vec<String>>>),
}

impl Output {
    /// An empty in-memory capture
    #[must_use]
    pub fn capture() -> Self {
        Self::Capture(Arc::new(Mutex::new(Vec::new())))
    }

    /// Emit one line
    pub fn line(&self, text: impl Into<String>) {
        let text = text.into();
        match self {
            Self::Stdout => println!("{text}"),
            Self::Capture(lines) => lines.lock().push(text),
        }
    }

    /// Lines captured so far (empty for [`Output::Stdout`])
    #[must_use]
    pub fn captured(&self) -> Vec<String> {
        match self {
            Self::Stdout => Vec::new(),
            Self::Capture(lines) => lines.lock().clone(),
        }
    }
}

fn format_players(players: &[Player]) -> String {
    players
        .iter()
        .map(|p| format!("{} ({})", p.name, p.score))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The console surface
pub struct App {
    session: Sender<Session>,
    turns: TurnProxy,
    players: PlayerProxy,
    files: FileProxy,
    ind: WaitIndicator,
    out: Output,
    line: u64,
    cancelled: Arc<AtomicU64>,
    _connections: Vec<Connection>,
}

impl App {
    /// Build the proxies on `ui` and subscribe the output to their signals
    pub fn new(session: Sender<Session>, ui: DispatcherRef, out: Output) -> Self {
        let turns = TurnProxy::new(session.clone(), Arc::clone(&ui));
        let players = PlayerProxy::new(session.clone(), ui);
        let files = FileProxy::new(&session);

        let mut connections = Vec::new();

        let o = out.clone();
        connections.push(
            turns
                .sig_turn_changed()
                .add(move |turn| o.line(format!("Turn {turn} begins"))),
        );

        let o = out.clone();
        connections.push(players.sig_results().add(move |found: &Vec<Player>| {
            if found.is_empty() {
                o.line("No players found");
            } else {
                o.line(format!("Found: {}", format_players(found)));
            }
        }));

        let o = out.clone();
        connections.push(players.sig_score().add(move |update| match update {
            ScoreUpdate::Changed(player) => {
                o.line(format!("{} now has {} points", player.name, player.score));
            }
            ScoreUpdate::UnknownPlayer(name) => o.line(format!("No player named {name}")),
            ScoreUpdate::Overflow { name, points } => {
                o.line(format!("Score of {name} would overflow, {points} points refused"));
            }
        }));

        Self {
            session,
            turns,
            players,
            files,
            ind: WaitIndicator::new(),
            out,
            line: 0,
            cancelled: Arc::new(AtomicU64::new(0)),
            _connections: connections,
        }
    }

    /// Cancellation handle for the input reader
    #[must_use]
    pub fn interrupt(&self) -> Interrupt {
        Interrupt::new(self.ind.dispatcher(), Arc::clone(&self.cancelled))
    }

    /// Drive the app from `input` until a command or end of input quits.
    ///
    /// Each command is followed by a barrier on the session, so replies it
    /// triggered reach `event_loop` before the next line is read from the
    /// reader. Returns the reader thread, which may still be blocked on
    /// `input` when an interactive session quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    pub fn run<R>(
        &mut self,
        event_loop: &mut EventLoop<ConsoleEvent>,
        input: R,
    ) -> io::Result<JoinHandle<()>>
    where
        R: BufRead + Send + 'static,
    {
        let (reader, ack) =
            spawn_reader(input, event_loop.event_sender(), Some(self.interrupt()))?;
        event_loop.run(|event| {
            let control = self.handle_event(event);
            self.settle();
            ack.ack();
            control
        });
        Ok(reader)
    }

    /// Block until every request this app has posted to the session has run.
    ///
    /// Returns `false` if the session is gone.
    pub fn settle(&mut self) -> bool {
        self.ind.sync(&self.session)
    }

    /// Handle one native event
    pub fn handle_event(&mut self, event: ConsoleEvent) -> LoopControl {
        match event {
            ConsoleEvent::Line(line) => {
                self.line += 1;
                match commands::parse(&line) {
                    Ok(Some(command)) => self.execute(command),
                    Ok(None) => LoopControl::Continue,
                    Err(e) => {
                        self.out.line(e.to_string());
                        LoopControl::Continue
                    }
                }
            }
            ConsoleEvent::Eof => {
                tracing::debug!("End of input");
                LoopControl::Quit
            }
        }
    }

    /// Run one command
    pub fn execute(&mut self, command: Command) -> LoopControl {
        tracing::debug!(command = ?command, "Executing command");
        match command {
            Command::Turn => match self.turns.current_turn(&mut self.ind) {
                Some(turn) => self.out.line(format!("Turn {turn}")),
                None => self.out.line(SESSION_GONE),
            },
            Command::Advance => self.turns.advance(),
            Command::Players => match self.players.list(&mut self.ind) {
                Some(players) if players.is_empty() => self.out.line("No players"),
                Some(players) => self.out.line(format!("Players: {}", format_players(&players))),
                None => self.out.line(SESSION_GONE),
            },
            Command::Search(prefix) => self.players.search(prefix),
            Command::Score { name, points } => self.players.add_score(name, points),
            Command::Files => match self.files.list(&mut self.ind) {
                Some(names) => self.out.line(format!("Files: {}", names.join(", "))),
                None => self.out.line(SESSION_GONE),
            },
            Command::Read(name) => match self.files.read(&mut self.ind, name) {
                Some(Ok(text)) => {
                    for line in text.lines() {
                        self.out.line(line);
                    }
                }
                Some(Err(e)) => self.out.line(e.to_string()),
                None => self.out.line(SESSION_GONE),
            },
            Command::Sync => {
                if self.ind.sync(&self.session) {
                    self.out.line("Session idle");
                } else {
                    self.out.line(SESSION_GONE);
                }
            }
            Command::BenchAdaptor(rounds) => self.bench_adaptor(rounds),
            Command::Cancel => self.out.line("Nothing to cancel"),
            Command::Help => self.out.line(HELP),
            Command::Quit => return LoopControl::Quit,
        }
        LoopControl::Continue
    }

    /// Whether the input reader asked the current line's command to stop
    fn cancel_requested(&self) -> bool {
        let target = self.cancelled.load(Ordering::Relaxed);
        target != 0 && target == self.line
    }

    /// Compare empty round trips straight to the session with round trips
    /// through the file adaptor, which is rebuilt for every request.
    /// Stops early on `cancel`.
    fn bench_adaptor(&mut self, rounds: u32) {
        let rounds = rounds.max(1);
        let mut done: u64 = 0;

        let mut timings = [Duration::ZERO; 2];
        for (elapsed, adapted) in timings.iter_mut().zip([false, true]) {
            let start = Instant::now();
            for _ in 0..rounds {
                let alive = if adapted {
                    self.ind.sync(self.files.view_sender())
                } else {
                    self.ind.sync(&self.session)
                };
                if !alive {
                    self.out.line(SESSION_GONE);
                    return;
                }
                done += 1;
                if self.cancel_requested() {
                    tracing::info!(done, "Adaptor benchmark cancelled");
                    self.out.line(format!(
                        "bench-adaptor cancelled after {done} of {} round trips",
                        u64::from(rounds) * 2
                    ));
                    return;
                }
            }
            *elapsed = start.elapsed();
        }
        let [direct, adapted] = timings;

        tracing::info!(rounds, ?direct, ?adapted, "Adaptor benchmark finished");
        self.out.line(format!(
            "{rounds} round trips: direct {:?}/call, via adaptor {:?}/call",
            direct / rounds,
            adapted / rounds
        ));
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("turns", &self.turns)
            .field("players", &self.players)
            .field("files", &self.files)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}
