//! Game Session
//!
//! The actor behind every proxy. A [`Session`] owns all mutable game state
//! and is only ever touched on the session worker thread, so nothing in here
//! is synchronized.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

// ============================================================================
// Players
// ============================================================================

/// A player and their running score
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Display name, unique within a session
    pub name: String,
    /// Accumulated points
    pub score: i64,
}

impl Player {
    /// Create a player with a starting score
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// Byte encoding of stored files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8; invalid sequences fail to decode
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value
    Latin1,
}

impl Charset {
    /// Decode raw file bytes, `None` if they are not valid in this charset
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Name as shown to the user
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }
}

/// In-memory directory of named files.
///
/// Contents are shared, so cloning a directory copies names and handles but
/// never file bytes.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl Directory {
    /// Store (or replace) a file
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        let contents: Arc<[u8]> = contents.into().into();
        self.files.insert(name.into(), contents);
    }

    /// Raw contents of a file
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(AsRef::as_ref)
    }

    /// File names in sorted order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the directory holds no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Line-based message catalog.
///
/// A line whose trimmed text is a known message id is replaced by its
/// translation; every other line passes through unchanged.
#[derive(Clone, Debug, Default)]
pub struct Translator {
    catalog: Arc<HashMap<String, String>>,
}

impl Translator {
    /// Build a translator from `(message id, translation)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            catalog: Arc::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Translate every line of `text`
    #[must_use]
    pub fn translate(&self, text: &str) -> String {
        text.lines()
            .map(|line| {
                self.catalog
                    .get(line.trim())
                    .map_or(line, String::as_str)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// Session
// ============================================================================

/// Why a score change was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// No player has this name
    #[error("No player named {0}")]
    UnknownPlayer(String),

    /// Adding the points would overflow the player's score
    #[error("Adding {points} points to {name} would overflow the score")]
    Overflow {
        /// Player name
        name: String,
        /// Points that were refused
        points: i64,
    },
}

/// Callback invoked after every turn change.
///
/// Returning `false` unsubscribes the listener.
pub type TurnListener = Box<dyn FnMut(u32) -> bool + Send>;

/// All mutable game state
pub struct Session {
    turn: u32,
    players: Vec<Player>,
    directory: Directory,
    translator: Translator,
    charset: Charset,
    turn_listeners: Vec<TurnListener>,
}

impl Session {
    /// Create an empty session at turn 1
    #[must_use]
    pub fn new(charset: Charset, translator: Translator) -> Self {
        Self {
            turn: 1,
            players: Vec::new(),
            directory: Directory::default(),
            translator,
            charset,
            turn_listeners: Vec::new(),
        }
    }

    /// A session populated with sample players and files
    #[must_use]
    pub fn demo() -> Self {
        let mut session = Self::new(
            Charset::Latin1,
            Translator::from_pairs([
                ("msg-welcome", "Welcome to the tandem console."),
                ("msg-hint", "Type 'help' for the list of commands."),
                ("msg-saved", "Game saved."),
            ]),
        );
        for (name, score) in [("ada", 12), ("alan", 7), ("grace", 15), ("linus", 3)] {
            session.add_player(Player::new(name, score));
        }
        session.store_file("motd.txt", b"msg-welcome\nmsg-hint".to_vec());
        session.store_file("save.log", b"turn 1\nmsg-saved".to_vec());
        session.store_file("menu.txt", b"Caf\xe9 au lait, cr\xe8me br\xfbl\xe9e".to_vec());
        session
    }

    /// Current turn number
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// End the current turn and notify listeners. Returns the new turn.
    pub fn advance_turn(&mut self) -> u32 {
        self.turn += 1;
        let turn = self.turn;
        let before = self.turn_listeners.len();
        self.turn_listeners.retain_mut(|listener| listener(turn));
        let pruned = before - self.turn_listeners.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Turn listeners removed");
        }
        tracing::debug!(turn, "Turn advanced");
        turn
    }

    /// Subscribe to turn changes
    pub fn add_turn_listener(&mut self, listener: TurnListener) {
        self.turn_listeners.push(listener);
    }

    /// Number of live turn listeners
    #[must_use]
    pub fn turn_listener_count(&self) -> usize {
        self.turn_listeners.len()
    }

    /// All players in join order
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Add a player, replacing one with the same name
    pub fn add_player(&mut self, player: Player) {
        if let Some(existing) = self.players.iter_mut().find(|p| p.name == player.name) {
            *existing = player;
        } else {
            self.players.push(player);
        }
    }

    /// Players whose name starts with `prefix` (case-insensitive), by name
    #[must_use]
    pub fn search_players(&self, prefix: &str) -> Vec<Player> {
        let prefix = prefix.to_lowercase();
        let mut found: Vec<Player> = self
            .players
            .iter()
            .filter(|p| p.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Add points to a player and return the updated player.
    ///
    /// # Errors
    ///
    /// [`ScoreError::UnknownPlayer`] if no player has that name,
    /// [`ScoreError::Overflow`] if the new score does not fit. The score is
    /// left unchanged on error.
    pub fn add_score(&mut self, name: &str, points: i64) -> Result<Player, ScoreError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ScoreError::UnknownPlayer(name.to_string()))?;
        player.score = player
            .score
            .checked_add(points)
            .ok_or_else(|| ScoreError::Overflow {
                name: name.to_string(),
                points,
            })?;
        Ok(player.clone())
    }

    /// Stored files
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Store (or replace) a file
    pub fn store_file(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.directory.insert(name, contents);
    }

    /// Message catalog
    #[must_use]
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Encoding of stored files
    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("turn", &self.turn)
            .field("players", &self.players.len())
            .field("files", &self.directory.len())
            .field("charset", &self.charset)
            .field("turn_listeners", &self.turn_listeners.len())
            .finish()
    }
}
