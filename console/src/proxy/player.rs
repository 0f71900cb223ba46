//! Player Proxy
//!
//! Search is debounced: while the user is still typing, replies to older
//! prefixes are dropped on arrival and only the latest result set reaches
//! `sig_results`.

use tandem_core::{DispatcherRef, ProxyBase, Sender, Signal, WaitIndicator};

use crate::session::{Player, ScoreError, Session};

/// Outcome of [`PlayerProxy::add_score`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScoreUpdate {
    /// The player's score after the change
    Changed(Player),
    /// No player has this name
    UnknownPlayer(String),
    /// The change was refused because the score would overflow
    Overflow {
        /// Player name
        name: String,
        /// Points that were refused
        points: i64,
    },
}

impl From<Result<Player, ScoreError>> for ScoreUpdate {
    fn from(result: Result<Player, ScoreError>) -> Self {
        match result {
            Ok(player) => Self::Changed(player),
            Err(ScoreError::UnknownPlayer(name)) => Self::UnknownPlayer(name),
            Err(ScoreError::Overflow { name, points }) => Self::Overflow { name, points },
        }
    }
}

/// UI-side reply target of [`PlayerProxy`]
pub struct PlayerReplies {
    sig_results: Signal<Vec<Player>>,
    sig_score: Signal<ScoreUpdate>,
}

/// Player listing, search and scoring
pub struct PlayerProxy {
    base: ProxyBase<Session, PlayerReplies>,
    sig_results: Signal<Vec<Player>>,
    sig_score: Signal<ScoreUpdate>,
}

impl PlayerProxy {
    /// Create the proxy
    pub fn new(session: Sender<Session>, ui: DispatcherRef) -> Self {
        let sig_results = Signal::new();
        let sig_score = Signal::new();
        let base = ProxyBase::new(
            session,
            ui,
            PlayerReplies {
                sig_results: sig_results.clone(),
                sig_score: sig_score.clone(),
            },
        );
        Self {
            base,
            sig_results,
            sig_score,
        }
    }

    /// Raised with the results of the most recent [`search`](Self::search)
    #[must_use]
    pub fn sig_results(&self) -> &Signal<Vec<Player>> {
        &self.sig_results
    }

    /// Raised once per [`add_score`](Self::add_score)
    #[must_use]
    pub fn sig_score(&self) -> &Signal<ScoreUpdate> {
        &self.sig_score
    }

    /// All players in join order, `None` if the session is gone
    pub fn list(&self, ind: &mut WaitIndicator) -> Option<Vec<Player>> {
        self.base
            .call(ind, |session: &mut Session| session.players().to_vec())
    }

    /// Look up players by name prefix
    pub fn search(&self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        self.base.post_latest(
            move |session: &mut Session| session.search_players(&prefix),
            |r: &mut PlayerReplies, found| r.sig_results.raise(&found),
        );
    }

    /// Add points to a player
    pub fn add_score(&self, name: impl Into<String>, points: i64) {
        let name = name.into();
        self.base.post_with_reply(
            move |session: &mut Session| ScoreUpdate::from(session.add_score(&name, points)),
            |r: &mut PlayerReplies, update| r.sig_score.raise(&update),
        );
    }
}

impl std::fmt::Debug for PlayerProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerProxy")
            .field("base", &self.base)
            .finish()
    }
}
