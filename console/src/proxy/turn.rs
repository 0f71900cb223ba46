//! Turn Proxy

use tandem_core::{DispatcherRef, ProxyBase, Sender, Signal, WaitIndicator};

use crate::session::Session;

/// UI-side reply target of [`TurnProxy`]
pub struct TurnReplies {
    sig_turn_changed: Signal<u32>,
}

/// Reads and advances the game turn
///
/// On construction the proxy subscribes to the session's turn changes; the
/// subscription ends by itself once the proxy is dropped.
pub struct TurnProxy {
    base: ProxyBase<Session, TurnReplies>,
    sig_turn_changed: Signal<u32>,
}

impl TurnProxy {
    /// Create the proxy and subscribe it to turn changes
    pub fn new(session: Sender<Session>, ui: DispatcherRef) -> Self {
        let sig_turn_changed = Signal::new();
        let base = ProxyBase::new(
            session,
            ui,
            TurnReplies {
                sig_turn_changed: sig_turn_changed.clone(),
            },
        );

        let reply = base.reply_sender();
        base.post(move |session: &mut Session| {
            session.add_turn_listener(Box::new(move |turn: u32| {
                if !reply.is_connected() {
                    return false;
                }
                reply.post_request(move |r: &mut TurnReplies| r.sig_turn_changed.raise(&turn));
                true
            }));
        });

        Self {
            base,
            sig_turn_changed,
        }
    }

    /// Raised on the UI thread with the new turn number
    #[must_use]
    pub fn sig_turn_changed(&self) -> &Signal<u32> {
        &self.sig_turn_changed
    }

    /// Current turn, `None` if the session is gone
    pub fn current_turn(&self, ind: &mut WaitIndicator) -> Option<u32> {
        self.base.call(ind, |session: &mut Session| session.turn())
    }

    /// End the turn. Listeners learn about it through `sig_turn_changed`.
    pub fn advance(&self) {
        self.base.post(|session: &mut Session| {
            session.advance_turn();
        });
    }
}

impl std::fmt::Debug for TurnProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnProxy").field("base", &self.base).finish()
    }
}
