//! Proxy Glue
//!
//! A proxy is the UI-side facade of one feature. It is a convention rather
//! than a type, and every proxy has the same bones:
//!
//! 1. a [`Sender`] to the session actor (possibly narrowed with
//!    [`Sender::make_temporary`]),
//! 2. synchronous queries through a [`WaitIndicator`],
//! 3. asynchronous replies through a [`Receiver`] bound to the UI dispatcher,
//!    whose target raises [`Signal`](crate::Signal)s,
//! 4. a lifetime tied to the feature: replies addressed to a dropped proxy
//!    are discarded.
//!
//! [`ProxyBase`] bundles points 1, 3 and 4 so feature proxies only name
//! their operations.
//!
//! ```text
//!   UI thread                                  session thread
//!   ─────────                                  ──────────────
//!   proxy.post_with_reply(query, on_reply)
//!     └─ Sender<S> ──────────────────────────▶ answer = query(&mut session)
//!   on_reply(&mut reply_target, answer) ◀───── Sender<R>::post(answer)
//!     └─ sig_something.raise(&answer)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dispatcher::DispatcherRef;
use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::wait_indicator::WaitIndicator;

/// Reusable core of a feature proxy
///
/// `S` is the session-side target, `R` the UI-side reply target (usually a
/// struct of signals).
pub struct ProxyBase<S, R> {
    session: Sender<S>,
    reply: Receiver<R>,
    /// Generation of the most recent debounced query
    latest: Arc<AtomicU64>,
}

impl<S: 'static, R: Send + 'static> ProxyBase<S, R> {
    /// Build a proxy core posting to `session` and receiving replies on `ui`
    pub fn new(session: Sender<S>, ui: DispatcherRef, reply_target: R) -> Self {
        Self {
            session,
            reply: Receiver::new(ui, reply_target),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sender to the session-side target
    #[must_use]
    pub fn session(&self) -> &Sender<S> {
        &self.session
    }

    /// Sender to this proxy's reply target.
    ///
    /// Session-side code may keep it to stream updates; once the proxy is
    /// dropped, everything posted through it is discarded.
    #[must_use]
    pub fn reply_sender(&self) -> Sender<R> {
        self.reply.sender()
    }

    /// Fire-and-forget request to the session
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.session.post_request(f);
    }

    /// Run `query` on the session, then `on_reply` with its answer on the UI
    /// thread
    pub fn post_with_reply<A, Q, H>(&self, query: Q, on_reply: H)
    where
        A: Send + 'static,
        Q: FnOnce(&mut S) -> A + Send + 'static,
        H: FnOnce(&mut R, A) + Send + 'static,
    {
        let reply = self.reply.sender();
        self.session.post_request(move |session: &mut S| {
            let answer = query(session);
            reply.post_request(move |target: &mut R| on_reply(target, answer));
        });
    }

    /// Like [`post_with_reply`](Self::post_with_reply), but only the reply to
    /// the most recent `post_latest` call is delivered.
    ///
    /// Replies to superseded queries are discarded on the UI thread. The
    /// session still executes every query.
    pub fn post_latest<A, Q, H>(&self, query: Q, on_reply: H)
    where
        A: Send + 'static,
        Q: FnOnce(&mut S) -> A + Send + 'static,
        H: FnOnce(&mut R, A) + Send + 'static,
    {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.latest);
        self.post_with_reply(query, move |target: &mut R, answer| {
            if latest.load(Ordering::SeqCst) == generation {
                on_reply(target, answer);
            } else {
                tracing::trace!(generation, "Superseded reply discarded");
            }
        });
    }

    /// Synchronous query: block in `ind` until the session answered.
    ///
    /// `None` means the session is gone.
    pub fn call<A, F>(&self, ind: &mut WaitIndicator, f: F) -> Option<A>
    where
        A: Send + 'static,
        F: FnOnce(&mut S) -> A + Send + 'static,
    {
        ind.call(&self.session, f)
    }
}

impl<S, R> std::fmt::Debug for ProxyBase<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyBase")
            .field("reply", &self.reply)
            .field("latest", &self.latest.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
