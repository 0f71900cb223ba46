//! Senders
//!
//! A [`Sender`] is the copyable capability to enqueue requests for one
//! receiver's target. It never owns the target; cloning it is cheap and never
//! touches the target.
//!
//! Senders come in two shapes, hidden behind the same type:
//!
//! - **direct**: posts a delivery capsule to the receiver's dispatcher
//! - **temporary**: wraps a parent sender and a factory; every request is run
//!   against a freshly built adaptor that is dropped right after
//!   (see [`Sender::make_temporary`])

use std::fmt;
use std::sync::{Arc, Weak};

use crate::dispatcher::{DispatcherRef, Runnable};
use crate::receiver::Mailbox;
use crate::request::{BoxedRequest, Request};

/// How a sender gets a request to its target.
///
/// `completion` fires on the target's thread once the delivery has fully
/// run, including any adaptor teardown. If the request is discarded the
/// completion is dropped without being called.
trait Route<T>: Send + Sync {
    fn deliver(&self, request: BoxedRequest<T>, completion: Option<Runnable>);
    fn is_connected(&self) -> bool;
}

/// Posts a capsule holding a weak mailbox reference to the dispatcher
struct DirectRoute<T> {
    dispatcher: DispatcherRef,
    mailbox: Weak<Mailbox<T>>,
}

impl<T: Send + 'static> Route<T> for DirectRoute<T> {
    fn deliver(&self, request: BoxedRequest<T>, completion: Option<Runnable>) {
        let mailbox = Weak::clone(&self.mailbox);
        self.dispatcher.post_new_runnable(Box::new(move || {
            if let Some(mailbox) = mailbox.upgrade() {
                mailbox.execute(request, completion);
            } else {
                tracing::trace!("Receiver gone, request discarded");
            }
        }));
    }

    fn is_connected(&self) -> bool {
        self.mailbox.strong_count() > 0
    }
}

/// Factory materializing an adaptor from the live target
type AdaptorFactory<T, U> = dyn Fn(&mut T) -> U + Send + Sync;

/// Routes requests for `U` through a parent sender for `T`
struct TemporaryRoute<T, U> {
    parent: Sender<T>,
    factory: Arc<AdaptorFactory<T, U>>,
}

impl<T: 'static, U: 'static> Route<U> for TemporaryRoute<T, U> {
    fn deliver(&self, request: BoxedRequest<U>, completion: Option<Runnable>) {
        let factory = Arc::clone(&self.factory);
        let capsule: BoxedRequest<T> = Box::new(move |target: &mut T| {
            let mut adaptor = factory(target);
            request.handle(&mut adaptor);
        });
        self.parent.route.deliver(capsule, completion);
    }

    fn is_connected(&self) -> bool {
        self.parent.is_connected()
    }
}

/// Copyable capability to post requests to a target of type `T`
pub struct Sender<T> {
    route: Arc<dyn Route<T>>,
}

impl<T: Send + 'static> Sender<T> {
    pub(crate) fn direct(dispatcher: DispatcherRef, mailbox: Weak<Mailbox<T>>) -> Self {
        Self {
            route: Arc::new(DirectRoute {
                dispatcher,
                mailbox,
            }),
        }
    }
}

impl<T: 'static> Sender<T> {
    /// Hand a request to the receiver's queue.
    ///
    /// Never blocks. When the receiver is gone the request is dropped without
    /// running; the caller is not told.
    pub fn post_new_request(&self, request: BoxedRequest<T>) {
        self.route.deliver(request, None);
    }

    /// Post a request and run `completion` on the target's thread once it
    /// has fully executed (for narrowed senders: after the adaptor is
    /// dropped). A discarded request drops `completion` uncalled.
    pub(crate) fn post_with_completion(&self, request: BoxedRequest<T>, completion: Runnable) {
        self.route.deliver(request, Some(completion));
    }

    /// Post a closure (or any other [`Request`]) without boxing it first
    pub fn post_request<R>(&self, request: R)
    where
        R: Request<T>,
    {
        self.post_new_request(Box::new(request));
    }

    /// Derive a sender for a narrower adaptor type `U`.
    ///
    /// For every request posted through the returned sender, `factory` runs on
    /// the target's thread to build a fresh `U` from the live `T`, the request
    /// handles that adaptor, and the adaptor is dropped before the next request
    /// starts. Adaptors are never cached across requests.
    #[must_use]
    pub fn make_temporary<U, F>(&self, factory: F) -> Sender<U>
    where
        U: 'static,
        F: Fn(&mut T) -> U + Send + Sync + 'static,
    {
        Sender {
            route: Arc::new(TemporaryRoute {
                parent: self.clone(),
                factory: Arc::new(factory),
            }),
        }
    }

    /// Whether the receiver behind this sender is still alive.
    ///
    /// Advisory only: the receiver may be dropped right after this returns.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.route.is_connected()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            route: Arc::clone(&self.route),
        }
    }
}

impl<T: 'static> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("connected", &self.is_connected())
            .finish()
    }
}
