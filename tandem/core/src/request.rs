//! Requests
//!
//! A request is a one-shot unit of work addressed to a target object `T`.
//! It is consumed by value: once posted, the queue owns it, and it is either
//! handled exactly once on the target's thread or dropped unexecuted.

/// A unit of work applied once to a target object on the target's thread
///
/// Closures taking `&mut T` implement this trait, so most call sites never
/// name it. Named request types are useful when the request carries a result
/// slot the poster inspects afterwards.
///
/// Failures inside `handle` belong to the request: write them into whatever
/// result the poster is waiting for. The substrate does not catch or forward
/// them.
pub trait Request<T>: Send + 'static {
    /// Apply this request to the target
    fn handle(self: Box<Self>, target: &mut T);
}

impl<T, F> Request<T> for F
where
    F: FnOnce(&mut T) + Send + 'static,
{
    fn handle(self: Box<Self>, target: &mut T) {
        (*self)(target);
    }
}

/// Boxed request, the form in which requests travel through queues
pub type BoxedRequest<T> = Box<dyn Request<T>>;
