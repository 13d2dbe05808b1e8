use std::{
    any::Any,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::JoinHandle as ThreadJoinHandle,
};

use tokio::runtime;
use tokio::task::JoinHandle;

use crate::{
    errors::{catch_fault, SharedError},
    observer::Observer,
};

use super::DisposeBag;

/// Locks `m`, recovering the guard if a previous holder panicked.
///
/// User closures run under a fault guard, so a panic may unwind through a held lock.
/// The protected state is still consistent at that point because every mutation is
/// completed before observers are called.
pub(crate) fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Subscribes to the stream and specifies how to handle emitted values.
    ///
    /// Every call starts an independent execution for cold observables. The returned
    /// `Subscription` cancels it.
    fn subscribe(&self, s: Subscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
pub trait Unsubscribeable {
    /// Unsubscribes and releases associated resources, consuming the handle.
    fn unsubscribe(self);
}

/// Cancellation flag shared along a subscription chain.
///
/// A child token reports cancelled when it or any ancestor is cancelled, so
/// cancelling a downstream subscription silences every upstream subscriber an
/// operator created for it, while an operator can still cancel a single upstream
/// (a losing `amb` side, a switched-away inner) through its own child.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<TokenNode>);

#[derive(Default)]
struct TokenNode {
    cancelled: AtomicBool,
    parent: Option<CancelToken>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is also cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        CancelToken(Arc::new(TokenNode {
            cancelled: AtomicBool::new(false),
            parent: Some(self.clone()),
        }))
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        let mut node = Some(self);
        while let Some(token) = node {
            if token.0.cancelled.load(Ordering::Acquire) {
                return true;
            }
            node = token.0.parent.as_ref();
        }
        false
    }
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(SharedError) + Send>;

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable` or a subject.
///
/// A `Subscriber` enforces the terminal-state contract on its own: once `error` or
/// `complete` went through, or its subscription got disposed, every further call is
/// dropped.
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    stopped: bool,
    token: CancelToken,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(SharedError) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
            stopped: false,
            token: CancelToken::new(),
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    ///
    /// Errors reaching such a subscriber are logged, completion is ignored.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
            stopped: false,
            token: CancelToken::new(),
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(&mut self, error_fn: impl FnMut(SharedError) + 'static + Send) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Returns `true` once this subscriber received a terminal notification or its
    /// subscription was disposed. Long running producers should poll it between
    /// emissions and stop when it turns `true`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stopped || self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub(crate) fn with_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    fn stop(&mut self) -> bool {
        if self.is_closed() {
            tracing::trace!("terminal notification after close dropped");
            return false;
        }
        self.stopped = true;
        self.token.cancel();
        true
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        if self.is_closed() {
            tracing::trace!("next after close dropped");
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if !self.stop() {
            return;
        }
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
    }

    fn error(&mut self, observable_error: SharedError) {
        if !self.stop() {
            return;
        }
        match &mut self.error_fn {
            Some(efn) => (efn)(observable_error),
            None => tracing::warn!(error = %observable_error, "unhandled error notification"),
        }
    }
}

/// Downstream subscriber shared between the callbacks an operator installs upstream.
///
/// All deliveries go through one mutex so fan-in operators never call the
/// downstream observer concurrently.
pub(crate) struct SharedSubscriber<T> {
    inner: Arc<Mutex<Subscriber<T>>>,
    token: CancelToken,
}

impl<T> Clone for SharedSubscriber<T> {
    fn clone(&self) -> Self {
        SharedSubscriber {
            inner: Arc::clone(&self.inner),
            token: self.token.clone(),
        }
    }
}

impl<T: 'static> SharedSubscriber<T> {
    pub(crate) fn new(s: Subscriber<T>) -> Self {
        let token = s.token();
        SharedSubscriber {
            inner: Arc::new(Mutex::new(s)),
            token,
        }
    }

    pub(crate) fn next(&self, v: T) {
        lock(&self.inner).next(v);
    }

    pub(crate) fn error(&self, e: SharedError) {
        lock(&self.inner).error(e);
    }

    pub(crate) fn complete(&self) {
        lock(&self.inner).complete();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Runs a user closure under the fault guard. A panic is delivered downstream as
    /// an error and `None` is returned.
    pub(crate) fn guard<R>(&self, operator: &'static str, f: impl FnOnce() -> R) -> Option<R> {
        match catch_fault(operator, f) {
            Ok(r) => Some(r),
            Err(e) => {
                self.error(e);
                None
            }
        }
    }

    /// Upstream subscriber passing everything through unchanged.
    pub(crate) fn forward(&self) -> Subscriber<T> {
        let o = self.clone();
        self.relay(move |v| o.next(v))
    }

    /// Upstream subscriber with a custom `next`; errors and completion are
    /// forwarded as they are. The upstream gets a child token of this subscriber.
    pub(crate) fn relay<U>(&self, next: impl FnMut(U) + Send + 'static) -> Subscriber<U> {
        let oe = self.clone();
        let oc = self.clone();
        self.upstream(next, move |e| oe.error(e), move || oc.complete())
    }

    /// Upstream subscriber with all three callbacks supplied by the operator.
    pub(crate) fn upstream<U>(
        &self,
        next: impl FnMut(U) + Send + 'static,
        error: impl FnMut(SharedError) + Send + 'static,
        complete: impl FnMut() + Send + 'static,
    ) -> Subscriber<U> {
        Subscriber::new(next, error, complete).with_token(self.token.child())
    }
}

/// Enumeration representing different types of handles used to await
/// asynchronous producers.
pub enum SubscriptionHandle {
    /// No specific handle for task or thread awaiting.
    Nil,

    /// Holds a join handle for awaiting an asynchronous observable using Tokio task.
    JoinTask(JoinHandle<()>),

    /// Holds a join handle for awaiting an asynchronous observable using OS thread.
    JoinThread(ThreadJoinHandle<()>),
}

/// Represents a subscription to an observable or a subject, allowing control over
/// the subscription.
///
/// `dispose` is idempotent. Dropping a `Subscription` does not dispose it; keep it
/// (or put it into a [`DisposeBag`]) and dispose explicitly.
pub struct Subscription {
    pub(crate) unsubscribe_logic: UnsubscribeLogic,
    pub(crate) subscription_future: SubscriptionHandle,
    pub(crate) runtime_handle: Option<runtime::Handle>,
    disposed: bool,
}

impl Subscription {
    /// Creates a new Subscription instance with the specified unsubscribe logic and
    /// subscription handle.
    #[must_use]
    pub fn new(
        unsubscribe_logic: UnsubscribeLogic,
        subscription_future: SubscriptionHandle,
    ) -> Self {
        Subscription {
            unsubscribe_logic,
            subscription_future,
            runtime_handle: runtime::Handle::try_current().ok(),
            disposed: false,
        }
    }

    /// Subscription with nothing to release.
    #[must_use]
    pub fn nil() -> Self {
        Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::Nil)
    }

    /// Subscription whose disposal runs `f` once.
    #[must_use]
    pub fn from_logic(f: impl FnOnce() + Send + 'static) -> Self {
        Subscription::new(UnsubscribeLogic::Logic(Box::new(f)), SubscriptionHandle::Nil)
    }

    /// Releases the subscription. Calling it again has no further effect.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let logic = std::mem::replace(&mut self.unsubscribe_logic, UnsubscribeLogic::Nil);
        logic.unsubscribe(self.runtime_handle.as_ref());
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Hands the subscription over to `bag`, which disposes it with the others.
    pub fn disposed_by(self, bag: &DisposeBag) {
        bag.insert(self);
    }

    pub(crate) fn take_handle(&mut self) -> SubscriptionHandle {
        std::mem::replace(&mut self.subscription_future, SubscriptionHandle::Nil)
    }

    /// Awaits the completion of the asynchronous task or thread associated with
    /// this subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if joining a thread or awaiting a task used by the
    /// observable fails.
    pub async fn join_concurrent(self) -> Result<(), Box<dyn Any + Send>> {
        match self.subscription_future {
            SubscriptionHandle::JoinTask(task_handle) => task_handle
                .await
                .map_err(|e| Box::new(e) as Box<dyn Any + Send>),
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::Nil => Ok(()),
        }
    }

    /// Blocks until the OS thread associated with this subscription finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread panicked, or if the producer runs on a tokio
    /// task, which can only be awaited with [`join_concurrent`](Self::join_concurrent).
    pub fn join(self) -> Result<(), Box<dyn Any + Send>> {
        match self.subscription_future {
            SubscriptionHandle::JoinThread(thread_handle) => thread_handle.join(),
            SubscriptionHandle::Nil => Ok(()),
            SubscriptionHandle::JoinTask(_) => Err(Box::new(
                "producer runs on a tokio task, use `join_concurrent().await` instead",
            )),
        }
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(mut self) {
        self.dispose();
    }
}

/// Enumerates various unsubscribe logic options for a subscription.
pub enum UnsubscribeLogic {
    /// No specific unsubscribe logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Unsubscribe logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Asynchronous unsubscribe logic represented by a future, spawned on the tokio
    /// runtime that was current when the subscription was created.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl UnsubscribeLogic {
    fn unsubscribe(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            UnsubscribeLogic::Nil => (),
            UnsubscribeLogic::Logic(fnc) => fnc(),
            UnsubscribeLogic::Wrapped(subscription) => subscription.unsubscribe(),
            UnsubscribeLogic::Future(future) => {
                let handle = runtime_handle
                    .cloned()
                    .or_else(|| runtime::Handle::try_current().ok());
                match handle {
                    Some(handle) => {
                        handle.spawn(future);
                    }
                    None => tracing::warn!(
                        "future unsubscribe logic dropped, no tokio runtime available"
                    ),
                }
            }
        }
    }
}
