//! Before-init registry module
//!
//! One-shot initialization hooks keyed by namespace (the first path segment).
//! A hook runs the first time a request reaches its namespace; requests that
//! arrive while it is still running wait for it, and once its [`Done`]
//! continuation fires the hook is gone for good.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::logger;
use crate::routing::namespace_of;

/// What to run after initialization
pub type Continuation = Box<dyn FnOnce() + Send>;

/// A one-shot init hook; must eventually call [`Done::run`]
pub type BeforeHook = Box<dyn FnOnce(Done) + Send>;

enum Slot {
    Pending(BeforeHook),
    /// Hook taken and running; continuations queued behind it
    Running(Vec<Continuation>),
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// Per-namespace hook registry
#[derive(Clone, Default)]
pub struct BeforeRegistry {
    slots: Slots,
}

impl BeforeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `hook` for `namespace`, replacing one that has not fired yet
    pub fn register(&self, namespace: &str, hook: BeforeHook) {
        let mut slots = lock(&self.slots);
        if matches!(slots.get(namespace), Some(Slot::Running(_))) {
            logger::log_warning(&format!(
                "Before hook for '{namespace}' is already running, ignoring new registration"
            ));
            return;
        }
        slots.insert(namespace.to_string(), Slot::Pending(hook));
    }

    /// Run the pending hook for `path`'s namespace (if any), then `next`.
    ///
    /// Paths without a namespace, like `/`, never have a hook.
    pub fn run(&self, path: &str, next: Continuation) {
        let Some(namespace) = namespace_of(path) else {
            next();
            return;
        };

        let hook = {
            let mut slots = lock(&self.slots);
            match slots.remove(namespace) {
                None => None,
                Some(Slot::Running(mut waiting)) => {
                    waiting.push(next);
                    slots.insert(namespace.to_string(), Slot::Running(waiting));
                    return;
                }
                Some(Slot::Pending(hook)) => {
                    slots.insert(namespace.to_string(), Slot::Running(Vec::new()));
                    Some(hook)
                }
            }
        };

        match hook {
            None => next(),
            Some(hook) => hook(Done {
                slots: Arc::clone(&self.slots),
                namespace: namespace.to_string(),
                next: Some(next),
            }),
        }
    }
}

impl fmt::Debug for BeforeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = lock(&self.slots);
        let mut namespaces: Vec<(&String, &str)> = slots
            .iter()
            .map(|(namespace, slot)| {
                let state = match slot {
                    Slot::Pending(_) => "pending",
                    Slot::Running(_) => "running",
                };
                (namespace, state)
            })
            .collect();
        namespaces.sort_unstable();
        f.debug_struct("BeforeRegistry")
            .field("namespaces", &namespaces)
            .finish()
    }
}

/// Continuation passed to a before hook.
///
/// Running it resumes the request that triggered the hook, deletes the hook,
/// and releases any requests queued while it ran.
///
/// The triggering request and every queued one run their handler on the
/// thread that calls [`Done::run`]. Call it from a task on the server's
/// runtime (for example inside `tokio::spawn`) if handlers use Tokio APIs.
///
/// Dropping it without running abandons the initialization: the slot is
/// removed, the triggering and queued requests are dropped (they end when
/// their connection times out), and later requests to the namespace run
/// without a hook.
pub struct Done {
    slots: Slots,
    namespace: String,
    /// `None` once run
    next: Option<Continuation>,
}

impl Done {
    pub fn run(mut self) {
        if let Some(next) = self.next.take() {
            next();
        }

        for next in self.release() {
            next();
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Remove the namespace slot, returning the requests queued behind it
    fn release(&self) -> Vec<Continuation> {
        let slot = lock(&self.slots).remove(&self.namespace);
        match slot {
            Some(Slot::Running(waiting)) => waiting,
            _ => Vec::new(),
        }
    }
}

impl Drop for Done {
    fn drop(&mut self) {
        if self.next.is_none() {
            return;
        }

        let abandoned = self.release().len() + 1;
        logger::log_warning(&format!(
            "Before hook for '{}' finished without running its continuation, dropping {abandoned} waiting request(s)",
            self.namespace
        ));
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}
