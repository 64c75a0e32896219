//! Incoming stanza handler registry.
//!
//! Handlers are matched against every incoming stanza on the connection's
//! receive loop. A handler returning [`HandlerResult::Continue`] stays
//! registered; [`HandlerResult::Remove`] deregisters it.
//!
//! ## Dispatch order
//!
//! ```text
//! stanza ──> handler #1 ──> handler #2 ──> ... (registration order)
//!              │               │
//!              └─ Remove ──> dropped before the next handler runs
//! ```
//!
//! Everything here runs on the single receive-loop thread. Handlers may
//! register or delete other handlers while being dispatched: additions take
//! effect from the next stanza, deletions immediately.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use minidom::Element;
use tracing::{debug, instrument, trace};

use crate::stanzas::bare_jid;

/// Opaque handle to a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// What a handler wants done with itself after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerResult {
    /// Keep the handler registered.
    Continue,
    /// Deregister the handler.
    Remove,
}

/// Callback invoked for each matching stanza.
pub type StanzaHandler = Box<dyn FnMut(&Element) -> HandlerResult>;

/// Filter deciding which stanzas reach a handler.
///
/// Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerMatcher {
    /// Namespace of the stanza or of one of its direct children.
    pub ns: Option<String>,
    /// Stanza element name (`iq`, `message`, `presence`).
    pub name: Option<String>,
    /// Value of the `type` attribute.
    pub stanza_type: Option<String>,
    /// Value of the `id` attribute.
    pub id: Option<String>,
    /// Sender address.
    pub from: Option<String>,
    /// Compare sender addresses in their bare form.
    pub match_bare: bool,
}

impl HandlerMatcher {
    /// Create a matcher that accepts every stanza.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match on namespace.
    pub fn with_ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    /// Match on stanza name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Match on stanza type.
    pub fn with_type(mut self, stanza_type: impl Into<String>) -> Self {
        self.stanza_type = Some(stanza_type.into());
        self
    }

    /// Match on stanza id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Match on sender, if one is given.
    pub fn with_from(mut self, from: Option<impl Into<String>>) -> Self {
        self.from = from.map(Into::into);
        self
    }

    /// Compare senders by bare JID.
    pub fn match_bare(mut self, enabled: bool) -> Self {
        self.match_bare = enabled;
        self
    }

    /// Check whether `stanza` satisfies every set criterion.
    pub fn matches(&self, stanza: &Element) -> bool {
        if let Some(ref ns) = self.ns {
            let in_ns = stanza.ns() == *ns || stanza.children().any(|c| c.ns() == *ns);
            if !in_ns {
                return false;
            }
        }

        if let Some(ref name) = self.name {
            if stanza.name() != name {
                return false;
            }
        }

        if let Some(ref stanza_type) = self.stanza_type {
            if stanza.attr("type") != Some(stanza_type.as_str()) {
                return false;
            }
        }

        if let Some(ref id) = self.id {
            if stanza.attr("id") != Some(id.as_str()) {
                return false;
            }
        }

        if let Some(ref from) = self.from {
            let Some(sender) = stanza.attr("from") else {
                return false;
            };
            let same = if self.match_bare {
                bare_jid(sender) == bare_jid(from)
            } else {
                sender == from
            };
            if !same {
                return false;
            }
        }

        true
    }
}

/// Registry of incoming-stanza handlers.
///
/// Implemented by the connection layer; [`StanzaHandlers`] is the in-memory
/// implementation shipped with this crate.
pub trait HandlerRegistry {
    /// Register a handler. Handlers run in registration order.
    fn add_handler(&self, matcher: HandlerMatcher, handler: StanzaHandler) -> HandlerId;

    /// Deregister a handler. Returns false if it was not registered.
    fn delete_handler(&self, id: HandlerId) -> bool;

    /// Check whether a handler is still registered.
    fn contains(&self, id: HandlerId) -> bool;
}

struct Entry {
    id: HandlerId,
    matcher: HandlerMatcher,
    handler: RefCell<StanzaHandler>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    handlers: Vec<Rc<Entry>>,
}

/// In-memory handler registry.
///
/// Cloning yields another handle to the same table, which is how handlers
/// register follow-up handlers from inside a dispatch.
///
/// Dispatch walks a snapshot of the table taken when the stanza arrives, so
/// the table itself is never borrowed while a handler runs. A dispatch
/// started from inside a handler sees the live table; the running handler
/// is skipped there.
#[derive(Clone, Default)]
pub struct StanzaHandlers {
    inner: Rc<RefCell<Inner>>,
}

impl StanzaHandlers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a handler is still registered.
    pub fn contains(&self, id: HandlerId) -> bool {
        self.inner.borrow().handlers.iter().any(|e| e.id == id)
    }

    fn remove(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.handlers.len();
        inner.handlers.retain(|e| e.id != id);
        inner.handlers.len() != before
    }

    /// Run every matching handler against an incoming stanza.
    ///
    /// Returns the number of handlers invoked.
    #[instrument(skip_all, fields(name = %stanza.name(), id = ?stanza.attr("id")))]
    pub fn dispatch(&self, stanza: &Element) -> usize {
        let snapshot = self.inner.borrow().handlers.clone();
        let mut invoked = 0;

        for entry in snapshot {
            if !self.contains(entry.id) || !entry.matcher.matches(stanza) {
                continue;
            }

            let Ok(mut handler) = entry.handler.try_borrow_mut() else {
                trace!(handler = %entry.id, "Handler already running, skipped");
                continue;
            };
            invoked += 1;
            let result = (&mut *handler)(stanza);
            drop(handler);

            if result == HandlerResult::Remove && self.remove(entry.id) {
                debug!(handler = %entry.id, "Handler removed itself");
            }
        }

        trace!(invoked, remaining = self.len(), "Dispatch complete");
        invoked
    }
}

impl HandlerRegistry for StanzaHandlers {
    #[instrument(skip(self, handler))]
    fn add_handler(&self, matcher: HandlerMatcher, handler: StanzaHandler) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = HandlerId(inner.next_id);
        debug!(handler = %id, "Registering handler");
        inner.handlers.push(Rc::new(Entry {
            id,
            matcher,
            handler: RefCell::new(handler),
        }));
        id
    }

    #[instrument(skip(self))]
    fn delete_handler(&self, id: HandlerId) -> bool {
        let found = self.remove(id);
        debug!(found, "Deleting handler");
        found
    }

    fn contains(&self, id: HandlerId) -> bool {
        StanzaHandlers::contains(self, id)
    }
}

impl<R: HandlerRegistry + ?Sized> HandlerRegistry for Rc<R> {
    fn add_handler(&self, matcher: HandlerMatcher, handler: StanzaHandler) -> HandlerId {
        (**self).add_handler(matcher, handler)
    }

    fn delete_handler(&self, id: HandlerId) -> bool {
        (**self).delete_handler(id)
    }

    fn contains(&self, id: HandlerId) -> bool {
        (**self).contains(id)
    }
}
