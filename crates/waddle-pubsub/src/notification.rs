//! Notification dispatch.
//!
//! A notification handler watches incoming `<message/>` stanzas carrying a
//! pubsub `<event/>` and fires for every `<items/>` or `<purge/>` child whose
//! node matches its filter:
//!
//! ```xml
//! <message from='pubsub.example.com' to='alice@example.com'>
//!   <event xmlns='http://jabber.org/protocol/pubsub#event'>
//!     <items node='news'>
//!       <item id='a' publisher='bob@example.com'>...</item>
//!       <retract id='b'/>
//!     </items>
//!   </event>
//! </message>
//! ```
//!
//! Renewing handlers stay registered until deleted, and fire once per
//! matching child, so a message carrying two `<items node='news'/>` blocks
//! invokes a `news` handler twice, unless the first call deletes the
//! handler. One-off handlers fire for the first matching child only and are
//! then removed.

use std::cell::Cell;
use std::rc::Rc;

use minidom::Element;
use tracing::{debug, instrument};

use crate::handlers::{HandlerId, HandlerMatcher, HandlerRegistry, HandlerResult};
use crate::stanzas::{PubSubItem, NS_PUBSUB_EVENT};

/// Callback receiving matched notifications.
pub type NotificationCallback = Box<dyn FnMut(&NotificationEvent)>;

/// View over an event message.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    stanza: Element,
}

impl NotificationEvent {
    /// Wrap a received message.
    pub fn new(stanza: Element) -> Self {
        Self { stanza }
    }

    /// The underlying `<message/>`.
    pub fn stanza(&self) -> &Element {
        &self.stanza
    }

    /// The service that sent the notification.
    pub fn service(&self) -> Option<&str> {
        self.stanza.attr("from")
    }

    fn event_children(&self) -> impl Iterator<Item = &Element> {
        self.stanza
            .children()
            .filter(|c| c.name() == "event")
            .flat_map(|e| e.children())
    }

    /// Node of the first `<items/>` or `<purge/>` block, or the empty string.
    pub fn node(&self) -> &str {
        self.event_children()
            .filter(|c| c.name() == "items" || c.name() == "purge")
            .find_map(|c| c.attr("node"))
            .unwrap_or("")
    }

    /// Published items, across every `<items/>` block.
    pub fn items(&self) -> Vec<PubSubItem> {
        self.event_children()
            .filter(|c| c.name() == "items")
            .flat_map(|c| c.children())
            .filter(|c| c.name() == "item")
            .map(PubSubItem::from_element)
            .collect()
    }

    /// Ids of retracted items.
    pub fn retractions(&self) -> Vec<String> {
        self.event_children()
            .filter(|c| c.name() == "items")
            .flat_map(|c| c.children())
            .filter(|c| c.name() == "retract")
            .filter_map(|c| c.attr("id").map(String::from))
            .collect()
    }

    /// Whether the message announces a node purge.
    pub fn purged(&self) -> bool {
        self.event_children().any(|c| c.name() == "purge")
    }
}

/// Which event messages a notification handler receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Sending service. `None` accepts any sender.
    pub service: Option<String>,
    /// Node. `None` accepts any node.
    pub node: Option<String>,
    /// Remove the handler after its first match.
    pub oneoff: bool,
    /// Compare the sender by bare JID.
    pub match_bare: bool,
}

impl NotificationFilter {
    /// Match events for `node` on `service`.
    pub fn new(service: Option<&str>, node: Option<&str>) -> Self {
        Self {
            service: service.map(String::from),
            node: node.map(String::from),
            oneoff: false,
            match_bare: true,
        }
    }

    /// Remove the handler after its first match.
    pub fn oneoff(mut self, oneoff: bool) -> Self {
        self.oneoff = oneoff;
        self
    }

    /// Compare the sender by bare JID.
    pub fn match_bare(mut self, match_bare: bool) -> Self {
        self.match_bare = match_bare;
        self
    }

    fn matches_child(&self, child: &Element) -> bool {
        if child.name() != "items" && child.name() != "purge" {
            return false;
        }
        match self.node {
            Some(ref node) => child.attr("node") == Some(node.as_str()),
            None => true,
        }
    }
}

/// Install a notification handler.
#[instrument(skip(registry, callback), fields(service = ?filter.service, node = ?filter.node))]
pub fn add_notification_handler<R>(
    registry: &R,
    filter: NotificationFilter,
    mut callback: NotificationCallback,
) -> HandlerId
where
    R: HandlerRegistry + Clone + 'static,
{
    let matcher = HandlerMatcher::new()
        .with_ns(NS_PUBSUB_EVENT)
        .with_name("message")
        .with_from(filter.service.as_deref())
        .match_bare(filter.match_bare);
    let oneoff = filter.oneoff;
    let own_id: Rc<Cell<Option<HandlerId>>> = Rc::new(Cell::new(None));
    let own = Rc::clone(&own_id);
    let watch = registry.clone();

    let id = registry.add_handler(
        matcher,
        Box::new(move |stanza: &Element| {
            let mut event: Option<NotificationEvent> = None;
            let mut found = false;

            let children = stanza
                .children()
                .filter(|c| c.name() == "event")
                .flat_map(|e| e.children());

            for child in children {
                if !filter.matches_child(child) {
                    continue;
                }
                found = true;
                debug!(node = ?child.attr("node"), kind = %child.name(), "Notification matched");
                let event = &*event.get_or_insert_with(|| NotificationEvent::new(stanza.clone()));
                callback(event);
                if oneoff {
                    break;
                }
                if own.get().is_some_and(|id| !watch.contains(id)) {
                    debug!("Notification handler deleted by its callback");
                    break;
                }
            }

            if found && oneoff {
                HandlerResult::Remove
            } else {
                HandlerResult::Continue
            }
        }),
    );

    own_id.set(Some(id));
    debug!(handler = %id, oneoff, "Notification handler installed");
    id
}

/// Remove a notification handler. Returns false if it was not registered.
pub fn delete_notification_handler<R>(registry: &R, id: HandlerId) -> bool
where
    R: HandlerRegistry + ?Sized,
{
    registry.delete_handler(id)
}
