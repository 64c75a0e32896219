//! XEP-0060: Publish-Subscribe client
//!
//! Issues PubSub requests over a caller-supplied [`StanzaTransport`] and
//! routes responses and event notifications through a [`HandlerRegistry`].
//!
//! ## Flow
//!
//! ```text
//! PubSubClient::publish ──> StanzaTransport::send(<iq id='…:publishnode'/>)
//!        │
//!        └─ one-shot handler on id ──> ResponseCallback(PubSubResponse)
//!
//! <message><event/></message> ──> StanzaHandlers::dispatch
//!                                      └─ notification handlers ──> NotificationEvent
//! ```
//!
//! Everything runs on the connection's receive loop; nothing here blocks or
//! spawns.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use minidom::Element;
//! use waddle_pubsub::{PubSubClient, PubSubConfig, PubSubError, StanzaHandlers, StanzaTransport};
//!
//! #[derive(Default)]
//! struct Outbox(RefCell<Vec<Element>>);
//!
//! impl StanzaTransport for Outbox {
//!     fn send(&self, stanza: Element) -> Result<(), PubSubError> {
//!         self.0.borrow_mut().push(stanza);
//!         Ok(())
//!     }
//! }
//!
//! let outbox = Rc::new(Outbox::default());
//! let handlers = StanzaHandlers::new();
//! let client = PubSubClient::new(
//!     Rc::clone(&outbox),
//!     handlers.clone(),
//!     PubSubConfig::new("alice@example.com/desk"),
//! );
//!
//! let id = client
//!     .request_items("pubsub.example.com", "news", &Default::default(), None)
//!     .unwrap();
//! assert!(id.ends_with(":requestItems"));
//! assert_eq!(outbox.0.borrow().len(), 1);
//! ```

pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod handlers;
pub mod node;
pub mod notification;
pub mod response;
pub mod stanzas;
pub mod subscriptions;
pub mod transport;

pub use client::{Owner, PubSubClient};
pub use config::{load_config_from, load_config_from_str, ConfigError, PubSubConfig};
pub use correlator::{send_request, ResponseCallback};
pub use error::PubSubError;
pub use handlers::{
    HandlerId, HandlerMatcher, HandlerRegistry, HandlerResult, StanzaHandler, StanzaHandlers,
};
pub use node::{
    config_keys, subscribe_keys, AccessModel, FormOptions, NodeConfig, PublishModel,
    SendLastPublishedItem,
};
pub use notification::{
    add_notification_handler, delete_notification_handler, NotificationCallback,
    NotificationEvent, NotificationFilter,
};
pub use response::{DiscoItem, PubSubResponse};
pub use stanzas::{
    bare_jid, option, ItemsQuery, PubSubItem, DISCO_ITEMS_NS, NS_PUBSUB, NS_PUBSUB_ERRORS,
    NS_PUBSUB_EVENT, NS_PUBSUB_NODE_CONFIG, NS_PUBSUB_OWNER, NS_PUBSUB_PUBLISH_OPTIONS,
    NS_PUBSUB_SUBSCRIBE_OPTIONS,
};
pub use subscriptions::{resolve_sub_ids, Subscription};
pub use transport::StanzaTransport;
