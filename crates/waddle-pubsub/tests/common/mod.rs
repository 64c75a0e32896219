//! Test utilities for driving the PubSub client without a connection.
//!
//! A recording transport captures outgoing requests, and the in-memory
//! handler registry plays the role of the receive loop.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use minidom::Element;
use waddle_pubsub::{PubSubClient, PubSubConfig, PubSubError, StanzaHandlers, StanzaTransport};

/// Session JID used by the harness.
pub const SESSION_JID: &str = "alice@example.com/desk";

/// Service addressed by the harness.
pub const SERVICE: &str = "pubsub.example.com";

pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    });
}

/// Transport that records every stanza and numbers request ids.
#[derive(Default)]
pub struct RecordingTransport {
    sent: RefCell<Vec<Element>>,
    counter: Cell<u32>,
    fail: Cell<bool>,
}

impl RecordingTransport {
    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail.set(true);
    }

    pub fn sent(&self) -> Vec<Element> {
        self.sent.borrow().clone()
    }

    pub fn last_sent(&self) -> Element {
        self.sent
            .borrow()
            .last()
            .cloned()
            .expect("a stanza was sent")
    }
}

impl StanzaTransport for RecordingTransport {
    fn send(&self, stanza: Element) -> Result<(), PubSubError> {
        if self.fail.get() {
            return Err(PubSubError::transport("stream closed"));
        }
        self.sent.borrow_mut().push(stanza);
        Ok(())
    }

    fn unique_id(&self, suffix: &str) -> String {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        format!("{n}:{suffix}")
    }
}

/// A client wired to a recording transport and an in-memory registry.
pub struct Harness {
    pub transport: Rc<RecordingTransport>,
    pub handlers: StanzaHandlers,
    pub client: PubSubClient<Rc<RecordingTransport>, StanzaHandlers>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PubSubConfig::new(SESSION_JID))
    }

    pub fn with_config(config: PubSubConfig) -> Self {
        init_tracing();
        let transport = Rc::new(RecordingTransport::default());
        let handlers = StanzaHandlers::new();
        let client = PubSubClient::new(Rc::clone(&transport), handlers.clone(), config);
        Self {
            transport,
            handlers,
            client,
        }
    }

    /// Feed an incoming stanza to the registry. Returns the number of
    /// handlers invoked.
    pub fn receive(&self, xml: &str) -> usize {
        let stanza: Element = xml.parse().expect("valid XML");
        self.handlers.dispatch(&stanza)
    }
}

/// An empty `result` answering `id`.
pub fn empty_result(id: &str) -> String {
    format!("<iq xmlns='jabber:client' type='result' from='{SERVICE}' id='{id}'/>")
}

/// An `error` answering `id`.
pub fn error_result(id: &str) -> String {
    format!(
        "<iq xmlns='jabber:client' type='error' from='{SERVICE}' id='{id}'>\
           <error type='cancel'>\
             <item-not-found xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/>\
           </error>\
         </iq>"
    )
}

/// An event message with one `<items/>` block per node in `nodes`.
pub fn items_event(nodes: &[&str]) -> String {
    let blocks: String = nodes
        .iter()
        .map(|node| format!("<items node='{node}'><item id='{node}-1'/></items>"))
        .collect();
    format!(
        "<message xmlns='jabber:client' from='{SERVICE}' to='{SESSION_JID}'>\
           <event xmlns='http://jabber.org/protocol/pubsub#event'>{blocks}</event>\
         </message>"
    )
}
