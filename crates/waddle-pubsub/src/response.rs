//! Typed view over a PubSub IQ response.

use minidom::Element;
use tracing::debug;
use waddle_xmpp_xep_dataforms::{DataForm, NS_DATA_FORMS};

use crate::stanzas::{PubSubItem, DISCO_ITEMS_NS};
use crate::subscriptions::{resolve_sub_ids, Subscription};

/// Item advertised in a disco#items result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoItem {
    /// JID of the item
    pub jid: String,
    /// Optional name (human-readable)
    pub name: Option<String>,
    /// Optional node identifier
    pub node: Option<String>,
}

impl DiscoItem {
    /// Pubsub item id. Services listing a node's items put the id in `name`.
    pub fn item_id(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A response to a PubSub request, as handed to completion callbacks.
///
/// Error responses are not interpreted; use [`PubSubResponse::error`] to
/// inspect the raw `<error/>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct PubSubResponse {
    stanza: Element,
}

impl PubSubResponse {
    /// Wrap a received stanza.
    pub fn new(stanza: Element) -> Self {
        Self { stanza }
    }

    /// The underlying stanza.
    pub fn stanza(&self) -> &Element {
        &self.stanza
    }

    /// Unwrap the underlying stanza.
    pub fn into_element(self) -> Element {
        self.stanza
    }

    /// The `type` attribute (`result`, `error`, ...).
    pub fn stanza_type(&self) -> Option<&str> {
        self.stanza.attr("type")
    }

    /// The request id this response answers.
    pub fn id(&self) -> Option<&str> {
        self.stanza.attr("id")
    }

    /// The service that sent the response.
    pub fn service(&self) -> Option<&str> {
        self.stanza.attr("from")
    }

    /// True for `type='result'`.
    pub fn is_result(&self) -> bool {
        self.stanza_type() == Some("result")
    }

    /// True for `type='error'`.
    pub fn is_error(&self) -> bool {
        self.stanza_type() == Some("error")
    }

    /// The `<error/>` child of an error response.
    pub fn error(&self) -> Option<&Element> {
        self.stanza.children().find(|c| c.name() == "error")
    }

    fn pubsub(&self) -> Option<&Element> {
        self.stanza.children().find(|c| c.name() == "pubsub")
    }

    fn pubsub_children<'a>(&'a self, names: &'a [&'a str]) -> impl Iterator<Item = &'a Element> {
        self.pubsub()
            .into_iter()
            .flat_map(|p| p.children())
            .filter(move |c| names.contains(&c.name()))
    }

    /// Items of a `<publish/>` or `<items/>` result.
    pub fn items(&self) -> Vec<PubSubItem> {
        self.pubsub_children(&["publish", "items"])
            .flat_map(|c| c.children())
            .filter(|c| c.name() == "item")
            .map(PubSubItem::from_element)
            .collect()
    }

    /// Node named by the `<publish/>`, `<items/>` or `<subscriptions/>`
    /// child, or the empty string.
    pub fn node(&self) -> &str {
        self.pubsub_children(&["publish", "items", "subscriptions"])
            .find_map(|c| c.attr("node"))
            .unwrap_or("")
    }

    /// Every record of a subscriptions listing.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.pubsub_children(&["subscriptions"])
            .flat_map(|c| c.children())
            .filter(|c| c.name() == "subscription")
            .map(Subscription::from_element)
            .collect()
    }

    /// Subscription ids held by `jid` on `node`. Empty unless this is a
    /// `result`.
    pub fn sub_ids(&self, node: &str, jid: &str, exact_match: bool) -> Vec<String> {
        if !self.is_result() {
            return Vec::new();
        }
        resolve_sub_ids(&self.subscriptions(), node, jid, exact_match)
    }

    /// The data form carried under `<options/>` or `<configure/>`.
    pub fn form(&self) -> Option<DataForm> {
        let x = self
            .pubsub_children(&["options", "configure"])
            .flat_map(|c| c.children())
            .find(|c| c.name() == "x" && c.ns() == NS_DATA_FORMS)?;

        match DataForm::from_element(x) {
            Ok(form) => Some(form),
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable form in response");
                None
            }
        }
    }

    /// Items listed in a disco#items result.
    pub fn disco_items(&self) -> Vec<DiscoItem> {
        self.stanza
            .children()
            .filter(|c| c.name() == "query" && c.ns() == DISCO_ITEMS_NS)
            .flat_map(|q| q.children())
            .filter(|c| c.name() == "item")
            .filter_map(|item| {
                Some(DiscoItem {
                    jid: item.attr("jid")?.to_string(),
                    name: item.attr("name").map(String::from),
                    node: item.attr("node").map(String::from),
                })
            })
            .collect()
    }
}

impl From<Element> for PubSubResponse {
    fn from(stanza: Element) -> Self {
        Self::new(stanza)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(xml: &str) -> PubSubResponse {
        PubSubResponse::new(xml.parse().expect("valid XML"))
    }

    #[test]
    fn test_items_result() {
        let resp = response(
            r#"<iq xmlns='jabber:client' type='result' from='pubsub.example.com' id='i1'>
                <pubsub xmlns='http://jabber.org/protocol/pubsub'>
                    <items node='news'>
                        <item id='a'><entry xmlns='http://www.w3.org/2005/Atom'/></item>
                        <item id='b'/>
                    </items>
                </pubsub>
            </iq>"#,
        );

        assert!(resp.is_result());
        assert_eq!(resp.service(), Some("pubsub.example.com"));
        assert_eq!(resp.node(), "news");

        let items = resp.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id.as_deref(), Some("a"));
        assert!(items[0].payload.is_some());
        assert!(items[1].payload.is_none());
    }

    #[test]
    fn test_publish_result_item_ids() {
        let resp = response(
            r#"<iq xmlns='jabber:client' type='result' id='p1'>
                <pubsub xmlns='http://jabber.org/protocol/pubsub'>
                    <publish node='news'><item id='generated-1'/></publish>
                </pubsub>
            </iq>"#,
        );

        assert_eq!(resp.node(), "news");
        assert_eq!(resp.items()[0].id.as_deref(), Some("generated-1"));
    }

    #[test]
    fn test_empty_result_degrades() {
        let resp = response("<iq xmlns='jabber:client' type='result' id='x'/>");
        assert_eq!(resp.node(), "");
        assert!(resp.items().is_empty());
        assert!(resp.subscriptions().is_empty());
        assert!(resp.form().is_none());
    }

    #[test]
    fn test_sub_ids_only_for_results() {
        let listing = r#"<pubsub xmlns='http://jabber.org/protocol/pubsub'>
                <subscriptions>
                    <subscription node='n1' jid='u@d/r' subid='A' subscription='subscribed'/>
                    <subscription node='n1' jid='u@d' subid='B' subscription='subscribed'/>
                </subscriptions>
            </pubsub>"#;

        let ok = response(&format!(
            "<iq xmlns='jabber:client' type='result' id='s'>{listing}</iq>"
        ));
        assert_eq!(ok.subscriptions().len(), 2);
        assert_eq!(ok.sub_ids("n1", "u@d/r", false), vec!["A", "B"]);
        assert_eq!(ok.sub_ids("n1", "u@d/r", true), vec!["A"]);

        let err = response(&format!(
            "<iq xmlns='jabber:client' type='error' id='s'>{listing}</iq>"
        ));
        assert!(err.sub_ids("n1", "u@d/r", false).is_empty());
    }

    #[test]
    fn test_error_passthrough() {
        let resp = response(
            r#"<iq xmlns='jabber:client' type='error' id='e1'>
                <error type='cancel'>
                    <item-not-found xmlns='urn:ietf:params:xml:ns:xmpp-stanzas'/>
                </error>
            </iq>"#,
        );

        assert!(resp.is_error());
        let error = resp.error().expect("error child");
        assert_eq!(error.attr("type"), Some("cancel"));
    }

    #[test]
    fn test_form_under_options_and_configure() {
        for parent in ["options", "configure"] {
            let resp = response(&format!(
                r#"<iq xmlns='jabber:client' type='result' id='f'>
                    <pubsub xmlns='http://jabber.org/protocol/pubsub#owner'>
                        <{parent} node='news'>
                            <x xmlns='jabber:x:data' type='form'>
                                <field var='pubsub#deliver' type='boolean'><value>1</value></field>
                            </x>
                        </{parent}>
                    </pubsub>
                </iq>"#
            ));

            let form = resp.form().expect("form");
            assert_eq!(
                form.field("pubsub#deliver").unwrap().content.value.as_bool(),
                Some(true)
            );
        }
    }

    #[test]
    fn test_disco_items() {
        let resp = response(
            r#"<iq xmlns='jabber:client' type='result' id='d'>
                <query xmlns='http://jabber.org/protocol/disco#items'>
                    <item jid='pubsub.example.com' node='news' name='News'/>
                    <item jid='pubsub.example.com' node='blogs'/>
                    <item name='no jid'/>
                </query>
            </iq>"#,
        );

        let items = resp.disco_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].node.as_deref(), Some("news"));
        assert_eq!(items[0].name.as_deref(), Some("News"));
        assert_eq!(items[0].item_id(), Some("News"));
        assert!(items[1].name.is_none());
    }
}
