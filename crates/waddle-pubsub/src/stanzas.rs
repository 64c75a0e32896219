//! PubSub request stanza building.
//!
//! Every client operation maps to exactly one IQ built here. Builders are
//! pure: the caller supplies the request id.

use jid::Jid;
use minidom::Element;
use waddle_xmpp_xep_dataforms::{DataForm, Field, FieldValue, FormType};
use xmpp_parsers::iq::{Iq, IqType};

use crate::node::FormOptions;
use crate::PubSubError;

/// Main PubSub namespace (XEP-0060).
pub const NS_PUBSUB: &str = "http://jabber.org/protocol/pubsub";

/// PubSub event namespace for notifications.
pub const NS_PUBSUB_EVENT: &str = "http://jabber.org/protocol/pubsub#event";

/// PubSub owner namespace for node management.
pub const NS_PUBSUB_OWNER: &str = "http://jabber.org/protocol/pubsub#owner";

/// PubSub errors namespace.
pub const NS_PUBSUB_ERRORS: &str = "http://jabber.org/protocol/pubsub#errors";

/// FORM_TYPE of node configuration forms.
pub const NS_PUBSUB_NODE_CONFIG: &str = "http://jabber.org/protocol/pubsub#node_config";

/// FORM_TYPE of subscription options forms.
pub const NS_PUBSUB_SUBSCRIBE_OPTIONS: &str = "http://jabber.org/protocol/pubsub#subscribe_options";

/// FORM_TYPE of publish options forms.
pub const NS_PUBSUB_PUBLISH_OPTIONS: &str = "http://jabber.org/protocol/pubsub#publish-options";

/// Service discovery items namespace (XEP-0030).
pub const DISCO_ITEMS_NS: &str = "http://jabber.org/protocol/disco#items";

/// Strip the resource from a JID.
///
/// Input that does not parse as a JID is cut at the first `/`.
pub fn bare_jid(jid: &str) -> String {
    match jid.parse::<Jid>() {
        Ok(parsed) => parsed.to_bare().to_string(),
        Err(_) => jid.split('/').next().unwrap_or(jid).to_string(),
    }
}

/// A PubSub item with optional ID and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PubSubItem {
    /// Optional item ID. If None, server generates one.
    pub id: Option<String>,
    /// The item payload (any XML element).
    pub payload: Option<Element>,
    /// Publisher, when the service discloses it.
    pub publisher: Option<String>,
    /// Publication time, when the service includes it.
    pub timestamp: Option<String>,
}

impl PubSubItem {
    /// Create a new PubSubItem with an ID and payload.
    pub fn new(id: Option<String>, payload: Option<Element>) -> Self {
        Self {
            id,
            payload,
            publisher: None,
            timestamp: None,
        }
    }

    /// Create a PubSubItem from a minidom Element.
    pub fn from_element(elem: &Element) -> Self {
        Self {
            id: elem.attr("id").map(String::from),
            payload: elem.children().next().cloned(),
            publisher: elem.attr("publisher").map(String::from),
            timestamp: elem.attr("timestamp").map(String::from),
        }
    }

    /// Build an item element in the given namespace.
    pub fn to_element(&self, ns: &str) -> Element {
        let mut builder = Element::builder("item", ns);

        if let Some(ref id) = self.id {
            builder = builder.attr("id", id);
        }

        if let Some(ref payload) = self.payload {
            builder = builder.append(payload.clone());
        }

        builder.build()
    }
}

/// Build a submit form carrying `options` under the given FORM_TYPE.
pub fn build_options_form(form_type: &str, options: &FormOptions) -> Element {
    let fields: Vec<Field> = options
        .iter()
        .map(|(var, value)| Field::new(var.as_str()).with_value(value.clone()))
        .collect();

    let mut form = DataForm::new(FormType::Submit);
    form.set_form_type(form_type).set_fields(&fields);
    form.into()
}

fn parse_jid(jid: &str) -> Result<Jid, PubSubError> {
    jid.parse::<Jid>()
        .map_err(|e| PubSubError::invalid_jid(jid, e))
}

fn iq(
    service: &str,
    from: Option<&str>,
    id: &str,
    set: bool,
    payload: Element,
) -> Result<Element, PubSubError> {
    let from = from.map(parse_jid).transpose()?;
    let payload = if set {
        IqType::Set(payload)
    } else {
        IqType::Get(payload)
    };

    let iq = Iq {
        from,
        to: Some(parse_jid(service)?),
        id: id.to_string(),
        payload,
    };

    Ok(iq.into())
}

fn pubsub(ns: &str, children: Vec<Element>) -> Element {
    Element::builder("pubsub", ns).append_all(children).build()
}

/// `<create/>` plus a `node_config` form inside `<configure/>`.
pub fn build_create_node(
    service: &str,
    node: &str,
    options: &FormOptions,
    id: &str,
) -> Result<Element, PubSubError> {
    let create = Element::builder("create", NS_PUBSUB)
        .attr("node", node)
        .build();
    let configure = Element::builder("configure", NS_PUBSUB)
        .append(build_options_form(NS_PUBSUB_NODE_CONFIG, options))
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB, vec![create, configure]))
}

/// Owner `<delete/>`.
pub fn build_delete_node(service: &str, node: &str, id: &str) -> Result<Element, PubSubError> {
    let delete = Element::builder("delete", NS_PUBSUB_OWNER)
        .attr("node", node)
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB_OWNER, vec![delete]))
}

/// `<subscribe/>`, with a `subscribe_options` form when options are given.
pub fn build_subscribe(
    service: &str,
    node: &str,
    jid: &str,
    options: &FormOptions,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut children = vec![Element::builder("subscribe", NS_PUBSUB)
        .attr("node", node)
        .attr("jid", jid)
        .build()];

    if !options.is_empty() {
        children.push(
            Element::builder("options", NS_PUBSUB)
                .append(build_options_form(NS_PUBSUB_SUBSCRIBE_OPTIONS, options))
                .build(),
        );
    }

    iq(service, Some(jid), id, true, pubsub(NS_PUBSUB, children))
}

/// `<unsubscribe/>`.
pub fn build_unsubscribe(
    service: &str,
    node: &str,
    jid: &str,
    subid: Option<&str>,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut unsubscribe = Element::builder("unsubscribe", NS_PUBSUB)
        .attr("node", node)
        .attr("jid", jid);
    if let Some(subid) = subid {
        unsubscribe = unsubscribe.attr("subid", subid);
    }

    iq(
        service,
        Some(jid),
        id,
        true,
        pubsub(NS_PUBSUB, vec![unsubscribe.build()]),
    )
}

/// `<options/>` retrieval.
pub fn build_subscription_options(
    service: &str,
    node: &str,
    jid: &str,
    subid: Option<&str>,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut options = Element::builder("options", NS_PUBSUB)
        .attr("node", node)
        .attr("jid", jid);
    if let Some(subid) = subid {
        options = options.attr("subid", subid);
    }

    iq(service, None, id, false, pubsub(NS_PUBSUB, vec![options.build()]))
}

/// `<publish/>` with one `<item/>` per entry, in order.
pub fn build_publish(
    service: &str,
    node: &str,
    items: &[PubSubItem],
    id: &str,
) -> Result<Element, PubSubError> {
    let publish = Element::builder("publish", NS_PUBSUB)
        .attr("node", node)
        .append_all(items.iter().map(|item| item.to_element(NS_PUBSUB)))
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB, vec![publish]))
}

/// `<retract/>` with one `<item id=…/>` per id.
pub fn build_retract(
    service: &str,
    node: &str,
    item_ids: &[&str],
    id: &str,
) -> Result<Element, PubSubError> {
    let retract = Element::builder("retract", NS_PUBSUB)
        .attr("node", node)
        .append_all(
            item_ids
                .iter()
                .map(|item_id| Element::builder("item", NS_PUBSUB).attr("id", *item_id).build()),
        )
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB, vec![retract]))
}

/// Parameters of an `<items/>` retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsQuery {
    /// Subscription the request is made under.
    pub subid: Option<String>,
    /// Specific items to fetch. Empty means all.
    pub item_ids: Vec<String>,
    /// Cap on the number of most recent items returned.
    pub max_items: Option<u32>,
}

impl ItemsQuery {
    /// Fetch every item.
    pub fn all() -> Self {
        Self::default()
    }

    /// Request under a specific subscription.
    pub fn with_subid(mut self, subid: impl Into<String>) -> Self {
        self.subid = Some(subid.into());
        self
    }

    /// Fetch only the listed item.
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_ids.push(item_id.into());
        self
    }

    /// Limit the number of items returned.
    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items = Some(max_items);
        self
    }
}

/// `<items/>` retrieval.
pub fn build_items_request(
    service: &str,
    node: &str,
    query: &ItemsQuery,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut items = Element::builder("items", NS_PUBSUB).attr("node", node);
    if let Some(ref subid) = query.subid {
        items = items.attr("subid", subid);
    }
    if let Some(max_items) = query.max_items {
        items = items.attr("max_items", max_items.to_string());
    }
    let items = items
        .append_all(
            query
                .item_ids
                .iter()
                .map(|item_id| Element::builder("item", NS_PUBSUB).attr("id", item_id).build()),
        )
        .build();

    iq(service, None, id, false, pubsub(NS_PUBSUB, vec![items]))
}

/// Entity `<subscriptions/>` retrieval, optionally scoped to a node.
pub fn build_subscriptions_request(
    service: &str,
    node: Option<&str>,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut subscriptions = Element::builder("subscriptions", NS_PUBSUB);
    if let Some(node) = node {
        subscriptions = subscriptions.attr("node", node);
    }

    iq(
        service,
        None,
        id,
        false,
        pubsub(NS_PUBSUB, vec![subscriptions.build()]),
    )
}

/// disco#items query against the service.
pub fn build_disco_items_request(
    service: &str,
    node: Option<&str>,
    id: &str,
) -> Result<Element, PubSubError> {
    let mut query = Element::builder("query", DISCO_ITEMS_NS);
    if let Some(node) = node {
        query = query.attr("node", node);
    }

    iq(service, None, id, false, query.build())
}

/// Owner `<configure/>` submitting a `node_config` form.
pub fn build_configure(
    service: &str,
    node: &str,
    options: &FormOptions,
    id: &str,
) -> Result<Element, PubSubError> {
    let configure = Element::builder("configure", NS_PUBSUB_OWNER)
        .attr("node", node)
        .append(build_options_form(NS_PUBSUB_NODE_CONFIG, options))
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB_OWNER, vec![configure]))
}

/// Owner `<configure/>` retrieval.
pub fn build_configuration_request(
    service: &str,
    node: &str,
    id: &str,
) -> Result<Element, PubSubError> {
    let configure = Element::builder("configure", NS_PUBSUB_OWNER)
        .attr("node", node)
        .build();

    iq(service, None, id, false, pubsub(NS_PUBSUB_OWNER, vec![configure]))
}

/// Owner `<subscriptions/>` retrieval.
pub fn build_owner_subscriptions_request(
    service: &str,
    node: &str,
    id: &str,
) -> Result<Element, PubSubError> {
    let subscriptions = Element::builder("subscriptions", NS_PUBSUB_OWNER)
        .attr("node", node)
        .build();

    iq(
        service,
        None,
        id,
        false,
        pubsub(NS_PUBSUB_OWNER, vec![subscriptions]),
    )
}

/// Owner `<purge/>`.
pub fn build_purge(service: &str, node: &str, id: &str) -> Result<Element, PubSubError> {
    let purge = Element::builder("purge", NS_PUBSUB_OWNER)
        .attr("node", node)
        .build();

    iq(service, None, id, true, pubsub(NS_PUBSUB_OWNER, vec![purge]))
}

/// Wrap a single option value for a [`FormOptions`] list.
pub fn option(name: &str, value: impl Into<FieldValue>) -> (String, FieldValue) {
    (name.to_string(), value.into())
}
