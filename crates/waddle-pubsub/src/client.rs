//! XEP-0060 client operations.
//!
//! Each operation builds one request, registers at most one response
//! handler keyed on a fresh request id, sends the request and returns the
//! id. Responses reach the optional [`ResponseCallback`] as a
//! [`PubSubResponse`].

use minidom::Element;
use tracing::{debug, instrument};

use crate::config::PubSubConfig;
use crate::correlator::{send_request, ResponseCallback};
use crate::handlers::{HandlerId, HandlerRegistry};
use crate::node::FormOptions;
use crate::notification::{
    add_notification_handler, delete_notification_handler, NotificationCallback,
    NotificationFilter,
};
use crate::response::PubSubResponse;
use crate::stanzas::{self, ItemsQuery, PubSubItem};
use crate::transport::StanzaTransport;
use crate::PubSubError;

/// PubSub client bound to one connection.
///
/// The transport sends requests; the registry receives their responses and
/// any event notifications.
pub struct PubSubClient<T, R> {
    transport: T,
    registry: R,
    config: PubSubConfig,
}

impl<T, R> PubSubClient<T, R>
where
    T: StanzaTransport,
    R: HandlerRegistry + Clone + 'static,
{
    /// Bind a client to a connection's transport and handler registry.
    pub fn new(transport: T, registry: R, config: PubSubConfig) -> Self {
        Self {
            transport,
            registry,
            config,
        }
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    /// Transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registry receiving responses and notifications.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    fn jid_or_session<'a>(&'a self, jid: Option<&'a str>) -> &'a str {
        jid.unwrap_or(&self.config.client.jid)
    }

    fn request<F>(
        &self,
        suffix: &str,
        build: F,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError>
    where
        F: FnOnce(&str) -> Result<Element, PubSubError>,
    {
        let id = self.transport.unique_id(suffix);
        let stanza = build(&id)?;
        send_request(&self.transport, &self.registry, id, stanza, callback)
    }

    /// Create `node`, submitting `options` as its configuration.
    #[instrument(skip(self, options, callback))]
    pub fn create_node(
        &self,
        service: &str,
        node: &str,
        options: &FormOptions,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "pubsubcreatenode",
            |id| stanzas::build_create_node(service, node, options, id),
            callback,
        )
    }

    /// Delete `node`.
    #[instrument(skip(self, callback))]
    pub fn delete_node(
        &self,
        service: &str,
        node: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "delete",
            |id| stanzas::build_delete_node(service, node, id),
            callback,
        )
    }

    /// Subscribe `jid` (default: the session JID) to `node`.
    ///
    /// When `on_event` is given and the service answers with a `result`, a
    /// renewing notification handler for `service`/`node` is installed
    /// before `callback` runs.
    #[instrument(skip(self, options, on_event, callback))]
    pub fn subscribe(
        &self,
        service: &str,
        node: &str,
        jid: Option<&str>,
        options: &FormOptions,
        on_event: Option<NotificationCallback>,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        let jid = self.jid_or_session(jid);

        let callback = match on_event {
            None => callback,
            Some(on_event) => {
                let registry = self.registry.clone();
                let filter = NotificationFilter::new(Some(service), Some(node))
                    .match_bare(self.config.notifications.match_bare_service);
                let wrapped: ResponseCallback = Box::new(move |resp: PubSubResponse| {
                    if resp.is_result() {
                        add_notification_handler(&registry, filter, on_event);
                    } else {
                        debug!(response_type = ?resp.stanza_type(), "Subscription not confirmed, no event handler");
                    }
                    if let Some(callback) = callback {
                        callback(resp);
                    }
                });
                Some(wrapped)
            }
        };

        self.request(
            "subscribenode",
            |id| stanzas::build_subscribe(service, node, jid, options, id),
            callback,
        )
    }

    /// Unsubscribe `jid` (default: the session JID) from `node`.
    #[instrument(skip(self, callback))]
    pub fn unsubscribe(
        &self,
        service: &str,
        node: &str,
        jid: Option<&str>,
        subid: Option<&str>,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        let jid = self.jid_or_session(jid);
        self.request(
            "unsubscribenode",
            |id| stanzas::build_unsubscribe(service, node, jid, subid, id),
            callback,
        )
    }

    /// Fetch the subscription options form. Read it with
    /// [`PubSubResponse::form`].
    #[instrument(skip(self, callback))]
    pub fn subscription_options(
        &self,
        service: &str,
        node: &str,
        jid: Option<&str>,
        subid: Option<&str>,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        let jid = self.jid_or_session(jid);
        self.request(
            "get_options",
            |id| stanzas::build_subscription_options(service, node, jid, subid, id),
            callback,
        )
    }

    /// Publish `items` to `node`, in order.
    #[instrument(skip(self, items, callback), fields(count = items.len()))]
    pub fn publish(
        &self,
        service: &str,
        node: &str,
        items: &[PubSubItem],
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "publishnode",
            |id| stanzas::build_publish(service, node, items, id),
            callback,
        )
    }

    /// Delete items from `node`.
    #[instrument(skip(self, callback))]
    pub fn retract(
        &self,
        service: &str,
        node: &str,
        item_ids: &[&str],
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "retract",
            |id| stanzas::build_retract(service, node, item_ids, id),
            callback,
        )
    }

    /// Fetch items from `node`.
    #[instrument(skip(self, callback))]
    pub fn request_items(
        &self,
        service: &str,
        node: &str,
        query: &ItemsQuery,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "requestItems",
            |id| stanzas::build_items_request(service, node, query, id),
            callback,
        )
    }

    /// List this entity's subscriptions, optionally for one node.
    #[instrument(skip(self, callback))]
    pub fn request_subscriptions(
        &self,
        service: &str,
        node: Option<&str>,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "requestSubId",
            |id| stanzas::build_subscriptions_request(service, node, id),
            callback,
        )
    }

    /// List the nodes a service advertises. Read them with
    /// [`PubSubResponse::disco_items`].
    #[instrument(skip(self, callback))]
    pub fn request_nodes(
        &self,
        service: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "requestNodes",
            |id| stanzas::build_disco_items_request(service, None, id),
            callback,
        )
    }

    /// List the items of `node` through disco#items. Read them with
    /// [`PubSubResponse::disco_items`] and [`DiscoItem::item_id`].
    ///
    /// [`DiscoItem::item_id`]: crate::response::DiscoItem::item_id
    #[instrument(skip(self, callback))]
    pub fn discover_items(
        &self,
        service: &str,
        node: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.request(
            "discoitems",
            |id| stanzas::build_disco_items_request(service, Some(node), id),
            callback,
        )
    }

    /// First subscription id held on `node` by `jid` (default: the session
    /// JID), falling back to its bare JID. `None` when there is none or the
    /// request failed.
    pub fn sub_id<F>(
        &self,
        service: &str,
        node: &str,
        jid: Option<&str>,
        callback: F,
    ) -> Result<String, PubSubError>
    where
        F: FnOnce(Option<String>) + 'static,
    {
        let node_name = node.to_string();
        let jid = self.jid_or_session(jid).to_string();
        self.request_subscriptions(
            service,
            Some(node),
            Some(Box::new(move |resp: PubSubResponse| {
                callback(resp.sub_ids(&node_name, &jid, false).into_iter().next())
            })),
        )
    }

    /// Every subscription id held on `node` by exactly `jid` (default: the
    /// session JID).
    pub fn sub_ids<F>(
        &self,
        service: &str,
        node: &str,
        jid: Option<&str>,
        callback: F,
    ) -> Result<String, PubSubError>
    where
        F: FnOnce(Vec<String>) + 'static,
    {
        let node_name = node.to_string();
        let jid = self.jid_or_session(jid).to_string();
        self.request_subscriptions(
            service,
            Some(node),
            Some(Box::new(move |resp: PubSubResponse| {
                callback(resp.sub_ids(&node_name, &jid, true))
            })),
        )
    }

    /// Watch for notifications from `service` (any if `None`) about `node`
    /// (any if `None`).
    pub fn add_notification_handler(
        &self,
        service: Option<&str>,
        node: Option<&str>,
        callback: NotificationCallback,
        oneoff: bool,
    ) -> HandlerId {
        let filter = NotificationFilter::new(service, node)
            .oneoff(oneoff)
            .match_bare(self.config.notifications.match_bare_service);
        add_notification_handler(&self.registry, filter, callback)
    }

    /// Stop watching. Returns false if the handler was already gone.
    pub fn delete_notification_handler(&self, id: HandlerId) -> bool {
        delete_notification_handler(&self.registry, id)
    }

    /// Node owner operations.
    pub fn owner(&self) -> Owner<'_, T, R> {
        Owner { client: self }
    }
}

/// Operations in the `pubsub#owner` namespace.
pub struct Owner<'a, T, R> {
    client: &'a PubSubClient<T, R>,
}

impl<T, R> Owner<'_, T, R>
where
    T: StanzaTransport,
    R: HandlerRegistry + Clone + 'static,
{
    /// Submit a new configuration for `node`.
    #[instrument(skip(self, options, callback))]
    pub fn configure(
        &self,
        service: &str,
        node: &str,
        options: &FormOptions,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.client.request(
            "configure",
            |id| stanzas::build_configure(service, node, options, id),
            callback,
        )
    }

    /// Fetch the configuration form of `node`. Read it with
    /// [`PubSubResponse::form`].
    #[instrument(skip(self, callback))]
    pub fn configuration(
        &self,
        service: &str,
        node: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.client.request(
            "get_configure",
            |id| stanzas::build_configuration_request(service, node, id),
            callback,
        )
    }

    /// List every subscriber of `node`.
    #[instrument(skip(self, callback))]
    pub fn subscriptions(
        &self,
        service: &str,
        node: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.client.request(
            "get_subscriptions",
            |id| stanzas::build_owner_subscriptions_request(service, node, id),
            callback,
        )
    }

    /// Remove every item from `node`.
    #[instrument(skip(self, callback))]
    pub fn purge(
        &self,
        service: &str,
        node: &str,
        callback: Option<ResponseCallback>,
    ) -> Result<String, PubSubError> {
        self.client.request(
            "purge",
            |id| stanzas::build_purge(service, node, id),
            callback,
        )
    }
}
