//! PubSub node configuration.
//!
//! Node and subscription options travel as ordered `(name, value)` lists
//! inside submit forms. [`NodeConfig`] is the typed view over the
//! `pubsub#node_config` keys this client understands.

use std::fmt;

use tracing::debug;
use waddle_xmpp_xep_dataforms::{DataForm, FieldValue};

/// Ordered option list submitted in a configuration or options form.
pub type FormOptions = Vec<(String, FieldValue)>;

/// Node configuration option keys (`pubsub#node_config`).
pub mod config_keys {
    pub const TITLE: &str = "pubsub#title";
    pub const ACCESS_MODEL: &str = "pubsub#access_model";
    pub const PUBLISH_MODEL: &str = "pubsub#publish_model";
    pub const MAX_ITEMS: &str = "pubsub#max_items";
    pub const PERSIST_ITEMS: &str = "pubsub#persist_items";
    pub const DELIVER_PAYLOADS: &str = "pubsub#deliver_payloads";
    pub const NOTIFY_RETRACT: &str = "pubsub#notify_retract";
    pub const NOTIFY_DELETE: &str = "pubsub#notify_delete";
    pub const SEND_LAST_PUBLISHED_ITEM: &str = "pubsub#send_last_published_item";
}

/// Subscription option keys (`pubsub#subscribe_options`).
pub mod subscribe_keys {
    pub const DELIVER: &str = "pubsub#deliver";
    pub const DIGEST: &str = "pubsub#digest";
    pub const DIGEST_FREQUENCY: &str = "pubsub#digest_frequency";
    pub const EXPIRE: &str = "pubsub#expire";
    pub const INCLUDE_BODY: &str = "pubsub#include_body";
    pub const SHOW_VALUES: &str = "pubsub#show-values";
    pub const SUBSCRIPTION_TYPE: &str = "pubsub#subscription_type";
    pub const SUBSCRIPTION_DEPTH: &str = "pubsub#subscription_depth";
}

/// Access model for a PubSub node.
///
/// Determines who can subscribe to and retrieve items from the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessModel {
    /// Anyone can subscribe and retrieve items.
    #[default]
    Open,
    /// Entities with a presence subscription to the owner.
    Presence,
    /// Entities in specific roster groups.
    Roster,
    /// Only explicitly whitelisted JIDs.
    Whitelist,
    /// Subscriptions must be approved by the owner.
    Authorize,
}

impl AccessModel {
    /// Parse an access model from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(AccessModel::Open),
            "presence" => Some(AccessModel::Presence),
            "roster" => Some(AccessModel::Roster),
            "whitelist" => Some(AccessModel::Whitelist),
            "authorize" => Some(AccessModel::Authorize),
            _ => None,
        }
    }
}

impl fmt::Display for AccessModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessModel::Open => "open",
            AccessModel::Presence => "presence",
            AccessModel::Roster => "roster",
            AccessModel::Whitelist => "whitelist",
            AccessModel::Authorize => "authorize",
        };
        write!(f, "{}", s)
    }
}

/// Publish model for a PubSub node.
///
/// Determines who can publish to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishModel {
    /// Only publishers and owners.
    #[default]
    Publishers,
    /// Any subscriber.
    Subscribers,
    /// Anyone.
    Open,
}

impl PublishModel {
    /// Parse a publish model from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "publishers" => Some(PublishModel::Publishers),
            "subscribers" => Some(PublishModel::Subscribers),
            "open" => Some(PublishModel::Open),
            _ => None,
        }
    }
}

impl fmt::Display for PublishModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishModel::Publishers => "publishers",
            PublishModel::Subscribers => "subscribers",
            PublishModel::Open => "open",
        };
        write!(f, "{}", s)
    }
}

/// When to send the last published item to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendLastPublishedItem {
    /// Never send last item automatically.
    #[default]
    Never,
    /// Send on subscription only.
    OnSub,
    /// Send on subscription and when the subscriber comes online.
    OnSubAndPresence,
}

impl SendLastPublishedItem {
    /// Parse from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "never" => Some(SendLastPublishedItem::Never),
            "on_sub" => Some(SendLastPublishedItem::OnSub),
            "on_sub_and_presence" => Some(SendLastPublishedItem::OnSubAndPresence),
            _ => None,
        }
    }
}

impl fmt::Display for SendLastPublishedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SendLastPublishedItem::Never => "never",
            SendLastPublishedItem::OnSub => "on_sub",
            SendLastPublishedItem::OnSubAndPresence => "on_sub_and_presence",
        };
        write!(f, "{}", s)
    }
}

/// Configuration for a PubSub node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Human-readable node title.
    pub title: Option<String>,
    /// Access model (who can subscribe/retrieve).
    pub access_model: AccessModel,
    /// Publish model (who can publish).
    pub publish_model: PublishModel,
    /// Maximum number of items to persist.
    pub max_items: u32,
    /// Whether to persist items.
    pub persist_items: bool,
    /// Whether to deliver payloads in notifications.
    pub deliver_payloads: bool,
    /// Whether to notify on item retraction.
    pub notify_retract: bool,
    /// Whether to notify on node deletion.
    pub notify_delete: bool,
    /// Whether to send last published item on subscription.
    pub send_last_published_item: SendLastPublishedItem,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::public()
    }
}

impl NodeConfig {
    /// Configuration for a public node (anyone can subscribe).
    pub fn public() -> Self {
        Self {
            title: None,
            access_model: AccessModel::Open,
            publish_model: PublishModel::Publishers,
            max_items: 10,
            persist_items: true,
            deliver_payloads: true,
            notify_retract: true,
            notify_delete: true,
            send_last_published_item: SendLastPublishedItem::OnSub,
        }
    }

    /// Configuration for a whitelist-only node.
    pub fn whitelist() -> Self {
        Self {
            access_model: AccessModel::Whitelist,
            ..Self::public()
        }
    }

    /// Set the node title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Render as the ordered option list submitted in a `node_config` form.
    pub fn to_options(&self) -> FormOptions {
        let mut options: FormOptions = Vec::with_capacity(9);
        if let Some(ref title) = self.title {
            options.push((config_keys::TITLE.to_string(), title.as_str().into()));
        }
        options.extend([
            (
                config_keys::ACCESS_MODEL.to_string(),
                self.access_model.to_string().into(),
            ),
            (
                config_keys::PUBLISH_MODEL.to_string(),
                self.publish_model.to_string().into(),
            ),
            (
                config_keys::MAX_ITEMS.to_string(),
                self.max_items.to_string().into(),
            ),
            (config_keys::PERSIST_ITEMS.to_string(), self.persist_items.into()),
            (
                config_keys::DELIVER_PAYLOADS.to_string(),
                self.deliver_payloads.into(),
            ),
            (config_keys::NOTIFY_RETRACT.to_string(), self.notify_retract.into()),
            (config_keys::NOTIFY_DELETE.to_string(), self.notify_delete.into()),
            (
                config_keys::SEND_LAST_PUBLISHED_ITEM.to_string(),
                self.send_last_published_item.to_string().into(),
            ),
        ]);
        options
    }

    /// Read a configuration back from a `node_config` form.
    ///
    /// Keys missing from the form, or carrying values that do not parse,
    /// keep the [`NodeConfig::public`] value.
    pub fn from_form(form: &DataForm) -> Self {
        let mut config = Self::public();

        for field in form.fields() {
            let Some(ref var) = field.var else {
                continue;
            };
            let value = &field.content.value;

            match var.as_str() {
                config_keys::TITLE => config.title = text(value).map(String::from),
                config_keys::ACCESS_MODEL => {
                    if let Some(model) = text(value).and_then(AccessModel::from_str) {
                        config.access_model = model;
                    }
                }
                config_keys::PUBLISH_MODEL => {
                    if let Some(model) = text(value).and_then(PublishModel::from_str) {
                        config.publish_model = model;
                    }
                }
                config_keys::MAX_ITEMS => match text(value).map(str::parse) {
                    Some(Ok(max)) => config.max_items = max,
                    _ => debug!(value = ?value, "Ignoring unparsable pubsub#max_items"),
                },
                config_keys::PERSIST_ITEMS => set_flag(&mut config.persist_items, value),
                config_keys::DELIVER_PAYLOADS => set_flag(&mut config.deliver_payloads, value),
                config_keys::NOTIFY_RETRACT => set_flag(&mut config.notify_retract, value),
                config_keys::NOTIFY_DELETE => set_flag(&mut config.notify_delete, value),
                config_keys::SEND_LAST_PUBLISHED_ITEM => {
                    if let Some(when) = text(value).and_then(SendLastPublishedItem::from_str) {
                        config.send_last_published_item = when;
                    }
                }
                _ => {}
            }
        }

        config
    }
}

fn text(value: &FieldValue) -> Option<&str> {
    value.as_text()
}

// Untyped fields only coerce "true"/"false", so "1" and "0" arrive as text.
fn set_flag(slot: &mut bool, value: &FieldValue) {
    match (value.as_bool(), value.as_text()) {
        (Some(flag), _) => *slot = flag,
        (None, Some("1")) => *slot = true,
        (None, Some("0")) => *slot = false,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minidom::Element;

    #[test]
    fn test_access_model_parse() {
        assert_eq!(AccessModel::from_str("open"), Some(AccessModel::Open));
        assert_eq!(AccessModel::from_str("presence"), Some(AccessModel::Presence));
        assert_eq!(AccessModel::from_str("roster"), Some(AccessModel::Roster));
        assert_eq!(AccessModel::from_str("whitelist"), Some(AccessModel::Whitelist));
        assert_eq!(AccessModel::from_str("invalid"), None);
    }

    #[test]
    fn test_publish_model_parse() {
        assert_eq!(PublishModel::from_str("publishers"), Some(PublishModel::Publishers));
        assert_eq!(PublishModel::from_str("open"), Some(PublishModel::Open));
        assert_eq!(PublishModel::from_str("invalid"), None);
    }

    #[test]
    fn test_to_options_order_and_values() {
        let options = NodeConfig::whitelist().with_title("News").to_options();
        let keys: Vec<_> = options.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys[0], config_keys::TITLE);
        assert_eq!(keys[1], config_keys::ACCESS_MODEL);
        assert_eq!(options[1].1.as_text(), Some("whitelist"));
        assert_eq!(options[3].1.as_text(), Some("10"));
        assert_eq!(options[4].1.as_bool(), Some(true));
    }

    #[test]
    fn test_from_form() {
        let xml = r#"<x xmlns='jabber:x:data' type='form'>
            <field var='FORM_TYPE' type='hidden'>
                <value>http://jabber.org/protocol/pubsub#node_config</value>
            </field>
            <field var='pubsub#title' type='text-single'><value>Princely Musings</value></field>
            <field var='pubsub#access_model' type='list-single'><value>authorize</value></field>
            <field var='pubsub#max_items' type='text-single'><value>25</value></field>
            <field var='pubsub#persist_items' type='boolean'><value>0</value></field>
            <field var='pubsub#notify_delete'><value>1</value></field>
            <field var='pubsub#send_last_published_item' type='list-single'>
                <value>never</value>
            </field>
        </x>"#;
        let elem: Element = xml.parse().expect("valid XML");
        let form = DataForm::from_element(&elem).unwrap();

        let config = NodeConfig::from_form(&form);
        assert_eq!(config.title.as_deref(), Some("Princely Musings"));
        assert_eq!(config.access_model, AccessModel::Authorize);
        assert_eq!(config.max_items, 25);
        assert!(!config.persist_items);
        assert!(config.notify_delete);
        assert_eq!(config.send_last_published_item, SendLastPublishedItem::Never);
        assert_eq!(config.publish_model, PublishModel::Publishers);
    }

    #[test]
    fn test_from_form_ignores_bad_values() {
        let xml = r#"<x xmlns='jabber:x:data' type='form'>
            <field var='pubsub#max_items'><value>lots</value></field>
            <field var='pubsub#access_model'><value>secret</value></field>
        </x>"#;
        let elem: Element = xml.parse().expect("valid XML");
        let form = DataForm::from_element(&elem).unwrap();

        assert_eq!(NodeConfig::from_form(&form), NodeConfig::public());
    }
}
