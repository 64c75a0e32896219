//! Subscription directory.
//!
//! Reads `<subscription/>` records out of a subscriptions listing and picks
//! the subscription ids that belong to a given node and address.

use minidom::Element;
use tracing::trace;

use crate::stanzas::bare_jid;

/// One `<subscription/>` entry of a listing response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    /// Node subscribed to
    pub node: Option<String>,
    /// Subscribed address
    pub jid: Option<String>,
    /// Affiliation, on owner listings
    pub affiliation: Option<String>,
    /// State: `subscribed`, `pending`, `unconfigured` or `none`
    pub subscription: Option<String>,
    /// Subscription id
    pub subid: Option<String>,
}

impl Subscription {
    /// Read a subscription record. Empty attributes count as absent.
    pub fn from_element(elem: &Element) -> Self {
        let attr = |name: &str| {
            elem.attr(name)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            node: attr("node"),
            jid: attr("jid"),
            affiliation: attr("affiliation"),
            subscription: attr("subscription"),
            subid: attr("subid"),
        }
    }
}

/// Subscription ids held by `jid` on `node`.
///
/// Records without a node apply to every node. Ids whose record names `jid`
/// verbatim come first; unless `exact_match` is set, ids registered to the
/// bare form of `jid` follow. Scan order is kept within each group.
pub fn resolve_sub_ids(
    subscriptions: &[Subscription],
    node: &str,
    jid: &str,
    exact_match: bool,
) -> Vec<String> {
    let bare = bare_jid(jid);
    let mut exact = Vec::new();
    let mut fallback = Vec::new();

    for sub in subscriptions {
        if sub.node.as_deref().is_some_and(|n| n != node) {
            continue;
        }

        let Some(ref subid) = sub.subid else {
            continue;
        };

        match sub.jid.as_deref() {
            Some(sub_jid) if sub_jid == jid => exact.push(subid.clone()),
            Some(sub_jid) if !exact_match && sub_jid == bare => fallback.push(subid.clone()),
            _ => {}
        }
    }

    trace!(node, jid, exact = exact.len(), bare = fallback.len(), "Resolved subids");
    exact.extend(fallback);
    exact
}
