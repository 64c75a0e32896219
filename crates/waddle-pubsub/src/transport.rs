//! The outbound side of the connection.

use minidom::Element;
use uuid::Uuid;

use crate::PubSubError;

/// Sends stanzas and mints request identifiers.
///
/// Implemented by whatever owns the XMPP stream. The PubSub client never
/// retries or times out requests; that is left to the implementation.
pub trait StanzaTransport {
    /// Queue a stanza for delivery.
    fn send(&self, stanza: Element) -> Result<(), PubSubError>;

    /// Generate a globally unique request id ending in `suffix`.
    fn unique_id(&self, suffix: &str) -> String {
        format!("{}:{}", Uuid::new_v4(), suffix)
    }
}

impl<T: StanzaTransport + ?Sized> StanzaTransport for &T {
    fn send(&self, stanza: Element) -> Result<(), PubSubError> {
        (**self).send(stanza)
    }

    fn unique_id(&self, suffix: &str) -> String {
        (**self).unique_id(suffix)
    }
}

impl<T: StanzaTransport + ?Sized> StanzaTransport for std::rc::Rc<T> {
    fn send(&self, stanza: Element) -> Result<(), PubSubError> {
        (**self).send(stanza)
    }

    fn unique_id(&self, suffix: &str) -> String {
        (**self).unique_id(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullTransport;

    impl StanzaTransport for NullTransport {
        fn send(&self, _stanza: Element) -> Result<(), PubSubError> {
            Ok(())
        }
    }

    #[test]
    fn test_unique_id_is_unique_and_suffixed() {
        let transport = NullTransport;
        let a = transport.unique_id("publishnode");
        let b = transport.unique_id("publishnode");

        assert_ne!(a, b);
        assert!(a.ends_with(":publishnode"));
    }
}
