//! One-shot request/response correlation.

use minidom::Element;
use tracing::{debug, warn};

use crate::handlers::{HandlerMatcher, HandlerRegistry, HandlerResult};
use crate::response::PubSubResponse;
use crate::transport::StanzaTransport;
use crate::PubSubError;

/// Completion callback for a request. Invoked at most once.
pub type ResponseCallback = Box<dyn FnOnce(PubSubResponse)>;

/// Send `stanza` and route the matching `<iq/>` response to `callback`.
///
/// At most one handler is registered, keyed on `id`, and it removes itself
/// after the first response. If sending fails the handler is withdrawn.
pub fn send_request<T, R>(
    transport: &T,
    registry: &R,
    id: String,
    stanza: Element,
    callback: Option<ResponseCallback>,
) -> Result<String, PubSubError>
where
    T: StanzaTransport + ?Sized,
    R: HandlerRegistry + ?Sized,
{
    let handler = callback.map(|callback| {
        let mut callback = Some(callback);
        registry.add_handler(
            HandlerMatcher::new().with_name("iq").with_id(id.as_str()),
            Box::new(move |stanza: &Element| {
                if let Some(callback) = callback.take() {
                    callback(PubSubResponse::new(stanza.clone()));
                }
                HandlerResult::Remove
            }),
        )
    });

    if let Err(e) = transport.send(stanza) {
        warn!(id = %id, error = %e, "Failed to send request");
        if let Some(handler) = handler {
            registry.delete_handler(handler);
        }
        return Err(e);
    }

    debug!(id = %id, awaiting_response = handler.is_some(), "Request sent");
    Ok(id)
}
