//! Extra correlation attributes added after the identity is known.

use {
    crate::{CorrelationAttributes, IdentityConfig, headers, utils::generate_request_id},
    http::HeaderMap,
};

/// Adds the origin tag and a fresh request id, each behind its own switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeAugmenter {
    extract_origin_header: bool,
    force_new_request_id: bool,
}

impl AttributeAugmenter {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            extract_origin_header: config.extract_origin_header,
            force_new_request_id: config.force_new_request_id,
        }
    }

    pub fn augment(&self, inbound: &HeaderMap, attributes: &mut CorrelationAttributes) {
        if self.extract_origin_header {
            attributes.insert(headers::USER_ORIGIN, origin_of(inbound));
        }

        if self.force_new_request_id {
            attributes.insert(headers::REQUEST_ID, generate_request_id());
        }
    }
}

/// `deck` when the origin signal names it (in any case), `api` otherwise,
/// including when the signal is missing.
pub fn origin_of(inbound: &HeaderMap) -> &'static str {
    let is_deck = inbound
        .get(headers::ORIGIN_SIGNAL)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(headers::ORIGIN_DECK));

    if is_deck {
        headers::ORIGIN_DECK
    } else {
        headers::ORIGIN_API
    }
}
