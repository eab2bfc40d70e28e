//! Binding of a requester socket to the origin it connected from.

use wallet_mediator_core::SenderData;

/// Page a requester socket speaks for.
///
/// The origin is fixed by the upgrade request's `Origin` header. A page may
/// later announce its full url, but only within that origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBinding {
    origin: Option<String>,
    url: String,
}

impl PageBinding {
    /// Bind to the value of an `Origin` header.
    ///
    /// A missing, opaque (`null`) or unparsable header leaves the socket
    /// without an origin; its calls are then never authorized.
    #[must_use]
    pub fn from_header(origin: Option<&str>) -> Self {
        let origin = origin.and_then(origin_of);
        Self {
            url: origin.clone().unwrap_or_default(),
            origin,
        }
    }

    /// Origin the socket is bound to.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Url reported as the sender of calls.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accept `url` as the page url if it lies within the bound origin.
    ///
    /// Returns `false`, leaving the binding unchanged, otherwise.
    pub fn announce(&mut self, url: String) -> bool {
        let within = self
            .origin
            .as_deref()
            .is_some_and(|bound| origin_of(&url).as_deref() == Some(bound));
        if within {
            self.url = url;
        }
        within
    }
}

fn origin_of(url: &str) -> Option<String> {
    SenderData {
        url: url.to_owned(),
        ..SenderData::default()
    }
    .origin()
}
