//! OpenID 2.0 relying-party logic for Steam sign-in.

use reqwest::Url;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::error::{OpenIdError, OpenIdResult};
use super::transport::VerificationTransport;
use crate::auth::Identity;

/// Steam Community OpenID endpoint.
pub const STEAM_OPENID_ENDPOINT: &str = "https://steamcommunity.com/openid/login";

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Fields a positive assertion must carry before it is worth a round trip.
const REQUIRED_FIELDS: [&str; 5] = [
    "openid.claimed_id",
    "openid.return_to",
    "openid.signed",
    "openid.sig",
    "openid.assoc_handle",
];

/// Builds provider redirects and validates provider callbacks.
#[derive(Clone)]
pub struct OpenIdValidator {
    endpoint: Url,
    return_url: Url,
    transport: Arc<dyn VerificationTransport>,
}

impl OpenIdValidator {
    /// `return_url` is where the provider sends the user back to.
    pub fn new(endpoint: Url, return_url: Url, transport: Arc<dyn VerificationTransport>) -> Self {
        Self {
            endpoint,
            return_url,
            transport,
        }
    }

    pub fn return_url(&self) -> &Url {
        &self.return_url
    }

    /// Redirect target for the configured return URL.
    pub fn redirect_url(&self) -> Url {
        self.build_redirect(&self.return_url)
    }

    /// Build the `checkid_setup` indirect request for `return_url`.
    pub fn build_redirect(&self, return_url: &Url) -> Url {
        let realm = return_url.origin().ascii_serialization();

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.return_to", return_url.as_str())
            .append_pair("openid.realm", &realm)
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT);
        url
    }

    /// Validate the query string the provider appended to the callback.
    ///
    /// The assertion is never trusted as received: it is re-submitted to the
    /// provider with `openid.mode=check_authentication` and only an explicit
    /// `is_valid:true` yields an identity.
    ///
    /// No nonce bookkeeping is done here. `openid.response_nonce` is neither
    /// checked for freshness nor remembered, so a captured callback URL can be
    /// replayed for as long as the provider keeps confirming it.
    #[instrument(skip_all)]
    pub async fn validate_callback(&self, query: &HashMap<String, String>) -> OpenIdResult<Identity> {
        let mut params: BTreeMap<String, String> = query
            .iter()
            .filter(|(key, _)| key.starts_with("openid."))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        match params.get("openid.mode").map(String::as_str) {
            Some("id_res") => {}
            Some("cancel") => return Err(OpenIdError::AssertionInvalid),
            Some(other) => {
                return Err(OpenIdError::MalformedCallback(format!(
                    "unexpected openid.mode {other:?}"
                )));
            }
            None => {
                return Err(OpenIdError::MalformedCallback(
                    "missing openid.mode".to_string(),
                ));
            }
        }

        for field in REQUIRED_FIELDS {
            if params.get(field).is_none_or(|value| value.is_empty()) {
                return Err(OpenIdError::MalformedCallback(format!("missing {field}")));
            }
        }

        let return_to = Url::parse(&params["openid.return_to"]).map_err(|_| {
            OpenIdError::MalformedCallback("openid.return_to is not a URL".to_string())
        })?;
        if !same_endpoint(&return_to, &self.return_url) {
            return Err(OpenIdError::MalformedCallback(
                "openid.return_to does not match this service".to_string(),
            ));
        }

        if let Some(op_endpoint) = params.get("openid.op_endpoint")
            && op_endpoint != self.endpoint.as_str()
        {
            return Err(OpenIdError::MalformedCallback(format!(
                "unexpected openid.op_endpoint {op_endpoint:?}"
            )));
        }

        let identity = steam_id_from_claimed_id(&params["openid.claimed_id"])?;

        params.insert(
            "openid.mode".to_string(),
            "check_authentication".to_string(),
        );
        let form: Vec<(String, String)> = params.into_iter().collect();

        let body = self
            .transport
            .check_authentication(self.endpoint.as_str(), &form)
            .await?;

        match parse_key_values(&body).get("is_valid").copied() {
            Some("true") => {
                info!(steam_id = %identity, "OpenID assertion verified");
                Ok(identity)
            }
            Some("false") => {
                warn!(steam_id = %identity, "OpenID assertion rejected by provider");
                Err(OpenIdError::AssertionInvalid)
            }
            Some(other) => Err(OpenIdError::MalformedResponse(format!(
                "unexpected is_valid value {other:?}"
            ))),
            None => Err(OpenIdError::MalformedResponse(
                "response has no is_valid field".to_string(),
            )),
        }
    }
}

/// Scheme, authority and path must match; only the query may differ.
fn same_endpoint(return_to: &Url, expected: &Url) -> bool {
    return_to.scheme() == expected.scheme()
        && return_to.host_str() == expected.host_str()
        && return_to.port_or_known_default() == expected.port_or_known_default()
        && return_to.path() == expected.path()
}

/// Parse an OpenID key-value form body (`key:value` per line).
fn parse_key_values(body: &str) -> HashMap<&str, &str> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

/// The SteamID is the last path segment of the claimed identifier.
fn steam_id_from_claimed_id(claimed_id: &str) -> OpenIdResult<Identity> {
    let segment = claimed_id
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OpenIdError::MalformedCallback(format!(
            "claimed_id {claimed_id:?} has no numeric id"
        )));
    }

    Identity::new(segment)
        .map_err(|_| OpenIdError::MalformedCallback("empty claimed_id".to_string()))
}
