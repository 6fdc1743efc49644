//! Allowed-origin policy.
//!
//! Decides whether the `Origin` a browser reports is permitted to receive a
//! response. The verdict is a pure function of the origin string and the
//! configured policy: no request ordering, no side effects.
//!
//! Matching rules, in order:
//!
//! 1. No `Origin` header at all → **Allow**. Non-browser clients (curl,
//!    server-to-server) send no origin; CORS here is a convenience filter
//!    for browsers, not an authentication mechanism.
//! 2. The raw origin string equals an allowed entry verbatim → **Allow**,
//!    with no scheme check.
//! 3. The origin hostname equals an entry's hostname → **Allow**, again
//!    scheme-free.
//! 4. The origin hostname is a subdomain of an entry's hostname (complete
//!    leading labels, so `evil-tarnglobal.com` never matches
//!    `tarnglobal.com`) **and** the scheme is `https` → **Allow**.
//! 5. Anything else, including origins that fail URL parsing → **Deny**.
//!
//! The https requirement deliberately applies only to the subdomain case;
//! exact and hostname matches skip it. See DESIGN.md.

use url::Url;

/// Outcome of an origin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// One configured entry with its pre-derived hostname.
#[derive(Debug, Clone)]
struct PolicyEntry {
    /// The entry exactly as configured, for verbatim matching.
    raw: String,
    /// Hostname derived from the entry: parsed out of it when it is a URL,
    /// the entry itself when it is a bare host.
    host: String,
}

/// The ordered allowed-origin list.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    entries: Vec<PolicyEntry>,
}

impl OriginPolicy {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let raw = entry.into();
                let host = derive_host(&raw);
                PolicyEntry { raw, host }
            })
            .collect();
        Self { entries }
    }
}

/// Decides whether a request origin is permitted under `policy`.
pub fn authorize(origin: Option<&str>, policy: &OriginPolicy) -> Verdict {
    let Some(origin) = origin else {
        return Verdict::Allow;
    };
    let Ok(parsed) = Url::parse(origin) else {
        return Verdict::Deny;
    };
    let Some(host) = parsed.host_str() else {
        return Verdict::Deny;
    };
    let https = parsed.scheme() == "https";

    for entry in &policy.entries {
        if entry.raw == origin || host == entry.host {
            return Verdict::Allow;
        }
        if https && is_subdomain_of(host, &entry.host) {
            return Verdict::Allow;
        }
    }
    Verdict::Deny
}

fn derive_host(entry: &str) -> String {
    if entry.contains("://") {
        if let Ok(url) = Url::parse(entry) {
            if let Some(host) = url.host_str() {
                return host.to_string();
            }
        }
    }
    entry.to_string()
}

/// Label-wise suffix check: every trailing label of `host` must equal the
/// corresponding label of `parent`, and `host` must have at least one label
/// more. Splitting on `.` enforces the dot boundary that a raw string
/// suffix check would miss.
fn is_subdomain_of(host: &str, parent: &str) -> bool {
    let host_labels: Vec<&str> = host.split('.').collect();
    let parent_labels: Vec<&str> = parent.split('.').collect();
    host_labels.len() > parent_labels.len()
        && host_labels[host_labels.len() - parent_labels.len()..] == parent_labels[..]
}
