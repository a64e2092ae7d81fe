use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use chrono::NaiveDate;
use super::time::Moment;

pub const UNKNOWN_CLIENT: &str = "unknown";
pub const LOOPBACK_FALLBACK: &str = "127.0.0.1";

/// Anonymized origin of a request.
///
/// The last component of the network address is masked, so the id is lossy and
/// cannot be reversed into the caller's full address. The same raw address always
/// maps to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn unknown() -> Self {
        ClientId(UNKNOWN_CLIENT.to_string())
    }

    /// Derives the anonymized id from a raw address string.
    /// Accepts bare IPs, `ip:port` forms, and comma-separated forwarding chains
    /// (only the first hop counts). Anything else maps to `unknown`.
    pub fn anonymize(raw: Option<&str>) -> Self {
        let Some(first_hop) = raw
            .and_then(|r| r.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return Self::unknown();
        };

        let ip = first_hop
            .parse::<IpAddr>()
            .ok()
            .or_else(|| first_hop.parse::<SocketAddr>().ok().map(|s| s.ip()));

        match ip {
            Some(IpAddr::V4(v4)) => Self::mask_v4(v4.octets()),
            Some(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::mask_v4(v4.octets()),
                None => {
                    let s = v6.segments();
                    ClientId(format!("{:x}:{:x}:{:x}:xxxx", s[0], s[1], s[2]))
                }
            },
            None => Self::unknown(),
        }
    }

    fn mask_v4(o: [u8; 4]) -> Self {
        ClientId(format!("{}.{}.{}.xxx", o[0], o[1], o[2]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Picks the raw client address the way the HTTP layer sees it:
/// `x-forwarded-for` first hop, then `x-real-ip`, then the socket peer,
/// then loopback.
pub fn resolve_client_address<'a>(
    forwarded_for: Option<&'a str>,
    real_ip: Option<&'a str>,
    peer: Option<&'a str>,
) -> &'a str {
    let forwarded = forwarded_for.and_then(|f| f.split(',').next());

    [forwarded, real_ip, peer]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(LOOPBACK_FALLBACK)
}

/// Strict state delta. This is the ONLY way analytics state mutates.
#[derive(Debug, Clone)]
pub enum AnalyticsDelta {
    /// The caller observed this calendar day. Rolls today-scoped counters if stale.
    DayObserved(NaiveDate),
    Request {
        client: ClientId,
        question_length: usize,
        session: Option<String>,
        at: Moment,
    },
    Error {
        at: Moment,
    },
}

/// Normalizes a caller-supplied session id. Blank ids count as absent.
pub fn normalize_session(session: Option<&str>) -> Option<String> {
    session
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Session ids are only ever logged in this shortened form.
pub fn session_log_prefix(session: &str) -> &str {
    match session.char_indices().nth(12) {
        Some((idx, _)) => &session[..idx],
        None => session,
    }
}
