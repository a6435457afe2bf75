//! Decoding of the compact session id the voice gateway sends with each call.
//!
//! Format: `firstName|fractional_<userId>|location:London,jobs:25`
//!
//! Decoding is total: any input, including garbage, yields a token with
//! empty/absent fields rather than an error. There is no encoder; the token
//! is produced by the caller of the voice endpoint.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::resolver::StructuredUser;

const ANON_PREFIX: &str = "fractional_anon_";
const USER_PREFIX: &str = "fractional_";

/// What page the user had open. The voice token only carries location and
/// job count; the web widget may also send the page type and top roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageContext {
    #[serde(default, alias = "location_filter")]
    pub location: Option<String>,
    #[serde(default, alias = "total_jobs_on_page")]
    pub total_jobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_roles: Vec<String>,
}

impl PageContext {
    fn is_empty(&self) -> bool {
        self.location.is_none() && self.total_jobs.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SessionToken {
    pub first_name: String,
    pub user_id: String,
    /// Set when the id carried the `fractional_anon_` prefix.
    pub anonymous: bool,
    pub page_context: Option<PageContext>,
}

impl SessionToken {
    /// The token as a structured user, or `None` when it names nobody.
    ///
    /// An anonymous session id is not a login: it only scopes the call, so
    /// it never becomes the user id and nothing is saved against it.
    pub fn to_structured_user(&self) -> Option<StructuredUser> {
        let id = Some(self.user_id.clone()).filter(|s| !s.is_empty() && !self.anonymous);
        let first_name = Some(self.first_name.clone()).filter(|s| !s.is_empty());
        if id.is_none() && first_name.is_none() {
            return None;
        }
        Some(StructuredUser {
            id,
            first_name,
            name: None,
            email: None,
        })
    }
}

pub fn decode(token: &str) -> SessionToken {
    let mut parts = token.split('|');
    let first_name = parts.next().unwrap_or_default().to_string();
    let session_part = parts.next().unwrap_or_default();
    let page_part = parts.next().unwrap_or_default();

    let (user_id, anonymous) = if let Some(id) = session_part.strip_prefix(ANON_PREFIX) {
        (id, true)
    } else if let Some(id) = session_part.strip_prefix(USER_PREFIX) {
        (id, false)
    } else {
        (session_part, false)
    };

    SessionToken {
        first_name,
        user_id: user_id.to_string(),
        anonymous,
        page_context: decode_page_context(page_part),
    }
}

fn decode_page_context(segment: &str) -> Option<PageContext> {
    if segment.is_empty() {
        return None;
    }

    let mut page = PageContext::default();
    for pair in segment.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        match key {
            "location" => page.location = Some(value.to_string()),
            "jobs" => match value.trim().parse::<u32>() {
                Ok(n) => page.total_jobs = Some(n),
                Err(e) => warn!("Dropping unparseable jobs count '{value}' from session token: {e}"),
            },
            _ => {}
        }
    }

    (!page.is_empty()).then_some(page)
}
