//! Works out who is talking for one request.
//!
//! Sources, strongest first:
//! 1. A structured user object (web widget state, or a decoded voice session token).
//! 2. Free-text instructions injected by the chat widget as a system message,
//!    containing `User ID:`, `User Name:` and `User Email:` lines.
//!
//! The result is passed explicitly through the request (see `agent::context::AgentContext`);
//! it is never cached process-wide.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static USER_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)User ID:\s*([a-f0-9-]+)").expect("valid user id pattern"));
static USER_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)User Name:\s*([^\n]+)").expect("valid user name pattern"));
static USER_EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)User Email:\s*([^\n]+)").expect("valid user email pattern"));

/// User object as sent by the web widget state or derived from a session token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl StructuredUser {
    fn id(&self) -> Option<&str> {
        non_empty(self.id.as_deref())
    }

    fn display_name(&self) -> Option<&str> {
        non_empty(self.first_name.as_deref()).or_else(|| non_empty(self.name.as_deref()))
    }

    fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }
}

/// Fields recovered from an instruction block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionIdentity {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Effective identity for the current request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserIdentity {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl UserIdentity {
    /// No user id from any source means "not logged in". That is a normal
    /// outcome, not an error.
    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// Extracts `User ID`, `User Name` and `User Email` lines (case-insensitive).
/// The first match of each pattern wins.
pub fn parse_instructions(instructions: &str) -> InstructionIdentity {
    let capture = |re: &Regex| {
        re.captures(instructions)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    InstructionIdentity {
        user_id: capture(&USER_ID_PATTERN),
        name: capture(&USER_NAME_PATTERN),
        email: capture(&USER_EMAIL_PATTERN),
    }
}

/// Resolves the effective identity.
///
/// A structured id is authoritative: instruction-block name/email only fill
/// gaps when the block carries no id or the same id.
pub fn resolve(structured: Option<&StructuredUser>, instructions: Option<&str>) -> UserIdentity {
    let parsed = instructions.map(parse_instructions).unwrap_or_default();

    if let Some(id) = structured.and_then(StructuredUser::id) {
        let same_user = parsed.user_id.as_deref().map_or(true, |p| p == id);
        let (fallback_name, fallback_email) = if same_user {
            (parsed.name, parsed.email)
        } else {
            debug!("Ignoring instruction identity for a different user id");
            (None, None)
        };
        let user = structured.cloned().unwrap_or_default();
        return UserIdentity {
            user_id: Some(id.to_string()),
            display_name: user.display_name().map(String::from).or(fallback_name),
            email: user.email().map(String::from).or(fallback_email),
        };
    }

    let structured_name = structured
        .and_then(StructuredUser::display_name)
        .map(String::from);
    let structured_email = structured.and_then(StructuredUser::email).map(String::from);

    if let Some(id) = parsed.user_id.as_deref() {
        debug!("Resolved user from instructions: {}", short_id(id));
        return UserIdentity {
            user_id: parsed.user_id.clone(),
            display_name: parsed.name.or(structured_name),
            email: parsed.email.or(structured_email),
        };
    }

    UserIdentity {
        user_id: None,
        display_name: structured_name.or(parsed.name),
        email: structured_email.or(parsed.email),
    }
}

/// First eight characters of an id, for logs.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTRUCTIONS: &str = "CRITICAL USER CONTEXT\n\
        User Name: Jane Doe\n\
        User ID: 3f2a-bc91-0d\n\
        user email: jane@example.com\n\
        Location: London";

    fn structured(id: Option<&str>, first: Option<&str>, name: Option<&str>) -> StructuredUser {
        StructuredUser {
            id: id.map(String::from),
            first_name: first.map(String::from),
            name: name.map(String::from),
            email: None,
        }
    }

    #[test]
    fn test_parse_instructions_all_fields() {
        let parsed = parse_instructions(INSTRUCTIONS);
        assert_eq!(parsed.user_id.as_deref(), Some("3f2a-bc91-0d"));
        assert_eq!(parsed.name.as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_parse_instructions_first_id_wins() {
        let parsed = parse_instructions("User ID: aaa111\nUser ID: bbb222");
        assert_eq!(parsed.user_id.as_deref(), Some("aaa111"));
    }

    #[test]
    fn test_parse_instructions_non_hex_id_ignored() {
        let parsed = parse_instructions("User ID: zzz");
        assert_eq!(parsed.user_id, None);
    }

    #[test]
    fn test_structured_id_wins() {
        let user = structured(Some("user-1"), Some("Sam"), None);
        let identity = resolve(Some(&user), Some(INSTRUCTIONS));
        assert_eq!(identity.user_id.as_deref(), Some("user-1"));
        assert_eq!(identity.display_name.as_deref(), Some("Sam"));
        // instruction block belongs to someone else, so its email is not borrowed
        assert_eq!(identity.email, None);
    }

    #[test]
    fn test_structured_name_falls_back_to_name_field() {
        let user = structured(Some("user-1"), Some("  "), Some("Samuel"));
        let identity = resolve(Some(&user), None);
        assert_eq!(identity.display_name.as_deref(), Some("Samuel"));
    }

    #[test]
    fn test_same_id_fills_gaps_from_instructions() {
        let user = structured(Some("3f2a-bc91-0d"), None, None);
        let identity = resolve(Some(&user), Some(INSTRUCTIONS));
        assert_eq!(identity.display_name.as_deref(), Some("Jane Doe"));
        assert_eq!(identity.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_instructions_used_without_structured_id() {
        let user = structured(Some(""), Some("Janie"), None);
        let identity = resolve(Some(&user), Some(INSTRUCTIONS));
        assert!(identity.is_logged_in());
        assert_eq!(identity.user_id.as_deref(), Some("3f2a-bc91-0d"));
        assert_eq!(identity.display_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_not_logged_in_is_not_an_error() {
        let identity = resolve(None, Some("no identity here"));
        assert!(!identity.is_logged_in());
        assert_eq!(identity, UserIdentity::default());
    }

    #[test]
    fn test_name_only_is_not_logged_in() {
        let user = structured(None, Some("Jane"), None);
        let identity = resolve(Some(&user), None);
        assert!(!identity.is_logged_in());
        assert_eq!(identity.display_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abcdef0123456"), "abcdef01");
        assert_eq!(short_id("abc"), "abc");
    }
}
