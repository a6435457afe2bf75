// Voice questions answered without a model round trip.

use crate::identity::PageContext;

const NAME_PHRASES: &[&str] = &["my name", "who am i", "what am i called"];
const PAGE_PHRASES: &[&str] = &["what page", "where are we", "which page", "current page"];

pub fn is_name_question(query: &str) -> bool {
    let q = query.to_lowercase();
    NAME_PHRASES.iter().any(|p| q.contains(p))
}

pub fn is_page_question(query: &str) -> bool {
    let q = query.to_lowercase();
    PAGE_PHRASES.iter().any(|p| q.contains(p))
}

pub fn name_reply(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("Your name is {name}! I remembered that from when you logged in."),
        None => "I don't know your name yet. You can tell me, or sign in so I can remember you!"
            .to_string(),
    }
}

pub fn page_reply(page: Option<&PageContext>) -> String {
    match page.and_then(|p| p.location.as_deref().map(|loc| (loc, p.total_jobs))) {
        Some((location, jobs)) => {
            let jobs = jobs.map_or_else(|| "several".to_string(), |n| n.to_string());
            format!(
                "We're on the {location} jobs page. There are {jobs} fractional executive positions here. \
                 Want me to show you the roles?"
            )
        }
        None => "We're on the main fractional jobs page. Which location interests you - London, \
                 Manchester, or somewhere else?"
            .to_string(),
    }
}

/// Canned answer for name and page questions; `None` sends the turn to the agent.
pub fn answer(query: &str, name: Option<&str>, page: Option<&PageContext>) -> Option<String> {
    if is_name_question(query) {
        Some(name_reply(name))
    } else if is_page_question(query) {
        Some(page_reply(page))
    } else {
        None
    }
}
