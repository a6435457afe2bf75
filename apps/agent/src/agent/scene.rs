use serde::Serialize;

const DEFAULT_QUERY: &str = "executive business professional";

const LOCATION_QUERIES: &[(&str, &str)] = &[
    ("london", "london skyline cityscape"),
    ("manchester", "manchester city urban"),
    ("birmingham", "birmingham england city"),
    ("bristol", "bristol harbour city"),
    ("remote", "home office modern workspace"),
    ("hybrid", "modern coworking space"),
    ("new york", "new york manhattan skyline"),
    ("san francisco", "san francisco bay area"),
];

const ROLE_QUERIES: &[(&str, &str)] = &[
    ("cto", "technology startup office"),
    ("cfo", "finance corporate office"),
    ("cmo", "creative marketing agency"),
    ("coo", "modern business operations"),
    ("chro", "diverse team collaboration"),
    ("cpo", "product design studio"),
    ("ceo", "executive boardroom luxury"),
    ("startup", "startup office modern"),
];

/// Background image theme for the chat UI.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AmbientScene {
    pub location: Option<String>,
    pub role: Option<String>,
    pub mood: &'static str,
    /// Image search query.
    pub query: String,
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    let key = key.trim().to_lowercase();
    table.iter().find(|(k, _)| *k == key).map(|(_, q)| *q)
}

pub fn compose_scene(location: Option<&str>, role: Option<&str>) -> AmbientScene {
    let location = location.map(str::trim).filter(|s| !s.is_empty());
    let role = role.map(str::trim).filter(|s| !s.is_empty());

    let mut parts = Vec::new();
    if let Some(loc) = location {
        parts.push(
            lookup(LOCATION_QUERIES, loc)
                .map(String::from)
                .unwrap_or_else(|| format!("{loc} city skyline")),
        );
    }
    if let Some(role) = role {
        parts.push(
            lookup(ROLE_QUERIES, role)
                .map(String::from)
                .unwrap_or_else(|| format!("{role} professional")),
        );
    }

    AmbientScene {
        location: location.map(String::from),
        role: role.map(String::from),
        mood: "professional",
        query: if parts.is_empty() {
            DEFAULT_QUERY.to_string()
        } else {
            parts.join(" ")
        },
    }
}
