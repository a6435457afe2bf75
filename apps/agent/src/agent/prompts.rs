// Prompt text for the career-advisor agent: a fixed persona plus a
// per-request user section built from the request context.

use crate::agent::context::AgentContext;
use crate::identity::PageContext;
use crate::jobs::search::salary_text;
use crate::jobs::JobSummary;
use crate::memory::{OnboardingStage, ProfileField};
use crate::messaging::MessageView;
use crate::text::truncate_chars;

pub const PERSONA_PROMPT: &str = "\
You are a warm, knowledgeable career advisor for a premium fractional executive jobs platform.

## Your Personality
- Friendly and conversational, like a trusted recruiter friend
- Short paragraphs; replies are often read aloud, so keep them brief
- Be specific with numbers and data
- Use bullet points when listing several items

## Profile Questions
The user section below carries the user's name and what you remember about them.
Answer simple profile questions (name, location, target role) directly from it. Do not call a tool for those.
Only call show_user_graph when the user asks to SEE their profile graph.

## Your Tools
You HAVE these tools. Never say you cannot do something a tool does.

| User asks about... | Use |
|--------------------|-----|
| my profile graph, visualize me | show_user_graph |
| what page, where am I | get_page_info |
| day rates, salaries, pay | show_salary_insights |
| jobs, positions, roles | search_jobs |
| job distribution, how many | show_jobs_chart |
| locations, geography | show_location_chart |
| market overview, dashboard | show_market_dashboard |
| articles, reading | get_featured_articles |
| one featured role | show_job_card |
| market snapshot | show_stats_widget |
| messages, inbox | get_my_messages, read_full_message, reply_to_message |

## Ambient Scene
When the user mentions a location or a role, call set_ambient_scene silently.

## Saving Preferences
When the user shares where they are based, the role they want, or their skills and experience,
call save_user_preference silently and carry on the conversation naturally.
Do NOT say \"I'm saving that\" or \"I'll remember that\".

| User says... | Call |
|--------------|------|
| \"I'm in London\" | save_user_preference(\"location\", \"London\") |
| \"I want CTO roles\" | save_user_preference(\"role\", \"CTO\") |
| \"15 years in tech\" | save_user_preference(\"experience\", \"15 years\") |

## Rules
- Never say you are a language model; you are a career advisor with real data.
- After showing jobs, suggest a related chart or salary insights.
- Reference the page the user is on when you know it.
- End with a question or suggestion to keep the conversation going.";

pub const NOT_LOGGED_IN: &str =
    "The user is not logged in. Encourage them to sign in for a personalized experience.";

/// The onboarding question for one checklist field.
pub fn question(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Location => {
            "Which city or region are you based in? (London, Manchester, Remote, etc.)"
        }
        ProfileField::RolePreference => {
            "What type of executive role interests you most? (CTO, CFO, CMO, COO, CHRO, etc.)"
        }
        ProfileField::Experience => {
            "Tell me about your background - how many years of experience do you have?"
        }
    }
}

pub fn build_system_prompt(ctx: &AgentContext) -> String {
    format!("{PERSONA_PROMPT}\n\n{}", user_section(ctx))
}

/// Dynamic part of the system prompt for this request.
pub fn user_section(ctx: &AgentContext) -> String {
    let name = ctx.identity.display_name();
    if !ctx.identity.is_logged_in() && name.is_none() {
        return NOT_LOGGED_IN.to_string();
    }
    let name = name.unwrap_or("there");

    let mut parts = vec![format!(
        "IMPORTANT: The user's name is {name}. Always greet them by name and be personal!"
    )];

    if !ctx.identity.is_logged_in() {
        parts.push(NOT_LOGGED_IN.to_string());
    }

    if !ctx.unread.is_empty() {
        parts.push(unread_block(name, &ctx.unread));
    }

    if !ctx.memory.facts_text.is_empty() {
        parts.push(ctx.memory.facts_text.clone());
        parts.push(
            "\nUse the above memories to personalize your responses. Reference their interests!"
                .to_string(),
        );
    }

    if ctx.identity.is_logged_in() {
        if let Some(directive) = onboarding_directive(ctx.memory.stage(), &ctx.memory.missing, name)
        {
            parts.push(directive);
        }
    }

    if let Some(job) = &ctx.last_discussed_job {
        parts.push(job_block(job));
    }

    if let Some(page) = &ctx.page {
        parts.push(page_block(page));
    }

    parts.join("\n")
}

/// `None` once the checklist is complete.
pub fn onboarding_directive(
    stage: OnboardingStage,
    missing: &[ProfileField],
    name: &str,
) -> Option<String> {
    match stage {
        OnboardingStage::Complete => None,
        OnboardingStage::New => Some(format!(
            "\n\n## NEW USER - Start Onboarding!\n\
             This is a new user with no profile yet.\n\n\
             **Your first message should be:**\n\
             \"Hi {name}! Welcome to Fractional Quest! I'm here to help you find the perfect executive role.\n\n\
             To get us started, which city are you based in - London, Manchester, or are you looking for remote opportunities?\"\n\n\
             Then follow up with role preference and experience questions.\n"
        )),
        OnboardingStage::Partial { next } => {
            let missing: Vec<&str> = missing.iter().map(ProfileField::as_str).collect();
            Some(format!(
                "\n\n## ONBOARDING MODE - Profile Incomplete!\n\
                 This user's profile is missing: {}\n\n\
                 Before recommending jobs, gather this naturally. Ask ONE question at a time.\n\n\
                 **Next question to ask:**\n\
                 \"{}\"\n\n\
                 Their answers are stored automatically. Just have a natural conversation!\n",
                missing.join(", "),
                question(next)
            ))
        }
    }
}

fn unread_block(name: &str, unread: &[MessageView]) -> String {
    let count = unread.len();
    let plural = if count == 1 { "" } else { "s" };
    let Some(latest) = unread.first() else {
        return String::new();
    };

    let mut sender = latest.sender_name.clone();
    if let Some(company) = latest.sender_company.as_deref().filter(|c| !c.is_empty()) {
        sender.push_str(&format!(" from {company}"));
    }
    if let Some(title) = latest.sender_title.as_deref().filter(|t| !t.is_empty()) {
        sender.push_str(&format!(" ({title})"));
    }

    format!(
        "\n\n## UNREAD MESSAGES - MENTION THIS FIRST!\n\
         {name} has {count} unread message{plural} from recruiters/coaches.\n\n\
         **Latest message from {sender}:**\n\
         \"{}\"\n\n\
         In your first response, mention the message naturally and offer to read it out.\n\
         The user can say \"yes read it\", \"tell me more\" or \"later\".\n",
        truncate_chars(&latest.content, 100)
    )
}

fn job_block(job: &JobSummary) -> String {
    format!(
        "\n## Current Conversation Context:\n\
         The user just looked at this job:\n\
         - Title: {}\n\
         - Company: {}\n\
         - Location: {}\n\
         - Salary: {}\n\n\
         When the user says \"that job\", \"this one\" or \"it\", they mean THIS job.",
        job.title,
        job.company,
        job.location,
        salary_text(job.salary_min, job.salary_max)
    )
}

fn page_block(page: &PageContext) -> String {
    let location = page.location.as_deref().unwrap_or("UK");
    let roles = if page.top_roles.is_empty() {
        "various roles".to_string()
    } else {
        page.top_roles
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "\n## Current Page Context:\n\
         User is viewing: {} JOBS PAGE\n\
         - Total jobs on page: {}\n\
         - Top roles: {roles}\n\n\
         When the user says \"jobs here\" or \"this area\", they mean {location}.",
        location.to_uppercase(),
        page.total_jobs.unwrap_or(0)
    )
}
