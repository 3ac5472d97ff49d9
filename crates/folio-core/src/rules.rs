//! Built-in rule tables for the project chat and the contact assistant.
//!
//! Rule order is part of each table's behaviour. Keywords overlap across
//! rules ("What are your main skills?" hits both "ai" and "skill" in the
//! contact table) and the first hit wins.
//!
//! The contact table only requires the owner's name. Optional profile facts
//! (location, skills) are mentioned when present and left out otherwise.

use crate::context::MatchContext;
use crate::matcher::{Response, RuleTable};
use crate::template::ResponseTemplate;

pub const PROJECT_TABLE_ID: &str = "project";
pub const CONTACT_TABLE_ID: &str = "contact";

pub fn project_table() -> RuleTable {
    RuleTable::new(
        PROJECT_TABLE_ID,
        "That's a great question about {title}! This project demonstrates my expertise in \
         {category|lower} and showcases practical problem-solving skills. Feel free to ask about \
         specific technologies, challenges, or features you'd like to know more about.",
    )
    .rule(
        ["tech stack", "technologies", "built with"],
        "This project was built using {technologies}. The technology stack was chosen for its \
         scalability, performance, and developer experience.",
    )
    .rule(["challenge", "difficult", "problem"], "{challenges}")
    .rule(
        ["feature", "functionality", "what does it do"],
        "The main features include: {features|take:3}, and several other capabilities. Each \
         feature was designed with user experience and performance in mind.",
    )
    .rule(["learn", "skill", "experience"], "{learnings}")
    .rule(["purpose", "why", "goal"], "{problem_solution}")
    .rule(
        ["code", "github", "repository"],
        "You can explore the complete source code on GitHub. The codebase follows best practices \
         with clean architecture, comprehensive documentation, and includes unit tests for key \
         functionality.",
    )
    .rule(
        ["future", "next", "improve"],
        "I have several exciting improvements planned for this project, including enhanced \
         features, performance optimizations, and new technologies integration. The roadmap \
         focuses on user feedback and emerging tech trends.",
    )
    .with_suggestions([
        "What's the tech stack?",
        "What challenges did you face?",
        "What are the main features?",
        "What did you learn?",
    ])
}

pub fn contact_table() -> RuleTable {
    RuleTable::new(
        CONTACT_TABLE_ID,
        "I'm designed to help with common inquiries about {name}'s work and background. For \
         unique questions or detailed discussions, please use the contact form below or reach \
         out directly through the provided links!",
    )
    .rule(
        ["attachment", "internship", "opportunity"],
        "For specific attachment inquiries, I'd recommend using the contact form below or \
         connecting directly on LinkedIn. {name} is actively seeking attachment opportunities \
         and would love to discuss how they can contribute to your team with their expertise in \
         software development and AI automation!",
    )
    .rule(
        ["project", "work", "portfolio"],
        "You can view all of {name}'s detailed projects on the Projects page! Would you like me \
         to direct you there? They showcase full-stack applications, AI automation projects, and \
         clean code architecture.",
    )
    .rule(
        ["ai", "prompt", "automation", "cursor", "n8n"],
        "{name} is an expert prompt engineer with extensive experience using AI tools like \
         Cursor for development and building AI automations and agents with n8n. They're \
         passionate about leveraging AI to solve complex problems efficiently!",
    )
    .rule(
        ["contact", "reach", "connect"],
        "You can contact {name} directly through several channels: use the form below, connect \
         on LinkedIn for professional inquiries, send a WhatsApp message for quick questions, or \
         email directly. Choose what works best for you!",
    )
    .rule(
        ["skill", "technology", "experience"],
        Response::computed(skills_reply),
    )
    .rule(
        ["location", "where", "zimbabwe", "bindura"],
        Response::computed(location_reply),
    )
    .rule(
        ["hello", "hi", "hey"],
        "Hello! Great to meet you! I'm here to help you learn more about {name} or connect with \
         them. What would you like to know? You can ask about their projects, AI expertise, \
         skills, or how to get in touch!",
    )
    .with_greeting(
        "Hello! I'm {name}'s AI Connection Assistant. How can I help you learn more about their \
         work or connect with them?",
    )
    .with_suggestions([
        "Tell me about attachment opportunities",
        "What kind of AI automations does {name} build?",
        "How can I contact {name} directly?",
        "What are {name}'s main skills?",
    ])
}

fn has_field(ctx: &MatchContext, key: &str) -> bool {
    ctx.get(key)
        .is_some_and(|value| !value.render().trim().is_empty())
}

fn skills_reply(ctx: &MatchContext) -> String {
    let template = if has_field(ctx, "skills") {
        "{name} has strong expertise in {skills}. You can see a detailed breakdown with \
         proficiency levels on the Skills page. They're always learning new technologies and AI \
         tools!"
    } else {
        "{name} works across full-stack development and AI automation. You can see a detailed \
         breakdown with proficiency levels on the Skills page. They're always learning new \
         technologies and AI tools!"
    };
    ResponseTemplate::new(template).render(ctx)
}

fn location_reply(ctx: &MatchContext) -> String {
    let template = if has_field(ctx, "location") {
        "{name} is currently based in {location} and is actively seeking attachment \
         opportunities. They're open to both local and remote opportunities with the right \
         company."
    } else {
        "{name} is actively seeking attachment opportunities and is open to both local and \
         remote opportunities with the right company."
    };
    ResponseTemplate::new(template).render(ctx)
}

pub fn builtin_tables() -> Vec<RuleTable> {
    vec![project_table(), contact_table()]
}
