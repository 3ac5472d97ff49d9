use std::fmt;
use std::sync::Arc;

use crate::context::MatchContext;
use crate::template::ResponseTemplate;

pub type ResponseFn = Arc<dyn Fn(&MatchContext) -> String + Send + Sync>;

/// What a rule (or a table default) answers with.
#[derive(Clone)]
pub enum Response {
    Template(ResponseTemplate),
    Computed(ResponseFn),
}

impl Response {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&MatchContext) -> String + Send + Sync + 'static,
    {
        Response::Computed(Arc::new(f))
    }

    pub fn render(&self, ctx: &MatchContext) -> String {
        match self {
            Response::Template(template) => template.render(ctx),
            Response::Computed(f) => f(ctx),
        }
    }

    /// Template placeholders `ctx` cannot fill. Computed responses handle
    /// missing fields themselves and never report any.
    pub fn unresolved(&self, ctx: &MatchContext) -> Vec<&str> {
        match self {
            Response::Template(template) => template.unresolved(ctx),
            Response::Computed(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Response::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Response {
    fn from(raw: &str) -> Self {
        Response::Template(ResponseTemplate::new(raw))
    }
}

impl From<String> for Response {
    fn from(raw: String) -> Self {
        Response::Template(ResponseTemplate::new(raw))
    }
}

impl From<ResponseTemplate> for Response {
    fn from(template: ResponseTemplate) -> Self {
        Response::Template(template)
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    keywords: Vec<String>,
    response: Response,
}

impl Rule {
    pub fn new<I, S>(keywords: I, response: impl Into<Response>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            response: response.into(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Plain substring test against already lower-cased input. Empty
    /// keywords never match.
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && normalized.contains(keyword.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Position of the winning rule, `None` when the default answered
    pub rule_index: Option<usize>,
    pub text: String,
}

/// Maps free text to a canned reply. Implementations must be pure: the same
/// input and context always produce the same reply.
pub trait ResponseMatcher: Send + Sync {
    fn respond(&self, input: &str, ctx: &MatchContext) -> String;

    /// Opening line a hosting view may show before any turn is taken.
    fn greeting(&self, _ctx: &MatchContext) -> Option<String> {
        None
    }

    fn suggestions(&self, _ctx: &MatchContext) -> Vec<String> {
        Vec::new()
    }
}

/// An ordered rule list evaluated first-match-wins.
#[derive(Debug, Clone)]
pub struct RuleTable {
    id: String,
    rules: Vec<Rule>,
    default: Response,
    greeting: Option<Response>,
    suggestions: Vec<ResponseTemplate>,
}

impl RuleTable {
    pub fn new(id: impl Into<String>, default: impl Into<Response>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
            default: default.into(),
            greeting: None,
            suggestions: Vec::new(),
        }
    }

    pub fn rule<I, S>(mut self, keywords: I, response: impl Into<Response>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(Rule::new(keywords, response));
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<Response>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResponseTemplate>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Placeholders anywhere in the table (rules, default, greeting,
    /// suggestions) that would render as raw `{...}` or blank text against
    /// `ctx`. Empty when the table can be safely bound to the context.
    pub fn missing_fields(&self, ctx: &MatchContext) -> Vec<String> {
        let responses = self
            .rules
            .iter()
            .map(|rule| &rule.response)
            .chain(std::iter::once(&self.default))
            .chain(self.greeting.iter());

        let mut missing: Vec<String> = Vec::new();
        let unresolved = responses
            .flat_map(|response| response.unresolved(ctx))
            .chain(self.suggestions.iter().flat_map(|s| s.unresolved(ctx)));
        for placeholder in unresolved {
            if !missing.iter().any(|seen| seen == placeholder) {
                missing.push(placeholder.to_string());
            }
        }
        missing
    }

    pub fn evaluate(&self, input: &str, ctx: &MatchContext) -> MatchOutcome {
        let normalized = input.to_lowercase();

        match self.rules.iter().position(|rule| rule.matches(&normalized)) {
            Some(index) => MatchOutcome {
                rule_index: Some(index),
                text: self.rules[index].response.render(ctx),
            },
            None => MatchOutcome {
                rule_index: None,
                text: self.default.render(ctx),
            },
        }
    }
}

impl ResponseMatcher for RuleTable {
    fn respond(&self, input: &str, ctx: &MatchContext) -> String {
        let outcome = self.evaluate(input, ctx);
        tracing::trace!(
            table = %self.id,
            rule_index = ?outcome.rule_index,
            "matched input"
        );
        outcome.text
    }

    fn greeting(&self, ctx: &MatchContext) -> Option<String> {
        self.greeting.as_ref().map(|greeting| greeting.render(ctx))
    }

    fn suggestions(&self, ctx: &MatchContext) -> Vec<String> {
        self.suggestions.iter().map(|s| s.render(ctx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RuleTable {
        RuleTable::new("test", "Nothing about {subject} matched")
            .rule(["tech stack", "built with"], "stack")
            .rule(["challenge"], "challenge")
            .rule(["ai"], "ai")
    }

    #[test]
    fn first_matching_rule_wins() {
        let ctx = MatchContext::new("Demo");
        let outcome = table().evaluate("What challenge did the tech stack pose?", &ctx);
        assert_eq!(outcome.rule_index, Some(0));
        assert_eq!(outcome.text, "stack");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let ctx = MatchContext::new("Demo");
        assert_eq!(table().respond("BUILT WITH what?", &ctx), "stack");
    }

    #[test]
    fn matching_is_substring_not_word() {
        let ctx = MatchContext::new("Demo");
        assert_eq!(table().respond("She said so", &ctx), "ai");
    }

    #[test]
    fn no_match_falls_back_to_default() {
        let ctx = MatchContext::new("Demo");
        let outcome = table().evaluate("xyzzy", &ctx);
        assert_eq!(outcome.rule_index, None);
        assert_eq!(outcome.text, "Nothing about Demo matched");
    }

    #[test]
    fn empty_and_whitespace_input_use_default() {
        let ctx = MatchContext::new("Demo");
        assert_eq!(table().evaluate("", &ctx).rule_index, None);
        assert_eq!(table().evaluate("   \t", &ctx).rule_index, None);
    }

    #[test]
    fn empty_keyword_never_matches() {
        let table = RuleTable::new("t", "default").rule([""], "empty");
        let ctx = MatchContext::new("Demo");
        assert_eq!(table.respond("anything", &ctx), "default");
    }

    #[test]
    fn punctuation_is_not_stripped() {
        let table = RuleTable::new("t", "default").rule(["tech-stack"], "dashed");
        let ctx = MatchContext::new("Demo");
        assert_eq!(table.respond("tech stack", &ctx), "default");
        assert_eq!(table.respond("Tech-Stack?", &ctx), "dashed");
    }

    #[test]
    fn computed_response_sees_context() {
        let table = RuleTable::new("t", "default").rule(
            ["who"],
            Response::computed(|ctx: &MatchContext| format!("It is {}", ctx.subject())),
        );
        let ctx = MatchContext::new("Demo");
        assert_eq!(table.respond("who?", &ctx), "It is Demo");
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let ctx = MatchContext::new("Demo");
        let table = table();
        let first = table.respond("tell me about the challenge", &ctx);
        for _ in 0..10 {
            assert_eq!(table.respond("tell me about the challenge", &ctx), first);
        }
    }

    #[test]
    fn greeting_and_suggestions_render_from_context() {
        let table = RuleTable::new("t", "default")
            .with_greeting("Hi, I speak for {subject}.")
            .with_suggestions(["What does {subject} do?"]);
        let ctx = MatchContext::new("Alex");
        assert_eq!(
            table.greeting(&ctx).as_deref(),
            Some("Hi, I speak for Alex.")
        );
        assert_eq!(table.suggestions(&ctx), vec!["What does Alex do?"]);
    }

    #[test]
    fn missing_fields_covers_every_template_once() {
        let table = RuleTable::new("t", "About {title}")
            .rule(["a"], "{title} uses {technologies}")
            .rule(["b"], Response::computed(|_: &MatchContext| "{ignored}".to_string()))
            .with_greeting("Hi from {name}")
            .with_suggestions(["Ask {subject} about {technologies}"]);

        let ctx = MatchContext::new("Demo");
        assert_eq!(table.missing_fields(&ctx), vec!["title", "technologies", "name"]);

        let ctx = ctx
            .with_text("title", "Demo")
            .with_list("technologies", ["Rust"])
            .with_text("name", "Alex");
        assert!(table.missing_fields(&ctx).is_empty());
    }

    #[test]
    fn table_without_greeting_returns_none() {
        let ctx = MatchContext::new("Demo");
        assert!(table().greeting(&ctx).is_none());
        assert!(table().suggestions(&ctx).is_empty());
    }
}
