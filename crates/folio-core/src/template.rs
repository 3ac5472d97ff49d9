//! `{field}` interpolation for canned responses.
//!
//! Placeholders name a [`MatchContext`] field, optionally followed by a
//! filter: `{category|lower}` or `{features|take:3}`. `{subject}` always
//! resolves to the context subject. A placeholder that cannot be resolved is
//! emitted verbatim, braces included; [`ResponseTemplate::unresolved`] lets
//! callers refuse such a pairing up front.

use crate::context::{ContextValue, MatchContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate(String);

impl ResponseTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw text of every `{...}` placeholder, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut found = Vec::new();
        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('{') {
            let candidate = &rest[start + 1..];
            let Some(end) = candidate.find('}') else {
                break;
            };
            found.push(&candidate[..end]);
            rest = &candidate[end + 1..];
        }
        found
    }

    /// Placeholders that would not turn into real text for `ctx`: unknown
    /// fields, unknown filters, and fields whose value is blank.
    pub fn unresolved(&self, ctx: &MatchContext) -> Vec<&str> {
        self.placeholders()
            .into_iter()
            .filter(|placeholder| {
                resolve_placeholder(placeholder, ctx)
                    .map_or(true, |value| value.trim().is_empty())
            })
            .collect()
    }

    pub fn render(&self, ctx: &MatchContext) -> String {
        let mut output = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find('{') {
            output.push_str(&rest[..start]);

            let candidate = &rest[start + 1..];
            let Some(end) = candidate.find('}') else {
                output.push_str(&rest[start..]);
                return output;
            };

            let placeholder = &candidate[..end];
            match resolve_placeholder(placeholder, ctx) {
                Some(value) => output.push_str(&value),
                None => {
                    output.push('{');
                    output.push_str(placeholder);
                    output.push('}');
                }
            }
            rest = &candidate[end + 1..];
        }

        output.push_str(rest);
        output
    }
}

impl From<&str> for ResponseTemplate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ResponseTemplate {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

fn resolve_placeholder(raw: &str, ctx: &MatchContext) -> Option<String> {
    let (name, filter) = match raw.split_once('|') {
        Some((name, filter)) => (name.trim(), Some(filter.trim())),
        None => (raw.trim(), None),
    };

    let subject;
    let value = if name == "subject" {
        subject = ContextValue::Text(ctx.subject().to_string());
        &subject
    } else {
        ctx.get(name)?
    };

    match filter {
        None => Some(value.render()),
        Some("lower") => Some(value.render().to_lowercase()),
        Some(filter) => {
            let count = filter.strip_prefix("take:")?.trim().parse::<usize>().ok()?;
            Some(value.render_first(count))
        }
    }
}
