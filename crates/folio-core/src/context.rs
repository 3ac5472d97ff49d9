use std::collections::BTreeMap;

use folio_schema::{OwnerProfile, ProjectProfile};

/// A single named value a response template can interpolate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Text(String),
    List(Vec<String>),
}

impl ContextValue {
    /// Text as-is, lists joined with ", ".
    pub fn render(&self) -> String {
        match self {
            ContextValue::Text(text) => text.clone(),
            ContextValue::List(items) => items.join(", "),
        }
    }

    /// Like [`render`](Self::render), but keeps only the first `n` list items.
    pub fn render_first(&self, n: usize) -> String {
        match self {
            ContextValue::Text(text) => text.clone(),
            ContextValue::List(items) => items
                .iter()
                .take(n)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Caller-supplied facts that parameterised responses draw from.
///
/// `subject` names what the conversation is about (a project title, the
/// site owner's name) and is always available to templates as `{subject}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchContext {
    subject: String,
    fields: BTreeMap<String, ContextValue>,
}

impl MatchContext {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.into(), ContextValue::Text(value.into()));
        self
    }

    pub fn with_list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(key.into(), ContextValue::List(values));
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.fields.get(key)
    }

    pub fn for_project(project: &ProjectProfile) -> Self {
        let mut ctx = Self::new(project.title.clone())
            .with_text("id", project.id.clone())
            .with_text("title", project.title.clone())
            .with_text("description", project.description.clone())
            .with_text("category", project.category.clone())
            .with_list("technologies", project.technologies.iter().cloned())
            .with_text("problem_solution", project.problem_solution.clone())
            .with_list("features", project.features.iter().cloned())
            .with_list("challenges", project.challenges.iter().cloned())
            .with_text("learnings", project.learnings.clone())
            .with_list(
                "future_improvements",
                project.future_improvements.iter().cloned(),
            );

        if let Some(url) = &project.github_url {
            ctx = ctx.with_text("github_url", url.clone());
        }
        if let Some(url) = &project.live_url {
            ctx = ctx.with_text("live_url", url.clone());
        }
        ctx
    }

    pub fn for_owner(owner: &OwnerProfile) -> Self {
        let mut ctx = Self::new(owner.name.clone())
            .with_text("name", owner.name.clone())
            .with_list("skills", owner.skills.iter().cloned());

        let optional = [
            ("headline", &owner.headline),
            ("location", &owner.location),
            ("email", &owner.email),
            ("linkedin", &owner.linkedin),
            ("github", &owner.github),
            ("phone", &owner.phone),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                ctx = ctx.with_text(key, value.clone());
            }
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> ProjectProfile {
        ProjectProfile {
            id: "test-project".into(),
            title: "Test Project".into(),
            description: "A test project description".into(),
            category: "Web Development".into(),
            technologies: vec!["React".into(), "TypeScript".into()],
            problem_solution: "Test problem and solution".into(),
            features: vec!["Feature 1".into(), "Feature 2".into()],
            challenges: vec!["Challenge 1".into(), "Challenge 2".into()],
            learnings: "Test learnings".into(),
            future_improvements: vec![],
            github_url: Some("https://github.com/test".into()),
            live_url: None,
        }
    }

    #[test]
    fn list_values_join_with_comma() {
        let value = ContextValue::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(value.render(), "a, b, c");
        assert_eq!(value.render_first(2), "a, b");
        assert_eq!(value.render_first(10), "a, b, c");
    }

    #[test]
    fn text_value_ignores_take_limit() {
        let value = ContextValue::Text("plain".into());
        assert_eq!(value.render_first(0), "plain");
    }

    #[test]
    fn project_context_uses_title_as_subject() {
        let ctx = MatchContext::for_project(&sample_project());
        assert_eq!(ctx.subject(), "Test Project");
        assert_eq!(
            ctx.get("technologies").map(ContextValue::render).as_deref(),
            Some("React, TypeScript")
        );
        assert!(ctx.get("github_url").is_some());
        assert!(ctx.get("live_url").is_none());
    }

    #[test]
    fn owner_context_skips_missing_optional_fields() {
        let owner = OwnerProfile {
            name: "Alex".into(),
            headline: None,
            location: Some("Harare".into()),
            email: None,
            linkedin: None,
            github: None,
            phone: None,
            skills: vec!["Rust".into()],
        };
        let ctx = MatchContext::for_owner(&owner);
        assert_eq!(ctx.subject(), "Alex");
        assert!(ctx.get("location").is_some());
        assert!(ctx.get("email").is_none());
        assert!(ctx.get("headline").is_none());
    }
}
