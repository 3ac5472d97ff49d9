use std::{collections::HashSet, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context, Result};
use folio_schema::{OwnerProfile, ProjectProfile};
use serde::{Deserialize, Serialize};

use crate::context::MatchContext;
use crate::matcher::RuleTable;
use crate::rules::{builtin_tables, CONTACT_TABLE_ID, PROJECT_TABLE_ID};
use crate::template::ResponseTemplate;

fn default_reply_delay_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainConfig {
    pub app: AppConfig,
    pub owner: OwnerProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub keywords: Vec<String>,
    pub response: String,
}

/// Hand-authored rule table. Replaces the built-in table with the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTableConfig {
    pub id: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub rules: Vec<RuleConfig>,
    pub default: String,
}

impl From<&RuleTableConfig> for RuleTable {
    fn from(config: &RuleTableConfig) -> Self {
        let mut table = config.rules.iter().fold(
            RuleTable::new(config.id.clone(), config.default.as_str()),
            |table, rule| table.rule(rule.keywords.iter().cloned(), rule.response.as_str()),
        );
        if let Some(greeting) = &config.greeting {
            table = table.with_greeting(greeting.as_str());
        }
        table.with_suggestions(config.suggestions.iter().cloned().map(ResponseTemplate::from))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolioConfig {
    pub main: MainConfig,
    #[serde(default)]
    pub projects: Vec<ProjectProfile>,
    #[serde(default)]
    pub rule_tables: Vec<RuleTableConfig>,
}

impl FolioConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.main.app.reply_delay_ms)
    }

    pub fn project(&self, id: &str) -> Option<&ProjectProfile> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Built-in tables with configured overrides applied, followed by any
    /// configured tables that have no built-in counterpart.
    pub fn rule_tables(&self) -> Vec<RuleTable> {
        let mut tables: Vec<RuleTable> = builtin_tables()
            .into_iter()
            .map(|builtin| {
                self.rule_tables
                    .iter()
                    .find(|configured| configured.id == builtin.id())
                    .map(RuleTable::from)
                    .unwrap_or(builtin)
            })
            .collect();

        for configured in &self.rule_tables {
            if !tables.iter().any(|table| table.id() == configured.id) {
                tables.push(RuleTable::from(configured));
            }
        }
        tables
    }

    pub fn rule_table(&self, id: &str) -> Option<RuleTable> {
        self.rule_tables().into_iter().find(|table| table.id() == id)
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Loads `main.yaml`, `projects.d/*.yaml` and `rules.d/*.yaml` from `root`.
/// Only `main.yaml` is required.
pub fn load_config(root: &Path) -> Result<FolioConfig> {
    let mut main: MainConfig = read_yaml_file(&root.join("main.yaml"))?;
    let projects = read_optional_yaml_dir::<ProjectProfile>(&root.join("projects.d"))?;
    let rule_tables = read_optional_yaml_dir::<RuleTableConfig>(&root.join("rules.d"))?;

    resolve_main_env(&mut main);

    let config = FolioConfig {
        main,
        projects,
        rule_tables,
    };

    validate_config(&config)?;
    tracing::debug!(
        projects = config.projects.len(),
        rule_tables = config.rule_tables.len(),
        "config loaded"
    );
    Ok(config)
}

pub fn validate_config(config: &FolioConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for project in &config.projects {
        if !seen.insert(project.id.as_str()) {
            return Err(anyhow!("duplicate project id: {}", project.id));
        }
    }

    let mut seen = HashSet::new();
    for table in &config.rule_tables {
        if !seen.insert(table.id.as_str()) {
            return Err(anyhow!("duplicate rule table id: {}", table.id));
        }
        for (index, rule) in table.rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                return Err(anyhow!(
                    "rule {index} in table {} has no keywords",
                    table.id
                ));
            }
            for keyword in &rule.keywords {
                if keyword.is_empty() {
                    return Err(anyhow!(
                        "empty keyword in rule {index} of table {}",
                        table.id
                    ));
                }
                if keyword.to_lowercase() != *keyword {
                    return Err(anyhow!(
                        "keyword must be lower-case: {keyword:?} in rule {index} of table {}",
                        table.id
                    ));
                }
            }
        }
    }

    validate_bindings(config)
}

/// Every project must fill the project table, and the owner must fill the
/// contact table, so no visitor ever sees a raw `{field}`.
fn validate_bindings(config: &FolioConfig) -> Result<()> {
    if let Some(table) = config.rule_table(PROJECT_TABLE_ID) {
        for project in &config.projects {
            let missing = table.missing_fields(&MatchContext::for_project(project));
            if !missing.is_empty() {
                return Err(anyhow!(
                    "project {} is missing fields used by rule table {}: {}",
                    project.id,
                    table.id(),
                    missing.join(", ")
                ));
            }
        }
    }

    if let Some(table) = config.rule_table(CONTACT_TABLE_ID) {
        let missing = table.missing_fields(&MatchContext::for_owner(&config.main.owner));
        if !missing.is_empty() {
            return Err(anyhow!(
                "owner profile is missing fields used by rule table {}: {}",
                table.id(),
                missing.join(", ")
            ));
        }
    }

    Ok(())
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}

fn read_optional_yaml_dir<T>(dir: &Path) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read config dir: {}", dir.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to read dir entry: {}", dir.display()))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("yaml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        items.push(read_yaml_file::<T>(&path)?);
    }
    Ok(items)
}

fn resolve_main_env(main: &mut MainConfig) {
    main.app.name = resolve_env_var(&main.app.name);

    let owner = &mut main.owner;
    owner.name = resolve_env_var(&owner.name);
    for field in [
        &mut owner.headline,
        &mut owner.location,
        &mut owner.email,
        &mut owner.linkedin,
        &mut owner.github,
        &mut owner.phone,
    ]
    .into_iter()
    .flatten()
    {
        *field = resolve_env_var(field);
    }
}
