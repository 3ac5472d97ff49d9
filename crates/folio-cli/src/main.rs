use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_core::*;

#[derive(Parser)]
#[command(name = "folio", version, about = "Portfolio assistant chat")]
struct Cli {
    #[arg(long, default_value = "config", help = "Config directory (contains main.yaml)")]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate config files")]
    Validate,
    #[command(about = "List configured projects")]
    Projects {
        #[arg(long, help = "Only show projects in this category")]
        category: Option<String>,
    },
    #[command(about = "Answer a single question without the reply delay")]
    Ask {
        #[arg(long, help = "Rule table ID (defaults to project or contact)")]
        table: Option<String>,
        #[arg(long, help = "Project ID to ask about")]
        project: Option<String>,
        #[arg(long, help = "Show which rule answered")]
        explain: bool,
        #[arg(help = "Question text")]
        question: String,
    },
    #[command(about = "Interactive chat with a project or the contact assistant")]
    Chat {
        #[arg(long, help = "Project ID to chat about")]
        project: Option<String>,
    },
    #[command(about = "Check a contact form message and print it as JSON")]
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => {
            let config = load_config(&cli.config_root)?;
            println!(
                "Config valid. {} projects, {} rule tables ({} configured).",
                config.projects.len(),
                config.rule_tables().len(),
                config.rule_tables.len()
            );
        }
        Commands::Projects { category } => {
            let config = load_config(&cli.config_root)?;
            println!("{:<22} {:<18} {:<30}", "PROJECT ID", "CATEGORY", "TITLE");
            println!("{}", "-".repeat(70));
            for project in config.projects.iter().filter(|p| {
                category
                    .as_deref()
                    .map(|c| p.category.eq_ignore_ascii_case(c))
                    .unwrap_or(true)
            }) {
                println!(
                    "{:<22} {:<18} {:<30}",
                    project.id, project.category, project.title
                );
            }
        }
        Commands::Ask {
            table,
            project,
            explain,
            question,
        } => {
            let config = load_config(&cli.config_root)?;
            let (table, ctx) = resolve_binding(&config, table.as_deref(), project.as_deref())?;
            let outcome = table.evaluate(&question, &ctx);
            if explain {
                match outcome.rule_index {
                    Some(index) => println!(
                        "[{}] rule {index} ({})",
                        table.id(),
                        table.rules()[index].keywords().join(", ")
                    ),
                    None => println!("[{}] default", table.id()),
                }
            }
            println!("{}", outcome.text);
        }
        Commands::Chat { project } => {
            run_repl(&cli.config_root, project.as_deref()).await?;
        }
        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => {
            let form = ContactForm {
                name,
                email,
                subject,
                message,
            };
            form.validate()?;
            tracing::info!(email = %form.email.trim(), "contact message accepted");
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
    }

    Ok(())
}

/// Picks the rule table and context for a project chat (when `project` is
/// set) or the contact assistant. Refuses pairings where the table would
/// print raw `{field}` placeholders.
fn resolve_binding(
    config: &FolioConfig,
    table: Option<&str>,
    project: Option<&str>,
) -> Result<(RuleTable, MatchContext)> {
    let ctx = match project {
        Some(id) => {
            let project = config
                .project(id)
                .ok_or_else(|| anyhow!("unknown project: {id}"))?;
            MatchContext::for_project(project)
        }
        None => MatchContext::for_owner(&config.main.owner),
    };

    let table_id = table.unwrap_or(if project.is_some() {
        PROJECT_TABLE_ID
    } else {
        CONTACT_TABLE_ID
    });
    let table = config
        .rule_table(table_id)
        .ok_or_else(|| anyhow!("unknown rule table: {table_id}"))?;

    let missing = table.missing_fields(&ctx);
    if !missing.is_empty() {
        return Err(anyhow!(
            "rule table {table_id} cannot answer about {}: missing {}",
            ctx.subject(),
            missing.join(", ")
        ));
    }

    Ok((table, ctx))
}

async fn run_repl(root: &Path, project: Option<&str>) -> Result<()> {
    let config = load_config(root)?;
    let (table, ctx) = resolve_binding(&config, None, project)?;
    let session = ConversationSession::new(Arc::new(table), ctx)
        .with_reply_delay(config.reply_delay());

    tracing::info!(session_id = %session.id(), project = ?project, "chat session started");

    println!("{} chat. Type 'quit' to exit, '/suggest' for ideas.", config.main.app.name);
    println!("---");
    if let Some(greeting) = session.greeting() {
        println!("assistant: {greeting}");
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        let text = match input {
            "quit" | "exit" => break,
            "/reset" => {
                session.reset();
                println!("(conversation cleared)");
                continue;
            }
            "/transcript" => {
                println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
                continue;
            }
            "/suggest" => {
                for (index, suggestion) in session.suggestions().iter().enumerate() {
                    println!("  /{} {suggestion}", index + 1);
                }
                continue;
            }
            other => match pick_suggestion(other, &session.suggestions()) {
                Some(suggestion) => suggestion,
                None => other.to_string(),
            },
        };

        match session.submit(&text) {
            SubmitOutcome::Accepted { .. } => {
                println!("(typing...)");
                let snapshot = session.settled().await;
                if let Some(reply) = snapshot.last_reply() {
                    println!("assistant: {}", reply.text);
                }
            }
            SubmitOutcome::EmptyInput | SubmitOutcome::AwaitingResponse => {}
        }
    }

    Ok(())
}

/// `/2` submits the second suggestion.
fn pick_suggestion(input: &str, suggestions: &[String]) -> Option<String> {
    let index = input.strip_prefix('/')?.parse::<usize>().ok()?;
    suggestions.get(index.checked_sub(1)?).cloned()
}
