use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coral_agents::{MessageInput, ResortAgent};
use coral_core::{AgentConfig, Category, HandlerInput};
use coral_knowledge::PolicyKnowledgeBase;
use coral_observability::{init_tracing, AppMetrics};
use coral_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "coraldesk")]
#[command(about = "Coral Cloud Resorts manager CLI")]
struct Cli {
    /// Optional JSON agent configuration (keyword tables, templates).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional directory of extra policy documents (.md/.json).
    #[arg(long)]
    policy_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat with the resort manager agent.
    Chat,
    /// One-shot message, prints the full response record.
    Ask {
        text: String,
        /// Skip classification and route to this category directly
        /// (e.g. "reservation" or "policy_inquiry").
        #[arg(long)]
        category: Option<String>,
    },
    /// Look up a guest reservation.
    Reservation { guest: String },
    /// Update an employee shift.
    Schedule {
        employee_id: String,
        shift_type: String,
        date: String,
    },
    /// Recommend activities for a preference.
    Activities { preference: String },
    /// Search the policy knowledge base.
    Policy { query: String },
    /// Delete conversation logs past their retention window.
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("coral_cli");
    let cli = Cli::parse();

    let agent = build_agent(cli.config.as_deref(), cli.policy_dir.as_deref()).await?;

    match cli.command {
        Command::Chat => run_chat(agent).await?,
        Command::Ask { text, category } => match category {
            Some(raw) => {
                let category = Category::parse(&raw)
                    .with_context(|| format!("unknown category: {raw}"))?;
                let record = agent.dispatch(category, &HandlerInput::from_text(text)).await;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            None => {
                let outcome = agent.handle_message(MessageInput::from_text(text)).await;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
        },
        Command::Reservation { guest } => {
            let input = HandlerInput {
                customer_name: Some(guest),
                ..HandlerInput::default()
            };
            let record = agent.dispatch(Category::ReservationLookup, &input).await;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Schedule {
            employee_id,
            shift_type,
            date,
        } => {
            let input = HandlerInput {
                employee_id: Some(employee_id),
                shift_type: Some(shift_type),
                date: Some(date),
                ..HandlerInput::default()
            };
            let record = agent.dispatch(Category::ScheduleUpdate, &input).await;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Activities { preference } => {
            let input = HandlerInput {
                guest_preferences: Some(preference),
                ..HandlerInput::default()
            };
            let record = agent
                .dispatch(Category::ActivityRecommendation, &input)
                .await;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Policy { query } => {
            let policies = agent.search_policies(&query);
            println!("{}", serde_json::to_string_pretty(&policies)?);
        }
        Command::Purge => {
            let removed = agent.purge_expired_logs().await?;
            println!("removed {removed} expired conversation logs");
        }
    }

    Ok(())
}

async fn run_chat(agent: ResortAgent<Store>) -> Result<()> {
    let mut session_id: Option<String> = None;

    println!("Coral Cloud Resorts manager. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let outcome = agent
            .handle_message(MessageInput {
                session_id: session_id.clone(),
                guest_id: None,
                input: HandlerInput::from_text(message),
            })
            .await;

        session_id = Some(outcome.session_id.clone());

        println!("\n[{}] {}\n", outcome.record.category.as_label(), outcome.record.message);
        if outcome.record.escalated {
            println!("(escalated)\n");
        }
    }

    Ok(())
}

async fn build_agent(
    config_path: Option<&std::path::Path>,
    policy_dir: Option<&std::path::Path>,
) -> Result<ResortAgent<Store>> {
    let metrics = AppMetrics::shared();

    let config = match config_path {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig::default(),
    };

    let knowledge = match policy_dir {
        Some(dir) => PolicyKnowledgeBase::from_dir(dir)
            .with_context(|| format!("failed loading policy documents from {}", dir.display()))?,
        None => PolicyKnowledgeBase::builtin(),
    };

    let store = if let Ok(database_url) = env::var("CORAL_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };

    ResortAgent::new(config, Arc::new(knowledge), Arc::new(store), metrics)
}
