//! Subcurator CLI entry point

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use subcurator::activity::{NameSet, combine, filter_active, parse_name_list};
use subcurator::cli::{ActivityArgs, Cli, Command, OutputFormat, utterance_text};
use subcurator::config::Config;
use subcurator::intent::{classify, is_exclusion_only_request};
use subcurator::model::ScriptedModel;
use subcurator::plan::{Plan, Reconciler, merge, parse};
use subcurator::session::{Activity, Conversation, ConversationState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("subcurator")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("subcurator.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level comes from config before the full load so the load itself is logged
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Score {
            activity,
            threshold,
            format,
        } => cmd_score(&config, &activity, threshold, format),
        Command::Classify { exclusion, utterance } => cmd_classify(&utterance_text(&utterance), exclusion),
        Command::Parse { file, format } => cmd_parse(file.as_deref(), format),
        Command::Reconcile {
            reply,
            previous,
            subscribed,
            format,
            utterance,
        } => cmd_reconcile(
            &config,
            &reply,
            previous.as_deref(),
            subscribed.as_deref(),
            &utterance_text(&utterance),
            format,
        ),
        Command::Merge { a, b, format } => cmd_merge(&a, &b, format),
        Command::Prompt {
            state,
            activity,
            utterance,
        } => cmd_prompt(&config, state, &activity, &utterance_text(&utterance)),
        Command::Turn {
            state,
            reply,
            activity,
            format,
            utterance,
        } => cmd_turn(&config, state, reply.as_deref(), &activity, &utterance_text(&utterance), format).await,
        Command::Show { state, format } => cmd_show(&config, state, format),
        Command::Reset { state } => cmd_reset(&config, state),
    }
}

fn cmd_score(config: &Config, args: &ActivityArgs, threshold: Option<u8>, format: OutputFormat) -> Result<()> {
    let threshold = threshold.unwrap_or(config.scoring.active_threshold);
    debug!(threshold, "cmd_score: called");
    if !(1..=3).contains(&threshold) {
        return Err(eyre::eyre!("Threshold must be between 1 and 3, got {}", threshold));
    }

    let activity = load_activity(args)?;
    let stats = combine(&activity.subscribed, &activity.upvoted, &activity.commented);
    let active = filter_active(&stats, threshold);

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "threshold": threshold,
                "active": active,
                "stats": stats.values().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            if active.is_empty() {
                println!("No subreddits scored {} or higher", threshold);
            }
            for name in &active {
                println!("{}", name.cyan());
            }
        }
    }
    Ok(())
}

fn cmd_classify(utterance: &str, exclusion: bool) -> Result<()> {
    debug!(exclusion, "cmd_classify: called");
    let intent = classify(utterance);
    let json = if exclusion {
        serde_json::json!({
            "intent": intent,
            "exclusion_only": is_exclusion_only_request(utterance),
        })
    } else {
        serde_json::to_value(&intent)?
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn cmd_parse(file: Option<&Path>, format: OutputFormat) -> Result<()> {
    debug!(?file, "cmd_parse: called");
    let reply = match file {
        Some(path) => read_file(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read reply from stdin")?;
            buf
        }
    };
    print_plan(&parse(&reply), format)
}

fn cmd_reconcile(
    config: &Config,
    reply: &Path,
    previous: Option<&Path>,
    subscribed: Option<&Path>,
    utterance: &str,
    format: OutputFormat,
) -> Result<()> {
    debug!(?reply, ?previous, "cmd_reconcile: called");
    let incoming = parse(&read_file(reply)?);
    let previous = match previous {
        Some(path) => load_plan(path)?,
        None => Plan::default(),
    };
    let subscribed = load_names(subscribed)?;

    let reconciler = Reconciler::new(config.matching.options());
    let plan = reconciler.reconcile(&previous, incoming, utterance, &subscribed);
    print_plan(&plan, format)
}

fn cmd_merge(a: &Path, b: &Path, format: OutputFormat) -> Result<()> {
    debug!(?a, ?b, "cmd_merge: called");
    let plan = merge(&load_plan(a)?, &load_plan(b)?);
    print_plan(&plan, format)
}

fn cmd_prompt(config: &Config, state: Option<PathBuf>, args: &ActivityArgs, utterance: &str) -> Result<()> {
    debug!("cmd_prompt: called");
    let state = ConversationState::load(&state_path(config, state))?;
    let activity = load_activity(args)?;

    // The prompt never reaches a model, so an empty script is enough
    let conversation = conversation(config, Vec::new());
    let intent = classify(utterance);
    println!("{}", conversation.prompt_for(&state, utterance, &intent, &activity));
    Ok(())
}

async fn cmd_turn(
    config: &Config,
    state: Option<PathBuf>,
    reply: Option<&Path>,
    args: &ActivityArgs,
    utterance: &str,
    format: OutputFormat,
) -> Result<()> {
    debug!(?reply, "cmd_turn: called");
    let path = state_path(config, state);
    let mut state = ConversationState::load(&path)?;
    let activity = load_activity(args)?;

    let replies = match reply {
        Some(path) => vec![read_file(path)?],
        None => Vec::new(),
    };
    let conversation = conversation(config, replies);
    let outcome = conversation
        .turn(&mut state, utterance, &activity)
        .await
        .context("Turn needed a model reply; pass one with --reply")?;

    if !outcome.view_only {
        state.save(&path)?;
        info!(path = %path.display(), "Saved conversation state");
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            if outcome.model_called {
                if outcome.no_matches {
                    println!("{}", outcome.reply.yellow());
                } else {
                    print!("{}", colorize_plan(&outcome.plan));
                }
            } else {
                println!("{}", outcome.reply.trim_end());
            }
        }
    }
    Ok(())
}

fn cmd_show(config: &Config, state: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    debug!("cmd_show: called");
    let state = ConversationState::load(&state_path(config, state))?;
    print_plan(&state.last_plan, format)
}

fn cmd_reset(config: &Config, state: Option<PathBuf>) -> Result<()> {
    let path = state_path(config, state);
    debug!(path = %path.display(), "cmd_reset: called");
    if path.exists() {
        fs::remove_file(&path).context(format!("Failed to remove state file {}", path.display()))?;
        println!("{} Conversation reset", "✓".green());
    } else {
        println!("Nothing to reset");
    }
    Ok(())
}

fn conversation(config: &Config, replies: Vec<String>) -> Conversation {
    let model = Arc::new(ScriptedModel::new(replies));
    Conversation::new(model, Reconciler::new(config.matching.options()))
        .with_active_threshold(config.scoring.active_threshold)
}

fn state_path(config: &Config, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| config.conversation.state_file.clone())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(format!("Failed to read {}", path.display()))
}

fn load_names(path: Option<&Path>) -> Result<NameSet> {
    match path {
        Some(path) => Ok(parse_name_list(&read_file(path)?)),
        None => Ok(NameSet::new()),
    }
}

fn load_activity(args: &ActivityArgs) -> Result<Activity> {
    Ok(Activity {
        subscribed: load_names(args.subscribed.as_deref())?,
        upvoted: load_names(args.upvoted.as_deref())?,
        commented: load_names(args.commented.as_deref())?,
    })
}

fn load_plan(path: &Path) -> Result<Plan> {
    let content = read_file(path)?;
    serde_json::from_str(&content).context(format!("Failed to parse plan {}", path.display()))
}

fn print_plan(plan: &Plan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Text => print!("{}", colorize_plan(plan)),
    }
    Ok(())
}

fn colorize_plan(plan: &Plan) -> String {
    plan.to_string()
        .lines()
        .map(|line| {
            let colored = match line.trim_start().chars().next() {
                Some('+') => line.green().to_string(),
                Some('-') => line.red().to_string(),
                Some('=') => line.cyan().to_string(),
                _ => line.bold().to_string(),
            };
            colored + "\n"
        })
        .collect()
}
