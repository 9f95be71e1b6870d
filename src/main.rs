use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use news_parser::agent::{self, AgentOptions, AnalysisAgent};
use news_parser::bird::{self, BirdClient};
use news_parser::config::FiltersConfig;
use news_parser::prelude::*;
use news_parser::report::{self, MarkdownWriter};
use rand::seq::SliceRandom;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// X/Twitter news parser: fetch, filter, and analyze tweets
#[derive(Parser, Debug)]
#[command(name = "news-parser")]
#[command(about = "Fetch, filter, and analyze X/Twitter feeds")]
#[command(version)]
struct Args {
    /// Config file (default: ./config.yaml, then ~/.config/news-parser/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// YAML file with filter pattern lists
    #[arg(long, global = true)]
    patterns: Option<PathBuf>,

    /// System prompt file for AI analysis
    #[arg(long = "system-prompt", global = true)]
    system_prompt: Option<PathBuf>,

    /// Analysis prompt template ({tweets} and {focus} are substituted)
    #[arg(long = "analysis-prompt", global = true)]
    analysis_prompt: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// A command typed at the interactive prompt
#[derive(Parser, Debug)]
#[command(name = "news-parser", no_binary_name = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone)]
struct OutputArgs {
    /// Number of tweets to fetch
    #[arg(short, long, default_value_t = 50)]
    count: usize,

    /// Save to file with auto-timestamped name
    #[arg(short, long)]
    save: bool,

    /// Save to file at specified path (inside the output directory)
    #[arg(short, long)]
    output: Option<String>,

    /// Run AI analysis on the fetched tweets
    #[arg(long)]
    analyze: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Fetch your home timeline
    Timeline {
        #[command(flatten)]
        out: OutputArgs,

        /// Skip content filtering
        #[arg(long)]
        no_filter: bool,
    },

    /// Fetch your bookmarks
    Bookmarks {
        #[command(flatten)]
        out: OutputArgs,

        /// Skip content filtering
        #[arg(long)]
        no_filter: bool,

        /// Fetch all bookmark pages and pick a random sample of --count
        #[arg(long)]
        shuffle: bool,
    },

    /// Fetch tweets from a specific user
    User {
        /// Twitter handle (with or without @)
        handle: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Search for tweets matching a query
    Search {
        query: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Show system status and configuration
    Status,

    /// Run several commands in one session
    Interactive,
}

const REPL_HELP: &str = "Available commands:
  timeline [--count N] [--analyze] [--save] [--output FILE] [--no-filter]
  bookmarks [--count N] [--analyze] [--save] [--output FILE] [--no-filter] [--shuffle]
  user <handle> [--count N] [--analyze] [--save] [--output FILE]
  search <query> [--count N] [--analyze] [--save] [--output FILE]
  status
  exit";

fn print_available_commands() {
    println!("Available commands:");
    println!("  timeline     Fetch your home timeline");
    println!("  bookmarks    Fetch your bookmarks");
    println!("  user         Fetch tweets from a specific user");
    println!("  search       Search for tweets matching a query");
    println!("  status       Show system status and configuration");
    println!("  interactive  Run several commands in one session");
}

/// Settings shared by every command in a session
struct App {
    config: Config,
    patterns: PatternSet,
    system_prompt: Option<PathBuf>,
    analysis_prompt: Option<PathBuf>,
}

impl App {
    fn load(args: &Args) -> anyhow::Result<Self> {
        let config = load_config(args.config.as_deref()).context("Failed to load config")?;
        let patterns = PatternSet::load(config.filters.patterns.as_ref(), args.patterns.as_deref())
            .context("Failed to load filter patterns")?;

        // Command-line prompt paths win over the ones named in the config
        let system_prompt = args
            .system_prompt
            .clone()
            .or_else(|| config.prompts.system.as_deref().map(|p| config.resolve_path(p)));
        let analysis_prompt = args
            .analysis_prompt
            .clone()
            .or_else(|| config.prompts.analysis.as_deref().map(|p| config.resolve_path(p)));

        Ok(Self {
            config,
            patterns,
            system_prompt,
            analysis_prompt,
        })
    }

    fn writer(&self) -> anyhow::Result<MarkdownWriter> {
        MarkdownWriter::new(&self.config.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.config.output_dir.display())
        })
    }
}

/// Filter options for a command run. Config overrides are layered on top of
/// the profile's own thresholds; analysis is filtered even without a profile.
fn filter_options(filters: &FiltersConfig, profile: FilterProfile, analyze: bool) -> Option<FilterOptions> {
    if analyze {
        Some(profile.analysis_options(filters))
    } else {
        profile.options().map(|options| options.with_config(filters))
    }
}

/// Apply the filter, keeping order. `None` keeps every tweet.
fn apply_filter<'a>(
    patterns: &PatternSet,
    options: Option<FilterOptions>,
    tweets: &'a [Tweet],
) -> Vec<&'a Tweet> {
    let Some(options) = options else {
        return tweets.iter().collect();
    };

    let filter = ContentFilter::new(options, patterns);
    let (passed, _) = filter.filter_tweets(tweets);

    eprintln!("✓ Kept {} of {} tweets", passed.len(), tweets.len());
    let filtered_out = tweets.len() - passed.len();
    if filtered_out > 0 {
        eprintln!("  {} tweets filtered out", filtered_out);
    }
    passed
}

fn output_report(
    app: &App,
    parsed: &ParsedContent,
    prefix: &str,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    if !out.save && out.output.is_none() {
        print!("{}", report::render_console(parsed));
        return Ok(());
    }

    let filename = match &out.output {
        Some(name) => name.clone(),
        None => report::timestamped_filename(&report::file_label(prefix), Local::now().naive_local()),
    };
    let path = app
        .writer()?
        .write_report(parsed, Some(&filename))
        .context("Failed to write report")?;
    eprintln!("✓ Report saved to {}", path.display());
    Ok(())
}

fn load_prompt(path: Option<&Path>, default: &str) -> anyhow::Result<String> {
    agent::load_prompt(path, default).with_context(|| match path {
        Some(p) => format!("Failed to read prompt {}", p.display()),
        None => "Failed to load built-in prompt".to_string(),
    })
}

/// Run AI analysis, print it, and always save it to the output directory
async fn run_analysis(app: &App, tweets: &[&Tweet], source: &str, out: &OutputArgs) -> anyhow::Result<()> {
    let system_prompt = load_prompt(app.system_prompt.as_deref(), agent::DEFAULT_SYSTEM_PROMPT)?;
    let template = load_prompt(app.analysis_prompt.as_deref(), agent::DEFAULT_ANALYSIS_PROMPT)?;

    let options = AgentOptions::from_config(&app.config.agent, system_prompt)?;
    let analysis_agent = AnalysisAgent::new(options);

    eprintln!("Running AI analysis on {} tweets...", tweets.len());
    let tweets_text = agent::format_tweets_for_analysis(tweets.iter().copied());
    let analysis = analysis_agent
        .analyze_tweets(&template, &tweets_text, agent::DEFAULT_FOCUS)
        .await
        .context("AI analysis failed")?;

    let body = format!("# AI Analysis: {}\n\n{}\n", source, analysis.text);
    println!("{}", body);

    let filename = match &out.output {
        Some(name) => name.clone(),
        None => report::timestamped_filename(
            &format!("analysis_{}", report::file_label(source)),
            Local::now().naive_local(),
        ),
    };
    let path = app.writer()?.write(&filename, &body)?;
    eprintln!("✓ Analysis saved to {} (${:.4})", path.display(), analysis.cost_usd);
    Ok(())
}

/// Shared tail of every fetch command: filter, then analyze or report
async fn process(
    app: &App,
    tweets: Vec<Tweet>,
    profile: FilterProfile,
    source: &str,
    prefix: &str,
    out: &OutputArgs,
) -> anyhow::Result<()> {
    if tweets.is_empty() {
        eprintln!("No tweets found");
        return Ok(());
    }

    let options = filter_options(&app.config.filters, profile, out.analyze);
    let kept = apply_filter(&app.patterns, options, &tweets);

    if out.analyze {
        return run_analysis(app, &kept, source, out).await;
    }

    let mut parser = TweetParser::new();
    let parsed = parser.parse_tweets(kept, source);
    output_report(app, &parsed, prefix, out)
}

async fn run_status(app: &App) -> anyhow::Result<()> {
    println!("🔧 System Status\n");

    let bird_auth = BirdClient::default().verify_credentials().await;
    println!(
        "  Bird CLI          {}",
        if bird_auth { "✓ Authenticated" } else { "✗ Not authenticated" }
    );

    let auth_env = bird::auth_env();
    println!(
        "  Auth tokens       {}",
        if auth_env.is_empty() {
            "not set (using bird's own session)".to_string()
        } else {
            auth_env.keys().copied().collect::<Vec<_>>().join(", ")
        }
    );

    let api_key = agent::API_KEY_VARS
        .iter()
        .any(|key| std::env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false));
    println!("  API Key           {}", if api_key { "✓ Set" } else { "✗ Not set" });

    let base_url =
        std::env::var(agent::BASE_URL_VAR).unwrap_or_else(|_| agent::DEFAULT_BASE_URL.to_string());
    println!("  Base URL          {}", base_url);
    println!("  Model             {}", app.config.agent.model);

    let output_dir = &app.config.output_dir;
    println!(
        "  Output directory  {} ({})",
        output_dir.display(),
        if output_dir.exists() { "✓ Exists" } else { "✗ Not found" }
    );
    Ok(())
}

async fn execute(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Timeline { out, no_filter } => {
            eprintln!("📱 Fetching Home Timeline");
            let client = BirdClient::new(out.count);
            let tweets = client.fetch_home_timeline(None).await?;
            eprintln!("✓ Fetched {} tweets", tweets.len());

            let profile = if no_filter { FilterProfile::None } else { FilterProfile::Timeline };
            process(app, tweets, profile, "home_timeline", "timeline", &out).await
        }
        Command::Bookmarks { out, no_filter, shuffle } => {
            eprintln!("🔖 Fetching Bookmarks");
            let client = BirdClient::new(out.count);

            let tweets = if shuffle {
                let all = client.fetch_all_bookmarks(bird::DEFAULT_MAX_PAGES).await;
                eprintln!("✓ Fetched {} total bookmarks", all.len());
                let sample: Vec<Tweet> = all
                    .choose_multiple(&mut rand::thread_rng(), out.count.min(all.len()))
                    .cloned()
                    .collect();
                eprintln!("✓ Randomly selected {} bookmarks", sample.len());
                sample
            } else {
                let tweets = client.fetch_bookmarks(None).await?;
                eprintln!("✓ Fetched {} bookmarks", tweets.len());
                tweets
            };

            let profile = if no_filter { FilterProfile::None } else { FilterProfile::Bookmarks };
            process(app, tweets, profile, "bookmarks", "bookmarks", &out).await
        }
        Command::User { handle, out } => {
            let handle = handle.trim_start_matches('@').to_string();
            eprintln!("👤 Fetching tweets from @{}", handle);
            let client = BirdClient::new(out.count);
            let tweets = client.fetch_user_tweets(&handle, None).await?;
            eprintln!("✓ Fetched {} tweets from @{}", tweets.len(), handle);

            let source = format!("user_{}", handle);
            process(app, tweets, FilterProfile::None, &source, &handle, &out).await
        }
        Command::Search { query, out } => {
            eprintln!("🔍 Searching for '{}'", query);
            let client = BirdClient::new(out.count);
            let tweets = client.search_tweets(&query, None).await?;
            eprintln!("✓ Found {} tweets", tweets.len());

            let short: String = query.chars().take(20).collect();
            let source = format!("search_{}", query);
            let prefix = format!("search_{}", short);
            process(app, tweets, FilterProfile::None, &source, &prefix, &out).await
        }
        Command::Status => run_status(app).await,
        Command::Interactive => {
            println!("Already in interactive mode");
            Ok(())
        }
    }
}

/// Split a command line into words, honoring single and double quotes
fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted_word = false;
    let mut quote_char = '\0';

    for ch in line.chars() {
        match ch {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quoted_word = true;
                quote_char = ch;
            }
            ch if ch == quote_char && in_quotes => {
                in_quotes = false;
                quote_char = '\0';
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() || quoted_word {
                    args.push(std::mem::take(&mut current));
                    quoted_word = false;
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || quoted_word {
        args.push(current);
    }

    args
}

async fn run_interactive(app: &App) -> anyhow::Result<()> {
    println!("🔄 Interactive Mode");
    println!("Type 'help' for commands, 'exit' to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nnews-parser> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.to_lowercase().as_str() {
            "exit" | "quit" | "q" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("{}", REPL_HELP);
                continue;
            }
            _ => {}
        }

        match ReplLine::try_parse_from(split_command_line(line)) {
            Ok(repl) => {
                if let Err(e) = execute(app, repl.command).await {
                    eprintln!("Error: {:#}", e);
                }
            }
            Err(e) => {
                let _ = e.print();
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_parser=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let app = App::load(&args)?;

    match args.command {
        Some(Command::Interactive) => run_interactive(&app).await,
        Some(cmd) => execute(&app, cmd).await,
        None => {
            print_available_commands();
            Ok(())
        }
    }
}
