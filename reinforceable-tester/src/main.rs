mod common;
mod loader;
mod logic;
mod webhook;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use common::split_csv;
use loader::FileLoader;
use logic::{LogicTester, ScenarioResult, SeedInfo, Strategy, resolve_seed_inputs};
use reinforceable_game::{ContentLoader, MissionEngine, SessionIdentity, validate_pool};
use webhook::{BodyEncoding, DeliveryStats, WebhookSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "reinforceable-tester", version = "0.1.0")]
#[command(about = "Headless mission driver and content QA for Mission: Reinforceable")]
struct Args {
    /// Scenario pool JSON (defaults to the bundled pool)
    #[arg(long)]
    pool: Option<PathBuf>,

    /// Mission configuration JSON (defaults to built-in settings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate content and exit
    #[arg(long)]
    validate: bool,

    /// List all scenarios in the pool and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Dates to play (comma-separated): today, YYYY-MM-DD, or a raw seed
    #[arg(long, default_value = "today")]
    dates: String,

    /// Choice strategies (comma-separated): best, worst, first, random, all
    #[arg(long, default_value = "best,worst")]
    strategy: String,

    /// Missions played per scenario and strategy
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Post every finished mission to this webhook URL
    #[arg(long)]
    webhook: Option<String>,

    /// Send the webhook body as text/plain instead of application/json
    #[arg(long)]
    plain_text: bool,

    /// Teacher code recorded in every payload
    #[arg(long, default_value = "QA")]
    code: String,

    /// Student identifier recorded in every payload
    #[arg(long)]
    student: Option<String>,

    /// Mode tag recorded in every payload
    #[arg(long)]
    mode_tag: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let engine = MissionEngine::new(FileLoader::new(args.pool.clone(), args.config.clone()));

    if maybe_list_scenarios(&args, &engine)? {
        return Ok(());
    }
    if args.validate {
        let valid = run_validation(&args, &engine)?;
        if !valid {
            std::process::exit(1);
        }
        return Ok(());
    }

    announce_banner(&engine.loader().pool_source());

    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.dates), Local::now().date_naive())?;
    let strategies = expand_strategies(&args.strategy)?;

    let webhook = build_webhook(&args)?;
    let mut tester = LogicTester::new(identity(&args), args.verbose);
    if let Some(sink) = &webhook {
        println!("📮 Posting results to {}", sink.url().bright_white());
        tester = tester.with_forward(sink.clone());
    }

    let results = run_logic_missions(&args, &engine, &tester, &seeds, &strategies)?;
    let delivery = finish_deliveries(webhook.as_deref()).await;

    write_reports(&args, &results, start_time)?;
    if let Some(stats) = delivery {
        println!(
            "📮 Webhook: {} delivered, {} failed",
            stats.delivered.to_string().green(),
            stats.failed.to_string().red()
        );
    }

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_scenarios<L: ContentLoader>(args: &Args, engine: &MissionEngine<L>) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let pool = engine
        .loader()
        .load_pool()
        .context("failed to load scenario pool")?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (category, scenario) in pool.iter() {
        writeln!(
            output_target.writer(),
            "  {:10} {:25} - {}",
            category,
            scenario.id,
            scenario.title
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn run_validation<L: ContentLoader>(args: &Args, engine: &MissionEngine<L>) -> Result<bool> {
    let loader = engine.loader();
    let pool = loader.load_pool().context("failed to load scenario pool")?;
    let config_check = loader
        .load_config()
        .map_err(anyhow::Error::from)
        .and_then(|config| config.validate().map_err(anyhow::Error::from));
    let config_ok = match config_check {
        Ok(()) => true,
        Err(err) => {
            eprintln!("❌ {}", format!("configuration: {err}").red());
            false
        }
    };

    let report = validate_pool(&pool);
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target.writer(),
        "Checked {} scenario(s) in {} categories",
        pool.len(),
        pool.categories.len()
    )?;
    logic::reports::generate_validation_report(output_target.writer(), &report)?;
    output_target.flush_inner()?;
    Ok(report.is_valid() && config_ok)
}

fn announce_banner(source: &str) {
    println!("{}", "🧙 Mission: Reinforceable Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
    println!("Content: {source}");
}

fn identity(args: &Args) -> SessionIdentity {
    let mut identity = SessionIdentity::new(args.code.clone());
    if let Some(student) = &args.student {
        identity = identity.with_student(student.clone());
    }
    if let Some(mode) = &args.mode_tag {
        identity = identity.with_mode(mode.clone());
    }
    identity
}

fn expand_strategies(raw: &str) -> Result<Vec<Strategy>> {
    let mut strategies: Vec<Strategy> = Vec::new();
    for token in split_csv(raw) {
        let batch = if token.eq_ignore_ascii_case("all") {
            Strategy::ALL.to_vec()
        } else {
            vec![token.parse::<Strategy>()?]
        };
        for strategy in batch {
            if !strategies.contains(&strategy) {
                strategies.push(strategy);
            }
        }
    }
    if strategies.is_empty() {
        strategies.push(Strategy::Best);
    }
    Ok(strategies)
}

fn build_webhook(args: &Args) -> Result<Option<Rc<WebhookSink>>> {
    let Some(url) = &args.webhook else {
        return Ok(None);
    };
    let encoding = if args.plain_text {
        BodyEncoding::PlainText
    } else {
        BodyEncoding::Json
    };
    let sink = WebhookSink::new(url.clone(), encoding).context("failed to set up webhook")?;
    Ok(Some(Rc::new(sink)))
}

fn run_logic_missions<L: ContentLoader>(
    args: &Args,
    engine: &MissionEngine<L>,
    tester: &LogicTester,
    seeds: &[SeedInfo],
    strategies: &[Strategy],
) -> Result<Vec<ScenarioResult>> {
    println!("{}", "🧠 Running Missions".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let mut results = Vec::new();
    for seed in seeds {
        let day = engine
            .prepare_seed(seed.seed)
            .with_context(|| format!("failed to prepare {}", seed.label()))?;
        for warning in &day.warnings {
            log::warn!("{warning}");
        }
        let lineup: Vec<String> = day.lineup().scenarios().map(|s| s.id.clone()).collect();
        println!("📅 {}: {}", seed.label().bold(), lineup.join(", "));
        results.extend(tester.run_day(engine, &day, seed, strategies, args.iterations));
    }
    Ok(results)
}

async fn finish_deliveries(webhook: Option<&WebhookSink>) -> Option<DeliveryStats> {
    let sink = webhook?;
    log::info!("waiting on {} webhook deliveries", sink.in_flight());
    Some(sink.drain().await)
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => {
            logic::reports::generate_json_report(output_target.writer(), results)?;
        }
        ReportFormat::Markdown => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Mission: Reinforceable Test Results\n\n_No missions executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(output_target.writer(), results)?;
            }
        }
        ReportFormat::Console => {
            if results.is_empty() {
                writeln!(&mut output_target, "No missions executed.")?;
            } else {
                logic::reports::generate_console_report(
                    output_target.writer(),
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(
                &mut output_target,
                "🏁 Total time: {:?}",
                start_time.elapsed()
            )?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
