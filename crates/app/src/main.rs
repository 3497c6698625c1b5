use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tracing_subscriber::EnvFilter;

use interview_core::model::{ExtractedFields, IdentityCollector, SLOT_COUNT};
use services::{
    ActiveQuestion, AppServices, Clock, Collaborator, HttpCollaborator, NextStep,
    QuestionScheduler, ResumeDocument, ResumeOutcome, ResumePrompt, SlotOutcome,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    db_url: String,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://interview.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  INTERVIEW_DB_URL       overrides the default database");
    eprintln!("  INTERVIEW_API_BASE_URL backend base URL (default http://localhost:5000)");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("INTERVIEW_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://interview.sqlite3".into(), normalize_sqlite_url);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = args.next().ok_or(ArgsError::MissingValue { flag: "--db" })?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Line-oriented console around stdin/stdout.
struct Console {
    input: Lines<BufReader<Stdin>>,
    output: Stdout,
}

impl Console {
    fn new() -> Self {
        Self {
            input: BufReader::new(tokio::io::stdin()).lines(),
            output: tokio::io::stdout(),
        }
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }

    async fn ask(&mut self, prompt: &str) -> std::io::Result<String> {
        self.output.write_all(prompt.as_bytes()).await?;
        self.output.flush().await?;
        Ok(self.input.next_line().await?.unwrap_or_default())
    }

    async fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        let answer = self.ask(prompt).await?;
        Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
    }
}

async fn collect_identity(
    console: &mut Console,
    collaborator: &HttpCollaborator,
) -> Result<interview_core::model::CandidateIdentity, Box<dyn std::error::Error>> {
    let extracted = loop {
        let path = console
            .ask("Path to your resume file (blank to skip upload): ")
            .await?;
        let path = path.trim();
        if path.is_empty() {
            break ExtractedFields::default();
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                console.say(&format!("Could not read {path}: {err}")).await?;
                continue;
            }
        };
        let file_name = std::path::Path::new(path)
            .file_name()
            .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned());
        match collaborator
            .extract_identity(&ResumeDocument { file_name, bytes })
            .await
        {
            Ok(extracted) => break extracted,
            Err(err) => {
                tracing::warn!(error = %err, "resume extraction failed");
                console
                    .say("Extraction failed. Try another file or leave blank to skip.")
                    .await?;
            }
        }
    };

    let mut collector = IdentityCollector::ingest(extracted);
    while let Some(field) = collector.next_missing() {
        let value = console
            .ask(&format!("Please provide your {}: ", field.label()))
            .await?;
        collector.supply(value);
    }
    match collector.finish() {
        Ok(identity) => Ok(identity),
        Err(_) => Err("identity collection ended with missing fields".into()),
    }
}

async fn present_question(
    console: &mut Console,
    question: &ActiveQuestion,
) -> std::io::Result<()> {
    console
        .say(&format!(
            "\nQuestion {}/{SLOT_COUNT} [{} | {} points | {}s]",
            question.question_number,
            question.difficulty.as_str(),
            question.max_score,
            question.time_limit_secs,
        ))
        .await?;
    console.say(&question.question).await
}

/// Waits for either the typed answer or the countdown, whichever comes
/// first, and routes it through the scheduler.
async fn run_countdown(
    console: &mut Console,
    scheduler: &mut QuestionScheduler,
    question: &ActiveQuestion,
) -> Result<SlotOutcome, Box<dyn std::error::Error>> {
    let time_limit = Duration::from_secs(u64::from(question.time_limit_secs));
    let typed = {
        let input = &mut console.input;
        tokio::select! {
            line = input.next_line() => Some(line?.unwrap_or_default()),
            () = tokio::time::sleep(time_limit) => None,
        }
    };

    match typed {
        Some(answer) => Ok(scheduler.submit_answer(answer.trim_end()).await?),
        None => {
            console.say("\nTime is up.").await?;
            match scheduler.handle_expiry(question.ticket).await? {
                Some(outcome) => Ok(outcome),
                // The countdown lost a race we cannot hit on this path.
                None => Err("countdown resolved twice".into()),
            }
        }
    }
}

async fn show_outcome(console: &mut Console, outcome: &SlotOutcome) -> std::io::Result<()> {
    console
        .say(&format!(
            "Score: {}. {}",
            outcome.recorded.score, outcome.recorded.feedback
        ))
        .await
}

async fn run_interview(
    console: &mut Console,
    scheduler: &mut QuestionScheduler,
    mut question: ActiveQuestion,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        present_question(console, &question).await?;
        console.say("Your answer (enter to submit):").await?;
        let outcome = run_countdown(console, scheduler, &question).await?;
        show_outcome(console, &outcome).await?;

        match outcome.next {
            NextStep::NextSlot { delay } => {
                tokio::time::sleep(delay).await;
                question = next_question_with_retry(console, scheduler).await?;
            }
            NextStep::Finished(interview) => {
                console
                    .say(&format!(
                        "\nInterview complete. Score: {}/90 ({}%).",
                        interview.total_score(),
                        interview.percentage(),
                    ))
                    .await?;
                console.say(interview.summary()).await?;
                return Ok(());
            }
        }
    }
}

async fn next_question_with_retry(
    console: &mut Console,
    scheduler: &mut QuestionScheduler,
) -> Result<ActiveQuestion, Box<dyn std::error::Error>> {
    loop {
        match scheduler.next_question().await {
            Ok(question) => return Ok(question),
            Err(err) => {
                tracing::warn!(error = %err, "question generation failed");
                let retry = console
                    .confirm("Could not fetch the next question. Retry? [y/N] ")
                    .await?;
                if !retry {
                    return Err(err.into());
                }
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;

    let collaborator = HttpCollaborator::from_env()?;
    let mut console = Console::new();
    if let Err(err) = collaborator.health_check().await {
        tracing::warn!(error = %err, "backend health check failed");
        console
            .say("Warning: the interview backend is unreachable. Questions and scoring may fail.")
            .await?;
    }

    let services = AppServices::new_sqlite(
        &args.db_url,
        Clock::default_clock(),
        Arc::new(collaborator.clone()),
    )
    .await?;
    let mut scheduler = services.scheduler();

    let question = match services.detect_resumable().await? {
        Some(ResumePrompt {
            candidate_name,
            answered,
            slot_count,
        }) => {
            let resume = console
                .confirm(&format!(
                    "Welcome back, {candidate_name}! You answered {answered} of {slot_count} \
                     questions. Resume where you left off? [y/N] "
                ))
                .await?;
            if resume {
                match scheduler.resume().await? {
                    ResumeOutcome::Resumed(question) => question,
                    ResumeOutcome::Finished(interview) => {
                        console
                            .say(&format!(
                                "Your interview was already complete. Score: {}/90 ({}%).",
                                interview.total_score(),
                                interview.percentage(),
                            ))
                            .await?;
                        return Ok(());
                    }
                    ResumeOutcome::Fresh => start_fresh(&mut console, &collaborator, &mut scheduler).await?,
                }
            } else {
                scheduler.discard_stored().await?;
                start_fresh(&mut console, &collaborator, &mut scheduler).await?
            }
        }
        None => match scheduler.resume().await? {
            // A stored session with every answer in just needs its summary.
            ResumeOutcome::Finished(interview) => {
                console
                    .say(&format!(
                        "Your interview was already complete. Score: {}/90 ({}%).",
                        interview.total_score(),
                        interview.percentage(),
                    ))
                    .await?;
                return Ok(());
            }
            ResumeOutcome::Resumed(question) => question,
            ResumeOutcome::Fresh => start_fresh(&mut console, &collaborator, &mut scheduler).await?,
        },
    };

    run_interview(&mut console, &mut scheduler, question).await
}

async fn start_fresh(
    console: &mut Console,
    collaborator: &HttpCollaborator,
    scheduler: &mut QuestionScheduler,
) -> Result<ActiveQuestion, Box<dyn std::error::Error>> {
    console.say("Welcome to the interview. Six questions, timed.").await?;
    let identity = collect_identity(console, collaborator).await?;
    console
        .say(&format!("Thanks, {}. Starting now.", identity.name))
        .await?;
    match scheduler.begin(identity).await {
        Ok(question) => Ok(question),
        Err(err) => {
            tracing::warn!(error = %err, "first question failed");
            next_question_with_retry(console, scheduler).await
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
