use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use paperwatch_api::{
    ApiClient, BatchEvent, FetchEvent, PaperQuery, ProcessEvent, DEFAULT_BASE_URL,
};
use paperwatch_core::{Engine, EngineEvent, PaperSession, SessionPhase, StatusTag};

/// Paperwatch — track arXiv papers and score their relevance to your research.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Backend API base URL (env: PAPERWATCH_API)
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tracked papers
    List {
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        /// Only papers scored at least this relevant
        #[arg(long)]
        min_score: Option<u8>,
        /// Only papers with completed analysis
        #[arg(long)]
        processed_only: bool,
    },
    /// Show one paper in full, by numeric id or arXiv id
    Show { id_or_arxiv: String },
    /// Show aggregate counters
    Stats,
    /// Import a paper by arXiv URL or bare ID
    Import { arxiv: String },
    /// Delete a paper
    Delete { id: i64 },
    /// List papers awaiting processing (also unsticks stale rows server-side)
    Pending,
    /// Fetch recent papers from arXiv, streaming progress
    Fetch {
        /// Do not batch-process the newly saved papers
        #[arg(long)]
        no_process: bool,
        /// Fire-and-forget: trigger the fetch server-side and return
        #[arg(long)]
        background: bool,
    },
    /// Analyze one paper, streaming workflow progress
    Process {
        id: i64,
        /// Fire-and-forget: trigger processing without streaming
        #[arg(long)]
        no_stream: bool,
    },
    /// Process every pending paper with bounded concurrency
    Batch {
        /// Use the server-side batcher instead of the local coordinator
        #[arg(long)]
        server: bool,
        /// Fire-and-forget: trigger the server-side batcher and return
        #[arg(long)]
        detach: bool,
    },
    /// Show or update application settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Set the research focus driving relevance scoring
    SetFocus { focus: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Args::parse();

    let base_url = args
        .api
        .or_else(|| std::env::var("PAPERWATCH_API").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let api = ApiClient::new(base_url);

    match args.command {
        Command::List {
            skip,
            limit,
            min_score,
            processed_only,
        } => {
            cmd_list(
                &api,
                PaperQuery {
                    skip,
                    limit,
                    min_score,
                    processed_only,
                },
            )
            .await
        }
        Command::Show { id_or_arxiv } => cmd_show(&api, &id_or_arxiv).await,
        Command::Stats => cmd_stats(&api).await,
        Command::Import { arxiv } => cmd_import(&api, &arxiv).await,
        Command::Delete { id } => cmd_delete(&api, id).await,
        Command::Pending => cmd_pending(&api).await,
        Command::Fetch {
            background: true, ..
        } => {
            api.trigger_fetch().await?;
            println!("{}", "fetch started in the background".green());
            Ok(())
        }
        Command::Fetch { no_process, .. } => cmd_fetch(api, no_process).await,
        Command::Process {
            id,
            no_stream: true,
        } => {
            api.trigger_process(id).await?;
            println!("{} processing of paper {id} triggered", "ok:".green());
            Ok(())
        }
        Command::Process { id, .. } => cmd_process(&api, id).await,
        Command::Batch { detach: true, .. } => {
            let trigger = api.trigger_batch().await?;
            println!("{} ({} paper(s))", trigger.message, trigger.count);
            Ok(())
        }
        Command::Batch { server: true, .. } => cmd_batch_server(&api).await,
        Command::Batch { .. } => cmd_batch_client(api).await,
        Command::Settings { action } => cmd_settings(&api, action).await,
    }
}

async fn cmd_show(api: &ApiClient, id_or_arxiv: &str) -> anyhow::Result<()> {
    let paper = match id_or_arxiv.parse::<i64>() {
        Ok(id) => api.get_paper(id).await?,
        Err(_) => api.get_paper_by_arxiv(id_or_arxiv).await?,
    };
    println!("{}", paper.title.bold());
    println!("{}  {}", paper.arxiv_id.dimmed(), paper.authors.dimmed());
    println!(
        "published {}  categories {}",
        paper.published.format("%Y-%m-%d"),
        paper.categories
    );
    let tag = StatusTag::from_server(paper.processing_status);
    println!("status: {}", tag.label());
    if let Some(score) = paper.relevance_score {
        println!("score: {score}/10");
    }
    let mut section = |label: &str, value: &Option<String>| {
        if let Some(text) = value {
            println!();
            println!("{}", label.cyan().bold());
            println!("{text}");
        }
    };
    section("Essence", &paper.paper_essence);
    section("Relevance", &paper.relevance_reason);
    section("Suggestion", &paper.heuristic_suggestion);
    section("Concept bridging", &paper.concept_bridging);
    section("Visual verification", &paper.visual_verification);
    if !paper.is_processed {
        println!();
        println!("{}", "Abstract".cyan().bold());
        println!("{}", paper.abstract_text);
    }
    Ok(())
}

async fn cmd_list(api: &ApiClient, query: PaperQuery) -> anyhow::Result<()> {
    let papers = api.list_papers(&query).await?;
    if papers.is_empty() {
        println!("No papers.");
        return Ok(());
    }
    for paper in &papers {
        let score = match paper.relevance_score {
            Some(s) if s >= 9 => format!("{s:>2}/10").magenta().bold().to_string(),
            Some(s) if s >= 5 => format!("{s:>2}/10").green().to_string(),
            Some(s) => format!("{s:>2}/10").dimmed().to_string(),
            None => "  —  ".dimmed().to_string(),
        };
        let tag = StatusTag::from_server(paper.processing_status);
        let status = match tag {
            StatusTag::Done => tag.label().green().to_string(),
            StatusTag::Failed => tag.label().red().to_string(),
            StatusTag::Processing | StatusTag::Streaming => tag.label().cyan().to_string(),
            StatusTag::Pending => tag.label().dimmed().to_string(),
        };
        println!(
            "{:>5}  {score}  {status:<12}  {}  {}",
            paper.id,
            paper.arxiv_id.dimmed(),
            paper.title
        );
    }
    Ok(())
}

async fn cmd_stats(api: &ApiClient) -> anyhow::Result<()> {
    let stats = api.stats().await?;
    println!("total:          {}", stats.total_papers);
    println!("processed:      {}", stats.processed_papers.green());
    println!("high relevance: {}", stats.high_relevance_papers.magenta());
    println!("pending:        {}", stats.pending_processing.yellow());
    Ok(())
}

async fn cmd_import(api: &ApiClient, arxiv: &str) -> anyhow::Result<()> {
    let outcome = api.import_paper(arxiv).await?;
    if outcome.is_new {
        println!("{} {} — {}", "imported".green(), outcome.arxiv_id, outcome.title);
    } else {
        println!("{} {}", "already tracked:".yellow(), outcome.arxiv_id);
    }
    Ok(())
}

async fn cmd_delete(api: &ApiClient, id: i64) -> anyhow::Result<()> {
    api.delete_paper(id).await?;
    println!("{} paper {id}", "deleted".green());
    Ok(())
}

async fn cmd_pending(api: &ApiClient) -> anyhow::Result<()> {
    let ids = api.pending_ids().await?;
    if ids.is_empty() {
        println!("No papers pending processing.");
    } else {
        println!(
            "{} paper(s) pending: {}",
            ids.len(),
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

async fn cmd_fetch(api: ApiClient, no_process: bool) -> anyhow::Result<()> {
    let cancel = cancel_on_ctrl_c();
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut saved = 0u64;
    let mut failed = None;
    api.fetch_stream(&cancel, |event| match event {
        FetchEvent::Started => spinner.set_message("contacting arXiv…"),
        FetchEvent::Fetching { message } | FetchEvent::Saving { message } => {
            spinner.set_message(message)
        }
        FetchEvent::Fetched { count, .. } => {
            spinner.set_message(format!("fetched {count} paper(s)"))
        }
        FetchEvent::Done {
            saved: count,
            message,
            ..
        } => {
            saved = count;
            spinner.set_message(message);
        }
        FetchEvent::Error { error } => failed = Some(error),
    })
    .await?;
    spinner.finish_and_clear();

    if let Some(error) = failed {
        anyhow::bail!("fetch failed: {error}");
    }
    println!("{} {saved} new paper(s) saved", "fetch done:".green());

    if saved > 0 && !no_process {
        cmd_batch_client(api).await?;
    }
    Ok(())
}

async fn cmd_process(api: &ApiClient, id: i64) -> anyhow::Result<()> {
    let cancel = cancel_on_ctrl_c();
    let mut session = PaperSession::new(id);
    session.begin();

    api.process_stream(id, &cancel, |event| {
        match &event {
            ProcessEvent::Progress { message, .. } => {
                println!("{} {message}", "›".cyan());
            }
            ProcessEvent::Error { error, message } => {
                eprintln!("{} {error}: {message}", "error".red().bold());
            }
            ProcessEvent::Result(result) => {
                println!();
                println!("{}  {}", "score:".bold(), result.relevance_score);
                if !result.paper_essence.is_empty() {
                    println!("{} {}", "essence:".bold(), result.paper_essence);
                }
                if !result.relevance_reason.is_empty() {
                    println!("{}  {}", "reason:".bold(), result.relevance_reason);
                }
                if !result.heuristic_suggestion.is_empty() {
                    println!("{} {}", "suggest:".bold(), result.heuristic_suggestion);
                }
            }
            ProcessEvent::Done => println!("{}", "done".green().bold()),
            _ => {}
        }
        session.apply(&event);
    })
    .await?;

    match session.phase() {
        SessionPhase::Done => Ok(()),
        SessionPhase::Failed => {
            let message = session
                .failure()
                .map(|f| f.display_message())
                .unwrap_or("analysis failed");
            anyhow::bail!("{message}");
        }
        _ => anyhow::bail!("stream ended before completion"),
    }
}

/// Client-side batch: bounded-concurrency streaming over every pending paper.
async fn cmd_batch_client(api: ApiClient) -> anyhow::Result<()> {
    let ids = api.pending_ids().await?;
    if ids.is_empty() {
        println!("No papers pending processing.");
        return Ok(());
    }
    let total = ids.len() as u64;
    println!("processing {total} paper(s), 3 at a time");

    let bar = ProgressBar::new(total);
    bar.set_style(ProgressStyle::with_template(
        "{bar:30} {pos}/{len} {msg}",
    )?);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Engine::new(api, tx);

    let engine_for_signal = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_for_signal.abort_all();
        }
    });

    engine.start_batch(ids);

    let mut failed = 0u64;
    while let Some(event) = rx.recv().await {
        match event {
            EngineEvent::Session {
                paper_id,
                event: ProcessEvent::Progress { message, .. },
            } => {
                bar.set_message(format!("paper {paper_id}: {message}"));
            }
            EngineEvent::SessionClosed { paper_id, success } => {
                bar.inc(1);
                if !success {
                    failed += 1;
                    bar.println(format!("{} paper {paper_id} failed", "✗".red()));
                }
            }
            EngineEvent::BatchComplete => break,
            _ => {}
        }
    }
    bar.finish_and_clear();

    if failed > 0 {
        println!(
            "{} {}/{total} analyzed, {failed} failed (retry manually)",
            "batch done:".yellow(),
            total - failed
        );
    } else {
        println!("{} all {total} paper(s) analyzed", "batch done:".green());
    }
    Ok(())
}

/// Server-side batch passthrough: render the backend batcher's own stream.
async fn cmd_batch_server(api: &ApiClient) -> anyhow::Result<()> {
    let cancel = cancel_on_ctrl_c();
    let mut outcome = None;
    api.batch_stream(&cancel, |event| match event {
        BatchEvent::Started { total } => println!("server batch started: {total} paper(s)"),
        BatchEvent::PaperProcessing { paper_id, title } => {
            println!("{} paper {paper_id}: {title}", "›".cyan());
        }
        BatchEvent::PaperCompleted {
            paper_id,
            processed,
            total,
            ..
        } => {
            println!("{} paper {paper_id} ({processed}/{total})", "✓".green());
        }
        BatchEvent::PaperFailed {
            paper_id, error, ..
        } => {
            println!("{} paper {paper_id}: {error}", "✗".red());
        }
        BatchEvent::Done {
            processed,
            failed,
            total,
        } => {
            outcome = Some((processed, failed, total));
        }
    })
    .await?;

    match outcome {
        Some((processed, failed, total)) => {
            println!("server batch done: {processed}/{total} analyzed, {failed} failed");
            Ok(())
        }
        None => anyhow::bail!("server batch stream ended without a summary"),
    }
}

async fn cmd_settings(api: &ApiClient, action: SettingsCommand) -> anyhow::Result<()> {
    match action {
        SettingsCommand::Show => {
            let settings = api.settings().await?;
            println!(
                "research focus: {}",
                settings.research_focus.as_deref().unwrap_or("(unset)")
            );
            println!(
                "research idea:  {}",
                settings.research_idea.as_deref().unwrap_or("(unset)")
            );
            println!(
                "categories:     {}",
                settings.arxiv_categories.as_deref().unwrap_or("(default)")
            );
            if !settings.focus_keywords.is_empty() {
                println!("keywords:       {}", settings.focus_keywords.join("; "));
            }
        }
        SettingsCommand::SetFocus { focus } => {
            let mut settings = api.settings().await?;
            settings.research_focus = Some(focus);
            let updated = api.update_settings(&settings).await?;
            println!(
                "{} focus now: {}",
                "updated".green(),
                updated.research_focus.as_deref().unwrap_or("(unset)")
            );
        }
    }
    Ok(())
}

/// A token cancelled by the first Ctrl+C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}
