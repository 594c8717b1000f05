use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use lectern::content::ContentApi;
use lectern::synth::Synthesizer;
use lectern::{
    AudioOutput, Config, EngineEvent, EngineOptions, HttpContentApi, HttpSynthesizer,
    NoopMediaSession, PlaybackEngine, ProgressStore, RodioOutput, StartRequest, db,
};

/// Lectern - streaming text-to-speech reader for remote libraries
#[derive(Parser)]
#[command(name = "lectern", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a book aloud, resuming from the saved position
    Play {
        /// Book ID on the server
        book: String,
        /// Book title for session metadata (defaults to the ID)
        #[arg(long)]
        title: Option<String>,
        /// Chapter to start in (defaults to the saved position, then 0)
        #[arg(short, long)]
        chapter: Option<usize>,
        /// Number of chapters in the book
        #[arg(long, default_value = "1")]
        chapters: usize,
    },
    /// Segment a local file and print its playable units
    Segment {
        /// Path to a chapter markup file
        file: std::path::PathBuf,
    },
    /// Synthesize one utterance and play it
    Synth {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the reading voice.")]
        text: String,
    },
    /// Show the saved position for a book
    Progress {
        /// Book ID on the server
        book: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,lectern=info",
        1 => "info,lectern=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Play {
            book,
            title,
            chapter,
            chapters,
        } => cmd_play(book, title, chapter, chapters).await,
        Command::Segment { file } => cmd_segment(&file),
        Command::Synth { text } => cmd_synth(&text).await,
        Command::Progress { book } => cmd_progress(&book),
    }
}

/// Read a book aloud until it finishes or the user interrupts
async fn cmd_play(
    book: String,
    title: Option<String>,
    chapter: Option<usize>,
    chapters: usize,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let pool = db::init(config.data_dir.join("lectern.db"))?;
    let progress = ProgressStore::new(pool.clone());

    // Start at the saved chapter unless one was given explicitly
    let marker = progress.get(&book)?;
    let start_chapter = chapter
        .or(marker.map(|m| m.chapter_index))
        .unwrap_or(0)
        .min(chapters.saturating_sub(1));

    let content: Arc<dyn ContentApi> = Arc::new(HttpContentApi::new(&config));
    let synth: Arc<dyn Synthesizer> = Arc::new(HttpSynthesizer::new(&config));
    let audio: Arc<dyn AudioOutput> = Arc::new(RodioOutput::new());
    let session = Arc::new(NoopMediaSession::default());

    let text = content.chapter_text(&book, start_chapter).await?;
    let chapter_titles = (1..=chapters).map(|i| format!("Chapter {i}")).collect();

    let engine = PlaybackEngine::new(
        synth,
        content,
        audio,
        session,
        ProgressStore::new(pool),
        EngineOptions::from(&config),
    );
    let mut events = engine.subscribe();

    engine.start_reading(StartRequest {
        book_id: book.clone(),
        book_title: title.unwrap_or_else(|| book.clone()),
        chapter_titles,
        chapter_index: start_chapter,
        text,
    })?;

    tracing::info!(book = %book, chapter = start_chapter, "reading (ctrl-c to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                engine.stop();
                break;
            }
            event = events.recv() => match event {
                Ok(EngineEvent::ChapterChanged(index)) => {
                    tracing::info!(chapter = index, "entered chapter");
                }
                Ok(EngineEvent::Finished) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => {}
            },
        }
    }

    Ok(())
}

/// Segment a markup file and print its playable units
fn cmd_segment(file: &std::path::Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)?;
    let units = lectern::segment_chapter(&text);

    for (index, unit) in units.iter().enumerate() {
        println!("[{index:4}] {unit}");
    }
    println!("---");
    println!("{} playable units", units.len());

    Ok(())
}

/// One-shot synthesis check against the configured endpoint
async fn cmd_synth(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let synth = HttpSynthesizer::new(&config);
    synth.ready()?;

    println!("Synthesizing: \"{text}\"");
    let audio = synth.synthesize(text).await?;
    println!("Got {} bytes of audio", audio.len());

    let output = RodioOutput::new();
    output.play(audio).await?;

    Ok(())
}

/// Print the saved reading position for a book
fn cmd_progress(book: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = db::init(config.data_dir.join("lectern.db"))?;
    let progress = ProgressStore::new(pool);

    match progress.get(book)? {
        Some(marker) => println!(
            "Book {book}: chapter {}, unit {}",
            marker.chapter_index, marker.unit_index
        ),
        None => println!("Book {book}: no saved position"),
    }

    Ok(())
}
