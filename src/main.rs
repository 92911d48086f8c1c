use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use interlinear::core::{
    format_output_path, parse_document, print_error_message, print_info_message, read_input,
    resolve_base_url, translate_document, write_output, InterlinearError, InterlinearOptions,
};
use interlinear::env::{EnvVar, LogLevel, QuotaDbPath};
use interlinear::parsers::html::{find_element_by_id, serialize_document};
use interlinear::translation::{
    Background, BackgroundHandle, ConfigManager, GoogleTranslator, HoverController, HoverEvent,
    InjectOptions, KeyEvent, Modifiers, PageOutcome, PageSession, QuotaStore, TextOutcome,
    ToggleOutcome, Translator,
};

/// Translate web pages by mirroring each paragraph with its translation
#[derive(Parser)]
#[command(name = "interlinear", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Monthly usage database
    #[arg(long, global = true)]
    quota_db: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a whole HTML page
    Page {
        /// HTML file, or - for stdin
        input: String,
        /// Output file; %lang% and %timestamp% are expanded
        #[arg(short, long)]
        output: Option<String>,
        /// Target language code
        #[arg(short, long)]
        target_lang: Option<String>,
        /// Charset of the input
        #[arg(short, long)]
        encoding: Option<String>,
        /// Base URL for links in translated copies
        #[arg(short, long)]
        base_url: Option<String>,
    },
    /// Translate a piece of text, like a selection
    Text {
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(short, long)]
        target_lang: Option<String>,
    },
    /// Toggle the translation of one element, as Ctrl-hover does
    Hover {
        input: String,
        /// Id of the element under the pointer
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        output: Option<String>,
        /// Number of Ctrl presses
        #[arg(long, default_value_t = 1)]
        times: usize,
    },
    /// Show this month's character usage
    Usage,
    /// Save the translation API key
    SetKey { key: String },
    /// Send one raw JSON request to the background owner
    Message { json: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            print_error_message(&format!("Error: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::get_or_default("info".to_string())))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), InterlinearError> {
    let config = ConfigManager::load(cli.config.as_deref())?;

    if let Command::SetKey { key } = &cli.command {
        config.set_api_key(key)?;
        if let Some(path) = config.config_path() {
            print_info_message(&format!("API key saved to {}", path.display()));
        }
        return Ok(());
    }

    let quota_path = cli
        .quota_db
        .clone()
        .or_else(|| QuotaDbPath::get().ok())
        .or_else(QuotaStore::default_path)
        .ok_or_else(|| InterlinearError::new("no location for the usage database; pass --quota-db"))?;
    let store = QuotaStore::open(&quota_path, config.get()?.monthly_char_limit)?;
    let background = Background::spawn(store);

    let result = dispatch(cli, config, background.handle()).await;
    background.shutdown().await;
    result
}

async fn dispatch(cli: Cli, config: ConfigManager, handle: BackgroundHandle) -> Result<(), InterlinearError> {
    match cli.command {
        Command::Page {
            input,
            output,
            target_lang,
            encoding,
            base_url,
        } => {
            let options = InterlinearOptions {
                base_url,
                encoding,
                output,
                target_lang,
                quiet: cli.quiet,
            };
            translate_page(config, handle, &input, &options).await
        }
        Command::Text { text, target_lang } => {
            if let Some(lang) = target_lang {
                config.set_target_lang(&lang)?;
            }
            let session = new_session(config, handle)?;
            match session.translate_text(&text.join(" ")).await? {
                TextOutcome::Translated(translated) => print_info_message(&translated),
                TextOutcome::QuotaExceeded(check) => return Err(InterlinearError::new(&check.message())),
            }
            Ok(())
        }
        Command::Hover {
            input,
            id,
            output,
            times,
        } => hover(config, handle, &input, &id, output.as_deref(), times).await,
        Command::Usage => {
            let settings = config.get()?;
            let api_key = Some(settings.api_key.as_str()).filter(|key| !key.trim().is_empty());
            let count = handle.count(api_key).await?;
            print_info_message(&format!("{count}/{}", settings.monthly_char_limit));
            Ok(())
        }
        Command::Message { json } => {
            print_info_message(&handle.handle_json(&json).await);
            Ok(())
        }
        Command::SetKey { .. } => Ok(()),
    }
}

fn new_session(config: ConfigManager, handle: BackgroundHandle) -> Result<PageSession, InterlinearError> {
    let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(config.clone())?);
    Ok(PageSession::new(config, translator, handle)?)
}

async fn translate_page(
    config: ConfigManager,
    handle: BackgroundHandle,
    input: &str,
    options: &InterlinearOptions,
) -> Result<(), InterlinearError> {
    if let Some(lang) = &options.target_lang {
        config.set_target_lang(lang)?;
    }
    let target_lang = config.get()?.target_lang;

    let data = read_input(input)?;
    let session = new_session(config, handle)?;
    let (html, outcome) = translate_document(session, &data, options).await?;

    match outcome {
        PageOutcome::Completed(report) => {
            if !options.quiet {
                eprintln!(
                    "Translated {} of {} texts ({} characters)",
                    report.injected, report.collected, report.characters
                );
            }
        }
        PageOutcome::NothingToTranslate => {
            if !options.quiet {
                eprintln!("No translatable text found");
            }
        }
        PageOutcome::QuotaExceeded(check) => return Err(InterlinearError::new(&check.message())),
        PageOutcome::StopRequested => {}
    }

    let output = options
        .output
        .as_deref()
        .map(|path| format_output_path(path, &target_lang));
    write_output(output.as_deref(), &html)
}

async fn hover(
    config: ConfigManager,
    handle: BackgroundHandle,
    input: &str,
    id: &str,
    output: Option<&str>,
    times: usize,
) -> Result<(), InterlinearError> {
    let data = read_input(input)?;
    let (dom, document_encoding) = parse_document(&data, None)?;
    let target = find_element_by_id(&dom.document, id)
        .ok_or_else(|| InterlinearError::new(&format!("no element with id '{id}'")))?;

    let base_url = resolve_base_url(&dom, None)?;
    let mut session = new_session(config, handle)?.with_inject_options(InjectOptions { base_url });
    let mut controller = HoverController::new();
    let ctrl = KeyEvent::ctrl();

    for _ in 0..times {
        controller.pointer_enter(&target, Modifiers::default(), &session);
        controller.key_down(&ctrl, &session);
        let event = controller.key_up(&ctrl, &mut session).await?;
        controller.pointer_leave();

        match event {
            HoverEvent::Toggled(ToggleOutcome::Translated(_)) => eprintln!("Translation added"),
            HoverEvent::Toggled(ToggleOutcome::Reverted) => eprintln!("Translation removed"),
            HoverEvent::Toggled(ToggleOutcome::Ineligible(reason)) => {
                eprintln!("Nothing to translate ({reason:?})")
            }
            HoverEvent::Toggled(ToggleOutcome::QuotaExceeded(check)) => {
                return Err(InterlinearError::new(&check.message()))
            }
            HoverEvent::Toggled(ToggleOutcome::NotInjected) => eprintln!("Translation could not be placed"),
            HoverEvent::NoText => eprintln!("Element '{id}' holds no text"),
            HoverEvent::Ignored => {}
        }
    }

    let html = serialize_document(&dom, &document_encoding)?;
    write_output(output, &html)
}
