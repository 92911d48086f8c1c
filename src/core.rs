use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};

use chrono::{SecondsFormat, Utc};
use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use url::Url;

use crate::env::{EnvVar, NoColor};
use crate::parsers::html::{get_base_url, get_charset, html_to_dom, serialize_document};
use crate::translation::inject::InjectOptions;
use crate::translation::session::{PageOutcome, PageSession};

/// Top-level error surfaced by the library entry points and the CLI
#[derive(Debug)]
pub struct InterlinearError {
    details: String,
}

impl InterlinearError {
    pub fn new(msg: &str) -> InterlinearError {
        InterlinearError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for InterlinearError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for InterlinearError {}

impl From<io::Error> for InterlinearError {
    fn from(error: io::Error) -> Self {
        InterlinearError::new(&error.to_string())
    }
}

/// Options of a full-document run
#[derive(Default, Clone, Debug)]
pub struct InterlinearOptions {
    /// Overrides any `<base>` the document declares
    pub base_url: Option<String>,
    /// Charset of the input; the document's own declaration wins when valid
    pub encoding: Option<String>,
    pub output: Option<String>,
    pub target_lang: Option<String>,
    pub quiet: bool,
}

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// Reads a file, or stdin for `-`
pub fn read_input(target: &str) -> Result<Vec<u8>, InterlinearError> {
    if target == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        return Ok(data);
    }

    fs::read(target)
        .map_err(|e| InterlinearError::new(&format!("could not read {target}: {e}")))
}

/// Parses the input, re-parsing with the document's declared charset when
/// it names a known encoding
pub fn parse_document(data: &[u8], encoding: Option<&str>) -> Result<(RcDom, String), InterlinearError> {
    let mut document_encoding = encoding.unwrap_or("utf-8").to_string();
    let mut dom = html_to_dom(data, &document_encoding)?;

    if let Some(html_charset) = get_charset(&dom.document) {
        if let Some(charset) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
            if !charset.name().eq_ignore_ascii_case(&document_encoding) {
                document_encoding = charset.name().to_string();
                dom = html_to_dom(data, &document_encoding)?;
            }
        }
    }

    Ok((dom, document_encoding))
}

/// Base URL for resolving mirrored links: the option, else the document's `<base>`
pub fn resolve_base_url(dom: &RcDom, custom: Option<&str>) -> Result<Option<Url>, InterlinearError> {
    if let Some(custom) = custom {
        return Url::parse(custom)
            .map(Some)
            .map_err(|e| InterlinearError::new(&format!("invalid base URL '{custom}': {e}")));
    }

    Ok(get_base_url(&dom.document).and_then(|href| Url::parse(&href).ok()))
}

/// Runs a full-page translation over an HTML document and serializes the result
pub async fn translate_document(
    session: PageSession,
    data: &[u8],
    options: &InterlinearOptions,
) -> Result<(Vec<u8>, PageOutcome), InterlinearError> {
    let (dom, document_encoding) = parse_document(data, options.encoding.as_deref())?;
    let base_url = resolve_base_url(&dom, options.base_url.as_deref())?;

    let mut session = session.with_inject_options(InjectOptions { base_url });
    let outcome = session.translate_page(&dom).await?;
    let output = serialize_document(&dom, &document_encoding)?;

    Ok((output, outcome))
}

/// Writes to a file, or stdout when no path (or `-`) is given
pub fn write_output(path: Option<&str>, data: &[u8]) -> Result<(), InterlinearError> {
    match path {
        None | Some("-") => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
        Some(path) => fs::write(path, data)
            .map_err(|e| InterlinearError::new(&format!("could not write {path}: {e}")))?,
    }
    Ok(())
}

/// Expands `%lang%` and `%timestamp%` in an output path
pub fn format_output_path(path: &str, target_lang: &str) -> String {
    let datetime: &str = &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    path.replace("%timestamp%", &datetime.replace(':', "_"))
        .replace("%lang%", &target_lang.replace(['/', '\\', ':'], "_"))
}

/// Prints an error message to stderr, in red when stderr is a terminal
pub fn print_error_message(msg: &str) {
    let colored = atty::is(atty::Stream::Stderr) && !NoColor::get_or_default(false);
    if colored {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    } else {
        eprintln!("{msg}");
    }
}

/// Prints an info message to stdout
pub fn print_info_message(msg: &str) {
    println!("{msg}");
}
