use dotenvy::dotenv;
use regex::Regex;
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;
use stock_bot::config::{DeliveryMode, Settings};
use stock_bot::runner::run_bot;
use tracing::{error, info};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Token patterns and their replacements, applied in order
const TOKEN_RULES: [(&str, &str); 3] = [
    // Bot API URLs: https://api.telegram.org/bot<token>/getUpdates
    (r"(https?://[^/]+/bot)[0-9]+:[A-Za-z0-9_-]+", "${1}[TELEGRAM_TOKEN]"),
    // Bare token, e.g. the webhook path
    (r"[0-9]{8,10}:[A-Za-z0-9_-]{35}", "[TELEGRAM_TOKEN]"),
    (r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+", "${1}[TELEGRAM_TOKEN]"),
];

/// Masks Telegram bot tokens in log output
struct TokenRedactor {
    rules: Vec<(Regex, &'static str)>,
}

impl TokenRedactor {
    /// Compiles [`TOKEN_RULES`].
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile.
    fn new() -> Result<Self, regex::Error> {
        let rules: Vec<(Regex, &'static str)> = TOKEN_RULES
            .iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern)?, *replacement)))
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { rules })
    }

    fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut line = Cow::Borrowed(line);
        for (pattern, replacement) in &self.rules {
            let replaced = match pattern.replace_all(&line, *replacement) {
                Cow::Borrowed(_) => None,
                Cow::Owned(text) => Some(text),
            };
            if let Some(text) = replaced {
                line = Cow::Owned(text);
            }
        }
        line
    }
}

/// Wraps a writer factory so every log record passes through the redactor
struct RedactingMakeWriter<F> {
    make_inner: F,
    redactor: Arc<TokenRedactor>,
}

impl<'a, F, W> MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            redactor: Arc::clone(&self.redactor),
        }
    }
}

struct RedactingWriter<W> {
    inner: W,
    redactor: Arc<TokenRedactor>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner
            .write_all(self.redactor.redact(&text).as_bytes())?;
        // Report the caller's length, not the redacted one
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Before logging, so nothing is ever written unredacted
    let redactor = Arc::new(TokenRedactor::new().map_err(|e| {
        eprintln!("Failed to compile redaction patterns: {e}");
        e
    })?);

    init_logging(redactor);

    info!("Starting stock bot...");

    let (settings, mode) = init_settings();

    if let Err(e) = run_bot(settings, mode).await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(redactor: Arc<TokenRedactor>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        redactor,
    };

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("stock_bot=info,teloxide=info,hyper=warn,reqwest=warn")
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> (Arc<Settings>, DeliveryMode) {
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let mode = match settings.delivery_mode() {
        Ok(mode) => mode,
        Err(e) => {
            error!("Invalid delivery mode configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    (Arc::new(settings), mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "1234567890:AAFr2wEY9dx_-HhWVw-rYgGNIv9DFSZcw4E";

    #[test]
    fn test_redacts_token_in_api_url() -> Result<(), regex::Error> {
        let redactor = TokenRedactor::new()?;
        let line = format!("error sending request for url (https://api.telegram.org/bot{TOKEN}/GetUpdates)");
        assert_eq!(
            redactor.redact(&line),
            "error sending request for url (https://api.telegram.org/bot[TELEGRAM_TOKEN]/GetUpdates)"
        );
        Ok(())
    }

    #[test]
    fn test_redacts_bare_token_in_webhook_url() -> Result<(), regex::Error> {
        let redactor = TokenRedactor::new()?;
        let url = format!("https://stock-bot.onrender.com/{TOKEN}");
        let redacted = redactor.redact(&url);
        assert_eq!(redacted, "https://stock-bot.onrender.com/[TELEGRAM_TOKEN]");
        Ok(())
    }

    #[test]
    fn test_plain_text_is_not_copied() -> Result<(), regex::Error> {
        let redactor = TokenRedactor::new()?;
        let line = "Spreadsheet loaded sheets=4";
        assert!(matches!(redactor.redact(line), Cow::Borrowed(text) if text == line));
        Ok(())
    }

    #[test]
    fn test_writer_reports_original_length() -> io::Result<()> {
        let redactor = Arc::new(TokenRedactor::new().map_err(io::Error::other)?);
        let mut writer = RedactingWriter {
            inner: Vec::new(),
            redactor,
        };
        let input = format!("token {TOKEN}\n");
        let written = writer.write(input.as_bytes())?;
        assert_eq!(written, input.len());
        assert_eq!(String::from_utf8_lossy(&writer.inner), "token [TELEGRAM_TOKEN]\n");
        Ok(())
    }
}
