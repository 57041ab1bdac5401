//! CLI binary for cardpress.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExportConfig` and prints results.

use anyhow::{Context, Result};
use cardpress::{
    Deck, ExportConfig, ExportController, ExportProgressCallback, ProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────

/// Terminal progress callback: a live bar over cards, with a println per
/// completed page. Captures are sequential, so events arrive in order.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Bar length is set by `on_export_start` once the deck is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading assets…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_export_start(&self, total_cards: usize, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} cards  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_cards as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Exporting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Exporting {total_cards} cards across {total_pages} pages…"
            ))
        ));
    }

    fn on_card_start(&self, card_index: usize, total_cards: usize) {
        self.bar
            .set_message(format!("card {}/{total_cards}", card_index + 1));
    }

    fn on_card_placed(&self, _card_index: usize, _total_cards: usize) {
        self.bar.inc(1);
    }

    fn on_page_complete(&self, page_index: usize, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>2}/{:<2} complete",
            green("✓"),
            page_index + 1,
            total_pages,
        ));
    }

    fn on_export_complete(&self, total_cards: usize, pdf_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} cards exported  {}",
            green("✔"),
            bold(&total_cards.to_string()),
            dim(&format!("({} PDF bytes)", pdf_bytes)),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export a deck to ./out/ (filename derived from the first card)
  cardpress cards.json -o out

  # Screen-resolution proof, fast
  cardpress cards.json -o out --dpi 150

  # Use a specific TTF for the identifier lines
  cardpress cards.json -o out --font /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf

  # Verify every QR asset decodes, without exporting anything
  cardpress cards.json --check-assets

  # Machine-readable run statistics
  cardpress cards.json -o out --json > stats.json

MANIFEST FORMAT:
  A JSON array of card records, field names camelCase:

  [
    {
      "qrCodeSrc": "qr/ws-1-alice-qr-9.png",
      "workspaceId": "ws-1",
      "userId": "alice",
      "qrCodeId": "qr-9"
    }
  ]

  qrCodeSrc is a local file path or a data:image/...;base64, URI.
  Remote URLs are not supported; cardpress never fetches data.

OUTPUT:
  One PDF named {workspaceId}-{userId}-{qrCodeId}-feedback-card.pdf after
  the first record. Pages are 210 x 296 mm holding four 105 x 148 mm cards
  in a 2 x 2 grid, in deck order. Either the whole document is written or
  nothing is.

ENVIRONMENT VARIABLES:
  CARDPRESS_OUTPUT_DIR   Default output directory
  CARDPRESS_DPI          Default capture resolution
  CARDPRESS_FONT         Default TTF font path
"#;

/// Export QR feedback-card decks to print-ready PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "cardpress",
    version,
    about = "Export QR feedback-card decks to print-ready PDFs",
    long_about = "Render a JSON deck of QR feedback cards into a multi-page, print-ready PDF: \
four 105 x 148 mm cards per 210 x 296 mm page, captured at print resolution with the QR image \
and identifier text on each card.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the JSON card manifest.
    manifest: PathBuf,

    /// Directory to write the PDF into (filename is derived from the deck).
    #[arg(short, long = "output-dir", env = "CARDPRESS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Capture resolution in DPI (72–600). 300 is print quality.
    #[arg(long, env = "CARDPRESS_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// TTF font for the card identifier lines.
    #[arg(long, env = "CARDPRESS_FONT",
          long_help = "TTF font used for the three identifier lines on each card.\n\
          If not set, well-known system locations are searched (DejaVu Sans, \
          Liberation Sans, Arial).")]
    font: Option<PathBuf>,

    /// Run only the asset readiness gate and report; export nothing.
    #[arg(long)]
    check_assets: bool,

    /// Print run statistics as JSON to stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "CARDPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARDPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CARDPRESS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar is the user-facing feedback; keep library logs at
    // error level while it is active unless verbose is requested.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let deck = Deck::load(&cli.manifest)
        .await
        .context("Failed to load card manifest")?;
    let total_cards = deck.len();

    // ── Check-assets mode ────────────────────────────────────────────────
    if cli.check_assets {
        let config = ExportConfig::builder()
            .dpi(cli.dpi)
            .build()
            .context("Invalid configuration")?;

        // The gate needs no renderer; inject a stub so no font is required.
        struct NoRender;
        impl cardpress::CardRenderer for NoRender {
            fn render(
                &self,
                _index: usize,
                _record: &cardpress::CardRecord,
                _qr: Arc<image::DynamicImage>,
            ) -> Result<cardpress::CardScene, cardpress::ExportError> {
                Ok(cardpress::CardScene::default())
            }
        }

        let mut controller = ExportController::with_renderer(deck, config, Arc::new(NoRender));
        match controller.load_assets().await {
            Ok(()) => {
                if !cli.quiet {
                    eprintln!(
                        "{} All {} QR assets decode — ready to export",
                        green("✔"),
                        bold(&total_cards.to_string())
                    );
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                std::process::exit(1);
            }
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExportProgressCallback>)
    } else {
        None
    };

    let mut builder = ExportConfig::builder().dpi(cli.dpi);
    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run export ───────────────────────────────────────────────────────
    let (path, stats) = cardpress::export_to_file(deck, config, &cli.output_dir)
        .await
        .context("Export failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} cards / {} pages  {}ms  →  {}",
            green("✔"),
            stats.cards,
            stats.pages,
            stats.total_ms,
            bold(&path.display().to_string()),
        );
    }

    Ok(())
}
