use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use vaultclip_core::{
    Clipper, ClipperConfig, FsStorage, JsonConfig, JsonFormatter, ReqwestFetcher, attachment_directory, fetch_file,
    fetch_stdin,
};

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the clipped note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: markdown, json", s)),
        }
    }
}

/// Clip a web page into a Markdown note with locally stored images
#[derive(Parser, Debug)]
#[command(name = "vaultclip")]
#[command(author = "Vaultclip Contributors")]
#[command(version)]
#[command(about = "Clip web pages into Markdown notes", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Page URL for file or stdin input (resolves relative links and images)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Vault-relative path of the note; its folder hosts the default attachment folder
    #[arg(short, long, default_value = "Clipping.md", value_name = "PATH")]
    note: String,

    /// Vault root directory that images are written under
    #[arg(long, default_value = ".", value_name = "DIR")]
    vault: PathBuf,

    /// Vault-relative attachment folder, overriding the per-note default
    #[arg(long, value_name = "DIR")]
    attachments: Option<String>,

    /// Keep remote images instead of downloading them
    #[arg(long)]
    no_images: bool,

    /// Output format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: OutputFormat,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Config file (default: <config dir>/vaultclip/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn is_remote_input(&self) -> bool {
        self.input.starts_with("http://") || self.input.starts_with("https://")
    }

    /// Loads the config file and applies flag overrides on top of it.
    fn clipper_config(&self) -> anyhow::Result<ClipperConfig> {
        let mut config = ClipperConfig::load_or_default(self.config.as_deref()).context("Failed to load config")?;

        if let Some(folder) = &self.attachments {
            config.attachment_folder = folder.clone();
        }
        if self.no_images {
            config.fetch_images = false;
        }
        if let Some(timeout) = self.timeout {
            config.fetch.timeout = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.fetch.user_agent = user_agent.clone();
        }
        config.debug |= self.verbose;

        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "warn,clip=debug,image=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(true).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.clipper_config()?;
    let verbose = config.debug;

    init_logging(verbose);

    if verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let started = Instant::now();
    let fetcher = ReqwestFetcher::new(config.fetch.clone()).context("Failed to build HTTP client")?;
    let storage = FsStorage::new(&args.vault);
    let directory = attachment_directory(&config, &args.note);
    let fetch_images = config.fetch_images;
    let clipper = Clipper::new(fetcher, storage, config);

    let note = if args.is_remote_input() {
        if verbose {
            echo::print_step(1, 2, &format!("Clipping {}", args.input.bright_white().underline()));
        }
        clipper.clip(&args.input, &args.note).await.context("Failed to clip page")?
    } else {
        let Some(url) = args.url.as_deref() else {
            bail!("--url is required when reading from a file or stdin");
        };

        let html = if args.input == "-" {
            fetch_stdin().context("Failed to read from stdin")?
        } else {
            fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
        };

        if verbose {
            echo::print_step(1, 2, &format!("Clipping {} as {}", args.input.bright_white(), url.underline()));
            echo::print_detail("Size", &echo::format_size(html.len()));
        }
        clipper.clip_html(&html, url, &args.note).await.context("Failed to clip page")?
    };

    if verbose {
        echo::print_detail("Title", &note.title);
        if fetch_images {
            echo::print_detail("Attachments", &args.vault.join(&directory).display().to_string());
        }
        echo::print_timing("Clip", started.elapsed());
        eprintln!();
        echo::print_step(2, 2, "Writing output");
    }

    let output = match args.format {
        OutputFormat::Markdown => note.render(),
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(JsonConfig { include_note: true, pretty: true });
            formatter.format(&note).context("Failed to convert to JSON")?
        }
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
