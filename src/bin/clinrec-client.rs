use anyhow::{Context, Result};
use clap::Parser;
use clinrec::output::{self, OutputFormat};
use clinrec::server::RecognizerClient;
use std::io::{self, BufRead};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "clinrec-client", version)]
#[command(about = "Annotate text with a running clinrec server")]
struct Cli {
    /// Server address, e.g. 127.0.0.1:8890
    addr: String,

    /// Texts to annotate (reads stdin lines when omitted)
    #[arg(trailing_var_arg = true)]
    text: Vec<String>,

    /// Print one JSON object per annotation
    #[arg(long, conflicts_with = "color")]
    json: bool,

    /// Print each text with matches highlighted
    #[arg(long)]
    color: bool,

    /// Socket timeout in seconds, 0 for none
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else if cli.color {
        OutputFormat::Highlight
    } else {
        OutputFormat::Tab
    };
    let timeout = (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout));

    let mut client = RecognizerClient::connect(cli.addr.as_str(), timeout)
        .with_context(|| format!("Failed to connect to {}", cli.addr))?;
    let mut stdout = output::stdout(cli.color);

    let mut annotate = |text: &str| -> Result<()> {
        let annotations = client.annotate(text).context("Request failed")?;
        output::print_annotations(&mut stdout, format, text, &annotations)?;
        Ok(())
    };

    if cli.text.is_empty() {
        for line in io::stdin().lock().lines() {
            annotate(&line.context("Failed to read stdin")?)?;
        }
    } else {
        for text in &cli.text {
            annotate(text)?;
        }
    }

    client.close()?;
    Ok(())
}
