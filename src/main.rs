//! policy-forge – compliance policy generator and markdown → PDF exporter.
//!
//! Usage:
//!   policy-forge render <input.md> [-o output.pdf] [--plain] [--title "..."]
//!   policy-forge export --org Acme --framework HIPAA [--access-control ac.md ...]
//!   policy-forge serve [--port 3000]   (needs OPENROUTER_API_KEY)

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use policy_forge::export::{export_policies, ExportOptions};
use policy_forge::flow::LayoutMode;
use policy_forge::generate::{LlmConfig, OpenRouterClient, DEFAULT_API_BASE, DEFAULT_MODEL};
use policy_forge::pipeline::{generate_pdf, PipelineConfig};
use policy_forge::policy::{Framework, PolicyKind, PolicySet};
use policy_forge::prompts::sample_policy;
use policy_forge::server::{serve, AppState};

#[derive(Parser)]
#[command(name = "policy-forge")]
#[command(version)]
#[command(about = "Generate compliance policies and export them as PDFs", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one markdown file to PDF
    Render {
        /// Input markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output path (default: same stem as input with .pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document title in PDF metadata (default: input filename stem)
        #[arg(short, long)]
        title: Option<String>,

        /// Strip formatting and lay out plain text
        #[arg(long)]
        plain: bool,

        /// Also write the computed layout as JSON
        #[arg(long, value_name = "FILE")]
        layout_json: Option<PathBuf>,
    },

    /// Export a policy set to a zip of three PDFs
    Export {
        /// Organization name
        #[arg(long)]
        org: String,

        /// PCI-DSS, HIPAA, "NIST 800-171" or "CMMC Level 1"
        #[arg(long)]
        framework: Framework,

        /// Access control policy markdown (sample text if omitted)
        #[arg(long, value_name = "FILE")]
        access_control: Option<PathBuf>,

        /// Acceptable usage policy markdown (sample text if omitted)
        #[arg(long, value_name = "FILE")]
        acceptable_usage: Option<PathBuf>,

        /// Incident response policy markdown (sample text if omitted)
        #[arg(long, value_name = "FILE")]
        incident_response: Option<PathBuf>,

        /// Directory the archive is written to
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Strip formatting and lay out plain text
        #[arg(long)]
        plain: bool,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// OpenRouter API key
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        #[arg(long, default_value = DEFAULT_API_BASE)]
        api_base: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Render {
            input,
            output,
            title,
            plain,
            layout_json,
        } => render(&input, output, title, plain, layout_json.as_deref()),
        Commands::Export {
            org,
            framework,
            access_control,
            acceptable_usage,
            incident_response,
            out_dir,
            plain,
        } => {
            let load = |kind: PolicyKind, path: Option<PathBuf>| -> Result<String> {
                match path {
                    Some(p) => fs::read_to_string(&p)
                        .with_context(|| format!("reading '{}'", p.display())),
                    None => Ok(sample_policy(kind, &org, framework)),
                }
            };
            let policies = PolicySet {
                access_control: load(PolicyKind::AccessControl, access_control)?,
                acceptable_usage: load(PolicyKind::AcceptableUsage, acceptable_usage)?,
                incident_response: load(PolicyKind::IncidentResponse, incident_response)?,
            };
            let options = ExportOptions {
                mode: layout_mode(plain),
                ..ExportOptions::default()
            };
            let archive = export_policies(&policies, &org, framework, &options)?;
            create_parent(&out_dir.join(&archive.file_name))?;
            let path = archive.write_to_dir(&out_dir)?;
            eprintln!("Wrote '{}' ({} bytes)", path.display(), archive.bytes.len());
            Ok(())
        }
        Commands::Serve {
            host,
            port,
            api_key,
            model,
            api_base,
        } => {
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {host}:{port}"))?;
            let config = LlmConfig::new(api_key)
                .with_model(model)
                .with_api_base(api_base);
            let client = OpenRouterClient::new(config).context("building HTTP client")?;
            serve(addr, AppState::new(Arc::new(client))).await?;
            Ok(())
        }
    }
}

fn layout_mode(plain: bool) -> LayoutMode {
    if plain {
        LayoutMode::PlainText
    } else {
        LayoutMode::Rich
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating '{}'", parent.display()))?;
        }
    }
    Ok(())
}

fn render(
    input: &Path,
    output: Option<PathBuf>,
    title: Option<String>,
    plain: bool,
    layout_json: Option<&Path>,
) -> Result<()> {
    // Default output: same directory + same stem as input, but with .pdf
    let output = output.unwrap_or_else(|| input.with_extension("pdf"));

    let markdown = fs::read_to_string(input)
        .with_context(|| format!("reading '{}'", input.display()))?;

    let default_title = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("policy-forge output")
        .to_string();

    let config = PipelineConfig::default()
        .with_title(title.unwrap_or(default_title))
        .with_mode(layout_mode(plain));

    let (bytes, layout) = generate_pdf(&markdown, &config);

    create_parent(&output)?;
    fs::write(&output, &bytes).with_context(|| format!("writing '{}'", output.display()))?;

    if let Some(path) = layout_json {
        create_parent(path)?;
        fs::write(path, layout.to_json())
            .with_context(|| format!("writing '{}'", path.display()))?;
    }

    let pages = layout.pages.len();
    eprintln!(
        "Wrote '{}' ({} bytes, {} page{})",
        output.display(),
        bytes.len(),
        pages,
        if pages == 1 { "" } else { "s" }
    );
    Ok(())
}
