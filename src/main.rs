use clap::{Parser, Subcommand};
use polypost::{config, output, serve, site};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "polypost")]
#[command(about = "Build tool for bilingual markdown blogs")]
#[command(long_about = "\
Build tool for bilingual markdown blogs

Posts are markdown/MDX files with YAML front-matter. A translation sits next
to its original with the language tag in the filename.

Site structure:

  my-blog/
  ├── config.toml                      # Site config (optional)
  └── content/blog/
      ├── hello-world/
      │   ├── index.md                 # Default locale → /hello-world/
      │   └── index.zh-hans.md         # Translation  → /zh-hans/hello-world/
      └── notes.md                     # Loose post   → /notes/

Build output:

  public/
  ├── routes.json                      # Every route with its page context
  ├── feed.json                        # JSON Feed of default-locale posts
  └── page-data/<route>/page-data.json

Run 'polypost gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site root (holds config.toml and the content directory)
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "public", global = true)]
    output: PathBuf,

    /// Log pipeline diagnostics (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write the output
    Build,
    /// Run the full pipeline without writing anything
    Check,
    /// Build, serve the output and rebuild on changes
    Dev,
    /// Serve the existing output
    Preview,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Each error's message already embeds its cause.
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Build => {
            println!("==> Building {}", cli.source.display());
            let plan = site::build(&cli.source, &cli.output)?;
            output::print_content_output(&plan, &cli.source);
            println!();
            output::print_route_output(&plan);
            println!("==> {}", output::format_build_summary(&plan));
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let plan = site::plan(&cli.source)?;
            output::print_content_output(&plan, &cli.source);
            println!();
            output::print_route_output(&plan);
            println!("==> {}", output::format_build_summary(&plan));
            println!("==> Content is valid");
        }
        Command::Dev => {
            serve::dev(&cli.source, &cli.output)?;
        }
        Command::Preview => {
            let config = config::load_config(&cli.source)?;
            if !cli.output.join(site::ROUTES_FILENAME).is_file() {
                return Err(format!(
                    "{} has no build output; run 'polypost build' first",
                    cli.output.display()
                )
                .into());
            }
            serve::preview(&cli.output, &config.serve)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr so stdout stays clean for `gen-config`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
