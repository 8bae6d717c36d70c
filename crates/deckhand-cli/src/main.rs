//! Deckhand CLI
//!
//! Command-line interface for Deckhand - edit presentations stored on a
//! remote persistence service.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use deckhand_core::{Config, Gateway};

mod commands;
mod output;

use commands::element::{GeometryArgs, KindArg};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(about = "Deckhand - edit presentations on a remote slide service")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presentations
    #[command(alias = "ls")]
    List,
    /// Create a presentation
    New {
        /// Presentation title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Show a presentation with its slides and elements
    Show {
        /// Presentation ID
        presentation: String,
    },
    /// Rename a presentation
    Rename {
        /// Presentation ID
        presentation: String,
        /// New title
        title: String,
    },
    /// Delete a presentation
    #[command(alias = "rm")]
    Delete {
        /// Presentation ID
        presentation: String,
    },
    /// Manage slides
    Slide {
        #[command(subcommand)]
        command: SlideCommands,
    },
    /// Manage elements
    Element {
        #[command(subcommand)]
        command: ElementCommands,
    },
    /// Upload an image or video and place it on a slide
    Upload {
        /// Presentation ID
        presentation: String,
        /// Slide ID
        slide: String,
        /// File to upload
        file: PathBuf,
        #[command(flatten)]
        geometry: GeometryArgs,
    },
    /// Download a presentation as PPTX
    Export {
        /// Presentation ID
        presentation: String,
        /// Output file (defaults to <export_dir>/<title>.pptx)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SlideCommands {
    /// Append a slide
    Add {
        /// Presentation ID
        presentation: String,
    },
    /// Delete a slide
    #[command(alias = "rm")]
    Delete {
        /// Presentation ID
        presentation: String,
        /// Slide ID
        slide: String,
    },
    /// Move a slide to a new position
    Move {
        /// Presentation ID
        presentation: String,
        /// Slide ID
        slide: String,
        /// New position (1-based)
        position: usize,
    },
    /// Set a slide's background colour
    Color {
        /// Presentation ID
        presentation: String,
        /// Slide ID
        slide: String,
        /// Colour as #RRGGBB
        color: String,
    },
}

#[derive(Subcommand)]
enum ElementCommands {
    /// Add an element to a slide
    Add {
        /// Presentation ID
        presentation: String,
        /// Slide ID
        slide: String,
        /// Element kind
        #[arg(short, long, value_enum, default_value = "text")]
        kind: KindArg,
        /// Text, or the media URL for image and video elements
        content: Option<String>,
        #[command(flatten)]
        geometry: GeometryArgs,
    },
    /// Move, resize or edit an element
    Update {
        /// Presentation ID
        presentation: String,
        /// Element ID
        element: String,
        /// New text or media URL
        #[arg(long)]
        content: Option<String>,
        /// New font size (text elements)
        #[arg(long)]
        font_size: Option<u32>,
        #[command(flatten)]
        geometry: GeometryArgs,
    },
    /// Delete an element
    #[command(alias = "rm")]
    Delete {
        /// Presentation ID
        presentation: String,
        /// Element ID
        element: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, api_token, request_timeout_secs, export_dir, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands must work even when the config file is broken
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_override(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(cli.verbose, config.log_file.as_deref());
    debug!("Using service at {}", config.api_url);

    let gateway = commands::connect(&config)?;

    match cli.command {
        Commands::List => commands::presentation::list(gateway, &output).await,
        Commands::New { title } => commands::presentation::create(gateway, title, &output).await,
        Commands::Show { presentation } => {
            commands::presentation::show(gateway, presentation, &output).await
        }
        Commands::Rename {
            presentation,
            title,
        } => commands::presentation::rename(gateway, presentation, title, &output).await,
        Commands::Delete { presentation } => {
            commands::presentation::delete(gateway, presentation, &output).await
        }
        Commands::Slide { command } => handle_slide_command(command, gateway, &output).await,
        Commands::Element { command } => handle_element_command(command, gateway, &output).await,
        Commands::Upload {
            presentation,
            slide,
            file,
            geometry,
        } => {
            commands::element::upload(gateway, presentation, slide, &file, geometry, &output).await
        }
        Commands::Export { presentation, out } => {
            commands::presentation::export(gateway, &config, presentation, out, &output).await
        }
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

async fn handle_slide_command(
    command: SlideCommands,
    gateway: Arc<dyn Gateway>,
    output: &Output,
) -> Result<()> {
    match command {
        SlideCommands::Add { presentation } => {
            commands::slide::add(gateway, presentation, output).await
        }
        SlideCommands::Delete {
            presentation,
            slide,
        } => commands::slide::delete(gateway, presentation, slide, output).await,
        SlideCommands::Move {
            presentation,
            slide,
            position,
        } => commands::slide::move_to(gateway, presentation, slide, position, output).await,
        SlideCommands::Color {
            presentation,
            slide,
            color,
        } => commands::slide::color(gateway, presentation, slide, color, output).await,
    }
}

async fn handle_element_command(
    command: ElementCommands,
    gateway: Arc<dyn Gateway>,
    output: &Output,
) -> Result<()> {
    match command {
        ElementCommands::Add {
            presentation,
            slide,
            kind,
            content,
            geometry,
        } => {
            commands::element::add(gateway, presentation, slide, kind, content, geometry, output)
                .await
        }
        ElementCommands::Update {
            presentation,
            element,
            content,
            font_size,
            geometry,
        } => {
            commands::element::update(
                gateway,
                presentation,
                element,
                content,
                font_size,
                geometry,
                output,
            )
            .await
        }
        ElementCommands::Delete {
            presentation,
            element,
        } => commands::element::delete(gateway, presentation, element, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging to stderr, or to `log_file` when configured
///
/// `RUST_LOG` wins over `--verbose` when set.
fn init_logging(verbose: u8, log_file: Option<&Path>) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("deckhand_core={},deckhand_cli={}", level, level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match log_file {
        Some(path) => match File::create(path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not create log file {:?}: {}", path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_element_add() {
        let cli = Cli::try_parse_from([
            "deckhand",
            "--json",
            "element",
            "add",
            "p1",
            "7",
            "--kind",
            "youtube",
            "https://youtu.be/abc",
            "--x",
            "20",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Element {
                command:
                    ElementCommands::Add {
                        kind,
                        content,
                        geometry,
                        ..
                    },
            } => {
                assert_eq!(kind, KindArg::Youtube);
                assert_eq!(content.as_deref(), Some("https://youtu.be/abc"));
                assert_eq!(geometry.x, Some(20.0));
                assert!(geometry.width.is_none());
            }
            _ => panic!("expected element add"),
        }
    }

    #[test]
    fn test_cli_parses_slide_move_and_global_flags() {
        let cli = Cli::try_parse_from([
            "deckhand", "slide", "move", "p1", "3", "1", "-vv", "--config", "/tmp/c.toml",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Commands::Slide {
                command: SlideCommands::Move { position: 1, .. }
            }
        ));
    }

    #[test]
    fn test_cli_parses_presentation_delete() {
        let cli = Cli::try_parse_from(["deckhand", "rm", "p1", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Delete { presentation } if presentation == "p1"
        ));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["deckhand"]).is_err());
    }
}
