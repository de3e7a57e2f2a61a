mod error;
mod request;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use directories::ProjectDirs;
use musubi_core::{
    breakdown, clean, is_derivative, normalize, search_query, CatalogEntry, MatchConfig,
    MatchResult, Resolver,
};
use serde_json::Value;

use crate::error::CliError;
use crate::request::Request;

#[derive(Parser, Debug)]
#[command(
    name = "musubi",
    version,
    about = "Score and resolve anime titles across catalogs"
)]
struct Cli {
    /// Config file (default: the per-user musubi/config.toml, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show normalized, clean and search-query forms of titles
    Normalize {
        #[arg(required = true)]
        titles: Vec<String>,
    },
    /// Show the similarity breakdown of two titles
    Score {
        target: String,
        candidate: String,
        /// Compare the titles as given, without normalizing
        #[arg(long)]
        raw: bool,
    },
    /// Resolve a JSON request read from FILE or stdin
    Resolve {
        file: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// List the match tiers in evaluation order
    Tiers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "musubi=info",
        1 => "musubi=debug,musubi_core=debug",
        _ => "musubi=trace,musubi_core=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Normalize { titles } => {
            for title in &titles {
                println!("{title}");
                println!("  normalized:   {}", normalize(title));
                println!("  clean:        {}", clean(title));
                println!("  search query: {}", search_query(title));
                println!("  derivative:   {}", is_derivative(title));
            }
        }
        Command::Score {
            target,
            candidate,
            raw,
        } => {
            let (t, c) = if raw {
                (target, candidate)
            } else {
                (normalize(&target), normalize(&candidate))
            };
            let b = breakdown(&t, &c);
            println!("target:       {t:?}");
            println!("candidate:    {c:?}");
            println!("jaro-winkler: {:.4}", b.jaro_winkler);
            println!("levenshtein:  {:.4}", b.levenshtein);
            println!("base:         {:.4}", b.base);
            println!("containment:  {:?}", b.containment);
            println!("score:        {:.4}", b.score);
        }
        Command::Resolve { file, pretty } => {
            let resolver = Resolver::new(&load_config(cli.config.as_deref())?);
            let req = Request::read(file.as_deref())?;
            let found = resolver.resolve(&req.target, &req.candidates, &req.exclude);
            match &found {
                Some(m) => tracing::info!("{}", describe(m)),
                None => tracing::info!("No candidate matched"),
            }
            let out = if pretty {
                serde_json::to_string_pretty(&found)?
            } else {
                serde_json::to_string(&found)?
            };
            println!("{out}");
        }
        Command::Tiers => {
            let resolver = Resolver::new(&load_config(cli.config.as_deref())?);
            for (i, tier) in resolver.tiers().iter().enumerate() {
                println!("{}. {tier}", i + 1);
            }
        }
    }
    Ok(())
}

/// One-line summary of a match for the log.
fn describe(m: &MatchResult<'_, CatalogEntry<Value>>) -> String {
    format!(
        "Matched {} ({}) via {} at {:.4}",
        m.candidate.title.preferred(),
        m.candidate.id,
        m.method,
        m.similarity
    )
}

/// Explicit path, else the per-user config file, else built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<MatchConfig, CliError> {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "Loading config");
        return Ok(MatchConfig::load(path)?);
    }

    match user_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "Loading user config");
            Ok(MatchConfig::load(&path)?)
        }
        _ => Ok(MatchConfig::default()),
    }
}

fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "musubi").map(|d| d.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve_command() {
        let cli = Cli::try_parse_from(["musubi", "-vv", "resolve", "req.json", "--pretty"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Resolve { ref file, pretty: true } if file.as_deref() == Some(Path::new("req.json"))
        ));
    }

    #[test]
    fn describe_uses_preferred_title() {
        let req = Request::parse(
            r#"{
                "target": {"titles": ["Sousou no Frieren"], "type": "TV"},
                "candidates": [{
                    "id": 154587,
                    "title": {"romaji": "Sousou no Frieren", "english": "Frieren: Beyond Journey's End"},
                    "format": "TV"
                }]
            }"#,
        )
        .unwrap();
        let found = Resolver::default()
            .resolve(&req.target, &req.candidates, &req.exclude)
            .unwrap();
        assert_eq!(
            describe(&found),
            "Matched Frieren: Beyond Journey's End (154587) via exact-type-raw at 1.0000"
        );
    }

    #[test]
    fn normalize_needs_a_title() {
        assert!(Cli::try_parse_from(["musubi", "normalize"]).is_err());
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[loose]\nmin_similarity = 0.9\n[last_resort]\n[fallback]\naccept_at = 0.5\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.loose.min_similarity, 0.9);
        assert_eq!(config.fallback.accept_at, 0.5);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(Some(&dir.path().join("absent.toml"))),
            Err(CliError::Core(_))
        ));
    }
}
