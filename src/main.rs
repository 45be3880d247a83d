use anyhow::Result;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use corpref::cli::Cli;
use corpref::completion::{CompletionService, OpenAiClient, UnavailableCompletion};
use corpref::config::{self, AppConfig};
use corpref::export;
use corpref::logger::{RunLogger, VerbosityLevel};
use corpref::wiki_client::WikiClient;
use corpref::{Collaborators, CompanyTarget, ResolutionOrchestrator};

fn init_tracing(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("corpref={}", verbosity.tracing_directive())));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(cli: &Cli) -> AppConfig {
    let result = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_path(Path::new(path)),
        None => AppConfig::load(),
    };

    match result {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) if cli.config.is_none() => {
            eprintln!("Configuration file not found at {}; using built-in defaults.", path.display());
            eprintln!("   Run with --init to create an editable configuration file.");
            AppConfig::default()
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn completion_client(cfg: &AppConfig, logger: &RunLogger) -> Arc<dyn CompletionService> {
    match OpenAiClient::from_env(&cfg.completion) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!("Completion service unavailable: {}", e);
            logger.warn(&format!("Completion service unavailable ({}); keyword guessing and text inference are disabled", e));
            Arc::new(UnavailableCompletion::new(e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run corpref again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let Some(website) = cli.website.clone() else {
        eprintln!("❌ No website given. Usage: corpref --website <URL>");
        std::process::exit(1);
    };
    if corpref::normalize(&website).is_none() {
        eprintln!("❌ '{}' does not contain a usable domain", website);
        std::process::exit(1);
    }

    let verbosity = if cli.quiet {
        VerbosityLevel::Silent
    } else {
        VerbosityLevel::from_verbose_count(cli.verbose)
    };
    init_tracing(verbosity);

    let logger = match cli.log_file.clone() {
        Some(path) => RunLogger::with_log_file(verbosity, path),
        None => RunLogger::new(verbosity),
    };

    let app_config = load_config(&cli);

    let wiki = match WikiClient::new(
        &app_config.http,
        &app_config.reference,
        app_config.search.max_titles_per_keyword,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let collaborators = Collaborators {
        documents: wiki.clone(),
        search: wiki,
        completion: completion_client(&app_config, &logger),
    };
    let orchestrator = match ResolutionOrchestrator::from_config(&app_config, collaborators) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let show_spinner = !cli.no_progress && io::stderr().is_terminal();
    logger.start(&website, show_spinner);

    let (result, stats) = orchestrator
        .resolve_with_stats(&CompanyTarget::new(website.clone()))
        .await?;

    logger.record_search(stats.keywords_tried, stats.candidates_fetched);
    match &result {
        Some(resolution) => {
            logger.log_match(&resolution.reference_url, &resolution.match_tier.to_string());
            for entity in resolution.entities() {
                logger.log_entity(
                    &entity.name,
                    entity.relation_kind.as_str(),
                    entity.domain.as_ref().map(|d| d.as_str()),
                );
            }
            logger.record_entities(
                resolution.subsidiaries.len() + resolution.acquisitions.len(),
                resolution.resolved_domain_count(),
            );
        }
        None => logger.log_no_match(&website),
    }
    logger.finish();

    let export = export::build_export(&website, result.as_ref(), &stats);
    match cli.output.as_deref() {
        Some(path) => match export::export_json(&export, path) {
            Ok(()) => logger.log_export_success(path),
            Err(e) => {
                logger.error(&format!("Failed to write {}: {}", path, e));
                std::process::exit(1);
            }
        },
        None => println!("{}", export::render_json(&export)?),
    }

    logger.print_final_summary();

    if logger.is_log_export_enabled() {
        if let Err(e) = logger.export_logs() {
            logger.error(&format!("Failed to write log file: {}", e));
        }
    }

    Ok(())
}
