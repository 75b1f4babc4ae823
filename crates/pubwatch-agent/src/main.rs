//! pubwatch — new-publication monitor for a single author.
//! Entry point for the one-shot monitoring binary.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pubwatch_common::sandbox::SandboxClient;
use pubwatch_ingestion::artifact::HttpArtifactFetcher;
use pubwatch_ingestion::enrichment::Enricher;
use pubwatch_ingestion::ledger::CsvLedger;
use pubwatch_ingestion::pipeline::{MonitorJob, MonitorPipeline};
use pubwatch_ingestion::sources::inspire::InspireClient;
use pubwatch_llm::backend::GeminiBackend;
use pubwatch_notify::{RenderSettings, SmtpMailer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pubwatch=info,warn")),
        )
        .init();

    info!("pubwatch {} starting", env!("CARGO_PKG_VERSION"));

    let (config, secrets) = load_settings().context("configuration error")?;
    info!(
        author = %config.catalog.author,
        model  = %config.llm.model,
        state  = %config.state.path,
        policy = ?config.state.commit_policy,
        "Configuration loaded"
    );

    let pipeline = build_pipeline(&config, secrets)?;
    let job = MonitorJob {
        author: config.catalog.author.clone(),
        max_results: config.catalog.page_size,
        commit_policy: config.state.commit_policy,
        render: RenderSettings {
            recipient: config.mail.to.clone(),
            author_display_name: config.mail.author_display_name.clone(),
        },
    };

    let report = pipeline.run_once(&job).await.context("monitoring run aborted")?;
    if report.new_arrivals.is_empty() {
        info!("No new publications");
    }
    Ok(())
}

fn load_settings() -> anyhow::Result<(Config, Secrets)> {
    let config = Config::load()?;
    config.validate()?;
    let secrets = Secrets::from_env()?;
    Ok((config, secrets))
}

fn build_pipeline(config: &Config, secrets: Secrets) -> anyhow::Result<MonitorPipeline> {
    let mut client = SandboxClient::new(
        &config.catalog.user_agent,
        Duration::from_secs(config.artifact.timeout_secs),
    )?;
    client.allow_url_host(&config.catalog.base_url)?;
    client.allow_url_host(&config.artifact.base_url)?;

    let source = InspireClient::new(client.clone())
        .with_base_url(&config.catalog.base_url)
        .with_sort(&config.catalog.sort)
        .with_document_base(&config.artifact.base_url);

    let llm = GeminiBackend::new(secrets.genai_api_key, &config.llm.model)
        .with_base_url(&config.llm.base_url)
        .with_generation(config.llm.max_output_tokens, config.llm.temperature)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))
        .context("building generative model client")?;

    let enricher = Enricher::new(
        Arc::new(HttpArtifactFetcher::new(client)),
        Arc::new(llm),
        &config.mail.author_display_name,
    );

    let mailer = SmtpMailer::new(
        &config.mail.smtp_host,
        config.mail.smtp_port,
        &config.mail.from,
        secrets.mail_password,
        &config.mail.from,
    )
    .context("configuring mail transport")?;

    Ok(MonitorPipeline::new(
        Arc::new(source),
        enricher,
        Arc::new(mailer),
        Arc::new(CsvLedger::new(&config.state.path)),
    ))
}
