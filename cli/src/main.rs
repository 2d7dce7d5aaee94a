//! CLI entrypoint for agent-fleet
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use fleet_application::{
    Actuator, AgentLifecycleManager, AgentRepository, AuditLog, ConsensusEngine, FleetConfig,
    FleetServices, JournalRepository, LeaseService, NoAuditLog, ObservationSource,
    ReasoningProvider, StateRepository,
};
use fleet_domain::{AgentConfig, AgentId, ConfigIssue, ValidatorRole};
use fleet_infrastructure::{
    CapabilityRegistry, ConfigLoader, FileConfig, FileLeaseService, HashingEmbedder,
    HeuristicProvider, HeuristicVoter, InMemoryAgentRepository, InMemoryJournal,
    InMemoryLeaseTable, InMemoryStateRepository, InMemoryVectorRepository,
    JsonFileAgentRepository, JsonFileCheckpointStore, JsonFileStateRepository, JsonlAuditLog,
    JsonlJournal, KeywordSentimentVoter, MemorySearchHandler, ObservationHandler, PaperActuator,
    ProviderKind, ReplayObservationSource, RiskHandler, SyntheticObservationSource,
    TracingNotifier,
};
use fleet_presentation::{AgentSpec, Cli, Command, ConsoleFormatter, OutputFormat, RunArgs};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const STATUS_POLL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_dir.as_deref());

    // === Configuration ===
    let file_config = ConfigLoader::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    let (config, issues) = file_config.into_fleet_config();

    match cli.command {
        Command::ShowConfig => show_config(cli.config.as_deref(), &file_config, &issues),
        Command::Run(args) => {
            if !issues.is_empty() {
                eprint!("{}", ConsoleFormatter::format_config_issues(&issues));
            }
            if FleetConfig::has_errors(&issues) {
                bail!("Configuration has errors; fix them and retry");
            }
            run(args, file_config, config).await
        }
    }
}

/// Stderr logging filtered by `-v` (or `RUST_LOG`), plus an optional daily file.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "agent-fleet.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not create log directory {} ({}), file logging disabled",
                    dir.display(),
                    e
                );
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

fn show_config(
    config_path: Option<&Path>,
    file_config: &FileConfig,
    issues: &[ConfigIssue],
) -> Result<()> {
    println!("Configuration sources (highest priority first):");
    for source in ConfigLoader::sources(config_path) {
        let marker = if source.found { "found" } else { "missing" };
        println!("  {:<9} {} ({})", source.label, source.location, marker);
    }
    println!();
    let rendered =
        toml::to_string_pretty(file_config).context("Failed to render configuration")?;
    println!("{}", rendered);
    if issues.is_empty() {
        println!("No configuration issues.");
    } else {
        print!("{}", ConsoleFormatter::format_config_issues(issues));
    }
    Ok(())
}

async fn run(args: RunArgs, file_config: FileConfig, config: FleetConfig) -> Result<()> {
    info!("Starting agent-fleet");
    let grace = config.lifecycle.grace_period;

    // === Dependency Injection ===
    let provider = build_provider(&file_config)?;
    let observation = build_observation(&args)?;

    let storage = Storage::open(&args, config.lifecycle.lease_ttl);
    let interval = file_config.lifecycle.decision_interval_secs;
    for spec in &args.agents {
        register_agent(storage.agents.as_ref(), spec, interval).await?;
    }

    let memory = Arc::new(
        fleet_application::MemoryStore::new(
            Arc::new(InMemoryVectorRepository::default()),
            Arc::new(HashingEmbedder::default()),
            config.memory.clone(),
        )
        .with_summarizer(Arc::clone(&provider)),
    );

    let mut consensus = ConsensusEngine::new(config.consensus.clone());
    let (validators, _) = file_config.consensus.parse_validators();
    for (role, weight) in validators {
        consensus = consensus.with_voter(build_voter(&file_config, role, weight)?);
    }
    for i in 0..file_config.consensus.sentiment_voters {
        let voter = KeywordSentimentVoter::new(format!("keyword-{}", i + 1))
            .with_title_weight(1.0 + i as f64 * 0.5);
        consensus = consensus.with_sentiment_voter(Arc::new(voter));
    }

    let capabilities = CapabilityRegistry::new()
        .register(RiskHandler)
        .register(ObservationHandler)
        .register(MemorySearchHandler::new(Arc::clone(&memory)));

    let audit: Arc<dyn AuditLog> = match JsonlAuditLog::open(args.audit_log_path()) {
        Some(log) => Arc::new(log),
        None => Arc::new(NoAuditLog),
    };
    let actuator: Arc<dyn Actuator> = Arc::new(PaperActuator::new());

    let services = FleetServices {
        agents: storage.agents,
        states: storage.states,
        journal: storage.journal,
        checkpoints: Arc::new(JsonFileCheckpointStore::new(args.checkpoint_dir())),
        lease: storage.lease,
        provider,
        capabilities: Arc::new(capabilities),
        memory,
        consensus: Arc::new(consensus),
        observation,
        notifier: Arc::new(TracingNotifier),
        audit,
        default_actuator: Arc::clone(&actuator),
    };
    let manager = AgentLifecycleManager::new(services, config);

    // === Start ===
    let restored = manager
        .restore_all()
        .await
        .context("Failed to restore trading agents")?;
    print!("{}", ConsoleFormatter::format_restore(&restored));

    for spec in &args.agents {
        match manager
            .start(&spec.id, &spec.target, spec.budget, Arc::clone(&actuator))
            .await
        {
            Ok(()) => println!("Started {} on {} with {:.2}", spec.id, spec.target, spec.budget),
            Err(e) if e.is_coordination() => warn!(agent_id = %spec.id, "Not started: {}", e),
            Err(e) => bail!("Failed to start {}: {}", spec.id, e),
        }
    }
    if manager.status().is_empty() {
        bail!("No agents running. Pass --agent ID:TARGET:BUDGET to start one.");
    }
    println!("Running. Press Ctrl-C to stop.");

    // === Run until Ctrl-C ===
    let mut printed: HashMap<AgentId, u64> = HashMap::new();
    let mut ticker = tokio::time::interval(STATUS_POLL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => {
                for (id, status) in manager.status() {
                    let Some(report) = &status.last_cycle else { continue };
                    let seen = printed.entry(id.clone()).or_insert(0);
                    if report.cycle > *seen {
                        *seen = report.cycle;
                        println!("{}", ConsoleFormatter::format_cycle(&id, report));
                    }
                }
            }
        }
    }

    // === Shutdown ===
    println!("Shutting down (grace period {}s)...", grace.as_secs());
    let final_status = manager.status();
    let report = manager.shutdown(grace).await;
    print!("{}", ConsoleFormatter::format_shutdown(&report));

    let output = match args.output {
        OutputFormat::Table => ConsoleFormatter::format_status(&final_status),
        OutputFormat::Json => ConsoleFormatter::format_status_json(&final_status),
    };
    println!("{}", output);
    Ok(())
}

/// Repositories and the lease service, on disk unless `--ephemeral`
struct Storage {
    agents: Arc<dyn AgentRepository>,
    states: Arc<dyn StateRepository>,
    journal: Arc<dyn JournalRepository>,
    lease: Arc<dyn LeaseService>,
}

impl Storage {
    fn open(args: &RunArgs, lease_ttl: Duration) -> Self {
        let holder = format!("agent-fleet-{}", std::process::id());
        if args.ephemeral {
            info!("Ephemeral run; nothing survives this process");
            return Self {
                agents: Arc::new(InMemoryAgentRepository::default()),
                states: Arc::new(InMemoryStateRepository::default()),
                journal: Arc::new(InMemoryJournal::default()),
                lease: Arc::new(InMemoryLeaseTable::new(lease_ttl).holder(holder)),
            };
        }
        let dir = &args.data_dir;
        info!(data_dir = %dir.display(), holder = %holder, "Using file storage");
        Self {
            agents: Arc::new(JsonFileAgentRepository::new(dir.join("agents"))),
            states: Arc::new(JsonFileStateRepository::new(dir.join("states"))),
            journal: Arc::new(JsonlJournal::new(dir.join("journal"))),
            lease: Arc::new(FileLeaseService::new(dir.join("leases"), holder, lease_ttl)),
        }
    }
}

/// Create the agent's config, or update the archetype and interval of a
/// stored one while keeping its learned signal weights.
async fn register_agent(
    agents: &dyn AgentRepository,
    spec: &AgentSpec,
    interval: u64,
) -> Result<()> {
    let config = match agents
        .get(&spec.id)
        .await
        .with_context(|| format!("Failed to load agent {}", spec.id))?
    {
        Some(mut stored) => {
            if stored.archetype != spec.archetype {
                info!(
                    agent_id = %spec.id,
                    from = %stored.archetype,
                    to = %spec.archetype,
                    "Archetype changed"
                );
                stored.archetype = spec.archetype;
                stored.limits = spec.archetype.default_limits();
            }
            stored.decision_interval_secs = interval;
            stored.updated_at = chrono::Utc::now();
            stored
        }
        None => AgentConfig::new(spec.id.clone(), "cli", spec.archetype)
            .with_decision_interval(interval),
    };
    config
        .validate()
        .with_context(|| format!("Invalid agent {}", spec.id))?;
    agents
        .save(&config)
        .await
        .with_context(|| format!("Failed to save agent {}", spec.id))
}

fn build_observation(args: &RunArgs) -> Result<Arc<dyn ObservationSource>> {
    match &args.replay {
        Some(path) => {
            let source = ReplayObservationSource::load(path)
                .with_context(|| format!("Failed to load replay file {}", path.display()))?
                .looping(args.loop_replay);
            info!(targets = ?source.targets(), "Replaying market snapshots");
            Ok(Arc::new(source))
        }
        None => {
            info!("No replay file; using synthetic market data");
            Ok(Arc::new(SyntheticObservationSource::new()))
        }
    }
}

fn build_provider(file_config: &FileConfig) -> Result<Arc<dyn ReasoningProvider>> {
    let (kind, _) = file_config.provider.parse_kind();
    match kind {
        ProviderKind::Heuristic => Ok(Arc::new(HeuristicProvider)),
        ProviderKind::Chat => chat_provider(file_config),
    }
}

#[cfg(feature = "http-providers")]
fn chat_client(file_config: &FileConfig) -> Result<Arc<fleet_infrastructure::ChatClient>> {
    let provider = &file_config.provider;
    let client = fleet_infrastructure::ChatClient::new(fleet_infrastructure::ChatConfig {
        endpoint: provider.endpoint.clone(),
        model: provider.model.clone(),
        api_key: provider.api_key(),
        timeout: Duration::from_secs(provider.timeout_secs),
        temperature: 0.2,
    })?;
    Ok(Arc::new(client))
}

#[cfg(feature = "http-providers")]
fn chat_provider(file_config: &FileConfig) -> Result<Arc<dyn ReasoningProvider>> {
    let client = chat_client(file_config)?;
    info!(model = client.model(), "Using chat-completions provider");
    Ok(Arc::new(fleet_infrastructure::ChatProvider::new(client)))
}

#[cfg(not(feature = "http-providers"))]
fn chat_provider(_file_config: &FileConfig) -> Result<Arc<dyn ReasoningProvider>> {
    warn!("provider.kind = \"chat\" needs the http-providers feature; using the heuristic provider");
    Ok(Arc::new(HeuristicProvider))
}

fn build_voter(
    file_config: &FileConfig,
    role: ValidatorRole,
    weight: f64,
) -> Result<Arc<dyn fleet_application::Voter>> {
    #[cfg(feature = "http-providers")]
    if file_config.provider.parse_kind().0 == ProviderKind::Chat {
        let client = chat_client(file_config)?;
        return Ok(Arc::new(fleet_infrastructure::ChatVoter::new(client, role, weight)));
    }
    #[cfg(not(feature = "http-providers"))]
    let _ = file_config;
    Ok(Arc::new(HeuristicVoter::new(role).with_weight(weight)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_application::MemoryStore;

    fn run_args(data_dir: &Path, extra: &[&str]) -> RunArgs {
        let mut argv = vec!["agent-fleet", "run", "--data-dir"];
        let dir = data_dir.to_str().unwrap();
        argv.push(dir);
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            Command::ShowConfig => panic!("expected run"),
        }
    }

    fn manager(storage: Storage, args: &RunArgs, config: &FleetConfig) -> AgentLifecycleManager {
        let memory = Arc::new(MemoryStore::new(
            Arc::new(InMemoryVectorRepository::default()),
            Arc::new(HashingEmbedder::default()),
            config.memory.clone(),
        ));
        let services = FleetServices {
            agents: storage.agents,
            states: storage.states,
            journal: storage.journal,
            checkpoints: Arc::new(JsonFileCheckpointStore::new(args.checkpoint_dir())),
            lease: storage.lease,
            provider: Arc::new(HeuristicProvider),
            capabilities: Arc::new(CapabilityRegistry::new()),
            memory,
            consensus: Arc::new(ConsensusEngine::new(config.consensus.clone())),
            observation: Arc::new(SyntheticObservationSource::new()),
            notifier: Arc::new(TracingNotifier),
            audit: Arc::new(NoAuditLog),
            default_actuator: Arc::new(PaperActuator::new()),
        };
        AgentLifecycleManager::new(services, config.clone())
    }

    #[tokio::test]
    async fn test_file_storage_restores_trading_agents_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let args = run_args(dir.path(), &["--agent", "alpha:BTC:1000"]);
        let config = FleetConfig::default();
        let alpha = AgentId::new("alpha");

        let storage = Storage::open(&args, config.lifecycle.lease_ttl);
        register_agent(storage.agents.as_ref(), &args.agents[0], 300)
            .await
            .unwrap();
        let first = manager(storage, &args, &config);
        first
            .start(&alpha, "BTC", 1_000.0, Arc::new(PaperActuator::new()))
            .await
            .unwrap();
        let report = first.shutdown(Duration::from_secs(5)).await;
        assert_eq!(report.stopped, vec![alpha.clone()]);

        let second = manager(Storage::open(&args, config.lifecycle.lease_ttl), &args, &config);
        let restored = second.restore_all().await.unwrap();
        assert_eq!(restored.started, vec![alpha.clone()]);
        let status = second.status();
        assert_eq!(status[0].1.state.target, "BTC");
        assert_eq!(status[0].1.state.initial_budget, 1_000.0);
        second.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn test_ephemeral_storage_forgets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let args = run_args(dir.path(), &["--ephemeral", "--agent", "alpha:BTC:1000"]);
        let config = FleetConfig::default();

        let storage = Storage::open(&args, config.lifecycle.lease_ttl);
        register_agent(storage.agents.as_ref(), &args.agents[0], 300)
            .await
            .unwrap();
        assert!(storage.agents.get(&AgentId::new("alpha")).await.unwrap().is_some());
        assert!(!dir.path().join("agents").exists());

        let reopened = Storage::open(&args, config.lifecycle.lease_ttl);
        assert!(reopened.states.list_trading().await.unwrap().is_empty());
        assert!(reopened.agents.get(&AgentId::new("alpha")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_agent_keeps_learned_weights() {
        let dir = tempfile::tempdir().unwrap();
        let args = run_args(dir.path(), &["--agent", "alpha:BTC:1000:contrarian"]);
        let storage = Storage::open(&args, Duration::from_secs(30));
        let id = AgentId::new("alpha");

        let mut stored = AgentConfig::new("alpha", "cli", fleet_domain::Archetype::Balanced);
        stored.signal_weights = fleet_domain::Archetype::Aggressive.default_weights();
        storage.agents.save(&stored).await.unwrap();

        register_agent(storage.agents.as_ref(), &args.agents[0], 120)
            .await
            .unwrap();

        let config = storage.agents.get(&id).await.unwrap().unwrap();
        assert_eq!(config.archetype, fleet_domain::Archetype::Contrarian);
        assert_eq!(config.decision_interval_secs, 120);
        assert_eq!(
            config.signal_weights,
            fleet_domain::Archetype::Aggressive.default_weights()
        );
        assert_eq!(config.created_at, stored.created_at);
    }
}
