use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

use voiceup::{
    build_classifier, evaluate_records, seed_database, server, AnalysisService, AppConfig,
    ClassifierBackendType, ConfigManager, MessageRecord, VoiceupDatabase,
};

#[derive(Parser, Debug)]
#[command(
    name = "voiceup",
    version,
    about = "Customer support transcript compliance and emotion analysis"
)]
struct Cli {
    #[arg(long, global = true, help = "Path to config.toml (defaults to the XDG config dir)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "SQLite database file")]
    database: Option<PathBuf>,
    #[arg(long, global = true, help = "Use the static classifier instead of the hosted model")]
    offline: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// HTTP APIサーバーを起動
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// デモ会話を投入して分析
    Seed {
        #[arg(long, default_value_t = false, help = "Delete existing conversations first")]
        reset: bool,
    },
    /// トランスクリプトJSONのコンプライアンスを評価（モデル不要）
    Evaluate { file: PathBuf },
    /// 設定ファイルの場所と内容を表示
    Config {
        #[arg(long, default_value_t = false, help = "Write the default config if none exists")]
        init: bool,
    },
}

/// `[...]`と`{"messages": [...]}`の両方を受け付ける
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Records(Vec<MessageRecord>),
    Conversation { messages: Vec<MessageRecord> },
}

impl TranscriptFile {
    fn into_records(self) -> Vec<MessageRecord> {
        match self {
            TranscriptFile::Records(records) => records,
            TranscriptFile::Conversation { messages } => messages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = config_manager.load_config()?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    // tokio-consoleの初期化（プロファイリング用）
    #[cfg(feature = "debug-tokio")]
    console_subscriber::init();

    #[cfg(not(feature = "debug-tokio"))]
    let _log_guard = voiceup::init_logging(&config.log)?;

    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("🎬 Starting VoiceUp API server");
            let service = build_service(&config)?;
            match service.check_classifier().await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("⚠️ Emotion classifier returned no labels"),
                Err(e) => tracing::warn!("⚠️ Emotion classifier is not reachable yet: {}", e),
            }
            server::serve(service, &config.server).await?;
        }
        Commands::Seed { reset } => {
            let service = build_service(&config)?;
            let ids = seed_database(&service, reset).await?;
            println!("Seeded {} conversations: {:?}", ids.len(), ids);
        }
        Commands::Evaluate { file } => {
            let summary = evaluate_file(&file)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Config { init } => {
            if init {
                if config_manager.config_exists() {
                    tracing::warn!(
                        "Config file already exists: {}",
                        config_manager.get_config_file_path().display()
                    );
                } else {
                    config_manager.save_config(&AppConfig::default())?;
                }
            }
            println!("# {}", config_manager.get_config_file_path().display());
            println!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
    }

    Ok(())
}

/// コマンドライン引数で設定を上書き
fn apply_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(path) = &cli.database {
        config.database.path = Some(path.clone());
    }
    if cli.offline {
        config.classifier.backend = ClassifierBackendType::Static;
    }
    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
}

fn build_service(config: &AppConfig) -> Result<AnalysisService> {
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }

    let database = VoiceupDatabase::new(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    tracing::info!("🗄️ Database: {}", db_path.display());

    let classifier = build_classifier(&config.classifier)?;
    Ok(AnalysisService::new(
        database,
        classifier,
        config.analytics.compliance_threshold,
    ))
}

fn evaluate_file(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    let transcript: TranscriptFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transcript: {}", path.display()))?;

    let summary = evaluate_records(&transcript.into_records())?;
    Ok(json!({
        "compliance_summary": summary.rules,
        "overall_compliance_score": summary.score,
    }))
}
