use anyhow::Context;
use automation_catalog::config::cli::{Cli, Command};
use automation_catalog::core::{BundleOptions, Repository};
use automation_catalog::utils::logger::{self, LogFormat};
use automation_catalog::utils::validation::Validate;
use automation_catalog::{CatalogEngine, CatalogError, LocalStorage};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.engine.verbose);

    tracing::info!("Starting automation-catalog CLI");
    let config = cli.engine_config().context("loading configuration")?;
    if config.verbose {
        tracing::debug!("Engine config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(e);
    }

    let engine = CatalogEngine::connect(&config)
        .await
        .context("initializing the catalog engine")?;

    let outcome = run(&engine, cli.command).await;
    engine.shutdown().await;

    match outcome {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

async fn run(engine: &CatalogEngine<LocalStorage>, command: Command) -> Result<String, CatalogError> {
    match command {
        Command::Services => {
            let services = engine.list_services().await?;
            tracing::info!("📋 {} services", services.len());
            Ok(serde_json::to_string_pretty(&services)?)
        }
        Command::Service { name } => {
            let service = engine.get_service(&name).await?;
            Ok(serde_json::to_string_pretty(&service)?)
        }
        Command::Resolve { solution } => {
            let boms = engine.resolve_solution_boms(&solution).await?;
            Ok(serde_json::to_string_pretty(&boms)?)
        }
        Command::Plan {
            solution,
            architectures,
        } => {
            let plan = engine
                .plan_architectures(solution.as_deref(), &architectures)
                .await?;
            Ok(serde_json::to_string_pretty(&plan)?)
        }
        Command::Export {
            solution,
            flatten,
            base_path,
        } => {
            let options = BundleOptions { flatten, base_path };
            let path = engine.export_solution(&solution, &options).await?;
            Ok(format!("📁 Bundle saved to: {}", path))
        }
        Command::Sync => {
            engine.sync_now().await;
            let solutions = engine.solutions().list().await?.len();
            let architectures = engine.architectures().list().await?.len();
            let boms = engine.boms().list().await?.len();
            Ok(format!(
                "✅ Synchronized {} solutions, {} architectures, {} BOM modules",
                solutions, architectures, boms
            ))
        }
    }
}

fn fail(e: CatalogError) -> ! {
    tracing::error!("❌ {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}
