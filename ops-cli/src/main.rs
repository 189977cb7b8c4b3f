use account_operator::HierarchyResolver;
use clap::Parser;
use colored::*;
use config_engine::OperatorConfig;
use logger_redacted::init_logging;
use ops_cli::{account_crd_yaml, ancestors, compile_model, inherited_extensions, render_files, Cli, Command};
use resource_store::KubeClusterRouter;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = OperatorConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.log_level = "debug".to_string();
    }
    init_logging(&config.logging)?;
    debug!(command = ?cli.command, "Starting accountctl");

    match cli.command {
        Command::CompileModel { files } => println!("{}", compile_model(&files)?),
        Command::Render {
            account,
            extension,
            cluster_scoped,
        } => print!("{}", render_files(&account, &extension, cluster_scoped).await?),
        Command::Crd { cluster_scoped } => {
            print!("{}", account_crd_yaml(cluster_scoped || config.hierarchy.multicluster.enabled)?)
        }
        Command::Ancestors { namespace } => {
            let resolver = resolver(&config).await?;
            let chain = ancestors(&resolver, &namespace).await?;
            if chain.is_empty() {
                println!("{}", format!("{namespace} has no parent account").yellow());
            }
            for (depth, account) in chain.iter().enumerate() {
                println!("{:>3}  {}", depth + 1, account.bright_cyan());
            }
        }
        Command::Extensions { namespace } => {
            let resolver = Arc::new(resolver(&config).await?);
            for line in inherited_extensions(resolver, &namespace).await? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn resolver(config: &OperatorConfig) -> anyhow::Result<HierarchyResolver> {
    let router = KubeClusterRouter::infer().await?;
    Ok(HierarchyResolver::new(Arc::new(router), config.hierarchy.clone()))
}
