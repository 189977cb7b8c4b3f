//! Operations CLI for the account operator
//!
//! `accountctl` runs individual operator steps offline or against the
//! configured cluster, for debugging hierarchies, extension templates and
//! authorization models:
//!
//! ```bash
//! # Compile model fragments and print the resulting JSON model
//! accountctl compile-model core.fga billing.fga
//!
//! # Render an Extension against an Account manifest
//! accountctl render --account team-a.yaml --extension widget.yaml
//!
//! # Walk the hierarchy above a namespace
//! accountctl ancestors --namespace team-a-ns
//!
//! # Print the Account CRD (cluster-scoped for multi-cluster setups)
//! accountctl crd --cluster-scoped
//!
//! # List the Extensions inherited into a namespace
//! accountctl extensions --namespace team-a-ns
//! ```

use account_operator::extensions::{resolve_target, TargetIdentity};
use account_operator::{Account, Extension, ExtensionCollector, HierarchyResolver, IsolationUnit, TemplateRenderer};
use anyhow::{bail, Context};
use auth_zanzibar::{compile_modules, ModuleFile};
use clap::{Parser, Subcommand};
use kube::ResourceExt;
use resource_store::{gvk_from_api_version, DynamicObject, InMemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "accountctl")]
#[command(about = "Inspect and debug hierarchical accounts", version)]
pub struct Cli {
    /// Operator configuration file
    #[arg(short, long, env = "ACCOUNT_OPERATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile model module files into one authorization model
    CompileModel {
        /// Module files, compiled as one set
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Render an Extension for an Account
    Render {
        /// Account manifest (YAML)
        #[arg(long)]
        account: PathBuf,

        /// Extension entry (YAML)
        #[arg(long)]
        extension: PathBuf,

        /// Treat the target kind as cluster-scoped
        #[arg(long)]
        cluster_scoped: bool,
    },

    /// Print the Account CRD manifest
    Crd {
        /// Cluster-scoped variant for multi-cluster deployments
        #[arg(long)]
        cluster_scoped: bool,
    },

    /// Print the accounts above a namespace, nearest first
    Ancestors {
        #[arg(long)]
        namespace: String,
    },

    /// Print the Extensions inherited into a namespace, oldest ancestor first
    Extensions {
        #[arg(long)]
        namespace: String,
    },
}

/// Compile `files` and return the model as pretty JSON
pub fn compile_model(files: &[PathBuf]) -> anyhow::Result<String> {
    let modules = files
        .iter()
        .map(|path| {
            let contents =
                std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(ModuleFile::new(path.display().to_string(), contents))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let model = compile_modules(&modules)?;
    Ok(serde_json::to_string_pretty(&model)?)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Render the object `extension` produces for `account`
pub async fn render_extension(
    account: &Account,
    extension: &Extension,
    cluster_scoped: bool,
) -> anyhow::Result<DynamicObject> {
    let kind = gvk_from_api_version(&extension.api_version, &extension.kind);
    let scope = InMemoryStore::new();
    scope.register_kind(&kind, !cluster_scoped);

    let renderer = TemplateRenderer::new();
    let context = TemplateRenderer::context(account)?;
    let target = match resolve_target(&renderer, &scope, extension, account, &context).await? {
        TargetIdentity::Resolved(target) => target,
        TargetIdentity::AwaitingNamespace => {
            bail!("account {} has no status.namespace for a namespaced target", account.name_any())
        }
    };

    let mut object = target.key.new_object();
    target.apply_metadata(&mut object);
    if let Some(template) = &extension.spec_go_template {
        renderer.render_extension_spec(template, &context, &["spec".to_string()], &mut object.data)?;
    }
    Ok(object)
}

pub async fn render_files(account: &Path, extension: &Path, cluster_scoped: bool) -> anyhow::Result<String> {
    let account: Account = read_yaml(account)?;
    let extension: Extension = read_yaml(extension)?;
    let object = render_extension(&account, &extension, cluster_scoped).await?;
    Ok(serde_yaml::to_string(&object)?)
}

pub fn account_crd_yaml(cluster_scoped: bool) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(&account_operator::account_crd(cluster_scoped))?)
}

/// One line per ancestor: `<namespace>/<name>`
pub async fn ancestors(resolver: &HierarchyResolver, namespace: &str) -> anyhow::Result<Vec<String>> {
    let chain = resolver
        .ancestors(&IsolationUnit::Namespace(namespace.to_string()))
        .await?;
    Ok(chain
        .iter()
        .map(|parent| {
            format!(
                "{}/{}",
                parent.account.namespace().unwrap_or_default(),
                parent.account.name_any()
            )
        })
        .collect())
}

/// One line per inherited Extension: `<apiVersion> <kind>`
pub async fn inherited_extensions(resolver: Arc<HierarchyResolver>, namespace: &str) -> anyhow::Result<Vec<String>> {
    let collector = ExtensionCollector::new(resolver);
    let extensions = collector
        .collect_extensions(&IsolationUnit::Namespace(namespace.to_string()))
        .await?;
    Ok(extensions
        .iter()
        .map(|e| format!("{} {}", e.api_version, e.kind))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "accountctl",
            "render",
            "--account",
            "a.yaml",
            "--extension",
            "e.yaml",
            "--cluster-scoped",
        ])
        .unwrap();
        match cli.command {
            Command::Render { cluster_scoped, .. } => assert!(cluster_scoped),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_crd_yaml_scope() {
        let crd: serde_yaml::Value = serde_yaml::from_str(&account_crd_yaml(true).unwrap()).unwrap();
        assert_eq!(crd["spec"]["scope"], serde_yaml::Value::from("Cluster"));
    }

    #[test]
    fn test_compile_model_requires_files() {
        assert!(Cli::try_parse_from(["accountctl", "compile-model"]).is_err());
    }
}
