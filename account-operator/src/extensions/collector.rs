use std::sync::Arc;

use tracing::debug;

use crate::api::{Account, Extension};
use crate::hierarchy::{HierarchyError, HierarchyResolver, IsolationUnit};
use crate::subroutine::ReconcileContext;

/// Gathers the Extensions an account inherits from its ancestors
pub struct ExtensionCollector {
    resolver: Arc<HierarchyResolver>,
}

impl ExtensionCollector {
    pub fn new(resolver: Arc<HierarchyResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<HierarchyResolver> {
        &self.resolver
    }

    /// Extensions declared by every ancestor owning `unit`, oldest ancestor
    /// first. Each ancestor contributes only its own declarations.
    pub async fn collect_extensions(&self, unit: &IsolationUnit) -> Result<Vec<Extension>, HierarchyError> {
        let ancestors = self.resolver.ancestors(unit).await?;
        let extensions: Vec<Extension> = ancestors
            .iter()
            .rev()
            .flat_map(|parent| parent.account.spec.extensions.iter().cloned())
            .collect();
        debug!(%unit, ancestors = ancestors.len(), extensions = extensions.len(), "Collected inherited extensions");
        Ok(extensions)
    }

    /// Inherited Extensions followed by the account's own
    pub async fn extensions_for(
        &self,
        account: &Account,
        ctx: &ReconcileContext,
    ) -> Result<Vec<Extension>, HierarchyError> {
        let unit = IsolationUnit::of_account(account, ctx.cluster.as_ref())?;
        let mut extensions = self.collect_extensions(&unit).await?;
        extensions.extend(account.spec.extensions.iter().cloned());
        Ok(extensions)
    }
}
