use async_trait::async_trait;
use error_common::{OperatorError, Outcome};
use kube::ResourceExt;
use resource_store::{create_or_update, ClusterRouter, OperationResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::api::{Account, Extension};
use crate::error::{Error, Result};
use crate::extensions::{resolve_target, ExtensionCollector, ExtensionTarget, TargetIdentity, TemplateRenderer};
use crate::hierarchy::{HierarchyError, HierarchyResolver};
use crate::subroutine::{into_operator_error, ReconcileContext, Subroutine, EXTENSION_FINALIZER};

/// Creates, updates and deletes the objects an account's Extensions describe
pub struct ExtensionReconciler {
    router: Arc<dyn ClusterRouter>,
    collector: ExtensionCollector,
    renderer: TemplateRenderer,
}

impl ExtensionReconciler {
    pub fn new(router: Arc<dyn ClusterRouter>, resolver: Arc<HierarchyResolver>) -> Self {
        Self {
            router,
            collector: ExtensionCollector::new(resolver),
            renderer: TemplateRenderer::new(),
        }
    }

    #[instrument(skip_all, fields(account = %account.name_any()))]
    async fn converge(&self, account: &Account, ctx: &ReconcileContext) -> Result<Outcome> {
        let store = self.router.store_for(ctx.cluster.as_ref())?;
        let extensions = self.collector.extensions_for(account, ctx).await?;
        let context = TemplateRenderer::context(account)?;
        let mut ownership_verified = false;

        for extension in &extensions {
            let target = match resolve_target(&self.renderer, store.as_ref(), extension, account, &context).await? {
                TargetIdentity::Resolved(target) => target,
                TargetIdentity::AwaitingNamespace => {
                    info!(kind = %extension.kind, "Account namespace not resolved yet");
                    return Ok(Outcome::requeue());
                }
            };

            if let (Some(namespace), false) = (target.key.namespace.as_deref(), ownership_verified) {
                match self
                    .collector
                    .resolver()
                    .verify_ownership(account, namespace, ctx.cluster.as_ref())
                    .await
                {
                    Ok(()) => ownership_verified = true,
                    Err(HierarchyError::Store(e)) if e.is_not_found() => {
                        info!(namespace, "Account namespace not created yet");
                        return Ok(Outcome::requeue());
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let result = create_or_update(store.as_ref(), &target.key, |object| {
                self.apply(extension, &target, &context, object)
            })
            .await?;
            match result {
                OperationResult::Unchanged => debug!(object = %target.key, "Extension up to date"),
                _ => info!(object = %target.key, ?result, "Extension applied"),
            }
        }
        Ok(Outcome::done())
    }

    fn apply(
        &self,
        extension: &Extension,
        target: &ExtensionTarget,
        context: &Value,
        object: &mut kube::core::DynamicObject,
    ) -> Result<()> {
        target.apply_metadata(object);
        if let Some(template) = &extension.spec_go_template {
            self.renderer
                .render_extension_spec(template, context, &["spec".to_string()], &mut object.data)?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(account = %account.name_any()))]
    async fn remove(&self, account: &Account, ctx: &ReconcileContext) -> Result<Outcome> {
        let store = self.router.store_for(ctx.cluster.as_ref())?;
        let extensions = self.collector.extensions_for(account, ctx).await?;
        let context = TemplateRenderer::context(account)?;

        for extension in &extensions {
            let target = match resolve_target(&self.renderer, store.as_ref(), extension, account, &context).await? {
                TargetIdentity::Resolved(target) => target,
                TargetIdentity::AwaitingNamespace => {
                    debug!(kind = %extension.kind, "No namespace resolved, nothing to delete");
                    continue;
                }
            };
            match store.delete(&target.key).await {
                Ok(()) => info!(object = %target.key, "Extension deleted"),
                Err(e) if e.is_not_found() => debug!(object = %target.key, "Extension already gone"),
                Err(e) => return Err(Error::from(e)),
            }
        }
        Ok(Outcome::done())
    }
}

#[async_trait]
impl Subroutine<Account> for ExtensionReconciler {
    fn name(&self) -> &'static str {
        "ExtensionReconciler"
    }

    fn finalizers(&self) -> Vec<&'static str> {
        vec![EXTENSION_FINALIZER]
    }

    async fn process(&self, account: &Account, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.converge(account, ctx)
            .await
            .map_err(|e| into_operator_error(e, account, ctx, self.name()))
    }

    async fn finalize(&self, account: &Account, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.remove(account, ctx)
            .await
            .map_err(|e| into_operator_error(e, account, ctx, self.name()))
    }
}
