use async_trait::async_trait;
use error_common::{OperatorError, Outcome};
use kube::core::DynamicObject;
use kube::ResourceExt;
use resource_store::{get_opt, ClusterRouter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::api::{find_condition, Account, Condition, ConditionStatus};
use crate::error::Result;
use crate::extensions::{resolve_target, ExtensionCollector, TargetIdentity, TemplateRenderer};
use crate::hierarchy::HierarchyResolver;
use crate::subroutine::{into_operator_error, ReconcileContext, Subroutine};

/// Holds an account back until every gated Extension object reports ready
pub struct ExtensionReadinessGate {
    router: Arc<dyn ClusterRouter>,
    collector: ExtensionCollector,
    renderer: TemplateRenderer,
    poll_interval: Option<Duration>,
}

impl ExtensionReadinessGate {
    pub fn new(router: Arc<dyn ClusterRouter>, resolver: Arc<HierarchyResolver>) -> Self {
        Self {
            router,
            collector: ExtensionCollector::new(resolver),
            renderer: TemplateRenderer::new(),
            poll_interval: None,
        }
    }

    /// Ask to be called again after `interval` while a target is pending
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    fn pending(&self) -> Outcome {
        match self.poll_interval {
            Some(interval) => Outcome::requeue_after(interval),
            None => Outcome::requeue(),
        }
    }

    #[instrument(skip_all, fields(account = %account.name_any()))]
    async fn check(&self, account: &Account, ctx: &ReconcileContext) -> Result<Outcome> {
        let store = self.router.store_for(ctx.cluster.as_ref())?;
        let extensions = self.collector.extensions_for(account, ctx).await?;
        let context = TemplateRenderer::context(account)?;

        for extension in &extensions {
            let Some(condition_type) = extension.ready_condition_type.as_deref() else {
                continue;
            };
            let target = match resolve_target(&self.renderer, store.as_ref(), extension, account, &context).await? {
                TargetIdentity::Resolved(target) => target,
                TargetIdentity::AwaitingNamespace => return Ok(self.pending()),
            };

            let Some(object) = get_opt(store.as_ref(), &target.key).await? else {
                info!(object = %target.key, "Extension not created yet");
                return Ok(self.pending());
            };
            if reports_not_ready(&object, condition_type) {
                info!(object = %target.key, condition = condition_type, "Extension not ready");
                return Ok(self.pending());
            }
            debug!(object = %target.key, "Extension ready");
        }
        Ok(Outcome::done())
    }
}

/// The object declares `condition_type` and it is explicitly `False`
fn reports_not_ready(object: &DynamicObject, condition_type: &str) -> bool {
    let conditions: Vec<Condition> = object
        .data
        .pointer("/status/conditions")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();
    find_condition(&conditions, condition_type)
        .map(|c| c.status == ConditionStatus::False)
        .unwrap_or(false)
}

#[async_trait]
impl Subroutine<Account> for ExtensionReadinessGate {
    fn name(&self) -> &'static str {
        "ExtensionReadinessGate"
    }

    fn finalizers(&self) -> Vec<&'static str> {
        vec![]
    }

    async fn process(&self, account: &Account, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.check(account, ctx)
            .await
            .map_err(|e| into_operator_error(e, account, ctx, self.name()))
    }

    async fn finalize(&self, _account: &Account, _ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        Ok(Outcome::done())
    }
}
