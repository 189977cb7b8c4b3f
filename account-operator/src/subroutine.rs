//! Uniform contract the external scheduler drives every component through

use async_trait::async_trait;
use error_common::{report_if_alertable, ErrorContext, ErrorSink, OperatorError, Outcome};
use kube::{Resource, ResourceExt};
use resource_store::ClusterContext;
use tracing::debug;

pub const EXTENSION_FINALIZER: &str = "account.core.platform-mesh.io/extension";
pub const RELATIONSHIP_FINALIZER: &str = "account.core.platform-mesh.io/fga";
pub const MODEL_FINALIZER: &str = "account.core.platform-mesh.io/model";

/// Per-call context handed in by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileContext {
    /// Logical cluster the object was read from; `None` in single-cluster mode
    pub cluster: Option<ClusterContext>,
}

impl ReconcileContext {
    pub fn single_cluster() -> Self {
        Self::default()
    }

    pub fn in_cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: Some(ClusterContext::new(cluster)),
        }
    }
}

/// One reconcile step over objects of type `T`.
///
/// `process` converges external state towards the object; `finalize` undoes
/// it before deletion. Both are idempotent and issue one attempt per call.
#[async_trait]
pub trait Subroutine<T: Send + Sync>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Finalizer tokens the scheduler keeps on the object while this step has
    /// external state to clean up
    fn finalizers(&self) -> Vec<&'static str>;

    async fn process(&self, object: &T, ctx: &ReconcileContext) -> Result<Outcome, OperatorError>;

    async fn finalize(&self, object: &T, ctx: &ReconcileContext) -> Result<Outcome, OperatorError>;
}

/// Identity of `object` for error reports
pub(crate) fn error_context<K>(object: &K, ctx: &ReconcileContext, subroutine: &str) -> ErrorContext
where
    K: Resource<DynamicType = ()>,
{
    let namespace = object.namespace();
    let context = ErrorContext::for_object(K::kind(&()), namespace.as_deref(), object.name_any())
        .with_subroutine(subroutine);
    match &ctx.cluster {
        Some(cluster) => context.with_cluster(cluster.as_str()),
        None => context,
    }
}

/// Convert a component failure into the scheduler-facing error
pub(crate) fn into_operator_error<K>(
    err: crate::error::Error,
    object: &K,
    ctx: &ReconcileContext,
    subroutine: &str,
) -> OperatorError
where
    K: Resource<DynamicType = ()>,
{
    OperatorError::from(err).with_context(error_context(object, ctx, subroutine))
}

/// Run every subroutine's `process` in order.
///
/// A requeue does not stop later steps; the first requeue is returned once
/// all have run. An error aborts and is forwarded to `sink` when alertable.
pub async fn process_all<T: Send + Sync>(
    subroutines: &[&dyn Subroutine<T>],
    object: &T,
    ctx: &ReconcileContext,
    sink: &dyn ErrorSink,
) -> Result<Outcome, OperatorError> {
    let mut outcome = Outcome::done();
    for subroutine in subroutines {
        match subroutine.process(object, ctx).await {
            Ok(result) => {
                if result.is_requeue() && !outcome.is_requeue() {
                    debug!(subroutine = subroutine.name(), "Requeue requested");
                    outcome = result;
                }
            }
            Err(err) => return Err(report_if_alertable(sink, err).await),
        }
    }
    Ok(outcome)
}

/// Run every subroutine's `finalize`, last registered first
pub async fn finalize_all<T: Send + Sync>(
    subroutines: &[&dyn Subroutine<T>],
    object: &T,
    ctx: &ReconcileContext,
    sink: &dyn ErrorSink,
) -> Result<Outcome, OperatorError> {
    let mut outcome = Outcome::done();
    for subroutine in subroutines.iter().rev() {
        match subroutine.finalize(object, ctx).await {
            Ok(result) => {
                if result.is_requeue() && !outcome.is_requeue() {
                    outcome = result;
                }
            }
            Err(err) => return Err(report_if_alertable(sink, err).await),
        }
    }
    Ok(outcome)
}
