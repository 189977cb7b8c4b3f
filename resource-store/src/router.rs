use std::sync::Arc;

use crate::error::Result;
use crate::models::ClusterContext;
use crate::store::ResourceStore;

/// Picks the store view for a cluster context.
///
/// `None` is the default view: the only cluster in single-cluster mode, the
/// root, context-less view in multi-cluster mode.
pub trait ClusterRouter: Send + Sync {
    fn store_for(&self, cluster: Option<&ClusterContext>) -> Result<Arc<dyn ResourceStore>>;
}

/// Router for single-cluster deployments: every context maps to one store
pub struct SingleClusterRouter {
    store: Arc<dyn ResourceStore>,
}

impl SingleClusterRouter {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }
}

impl ClusterRouter for SingleClusterRouter {
    fn store_for(&self, _cluster: Option<&ClusterContext>) -> Result<Arc<dyn ResourceStore>> {
        Ok(self.store.clone())
    }
}
