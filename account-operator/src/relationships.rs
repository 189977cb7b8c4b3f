//! Relationship tuples mirroring the account tree in the authorization engine

use async_trait::async_trait;
use auth_zanzibar::{find_store, object_ref, AuthorizationEngineClient, TupleKey, WriteRequest, ZanzibarError};
use config_engine::AuthorizationConfig;
use error_common::{OperatorError, Outcome};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::{is_condition_true, Account, CONDITION_RELATIONSHIPS_READY};
use crate::error::Result;
use crate::hierarchy::{HierarchyError, HierarchyResolver, IsolationUnit, ParentLookup};
use crate::subroutine::{into_operator_error, ReconcileContext, Subroutine, RELATIONSHIP_FINALIZER};

pub struct RelationshipSynchronizer {
    resolver: Arc<HierarchyResolver>,
    engine: Arc<dyn AuthorizationEngineClient>,
    authorization: AuthorizationConfig,
}

impl RelationshipSynchronizer {
    pub fn new(
        resolver: Arc<HierarchyResolver>,
        engine: Arc<dyn AuthorizationEngineClient>,
        authorization: AuthorizationConfig,
    ) -> Self {
        Self {
            resolver,
            engine,
            authorization,
        }
    }

    /// Unit holding first-level accounts
    fn is_root(&self, unit: &IsolationUnit) -> bool {
        let config = self.resolver.config();
        match unit {
            IsolationUnit::Namespace(namespace) => *namespace == config.root_namespace,
            IsolationUnit::Cluster(cluster) => cluster.as_str() == config.multicluster.root_cluster,
        }
    }

    /// Store of the first-level account the given account descends from
    pub async fn store_id_for(&self, account: &Account, ctx: &ReconcileContext) -> Result<String> {
        let unit = IsolationUnit::of_account(account, ctx.cluster.as_ref())?;
        let first_level = if self.is_root(&unit) {
            account.name_any()
        } else {
            let mut found = None;
            for parent in self.resolver.ancestors(&unit).await? {
                if self.is_root(&parent.unit()?) {
                    found = Some(parent.account.name_any());
                    break;
                }
            }
            found.ok_or_else(|| HierarchyError::MissingParent {
                unit: unit.to_string(),
                parent: format!("first-level account in {}", self.resolver.config().root_namespace),
            })?
        };

        let store = find_store(self.engine.as_ref(), &first_level)
            .await?
            .ok_or_else(|| ZanzibarError::StoreNotFound(first_level.clone()))?;
        Ok(store.id)
    }

    /// Tuples describing the account's place in the tree
    pub async fn tuples(&self, account: &Account, ctx: &ReconcileContext) -> Result<Vec<TupleKey>> {
        let config = &self.authorization;
        let object = object_ref(&config.object_type, &account.name_any());
        let unit = IsolationUnit::of_account(account, ctx.cluster.as_ref())?;
        let mut tuples = Vec::new();

        if !self.is_root(&unit) {
            match self.resolver.resolve_parent(&unit).await? {
                ParentLookup::Parent(parent) => tuples.push(TupleKey::new(
                    object.clone(),
                    config.parent_relation.clone(),
                    object_ref(&config.object_type, &parent.account.name_any()),
                )),
                ParentLookup::NoParent => debug!(%unit, "Account has no parent"),
            }
        }
        if let Some(creator) = account.creator() {
            tuples.push(TupleKey::new(
                object,
                config.owner_relation.clone(),
                object_ref(&config.user_type, creator),
            ));
        }
        Ok(tuples)
    }

    #[instrument(skip_all, fields(account = %account.name_any()))]
    async fn write_tuples(&self, account: &Account, ctx: &ReconcileContext) -> Result<Outcome> {
        if is_condition_true(account.conditions(), CONDITION_RELATIONSHIPS_READY, account.metadata.generation) {
            debug!("Relationships already written for this generation");
            return Ok(Outcome::done());
        }

        let tuples = self.tuples(account, ctx).await?;
        if tuples.is_empty() {
            return Ok(Outcome::done());
        }
        let store_id = self.store_id_for(account, ctx).await?;
        for tuple in tuples {
            match self.engine.write(&store_id, WriteRequest::write(tuple.clone())).await {
                Ok(()) => info!(store_id = %store_id, %tuple, "Tuple written"),
                Err(e) if e.is_duplicate() => debug!(store_id = %store_id, %tuple, "Tuple already present"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Outcome::done())
    }

    #[instrument(skip_all, fields(account = %account.name_any()))]
    async fn delete_tuples(&self, account: &Account, ctx: &ReconcileContext) -> Result<Outcome> {
        let tuples = self.tuples(account, ctx).await?;
        if tuples.is_empty() {
            return Ok(Outcome::done());
        }
        let store_id = self.store_id_for(account, ctx).await?;
        for tuple in tuples {
            match self.engine.write(&store_id, WriteRequest::delete(tuple.clone())).await {
                Ok(()) => info!(store_id = %store_id, %tuple, "Tuple deleted"),
                Err(e) if e.is_duplicate() => warn!(store_id = %store_id, %tuple, "Tuple already deleted"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Outcome::done())
    }
}

#[async_trait]
impl Subroutine<Account> for RelationshipSynchronizer {
    fn name(&self) -> &'static str {
        "RelationshipSynchronizer"
    }

    fn finalizers(&self) -> Vec<&'static str> {
        vec![RELATIONSHIP_FINALIZER]
    }

    async fn process(&self, account: &Account, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.write_tuples(account, ctx)
            .await
            .map_err(|e| into_operator_error(e, account, ctx, self.name()))
    }

    async fn finalize(&self, account: &Account, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.delete_tuples(account, ctx)
            .await
            .map_err(|e| into_operator_error(e, account, ctx, self.name()))
    }
}
