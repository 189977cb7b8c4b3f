//! Compiles a Store's model fragments into one authorization model

use async_trait::async_trait;
use auth_zanzibar::{compile_modules, find_store, AuthorizationEngineClient, ModuleFile};
use error_common::{OperatorError, Outcome};
use kube::ResourceExt;
use resource_store::{
    from_dynamic, get_opt, list_typed, ClusterRouter, ListOptions, ObjectKey, ResourceStore, StoreError,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::api::{self, gvk_of, is_condition_true, Store, CONDITION_READY};
use crate::error::Result;
use crate::subroutine::{into_operator_error, ReconcileContext, Subroutine, MODEL_FINALIZER};

pub struct ModelCompiler {
    router: Arc<dyn ClusterRouter>,
    engine: Arc<dyn AuthorizationEngineClient>,
}

impl ModelCompiler {
    pub fn new(router: Arc<dyn ClusterRouter>, engine: Arc<dyn AuthorizationEngineClient>) -> Self {
        Self { router, engine }
    }

    #[instrument(skip_all, fields(store = %store.name_any()))]
    async fn publish(&self, store: &Store, ctx: &ReconcileContext) -> Result<Outcome> {
        let objects = self.router.store_for(ctx.cluster.as_ref())?;
        let namespace = store.namespace();

        let core_ref = &store.spec.core_module;
        let core_key = ObjectKey::new(
            gvk_of::<api::AuthorizationModel>(),
            core_ref.namespace_or(namespace.as_deref()),
            core_ref.name.clone(),
        );
        let Some(core) = get_opt(objects.as_ref(), &core_key).await? else {
            info!(core = %core_key, "Core module not found");
            return Ok(Outcome::requeue());
        };
        let core: api::AuthorizationModel = from_dynamic(&core)?;
        let core_conditions = core.status.map(|s| s.conditions).unwrap_or_default();
        if !is_condition_true(&core_conditions, CONDITION_READY, None) {
            info!(core = %core_key, "Core module not ready");
            return Ok(Outcome::requeue());
        }

        let store_key = ObjectKey::new(gvk_of::<Store>(), namespace.as_deref(), store.name_any());
        let recorded = store
            .status
            .as_ref()
            .and_then(|s| s.store_id.clone())
            .filter(|id| !id.is_empty());
        let store_id = match recorded {
            Some(id) => id,
            None => {
                let id = match find_store(self.engine.as_ref(), &store.name_any()).await? {
                    Some(existing) => existing.id,
                    None => self.engine.create_store(&store.name_any()).await?.id,
                };
                record_status(objects.as_ref(), &store_key, "storeId", &id).await?;
                info!(store_id = %id, "Store id recorded");
                id
            }
        };

        let files = self.fragments(objects.as_ref(), store).await?;
        let model = compile_modules(&files)?;
        let model_id = self.engine.write_authorization_model(&store_id, &model).await?;
        record_status(objects.as_ref(), &store_key, "authorizationModelId", &model_id).await?;
        info!(store_id = %store_id, model_id = %model_id, fragments = files.len(), "Authorization model published");
        Ok(Outcome::done())
    }

    /// One module file per fragment referencing `store`, sorted by namespace and name
    async fn fragments(&self, objects: &dyn ResourceStore, store: &Store) -> Result<Vec<ModuleFile>> {
        let store_namespace = store.namespace();
        let store_name = store.name_any();
        let mut fragments: Vec<api::AuthorizationModel> =
            list_typed(objects, &gvk_of::<api::AuthorizationModel>(), &ListOptions::default())
                .await?
                .into_iter()
                .filter(|fragment: &api::AuthorizationModel| {
                    let reference = &fragment.spec.store_ref;
                    let fragment_namespace = fragment.namespace();
                    reference.name == store_name
                        && reference.namespace_or(fragment_namespace.as_deref()) == store_namespace.as_deref()
                })
                .collect();
        fragments.sort_by_key(|f| (f.namespace().unwrap_or_default(), f.name_any()));

        debug!(count = fragments.len(), "Collected model fragments");
        Ok(fragments
            .iter()
            .map(|f| {
                ModuleFile::new(
                    format!("{}/{}", f.namespace().unwrap_or_default(), f.name_any()),
                    f.spec.model.clone(),
                )
            })
            .collect())
    }
}

/// Set one status field through the status subresource
async fn record_status(objects: &dyn ResourceStore, key: &ObjectKey, field: &str, value: &str) -> Result<()> {
    let mut object = objects.get(key).await?;
    if object.data.get("status").and_then(|s| s.get(field)) == Some(&json!(value)) {
        return Ok(());
    }
    let data = object
        .data
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidObject(format!("{key} is not an object")))?;
    let status = data.entry("status").or_insert_with(|| json!({}));
    if !status.is_object() {
        *status = json!({});
    }
    if let Some(fields) = status.as_object_mut() {
        fields.insert(field.to_string(), json!(value));
    }
    objects.update_status(&key.kind, &object).await?;
    Ok(())
}

#[async_trait]
impl Subroutine<Store> for ModelCompiler {
    fn name(&self) -> &'static str {
        "ModelCompiler"
    }

    fn finalizers(&self) -> Vec<&'static str> {
        vec![MODEL_FINALIZER]
    }

    async fn process(&self, store: &Store, ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        self.publish(store, ctx)
            .await
            .map_err(|e| into_operator_error(e, store, ctx, self.name()))
    }

    /// Models stay in the engine; nothing to undo
    async fn finalize(&self, _store: &Store, _ctx: &ReconcileContext) -> std::result::Result<Outcome, OperatorError> {
        Ok(Outcome::done())
    }
}
