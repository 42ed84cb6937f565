//! Typed resource and data source traits and their JSON adapters.

use super::owner::Owner;
use crate::errors::ProviderResult;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A managed GitHub object.
///
/// `Model` is the state shape; every schema attribute is a field, unset
/// values are `None`.
#[async_trait]
pub trait Resource: Send + Sync {
    /// State model.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Type name, e.g. `github_repository`.
    const TYPE_NAME: &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Creates the object and returns the resulting state.
    async fn create(&self, owner: &Owner, plan: Self::Model) -> ProviderResult<Self::Model>;

    /// Refreshes state. `None` means the object is gone.
    async fn read(&self, owner: &Owner, state: Self::Model) -> ProviderResult<Option<Self::Model>>;

    /// Applies changes and returns the resulting state.
    async fn update(
        &self,
        owner: &Owner,
        prior: Self::Model,
        plan: Self::Model,
    ) -> ProviderResult<Self::Model>;

    /// Deletes the object.
    async fn delete(&self, owner: &Owner, state: Self::Model) -> ProviderResult<()>;

    /// Turns an import ID into a partial state that `read` can complete.
    async fn import(&self, _owner: &Owner, id: &str) -> ProviderResult<Self::Model> {
        Ok(serde_json::from_value(serde_json::json!({ "id": id }))?)
    }
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// State model.
    type Model: Serialize + DeserializeOwned + Default + Send + Sync;

    /// Type name, e.g. `github_repository`.
    const TYPE_NAME: &'static str;

    /// Attribute schema.
    fn schema(&self) -> Schema;

    /// Reads the object described by `config`.
    async fn read(&self, owner: &Owner, config: Self::Model) -> ProviderResult<Self::Model>;
}

/// Object-safe view of a [`Resource`] over JSON state.
#[async_trait]
pub trait DynResource: Send + Sync {
    /// Type name.
    fn type_name(&self) -> &'static str;
    /// Attribute schema.
    fn resource_schema(&self) -> Schema;
    /// Create over JSON.
    async fn create_value(&self, owner: &Owner, plan: Value) -> ProviderResult<Value>;
    /// Read over JSON.
    async fn read_value(&self, owner: &Owner, state: Value) -> ProviderResult<Option<Value>>;
    /// Update over JSON.
    async fn update_value(&self, owner: &Owner, prior: Value, plan: Value) -> ProviderResult<Value>;
    /// Delete over JSON.
    async fn delete_value(&self, owner: &Owner, state: Value) -> ProviderResult<()>;
    /// Import over JSON.
    async fn import_value(&self, owner: &Owner, id: &str) -> ProviderResult<Value>;
}

/// Object-safe view of a [`DataSource`] over JSON state.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    /// Type name.
    fn type_name(&self) -> &'static str;
    /// Attribute schema.
    fn data_source_schema(&self) -> Schema;
    /// Read over JSON.
    async fn read_value(&self, owner: &Owner, config: Value) -> ProviderResult<Value>;
}

fn to_model<M: DeserializeOwned>(value: Value) -> ProviderResult<M> {
    let value = match value {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn resource_schema(&self) -> Schema {
        self.schema()
    }

    async fn create_value(&self, owner: &Owner, plan: Value) -> ProviderResult<Value> {
        let created = self.create(owner, to_model(plan)?).await?;
        Ok(serde_json::to_value(created)?)
    }

    async fn read_value(&self, owner: &Owner, state: Value) -> ProviderResult<Option<Value>> {
        match self.read(owner, to_model(state)?).await? {
            Some(model) => Ok(Some(serde_json::to_value(model)?)),
            None => Ok(None),
        }
    }

    async fn update_value(
        &self,
        owner: &Owner,
        prior: Value,
        plan: Value,
    ) -> ProviderResult<Value> {
        let updated = self.update(owner, to_model(prior)?, to_model(plan)?).await?;
        Ok(serde_json::to_value(updated)?)
    }

    async fn delete_value(&self, owner: &Owner, state: Value) -> ProviderResult<()> {
        self.delete(owner, to_model(state)?).await
    }

    async fn import_value(&self, owner: &Owner, id: &str) -> ProviderResult<Value> {
        Ok(serde_json::to_value(self.import(owner, id).await?)?)
    }
}

#[async_trait]
impl<D: DataSource> DynDataSource for D {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn data_source_schema(&self) -> Schema {
        self.schema()
    }

    async fn read_value(&self, owner: &Owner, config: Value) -> ProviderResult<Value> {
        let model = self.read(owner, to_model(config)?).await?;
        Ok(serde_json::to_value(model)?)
    }
}
