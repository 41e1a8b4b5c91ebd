//! Generic CRUD resources and the registry that maps URL segments to them.
//!
//! A [`CrudResource`] is composed of a [`RecordSchema`] and a [`VerbGate`].
//! It holds no per-request state; every operation takes the storage and the
//! decoded parameters as arguments.

use std::collections::BTreeMap;

use axum::http::Method;
use portfolio::{models, Predicates, Record, RecordSchema};
use portfolio_api::{Deleted, ListDeleted};
use serde_json::Value;

use crate::{error::AppError, gate::VerbGate, storage::Storage};

/// One record type exposed under `/crud/{path}/`.
#[derive(Debug, Clone)]
pub struct CrudResource {
    path: &'static str,
    schema: &'static RecordSchema,
    gate: VerbGate,
}

impl CrudResource {
    pub fn new(path: &'static str, schema: &'static RecordSchema, gate: VerbGate) -> Self {
        Self { path, schema, gate }
    }

    /// A resource allowing `GET`, `PUT` and `DELETE`.
    pub fn standard(path: &'static str, schema: &'static RecordSchema) -> Self {
        Self::new(
            path,
            schema,
            VerbGate::new([Method::GET, Method::PUT, Method::DELETE]),
        )
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    pub fn gate(&self) -> &VerbGate {
        &self.gate
    }

    /// Every record matching `params`, serialised.
    pub async fn list(
        &self,
        storage: &dyn Storage,
        params: &Predicates,
    ) -> Result<Vec<Value>, AppError> {
        let predicates = self.schema.predicates(params)?;
        tracing::debug!(resource = self.path, ?predicates, "list");
        let records = storage.filter(self.schema, &predicates).await?;
        Ok(records.iter().map(Record::json).collect())
    }

    /// The record with primary key `pk`, serialised.
    pub async fn retrieve(&self, storage: &dyn Storage, pk: i64) -> Result<Value, AppError> {
        storage
            .get(self.schema, pk)
            .await?
            .map(|r| r.json())
            .ok_or_else(|| self.not_found(pk))
    }

    /// Create a record from `params` and return it with its new primary key.
    pub async fn create(
        &self,
        storage: &dyn Storage,
        params: &Predicates,
    ) -> Result<Value, AppError> {
        let row = self.schema.new_row(params)?;
        let record = storage.create(self.schema, row).await?;
        tracing::info!(resource = self.path, pk = record.pk, "created");
        Ok(record.json())
    }

    /// Delete the record with primary key `pk`.
    pub async fn destroy(&self, storage: &dyn Storage, pk: i64) -> Result<Deleted, AppError> {
        if !storage.delete(self.schema, pk).await? {
            return Err(self.not_found(pk));
        }
        tracing::info!(resource = self.path, pk, "deleted");
        Ok(Deleted::new())
    }

    /// Delete every record matching `params` and report how many went.
    pub async fn destroy_matching(
        &self,
        storage: &dyn Storage,
        params: &Predicates,
    ) -> Result<ListDeleted, AppError> {
        let predicates = self.schema.predicates(params)?;
        let count = storage.delete_matching(self.schema, &predicates).await?;
        tracing::info!(resource = self.path, count, "deleted matching");
        Ok(ListDeleted::new(count))
    }

    fn not_found(&self, pk: i64) -> AppError {
        AppError::NotFound(format!("{} {pk} not found", self.schema.name))
    }
}

// ---------------------------------------------------------------------------
// ResourceRegistry
// ---------------------------------------------------------------------------

/// URL segment → resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<&'static str, CrudResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `resource`, replacing any resource already registered at its path.
    pub fn register(&mut self, resource: CrudResource) -> &mut Self {
        self.resources.insert(resource.path(), resource);
        self
    }

    pub fn get(&self, path: &str) -> Option<&CrudResource> {
        self.resources.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrudResource> {
        self.resources.values()
    }

    /// The portfolio's resources with their default allow-lists.
    ///
    /// `country` also accepts `POST`, as a synonym for `PUT`.
    pub fn portfolio() -> Self {
        let mut registry = Self::new();
        registry
            .register(CrudResource::new(
                "country",
                &models::COUNTRY,
                VerbGate::new([Method::GET, Method::POST, Method::PUT, Method::DELETE]),
            ))
            .register(CrudResource::standard("region", &models::REGION))
            .register(CrudResource::standard("city", &models::CITY))
            .register(CrudResource::standard("street", &models::STREET))
            .register(CrudResource::standard("address", &models::ADDRESS))
            .register(CrudResource::standard("organization", &models::ORGANIZATION))
            .register(CrudResource::standard("company", &models::COMPANY))
            .register(CrudResource::standard("employment", &models::EMPLOYMENT))
            .register(CrudResource::standard("involvement", &models::INVOLVEMENT))
            .register(CrudResource::standard(
                "professional_project",
                &models::PROFESSIONAL_PROJECT,
            ));
        registry
    }
}
