use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use super::ProcedureKind;
use crate::error::{Error, Result};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type Handler = Arc<dyn Fn(JsonValue) -> BoxFuture<Result<JsonValue>> + Send + Sync>;

#[derive(Clone)]
pub struct Procedure {
    kind: ProcedureKind,
    handler: Handler,
}

impl Procedure {
    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn invoke(&self, input: JsonValue) -> BoxFuture<Result<JsonValue>> {
        (self.handler)(input)
    }
}

/// Type-erase a typed handler: decode the JSON input, run, encode the output.
///
/// A `null` input is treated as `{}` so procedures without arguments can be
/// called with no payload at all.
fn erase<I, O, F, Fut>(handler: F) -> Handler
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |input: JsonValue| {
        let handler = handler.clone();
        Box::pin(async move {
            let input = match input {
                JsonValue::Null => JsonValue::Object(Default::default()),
                other => other,
            };
            let typed: I = serde_json::from_value(input)
                .map_err(|e| Error::BadRequest(format!("Invalid input: {}", e)))?;
            let output = handler(typed).await?;
            serde_json::to_value(output)
                .map_err(|e| Error::Internal(format!("Failed to encode output: {}", e)))
        })
    })
}

/// Procedures of one namespace, keyed by operation name.
#[derive(Clone, Default)]
pub struct ProcedureSet {
    procedures: BTreeMap<String, Procedure>,
    duplicates: Vec<String>,
}

impl ProcedureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query<I, O, F, Fut>(self, name: &str, handler: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.register(name, ProcedureKind::Query, erase(handler))
    }

    pub fn mutation<I, O, F, Fut>(self, name: &str, handler: F) -> Self
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.register(name, ProcedureKind::Mutation, erase(handler))
    }

    fn register(mut self, name: &str, kind: ProcedureKind, handler: Handler) -> Self {
        if self.procedures.contains_key(name) {
            self.duplicates.push(name.to_string());
        } else {
            self.procedures
                .insert(name.to_string(), Procedure { kind, handler });
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, ToSchema)]
pub struct ProcedureInfo {
    pub name: String,
    pub kind: ProcedureKind,
}

/// Every procedure the service exposes, keyed by `<namespace>.<operation>`.
#[derive(Clone, Default)]
pub struct ProcedureRegistry {
    procedures: BTreeMap<String, Procedure>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace. Fails if any resulting key is already taken.
    pub fn merge(mut self, namespace: &str, set: ProcedureSet) -> Result<Self> {
        if namespace.is_empty() || namespace.contains('.') {
            return Err(Error::Config(format!(
                "Invalid procedure namespace '{}'",
                namespace
            )));
        }
        if let Some(name) = set.duplicates.first() {
            return Err(Error::Config(format!(
                "Procedure {}.{} registered twice",
                namespace, name
            )));
        }

        for (name, procedure) in set.procedures {
            let key = format!("{}.{}", namespace, name);
            if self.procedures.contains_key(&key) {
                return Err(Error::Config(format!("Procedure {} registered twice", key)));
            }
            self.procedures.insert(key, procedure);
        }
        Ok(self)
    }

    pub fn resolve(&self, path: &str) -> Result<&Procedure> {
        self.procedures
            .get(path)
            .ok_or_else(|| Error::UnknownProcedure(path.to_string()))
    }

    /// Dispatch `path` as an operation of the given kind.
    pub async fn call(&self, path: &str, kind: ProcedureKind, input: JsonValue) -> Result<JsonValue> {
        let procedure = self.resolve(path)?;
        if procedure.kind() != kind {
            return Err(Error::MethodNotSupported {
                procedure: path.to_string(),
                kind: procedure.kind(),
                method: kind.http_method().to_string(),
            });
        }

        let started = Instant::now();
        let outcome = procedure.invoke(input).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => tracing::info!(procedure = path, %kind, elapsed_ms, "procedure completed"),
            Err(e) => tracing::info!(
                procedure = path,
                %kind,
                elapsed_ms,
                code = e.code(),
                "procedure failed"
            ),
        }
        outcome
    }

    pub fn manifest(&self) -> Vec<ProcedureInfo> {
        self.procedures
            .iter()
            .map(|(name, procedure)| ProcedureInfo {
                name: name.clone(),
                kind: procedure.kind(),
            })
            .collect()
    }
}
