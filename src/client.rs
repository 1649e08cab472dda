//! Typed HTTP caller for the RPC surface.
//!
//! Query results are cached per procedure and the cache is dropped after any
//! successful mutation, so a `list` following a `create` always refetches.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::dto::user_dto::DeleteUserResponse;
use crate::models::user::User;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, Vec<String>>,
    },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server error {code}: {message}")]
    Server { code: String, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text suitable for showing to an end user.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Validation { message, fields } => {
                let details: Vec<String> = fields
                    .iter()
                    .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
                    .collect();
                if details.is_empty() {
                    message.clone()
                } else {
                    details.join("; ")
                }
            }
            ClientError::ConstraintViolation(message) => message.clone(),
            ClientError::Connection(_) => {
                "Unable to reach the server. Please try again later.".to_string()
            }
            ClientError::Server { message, .. } => message.clone(),
            ClientError::Decode(_) => "Received an unexpected response from the server.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    fields: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Result { result: ResultBody },
    Error { error: ErrorBody },
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    data: JsonValue,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Clone)]
pub struct UsersClient {
    http: Client,
    base_url: String,
    cache: Arc<Mutex<HashMap<String, JsonValue>>>,
}

impl UsersClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.query("user.list").await
    }

    pub async fn create_user(&self, name: &str, email: &str) -> ClientResult<User> {
        self.mutation("user.create", &CreateUserRequest { name, email })
            .await
    }

    pub async fn delete_user(&self, id: i64) -> ClientResult<DeleteUserResponse> {
        self.mutation("user.delete", &json!({ "id": id })).await
    }

    /// Forget every cached query result.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn is_cached(&self, procedure: &str) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains_key(procedure))
            .unwrap_or(false)
    }

    async fn query<T: DeserializeOwned>(&self, procedure: &str) -> ClientResult<T> {
        let cached = self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(procedure).cloned());
        if let Some(data) = cached {
            return decode(data);
        }

        let response = self
            .http
            .get(format!("{}/api/rpc/{}", self.base_url, procedure))
            .send()
            .await?;
        let data = read_envelope(response).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(procedure.to_string(), data.clone());
        }
        decode(data)
    }

    async fn mutation<I: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        procedure: &str,
        input: &I,
    ) -> ClientResult<T> {
        let response = self
            .http
            .post(format!("{}/api/rpc/{}", self.base_url, procedure))
            .json(input)
            .send()
            .await?;
        let data = read_envelope(response).await?;
        self.invalidate();
        decode(data)
    }
}

fn decode<T: DeserializeOwned>(data: JsonValue) -> ClientResult<T> {
    serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn read_envelope(response: reqwest::Response) -> ClientResult<JsonValue> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<Envelope>(&body) {
        Ok(Envelope::Result { result }) if status.is_success() => Ok(result.data),
        Ok(Envelope::Error { error }) => Err(match error.code.as_str() {
            "VALIDATION_ERROR" => ClientError::Validation {
                message: error.message,
                fields: error.fields,
            },
            "CONSTRAINT_VIOLATION" => ClientError::ConstraintViolation(error.message),
            "CONNECTION_ERROR" => ClientError::Connection(error.message),
            _ => ClientError::Server {
                code: error.code,
                message: error.message,
            },
        }),
        _ if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY => {
            Err(ClientError::Connection(format!("server responded {}", status)))
        }
        _ => Err(ClientError::Decode(format!(
            "status {} with body {}",
            status, body
        ))),
    }
}
