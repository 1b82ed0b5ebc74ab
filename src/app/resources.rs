use reqwest::Method;
use serde_json::Value;

use super::client::QueryClient;
use super::error::TransportError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    AlertRules,
    Streams,
}

impl ResourceKind {
    fn collection(self) -> &'static [&'static str] {
        match self {
            ResourceKind::AlertRules => &["alert-rules"],
            ResourceKind::Streams => &["config", "streams"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::AlertRules => "alert-rules",
            ResourceKind::Streams => "streams",
        }
    }
}

pub struct ResourceClient<'a> {
    client: &'a QueryClient,
    kind: ResourceKind,
}

impl<'a> ResourceClient<'a> {
    pub fn new(client: &'a QueryClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    fn path<'p>(&self, id: Option<&'p str>) -> Vec<&'p str> {
        let mut segments: Vec<&'p str> = self.kind.collection().to_vec();
        if let Some(id) = id {
            segments.push(id);
        }
        segments
    }

    pub async fn list(&self) -> Result<Vec<Value>, TransportError> {
        let value = self
            .client
            .request(Method::GET, &self.path(None), &[], None)
            .await?;
        match unwrap_envelope(value, "items") {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(TransportError::Decode(format!(
                "expected a list of {}, got {other}",
                self.kind.label()
            ))),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Value, TransportError> {
        let value = self
            .client
            .request(Method::GET, &self.path(Some(id)), &[], None)
            .await?;
        Ok(unwrap_envelope(value, "item"))
    }

    pub async fn create(&self, body: &Value) -> Result<Value, TransportError> {
        let value = self
            .client
            .request(Method::POST, &self.path(None), &[], Some(body))
            .await?;
        Ok(unwrap_envelope(value, "item"))
    }

    pub async fn update(&self, id: &str, body: &Value) -> Result<Value, TransportError> {
        let value = self
            .client
            .request(Method::PUT, &self.path(Some(id)), &[], Some(body))
            .await?;
        Ok(unwrap_envelope(value, "item"))
    }

    pub async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.client
            .request(Method::DELETE, &self.path(Some(id)), &[], None)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceAction {
    List,
    Get(String),
    Create(Value),
    Update(String, Value),
    Delete(String),
}

impl ResourceAction {
    pub fn from_parts(id: Option<String>, body: Option<Value>, delete: bool) -> Self {
        match (id, body) {
            (Some(id), _) if delete => ResourceAction::Delete(id),
            (Some(id), Some(body)) => ResourceAction::Update(id, body),
            (Some(id), None) => ResourceAction::Get(id),
            (None, Some(body)) => ResourceAction::Create(body),
            (None, None) => ResourceAction::List,
        }
    }
}

impl ResourceClient<'_> {
    pub async fn perform(&self, action: &ResourceAction) -> Result<Value, TransportError> {
        match action {
            ResourceAction::List => self.list().await.map(Value::Array),
            ResourceAction::Get(id) => self.get(id).await,
            ResourceAction::Create(body) => self.create(body).await,
            ResourceAction::Update(id, body) => self.update(id, body).await,
            ResourceAction::Delete(id) => self.delete(id).await.map(|()| Value::Null),
        }
    }
}

// Streams wrap bodies as {"items": [...]} / {"item": {...}}; alert rules do not.
fn unwrap_envelope(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}
