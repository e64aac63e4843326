#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use bbweb::context::{ContextError, CurrentUser, RequestId};
use bbweb::fields;
use bbweb::selector::FieldDef;
use bbweb::serialize::{Entity, Node};

/// Session handed out by [`MemoryProvider`]; records which scope created it
#[derive(Debug)]
pub struct MemorySession {
    pub serial: usize,
    pub request: Option<RequestId>,
}

/// In-memory session provider that counts creations and releases
#[derive(Debug, Default)]
pub struct MemoryProvider {
    pub created: AtomicUsize,
    pub released: AtomicUsize,
    pub unhealthy: AtomicBool,
}

impl MemoryProvider {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl bbweb::SessionProvider for MemoryProvider {
    type Session = MemorySession;

    async fn create(&self) -> Result<MemorySession, ContextError> {
        let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MemorySession {
            serial,
            request: bbweb::context::scope_key(),
        })
    }

    async fn release(&self, _session: Arc<MemorySession>) -> Result<(), ContextError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ContextError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(ContextError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    async fn describe(&self, session: &MemorySession) -> Result<Node, ContextError> {
        Ok(Node::entity(SessionRow {
            serial: session.serial,
            request: session.request.map(|id| id.to_string()),
            secret: "s3cr3t",
        }))
    }
}

/// Description served for a [`MemorySession`]
pub struct SessionRow {
    pub serial: usize,
    pub request: Option<String>,
    pub secret: &'static str,
}

impl Entity for SessionRow {
    fn entity_name(&self) -> &'static str {
        "session_row"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public serial, public request, hidden secret]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "serial" => Some(self.serial.into()),
            "request" => Some(self.request.clone().into()),
            "secret" => Some(self.secret.into()),
            _ => None,
        }
    }
}

pub fn user(name: &str) -> CurrentUser {
    CurrentUser {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        access: "full".to_string(),
    }
}

/// Model with every scalar kind plus a self relation
pub struct MockModel {
    pub id: i64,
    pub name: String,
    pub canceled: bool,
    pub child: Option<Arc<MockModel>>,
}

impl MockModel {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            canceled: true,
            child: None,
        }
    }
}

impl Entity for MockModel {
    fn entity_name(&self) -> &'static str {
        "mock_model"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![
            public datetime,
            public name,
            public canceled,
            public id,
            public date,
            public child: one,
        ]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "datetime" => Some(Utc.with_ymd_and_hms(2010, 9, 10, 6, 51, 25).single().into()),
            "name" => Some(self.name.clone().into()),
            "canceled" => Some(self.canceled.into()),
            "id" => Some(self.id.into()),
            "date" => Some(NaiveDate::from_ymd_opt(2010, 9, 10).into()),
            "child" => Some(self.child.clone().into()),
            _ => None,
        }
    }
}

pub struct Person {
    pub id: i64,
    pub name: &'static str,
    pub ssn: &'static str,
    pub password: &'static str,
}

impl Person {
    pub fn sample() -> Self {
        Self {
            id: 1,
            name: "Name",
            ssn: "secret",
            password: "x",
        }
    }
}

impl Entity for Person {
    fn entity_name(&self) -> &'static str {
        "person"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public id, public name, private ssn, hidden password]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.into()),
            "ssn" => Some(self.ssn.into()),
            "password" => Some(self.password.into()),
            _ => None,
        }
    }
}

pub struct Item {
    pub id: i64,
    pub label: &'static str,
}

impl Entity for Item {
    fn entity_name(&self) -> &'static str {
        "item"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public id, public label]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "id" => Some(self.id.into()),
            "label" => Some(self.label.into()),
            _ => None,
        }
    }
}

/// Owner of a to-many relation, loaded lazily
pub struct Order {
    pub id: i64,
    pub items: Vec<(i64, &'static str)>,
    pub loads: Arc<AtomicUsize>,
}

impl Entity for Order {
    fn entity_name(&self) -> &'static str {
        "order"
    }

    fn fields(&self) -> &'static [FieldDef] {
        fields![public id, public items: many]
    }

    fn field(&self, name: &str) -> Option<Node> {
        match name {
            "id" => Some(self.id.into()),
            "items" => {
                let rows = self.items.clone();
                let loads = self.loads.clone();
                Some(Node::query_fn(move || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(rows
                        .iter()
                        .map(|&(id, label)| Node::entity(Item { id, label }))
                        .collect())
                }))
            }
            _ => None,
        }
    }
}
