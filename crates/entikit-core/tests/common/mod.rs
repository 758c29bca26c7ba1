//! Fixtures shared by integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use entikit_core::prelude::*;
use sqlx::FromRow;

static TICKET_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnType::Integer),
    ColumnDef::new("code", ColumnType::Text),
    ColumnDef::new("title", ColumnType::Text),
    ColumnDef::new("priority", ColumnType::Integer),
    ColumnDef::new("estimate", ColumnType::Real),
    ColumnDef::new("closed", ColumnType::Bool),
    ColumnDef::hidden("tenant_id", ColumnType::Integer),
    ColumnDef::new("locale", ColumnType::Text),
    ColumnDef::new("opened_by", ColumnType::Integer),
    ColumnDef::new("opened_at", ColumnType::Timestamp),
    ColumnDef::hidden("row_version", ColumnType::Integer),
];

static TICKET: EntityDescriptor = EntityDescriptor {
    name: "Ticket",
    table: "tickets",
    key: "id",
    version: Some("row_version"),
    tenant: Some("tenant_id"),
    columns: TICKET_COLUMNS,
};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Ticket {
    pub id: Option<i64>,
    pub code: String,
    pub title: String,
    pub priority: i64,
    pub estimate: Option<f64>,
    pub closed: bool,
    pub tenant_id: Option<i64>,
    pub locale: Option<String>,
    pub opened_by: Option<i64>,
    pub opened_at: Option<DateTime<Utc>>,
    pub row_version: i64,
}

impl Ticket {
    pub fn new(code: &str, title: &str, priority: i64) -> Self {
        Self {
            id: None,
            code: code.to_string(),
            title: title.to_string(),
            priority,
            estimate: None,
            closed: false,
            tenant_id: None,
            locale: None,
            opened_by: None,
            opened_at: None,
            row_version: 0,
        }
    }
}

impl Entity for Ticket {
    fn descriptor() -> &'static EntityDescriptor {
        &TICKET
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn version(&self) -> Option<i64> {
        Some(self.row_version)
    }

    fn set_version(&mut self, version: i64) {
        self.row_version = version;
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("code", self.code.clone().into()),
            ("title", self.title.clone().into()),
            ("priority", self.priority.into()),
            ("estimate", self.estimate.into()),
            ("closed", self.closed.into()),
            ("tenant_id", self.tenant_id.into()),
            ("locale", self.locale.clone().into()),
            ("opened_by", self.opened_by.into()),
            ("opened_at", self.opened_at.into()),
        ]
    }
}

impl Stampable for Ticket {
    fn stamp_locale(&mut self, locale: &str) {
        self.locale = Some(locale.to_string());
    }

    fn stamp_tenant(&mut self, tenant: i64) {
        self.tenant_id = Some(tenant);
    }

    fn stamp_audit(&mut self, user: Option<i64>, at: DateTime<Utc>, op: WriteOp) {
        if op == WriteOp::Insert {
            self.opened_by = user;
            self.opened_at = Some(at);
        }
    }
}

/// In-memory database with an empty `tickets` table
pub async fn tickets_db() -> Database {
    let db = Database::in_memory().await.expect("in-memory database");
    sqlx::query(
        r#"
        CREATE TABLE tickets (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            priority INTEGER NOT NULL,
            estimate REAL,
            closed BOOLEAN NOT NULL DEFAULT 0,
            tenant_id INTEGER,
            locale TEXT,
            opened_by INTEGER,
            opened_at TEXT,
            row_version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(db.pool())
    .await
    .expect("create tickets table");
    db
}

/// Store `count` tickets named `T-001`.. through `store`; priority cycles 1..=3
pub async fn seed_tickets(store: &EntityStore<Ticket>, count: usize) -> Vec<Ticket> {
    let mut saved = Vec::with_capacity(count);
    for n in 1..=count {
        let mut ticket = Ticket::new(
            &format!("T-{:03}", n),
            &format!("Ticket number {}", n),
            (n % 3) as i64 + 1,
        );
        ticket.estimate = Some(n as f64 / 2.0);
        ticket.closed = n % 5 == 0;
        saved.push(store.insert(ticket).await.expect("seed ticket"));
    }
    saved
}
