//! Seeded contact table used by `entikit demo`

use anyhow::Context;
use chrono::{DateTime, Utc};
use entikit_core::prelude::*;
use serde::Serialize;
use sqlx::FromRow;

const CITIES: [&str; 4] = ["Lisbon", "Oslo", "Quito", "Kyoto"];

static CONTACT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnType::Integer),
    ColumnDef::new("name", ColumnType::Text),
    ColumnDef::new("email", ColumnType::Text),
    ColumnDef::new("city", ColumnType::Text),
    ColumnDef::new("age", ColumnType::Integer),
    ColumnDef::new("active", ColumnType::Bool),
    ColumnDef::new("locale", ColumnType::Text),
    ColumnDef::new("created_by", ColumnType::Integer),
    ColumnDef::new("created_at", ColumnType::Timestamp),
    ColumnDef::hidden("version", ColumnType::Integer),
];

static CONTACT: EntityDescriptor = EntityDescriptor {
    name: "Contact",
    table: "contacts",
    key: "id",
    version: Some("version"),
    tenant: None,
    columns: CONTACT_COLUMNS,
};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Contact {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub city: String,
    pub age: i64,
    pub active: bool,
    pub locale: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub version: i64,
}

impl Contact {
    /// Deterministic contact for seed position `n` (1-based)
    pub fn seeded(n: usize) -> Self {
        Self {
            id: None,
            name: format!("contact-{:03}", n),
            email: format!("contact{}@example.test", n),
            city: CITIES[n % CITIES.len()].to_string(),
            age: 18 + (n as i64 * 7) % 50,
            active: n % 4 != 0,
            locale: None,
            created_by: None,
            created_at: None,
            version: 0,
        }
    }
}

impl Entity for Contact {
    fn descriptor() -> &'static EntityDescriptor {
        &CONTACT
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn set_key(&mut self, key: i64) {
        self.id = Some(key);
    }

    fn version(&self) -> Option<i64> {
        Some(self.version)
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("email", self.email.clone().into()),
            ("city", self.city.clone().into()),
            ("age", self.age.into()),
            ("active", self.active.into()),
            ("locale", self.locale.clone().into()),
            ("created_by", self.created_by.into()),
            ("created_at", self.created_at.into()),
        ]
    }
}

impl Stampable for Contact {
    fn stamp_locale(&mut self, locale: &str) {
        self.locale = Some(locale.to_string());
    }

    fn stamp_audit(&mut self, user: Option<i64>, at: DateTime<Utc>, op: WriteOp) {
        if op == WriteOp::Insert {
            self.created_by = user;
            self.created_at = Some(at);
        }
    }
}

/// Create the `contacts` table and insert `rows` seeded contacts
pub async fn seed(store: &EntityStore<Contact>, database: &Database, rows: usize) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            city TEXT NOT NULL,
            age INTEGER NOT NULL,
            active BOOLEAN NOT NULL,
            locale TEXT,
            created_by INTEGER,
            created_at TEXT,
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(database.pool())
    .await
    .context("Failed to create contacts table")?;

    for n in 1..=rows {
        store
            .insert(Contact::seeded(n))
            .await
            .with_context(|| format!("Failed to seed contact {}", n))?;
    }
    tracing::debug!(rows, "Seeded demo contacts");
    Ok(())
}
