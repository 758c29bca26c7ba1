//! Shared fixtures for unit tests

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::entity::{ColumnDef, ColumnType, Entity, EntityDescriptor, Value};
use crate::stamping::{Stampable, WriteOp};
use crate::storage::Database;

static PERSON_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", ColumnType::Integer),
    ColumnDef::new("name", ColumnType::Text),
    ColumnDef::new("email", ColumnType::Text),
    ColumnDef::new("age", ColumnType::Integer),
    ColumnDef::new("active", ColumnType::Bool),
    ColumnDef::hidden("tenant_id", ColumnType::Integer),
    ColumnDef::new("locale", ColumnType::Text),
    ColumnDef::new("created_by", ColumnType::Integer),
    ColumnDef::new("modified_by", ColumnType::Integer),
    ColumnDef::new("created_at", ColumnType::Timestamp),
    ColumnDef::new("modified_at", ColumnType::Timestamp),
    ColumnDef::new("version", ColumnType::Integer).unsortable(),
];

static PERSON: EntityDescriptor = EntityDescriptor {
    name: "Person",
    table: "people",
    key: "id",
    version: Some("version"),
    tenant: Some("tenant_id"),
    columns: PERSON_COLUMNS,
};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub active: bool,
    pub tenant_id: Option<i64>,
    pub locale: Option<String>,
    pub created_by: Option<i64>,
    pub modified_by: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Person {
    pub fn new(name: &str, email: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            age,
            active: true,
            tenant_id: None,
            locale: None,
            created_by: None,
            modified_by: None,
            created_at: None,
            modified_at: None,
            version: 0,
        }
    }
}

impl Entity for Person {
    fn descriptor() -> &'static EntityDescriptor {
        &PERSON
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
            ("age", self.age.into()),
            ("active", self.active.into()),
            ("tenant_id", self.tenant_id.into()),
            ("locale", self.locale.clone().into()),
            ("created_by", self.created_by.into()),
            ("modified_by", self.modified_by.into()),
            ("created_at", self.created_at.into()),
            ("modified_at", self.modified_at.into()),
        ]
    }
}

impl Stampable for Person {
    fn stamp_locale(&mut self, locale: &str) {
        self.locale = Some(locale.to_string());
    }

    fn stamp_tenant(&mut self, tenant: i64) {
        self.tenant_id = Some(tenant);
    }

    fn stamp_audit(&mut self, user: Option<i64>, at: DateTime<Utc>, op: WriteOp) {
        match op {
            WriteOp::Insert => {
                self.created_by = user;
                self.created_at = Some(at);
            }
            WriteOp::Update => {
                self.modified_by = user;
                self.modified_at = Some(at);
            }
        }
    }
}

/// In-memory database with an empty `people` table
pub async fn people_db() -> Database {
    let db = Database::in_memory().await.expect("in-memory database");
    sqlx::query(
        r#"
        CREATE TABLE people (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            age INTEGER NOT NULL,
            active BOOLEAN NOT NULL DEFAULT 0,
            tenant_id INTEGER,
            locale TEXT,
            created_by INTEGER,
            modified_by INTEGER,
            created_at TEXT,
            modified_at TEXT,
            version INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(db.pool())
    .await
    .expect("create people table");
    db
}

/// Insert `person-01` .. `person-NN`; age is 20 + n, even n are active
pub async fn seed_people(db: &Database, count: usize) {
    for n in 1..=count {
        sqlx::query("INSERT INTO people (name, email, age, active) VALUES (?, ?, ?, ?)")
            .bind(format!("person-{:02}", n))
            .bind(format!("person{}@example.com", n))
            .bind(20 + n as i64)
            .bind(n % 2 == 0)
            .execute(db.pool())
            .await
            .expect("seed person");
    }
}
