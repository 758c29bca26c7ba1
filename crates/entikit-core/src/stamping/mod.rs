//! Entity stamping
//!
//! Locale, tenant and audit columns are filled by an explicit pipeline
//! stage. The storage layer calls [`Stamper::stamp`] immediately before each
//! write; the stage itself is the pure function [`stamp_entity`], so the
//! rules can be exercised without a database.
//!
//! Rules:
//! - locale and tenant are stamped on insert only,
//! - the acting user and timestamp are stamped as creator on insert and as
//!   modifier on update.

pub mod providers;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::StampingConfig;

pub use providers::{
    FixedLocale, FixedTenant, FixedUser, LocaleProvider, ScopedTenant, TenantProvider, Unset,
    UserProvider,
};

/// Kind of write about to happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
}

/// Hooks an entity implements for the columns it carries.
///
/// Every hook defaults to a no-op.
pub trait Stampable {
    fn stamp_locale(&mut self, _locale: &str) {}

    fn stamp_tenant(&mut self, _tenant: i64) {}

    fn stamp_audit(&mut self, _user: Option<i64>, _at: DateTime<Utc>, _op: WriteOp) {}
}

/// Snapshot of the identifiers in effect for one write
#[derive(Debug, Clone, PartialEq)]
pub struct StampContext {
    pub op: WriteOp,
    pub locale: Option<String>,
    pub tenant: Option<i64>,
    pub user: Option<i64>,
    pub at: DateTime<Utc>,
}

impl StampContext {
    pub fn new(op: WriteOp) -> Self {
        Self {
            op,
            locale: None,
            tenant: None,
            user: None,
            at: Utc::now(),
        }
    }
}

/// Apply `ctx` to `entity` and hand it back
pub fn stamp_entity<E: Stampable>(mut entity: E, ctx: &StampContext) -> E {
    if ctx.op == WriteOp::Insert {
        if let Some(locale) = &ctx.locale {
            entity.stamp_locale(locale);
        }
        if let Some(tenant) = ctx.tenant {
            entity.stamp_tenant(tenant);
        }
    }
    entity.stamp_audit(ctx.user, ctx.at, ctx.op);
    entity
}

/// Builds a [`StampContext`] from injected providers and stamps entities
#[derive(Clone)]
pub struct Stamper {
    locale: Arc<dyn LocaleProvider>,
    tenant: Arc<dyn TenantProvider>,
    user: Arc<dyn UserProvider>,
    default_locale: Option<String>,
}

impl Default for Stamper {
    fn default() -> Self {
        Self {
            locale: Arc::new(Unset),
            tenant: Arc::new(Unset),
            user: Arc::new(Unset),
            default_locale: None,
        }
    }
}

impl Stamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StampingConfig) -> Self {
        Self {
            default_locale: config.default_locale.clone(),
            ..Self::default()
        }
    }

    pub fn with_locale(mut self, provider: impl LocaleProvider + 'static) -> Self {
        self.locale = Arc::new(provider);
        self
    }

    pub fn with_tenant(mut self, provider: impl TenantProvider + 'static) -> Self {
        self.tenant = Arc::new(provider);
        self
    }

    pub fn with_user(mut self, provider: impl UserProvider + 'static) -> Self {
        self.user = Arc::new(provider);
        self
    }

    /// Locale used when the locale provider has none
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    /// Tenant currently in effect, for scoping queries to match stamped rows
    pub fn current_tenant(&self) -> Option<i64> {
        self.tenant.current_tenant()
    }

    pub fn context(&self, op: WriteOp) -> StampContext {
        StampContext {
            op,
            locale: self
                .locale
                .current_locale()
                .or_else(|| self.default_locale.clone()),
            tenant: self.tenant.current_tenant(),
            user: self.user.current_user(),
            at: Utc::now(),
        }
    }

    pub fn stamp<E: Stampable>(&self, entity: E, op: WriteOp) -> E {
        let ctx = self.context(op);
        tracing::trace!(?op, tenant = ?ctx.tenant, user = ?ctx.user, "Stamping entity");
        stamp_entity(entity, &ctx)
    }
}

impl fmt::Debug for Stamper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stamper")
            .field("locale", &self.locale.current_locale())
            .field("tenant", &self.tenant.current_tenant())
            .field("user", &self.user.current_user())
            .field("default_locale", &self.default_locale)
            .finish()
    }
}
