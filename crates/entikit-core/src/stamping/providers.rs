//! Locale, tenant and user identifier providers
//!
//! Each provider is a single-accessor strategy supplied by the application
//! and injected into the [`Stamper`](super::Stamper).

use std::sync::{Arc, RwLock};

use crate::scope::{ReleaseGuard, on_exit};

pub trait LocaleProvider: Send + Sync {
    fn current_locale(&self) -> Option<String>;
}

pub trait TenantProvider: Send + Sync {
    fn current_tenant(&self) -> Option<i64>;
}

pub trait UserProvider: Send + Sync {
    fn current_user(&self) -> Option<i64>;
}

/// Provider that never has a value
#[derive(Debug, Clone, Copy, Default)]
pub struct Unset;

impl LocaleProvider for Unset {
    fn current_locale(&self) -> Option<String> {
        None
    }
}

impl TenantProvider for Unset {
    fn current_tenant(&self) -> Option<i64> {
        None
    }
}

impl UserProvider for Unset {
    fn current_user(&self) -> Option<i64> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLocale(pub String);

impl LocaleProvider for FixedLocale {
    fn current_locale(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTenant(pub i64);

impl TenantProvider for FixedTenant {
    fn current_tenant(&self) -> Option<i64> {
        Some(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUser(pub i64);

impl UserProvider for FixedUser {
    fn current_user(&self) -> Option<i64> {
        Some(self.0)
    }
}

/// Tenant provider whose value can be swapped for the length of a scope
#[derive(Debug, Clone, Default)]
pub struct ScopedTenant {
    current: Arc<RwLock<Option<i64>>>,
}

impl ScopedTenant {
    pub fn new(tenant: Option<i64>) -> Self {
        Self {
            current: Arc::new(RwLock::new(tenant)),
        }
    }

    pub fn set(&self, tenant: Option<i64>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = tenant;
    }

    /// Act as `tenant` until the returned guard is dropped, then restore the
    /// previous tenant.
    pub fn impersonate(&self, tenant: Option<i64>) -> ReleaseGuard<'static> {
        let previous = {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *current, tenant)
        };
        let restore = self.clone();
        on_exit("tenant-impersonation", move || restore.set(previous))
    }
}

impl TenantProvider for ScopedTenant {
    fn current_tenant(&self) -> Option<i64> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_providers() {
        assert_eq!(FixedLocale("de-DE".into()).current_locale().as_deref(), Some("de-DE"));
        assert_eq!(FixedTenant(3).current_tenant(), Some(3));
        assert_eq!(FixedUser(9).current_user(), Some(9));
        assert_eq!(TenantProvider::current_tenant(&Unset), None);
    }

    #[test]
    fn test_impersonation_restores_previous_tenant() {
        let tenants = ScopedTenant::new(Some(1));
        {
            let _guard = tenants.impersonate(Some(42));
            assert_eq!(tenants.current_tenant(), Some(42));

            {
                let _inner = tenants.impersonate(None);
                assert_eq!(tenants.current_tenant(), None);
            }
            assert_eq!(tenants.current_tenant(), Some(42));
        }
        assert_eq!(tenants.current_tenant(), Some(1));
    }

    #[test]
    fn test_impersonation_restores_on_error_path() {
        let tenants = ScopedTenant::new(Some(5));
        let run = |t: &ScopedTenant| -> Result<(), &'static str> {
            let _guard = t.impersonate(Some(6));
            Err("write rejected")
        };
        assert!(run(&tenants).is_err());
        assert_eq!(tenants.current_tenant(), Some(5));
    }
}
