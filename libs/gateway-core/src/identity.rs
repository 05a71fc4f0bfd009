//! Resolves the caller identity a `_UPN`/`_IP` forced filter directive
//! binds against. Production deployments front this with a real identity
//! platform (OIDC, a service-to-service auth proxy); this crate only ships
//! the seam and a header-trusting implementation meant for local dev and
//! tests behind a trusted proxy.

use async_trait::async_trait;
use entity::CallerContext;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, upn_header: Option<&str>, remote_ip: Option<&str>) -> CallerContext;
}

/// Trusts an upstream-set `X-Upn` header verbatim. Only sound behind a
/// proxy that strips/overwrites that header from untrusted callers before
/// it reaches this process — never expose this provider directly to the
/// internet.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderIdentityProvider;

#[async_trait]
impl IdentityProvider for HeaderIdentityProvider {
    async fn resolve(&self, upn_header: Option<&str>, remote_ip: Option<&str>) -> CallerContext {
        CallerContext {
            upn: upn_header.map(str::to_string),
            ip: remote_ip.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_upn_and_ip_from_inputs() {
        let provider = HeaderIdentityProvider;
        let ctx = provider.resolve(Some("alice@example.com"), Some("10.0.0.1")).await;
        assert_eq!(ctx.upn.as_deref(), Some("alice@example.com"));
        assert_eq!(ctx.ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn missing_header_resolves_to_none() {
        let provider = HeaderIdentityProvider;
        let ctx = provider.resolve(None, None).await;
        assert!(ctx.upn.is_none());
    }
}
