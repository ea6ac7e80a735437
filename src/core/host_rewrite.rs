//! Outbound Host-header rewrite.
//!
//! A route's downstream descriptor may carry upstream header find/replace
//! rules. When exactly one rule targets `host` (case-insensitive), the
//! outbound request's `Host` header is replaced with the configured value
//! just before the request is sent to the backend. Every other situation
//! (no routing context, no descriptors, no rule list, zero matches, several
//! matches, or a value that is not a legal header value) leaves the request
//! untouched. A cosmetic header rewrite is never worth failing the proxied
//! request over, so this module has no error path.
use http::{HeaderMap, HeaderValue, header};

use crate::{config::models::HeaderFindReplace, core::context::RoutingContext};

/// Resolve the configured Host replacement for a request, if any.
///
/// Pure lookup over the routing context: downstream route holder → first
/// descriptor → its rule list → the single `host` rule. Any absent link in
/// that chain yields `None`.
pub fn resolve_host_replacement(ctx: &RoutingContext) -> Option<&str> {
    let holder = ctx.downstream.as_ref()?;
    let route = holder.routes.first()?;
    let rules = route.upstream_headers.as_deref()?;
    single_host_rule(rules).map(|rule| rule.replace.as_str())
}

/// The single rule keyed `host`. Zero or multiple matches resolve to `None`;
/// taking the first of several would silently change which value wins, so
/// ambiguity is treated the same as absence.
fn single_host_rule(rules: &[HeaderFindReplace]) -> Option<&HeaderFindReplace> {
    let mut matches = rules
        .iter()
        .filter(|rule| rule.key.eq_ignore_ascii_case("host"));
    match (matches.next(), matches.next()) {
        (Some(rule), None) => Some(rule),
        _ => None,
    }
}

/// Set the `Host` header to `value`, dropping any pre-existing entries first.
/// A `None` value is a no-op, as is a value that cannot be encoded as a
/// header value (logged at debug, never surfaced).
pub fn apply_host_header(headers: &mut HeaderMap, value: Option<&str>) {
    let Some(value) = value else { return };

    match HeaderValue::from_str(value) {
        // insert removes every existing Host entry before adding the new one
        Ok(host) => {
            headers.insert(header::HOST, host);
        }
        Err(_) => {
            tracing::debug!(
                replacement = value,
                "configured host replacement is not a valid header value, leaving Host unchanged"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::models::{DownstreamRoute, RouteConfig},
        core::context::DownstreamRouteHolder,
    };

    fn rule(key: &str, replace: &str) -> HeaderFindReplace {
        HeaderFindReplace {
            key: key.to_string(),
            replace: replace.to_string(),
        }
    }

    fn context_with_rules(rules: Option<Vec<HeaderFindReplace>>) -> RoutingContext {
        RoutingContext::new(
            "/svc",
            &RouteConfig {
                downstream: vec![DownstreamRoute {
                    target: "http://app:80".to_string(),
                    upstream_headers: rules,
                }],
            },
        )
    }

    #[test]
    fn no_downstream_holder_resolves_to_none() {
        let ctx = RoutingContext::default();
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn empty_route_list_resolves_to_none() {
        let ctx = RoutingContext {
            route_prefix: "/svc".to_string(),
            downstream: Some(DownstreamRouteHolder { routes: vec![] }),
        };
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn absent_rule_list_resolves_to_none() {
        let ctx = context_with_rules(None);
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn single_host_rule_resolves_regardless_of_case() {
        for key in ["host", "Host", "HOST", "hOsT"] {
            let ctx = context_with_rules(Some(vec![rule(key, "svc.internal")]));
            assert_eq!(resolve_host_replacement(&ctx), Some("svc.internal"));
        }
    }

    #[test]
    fn unrelated_rules_do_not_match() {
        let ctx = context_with_rules(Some(vec![rule("X-Tenant", "acme")]));
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn multiple_host_rules_are_ambiguous() {
        let ctx = context_with_rules(Some(vec![
            rule("host", "a.internal"),
            rule("HOST", "b.internal"),
        ]));
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn only_first_descriptor_is_consulted() {
        let ctx = RoutingContext::new(
            "/svc",
            &RouteConfig {
                downstream: vec![
                    DownstreamRoute {
                        target: "http://a:80".to_string(),
                        upstream_headers: None,
                    },
                    DownstreamRoute {
                        target: "http://b:80".to_string(),
                        upstream_headers: Some(vec![rule("host", "b.internal")]),
                    },
                ],
            },
        );
        assert_eq!(resolve_host_replacement(&ctx), None);
    }

    #[test]
    fn apply_replaces_existing_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "original.example.com".parse().unwrap());

        apply_host_header(&mut headers, Some("svc.internal"));

        let hosts: Vec<_> = headers.get_all(header::HOST).iter().collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0], "svc.internal");
    }

    #[test]
    fn apply_is_idempotent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "original.example.com".parse().unwrap());

        apply_host_header(&mut headers, Some("svc.internal"));
        apply_host_header(&mut headers, Some("svc.internal"));

        let hosts: Vec<_> = headers.get_all(header::HOST).iter().collect();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0], "svc.internal");
    }

    #[test]
    fn apply_with_none_leaves_headers_unchanged() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "original.example.com".parse().unwrap());
        headers.insert("x-other", "kept".parse().unwrap());

        apply_host_header(&mut headers, None);

        assert_eq!(headers.get(header::HOST).unwrap(), "original.example.com");
        assert_eq!(headers.get("x-other").unwrap(), "kept");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn apply_with_invalid_value_leaves_headers_unchanged() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "original.example.com".parse().unwrap());

        apply_host_header(&mut headers, Some("bad\nvalue"));

        assert_eq!(headers.get(header::HOST).unwrap(), "original.example.com");
    }

    #[test]
    fn resolve_and_apply_end_to_end() {
        let ctx = context_with_rules(Some(vec![rule("host", "svc.internal")]));
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "original.example.com".parse().unwrap());
        headers.insert("x-request-id", "abc123".parse().unwrap());

        apply_host_header(&mut headers, resolve_host_replacement(&ctx));

        assert_eq!(headers.get(header::HOST).unwrap(), "svc.internal");
        assert_eq!(headers.get("x-request-id").unwrap(), "abc123");
        assert_eq!(headers.len(), 2);
    }
}
