//! Evaluation of routing rules against requests
//!
//! Mirrors what the gateways do with the compiled objects: rules are tried
//! in ascending `order` and the first match wins.

use crate::rules::{PathMatch, RouteSet, RoutingRule};
use crate::Result;
use regex::Regex;
use url::form_urlencoded;

/// The parts of an HTTP request that rules can match on
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
}

impl HttpRequest {
    /// Build a request from a method and a request target (`/path?query`)
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
        }
    }

    /// Parse "METHOD /path?query"
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let method = parts.next()?;
        let target = parts.next()?;
        if parts.next().is_some() || !target.starts_with('/') {
            return None;
        }
        Some(Self::new(method, target))
    }

    /// Decoded `key=value` pairs, as the gateways see them
    fn query_pairs(&self) -> form_urlencoded::Parse<'_> {
        form_urlencoded::parse(self.query.as_deref().unwrap_or_default().as_bytes())
    }

    /// Value of the first query parameter named `key`
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.into_owned())
    }

    /// Whether any occurrence of `key` has exactly `value`
    pub fn has_query_param(&self, key: &str, value: &str) -> bool {
        self.query_pairs().any(|(k, v)| k == key && v == value)
    }
}

struct CompiledRule<'a> {
    rule: &'a RoutingRule,
    path: Option<Regex>,
}

/// Rules of a route set, compiled and sorted for evaluation
pub struct RouteTable<'a> {
    rules: Vec<CompiledRule<'a>>,
}

impl<'a> RouteTable<'a> {
    pub fn new(routes: &'a RouteSet) -> Result<Self> {
        let rules = routes
            .ordered_http()
            .into_iter()
            .map(|rule| -> Result<CompiledRule<'a>> {
                let path = match &rule.matcher.path {
                    Some(PathMatch::Regex(pattern)) => Some(Regex::new(pattern)?),
                    _ => None,
                };
                Ok(CompiledRule { rule, path })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// First rule matching the request, if any
    pub fn resolve(&self, request: &HttpRequest) -> Option<&'a RoutingRule> {
        self.rules
            .iter()
            .find(|compiled| compiled.matches(request))
            .map(|compiled| compiled.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl CompiledRule<'_> {
    fn matches(&self, request: &HttpRequest) -> bool {
        let matcher = &self.rule.matcher;

        if let Some(method) = &matcher.method {
            if !method.eq_ignore_ascii_case(&request.method) {
                return false;
            }
        }

        let path_matches = match (&matcher.path, &self.path) {
            (None, _) => true,
            (Some(PathMatch::Prefix(prefix)), _) => request.path.starts_with(prefix.as_str()),
            (Some(PathMatch::Regex(_)), Some(regex)) => regex.is_match(&request.path),
            (Some(PathMatch::Regex(_)), None) => false,
        };
        if !path_matches {
            return false;
        }

        match &matcher.query {
            Some(query) => request.has_query_param(&query.key, &query.value),
            None => true,
        }
    }
}
