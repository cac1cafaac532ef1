//! Query-string codec for view state.
//!
//! Inbound links are read as a sparse [`ViewStateDelta`]; outbound links are
//! written exhaustively for the identifiers present on the page. Each list item
//! and each side of a `key:value` pair is percent-encoded on its own, while the
//! `,` and `:` separators stay literal.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use super::{PageElementRegistry, PlaceholderBindings, ViewState, ViewStateDelta};

pub const PARAM_SHOW: &str = "t-show";
pub const PARAM_PEEK: &str = "t-peek";
pub const PARAM_HIDE: &str = "t-hide";
pub const PARAM_TABS: &str = "tabs";
pub const PARAM_PLACEHOLDERS: &str = "ph";

const MANAGED_PARAMS: [&str; 5] = [
    PARAM_SHOW,
    PARAM_PEEK,
    PARAM_HIDE,
    PARAM_TABS,
    PARAM_PLACEHOLDERS,
];

fn is_managed(name: &str) -> bool {
    MANAGED_PARAMS.contains(&name)
}

/// `name=value` pairs of a query string, values still encoded.
fn params(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
}

fn decode(item: &str) -> Cow<'_, str> {
    urlencoding::decode(item).unwrap_or(Cow::Borrowed(item))
}

fn decode_list(value: &str, into: &mut BTreeSet<String>) {
    into.extend(
        value
            .split(',')
            .filter(|item| !item.is_empty())
            .map(|item| decode(item).into_owned()),
    );
}

fn decode_pairs(param: &str, value: &str, into: &mut BTreeMap<String, String>) {
    for item in value.split(',').filter(|item| !item.is_empty()) {
        match item.split_once(':') {
            Some((key, val)) if !key.is_empty() => {
                into.insert(decode(key).into_owned(), decode(val).into_owned());
            }
            _ => log::trace!("dropping malformed {param} entry {item:?}"),
        }
    }
}

/// Read the managed parameters of `query` as a sparse update.
///
/// Returns `None` when the query mentions none of them, which is different
/// from a query that mentions them with empty values.
pub fn parse_query(query: &str) -> Option<ViewStateDelta> {
    let mut delta = ViewStateDelta::default();
    for (name, value) in params(query) {
        match name {
            PARAM_SHOW => decode_list(value, delta.shown_toggles.get_or_insert_default()),
            PARAM_PEEK => decode_list(value, delta.peek_toggles.get_or_insert_default()),
            PARAM_HIDE => decode_list(value, delta.hidden_toggles.get_or_insert_default()),
            PARAM_TABS => decode_pairs(name, value, delta.tabs.get_or_insert_default()),
            PARAM_PLACEHOLDERS => {
                decode_pairs(name, value, delta.placeholders.get_or_insert_default())
            }
            _ => {}
        }
    }
    (!delta.is_empty()).then_some(delta)
}

/// Decoded value of the first `name` parameter in `query`.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    params(query)
        .find(|(param, _)| *param == name)
        .map(|(_, value)| decode(value).into_owned())
}

fn encode_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|item| urlencoding::encode(item).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (&'a String, &'a String)>) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!("{}:{}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Encode `state` as an absolute query for the page described by `registry`.
///
/// Every toggle on the page lands in exactly one of `t-show`, `t-peek` or
/// `t-hide`, so the recipient's own defaults cannot change what they see.
/// Identifiers not on the page, and placeholders bound to a tab group, are
/// left out.
pub fn generate_share_query(
    state: &ViewState,
    registry: &PageElementRegistry,
    bindings: &PlaceholderBindings,
) -> String {
    let shown: Vec<&String> = registry
        .toggles
        .iter()
        .filter(|id| state.shown_toggles.contains(*id))
        .collect();
    let peek: Vec<&String> = registry
        .toggles
        .iter()
        .filter(|id| !state.shown_toggles.contains(*id) && state.peek_toggles.contains(*id))
        .collect();
    let hidden: Vec<&String> = registry
        .toggles
        .iter()
        .filter(|id| !state.shown_toggles.contains(*id) && !state.peek_toggles.contains(*id))
        .collect();
    let tabs: Vec<(&String, &String)> = state
        .tabs
        .iter()
        .filter(|(group, _)| registry.tab_groups.contains(*group))
        .collect();
    let placeholders: Vec<(&String, &String)> = state
        .placeholders
        .iter()
        .filter(|(name, _)| registry.placeholders.contains(*name) && !bindings.is_bound(name))
        .collect();

    let mut parts = Vec::new();
    for (param, ids) in [(PARAM_SHOW, shown), (PARAM_PEEK, peek), (PARAM_HIDE, hidden)] {
        if !ids.is_empty() {
            parts.push(format!("{param}={}", encode_list(ids)));
        }
    }
    if !tabs.is_empty() {
        parts.push(format!("{PARAM_TABS}={}", encode_pairs(tabs)));
    }
    if !placeholders.is_empty() {
        parts.push(format!("{PARAM_PLACEHOLDERS}={}", encode_pairs(placeholders)));
    }
    parts.join("&")
}

/// `query` without any managed parameter, foreign parameters kept in order.
pub fn strip_managed_params(query: &str) -> String {
    retain_params(query, |name| !is_managed(name))
}

fn retain_params(query: &str, keep: impl Fn(&str) -> bool) -> String {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|param| !param.is_empty())
        .filter(|param| keep(param.split_once('=').map_or(*param, |(name, _)| name)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build a share link from `base`, a focus token and a generated state query.
///
/// Managed and focus parameters already on `base` are replaced; any other
/// parameters and the fragment are kept.
pub fn compose_share_url(
    base: &str,
    focus_param: &str,
    focus_token: &str,
    state_query: &str,
) -> String {
    let (without_fragment, fragment) = match base.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (base, None),
    };
    let (path, existing) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));

    let mut parts = Vec::new();
    let foreign = retain_params(&strip_managed_params(existing), |name| name != focus_param);
    if !foreign.is_empty() {
        parts.push(foreign);
    }
    if !focus_token.is_empty() {
        parts.push(format!("{focus_param}={}", urlencoding::encode(focus_token)));
    }
    let state_query = state_query.trim_start_matches('?');
    if !state_query.is_empty() {
        parts.push(state_query.to_string());
    }

    let mut url = path.to_string();
    if !parts.is_empty() {
        url.push('?');
        url.push_str(&parts.join("&"));
    }
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}
