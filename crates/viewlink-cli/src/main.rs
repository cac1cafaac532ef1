mod store;

use anyhow::{Context, Result, bail};
use std::{env, path::Path, process};
use store::JsonFileStore;
use viewlink_config::Config;
use viewlink_engine::dom::parse_document;
use viewlink_engine::dom::text::text_snippet;
use viewlink_engine::view_state::{compose_share_url, parse_query, query_param};
use viewlink_engine::visibility::describe_selection;
use viewlink_engine::{
    AnchorResolver, DividerGroup, Document, FocusSession, FocusStatus, NodeId, PageElementRegistry,
    SelectionSet, ToggleState, ViewStateStore, VisibilityPlanner,
};

const USAGE: &str = "\
Usage:
  viewlink anchor <page.html> <selector>...
  viewlink focus <page.html> <token-or-url> [divider...]
  viewlink state <page.html> [query]
  viewlink share <page.html> <base-url> [selector...]
  viewlink toggle <page.html> <toggle-id>
  viewlink tab <page.html> <group> <tab>
  viewlink reset <page.html>
  viewlink init-config

Selectors are #id or tag:N (the N-th such element in the body, from 0).
Dividers are numbered from 0 in the order focus lists them.";

fn load_page(path: &str) -> Result<Document> {
    let markup = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read page {path}"))?;
    let doc = parse_document(&markup).with_context(|| format!("Failed to parse page {path}"))?;
    log::debug!("loaded {path}: {} nodes", doc.node_count());
    Ok(doc)
}

fn select(doc: &Document, selector: &str) -> Result<Vec<NodeId>> {
    if let Some(id) = selector.strip_prefix('#') {
        let found = doc.elements_by_id(id);
        if found.is_empty() {
            bail!("No element with id {id:?}");
        }
        return Ok(found);
    }
    let Some((tag, index)) = selector.split_once(':') else {
        bail!("Unrecognised selector {selector:?}, expected #id or tag:N");
    };
    let index: usize = index
        .parse()
        .with_context(|| format!("Bad index in selector {selector:?}"))?;
    match doc.elements_by_tag(doc.body(), tag).get(index) {
        Some(&element) => Ok(vec![element]),
        None => bail!("No <{tag}> at position {index}"),
    }
}

/// Elements named by the selectors, with nested picks folded into their container.
fn select_all(doc: &Document, selectors: &[String]) -> Result<Vec<NodeId>> {
    let mut selection = SelectionSet::new();
    for selector in selectors {
        for element in select(doc, selector)? {
            selection.insert(doc, element);
        }
    }
    Ok(selection.as_slice().to_vec())
}

fn describe(doc: &Document, element: NodeId) -> String {
    let tag = doc.tag(element).unwrap_or("#document");
    let snippet = text_snippet(&doc.normalized_text(element));
    match doc.element_id(element) {
        Some(id) => format!("<{tag} id=\"{id}\"> {snippet}"),
        None => format!("<{tag}> {snippet}"),
    }
}

fn open_state(config: &Config) -> ViewStateStore<JsonFileStore> {
    let store = JsonFileStore::new(&config.state_path);
    log::debug!("state file: {}", store.path().display());
    ViewStateStore::new(
        config.view_state.to_view_state(),
        config.view_state.bindings.clone(),
        store,
        config.share.storage_key.clone(),
    )
}

/// Reveal divider groups by their position in the freshly planned list.
fn expand_dividers(session: &mut FocusSession, dividers: &[String]) -> Result<Vec<DividerGroup>> {
    let mut groups = dividers
        .iter()
        .map(|group| {
            group
                .parse::<usize>()
                .with_context(|| format!("Bad divider number {group:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    // Highest first so earlier numbers still point at the same group.
    groups.sort_unstable_by(|a, b| b.cmp(a));
    groups.dedup();

    let mut expanded = Vec::new();
    for group in groups {
        match session.expand(group) {
            Some(divider) => expanded.push(divider),
            None => bail!("No divider {group} in the focused view"),
        }
    }
    Ok(expanded)
}

fn cmd_anchor(doc: &Document, selectors: &[String]) -> Result<()> {
    if selectors.is_empty() {
        bail!("anchor needs at least one selector");
    }
    let elements = select_all(doc, selectors)?;
    println!("{}", describe_selection(doc, doc.body(), &elements));
    Ok(())
}

fn cmd_focus(config: &Config, doc: &Document, token: &str, dividers: &[String]) -> Result<()> {
    // Accept a whole share link as well as a bare token.
    let token = match token.split_once('?') {
        Some((_, query)) => query_param(query, &config.share.focus_param)
            .with_context(|| format!("Link has no {} parameter", config.share.focus_param))?,
        None => token.to_string(),
    };

    let mut session = FocusSession::new(
        AnchorResolver::new(config.resolver),
        VisibilityPlanner::new(config.visibility.clone()),
    );
    let mut notify = |message: &str| eprintln!("warning: {message}");
    let transition = session.enter_from_token(doc, doc.body(), &token, &mut notify);

    if transition.apply.is_none() {
        bail!("None of the shared sections could be found");
    }
    if let FocusStatus::Partial { missing } = transition.status {
        eprintln!("{missing} shared section(s) missing");
    }
    for divider in expand_dividers(&mut session, dividers)? {
        println!(
            "Expanded {} element(s) from {}",
            divider.count(),
            describe(doc, divider.insert_before())
        );
    }
    let Some(plan) = session.active_plan() else {
        bail!("Focus mode ended unexpectedly");
    };

    println!("Focused:");
    for &target in session.targets() {
        println!("  {}", describe(doc, target));
    }
    println!("Hidden: {} element(s)", plan.hidden().len());
    for group in plan.dividers() {
        let after = group
            .next_visible
            .map(|next| describe(doc, next))
            .unwrap_or_else(|| "end of section".to_string());
        println!(
            "  {} hidden from {} up to {after}",
            group.count(),
            describe(doc, group.insert_before())
        );
    }
    Ok(())
}

fn cmd_state(config: &Config, doc: &Document, query: &str) -> Result<()> {
    let registry = PageElementRegistry::scan(doc);
    let mut state = open_state(config);
    if let Some(delta) = parse_query(query) {
        state.apply_url_delta(&delta);
    }

    for toggle in &registry.toggles {
        let current = state
            .state()
            .toggle_state(toggle, config.view_state.default_toggle);
        println!("toggle {toggle}: {current:?}");
    }
    for group in &registry.tab_groups {
        let tab = state.state().tabs.get(group).map_or("-", String::as_str);
        println!("tab {group}: {tab}");
    }
    for name in &registry.placeholders {
        let value = state.state().placeholders.get(name).map_or("-", String::as_str);
        println!("placeholder {name}: {value}");
    }
    println!("{}", state.share_query(&registry));
    Ok(())
}

fn cmd_share(config: &Config, doc: &Document, base: &str, selectors: &[String]) -> Result<()> {
    let registry = PageElementRegistry::scan(doc);
    let mut state = open_state(config);
    if let Some((_, query)) = base.split_once('?')
        && let Some(delta) = parse_query(query)
    {
        state.apply_url_delta(&delta);
    }

    let elements = select_all(doc, selectors)?;
    let token = describe_selection(doc, doc.body(), &elements);
    println!(
        "{}",
        compose_share_url(
            base,
            &config.share.focus_param,
            &token,
            &state.share_query(&registry)
        )
    );
    Ok(())
}

fn cmd_toggle(config: &Config, doc: &Document, toggle: &str) -> Result<()> {
    if !PageElementRegistry::scan(doc).toggles.contains(toggle) {
        log::warn!("toggle {toggle:?} is not on this page");
    }
    let mut state = open_state(config);
    let next: ToggleState = state.cycle_toggle(toggle, config.view_state.default_toggle)?;
    println!("toggle {toggle}: {next:?}");
    Ok(())
}

fn cmd_tab(config: &Config, group: &str, tab: &str) -> Result<()> {
    let mut state = open_state(config);
    state.select_tab(group, tab)?;
    println!("tab {group}: {tab}");
    Ok(())
}

fn cmd_init_config() -> Result<()> {
    let config_path = Config::config_path();
    if config_path.exists() {
        bail!("Config file {} already exists", config_path.display());
    }
    Config::default()
        .save()
        .with_context(|| format!("Failed to write config file {}", config_path.display()))?;
    println!("wrote default config to {}", config_path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() == 2 && args[1] == "init-config" {
        return cmd_init_config();
    }
    if args.len() < 3 {
        eprintln!("{USAGE}");
        process::exit(1);
    }

    let config = Config::load_or_default().with_context(|| {
        format!(
            "Failed to load config file {}",
            Config::config_path().display()
        )
    })?;

    let command = args[1].as_str();
    let doc = load_page(&args[2])?;
    let rest = &args[3..];

    match (command, rest) {
        ("anchor", selectors) => cmd_anchor(&doc, selectors),
        ("focus", [token, dividers @ ..]) => cmd_focus(&config, &doc, token, dividers),
        ("state", []) => cmd_state(&config, &doc, ""),
        ("state", [query]) => cmd_state(&config, &doc, query),
        ("share", [base, selectors @ ..]) => cmd_share(&config, &doc, base, selectors),
        ("toggle", [toggle]) => cmd_toggle(&config, &doc, toggle),
        ("tab", [group, tab]) => cmd_tab(&config, group, tab),
        ("reset", []) => {
            open_state(&config).reset()?;
            println!("view state reset to defaults");
            Ok(())
        }
        _ => {
            eprintln!("{USAGE}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<body><h1 id="top">Guide</h1><div id="sec"><p>One</p><p>Two</p></div></body>"#;

    #[test]
    fn test_select_by_id_and_position() {
        let doc = parse_document(PAGE).unwrap();

        let by_id = select(&doc, "#top").unwrap();
        let by_position = select(&doc, "p:1").unwrap();

        assert_eq!(doc.text_content(by_id[0]), "Guide");
        assert_eq!(doc.text_content(by_position[0]), "Two");
    }

    #[test]
    fn test_bad_selectors_are_errors() {
        let doc = parse_document(PAGE).unwrap();

        assert!(select(&doc, "#missing").is_err());
        assert!(select(&doc, "p:9").is_err());
        assert!(select(&doc, "p:x").is_err());
        assert!(select(&doc, "p").is_err());
    }

    #[test]
    fn test_select_all_folds_nested_picks_into_container() {
        let doc = parse_document(PAGE).unwrap();
        let sec = doc.elements_by_id("sec")[0];
        let to_strings = |selectors: &[&str]| -> Vec<String> {
            selectors.iter().map(|s| s.to_string()).collect()
        };

        let child_first = select_all(&doc, &to_strings(&["p:0", "p:0", "#sec"])).unwrap();
        let container_first = select_all(&doc, &to_strings(&["#sec", "p:1"])).unwrap();
        let siblings = select_all(&doc, &to_strings(&["p:1", "#top", "p:1"])).unwrap();

        assert_eq!(child_first, vec![sec]);
        assert_eq!(container_first, vec![sec]);
        assert_eq!(
            siblings,
            vec![select(&doc, "p:1").unwrap()[0], doc.elements_by_id("top")[0]]
        );
    }

    #[test]
    fn test_expand_dividers_by_listed_position() {
        let doc = parse_document(PAGE).unwrap();
        let target = select(&doc, "p:1").unwrap()[0];
        let mut session = FocusSession::default();
        session.enter(&doc, doc.body(), &[target]);
        let planned = session.active_plan().unwrap().dividers().to_vec();
        assert!(!planned.is_empty());

        let expanded =
            expand_dividers(&mut session, &["0".to_string(), "0".to_string()]).unwrap();

        assert_eq!(expanded, vec![planned[0].clone()]);
        let remaining = session.active_plan().unwrap();
        assert_eq!(remaining.dividers(), &planned[1..]);
        assert!(planned[0]
            .members
            .iter()
            .all(|member| !remaining.hidden().contains(member)));
    }

    #[test]
    fn test_expand_dividers_rejects_bad_numbers() {
        let doc = parse_document(PAGE).unwrap();
        let target = select(&doc, "p:1").unwrap()[0];
        let mut session = FocusSession::default();
        session.enter(&doc, doc.body(), &[target]);

        assert!(expand_dividers(&mut session, &["x".to_string()]).is_err());
        assert!(expand_dividers(&mut session, &["99".to_string()]).is_err());
    }

    #[test]
    fn test_describe() {
        let doc = parse_document(PAGE).unwrap();
        let heading = doc.elements_by_id("top")[0];
        assert_eq!(describe(&doc, heading), "<h1 id=\"top\"> Guide");
    }
}
