//! Planner - refreshes recorded state and decides what to change

use crate::diff::{AttributeDiff, diff_attributes_with, with_defaults};
use crate::resource::Provider;
use crate::types::{Attributes, Declared, ResourceData};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Recorded state, keyed by address
pub type State = BTreeMap<String, ResourceData>;

/// What will happen to one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// Not recorded yet; create it
    Create,
    /// Recorded and drifted; update in place
    Update,
    /// A force-new attribute changed; delete then create
    Replace,
    /// Recorded but no longer declared; delete it
    Delete,
    /// Matches configuration
    NoOp,
}

impl Change {
    /// Plan symbol, as shown in listings
    pub fn symbol(&self) -> &'static str {
        match self {
            Change::Create => "+",
            Change::Update => "~",
            Change::Replace => "-/+",
            Change::Delete => "-",
            Change::NoOp => " ",
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Change::Create => "create",
            Change::Update => "update",
            Change::Replace => "replace",
            Change::Delete => "delete",
            Change::NoOp => "no-op",
        };
        write!(f, "{name}")
    }
}

/// One planned step
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Resource address
    pub address: String,
    /// Resource type name
    pub resource_type: String,
    /// What will happen
    pub change: Change,
    /// Refreshed state, if the address is recorded
    pub current: Option<ResourceData>,
    /// Declared configuration with defaults applied, if declared
    pub config: Option<Attributes>,
    /// Attribute-level differences
    pub diffs: Vec<AttributeDiff>,
}

/// The outcome of planning
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// One entry per declared or recorded address
    pub changes: Vec<PlannedChange>,
    /// State after refresh, with vanished resources removed
    pub refreshed: State,
    /// Addresses whose remote object disappeared
    pub dropped: Vec<String>,
}

impl Plan {
    /// Changes that do something
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.change != Change::NoOp)
    }

    /// Whether applying would change anything
    pub fn has_changes(&self) -> bool {
        self.pending().next().is_some()
    }

    /// Number of changes of one kind
    pub fn count(&self, change: Change) -> usize {
        self.changes.iter().filter(|c| c.change == change).count()
    }

    /// Keep only changes matching a target
    ///
    /// Target format: "type" or "type.label"
    pub fn filter_by_target(mut self, target: Option<&str>) -> Self {
        if let Some(target) = target {
            self.changes.retain(|c| matches_target(&c.address, target));
        }
        self
    }
}

/// Check if an address matches a target filter
fn matches_target(address: &str, target: &str) -> bool {
    address == target
        || address
            .strip_prefix(target)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Refresh `state` and diff it against `declared`.
///
/// Every recorded resource is read back first (in parallel, `jobs` at a
/// time); resources whose remote object is gone are dropped from state.
/// Any other read failure aborts planning.
pub fn plan(provider: &Provider, declared: &[Declared], state: &State, jobs: usize) -> Result<Plan> {
    let mut seen = BTreeSet::new();
    for item in declared {
        if !seen.insert(item.address.as_str()) {
            anyhow::bail!("Duplicate resource address '{}'", item.address);
        }
        provider
            .get(&item.resource_type)?
            .validate(&item.config)
            .with_context(|| format!("Invalid configuration for {}", item.address))?;
    }

    let (refreshed, dropped) = refresh(provider, state, jobs)?;

    let mut changes = Vec::with_capacity(declared.len());
    for item in declared {
        let resource_type = provider.get(&item.resource_type)?;
        let config = with_defaults(&item.config, resource_type.defaults());

        let planned = match refreshed.get(&item.address) {
            None => PlannedChange {
                address: item.address.clone(),
                resource_type: item.resource_type.clone(),
                change: Change::Create,
                current: None,
                config: Some(config),
                diffs: Vec::new(),
            },
            Some(current) => {
                let diffs = diff_attributes_with(
                    &config,
                    &current.attributes,
                    resource_type.force_new(),
                    |key, old, new| resource_type.same_value(key, old, new),
                );
                let change = if current.resource_type != item.resource_type
                    || diffs.iter().any(|d| d.forces_new)
                {
                    Change::Replace
                } else if diffs.is_empty() {
                    Change::NoOp
                } else {
                    Change::Update
                };
                PlannedChange {
                    address: item.address.clone(),
                    resource_type: item.resource_type.clone(),
                    change,
                    current: Some(current.clone()),
                    config: Some(config),
                    diffs,
                }
            }
        };
        changes.push(planned);
    }

    for (address, current) in &refreshed {
        if !seen.contains(address.as_str()) {
            changes.push(PlannedChange {
                address: address.clone(),
                resource_type: current.resource_type.clone(),
                change: Change::Delete,
                current: Some(current.clone()),
                config: None,
                diffs: Vec::new(),
            });
        }
    }

    Ok(Plan {
        changes,
        refreshed,
        dropped,
    })
}

/// Read every recorded resource back from its provider
fn refresh(provider: &Provider, state: &State, jobs: usize) -> Result<(State, Vec<String>)> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    let results: Vec<(String, Result<Option<ResourceData>>)> = pool.install(|| {
        state
            .par_iter()
            .map(|(address, recorded)| {
                let fresh = provider
                    .get(&recorded.resource_type)
                    .and_then(|rt| rt.read(recorded))
                    .with_context(|| format!("Failed to refresh {address}"));
                (address.clone(), fresh)
            })
            .collect()
    });

    let mut refreshed = State::new();
    let mut dropped = Vec::new();
    for (address, fresh) in results {
        match fresh? {
            Some(data) => {
                refreshed.insert(address, data);
            }
            None => {
                log::info!("{address} no longer exists remotely, removing from state");
                dropped.push(address);
            }
        }
    }
    Ok((refreshed, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryType, attrs};

    fn setup() -> (MemoryType, Provider) {
        let memory = MemoryType::new("note").with_force_new(&["kind"]);
        let provider = Provider::new().with(memory.clone());
        (memory, provider)
    }

    fn record(memory: &MemoryType, address: &str, pairs: &[(&str, &str)]) -> State {
        let id = memory.insert(pairs);
        let data = memory.get(&id).unwrap();
        State::from([(address.to_string(), data)])
    }

    #[test]
    fn test_matches_target() {
        assert!(matches_target("note.a", "note"));
        assert!(matches_target("note.a", "note.a"));
        assert!(!matches_target("note.ab", "note.a"));
        assert!(!matches_target("notebook.a", "note"));
    }

    #[test]
    fn test_plan_create() {
        let (_, provider) = setup();
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];
        let plan = plan(&provider, &declared, &State::new(), 2).unwrap();

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].change, Change::Create);
        assert!(plan.has_changes());
    }

    #[test]
    fn test_plan_noop_ignores_computed_attributes() {
        let (memory, provider) = setup();
        let state = record(&memory, "note.a", &[("title", "x")]);
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];

        let plan = plan(&provider, &declared, &state, 2).unwrap();
        assert_eq!(plan.changes[0].change, Change::NoOp);
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_plan_update_and_replace() {
        let (memory, provider) = setup();
        let mut state = record(&memory, "note.a", &[("title", "x"), ("kind", "k1")]);
        state.extend(record(&memory, "note.b", &[("title", "y"), ("kind", "k1")]));
        let declared = vec![
            Declared::new("note", "a", attrs(&[("title", "changed"), ("kind", "k1")])),
            Declared::new("note", "b", attrs(&[("title", "y"), ("kind", "k2")])),
        ];

        let plan = plan(&provider, &declared, &state, 2).unwrap();
        assert_eq!(plan.changes[0].change, Change::Update);
        assert_eq!(plan.changes[0].diffs[0].key, "title");
        assert_eq!(plan.changes[1].change, Change::Replace);
    }

    #[test]
    fn test_plan_delete_undeclared() {
        let (memory, provider) = setup();
        let state = record(&memory, "note.old", &[("title", "x")]);

        let plan = plan(&provider, &[], &state, 2).unwrap();
        assert_eq!(plan.count(Change::Delete), 1);
        assert_eq!(plan.changes[0].address, "note.old");
    }

    #[test]
    fn test_plan_drops_vanished_resources() {
        let (memory, provider) = setup();
        let state = record(&memory, "note.a", &[("title", "x")]);
        let id = state["note.a"].id.clone();
        memory.remove(&id);
        let declared = vec![Declared::new("note", "a", attrs(&[("title", "x")]))];

        let plan = plan(&provider, &declared, &state, 2).unwrap();
        assert_eq!(plan.dropped, vec!["note.a".to_string()]);
        assert!(plan.refreshed.is_empty());
        assert_eq!(plan.changes[0].change, Change::Create);
    }

    #[test]
    fn test_plan_aborts_on_refresh_failure() {
        let (memory, provider) = setup();
        let state = record(&memory, "note.a", &[("title", "x")]);
        memory.fail_reads(true);

        let err = plan(&provider, &[], &state, 2).unwrap_err();
        assert!(format!("{err:#}").contains("note.a"));
    }

    #[test]
    fn test_plan_rejects_duplicates_and_invalid_config() {
        let (_, provider) = setup();
        let dup = vec![
            Declared::new("note", "a", Attributes::new()),
            Declared::new("note", "a", Attributes::new()),
        ];
        assert!(plan(&provider, &dup, &State::new(), 1).is_err());

        let invalid = vec![Declared::new("note", "a", attrs(&[("title", "")]))];
        assert!(plan(&provider, &invalid, &State::new(), 1).is_err());
    }

    #[test]
    fn test_filter_by_target() {
        let (_, provider) = setup();
        let declared = vec![
            Declared::new("note", "a", attrs(&[("title", "x")])),
            Declared::new("note", "b", attrs(&[("title", "y")])),
        ];
        let plan = plan(&provider, &declared, &State::new(), 1)
            .unwrap()
            .filter_by_target(Some("note.b"));
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].address, "note.b");
    }
}
