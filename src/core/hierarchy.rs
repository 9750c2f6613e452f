//! Location group hierarchy resolution
//!
//! Groups nest other groups and directly own locations. A group's effective
//! location set is the union of its own locations and those of every group
//! reachable through child edges. The source data is not guaranteed to be
//! acyclic, so every traversal tracks visited groups.
//!
//! [`GroupGraph`] is a plain value holding the nodes and all traversal
//! logic. [`HierarchyResolver`] owns one graph per connection and adds the
//! load state machine (`NotLoaded -> Loading -> Loaded`), a time-to-live and
//! locking.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::core::fetch::{decode_records, fetch_all, FetchOptions};
use crate::core::lookup::LoadState;
use crate::core::source::{FetchError, Filter, PageQuery, RecordSource};
use crate::entities::{GroupNode, LocationGroup, LocationGroupLocation, LocationGroupNesting};

/// Default time-to-live of a loaded hierarchy
pub const DEFAULT_TTL_HOURS: i64 = 24;

// =========================================================================
// Group graph
// =========================================================================

/// The group -> group / group -> location graph
#[derive(Debug, Clone, Default)]
pub struct GroupGraph {
    nodes_by_id: HashMap<i64, GroupNode>,
}

impl GroupGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw rows.
    ///
    /// Assignment and nesting rows whose parent group is unknown are dropped.
    pub fn from_records(
        groups: Vec<LocationGroup>,
        assignments: Vec<LocationGroupLocation>,
        nestings: Vec<LocationGroupNesting>,
    ) -> Self {
        let mut graph = GroupGraph::new();
        for group in groups {
            graph.insert_group(group.into());
        }

        let dropped_assignments = assignments
            .into_iter()
            .filter(|a| !graph.assign_location(a.location_group_id, a.location_id))
            .count();
        let dropped_nestings = nestings
            .into_iter()
            .filter(|n| !graph.nest_group(n.location_group_id, n.secondary_location_group_id))
            .count();

        if dropped_assignments + dropped_nestings > 0 {
            debug!(
                dropped_assignments,
                dropped_nestings, "dropped rows referencing unknown groups"
            );
        }
        graph
    }

    /// Add (or replace) a node
    pub fn insert_group(&mut self, node: GroupNode) {
        self.nodes_by_id.insert(node.id, node);
    }

    /// Assign a location directly to a group. Returns false if the group is unknown.
    pub fn assign_location(&mut self, group_id: i64, location_id: i64) -> bool {
        match self.nodes_by_id.get_mut(&group_id) {
            Some(node) => {
                node.direct_location_ids.insert(location_id);
                true
            }
            None => false,
        }
    }

    /// Nest `child_id` under `parent_id`. Returns false if the parent is unknown.
    pub fn nest_group(&mut self, parent_id: i64, child_id: i64) -> bool {
        match self.nodes_by_id.get_mut(&parent_id) {
            Some(node) => {
                node.child_group_ids.insert(child_id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_by_id.is_empty()
    }

    pub fn group(&self, group_id: i64) -> Option<&GroupNode> {
        self.nodes_by_id.get(&group_id)
    }

    /// Every location reachable from the group, each counted once.
    /// Unknown groups resolve to the empty set.
    pub fn resolve_locations_for_group(&self, group_id: i64) -> BTreeSet<i64> {
        self.resolve_locations_for_groups([group_id])
    }

    /// Union of the resolved sets of several groups
    pub fn resolve_locations_for_groups(
        &self,
        group_ids: impl IntoIterator<Item = i64>,
    ) -> BTreeSet<i64> {
        let mut visited = HashSet::new();
        let mut locations = BTreeSet::new();
        for group_id in group_ids {
            self.collect_locations(group_id, &mut visited, &mut locations);
        }
        locations
    }

    /// Size of the resolved location set
    pub fn location_count_for_group(&self, group_id: i64) -> usize {
        self.resolve_locations_for_group(group_id).len()
    }

    /// Every group reachable through child edges, excluding the start group
    pub fn descendant_group_ids(&self, group_id: i64) -> BTreeSet<i64> {
        let mut visited = HashSet::new();
        let mut descendants = BTreeSet::new();
        self.collect_descendants(group_id, &mut visited, &mut descendants);
        descendants.remove(&group_id);
        descendants
    }

    /// Groups that are nobody's child, sorted by description
    pub fn root_groups(&self) -> Vec<&GroupNode> {
        let nested: HashSet<i64> = self
            .nodes_by_id
            .values()
            .flat_map(|n| n.child_group_ids.iter().copied())
            .collect();

        let roots = self
            .nodes_by_id
            .values()
            .filter(|n| !nested.contains(&n.id))
            .collect();
        sorted_by_description(roots)
    }

    /// Case-insensitive substring search over description and org code.
    ///
    /// Matches are sorted by description, then capped at `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&GroupNode> {
        let needle = query.trim().to_lowercase();
        let matches = self
            .nodes_by_id
            .values()
            .filter(|n| {
                needle.is_empty()
                    || n.description.to_lowercase().contains(&needle)
                    || n
                        .org_code
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle))
            })
            .collect();

        let mut sorted = sorted_by_description(matches);
        sorted.truncate(limit);
        sorted
    }

    /// Groups fit for a dropdown (no blank or "-" descriptions), sorted
    pub fn displayable_groups(&self) -> Vec<&GroupNode> {
        sorted_by_description(
            self.nodes_by_id
                .values()
                .filter(|n| n.is_displayable())
                .collect(),
        )
    }

    fn collect_locations(
        &self,
        group_id: i64,
        visited: &mut HashSet<i64>,
        locations: &mut BTreeSet<i64>,
    ) {
        let mut stack = vec![group_id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes_by_id.get(&id) else {
                continue;
            };

            locations.extend(node.direct_location_ids.iter().copied());
            stack.extend(node.child_group_ids.iter().copied());
        }
    }

    fn collect_descendants(
        &self,
        group_id: i64,
        visited: &mut HashSet<i64>,
        descendants: &mut BTreeSet<i64>,
    ) {
        let mut stack = vec![group_id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes_by_id.get(&id) else {
                continue;
            };

            for &child_id in &node.child_group_ids {
                descendants.insert(child_id);
                stack.push(child_id);
            }
        }
    }
}

fn sorted_by_description(mut nodes: Vec<&GroupNode>) -> Vec<&GroupNode> {
    nodes.sort_by_cached_key(|n| (n.description.to_lowercase(), n.id));
    nodes
}

// =========================================================================
// Report-side helpers
// =========================================================================

/// Server-side predicate restricting a report query to the resolved locations.
///
/// `None` when the set is empty: nothing can match, so callers should skip the query.
pub fn location_filter(field: &str, locations: &BTreeSet<i64>) -> Option<Filter> {
    if locations.is_empty() {
        None
    } else {
        Some(Filter::any_of(field, locations.iter().copied()))
    }
}

/// Client-side post-filter for entities whose server-side location filter is unreliable
pub fn filter_by_locations<T, F>(rows: Vec<T>, locations: &BTreeSet<i64>, location_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<i64>,
{
    rows.into_iter()
        .filter(|row| location_of(row).is_some_and(|id| locations.contains(&id)))
        .collect()
}

// =========================================================================
// Resolver
// =========================================================================

struct Loaded {
    graph: GroupGraph,
    state: LoadState,
}

/// Connection-scoped owner of the group graph
pub struct HierarchyResolver {
    inner: RwLock<Loaded>,
    load_lock: Mutex<()>,
    ttl: Duration,
    options: FetchOptions,
}

impl Default for HierarchyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyResolver {
    /// Create an empty resolver with the default 24 hour TTL
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Loaded {
                graph: GroupGraph::new(),
                state: LoadState::NotLoaded,
            }),
            load_lock: Mutex::new(()),
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
            options: FetchOptions::unbounded(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Loaded> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Loaded> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoadState {
        self.read().state
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True unless loaded less than one TTL before `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match self.read().state {
            LoadState::Loaded { at } => now - at >= self.ttl,
            _ => true,
        }
    }

    /// Load the hierarchy unless a fresh copy is already held.
    ///
    /// Fetches groups, then assignments, then nestings, in that order.
    /// On failure the previously held graph (if any) is kept.
    /// Returns true if a fetch was performed.
    pub fn load_hierarchy(&self, source: &dyn RecordSource) -> Result<bool, FetchError> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_stale_at(Utc::now()) {
            debug!("hierarchy cache hit");
            return Ok(false);
        }

        let previous = {
            let mut inner = self.write();
            std::mem::replace(&mut inner.state, LoadState::Loading)
        };

        match self.fetch_graph(source) {
            Ok(graph) => {
                info!(groups = graph.len(), "location hierarchy loaded");
                let mut inner = self.write();
                inner.graph = graph;
                inner.state = LoadState::Loaded { at: Utc::now() };
                Ok(true)
            }
            Err(e) => {
                self.write().state = previous;
                Err(e)
            }
        }
    }

    /// Clear, then load
    pub fn force_reload(&self, source: &dyn RecordSource) -> Result<bool, FetchError> {
        self.clear();
        self.load_hierarchy(source)
    }

    /// Drop the graph. Call before switching connections.
    pub fn clear(&self) {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut inner = self.write();
        inner.graph = GroupGraph::new();
        inner.state = LoadState::NotLoaded;
        debug!("hierarchy cleared");
    }

    fn fetch_graph(&self, source: &dyn RecordSource) -> Result<GroupGraph, FetchError> {
        let groups = fetch_all(
            source,
            &PageQuery::new(LocationGroup::ENTITY_SET)
                .with_filter(Filter::active())
                .with_select(LocationGroup::SELECT)
                .with_order_by("ID"),
            self.options,
        )?;
        let assignments = fetch_all(
            source,
            &PageQuery::new(LocationGroupLocation::ENTITY_SET)
                .with_filter(Filter::active())
                .with_select(LocationGroupLocation::SELECT)
                .with_order_by("LocationGroupID"),
            self.options,
        )?;
        let nestings = fetch_all(
            source,
            &PageQuery::new(LocationGroupNesting::ENTITY_SET)
                .with_filter(Filter::active())
                .with_select(LocationGroupNesting::SELECT)
                .with_order_by("LocationGroupID"),
            self.options,
        )?;

        Ok(GroupGraph::from_records(
            decode_records(LocationGroup::ENTITY_SET, groups),
            decode_records(LocationGroupLocation::ENTITY_SET, assignments),
            decode_records(LocationGroupNesting::ENTITY_SET, nestings),
        ))
    }

    // =====================================================================
    // Queries
    // =====================================================================

    pub fn group(&self, group_id: i64) -> Option<GroupNode> {
        self.read().graph.group(group_id).cloned()
    }

    pub fn group_count(&self) -> usize {
        self.read().graph.len()
    }

    pub fn resolve_locations_for_group(&self, group_id: i64) -> BTreeSet<i64> {
        self.read().graph.resolve_locations_for_group(group_id)
    }

    pub fn resolve_locations_for_groups(
        &self,
        group_ids: impl IntoIterator<Item = i64>,
    ) -> BTreeSet<i64> {
        self.read().graph.resolve_locations_for_groups(group_ids)
    }

    pub fn location_count_for_group(&self, group_id: i64) -> usize {
        self.read().graph.location_count_for_group(group_id)
    }

    pub fn descendant_group_ids(&self, group_id: i64) -> BTreeSet<i64> {
        self.read().graph.descendant_group_ids(group_id)
    }

    /// Direct child groups, sorted by description
    pub fn child_groups(&self, group_id: i64) -> Vec<GroupNode> {
        let inner = self.read();
        let Some(node) = inner.graph.group(group_id) else {
            return Vec::new();
        };
        let children: Vec<GroupNode> = sorted_by_description(
            node.child_group_ids
                .iter()
                .filter_map(|id| inner.graph.group(*id))
                .collect(),
        )
        .into_iter()
        .cloned()
        .collect();
        children
    }

    pub fn root_location_groups(&self) -> Vec<GroupNode> {
        self.read().graph.root_groups().into_iter().cloned().collect()
    }

    pub fn search_location_groups(&self, query: &str, limit: usize) -> Vec<GroupNode> {
        self.read()
            .graph
            .search(query, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Displayable groups for dropdowns
    pub fn all_location_groups(&self) -> Vec<GroupNode> {
        self.read()
            .graph
            .displayable_groups()
            .into_iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::MemorySource;
    use serde_json::{json, Value};

    fn node(id: i64, description: &str, locations: &[i64], children: &[i64]) -> GroupNode {
        let mut node = GroupNode::new(id, description, None);
        node.direct_location_ids.extend(locations.iter().copied());
        node.child_group_ids.extend(children.iter().copied());
        node
    }

    fn graph(nodes: Vec<GroupNode>) -> GroupGraph {
        let mut graph = GroupGraph::new();
        for n in nodes {
            graph.insert_group(n);
        }
        graph
    }

    fn active(mut record: Value) -> Value {
        record["Active"] = json!(true);
        record["Deleted"] = json!(false);
        record
    }

    fn hierarchy_source() -> MemorySource {
        MemorySource::new()
            .with_set(
                "LocationGroup",
                vec![
                    active(json!({"ID": 1, "Description": "Monash", "OrgCode": "MON"})),
                    active(json!({"ID": 2, "Description": "Clayton", "OrgCode": "CL"})),
                    active(json!({"ID": 3, "Description": "Library", "OrgCode": null})),
                ],
            )
            .with_set(
                "LocationGroupLocation",
                vec![
                    active(json!({"LocationGroupID": 1, "LocationID": 100})),
                    active(json!({"LocationGroupID": 2, "LocationID": 200})),
                    active(json!({"LocationGroupID": 3, "LocationID": 300})),
                    active(json!({"LocationGroupID": 3, "LocationID": 301})),
                    // unknown parent, dropped
                    active(json!({"LocationGroupID": 42, "LocationID": 999})),
                ],
            )
            .with_set(
                "LocationGroupSecondaryLocationGroup",
                vec![
                    active(json!({"LocationGroupID": 1, "SecondaryLocationGroupID": 2})),
                    active(json!({"LocationGroupID": 2, "SecondaryLocationGroupID": 3})),
                    active(json!({"LocationGroupID": 42, "SecondaryLocationGroupID": 1})),
                ],
            )
    }

    #[test]
    fn test_cycle_terminates_and_counts_once() {
        let g = graph(vec![
            node(1, "A", &[10, 11], &[2]),
            node(2, "B", &[11, 12], &[1]),
        ]);

        let resolved = g.resolve_locations_for_group(1);
        assert_eq!(resolved, BTreeSet::from([10, 11, 12]));
        assert_eq!(g.location_count_for_group(2), 3);
    }

    #[test]
    fn test_deep_chain_resolves_without_recursion() {
        const DEPTH: i64 = 100_000;
        let g = graph(
            (0..=DEPTH)
                .map(|id| {
                    let children: Vec<i64> = (id < DEPTH).then_some(id + 1).into_iter().collect();
                    node(id, "Level", &[id], &children)
                })
                .collect(),
        );

        assert_eq!(g.location_count_for_group(0), DEPTH as usize + 1);
        assert_eq!(g.descendant_group_ids(0).len(), DEPTH as usize);
        assert_eq!(g.location_count_for_group(DEPTH), 1);
    }

    #[test]
    fn test_self_loop_terminates() {
        let g = graph(vec![node(1, "Loop", &[5], &[1])]);
        assert_eq!(g.resolve_locations_for_group(1), BTreeSet::from([5]));
        assert!(g.descendant_group_ids(1).is_empty());
    }

    #[test]
    fn test_diamond_is_resolved_once() {
        // 1 -> {2, 3} -> 4
        let g = graph(vec![
            node(1, "Top", &[], &[2, 3]),
            node(2, "Left", &[20], &[4]),
            node(3, "Right", &[30], &[4]),
            node(4, "Bottom", &[40, 41], &[]),
        ]);

        assert_eq!(
            g.resolve_locations_for_group(1),
            BTreeSet::from([20, 30, 40, 41])
        );
        assert_eq!(g.descendant_group_ids(1), BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn test_union_of_groups() {
        let g = graph(vec![
            node(1, "G1", &[10, 11], &[]),
            node(2, "G2", &[11, 12], &[]),
        ]);
        assert_eq!(
            g.resolve_locations_for_groups([1, 2]),
            BTreeSet::from([10, 11, 12])
        );
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let g = graph(vec![node(1, "Only", &[10], &[9999])]);
        assert!(g.resolve_locations_for_group(9999).is_empty());
        assert!(g.descendant_group_ids(9999).is_empty());
        // dangling child edge is harmless
        assert_eq!(g.resolve_locations_for_group(1), BTreeSet::from([10]));
    }

    #[test]
    fn test_root_detection() {
        let g = graph(vec![
            node(1, "Parent", &[], &[2, 3]),
            node(2, "ChildA", &[], &[]),
            node(3, "ChildB", &[], &[]),
            node(4, "Standalone", &[], &[]),
        ]);

        let roots: Vec<i64> = g.root_groups().iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![1, 4]);
    }

    #[test]
    fn test_resolved_locations_come_from_group_or_descendants() {
        let g = graph(vec![
            node(1, "A", &[1], &[2, 3]),
            node(2, "B", &[2], &[4]),
            node(3, "C", &[3], &[1]),
            node(4, "D", &[4, 5], &[]),
            node(5, "Unrelated", &[6], &[]),
        ]);

        for start in 1..=5 {
            let mut owners = g.descendant_group_ids(start);
            owners.insert(start);
            let reachable: BTreeSet<i64> = owners
                .iter()
                .filter_map(|id| g.group(*id))
                .flat_map(|n| n.direct_location_ids.iter().copied())
                .collect();
            assert_eq!(g.resolve_locations_for_group(start), reachable);
        }
    }

    #[test]
    fn test_search_matches_description_and_org_code() {
        let mut g = graph(vec![
            node(1, "Clayton Campus", &[], &[]),
            node(2, "Caulfield Campus", &[], &[]),
            node(3, "Peninsula", &[], &[]),
        ]);
        g.insert_group(GroupNode::new(4, "Parkville", Some("PHARM-CLAY".to_string())));

        let hits: Vec<i64> = g.search("clay", 10).iter().map(|n| n.id).collect();
        assert_eq!(hits, vec![1, 4]);

        let capped: Vec<i64> = g.search("campus", 1).iter().map(|n| n.id).collect();
        assert_eq!(capped, vec![2]);

        assert_eq!(g.search("", 10).len(), 4);
        assert!(g.search("zzz", 10).is_empty());
    }

    #[test]
    fn test_displayable_groups_skip_placeholders() {
        let g = graph(vec![
            node(1, "-", &[], &[]),
            node(2, "", &[], &[]),
            node(3, "Real", &[], &[]),
        ]);
        let ids: Vec<i64> = g.displayable_groups().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_location_filter_and_post_filter() {
        let locations = BTreeSet::from([10, 12]);
        assert_eq!(
            location_filter("LocationID", &locations).unwrap().to_odata(),
            "LocationID eq 10 or LocationID eq 12"
        );
        assert!(location_filter("LocationID", &BTreeSet::new()).is_none());

        let rows = vec![(1, Some(10)), (2, Some(11)), (3, None), (4, Some(12))];
        let kept = filter_by_locations(rows, &locations, |r| r.1);
        let ids: Vec<i32> = kept.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_load_builds_graph_in_order() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new();

        assert!(resolver.load_hierarchy(&source).unwrap());

        let order: Vec<String> = source.calls().iter().map(|q| q.entity_set.clone()).collect();
        assert_eq!(
            order,
            vec![
                "LocationGroup",
                "LocationGroupLocation",
                "LocationGroupSecondaryLocationGroup"
            ]
        );
        assert_eq!(
            resolver.resolve_locations_for_group(1),
            BTreeSet::from([100, 200, 300, 301])
        );
        assert_eq!(resolver.location_count_for_group(2), 3);
        assert_eq!(resolver.group_count(), 3);
        assert!(resolver.group(42).is_none());

        let roots: Vec<i64> = resolver.root_location_groups().iter().map(|n| n.id).collect();
        assert_eq!(roots, vec![1]);
        let children: Vec<i64> = resolver.child_groups(1).iter().map(|n| n.id).collect();
        assert_eq!(children, vec![2]);
    }

    #[test]
    fn test_load_queries_page_in_a_stable_order() {
        let source = hierarchy_source();
        HierarchyResolver::new().load_hierarchy(&source).unwrap();

        let order_by: Vec<Option<String>> = source.calls().into_iter().map(|q| q.order_by).collect();
        assert_eq!(
            order_by,
            vec![
                Some("ID".to_string()),
                Some("LocationGroupID".to_string()),
                Some("LocationGroupID".to_string()),
            ]
        );
    }

    #[test]
    fn test_concurrent_loads_fetch_once() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| resolver.load_hierarchy(&source).unwrap());
            }
        });

        assert_eq!(source.call_count("LocationGroup"), 1);
        assert_eq!(source.total_calls(), 3);
        assert_eq!(resolver.location_count_for_group(1), 4);
    }

    #[test]
    fn test_second_load_within_ttl_is_a_cache_hit() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new();

        resolver.load_hierarchy(&source).unwrap();
        assert!(!resolver.load_hierarchy(&source).unwrap());
        assert_eq!(source.total_calls(), 3);
    }

    #[test]
    fn test_expired_ttl_refetches() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new().with_ttl(Duration::zero());

        resolver.load_hierarchy(&source).unwrap();
        assert!(resolver.load_hierarchy(&source).unwrap());
        assert_eq!(source.call_count("LocationGroup"), 2);
    }

    #[test]
    fn test_staleness_boundary() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new();
        assert!(resolver.is_stale_at(Utc::now()));

        resolver.load_hierarchy(&source).unwrap();
        let LoadState::Loaded { at } = resolver.state() else {
            panic!("expected loaded state");
        };
        assert!(!resolver.is_stale_at(at + Duration::hours(23)));
        assert!(resolver.is_stale_at(at + Duration::hours(24)));
    }

    #[test]
    fn test_force_reload_and_clear() {
        let source = hierarchy_source();
        let resolver = HierarchyResolver::new();

        resolver.load_hierarchy(&source).unwrap();
        assert!(resolver.force_reload(&source).unwrap());
        assert_eq!(source.call_count("LocationGroup"), 2);

        resolver.clear();
        assert_eq!(resolver.state(), LoadState::NotLoaded);
        assert!(resolver.resolve_locations_for_group(1).is_empty());
    }

    #[test]
    fn test_failed_load_keeps_previous_graph() {
        let good = hierarchy_source();
        let resolver = HierarchyResolver::new().with_ttl(Duration::zero());
        resolver.load_hierarchy(&good).unwrap();

        let broken = hierarchy_source().failing("LocationGroupLocation");
        assert!(resolver.load_hierarchy(&broken).is_err());

        assert!(resolver.state().is_loaded());
        assert_eq!(resolver.location_count_for_group(1), 4);
    }

    #[test]
    fn test_failed_first_load_stays_empty() {
        let broken = hierarchy_source().failing("LocationGroup");
        let resolver = HierarchyResolver::new();

        assert!(resolver.load_hierarchy(&broken).is_err());
        assert_eq!(resolver.state(), LoadState::NotLoaded);
        assert_eq!(broken.total_calls(), 1);
    }
}
