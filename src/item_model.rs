//! Scatter proxy fed from a source table through a role mapping.
//!
//! Table events and mapping changes never resolve immediately. They mark the
//! proxy dirty, and the host calls [`ItemModelScatterProxy::process_pending`]
//! once per event-loop iteration; a burst of changes therefore costs a single
//! resolve. Lone row edits on single-column tables are applied incrementally
//! instead of re-resolving the whole table.

use std::fmt;
use std::rc::Rc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, trace};

use crate::error::Result;
use crate::item::DataArray;
use crate::mapping::{Role, RoleMapping, RoleSpec};
use crate::proxy::{ProxyEvent, ScatterDataProxy};
use crate::resolver::{self, ResolvedRoles};
use crate::source::{SharedTable, TableEvent};
use crate::tracker::ChangeTracker;

/// Events drained from a table since the last processing pass.
#[derive(Debug, Default)]
struct Drained {
    events: Vec<TableEvent>,
    lagged: bool,
}

/// A [`ScatterDataProxy`] kept in sync with a source table.
pub struct ItemModelScatterProxy {
    proxy: ScatterDataProxy,
    source: Option<SharedTable>,
    table_events: Option<broadcast::Receiver<TableEvent>>,
    mapping: RoleMapping,
    tracker: ChangeTracker,
}

impl fmt::Debug for ItemModelScatterProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemModelScatterProxy")
            .field("proxy", &self.proxy)
            .field("has_source", &self.source.is_some())
            .field("mapping", &self.mapping)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl Default for ItemModelScatterProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemModelScatterProxy {
    /// Create a proxy with no source and an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::with_proxy(ScatterDataProxy::new())
    }

    /// Create a proxy around an existing data proxy.
    #[must_use]
    pub fn with_proxy(proxy: ScatterDataProxy) -> Self {
        Self {
            proxy,
            source: None,
            table_events: None,
            mapping: RoleMapping::new(),
            tracker: ChangeTracker::new(),
        }
    }

    /// Create a proxy bound to a table and mapping. The first resolve runs on
    /// the next [`ItemModelScatterProxy::process_pending`].
    #[must_use]
    pub fn with_source(source: SharedTable, mapping: RoleMapping) -> Self {
        let mut proxy = Self::new();
        proxy.mapping = mapping;
        proxy.set_source(source);
        proxy
    }

    // ------------------------------------------------------------------
    // Source
    // ------------------------------------------------------------------

    /// Bind to a source table and schedule a resolve.
    pub fn set_source(&mut self, source: SharedTable) {
        if self.source.as_ref().is_some_and(|s| Rc::ptr_eq(s, &source)) {
            return;
        }
        debug!("source table attached");
        self.table_events = Some(source.borrow().subscribe());
        self.source = Some(source);
        self.tracker.mark_dirty();
    }

    /// Detach the source table. The next resolve empties the array.
    pub fn clear_source(&mut self) {
        if self.source.take().is_some() {
            debug!("source table detached");
            self.table_events = None;
            self.tracker.mark_dirty();
        }
    }

    /// Current source table.
    #[must_use]
    pub fn source(&self) -> Option<&SharedTable> {
        self.source.as_ref()
    }

    // ------------------------------------------------------------------
    // Mapping
    // ------------------------------------------------------------------

    /// Current role mapping.
    #[must_use]
    pub fn mapping(&self) -> &RoleMapping {
        &self.mapping
    }

    fn mapping_changed(&mut self, changed: bool) -> bool {
        if changed {
            debug!("role mapping changed");
            self.tracker.mark_dirty();
        }
        changed
    }

    /// Replace the whole mapping. Returns whether it changed.
    pub fn set_mapping(&mut self, mapping: RoleMapping) -> bool {
        let changed = self.mapping != mapping;
        if changed {
            self.mapping = mapping;
        }
        self.mapping_changed(changed)
    }

    /// Map or unmap one role. Returns whether the mapping changed.
    pub fn set_role(&mut self, role: Role, spec: Option<RoleSpec>) -> bool {
        let changed = self.mapping.set(role, spec);
        self.mapping_changed(changed)
    }

    /// Set a substitution pattern for one role.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern does not compile.
    pub fn set_role_pattern(&mut self, role: Role, pattern: &str, replace: &str) -> Result<bool> {
        let changed = self.mapping.set_pattern(role, pattern, replace)?;
        Ok(self.mapping_changed(changed))
    }

    /// Map the three position roles at once. Empty names unmap a role.
    pub fn remap(&mut self, x: &str, y: &str, z: &str) -> bool {
        let mut changed = false;
        for (role, name) in [(Role::XPos, x), (Role::YPos, y), (Role::ZPos, z)] {
            let spec = (!name.is_empty()).then(|| RoleSpec::new(name));
            changed |= self.mapping.set(role, spec);
        }
        self.mapping_changed(changed)
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    /// Whether a full resolve is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    /// Number of full resolves run so far.
    #[must_use]
    pub fn resolve_count(&self) -> u64 {
        self.tracker.resolve_count()
    }

    /// Apply table events received since the last call and run the pending
    /// resolve, if any. Returns whether a full resolve ran.
    pub fn process_pending(&mut self) -> bool {
        let drained = self.drain_table_events();
        if drained.lagged || drained.events.len() > 1 {
            trace!(events = drained.events.len(), lagged = drained.lagged, "table event burst");
            self.tracker.mark_dirty();
        } else if let Some(event) = drained.events.into_iter().next() {
            self.apply_event(event);
        }

        if self.tracker.take_pending() {
            self.run_resolve();
            true
        } else {
            false
        }
    }

    /// Resolve immediately, dropping any scheduled resolve.
    pub fn resolve_now(&mut self) {
        // Stale events describe changes the full resolve already covers.
        let _ = self.drain_table_events();
        self.tracker.mark_dirty();
        self.tracker.take_pending();
        self.run_resolve();
    }

    fn drain_table_events(&mut self) -> Drained {
        let mut drained = Drained::default();
        let Some(rx) = self.table_events.as_mut() else {
            return drained;
        };
        loop {
            match rx.try_recv() {
                Ok(event) => drained.events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "table events dropped, forcing full resolve");
                    drained.lagged = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        drained
    }

    /// React to a single table event, either incrementally or by scheduling
    /// a full resolve.
    fn apply_event(&mut self, event: TableEvent) {
        // A full resolve already covers this change.
        if self.tracker.is_pending() {
            return;
        }
        let Some(source) = self.source.as_ref() else {
            return;
        };
        let table = source.borrow();
        if table.column_count() != 1 {
            self.tracker.mark_dirty();
            return;
        }

        let roles = ResolvedRoles::bind(&*table, &self.mapping);
        let applied = match event {
            TableEvent::DataChanged { rows, .. } => {
                let items = resolver::resolve_rows(&*table, &roles, rows.clone(), 0);
                self.proxy.set_items(rows.start, &items).is_ok()
            }
            TableEvent::RowsInserted { rows } if self.proxy.item_count() > 0 => {
                let items = resolver::resolve_rows(&*table, &roles, rows.clone(), 0);
                self.proxy.insert_items(rows.start, &items).is_ok()
            }
            TableEvent::RowsRemoved { rows } => {
                self.proxy.remove_items(rows.start, rows.len()).is_ok()
            }
            _ => false,
        };

        if applied {
            trace!("table change applied incrementally");
        } else {
            self.tracker.mark_dirty();
        }
    }

    fn run_resolve(&mut self) {
        let table = self.source.as_ref().map(|source| source.borrow());
        resolver::resolve_into(&mut self.proxy, table.as_deref(), Some(&self.mapping));
        debug!(
            items = self.proxy.item_count(),
            resolves = self.tracker.resolve_count(),
            "resolve complete"
        );
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    /// The underlying data proxy.
    #[must_use]
    pub fn proxy(&self) -> &ScatterDataProxy {
        &self.proxy
    }

    /// Mutable access for direct edits of manually constructed data.
    pub fn proxy_mut(&mut self) -> &mut ScatterDataProxy {
        &mut self.proxy
    }

    /// Replace the array directly, superseding any scheduled resolve.
    pub fn reset_array(&mut self, array: DataArray) {
        self.tracker.cancel();
        self.proxy.reset_array(array);
    }

    /// Receive future proxy change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProxyEvent> {
        self.proxy.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::DataItem;
    use crate::source::{CellValue, ItemTable, SourceTable};
    use std::cell::RefCell;

    fn drain(rx: &mut broadcast::Receiver<ProxyEvent>) -> Vec<ProxyEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    /// Single-column table with roles `x` and `y`, one row per value.
    fn column_table(values: &[f32]) -> Rc<RefCell<ItemTable>> {
        let mut table = ItemTable::new(["x", "y"], 1);
        for &v in values {
            table.append_row(vec![vec![CellValue::from(v), CellValue::from(v * 2.0)]]);
        }
        table.into_shared()
    }

    fn xy_mapping() -> RoleMapping {
        RoleMapping::positions("x", "y", "")
    }

    fn xs(proxy: &ItemModelScatterProxy) -> Vec<f32> {
        proxy.proxy().array().iter().map(DataItem::x).collect()
    }

    #[test]
    fn test_first_resolve_is_deferred() {
        let table = column_table(&[1.0, 2.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, xy_mapping());
        assert!(proxy.is_pending());
        assert_eq!(proxy.proxy().item_count(), 0);

        assert!(proxy.process_pending());
        assert_eq!(xs(&proxy), vec![1.0, 2.0]);
        assert_eq!(proxy.proxy().item_at(1).map(DataItem::y), Some(4.0));
        assert!(!proxy.process_pending());
    }

    #[test]
    fn test_mapping_burst_resolves_once() {
        let table = column_table(&[1.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, RoleMapping::new());
        proxy.remap("x", "", "");
        proxy.set_role(Role::YPos, Some(RoleSpec::new("y")));
        proxy.set_role(Role::ZPos, Some(RoleSpec::new("x")));
        assert!(proxy.process_pending());
        assert_eq!(proxy.resolve_count(), 1);
        assert_eq!(proxy.proxy().item_at(0).map(DataItem::z), Some(1.0));
    }

    #[test]
    fn test_unchanged_mapping_does_not_schedule() {
        let table = column_table(&[1.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, xy_mapping());
        proxy.process_pending();
        assert!(!proxy.set_mapping(xy_mapping()));
        assert!(!proxy.remap("x", "y", ""));
        assert!(!proxy.is_pending());
    }

    #[test]
    fn test_single_column_edit_is_incremental() {
        let table = column_table(&[1.0, 2.0, 3.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table.clone(), xy_mapping());
        proxy.process_pending();
        let mut rx = proxy.subscribe();

        table.borrow_mut().set_data(1, 0, 0, 20.0).unwrap();
        assert!(!proxy.process_pending());
        assert_eq!(xs(&proxy), vec![1.0, 20.0, 3.0]);
        assert_eq!(drain(&mut rx), vec![ProxyEvent::Changed { start: 1, count: 1 }]);
        assert_eq!(proxy.resolve_count(), 1);
    }

    #[test]
    fn test_single_column_insert_and_remove() {
        let table = column_table(&[1.0, 2.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table.clone(), xy_mapping());
        proxy.process_pending();
        let mut rx = proxy.subscribe();

        let row = table.borrow().row_for_role(0, [9.0f32]);
        table.borrow_mut().insert_rows(1, vec![row]).unwrap();
        proxy.process_pending();
        assert_eq!(xs(&proxy), vec![1.0, 9.0, 2.0]);

        table.borrow_mut().remove_rows(0, 1).unwrap();
        proxy.process_pending();
        assert_eq!(xs(&proxy), vec![9.0, 2.0]);

        assert_eq!(
            drain(&mut rx),
            vec![
                ProxyEvent::Inserted { start: 1, count: 1 },
                ProxyEvent::Removed { start: 0, count: 1 },
            ]
        );
    }

    #[test]
    fn test_insert_into_empty_proxy_resolves_fully() {
        let table = column_table(&[]);
        let mut proxy = ItemModelScatterProxy::with_source(table.clone(), xy_mapping());
        proxy.process_pending();
        table.borrow_mut().append_row(vec![vec![CellValue::from(5.0)]]);
        assert!(proxy.process_pending());
        assert_eq!(xs(&proxy), vec![5.0]);
    }

    #[test]
    fn test_multi_column_change_resolves_fully() {
        let mut table = ItemTable::new(["x"], 2);
        table.append_row(table.row_for_role(0, [1.0f32, 2.0]));
        let table = table.into_shared();
        let mut proxy =
            ItemModelScatterProxy::with_source(table.clone(), RoleMapping::positions("x", "", ""));
        proxy.process_pending();

        table.borrow_mut().set_data(0, 1, 0, 7.0).unwrap();
        assert!(proxy.process_pending());
        assert_eq!(xs(&proxy), vec![1.0, 7.0]);
    }

    /// Apply one table edit and check it forced a full resolve that matches
    /// resolving the table from scratch.
    fn assert_full_resolve(table: &Rc<RefCell<ItemTable>>, edit: impl FnOnce(&mut ItemTable)) {
        let mut proxy = ItemModelScatterProxy::with_source(table.clone(), xy_mapping());
        proxy.process_pending();

        edit(&mut *table.borrow_mut());
        assert!(proxy.process_pending());
        assert_eq!(proxy.resolve_count(), 2);
        let expected = resolver::resolve(&*table.borrow(), &xy_mapping());
        assert_eq!(proxy.proxy().array(), expected.as_slice());
    }

    #[test]
    fn test_layout_change_resolves_fully() {
        let table = column_table(&[1.0, 2.0, 3.0]);
        assert_full_resolve(&table, |t| t.swap_rows(0, 2).unwrap());
        assert_eq!(table.borrow().data(0, 0, 0), CellValue::from(3.0f32));
    }

    #[test]
    fn test_model_reset_resolves_fully() {
        let table = column_table(&[1.0, 2.0]);
        assert_full_resolve(&table, |t| {
            t.reset(vec![vec![vec![CellValue::from(9.0), CellValue::from(18.0)]]]);
        });
        assert_eq!(table.borrow().row_count(), 1);
    }

    #[test]
    fn test_column_insert_resolves_fully() {
        let table = column_table(&[1.0, 2.0]);
        assert_full_resolve(&table, |t| t.insert_columns(1, 1).unwrap());
        assert_eq!(table.borrow().column_count(), 2);
    }

    #[test]
    fn test_column_remove_to_single_column_resolves_fully() {
        let mut table = ItemTable::new(["x", "y"], 2);
        table.append_row(table.row_for_role(0, [1.0f32, 2.0]));
        let table = table.into_shared();
        assert_full_resolve(&table, |t| t.remove_columns(0, 1).unwrap());
        assert_eq!(table.borrow().column_count(), 1);
    }

    #[test]
    fn test_event_burst_resolves_once() {
        let table = column_table(&[1.0, 2.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table.clone(), xy_mapping());
        proxy.process_pending();

        {
            let mut t = table.borrow_mut();
            for i in 0..10 {
                t.append_row(vec![vec![CellValue::from(i as f32)]]);
            }
            t.remove_rows(0, 2).unwrap();
        }
        assert!(proxy.process_pending());
        assert_eq!(proxy.resolve_count(), 2);
        assert_eq!(proxy.proxy().item_count(), table.borrow().row_count());
    }

    #[test]
    fn test_lagged_events_force_resolve() {
        let table = ItemTable::with_event_capacity(["x"], 1, 2).into_shared();
        let mut proxy =
            ItemModelScatterProxy::with_source(table.clone(), RoleMapping::positions("x", "", ""));
        proxy.process_pending();
        for i in 0..5 {
            table.borrow_mut().append_row(vec![vec![CellValue::from(i as f32)]]);
        }
        assert!(proxy.process_pending());
        assert_eq!(proxy.proxy().item_count(), 5);
    }

    #[test]
    fn test_clear_source_empties_array() {
        let table = column_table(&[1.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, xy_mapping());
        proxy.process_pending();
        proxy.clear_source();
        assert!(proxy.process_pending());
        assert_eq!(proxy.proxy().item_count(), 0);
        assert!(proxy.source().is_none());
    }

    #[test]
    fn test_direct_reset_supersedes_pending() {
        let table = column_table(&[1.0, 2.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, xy_mapping());
        proxy.reset_array(vec![DataItem::from_xyz(42.0, 0.0, 0.0)]);
        assert!(!proxy.process_pending());
        assert_eq!(xs(&proxy), vec![42.0]);
    }

    #[test]
    fn test_resolve_now() {
        let table = column_table(&[3.0]);
        let mut proxy = ItemModelScatterProxy::with_source(table, xy_mapping());
        proxy.resolve_now();
        assert!(!proxy.is_pending());
        assert_eq!(xs(&proxy), vec![3.0]);
        assert_eq!(proxy.resolve_count(), 1);
    }

    #[test]
    fn test_role_pattern_schedules_resolve() {
        let mut table = ItemTable::new(["label"], 1);
        table.append_row(vec![vec![CellValue::from("x=12")]]);
        let mut proxy = ItemModelScatterProxy::with_source(
            table.into_shared(),
            RoleMapping::new().with(Role::XPos, "label"),
        );
        proxy.process_pending();
        assert_eq!(xs(&proxy), vec![0.0]);

        assert!(proxy.set_role_pattern(Role::XPos, r"x=(\d+)", "$1").unwrap());
        assert!(proxy.process_pending());
        assert_eq!(xs(&proxy), vec![12.0]);
        assert!(proxy.set_role_pattern(Role::XPos, "(", "").is_err());
    }
}
