//! Resolution of a source table into a data array.
//!
//! A resolve pass looks every mapped role up once in the table's role
//! registry, then walks the table in row-major order building one item per
//! cell. Unresolved roles, empty tables and unparsable text degrade to
//! default values; a resolve never fails.

use std::ops::Range;

use glam::{Quat, Vec3};
use tracing::debug;

use crate::item::{DataArray, DataItem};
use crate::mapping::{Role, RoleMapping, RoleSpec};
use crate::proxy::ScatterDataProxy;
use crate::source::{CellValue, SourceTable};

/// A mapped role bound to its index in a table's role registry.
#[derive(Debug, Clone, Copy)]
pub struct BoundRole<'m> {
    /// Index in the table's role registry.
    pub index: usize,
    /// The spec the role was resolved from.
    pub spec: &'m RoleSpec,
}

/// Roles of a mapping bound against one table. Roles that are unmapped or
/// whose name is missing from the table are absent.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRoles<'m> {
    bound: [Option<BoundRole<'m>>; 5],
}

impl<'m> ResolvedRoles<'m> {
    /// Bind every mapped role against the table's role registry.
    #[must_use]
    pub fn bind(table: &dyn SourceTable, mapping: &'m RoleMapping) -> Self {
        let mut resolved = Self::default();
        for (role, spec) in mapping.iter() {
            match table.role_index(spec.name()) {
                Some(index) => resolved.bound[role.slot()] = Some(BoundRole { index, spec }),
                None => {
                    debug!(%role, name = spec.name(), "role not found, defaulting to zero");
                }
            }
        }
        resolved
    }

    /// Binding for a role, if it resolved.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<BoundRole<'m>> {
        self.bound[role.slot()]
    }

    /// Number of roles that resolved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bound.iter().flatten().count()
    }

    /// Check whether no role resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derive a number from a cell, applying the role's pattern to the cell
/// text first when one is set.
#[must_use]
pub fn cell_number(value: &CellValue, spec: &RoleSpec) -> f32 {
    if spec.pattern().is_none() {
        return value.to_f32();
    }
    let text = value.to_text();
    spec.apply(&text).trim().parse::<f32>().unwrap_or(0.0)
}

/// Derive an orientation from a cell.
///
/// Accepts rotation values directly, text `"w,x,y,z"` as quaternion
/// components, or `"@angle,x,y,z"` as an angle in degrees about an axis.
#[must_use]
pub fn cell_rotation(value: &CellValue, spec: &RoleSpec) -> Option<Quat> {
    if let CellValue::Rotation(q) = value {
        if spec.pattern().is_none() {
            return Some(*q);
        }
    }
    let text = value.to_text();
    let text = spec.apply(&text);
    let text = text.trim();
    let (axis_angle, body) = match text.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let parts: Vec<f32> = body
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    let [first, x, y, z] = parts.as_slice() else {
        return None;
    };
    if axis_angle {
        let axis = Vec3::new(*x, *y, *z).try_normalize()?;
        Some(Quat::from_axis_angle(axis, first.to_radians()))
    } else {
        Some(Quat::from_xyzw(*x, *y, *z, *first))
    }
}

/// Build the item for one table cell.
#[must_use]
pub fn resolve_item(
    table: &dyn SourceTable,
    roles: &ResolvedRoles<'_>,
    row: usize,
    column: usize,
) -> DataItem {
    let number = |role: Role| {
        roles
            .get(role)
            .map_or(0.0, |b| cell_number(&table.data(row, column, b.index), b.spec))
    };
    let mut item = DataItem::from_xyz(number(Role::XPos), number(Role::YPos), number(Role::ZPos))
        .with_value(number(Role::Value));
    if let Some(rotation) = roles
        .get(Role::Rotation)
        .and_then(|b| cell_rotation(&table.data(row, column, b.index), b.spec))
    {
        item = item.with_rotation(rotation);
    }
    item
}

/// Build items for a run of rows in one column.
#[must_use]
pub fn resolve_rows(
    table: &dyn SourceTable,
    roles: &ResolvedRoles<'_>,
    rows: Range<usize>,
    column: usize,
) -> DataArray {
    rows.map(|row| resolve_item(table, roles, row, column)).collect()
}

/// Resolve a whole table into a new array in row-major order.
#[must_use]
pub fn resolve(table: &dyn SourceTable, mapping: &RoleMapping) -> DataArray {
    let roles = ResolvedRoles::bind(table, mapping);
    let (rows, columns) = (table.row_count(), table.column_count());
    debug!(rows, columns, resolved_roles = roles.len(), "resolving table");

    let mut array = DataArray::with_capacity(rows * columns);
    for row in 0..rows {
        for column in 0..columns {
            array.push(resolve_item(table, &roles, row, column));
        }
    }
    array
}

/// Resolve a possibly absent table or mapping. Either being absent yields
/// an empty array.
#[must_use]
pub fn resolve_source(table: Option<&dyn SourceTable>, mapping: Option<&RoleMapping>) -> DataArray {
    match (table, mapping) {
        (Some(table), Some(mapping)) => resolve(table, mapping),
        _ => DataArray::new(),
    }
}

/// Resolve and swap the result into a proxy in one step.
pub fn resolve_into(
    proxy: &mut ScatterDataProxy,
    table: Option<&dyn SourceTable>,
    mapping: Option<&RoleMapping>,
) {
    proxy.reset_array(resolve_source(table, mapping));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ItemTable;
    use approx::assert_relative_eq;

    fn grid() -> ItemTable {
        let mut table = ItemTable::new(["colA", "colB"], 3);
        for r in 0..2 {
            let row = (0..3)
                .map(|c| {
                    vec![
                        CellValue::from(f64::from(r * 10 + c)),
                        CellValue::from(f64::from(r * 10 + c) + 0.5),
                    ]
                })
                .collect();
            table.append_row(row);
        }
        table
    }

    #[test]
    fn test_resolve_row_major_with_unmapped_z() {
        let table = grid();
        let mapping = RoleMapping::positions("colA", "colB", "");
        let array = resolve(&table, &mapping);

        assert_eq!(array.len(), 6);
        let expected = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        for (item, x) in array.iter().zip(expected) {
            assert_eq!(item.x(), x);
            assert_eq!(item.y(), x + 0.5);
            assert_eq!(item.z(), 0.0);
            assert_eq!(item.rotation(), None);
        }
    }

    #[test]
    fn test_unknown_role_name_defaults_to_zero() {
        let table = grid();
        let mapping = RoleMapping::positions("colA", "missing", "colB");
        let array = resolve(&table, &mapping);
        assert!(array.iter().all(|item| item.y() == 0.0));
        assert_eq!(array[1].z(), 1.5);
    }

    #[test]
    fn test_absent_inputs_yield_empty() {
        let table = grid();
        let mapping = RoleMapping::positions("colA", "colB", "");
        let source: &dyn SourceTable = &table;
        assert!(resolve_source(None, Some(&mapping)).is_empty());
        assert!(resolve_source(Some(source), None).is_empty());
        assert_eq!(resolve_source(Some(source), Some(&mapping)).len(), 6);
    }

    #[test]
    fn test_zero_columns_yield_empty() {
        let mut table = ItemTable::new(["colA"], 0);
        table.append_row(Vec::new());
        let mapping = RoleMapping::positions("colA", "", "");
        assert!(resolve(&table, &mapping).is_empty());
    }

    #[test]
    fn test_bind_counts_resolved_roles() {
        let table = grid();
        let mapping = RoleMapping::positions("colA", "nope", "colB");
        let roles = ResolvedRoles::bind(&table, &mapping);
        assert_eq!(roles.len(), 2);
        assert!(roles.get(Role::YPos).is_none());
        assert_eq!(roles.get(Role::ZPos).map(|b| b.index), Some(1));
    }

    #[test]
    fn test_cell_number_with_pattern() {
        let spec = RoleSpec::new("t").with_pattern(r"(\d+),(\d+) km", "$1.$2").unwrap();
        assert_relative_eq!(cell_number(&CellValue::from("12,5 km"), &spec), 12.5);
        // No match: raw text parsed as-is.
        assert_relative_eq!(cell_number(&CellValue::from("7"), &spec), 7.0);
        assert_relative_eq!(cell_number(&CellValue::from("junk"), &spec), 0.0);
    }

    #[test]
    fn test_cell_rotation_forms() {
        let spec = RoleSpec::new("rot");
        assert_eq!(cell_rotation(&CellValue::from(Quat::IDENTITY), &spec), Some(Quat::IDENTITY));
        assert_eq!(
            cell_rotation(&CellValue::from("1, 0, 0, 0"), &spec),
            Some(Quat::from_xyzw(0.0, 0.0, 0.0, 1.0))
        );

        let q = cell_rotation(&CellValue::from("@90,0,0,1"), &spec).unwrap();
        let expected = Quat::from_axis_angle(Vec3::Z, 90f32.to_radians());
        assert_relative_eq!(q.z, expected.z, epsilon = 1e-6);
        assert_relative_eq!(q.w, expected.w, epsilon = 1e-6);

        assert_eq!(cell_rotation(&CellValue::from("@90,0,0,0"), &spec), None);
        assert_eq!(cell_rotation(&CellValue::from("1,2"), &spec), None);
        assert_eq!(cell_rotation(&CellValue::Null, &spec), None);
    }

    #[test]
    fn test_rotation_and_value_roles() {
        let mut table = ItemTable::new(["x", "rot", "size"], 1);
        table.append_row(vec![vec![
            CellValue::from(1.0),
            CellValue::from("@180,0,1,0"),
            CellValue::from("2.5"),
        ]]);
        let mapping = RoleMapping::new()
            .with(Role::XPos, "x")
            .with(Role::Rotation, "rot")
            .with(Role::Value, "size");
        let array = resolve(&table, &mapping);
        assert_eq!(array.len(), 1);
        assert!(array[0].rotation().is_some());
        assert_eq!(array[0].value(), 2.5);
    }

    #[test]
    fn test_resolve_into_emits_reset() {
        let table = grid();
        let mapping = RoleMapping::positions("colA", "colB", "");
        let mut proxy = ScatterDataProxy::new();
        let mut rx = proxy.subscribe();
        resolve_into(&mut proxy, Some(&table as &dyn SourceTable), Some(&mapping));
        assert_eq!(proxy.item_count(), 6);
        assert_eq!(rx.try_recv().unwrap(), crate::proxy::ProxyEvent::Reset);
    }
}
