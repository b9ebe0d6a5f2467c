//! Role mappings from chart attributes to source table roles.

use std::borrow::Cow;
use std::fmt;

use regex::Regex;

use crate::error::Result;

/// A chart attribute that can be fed from a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// X coordinate.
    XPos,
    /// Y coordinate.
    YPos,
    /// Z coordinate.
    ZPos,
    /// Item orientation.
    Rotation,
    /// Auxiliary item value.
    Value,
}

impl Role {
    /// Every role, in storage order.
    pub const ALL: [Role; 5] = [Role::XPos, Role::YPos, Role::ZPos, Role::Rotation, Role::Value];

    pub(crate) const fn slot(self) -> usize {
        match self {
            Role::XPos => 0,
            Role::YPos => 1,
            Role::ZPos => 2,
            Role::Rotation => 3,
            Role::Value => 4,
        }
    }

    /// Short identifier used in configuration and logs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Role::XPos => "x_pos",
            Role::YPos => "y_pos",
            Role::ZPos => "z_pos",
            Role::Rotation => "rotation",
            Role::Value => "value",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where a role's data comes from: a table role name plus an optional
/// substitution applied to the cell text before numeric parsing.
///
/// Replacement strings use `regex` syntax (`$1`, `${name}`).
#[derive(Debug, Clone)]
pub struct RoleSpec {
    name: String,
    pattern: Option<Regex>,
    replace: String,
}

impl RoleSpec {
    /// Map to a table role by name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: None,
            replace: String::new(),
        }
    }

    /// Add a substitution pattern.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str, replace: impl Into<String>) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        self.replace = replace.into();
        Ok(self)
    }

    /// Table role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substitution pattern, if any.
    #[must_use]
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Replacement template.
    #[must_use]
    pub fn replace(&self) -> &str {
        &self.replace
    }

    /// Apply the substitution to cell text. Text is returned unchanged when
    /// there is no pattern or the pattern does not match.
    #[must_use]
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.pattern {
            Some(re) => re.replace_all(text, self.replace.as_str()),
            None => Cow::Borrowed(text),
        }
    }
}

impl PartialEq for RoleSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.replace == other.replace
            && self.pattern.as_ref().map(Regex::as_str) == other.pattern.as_ref().map(Regex::as_str)
    }
}

impl From<&str> for RoleSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoleSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Association of chart roles to table roles. Unmapped roles resolve to
/// default values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleMapping {
    specs: [Option<RoleSpec>; 5],
}

impl RoleMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping for the three position roles. Empty names leave a
    /// role unmapped.
    #[must_use]
    pub fn positions(x: &str, y: &str, z: &str) -> Self {
        let mut mapping = Self::new();
        for (role, name) in [(Role::XPos, x), (Role::YPos, y), (Role::ZPos, z)] {
            if !name.is_empty() {
                mapping.set(role, Some(RoleSpec::new(name)));
            }
        }
        mapping
    }

    /// Builder form of [`RoleMapping::set`].
    #[must_use]
    pub fn with(mut self, role: Role, spec: impl Into<RoleSpec>) -> Self {
        self.set(role, Some(spec.into()));
        self
    }

    /// Replace a role's spec. Returns whether the mapping changed.
    pub fn set(&mut self, role: Role, spec: Option<RoleSpec>) -> bool {
        let slot = &mut self.specs[role.slot()];
        if *slot == spec {
            return false;
        }
        *slot = spec;
        true
    }

    /// Set a substitution pattern on an already mapped role, or map the role
    /// by an empty name if it was unmapped. Returns whether the mapping changed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] if the pattern does not compile;
    /// the mapping is left unchanged.
    pub fn set_pattern(&mut self, role: Role, pattern: &str, replace: &str) -> Result<bool> {
        let name = self.get(role).map(|s| s.name().to_string()).unwrap_or_default();
        let spec = RoleSpec::new(name).with_pattern(pattern, replace)?;
        Ok(self.set(role, Some(spec)))
    }

    /// Spec for a role, if mapped.
    #[must_use]
    pub fn get(&self, role: Role) -> Option<&RoleSpec> {
        self.specs[role.slot()].as_ref()
    }

    /// Check whether a role is mapped.
    #[must_use]
    pub fn is_mapped(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    /// Iterate over mapped roles.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &RoleSpec)> {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|spec| (role, spec)))
    }

    /// Check whether no role is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.iter().all(Option::is_none)
    }
}
