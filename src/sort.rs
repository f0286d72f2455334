use std::fmt;

/// Sort direction for a single field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// A single `(field, direction)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortDescription {
    pub field: String,
    pub direction: SortDirection,
}

impl SortDescription {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// An ordered list of sort descriptions.
///
/// Many loaders only honor the first entry, but the model keeps an ordered
/// sequence so multi-key backends can be driven through the same surface.
/// Loads capture a clone of the active specification as their
/// snapshot; a completed load whose snapshot no longer matches the live
/// specification is discarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortSpecification {
    descriptions: Vec<SortDescription>,
}

impl SortSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    /// A specification with a single active key.
    pub fn single(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            descriptions: vec![SortDescription::new(field, direction)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    /// The primary (first) sort description, if any.
    pub fn primary(&self) -> Option<&SortDescription> {
        self.descriptions.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortDescription> {
        self.descriptions.iter()
    }

    pub fn push(&mut self, description: SortDescription) {
        self.descriptions.push(description);
    }

    pub fn clear(&mut self) {
        self.descriptions.clear();
    }

    /// The column-click rule: toggling the currently sorted field flips its
    /// direction; toggling any other field resets the specification to that
    /// field, ascending. Exactly one key is active afterwards.
    ///
    /// Returns the direction now active on `field`.
    pub fn toggled(&self, field: &str) -> (Self, SortDirection) {
        let direction = match self.primary() {
            Some(primary) if primary.field == field => primary.direction.toggled(),
            _ => SortDirection::Ascending,
        };
        (Self::single(field, direction), direction)
    }
}

impl fmt::Display for SortSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.descriptions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let dir = match d.direction {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            write!(f, "{} {dir}", d.field)?;
        }
        Ok(())
    }
}
