use crate::entity::EntityKind;

/// The set of entity kinds a builder session may compose with.
///
/// Think of a registry as the palette offered by one particular builder: the
/// form builder supports all four kinds, but a narrower builder could be
/// constructed over a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    kinds: Vec<EntityKind>,
}

impl Registry {
    /// The standard form-builder palette.
    pub fn standard() -> Self {
        Self::with_kinds(vec![
            EntityKind::IsLeader,
            EntityKind::TextField,
            EntityKind::NumberScale,
            EntityKind::Boolean,
        ])
    }

    pub fn with_kinds(mut kinds: Vec<EntityKind>) -> Self {
        kinds.dedup();
        Self { kinds }
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Registered kinds, in palette order.
    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_holds_all_kinds() {
        let registry = Registry::standard();
        for kind in [
            EntityKind::TextField,
            EntityKind::NumberScale,
            EntityKind::Boolean,
            EntityKind::IsLeader,
        ] {
            assert!(registry.contains(kind));
        }
    }

    #[test]
    fn narrowed_registry_excludes_other_kinds() {
        let registry = Registry::with_kinds(vec![EntityKind::TextField]);
        assert!(registry.contains(EntityKind::TextField));
        assert!(!registry.contains(EntityKind::NumberScale));
    }
}
