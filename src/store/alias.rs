//! Alias bookkeeping
//!
//! An alias contributes three kinds of rows:
//!
//! - `alias`: normalized target DN -> alias id, always
//! - `oneAlias`: alias parent -> target id, unless alias and target are
//!   siblings
//! - `subAlias`: each ancestor of the alias -> target id, unless the target
//!   already lies below that ancestor
//!
//! The visibility rows need a live target; an alias whose target has been
//! deleted or renamed away keeps only its `alias` row until an entry
//! appears at the target DN again.

use super::engine::{Layout, Store};
use super::errors::{StoreError, StoreResult};
use super::id::EntryId;
use super::indices::{IndexRow, Row};
use super::rows::Resolver;
use crate::dn::Dn;
use crate::entry::Attributes;
use crate::index::IndexKey;
use crate::schema::{ALIASED_OBJECT_NAME_OID, ALIAS_OBJECT_CLASS, OBJECT_CLASS_OID};

/// True if the attributes mark an alias entry
pub(crate) fn is_alias(attributes: &Attributes) -> bool {
    let alias = IndexKey::from_string(ALIAS_OBJECT_CLASS);
    attributes
        .get(OBJECT_CLASS_OID)
        .is_some_and(|oc| oc.contains(&alias))
}

impl Store {
    /// Normalized `aliasedObjectName` of an alias
    pub(crate) fn alias_target(&self, alias_dn: &Dn, attributes: &Attributes) -> StoreResult<Dn> {
        let raw = attributes
            .get(ALIASED_OBJECT_NAME_OID)
            .and_then(|a| a.first())
            .ok_or_else(|| {
                StoreError::alias_problem(alias_dn.up_name(), "aliasedObjectName is missing")
            })?;
        Dn::parse(raw)
            .and_then(|dn| dn.normalize(&self.schema))
            .map_err(|e| StoreError::alias_problem(alias_dn.up_name(), e.to_string()))
    }

    /// Alias rows of the entry; empty unless it is an alias
    pub(crate) fn alias_rows(&self, layout: &Layout, resolve: &Resolver<'_>) -> StoreResult<Vec<Row>> {
        let attributes = &layout.record.attributes;
        if !is_alias(attributes) {
            return Ok(Vec::new());
        }

        let target = self.alias_target(&layout.dn, attributes)?;
        let mut rows = vec![(IndexRow::Alias(target.norm_name()), layout.id)];
        let Some(target_id) = resolve(&target) else {
            return Ok(rows);
        };

        let parent = &layout.record.parent;
        if !parent.is_context() && target.parent() != layout.dn.parent() {
            rows.push((IndexRow::OneAlias(parent.parent_id()), target_id));
        }
        for (depth, ancestor) in layout.ancestors.iter().enumerate() {
            let ancestor_dn = Dn::from_normalized(layout.dn.rdns()[depth + 1..].to_vec());
            if !target.is_descendant_of(&ancestor_dn) {
                rows.push((IndexRow::SubAlias(*ancestor), target_id));
            }
        }
        Ok(rows)
    }

    /// Validates an alias about to be written at `alias_dn`.
    ///
    /// Rejected with `aliasProblem`: an alias to itself, to one of its
    /// ancestors, to an entry outside the partition, to a missing entry,
    /// or to another alias.
    pub(crate) fn check_alias(
        &self,
        alias_dn: &Dn,
        attributes: &Attributes,
        resolve: &Resolver<'_>,
    ) -> StoreResult<EntryId> {
        let problem = |reason: &str| StoreError::alias_problem(alias_dn.up_name(), reason);
        let target = self.alias_target(alias_dn, attributes)?;

        if target == *alias_dn {
            return Err(problem("an alias cannot point at itself"));
        }
        if alias_dn.is_descendant_of(&target) {
            return Err(problem("an alias cannot point at one of its ancestors"));
        }
        if !target.is_descendant_or_self(&self.suffix) {
            return Err(problem("the target is outside the partition"));
        }
        let target_id = resolve(&target).ok_or_else(|| problem("the target does not exist"))?;
        if self.is_alias(target_id)? {
            return Err(problem("the target is itself an alias"));
        }
        Ok(target_id)
    }

    /// Rejects making the entry at `dn` an alias while other aliases
    /// point at it
    pub(crate) fn check_not_targeted(&self, dn: &Dn, id: Option<EntryId>) -> StoreResult<()> {
        let targeting = self
            .tables()?
            .indices
            .alias()
            .forward_values(&dn.norm_name());
        if targeting.iter().any(|alias| Some(*alias) != id) {
            return Err(StoreError::alias_problem(
                dn.up_name(),
                "other aliases point at this entry",
            ));
        }
        Ok(())
    }

    /// Aliases whose target DN is `dn`
    pub(crate) fn aliases_targeting(&self, dn: &Dn) -> StoreResult<Vec<EntryId>> {
        Ok(self
            .tables()?
            .indices
            .alias()
            .forward_values(&dn.norm_name()))
    }
}
