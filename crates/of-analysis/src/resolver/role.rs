//! Semantic role assignment for verified relationships.

use crate::semantic::SemanticClassifier;
use of_core::{RelationshipRole, VerifiedRelationship};

/// Confidence attached to a role read off the column name.
pub const NAME_ROLE_CONFIDENCE: f64 = 0.4;

/// Ask the classifier for a role; fall back to the source column name.
///
/// Only called on relationships that already passed data verification.
pub async fn assign_role(
    semantic: &dyn SemanticClassifier,
    relationship: &VerifiedRelationship,
) -> Option<RelationshipRole> {
    match semantic.assign_role(relationship).await {
        Ok(Some(role)) => Some(RelationshipRole {
            from_classifier: true,
            ..role
        }),
        Ok(None) => name_role(relationship),
        Err(e) => {
            log::warn!(
                "Role assignment for {} failed, using name hint: {}",
                relationship.key,
                e
            );
            name_role(relationship)
        }
    }
}

/// `host_id` -> `host`; `ParentUUID` -> `parent`.
pub fn name_role(relationship: &VerifiedRelationship) -> Option<RelationshipRole> {
    let name = relationship.key.source.column.as_str();
    let lower = name.to_ascii_lowercase();
    let stem = ["_uuid", "_key", "_id", "uuid", "id"]
        .iter()
        .find_map(|suffix| lower.strip_suffix(suffix))
        .unwrap_or(&lower)
        .trim_end_matches('_');
    if stem.is_empty() {
        return None;
    }
    Some(RelationshipRole {
        label: stem.to_string(),
        confidence: NAME_ROLE_CONFIDENCE,
        from_classifier: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use of_core::{Cardinality, ColumnRef, RelationshipKey};

    fn rel(source_column: &str) -> VerifiedRelationship {
        VerifiedRelationship {
            key: RelationshipKey {
                source: ColumnRef::new("listings", source_column),
                target: ColumnRef::new("users", "user_id"),
            },
            cardinality: Cardinality::ManyToOne,
            match_rate: 1.0,
            orphan_count: 0,
            role: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_name_role() {
        let label = |c: &str| name_role(&rel(c)).map(|r| r.label);
        assert_eq!(label("host_id").as_deref(), Some("host"));
        assert_eq!(label("ParentUUID").as_deref(), Some("parent"));
        assert_eq!(label("owner_key").as_deref(), Some("owner"));
        assert_eq!(label("landlord").as_deref(), Some("landlord"));
        assert_eq!(label("id"), None);
    }

    #[test]
    fn test_name_role_is_weak() {
        let role = name_role(&rel("host_id")).unwrap();
        assert!(!role.from_classifier);
        assert!(role.confidence < 0.5);
    }
}
