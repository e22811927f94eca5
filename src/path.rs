use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::caveats::{self, CaveatExpression, ContextualizedCaveat};
use crate::error::TesseraError;

/// A concrete object in the relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectReference {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// An object together with a relation on it. The relation is empty when
/// the reference is to the object itself, as for most subjects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectAndRelation {
    pub object_type: String,
    pub object_id: String,
    pub relation: String,
}

impl ObjectAndRelation {
    pub fn new(
        object_type: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
            relation: relation.into(),
        }
    }
}

impl fmt::Display for ObjectAndRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relation.is_empty() {
            write!(f, "{}:{}", self.object_type, self.object_id)
        } else {
            write!(f, "{}:{}#{}", self.object_type, self.object_id, self.relation)
        }
    }
}

/// Opaque auditing token carried alongside a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipIntegrity {
    pub key_id: String,
    #[serde(default)]
    pub hash: Vec<u8>,
    #[serde(default)]
    pub hashed_at: Option<DateTime<Utc>>,
}

impl RelationshipIntegrity {
    pub fn new(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            hash: Vec::new(),
            hashed_at: None,
        }
    }
}

/// The flat wire record of one stored relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub resource: ObjectAndRelation,
    pub subject: ObjectAndRelation,
    #[serde(default)]
    pub caveat: Option<ContextualizedCaveat>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub integrity: Option<RelationshipIntegrity>,
}

impl Relationship {
    pub fn new(resource: ObjectAndRelation, subject: ObjectAndRelation) -> Self {
        Self {
            resource,
            subject,
            caveat: None,
            expiration: None,
            integrity: None,
        }
    }

    /// Parses the `type:id#relation@type:id[#relation]` reference format.
    pub fn parse(input: &str) -> Result<Self, TesseraError> {
        let (resource, subject) = split_reference(input)?;
        if resource.relation.is_empty() {
            return Err(invalid_reference(input, "missing resource relation"));
        }
        Ok(Relationship::new(resource, subject))
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resource, self.subject)
    }
}

pub type IntegrityList = SmallVec<[RelationshipIntegrity; 1]>;

/// One evaluated edge of the permission graph: the resource reaches the
/// subject, possibly through a named relation and under a caveat.
///
/// Merge semantics are intentionally strict:
/// - Merging requires identical resource and identical subject, including
///   the subject's relation; violations leave the receiver untouched.
/// - Equal relations are preserved; differing relations are cleared,
///   since a permission merged from two relations names neither.
/// - The earliest expiration wins; an absent expiration never wins.
/// - Integrity witnesses concatenate, receiver first.
/// - Metadata merges key-by-key, the argument overwriting the receiver.
/// - Caveats combine under the operator's combinator; merging AND-NOT
///   onto an uncaveated path yields the negation of the argument's
///   caveat, not an uncaveated path.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub resource: ObjectReference,
    pub relation: String,
    pub subject: ObjectAndRelation,
    pub caveat: Option<CaveatExpression>,
    pub expiration: Option<DateTime<Utc>>,
    pub integrity: IntegrityList,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Path {
    pub fn new(
        resource: ObjectReference,
        relation: impl Into<String>,
        subject: ObjectAndRelation,
    ) -> Self {
        Self {
            resource,
            relation: relation.into(),
            subject,
            caveat: None,
            expiration: None,
            integrity: IntegrityList::new(),
            metadata: None,
        }
    }

    /// Parses the `type:id#relation@type:id[#relation]` reference format.
    pub fn parse(input: &str) -> Result<Self, TesseraError> {
        let (resource, subject) = split_reference(input)?;
        Ok(Path::new(
            ObjectReference::new(resource.object_type, resource.object_id),
            resource.relation,
            subject,
        ))
    }

    /// The resource and relation as one reference.
    pub fn resource_oar(&self) -> ObjectAndRelation {
        ObjectAndRelation::new(
            self.resource.object_type.clone(),
            self.resource.object_id.clone(),
            self.relation.clone(),
        )
    }

    pub fn is_expired(&self) -> bool {
        self.expiration
            .is_some_and(|expiration| expiration <= Utc::now())
    }

    /// Structural equality over every field. Prefer [`Path::equals_endpoints`]
    /// when the relation and qualifiers are immaterial.
    pub fn equals(&self, other: &Path) -> bool {
        self == other
    }

    /// True when both paths connect the same resource to the same subject
    /// object, ignoring the path relation and the subject's relation.
    pub fn equals_endpoints(&self, other: &Path) -> bool {
        self.resource == other.resource
            && self.subject.object_type == other.subject.object_type
            && self.subject.object_id == other.subject.object_id
    }

    /// Set union: the subject reaches the resource through either path.
    pub fn merge_or(&mut self, other: &Path) -> Result<(), TesseraError> {
        self.merge_from(other, caveats::or)
    }

    /// Set intersection: the subject must satisfy both paths.
    pub fn merge_and(&mut self, other: &Path) -> Result<(), TesseraError> {
        self.merge_from(other, caveats::and)
    }

    /// Set difference: the subject satisfies the receiver but not `other`.
    pub fn merge_and_not(&mut self, other: &Path) -> Result<(), TesseraError> {
        self.merge_from(other, caveats::subtract)
    }

    fn merge_from(
        &mut self,
        other: &Path,
        combine: fn(Option<CaveatExpression>, Option<CaveatExpression>) -> Option<CaveatExpression>,
    ) -> Result<(), TesseraError> {
        // Preconditions first: a failed merge must not mutate the receiver.
        if self.resource != other.resource {
            return Err(TesseraError::MergeResourceMismatch);
        }
        if self.subject != other.subject {
            return Err(TesseraError::MergeSubjectMismatch);
        }

        if self.relation != other.relation {
            self.relation.clear();
        }
        self.caveat = combine(self.caveat.take(), other.caveat.clone());
        self.expiration = match (self.expiration, other.expiration) {
            (Some(own), Some(theirs)) => Some(own.min(theirs)),
            (own, theirs) => own.or(theirs),
        };
        self.integrity.extend(other.integrity.iter().cloned());
        let metadata = self.metadata.get_or_insert_with(HashMap::new);
        if let Some(theirs) = &other.metadata {
            for (key, value) in theirs {
                metadata.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    /// Lifts a wire relationship into a path. Total: every relationship is
    /// a valid single-edge path with fresh, empty metadata.
    pub fn from_relationship(relationship: Relationship) -> Path {
        Path {
            resource: ObjectReference::new(
                relationship.resource.object_type,
                relationship.resource.object_id,
            ),
            relation: relationship.resource.relation,
            subject: relationship.subject,
            caveat: relationship.caveat.map(CaveatExpression::Caveat),
            expiration: relationship.expiration,
            integrity: relationship.integrity.into_iter().collect(),
            metadata: Some(HashMap::new()),
        }
    }

    /// Flattens the path back into a wire relationship. Fails when the
    /// path no longer fits the flat record: a merged-away relation, a
    /// compound caveat, or more than one integrity witness.
    pub fn to_relationship(&self) -> Result<Relationship, TesseraError> {
        if self.relation.is_empty() {
            return Err(TesseraError::EmptyRelation);
        }
        let caveat = match &self.caveat {
            None => None,
            Some(expression) => Some(
                expression
                    .as_caveat()
                    .ok_or(TesseraError::ComplexCaveat)?
                    .clone(),
            ),
        };
        if self.integrity.len() > 1 {
            return Err(TesseraError::MultipleIntegrity {
                count: self.integrity.len(),
            });
        }
        Ok(Relationship {
            resource: self.resource_oar(),
            subject: self.subject.clone(),
            caveat,
            expiration: self.expiration,
            integrity: self.integrity.first().cloned(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relation.is_empty() {
            write!(f, "{}@{}", self.resource, self.subject)
        } else {
            write!(f, "{}#{}@{}", self.resource, self.relation, self.subject)
        }
    }
}

fn invalid_reference(input: &str, reason: &str) -> TesseraError {
    TesseraError::InvalidReference {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn split_reference(input: &str) -> Result<(ObjectAndRelation, ObjectAndRelation), TesseraError> {
    let (resource, subject) = input
        .split_once('@')
        .ok_or_else(|| invalid_reference(input, "missing '@' separator"))?;
    Ok((
        parse_object_and_relation(resource, input)?,
        parse_object_and_relation(subject, input)?,
    ))
}

fn parse_object_and_relation(
    part: &str,
    input: &str,
) -> Result<ObjectAndRelation, TesseraError> {
    let (object, relation) = match part.split_once('#') {
        Some((object, relation)) => {
            if relation.is_empty() {
                return Err(invalid_reference(input, "empty relation after '#'"));
            }
            (object, relation)
        }
        None => (part, ""),
    };
    let (object_type, object_id) = object
        .split_once(':')
        .ok_or_else(|| invalid_reference(input, "missing ':' between type and id"))?;
    if object_type.is_empty() {
        return Err(invalid_reference(input, "empty object type"));
    }
    if object_id.is_empty() {
        return Err(invalid_reference(input, "empty object id"));
    }
    Ok(ObjectAndRelation::new(object_type, object_id, relation))
}
