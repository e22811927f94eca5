use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Namespace,
    Relation,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Namespace => write!(f, "namespace"),
            NameKind::Relation => write!(f, "relation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TesseraErrorCode {
    InvalidName,
    DuplicateRelation,
    TooManyRelations,
    EmptyOperator,
    ExclusionArity,
    ExpressionTooDeep,
    UnknownSubjectType,
    MergeResourceMismatch,
    MergeSubjectMismatch,
    EmptyRelation,
    ComplexCaveat,
    MultipleIntegrity,
    InvalidReference,
}

impl TesseraErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            TesseraErrorCode::InvalidName => "invalid_name",
            TesseraErrorCode::DuplicateRelation => "duplicate_relation",
            TesseraErrorCode::TooManyRelations => "too_many_relations",
            TesseraErrorCode::EmptyOperator => "empty_operator",
            TesseraErrorCode::ExclusionArity => "exclusion_arity",
            TesseraErrorCode::ExpressionTooDeep => "expression_too_deep",
            TesseraErrorCode::UnknownSubjectType => "unknown_subject_type",
            TesseraErrorCode::MergeResourceMismatch => "merge_resource_mismatch",
            TesseraErrorCode::MergeSubjectMismatch => "merge_subject_mismatch",
            TesseraErrorCode::EmptyRelation => "empty_relation",
            TesseraErrorCode::ComplexCaveat => "complex_caveat",
            TesseraErrorCode::MultipleIntegrity => "multiple_integrity",
            TesseraErrorCode::InvalidReference => "invalid_reference",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TesseraError {
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: NameKind, name: String },
    #[error("duplicate relation '{relation}' in namespace '{namespace}'")]
    DuplicateRelation { namespace: String, relation: String },
    #[error("namespace '{namespace}' defines {count} relations, exceeding the maximum of {max}")]
    TooManyRelations {
        namespace: String,
        count: usize,
        max: usize,
    },
    #[error("operator with no children in relation '{relation}' of namespace '{namespace}'")]
    EmptyOperator { namespace: String, relation: String },
    #[error(
        "exclusion requires at least two operands in relation '{relation}' of namespace '{namespace}'"
    )]
    ExclusionArity { namespace: String, relation: String },
    #[error("expression depth {depth} in relation '{relation}' exceeds maximum allowed depth of {max}")]
    ExpressionTooDeep {
        relation: String,
        depth: usize,
        max: usize,
    },
    #[error("relation '{relation}' in namespace '{namespace}' allows unknown subject type '{subject_type}'")]
    UnknownSubjectType {
        namespace: String,
        relation: String,
        subject_type: String,
    },
    #[error("cannot merge paths with different resources")]
    MergeResourceMismatch,
    #[error("cannot merge paths with different subjects")]
    MergeSubjectMismatch,
    #[error("cannot convert path with empty relation")]
    EmptyRelation,
    #[error("cannot convert path with complex caveat expression")]
    ComplexCaveat,
    #[error("cannot convert path with multiple integrity values ({count})")]
    MultipleIntegrity { count: usize },
    #[error("invalid reference '{input}': {reason}")]
    InvalidReference { input: String, reason: String },
}

impl TesseraError {
    pub fn code(&self) -> TesseraErrorCode {
        match self {
            TesseraError::InvalidName { .. } => TesseraErrorCode::InvalidName,
            TesseraError::DuplicateRelation { .. } => TesseraErrorCode::DuplicateRelation,
            TesseraError::TooManyRelations { .. } => TesseraErrorCode::TooManyRelations,
            TesseraError::EmptyOperator { .. } => TesseraErrorCode::EmptyOperator,
            TesseraError::ExclusionArity { .. } => TesseraErrorCode::ExclusionArity,
            TesseraError::ExpressionTooDeep { .. } => TesseraErrorCode::ExpressionTooDeep,
            TesseraError::UnknownSubjectType { .. } => TesseraErrorCode::UnknownSubjectType,
            TesseraError::MergeResourceMismatch => TesseraErrorCode::MergeResourceMismatch,
            TesseraError::MergeSubjectMismatch => TesseraErrorCode::MergeSubjectMismatch,
            TesseraError::EmptyRelation => TesseraErrorCode::EmptyRelation,
            TesseraError::ComplexCaveat => TesseraErrorCode::ComplexCaveat,
            TesseraError::MultipleIntegrity { .. } => TesseraErrorCode::MultipleIntegrity,
            TesseraError::InvalidReference { .. } => TesseraErrorCode::InvalidReference,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }
}
