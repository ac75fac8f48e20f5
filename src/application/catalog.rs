//! Declared-metadata table for advised operations.
//!
//! Marker-based pointcuts need to know which markers an operation declares.
//! Instead of discovering them at runtime, every advised operation is declared
//! up front with its signature and markers; join points are then produced
//! from the declaration.

use crate::domain::join_point::{JoinPoint, Marker, OperationSignature};
use crate::domain::value::Value;
use ahash::AHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Error returned by catalog declarations and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// An operation with this identifier is already declared
    DuplicateOperation(String),
    /// No operation with this identifier is declared
    UnknownOperation(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateOperation(id) => {
                write!(f, "operation `{}` is already declared", id)
            }
            CatalogError::UnknownOperation(id) => write!(f, "operation `{}` is not declared", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Declaration of one operation: its signature and declared markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDecl {
    signature: OperationSignature,
    markers: BTreeSet<Marker>,
}

impl OperationDecl {
    /// Declare an operation with no markers.
    pub fn new(signature: OperationSignature) -> Self {
        Self {
            signature,
            markers: BTreeSet::new(),
        }
    }

    /// Add a marker to the declaration.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(Marker::new(marker));
        self
    }

    /// The declared signature.
    pub fn signature(&self) -> &OperationSignature {
        &self.signature
    }

    /// The declared markers.
    pub fn markers(&self) -> &BTreeSet<Marker> {
        &self.markers
    }

    /// Build the join point for one call of this operation.
    pub fn join_point(&self, args: Vec<Value>) -> JoinPoint {
        JoinPoint::new(self.signature.clone(), args).with_markers(self.markers.iter().cloned())
    }
}

/// Lookup table from fully-qualified operation identifier to declaration.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: AHashMap<String, OperationDecl>,
}

impl OperationCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an operation.
    ///
    /// # Errors
    /// Returns `CatalogError::DuplicateOperation` if the identifier is taken.
    pub fn declare(&mut self, decl: OperationDecl) -> Result<(), CatalogError> {
        let id = decl.signature.qualified_name();
        if self.operations.contains_key(&id) {
            return Err(CatalogError::DuplicateOperation(id));
        }
        self.operations.insert(id, decl);
        Ok(())
    }

    /// Look up a declaration.
    pub fn get(&self, operation: &str) -> Option<&OperationDecl> {
        self.operations.get(operation)
    }

    /// Build the join point for one call of a declared operation.
    ///
    /// # Errors
    /// Returns `CatalogError::UnknownOperation` if the operation is not declared.
    pub fn join_point(&self, operation: &str, args: Vec<Value>) -> Result<JoinPoint, CatalogError> {
        let decl = self
            .get(operation)
            .ok_or_else(|| CatalogError::UnknownOperation(operation.to_string()))?;
        Ok(decl.join_point(args))
    }

    /// Get the number of declared operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
