//! Join points: one invocation of a declared operation, as seen by advice.
//!
//! A join point bundles the operation's signature, the arguments of this
//! particular call and the markers declared on the operation. Join points are
//! created per call, never mutated, and dropped once the call completes.

use crate::domain::value::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Separator between path segments in scopes and operation identifiers.
pub const PATH_SEPARATOR: &str = "::";

/// A declared tag on an operation, the equivalent of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker(String);

impl Marker {
    /// Create a marker.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Marker name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<&str> for Marker {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Static description of an operation.
///
/// The fully-qualified identifier of an operation is `scope::name`, e.g.
/// `tracing_advice::parcel::service::ParcelServiceImpl::order_package`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationSignature {
    scope: String,
    name: String,
    params: Vec<String>,
    returns: String,
}

impl OperationSignature {
    /// Create a signature for an operation with no parameters returning `()`.
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            params: Vec::new(),
            returns: "()".to_string(),
        }
    }

    /// Set the parameter type names.
    pub fn with_params<I, T>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Set the return type name.
    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    /// Containing scope (module or type path).
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Operation name within its scope.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Return type name.
    pub fn returns(&self) -> &str {
        &self.returns
    }

    /// Fully-qualified identifier, `scope::name`.
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.scope, PATH_SEPARATOR, self.name)
        }
    }
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.qualified_name(),
            self.params.join(", "),
            self.returns
        )
    }
}

/// What kind of program point a join point represents.
///
/// Only operation executions are interceptable; the enum leaves room for the
/// other kinds an advice may want to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinPointKind {
    /// Execution of a declared operation
    OperationExecution,
}

impl fmt::Display for JoinPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinPointKind::OperationExecution => write!(f, "operation-execution"),
        }
    }
}

/// A single invocation context.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPoint {
    signature: OperationSignature,
    args: Vec<Value>,
    markers: BTreeSet<Marker>,
    kind: JoinPointKind,
}

impl JoinPoint {
    /// Create a join point for an operation execution.
    pub fn new(signature: OperationSignature, args: Vec<Value>) -> Self {
        Self {
            signature,
            args,
            markers: BTreeSet::new(),
            kind: JoinPointKind::OperationExecution,
        }
    }

    /// Attach the markers declared on the operation.
    pub fn with_markers<I>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = Marker>,
    {
        self.markers = markers.into_iter().collect();
        self
    }

    /// Signature of the invoked operation.
    pub fn signature(&self) -> &OperationSignature {
        &self.signature
    }

    /// Arguments of this invocation.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Markers declared on the invoked operation.
    pub fn markers(&self) -> &BTreeSet<Marker> {
        &self.markers
    }

    /// Whether the invoked operation declares the given marker.
    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.iter().any(|m| m.as_str() == name)
    }

    /// Kind of program point.
    pub fn kind(&self) -> JoinPointKind {
        self.kind
    }

    /// Fully-qualified identifier of the invoked operation.
    pub fn operation(&self) -> String {
        self.signature.qualified_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_signature() -> OperationSignature {
        OperationSignature::new("parcel::ParcelServiceImpl", "track_package")
            .with_params(["i64"])
            .with_returns("String")
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(
            track_signature().qualified_name(),
            "parcel::ParcelServiceImpl::track_package"
        );
        assert_eq!(OperationSignature::new("", "free_fn").qualified_name(), "free_fn");
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(
            track_signature().to_string(),
            "parcel::ParcelServiceImpl::track_package(i64) -> String"
        );
    }

    #[test]
    fn test_markers() {
        let jp = JoinPoint::new(track_signature(), vec![Value::Int(2)])
            .with_markers([Marker::new("transactional"), Marker::new("transactional")]);

        assert_eq!(jp.markers().len(), 1);
        assert!(jp.has_marker("transactional"));
        assert!(!jp.has_marker("cached"));
        assert_eq!(jp.kind(), JoinPointKind::OperationExecution);
        assert_eq!(jp.args(), &[Value::Int(2)]);
    }

    #[test]
    fn test_marker_display() {
        assert_eq!(Marker::from("transactional").to_string(), "@transactional");
    }
}
