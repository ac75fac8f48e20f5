//! Central registry of advice rules.
//!
//! The registry holds the ordered rules that decide which invocations get
//! advised. It is assembled once through [`AdviceRegistryBuilder`] and is
//! immutable afterwards, so it can be shared freely between threads.

use crate::domain::{
    advice::{Advice, AdviceError, AdviceKind, FailureDisposition, Outcome, ProceedingJoinPoint},
    error::InvocationError,
    join_point::JoinPoint,
    pointcut::{Pointcut, PointcutParseError, ResolveError},
    value::Value,
};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Error returned when building an `AdviceRegistry` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Rules and named pointcuts must have a non-empty name
    EmptyName,
    /// A pointcut expression could not be parsed
    InvalidPointcut {
        /// Rule or named pointcut carrying the expression
        owner: String,
        /// Parse failure
        error: PointcutParseError,
    },
    /// The same named pointcut was defined twice
    DuplicatePointcut(String),
    /// A named pointcut reference could not be resolved
    UnresolvedPointcut {
        /// Rule or named pointcut carrying the reference
        owner: String,
        /// Resolution failure
        error: ResolveError,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyName => write!(f, "rule and pointcut names must not be empty"),
            BuildError::InvalidPointcut { owner, error } => {
                write!(f, "`{}`: {}", owner, error)
            }
            BuildError::DuplicatePointcut(name) => {
                write!(f, "pointcut `{}()` is defined more than once", name)
            }
            BuildError::UnresolvedPointcut { owner, error } => {
                write!(f, "`{}`: {}", owner, error)
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::InvalidPointcut { error, .. } => Some(error),
            BuildError::UnresolvedPointcut { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A pointcut given either ready-made or as an expression parsed at build time.
#[derive(Debug, Clone)]
pub enum PointcutSource {
    /// Already constructed pointcut
    Parsed(Pointcut),
    /// Expression parsed when the registry is built
    Expression(String),
}

impl PointcutSource {
    fn into_pointcut(self, owner: &str) -> Result<Pointcut, BuildError> {
        match self {
            PointcutSource::Parsed(pointcut) => Ok(pointcut),
            PointcutSource::Expression(expr) => {
                Pointcut::parse(&expr).map_err(|error| BuildError::InvalidPointcut {
                    owner: owner.to_string(),
                    error,
                })
            }
        }
    }
}

impl From<Pointcut> for PointcutSource {
    fn from(pointcut: Pointcut) -> Self {
        PointcutSource::Parsed(pointcut)
    }
}

impl From<&str> for PointcutSource {
    fn from(expr: &str) -> Self {
        PointcutSource::Expression(expr.to_string())
    }
}

impl From<String> for PointcutSource {
    fn from(expr: String) -> Self {
        PointcutSource::Expression(expr)
    }
}

/// A pointcut paired with one advice.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    pointcut: Pointcut,
    advice: Advice,
}

impl Rule {
    /// Create a rule.
    pub fn new(name: impl Into<String>, pointcut: Pointcut, advice: Advice) -> Self {
        Self {
            name: name.into(),
            pointcut,
            advice,
        }
    }

    /// Rule name, used in log records and failure reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's pointcut.
    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    /// The rule's advice.
    pub fn advice(&self) -> &Advice {
        &self.advice
    }

    /// Kind of the rule's advice.
    pub fn kind(&self) -> AdviceKind {
        self.advice.kind()
    }

    /// Whether the rule applies to a join point.
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        self.pointcut.matches(join_point)
    }
}

struct PendingRule {
    name: String,
    pointcut: PointcutSource,
    advice: Advice,
}

/// Builder for constructing an `AdviceRegistry`.
///
/// Rules keep the order in which they are registered; for any advice kind,
/// matching rules run in that order.
#[derive(Default)]
pub struct AdviceRegistryBuilder {
    definitions: Vec<(String, PointcutSource)>,
    rules: Vec<PendingRule>,
}

impl AdviceRegistryBuilder {
    /// Define a reusable pointcut, referenced as `name()` in other expressions.
    pub fn define_pointcut(
        mut self,
        name: impl Into<String>,
        pointcut: impl Into<PointcutSource>,
    ) -> Self {
        self.definitions.push((name.into(), pointcut.into()));
        self
    }

    /// Append a rule.
    pub fn register(mut self, rule: Rule) -> Self {
        self.rules.push(PendingRule {
            name: rule.name,
            pointcut: PointcutSource::Parsed(rule.pointcut),
            advice: rule.advice,
        });
        self
    }

    /// Append a rule whose pointcut may still be an expression.
    pub fn advise(
        mut self,
        name: impl Into<String>,
        pointcut: impl Into<PointcutSource>,
        advice: Advice,
    ) -> Self {
        self.rules.push(PendingRule {
            name: name.into(),
            pointcut: pointcut.into(),
            advice,
        });
        self
    }

    /// Append before advice.
    pub fn before<F>(self, name: impl Into<String>, pointcut: impl Into<PointcutSource>, f: F) -> Self
    where
        F: Fn(&JoinPoint) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        self.advise(name, pointcut, Advice::before(f))
    }

    /// Append unconditional after advice.
    pub fn after<F>(self, name: impl Into<String>, pointcut: impl Into<PointcutSource>, f: F) -> Self
    where
        F: Fn(&JoinPoint, Outcome<'_>) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        self.advise(name, pointcut, Advice::after(f))
    }

    /// Append after-success advice.
    pub fn after_returning<F>(
        self,
        name: impl Into<String>,
        pointcut: impl Into<PointcutSource>,
        f: F,
    ) -> Self
    where
        F: Fn(&JoinPoint, &Value) -> Result<(), AdviceError> + Send + Sync + 'static,
    {
        self.advise(name, pointcut, Advice::after_returning(f))
    }

    /// Append after-failure advice.
    pub fn after_throwing<F>(
        self,
        name: impl Into<String>,
        pointcut: impl Into<PointcutSource>,
        f: F,
    ) -> Self
    where
        F: Fn(&JoinPoint, &InvocationError) -> Result<FailureDisposition, AdviceError>
            + Send
            + Sync
            + 'static,
    {
        self.advise(name, pointcut, Advice::after_throwing(f))
    }

    /// Append around advice.
    pub fn around<F>(self, name: impl Into<String>, pointcut: impl Into<PointcutSource>, f: F) -> Self
    where
        F: Fn(ProceedingJoinPoint<'_>) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        self.advise(name, pointcut, Advice::around(f))
    }

    /// Build the registry.
    ///
    /// Parses pointcut expressions and inlines every named pointcut reference.
    ///
    /// # Errors
    /// Returns `BuildError` if a name is empty, an expression is invalid, a
    /// named pointcut is defined twice, or a reference cannot be resolved.
    pub fn build(self) -> Result<AdviceRegistry, BuildError> {
        let mut definitions: AHashMap<String, Pointcut> = AHashMap::new();
        for (name, source) in self.definitions {
            if name.is_empty() {
                return Err(BuildError::EmptyName);
            }
            let pointcut = source.into_pointcut(&name)?;
            if definitions.insert(name.clone(), pointcut).is_some() {
                return Err(BuildError::DuplicatePointcut(name));
            }
        }

        let lookup = |name: &str| definitions.get(name);

        // Unused definitions are validated as well
        for (name, pointcut) in &definitions {
            pointcut
                .resolve(&lookup)
                .map_err(|error| BuildError::UnresolvedPointcut {
                    owner: name.clone(),
                    error,
                })?;
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for pending in self.rules {
            if pending.name.is_empty() {
                return Err(BuildError::EmptyName);
            }
            let pointcut = pending
                .pointcut
                .into_pointcut(&pending.name)?
                .resolve(&lookup)
                .map_err(|error| BuildError::UnresolvedPointcut {
                    owner: pending.name.clone(),
                    error,
                })?;
            rules.push(Rule::new(pending.name, pointcut, pending.advice));
        }

        Ok(AdviceRegistry {
            rules: rules.into(),
        })
    }
}

/// Immutable, ordered set of advice rules.
///
/// Cloning is cheap; clones share the same rules.
#[derive(Debug, Clone)]
pub struct AdviceRegistry {
    rules: Arc<[Rule]>,
}

impl AdviceRegistry {
    /// Create a builder.
    pub fn builder() -> AdviceRegistryBuilder {
        AdviceRegistryBuilder::default()
    }

    /// Registry with no rules; every invocation runs unadvised.
    pub fn empty() -> Self {
        Self {
            rules: Arc::from(Vec::new()),
        }
    }

    /// Rules of `kind` whose pointcut accepts the join point, in registration order.
    pub fn matching_rules(&self, join_point: &JoinPoint, kind: AdviceKind) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.kind() == kind && rule.matches(join_point))
            .collect()
    }

    /// All rules, in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Get the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for AdviceRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
