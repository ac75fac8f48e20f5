//! Logging aspect: reusable logging advice emitting `tracing` events.
//!
//! A [`LoggingAspect`] registers one logging advice per configured advice kind
//! on an [`AdviceRegistryBuilder`]. Every record is an INFO event on
//! [`ADVICE_TARGET`] with the fields:
//!
//! - `event`: human readable name, e.g. `Before Method called`
//! - `signature`: the advised operation's signature
//! - `kind`: the join point kind
//! - `rule`: the logging rule's name
//!
//! After-success records add `return_value`, after-failure records add
//! `error`, and records add `args` when argument logging is enabled.
//!
//! # Examples
//!
//! ```
//! use tracing_advice::{AdviceRegistry, LoggingAspect};
//!
//! let registry = LoggingAspect::builder("within(shop::*)")
//!     .with_label("Method")
//!     .build()
//!     .unwrap()
//!     .apply(AdviceRegistry::builder())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.len(), 4);
//! ```

use crate::application::registry::{AdviceRegistryBuilder, PointcutSource};
use crate::domain::advice::{AdviceKind, FailureDisposition};
use crate::domain::join_point::JoinPoint;
use std::fmt;

/// Target of every record emitted by logging advice.
pub const ADVICE_TARGET: &str = "tracing_advice::advice";

/// Error returned when a logging aspect configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingConfigError {
    /// The label must not be empty
    EmptyLabel,
    /// At least one advice kind must be logged
    NoKinds,
    /// Logging advice never wraps a call
    AroundNotSupported,
}

impl fmt::Display for LoggingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingConfigError::EmptyLabel => write!(f, "logging label must not be empty"),
            LoggingConfigError::NoKinds => write!(f, "at least one advice kind must be logged"),
            LoggingConfigError::AroundNotSupported => {
                write!(f, "around advice cannot be used for logging")
            }
        }
    }
}

impl std::error::Error for LoggingConfigError {}

/// Settings of a logging aspect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoggingAspectConfig {
    /// Word naming what is logged, used in `event` and in rule names
    pub label: String,
    /// Add the call arguments to every record
    pub log_arguments: bool,
    /// Add the returned value to after-success records
    pub log_return_value: bool,
    /// Advice kinds to register, in registration order
    pub kinds: Vec<AdviceKind>,
}

impl Default for LoggingAspectConfig {
    fn default() -> Self {
        Self {
            label: "Method".to_string(),
            log_arguments: false,
            log_return_value: true,
            kinds: vec![
                AdviceKind::Before,
                AdviceKind::After,
                AdviceKind::AfterSuccess,
                AdviceKind::AfterFailure,
            ],
        }
    }
}

impl LoggingAspectConfig {
    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `LoggingConfigError` if the label is empty, no kind is listed,
    /// or `Around` is listed.
    pub fn validate(&self) -> Result<(), LoggingConfigError> {
        if self.label.trim().is_empty() {
            return Err(LoggingConfigError::EmptyLabel);
        }
        if self.kinds.is_empty() {
            return Err(LoggingConfigError::NoKinds);
        }
        if self.kinds.contains(&AdviceKind::Around) {
            return Err(LoggingConfigError::AroundNotSupported);
        }
        Ok(())
    }
}

/// Builder for constructing a `LoggingAspect`.
#[derive(Debug, Clone)]
pub struct LoggingAspectBuilder {
    pointcut: PointcutSource,
    config: LoggingAspectConfig,
}

impl LoggingAspectBuilder {
    /// Replace the whole configuration.
    pub fn with_config(mut self, config: LoggingAspectConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the label, e.g. `Transaction` for `Before Transaction called`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Log call arguments.
    pub fn with_arguments(mut self, enabled: bool) -> Self {
        self.config.log_arguments = enabled;
        self
    }

    /// Log returned values.
    pub fn with_return_value(mut self, enabled: bool) -> Self {
        self.config.log_return_value = enabled;
        self
    }

    /// Choose the advice kinds to log.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = AdviceKind>) -> Self {
        self.config.kinds = kinds.into_iter().collect();
        self
    }

    /// Build the aspect.
    ///
    /// # Errors
    /// Returns `LoggingConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<LoggingAspect, LoggingConfigError> {
        self.config.validate()?;
        Ok(LoggingAspect {
            pointcut: self.pointcut,
            config: self.config,
        })
    }
}

/// A bundle of logging advice sharing one pointcut.
#[derive(Debug, Clone)]
pub struct LoggingAspect {
    pointcut: PointcutSource,
    config: LoggingAspectConfig,
}

impl LoggingAspect {
    /// Create a builder for advice matching `pointcut`.
    pub fn builder(pointcut: impl Into<PointcutSource>) -> LoggingAspectBuilder {
        LoggingAspectBuilder {
            pointcut: pointcut.into(),
            config: LoggingAspectConfig::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &LoggingAspectConfig {
        &self.config
    }

    /// Name of the rule logging `kind`, e.g. `method.after_success`.
    pub fn rule_name(&self, kind: AdviceKind) -> String {
        format!("{}.{}", self.config.label.to_lowercase(), kind.as_str())
    }

    /// Register the logging advice on a registry builder.
    ///
    /// The pointcut is parsed and validated when the registry is built.
    pub fn apply(&self, mut builder: AdviceRegistryBuilder) -> AdviceRegistryBuilder {
        for &kind in &self.config.kinds {
            let record = Record {
                event: format!("{} {} called", event_prefix(kind), self.config.label),
                rule: self.rule_name(kind),
                log_arguments: self.config.log_arguments,
            };
            let pointcut = self.pointcut.clone();
            builder = match kind {
                AdviceKind::Before => builder.before(record.rule.clone(), pointcut, move |jp| {
                    record.emit(jp, None, None);
                    Ok(())
                }),
                AdviceKind::After => {
                    builder.after(record.rule.clone(), pointcut, move |jp, _| {
                        record.emit(jp, None, None);
                        Ok(())
                    })
                }
                AdviceKind::AfterSuccess => {
                    let log_return_value = self.config.log_return_value;
                    builder.after_returning(record.rule.clone(), pointcut, move |jp, value| {
                        let value = log_return_value.then(|| value.to_string());
                        record.emit(jp, value.as_deref(), None);
                        Ok(())
                    })
                }
                AdviceKind::AfterFailure => {
                    builder.after_throwing(record.rule.clone(), pointcut, move |jp, error| {
                        let error = error.to_string();
                        record.emit(jp, None, Some(&error));
                        Ok(FailureDisposition::Propagate)
                    })
                }
                // Rejected by validation
                AdviceKind::Around => builder,
            };
        }
        builder
    }
}

fn event_prefix(kind: AdviceKind) -> &'static str {
    match kind {
        AdviceKind::Before => "Before",
        AdviceKind::After => "After",
        AdviceKind::AfterSuccess => "After Returning",
        AdviceKind::AfterFailure => "After Throwing",
        AdviceKind::Around => "Around",
    }
}

/// Fixed part of the records emitted by one logging rule.
struct Record {
    event: String,
    rule: String,
    log_arguments: bool,
}

impl Record {
    fn emit(&self, join_point: &JoinPoint, return_value: Option<&str>, error: Option<&str>) {
        let args = self.log_arguments.then(|| format_args_list(join_point));
        tracing::info!(
            target: ADVICE_TARGET,
            event = %self.event,
            signature = %join_point.signature(),
            kind = %join_point.kind(),
            rule = %self.rule,
            args = args.as_deref().map(tracing::field::display),
            return_value = return_value.map(tracing::field::display),
            error = error.map(tracing::field::display),
            "{}",
            self.event
        );
    }
}

fn format_args_list(join_point: &JoinPoint) -> String {
    let args: Vec<String> = join_point.args().iter().map(|a| a.to_string()).collect();
    format!("({})", args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::interceptor::Interceptor;
    use crate::application::registry::AdviceRegistry;
    use crate::domain::join_point::OperationSignature;
    use crate::domain::value::Value;
    use crate::infrastructure::mocks::MockCaptureLayer;
    use tracing_subscriber::layer::SubscriberExt;

    fn join_point(id: i64) -> JoinPoint {
        JoinPoint::new(
            OperationSignature::new("shop::Orders", "place")
                .with_params(["i64"])
                .with_returns("String"),
            vec![Value::Int(id)],
        )
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LoggingAspectConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.label, "Method");
        assert_eq!(config.kinds.len(), 4);
    }

    #[test]
    fn test_invalid_configs() {
        let empty_label = LoggingAspect::builder("within(shop::*)").with_label(" ").build();
        assert!(matches!(empty_label, Err(LoggingConfigError::EmptyLabel)));

        let no_kinds = LoggingAspect::builder("within(shop::*)").with_kinds(Vec::new()).build();
        assert!(matches!(no_kinds, Err(LoggingConfigError::NoKinds)));

        let around = LoggingAspect::builder("within(shop::*)")
            .with_kinds([AdviceKind::Before, AdviceKind::Around])
            .build();
        assert!(matches!(around, Err(LoggingConfigError::AroundNotSupported)));
    }

    #[test]
    fn test_rule_names() {
        let aspect = LoggingAspect::builder("within(shop::*)")
            .with_label("Transaction")
            .with_kinds([AdviceKind::Before, AdviceKind::After])
            .build()
            .unwrap();
        let registry = aspect.apply(AdviceRegistry::builder()).build().unwrap();

        let names: Vec<&str> = registry.rules().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["transaction.before", "transaction.after"]);
    }

    #[test]
    fn test_records_on_success() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let registry = LoggingAspect::builder("within(shop::*)")
            .with_arguments(true)
            .build()
            .unwrap()
            .apply(AdviceRegistry::builder())
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);

        tracing::subscriber::with_default(subscriber, || {
            interceptor
                .invoke(&join_point(7), |_| Ok::<_, String>(Value::from("placed")))
                .unwrap();
        });

        let events = capture.events_for_target(ADVICE_TARGET);
        let names: Vec<&str> = events.iter().filter_map(|e| e.field("event")).collect();
        assert_eq!(
            names,
            vec![
                "Before Method called",
                "After Returning Method called",
                "After Method called"
            ]
        );
        assert_eq!(
            events[0].field("signature"),
            Some("shop::Orders::place(i64) -> String")
        );
        assert_eq!(events[0].field("kind"), Some("operation-execution"));
        assert_eq!(events[0].field("rule"), Some("method.before"));
        assert_eq!(events[0].field("args"), Some("(7)"));
        assert_eq!(events[1].field("return_value"), Some("placed"));
        assert_eq!(events[2].field("return_value"), None);
    }

    #[test]
    fn test_records_on_failure() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let registry = LoggingAspect::builder("within(shop::*)")
            .build()
            .unwrap()
            .apply(AdviceRegistry::builder())
            .build()
            .unwrap();
        let interceptor = Interceptor::new(registry);

        tracing::subscriber::with_default(subscriber, || {
            let _ = interceptor.invoke(&join_point(7), |_| Err::<Value, _>("database offline"));
        });

        let events = capture.events_for_target(ADVICE_TARGET);
        let names: Vec<&str> = events.iter().filter_map(|e| e.field("event")).collect();
        assert_eq!(
            names,
            vec![
                "Before Method called",
                "After Throwing Method called",
                "After Method called"
            ]
        );
        assert_eq!(
            events[1].field("error"),
            Some("invocation of `shop::Orders::place` failed")
        );
        assert!(events.iter().all(|e| e.level == tracing::Level::INFO));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: LoggingAspectConfig =
            serde_json::from_str(r#"{"label": "Transaction", "kinds": ["before", "after"]}"#)
                .unwrap();
        assert_eq!(config.label, "Transaction");
        assert_eq!(config.kinds, vec![AdviceKind::Before, AdviceKind::After]);
        assert!(config.log_return_value);
        assert!(!config.log_arguments);
    }
}
