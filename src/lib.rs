//! # tracing-advice
//!
//! Cross-cutting advice for plain Rust operations, logged through `tracing`.
//!
//! This crate runs *advice* (logging, validation, bookkeeping) around calls to
//! declared operations. Which advice applies is decided by *pointcuts*:
//! predicates over an operation's fully-qualified name, its containing scope,
//! and the markers declared on it. Advice is registered once at startup into an
//! immutable [`AdviceRegistry`]; an [`Interceptor`] then applies it to every
//! call it is handed.
//!
//! ## Quick Start
//!
//! ```rust
//! use tracing_advice::{
//!     AdviceRegistry, Interceptor, JoinPoint, LoggingAspect, OperationCatalog, OperationDecl,
//!     OperationSignature, Value,
//! };
//!
//! // Declare the operations advice may apply to
//! let mut catalog = OperationCatalog::new();
//! catalog
//!     .declare(
//!         OperationDecl::new(
//!             OperationSignature::new("shop::Orders", "place")
//!                 .with_params(["i64"])
//!                 .with_returns("String"),
//!         )
//!         .with_marker("transactional"),
//!     )
//!     .unwrap();
//!
//! // Register advice
//! let builder = AdviceRegistry::builder()
//!     .define_pointcut("orders", "within(shop::*)")
//!     .around("validate", "orders()", |pjp| {
//!         match pjp.args()[0].as_i64() {
//!             Some(id) if id > 0 => pjp.proceed(),
//!             _ => Ok(Value::from("rejected")),
//!         }
//!     });
//! let registry = LoggingAspect::builder("orders()")
//!     .build()
//!     .unwrap()
//!     .apply(builder)
//!     .build()
//!     .unwrap();
//!
//! // Route calls through the interceptor
//! let interceptor = Interceptor::new(registry);
//! let place = |id: i64| {
//!     let jp: JoinPoint = catalog.join_point("shop::Orders::place", vec![Value::Int(id)]).unwrap();
//!     interceptor.invoke(&jp, |jp| Ok::<_, String>(Value::from(format!("placed {}", jp.args()[0]))))
//! };
//!
//! assert_eq!(place(3).unwrap(), Value::from("placed 3"));
//! assert_eq!(place(-1).unwrap(), Value::from("rejected"));
//! ```
//!
//! ## Pointcuts
//!
//! | Expression | Matches |
//! |------------|---------|
//! | `execution(shop::*::place)` | fully-qualified operation identifier |
//! | `execution(String shop::**::find_*(i64, ..))` | identifier, return type and parameters |
//! | `within(shop::**)` | containing scope |
//! | `@annotation(transactional)` | declared marker |
//! | `orders()` | a pointcut defined with `define_pointcut` |
//!
//! Expressions combine with `&&`, `||`, `!` and parentheses. In path
//! patterns `*` matches within one `::` segment and `**` matches any number
//! of segments.
//!
//! ## Advice Order
//!
//! For one invocation:
//! 1. before advice runs in registration order; a failure aborts the call,
//! 2. the first matching around advice wraps the original operation (later
//!    around advice for the same call is ignored),
//! 3. on success after-success advice runs, on failure after-failure advice,
//! 4. unconditional after advice runs exactly once.
//!
//! After-family advice failures never change the outcome; they are logged at
//! `warn` and listed in [`InvocationReport::advice_failures`]. A panicking
//! advice is reported the same way.
//!
//! ## Error Handling
//!
//! A failing original operation reaches the caller as
//! [`InvocationError::Operation`], whose message only names the operation.
//! The internal cause stays available to after-failure advice through
//! [`OperationFailure::cause`].
//!
//! ## Observability
//!
//! ```rust
//! # use tracing_advice::{AdviceRegistry, Interceptor};
//! let interceptor = Interceptor::new(AdviceRegistry::empty());
//! let metrics = interceptor.metrics();
//! println!("Invocations: {}", metrics.invocations());
//! println!("Short-circuited: {}", metrics.short_circuited());
//!
//! let snapshot = metrics.snapshot();
//! println!("Failure rate: {:.2}%", snapshot.failure_rate() * 100.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `async`: `Interceptor::spawn_invoke` runs an invocation on tokio's
//!   blocking pool
//! - `serde`: serialization of [`Value`], [`AdviceKind`], [`MetricsSnapshot`]
//!   and [`LoggingAspectConfig`]
//! - `test-helpers`: mock clock, delay and capture layer in
//!   `infrastructure::mocks`

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Demonstration service
pub mod parcel;

// Re-export commonly used types for convenience
pub use domain::{
    advice::{
        Advice, AdviceError, AdviceKind, FailureDisposition, Outcome, ProceedingJoinPoint,
    },
    error::{AdviceFailure, InvocationError, OperationFailure},
    join_point::{JoinPoint, JoinPointKind, Marker, OperationSignature},
    pointcut::{Pointcut, PointcutParseError, ResolveError},
    value::Value,
};

pub use application::{
    catalog::{CatalogError, OperationCatalog, OperationDecl},
    interceptor::{Interceptor, InvocationPhase, InvocationReport},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Delay, Interrupted},
    registry::{AdviceRegistry, AdviceRegistryBuilder, BuildError, PointcutSource, Rule},
};

pub use infrastructure::{
    system::{SystemClock, SystemDelay},
    logging::{
        LoggingAspect, LoggingAspectBuilder, LoggingAspectConfig, LoggingConfigError,
        ADVICE_TARGET,
    },
};
