//! Pointcuts: predicates selecting which join points receive advice.
//!
//! Three primitive forms are supported, combinable with `&&`, `||` and `!`:
//!
//! - `execution(<pattern>)` matches the fully-qualified operation identifier,
//!   optionally constrained by return type and parameter list.
//! - `within(<pattern>)` matches the operation's containing scope.
//! - `@annotation(<marker>)` matches operations declaring the marker.
//!
//! A bare `name()` refers to a named pointcut, resolved when the advice
//! registry is built.
//!
//! ## Pattern syntax
//!
//! Paths use `::` separators. Inside a segment `*` matches any run of
//! characters; a lone `**` segment matches zero or more whole segments.
//!
//! ```
//! use tracing_advice::Pointcut;
//!
//! // Any operation of any type directly inside `shop::orders`
//! let by_name: Pointcut = "execution(shop::orders::*::*)".parse().unwrap();
//!
//! // Return type and parameters can be constrained too
//! let typed: Pointcut = "execution(String shop::**::find_*(i64, ..))".parse().unwrap();
//!
//! // Everything declared anywhere below `shop`, unless marked `internal`
//! let scoped: Pointcut = "within(shop::**) && !@annotation(internal)".parse().unwrap();
//! # let _ = (by_name, typed, scoped);
//! ```
//!
//! Matching is pure: it reads the join point and nothing else.

use crate::domain::join_point::{JoinPoint, Marker, PATH_SEPARATOR};
use std::fmt;
use std::str::FromStr;

/// Error returned when a pointcut expression or pattern cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointcutParseError {
    expression: String,
    position: usize,
    message: String,
}

impl PointcutParseError {
    fn new(expression: &str, position: usize, message: impl Into<String>) -> Self {
        Self {
            expression: expression.to_string(),
            position,
            message: message.into(),
        }
    }

    /// The expression that failed to parse.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Byte offset at which parsing failed.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for PointcutParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid pointcut `{}` at offset {}: {}",
            self.expression, self.position, self.message
        )
    }
}

impl std::error::Error for PointcutParseError {}

/// Error returned when named pointcut references cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Reference to a pointcut that was never defined
    Undefined(String),
    /// A named pointcut refers back to itself
    Cycle(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Undefined(name) => write!(f, "pointcut `{}()` is not defined", name),
            ResolveError::Cycle(name) => {
                write!(f, "pointcut `{}()` refers to itself", name)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Match `text` against a glob where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            pi += 1;
            mark = ti;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(PATH_SEPARATOR).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Glob(String),
}

/// A `::`-separated path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a path pattern such as `shop::**::*Service`.
    pub fn parse(pattern: &str) -> Result<Self, PointcutParseError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(PointcutParseError::new(pattern, 0, "empty path pattern"));
        }

        let mut segments = Vec::new();
        for raw in trimmed.split(PATH_SEPARATOR) {
            let segment = raw.trim();
            if segment.is_empty() || segment.contains(char::is_whitespace) {
                return Err(PointcutParseError::new(
                    pattern,
                    0,
                    format!("invalid path segment `{}`", raw),
                ));
            }
            if segment == "**" {
                segments.push(Segment::AnyDepth);
            } else if segment.contains("**") {
                return Err(PointcutParseError::new(
                    pattern,
                    0,
                    "`**` must be a whole path segment",
                ));
            } else {
                segments.push(Segment::Glob(segment.to_string()));
            }
        }

        Ok(Self { segments })
    }

    /// Check whether a `::`-separated path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        Self::match_segments(&self.segments, &split_path(path))
    }

    // reachable[i]: the pattern consumed so far matches exactly path[..i]
    fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
        let mut reachable = vec![false; path.len() + 1];
        reachable[0] = true;

        for segment in pattern {
            let mut next = vec![false; path.len() + 1];
            match segment {
                Segment::AnyDepth => {
                    let mut seen = false;
                    for (i, slot) in next.iter_mut().enumerate() {
                        seen |= reachable[i];
                        *slot = seen;
                    }
                }
                Segment::Glob(glob) => {
                    for (i, head) in path.iter().enumerate() {
                        if reachable[i] && glob_match(glob, head) {
                            next[i + 1] = true;
                        }
                    }
                }
            }
            if !next.contains(&true) {
                return false;
            }
            reachable = next;
        }

        reachable[path.len()]
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::AnyDepth => "**",
                Segment::Glob(g) => g.as_str(),
            })
            .collect();
        write!(f, "{}", parts.join(PATH_SEPARATOR))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParamItem {
    One(String),
    Rest,
}

/// Parameter list pattern: `(..)`, `()`, `(i64, *)`, `(String, ..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPattern {
    items: Vec<ParamItem>,
}

impl ParamPattern {
    /// Pattern accepting any parameter list.
    pub fn any() -> Self {
        Self {
            items: vec![ParamItem::Rest],
        }
    }

    /// Parse the inside of a parameter list (without the parentheses).
    pub fn parse(list: &str) -> Result<Self, PointcutParseError> {
        let trimmed = list.trim();
        if trimmed.is_empty() {
            return Ok(Self { items: Vec::new() });
        }

        let raw_items: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let mut items = Vec::with_capacity(raw_items.len());
        for (i, raw) in raw_items.iter().enumerate() {
            match *raw {
                "" => {
                    return Err(PointcutParseError::new(list, 0, "empty parameter pattern"));
                }
                ".." if i + 1 == raw_items.len() => items.push(ParamItem::Rest),
                ".." => {
                    return Err(PointcutParseError::new(
                        list,
                        0,
                        "`..` is only allowed as the last parameter pattern",
                    ));
                }
                glob => items.push(ParamItem::One(glob.to_string())),
            }
        }

        Ok(Self { items })
    }

    /// Check whether a parameter type list matches.
    pub fn matches(&self, params: &[String]) -> bool {
        let (fixed, open_ended) = match self.items.split_last() {
            Some((ParamItem::Rest, fixed)) => (fixed, true),
            _ => (self.items.as_slice(), false),
        };

        if params.len() < fixed.len() || (!open_ended && params.len() != fixed.len()) {
            return false;
        }

        fixed.iter().zip(params).all(|(item, param)| match item {
            ParamItem::One(glob) => glob_match(glob, param),
            ParamItem::Rest => true,
        })
    }
}

impl fmt::Display for ParamPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .items
            .iter()
            .map(|i| match i {
                ParamItem::One(g) => g.as_str(),
                ParamItem::Rest => "..",
            })
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Pattern used by `execution(...)`: `[<return glob>] <path pattern>[(<params>)]`.
///
/// The return glob must be a single token without whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPattern {
    returns: Option<String>,
    path: PathPattern,
    params: ParamPattern,
}

impl ExecutionPattern {
    /// Parse an execution pattern.
    pub fn parse(pattern: &str) -> Result<Self, PointcutParseError> {
        let trimmed = pattern.trim();

        let (head, params) = if let Some(stripped) = trimmed.strip_suffix(')') {
            let open = stripped.rfind('(').ok_or_else(|| {
                PointcutParseError::new(pattern, trimmed.len(), "unbalanced `)`")
            })?;
            (&stripped[..open], ParamPattern::parse(&stripped[open + 1..])?)
        } else {
            (trimmed, ParamPattern::any())
        };

        let tokens: Vec<&str> = head.split_whitespace().collect();
        let (returns, path) = match tokens.as_slice() {
            [path] => (None, *path),
            [returns, path] => (Some(returns.to_string()), *path),
            _ => {
                return Err(PointcutParseError::new(
                    pattern,
                    0,
                    "expected `[<return type>] <path>[(<params>)]`",
                ))
            }
        };

        Ok(Self {
            returns,
            path: PathPattern::parse(path)?,
            params,
        })
    }

    /// Check a join point's signature against this pattern.
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        let signature = join_point.signature();
        self.returns
            .as_deref()
            .map_or(true, |glob| glob_match(glob, signature.returns()))
            && self.path.matches(&signature.qualified_name())
            && self.params.matches(signature.params())
    }
}

impl fmt::Display for ExecutionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(returns) = &self.returns {
            write!(f, "{} ", returns)?;
        }
        write!(f, "{}{}", self.path, self.params)
    }
}

/// A predicate over join points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointcut {
    /// Match by fully-qualified operation identifier
    Execution(ExecutionPattern),
    /// Match by containing scope
    Within(PathPattern),
    /// Match by declared marker
    Annotation(Marker),
    /// Reference to a named pointcut, resolved at registry build time
    Named(String),
    /// Both pointcuts must match
    And(Box<Pointcut>, Box<Pointcut>),
    /// Either pointcut must match
    Or(Box<Pointcut>, Box<Pointcut>),
    /// The pointcut must not match
    Not(Box<Pointcut>),
}

impl Pointcut {
    /// Parse a pointcut expression.
    pub fn parse(expression: &str) -> Result<Self, PointcutParseError> {
        Parser::new(expression).parse()
    }

    /// Create an `execution(...)` pointcut.
    pub fn execution(pattern: &str) -> Result<Self, PointcutParseError> {
        Ok(Pointcut::Execution(ExecutionPattern::parse(pattern)?))
    }

    /// Create a `within(...)` pointcut.
    pub fn within(pattern: &str) -> Result<Self, PointcutParseError> {
        Ok(Pointcut::Within(PathPattern::parse(pattern)?))
    }

    /// Create an `@annotation(...)` pointcut.
    pub fn annotation(marker: impl Into<String>) -> Self {
        Pointcut::Annotation(Marker::new(marker))
    }

    /// Create a reference to a named pointcut.
    pub fn named(name: impl Into<String>) -> Self {
        Pointcut::Named(name.into())
    }

    /// Combine with another pointcut; both must match.
    pub fn and(self, other: Pointcut) -> Self {
        Pointcut::And(Box::new(self), Box::new(other))
    }

    /// Combine with another pointcut; either must match.
    pub fn or(self, other: Pointcut) -> Self {
        Pointcut::Or(Box::new(self), Box::new(other))
    }

    /// Invert this pointcut.
    pub fn negate(self) -> Self {
        Pointcut::Not(Box::new(self))
    }

    /// Evaluate the pointcut against a join point.
    ///
    /// Unresolved named references never match.
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        match self {
            Pointcut::Execution(pattern) => pattern.matches(join_point),
            Pointcut::Within(pattern) => pattern.matches(join_point.signature().scope()),
            Pointcut::Annotation(marker) => join_point.markers().contains(marker),
            Pointcut::Named(_) => false,
            Pointcut::And(a, b) => a.matches(join_point) && b.matches(join_point),
            Pointcut::Or(a, b) => a.matches(join_point) || b.matches(join_point),
            Pointcut::Not(inner) => !inner.matches(join_point),
        }
    }

    /// Whether the pointcut still contains named references.
    pub fn is_resolved(&self) -> bool {
        match self {
            Pointcut::Named(_) => false,
            Pointcut::And(a, b) | Pointcut::Or(a, b) => a.is_resolved() && b.is_resolved(),
            Pointcut::Not(inner) => inner.is_resolved(),
            _ => true,
        }
    }

    /// Replace every named reference with its definition.
    ///
    /// `lookup` returns the (possibly unresolved) definition of a name.
    pub fn resolve<'a, F>(&self, lookup: &F) -> Result<Pointcut, ResolveError>
    where
        F: Fn(&str) -> Option<&'a Pointcut>,
    {
        self.resolve_inner(lookup, &mut Vec::new())
    }

    fn resolve_inner<'a, F>(
        &self,
        lookup: &F,
        stack: &mut Vec<String>,
    ) -> Result<Pointcut, ResolveError>
    where
        F: Fn(&str) -> Option<&'a Pointcut>,
    {
        match self {
            Pointcut::Named(name) => {
                if stack.iter().any(|n| n == name) {
                    return Err(ResolveError::Cycle(name.clone()));
                }
                let definition =
                    lookup(name).ok_or_else(|| ResolveError::Undefined(name.clone()))?;
                stack.push(name.clone());
                let resolved = definition.resolve_inner(lookup, stack);
                stack.pop();
                resolved
            }
            Pointcut::And(a, b) => Ok(Pointcut::And(
                Box::new(a.resolve_inner(lookup, stack)?),
                Box::new(b.resolve_inner(lookup, stack)?),
            )),
            Pointcut::Or(a, b) => Ok(Pointcut::Or(
                Box::new(a.resolve_inner(lookup, stack)?),
                Box::new(b.resolve_inner(lookup, stack)?),
            )),
            Pointcut::Not(inner) => Ok(Pointcut::Not(Box::new(inner.resolve_inner(lookup, stack)?))),
            leaf => Ok(leaf.clone()),
        }
    }

    fn is_binary(&self) -> bool {
        matches!(self, Pointcut::And(..) | Pointcut::Or(..))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_binary() {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointcut::Execution(pattern) => write!(f, "execution({})", pattern),
            Pointcut::Within(pattern) => write!(f, "within({})", pattern),
            Pointcut::Annotation(marker) => write!(f, "@annotation({})", marker.as_str()),
            Pointcut::Named(name) => write!(f, "{}()", name),
            Pointcut::And(a, b) => {
                a.fmt_operand(f)?;
                write!(f, " && ")?;
                b.fmt_operand(f)
            }
            Pointcut::Or(a, b) => {
                a.fmt_operand(f)?;
                write!(f, " || ")?;
                b.fmt_operand(f)
            }
            Pointcut::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_operand(f)
            }
        }
    }
}

impl FromStr for Pointcut {
    type Err = PointcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointcut::parse(s)
    }
}

/// Recursive-descent parser for pointcut expressions.
///
/// ```text
/// or      := and ("||" and)*
/// and     := unary ("&&" unary)*
/// unary   := "!" unary | primary
/// primary := "(" or ")" | "@annotation(" marker ")" | ident "(" body ")"
/// ```
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(mut self) -> Result<Pointcut, PointcutParseError> {
        let pointcut = self.parse_or()?;
        self.skip_ws();
        if self.pos < self.input.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(pointcut)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> PointcutParseError {
        PointcutParseError::new(self.input, self.pos, message)
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Pointcut, PointcutParseError> {
        let mut left = self.parse_and()?;
        while self.eat("||") {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Pointcut, PointcutParseError> {
        let mut left = self.parse_unary()?;
        while self.eat("&&") {
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Pointcut, PointcutParseError> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Pointcut, PointcutParseError> {
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected `)`"));
            }
            return Ok(inner);
        }

        let annotated = self.eat("@");
        let ident = self.ident()?;
        if !self.eat("(") {
            return Err(self.error(format!("expected `(` after `{}`", ident)));
        }
        let body_start = self.pos;
        let body = self.balanced_body()?;
        let located = |e: PointcutParseError| {
            PointcutParseError::new(self.input, body_start, e.message)
        };

        match (annotated, ident) {
            (true, "annotation") => {
                let marker = body.trim();
                if marker.is_empty() || marker.contains(char::is_whitespace) {
                    return Err(PointcutParseError::new(
                        self.input,
                        body_start,
                        "expected a single marker name",
                    ));
                }
                Ok(Pointcut::annotation(marker))
            }
            (true, other) => Err(PointcutParseError::new(
                self.input,
                body_start,
                format!("unknown designator `@{}`", other),
            )),
            (false, "execution") => Pointcut::execution(body).map_err(located),
            (false, "within") => Pointcut::within(body).map_err(located),
            (false, name) if body.trim().is_empty() => Ok(Pointcut::named(name)),
            (false, name) => Err(PointcutParseError::new(
                self.input,
                body_start,
                format!("named pointcut `{}()` takes no arguments", name),
            )),
        }
    }

    fn ident(&mut self) -> Result<&'a str, PointcutParseError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_alphanumeric() || *c == '_') || (*i == 0 && c.is_ascii_digit()))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(self.error("expected a pointcut designator"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// Consume everything up to the parenthesis closing an already-consumed `(`.
    fn balanced_body(&mut self) -> Result<&'a str, PointcutParseError> {
        let rest = self.rest();
        let mut depth = 1usize;
        for (i, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += i + 1;
                        return Ok(&rest[..i]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced `(`"))
    }
}
