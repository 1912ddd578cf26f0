//! Action registry
//!
//! Maps a participant's handler name to the actions it exposes and resolves
//! `(handler, action, args)` to a callable.
//!
//! ## Resolution
//!
//! An action matches when:
//!
//! 1. Its name equals the requested action name
//! 2. Its declared parameter count equals the argument count
//! 3. Every non-null argument is accepted by the declared [`ParamType`]
//!
//! The first match in declared order wins. There is no ranking, so declare
//! narrower overloads before wider ones.
//!
//! | ParamType | Accepts |
//! |-----------|---------|
//! | `Any` | every kind |
//! | `Number` | `Int`, `Float`, `Decimal` |
//! | exact kind | that kind only |
//!
//! `Null` is accepted by every parameter.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tcc_core::{ActionError, Error, Result, Value, ValueKind};
use tracing::{debug, info, warn};

/// Callable behind an [`Action`]
pub type ActionFn = Arc<dyn Fn(Args<'_>) -> std::result::Result<(), ActionError> + Send + Sync>;

/// Declared type of an action parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Accepts any kind
    Any,
    /// Accepts `Int`, `Float` and `Decimal`
    Number,
    /// Exactly `Bool`
    Bool,
    /// Exactly `Int`
    Int,
    /// Exactly `Float`
    Float,
    /// Exactly `Decimal`
    Decimal,
    /// Exactly `String`
    String,
    /// Exactly `Bytes`
    Bytes,
    /// Exactly `Timestamp`
    Timestamp,
    /// Exactly `Array`
    Array,
    /// Exactly `Object`
    Object,
}

impl ParamType {
    /// Check if an argument of this value may be passed to this parameter
    pub fn accepts(&self, value: &Value) -> bool {
        let kind = value.kind();
        if kind == ValueKind::Null {
            return true;
        }
        match self {
            ParamType::Any => true,
            ParamType::Number => kind.is_numeric(),
            exact => exact.exact_kind() == Some(kind),
        }
    }

    fn exact_kind(&self) -> Option<ValueKind> {
        match self {
            ParamType::Any | ParamType::Number => None,
            ParamType::Bool => Some(ValueKind::Bool),
            ParamType::Int => Some(ValueKind::Int),
            ParamType::Float => Some(ValueKind::Float),
            ParamType::Decimal => Some(ValueKind::Decimal),
            ParamType::String => Some(ValueKind::String),
            ParamType::Bytes => Some(ValueKind::Bytes),
            ParamType::Timestamp => Some(ValueKind::Timestamp),
            ParamType::Array => Some(ValueKind::Array),
            ParamType::Object => Some(ValueKind::Object),
        }
    }
}

/// A named, typed action on a handler
#[derive(Clone)]
pub struct Action {
    name: String,
    params: Vec<ParamType>,
    func: ActionFn,
}

impl Action {
    /// Create an action
    pub fn new(name: impl Into<String>, params: &[ParamType], func: ActionFn) -> Self {
        Action {
            name: name.into(),
            params: params.to_vec(),
            func,
        }
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Check name, arity and argument kinds
    pub fn matches(&self, name: &str, args: &[Value]) -> bool {
        self.name == name
            && self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.accepts(arg))
    }

    /// Run the action with `args`
    pub fn call(&self, args: &[Value]) -> std::result::Result<(), ActionError> {
        (self.func)(Args::new(&self.name, args))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A named set of actions, in declared order
#[derive(Debug, Clone)]
pub struct Handler {
    name: String,
    actions: Vec<Action>,
}

impl Handler {
    /// Start building a handler
    pub fn builder(name: impl Into<String>) -> HandlerBuilder {
        HandlerBuilder {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Actions in declared order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Builder for [`Handler`]
///
/// # Example
///
/// ```ignore
/// let handler = Handler::builder("walletService")
///     .action("confirmDeduct", &[ParamType::String, ParamType::Decimal], |args| {
///         wallet.confirm_deduct(args.str(0)?, args.decimal(1)?)
///     })
///     .build();
/// ```
#[derive(Debug)]
pub struct HandlerBuilder {
    name: String,
    actions: Vec<Action>,
}

impl HandlerBuilder {
    /// Declare an action
    pub fn action<F>(mut self, name: impl Into<String>, params: &[ParamType], func: F) -> Self
    where
        F: Fn(Args<'_>) -> std::result::Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.push(Action::new(name, params, Arc::new(func)));
        self
    }

    /// Finish the handler
    pub fn build(self) -> Handler {
        Handler {
            name: self.name,
            actions: self.actions,
        }
    }
}

/// Find the first action on `handler` compatible with `action` and `args`
pub fn resolve_action<'h>(handler: &'h Handler, action: &str, args: &[Value]) -> Option<&'h Action> {
    handler.actions.iter().find(|a| a.matches(action, args))
}

/// A service that can take part in transactions
///
/// The service names itself and hands out its actions; the registry keys the
/// handler by [`TccService::handler_name`].
pub trait TccService: Send + Sync + 'static {
    /// Stable logical name participants refer to
    fn handler_name(&self) -> &str;

    /// Build the handler exposing this service's try/confirm/cancel actions
    fn handler(self: Arc<Self>) -> Handler;
}

/// Registry of handlers by name
///
/// Handlers are registered at startup; unknown names only surface as
/// [`Error::HandlerActionNotFound`] when a participant is dispatched.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    handlers: RwLock<HashMap<String, Arc<Handler>>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name, replacing any previous one
    pub fn register(&self, handler: Handler) {
        let name = handler.name().to_string();
        self.insert(name, handler);
    }

    /// Register a service's handler under the service's name
    pub fn register_service<S: TccService>(&self, service: Arc<S>) {
        let name = service.handler_name().to_string();
        let handler = service.handler();
        if handler.name() != name {
            warn!(
                service = %name,
                handler = %handler.name(),
                "Handler name differs from service name, registering under service name"
            );
        }
        self.insert(name, handler);
    }

    fn insert(&self, name: String, handler: Handler) {
        let actions = handler.actions().len();
        let replaced = self
            .handlers
            .write()
            .insert(name.clone(), Arc::new(handler))
            .is_some();
        if replaced {
            warn!(handler = %name, "Replaced registered handler");
        }
        info!(handler = %name, actions = actions, "Registered handler");
    }

    /// Look up a handler by name
    pub fn handler(&self, name: &str) -> Option<Arc<Handler>> {
        self.handlers.read().get(name).cloned()
    }

    /// Check if a handler is registered
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Registered handler names, sorted
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `(handler, action, args)` to a callable
    pub fn resolve(&self, handler: &str, action: &str, args: &[Value]) -> Result<BoundAction> {
        let not_found = || Error::HandlerActionNotFound {
            handler: handler.to_string(),
            action: action.to_string(),
        };

        let registered = self.handler(handler).ok_or_else(not_found)?;
        let resolved = resolve_action(&registered, action, args).ok_or_else(not_found)?;

        debug!(
            handler = %handler,
            action = %action,
            arity = args.len(),
            "Resolved action"
        );
        Ok(BoundAction {
            handler: handler.to_string(),
            action: resolved.clone(),
        })
    }
}

/// An action resolved against a specific handler
#[derive(Debug, Clone)]
pub struct BoundAction {
    handler: String,
    action: Action,
}

impl BoundAction {
    /// Handler the action belongs to
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Action name
    pub fn action(&self) -> &str {
        self.action.name()
    }

    /// Invoke the action, wrapping a failure as [`Error::ActionFailed`]
    pub fn invoke(&self, args: &[Value]) -> Result<()> {
        self.action
            .call(args)
            .map_err(|source| Error::ActionFailed {
                handler: self.handler.clone(),
                action: self.action.name().to_string(),
                source,
            })
    }
}

/// Positional arguments passed to an action
///
/// Accessors check the kind and report a mismatch as [`ActionError`], so an
/// action body can use `?` throughout. `decimal` and `float` also take an
/// `Int`, matching what a [`ParamType::Number`] parameter admits.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    action: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    /// Wrap `values` for the action named `action`
    pub fn new(action: &'a str, values: &'a [Value]) -> Self {
        Args { action, values }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All arguments
    pub fn as_slice(&self) -> &'a [Value] {
        self.values
    }

    /// Raw argument at `index`
    pub fn value(&self, index: usize) -> std::result::Result<&'a Value, ActionError> {
        self.values.get(index).ok_or_else(|| {
            ActionError::new(format!(
                "'{}' has no argument {} ({} given)",
                self.action,
                index,
                self.values.len()
            ))
        })
    }

    /// String argument
    pub fn str(&self, index: usize) -> std::result::Result<&'a str, ActionError> {
        let value = self.value(index)?;
        value
            .as_str()
            .ok_or_else(|| self.mismatch(index, value, ValueKind::String))
    }

    /// Decimal argument (an `Int` is widened)
    pub fn decimal(&self, index: usize) -> std::result::Result<Decimal, ActionError> {
        let value = self.value(index)?;
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            _ => Err(self.mismatch(index, value, ValueKind::Decimal)),
        }
    }

    /// Integer argument
    pub fn int(&self, index: usize) -> std::result::Result<i64, ActionError> {
        let value = self.value(index)?;
        value
            .as_int()
            .ok_or_else(|| self.mismatch(index, value, ValueKind::Int))
    }

    /// Float argument (an `Int` is widened)
    pub fn float(&self, index: usize) -> std::result::Result<f64, ActionError> {
        let value = self.value(index)?;
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(self.mismatch(index, value, ValueKind::Float)),
        }
    }

    /// Bool argument
    pub fn bool(&self, index: usize) -> std::result::Result<bool, ActionError> {
        let value = self.value(index)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(index, value, ValueKind::Bool))
    }

    /// Timestamp argument
    pub fn timestamp(&self, index: usize) -> std::result::Result<DateTime<Utc>, ActionError> {
        let value = self.value(index)?;
        value
            .as_timestamp()
            .ok_or_else(|| self.mismatch(index, value, ValueKind::Timestamp))
    }

    /// String argument, `None` when null
    pub fn opt_str(&self, index: usize) -> std::result::Result<Option<&'a str>, ActionError> {
        if self.value(index)?.is_null() {
            return Ok(None);
        }
        self.str(index).map(Some)
    }

    /// Decimal argument, `None` when null
    pub fn opt_decimal(&self, index: usize) -> std::result::Result<Option<Decimal>, ActionError> {
        if self.value(index)?.is_null() {
            return Ok(None);
        }
        self.decimal(index).map(Some)
    }

    /// Integer argument, `None` when null
    pub fn opt_int(&self, index: usize) -> std::result::Result<Option<i64>, ActionError> {
        if self.value(index)?.is_null() {
            return Ok(None);
        }
        self.int(index).map(Some)
    }

    /// Timestamp argument, `None` when null
    pub fn opt_timestamp(
        &self,
        index: usize,
    ) -> std::result::Result<Option<DateTime<Utc>>, ActionError> {
        if self.value(index)?.is_null() {
            return Ok(None);
        }
        self.timestamp(index).map(Some)
    }

    fn mismatch(&self, index: usize, value: &Value, expected: ValueKind) -> ActionError {
        ActionError::new(format!(
            "argument {} of '{}' is {}, expected {}",
            index,
            self.action,
            value.kind(),
            expected
        ))
    }
}
