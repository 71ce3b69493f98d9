use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::context::ExecutionContext;
use super::evaluator::EvalResult;
use super::scope::Scope;
use super::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFunctionFlags {
    /// Only the latest child value is kept, in slot 0
    pub discard_params: bool,
    /// ctrl data survives re-entry of the same statement position
    pub keep_data: bool,
    /// Absorbs `return` signalled by a descendant
    pub catch_return: bool,
}

impl ScopeFunctionFlags {
    pub const NONE: Self = Self {
        discard_params: false,
        keep_data: false,
        catch_return: false,
    };

    pub const DISCARD: Self = Self {
        discard_params: true,
        keep_data: false,
        catch_return: false,
    };

    pub const DISCARD_KEEP: Self = Self {
        discard_params: true,
        keep_data: true,
        catch_return: false,
    };

    pub const DISCARD_CATCH: Self = Self {
        discard_params: true,
        keep_data: false,
        catch_return: true,
    };
}

/// A built-in function driven by the scope evaluator.
///
/// The evaluator never special-cases control flow. Instead it asks the
/// function, through the hooks below, whether to run at all, where to start
/// visiting children and where to go after each child. Hooks receive the
/// parent frame so they can steer the parent's traversal (skip a sibling,
/// arm a loop, set a break index).
///
/// Returning `None` from `start_param` or `next_param` stops visiting
/// children; `invoke` still runs.
#[async_trait]
pub trait ScopeFunction: Send + Sync {
    fn name(&self) -> &'static str;

    fn flags(&self) -> ScopeFunctionFlags {
        ScopeFunctionFlags::NONE
    }

    fn should_execute(&self, _scope: &Scope<'_>, _parent: Option<&Scope<'_>>) -> bool {
        true
    }

    fn start_param(&self, _scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        Some(0)
    }

    fn next_param(&self, scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        Some(scope.i + 1)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value>;

    /// Value of the bare name, e.g. `map` used as a type.
    fn as_value(&self) -> Option<Value> {
        None
    }
}

#[derive(Clone)]
enum RegistryEntry {
    Function(Arc<dyn ScopeFunction>),
    Value(Value),
}

/// Immutable name table shared by every evaluation.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("names", &names)
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::functions::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, function: impl ScopeFunction + 'static) {
        self.register_as(function.name(), Arc::new(function));
    }

    pub fn register_as(&mut self, name: &str, function: Arc<dyn ScopeFunction>) {
        self.entries
            .insert(name.to_string(), RegistryEntry::Function(function));
    }

    pub fn register_value(&mut self, name: &str, value: Value) {
        self.entries
            .insert(name.to_string(), RegistryEntry::Value(value));
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn ScopeFunction>> {
        match self.entries.get(name) {
            Some(RegistryEntry::Function(f)) => Some(f.clone()),
            _ => None,
        }
    }

    /// Value bound to a bare name: a registered value or a function's
    /// `as_value`.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.entries.get(name)? {
            RegistryEntry::Value(v) => Some(v.clone()),
            RegistryEntry::Function(f) => f.as_value(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}
