use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::ConvoFunction;
use crate::capability::Capabilities;
use crate::config::EvalConfig;

use super::evaluator::{EvalError, EvalResult};
use super::value::Value;

/// Name bindings and collaborators for one evaluation.
///
/// Variables live in a stack of frames. The bottom frame holds globals and
/// each declared-function call pushes its own frame.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    frames: Vec<HashMap<String, Value>>,
    functions: HashMap<String, Arc<ConvoFunction>>,
    capabilities: Capabilities,
    config: EvalConfig,
    depth: usize,
    nesting: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            frames: vec![HashMap::new()],
            functions: HashMap::new(),
            capabilities,
            config: EvalConfig::default(),
            depth: 0,
            nesting: 0,
        }
    }

    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Updates the innermost frame that already binds `name`, otherwise
    /// binds it in the current frame.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.contains_key(&name))
        {
            frame.insert(name, value);
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name, value);
        }
    }

    /// Binds `name` in the current frame, shadowing outer bindings.
    pub fn define_var(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Resolves `a.b.0` style paths. `None` when the root is unbound.
    pub fn lookup_path(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let root = self.get_var(parts.next()?)?;
        let mut value = root.clone();
        for key in parts {
            value = value.property(key);
        }
        Some(value)
    }

    /// Assigns through a dotted path, creating intermediate objects. Array
    /// indexes may address an existing item or append one at the end.
    pub fn set_path(&mut self, path: &str, value: Value) -> EvalResult<()> {
        let Some((root, rest)) = path.split_once('.') else {
            self.set_var(path, value);
            return Ok(());
        };
        let mut target = self.get_var(root).cloned().unwrap_or_else(Value::object);
        set_property_path(&mut target, rest, value).map_err(|message| {
            EvalError::InvalidAssignment {
                path: path.to_string(),
                message,
            }
        })?;
        self.set_var(root, target);
        Ok(())
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn define_function(&mut self, function: ConvoFunction) {
        self.functions
            .insert(function.name.clone(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<Arc<ConvoFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn enter_call(&mut self) -> EvalResult<()> {
        if self.depth >= self.config.max_call_depth {
            return Err(EvalError::MaxCallDepth(self.config.max_call_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn enter_scope(&mut self) -> EvalResult<()> {
        if self.nesting >= self.config.max_nesting_depth {
            return Err(EvalError::MaxNestingDepth(self.config.max_nesting_depth));
        }
        self.nesting += 1;
        Ok(())
    }

    pub fn exit_scope(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }
}

fn set_property_path(target: &mut Value, path: &str, value: Value) -> Result<(), String> {
    let (key, rest) = match path.split_once('.') {
        Some((key, rest)) => (key, Some(rest)),
        None => (path, None),
    };
    match target {
        Value::Object(_) => match rest {
            None => {
                target.insert(key, value);
                Ok(())
            }
            Some(rest) => {
                let mut child = match target.property(key) {
                    child @ Value::Object(_) | child @ Value::Array(_) => child,
                    _ => Value::object(),
                };
                set_property_path(&mut child, rest, value)?;
                target.insert(key, child);
                Ok(())
            }
        },
        Value::Array(items) => {
            let Ok(index) = key.parse::<usize>() else {
                return Ok(());
            };
            if index > items.len() {
                return Err(format!(
                    "index {} is past the end of an array of length {}",
                    index,
                    items.len()
                ));
            }
            if index == items.len() {
                items.push(Value::Undefined);
            }
            match rest {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => set_property_path(&mut items[index], rest, value),
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frames_shadow_and_update() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("x", Value::Number(1.0));
        ctx.push_frame();
        ctx.define_var("x", Value::Number(2.0));
        ctx.set_var("y", Value::Number(3.0));
        assert_eq!(ctx.get_var("x"), Some(&Value::Number(2.0)));
        ctx.pop_frame();
        assert_eq!(ctx.get_var("x"), Some(&Value::Number(1.0)));
        assert_eq!(ctx.get_var("y"), None);
    }

    #[test]
    fn test_set_var_updates_outer_binding() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("count", Value::Number(0.0));
        ctx.push_frame();
        ctx.set_var("count", Value::Number(5.0));
        ctx.pop_frame();
        assert_eq!(ctx.get_var("count"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn test_paths() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("user", Value::from_json(json!({"name": "ann", "tags": ["a"]})));
        assert_eq!(ctx.lookup_path("user.name"), Some(Value::from("ann")));
        assert_eq!(ctx.lookup_path("user.tags.0"), Some(Value::from("a")));
        assert_eq!(ctx.lookup_path("user.nope"), Some(Value::Undefined));
        assert_eq!(ctx.lookup_path("nobody.name"), None);

        ctx.set_path("user.address.city", Value::from("Kyoto")).unwrap();
        assert_eq!(ctx.lookup_path("user.address.city"), Some(Value::from("Kyoto")));
        ctx.set_path("user.tags.1", Value::from("b")).unwrap();
        assert_eq!(ctx.lookup_path("user.tags.length"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_set_path_rejects_index_past_end() {
        let mut ctx = ExecutionContext::new();
        ctx.set_var("list", Value::from_json(json!([1])));
        let err = ctx
            .set_path("list.99999999999999", Value::Number(2.0))
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidAssignment { .. }));
        let err = ctx
            .set_path(&format!("list.{}", usize::MAX), Value::Number(2.0))
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidAssignment { .. }));
        assert_eq!(ctx.lookup_path("list"), Some(Value::from_json(json!([1]))));
    }

    #[test]
    fn test_call_depth_limit() {
        let mut ctx = ExecutionContext::new().with_config(EvalConfig {
            max_call_depth: 1,
            ..Default::default()
        });
        assert!(ctx.enter_call().is_ok());
        assert!(matches!(ctx.enter_call(), Err(EvalError::MaxCallDepth(1))));
        ctx.exit_call();
        assert!(ctx.enter_call().is_ok());
    }
}
