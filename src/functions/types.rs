use async_trait::async_trait;

use crate::eval::{
    ConvoType, EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction, StructField,
    Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    for (name, ty) in [
        ("string", ConvoType::String),
        ("number", ConvoType::Number),
        ("int", ConvoType::Int),
        ("boolean", ConvoType::Boolean),
        ("time", ConvoType::Time),
        ("void", ConvoType::Void),
        ("any", ConvoType::Any),
    ] {
        registry.register_value(name, Value::Type(ty));
    }
    registry.register_value("true", Value::Boolean(true));
    registry.register_value("false", Value::Boolean(false));
    registry.register_value("null", Value::Null);
    registry.register_value("undefined", Value::Undefined);

    registry.register(Map { name: "map" });
    registry.register(Map { name: "jsonMap" });
    registry.register(Array { name: "array" });
    registry.register(Array { name: "jsonArray" });
    registry.register(Struct);
    registry.register(Enum);
}

/// Object built from labelled arguments. Unlabelled ones are keyed by
/// position.
struct Map {
    name: &'static str,
}

#[async_trait]
impl ScopeFunction for Map {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let mut object = Value::object();
        for (index, (param, value)) in scope.params().iter().zip(&scope.param_values).enumerate() {
            let key = param.label.clone().unwrap_or_else(|| index.to_string());
            object.insert(key, value.clone());
        }
        Ok(object)
    }

    fn as_value(&self) -> Option<Value> {
        Some(Value::Type(ConvoType::Map))
    }
}

struct Array {
    name: &'static str,
}

#[async_trait]
impl ScopeFunction for Array {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Array(std::mem::take(&mut scope.param_values)))
    }

    fn as_value(&self) -> Option<Value> {
        Some(Value::Type(ConvoType::Array))
    }
}

/// `struct(name: string age?: number)`
struct Struct;

#[async_trait]
impl ScopeFunction for Struct {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn start_param(&self, scope: &mut Scope<'_>, _parent: Option<&mut Scope<'_>>) -> Option<usize> {
        scope.cm = true;
        Some(0)
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let fields = scope
            .params()
            .iter()
            .zip(&scope.param_values)
            .filter_map(|(param, ty)| {
                param.label.as_ref().map(|name| StructField {
                    name: name.clone(),
                    ty: ty.clone(),
                    optional: param.opt,
                })
            })
            .collect();
        Ok(Value::Type(ConvoType::Struct(fields)))
    }
}

struct Enum;

#[async_trait]
impl ScopeFunction for Enum {
    fn name(&self) -> &'static str {
        "enum"
    }

    async fn invoke(&self, scope: &mut Scope<'_>, _ctx: &mut ExecutionContext) -> EvalResult<Value> {
        Ok(Value::Type(ConvoType::Enum(scope.param_values.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::value;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_map_keys() {
        let v = value("map(name: 'ann' 42)").await;
        assert_eq!(
            v,
            Value::Object(vec![
                ("name".into(), Value::from("ann")),
                ("1".into(), Value::Number(42.0)),
            ])
        );
        assert_eq!(value("jsonMap(a: 1)").await.property("a"), Value::Number(1.0));
    }

    #[tokio::test]
    async fn test_bare_names_resolve_to_types() {
        assert_eq!(value("map").await, Value::Type(ConvoType::Map));
        assert_eq!(value("array").await, Value::Type(ConvoType::Array));
        assert_eq!(value("string").await, Value::Type(ConvoType::String));
    }

    #[tokio::test]
    async fn test_struct_type() {
        let v = value("struct(name: string age?: int)").await;
        let Value::Type(ConvoType::Struct(fields)) = v else {
            panic!("expected struct type, got {:?}", v);
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "name");
        assert!(!fields[0].optional);
        assert!(fields[1].optional);
        assert_eq!(fields[1].ty, Value::Type(ConvoType::Int));
    }

    #[tokio::test]
    async fn test_enum_type() {
        let v = value("enum('red' 'green')").await;
        let Value::Type(ty) = v else {
            panic!("expected type");
        };
        assert!(ty.check(&Value::from("red")));
        assert!(!ty.check(&Value::from("blue")));
    }
}
