use async_trait::async_trait;
use tracing::debug;

use crate::capability::{HttpMethod, HttpRequest};
use crate::eval::{
    EvalError, EvalResult, ExecutionContext, FunctionRegistry, Scope, ScopeFunction, Value,
};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Http::new("httpGet", HttpMethod::Get));
    registry.register(Http {
        text: true,
        ..Http::new("httpGetString", HttpMethod::Get)
    });
    registry.register(Http::new("httpDelete", HttpMethod::Delete));
    registry.register(Http::new("httpPost", HttpMethod::Post));
    registry.register(Http::new("httpPut", HttpMethod::Put));
    registry.register(Http::new("httpPatch", HttpMethod::Patch));
}

/// `httpGet(url options?)`, `httpPost(url body options?)` and friends.
struct Http {
    name: &'static str,
    method: HttpMethod,
    /// Return the raw body instead of parsed JSON
    text: bool,
}

impl Http {
    fn new(name: &'static str, method: HttpMethod) -> Self {
        Self {
            name,
            method,
            text: false,
        }
    }

    fn has_body(&self) -> bool {
        matches!(
            self.method,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
        )
    }

    fn build_request(&self, args: &[Value]) -> EvalResult<HttpRequest> {
        let Some(url) = args.first().and_then(Value::as_str) else {
            return Err(EvalError::invalid_args(
                self.name,
                "First arg must be a string URL",
            ));
        };
        let mut request = HttpRequest::new(self.method, url);
        let options = if self.has_body() {
            request.body = args.get(1).filter(|v| !v.is_undefined()).map(Value::to_json);
            args.get(2)
        } else {
            args.get(1)
        };
        if let Some(Value::Object(headers)) = options.map(|o| o.property("headers")) {
            request.headers = headers
                .into_iter()
                .map(|(name, value)| (name, value.to_string()))
                .collect();
        }
        Ok(request)
    }
}

/// JSON response bodies: empty is undefined, anything unparsable stays a
/// string.
fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Undefined;
    }
    serde_json::from_str(body)
        .map(Value::from_json)
        .unwrap_or_else(|_| Value::String(body.to_string()))
}

#[async_trait]
impl ScopeFunction for Http {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, scope: &mut Scope<'_>, ctx: &mut ExecutionContext) -> EvalResult<Value> {
        let request = self.build_request(&scope.param_values)?;
        debug!("{} {}", self.name, request.url);
        let http = ctx.capabilities().http.clone();
        let response = http.request(request).await?;
        if self.text {
            return Ok(Value::String(response.body));
        }
        Ok(parse_body(&response.body))
    }
}
