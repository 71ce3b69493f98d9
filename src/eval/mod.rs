pub mod context;
pub mod evaluator;
pub mod function;
pub mod scope;
pub mod value;

pub use context::ExecutionContext;
pub use evaluator::{EvalError, EvalResult, Evaluator};
pub use function::{FunctionRegistry, ScopeFunction, ScopeFunctionFlags};
pub use scope::Scope;
pub use value::{ControlSignal, ConvoType, StructField, Value};
