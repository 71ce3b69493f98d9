//! Built-in scope functions.
//!
//! Each module holds a family of built-ins and exposes `register`, which adds
//! them to a [`FunctionRegistry`].

use crate::eval::FunctionRegistry;

pub mod compare; // and / or / not / is / eq / gt / gte / lt / lte
pub mod control; // if / elif / then / else / while / foreach / in / break / do / body / fn / return
pub mod http; // httpGet / httpGetString / httpPost / httpPut / httpPatch / httpDelete
pub mod math; // add / sub / mul / div / mod / pow / inc / dec
pub mod switch; // switch / case / test / default
pub mod types; // map / array / struct / enum and base types
pub mod util; // print / rand / sleep / encodeURI / encodeURIComponent

/// Register every built-in.
pub fn register_all(registry: &mut FunctionRegistry) {
    compare::register(registry);
    control::register(registry);
    http::register(registry);
    math::register(registry);
    switch::register(registry);
    types::register(registry);
    util::register(registry);
}
