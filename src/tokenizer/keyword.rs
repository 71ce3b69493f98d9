use serde::{Deserialize, Serialize};

/// Words that produce a literal value instead of a variable reference.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ValueConstant {
    True,
    False,
    Null,
    Undefined,
}

/// Reserved words that are recognised by the parser but never called.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NonFuncKeyword {
    In,
}

impl ValueConstant {
    pub fn lookup(word: &str) -> Option<Self> {
        word.parse().ok()
    }
}

impl NonFuncKeyword {
    pub fn lookup(word: &str) -> Option<Self> {
        word.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_constants() {
        assert_eq!(ValueConstant::lookup("true"), Some(ValueConstant::True));
        assert_eq!(
            ValueConstant::lookup("undefined"),
            Some(ValueConstant::Undefined)
        );
        // 大文字は定数扱いしない
        assert_eq!(ValueConstant::lookup("True"), None);
    }

    #[test]
    fn test_non_func_keywords() {
        assert_eq!(NonFuncKeyword::lookup("in"), Some(NonFuncKeyword::In));
        assert_eq!(NonFuncKeyword::lookup("if"), None);
        assert_eq!(NonFuncKeyword::In.to_string(), "in");
    }
}
