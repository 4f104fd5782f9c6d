//! The coding-standards rule set.
//!
//! Rules are an ordered list of numbered statements embedded verbatim into
//! every analysis prompt. Rule identifiers follow the `规则N` form that the
//! response grammar references.

use crate::config::RulesConfig;

/// Built-in rule set, extended over time.
pub const DEFAULT_RULES: &[&str] = &[
    "规则1: 数组索引必须使用无符号类型（如size_t）",
    "规则2: 禁止使用C风格强制类型转换，必须使用static_cast等C++风格转换",
    "规则3: 所有指针必须初始化（包括nullptr初始化）",
];

/// The rule set in effect: the config override when given, otherwise the
/// built-in list.
pub fn active_rules(config: &RulesConfig) -> Vec<String> {
    if config.custom.is_empty() {
        DEFAULT_RULES.iter().map(|r| r.to_string()).collect()
    } else {
        config.custom.clone()
    }
}
