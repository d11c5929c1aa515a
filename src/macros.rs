// Macros to simplify rule declarations

/// Builds a `Vec<Rule>` from named s-expression rules, propagating pattern
/// errors with `?`.
macro_rules! rules {
    ($domain:expr; ) => {
        Vec::<$crate::rewriting::Rule>::new()
    };
    ($domain:expr; $($name:literal : $from:literal => $to:literal),+ $(,)?) => {
        vec![$($crate::rewriting::Rule::parse($domain, $name, $from, $to)?),+]
    };
}
