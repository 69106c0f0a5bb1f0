//! Generator options, populated by the Symbol Collector from a grammar
//! file's declarations and threaded read-only through table building and
//! emission.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub allow_ebnf: bool,
    pub external_token: bool,
    pub recover_token: Option<String>,
    pub token_prefix: String,
    pub namespace: Option<String>,
    pub access_modifier: Option<String>,
    pub dont_use_stl: bool,
    pub debug_parser: bool,
    pub allow_conflicts: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            allow_ebnf: false,
            external_token: false,
            recover_token: None,
            token_prefix: String::new(),
            namespace: None,
            access_modifier: None,
            dont_use_stl: false,
            debug_parser: false,
            allow_conflicts: false,
        }
    }
}
