//! Checks that every EBNF operator used in the grammar file is actually
//! allowed (`%allow_ebnf` declared) before the grammar builder desugars
//! anything. Each extension gets its own explicit match arm rather than
//! a shared fallthrough case, so a future extension with different rules
//! doesn't silently inherit another one's handling.

use caper_input::{Extension, GrammarFile};

use crate::errors::GeneratorError;
use crate::options::Options;

pub fn validate_ebnf_usage(file: &GrammarFile, options: &Options) -> Vec<GeneratorError> {
    let mut errors = Vec::new();
    for rule in &file.rules {
        for choice in &rule.inner.choices {
            for element in &choice.elements {
                match element.inner.extension {
                    Extension::None => {}
                    Extension::Star => check_allowed(options, element, &mut errors),
                    Extension::Plus => check_allowed(options, element, &mut errors),
                    Extension::Question => check_allowed(options, element, &mut errors),
                    Extension::Slash => check_allowed(options, element, &mut errors),
                }
            }
        }
    }
    errors
}

fn check_allowed(
    options: &Options,
    element: &caper_input::Spanned<caper_input::RuleItem>,
    errors: &mut Vec<GeneratorError>,
) {
    if !options.allow_ebnf {
        errors.push(GeneratorError::EbnfNotAllowed {
            item: format!("{}{}", element.inner.name, element.inner.extension),
            span: element.span,
        });
    }
}
