//! Code templates that point the simulator at the exchange files.
//!
//! A template is caller-supplied code containing `{{input}}` and/or
//! `{{output}}`. Rendering substitutes file paths escaped for a single-quoted
//! string literal, so templates should place the tokens inside quotes.

use std::path::Path;

use crate::eidos::escape;
use crate::error::{Result, WrapError};

pub const INPUT_TOKEN: &str = "{{input}}";
pub const OUTPUT_TOKEN: &str = "{{output}}";

/// Variable holding the parameter file path inside the simulation.
pub const INPUT_VARIABLE: &str = "SLIMWRAP_INPUT";
/// Variable holding the path the simulation should write results to.
pub const OUTPUT_VARIABLE: &str = "SLIMWRAP_OUTPUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    code: String,
}

impl Template {
    /// Rejects code that references no known token or an unknown `{{...}}` token.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let mut rest = code.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start..];
            let end = after
                .find("}}")
                .ok_or_else(|| WrapError::Template(format!("unterminated token in {code:?}")))?;
            let token = &after[..end + 2];
            if token != INPUT_TOKEN && token != OUTPUT_TOKEN {
                return Err(WrapError::Template(format!("unknown token {token}")));
            }
            rest = &after[end + 2..];
        }
        if !code.contains(INPUT_TOKEN) && !code.contains(OUTPUT_TOKEN) {
            return Err(WrapError::Template(format!(
                "{code:?} references neither {INPUT_TOKEN} nor {OUTPUT_TOKEN}"
            )));
        }
        Ok(Self { code })
    }

    /// `SLIMWRAP_INPUT='{{input}}'`
    pub fn input_definition() -> Self {
        Self {
            code: format!("{INPUT_VARIABLE}='{INPUT_TOKEN}'"),
        }
    }

    /// `SLIMWRAP_OUTPUT='{{output}}'`
    pub fn output_definition() -> Self {
        Self {
            code: format!("{OUTPUT_VARIABLE}='{OUTPUT_TOKEN}'"),
        }
    }

    pub fn uses_input(&self) -> bool {
        self.code.contains(INPUT_TOKEN)
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Substitutes the file paths. A token whose path is `None` is an error.
    pub fn render(&self, input: Option<&Path>, output: Option<&Path>) -> Result<String> {
        let mut code = self.code.clone();
        for (token, path) in [(INPUT_TOKEN, input), (OUTPUT_TOKEN, output)] {
            if !code.contains(token) {
                continue;
            }
            let path = path.ok_or_else(|| WrapError::Template(format!("no path bound for {token}")))?;
            let text = path.to_str().ok_or_else(|| {
                WrapError::Template(format!("path {} is not valid UTF-8", path.display()))
            })?;
            code = code.replace(token, &escape(text));
        }
        Ok(code)
    }
}
