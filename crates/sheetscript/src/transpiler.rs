//! Emission of the final program from a list of code chunks

use std::fmt;

use anyhow::{Context, Result, anyhow};
use log::debug;
use ruff_python_parser::parse_module;

use crate::{code_chunks::CodeChunk, error::StepResult, types::FxIndexSet};

/// Generated Python program: import lines followed by the body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub imports: Vec<String>,
    pub body: Vec<String>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.body.is_empty()
    }

    pub fn to_code(&self) -> String {
        self.to_string()
    }

    /// Check that the program is syntactically valid Python
    pub fn validate(&self) -> Result<()> {
        let code = self.to_code();
        parse_module(&code)
            .map(|_| ())
            .map_err(|err| anyhow!("{err}"))
            .context("Generated code is not valid Python")
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "{import}")?;
        }
        if !self.imports.is_empty() && !self.body.is_empty() {
            writeln!(f)?;
        }
        for line in &self.body {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transpiler {
    /// Emit each chunk's description as a comment above its code
    pub description_comments: bool,
}

impl Default for Transpiler {
    fn default() -> Self {
        Self {
            description_comments: true,
        }
    }
}

impl Transpiler {
    pub fn new(description_comments: bool) -> Self {
        Self {
            description_comments,
        }
    }

    /// Render chunks in order. Imports are de-duplicated in the order they
    /// are first needed; chunks are separated by a blank line.
    pub fn transpile(&self, code_chunks: &[CodeChunk]) -> StepResult<Program> {
        let mut imports: FxIndexSet<String> = FxIndexSet::default();
        let mut body = Vec::new();

        for chunk in code_chunks {
            let (code, chunk_imports) = chunk.get_code()?;
            if code.is_empty() {
                continue;
            }
            imports.extend(chunk_imports);

            if !body.is_empty() {
                body.push(String::new());
            }
            if self.description_comments {
                body.push(format!("# {}", chunk.get_description_comment()));
            }
            body.extend(code);
        }

        debug!(
            "Transpiled {} chunks into {} lines with {} imports",
            code_chunks.len(),
            body.len(),
            imports.len()
        );
        Ok(Program {
            imports: imports.into_iter().collect(),
            body,
        })
    }
}
