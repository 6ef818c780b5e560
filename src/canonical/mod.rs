//! Canonical form of Cadence source
//!
//! Canonicalization erases everything that does not change what the code
//! does: whitespace, comments, how imports are grouped, and the spelling of
//! addresses (`0x1` and `0x0000000000000001` are the same account). The
//! resulting [`CanonicalForm`] is rendered to text and hashed by [`hash`],
//! once per [`HashFlavor`].

mod digest;

pub use digest::{hash, AddressBook, Digest, HashFlavor, NetworkContext, TemplateHashes};

use crate::parser::{self, Program, TokenTree};
use crate::ParseError;

/// Number of hex digits in a Flow account address
const ADDRESS_HEX_DIGITS: usize = 16;

/// Where an import is resolved from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportLocation {
    /// Concrete account address, normalized to `0x` + 16 lowercase hex digits
    Address(String),
    /// Placeholder such as `0xFUNGIBLETOKENADDRESS`, substituted per network
    Placeholder(String),
    /// `import "A"` or `import A`, resolved by contract name
    Unspecified,
}

/// One imported contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImport {
    pub contract: String,
    pub location: ImportLocation,
}

/// Formatting-independent representation of a program
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm {
    pub imports: Vec<CanonicalImport>,
    pub body: Vec<TokenTree>,
}

/// Parse and normalize Cadence source
pub fn canonicalize(source: &str) -> Result<CanonicalForm, Vec<ParseError>> {
    let program = parser::parse(source)?;
    Ok(CanonicalForm::from_program(program))
}

impl CanonicalForm {
    pub fn from_program(program: Program) -> Self {
        let imports = program
            .imports
            .into_iter()
            .flat_map(|decl| {
                let location = match &decl.node.location {
                    Some(raw) => classify_location(&raw.node),
                    None => ImportLocation::Unspecified,
                };
                decl.node
                    .contracts
                    .into_iter()
                    .map(move |contract| CanonicalImport {
                        contract: contract.node,
                        location: location.clone(),
                    })
            })
            .collect();

        Self {
            imports,
            body: program.body,
        }
    }

    /// Whether any import names a concrete account address
    pub fn has_concrete_addresses(&self) -> bool {
        self.imports
            .iter()
            .any(|import| matches!(import.location, ImportLocation::Address(_)))
    }

    /// Render the body as single-space separated tokens
    pub fn render_body(&self) -> String {
        let mut pieces = Vec::new();
        flatten(&self.body, &mut pieces);
        pieces.join(" ")
    }

    /// Render the full canonical text for a hashing context
    pub fn render(&self, ctx: &NetworkContext) -> String {
        let mut lines: Vec<String> = self
            .imports
            .iter()
            .map(|import| ctx.render_import(import))
            .collect();
        lines.push(self.render_body());
        lines.join("\n")
    }
}

fn flatten<'a>(trees: &'a [TokenTree], out: &mut Vec<&'a str>) {
    for tree in trees {
        match tree {
            TokenTree::Leaf(tok) => out.push(tok.text()),
            TokenTree::Group {
                delimiter,
                children,
            } => {
                out.push(delimiter.open());
                flatten(children, out);
                out.push(delimiter.close());
            }
        }
    }
}

fn classify_location(raw: &str) -> ImportLocation {
    match normalize_address(raw) {
        Some(address) => ImportLocation::Address(address),
        None => ImportLocation::Placeholder(raw.to_string()),
    }
}

/// Normalize a hex account address to `0x` + 16 lowercase digits
///
/// Returns `None` when the input is not a hex address (placeholders).
pub fn normalize_address(raw: &str) -> Option<String> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits = digits.to_ascii_lowercase();
    if digits.len() >= ADDRESS_HEX_DIGITS {
        Some(format!("0x{}", digits))
    } else {
        Some(format!("0x{:0>width$}", digits, width = ADDRESS_HEX_DIGITS))
    }
}
