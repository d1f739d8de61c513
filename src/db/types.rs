//! Domain and response types for database worker operations.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Address = u64;

/// Marker emitted when a function has no high-level IR.
pub const HLIL_UNAVAILABLE: &str = "// HLIL not available for this function";
/// Marker emitted when neither IR tier is available.
pub const NO_IR_AVAILABLE: &str = "// No intermediate representation available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub start: Address,
    pub size: u64,
}

impl Function {
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr - self.start < self.size.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    ImportedFunction,
    ImportAddress,
    Data,
    ImportedData,
    External,
    LibraryFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolBinding {
    #[default]
    None,
    Local,
    Global,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub address: Address,
    pub kind: SymbolKind,
    pub binding: SymbolBinding,
}

impl Symbol {
    /// Same kind, binding and address under a different name.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn is_import(&self) -> bool {
        self.kind == SymbolKind::ImportedFunction
    }

    pub fn is_export(&self) -> bool {
        matches!(self.kind, SymbolKind::Function | SymbolKind::Data)
            && self.binding == SymbolBinding::Global
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringEntry {
    pub address: Address,
    pub value: String,
}

impl fmt::Display for StringEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}: {}", self.address, self.value)
    }
}

/// `GET /health` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInfo {
    pub status: String,
    pub binary: Option<String>,
}

/// Ordered listings served by the paginated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Functions,
    Types,
    Imports,
    Exports,
    Strings,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functions => "functions",
            Self::Types => "types",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Strings => "strings",
        }
    }
}

/// One code location referencing a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XrefEntry {
    pub address: Address,
    pub function: Option<String>,
}

impl fmt::Display for XrefEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(func) => write!(f, "0x{:x} (in {})", self.address, func),
            None => write!(f, "0x{:x}", self.address),
        }
    }
}

/// Result of a cross-reference query. An unresolved name is distinct from a
/// resolved target that has no references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XrefLookup {
    Unresolved {
        name: String,
    },
    Resolved {
        name: String,
        target: Address,
        refs: Vec<XrefEntry>,
    },
}

impl fmt::Display for XrefLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { name } => write!(f, "Could not find '{name}'"),
            Self::Resolved { name, refs, .. } if refs.is_empty() => {
                write!(f, "No cross-references found for '{name}'")
            }
            Self::Resolved { refs, .. } => {
                let lines: Vec<String> = refs.iter().map(ToString::to_string).collect();
                f.write_str(&lines.join("\n"))
            }
        }
    }
}

/// IR tier a decompilation was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrTier {
    High,
    Mid,
    Unavailable,
}

/// Best-effort decompiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompilation {
    pub tier: IrTier,
    pub text: String,
    /// Host failure hit while fetching an IR tier.
    pub failure: Option<String>,
}

impl fmt::Display for Decompilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = match self.tier {
            IrTier::High => self.text.clone(),
            IrTier::Mid => format!("{HLIL_UNAVAILABLE}\n{}", self.text),
            IrTier::Unavailable => format!("{HLIL_UNAVAILABLE}\n{NO_IR_AVAILABLE}"),
        };
        if let Some(err) = &self.failure {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("// Error decompiling function: {err}"));
        }
        f.write_str(&out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompileOutcome {
    Missing { name: String },
    Decompiled(Decompilation),
}

impl fmt::Display for DecompileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { name } => write!(f, "Function '{name}' not found"),
            Self::Decompiled(d) => d.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Function {
        old_name: String,
        new_name: String,
        address: Address,
    },
    DataSymbol {
        old_name: String,
        new_name: String,
        address: Address,
    },
    Missing {
        old_name: String,
    },
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function {
                old_name, new_name, ..
            }
            | Self::DataSymbol {
                old_name, new_name, ..
            } => write!(f, "Renamed '{old_name}' to '{new_name}'"),
            Self::Missing { old_name } => write!(f, "Could not find '{old_name}'"),
        }
    }
}
