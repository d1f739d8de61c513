//! In-memory host database loaded from a JSON analysis export.
//!
//! Stands in for a live analysis session when the gateway runs outside the
//! host application, and backs the test suite.

use crate::db::types::{Address, Function, StringEntry, Symbol, SymbolBinding, SymbolKind};
use crate::db::{HostError, ProgramDatabase};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    functions: Vec<FunctionRecord>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    symbols: Vec<SymbolRecord>,
    #[serde(default)]
    strings: Vec<StringRecord>,
    #[serde(default)]
    data_vars: Vec<AddressValue>,
    #[serde(default)]
    references: Vec<ReferenceRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionRecord {
    name: String,
    start: AddressValue,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    hlil: Option<String>,
    #[serde(default)]
    mlil: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SymbolRecord {
    name: String,
    address: AddressValue,
    kind: SymbolKind,
    #[serde(default)]
    binding: SymbolBinding,
}

#[derive(Debug, Deserialize)]
struct StringRecord {
    address: AddressValue,
    value: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ReferenceRecord {
    from: AddressValue,
    to: AddressValue,
}

/// Address given either as a JSON number or as a `0x`-prefixed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AddressValue(Address);

impl<'de> Deserialize<'de> for AddressValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(AddressValue(n)),
            Raw::Text(s) => parse_address(&s)
                .map(AddressValue)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid address: {s}"))),
        }
    }
}

fn parse_address(s: &str) -> Option<Address> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[derive(Debug, Clone)]
struct FunctionEntry {
    function: Function,
    hlil: Option<String>,
    mlil: Option<String>,
}

#[derive(Debug)]
struct SnapshotState {
    filename: Option<String>,
    functions: Vec<FunctionEntry>,
    types: Vec<String>,
    symbols: BTreeMap<Address, Symbol>,
    strings: Vec<StringEntry>,
    data_vars: Vec<Address>,
    references: Vec<(Address, Address)>,
    /// Derived: target address -> referencing addresses in reference order.
    code_refs: BTreeMap<Address, Vec<Address>>,
}

impl SnapshotState {
    fn rebuild_code_refs(&mut self) {
        let mut index: BTreeMap<Address, Vec<Address>> = BTreeMap::new();
        for &(from, to) in &self.references {
            index.entry(to).or_default().push(from);
        }
        self.code_refs = index;
    }
}

/// Snapshot-backed [`ProgramDatabase`].
#[derive(Debug)]
pub struct SnapshotDatabase {
    state: RwLock<SnapshotState>,
    generation: AtomicU64,
}

impl SnapshotDatabase {
    /// Parse a snapshot from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, HostError> {
        let file: SnapshotFile = serde_json::from_str(json)
            .map_err(|e| HostError::new(format!("invalid snapshot: {e}")))?;

        let mut data_vars: Vec<Address> = file.data_vars.iter().map(|a| a.0).collect();
        data_vars.sort_unstable();
        data_vars.dedup();

        let symbols = file
            .symbols
            .into_iter()
            .map(|s| {
                let address = s.address.0;
                (
                    address,
                    Symbol {
                        name: s.name,
                        address,
                        kind: s.kind,
                        binding: s.binding,
                    },
                )
            })
            .collect();

        let mut state = SnapshotState {
            filename: file.filename.filter(|name| !name.is_empty()),
            functions: file
                .functions
                .into_iter()
                .map(|f| FunctionEntry {
                    function: Function {
                        name: f.name,
                        start: f.start.0,
                        size: f.size,
                    },
                    hlil: f.hlil,
                    mlil: f.mlil,
                })
                .collect(),
            types: file.types,
            symbols,
            strings: file
                .strings
                .into_iter()
                .map(|s| StringEntry {
                    address: s.address.0,
                    value: s.value,
                })
                .collect(),
            data_vars,
            references: file.references.iter().map(|r| (r.from.0, r.to.0)).collect(),
            code_refs: BTreeMap::new(),
        };
        state.rebuild_code_refs();

        debug!(
            functions = state.functions.len(),
            symbols = state.symbols.len(),
            strings = state.strings.len(),
            "Snapshot parsed"
        );

        Ok(Self {
            state: RwLock::new(state),
            generation: AtomicU64::new(0),
        })
    }

    /// Load a snapshot file from disk.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HostError::new(format!("{}: {e}", path.display())))?;
        let db = Self::from_json_str(&text)?;
        info!(path = %path.display(), binary = ?db.filename(), "Snapshot loaded");
        Ok(db)
    }

    /// Number of completed analysis passes since load.
    pub fn analysis_generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Record a code reference; it becomes visible after the next analysis
    /// update, like any other edit the host has not analyzed yet.
    pub fn add_reference(&self, from: Address, to: Address) {
        self.write().references.push((from, to));
    }

    fn read(&self) -> RwLockReadGuard<'_, SnapshotState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SnapshotState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn function_entry(&self, start: Address) -> Result<FunctionEntry, HostError> {
        self.read()
            .functions
            .iter()
            .find(|f| f.function.start == start)
            .cloned()
            .ok_or_else(|| HostError::new(format!("no function at {start:#x}")))
    }
}

impl ProgramDatabase for SnapshotDatabase {
    fn filename(&self) -> Option<String> {
        self.read().filename.clone()
    }

    fn functions(&self) -> Result<Vec<Function>, HostError> {
        Ok(self
            .read()
            .functions
            .iter()
            .map(|f| f.function.clone())
            .collect())
    }

    fn function_containing(&self, addr: Address) -> Result<Option<Function>, HostError> {
        Ok(self
            .read()
            .functions
            .iter()
            .map(|f| &f.function)
            .find(|f| f.contains(addr))
            .cloned())
    }

    fn type_names(&self) -> Result<Vec<String>, HostError> {
        Ok(self.read().types.clone())
    }

    fn symbols(&self) -> Result<Vec<Symbol>, HostError> {
        Ok(self.read().symbols.values().cloned().collect())
    }

    fn symbol_at(&self, addr: Address) -> Result<Option<Symbol>, HostError> {
        Ok(self.read().symbols.get(&addr).cloned())
    }

    fn strings(&self) -> Result<Vec<StringEntry>, HostError> {
        Ok(self.read().strings.clone())
    }

    fn data_vars(&self) -> Result<Vec<Address>, HostError> {
        Ok(self.read().data_vars.clone())
    }

    fn code_refs(&self, addr: Address) -> Result<Vec<Address>, HostError> {
        Ok(self.read().code_refs.get(&addr).cloned().unwrap_or_default())
    }

    fn high_level_il(&self, start: Address) -> Result<Option<String>, HostError> {
        Ok(self.function_entry(start)?.hlil)
    }

    fn mid_level_il(&self, start: Address) -> Result<Option<String>, HostError> {
        Ok(self.function_entry(start)?.mlil)
    }

    fn rename_function(&self, start: Address, new_name: &str) -> Result<(), HostError> {
        let mut state = self.write();
        let entry = state
            .functions
            .iter_mut()
            .find(|f| f.function.start == start)
            .ok_or_else(|| HostError::new(format!("no function at {start:#x}")))?;
        entry.function.name = new_name.to_string();
        if let Some(sym) = state.symbols.get_mut(&start) {
            sym.name = new_name.to_string();
        }
        Ok(())
    }

    fn define_user_symbol(&self, symbol: Symbol) -> Result<(), HostError> {
        self.write().symbols.insert(symbol.address, symbol);
        Ok(())
    }

    fn update_analysis_and_wait(&self) -> Result<(), HostError> {
        self.write().rebuild_code_refs();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(generation, "Analysis updated");
        Ok(())
    }
}
