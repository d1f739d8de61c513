//! Decompilation with tiered IR fallback.

use crate::db::handlers::{attached, resolve};
use crate::db::types::{Address, DecompileOutcome, Decompilation, IrTier};
use crate::db::{ProgramDatabase, SharedDatabase};
use crate::error::GatewayError;

/// Decompile the first function named `name`.
///
/// High-level IR is preferred, then mid-level IR. A host failure while
/// fetching either tier is carried in [`Decompilation::failure`] rather than
/// failing the request.
pub fn handle_decompile(
    db: &Option<SharedDatabase>,
    name: &str,
) -> Result<DecompileOutcome, GatewayError> {
    let db = attached(db)?;

    let Some(func) = resolve::find_function(db, name)? else {
        return Ok(DecompileOutcome::Missing {
            name: name.to_string(),
        });
    };

    Ok(DecompileOutcome::Decompiled(decompile_at(db, func.start)))
}

fn decompile_at(db: &dyn ProgramDatabase, start: Address) -> Decompilation {
    let mut failures = Vec::new();

    match db.high_level_il(start) {
        Ok(Some(text)) => {
            return Decompilation {
                tier: IrTier::High,
                text,
                failure: None,
            }
        }
        Ok(None) => {}
        Err(e) => failures.push(e.to_string()),
    }

    let (tier, text) = match db.mid_level_il(start) {
        Ok(Some(text)) => (IrTier::Mid, text),
        Ok(None) => (IrTier::Unavailable, String::new()),
        Err(e) => {
            failures.push(e.to_string());
            (IrTier::Unavailable, String::new())
        }
    };

    Decompilation {
        tier,
        text,
        failure: (!failures.is_empty()).then(|| failures.join("; ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::fixture;
    use crate::db::types::{Function, StringEntry, Symbol, HLIL_UNAVAILABLE, NO_IR_AVAILABLE};
    use crate::db::HostError;
    use std::sync::Arc;

    #[test]
    fn prefers_high_level_il() {
        let out = handle_decompile(&fixture(), "main").unwrap();
        assert_eq!(
            out.to_string(),
            "int32_t main()\n{\n    return helper();\n}"
        );
    }

    #[test]
    fn falls_back_to_mid_level_il() {
        let out = handle_decompile(&fixture(), "helper").unwrap();
        let text = out.to_string();
        assert!(text.starts_with(HLIL_UNAVAILABLE));
        assert!(text.ends_with("0 @ 00001010  return 0"));
    }

    #[test]
    fn no_ir_at_all() {
        let out = handle_decompile(&fixture(), "dup").unwrap();
        assert_eq!(out.to_string(), format!("{HLIL_UNAVAILABLE}\n{NO_IR_AVAILABLE}"));
    }

    #[test]
    fn missing_function() {
        let out = handle_decompile(&fixture(), "counter").unwrap();
        assert_eq!(out, DecompileOutcome::Missing { name: "counter".into() });
        assert_eq!(out.to_string(), "Function 'counter' not found");
    }

    #[test]
    fn requires_database() {
        assert_eq!(
            handle_decompile(&None, "main").unwrap_err(),
            GatewayError::NoDatabase
        );
    }

    /// Host whose high-level IR always fails.
    struct BrokenHlil {
        mlil: Option<&'static str>,
    }

    impl ProgramDatabase for BrokenHlil {
        fn filename(&self) -> Option<String> {
            Some("broken".into())
        }
        fn functions(&self) -> Result<Vec<Function>, HostError> {
            Ok(vec![Function {
                name: "f".into(),
                start: 0x10,
                size: 4,
            }])
        }
        fn function_containing(&self, _: Address) -> Result<Option<Function>, HostError> {
            Ok(None)
        }
        fn type_names(&self) -> Result<Vec<String>, HostError> {
            Ok(Vec::new())
        }
        fn symbols(&self) -> Result<Vec<Symbol>, HostError> {
            Ok(Vec::new())
        }
        fn symbol_at(&self, _: Address) -> Result<Option<Symbol>, HostError> {
            Ok(None)
        }
        fn strings(&self) -> Result<Vec<StringEntry>, HostError> {
            Ok(Vec::new())
        }
        fn data_vars(&self) -> Result<Vec<Address>, HostError> {
            Ok(Vec::new())
        }
        fn code_refs(&self, _: Address) -> Result<Vec<Address>, HostError> {
            Ok(Vec::new())
        }
        fn high_level_il(&self, _: Address) -> Result<Option<String>, HostError> {
            Err(HostError::new("lifting failed"))
        }
        fn mid_level_il(&self, _: Address) -> Result<Option<String>, HostError> {
            Ok(self.mlil.map(str::to_string))
        }
        fn rename_function(&self, _: Address, _: &str) -> Result<(), HostError> {
            Ok(())
        }
        fn define_user_symbol(&self, _: Symbol) -> Result<(), HostError> {
            Ok(())
        }
        fn update_analysis_and_wait(&self) -> Result<(), HostError> {
            Ok(())
        }
    }

    #[test]
    fn host_failure_is_reported_inline() {
        let db: Option<SharedDatabase> = Some(Arc::new(BrokenHlil {
            mlil: Some("mlil body"),
        }));
        let text = handle_decompile(&db, "f").unwrap().to_string();
        assert_eq!(
            text,
            format!("{HLIL_UNAVAILABLE}\nmlil body\n// Error decompiling function: lifting failed")
        );
    }

    #[test]
    fn failed_hlil_without_mlil_keeps_no_ir_note() {
        let db: Option<SharedDatabase> = Some(Arc::new(BrokenHlil { mlil: None }));
        let text = handle_decompile(&db, "f").unwrap().to_string();
        assert_eq!(
            text,
            format!(
                "{HLIL_UNAVAILABLE}\n{NO_IR_AVAILABLE}\n// Error decompiling function: lifting failed"
            )
        );
    }
}
