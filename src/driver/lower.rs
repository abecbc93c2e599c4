//! Lower a parsed module to checked IR
use crate::common::sourcemap::SourceMap;
use crate::core::desugar::{Builder, Desugarer, StandardBuilder};
use crate::core::unit::TranslationUnit;
use crate::core::verify;
use crate::driver::error::ReformError;
use crate::driver::settings::DesugarSettings;
use crate::eval::Machine;
use crate::syntax::ast::Module;
use log::{debug, warn};

/// Desugar `module` with the standard builder and verify the result
pub fn lower(
    settings: &DesugarSettings,
    source_map: &mut SourceMap,
    module: &Module,
) -> Result<TranslationUnit, ReformError> {
    lower_with(settings, source_map, &mut StandardBuilder, module)
}

/// Desugar `module` with a specific builder and verify the result.
///
/// Only the first verification error is returned; any others are
/// logged.
pub fn lower_with<B: Builder + ?Sized>(
    settings: &DesugarSettings,
    source_map: &mut SourceMap,
    builder: &mut B,
    module: &Module,
) -> Result<TranslationUnit, ReformError> {
    let unit = Desugarer::new(settings, source_map).translate_module(builder, module)?;
    debug!("lowered {} to {} statements", unit.name, unit.len());

    let mut errors = verify::verify_unit(&unit).into_iter();
    match errors.next() {
        Some(first) => {
            for other in errors {
                warn!("further verification error: {}", other);
            }
            Err(first.into())
        }
        None => Ok(unit),
    }
}

/// Lower `module` and run it on `machine`
pub fn lower_and_run(
    settings: &DesugarSettings,
    source_map: &mut SourceMap,
    module: &Module,
    machine: &mut Machine,
) -> Result<TranslationUnit, ReformError> {
    let unit = lower(settings, source_map, module)?;
    machine.run(&unit)?;
    Ok(unit)
}
