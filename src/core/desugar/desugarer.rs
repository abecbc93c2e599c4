//! Desugarer maintains state during desugar passes.
use super::builder::Builder;
use crate::{
    common::sourcemap::{Smid, SourceMap},
    core::{
        error::CoreError,
        ir::{self, Stmt},
        temp::{ScopeId, TempScope},
        unit::TranslationUnit,
    },
    driver::settings::{ClassProtocol, DesugarSettings},
    syntax::ast::{Module, Statement},
};
use log::debug;

/// Explicit context handed to each reformulation.
///
/// Exposes the enclosing module's name, creation of temp scopes and
/// internal source positions. Reformulations never reach back into
/// their surroundings for anything else.
pub struct Desugarer<'smap> {
    /// Settings fixed for the whole compilation
    settings: DesugarSettings,
    /// SourceMap
    source_map: &'smap mut SourceMap,
    /// Stack of module names being translated
    modules: Vec<String>,
    /// Next temp scope identity
    next_scope: u32,
}

impl<'smap> Desugarer<'smap> {
    /// Construct a Desugarer from settings and the SourceMap that
    /// holds the surface tree's positions
    pub fn new(settings: &DesugarSettings, source_map: &'smap mut SourceMap) -> Self {
        Desugarer {
            settings: settings.clone(),
            source_map,
            modules: vec![],
            next_scope: 1,
        }
    }

    /// Desugar a module to create a new translation unit.
    pub fn translate_module<B: Builder + ?Sized>(
        &mut self,
        builder: &mut B,
        module: &Module,
    ) -> Result<TranslationUnit, CoreError> {
        debug!(
            "desugaring module {} ({} protocol)",
            module.name, self.settings.class_protocol
        );
        self.modules.push(module.name.clone());
        let body = builder.build_statements(self, module.smid, &module.body);
        self.modules.pop();

        Ok(TranslationUnit {
            name: module.name.clone(),
            body: body?,
        })
    }

    /// Desugar a single statement in the context of the named
    /// module
    pub fn translate_statement<B: Builder + ?Sized>(
        &mut self,
        builder: &mut B,
        module_name: &str,
        statement: &Statement,
    ) -> Result<Option<Stmt>, CoreError> {
        self.modules.push(module_name.to_string());
        let result = builder.build_statement(self, statement);
        self.modules.pop();
        result
    }

    /// Name of the lexically enclosing module
    pub fn module_name(&self) -> &str {
        self.modules
            .last()
            .map(String::as_str)
            .unwrap_or("__main__")
    }

    pub fn settings(&self) -> &DesugarSettings {
        &self.settings
    }

    /// The class protocol in force for this compilation
    pub fn class_protocol(&self) -> ClassProtocol {
        self.settings.class_protocol
    }

    /// Create a new temp scope
    pub fn new_scope(&mut self, smid: Smid) -> TempScope {
        let id = ScopeId::new(self.next_scope);
        self.next_scope += 1;
        TempScope::new(id, smid)
    }

    /// Internal counterpart of a real position for synthesized code
    pub fn internal(&mut self, smid: Smid) -> Smid {
        self.source_map.internal(smid)
    }

    /// Reference to the SourceMap
    pub fn source_map(&self) -> &SourceMap {
        self.source_map
    }
}

/// Convenience: desugar a whole module with a fresh desugarer
pub fn desugar_module<B: Builder + ?Sized>(
    settings: &DesugarSettings,
    source_map: &mut SourceMap,
    builder: &mut B,
    module: &Module,
) -> Result<TranslationUnit, CoreError> {
    Desugarer::new(settings, source_map).translate_module(builder, module)
}

/// Normalise statements built by a reformulation
pub(crate) fn block(smid: Smid, statements: Vec<Stmt>) -> Stmt {
    ir::sequence_or_empty(smid, statements.into_iter().map(Some))
}
