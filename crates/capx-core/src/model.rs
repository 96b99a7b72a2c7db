//! The accumulating optimization-model object.
//!
//! A [`Model`] is a symbol table mapping component names (sets, parameters,
//! variables, constraints) to the definition a module contributed, plus the
//! concrete data bound to those symbols during the load pass. It is owned
//! exclusively by the pipeline composer during assembly and handed read-only
//! to the solver boundary.
//!
//! Ordering is load-bearing: a module may only reference symbols contributed
//! by a module earlier in its resolved prerequisite order. Referencing a
//! symbol that was never declared is a configuration error
//! ([`CapxError::UndeclaredSymbol`]), never silently ignored.

use crate::error::{CapxError, CapxResult};
use std::collections::{BTreeMap, HashMap};

/// Index tuple into a multi-dimensional symbol. Scalars use the empty key.
pub type IndexKey = Vec<String>;

/// What kind of model component a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Set,
    Param,
    Var,
    Constraint,
    Expression,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Set => "set",
            ComponentKind::Param => "param",
            ComponentKind::Var => "var",
            ComponentKind::Constraint => "constraint",
            ComponentKind::Expression => "expression",
        }
    }
}

/// One contributed symbol definition.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: String,
    pub kind: ComponentKind,
    /// Module that contributed the symbol.
    pub module: String,
    /// Names of the index sets this symbol is declared over (empty = scalar).
    pub dims: Vec<String>,
    /// Explicit default for params whose inputs may be sparse.
    pub default: Option<f64>,
}

impl SymbolDef {
    pub fn new(name: impl Into<String>, kind: ComponentKind, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            module: module.into(),
            dims: Vec::new(),
            default: None,
        }
    }

    pub fn over(mut self, dims: &[&str]) -> Self {
        self.dims = dims.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }
}

/// The accumulating model: declared symbols plus bound data.
#[derive(Debug, Clone, Default)]
pub struct Model {
    symbols: HashMap<String, SymbolDef>,
    /// Declaration order, for deterministic iteration and reporting.
    order: Vec<String>,
    set_members: HashMap<String, Vec<String>>,
    bindings: HashMap<String, BTreeMap<IndexKey, f64>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a symbol. Index sets named in `dims` must already be declared
    /// as sets by an earlier module in the composition order.
    pub fn declare(&mut self, def: SymbolDef) -> CapxResult<()> {
        if let Some(existing) = self.symbols.get(&def.name) {
            return Err(CapxError::DuplicateSymbol {
                symbol: def.name.clone(),
                module: def.module.clone(),
                declared_by: existing.module.clone(),
            });
        }
        for dim in &def.dims {
            match self.symbols.get(dim) {
                Some(d) if d.kind == ComponentKind::Set => {}
                _ => {
                    return Err(CapxError::UndeclaredSymbol {
                        module: def.module.clone(),
                        symbol: dim.clone(),
                    })
                }
            }
        }
        if def.kind == ComponentKind::Set {
            self.set_members.entry(def.name.clone()).or_default();
        }
        self.order.push(def.name.clone());
        self.symbols.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn def(&self, symbol: &str) -> Option<&SymbolDef> {
        self.symbols.get(symbol)
    }

    /// Look up a symbol a module depends on; missing symbols are a fatal
    /// configuration error attributed to the referencing module.
    pub fn require(&self, module: &str, symbol: &str) -> CapxResult<&SymbolDef> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| CapxError::UndeclaredSymbol {
                module: module.to_string(),
                symbol: symbol.to_string(),
            })
    }

    /// Append members to a declared set (first occurrence wins, order kept).
    pub fn add_set_members<I, S>(&mut self, module: &str, set: &str, members: I) -> CapxResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let def = self.require(module, set)?;
        if def.kind != ComponentKind::Set {
            return Err(CapxError::Other(format!(
                "symbol '{set}' is a {}, not a set",
                def.kind.as_str()
            )));
        }
        let existing = self.set_members.entry(set.to_string()).or_default();
        for member in members {
            let member = member.into();
            if !existing.contains(&member) {
                existing.push(member);
            }
        }
        Ok(())
    }

    pub fn set_members(&self, module: &str, set: &str) -> CapxResult<&[String]> {
        self.require(module, set)?;
        Ok(self
            .set_members
            .get(set)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// Bind a concrete value to a param or var at the given index key.
    pub fn bind(&mut self, module: &str, symbol: &str, key: IndexKey, value: f64) -> CapxResult<()> {
        let def = self.require(module, symbol)?;
        if !matches!(def.kind, ComponentKind::Param | ComponentKind::Var) {
            return Err(CapxError::Other(format!(
                "cannot bind a value to {} '{symbol}'",
                def.kind.as_str()
            )));
        }
        if key.len() != def.dims.len() {
            return Err(CapxError::Other(format!(
                "symbol '{symbol}' expects {} index dimensions, got {}",
                def.dims.len(),
                key.len()
            )));
        }
        self.bindings.entry(symbol.to_string()).or_default().insert(key, value);
        Ok(())
    }

    /// Bound or defaulted value at the given key, if any.
    pub fn value(&self, symbol: &str, key: &IndexKey) -> Option<f64> {
        if let Some(value) = self.bindings.get(symbol).and_then(|b| b.get(key)) {
            return Some(*value);
        }
        self.symbols.get(symbol).and_then(|def| def.default)
    }

    /// Value required during load or export; absence without a default is a
    /// fatal [`CapxError::MissingInput`].
    pub fn require_value(&self, symbol: &str, key: &IndexKey) -> CapxResult<f64> {
        self.value(symbol, key).ok_or_else(|| CapxError::MissingInput {
            symbol: symbol.to_string(),
            key: key.join(", "),
        })
    }

    pub fn bindings(&self, symbol: &str) -> impl Iterator<Item = (&IndexKey, f64)> {
        self.bindings
            .get(symbol)
            .into_iter()
            .flat_map(|b| b.iter().map(|(k, v)| (k, *v)))
    }

    /// The full index space of a symbol: cross product of its dims' members.
    pub fn index_space(&self, symbol: &str) -> CapxResult<Vec<IndexKey>> {
        let def = self.require(&format!("<index_space:{symbol}>"), symbol)?;
        let mut keys: Vec<IndexKey> = vec![Vec::new()];
        for dim in &def.dims {
            let members = self
                .set_members
                .get(dim)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut next = Vec::with_capacity(keys.len() * members.len());
            for key in &keys {
                for member in members {
                    let mut extended = key.clone();
                    extended.push(member.clone());
                    next.push(extended);
                }
            }
            keys = next;
        }
        Ok(keys)
    }

    /// Index keys of a param with neither a binding nor a default.
    ///
    /// Used by the composer after the load pass to enforce the missing-input
    /// failure policy over the symbol's declared index space.
    pub fn missing_bindings(&self, symbol: &str) -> CapxResult<Vec<IndexKey>> {
        let def = self.require(&format!("<check:{symbol}>"), symbol)?;
        if def.kind != ComponentKind::Param || def.default.is_some() {
            return Ok(Vec::new());
        }
        let bound = self.bindings.get(symbol);
        let missing = self
            .index_space(symbol)?
            .into_iter()
            .filter(|key| bound.map_or(true, |b| !b.contains_key(key)))
            .collect();
        Ok(missing)
    }

    /// Symbols in declaration order.
    pub fn symbols_in_order(&self) -> impl Iterator<Item = &SymbolDef> {
        self.order.iter().filter_map(|name| self.symbols.get(name))
    }

    /// Declared variables, in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = &SymbolDef> {
        self.symbols_in_order()
            .filter(|def| def.kind == ComponentKind::Var)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
