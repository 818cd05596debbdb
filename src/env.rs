// ABOUTME: Variable cells, definition tables, and the evaluator environment

use crate::ast::Node;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A mutable slot holding a Value plus a delete flag. Lookup of a deleted
/// cell fails as if the name were undefined; re-assignment clears the flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    pub deleted: bool,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Cell {
            value,
            deleted: false,
        }
    }
}

/// A user-defined function: parameter names plus a body shared by reference.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: Arc<Node>,
}

impl FunctionDef {
    pub fn new(params: Vec<String>, body: Node) -> Self {
        FunctionDef {
            params,
            body: Arc::new(body),
        }
    }
}

/// Function and record-type tables. Populated at parse and definition time,
/// process-lifetime thereafter; parallel workers share them read-only.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    funcs: HashMap<String, FunctionDef>,
    records: HashMap<String, Vec<String>>,
}

impl Definitions {
    pub fn new() -> Self {
        Definitions::default()
    }

    /// Qualified name a record method is registered under.
    pub fn method_key(record: &str, method: &str) -> String {
        format!("{}.{}", record, method)
    }

    pub fn define_function(&mut self, name: String, def: FunctionDef) {
        self.funcs.insert(name, def);
    }

    pub fn define_record(&mut self, name: String, fields: Vec<String>) {
        self.records.insert(name, fields);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.funcs.get(name)
    }

    pub fn record(&self, name: &str) -> Option<&[String]> {
        self.records.get(name).map(Vec::as_slice)
    }

    pub fn is_record(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }
}

/// The evaluator environment: the variable map plus shared definitions.
///
/// `vars` is owned and mutated freely; `defs` is behind an `Arc` so parallel
/// workers can share it, with copy-on-write registration on the main side.
#[derive(Debug, Clone)]
pub struct Environment {
    vars: HashMap<String, Cell>,
    defs: Arc<Definitions>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            vars: HashMap::new(),
            defs: Arc::new(Definitions::new()),
        }
    }

    /// Creates an environment seeded with parse-time definitions.
    pub fn with_defs(defs: Definitions) -> Self {
        Environment {
            vars: HashMap::new(),
            defs: Arc::new(defs),
        }
    }

    /// Builds a worker environment: a private copy of the variables and a
    /// shared handle to the definitions.
    pub fn worker_view(&self) -> Self {
        Environment {
            vars: self.vars.clone(),
            defs: Arc::clone(&self.defs),
        }
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.vars.get(name)
    }

    /// Binds `name` to a fresh live cell, resurrecting a deleted one.
    pub fn assign(&mut self, name: String, value: Value) {
        self.vars.insert(name, Cell::new(value));
    }

    /// Marks the cell as deleted. Deleting an unbound name is a no-op.
    pub fn delete(&mut self, name: &str) {
        if let Some(cell) = self.vars.get_mut(name) {
            cell.deleted = true;
        }
    }

    /// Shallow copy of the variable map, value-copying every cell.
    pub fn snapshot(&self) -> HashMap<String, Cell> {
        self.vars.clone()
    }

    /// Restores a snapshot wholesale, overwriting any mutations made since
    /// it was taken and discarding bindings created since.
    pub fn restore(&mut self, snapshot: HashMap<String, Cell>) {
        self.vars = snapshot;
    }

    /// Replaces the variable map, e.g. when installing a lambda's capture.
    pub fn install(&mut self, vars: HashMap<String, Cell>) {
        self.vars = vars;
    }

    pub fn vars(&self) -> &HashMap<String, Cell> {
        &self.vars
    }

    pub fn defs(&self) -> &Definitions {
        &self.defs
    }

    pub fn defs_handle(&self) -> Arc<Definitions> {
        Arc::clone(&self.defs)
    }

    pub fn define_function(&mut self, name: String, def: FunctionDef) {
        Arc::make_mut(&mut self.defs).define_function(name, def);
    }

    pub fn define_record(&mut self, name: String, fields: Vec<String>) {
        Arc::make_mut(&mut self.defs).define_record(name, fields);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_and_lookup() {
        let mut env = Environment::new();
        env.assign("x".to_string(), Value::Number(42.0));
        let cell = env.cell("x").expect("x should be bound");
        assert_eq!(cell.value, Value::Number(42.0));
        assert!(!cell.deleted);
    }

    #[test]
    fn test_delete_marks_without_removing() {
        let mut env = Environment::new();
        env.assign("x".to_string(), Value::Number(1.0));
        env.delete("x");
        assert!(env.cell("x").expect("cell should remain").deleted);
    }

    #[test]
    fn test_reassignment_resurrects_deleted_cell() {
        let mut env = Environment::new();
        env.assign("x".to_string(), Value::Number(1.0));
        env.delete("x");
        env.assign("x".to_string(), Value::Number(2.0));
        let cell = env.cell("x").unwrap();
        assert!(!cell.deleted);
        assert_eq!(cell.value, Value::Number(2.0));
    }

    #[test]
    fn test_delete_of_unbound_name_is_noop() {
        let mut env = Environment::new();
        env.delete("ghost");
        assert!(env.cell("ghost").is_none());
    }

    #[test]
    fn test_restore_overwrites_mutations() {
        let mut env = Environment::new();
        env.assign("x".to_string(), Value::Number(1.0));
        let snapshot = env.snapshot();

        env.assign("x".to_string(), Value::Number(99.0));
        env.assign("temp".to_string(), Value::Bool(true));
        env.restore(snapshot);

        assert_eq!(env.cell("x").unwrap().value, Value::Number(1.0));
        assert!(env.cell("temp").is_none());
    }

    #[test]
    fn test_snapshot_is_value_copied() {
        let mut env = Environment::new();
        env.assign("x".to_string(), Value::Number(1.0));
        let snapshot = env.snapshot();
        env.assign("x".to_string(), Value::Number(2.0));
        assert_eq!(snapshot["x"].value, Value::Number(1.0));
    }

    #[test]
    fn test_worker_view_shares_definitions() {
        let mut env = Environment::new();
        env.define_record("Point".to_string(), vec!["x".to_string(), "y".to_string()]);
        env.assign("a".to_string(), Value::Number(1.0));

        let mut worker = env.worker_view();
        assert!(worker.defs().is_record("Point"));

        // Worker mutations stay private.
        worker.assign("a".to_string(), Value::Number(2.0));
        assert_eq!(env.cell("a").unwrap().value, Value::Number(1.0));
    }

    #[test]
    fn test_definition_after_share_copies_on_write() {
        let mut env = Environment::new();
        let shared = env.defs_handle();
        env.define_record("P".to_string(), vec!["x".to_string()]);
        assert!(env.defs().is_record("P"));
        assert!(!shared.is_record("P"));
    }

    #[test]
    fn test_method_key_format() {
        assert_eq!(Definitions::method_key("Point", "sum"), "Point.sum");
    }
}
