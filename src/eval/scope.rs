use std::collections::HashMap;

use crate::ast::Statement;

use super::value::Value;

static UNDEFINED: Value = Value::Undefined;

/// Iterator position kept by `in` between loop passes.
#[derive(Debug, Clone, PartialEq)]
pub struct IterCursor {
    pub i: usize,
    /// Key snapshot when iterating an object
    pub keys: Option<Vec<String>>,
}

/// Opaque per-function control state.
#[derive(Debug, Clone, PartialEq)]
pub enum CtrlData {
    Value(Value),
    /// Pending jump target in the owning frame
    Index(usize),
    Iter(IterCursor),
}

/// State of a `keep_data` child saved in its parent between re-entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeptData {
    pub ctrl_data: Option<CtrlData>,
    pub children: HashMap<usize, KeptData>,
}

/// Execution frame of one statement.
#[derive(Debug)]
pub struct Scope<'s> {
    pub s: &'s Statement,
    /// Cursor into `s.params`, never past its length
    pub i: usize,
    pub param_values: Vec<Value>,
    pub ctrl_data: Option<CtrlData>,
    /// return signalled
    pub r: bool,
    /// break signalled
    pub bl: bool,
    /// struct construction mode
    pub cm: bool,
    /// switch discriminant
    pub sv: Option<Value>,
    /// traversal stops once the cursor reaches this index
    pub bi: Option<usize>,
    pub from_index: Option<usize>,
    pub goto_index: Option<usize>,
    pub li: Option<usize>,
    /// Result of the frame
    pub value: Value,
    /// `should_execute` declined the frame
    pub skipped: bool,
    /// The most recently visited child was skipped
    pub last_skipped: bool,
    /// The frame's function carries the keep-data flag
    pub keeps_data: bool,
    pub kept: HashMap<usize, KeptData>,
}

impl<'s> Scope<'s> {
    pub fn new(s: &'s Statement) -> Self {
        Self {
            s,
            i: 0,
            param_values: Vec::new(),
            ctrl_data: None,
            r: false,
            bl: false,
            cm: false,
            sv: None,
            bi: None,
            from_index: None,
            goto_index: None,
            li: None,
            value: Value::Undefined,
            skipped: false,
            last_skipped: false,
            keeps_data: false,
            kept: HashMap::new(),
        }
    }

    pub fn params(&self) -> &'s [Statement] {
        &self.s.params
    }

    pub fn len(&self) -> usize {
        self.s.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.params.is_empty()
    }

    pub fn fn_name(&self) -> Option<&'s str> {
        self.s.fn_name.as_deref()
    }

    /// Most recent child value (slot 0 for discarding functions).
    pub fn last(&self) -> &Value {
        self.param_values.last().unwrap_or(&UNDEFINED)
    }

    pub fn first(&self) -> &Value {
        self.param_values.first().unwrap_or(&UNDEFINED)
    }

    pub fn record(&mut self, value: Value, discard: bool) {
        if discard {
            match self.param_values.first_mut() {
                Some(slot) => *slot = value,
                None => self.param_values.push(value),
            }
        } else {
            self.param_values.push(value);
        }
    }

    /// Makes the frame pass over the child after the current one.
    pub fn skip_next(&mut self) {
        self.i = (self.i + 1).min(self.len());
    }

    /// Re-enters the current child after the next one finishes.
    pub fn arm_loop(&mut self) {
        self.from_index = Some(self.i + 1);
        self.goto_index = Some(self.i);
        self.li = Some(self.i + 1);
    }

    pub fn clear_loop(&mut self) {
        self.from_index = None;
        self.goto_index = None;
        self.li = None;
    }

    pub fn set_break_index(&mut self, index: usize) {
        self.bi = Some(index);
    }

    pub fn set_pending_jump(&mut self, index: usize) {
        self.ctrl_data = Some(CtrlData::Index(index));
    }

    pub fn take_pending_jump(&mut self) -> Option<usize> {
        match self.ctrl_data {
            Some(CtrlData::Index(n)) => {
                self.ctrl_data = None;
                Some(n)
            }
            _ => None,
        }
    }

    pub fn ctrl_value(&self) -> Option<&Value> {
        match &self.ctrl_data {
            Some(CtrlData::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn keep(&self) -> KeptData {
        KeptData {
            ctrl_data: self.ctrl_data.clone(),
            children: self.kept.clone(),
        }
    }

    pub fn restore(&mut self, kept: KeptData) {
        self.ctrl_data = kept.ctrl_data;
        self.kept = kept.children;
    }
}
