//! Permission matrix state machine
//!
//! Grid of (resource, scope) rows by operation columns behind the role
//! editor. Each cell gets one of five states from three rule lists and the
//! evaluator's opinion on whether the current actor may hand the rule out.
//! Toggles cascade synchronously: a write implies `view` on the same row and
//! revoking `view` revokes the writes that depend on it.

use super::evaluator::Evaluator;
use crate::types::*;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Display/edit state of a single matrix cell
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// No such rule among the selectable rules
    NotApplicable,
    /// Imposed from outside, always on
    FixedSelected,
    /// The actor cannot grant this rule, always off
    FixedNotSelected,
    /// On, user can toggle
    Selected,
    /// Off, user can toggle
    NotSelected,
}

impl CellState {
    /// Whether the user may toggle this cell
    pub fn is_editable(&self) -> bool {
        matches!(self, CellState::Selected | CellState::NotSelected)
    }
}

/// The three rule lists a hosting view hands to the matrix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixInputs {
    /// Rules that are on and cannot be altered
    pub fixed_selected: Vec<Rule>,
    /// Universe of rules eligible in this editing context
    pub selectable: Vec<Rule>,
    /// Rules considered on before editing starts
    pub preselected: Vec<Rule>,
}

/// One cell as rendered
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Debug)]
pub struct MatrixCell {
    pub operation: Operation,
    pub state: CellState,
}

/// One (resource, scope) row as rendered
#[derive(Clone, PartialEq, Eq, Serialize, Debug)]
pub struct MatrixRow {
    pub resource: Resource,
    pub scope: Scope,
    /// One entry per column, in [`Operation::CONCRETE`] order
    pub cells: Vec<MatrixCell>,
}

impl MatrixRow {
    /// Operations backed by a selectable rule
    pub fn applicable_operations(&self) -> Vec<Operation> {
        self.cells
            .iter()
            .filter(|cell| cell.state != CellState::NotApplicable)
            .map(|cell| cell.operation)
            .collect()
    }
}

/// Net difference between the selection and the preselected rules
#[derive(Clone, Default, PartialEq, Eq, Serialize, Debug)]
pub struct RuleChanges {
    pub added: Vec<Rule>,
    pub removed: Vec<Rule>,
}

impl RuleChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Built grid plus the live selection
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    inputs: MatrixInputs,
    /// Rows present in the grid, in display order
    rows: Vec<(Resource, Scope)>,
    /// Build-time state of every cell in a present row
    states: HashMap<RuleKey, CellState>,
    /// Selectable rules by key, used to turn cells back into rules
    rules: HashMap<RuleKey, Rule>,
    /// Editable cells currently switched on
    selection: HashSet<RuleKey>,
    initial_selection: HashSet<RuleKey>,
}

impl PermissionMatrix {
    /// Build the grid and initial selection from the inputs
    pub fn build(inputs: MatrixInputs, evaluator: &Evaluator<'_>) -> Self {
        let fixed: HashSet<RuleKey> = inputs.fixed_selected.iter().map(Rule::key).collect();
        let preselected: HashSet<RuleKey> = inputs.preselected.iter().map(Rule::key).collect();

        let mut rules = HashMap::with_capacity(inputs.selectable.len());
        for rule in &inputs.selectable {
            rules.entry(rule.key()).or_insert(*rule);
        }

        let mut rows = Vec::new();
        let mut states = HashMap::new();
        let mut selection = HashSet::new();

        for resource in Resource::CONCRETE {
            for scope in Scope::CONCRETE {
                let row_keys = Operation::CONCRETE.map(|op| RuleKey::new(resource, scope, op));

                // Rows without any selectable rule are left out entirely
                if !row_keys.iter().any(|key| rules.contains_key(key)) {
                    continue;
                }

                for key in row_keys {
                    let state = Self::cell_state(key, &rules, &fixed, &preselected, evaluator);
                    if state == CellState::Selected {
                        selection.insert(key);
                    }
                    states.insert(key, state);
                }
                rows.push((resource, scope));
            }
        }

        // A preselected write pulls in its view, same as a toggle would
        let implied_views: Vec<RuleKey> = selection
            .iter()
            .filter(|key| key.operation.requires_view())
            .map(|key| key.with_operation(Operation::View))
            .filter(|view| states.get(view).is_some_and(CellState::is_editable))
            .collect();
        selection.extend(implied_views);

        debug!(
            "Built permission matrix: {} rows, {} selectable rules, {} selected",
            rows.len(),
            rules.len(),
            selection.len()
        );

        Self {
            inputs,
            rows,
            states,
            rules,
            initial_selection: selection.clone(),
            selection,
        }
    }

    fn cell_state(
        key: RuleKey,
        rules: &HashMap<RuleKey, Rule>,
        fixed: &HashSet<RuleKey>,
        preselected: &HashSet<RuleKey>,
        evaluator: &Evaluator<'_>,
    ) -> CellState {
        if !rules.contains_key(&key) {
            return CellState::NotApplicable;
        }
        if fixed.contains(&key) {
            return CellState::FixedSelected;
        }

        let is_allowed =
            evaluator.is_allowed_to_assign_rule_to_role(key.scope, key.resource, key.operation);
        let is_preselected = preselected.contains(&key);

        match (is_allowed, is_preselected) {
            (true, true) => CellState::Selected,
            (true, false) => CellState::NotSelected,
            // A grant the actor could not have made stays visibly on
            (false, true) => CellState::FixedSelected,
            (false, false) => CellState::FixedNotSelected,
        }
    }

    /// Discard the grid and the selection and build again from new inputs
    pub fn rebuild(&mut self, inputs: MatrixInputs, evaluator: &Evaluator<'_>) {
        *self = Self::build(inputs, evaluator);
    }

    /// Inputs the current grid was built from
    pub fn inputs(&self) -> &MatrixInputs {
        &self.inputs
    }

    /// Current state of a cell, reflecting the live selection
    pub fn state(&self, key: RuleKey) -> CellState {
        match self.states.get(&key) {
            Some(state) if state.is_editable() => {
                if self.selection.contains(&key) {
                    CellState::Selected
                } else {
                    CellState::NotSelected
                }
            }
            Some(state) => *state,
            None => CellState::NotApplicable,
        }
    }

    /// Check if a cell counts as on (fixed or user-selected)
    pub fn is_selected(&self, key: RuleKey) -> bool {
        matches!(self.state(key), CellState::Selected | CellState::FixedSelected)
    }

    /// Rows as rendered, with live cell states
    pub fn rows(&self) -> Vec<MatrixRow> {
        self.rows
            .iter()
            .map(|&(resource, scope)| MatrixRow {
                resource,
                scope,
                cells: Operation::CONCRETE
                    .into_iter()
                    .map(|operation| MatrixCell {
                        operation,
                        state: self.state(RuleKey::new(resource, scope, operation)),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Editable cells that are currently on
    pub fn selection(&self) -> &HashSet<RuleKey> {
        &self.selection
    }

    /// Flip an editable cell
    pub fn toggle(&mut self, key: RuleKey) -> Result<Vec<Rule>> {
        let selected = self.selection.contains(&key);
        self.set_selected(key, !selected)
    }

    /// Switch an editable cell on or off, apply the cascade, and return the
    /// resulting rule list
    pub fn set_selected(&mut self, key: RuleKey, selected: bool) -> Result<Vec<Rule>> {
        let state = self.states.get(&key).ok_or(Error::UnknownCell(key))?;
        if !state.is_editable() {
            return Err(Error::CellNotEditable(key));
        }

        if selected {
            self.selection.insert(key);
            // A write needs view on the same row
            if key.operation.requires_view() {
                let view = key.with_operation(Operation::View);
                if self.is_editable(view) {
                    self.selection.insert(view);
                }
            }
        } else {
            self.selection.remove(&key);
            // Revoking view revokes everything that depends on it
            if key.operation == Operation::View {
                for operation in Operation::CONCRETE.into_iter().filter(Operation::requires_view) {
                    let dependent = key.with_operation(operation);
                    if self.is_editable(dependent) {
                        self.selection.remove(&dependent);
                    }
                }
            }
        }

        Ok(self.selected_rules())
    }

    fn is_editable(&self, key: RuleKey) -> bool {
        self.states.get(&key).is_some_and(CellState::is_editable)
    }

    /// Restore the selection the grid was built with
    pub fn reset(&mut self) -> Vec<Rule> {
        self.selection = self.initial_selection.clone();
        self.selected_rules()
    }

    /// Rules for every cell that is on, fixed cells included, in grid order
    pub fn selected_rules(&self) -> Vec<Rule> {
        self.selected_keys()
            .filter_map(|key| {
                let rule = self.rules.get(&key).copied();
                if rule.is_none() {
                    warn!("Selected cell {} has no matching rule, dropping it", key);
                }
                rule
            })
            .collect()
    }

    /// Ids of [`selected_rules`](Self::selected_rules)
    pub fn selected_rule_ids(&self) -> Vec<RuleId> {
        self.selected_rules().into_iter().map(|rule| rule.id).collect()
    }

    fn selected_keys(&self) -> impl Iterator<Item = RuleKey> + '_ {
        self.rows.iter().flat_map(move |&(resource, scope)| {
            Operation::CONCRETE
                .into_iter()
                .map(move |operation| RuleKey::new(resource, scope, operation))
                .filter(|key| self.is_selected(*key))
        })
    }

    /// Difference between the current rule list and the preselected rules shown in the grid
    pub fn changes(&self) -> RuleChanges {
        let selected = self.selected_rules();
        let selected_keys: HashSet<RuleKey> = selected.iter().map(Rule::key).collect();
        let preselected_keys: HashSet<RuleKey> =
            self.inputs.preselected.iter().map(Rule::key).collect();

        let added = selected
            .iter()
            .filter(|rule| !preselected_keys.contains(&rule.key()))
            .copied()
            .collect();
        let removed = self
            .inputs
            .preselected
            .iter()
            .filter(|rule| self.states.contains_key(&rule.key()))
            .filter(|rule| !selected_keys.contains(&rule.key()))
            .copied()
            .collect();

        RuleChanges { added, removed }
    }
}
