//! Property-based tests for the evaluator and the permission matrix
//!
//! - Scope monotonicity: a broader grant satisfies every narrower requirement
//! - Wildcard equivalence: `any` scope is the union of the concrete scopes
//! - Assignment closure: handing out a rule needs that scope or a broader one
//! - Cascades: writes pull in view, revoking view clears the writes
//! - Rebuilds are idempotent

use super::*;
use crate::types::*;
use proptest::prelude::*;
use std::collections::HashSet;

const RESOURCES: [Resource; 3] = [Resource::User, Resource::Task, Resource::Node];

fn arb_key() -> impl Strategy<Value = RuleKey> {
    (
        prop::sample::select(RESOURCES.to_vec()),
        prop::sample::select(Scope::CONCRETE.to_vec()),
        prop::sample::select(Operation::CONCRETE.to_vec()),
    )
        .prop_map(|(resource, scope, operation)| RuleKey::new(resource, scope, operation))
}

fn arb_keys(max: usize) -> impl Strategy<Value = HashSet<RuleKey>> {
    prop::collection::hash_set(arb_key(), 0..max)
}

/// Give every key of the universe a stable id so the same key is the same rule everywhere
fn rule_for(key: RuleKey) -> Rule {
    let resource = RESOURCES.iter().position(|r| *r == key.resource).unwrap_or(0) as u64;
    let scope = key.scope.breadth().unwrap_or(0) as u64;
    let operation = Operation::CONCRETE
        .iter()
        .position(|o| *o == key.operation)
        .unwrap_or(0) as u64;
    Rule {
        id: RuleId(resource * 100 + scope * 10 + operation + 1),
        resource: key.resource,
        scope: key.scope,
        operation: key.operation,
    }
}

fn rules(keys: &HashSet<RuleKey>) -> Vec<Rule> {
    let mut rules: Vec<Rule> = keys.iter().copied().map(rule_for).collect();
    rules.sort_by_key(|rule| rule.id);
    rules
}

fn actor(keys: &HashSet<RuleKey>) -> ActiveUser {
    ActiveUser::new(UserId(1), OrganizationId(1), rules(keys), [OrganizationId(1)])
}

fn arb_inputs() -> impl Strategy<Value = (HashSet<RuleKey>, MatrixInputs)> {
    (arb_keys(24), arb_keys(24), arb_keys(6), arb_keys(12)).prop_map(
        |(held, selectable, fixed, preselected)| {
            let inputs = MatrixInputs {
                fixed_selected: rules(&fixed),
                selectable: rules(&selectable),
                preselected: rules(&preselected),
            };
            (held, inputs)
        },
    )
}

fn assert_write_implies_view(matrix: &PermissionMatrix) {
    for row in matrix.rows() {
        let view = RuleKey::new(row.resource, row.scope, Operation::View);
        let any_write_selected = row
            .cells
            .iter()
            .any(|cell| cell.operation.requires_view() && cell.state == CellState::Selected);
        if any_write_selected {
            assert_ne!(
                matrix.state(view),
                CellState::NotSelected,
                "write selected without view on {}:{}",
                row.resource,
                row.scope
            );
        }
    }
}

proptest! {
    #[test]
    fn prop_broader_grant_satisfies_narrower_requirement(held in arb_keys(16), key in arb_key()) {
        let user = actor(&held);
        let eval = Evaluator::new(Some(&user));

        for broad in Scope::CONCRETE {
            for narrow in Scope::CONCRETE.into_iter().filter(|s| broad.covers(*s)) {
                if eval.is_allowed(broad, key.resource, key.operation) {
                    prop_assert!(eval.is_allowed_with_minimum_scope(narrow, key.resource, key.operation));
                }
            }
        }
    }

    #[test]
    fn prop_any_scope_is_union_of_concrete_scopes(held in arb_keys(16), key in arb_key()) {
        let user = actor(&held);
        let eval = Evaluator::new(Some(&user));

        let any = eval.is_allowed(Scope::Any, key.resource, key.operation);
        let some_concrete = Scope::CONCRETE
            .into_iter()
            .any(|s| eval.is_allowed(s, key.resource, key.operation));
        prop_assert_eq!(any, some_concrete);
    }

    #[test]
    fn prop_assignment_is_upward_closed(held in arb_keys(16), key in arb_key()) {
        let user = actor(&held);
        let eval = Evaluator::new(Some(&user));

        let expected = held.iter().any(|h| {
            h.resource == key.resource && h.operation == key.operation && h.scope.covers(key.scope)
        });
        prop_assert_eq!(
            eval.is_allowed_to_assign_rule_to_role(key.scope, key.resource, key.operation),
            expected
        );
    }

    #[test]
    fn prop_rows_hold_exactly_the_selectable_operations((held, inputs) in arb_inputs()) {
        let user = actor(&held);
        let matrix = PermissionMatrix::build(inputs.clone(), &Evaluator::new(Some(&user)));

        let selectable: HashSet<RuleKey> = inputs.selectable.iter().map(Rule::key).collect();
        let pairs: HashSet<(Resource, Scope)> =
            selectable.iter().map(|k| (k.resource, k.scope)).collect();

        let rows = matrix.rows();
        prop_assert_eq!(rows.len(), pairs.len());
        for row in rows {
            let expected: Vec<Operation> = Operation::CONCRETE
                .into_iter()
                .filter(|op| selectable.contains(&RuleKey::new(row.resource, row.scope, *op)))
                .collect();
            prop_assert!(!expected.is_empty());
            prop_assert_eq!(row.applicable_operations(), expected);
        }
    }

    #[test]
    fn prop_toggles_keep_cascade_invariants(
        (held, inputs) in arb_inputs(),
        toggles in prop::collection::vec(arb_key(), 0..20),
    ) {
        let user = actor(&held);
        let mut matrix = PermissionMatrix::build(inputs, &Evaluator::new(Some(&user)));
        assert_write_implies_view(&matrix);

        for key in toggles {
            if !matrix.state(key).is_editable() {
                prop_assert!(matrix.toggle(key).is_err());
                continue;
            }

            let was_selected = matrix.is_selected(key);
            let emitted = matrix.toggle(key).unwrap();
            prop_assert_eq!(&emitted, &matrix.selected_rules());
            assert_write_implies_view(&matrix);

            if key.operation == Operation::View && was_selected {
                for operation in Operation::CONCRETE {
                    let other = key.with_operation(operation);
                    if matrix.state(other).is_editable() {
                        prop_assert_eq!(matrix.state(other), CellState::NotSelected);
                    }
                }
            }
        }

        // Fixed cells are always part of the emitted list
        let emitted: HashSet<RuleKey> = matrix.selected_rules().iter().map(Rule::key).collect();
        for row in matrix.rows() {
            for cell in row.cells {
                if cell.state == CellState::FixedSelected {
                    prop_assert!(emitted.contains(&RuleKey::new(row.resource, row.scope, cell.operation)));
                }
            }
        }
    }

    #[test]
    fn prop_rebuild_is_idempotent(
        (held, inputs) in arb_inputs(),
        toggles in prop::collection::vec(arb_key(), 0..10),
        next_key in arb_key(),
    ) {
        let user = actor(&held);
        let eval = Evaluator::new(Some(&user));
        let fresh = PermissionMatrix::build(inputs.clone(), &eval);

        let mut rebuilt = PermissionMatrix::build(inputs.clone(), &eval);
        for key in toggles {
            let _ = rebuilt.toggle(key);
        }
        rebuilt.rebuild(inputs.clone(), &eval);
        rebuilt.rebuild(inputs, &eval);

        prop_assert_eq!(fresh.rows(), rebuilt.rows());
        prop_assert_eq!(fresh.selection(), rebuilt.selection());

        let mut a = fresh.clone();
        let mut b = rebuilt;
        prop_assert_eq!(a.toggle(next_key).ok(), b.toggle(next_key).ok());
    }
}
