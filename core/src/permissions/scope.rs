//! Scope hierarchy resolver
//!
//! global > collaboration > organization > own. A grant at a broader scope
//! implies the narrower ones for the same (resource, operation), but the rule
//! list never says so on its own: callers expand the scope with these helpers.

use crate::types::Scope;

/// Scopes whose grants satisfy a requirement of at least `minimum`.
///
/// Ordered narrowest first. The wildcard yields every concrete scope.
pub fn scopes_satisfying(minimum: Scope) -> Vec<Scope> {
    match minimum {
        Scope::Global => vec![Scope::Global],
        Scope::Collaboration => vec![Scope::Collaboration, Scope::Global],
        Scope::Organization => vec![Scope::Organization, Scope::Collaboration, Scope::Global],
        Scope::Own | Scope::Any => Scope::CONCRETE.to_vec(),
    }
}

/// Scopes an actor may hold in order to hand out a rule at `scope`.
///
/// This is the inclusive upward closure of `scope`: granting an
/// `organization` rule needs organization, collaboration or global.
pub fn scopes_covering(scope: Scope) -> Vec<Scope> {
    Scope::CONCRETE
        .into_iter()
        .filter(|held| scope == Scope::Any || held.covers(scope))
        .collect()
}
