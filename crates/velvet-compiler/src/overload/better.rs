//! Pairwise specificity ranking between applicable overloads.
//!
//! Once more than one candidate is applicable, the resolver keeps only the
//! candidates no other candidate beats. The pairwise relation is:
//!
//! - Differing parameter counts: more fixed parameters wins outright. This is
//!   what makes an exact-arity overload beat a rest-parameter overload for
//!   the same call.
//! - Equal parameter counts: a candidate wins if at least one of its declared
//!   parameter types converts to the other's (it is strictly more specific
//!   there) and none of the other's converts to its own. Ties on every
//!   position are incomparable.

use std::sync::Arc;

use velvet_registry::{HostRegistry, MethodCandidate};

use crate::conversion::can_convert;

/// Outcome of comparing one candidate against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    Better,
    Incomparable,
    Worse,
}

/// Compare `left` against `right` for the better-function-member relation.
///
/// Antisymmetric: swapping the operands swaps `Better` and `Worse`.
pub fn is_better_function_member(
    registry: &HostRegistry,
    left: &MethodCandidate,
    right: &MethodCandidate,
) -> Specificity {
    if left.params.len() > right.params.len() {
        return Specificity::Better;
    }
    if right.params.len() > left.params.len() {
        return Specificity::Worse;
    }

    let mut left_more_specific = false;
    let mut right_more_specific = false;

    for (&left_type, &right_type) in left.params.iter().zip(right.params.iter()) {
        // Identical declared types make neither side more specific here.
        if left_type != right_type {
            left_more_specific |= can_convert(registry, Some(left_type), right_type);
            right_more_specific |= can_convert(registry, Some(right_type), left_type);
        }
    }

    match (left_more_specific, right_more_specific) {
        (true, false) => Specificity::Better,
        (false, true) => Specificity::Worse,
        _ => Specificity::Incomparable,
    }
}

/// Reduce a set of applicable candidates to the unique best one, if any.
///
/// Every candidate is compared against the surviving set; a candidate
/// survives only while no other candidate is strictly better. `None` means
/// the call is ambiguous - tie-break rules beyond the pairwise relation are
/// deliberately not implemented.
pub fn best_function_member(
    registry: &HostRegistry,
    applicable: &[Arc<MethodCandidate>],
) -> Option<Arc<MethodCandidate>> {
    let mut best: Vec<Arc<MethodCandidate>> = Vec::new();

    for candidate in applicable {
        let mut less_specific = false;
        best.retain(
            |incumbent| match is_better_function_member(registry, candidate, incumbent) {
                Specificity::Better => false,
                Specificity::Worse => {
                    less_specific = true;
                    true
                }
                Specificity::Incomparable => true,
            },
        );
        if !less_specific {
            best.push(Arc::clone(candidate));
        }
    }

    match best.as_slice() {
        [single] => Some(Arc::clone(single)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velvet_core::{TypeHash, Value, primitives};
    use velvet_registry::NativeFn;

    fn candidate(name: &str, params: Vec<TypeHash>) -> Arc<MethodCandidate> {
        Arc::new(MethodCandidate::new(
            name,
            params,
            primitives::VOID,
            NativeFn::new(|_, _| Ok(Value::Null)),
        ))
    }

    fn rest_candidate(name: &str, element: TypeHash) -> Arc<MethodCandidate> {
        Arc::new(
            MethodCandidate::new(name, vec![], primitives::VOID, NativeFn::new(|_, _| Ok(Value::Null)))
                .with_rest(element),
        )
    }

    #[test]
    fn string_beats_object() {
        let registry = HostRegistry::new();
        let string = candidate("f", vec![primitives::STRING]);
        let object = candidate("f", vec![primitives::OBJECT]);

        assert_eq!(
            is_better_function_member(&registry, &string, &object),
            Specificity::Better
        );
        assert_eq!(
            is_better_function_member(&registry, &object, &string),
            Specificity::Worse
        );
    }

    #[test]
    fn int_beats_long() {
        let registry = HostRegistry::new();
        let int32 = candidate("f", vec![primitives::INT32]);
        let int64 = candidate("f", vec![primitives::INT64]);

        assert_eq!(
            is_better_function_member(&registry, &int32, &int64),
            Specificity::Better
        );
    }

    #[test]
    fn shared_argument_type_does_not_tip_the_scales() {
        // f(Token, Token) vs f(object, Token): second position identical,
        // first decides.
        let registry = HostRegistry::new();
        let token = TypeHash::from_name("Token");
        let specific = candidate("f", vec![token, token]);
        let loose = candidate("f", vec![primitives::OBJECT, token]);

        assert_eq!(
            is_better_function_member(&registry, &specific, &loose),
            Specificity::Better
        );
    }

    #[test]
    fn exact_arity_beats_rest() {
        let registry = HostRegistry::new();
        let token = TypeHash::from_name("Token");
        let pair = candidate("f", vec![token, token]);
        let rest = rest_candidate("f", token);

        assert_eq!(
            is_better_function_member(&registry, &pair, &rest),
            Specificity::Better
        );
        assert_eq!(
            is_better_function_member(&registry, &rest, &pair),
            Specificity::Worse
        );
    }

    #[test]
    fn identical_signatures_are_incomparable() {
        let registry = HostRegistry::new();
        let a = candidate("f", vec![primitives::INT32, primitives::STRING]);
        let b = candidate("f", vec![primitives::INT32, primitives::STRING]);

        assert_eq!(is_better_function_member(&registry, &a, &b), Specificity::Incomparable);
        assert_eq!(is_better_function_member(&registry, &b, &a), Specificity::Incomparable);
    }

    #[test]
    fn crossed_specificity_is_incomparable() {
        // f(object, string) vs f(string, object): each is more specific in
        // one position, so neither wins.
        let registry = HostRegistry::new();
        let a = candidate("f", vec![primitives::OBJECT, primitives::STRING]);
        let b = candidate("f", vec![primitives::STRING, primitives::OBJECT]);

        assert_eq!(is_better_function_member(&registry, &a, &b), Specificity::Incomparable);
        assert!(best_function_member(&registry, &[a, b]).is_none());
    }

    #[test]
    fn elimination_keeps_the_unique_survivor() {
        let registry = HostRegistry::new();
        let token = TypeHash::from_name("Token");
        let best = candidate("f", vec![token, token]);
        let looser = candidate("f", vec![primitives::OBJECT, token]);
        let loosest = candidate("f", vec![primitives::OBJECT, primitives::OBJECT]);

        let winner =
            best_function_member(&registry, &[Arc::clone(&loosest), Arc::clone(&looser), Arc::clone(&best)]);
        assert!(winner.is_some_and(|w| Arc::ptr_eq(&w, &best)));
    }
}
