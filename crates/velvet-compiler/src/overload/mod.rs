//! Overload resolution for member invocation.
//!
//! Given the overloads a host type declares under one name and the runtime
//! types observed at the call site, picks the uniquely best applicable
//! candidate - or reports that none exists or that several tie.
//!
//! ## Algorithm
//!
//! 1. Enumerate candidates by name, case-insensitively (the registry walks
//!    base chains).
//! 2. Keep the applicable ones: argument counts line up (rest parameters
//!    absorb any surplus) and every argument converts to its slot.
//! 3. Zero applicable: not found. One: done.
//! 4. Otherwise run pairwise better-function-member elimination; a unique
//!    survivor wins, anything else is ambiguous.
//!
//! Resolution is a pure function of (type, name, argument shape). That is
//! what makes the call-site cache sound: rebinding after a guard miss can
//! never produce a different answer for the same observed shape.

mod better;

pub use better::{Specificity, best_function_member, is_better_function_member};

use std::sync::Arc;

use velvet_core::TypeHash;
use velvet_registry::{HostRegistry, MethodCandidate};

use crate::conversion::{Conversion, can_convert, conversion_to};

/// Outcome of resolving one member access against observed argument types.
#[derive(Debug, Clone)]
pub enum BindingResult {
    /// A uniquely best candidate, with one conversion tag per supplied
    /// argument.
    Found {
        candidate: Arc<MethodCandidate>,
        conversions: Vec<Conversion>,
    },
    /// No applicable candidate.
    NotFound,
    /// More than one candidate survived elimination.
    Ambiguous,
}

/// Resolve a named method call against `type_hash`.
///
/// `arg_types` holds the *runtime* type of each argument; `None` marks a
/// null argument, which converts to any reference-like parameter and so
/// participates in null-aware overload selection.
pub fn resolve_method(
    registry: &HostRegistry,
    type_hash: TypeHash,
    name: &str,
    arg_types: &[Option<TypeHash>],
) -> BindingResult {
    resolve_candidates(registry, &registry.methods_named(type_hash, name), arg_types)
}

/// Resolve among an explicit candidate list (used for indexers, whose
/// overload sets the registry stores separately from named methods).
pub fn resolve_candidates(
    registry: &HostRegistry,
    candidates: &[Arc<MethodCandidate>],
    arg_types: &[Option<TypeHash>],
) -> BindingResult {
    let applicable: Vec<Arc<MethodCandidate>> = candidates
        .iter()
        .filter(|candidate| is_applicable(registry, candidate, arg_types))
        .cloned()
        .collect();

    let candidate = match applicable.as_slice() {
        [] => return BindingResult::NotFound,
        [single] => Arc::clone(single),
        _ => match best_function_member(registry, &applicable) {
            Some(best) => best,
            None => return BindingResult::Ambiguous,
        },
    };

    let conversions = conversions_for(registry, &candidate, arg_types);
    BindingResult::Found {
        candidate,
        conversions,
    }
}

/// Whether the supplied arguments can possibly invoke this candidate.
fn is_applicable(
    registry: &HostRegistry,
    candidate: &MethodCandidate,
    arg_types: &[Option<TypeHash>],
) -> bool {
    match candidate.rest {
        // Plain candidates demand an exact argument-count match.
        None => {
            if arg_types.len() != candidate.params.len() {
                return false;
            }
        }
        // A rest candidate accepts anything from "every fixed slot filled"
        // upwards.
        Some(_) => {
            if arg_types.len() < candidate.fixed_param_count() {
                return false;
            }
        }
    }

    for (position, &arg) in arg_types.iter().enumerate() {
        let compatible = if position >= candidate.params.len() {
            // Surplus arguments only exist for rest candidates.
            match candidate.rest {
                Some(element) => can_convert(registry, arg, element),
                None => false,
            }
        } else {
            let param = candidate.params[position];
            let is_rest_slot = candidate.has_rest() && position == candidate.params.len() - 1;
            can_convert(registry, arg, param)
                || (is_rest_slot
                    && candidate
                        .rest
                        .is_some_and(|element| can_convert(registry, arg, element)))
        };
        if !compatible {
            return false;
        }
    }

    true
}

/// Conversion tags for an already-validated candidate, one per argument.
fn conversions_for(
    registry: &HostRegistry,
    candidate: &MethodCandidate,
    arg_types: &[Option<TypeHash>],
) -> Vec<Conversion> {
    let fixed = candidate.fixed_param_count();
    let mut conversions = Vec::with_capacity(arg_types.len());

    for (position, &arg) in arg_types.iter().enumerate() {
        if position < fixed {
            conversions.push(conversion_to(registry, arg, candidate.params[position]));
            continue;
        }
        let Some(element) = candidate.rest else {
            // Without a rest parameter every position is fixed.
            conversions.push(conversion_to(registry, arg, candidate.params[position]));
            continue;
        };
        // A lone argument already assignable to the declared rest type is
        // passed through unpacked rather than wrapped in a one-element array.
        let rest_param = candidate.params[fixed];
        let pass_through = arg_types.len() == candidate.params.len()
            && position == fixed
            && can_convert(registry, arg, rest_param);
        if pass_through {
            conversions.push(conversion_to(registry, arg, rest_param));
        } else {
            conversions.push(Conversion::RestPack { element });
        }
    }

    conversions
}
