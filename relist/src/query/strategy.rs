//! Pagination strategy selection

use crate::context::FetchContext;
use crate::model::Cardinality;
use crate::resource::ResourceDefinition;

use super::plan::Strategy;

/// Choose how a list request bounds its rows
///
/// The per-request `sub_query` option wins over the resource default.
/// `SubQuery` is chosen only when it is requested and at least one include
/// is MANY; without a MANY include both strategies return the same rows and
/// the single-statement form is cheaper. Requesting `Flat` alongside a MANY
/// include is honored but logged, since pages and totals then count joined
/// rows rather than base records.
pub fn select(definition: &ResourceDefinition, context: &FetchContext) -> Strategy {
    let sub_query = context.options.sub_query.unwrap_or(definition.sub_query);
    let has_many = definition
        .includes
        .iter()
        .any(|include| include.cardinality == Cardinality::Many);

    match (sub_query, has_many) {
        (true, true) => Strategy::SubQuery,
        (false, true) => {
            tracing::warn!(
                resource = %definition.name,
                "flat pagination over a MANY include; page bounds and totals count joined rows"
            );
            Strategy::Flat
        }
        (_, false) => Strategy::Flat,
    }
}
