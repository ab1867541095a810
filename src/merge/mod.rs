pub mod assemble;
pub mod columns;
pub mod extract;
pub mod fragment;
pub mod merger;
pub mod normalize;
pub mod resolve;
pub mod row;
pub mod score;

use assemble::Dataset;
use row::RawRow;

/// Resolve → enrich → assemble over already-loaded source tables, in the given order.
pub fn build_dataset<S, R>(sources: S) -> Dataset
where
    S: IntoIterator<Item = (String, R)>,
    R: AsRef<[RawRow]>,
{
    let index = resolve::resolve(sources);
    let records = score::enrich_all(index.into_fragments());
    assemble::assemble(records)
}

// ── Tests ──
