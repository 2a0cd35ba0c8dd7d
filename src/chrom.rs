//! Karyotype ordering of chromosome names.
//!
//! Numeric chromosomes sort first by value, then X, Y and the mitochondrial
//! genome, then every other contig. An optional `chr` prefix is ignored when
//! classifying a name. Names that land in the same slot are compared as raw
//! text, so two names compare `Equal` only when they are identical.

use std::cmp::Ordering;

/// Classification slot of a chromosome name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Numeric(u64),
    X,
    Y,
    Mito,
    Other,
}

fn strip_chr_prefix(name: &str) -> &str {
    match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
        _ => name,
    }
}

fn classify(name: &str) -> Class {
    let bare = strip_chr_prefix(name);
    if !bare.is_empty() && bare.bytes().all(|b| b.is_ascii_digit()) {
        // Absurdly long digit strings are still ordered, just not numerically.
        return bare.parse().map(Class::Numeric).unwrap_or(Class::Other);
    }
    if bare.eq_ignore_ascii_case("X") {
        Class::X
    } else if bare.eq_ignore_ascii_case("Y") {
        Class::Y
    } else if bare.eq_ignore_ascii_case("M") || bare.eq_ignore_ascii_case("MT") {
        Class::Mito
    } else {
        Class::Other
    }
}

/// Compare two chromosome names in karyotype order.
///
/// This is a strict total order: reflexive, antisymmetric and transitive over
/// arbitrary strings, so it is safe both for sorting events and for deciding
/// when a merge cursor has moved past a chromosome.
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    classify(a).cmp(&classify(b)).then_with(|| a.cmp(b))
}
