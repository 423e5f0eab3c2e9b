//! Genome alignment by innovation: compatibility distance and crossover.

use crate::{
    config::Hyper,
    constants::STRATA_NORMALIZATION_THRESHOLD,
    genome::{Connection, Genome, Node},
};
use core::cmp::{max, Ordering};
use rand::{Rng, RngCore};
use std::collections::BTreeSet;

#[inline]
fn max_inno(connections: &[Connection]) -> usize {
    connections.last().map_or(0, |c| c.inno)
}

/// Count (disjoint, excess) genes between two innovation-sorted connection sets. Excess genes
/// trail in whichever set reaches the higher innovation.
pub fn disjoint_excess_count(l: &[Connection], r: &[Connection]) -> (usize, usize) {
    let (long, short) = if max_inno(l) < max_inno(r) {
        (r, l)
    } else {
        (l, r)
    };

    let (mut i_l, mut i_s, mut disjoint) = (0, 0, 0);
    while i_l < long.len() && i_s < short.len() {
        match long[i_l].inno.cmp(&short[i_s].inno) {
            Ordering::Equal => {
                i_l += 1;
                i_s += 1;
            }
            Ordering::Less => {
                disjoint += 1;
                i_l += 1;
            }
            Ordering::Greater => {
                disjoint += 1;
                i_s += 1;
            }
        }
    }

    (disjoint, long.len() - i_l)
}

/// if genomes share no innovations, their average diff should be 0
pub fn avg_param_diff(l: &[Connection], r: &[Connection]) -> f64 {
    let (mut i_l, mut i_r) = (0, 0);
    let (mut count, mut diff_sum) = (0usize, 0.);
    while i_l < l.len() && i_r < r.len() {
        match l[i_l].inno.cmp(&r[i_r].inno) {
            Ordering::Equal => {
                count += 1;
                diff_sum += (l[i_l].weight - r[i_r].weight).abs();
                i_l += 1;
                i_r += 1;
            }
            Ordering::Less => i_l += 1,
            Ordering::Greater => i_r += 1,
        }
    }

    if count == 0 {
        0.
    } else {
        diff_sum / count as f64
    }
}

/// Compatibility distance between two genomes: `(c1·disjoint + c2·excess) / N + c3·avg weight
/// diff`, where `N` is the larger connection count, or 1 for small genomes
pub fn delta(l: &Genome, r: &Genome, hyper: &Hyper) -> f64 {
    let (l, r) = (l.connections(), r.connections());
    let (disjoint, excess) = disjoint_excess_count(l, r);
    let size = match max(l.len(), r.len()) {
        n if n < STRATA_NORMALIZATION_THRESHOLD => 1.,
        n => n as f64,
    };

    (hyper.c1 * disjoint as f64 + hyper.c2 * excess as f64) / size
        + hyper.c3 * avg_param_diff(l, r)
}

/// Breed `fitter` with `other`. Shared genes come from either parent at random, disjoint and
/// excess genes only from `fitter`. The child keeps every mandatory node plus every node its
/// connections reference, each copied from a parent that has it. Recurrent memory starts empty.
pub fn crossover(
    fitter: &Genome,
    other: &Genome,
    mandatory: &[Node],
    rng: &mut impl RngCore,
) -> Genome {
    let (l, r) = (fitter.connections(), other.connections());
    let mut connections = Vec::with_capacity(l.len());
    let (mut i_l, mut i_r) = (0, 0);
    while i_l < l.len() {
        let pick = match r.get(i_r).map(|c| l[i_l].inno.cmp(&c.inno)) {
            Some(Ordering::Equal) => {
                let pick = if rng.random::<bool>() { &l[i_l] } else { &r[i_r] };
                i_l += 1;
                i_r += 1;
                pick
            }
            Some(Ordering::Greater) => {
                i_r += 1;
                continue;
            }
            Some(Ordering::Less) | None => {
                i_l += 1;
                &l[i_l - 1]
            }
        };
        connections.push(Connection {
            output_cache: 0.,
            ..pick.clone()
        });
    }

    let ids = mandatory
        .iter()
        .map(|n| n.id)
        .chain(connections.iter().flat_map(|c| [c.from, c.to]))
        .collect::<BTreeSet<_>>();
    let nodes = ids
        .into_iter()
        .filter_map(|id| match (fitter.node(id), other.node(id)) {
            (Some(l), Some(r)) => Some(if rng.random::<bool>() { l } else { r }),
            (Some(n), None) | (None, Some(n)) => Some(n),
            (None, None) => mandatory.iter().find(|n| n.id == id),
        })
        .cloned()
        .collect();

    Genome::assemble(nodes, connections, fitter.species)
}
