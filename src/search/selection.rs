//! Multi-objective ranking: Pareto dominance, fast non-dominated sorting,
//! and crowding distance.

use super::encoding::TestCase;
use super::objective::ObjectiveId;

/// Distance of an encoding to an objective, with the pessimistic fallback
/// for encodings never scored against it.
fn distance(encoding: &TestCase, objective: ObjectiveId) -> f64 {
    encoding.distance(objective).unwrap_or(1.0)
}

/// `true` if `a` Pareto-dominates `b` over the given objectives: no worse
/// on all, strictly better on at least one.
pub fn dominates(a: &TestCase, b: &TestCase, objectives: &[ObjectiveId]) -> bool {
    let mut strictly_better = false;
    for &objective in objectives {
        let da = distance(a, objective);
        let db = distance(b, objective);
        if da > db {
            return false;
        }
        if da < db {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Partition a population into Pareto fronts and stamp each encoding with
/// its front index (rank 0 is non-dominated). Returns the fronts as index
/// lists into `population`; within a front, original population order is
/// preserved.
pub fn fast_nondominated_sort(
    population: &mut [TestCase],
    objectives: &[ObjectiveId],
) -> Vec<Vec<usize>> {
    let n = population.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];

    for p in 0..n {
        for q in (p + 1)..n {
            if dominates(&population[p], &population[q], objectives) {
                dominated_by[p].push(q);
                domination_count[q] += 1;
            } else if dominates(&population[q], &population[p], objectives) {
                dominated_by[q].push(p);
                domination_count[p] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&p| domination_count[p] == 0).collect();
    let mut rank = 0;
    while !current.is_empty() {
        for &p in &current {
            population[p].set_rank(rank);
        }
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(std::mem::replace(&mut current, next));
        rank += 1;
    }
    fronts
}

/// Assign crowding distance within one front (given as indices into the
/// population). Boundary encodings per objective get infinite distance so
/// they always survive truncation.
pub fn assign_crowding_distance(
    population: &mut [TestCase],
    front: &[usize],
    objectives: &[ObjectiveId],
) {
    for &p in front {
        population[p].set_crowding_distance(0.0);
    }
    if front.len() <= 2 {
        for &p in front {
            population[p].set_crowding_distance(f64::INFINITY);
        }
        return;
    }

    for &objective in objectives {
        let mut order: Vec<usize> = front.to_vec();
        order.sort_by(|&a, &b| {
            distance(&population[a], objective)
                .total_cmp(&distance(&population[b], objective))
        });

        let lo = distance(&population[order[0]], objective);
        let hi = distance(&population[*order.last().unwrap()], objective);
        let span = hi - lo;

        population[order[0]].set_crowding_distance(f64::INFINITY);
        population[*order.last().unwrap()].set_crowding_distance(f64::INFINITY);
        if span == 0.0 {
            continue;
        }

        for window in order.windows(3) {
            let (prev, mid, next) = (window[0], window[1], window[2]);
            let gap = (distance(&population[next], objective)
                - distance(&population[prev], objective))
                / span;
            let updated = population[mid].crowding_distance() + gap;
            population[mid].set_crowding_distance(updated);
        }
    }
}
