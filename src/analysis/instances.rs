//! Ground instances of patterns over per-sort pools of sample terms.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::language::{Domain, Sort, Term, VariableId};
use crate::rewriting::{Bindings, RewriteEngine};

/// Extra generated terms added to the pool of the root sort.
const GENERATED_POOL: usize = 4;

/// Mixed-radix counter over the choices for each variable.
#[derive(Clone, Debug)]
pub struct Odometer {
    radices: Vec<usize>,
    digits: Vec<usize>,
    done: bool,
}

impl Odometer {
    pub fn new(radices: Vec<usize>) -> Self {
        let done = radices.contains(&0);
        Self {
            digits: vec![0; radices.len()],
            radices,
            done,
        }
    }

    /// Number of readings, saturating.
    pub fn len(&self) -> usize {
        self.radices.iter().fold(1usize, |total, radix| total.saturating_mul(*radix))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let reading = self.digits.clone();
        self.done = true;
        for (digit, radix) in self.digits.iter_mut().zip(&self.radices) {
            *digit += 1;
            if *digit < *radix {
                self.done = false;
                break;
            }
            *digit = 0;
        }
        Some(reading)
    }
}

/// Normal-form sample terms of every sort of one domain.
#[derive(Clone, Debug)]
pub struct Pools {
    terms: BTreeMap<Sort, Vec<Term>>,
}

impl Pools {
    /// Domain samples, plus a few generated terms of the root sort no deeper
    /// than `max_depth`, all in normal form under `engine`.
    pub fn build(domain: Domain, engine: &RewriteEngine<'_>, seed: u64, max_depth: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let generated: Vec<Term> = (0..GENERATED_POOL * 4)
            .map(|_| domain.generate(&mut rng, max_depth))
            .map(|term| engine.normalize(term))
            .filter(|result| result.terminated && result.normal_form.depth() <= max_depth + 1)
            .map(|result| result.normal_form)
            .collect();

        let mut terms = BTreeMap::new();
        for sort in SORTS {
            let mut seen = BTreeSet::new();
            let mut pool: Vec<Term> = domain
                .samples(sort)
                .into_iter()
                .filter(|term| seen.insert(term.clone()))
                .collect();
            if sort == domain.root_sort() {
                pool.extend(
                    generated
                        .iter()
                        .filter(|term| seen.insert((*term).clone()))
                        .take(GENERATED_POOL)
                        .cloned(),
                );
            }
            if !pool.is_empty() {
                terms.insert(sort, pool);
            }
        }
        Self { terms }
    }

    pub fn get(&self, sort: Sort) -> &[Term] {
        self.terms.get(&sort).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every ground instance of `pattern` in odometer order, or `None` when
    /// some variable has a sort without samples.
    pub fn instances<'p>(&'p self, pattern: &'p Term) -> Option<Instances<'p>> {
        let sorts = pattern.variable_sorts();
        let variables: Vec<VariableId> = pattern.variables().into_iter().collect();
        let choices = variables
            .iter()
            .map(|variable| sorts.get(variable).map(|sort| self.get(*sort)))
            .collect::<Option<Vec<&[Term]>>>()?;
        if choices.iter().any(|choice| choice.is_empty()) {
            return None;
        }
        Some(Instances {
            pattern,
            odometer: Odometer::new(choices.iter().map(|choice| choice.len()).collect()),
            variables,
            choices,
        })
    }
}

const SORTS: [Sort; 12] = [
    Sort::License,
    Sort::Exception,
    Sort::Range,
    Sort::Version,
    Sort::Document,
    Sort::Graph,
    Sort::RdfNode,
    Sort::Metric,
    Sort::MetricList,
    Sort::Filter,
    Sort::Text,
    Sort::Number,
];

pub struct Instances<'p> {
    pattern: &'p Term,
    variables: Vec<VariableId>,
    choices: Vec<&'p [Term]>,
    odometer: Odometer,
}

impl Instances<'_> {
    pub fn total(&self) -> usize {
        self.odometer.len()
    }
}

impl Iterator for Instances<'_> {
    type Item = Term;

    fn next(&mut self) -> Option<Term> {
        let reading = self.odometer.next()?;
        let bindings: Bindings = self
            .variables
            .iter()
            .zip(&self.choices)
            .zip(reading)
            .map(|((variable, choice), digit)| (*variable, choice[digit].clone()))
            .collect();
        Some(self.pattern.substitute(&bindings))
    }
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Sort};
    use crate::rewriting::RewriteEngine;

    use super::{Odometer, Pools};

    #[test]
    fn odometer_visits_every_reading_once() {
        let readings: Vec<Vec<usize>> = Odometer::new(vec![2, 3]).collect();
        assert_eq!(readings.len(), 6);
        assert_eq!(readings[0], vec![0, 0]);
        assert_eq!(readings[1], vec![1, 0]);
        assert_eq!(readings[5], vec![1, 2]);
        assert_eq!(Odometer::new(vec![]).count(), 1);
        assert_eq!(Odometer::new(vec![3, 0]).count(), 0);
    }

    #[test]
    fn instances_follow_variable_sorts() {
        let rules = Domain::License.ruleset().unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 1000);
        let pools = Pools::build(Domain::License, &engine, 7, 2);
        let pattern = Domain::License.parse_pattern("(with $0 $1)").unwrap();
        let instances = pools.instances(&pattern).unwrap();
        let expected = pools.get(Sort::License).len() * pools.get(Sort::Exception).len();
        assert_eq!(instances.total(), expected);
        assert!(instances.into_iter().all(|term| term.is_ground()));
    }

    #[test]
    fn missing_sorts_have_no_instances() {
        let rules = Domain::Metric.ruleset().unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 1000);
        let pools = Pools::build(Domain::Metric, &engine, 7, 2);
        let pattern = Domain::Metric.parse_pattern("(weighted $0 $1)").unwrap();
        assert!(pools.instances(&pattern).is_some());
        assert!(pools.get(Sort::Graph).is_empty());
    }
}
