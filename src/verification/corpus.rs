//! Inputs the verifier normalizes: the domain's curated strings followed by
//! seeded random terms.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::language::{Domain, Term};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Curated,
    Generated,
}

#[derive(Clone, Debug)]
pub struct CorpusEntry {
    pub term: Term,
    pub origin: Origin,
}

/// Builds the corpus of `domain`. Curated strings that fail to parse are
/// skipped with a warning; the same seed always yields the same corpus.
pub fn build(domain: Domain, generated: usize, seed: u64, max_depth: usize) -> Vec<CorpusEntry> {
    let mut corpus = Vec::with_capacity(domain.curated().len() + generated);
    for source in domain.curated() {
        match domain.parse(source) {
            Ok(term) => corpus.push(CorpusEntry {
                term,
                origin: Origin::Curated,
            }),
            Err(error) => {
                tracing::warn!(%domain, source, %error, "skipping unparsable corpus entry")
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    corpus.extend((0..generated).map(|_| CorpusEntry {
        term: domain.generate(&mut rng, max_depth),
        origin: Origin::Generated,
    }));
    corpus
}

#[cfg(test)]
mod tests {
    use crate::language::Domain;

    use super::{Origin, build};

    #[test]
    fn curated_entries_come_first() {
        let corpus = build(Domain::License, 10, 1, 3);
        let curated = Domain::License.curated().len();
        assert_eq!(corpus.len(), curated + 10);
        assert!(corpus[..curated].iter().all(|entry| entry.origin == Origin::Curated));
        assert!(corpus[curated..].iter().all(|entry| entry.origin == Origin::Generated));
    }

    #[test]
    fn same_seed_same_corpus() {
        for domain in Domain::ALL {
            let terms = || -> Vec<_> {
                build(domain, 20, 42, 3).into_iter().map(|entry| entry.term).collect()
            };
            assert_eq!(terms(), terms());
        }
    }
}
