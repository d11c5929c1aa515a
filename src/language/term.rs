use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domains::semver::Version;

use super::{Literal, Op, Position, Sort};

pub type VariableId = usize;

/// Operator applied to an ordered list of children.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Symbol {
    pub op: Op,
    pub children: Vec<Term>,
}

/// Children are released with an explicit stack so that dropping a long chain
/// does not recurse once per level.
impl Drop for Symbol {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut term) = pending.pop() {
            if let Term::Symbol(symbol) = &mut term {
                pending.append(&mut symbol.children);
            }
        }
    }
}

/// A first-order term.
///
/// Terms are immutable values; every rewrite produces a new term. The derived
/// `Ord` is the canonical order used by ordered rewriting: variables before
/// literals before operator applications, then operator, then children
/// lexicographically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Term {
    Variable(VariableId),
    Literal(Literal),
    Symbol(Symbol),
}

impl Term {
    pub fn symbol(op: impl Into<Op>, children: Vec<Term>) -> Term {
        Term::Symbol(Symbol {
            op: op.into(),
            children,
        })
    }

    pub fn constant(op: impl Into<Op>) -> Term {
        Self::symbol(op, Vec::new())
    }

    /// `op` applied to a single text literal, the shape of identifier leaves.
    pub fn text(op: impl Into<Op>, text: impl Into<String>) -> Term {
        Self::symbol(op, vec![Term::Literal(Literal::Text(text.into()))])
    }

    pub fn number(value: f64) -> Term {
        Term::Literal(Literal::from(value))
    }

    pub fn version(version: Version) -> Term {
        Term::Literal(Literal::Version(version))
    }

    pub fn op(&self) -> Option<Op> {
        match self {
            Term::Symbol(symbol) => Some(symbol.op),
            _ => None,
        }
    }

    pub fn has_op(&self, op: impl Into<Op>) -> bool {
        self.op() == Some(op.into())
    }

    pub fn children(&self) -> &[Term] {
        match self {
            Term::Symbol(symbol) => &symbol.children,
            _ => &[],
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        self.as_literal().and_then(Literal::as_number)
    }

    pub fn as_version(&self) -> Option<&Version> {
        self.as_literal().and_then(Literal::as_version)
    }

    /// Text payload of an identifier leaf such as `(license "MIT")`.
    pub fn leaf_text(&self) -> Option<&str> {
        match self.children() {
            [Term::Literal(literal)] => literal.as_text(),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_ground(&self) -> bool {
        self.preorder().all(|(_, term)| !term.is_variable())
    }

    /// Deep equality walked with an explicit stack, safe on deeply nested terms.
    pub fn structural_equals(&self, other: &Term) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            match (left, right) {
                (Term::Symbol(left), Term::Symbol(right)) => {
                    if left.op != right.op || left.children.len() != right.children.len() {
                        return false;
                    }
                    pending.extend(left.children.iter().zip(&right.children));
                }
                _ if left != right => return false,
                _ => {}
            }
        }
        true
    }

    pub fn subterm(&self, position: &Position) -> Option<&Term> {
        let mut current = self;
        for &index in position.indices() {
            current = current.children().get(index)?;
        }
        Some(current)
    }

    /// Iterates over all subterms with their positions, parents before children,
    /// left to right.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            stack: vec![(Position::root(), self)],
        }
    }

    /// Number of nodes, literals and variables included.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(term) = stack.pop() {
            count += 1;
            stack.extend(term.children());
        }
        count
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((term, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(term.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    pub fn variables(&self) -> BTreeSet<VariableId> {
        self.preorder()
            .filter_map(|(_, term)| match term {
                Term::Variable(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn max_variable(&self) -> Option<VariableId> {
        self.variables().last().copied()
    }

    pub fn contains_variable(&self, variable: VariableId) -> bool {
        self.preorder()
            .any(|(_, term)| matches!(term, Term::Variable(id) if *id == variable))
    }

    /// Sort expected at each variable, read off the operator above it.
    pub fn variable_sorts(&self) -> BTreeMap<VariableId, Sort> {
        let mut sorts = BTreeMap::new();
        for (_, term) in self.preorder() {
            let Term::Symbol(symbol) = term else {
                continue;
            };
            for (index, child) in symbol.children.iter().enumerate() {
                if let Term::Variable(id) = child {
                    sorts.entry(*id).or_insert(symbol.op.argument_sort(index));
                }
            }
        }
        sorts
    }

    /// Copies the term, replacing every outermost subterm for which `replace`
    /// returns a term. Built bottom-up with an explicit stack.
    pub fn transform(&self, replace: impl Fn(&Term) -> Option<Term>) -> Term {
        enum Frame<'t> {
            Visit(&'t Term),
            Build(Op, usize),
        }

        let mut frames = vec![Frame::Visit(self)];
        let mut built: Vec<Term> = Vec::new();
        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Visit(term) => {
                    if let Some(replacement) = replace(term) {
                        built.push(replacement);
                        continue;
                    }
                    match term {
                        Term::Symbol(symbol) => {
                            frames.push(Frame::Build(symbol.op, symbol.children.len()));
                            frames.extend(symbol.children.iter().rev().map(Frame::Visit));
                        }
                        leaf => built.push(leaf.clone()),
                    }
                }
                Frame::Build(op, arity) => {
                    let children = built.split_off(built.len() - arity);
                    built.push(Term::symbol(op, children));
                }
            }
        }
        built.pop().unwrap_or_else(|| self.clone())
    }

    pub fn map_variables(&self, rename: &impl Fn(VariableId) -> VariableId) -> Term {
        self.transform(|term| match term {
            Term::Variable(id) => Some(Term::Variable(rename(*id))),
            _ => None,
        })
    }

    pub fn offset_variables(&self, offset: VariableId) -> Term {
        self.map_variables(&|id| id + offset)
    }

    /// Replaces the subterm at `position`, returning the term unchanged when the
    /// position does not exist.
    pub fn replace_at(self, position: &Position, replacement: Term) -> Term {
        let mut spine: Vec<(Symbol, usize)> = Vec::with_capacity(position.depth());
        let mut current = self;

        for &index in position.indices() {
            match current {
                Term::Symbol(mut symbol) if index < symbol.children.len() => {
                    let child = std::mem::replace(&mut symbol.children[index], Term::Variable(0));
                    spine.push((symbol, index));
                    current = child;
                }
                unchanged => return rebuild(spine, unchanged),
            }
        }

        rebuild(spine, replacement)
    }

    /// Elements of the maximal `op` chain rooted here, left to right.
    ///
    /// A term not headed by `op` is a chain of one.
    pub fn chain_elements(&self, op: impl Into<Op>) -> Vec<&Term> {
        let op = op.into();
        let mut elements = Vec::new();
        let mut stack = vec![self];
        while let Some(term) = stack.pop() {
            if term.op() == Some(op) {
                stack.extend(term.children().iter().rev());
            } else {
                elements.push(term);
            }
        }
        elements
    }

    /// Heads of a `cons`-style list and the term that terminates it.
    pub fn list_elements(&self, cons: impl Into<Op>) -> (Vec<&Term>, &Term) {
        let cons = cons.into();
        let mut heads = Vec::new();
        let mut current = self;
        while let (Some(op), [head, tail]) = (current.op(), current.children()) {
            if op != cons {
                break;
            }
            heads.push(head);
            current = tail;
        }
        (heads, current)
    }

    /// Right-nested chain `(op e0 (op e1 ...))`; `None` when there are no elements.
    pub fn chain(op: impl Into<Op>, elements: Vec<Term>) -> Option<Term> {
        let op = op.into();
        let mut elements = elements.into_iter().rev();
        let last = elements.next()?;
        Some(elements.fold(last, |tail, head| Term::symbol(op, vec![head, tail])))
    }

    /// Right-nested list of `heads` ending in `tail`.
    pub fn list(cons: impl Into<Op>, heads: Vec<Term>, tail: Term) -> Term {
        let cons = cons.into();
        heads
            .into_iter()
            .rev()
            .fold(tail, |tail, head| Term::symbol(cons, vec![head, tail]))
    }
}

fn rebuild(mut spine: Vec<(Symbol, usize)>, mut term: Term) -> Term {
    while let Some((mut parent, index)) = spine.pop() {
        parent.children[index] = term;
        term = Term::Symbol(parent);
    }
    term
}

pub struct Preorder<'t> {
    stack: Vec<(Position, &'t Term)>,
}

impl<'t> Iterator for Preorder<'t> {
    type Item = (Position, &'t Term);

    fn next(&mut self) -> Option<Self::Item> {
        let (position, term) = self.stack.pop()?;
        for (index, child) in term.children().iter().enumerate().rev() {
            self.stack.push((position.child(index), child));
        }
        Some((position, term))
    }
}

impl From<Literal> for Term {
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}

/// Pattern syntax: `(op child ...)`, `$n` for variables.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(id) => write!(f, "${id}"),
            Term::Literal(literal) => write!(f, "{literal}"),
            Term::Symbol(symbol) => {
                write!(f, "({}", symbol.op.name())?;
                for child in &symbol.children {
                    write!(f, " {child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domains::license::LicenseOp;
    use crate::language::{Domain, Position, Term};

    fn term(text: &str) -> Term {
        Domain::License.parse_pattern(text).unwrap()
    }

    #[test]
    fn preorder_visits_parents_first() {
        let t = term(r#"(or (license "A") (and (license "B") $0))"#);
        let positions: Vec<String> = t.preorder().map(|(p, _)| p.to_string()).collect();
        assert_eq!(positions, vec!["ε", "0", "0.0", "1", "1.0", "1.0.0", "1.1"]);
    }

    #[test]
    fn structural_equality() {
        let a = term(r#"(or (license "A") (and (license "B") $0))"#);
        assert!(a.structural_equals(&a.clone()));
        assert!(!a.structural_equals(&term(r#"(or (license "A") (and (license "B") $1))"#)));
        assert!(!a.structural_equals(&term(r#"(or (license "A") (license "B"))"#)));
    }

    #[test]
    fn long_chains_drop_and_transform_without_recursing() {
        let leaves = (0..200_000)
            .map(|i| Term::text(LicenseOp::License, format!("L{i}")))
            .collect();
        let chain = Term::chain(LicenseOp::Or, leaves).unwrap();
        assert_eq!(chain.depth(), 200_001);
        let renamed = chain.transform(|t| t.has_op(LicenseOp::License).then(|| Term::Variable(0)));
        assert_eq!(renamed.chain_elements(LicenseOp::Or).len(), 200_000);
        assert!(renamed.chain_elements(LicenseOp::Or).iter().all(|e| e.is_variable()));
        drop(chain);
        drop(renamed);
    }

    #[test]
    fn map_variables_keeps_shape() {
        let t = term(r#"(or $2 (and (license "B") $0))"#);
        assert_eq!(t.offset_variables(3), term(r#"(or $5 (and (license "B") $3))"#));
    }

    #[test]
    fn replace_at_rebuilds_spine() {
        let t = term(r#"(or (license "A") (and (license "B") $0))"#);
        let replaced = t.replace_at(&Position::from(vec![1, 1]), term(r#"(license "C")"#));
        assert_eq!(replaced, term(r#"(or (license "A") (and (license "B") (license "C")))"#));
    }

    #[test]
    fn replace_at_invalid_position_is_identity() {
        let t = term(r#"(license "A")"#);
        assert_eq!(t.clone().replace_at(&Position::from(vec![3]), term("$0")), t);
    }

    #[test]
    fn chains_flatten_both_sides() {
        let t = term(r#"(or (or (license "A") (license "B")) (or (license "C") (license "D")))"#);
        let names: Vec<_> = t
            .chain_elements(LicenseOp::Or)
            .into_iter()
            .filter_map(|e| e.leaf_text())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn chain_builds_right_nested() {
        let elements = vec![
            term(r#"(license "A")"#),
            term(r#"(license "B")"#),
            term(r#"(license "C")"#),
        ];
        assert_eq!(
            Term::chain(LicenseOp::And, elements).unwrap(),
            term(r#"(and (license "A") (and (license "B") (license "C")))"#)
        );
        assert!(Term::chain(LicenseOp::And, Vec::new()).is_none());
    }

    #[test]
    fn size_depth_and_variables() {
        let t = term(r#"(or $2 (and (license "B") $0))"#);
        assert_eq!(t.size(), 6);
        assert_eq!(t.depth(), 4);
        assert_eq!(t.variables().into_iter().collect::<Vec<_>>(), vec![0, 2]);
        assert!(!t.is_ground());
    }

    #[test]
    fn canonical_order_puts_variables_first() {
        assert!(term("$5") < term(r#"(license "A")"#));
        assert!(term(r#"(license "A")"#) < term(r#"(license "B")"#));
        assert!(term(r#"(license "Z")"#) < term(r#"(and (license "A") (license "B"))"#));
    }
}
