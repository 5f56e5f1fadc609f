//! Scoped state for one depth-first walk of a query.

use crate::coerce::Value;
use crate::model::{Constraint, Operand, Selector, SourceRef};

/// What the left side of the comparison being compiled refers to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PropertyContext {
    /// A scalar property of some selector.
    Direct(Operand),
    /// A value inside a key/value collection, reached through a correlated subquery.
    Entry(EntryProbe),
}

/// Half-built `EXISTS` over a key/value collection, waiting for the value test.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntryProbe {
    /// `owner JOIN entry`, with `owner` a fresh alias of the outer selector's kind.
    pub(crate) source: SourceRef,
    /// `entry.key = 'name'`.
    pub(crate) key: Constraint,
    /// Column the pending value test applies to.
    pub(crate) value: Operand,
    /// Id of `owner`, equated with `outer` to correlate the subquery.
    pub(crate) correlated: Operand,
    pub(crate) outer: Operand,
}

/// One scope: the selectors tests resolve against and the constraints collected so far.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Artifact that property tests apply to.
    pub(crate) selector: Selector,
    /// Relationship and target of the enclosing traversal, if any.
    pub(crate) relationship: Option<Selector>,
    pub(crate) target: Option<Selector>,
    pub(crate) constraints: Vec<Constraint>,
    /// Left side of the test being compiled.
    pub(crate) property: Option<PropertyContext>,
    /// Right side of the test being compiled.
    pub(crate) value: Option<Value>,
}

impl Frame {
    fn new(
        selector: Selector,
        relationship: Option<Selector>,
        target: Option<Selector>,
    ) -> Self {
        Self {
            selector,
            relationship,
            target,
            constraints: Vec::new(),
            property: None,
            value: None,
        }
    }
}

/// Stack of constraint scopes.
///
/// The root frame always exists; [`ContextStack::pop`] never removes it.
#[derive(Debug)]
pub(crate) struct ContextStack {
    root: Frame,
    scopes: Vec<Frame>,
}

impl ContextStack {
    pub(crate) fn new(root: Selector) -> Self {
        Self {
            root: Frame::new(root, None, None),
            scopes: Vec::new(),
        }
    }

    pub(crate) fn top(&self) -> &Frame {
        self.scopes.last().unwrap_or(&self.root)
    }

    pub(crate) fn top_mut(&mut self) -> &mut Frame {
        self.scopes.last_mut().unwrap_or(&mut self.root)
    }

    /// Number of open scopes above the root.
    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Opens a scope that sees the same selectors but collects its own constraints.
    pub(crate) fn push_isolated(&mut self) {
        let top = self.top();
        let frame = Frame::new(top.selector.clone(), top.relationship.clone(), top.target.clone());
        self.scopes.push(frame);
    }

    /// Opens a scope for the far side of a relationship.
    pub(crate) fn push_relationship(
        &mut self,
        selector: Selector,
        relationship: Option<Selector>,
        target: Option<Selector>,
    ) {
        self.scopes.push(Frame::new(selector, relationship, target));
    }

    /// Closes the innermost scope and returns what it collected.
    pub(crate) fn pop(&mut self) -> Vec<Constraint> {
        self.scopes
            .pop()
            .map(|frame| frame.constraints)
            .unwrap_or_default()
    }

    pub(crate) fn add(&mut self, constraint: Constraint) {
        self.top_mut().constraints.push(constraint);
    }

    /// Moves the root scope onto the far side of a top-level traversal.
    pub(crate) fn retarget_root(
        &mut self,
        selector: Selector,
        relationship: Option<Selector>,
        target: Option<Selector>,
    ) {
        self.root.selector = selector;
        self.root.relationship = relationship;
        self.root.target = target;
    }

    pub(crate) fn into_root_constraints(self) -> Vec<Constraint> {
        self.root.constraints
    }
}
