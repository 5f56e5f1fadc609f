//! Single-pass translation of a query AST into a [`ConstraintTree`].

use artificer_api::{ArtifactTypeCatalog, ClassificationResolver, EXTENDED_MODEL, FullTextIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::alias::AliasAllocator;
use crate::ast::{
    AndExpr, Argument, EqualityExpr, Expr, ForwardPropertyStep, FunctionCall, LocationPath,
    Operand as AstOperand, OrExpr, PrimaryExpr, Query, RelationshipPath, SubartifactSet,
};
use crate::backend::{QueryBuilder, realize};
use crate::coerce::{Value, coerce};
use crate::config::CompilerConfig;
use crate::context::{ContextStack, EntryProbe, PropertyContext};
use crate::error::{Error, Result};
use crate::model::{
    Constraint, ConstraintTree, CoreProperty, JoinCondition, JoinKind, NodeKind, Operator,
    Ordering, Property, Selector, SourceRef, Subquery,
};

/// The external services a compile may call out to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub classifications: &'a dyn ClassificationResolver,
    pub catalog: &'a dyn ArtifactTypeCatalog,
    pub full_text: &'a dyn FullTextIndex,
}

/// Requested result ordering, e.g. `name` or `s-ramp:lastModifiedTimestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub property: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

impl OrderBy {
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }
}

pub struct QueryCompiler<'a> {
    collaborators: Collaborators<'a>,
    config: &'a CompilerConfig,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(collaborators: &Collaborators<'a>, config: &'a CompilerConfig) -> Self {
        Self {
            collaborators: *collaborators,
            config,
        }
    }

    /// Compiles `query` into a backend-agnostic tree.
    ///
    /// All walk state lives in a fresh [`Walk`] per call, so nothing leaks
    /// between two compiles.
    pub fn compile_tree(&self, query: &Query, order_by: Option<&OrderBy>) -> Result<ConstraintTree> {
        self.config.validate()?;
        debug!(query = %query, "compiling query");

        let mut walk = Walk::new(self.collaborators, self.config);
        walk.query(query)?;
        let tree = walk.finish(order_by)?;

        trace!(plan = %tree.explain(), "constraint tree");
        Ok(tree)
    }

    /// Compiles `query` and realizes it with `builder`.
    pub fn compile<B: QueryBuilder>(
        &self,
        query: &Query,
        builder: &mut B,
        order_by: Option<&OrderBy>,
    ) -> Result<B::Query> {
        let tree = self.compile_tree(query, order_by)?;
        debug!(backend = builder.name(), "realizing constraint tree");
        realize(&tree, builder)
    }
}

/// What a function call left behind.
enum FunctionOutcome {
    /// A finished constraint was added to the current scope.
    Constraint,
    /// The current property was set; the enclosing test still has to finish it.
    Property,
}

struct Walk<'a> {
    collaborators: Collaborators<'a>,
    config: &'a CompilerConfig,
    aliases: AliasAllocator,
    stack: ContextStack,
    source: SourceRef,
    root: Selector,
    relationship_depth: usize,
}

impl<'a> Walk<'a> {
    fn new(collaborators: Collaborators<'a>, config: &'a CompilerConfig) -> Self {
        let mut aliases = AliasAllocator::new();
        let root = aliases.next(NodeKind::Artifact);
        Self {
            collaborators,
            config,
            aliases,
            stack: ContextStack::new(root.clone()),
            source: SourceRef::Selector(root.clone()),
            root,
            relationship_depth: 0,
        }
    }

    fn query(&mut self, query: &Query) -> Result<()> {
        self.location_path(&query.artifact_set);
        if let Some(predicate) = &query.predicate {
            self.and_expr(predicate)?;
        }
        if let Some(set) = &query.subartifact_set {
            self.top_level_subartifacts(set)?;
        }
        Ok(())
    }

    fn finish(self, order_by: Option<&OrderBy>) -> Result<ConstraintTree> {
        let column = self.stack.top().selector.clone();
        let ordering = order_by
            .map(|order| {
                resolve_order_property(&order.property).map(|core| Ordering {
                    operand: column.operand(Property::Core(core)),
                    ascending: order.ascending,
                })
            })
            .transpose()?;

        let root_path = &self.config.artifact_root_path;
        let mut trash = Constraint::Descendant {
            selector: self.root.clone(),
            ancestor_path: root_path.clone(),
        };
        if column != self.root {
            trash = Constraint::and(
                trash,
                Constraint::Descendant {
                    selector: column.clone(),
                    ancestor_path: root_path.clone(),
                },
            );
        }

        let constraint = match Constraint::and_all(self.stack.into_root_constraints()) {
            Some(body) => Constraint::and(body, trash),
            None => trash,
        };

        Ok(ConstraintTree {
            source: self.source,
            constraint: Some(constraint),
            column,
            ordering,
        })
    }

    fn selector(&self) -> Selector {
        self.stack.top().selector.clone()
    }

    fn location_path(&mut self, path: &LocationPath) {
        let selector = self.selector();
        if let Some(artifact_type) = &path.artifact_type {
            let info = self.collaborators.catalog.resolve(artifact_type);
            let extended =
                !info.builtin || path.artifact_model.as_deref() == Some(EXTENDED_MODEL);
            if extended {
                self.stack.add(equals(
                    &selector,
                    Property::ArtifactModel,
                    Value::string(EXTENDED_MODEL),
                ));
                self.stack.add(equals(
                    &selector,
                    Property::Core(CoreProperty::ExtendedType),
                    Value::string(artifact_type),
                ));
            } else {
                self.stack.add(equals(
                    &selector,
                    Property::ArtifactType,
                    Value::string(artifact_type),
                ));
            }
        } else if let Some(model) = &path.artifact_model {
            self.stack
                .add(equals(&selector, Property::ArtifactModel, Value::string(model)));
        }
    }

    fn and_expr(&mut self, node: &AndExpr) -> Result<()> {
        let Some(right) = &node.right else {
            return self.or_expr(&node.left);
        };
        self.stack.push_isolated();
        self.or_expr(&node.left)?;
        self.and_expr(right)?;
        let collected = self.stack.pop();
        let combined = Constraint::and_all(collected)
            .ok_or_else(|| Error::unsupported("expression yields no constraint", node))?;
        self.stack.add(combined);
        Ok(())
    }

    fn or_expr(&mut self, node: &OrExpr) -> Result<()> {
        let Some(right) = &node.right else {
            return self.equality_expr(&node.left);
        };
        self.stack.push_isolated();
        self.equality_expr(&node.left)?;
        self.or_expr(right)?;
        let collected = self.stack.pop();
        let combined = Constraint::or_all(collected)
            .ok_or_else(|| Error::unsupported("expression yields no constraint", node))?;
        self.stack.add(combined);
        Ok(())
    }

    fn equality_expr(&mut self, node: &EqualityExpr) -> Result<()> {
        let (left, comparison) = match node {
            EqualityExpr::Subartifacts(set) => return self.predicate_subartifacts(set),
            EqualityExpr::Grouped(expr) => return self.and_expr(expr),
            EqualityExpr::Test { left, comparison } => (left, comparison),
        };

        match left {
            AstOperand::Property(step) => self.property_step(step)?,
            AstOperand::Function(call) => match self.function_call(call)? {
                FunctionOutcome::Property => {}
                FunctionOutcome::Constraint if comparison.is_none() => return Ok(()),
                FunctionOutcome::Constraint => {
                    return Err(Error::unsupported(
                        format!("{}() cannot be compared to a value", call.name.local),
                        node,
                    ));
                }
            },
            AstOperand::Primary(_) => {
                return Err(Error::unsupported(
                    "only properties and functions may be tested",
                    node,
                ));
            }
        }

        match comparison {
            None => self.finish_test(None, node),
            Some((op, right)) => {
                let context = match &self.stack.top().property {
                    Some(PropertyContext::Direct(operand)) => Some(operand.property),
                    Some(PropertyContext::Entry(probe)) => Some(probe.value.property),
                    None => None,
                };
                let value = coerce(context.as_ref(), right, &self.config.date_format)?;
                self.stack.top_mut().value = Some(value);
                self.finish_test(Some(Operator::from(*op)), node)
            }
        }
    }

    /// Turns the current property (and value, if any) into a constraint.
    fn finish_test(&mut self, operator: Option<Operator>, fragment: &dyn std::fmt::Display) -> Result<()> {
        let frame = self.stack.top_mut();
        let property = frame.property.take();
        let value = frame.value.take();

        let constraint = match (property, operator.zip(value)) {
            (None, _) => {
                return Err(Error::unsupported("test has no property to apply to", fragment));
            }
            (Some(PropertyContext::Direct(operand)), None) => Constraint::Exists(operand),
            (Some(PropertyContext::Direct(operand)), Some((operator, value))) => {
                Constraint::Comparison {
                    operand,
                    operator,
                    value,
                }
            }
            (Some(PropertyContext::Entry(probe)), test) => {
                let mut parts = vec![probe.key];
                if let Some((operator, value)) = test {
                    parts.push(Constraint::Comparison {
                        operand: probe.value,
                        operator,
                        value,
                    });
                }
                Constraint::ExistsSubquery(Box::new(Subquery {
                    source: probe.source,
                    constraint: Constraint::and_all(parts),
                    correlated: probe.correlated,
                    outer: probe.outer,
                }))
            }
        };
        self.stack.add(constraint);
        Ok(())
    }

    fn property_step(&mut self, step: &ForwardPropertyStep) -> Result<()> {
        let name = &step.property;
        if !name.is_sramp() {
            return Err(Error::unsupported(
                format!("properties must be in the S-RAMP namespace, not {}", name.namespace_uri()),
                step,
            ));
        }

        let selector = self.selector();
        let context = match CoreProperty::from_local_name(&name.local) {
            Some(core) => PropertyContext::Direct(selector.operand(Property::Core(core))),
            // custom properties are a sparse collection; an EXISTS keeps them negatable
            None => PropertyContext::Entry(self.entry_probe(
                &selector,
                NodeKind::PropertyEntry,
                &name.local,
            )),
        };
        self.stack.top_mut().property = Some(context);
        Ok(())
    }

    /// Starts an `EXISTS` over the key/value entries owned by `outer`.
    fn entry_probe(&mut self, outer: &Selector, entry_kind: NodeKind, key: &str) -> EntryProbe {
        let owner = self.aliases.next(outer.kind);
        let entry = self.aliases.next(entry_kind);
        let source = SourceRef::Selector(owner.clone()).join(
            entry.clone(),
            JoinKind::Inner,
            JoinCondition::Child {
                child: entry.clone(),
                parent: owner.clone(),
            },
        );
        EntryProbe {
            source,
            key: equals(&entry, Property::EntryKey, Value::string(key)),
            value: entry.operand(Property::EntryValue),
            correlated: owner.operand(Property::Id),
            outer: outer.operand(Property::Id),
        }
    }

    fn function_call(&mut self, call: &FunctionCall) -> Result<FunctionOutcome> {
        let name = &call.name;
        if name.is_sramp() {
            return match name.local.as_str() {
                "classifiedByAnyOf" => self.classified_by(call, true, true),
                "classifiedByAllOf" => self.classified_by(call, false, true),
                "exactlyClassifiedByAnyOf" => self.classified_by(call, true, false),
                "exactlyClassifiedByAllOf" => self.classified_by(call, false, false),
                "getRelationshipAttribute" => self.other_attribute(call, NodeKind::Relationship),
                "getTargetAttribute" => self.other_attribute(call, NodeKind::Target),
                "matches" | "not" => Err(Error::unsupported(
                    format!("{}() must be called in the XPath function namespace", name.local),
                    call,
                )),
                other => Err(Error::unsupported(format!("unknown function {other}()"), call)),
            };
        }
        if name.is_xpath_function() {
            return match name.local.as_str() {
                "matches" => self.matches(call),
                "not" => self.not(call),
                other => Err(Error::unsupported(
                    format!("XPath function {other}() is not supported"),
                    call,
                )),
            };
        }
        Err(Error::unsupported(
            format!("functions in namespace {} are not supported", name.namespace_uri()),
            call,
        ))
    }

    fn classified_by(&mut self, call: &FunctionCall, any: bool, normalized: bool) -> Result<FunctionOutcome> {
        // the first argument is the context item
        let terms = call
            .arguments
            .iter()
            .skip(1)
            .map(|arg| match arg {
                Argument::Primary(PrimaryExpr::Literal(term)) => Ok(term.clone()),
                other => Err(Error::unsupported(
                    "classifications must be given as string literals",
                    other,
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        if terms.is_empty() {
            return Err(Error::unsupported(
                format!("{}() needs at least one classification", call.name.local),
                call,
            ));
        }

        let uris = self.collaborators.classifications.resolve_all(&terms)?;
        let selector = self.selector();
        let tests = uris
            .into_iter()
            .map(|uri| {
                equals(
                    &selector,
                    Property::Classifier { normalized },
                    Value::String(uri.0),
                )
            })
            .collect();
        let combined = if any {
            Constraint::or_all(tests)
        } else {
            Constraint::and_all(tests)
        }
        .ok_or_else(|| Error::UnresolvedReference(format!("no classification resolved for {call}")))?;

        self.stack.add(combined);
        Ok(FunctionOutcome::Constraint)
    }

    /// `getRelationshipAttribute(., 'key')` / `getTargetAttribute(., 'key')`.
    ///
    /// The attribute lives on the edge, so the probe hangs off the relationship
    /// or target selector of the enclosing traversal.
    fn other_attribute(&mut self, call: &FunctionCall, owner: NodeKind) -> Result<FunctionOutcome> {
        let [_, key] = call.arguments.as_slice() else {
            return Err(Error::unsupported(
                format!("{}() takes 2 arguments, got {}", call.name.local, call.arguments.len()),
                call,
            ));
        };
        let key = string_literal(key)?;

        let frame = self.stack.top();
        let (outer, entry_kind) = match owner {
            NodeKind::Relationship => (frame.relationship.clone(), NodeKind::RelationshipAttribute),
            _ => (frame.target.clone(), NodeKind::TargetAttribute),
        };
        let outer = outer.ok_or_else(|| {
            Error::unsupported(
                format!("{}() is only valid inside a relationship predicate", call.name.local),
                call,
            )
        })?;

        let probe = self.entry_probe(&outer, entry_kind, key);
        self.stack.top_mut().property = Some(PropertyContext::Entry(probe));
        Ok(FunctionOutcome::Property)
    }

    fn matches(&mut self, call: &FunctionCall) -> Result<FunctionOutcome> {
        let [attribute, pattern] = call.arguments.as_slice() else {
            return Err(Error::unsupported(
                format!("matches() takes 2 arguments, got {}", call.arguments.len()),
                call,
            ));
        };
        let pattern = string_literal(pattern)?;

        if is_context_item(attribute) {
            self.full_text(pattern)?;
            return Ok(FunctionOutcome::Constraint);
        }

        let step = property_argument(attribute)?;
        self.property_step(step)?;
        // `.*` is the only wildcard the language knows
        self.stack.top_mut().value = Some(Value::String(pattern.replace(".*", "%")));
        self.finish_test(Some(Operator::Like), call)?;
        Ok(FunctionOutcome::Constraint)
    }

    fn full_text(&mut self, pattern: &str) -> Result<()> {
        let ids = self
            .collaborators
            .full_text
            .search(pattern, &self.config.full_text_fields)?;

        let operand = self.selector().operand(Property::Core(CoreProperty::Uuid));
        let groups: Vec<Constraint> = if ids.is_empty() {
            vec![Constraint::In {
                operand,
                values: Vec::new(),
            }]
        } else {
            ids.chunks(self.config.in_list_chunk_size)
                .map(|chunk| Constraint::In {
                    operand: operand.clone(),
                    values: chunk.iter().map(|id| Value::String(id.clone())).collect(),
                })
                .collect()
        };
        trace!(pattern, hits = ids.len(), groups = groups.len(), "full-text search");

        if let Some(group) = Constraint::or_all(groups) {
            self.stack.add(group);
        }
        Ok(())
    }

    fn not(&mut self, call: &FunctionCall) -> Result<FunctionOutcome> {
        let [argument] = call.arguments.as_slice() else {
            return Err(Error::unsupported(
                format!("not() takes 1 argument, got {}", call.arguments.len()),
                call,
            ));
        };
        let Argument::Expr(inner) = argument else {
            return Err(Error::unsupported("not() needs an expression, not a literal", call));
        };

        self.stack.push_isolated();
        self.and_expr(inner)?;
        let mut collected = self.stack.pop();
        let negated = match collected.pop() {
            Some(only) if collected.is_empty() => Constraint::negate(only),
            _ => {
                return Err(Error::unsupported(
                    "not() argument must yield exactly one constraint",
                    call,
                ));
            }
        };
        self.stack.add(negated);
        Ok(FunctionOutcome::Constraint)
    }

    fn predicate_subartifacts(&mut self, set: &SubartifactSet) -> Result<()> {
        match set {
            SubartifactSet::Function(call) => match self.function_call(call)? {
                FunctionOutcome::Constraint => Ok(()),
                FunctionOutcome::Property => self.finish_test(None, call),
            },
            SubartifactSet::Relationship {
                path,
                predicate,
                subartifact_set,
            } => {
                if subartifact_set.is_some() || self.relationship_depth > 0 {
                    return Err(Error::unsupported(
                        "multi-level subartifact sets are not supported",
                        set,
                    ));
                }
                self.relationship_depth += 1;
                let compiled = if self.config.is_derived_relationship(&path.relationship_type) {
                    self.derived_predicate(predicate.as_ref())
                } else {
                    self.relationship_predicate(path, predicate.as_ref())
                };
                self.relationship_depth -= 1;
                compiled
            }
        }
    }

    /// `[someRelationship[...]]`: an `EXISTS` over relationships owned by the
    /// current artifact whose target satisfies the inner predicate.
    fn relationship_predicate(&mut self, path: &RelationshipPath, predicate: Option<&Expr>) -> Result<()> {
        let outer = self.selector();
        let relationship = self.aliases.next(NodeKind::Relationship);
        trace!(relationship = %path.relationship_type, alias = %relationship.alias, "relationship sub-scope");

        let mut source = SourceRef::Selector(relationship.clone());
        let mut constraints = vec![equals(
            &relationship,
            Property::RelationshipType,
            Value::string(&path.relationship_type),
        )];

        if let Some(predicate) = predicate {
            let target = self.aliases.next(NodeKind::Target);
            let far = self.aliases.next(NodeKind::Artifact);
            source = source
                .join(
                    target.clone(),
                    JoinKind::Inner,
                    JoinCondition::Child {
                        child: target.clone(),
                        parent: relationship.clone(),
                    },
                )
                .join(
                    far.clone(),
                    JoinKind::Inner,
                    JoinCondition::Equi {
                        left: target.operand(Property::TargetArtifact),
                        right: far.operand(Property::Id),
                    },
                );
            self.stack
                .push_relationship(far, Some(relationship.clone()), Some(target));
            self.and_expr(predicate)?;
            constraints.extend(self.stack.pop());
        }

        let owner = self.aliases.next(NodeKind::Artifact);
        source = source.join(
            owner.clone(),
            JoinKind::Inner,
            JoinCondition::Child {
                child: relationship,
                parent: owner.clone(),
            },
        );

        self.stack.add(Constraint::ExistsSubquery(Box::new(Subquery {
            source,
            constraint: Constraint::and_all(constraints),
            correlated: owner.operand(Property::Id),
            outer: outer.operand(Property::Id),
        })));
        Ok(())
    }

    /// `[relatedDocument[...]]`: the document the current artifact was derived from.
    fn derived_predicate(&mut self, predicate: Option<&Expr>) -> Result<()> {
        let outer = self.selector();
        let document = self.aliases.next(NodeKind::Artifact);
        trace!(alias = %document.alias, "derived-from sub-scope");

        let mut constraints = Vec::new();
        if let Some(predicate) = predicate {
            self.stack.push_relationship(document.clone(), None, None);
            self.and_expr(predicate)?;
            constraints.extend(self.stack.pop());
        }

        let owner = self.aliases.next(NodeKind::Artifact);
        let source = SourceRef::Selector(document.clone()).join(
            owner.clone(),
            JoinKind::Inner,
            JoinCondition::Child {
                child: owner.clone(),
                parent: document,
            },
        );

        self.stack.add(Constraint::ExistsSubquery(Box::new(Subquery {
            source,
            constraint: Constraint::and_all(constraints),
            correlated: owner.operand(Property::Id),
            outer: outer.operand(Property::Id),
        })));
        Ok(())
    }

    /// `/s-ramp/.../someRelationship[...]`: joins into the root source and
    /// makes the far side the result.
    fn top_level_subartifacts(&mut self, set: &SubartifactSet) -> Result<()> {
        let SubartifactSet::Relationship {
            path,
            predicate,
            subartifact_set,
        } = set
        else {
            return Err(Error::unsupported(
                "function steps are not supported after the artifact set",
                set,
            ));
        };
        if subartifact_set.is_some() {
            return Err(Error::unsupported(
                "only a single top-level relationship step is supported",
                set,
            ));
        }

        let from = self.selector();
        let source = std::mem::replace(&mut self.source, SourceRef::Selector(from.clone()));

        if self.config.is_derived_relationship(&path.relationship_type) {
            let document = self.aliases.next(NodeKind::Artifact);
            self.source = source.join(
                document.clone(),
                JoinKind::Inner,
                JoinCondition::Child {
                    child: from,
                    parent: document.clone(),
                },
            );
            self.stack.retarget_root(document, None, None);
        } else {
            let relationship = self.aliases.next(NodeKind::Relationship);
            let target = self.aliases.next(NodeKind::Target);
            let far = self.aliases.next(NodeKind::Artifact);
            self.source = source
                .join(
                    relationship.clone(),
                    JoinKind::Inner,
                    JoinCondition::Child {
                        child: relationship.clone(),
                        parent: from,
                    },
                )
                .join(
                    target.clone(),
                    JoinKind::Inner,
                    JoinCondition::Child {
                        child: target.clone(),
                        parent: relationship.clone(),
                    },
                )
                .join(
                    far.clone(),
                    JoinKind::Inner,
                    JoinCondition::Equi {
                        left: target.operand(Property::TargetArtifact),
                        right: far.operand(Property::Id),
                    },
                );
            self.stack.add(equals(
                &relationship,
                Property::RelationshipType,
                Value::string(&path.relationship_type),
            ));
            self.stack.retarget_root(far, Some(relationship), Some(target));
        }

        if let Some(predicate) = predicate {
            self.and_expr(predicate)?;
        }
        Ok(())
    }
}

fn equals(selector: &Selector, property: Property, value: Value) -> Constraint {
    Constraint::Comparison {
        operand: selector.operand(property),
        operator: Operator::Eq,
        value,
    }
}

fn single_test(expr: &Expr) -> Option<(&AstOperand, bool)> {
    match expr {
        AndExpr {
            left:
                OrExpr {
                    left: EqualityExpr::Test { left, comparison },
                    right: None,
                },
            right: None,
        } => Some((left, comparison.is_some())),
        _ => None,
    }
}

fn is_context_item(argument: &Argument) -> bool {
    match argument {
        Argument::Primary(primary) => *primary == PrimaryExpr::ContextItem,
        Argument::Expr(expr) => matches!(
            single_test(expr),
            Some((AstOperand::Primary(PrimaryExpr::ContextItem), false))
        ),
    }
}

fn property_argument(argument: &Argument) -> Result<&ForwardPropertyStep> {
    match argument {
        Argument::Expr(expr) => match single_test(expr) {
            Some((AstOperand::Property(step), false)) => Ok(step),
            _ => Err(Error::unsupported("expected a property argument such as @name", argument)),
        },
        Argument::Primary(_) => Err(Error::unsupported(
            "expected a property argument such as @name",
            argument,
        )),
    }
}

fn string_literal(argument: &Argument) -> Result<&str> {
    match argument {
        Argument::Primary(PrimaryExpr::Literal(s)) => Ok(s),
        other => Err(Error::unsupported("expected a string literal argument", other)),
    }
}

fn resolve_order_property(name: &str) -> Result<CoreProperty> {
    let name = name.trim().trim_start_matches('@');
    let local = match name.split_once(':') {
        None => name,
        Some(("s-ramp", local)) => local,
        Some(_) => {
            return Err(Error::UnresolvedReference(format!(
                "cannot order by {name}: only S-RAMP core properties are sortable"
            )));
        }
    };
    CoreProperty::from_local_name(local).ok_or_else(|| {
        Error::UnresolvedReference(format!("cannot order by unknown property {name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::EqualityOperator;
    use crate::error::ErrorKind;
    use crate::model::Alias;
    use artificer_api::{
        ArtifactId, ArtifactTypeInfo, ClassificationUri, ResolveError, SearchError, builtin_type,
    };

    struct Catalog;

    impl ArtifactTypeCatalog for Catalog {
        fn resolve(&self, type_name: &str) -> ArtifactTypeInfo {
            builtin_type(type_name).unwrap_or_else(ArtifactTypeInfo::extended)
        }
    }

    struct Regions;

    impl ClassificationResolver for Regions {
        fn resolve(&self, term: &str) -> std::result::Result<ClassificationUri, ResolveError> {
            match term {
                "China" | "Japan" => Ok(ClassificationUri::new(format!("urn:regions#{term}"))),
                other => Err(ResolveError::Unknown(other.to_string())),
            }
        }
    }

    struct Hits(usize);

    impl FullTextIndex for Hits {
        fn search(&self, _: &str, _: &[String]) -> std::result::Result<Vec<ArtifactId>, SearchError> {
            Ok((0..self.0).map(|i| format!("uuid-{i}")).collect())
        }
    }

    fn compile_with(hits: usize, query: &Query) -> Result<ConstraintTree> {
        let full_text = Hits(hits);
        let collaborators = Collaborators {
            classifications: &Regions,
            catalog: &Catalog,
            full_text: &full_text,
        };
        let config = CompilerConfig::default();
        QueryCompiler::new(&collaborators, &config).compile_tree(query, None)
    }

    fn compile(query: &Query) -> Result<ConstraintTree> {
        compile_with(0, query)
    }

    fn sel(kind: NodeKind, alias: &str) -> Selector {
        Selector::new(kind, Alias::new(alias))
    }

    fn trash() -> Constraint {
        Constraint::Descendant {
            selector: sel(NodeKind::Artifact, "artifact1"),
            ancestor_path: "/s-ramp".into(),
        }
    }

    /// Constraint produced by the predicate, with the root trash filter peeled off.
    fn body(tree: &ConstraintTree) -> &Constraint {
        match tree.constraint.as_ref() {
            Some(Constraint::And(body, filter)) => {
                assert_eq!(**filter, trash());
                body
            }
            other => panic!("expected body AND trash, got {other:?}"),
        }
    }

    fn predicate_body(predicate: Expr) -> Constraint {
        let query = Query::new(LocationPath::all()).with_predicate(predicate);
        body(&compile(&query).unwrap()).clone()
    }

    #[test]
    fn test_bare_query_is_only_the_trash_filter() {
        let tree = compile(&Query::new(LocationPath::all())).unwrap();
        assert_eq!(tree.constraint, Some(trash()));
        assert_eq!(tree.column, sel(NodeKind::Artifact, "artifact1"));
    }

    #[test]
    fn test_builtin_type_restricts_by_type() {
        let tree = compile(&Query::new(LocationPath::typed("xsd", "XsdDocument"))).unwrap();
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            *body(&tree),
            equals(&a1, Property::ArtifactType, Value::string("XsdDocument"))
        );
    }

    #[test]
    fn test_unknown_type_is_an_extended_type() {
        let tree = compile(&Query::new(LocationPath::typed("ext", "MyType"))).unwrap();
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            *body(&tree),
            Constraint::and(
                equals(&a1, Property::ArtifactModel, Value::string("ext")),
                equals(&a1, Property::Core(CoreProperty::ExtendedType), Value::string("MyType")),
            )
        );

        // an unknown type under a built-in model is still an extension
        let tree = compile(&Query::new(LocationPath::typed("xsd", "Bogus"))).unwrap();
        assert!(matches!(body(&tree), Constraint::And(..)));
    }

    #[test]
    fn test_model_only_restricts_by_model() {
        let tree = compile(&Query::new(LocationPath::model("wsdl"))).unwrap();
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            *body(&tree),
            equals(&a1, Property::ArtifactModel, Value::string("wsdl"))
        );
    }

    #[test]
    fn test_and_or_keep_structure() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let name = |v: &str| equals(&a1, Property::Core(CoreProperty::Name), Value::string(v));
        let got = predicate_body(
            Expr::equals("name", "a").and(Expr::equals("name", "b").or(Expr::equals("name", "c"))),
        );
        assert_eq!(
            got,
            Constraint::and(name("a"), Constraint::or(name("b"), name("c")))
        );
    }

    #[test]
    fn test_core_property_existence_and_comparison() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            predicate_body(Expr::exists("description")),
            Constraint::Exists(a1.operand(Property::Core(CoreProperty::Description)))
        );
        assert_eq!(
            predicate_body(Expr::compare(
                "contentSize",
                EqualityOperator::Gt,
                PrimaryExpr::Number(100.0)
            )),
            Constraint::Comparison {
                operand: a1.operand(Property::Core(CoreProperty::ContentSize)),
                operator: Operator::Gt,
                value: Value::Double(100.0),
            }
        );
    }

    #[test]
    fn test_custom_property_is_an_exists_subquery() {
        let got = predicate_body(Expr::equals("myProperty", "true"));
        let Constraint::ExistsSubquery(sub) = got else {
            panic!("expected subquery, got {got:?}");
        };
        let a2 = sel(NodeKind::Artifact, "artifact2");
        let p1 = sel(NodeKind::PropertyEntry, "property1");
        assert_eq!(sub.correlated, a2.operand(Property::Id));
        assert_eq!(sub.outer, sel(NodeKind::Artifact, "artifact1").operand(Property::Id));
        assert_eq!(
            sub.constraint,
            Some(Constraint::and(
                equals(&p1, Property::EntryKey, Value::string("myProperty")),
                equals(&p1, Property::EntryValue, Value::string("true")),
            ))
        );
    }

    #[test]
    fn test_not_wraps_exactly_the_inner_constraint() {
        for inner in [Expr::exists("myProperty"), Expr::equals("myProperty", "x"), Expr::equals("name", "x")] {
            let plain = predicate_body(inner.clone());
            let negated = predicate_body(inner.negate());
            assert_eq!(negated, Constraint::negate(plain));
        }
    }

    #[test]
    fn test_double_negation_is_kept() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            predicate_body(Expr::equals("name", "x").negate().negate()),
            Constraint::negate(Constraint::negate(equals(
                &a1,
                Property::Core(CoreProperty::Name),
                Value::string("x")
            )))
        );
    }

    #[test]
    fn test_negated_relationship_predicate() {
        let relationship = || {
            Expr::subartifacts(
                SubartifactSet::relationship("importedBy").with_predicate(Expr::equals("name", "x")),
            )
        };
        let plain = predicate_body(relationship());
        let negated = predicate_body(relationship().negate());
        assert!(matches!(&negated, Constraint::Not(inner) if matches!(**inner, Constraint::ExistsSubquery(_))));
        assert_eq!(negated, Constraint::negate(plain));
    }

    #[test]
    fn test_not_with_literal_is_unsupported() {
        let call = FunctionCall::xpath("not", vec![Argument::literal("x")]);
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_classifications() {
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let call = FunctionCall::sramp(
            "classifiedByAllOf",
            vec![Argument::context(), Argument::literal("China"), Argument::literal("Japan")],
        );
        assert_eq!(
            predicate_body(Expr::function(call)),
            Constraint::and(
                equals(&a1, Property::Classifier { normalized: true }, Value::string("urn:regions#China")),
                equals(&a1, Property::Classifier { normalized: true }, Value::string("urn:regions#Japan")),
            )
        );

        let call = FunctionCall::sramp(
            "exactlyClassifiedByAnyOf",
            vec![Argument::context(), Argument::literal("China")],
        );
        assert_eq!(
            predicate_body(Expr::function(call)),
            equals(&a1, Property::Classifier { normalized: false }, Value::string("urn:regions#China"))
        );
    }

    #[test]
    fn test_classification_failures() {
        let unknown = FunctionCall::sramp(
            "classifiedByAnyOf",
            vec![Argument::context(), Argument::literal("Mars")],
        );
        let err = compile(&Query::new(LocationPath::all()).with_predicate(Expr::function(unknown)))
            .unwrap_err();
        assert!(matches!(err, Error::Classification(ResolveError::Unknown(ref t)) if t == "Mars"));

        let empty = FunctionCall::sramp("classifiedByAnyOf", vec![Argument::context()]);
        let err = compile(&Query::new(LocationPath::all()).with_predicate(Expr::function(empty)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_matches_on_property_is_like() {
        let call = FunctionCall::xpath("matches", vec![Argument::property("name"), Argument::literal("foo.*bar")]);
        let a1 = sel(NodeKind::Artifact, "artifact1");
        assert_eq!(
            predicate_body(Expr::function(call)),
            Constraint::Comparison {
                operand: a1.operand(Property::Core(CoreProperty::Name)),
                operator: Operator::Like,
                value: Value::string("foo%bar"),
            }
        );
    }

    #[test]
    fn test_full_text_chunks_ids() {
        let call = FunctionCall::xpath("matches", vec![Argument::context(), Argument::literal(".*foo.*")]);
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        let tree = compile_with(2500, &query).unwrap();
        let Constraint::Or(first, rest) = body(&tree) else {
            panic!("expected OR of IN groups");
        };
        let Constraint::Or(second, third) = rest.as_ref() else {
            panic!("expected nested OR");
        };
        let sizes: Vec<usize> = [first, second, third]
            .iter()
            .map(|c| match c.as_ref() {
                Constraint::In { values, .. } => values.len(),
                other => panic!("expected IN, got {other:?}"),
            })
            .collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[test]
    fn test_full_text_without_hits_is_an_empty_in() {
        let call = FunctionCall::xpath("matches", vec![Argument::context(), Argument::literal("zzz")]);
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        let tree = compile(&query).unwrap();
        assert!(matches!(body(&tree), Constraint::In { values, .. } if values.is_empty()));
    }

    #[test]
    fn test_functions_in_wrong_namespace() {
        let call = FunctionCall::sramp("matches", vec![Argument::property("name"), Argument::literal("x")]);
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);

        let call = FunctionCall::xpath("count", vec![Argument::context()]);
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_relationship_predicate_is_an_exists_subquery() {
        let got = predicate_body(Expr::subartifacts(
            SubartifactSet::relationship("importedBy").with_predicate(Expr::equals("name", "x")),
        ));
        let Constraint::ExistsSubquery(sub) = got else {
            panic!("expected subquery");
        };
        let r1 = sel(NodeKind::Relationship, "relationship1");
        let a2 = sel(NodeKind::Artifact, "artifact2");
        let a3 = sel(NodeKind::Artifact, "artifact3");
        assert_eq!(sub.source.root(), &r1);
        assert_eq!(sub.correlated, a3.operand(Property::Id));
        assert_eq!(
            sub.constraint,
            Some(Constraint::and(
                equals(&r1, Property::RelationshipType, Value::string("importedBy")),
                equals(&a2, Property::Core(CoreProperty::Name), Value::string("x")),
            ))
        );
    }

    #[test]
    fn test_relationship_attribute_hangs_off_the_relationship() {
        let call = FunctionCall::sramp(
            "getRelationshipAttribute",
            vec![Argument::context(), Argument::literal("weight")],
        );
        let got = predicate_body(Expr::subartifacts(
            SubartifactSet::relationship("uses").with_predicate(Expr::function_compare(
                call,
                EqualityOperator::Eq,
                PrimaryExpr::literal("true"),
            )),
        ));
        let Constraint::ExistsSubquery(outer) = got else {
            panic!("expected subquery");
        };
        let Some(Constraint::And(_, attr)) = outer.constraint else {
            panic!("expected relationship type AND attribute test");
        };
        let Constraint::ExistsSubquery(attr) = *attr else {
            panic!("expected attribute subquery");
        };
        assert_eq!(attr.outer, sel(NodeKind::Relationship, "relationship1").operand(Property::Id));
        assert_eq!(attr.correlated, sel(NodeKind::Relationship, "relationship2").operand(Property::Id));
        let a1 = sel(NodeKind::RelationshipAttribute, "attribute1");
        assert_eq!(
            attr.constraint,
            Some(Constraint::and(
                equals(&a1, Property::EntryKey, Value::string("weight")),
                equals(&a1, Property::EntryValue, Value::string("true")),
            ))
        );
    }

    #[test]
    fn test_target_attribute_hangs_off_the_target() {
        let call = FunctionCall::sramp(
            "getTargetAttribute",
            vec![Argument::context(), Argument::literal("weight")],
        );
        let got = predicate_body(Expr::subartifacts(
            SubartifactSet::relationship("uses").with_predicate(Expr::function_compare(
                call,
                EqualityOperator::Eq,
                PrimaryExpr::literal("5"),
            )),
        ));
        let Constraint::ExistsSubquery(outer) = got else {
            panic!("expected subquery");
        };
        assert_eq!(outer.correlated, sel(NodeKind::Artifact, "artifact3").operand(Property::Id));
        let Some(Constraint::And(_, attr)) = outer.constraint else {
            panic!("expected relationship type AND attribute test");
        };
        let Constraint::ExistsSubquery(attr) = *attr else {
            panic!("expected attribute subquery");
        };
        let t2 = sel(NodeKind::Target, "target2");
        let attribute = sel(NodeKind::TargetAttribute, "attribute1");
        assert_eq!(attr.outer, sel(NodeKind::Target, "target1").operand(Property::Id));
        assert_eq!(attr.correlated, t2.operand(Property::Id));
        assert_eq!(
            attr.source,
            SourceRef::Selector(t2.clone()).join(
                attribute.clone(),
                JoinKind::Inner,
                JoinCondition::Child { child: attribute.clone(), parent: t2 },
            )
        );
        // attribute values are never coerced
        assert_eq!(
            attr.constraint,
            Some(Constraint::and(
                equals(&attribute, Property::EntryKey, Value::string("weight")),
                equals(&attribute, Property::EntryValue, Value::string("5")),
            ))
        );
    }

    #[test]
    fn test_attribute_outside_relationship_is_unsupported() {
        let call = FunctionCall::sramp(
            "getTargetAttribute",
            vec![Argument::context(), Argument::literal("weight")],
        );
        let query = Query::new(LocationPath::all()).with_predicate(Expr::function(call));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_nested_relationship_predicates_are_rejected() {
        let inner = SubartifactSet::relationship("c");
        let middle = SubartifactSet::relationship("b").with_predicate(Expr::subartifacts(inner));
        let outer = SubartifactSet::relationship("a").with_predicate(Expr::subartifacts(middle));
        let query = Query::new(LocationPath::all()).with_predicate(Expr::subartifacts(outer));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);

        let chained = SubartifactSet::relationship("a").then(SubartifactSet::relationship("b"));
        let query = Query::new(LocationPath::all()).with_predicate(Expr::subartifacts(chained.clone()));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
        let query = Query::new(LocationPath::all()).with_subartifacts(chained);
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }

    #[test]
    fn test_derived_predicate_uses_child_join() {
        let got = predicate_body(Expr::subartifacts(
            SubartifactSet::relationship("relatedDocument").with_predicate(Expr::equals("name", "doc.xsd")),
        ));
        let Constraint::ExistsSubquery(sub) = got else {
            panic!("expected subquery");
        };
        let a2 = sel(NodeKind::Artifact, "artifact2");
        let a3 = sel(NodeKind::Artifact, "artifact3");
        assert_eq!(
            sub.source,
            SourceRef::Selector(a2.clone()).join(
                a3.clone(),
                JoinKind::Inner,
                JoinCondition::Child { child: a3.clone(), parent: a2.clone() },
            )
        );
        assert_eq!(
            sub.constraint,
            Some(equals(&a2, Property::Core(CoreProperty::Name), Value::string("doc.xsd")))
        );
    }

    #[test]
    fn test_top_level_traversal_moves_the_result() {
        let query = Query::new(LocationPath::typed("wsdl", "WsdlDocument")).with_subartifacts(
            SubartifactSet::relationship("importedBy").with_predicate(Expr::equals("name", "x")),
        );
        let tree = compile(&query).unwrap();
        let a2 = sel(NodeKind::Artifact, "artifact2");
        assert_eq!(tree.column, a2);
        assert_eq!(tree.source.selectors().len(), 4);
        let Some(Constraint::And(_, filter)) = &tree.constraint else {
            panic!("expected trash filter");
        };
        assert_eq!(
            **filter,
            Constraint::and(
                trash(),
                Constraint::Descendant { selector: a2, ancestor_path: "/s-ramp".into() },
            )
        );
    }

    #[test]
    fn test_top_level_derived_traversal_selects_the_document() {
        let query = Query::new(LocationPath::typed("xsd", "XsdDocument")).with_subartifacts(
            SubartifactSet::relationship("relatedDocument").with_predicate(Expr::equals("name", "doc.xsd")),
        );
        let tree = compile(&query).unwrap();
        let a1 = sel(NodeKind::Artifact, "artifact1");
        let a2 = sel(NodeKind::Artifact, "artifact2");
        assert_eq!(tree.column, a2);
        assert_eq!(
            tree.source,
            SourceRef::Selector(a1.clone()).join(
                a2.clone(),
                JoinKind::Inner,
                JoinCondition::Child { child: a1.clone(), parent: a2.clone() },
            )
        );
        assert_eq!(
            tree.constraint,
            Some(Constraint::and(
                Constraint::and(
                    equals(&a1, Property::ArtifactType, Value::string("XsdDocument")),
                    equals(&a2, Property::Core(CoreProperty::Name), Value::string("doc.xsd")),
                ),
                Constraint::and(
                    trash(),
                    Constraint::Descendant { selector: a2, ancestor_path: "/s-ramp".into() },
                ),
            ))
        );
    }

    #[test]
    fn test_ordering() {
        let full_text = Hits(0);
        let collaborators = Collaborators {
            classifications: &Regions,
            catalog: &Catalog,
            full_text: &full_text,
        };
        let config = CompilerConfig::default();
        let compiler = QueryCompiler::new(&collaborators, &config);
        let query = Query::new(LocationPath::all());

        let tree = compiler
            .compile_tree(&query, Some(&OrderBy::descending("s-ramp:lastModifiedTimestamp")))
            .unwrap();
        let ordering = tree.ordering.unwrap();
        assert!(!ordering.ascending);
        assert_eq!(ordering.operand.property, Property::Core(CoreProperty::LastModifiedTimestamp));

        let err = compiler
            .compile_tree(&query, Some(&OrderBy::ascending("myProperty")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_malformed_date_aborts() {
        let query = Query::new(LocationPath::all()).with_predicate(Expr::compare(
            "createdTimestamp",
            EqualityOperator::Lt,
            PrimaryExpr::literal("yesterday"),
        ));
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::MalformedLiteral);
    }

    #[test]
    fn test_foreign_property_namespace_is_unsupported() {
        let step = ForwardPropertyStep {
            property: crate::ast::QName::qualified("urn:other", "o", "name"),
        };
        let expr: Expr = EqualityExpr::Test {
            left: AstOperand::Property(step),
            comparison: None,
        }
        .into();
        let query = Query::new(LocationPath::all()).with_predicate(expr);
        assert_eq!(compile(&query).unwrap_err().kind(), ErrorKind::UnsupportedFeature);
    }
}
