//! Canonical, syntax-independent fingerprints of candidate networks.
//!
//! Every update expression is evaluated into a reduced ordered BDD over one
//! shared variable domain. The BDD is then re-encoded as a [`Diagram`]: nodes
//! renumbered in a fixed post-order walk from the root. For a fixed variable
//! order a reduced BDD is unique up to node numbering, so two expressions
//! denote the same function exactly when their diagrams are equal. Equality
//! and hashing never look at the expression text.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use biodivine_lib_bdd::boolean_expression::BooleanExpression;
use biodivine_lib_bdd::{Bdd, BddPointer, BddVariableSet};
use serde::{Deserialize, Serialize};

use crate::candidates::CandidateNetwork;
use crate::error::{CompareError, Result};

/// Characters the expression grammar reserves, so never part of a name.
const RESERVED_CHARS: [char; 9] = ['!', '&', '|', '^', '=', '<', '>', '(', ')'];

const FALSE_ID: u32 = 0;
const TRUE_ID: u32 = 1;

/// Capability that turns an update expression into a canonical diagram.
///
/// Every network compared in one run must go through the same evaluator, so
/// that variable indices inside diagrams mean the same thing.
pub trait ExpressionEvaluator {
    /// Variable names of the domain, in decision order.
    fn variables(&self) -> &[String];

    fn evaluate(&self, expression: &str) -> Result<Diagram>;
}

/// Decision node: variable index and the ids of the low/high successors.
///
/// Ids `0` and `1` are the terminals, internal nodes start at `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagramNode {
    pub var: u16,
    pub low: u32,
    pub high: u32,
}

/// Canonical encoding of a reduced ordered BDD.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagram {
    nodes: Vec<DiagramNode>,
    root: u32,
}

impl Diagram {
    pub fn constant(value: bool) -> Self {
        Self {
            nodes: Vec::new(),
            root: if value { TRUE_ID } else { FALSE_ID },
        }
    }

    /// Re-encode a lib-bdd diagram. Children get their ids before their
    /// parents, low branch first.
    pub fn from_bdd(bdd: &Bdd) -> Self {
        let root = bdd.root_pointer();
        if root.is_terminal() {
            return Self::constant(root.is_one());
        }

        let mut ids: HashMap<BddPointer, u32> = HashMap::new();
        let mut nodes = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((ptr, expanded)) = stack.pop() {
            if ptr.is_terminal() || ids.contains_key(&ptr) {
                continue;
            }
            let low = bdd.low_link_of(ptr);
            let high = bdd.high_link_of(ptr);
            if expanded {
                let node = DiagramNode {
                    var: bdd.var_of(ptr).to_index() as u16,
                    low: terminal_or(&ids, low),
                    high: terminal_or(&ids, high),
                };
                ids.insert(ptr, nodes.len() as u32 + 2);
                nodes.push(node);
            } else {
                stack.push((ptr, true));
                stack.push((high, false));
                stack.push((low, false));
            }
        }

        let root = ids[&root];
        Self { nodes, root }
    }

    pub fn is_true(&self) -> bool {
        self.root == TRUE_ID
    }

    pub fn is_false(&self) -> bool {
        self.root == FALSE_ID
    }

    /// Render as an expression over `names` (indexed by variable index).
    ///
    /// Shared subdiagrams are written out once per path, so the text can grow
    /// exponentially with depth. Meant for the few networks shown in reports.
    pub fn to_expression(&self, names: &[String]) -> String {
        self.render(self.root, names)
    }

    fn render(&self, id: u32, names: &[String]) -> String {
        match id {
            FALSE_ID => return "false".into(),
            TRUE_ID => return "true".into(),
            _ => {}
        }
        let node = self.nodes[(id - 2) as usize];
        let name = names
            .get(node.var as usize)
            .cloned()
            .unwrap_or_else(|| format!("x{}", node.var));
        match (node.low, node.high) {
            (FALSE_ID, TRUE_ID) => name,
            (TRUE_ID, FALSE_ID) => format!("!{name}"),
            (low, TRUE_ID) => format!("({name} | {})", self.render(low, names)),
            (low, FALSE_ID) => format!("(!{name} & {})", self.render(low, names)),
            (FALSE_ID, high) => format!("({name} & {})", self.render(high, names)),
            (TRUE_ID, high) => format!("(!{name} | {})", self.render(high, names)),
            (low, high) => format!(
                "(({name} & {}) | (!{name} & {}))",
                self.render(high, names),
                self.render(low, names)
            ),
        }
    }
}

fn terminal_or(ids: &HashMap<BddPointer, u32>, ptr: BddPointer) -> u32 {
    if ptr.is_zero() {
        FALSE_ID
    } else if ptr.is_one() {
        TRUE_ID
    } else {
        ids[&ptr]
    }
}

/// Evaluator backed by a lib-bdd variable set.
#[derive(Clone)]
pub struct SharedDomain {
    names: Vec<String>,
    variables: BddVariableSet,
}

impl SharedDomain {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() || name.contains(RESERVED_CHARS) || name.contains(char::is_whitespace)
            {
                return Err(CompareError::format(
                    "variable domain",
                    format!("`{name}` is not a valid variable name"),
                ));
            }
            if !seen.insert(name) {
                return Err(CompareError::format(
                    "variable domain",
                    format!("variable `{name}` is declared twice"),
                ));
            }
        }
        if names.len() > u16::MAX as usize {
            return Err(CompareError::format(
                "variable domain",
                format!("{} variables exceed the supported maximum", names.len()),
            ));
        }

        let refs: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        Ok(Self {
            names: refs.iter().map(|n| n.to_string()).collect(),
            variables: BddVariableSet::new(&refs),
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl ExpressionEvaluator for SharedDomain {
    fn variables(&self) -> &[String] {
        &self.names
    }

    fn evaluate(&self, expression: &str) -> Result<Diagram> {
        let parsed = BooleanExpression::try_from(expression)
            .map_err(|e| CompareError::format("update expression", format!("`{expression}`: {e}")))?;
        let bdd = self.variables.safe_eval_expression(&parsed).ok_or_else(|| {
            CompareError::format(
                "update expression",
                format!("`{expression}` uses a variable outside the shared domain"),
            )
        })?;
        Ok(Diagram::from_bdd(&bdd))
    }
}

/// Variable name to canonical diagram of its update function.
///
/// The only way to obtain a fingerprint is [`Fingerprint::build`], so every
/// comparison between networks goes through diagrams.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    diagrams: BTreeMap<String, Diagram>,
}

impl Fingerprint {
    /// Canonicalize `network`, which must define exactly the evaluator's
    /// variables.
    pub fn build(network: &CandidateNetwork, evaluator: &dyn ExpressionEvaluator) -> Result<Self> {
        let domain = evaluator.variables();
        let same_universe = network.len() == domain.len()
            && domain.iter().all(|name| network.expression(name).is_some());
        if !same_universe {
            let mut expected = domain.to_vec();
            expected.sort();
            return Err(CompareError::DomainMismatch {
                expected,
                found: network.variables().map(str::to_string).collect(),
            });
        }

        let diagrams = network
            .iter()
            .map(|(var, expr)| Ok((var.to_string(), evaluator.evaluate(expr)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { diagrams })
    }

    pub fn diagram(&self, variable: &str) -> Option<&Diagram> {
        self.diagrams.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.diagrams.keys().map(String::as_str)
    }

    /// Readable update functions, one canonical expression per variable.
    pub fn describe(&self, evaluator: &dyn ExpressionEvaluator) -> BTreeMap<String, String> {
        self.diagrams
            .iter()
            .map(|(var, d)| (var.clone(), d.to_expression(evaluator.variables())))
            .collect()
    }
}
