//! §3 "Condition" and §6.5 bit-exact operator semantics.

use crate::error::{ScenarioError, ScenarioResult};
use netgraph_core::{AttrMap, AttrValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    NotContains,
    In,
    NotIn,
    Exists,
    NotExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineLogic {
    And,
    Or,
}

impl Default for CombineLogic {
    fn default() -> Self {
        CombineLogic::And
    }
}

/// One condition: `{attr-path, operator, value}`. `value` is unused (and may be
/// `None`) for `Exists`/`NotExists`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub attr_path: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<AttrValue>,
}

impl Condition {
    pub fn new(attr_path: impl Into<String>, operator: Operator, value: Option<AttrValue>) -> Self {
        Self {
            attr_path: attr_path.into(),
            operator,
            value,
        }
    }

    /// Evaluates this condition against `attrs` (a flattened top-level + nested
    /// attribute dict per §3's "Rule" evaluation contract).
    pub fn evaluate(&self, attrs: &AttrMap) -> ScenarioResult<bool> {
        let resolved = netgraph_core::attrs::get_path(attrs, &self.attr_path);

        match self.operator {
            Operator::Exists => Ok(resolved.is_some()),
            Operator::NotExists => Ok(resolved.is_none()),
            Operator::Eq => Ok(resolved == self.value.as_ref()),
            Operator::Ne => Ok(resolved != self.value.as_ref()),
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
                let (Some(left), Some(right)) = (resolved.and_then(AttrValue::as_f64), self.value.as_ref().and_then(AttrValue::as_f64))
                else {
                    return Err(ScenarioError::InvalidConditionOperand(self.attr_path.clone()));
                };
                Ok(match self.operator {
                    Operator::Lt => left < right,
                    Operator::Le => left <= right,
                    Operator::Gt => left > right,
                    Operator::Ge => left >= right,
                    _ => unreachable!(),
                })
            }
            Operator::Contains | Operator::NotContains => {
                let Some(left) = resolved else { return Ok(self.operator == Operator::NotContains) };
                let member = self.value.as_ref();
                let found = match left {
                    AttrValue::String(s) => match member.and_then(AttrValue::as_str) {
                        Some(needle) => s.contains(needle),
                        None => return Err(ScenarioError::InvalidContainsOperand(self.attr_path.clone())),
                    },
                    AttrValue::Array(items) => member.map(|m| items.contains(m)).unwrap_or(false),
                    _ => return Err(ScenarioError::InvalidContainsOperand(self.attr_path.clone())),
                };
                Ok(if self.operator == Operator::Contains { found } else { !found })
            }
            Operator::In | Operator::NotIn => {
                let Some(AttrValue::Array(items)) = self.value.as_ref() else {
                    return Err(ScenarioError::InvalidInOperand(self.attr_path.clone()));
                };
                let found = resolved.map(|r| items.contains(r)).unwrap_or(false);
                Ok(if self.operator == Operator::In { found } else { !found })
            }
        }
    }
}

/// Evaluates a rule's full condition list against `attrs`: empty list matches
/// every entity; otherwise combined via `logic`.
pub fn evaluate_all(conditions: &[Condition], logic: CombineLogic, attrs: &AttrMap) -> ScenarioResult<bool> {
    if conditions.is_empty() {
        return Ok(true);
    }
    match logic {
        CombineLogic::And => {
            for c in conditions {
                if !c.evaluate(attrs)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CombineLogic::Or => {
            for c in conditions {
                if c.evaluate(attrs)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> AttrMap {
        let mut m = AttrMap::new();
        m.insert("capacity".into(), AttrValue::from(10.0));
        m.insert("vendor".into(), AttrValue::from("acme"));
        m.insert("tags".into(), AttrValue::Array(vec![AttrValue::from("core"), AttrValue::from("edge")]));
        m
    }

    #[test]
    fn numeric_comparison_works() {
        let cond = Condition::new("capacity", Operator::Gt, Some(AttrValue::from(5.0)));
        assert!(cond.evaluate(&attrs()).unwrap());
    }

    #[test]
    fn numeric_comparison_on_string_errors() {
        let cond = Condition::new("vendor", Operator::Gt, Some(AttrValue::from(5.0)));
        assert!(matches!(cond.evaluate(&attrs()), Err(ScenarioError::InvalidConditionOperand(_))));
    }

    #[test]
    fn contains_checks_array_membership() {
        let cond = Condition::new("tags", Operator::Contains, Some(AttrValue::from("core")));
        assert!(cond.evaluate(&attrs()).unwrap());
    }

    #[test]
    fn exists_and_not_exists() {
        assert!(Condition::new("vendor", Operator::Exists, None).evaluate(&attrs()).unwrap());
        assert!(Condition::new("missing", Operator::NotExists, None).evaluate(&attrs()).unwrap());
    }

    #[test]
    fn and_requires_all_true() {
        let conds = vec![
            Condition::new("capacity", Operator::Gt, Some(AttrValue::from(5.0))),
            Condition::new("vendor", Operator::Eq, Some(AttrValue::from("other"))),
        ];
        assert!(!evaluate_all(&conds, CombineLogic::And, &attrs()).unwrap());
        assert!(evaluate_all(&conds, CombineLogic::Or, &attrs()).unwrap());
    }

    #[test]
    fn empty_conditions_match_everything() {
        assert!(evaluate_all(&[], CombineLogic::And, &attrs()).unwrap());
    }
}
