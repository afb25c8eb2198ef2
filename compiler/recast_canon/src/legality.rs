//! Pattern-variable legality.
//!
//! The target grammar only definitely assigns a pattern variable when every
//! enclosing construct up to the condition guarantees the match succeeded.
//! A declaration under `or`/`||` or `not`/`!` is therefore rejected unless
//! the [`BindingPolicy`] says otherwise.

use recast_ir::{Expr, Pattern, Symbol};

use crate::{BindingPolicy, BindingScope};

/// Check every declaration and designation in `expr`.
///
/// Returns the first symbol declared in a forbidden scope.
pub fn check_bindings(expr: &Expr, policy: &BindingPolicy) -> Result<(), Symbol> {
    Checker { policy }.expr(expr, BindingScope::empty())
}

struct Checker<'p> {
    policy: &'p BindingPolicy,
}

impl Checker<'_> {
    fn expr(&self, expr: &Expr, scope: BindingScope) -> Result<(), Symbol> {
        recast_stack::ensure_sufficient_stack(|| match expr {
            Expr::Bool(_) | Expr::Access(_) | Expr::Operation(_) => Ok(()),
            Expr::Is { pattern, .. } => self.pattern(pattern, scope),
            Expr::Not(inner) => self.expr(inner, scope | BindingScope::UNDER_NOT),
            Expr::And(children) => children.iter().try_for_each(|c| self.expr(c, scope)),
            Expr::Or(children) => children
                .iter()
                .try_for_each(|c| self.expr(c, scope | BindingScope::UNDER_OR)),
        })
    }

    fn pattern(&self, pattern: &Pattern, scope: BindingScope) -> Result<(), Symbol> {
        recast_stack::ensure_sufficient_stack(|| match pattern {
            Pattern::Discard | Pattern::Constant(_) | Pattern::Relational(..) | Pattern::Type(_) => {
                Ok(())
            }
            Pattern::Declaration { name, .. } => self.declare(*name, scope),
            Pattern::Recursive(recursive) => {
                if let Some(name) = recursive.designation {
                    self.declare(name, scope)?;
                }
                for sub in recursive.positional.iter().flatten() {
                    self.pattern(sub, scope)?;
                }
                for property in recursive.properties.iter().flatten() {
                    self.pattern(&property.pattern, scope)?;
                }
                Ok(())
            }
            Pattern::Not(inner) => self.pattern(inner, scope | BindingScope::UNDER_NOT),
            Pattern::And(children) => children.iter().try_for_each(|c| self.pattern(c, scope)),
            Pattern::Or(children) => children
                .iter()
                .try_for_each(|c| self.pattern(c, scope | BindingScope::UNDER_OR)),
        })
    }

    fn declare(&self, name: Symbol, scope: BindingScope) -> Result<(), Symbol> {
        if self.policy.allows(scope) {
            Ok(())
        } else {
            tracing::debug!(%name, ?scope, "binding in forbidden scope");
            Err(name)
        }
    }
}
