//! Call Guard: rules enforced on a callable's arguments before it runs

use crate::binder::{bind, BoundArguments, CallArgs, Signature};
use crate::domain::GuardResult;
use crate::registry::RuleSet;
use std::fmt;
use std::sync::Arc;

/// A callable wrapped with parameter rules.
///
/// Arguments are bound against the declared signature, checked name by name in
/// rule declaration order, and only then handed unchanged to the callable.
pub struct CallGuard<F> {
    signature: Arc<Signature>,
    rules: Arc<RuleSet>,
    func: F,
}

impl<F> CallGuard<F> {
    /// Wrap `func`. The signature is validated here, at declaration time.
    pub fn new(signature: Signature, rules: RuleSet, func: F) -> GuardResult<Self> {
        Self::from_shared(Arc::new(signature), Arc::new(rules), func)
    }

    pub(crate) fn from_shared(
        signature: Arc<Signature>,
        rules: Arc<RuleSet>,
        func: F,
    ) -> GuardResult<Self> {
        signature.validate()?;
        for name in rules.names() {
            if !signature.binds(name) {
                tracing::warn!(
                    "Rule for '{}' on '{}' can never run: the signature does not bind that name",
                    name,
                    signature.name
                );
            }
        }
        Ok(Self { signature, rules, func })
    }

    /// The signature of the wrapped callable, unchanged
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Bind and check `args` without invoking the callable
    pub fn check(&self, args: &CallArgs) -> GuardResult<BoundArguments> {
        let bound = bind(&self.signature, args)?;
        self.rules.check_present(&self.signature.name, |name| bound.lookup(name))?;
        Ok(bound)
    }

    /// Check `args`, then invoke the callable with them and return its result
    pub fn call<R>(&self, args: CallArgs) -> GuardResult<R>
    where
        F: Fn(CallArgs) -> R,
    {
        self.check(&args)?;
        Ok((self.func)(args))
    }
}

impl<F> fmt::Debug for CallGuard<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGuard")
            .field("signature", &self.signature)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
