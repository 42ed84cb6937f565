//! Set reconciliation: diff a desired collection against what GitHub reports.
//!
//! Used by every resource that owns a whole set (collaborators, team
//! members, labels). The caller applies the result in one pass; the first
//! failing API call aborts the apply.

use std::collections::BTreeMap;

/// Outcome of comparing desired items with actual items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<D, A> {
    /// Desired items with no actual counterpart.
    pub add: Vec<D>,
    /// Matching keys whose contents differ: (actual, desired).
    pub update: Vec<(A, D)>,
    /// Actual items with no desired counterpart.
    pub remove: Vec<A>,
    /// Matching keys with equal contents.
    pub unchanged: Vec<(A, D)>,
}

impl<D, A> Reconciliation<D, A> {
    /// Returns true when nothing has to change.
    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}

/// Key comparison mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Keys are compared exactly.
    Exact,
    /// Keys are compared ASCII case-insensitively (logins, label names).
    CaseInsensitive,
}

impl KeyMatch {
    fn normalize(&self, key: String) -> String {
        match self {
            Self::Exact => key,
            Self::CaseInsensitive => key.to_ascii_lowercase(),
        }
    }
}

/// Diffs `desired` against `actual`.
///
/// Items are matched with `desired_key` / `actual_key`; matched pairs are
/// compared with `same`. Output order follows the normalized keys, so plans
/// are stable regardless of API ordering. When several items share a key, the
/// last one wins.
pub fn reconcile<D, A, KD, KA, E>(
    desired: Vec<D>,
    actual: Vec<A>,
    key_match: KeyMatch,
    desired_key: KD,
    actual_key: KA,
    same: E,
) -> Reconciliation<D, A>
where
    KD: Fn(&D) -> String,
    KA: Fn(&A) -> String,
    E: Fn(&A, &D) -> bool,
{
    let mut wanted: BTreeMap<String, D> = desired
        .into_iter()
        .map(|d| (key_match.normalize(desired_key(&d)), d))
        .collect();

    let existing: BTreeMap<String, A> = actual
        .into_iter()
        .map(|a| (key_match.normalize(actual_key(&a)), a))
        .collect();

    let mut result = Reconciliation {
        add: Vec::new(),
        update: Vec::new(),
        remove: Vec::new(),
        unchanged: Vec::new(),
    };

    for (key, current) in existing {
        match wanted.remove(&key) {
            Some(target) if same(&current, &target) => result.unchanged.push((current, target)),
            Some(target) => result.update.push((current, target)),
            None => result.remove.push(current),
        }
    }
    result.add.extend(wanted.into_values());

    tracing::debug!(
        add = result.add.len(),
        update = result.update.len(),
        remove = result.remove.len(),
        unchanged = result.unchanged.len(),
        "Reconciled set"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Member {
        login: String,
        role: String,
    }

    fn member(login: &str, role: &str) -> Member {
        Member {
            login: login.into(),
            role: role.into(),
        }
    }

    fn run(desired: Vec<Member>, actual: Vec<Member>) -> Reconciliation<Member, Member> {
        reconcile(
            desired,
            actual,
            KeyMatch::CaseInsensitive,
            |d| d.login.clone(),
            |a| a.login.clone(),
            |a, d| a.role == d.role,
        )
    }

    #[test]
    fn test_add_update_remove() {
        let result = run(
            vec![
                member("alice", "maintainer"),
                member("carol", "member"),
                member("dave", "member"),
            ],
            vec![member("alice", "member"), member("bob", "member"), member("carol", "member")],
        );

        assert_eq!(result.add, vec![member("dave", "member")]);
        assert_eq!(
            result.update,
            vec![(member("alice", "member"), member("alice", "maintainer"))]
        );
        assert_eq!(result.remove, vec![member("bob", "member")]);
        assert_eq!(result.unchanged.len(), 1);
        assert!(!result.is_noop());
    }

    #[test]
    fn test_case_insensitive_keys() {
        let result = run(vec![member("Octocat", "member")], vec![member("octocat", "member")]);
        assert!(result.is_noop());
        assert_eq!(result.unchanged.len(), 1);
    }

    #[test]
    fn test_exact_keys() {
        let result = reconcile(
            vec!["Bug".to_string()],
            vec!["bug".to_string()],
            KeyMatch::Exact,
            |d| d.clone(),
            |a| a.clone(),
            |a, d| a == d,
        );
        assert_eq!(result.add, vec!["Bug".to_string()]);
        assert_eq!(result.remove, vec!["bug".to_string()]);
    }

    #[test]
    fn test_empty_inputs() {
        let result = run(vec![], vec![]);
        assert!(result.is_noop());
        assert!(result.unchanged.is_empty());
    }
}
