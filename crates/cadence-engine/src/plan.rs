use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use cadence_core::period::{parse_period, source_periods};
use cadence_core::{DateRange, Fidelity, PeriodError};
use serde::Serialize;

use crate::error::EngineError;

/// One `(fidelity, period)` document to build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Target {
    pub fidelity: Fidelity,
    pub period: String,
}

impl Target {
    pub fn new(fidelity: Fidelity, period: impl Into<String>) -> Self {
        Self {
            fidelity,
            period: period.into(),
        }
    }

    pub fn range(&self) -> Result<DateRange, PeriodError> {
        parse_period(self.fidelity, &self.period)
    }

    /// Source-fidelity targets this one is distilled from. Empty for daily.
    pub fn sources(&self) -> Result<Vec<Target>, PeriodError> {
        let Some(source) = self.fidelity.source() else {
            return Ok(Vec::new());
        };
        Ok(source_periods(self.fidelity, &self.period)?
            .into_iter()
            .map(|p| Target::new(source, p))
            .collect())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fidelity, self.period)
    }
}

/// Work list for building `target`.
///
/// Without `deps` the list is just the target. With `deps`, every source
/// period that `is_available` reports missing is added, recursively down to
/// daily, and the list is ordered with Kahn's algorithm so that each entry
/// comes after everything it is distilled from. Ties break on
/// `(fidelity, period)`, so finer documents come first. The target is last.
pub fn plan_generation<F>(
    target: &Target,
    deps: bool,
    mut is_available: F,
) -> Result<Vec<Target>, EngineError>
where
    F: FnMut(&Target) -> anyhow::Result<bool>,
{
    target.range()?;
    if !deps {
        return Ok(vec![target.clone()]);
    }

    // Edges point from a source document to the document distilled from it.
    let mut in_degree: HashMap<Target, usize> = HashMap::new();
    let mut dependents: HashMap<Target, Vec<Target>> = HashMap::new();
    let mut seen: HashSet<Target> = HashSet::new();
    let mut queue: VecDeque<Target> = VecDeque::new();

    in_degree.insert(target.clone(), 0);
    seen.insert(target.clone());
    queue.push_back(target.clone());

    while let Some(node) = queue.pop_front() {
        for source in node.sources()? {
            if !seen.contains(&source) && is_available(&source)? {
                continue;
            }
            if seen.insert(source.clone()) {
                in_degree.entry(source.clone()).or_insert(0);
                queue.push_back(source.clone());
            }
            *in_degree.entry(node.clone()).or_insert(0) += 1;
            dependents.entry(source).or_default().push(node.clone());
        }
    }

    let mut ready: BTreeSet<Target> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(t, _)| t.clone())
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(next) = ready.pop_first() {
        if let Some(parents) = dependents.get(&next) {
            for parent in parents {
                if let Some(deg) = in_degree.get_mut(parent) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(parent.clone());
                    }
                }
            }
        }
        order.push(next);
    }

    // Every edge goes to a strictly coarser fidelity, so the graph is acyclic
    // and Kahn's algorithm drains it completely.
    debug_assert_eq!(order.len(), in_degree.len());
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none_available(_: &Target) -> anyhow::Result<bool> {
        Ok(false)
    }

    #[test]
    fn without_deps_only_target() {
        let target = Target::new(Fidelity::Monthly, "2025-02");
        let plan = plan_generation(&target, false, none_available).unwrap();
        assert_eq!(plan, vec![target]);
    }

    #[test]
    fn daily_target_has_no_dependencies() {
        let target = Target::new(Fidelity::Daily, "2025-02-03");
        let plan = plan_generation(&target, true, none_available).unwrap();
        assert_eq!(plan, vec![target]);
    }

    #[test]
    fn weekly_expands_to_seven_days_first() {
        let target = Target::new(Fidelity::Weekly, "2025-W03");
        let plan = plan_generation(&target, true, none_available).unwrap();
        assert_eq!(plan.len(), 8);
        assert_eq!(plan[0], Target::new(Fidelity::Daily, "2025-01-13"));
        assert_eq!(plan[6], Target::new(Fidelity::Daily, "2025-01-19"));
        assert_eq!(plan[7], target);
    }

    #[test]
    fn skips_available_documents() {
        let target = Target::new(Fidelity::Monthly, "2025-02");
        let cached = Target::new(Fidelity::Weekly, "2025-W06");
        let plan = plan_generation(&target, true, |t| Ok(*t == cached)).unwrap();

        let weeks: Vec<&str> = plan
            .iter()
            .filter(|t| t.fidelity == Fidelity::Weekly)
            .map(|t| t.period.as_str())
            .collect();
        assert_eq!(weeks, vec!["2025-W05", "2025-W07", "2025-W08", "2025-W09"]);

        let days = plan.iter().filter(|t| t.fidelity == Fidelity::Daily).count();
        assert_eq!(days, 28);
        assert!(!plan.contains(&Target::new(Fidelity::Daily, "2025-02-03")));
        assert_eq!(plan.last(), Some(&target));

        let unique: HashSet<&Target> = plan.iter().collect();
        assert_eq!(unique.len(), plan.len());
    }

    #[test]
    fn every_entry_follows_its_sources() {
        let target = Target::new(Fidelity::Quarterly, "2025-Q1");
        let plan = plan_generation(&target, true, none_available).unwrap();
        let position: HashMap<&Target, usize> =
            plan.iter().enumerate().map(|(i, t)| (t, i)).collect();
        for t in &plan {
            for source in t.sources().unwrap() {
                assert!(position[&source] < position[t], "{source} after {t}");
            }
        }
        assert_eq!(plan.last(), Some(&target));
        assert_eq!(
            plan.iter().filter(|t| t.fidelity == Fidelity::Monthly).count(),
            3
        );
    }

    #[test]
    fn lookup_errors_propagate() {
        let target = Target::new(Fidelity::Weekly, "2025-W03");
        let err = plan_generation(&target, true, |_| anyhow::bail!("disk gone")).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }

    #[test]
    fn rejects_malformed_target() {
        let target = Target::new(Fidelity::Weekly, "2025-W3");
        let err = plan_generation(&target, true, none_available).unwrap_err();
        assert!(matches!(err, EngineError::Period(_)));
    }
}
