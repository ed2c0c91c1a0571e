//! Tag, child and priority filtering.
//!
//! The stages run in a fixed order: tag filter, then per-child counts, then
//! child filter, then priority sort. Counts are taken from the tag-filtered
//! set before the child filter so each child chip shows how many tasks would
//! remain if that child were selected.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::Task;

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrioritySort {
    HighFirst,
    LowFirst,
    #[default]
    None,
}

/// Filter settings for one household tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    /// Lower-cased, trimmed, non-empty tag terms. Use [`parse_tag_terms`].
    pub tag_terms: Vec<String>,
    pub child_ids: BTreeSet<String>,
    pub priority_sort: PrioritySort,
}

impl FilterOptions {
    pub fn with_tags(mut self, raw: &str) -> Self {
        self.tag_terms = parse_tag_terms(raw);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tag_terms.is_empty()
            && self.child_ids.is_empty()
            && self.priority_sort == PrioritySort::None
    }
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome<'a> {
    pub tasks: Vec<&'a Task>,
    /// Tasks per child id in the tag-filtered set, before the child filter.
    pub child_counts: BTreeMap<String, usize>,
}

/// Split a comma-separated tag query into lower-cased terms.
///
/// `" School, ,FOOTBALL "` yields `["school", "football"]`.
pub fn parse_tag_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// True when any context tag contains any term, case-insensitively.
fn matches_tags(task: &Task, terms: &[String]) -> bool {
    task.context.iter().any(|tag| {
        let tag = tag.to_lowercase();
        terms.iter().any(|term| tag.contains(term.as_str()))
    })
}

fn count_children(tasks: &[&Task]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        for child in &task.child_ids {
            *counts.entry(child.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Run the pipeline over `tasks`, preserving input order except where the
/// priority sort reorders. The sort is stable: equal priorities keep their
/// relative input order in both directions.
pub fn apply<'a, I>(tasks: I, options: &FilterOptions) -> FilterOutcome<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut selected: Vec<&Task> = if options.tag_terms.is_empty() {
        tasks.into_iter().collect()
    } else {
        tasks
            .into_iter()
            .filter(|task| matches_tags(task, &options.tag_terms))
            .collect()
    };

    let child_counts = count_children(&selected);

    if !options.child_ids.is_empty() {
        selected.retain(|task| !task.child_ids.is_disjoint(&options.child_ids));
    }

    match options.priority_sort {
        PrioritySort::HighFirst => {
            selected.sort_by(|a, b| b.priority_rank().cmp(&a.priority_rank()))
        }
        PrioritySort::LowFirst => selected.sort_by_key(|task| task.priority_rank()),
        PrioritySort::None => {}
    }

    FilterOutcome {
        tasks: selected,
        child_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskType};

    fn task(id: &str, tags: &[&str], children: &[&str], priority: Option<Priority>) -> Task {
        Task {
            context: tags.iter().map(|t| t.to_string()).collect(),
            child_ids: children.iter().map(|c| c.to_string()).collect(),
            priority,
            ..Task::new(id, id, TaskType::Chore)
        }
    }

    fn ids(outcome: &FilterOutcome<'_>) -> Vec<String> {
        outcome.tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_parse_tag_terms() {
        assert_eq!(
            parse_tag_terms(" School, ,FOOTBALL ,"),
            vec!["school".to_string(), "football".to_string()]
        );
        assert!(parse_tag_terms(" , ").is_empty());
    }

    #[test]
    fn test_empty_options_keep_everything_in_order() {
        let tasks = vec![task("a", &[], &[], None), task("b", &[], &[], None)];
        let out = apply(&tasks, &FilterOptions::default());
        assert_eq!(ids(&out), vec!["a", "b"]);
        assert!(FilterOptions::default().is_empty());
    }

    #[test]
    fn test_tag_filter_is_or_and_case_insensitive() {
        let tasks = vec![
            task("a", &["School"], &[], None),
            task("b", &["Football practice"], &[], None),
            task("c", &["home"], &[], None),
            task("d", &[], &[], None),
        ];
        let options = FilterOptions::default().with_tags("school,FOOTBALL");
        assert_eq!(ids(&apply(&tasks, &options)), vec!["a", "b"]);
    }

    #[test]
    fn test_child_filter_is_or() {
        let tasks = vec![
            task("a", &[], &["c1"], None),
            task("b", &[], &["c2"], None),
            task("c", &[], &["c1", "c3"], None),
            task("d", &[], &[], None),
        ];
        let options = FilterOptions {
            child_ids: ["c1", "c2"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&tasks, &options)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_child_counts_follow_tag_filter_not_child_filter() {
        let tasks = vec![
            task("a", &["school"], &["c1"], None),
            task("b", &["school"], &["c2"], None),
            task("c", &["home"], &["c1"], None),
            task("d", &["school"], &["c1", "c2"], None),
        ];
        let options = FilterOptions {
            child_ids: ["c2".to_string()].into_iter().collect(),
            ..FilterOptions::default().with_tags("school")
        };
        let out = apply(&tasks, &options);
        assert_eq!(ids(&out), vec!["b", "d"]);
        // c1 counts a and d (c is dropped by the tag filter); c1 is not selected
        assert_eq!(out.child_counts.get("c1"), Some(&2));
        assert_eq!(out.child_counts.get("c2"), Some(&2));
    }

    #[test]
    fn test_priority_high_first_is_stable() {
        let tasks = vec![
            task("low", &[], &[], Some(Priority::LOW)),
            task("none", &[], &[], None),
            task("high1", &[], &[], Some(Priority::HIGH)),
            task("mid", &[], &[], Some(Priority::MEDIUM)),
            task("high2", &[], &[], Some(Priority::HIGH)),
        ];
        let options = FilterOptions {
            priority_sort: PrioritySort::HighFirst,
            ..Default::default()
        };
        assert_eq!(
            ids(&apply(&tasks, &options)),
            vec!["high1", "high2", "mid", "low", "none"]
        );
    }

    #[test]
    fn test_priority_low_first_is_stable() {
        let tasks = vec![
            task("high1", &[], &[], Some(Priority::HIGH)),
            task("none1", &[], &[], None),
            task("high2", &[], &[], Some(Priority::HIGH)),
            task("none2", &[], &[], None),
        ];
        let options = FilterOptions {
            priority_sort: PrioritySort::LowFirst,
            ..Default::default()
        };
        assert_eq!(
            ids(&apply(&tasks, &options)),
            vec!["none1", "none2", "high1", "high2"]
        );
    }

    #[test]
    fn test_options_round_trip_json_shape() {
        let options = FilterOptions {
            priority_sort: PrioritySort::HighFirst,
            ..FilterOptions::default().with_tags("school")
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["prioritySort"], "highFirst");
        assert_eq!(json["tagTerms"][0], "school");
    }
}
