//! The fixed step pipeline a paper's analysis moves through.
//!
//! The external workflow emits node-level progress events by name. Mapping
//! those names onto display steps is data, not code: a [`StepTemplate`] slice
//! declares the stages and which of them run as a concurrent group. Steps
//! sharing a group id are admitted together when any member starts, but the
//! group only retires once every member has finished — a sibling's completion
//! must never retire the whole group.

/// Blueprint for one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTemplate {
    /// Node title as the workflow emits it; also the display label.
    pub label: &'static str,
    /// Stages sharing an id run concurrently in the workflow.
    pub group: Option<u8>,
}

/// Default analysis pipeline. The first two stages are setup phases that the
/// workflow reports as one unit (`workflow_started`); concept bridging and
/// visual verification run as a parallel pair.
pub const DEFAULT_PIPELINE: &[StepTemplate] = &[
    StepTemplate {
        label: "Upload PDF",
        group: None,
    },
    StepTemplate {
        label: "Document Extractor",
        group: None,
    },
    StepTemplate {
        label: "Paper Analysis",
        group: None,
    },
    StepTemplate {
        label: "Concept Bridging",
        group: Some(0),
    },
    StepTemplate {
        label: "Visual Verification",
        group: Some(0),
    },
    StepTemplate {
        label: "Result Assembly",
        group: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
    Error,
}

/// One live pipeline stage. Created fresh at stream start, mutated in place
/// as progress events arrive, discarded when the session ends.
#[derive(Debug, Clone)]
pub struct ProgressStep {
    pub label: &'static str,
    pub status: StepStatus,
    pub group: Option<u8>,
}

/// The ordered step list for one active session.
#[derive(Debug, Clone, Default)]
pub struct StepList {
    steps: Vec<ProgressStep>,
}

impl StepList {
    /// No steps yet — the stream has not reported `started`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Instantiate from a template: first step active, the rest pending.
    pub fn start(template: &[StepTemplate]) -> Self {
        let steps = template
            .iter()
            .enumerate()
            .map(|(i, t)| ProgressStep {
                label: t.label,
                status: if i == 0 {
                    StepStatus::Active
                } else {
                    StepStatus::Pending
                },
                group: t.group,
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The workflow reports its setup phases as one unit before node-level
    /// events begin: mark the first two steps done.
    pub fn complete_setup(&mut self) {
        for step in self.steps.iter_mut().take(2) {
            step.status = StepStatus::Done;
        }
    }

    /// A named node began executing.
    ///
    /// When the name matches a step, every strictly-earlier ungrouped step is
    /// retired and the step goes active, along with any pending members of
    /// its group (parallel admission). An unrecognized name retires whatever
    /// is active and advances to the next pending step instead — protocol
    /// drift must not wedge the display.
    pub fn node_started(&mut self, name: &str) {
        match self.find(name) {
            Some(idx) => {
                for step in &mut self.steps[..idx] {
                    if step.group.is_none() && !matches!(step.status, StepStatus::Done | StepStatus::Error) {
                        step.status = StepStatus::Done;
                    }
                }
                self.steps[idx].status = StepStatus::Active;
                if let Some(group) = self.steps[idx].group {
                    self.activate_group(group);
                }
            }
            None => {
                for step in &mut self.steps {
                    if step.status == StepStatus::Active {
                        step.status = StepStatus::Done;
                    }
                }
                self.activate_next_pending();
            }
        }
    }

    /// A named node finished. Only that step is retired; its group advances
    /// the pipeline only once every member is done, because parallel steps
    /// complete independently.
    pub fn node_finished(&mut self, name: &str) {
        let Some(idx) = self.find(name) else {
            return;
        };
        self.steps[idx].status = StepStatus::Done;
        let Some(group) = self.steps[idx].group else {
            return;
        };
        let group_done = self
            .steps
            .iter()
            .filter(|s| s.group == Some(group))
            .all(|s| s.status == StepStatus::Done);
        if group_done {
            if let Some(next) = self
                .steps
                .iter()
                .position(|s| s.status == StepStatus::Pending && s.group.is_none())
            {
                self.steps[next].status = StepStatus::Active;
            }
        }
    }

    /// The stream is about to end successfully: everything still open is done.
    pub fn complete_all(&mut self) {
        for step in &mut self.steps {
            if matches!(step.status, StepStatus::Pending | StepStatus::Active) {
                step.status = StepStatus::Done;
            }
        }
    }

    /// The stream failed: whatever was active carries the error.
    pub fn fail_active(&mut self) {
        for step in &mut self.steps {
            if step.status == StepStatus::Active {
                step.status = StepStatus::Error;
            }
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.label == name)
    }

    fn activate_group(&mut self, group: u8) {
        for step in &mut self.steps {
            if step.group == Some(group) && step.status == StepStatus::Pending {
                step.status = StepStatus::Active;
            }
        }
    }

    fn activate_next_pending(&mut self) {
        let Some(idx) = self
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
        else {
            return;
        };
        self.steps[idx].status = StepStatus::Active;
        if let Some(group) = self.steps[idx].group {
            self.activate_group(group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE: &[StepTemplate] = &[
        StepTemplate {
            label: "One",
            group: None,
        },
        StepTemplate {
            label: "Two",
            group: None,
        },
        StepTemplate {
            label: "Three",
            group: None,
        },
    ];

    const GROUPED: &[StepTemplate] = &[
        StepTemplate {
            label: "Analyze",
            group: None,
        },
        StepTemplate {
            label: "Bridge",
            group: Some(0),
        },
        StepTemplate {
            label: "Verify",
            group: Some(0),
        },
        StepTemplate {
            label: "Assemble",
            group: None,
        },
    ];

    fn statuses(list: &StepList) -> Vec<StepStatus> {
        list.steps().iter().map(|s| s.status).collect()
    }

    #[test]
    fn start_activates_first_step_only() {
        let list = StepList::start(THREE);
        assert_eq!(
            statuses(&list),
            [StepStatus::Active, StepStatus::Pending, StepStatus::Pending]
        );
    }

    #[test]
    fn node_started_advances_past_earlier_steps() {
        let mut list = StepList::start(THREE);
        list.node_started("Two");
        assert_eq!(
            statuses(&list),
            [StepStatus::Done, StepStatus::Active, StepStatus::Pending]
        );
    }

    #[test]
    fn node_started_on_group_member_admits_whole_group() {
        let mut list = StepList::start(GROUPED);
        list.node_started("Bridge");
        assert_eq!(
            statuses(&list),
            [
                StepStatus::Done,
                StepStatus::Active,
                StepStatus::Active,
                StepStatus::Pending
            ]
        );
    }

    #[test]
    fn unmatched_node_falls_back_to_next_pending() {
        let mut list = StepList::start(THREE);
        list.node_started("Mystery Node");
        assert_eq!(
            statuses(&list),
            [StepStatus::Done, StepStatus::Active, StepStatus::Pending]
        );
    }

    #[test]
    fn group_sibling_survives_one_member_finishing() {
        let mut list = StepList::start(GROUPED);
        list.node_started("Bridge");
        list.node_finished("Bridge");
        assert_eq!(
            statuses(&list),
            [
                StepStatus::Done,
                StepStatus::Done,
                StepStatus::Active,
                StepStatus::Pending
            ],
            "sibling stays active, next step stays pending"
        );
    }

    #[test]
    fn last_group_member_finishing_activates_next_ungrouped_step() {
        let mut list = StepList::start(GROUPED);
        list.node_started("Bridge");
        list.node_finished("Bridge");
        list.node_finished("Verify");
        assert_eq!(
            statuses(&list),
            [
                StepStatus::Done,
                StepStatus::Done,
                StepStatus::Done,
                StepStatus::Active
            ]
        );
    }

    #[test]
    fn workflow_started_completes_setup_unit() {
        let mut list = StepList::start(DEFAULT_PIPELINE);
        list.complete_setup();
        let statuses = statuses(&list);
        assert_eq!(statuses[0], StepStatus::Done);
        assert_eq!(statuses[1], StepStatus::Done);
        assert_eq!(statuses[2], StepStatus::Pending);
    }

    #[test]
    fn complete_all_leaves_no_open_steps() {
        let mut list = StepList::start(GROUPED);
        list.node_started("Bridge");
        list.complete_all();
        assert!(list
            .steps()
            .iter()
            .all(|s| s.status == StepStatus::Done));
    }

    #[test]
    fn fail_active_marks_every_active_step() {
        let mut list = StepList::start(GROUPED);
        list.node_started("Bridge");
        list.fail_active();
        assert_eq!(
            statuses(&list),
            [
                StepStatus::Done,
                StepStatus::Error,
                StepStatus::Error,
                StepStatus::Pending
            ]
        );
    }

    #[test]
    fn unknown_finish_is_a_no_op() {
        let mut list = StepList::start(THREE);
        list.node_finished("Mystery Node");
        assert_eq!(
            statuses(&list),
            [StepStatus::Active, StepStatus::Pending, StepStatus::Pending]
        );
    }
}
