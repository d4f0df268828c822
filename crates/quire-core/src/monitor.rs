use crate::decisions::lookup;
use crate::decisions::DecisionMap;
use crate::state::ActionCode;
use crate::state::Manuscript;
use crate::state::ManuscriptId;
use crate::state::ManuscriptState;
use crate::state::RefereeDecision;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceRequest {
    pub manuscript_id: ManuscriptId,
    pub action: ActionCode,
}

fn unanimous_accept(manuscript: &Manuscript, decisions: &DecisionMap) -> bool {
    if manuscript.state != ManuscriptState::InReview || manuscript.referees.is_empty() {
        return false;
    }
    let every_referee_accepted = manuscript.referees.iter().all(|referee| {
        matches!(
            lookup(decisions, &manuscript.id, referee),
            Some(RefereeDecision::Accept)
        )
    });
    let nothing_else_recorded = decisions
        .get(&manuscript.id)
        .map_or(true, |entries| {
            entries
                .values()
                .all(|decision| *decision == RefereeDecision::Accept)
        });
    every_referee_accepted && nothing_else_recorded
}

/// Manuscripts in review whose referees have all accepted.
pub fn plan_auto_advance(manuscripts: &[Manuscript], decisions: &DecisionMap) -> Vec<AdvanceRequest> {
    manuscripts
        .iter()
        .filter(|manuscript| unanimous_accept(manuscript, decisions))
        .map(|manuscript| AdvanceRequest {
            manuscript_id: manuscript.id.clone(),
            action: ActionCode::AcceptedToCopyedit,
        })
        .collect()
}

/// Re-plans whenever the manuscripts or decisions it last saw change.
///
/// There is no lock or debounce. A manual decision racing an automatic
/// advance can submit the same transition twice; the server absorbs that.
/// A failed advance is not retried while the inputs stay the same, since
/// the monitor already counts them as seen.
#[derive(Debug, Default)]
pub struct AutoAdvanceMonitor {
    last_observed: Option<(Vec<Manuscript>, DecisionMap)>,
}

impl AutoAdvanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        manuscripts: &[Manuscript],
        decisions: &DecisionMap,
    ) -> Vec<AdvanceRequest> {
        let unchanged = self
            .last_observed
            .as_ref()
            .is_some_and(|(seen_manuscripts, seen_decisions)| {
                seen_manuscripts.as_slice() == manuscripts && seen_decisions == decisions
            });
        if unchanged {
            return Vec::new();
        }
        self.last_observed = Some((manuscripts.to_vec(), decisions.clone()));
        plan_auto_advance(manuscripts, decisions)
    }

    pub fn reset(&mut self) {
        self.last_observed = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn in_review(referees: &[&str]) -> Manuscript {
        let mut manuscript = Manuscript::new("m1", ManuscriptState::InReview);
        for referee in referees {
            manuscript.add_referee(referee);
        }
        manuscript
    }

    fn decisions(entries: &[(&str, RefereeDecision)]) -> DecisionMap {
        DecisionMap::from([(
            ManuscriptId::new("m1"),
            entries
                .iter()
                .map(|(referee, decision)| (referee.to_string(), decision.clone()))
                .collect::<BTreeMap<_, _>>(),
        )])
    }

    #[test]
    fn unanimous_accept_yields_one_request() {
        let requests = plan_auto_advance(
            &[in_review(&["r1", "r2"])],
            &decisions(&[("r1", RefereeDecision::Accept), ("r2", RefereeDecision::Accept)]),
        );
        assert_eq!(
            requests,
            vec![AdvanceRequest {
                manuscript_id: ManuscriptId::new("m1"),
                action: ActionCode::AcceptedToCopyedit,
            }]
        );
    }

    #[test]
    fn any_dissent_or_missing_decision_blocks_advance() {
        let manuscripts = [in_review(&["r1", "r2"])];
        assert!(plan_auto_advance(
            &manuscripts,
            &decisions(&[("r1", RefereeDecision::Accept), ("r2", RefereeDecision::Reject)])
        )
        .is_empty());
        assert!(plan_auto_advance(&manuscripts, &decisions(&[("r1", RefereeDecision::Accept)]))
            .is_empty());
        assert!(plan_auto_advance(
            &manuscripts,
            &decisions(&[
                ("r1", RefereeDecision::Accept),
                ("r2", RefereeDecision::Accept),
                ("former", RefereeDecision::AcceptWithRevisions),
            ])
        )
        .is_empty());
    }

    #[test]
    fn only_in_review_manuscripts_with_referees_qualify() {
        let mut editing = in_review(&["r1"]);
        editing.state = ManuscriptState::CopyEditing;
        let accepted = decisions(&[("r1", RefereeDecision::Accept)]);
        assert!(plan_auto_advance(&[editing], &accepted).is_empty());
        assert!(plan_auto_advance(&[in_review(&[])], &accepted).is_empty());
    }

    #[test]
    fn monitor_fires_only_when_inputs_change() {
        let mut monitor = AutoAdvanceMonitor::new();
        let manuscripts = vec![in_review(&["r1"])];
        let accepted = decisions(&[("r1", RefereeDecision::Accept)]);

        assert_eq!(monitor.observe(&manuscripts, &accepted).len(), 1);
        assert!(monitor.observe(&manuscripts, &accepted).is_empty());

        let mut advanced = manuscripts.clone();
        advanced[0].state = ManuscriptState::CopyEditing;
        assert!(monitor.observe(&advanced, &accepted).is_empty());

        monitor.reset();
        assert_eq!(monitor.observe(&manuscripts, &accepted).len(), 1);
    }
}
